use tracing::debug;

use crate::catalog;
use crate::error::{EngineError, Result};
use crate::models::{round2, OrganizationProfile, RoiProjection, YearProjection};

const BASE_ROI_PERCENT: f64 = 200.0;
const ANNUAL_LICENSE_COST: f64 = 360.0;
const IMPLEMENTATION_COST: f64 = 150.0;
const ANNUAL_PRODUCTIVITY_VALUE: f64 = 1200.0;
/// Share of the productivity value realised in years one to three.
const REALIZATION_RAMP: [f64; 3] = [0.6, 0.8, 0.9];
const FALLBACK_BREAKEVEN_MONTH: u32 = 24;
/// Placeholder until the estimator is backed by observed outcomes.
const CONFIDENCE_SCORE: f64 = 0.85;

pub fn estimate_roi(profile: &OrganizationProfile) -> Result<RoiProjection> {
    if profile.employee_count <= 0 {
        return Err(EngineError::Validation(format!(
            "employee_count must be positive, got {}",
            profile.employee_count
        )));
    }

    let industry_multiplier = catalog::industry_multiplier(&profile.industry);
    let size_multiplier = catalog::size_multiplier(&profile.company_size);
    let predicted_roi = BASE_ROI_PERCENT * industry_multiplier * size_multiplier;
    debug!(
        industry = %profile.industry,
        company_size = %profile.company_size,
        industry_multiplier,
        size_multiplier,
        "roi multipliers"
    );

    let employees = profile.employee_count as f64;
    let year_costs = |year: usize| {
        let license = employees * ANNUAL_LICENSE_COST;
        if year == 0 {
            license + employees * IMPLEMENTATION_COST
        } else {
            license
        }
    };
    let year_benefits =
        |year: usize| employees * ANNUAL_PRODUCTIVITY_VALUE * REALIZATION_RAMP[year];

    let year1_costs = year_costs(0);
    let monthly_benefit = year_benefits(0) / 12.0;
    let monthly_cost = year1_costs / 12.0;
    let breakeven_month = if monthly_benefit > monthly_cost {
        (year1_costs / monthly_benefit).floor() as u32
    } else {
        FALLBACK_BREAKEVEN_MONTH
    };

    Ok(RoiProjection {
        predicted_roi: round2(predicted_roi),
        year1: project(year_costs(0), year_benefits(0)),
        year2: project(year_costs(1), year_benefits(1)),
        year3: project(year_costs(2), year_benefits(2)),
        breakeven_month,
        confidence_score: CONFIDENCE_SCORE,
    })
}

fn project(costs: f64, benefits: f64) -> YearProjection {
    YearProjection {
        costs: round2(costs),
        benefits: round2(benefits),
        roi_percent: round2((benefits - costs) / costs * 100.0),
    }
}
