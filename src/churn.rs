use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::debug;

use crate::error::{EngineError, Result};
use crate::models::{round2, ChurnAssessment, EngagementRecord, RiskLevel, UserChurn};

pub const MAX_CHURN_PROBABILITY: f64 = 0.95;

const INACTIVITY_DAYS: i64 = 14;
const LOW_ENGAGEMENT_INTERACTIONS: f64 = 2.0;
const HIGH_VARIABILITY_STDDEV: f64 = 5.0;

const INACTIVITY_WEIGHT: f64 = 0.3;
const LOW_ENGAGEMENT_WEIGHT: f64 = 0.3;
const DECLINE_WEIGHT: f64 = 0.2;
const VARIABILITY_WEIGHT: f64 = 0.1;

const HIGH_RISK_ABOVE: f64 = 0.7;
const MEDIUM_RISK_ABOVE: f64 = 0.4;

pub const FACTOR_INACTIVE: &str = "Inactive for over 2 weeks";
pub const FACTOR_LOW_ENGAGEMENT: &str = "Low engagement level";
pub const FACTOR_DECLINING: &str = "Declining usage trend";

pub fn assess_churn(history: &[EngagementRecord], today: NaiveDate) -> Result<ChurnAssessment> {
    let (first, last) = match (history.first(), history.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => {
            return Err(EngineError::Data(
                "engagement history must contain at least one record".to_string(),
            ))
        }
    };

    let interactions: Vec<f64> = history.iter().map(|record| record.interactions).collect();
    let days_inactive = (today - last.date).num_days();
    let average = mean(&interactions);
    let trend = last.interactions - first.interactions;
    let spread = sample_stddev(&interactions);

    let mut score = 0.0;
    let mut risk_factors = Vec::new();

    if days_inactive > INACTIVITY_DAYS {
        score += INACTIVITY_WEIGHT;
        risk_factors.push(FACTOR_INACTIVE.to_string());
    }
    if average < LOW_ENGAGEMENT_INTERACTIONS {
        score += LOW_ENGAGEMENT_WEIGHT;
        risk_factors.push(FACTOR_LOW_ENGAGEMENT.to_string());
    }
    if trend < 0.0 {
        score += DECLINE_WEIGHT;
        risk_factors.push(FACTOR_DECLINING.to_string());
    }
    if spread > HIGH_VARIABILITY_STDDEV {
        score += VARIABILITY_WEIGHT;
    }

    debug!(days_inactive, average, trend, spread, score, "churn signals");

    let churn_probability = cap_probability(score);
    Ok(ChurnAssessment {
        churn_probability: round2(churn_probability),
        risk_level: risk_level(churn_probability),
        risk_factors,
    })
}

pub fn cap_probability(score: f64) -> f64 {
    score.min(MAX_CHURN_PROBABILITY)
}

/// Both thresholds are exclusive: exactly 0.7 is medium, exactly 0.4 is low.
pub fn risk_level(probability: f64) -> RiskLevel {
    if probability > HIGH_RISK_ABOVE {
        RiskLevel::High
    } else if probability > MEDIUM_RISK_ABOVE {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

pub fn rank_users(
    histories: &BTreeMap<String, Vec<EngagementRecord>>,
    today: NaiveDate,
) -> Result<Vec<UserChurn>> {
    let mut ranked = histories
        .iter()
        .map(|(user_id, history)| {
            Ok(UserChurn {
                user_id: user_id.clone(),
                assessment: assess_churn(history, today)?,
                record_count: history.len(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    ranked.sort_by(|a, b| {
        b.assessment
            .churn_probability
            .partial_cmp(&a.assessment.churn_probability)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    Ok(ranked)
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation; a single observation has no spread.
fn sample_stddev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let avg = mean(values);
    let variance = values.iter().map(|v| (v - avg).powi(2)).sum::<f64>()
        / (values.len() - 1) as f64;
    variance.sqrt()
}
