use std::fmt::Write;

use chrono::NaiveDate;

use crate::catalog;
use crate::models::{RiskLevel, RiskLevelSummary, Segmentation, UserChurn};

pub fn summarize_by_level(ranked: &[UserChurn]) -> Vec<RiskLevelSummary> {
    let mut map: std::collections::BTreeMap<RiskLevel, (usize, f64)> =
        std::collections::BTreeMap::new();

    for user in ranked {
        let entry = map.entry(user.assessment.risk_level).or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += user.assessment.churn_probability;
    }

    map.into_iter()
        .rev()
        .map(|(risk_level, (count, total))| RiskLevelSummary {
            risk_level,
            count,
            avg_probability: if count == 0 {
                0.0
            } else {
                total / count as f64
            },
        })
        .collect()
}

pub fn build_report(
    source: &str,
    today: NaiveDate,
    ranked: &[UserChurn],
    segmentation: Option<&Segmentation>,
    limit: usize,
) -> String {
    let summaries = summarize_by_level(ranked);
    let mut output = String::new();

    let _ = writeln!(output, "# Adoption Health Report");
    let _ = writeln!(
        output,
        "Generated for {} ({} users, as of {})",
        source,
        ranked.len(),
        today
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Risk Mix");

    if summaries.is_empty() {
        let _ = writeln!(output, "No users with engagement history.");
    } else {
        for summary in summaries.iter() {
            let _ = writeln!(
                output,
                "- {}: {} users (avg churn probability {:.2})",
                summary.risk_level, summary.count, summary.avg_probability
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Highest Risk Users");

    let at_risk: Vec<&UserChurn> = ranked
        .iter()
        .filter(|user| user.assessment.risk_level != RiskLevel::Low)
        .take(limit)
        .collect();

    if at_risk.is_empty() {
        let _ = writeln!(output, "No users above low risk.");
    } else {
        for user in at_risk {
            let factors = if user.assessment.risk_factors.is_empty() {
                "no labelled factors".to_string()
            } else {
                user.assessment.risk_factors.join("; ")
            };
            let _ = writeln!(
                output,
                "- {} ({}) probability {:.2} across {} records: {}",
                user.user_id,
                user.assessment.risk_level,
                user.assessment.churn_probability,
                user.record_count,
                factors
            );
            if let Some(first) = catalog::interventions(user.assessment.risk_level).first() {
                let _ = writeln!(output, "  - next step: {first}");
            }
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Persona Segments");

    let segmentation = match segmentation {
        Some(segmentation) => segmentation,
        None => {
            let _ = writeln!(output, "No users to segment.");
            return output;
        }
    };

    for segment in segmentation.segments.iter() {
        let _ = writeln!(
            output,
            "- {} ({}): {} users, engagement score {}",
            segment.name,
            segment.segment_id,
            segment.size,
            segment.characteristics.engagement_score
        );
        if let Some(items) = segmentation.recommendations.get(&segment.segment_id) {
            for item in items {
                let _ = writeln!(output, "  - {item}");
            }
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChurnAssessment;
    use crate::segment::segment_users;

    fn user(id: &str, probability: f64, level: RiskLevel, factors: &[&str]) -> UserChurn {
        UserChurn {
            user_id: id.to_string(),
            assessment: ChurnAssessment {
                churn_probability: probability,
                risk_level: level,
                risk_factors: factors.iter().map(|f| f.to_string()).collect(),
            },
            record_count: 3,
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 15).unwrap()
    }

    #[test]
    fn summaries_list_highest_level_first() {
        let ranked = vec![
            user("a", 0.9, RiskLevel::High, &[]),
            user("b", 0.6, RiskLevel::Medium, &[]),
            user("c", 0.5, RiskLevel::Medium, &[]),
            user("d", 0.0, RiskLevel::Low, &[]),
        ];
        let summaries = summarize_by_level(&ranked);
        let levels: Vec<RiskLevel> = summaries.iter().map(|s| s.risk_level).collect();
        assert_eq!(levels, vec![RiskLevel::High, RiskLevel::Medium, RiskLevel::Low]);
        assert_eq!(summaries[1].count, 2);
        assert!((summaries[1].avg_probability - 0.55).abs() < 1e-9);
    }

    #[test]
    fn report_lists_risky_users_and_segments() {
        let ranked = vec![
            user("u-17", 0.8, RiskLevel::High, &["Low engagement level"]),
            user("u-02", 0.1, RiskLevel::Low, &[]),
        ];
        let segmentation = segment_users(&ranked, 4).unwrap();
        let report = build_report("engagement.csv", today(), &ranked, Some(&segmentation), 10);

        assert!(report.starts_with("# Adoption Health Report"));
        assert!(report.contains("Generated for engagement.csv (2 users, as of 2026-03-15)"));
        assert!(report.contains("- u-17 (high) probability 0.80 across 3 records: Low engagement level"));
        assert!(report.contains("  - next step: Immediate 1-on-1 coaching session"));
        assert!(!report.contains("- u-02"));
        assert!(report.contains("- At-Risk Users (at_risk): 0 users, engagement score 25"));
    }

    #[test]
    fn report_handles_quiet_population() {
        let ranked = vec![user("u-01", 0.0, RiskLevel::Low, &[])];
        let segmentation = segment_users(&ranked, 4).unwrap();
        let report = build_report("roster", today(), &ranked, Some(&segmentation), 5);
        assert!(report.contains("No users above low risk."));
        assert!(report.contains("- low: 1 users (avg churn probability 0.00)"));
    }

    #[test]
    fn report_handles_empty_population() {
        let report = build_report("empty.csv", today(), &[], None, 10);
        assert!(report.contains("Generated for empty.csv (0 users, as of 2026-03-15)"));
        assert!(report.contains("No users with engagement history."));
        assert!(report.contains("No users above low risk."));
        assert!(report.ends_with("## Persona Segments\nNo users to segment.\n"));
    }
}
