use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoricalPoint {
    pub adoption_rate: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub period: u32,
    pub adoption_rate: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceBand {
    pub period: u32,
    pub lower_bound: f64,
    pub upper_bound: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdoptionForecast {
    pub predictions: Vec<ForecastPoint>,
    pub confidence_intervals: Vec<ConfidenceBand>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganizationProfile {
    pub employee_count: i64,
    pub industry: String,
    pub company_size: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct YearProjection {
    pub costs: f64,
    pub benefits: f64,
    #[serde(rename = "roi")]
    pub roi_percent: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RoiProjection {
    pub predicted_roi: f64,
    pub year1: YearProjection,
    pub year2: YearProjection,
    pub year3: YearProjection,
    pub breakeven_month: u32,
    pub confidence_score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentId {
    Champions,
    Engaged,
    Casual,
    AtRisk,
}

impl SegmentId {
    pub fn as_str(self) -> &'static str {
        match self {
            SegmentId::Champions => "champions",
            SegmentId::Engaged => "engaged",
            SegmentId::Casual => "casual",
            SegmentId::AtRisk => "at_risk",
        }
    }
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentCharacteristics {
    pub engagement_score: u8,
    pub proficiency_level: &'static str,
    pub adoption_stage: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segment {
    pub segment_id: SegmentId,
    pub name: &'static str,
    pub size: usize,
    pub characteristics: SegmentCharacteristics,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segmentation {
    pub segments: Vec<Segment>,
    pub recommendations: BTreeMap<SegmentId, Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngagementRecord {
    #[serde(deserialize_with = "deserialize_activity_date")]
    pub date: NaiveDate,
    pub interactions: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChurnAssessment {
    pub churn_probability: f64,
    pub risk_level: RiskLevel,
    pub risk_factors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserChurn {
    pub user_id: String,
    pub assessment: ChurnAssessment,
    pub record_count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RiskLevelSummary {
    pub risk_level: RiskLevel,
    pub count: usize,
    pub avg_probability: f64,
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Accepts a plain date or a full timestamp; only the calendar day is kept.
pub fn parse_activity_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    raw.parse::<NaiveDate>()
        .ok()
        .or_else(|| raw.parse::<NaiveDateTime>().ok().map(|dt| dt.date()))
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
                .ok()
                .map(|dt| dt.date())
        })
        .or_else(|| {
            DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|dt| dt.date_naive())
        })
}

pub fn deserialize_activity_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_activity_date(&raw).ok_or_else(|| de::Error::custom(format!("invalid date `{raw}`")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activity_dates_accept_timestamps() {
        let day = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        assert_eq!(parse_activity_date("2026-01-01"), Some(day));
        assert_eq!(parse_activity_date("2026-01-01T10:00:00"), Some(day));
        assert_eq!(parse_activity_date("2026-01-01 10:00:00.250"), Some(day));
        assert_eq!(parse_activity_date("2026-01-01T23:30:00+02:00"), Some(day));
        assert_eq!(parse_activity_date("2026-01-01T10:00:00Z"), Some(day));
        assert_eq!(parse_activity_date("yesterday"), None);
    }

    #[test]
    fn engagement_record_deserializes_timestamp() {
        let record: EngagementRecord =
            serde_json::from_str(r#"{"date": "2026-01-01T10:00:00", "interactions": 3}"#).unwrap();
        assert_eq!(record.date, NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());
        assert_eq!(record.interactions, 3.0);
    }
}
