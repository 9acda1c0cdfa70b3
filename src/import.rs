use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use anyhow::Context;
use chrono::NaiveDate;

use crate::models::{EngagementRecord, HistoricalPoint};

pub fn load_history(path: &Path) -> anyhow::Result<Vec<HistoricalPoint>> {
    let file = open(path)?;
    parse_history(file).with_context(|| format!("failed to parse {}", path.display()))
}

pub fn parse_history<R: Read>(input: R) -> anyhow::Result<Vec<HistoricalPoint>> {
    let mut reader = csv::Reader::from_reader(input);
    let mut points = Vec::new();
    for result in reader.deserialize::<HistoricalPoint>() {
        points.push(result?);
    }
    Ok(points)
}

pub fn load_users(path: &Path) -> anyhow::Result<Vec<csv::StringRecord>> {
    let file = open(path)?;
    parse_users(file).with_context(|| format!("failed to parse {}", path.display()))
}

pub fn parse_users<R: Read>(input: R) -> anyhow::Result<Vec<csv::StringRecord>> {
    let mut reader = csv::Reader::from_reader(input);
    let mut users = Vec::new();
    for result in reader.records() {
        users.push(result?);
    }
    Ok(users)
}

pub fn load_engagement(path: &Path) -> anyhow::Result<BTreeMap<String, Vec<EngagementRecord>>> {
    let file = open(path)?;
    parse_engagement(file).with_context(|| format!("failed to parse {}", path.display()))
}

pub fn parse_engagement<R: Read>(
    input: R,
) -> anyhow::Result<BTreeMap<String, Vec<EngagementRecord>>> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        user_id: String,
        #[serde(deserialize_with = "crate::models::deserialize_activity_date")]
        date: NaiveDate,
        interactions: f64,
    }

    let mut reader = csv::Reader::from_reader(input);
    let mut histories: BTreeMap<String, Vec<EngagementRecord>> = BTreeMap::new();

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        histories
            .entry(row.user_id)
            .or_default()
            .push(EngagementRecord {
                date: row.date,
                interactions: row.interactions,
            });
    }

    for history in histories.values_mut() {
        history.sort_by_key(|record| record.date);
    }

    Ok(histories)
}

fn open(path: &Path) -> anyhow::Result<std::fs::File> {
    std::fs::File::open(path).with_context(|| format!("failed to open {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_keeps_row_order_and_blank_rates() {
        let input = "period,adoption_rate\n2026-01,42.5\n2026-02,\n2026-03,55\n";
        let points = parse_history(input.as_bytes()).unwrap();
        assert_eq!(points.len(), 3);
        assert_eq!(points[0].adoption_rate, Some(42.5));
        assert_eq!(points[1].adoption_rate, None);
        assert_eq!(points[2].adoption_rate, Some(55.0));
    }

    #[test]
    fn history_without_rate_column_reads_as_missing() {
        let points = parse_history("period\n1\n2\n".as_bytes()).unwrap();
        assert!(points.iter().all(|p| p.adoption_rate.is_none()));
    }

    #[test]
    fn users_count_data_rows() {
        let input = "user_id,department\nu1,sales\nu2,finance\nu3,sales\n";
        assert_eq!(parse_users(input.as_bytes()).unwrap().len(), 3);
    }

    #[test]
    fn engagement_groups_and_sorts_per_user() {
        let input = "user_id,date,interactions\n\
                     u2,2026-02-03,4\n\
                     u1,2026-02-05,1\n\
                     u1,2026-02-01,6\n";
        let histories = parse_engagement(input.as_bytes()).unwrap();
        assert_eq!(histories.len(), 2);

        let u1 = &histories["u1"];
        assert_eq!(u1[0].date, NaiveDate::from_ymd_opt(2026, 2, 1).unwrap());
        assert_eq!(u1[1].interactions, 1.0);
        assert_eq!(histories["u2"].len(), 1);
    }

    #[test]
    fn engagement_accepts_timestamps() {
        let input = "user_id,date,interactions\nu1,2026-02-01T08:15:00,2\n";
        let histories = parse_engagement(input.as_bytes()).unwrap();
        assert_eq!(histories["u1"][0].date, NaiveDate::from_ymd_opt(2026, 2, 1).unwrap());
    }

    #[test]
    fn engagement_rejects_bad_dates() {
        let input = "user_id,date,interactions\nu1,yesterday,3\n";
        assert!(parse_engagement(input.as_bytes()).is_err());
    }
}
