use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod adoption;
mod catalog;
mod churn;
mod error;
mod import;
mod models;
mod report;
mod roi;
mod segment;
mod server;

use models::OrganizationProfile;

#[derive(Parser)]
#[command(name = "adoption-insights")]
#[command(about = "Adoption forecasting, ROI projection, segmentation and churn scoring", long_about = None)]
struct Cli {
    /// Print results as JSON instead of a summary
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP prediction service
    Serve {
        #[arg(long, env = "HOST", default_value = "0.0.0.0")]
        host: IpAddr,
        #[arg(long, env = "PORT", default_value_t = 8000)]
        port: u16,
    },
    /// Forecast adoption from a CSV with an adoption_rate column
    Forecast {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long, default_value_t = adoption::DEFAULT_FORECAST_PERIODS, allow_negative_numbers = true)]
        periods: i64,
    },
    /// Project three-year ROI for an organization
    Roi {
        #[arg(long)]
        employees: i64,
        #[arg(long, default_value = "default")]
        industry: String,
        #[arg(long, default_value = "medium")]
        size: String,
    },
    /// Size persona segments for a user roster CSV
    Segment {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long, default_value_t = segment::DEFAULT_SEGMENT_COUNT)]
        segments: usize,
    },
    /// Score churn risk from a user_id,date,interactions CSV
    Churn {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long)]
        user: Option<String>,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Generate a markdown adoption health report
    Report {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "adoption_insights=info,tower_http=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let json = cli.json;

    match cli.command {
        Commands::Serve { host, port } => {
            server::serve(SocketAddr::new(host, port)).await?;
        }
        Commands::Forecast { csv, periods } => {
            let history = import::load_history(&csv)?;
            let forecast = adoption::forecast_adoption(&history, periods, Utc::now())?;

            if json {
                return print_json(&forecast);
            }
            println!(
                "Adoption forecast from {} historical points:",
                history.len()
            );
            for (point, band) in forecast
                .predictions
                .iter()
                .zip(forecast.confidence_intervals.iter())
            {
                println!(
                    "- period {} ({}): {:.2}% [{:.2}% - {:.2}%]",
                    point.period,
                    point.timestamp.date_naive(),
                    point.adoption_rate,
                    band.lower_bound,
                    band.upper_bound
                );
            }
        }
        Commands::Roi {
            employees,
            industry,
            size,
        } => {
            let projection = roi::estimate_roi(&OrganizationProfile {
                employee_count: employees,
                industry,
                company_size: size,
            })?;

            if json {
                return print_json(&projection);
            }
            println!(
                "Predicted ROI {:.2}% (confidence {:.2}), breakeven in month {}",
                projection.predicted_roi, projection.confidence_score, projection.breakeven_month
            );
            for (year, values) in [projection.year1, projection.year2, projection.year3]
                .iter()
                .enumerate()
            {
                println!(
                    "- year {}: costs {:.2}, benefits {:.2}, roi {:.2}%",
                    year + 1,
                    values.costs,
                    values.benefits,
                    values.roi_percent
                );
            }
        }
        Commands::Segment { csv, segments } => {
            let users = import::load_users(&csv)?;
            let segmentation = segment::segment_users(&users, segments)?;

            if json {
                return print_json(&segmentation);
            }
            println!("Segments for {} users:", users.len());
            for segment in segmentation.segments.iter() {
                println!(
                    "- {} ({}): {} users",
                    segment.name, segment.segment_id, segment.size
                );
            }
        }
        Commands::Churn { csv, user, limit } => {
            let histories = import::load_engagement(&csv)?;
            let today = Utc::now().date_naive();

            if let Some(user_id) = user {
                let history = histories
                    .get(&user_id)
                    .with_context(|| format!("no engagement records for user {user_id}"))?;
                let assessment = churn::assess_churn(history, today)?;

                if json {
                    return print_json(&assessment);
                }
                println!(
                    "{} churn probability {:.2} ({} risk)",
                    user_id, assessment.churn_probability, assessment.risk_level
                );
                for factor in assessment.risk_factors.iter() {
                    println!("- {factor}");
                }
                println!("Recommended interventions:");
                for item in catalog::interventions(assessment.risk_level) {
                    println!("- {item}");
                }
                return Ok(());
            }

            let ranked = churn::rank_users(&histories, today)?;
            if json {
                return print_json(&ranked);
            }
            if ranked.is_empty() {
                println!("No engagement records found.");
                return Ok(());
            }

            println!("Top users by churn probability:");
            for user in ranked.iter().take(limit) {
                println!(
                    "- {} probability {:.2} ({} risk) across {} records",
                    user.user_id,
                    user.assessment.churn_probability,
                    user.assessment.risk_level,
                    user.record_count
                );
            }
        }
        Commands::Report { csv, out, limit } => {
            let histories = import::load_engagement(&csv)?;
            let today = Utc::now().date_naive();
            let ranked = churn::rank_users(&histories, today)?;
            let segmentation = if ranked.is_empty() {
                None
            } else {
                Some(segment::segment_users(
                    &ranked,
                    segment::DEFAULT_SEGMENT_COUNT,
                )?)
            };
            let report = report::build_report(
                &csv.display().to_string(),
                today,
                &ranked,
                segmentation.as_ref(),
                limit,
            );
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
