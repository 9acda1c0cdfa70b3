use std::net::SocketAddr;

use anyhow::Context;
use axum::{
    body::Body,
    extract::Request,
    http::{header, HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, Span};
use uuid::Uuid;

use crate::adoption::{self, DEFAULT_FORECAST_PERIODS};
use crate::catalog;
use crate::churn;
use crate::error::EngineError;
use crate::models::{
    ConfidenceBand, EngagementRecord, ForecastPoint, HistoricalPoint, OrganizationProfile,
    RiskLevel, Segment, SegmentId, YearProjection,
};
use crate::roi;
use crate::segment::{self, DEFAULT_SEGMENT_COUNT};

const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Debug)]
pub struct ApiError(EngineError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "detail": self.0.to_string() })),
        )
            .into_response()
    }
}

fn log_failure(operation: &'static str) -> impl Fn(EngineError) -> ApiError {
    move |err| {
        error!(error = %err, "error {operation}");
        ApiError(err)
    }
}

#[derive(Debug, Deserialize)]
pub struct AdoptionPredictionRequest {
    pub organization_id: String,
    pub historical_data: Vec<HistoricalPoint>,
    #[serde(default = "default_forecast_periods")]
    pub forecast_periods: i64,
}

fn default_forecast_periods() -> i64 {
    DEFAULT_FORECAST_PERIODS
}

#[derive(Debug, Serialize)]
pub struct AdoptionPredictionResponse {
    pub organization_id: String,
    pub predictions: Vec<ForecastPoint>,
    pub confidence_intervals: Vec<ConfidenceBand>,
    pub key_drivers: Vec<String>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct RoiPredictionRequest {
    pub organization_id: String,
    pub employee_count: i64,
    pub industry: String,
    pub company_size: String,
    /// Accepted for compatibility; not used by the estimator.
    #[allow(dead_code)]
    #[serde(default)]
    pub historical_costs: Option<Vec<f64>>,
    #[allow(dead_code)]
    #[serde(default)]
    pub historical_benefits: Option<Vec<f64>>,
}

#[derive(Debug, Serialize)]
pub struct RoiPredictionResponse {
    pub organization_id: String,
    pub predicted_roi: f64,
    pub year1_projection: YearProjection,
    pub year2_projection: YearProjection,
    pub year3_projection: YearProjection,
    pub breakeven_month: u32,
    pub confidence_score: f64,
}

#[derive(Debug, Deserialize)]
pub struct UserSegmentationRequest {
    pub organization_id: String,
    pub user_data: Vec<serde_json::Value>,
    #[serde(default = "default_segment_count")]
    pub n_segments: usize,
}

fn default_segment_count() -> usize {
    DEFAULT_SEGMENT_COUNT
}

#[derive(Debug, Serialize)]
pub struct UserSegmentationResponse {
    pub organization_id: String,
    pub segments: Vec<Segment>,
    pub segment_characteristics: Vec<Segment>,
    pub recommendations: std::collections::BTreeMap<SegmentId, Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct ChurnPredictionRequest {
    pub organization_id: String,
    pub user_id: String,
    pub engagement_history: Vec<EngagementRecord>,
}

#[derive(Debug, Serialize)]
pub struct ChurnPredictionResponse {
    pub user_id: String,
    pub churn_probability: f64,
    pub risk_level: RiskLevel,
    pub key_risk_factors: Vec<String>,
    pub recommended_interventions: Vec<String>,
}

async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "status": "operational"
    }))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339()
    }))
}

pub async fn predict_adoption(
    Json(req): Json<AdoptionPredictionRequest>,
) -> Result<Json<AdoptionPredictionResponse>, ApiError> {
    info!(
        organization_id = %req.organization_id,
        points = req.historical_data.len(),
        "adoption forecast"
    );
    let forecast =
        adoption::forecast_adoption(&req.historical_data, req.forecast_periods, Utc::now())
            .map_err(log_failure("predicting adoption"))?;

    Ok(Json(AdoptionPredictionResponse {
        organization_id: req.organization_id,
        predictions: forecast.predictions,
        confidence_intervals: forecast.confidence_intervals,
        key_drivers: to_strings(catalog::ADOPTION_KEY_DRIVERS),
        recommendations: to_strings(catalog::ADOPTION_RECOMMENDATIONS),
    }))
}

pub async fn predict_roi(
    Json(req): Json<RoiPredictionRequest>,
) -> Result<Json<RoiPredictionResponse>, ApiError> {
    info!(organization_id = %req.organization_id, "roi projection");
    let profile = OrganizationProfile {
        employee_count: req.employee_count,
        industry: req.industry,
        company_size: req.company_size,
    };
    let projection = roi::estimate_roi(&profile).map_err(log_failure("predicting ROI"))?;

    Ok(Json(RoiPredictionResponse {
        organization_id: req.organization_id,
        predicted_roi: projection.predicted_roi,
        year1_projection: projection.year1,
        year2_projection: projection.year2,
        year3_projection: projection.year3,
        breakeven_month: projection.breakeven_month,
        confidence_score: projection.confidence_score,
    }))
}

pub async fn segment_users(
    Json(req): Json<UserSegmentationRequest>,
) -> Result<Json<UserSegmentationResponse>, ApiError> {
    info!(
        organization_id = %req.organization_id,
        users = req.user_data.len(),
        "user segmentation"
    );
    let segmentation = segment::segment_users(&req.user_data, req.n_segments)
        .map_err(log_failure("segmenting users"))?;

    Ok(Json(UserSegmentationResponse {
        organization_id: req.organization_id,
        segment_characteristics: segmentation.segments.clone(),
        segments: segmentation.segments,
        recommendations: segmentation.recommendations,
    }))
}

pub async fn predict_churn(
    Json(req): Json<ChurnPredictionRequest>,
) -> Result<Json<ChurnPredictionResponse>, ApiError> {
    info!(organization_id = %req.organization_id, user_id = %req.user_id, "churn prediction");
    let assessment = churn::assess_churn(&req.engagement_history, Utc::now().date_naive())
        .map_err(log_failure("predicting churn"))?;

    Ok(Json(ChurnPredictionResponse {
        user_id: req.user_id,
        churn_probability: assessment.churn_probability,
        risk_level: assessment.risk_level,
        key_risk_factors: assessment.risk_factors,
        recommended_interventions: to_strings(catalog::interventions(assessment.risk_level)),
    }))
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| item.to_string()).collect()
}

pub async fn request_id(request: Request, next: Next) -> Response {
    let id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    Span::current().record("request_id", id.as_str());

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&id) {
        response
            .headers_mut()
            .insert(header::HeaderName::from_static(REQUEST_ID_HEADER), value);
    }
    response
}

pub fn router() -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let trace = TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
        tracing::info_span!(
            "http",
            method = %request.method(),
            uri = %request.uri(),
            request_id = tracing::field::Empty,
        )
    });

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/predict/adoption", post(predict_adoption))
        .route("/predict/roi", post(predict_roi))
        .route("/segment/users", post(segment_users))
        .route("/predict/churn", post(predict_churn))
        .layer(middleware::from_fn(request_id))
        .layer(trace)
        .layer(cors)
}

pub async fn serve(addr: SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!(
        "{} v{} listening on {}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        addr
    );

    axum::serve(listener, router())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server terminated unexpectedly")
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
        return;
    }
    info!("shutdown signal received");
}
