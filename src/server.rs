use std::sync::Arc;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use log::{error, info, warn};
use serde::Serialize;
use crate::errors::{AqiError, ApiError, FetchError, PredictError};
use crate::features::{History, FEATURE_SCHEMA_VERSION};
use crate::initialization::AppState;
use crate::models::forecast::{ForecastResult, SinglePrediction};
use crate::models::readings::Reading;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    data_connectivity: bool,
    model_loaded: bool,
    schema_version: u32,
    timestamp: DateTime<Utc>,
}

#[derive(Serialize)]
struct SingleResponse {
    aqi: f64,
    current_aqi: f64,
    category: String,
    prediction_time: DateTime<Utc>,
    status: &'static str,
    timestamp: DateTime<Utc>,
}

#[derive(Serialize)]
struct ForecastResponse {
    day1_aqi: f64,
    day2_aqi: f64,
    day3_aqi: f64,
    prediction_times: [DateTime<Utc>; 3],
    status: &'static str,
    timestamp: DateTime<Utc>,
}

#[derive(Serialize)]
struct ErrorBody {
    status: &'static str,
    message: &'static str,
}

/// Maps handler errors to a status code and a summary safe to hand out. The full cause
/// is logged.
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Fetch(FetchError::InvalidInput(_))
            | ApiError::Predict(PredictError::InvalidInput(AqiError::InvalidInput(_))) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "invalid input data")
            },
            ApiError::Fetch(_) => (StatusCode::SERVICE_UNAVAILABLE, "upstream data unavailable"),
            ApiError::Predict(_) => (StatusCode::INTERNAL_SERVER_ERROR, "prediction unavailable"),
            ApiError::Worker(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal error"),
        };
        error!("{}: {}", message, self);

        (status, Json(ErrorBody { status: "error", message })).into_response()
    }
}

/// Returns the router serving the json api and the dashboard
///
/// # Arguments
///
/// * 'state' - shared application state
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(dashboard))
        .route("/health", get(health))
        .route("/predict", get(predict))
        .route("/predict/single", get(predict_single))
        .with_state(state)
}

/// Runs blocking fetch and inference work off the async runtime
async fn blocking<T, F>(state: &Arc<AppState>, f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&AppState) -> Result<T, ApiError> + Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(state.as_ref()))
        .await
        .map_err(|e| ApiError::Worker(e.to_string()))?
}

/// Fetches the latest reading and the hours before it
fn latest_inputs(state: &AppState) -> Result<(Reading, History), ApiError> {
    let reading = state.fetcher.current(&state.location)?;
    let history = state.fetcher.recent_history(&state.location, reading.timestamp())?;

    Ok((reading, history))
}

fn run_forecast(state: &AppState) -> Result<ForecastResult, ApiError> {
    let (reading, history) = latest_inputs(state)?;
    Ok(state.predictor.forecast(&reading, &history)?)
}

fn run_single(state: &AppState) -> Result<SinglePrediction, ApiError> {
    let (reading, history) = latest_inputs(state)?;
    Ok(state.predictor.single(&reading, &history)?)
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let data_connectivity = blocking(&state, |s| Ok(s.fetcher.ping(&s.location)?)).await.is_ok();
    if !data_connectivity {
        warn!("health check: upstream data unavailable");
    }

    Json(HealthResponse {
        status: if data_connectivity { "healthy" } else { "degraded" },
        data_connectivity,
        model_loaded: true,
        schema_version: FEATURE_SCHEMA_VERSION,
        timestamp: Utc::now(),
    })
}

async fn predict(State(state): State<Arc<AppState>>) -> Result<Json<ForecastResponse>, ApiError> {
    let forecast = blocking(&state, run_forecast).await?;
    info!("forecast for {}: {:.1}, {:.1}, {:.1}", state.city_name,
        forecast.days[0].aqi, forecast.days[1].aqi, forecast.days[2].aqi);

    Ok(Json(ForecastResponse {
        day1_aqi: round2(forecast.days[0].aqi),
        day2_aqi: round2(forecast.days[1].aqi),
        day3_aqi: round2(forecast.days[2].aqi),
        prediction_times: forecast.days.each_ref().map(|d| d.prediction_time),
        status: "success",
        timestamp: forecast.generated_at,
    }))
}

async fn predict_single(State(state): State<Arc<AppState>>) -> Result<Json<SingleResponse>, ApiError> {
    let prediction = blocking(&state, run_single).await?;

    Ok(Json(SingleResponse {
        aqi: round2(prediction.aqi),
        current_aqi: prediction.current_aqi,
        category: prediction.category.to_string(),
        prediction_time: prediction.prediction_time,
        status: "success",
        timestamp: Utc::now(),
    }))
}

async fn dashboard(State(state): State<Arc<AppState>>) -> Result<Html<String>, ApiError> {
    let forecast = blocking(&state, run_forecast).await?;

    Ok(Html(render_dashboard(&state.city_name, &forecast)))
}

/// Renders the forecast as three category colored day cards
///
/// # Arguments
///
/// * 'city_name' - name shown in the heading
/// * 'forecast' - the forecast to render
fn render_dashboard(city_name: &str, forecast: &ForecastResult) -> String {
    let cards = forecast.days.iter().enumerate()
        .map(|(i, d)| {
            let (background, text) = d.category.colors();
            format!(
                r#"<div class="card" style="background:{};color:{}"><h2>Day {}</h2><p>{}</p><p class="aqi">{:.0}</p><p>{}</p></div>"#,
                background, text, i + 1, d.prediction_time.format("%a %Y-%m-%d"), d.aqi, d.category)
        })
        .collect::<Vec<String>>()
        .join("\n");

    format!(r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{city} AQI forecast</title>
<style>
body {{ font-family: sans-serif; margin: 2em; }}
.cards {{ display: flex; gap: 1em; }}
.card {{ flex: 1; padding: 1em; border-radius: 8px; text-align: center; }}
.aqi {{ font-size: 3em; font-weight: bold; margin: 0.2em; }}
</style>
</head>
<body>
<h1>{city} AQI forecast</h1>
<div class="cards">
{cards}
</div>
<p>Generated {generated}</p>
</body>
</html>
"#, city = city_name, cards = cards, generated = forecast.generated_at.format("%Y-%m-%d %H:%M UTC"))
}
