use chrono::{DateTime, Utc};
use serde::Serialize;
use crate::aqi::AqiCategory;

/// One predicted AQI value and the time it is predicted for
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct DayForecast {
    pub prediction_time: DateTime<Utc>,
    pub aqi: f64,
    pub category: AqiCategory,
}

/// Three day forecast produced by one predictor invocation
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct ForecastResult {
    pub generated_at: DateTime<Utc>,
    pub days: [DayForecast; 3],
}

/// Prediction for the time of the latest reading, together with the observed AQI
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct SinglePrediction {
    pub prediction_time: DateTime<Utc>,
    pub aqi: f64,
    pub current_aqi: f64,
    pub category: AqiCategory,
}
