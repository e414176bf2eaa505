use std::sync::Arc;
use log::info;
use crate::config::Config;
use crate::errors::InitError;
use crate::features::FeatureEngineer;
use crate::manager_open_meteo::{Location, OpenMeteo};
use crate::predictor::{load_artifacts, Predictor};

/// Everything the http handlers share: where to forecast for, how to get data and the
/// loaded model
pub struct AppState {
    pub city_name: String,
    pub location: Location,
    pub fetcher: OpenMeteo,
    pub predictor: Predictor,
}

/// Builds the application state from configuration, talking to Open-Meteo over http
///
/// # Arguments
///
/// * 'config' - the loaded configuration
pub fn init(config: &Config) -> Result<AppState, InitError> {
    info!("aqicast version: {}", env!("CARGO_PKG_VERSION"));

    build_state(config, OpenMeteo::new(&config.upstream))
}

/// Builds the application state using the given fetcher. Fails if the model artifact
/// can't be loaded or doesn't match the feature schema.
///
/// # Arguments
///
/// * 'config' - the loaded configuration
/// * 'fetcher' - the data fetcher to use
pub fn build_state(config: &Config, fetcher: OpenMeteo) -> Result<AppState, InitError> {
    let location = Location { lat: config.geo_ref.lat, long: config.geo_ref.long };
    location.validate()?;

    let (model, scaler) = load_artifacts(&config.model.model_path, &config.model.scaler_path)?;
    let engineer = FeatureEngineer::new(config.geo_ref.utc_offset_hours)?;
    let predictor = Predictor::new(engineer, scaler, Arc::new(model), config.sensitivity.clone())?;
    info!("model loaded from {}", config.model.model_path);

    Ok(AppState {
        city_name: config.geo_ref.city_name.clone(),
        location,
        fetcher,
        predictor,
    })
}
