use std::fs;
use log::LevelFilter;
use serde::Deserialize;
use crate::errors::ConfigError;

#[derive(Deserialize, Clone)]
pub struct GeoRef {
    pub city_name: String,
    pub lat: f64,
    pub long: f64,
    pub utc_offset_hours: i32,
}

#[derive(Deserialize, Clone)]
pub struct UpstreamParameters {
    pub weather_url: String,
    pub air_quality_url: String,
    pub archive_url: String,
    pub timeout_secs: u64,
    pub max_chunk_days: u32,
    pub cache_ttl_secs: u64,
    pub retry_attempts: u32,
    pub retry_backoff_ms: u64,
}

#[derive(Deserialize, Clone)]
pub struct ModelFiles {
    pub model_path: String,
    pub scaler_path: String,
}

#[derive(Deserialize, Clone)]
pub struct SensitivityParameters {
    pub enabled: bool,
    pub pm25_baseline: f64,
    pub pm10_baseline: f64,
    pub pm25_coefficient: f64,
    pub pm10_coefficient: f64,
    pub max_adjustment: f64,
    pub day_decay: f64,
}

#[derive(Deserialize, Clone)]
pub struct ServerParameters {
    pub bind_address: String,
    pub port: u16,
}

#[derive(Deserialize, Clone)]
pub struct General {
    pub log_path: String,
    pub log_level: LevelFilter,
    pub log_to_stdout: bool,
}

#[derive(Deserialize, Clone)]
pub struct Config {
    pub geo_ref: GeoRef,
    pub upstream: UpstreamParameters,
    pub model: ModelFiles,
    pub sensitivity: SensitivityParameters,
    pub server: ServerParameters,
    pub general: General,
}

/// Loads the configuration file and returns a struct with all configuration items
///
/// # Arguments
///
/// * 'config_path' - path to the configuration file
pub fn load_config(config_path: &str) -> Result<Config, ConfigError> {

    let toml = fs::read_to_string(config_path)?;
    let config: Config = toml::from_str(&toml)?;

    validate(&config)?;

    Ok(config)
}

/// Checks values that would otherwise surface as confusing runtime errors
///
/// # Arguments
///
/// * 'config' - the configuration to check
fn validate(config: &Config) -> Result<(), ConfigError> {
    if !(-90.0..=90.0).contains(&config.geo_ref.lat) || !(-180.0..=180.0).contains(&config.geo_ref.long) {
        return Err(ConfigError::from("geo_ref lat/long out of range"));
    }
    if config.geo_ref.utc_offset_hours.abs() > 14 {
        return Err(ConfigError::from("geo_ref utc_offset_hours out of range"));
    }
    if config.upstream.max_chunk_days == 0 {
        return Err(ConfigError::from("upstream max_chunk_days must be at least 1"));
    }
    if config.upstream.retry_attempts == 0 {
        return Err(ConfigError::from("upstream retry_attempts must be at least 1"));
    }
    if config.sensitivity.pm25_baseline <= 0.0 || config.sensitivity.pm10_baseline <= 0.0 {
        return Err(ConfigError::from("sensitivity baselines must be positive"));
    }
    if !(0.0..1.0).contains(&config.sensitivity.max_adjustment) {
        return Err(ConfigError::from("sensitivity max_adjustment must be in [0, 1)"));
    }
    if !(0.0..=1.0).contains(&config.sensitivity.day_decay) {
        return Err(ConfigError::from("sensitivity day_decay must be in [0, 1]"));
    }

    Ok(())
}
