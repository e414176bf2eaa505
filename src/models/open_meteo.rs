use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde::de::Error;

/// Time format used by Open-Meteo when asked for `timeformat=iso8601` (the default)
const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M";

#[derive(Deserialize)]
pub struct CurrentWeather {
    #[serde(deserialize_with = "deserialize_gmt_time")]
    pub time: DateTime<Utc>,
    pub temperature_2m: Option<f64>,
    pub relative_humidity_2m: Option<f64>,
    pub surface_pressure: Option<f64>,
    pub wind_speed_10m: Option<f64>,
    pub wind_direction_10m: Option<f64>,
    pub precipitation: Option<f64>,
}

#[derive(Deserialize)]
pub struct CurrentWeatherResult {
    pub current: CurrentWeather,
}

#[derive(Deserialize)]
pub struct CurrentAirQuality {
    #[serde(deserialize_with = "deserialize_gmt_time")]
    pub time: DateTime<Utc>,
    pub pm10: Option<f64>,
    pub pm2_5: Option<f64>,
    pub carbon_monoxide: Option<f64>,
    pub nitrogen_dioxide: Option<f64>,
    pub sulphur_dioxide: Option<f64>,
    pub ozone: Option<f64>,
}

#[derive(Deserialize)]
pub struct CurrentAirQualityResult {
    pub current: CurrentAirQuality,
}

#[derive(Deserialize)]
pub struct HourlyWeather {
    #[serde(deserialize_with = "deserialize_gmt_times")]
    pub time: Vec<DateTime<Utc>>,
    pub temperature_2m: Vec<Option<f64>>,
    pub relative_humidity_2m: Vec<Option<f64>>,
    pub surface_pressure: Vec<Option<f64>>,
    pub wind_speed_10m: Vec<Option<f64>>,
    pub wind_direction_10m: Vec<Option<f64>>,
    pub precipitation: Vec<Option<f64>>,
}

#[derive(Deserialize)]
pub struct HourlyWeatherResult {
    pub hourly: HourlyWeather,
}

#[derive(Deserialize)]
pub struct HourlyAirQuality {
    #[serde(deserialize_with = "deserialize_gmt_times")]
    pub time: Vec<DateTime<Utc>>,
    pub pm10: Vec<Option<f64>>,
    pub pm2_5: Vec<Option<f64>>,
    pub carbon_monoxide: Vec<Option<f64>>,
    pub nitrogen_dioxide: Vec<Option<f64>>,
    pub sulphur_dioxide: Vec<Option<f64>>,
    pub ozone: Vec<Option<f64>>,
}

#[derive(Deserialize)]
pub struct HourlyAirQualityResult {
    pub hourly: HourlyAirQuality,
}

fn parse_gmt_time(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    Ok(NaiveDateTime::parse_from_str(s, TIME_FORMAT)?.and_utc())
}

fn deserialize_gmt_time<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where D: Deserializer<'de> {

    let s = String::deserialize(deserializer)?;
    parse_gmt_time(&s).map_err(Error::custom)
}

fn deserialize_gmt_times<'de, D>(deserializer: D) -> Result<Vec<DateTime<Utc>>, D::Error>
where D: Deserializer<'de> {

    let v = Vec::<String>::deserialize(deserializer)?;
    v.iter()
        .map(|s| parse_gmt_time(s).map_err(Error::custom))
        .collect()
}
