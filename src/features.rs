use std::collections::VecDeque;
use std::f64::consts::PI;
use chrono::{Datelike, FixedOffset, Timelike};
use crate::aqi::{overall_aqi, AqiCategory};
use crate::errors::AqiError;
use crate::models::readings::Reading;

/// Version of the feature layout below. Any change to count or order must bump it,
/// since trained model artifacts are bound to one version.
pub const FEATURE_SCHEMA_VERSION: u32 = 1;

pub const FEATURE_NAMES: [&str; 38] = [
    "temperature", "humidity", "pressure", "wind_speed", "wind_direction", "precipitation",
    "pm10", "pm25", "co", "no2", "o3", "so2",
    "hour", "day", "month", "weekday", "is_weekend",
    "hour_sin", "hour_cos", "weekday_sin", "weekday_cos", "month_sin", "month_cos",
    "aqi_change_1h", "aqi_change_3h", "aqi_change_6h",
    "aqi_ma_3h", "aqi_ma_6h", "aqi_ma_12h", "aqi_ma_24h",
    "aqi_lag_1h", "aqi_lag_3h", "aqi_lag_6h",
    "temp_humidity_interaction", "wind_pollution_ratio", "pressure_stability",
    "season_encoded", "aqi_category_encoded",
];

pub const FEATURE_COUNT: usize = FEATURE_NAMES.len();

/// Number of hourly entries kept in a history window
pub const HISTORY_CAPACITY: usize = 24;

/// Number of pressures (current included) the pressure stability is computed over
const PRESSURE_WINDOW: usize = 6;

/// One prior hour as seen by the rolling features
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HistoryEntry {
    pub aqi: f64,
    pub pressure: f64,
}

/// Bounded window of prior hourly entries, oldest first
#[derive(Clone, Debug, Default, PartialEq)]
pub struct History {
    entries: VecDeque<HistoryEntry>,
}

impl History {
    pub fn new() -> History {
        History { entries: VecDeque::with_capacity(HISTORY_CAPACITY) }
    }

    /// Builds a history from prior hourly readings ordered oldest first. Only the last
    /// HISTORY_CAPACITY readings are kept.
    ///
    /// # Arguments
    ///
    /// * 'readings' - prior readings, oldest first
    pub fn from_readings(readings: &[Reading]) -> Result<History, AqiError> {
        let mut history = History::new();
        for r in readings {
            history.push(HistoryEntry { aqi: overall_aqi(&r.pollutants)?, pressure: r.weather.pressure });
        }

        Ok(history)
    }

    /// Appends the most recent entry, dropping the oldest one if the window is full
    ///
    /// # Arguments
    ///
    /// * 'entry' - the entry to append
    pub fn push(&mut self, entry: HistoryEntry) {
        if self.entries.len() == HISTORY_CAPACITY {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the entry 'hours' hours back, 1 being the most recent one
    fn back(&self, hours: usize) -> Option<&HistoryEntry> {
        if hours == 0 || hours > self.entries.len() {
            None
        } else {
            self.entries.get(self.entries.len() - hours)
        }
    }
}

/// Engineered features for one reading, ordered as FEATURE_NAMES
#[derive(Clone, Debug, PartialEq)]
pub struct FeatureVector {
    values: Vec<f64>,
}

impl FeatureVector {
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the value of a named feature
    ///
    /// # Arguments
    ///
    /// * 'name' - name as listed in FEATURE_NAMES
    pub fn get(&self, name: &str) -> Option<f64> {
        FEATURE_NAMES.iter().position(|n| *n == name).and_then(|i| self.values.get(i).copied())
    }
}

/// Transforms readings into feature vectors. Time features are taken in the local time
/// of the location, given by a fixed UTC offset.
#[derive(Clone, Copy, Debug)]
pub struct FeatureEngineer {
    offset: FixedOffset,
}

impl FeatureEngineer {
    /// Returns a new FeatureEngineer
    ///
    /// # Arguments
    ///
    /// * 'utc_offset_hours' - offset of the location's local time from UTC
    pub fn new(utc_offset_hours: i32) -> Result<FeatureEngineer, AqiError> {
        let offset = FixedOffset::east_opt(utc_offset_hours * 3600)
            .ok_or_else(|| AqiError::InvalidInput(format!("utc offset {} out of range", utc_offset_hours)))?;

        Ok(FeatureEngineer { offset })
    }

    /// Builds the feature vector for a reading given the hours preceding it.
    ///
    /// Rolling features with too little history fall back to the current AQI, which makes
    /// the corresponding change features zero. Pressure stability is zero until a full
    /// window of pressures is available.
    ///
    /// # Arguments
    ///
    /// * 'reading' - the reading to build features for
    /// * 'history' - prior hourly entries
    pub fn engineer(&self, reading: &Reading, history: &History) -> Result<FeatureVector, AqiError> {
        reading.validate()?;
        let w = &reading.weather;
        let p = &reading.pollutants;

        let aqi = overall_aqi(p)?;
        let local = reading.timestamp().with_timezone(&self.offset);

        let hour = local.hour() as f64;
        let weekday = local.weekday().num_days_from_monday() as f64;
        let month = local.month() as f64;
        let (hour_sin, hour_cos) = cyclical(hour, 24.0);
        let (weekday_sin, weekday_cos) = cyclical(weekday, 7.0);
        let (month_sin, month_cos) = cyclical(month, 12.0);

        let lag = |hours: usize| history.back(hours).map_or(aqi, |e| e.aqi);
        let ma = |window: usize| moving_average(aqi, history, window);

        let values = vec![
            w.temperature, w.humidity, w.pressure, w.wind_speed, w.wind_direction, w.precipitation,
            p.pm10, p.pm25, p.co, p.no2, p.o3, p.so2,
            hour, local.day() as f64, month, weekday, if weekday >= 5.0 { 1.0 } else { 0.0 },
            hour_sin, hour_cos, weekday_sin, weekday_cos, month_sin, month_cos,
            aqi - lag(1), aqi - lag(3), aqi - lag(6),
            ma(3), ma(6), ma(12), ma(24),
            lag(1), lag(3), lag(6),
            w.temperature * w.humidity,
            w.wind_speed / (p.pm25 + 1.0),
            pressure_stability(w.pressure, history),
            season(local.month()),
            AqiCategory::from_aqi(aqi).encoded(),
        ];
        debug_assert_eq!(values.len(), FEATURE_COUNT);

        Ok(FeatureVector { values })
    }
}

/// Sine/cosine encoding of a periodic value
///
/// # Arguments
///
/// * 'value' - the value, e.g. hour of day
/// * 'period' - length of the period, e.g. 24 for hours
pub fn cyclical(value: f64, period: f64) -> (f64, f64) {
    let angle = 2.0 * PI * value / period;
    (angle.sin(), angle.cos())
}

/// Season encoding: 0 winter, 1 spring, 2 summer, 3 autumn
///
/// # Arguments
///
/// * 'month' - month number, 1-12
pub fn season(month: u32) -> f64 {
    match month {
        12 | 1 | 2 => 0.0,
        3..=5 => 1.0,
        6..=8 => 2.0,
        _ => 3.0,
    }
}

/// Mean of the current value and the window - 1 preceding ones, or the current value
/// if the history is too short
fn moving_average(current: f64, history: &History, window: usize) -> f64 {
    if history.len() < window - 1 {
        return current;
    }
    let sum = current + (1..window).filter_map(|h| history.back(h)).map(|e| e.aqi).sum::<f64>();

    sum / window as f64
}

/// Sample standard deviation of the last PRESSURE_WINDOW pressures, current included
fn pressure_stability(current: f64, history: &History) -> f64 {
    if history.len() < PRESSURE_WINDOW - 1 {
        return 0.0;
    }
    let mut window = vec![current];
    window.extend((1..PRESSURE_WINDOW).filter_map(|h| history.back(h)).map(|e| e.pressure));

    let n = window.len() as f64;
    let mean = window.iter().sum::<f64>() / n;
    let var = window.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / (n - 1.0);

    var.sqrt()
}
