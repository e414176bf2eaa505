use chrono::{DateTime, Utc};
use serde::Serialize;
use crate::errors::AqiError;

/// Weather conditions at one point in time, as delivered by the upstream API
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct WeatherReading {
    pub timestamp: DateTime<Utc>,
    pub temperature: f64,
    pub humidity: f64,
    pub pressure: f64,
    pub wind_speed: f64,
    pub wind_direction: f64,
    pub precipitation: f64,
}

/// Pollutant concentrations in µg/m³ at one point in time
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct PollutantReading {
    pub timestamp: DateTime<Utc>,
    pub pm25: f64,
    pub pm10: f64,
    pub co: f64,
    pub no2: f64,
    pub o3: f64,
    pub so2: f64,
}

/// A weather reading and a pollutant reading sharing the same timestamp
#[derive(Clone, Debug, PartialEq)]
pub struct Reading {
    pub weather: WeatherReading,
    pub pollutants: PollutantReading,
}

impl Reading {
    /// Pairs a weather and a pollutant reading. Both must carry the same timestamp.
    ///
    /// # Arguments
    ///
    /// * 'weather' - the weather part
    /// * 'pollutants' - the pollutant part
    pub fn new(weather: WeatherReading, pollutants: PollutantReading) -> Result<Reading, AqiError> {
        if weather.timestamp != pollutants.timestamp {
            return Err(AqiError::InvalidInput(format!(
                "weather at {} paired with pollutants at {}", weather.timestamp, pollutants.timestamp)));
        }
        Ok(Reading { weather, pollutants })
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.weather.timestamp
    }

    /// Returns a copy of this reading with both parts stamped at the given time
    ///
    /// # Arguments
    ///
    /// * 'timestamp' - the new timestamp
    pub fn restamped(&self, timestamp: DateTime<Utc>) -> Reading {
        let mut reading = self.clone();
        reading.weather.timestamp = timestamp;
        reading.pollutants.timestamp = timestamp;
        reading
    }

    /// Rejects readings holding NaN or infinite weather values
    pub fn validate(&self) -> Result<(), AqiError> {
        let w = &self.weather;
        let fields = [
            ("temperature", w.temperature),
            ("humidity", w.humidity),
            ("pressure", w.pressure),
            ("wind_speed", w.wind_speed),
            ("wind_direction", w.wind_direction),
            ("precipitation", w.precipitation),
        ];
        for (name, value) in fields {
            if !value.is_finite() {
                return Err(AqiError::InvalidInput(format!("{} is not a finite number", name)));
            }
        }
        if w.humidity < 0.0 || w.wind_speed < 0.0 || w.precipitation < 0.0 || w.pressure < 0.0 {
            return Err(AqiError::InvalidInput("negative weather value".to_string()));
        }

        Ok(())
    }
}

/// One row of collected training data: the aligned reading plus its computed AQI
#[derive(Serialize)]
pub struct ReadingRecord {
    pub datetime: DateTime<Utc>,
    pub temperature: f64,
    pub humidity: f64,
    pub pressure: f64,
    pub wind_speed: f64,
    pub wind_direction: f64,
    pub precipitation: f64,
    pub pm10: f64,
    pub pm25: f64,
    pub co: f64,
    pub no2: f64,
    pub o3: f64,
    pub so2: f64,
    pub aqi: f64,
}

impl ReadingRecord {
    pub fn new(reading: &Reading, aqi: f64) -> ReadingRecord {
        let w = &reading.weather;
        let p = &reading.pollutants;
        ReadingRecord {
            datetime: w.timestamp,
            temperature: w.temperature,
            humidity: w.humidity,
            pressure: w.pressure,
            wind_speed: w.wind_speed,
            wind_direction: w.wind_direction,
            precipitation: w.precipitation,
            pm10: p.pm10,
            pm25: p.pm25,
            co: p.co,
            no2: p.no2,
            o3: p.o3,
            so2: p.so2,
            aqi,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;

    pub(crate) fn reading_at(timestamp: DateTime<Utc>) -> Reading {
        Reading {
            weather: WeatherReading {
                timestamp,
                temperature: 28.0,
                humidity: 60.0,
                pressure: 1008.0,
                wind_speed: 12.0,
                wind_direction: 220.0,
                precipitation: 0.0,
            },
            pollutants: PollutantReading {
                timestamp,
                pm25: 35.4,
                pm10: 50.0,
                co: 400.0,
                no2: 30.0,
                o3: 60.0,
                so2: 15.0,
            },
        }
    }

    #[test]
    fn pairing_requires_equal_timestamps() {
        let t1 = Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap();
        let t2 = Utc.with_ymd_and_hms(2025, 3, 1, 11, 0, 0).unwrap();
        let a = reading_at(t1);
        let b = reading_at(t2);

        assert!(Reading::new(a.weather.clone(), a.pollutants.clone()).is_ok());
        assert!(Reading::new(a.weather, b.pollutants).is_err());
    }

    #[test]
    fn restamped_moves_both_parts() {
        let t1 = Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap();
        let t2 = Utc.with_ymd_and_hms(2025, 3, 4, 10, 0, 0).unwrap();
        let r = reading_at(t1).restamped(t2);
        assert_eq!(r.weather.timestamp, t2);
        assert_eq!(r.pollutants.timestamp, t2);
        assert_eq!(r.pollutants.pm25, 35.4);
    }

    #[test]
    fn validate_rejects_nan_weather() {
        let mut r = reading_at(Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap());
        r.weather.temperature = f64::NAN;
        assert!(r.validate().is_err());
    }
}
