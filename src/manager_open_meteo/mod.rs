pub mod cache;
pub mod source;

use std::sync::Arc;
use std::thread;
use std::time::Duration;
use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use log::{debug, info, warn};
use crate::config::UpstreamParameters;
use crate::errors::FetchError;
use crate::features::{History, HISTORY_CAPACITY};
use crate::manager_open_meteo::cache::ResponseCache;
use crate::manager_open_meteo::source::{HttpSource, UreqSource};
use crate::models::open_meteo::{CurrentAirQualityResult, CurrentWeatherResult, HourlyAirQuality, HourlyAirQualityResult, HourlyWeather, HourlyWeatherResult};
use crate::models::readings::{PollutantReading, Reading, WeatherReading};

const WEATHER_VARIABLES: &str = "temperature_2m,relative_humidity_2m,surface_pressure,wind_speed_10m,wind_direction_10m,precipitation";
const AIR_QUALITY_VARIABLES: &str = "pm10,pm2_5,carbon_monoxide,nitrogen_dioxide,sulphur_dioxide,ozone";

/// Max distance between the current weather and current air quality timestamps for them
/// to be paired into one reading
const MAX_CURRENT_SKEW_MINUTES: i64 = 60;

/// A point on earth given in decimal degrees
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Location {
    pub lat: f64,
    pub long: f64,
}

impl Location {
    /// Rejects coordinates outside the valid lat/long ranges
    pub fn validate(&self) -> Result<(), FetchError> {
        if !(-90.0..=90.0).contains(&self.lat) || !(-180.0..=180.0).contains(&self.long) {
            return Err(FetchError::InvalidInput(format!("coordinates {}, {} out of range", self.lat, self.long)));
        }
        Ok(())
    }

    fn query(&self) -> Vec<(String, String)> {
        vec![
            ("latitude".to_string(), format!("{:.4}", self.lat)),
            ("longitude".to_string(), format!("{:.4}", self.long)),
            ("timezone".to_string(), "GMT".to_string()),
        ]
    }
}

/// Bounded retry with exponential backoff
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    fn delay(&self, attempt: u32) -> Duration {
        self.backoff.saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
    }
}

/// Runs the operation until it succeeds, fails with a definitive error or the policy's
/// attempts are used up
///
/// # Arguments
///
/// * 'policy' - number of attempts and base backoff
/// * 'op' - the operation to run
pub fn retry<T>(policy: &RetryPolicy, mut op: impl FnMut() -> Result<T, FetchError>) -> Result<T, FetchError> {
    let mut attempt: u32 = 1;
    loop {
        match op() {
            Ok(r) => return Ok(r),
            Err(e) if e.is_retryable() => {
                if attempt >= policy.attempts {
                    return Err(FetchError::Exhausted { attempts: attempt, last: e.to_string() });
                }
                let delay = policy.delay(attempt);
                warn!("attempt {} of {} failed: {}, retrying in {:?}", attempt, policy.attempts, e, delay);
                thread::sleep(delay);
                attempt += 1;
            },
            Err(e) => return Err(e),
        }
    }
}

/// Struct for fetching weather and air quality data from Open-Meteo
pub struct OpenMeteo {
    source: Arc<dyn HttpSource + Send + Sync>,
    cache: ResponseCache,
    weather_url: String,
    air_quality_url: String,
    archive_url: String,
    max_chunk_days: u32,
    retry: RetryPolicy,
}

impl OpenMeteo {
    /// Returns an OpenMeteo struct talking to the configured endpoints over http
    ///
    /// # Arguments
    ///
    /// * 'params' - upstream configuration
    pub fn new(params: &UpstreamParameters) -> OpenMeteo {
        let source = UreqSource::new(Duration::from_secs(params.timeout_secs));
        OpenMeteo::with_source(Arc::new(source), params)
    }

    /// Returns an OpenMeteo struct using the given transport
    ///
    /// # Arguments
    ///
    /// * 'source' - the transport
    /// * 'params' - upstream configuration
    pub fn with_source(source: Arc<dyn HttpSource + Send + Sync>, params: &UpstreamParameters) -> OpenMeteo {
        OpenMeteo {
            source,
            cache: ResponseCache::new(Duration::from_secs(params.cache_ttl_secs)),
            weather_url: params.weather_url.clone(),
            air_quality_url: params.air_quality_url.clone(),
            archive_url: params.archive_url.clone(),
            max_chunk_days: params.max_chunk_days.max(1),
            retry: RetryPolicy {
                attempts: params.retry_attempts.max(1),
                backoff: Duration::from_millis(params.retry_backoff_ms),
            },
        }
    }

    /// Retrieves current weather and air quality conditions and pairs them into one reading
    /// stamped with the weather observation time
    ///
    /// # Arguments
    ///
    /// * 'location' - the point to get conditions for
    pub fn current(&self, location: &Location) -> Result<Reading, FetchError> {
        location.validate()?;

        let mut query = location.query();
        query.push(("current".to_string(), WEATHER_VARIABLES.to_string()));
        let json = self.get_cached(&self.weather_url, &query)?;
        let w = serde_json::from_str::<CurrentWeatherResult>(&json)?.current;

        let mut query = location.query();
        query.push(("current".to_string(), AIR_QUALITY_VARIABLES.to_string()));
        let json = self.get_cached(&self.air_quality_url, &query)?;
        let a = serde_json::from_str::<CurrentAirQualityResult>(&json)?.current;

        if (w.time - a.time).num_minutes().abs() > MAX_CURRENT_SKEW_MINUTES {
            return Err(FetchError::Document(format!(
                "current weather at {} and air quality at {} are too far apart", w.time, a.time)));
        }

        let weather = WeatherReading {
            timestamp: w.time,
            temperature: required(w.temperature_2m, "temperature_2m")?,
            humidity: required(w.relative_humidity_2m, "relative_humidity_2m")?,
            pressure: required(w.surface_pressure, "surface_pressure")?,
            wind_speed: required(w.wind_speed_10m, "wind_speed_10m")?,
            wind_direction: required(w.wind_direction_10m, "wind_direction_10m")?,
            precipitation: required(w.precipitation, "precipitation")?,
        };
        let pollutants = PollutantReading {
            timestamp: w.time,
            pm25: required(a.pm2_5, "pm2_5")?,
            pm10: required(a.pm10, "pm10")?,
            co: required(a.carbon_monoxide, "carbon_monoxide")?,
            no2: required(a.nitrogen_dioxide, "nitrogen_dioxide")?,
            o3: required(a.ozone, "ozone")?,
            so2: required(a.sulphur_dioxide, "sulphur_dioxide")?,
        };
        info!("fetched current conditions at {}", w.time);

        Ok(Reading::new(weather, pollutants)?)
    }

    /// Checks that both upstream endpoints answer right now. Bypasses the response cache
    /// and makes a single attempt per endpoint.
    ///
    /// # Arguments
    ///
    /// * 'location' - the point to ask conditions for
    pub fn ping(&self, location: &Location) -> Result<(), FetchError> {
        location.validate()?;

        let mut query = location.query();
        query.push(("current".to_string(), WEATHER_VARIABLES.to_string()));
        serde_json::from_str::<CurrentWeatherResult>(&self.source.get(&self.weather_url, &query)?)?;

        let mut query = location.query();
        query.push(("current".to_string(), AIR_QUALITY_VARIABLES.to_string()));
        serde_json::from_str::<CurrentAirQualityResult>(&self.source.get(&self.air_quality_url, &query)?)?;

        Ok(())
    }

    /// Retrieves recent hourly readings for an inclusive date range, weather taken from
    /// the forecast endpoint. The range is split into chunks no longer than the configured
    /// max chunk size, and weather and air quality rows are joined on their timestamps.
    /// Hours missing any value are dropped.
    ///
    /// # Arguments
    ///
    /// * 'location' - the point to get data for
    /// * 'start' - first date (UTC)
    /// * 'end' - last date (UTC)
    pub fn range(&self, location: &Location, start: NaiveDate, end: NaiveDate) -> Result<Vec<Reading>, FetchError> {
        self.range_from(&self.weather_url, location, start, end)
    }

    /// Same as range but with weather taken from the archive endpoint, which covers dates
    /// further back than the forecast endpoint keeps
    ///
    /// # Arguments
    ///
    /// * 'location' - the point to get data for
    /// * 'start' - first date (UTC)
    /// * 'end' - last date (UTC)
    pub fn historical_range(&self, location: &Location, start: NaiveDate, end: NaiveDate) -> Result<Vec<Reading>, FetchError> {
        self.range_from(&self.archive_url, location, start, end)
    }

    fn range_from(&self, weather_url: &str, location: &Location, start: NaiveDate, end: NaiveDate)
        -> Result<Vec<Reading>, FetchError> {

        location.validate()?;
        if start > end {
            return Err(FetchError::InvalidInput(format!("start date {} is after end date {}", start, end)));
        }

        let mut readings: Vec<Reading> = Vec::new();
        for (chunk_start, chunk_end) in chunk_range(start, end, self.max_chunk_days) {
            let mut query = location.query();
            query.push(("start_date".to_string(), chunk_start.format("%Y-%m-%d").to_string()));
            query.push(("end_date".to_string(), chunk_end.format("%Y-%m-%d").to_string()));

            let mut weather_query = query.clone();
            weather_query.push(("hourly".to_string(), WEATHER_VARIABLES.to_string()));
            let json = self.get_cached(weather_url, &weather_query)?;
            let weather = serde_json::from_str::<HourlyWeatherResult>(&json)?.hourly;

            query.push(("hourly".to_string(), AIR_QUALITY_VARIABLES.to_string()));
            let json = self.get_cached(&self.air_quality_url, &query)?;
            let air_quality = serde_json::from_str::<HourlyAirQualityResult>(&json)?.hourly;

            let aligned = align(&weather, &air_quality)?;
            debug!("chunk {} - {}: {} aligned hours", chunk_start, chunk_end, aligned.len());
            readings.extend(aligned);
        }
        readings.sort_by_key(|r| r.timestamp());
        readings.dedup_by_key(|r| r.timestamp());

        Ok(readings)
    }

    /// Retrieves the hours preceding the given time as a history window
    ///
    /// # Arguments
    ///
    /// * 'location' - the point to get data for
    /// * 'before' - only hours strictly before this time are included
    pub fn recent_history(&self, location: &Location, before: DateTime<Utc>) -> Result<History, FetchError> {
        let start = (before - TimeDelta::hours(HISTORY_CAPACITY as i64)).date_naive();
        let readings = self.range(location, start, before.date_naive())?;

        let prior = readings.into_iter()
            .filter(|r| r.timestamp() < before)
            .collect::<Vec<Reading>>();
        let skip = prior.len().saturating_sub(HISTORY_CAPACITY);

        Ok(History::from_readings(&prior[skip..])?)
    }

    /// GETs a document through the response cache, retrying transient failures
    fn get_cached(&self, url: &str, query: &[(String, String)]) -> Result<String, FetchError> {
        let key = cache_key(url, query);
        if let Some(body) = self.cache.get(&key) {
            debug!("cache hit: {}", key);
            return Ok(body);
        }

        let body = retry(&self.retry, || self.source.get(url, query))?;
        self.cache.put(key, body.clone());

        Ok(body)
    }
}

fn cache_key(url: &str, query: &[(String, String)]) -> String {
    let params = query.iter().map(|(k, v)| format!("{}={}", k, v)).collect::<Vec<String>>();
    format!("{}?{}", url, params.join("&"))
}

fn required(value: Option<f64>, name: &str) -> Result<f64, FetchError> {
    value.ok_or_else(|| FetchError::Document(format!("missing value for {}", name)))
}

/// Splits an inclusive date range into consecutive inclusive chunks of at most max_days days
///
/// # Arguments
///
/// * 'start' - first date
/// * 'end' - last date
/// * 'max_days' - max number of days per chunk
pub fn chunk_range(start: NaiveDate, end: NaiveDate, max_days: u32) -> Vec<(NaiveDate, NaiveDate)> {
    let mut chunks = Vec::new();
    let step = TimeDelta::days(max_days.max(1) as i64);
    let mut chunk_start = start;
    while chunk_start <= end {
        let chunk_end = (chunk_start + step - TimeDelta::days(1)).min(end);
        chunks.push((chunk_start, chunk_end));
        chunk_start = chunk_end + TimeDelta::days(1);
    }

    chunks
}

/// Joins hourly weather and air quality series on their timestamps
fn align(weather: &HourlyWeather, air_quality: &HourlyAirQuality) -> Result<Vec<Reading>, FetchError> {
    let mut readings = Vec::new();
    for (i, t) in weather.time.iter().enumerate() {
        let Some(j) = air_quality.time.iter().position(|a| a == t) else {
            continue;
        };

        let weather_values = (
            at(&weather.temperature_2m, i), at(&weather.relative_humidity_2m, i), at(&weather.surface_pressure, i),
            at(&weather.wind_speed_10m, i), at(&weather.wind_direction_10m, i), at(&weather.precipitation, i),
        );
        let pollutant_values = (
            at(&air_quality.pm2_5, j), at(&air_quality.pm10, j), at(&air_quality.carbon_monoxide, j),
            at(&air_quality.nitrogen_dioxide, j), at(&air_quality.ozone, j), at(&air_quality.sulphur_dioxide, j),
        );

        if let ((Some(temperature), Some(humidity), Some(pressure), Some(wind_speed), Some(wind_direction), Some(precipitation)),
                (Some(pm25), Some(pm10), Some(co), Some(no2), Some(o3), Some(so2))) = (weather_values, pollutant_values) {
            let weather = WeatherReading { timestamp: *t, temperature, humidity, pressure, wind_speed, wind_direction, precipitation };
            let pollutants = PollutantReading { timestamp: *t, pm25, pm10, co, no2, o3, so2 };
            readings.push(Reading::new(weather, pollutants)?);
        } else {
            debug!("dropping incomplete hour {}", t);
        }
    }

    Ok(readings)
}

fn at(series: &[Option<f64>], i: usize) -> Option<f64> {
    series.get(i).copied().flatten()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use chrono::{NaiveDateTime, TimeZone};

    type Handler = Box<dyn Fn(&str, &[(String, String)], usize) -> Result<String, FetchError> + Send + Sync>;

    /// Fake upstream answering with generated documents and counting requests
    pub(crate) struct FakeSource {
        pub calls: AtomicUsize,
        handler: Handler,
    }

    impl FakeSource {
        pub(crate) fn new<F>(handler: F) -> Arc<FakeSource>
        where F: Fn(&str, &[(String, String)], usize) -> Result<String, FetchError> + Send + Sync + 'static {
            Arc::new(FakeSource { calls: AtomicUsize::new(0), handler: Box::new(handler) })
        }

        pub(crate) fn healthy() -> Arc<FakeSource> {
            FakeSource::new(|url, query, _| Ok(document(url, query)))
        }

        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl HttpSource for FakeSource {
        fn get(&self, url: &str, query: &[(String, String)]) -> Result<String, FetchError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            (self.handler)(url, query, n)
        }
    }

    fn param<'a>(query: &'a [(String, String)], key: &str) -> Option<&'a str> {
        query.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    pub(crate) const CURRENT_TIME: &str = "2025-03-01T10:00";

    /// Generates a plausible Open-Meteo document for the request
    pub(crate) fn document(url: &str, query: &[(String, String)]) -> String {
        let is_weather = !url.contains("air-quality");
        if param(query, "current").is_some() {
            return if is_weather {
                format!(r#"{{"current":{{"time":"{}","interval":900,"temperature_2m":28.0,"relative_humidity_2m":60,
                    "surface_pressure":1008.0,"wind_speed_10m":12.0,"wind_direction_10m":220,"precipitation":0.0}}}}"#, CURRENT_TIME)
            } else {
                format!(r#"{{"current":{{"time":"{}","interval":3600,"pm10":50.0,"pm2_5":35.4,"carbon_monoxide":400.0,
                    "nitrogen_dioxide":30.0,"sulphur_dioxide":15.0,"ozone":60.0}}}}"#, CURRENT_TIME)
            };
        }

        let start = NaiveDate::parse_from_str(param(query, "start_date").unwrap(), "%Y-%m-%d").unwrap();
        let end = NaiveDate::parse_from_str(param(query, "end_date").unwrap(), "%Y-%m-%d").unwrap();
        let hours = ((end - start).num_days() + 1) * 24;
        let times = (0..hours)
            .map(|h| format!("\"{}\"", (start.and_hms_opt(0, 0, 0).unwrap() + TimeDelta::hours(h)).format("%Y-%m-%dT%H:%M")))
            .collect::<Vec<String>>()
            .join(",");
        let series = |v: f64| vec![v.to_string(); hours as usize].join(",");

        if is_weather {
            format!(r#"{{"hourly":{{"time":[{}],"temperature_2m":[{}],"relative_humidity_2m":[{}],"surface_pressure":[{}],
                "wind_speed_10m":[{}],"wind_direction_10m":[{}],"precipitation":[{}]}}}}"#,
                times, series(25.0), series(55.0), series(1009.0), series(10.0), series(180.0), series(0.0))
        } else {
            format!(r#"{{"hourly":{{"time":[{}],"pm10":[{}],"pm2_5":[{}],"carbon_monoxide":[{}],
                "nitrogen_dioxide":[{}],"sulphur_dioxide":[{}],"ozone":[{}]}}}}"#,
                times, series(40.0), series(20.0), series(300.0), series(20.0), series(10.0), series(50.0))
        }
    }

    pub(crate) fn params(ttl_secs: u64) -> UpstreamParameters {
        UpstreamParameters {
            weather_url: "https://api.open-meteo.com/v1/forecast".to_string(),
            air_quality_url: "https://air-quality-api.open-meteo.com/v1/air-quality".to_string(),
            archive_url: "https://archive-api.open-meteo.com/v1/archive".to_string(),
            timeout_secs: 10,
            max_chunk_days: 31,
            cache_ttl_secs: ttl_secs,
            retry_attempts: 3,
            retry_backoff_ms: 0,
        }
    }

    const KARACHI: Location = Location { lat: 24.8607, long: 67.0011 };

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn chunks_cover_range_without_overlap() {
        let chunks = chunk_range(date(2025, 1, 1), date(2025, 3, 3), 31);
        assert_eq!(chunks, vec![
            (date(2025, 1, 1), date(2025, 1, 31)),
            (date(2025, 2, 1), date(2025, 3, 3)),
        ]);
        assert_eq!(chunk_range(date(2025, 1, 1), date(2025, 1, 1), 31).len(), 1);
    }

    #[test]
    fn range_is_fetched_in_chunks() {
        let source = FakeSource::healthy();
        let meteo = OpenMeteo::with_source(source.clone(), &params(600));

        let readings = meteo.range(&KARACHI, date(2025, 1, 1), date(2025, 3, 3)).unwrap();
        assert_eq!(source.calls(), 4);
        assert_eq!(readings.len(), 62 * 24);
        assert!(readings.windows(2).all(|w| w[0].timestamp() < w[1].timestamp()));
    }

    #[test]
    fn identical_requests_within_ttl_hit_upstream_once() {
        let source = FakeSource::healthy();
        let meteo = OpenMeteo::with_source(source.clone(), &params(600));

        let a = meteo.range(&KARACHI, date(2025, 1, 1), date(2025, 1, 2)).unwrap();
        let after_first = source.calls();
        let b = meteo.range(&KARACHI, date(2025, 1, 1), date(2025, 1, 2)).unwrap();

        assert_eq!(after_first, 2);
        assert_eq!(source.calls(), after_first);
        assert_eq!(a, b);
    }

    #[test]
    fn disabled_cache_requests_again() {
        let source = FakeSource::healthy();
        let meteo = OpenMeteo::with_source(source.clone(), &params(0));

        meteo.current(&KARACHI).unwrap();
        meteo.current(&KARACHI).unwrap();
        assert_eq!(source.calls(), 4);
    }

    #[test]
    fn current_pairs_weather_and_air_quality() {
        let meteo = OpenMeteo::with_source(FakeSource::healthy(), &params(600));
        let r = meteo.current(&KARACHI).unwrap();

        let t = NaiveDateTime::parse_from_str(CURRENT_TIME, "%Y-%m-%dT%H:%M").unwrap().and_utc();
        assert_eq!(r.timestamp(), t);
        assert_eq!(r.pollutants.pm25, 35.4);
        assert_eq!(r.weather.humidity, 60.0);
    }

    #[test]
    fn transient_failures_are_retried() {
        let source = FakeSource::new(|url, query, n| {
            if n < 2 { Err(FetchError::Transient("503".to_string())) } else { Ok(document(url, query)) }
        });
        let meteo = OpenMeteo::with_source(source.clone(), &params(600));

        assert!(meteo.current(&KARACHI).is_ok());
        assert_eq!(source.calls(), 4);
    }

    #[test]
    fn retries_are_bounded() {
        let source = FakeSource::new(|_, _, _| Err(FetchError::Transient("timeout".to_string())));
        let meteo = OpenMeteo::with_source(source.clone(), &params(600));

        let res = meteo.current(&KARACHI);
        assert!(matches!(res, Err(FetchError::Exhausted { attempts: 3, .. })));
        assert_eq!(source.calls(), 3);
    }

    #[test]
    fn client_errors_are_not_retried() {
        let source = FakeSource::new(|_, _, _| Err(FetchError::Client(400)));
        let meteo = OpenMeteo::with_source(source.clone(), &params(600));

        assert!(matches!(meteo.current(&KARACHI), Err(FetchError::Client(400))));
        assert_eq!(source.calls(), 1);
    }

    #[test]
    fn rate_limit_is_retried() {
        let source = FakeSource::new(|url, query, n| {
            if n == 0 { Err(FetchError::Client(429)) } else { Ok(document(url, query)) }
        });
        let meteo = OpenMeteo::with_source(source.clone(), &params(600));

        assert!(meteo.current(&KARACHI).is_ok());
        assert_eq!(source.calls(), 3);
    }

    #[test]
    fn bad_coordinates_never_reach_upstream() {
        let source = FakeSource::healthy();
        let meteo = OpenMeteo::with_source(source.clone(), &params(600));

        let res = meteo.current(&Location { lat: 124.0, long: 67.0 });
        assert!(matches!(res, Err(FetchError::InvalidInput(_))));
        assert!(matches!(meteo.range(&KARACHI, date(2025, 2, 1), date(2025, 1, 1)), Err(FetchError::InvalidInput(_))));
        assert_eq!(source.calls(), 0);
    }

    #[test]
    fn incomplete_hours_are_dropped() {
        let source = FakeSource::new(|url, query, _| {
            let doc = document(url, query);
            if url.contains("air-quality") {
                Ok(doc.replacen("\"pm10\":[40", "\"pm10\":[null", 1))
            } else {
                Ok(doc)
            }
        });
        let meteo = OpenMeteo::with_source(source, &params(600));

        let readings = meteo.range(&KARACHI, date(2025, 1, 1), date(2025, 1, 1)).unwrap();
        assert_eq!(readings.len(), 23);
        assert_eq!(readings[0].timestamp(), Utc.with_ymd_and_hms(2025, 1, 1, 1, 0, 0).unwrap());
    }

    #[test]
    fn recent_history_holds_prior_hours_only() {
        let meteo = OpenMeteo::with_source(FakeSource::healthy(), &params(600));
        let before = Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap();

        let history = meteo.recent_history(&KARACHI, before).unwrap();
        assert_eq!(history.len(), HISTORY_CAPACITY);
    }

    #[test]
    fn historical_range_uses_archive_for_weather() {
        let urls = Arc::new(std::sync::Mutex::new(Vec::<String>::new()));
        let recorded = urls.clone();
        let source = FakeSource::new(move |url, query, _| {
            recorded.lock().unwrap().push(url.to_string());
            Ok(document(url, query))
        });
        let meteo = OpenMeteo::with_source(source, &params(600));

        let readings = meteo.historical_range(&KARACHI, date(2024, 1, 1), date(2024, 1, 31)).unwrap();
        assert_eq!(readings.len(), 31 * 24);
        assert_eq!(*urls.lock().unwrap(), vec![
            "https://archive-api.open-meteo.com/v1/archive".to_string(),
            "https://air-quality-api.open-meteo.com/v1/air-quality".to_string(),
        ]);
    }

    #[test]
    fn ping_bypasses_cache() {
        let up = Arc::new(std::sync::atomic::AtomicBool::new(true));
        let flag = up.clone();
        let source = FakeSource::new(move |url, query, _| {
            if flag.load(Ordering::SeqCst) {
                Ok(document(url, query))
            } else {
                Err(FetchError::Transient("connection refused".to_string()))
            }
        });
        let meteo = OpenMeteo::with_source(source.clone(), &params(600));

        meteo.current(&KARACHI).unwrap();
        assert!(meteo.ping(&KARACHI).is_ok());
        up.store(false, Ordering::SeqCst);

        assert!(meteo.current(&KARACHI).is_ok());
        assert!(meteo.ping(&KARACHI).is_err());
        assert_eq!(source.calls(), 5);
    }

    #[test]
    fn backoff_doubles() {
        let policy = RetryPolicy { attempts: 5, backoff: Duration::from_millis(100) };
        assert_eq!(policy.delay(1), Duration::from_millis(100));
        assert_eq!(policy.delay(3), Duration::from_millis(400));
    }
}
