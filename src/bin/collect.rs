use std::env;
use std::path::PathBuf;
use anyhow::{Context, Result};
use chrono::{NaiveDate, TimeDelta, Utc};
use log::info;
use aqicast::collector::collect;
use aqicast::config::load_config;
use aqicast::logging::setup_logger;
use aqicast::manager_open_meteo::{Location, OpenMeteo};

const DEFAULT_CONFIG_PATH: &str = "config/config.toml";
const DEFAULT_OUTPUT: &str = "data/aqi_data.csv";

/// Collects training data: `collect [start_date end_date [output.csv]]`, dates as
/// YYYY-MM-DD. Without dates the last 365 days up to yesterday are collected.
fn main() -> Result<()> {
    let args = env::args().skip(1).collect::<Vec<String>>();
    let config_path = env::var("AQICAST_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

    let config = load_config(&config_path)
        .with_context(|| format!("loading configuration from {}", config_path))?;
    let _logger = setup_logger(&config.general)?;

    let (start, end) = match (args.first(), args.get(1)) {
        (Some(s), Some(e)) => (parse_date(s)?, parse_date(e)?),
        _ => {
            let end = Utc::now().date_naive() - TimeDelta::days(1);
            (end - TimeDelta::days(364), end)
        }
    };
    let out = PathBuf::from(args.get(2).map(String::as_str).unwrap_or(DEFAULT_OUTPUT));

    info!("collecting {} - {} for {}", start, end, config.geo_ref.city_name);
    let fetcher = OpenMeteo::new(&config.upstream);
    let location = Location { lat: config.geo_ref.lat, long: config.geo_ref.long };
    let rows = collect(&fetcher, &location, start, end, &out)?;
    info!("done, {} rows in {}", rows, out.display());

    Ok(())
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| format!("invalid date '{}'", s))
}
