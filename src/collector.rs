use std::fs;
use std::io::Write;
use std::path::Path;
use anyhow::Result;
use chrono::{Datelike, Months, NaiveDate, TimeDelta};
use log::{info, warn};
use crate::aqi::overall_aqi;
use crate::manager_open_meteo::{Location, OpenMeteo};
use crate::models::readings::{Reading, ReadingRecord};

/// Downloads aligned hourly readings for a date range one calendar month at a time, with
/// weather from the archive endpoint, and writes them as csv, each row with its computed AQI
///
/// # Arguments
///
/// * 'fetcher' - the data fetcher
/// * 'location' - the point to collect data for
/// * 'start' - first date (UTC)
/// * 'end' - last date (UTC)
/// * 'out' - path of the csv file to write
pub fn collect(fetcher: &OpenMeteo, location: &Location, start: NaiveDate, end: NaiveDate, out: &Path) -> Result<usize> {
    let mut readings: Vec<Reading> = Vec::new();
    for (month_start, month_end) in month_chunks(start, end) {
        let chunk = fetcher.historical_range(location, month_start, month_end)?;
        info!("collected {} hours for {} - {}", chunk.len(), month_start, month_end);
        readings.extend(chunk);
    }

    if let Some(dir) = out.parent() {
        fs::create_dir_all(dir)?;
    }
    let rows = write_records(&readings, fs::File::create(out)?)?;
    info!("wrote {} rows to {}", rows, out.display());

    Ok(rows)
}

/// Writes readings as csv rows. Readings whose AQI can't be computed are skipped.
///
/// # Arguments
///
/// * 'readings' - the readings to write
/// * 'writer' - where to write
pub fn write_records<W: Write>(readings: &[Reading], writer: W) -> Result<usize> {
    let mut wtr = csv::Writer::from_writer(writer);
    let mut rows: usize = 0;
    for r in readings {
        match overall_aqi(&r.pollutants) {
            Ok(aqi) => {
                wtr.serialize(ReadingRecord::new(r, aqi))?;
                rows += 1;
            },
            Err(e) => warn!("skipping {}: {}", r.timestamp(), e),
        }
    }
    wtr.flush()?;

    Ok(rows)
}

/// Splits an inclusive date range on calendar month boundaries
///
/// # Arguments
///
/// * 'start' - first date
/// * 'end' - last date
pub fn month_chunks(start: NaiveDate, end: NaiveDate) -> Vec<(NaiveDate, NaiveDate)> {
    let mut chunks = Vec::new();
    let mut chunk_start = start;
    while chunk_start <= end {
        let first_of_month = chunk_start.with_day(1).unwrap_or(chunk_start);
        let month_end = first_of_month
            .checked_add_months(Months::new(1))
            .map(|d| d - TimeDelta::days(1))
            .unwrap_or(end);
        let chunk_end = month_end.min(end);
        chunks.push((chunk_start, chunk_end));
        chunk_start = chunk_end + TimeDelta::days(1);
    }

    chunks
}
