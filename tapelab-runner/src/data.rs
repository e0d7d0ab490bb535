//! Bar ingestion: delimited-text loading and synthetic series generation.

use chrono::{DateTime, NaiveDate, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use std::path::Path;
use tapelab_core::domain::{is_ascending, Bar};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DataError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("row {row}: unparseable timestamp '{value}'")]
    Timestamp { row: usize, value: String },
    #[error("row {row}: bar fails OHLC sanity checks")]
    InsaneBar { row: usize },
    #[error("series is not strictly ascending in time")]
    OutOfOrder,
    #[error("no bars loaded")]
    Empty,
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

/// Accepts RFC 3339 timestamps or plain dates (midnight UTC).
pub(crate) fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// Load bars from a CSV file with header
/// `timestamp,open,high,low,close,volume`, validating sanity and ordering.
pub fn load_bars_csv(path: &Path) -> Result<Vec<Bar>, DataError> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut bars = Vec::new();

    for (i, record) in reader.deserialize::<CsvRow>().enumerate() {
        let row = record?;
        let timestamp = parse_timestamp(&row.timestamp).ok_or(DataError::Timestamp {
            row: i + 1,
            value: row.timestamp.clone(),
        })?;
        let bar = Bar {
            timestamp,
            open: row.open,
            high: row.high,
            low: row.low,
            close: row.close,
            volume: row.volume,
        };
        if !bar.is_sane() {
            return Err(DataError::InsaneBar { row: i + 1 });
        }
        bars.push(bar);
    }

    if bars.is_empty() {
        return Err(DataError::Empty);
    }
    if !is_ascending(&bars) {
        return Err(DataError::OutOfOrder);
    }
    Ok(bars)
}

/// Deterministic random-walk bars for demos and tests.
///
/// Daily bars from 2020-01-01, a small upward drift with ±2% noise, floored
/// at 1.0. The same seed always yields the same series.
pub fn synthetic_walk(n: usize, seed: u64, start_price: f64) -> Vec<Bar> {
    let mut rng = StdRng::seed_from_u64(seed);
    let start = NaiveDate::from_ymd_opt(2020, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        .and_utc();

    let mut price = start_price;
    (0..n)
        .map(|i| {
            let step: f64 = rng.gen_range(-0.02..0.02) + 0.0005;
            let open = price;
            price = (price * (1.0 + step)).max(1.0);
            let close = price;
            let spread = close.abs() * rng.gen_range(0.0..0.01);
            Bar {
                timestamp: start + chrono::Duration::days(i as i64),
                open,
                high: open.max(close) + spread,
                low: (open.min(close) - spread).max(0.5),
                close,
                volume: rng.gen_range(50_000.0..500_000.0),
            }
        })
        .collect()
}
