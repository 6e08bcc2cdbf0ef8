//! Dataset acquisition
//!
//! Loads CSV log files into polars frames and draws the reproducible sample
//! the local-file variant analyzes.

use crate::error::{Result, TriageError};
use polars::prelude::*;
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, info};

/// Rows inspected for dtype inference
const INFER_SCHEMA_LENGTH: usize = 1000;

/// Load a CSV file (header row required, comma separated, UTF-8)
pub fn load_csv(path: impl AsRef<Path>) -> Result<DataFrame> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)?;

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(INFER_SCHEMA_LENGTH))
        .into_reader_with_file_handle(file)
        .finish()
        .map_err(|e| TriageError::DataError(format!("{}: {}", path.display(), e)))?;

    info!(
        path = %path.display(),
        rows = df.height(),
        columns = df.width(),
        "Loaded dataset"
    );
    Ok(df)
}

/// Parse CSV bytes already held in memory (an uploaded file)
pub fn parse_csv(bytes: &[u8]) -> Result<DataFrame> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(INFER_SCHEMA_LENGTH))
        .into_reader_with_file_handle(Cursor::new(bytes))
        .finish()?;

    debug!(rows = df.height(), columns = df.width(), "Parsed CSV upload");
    Ok(df)
}

/// Draw `limit` rows without replacement when the frame is larger than `limit`
pub fn subsample(df: &DataFrame, limit: usize, seed: u64) -> Result<DataFrame> {
    if df.height() <= limit {
        return Ok(df.clone());
    }

    let sampled = df.sample_n_literal(limit, false, false, Some(seed))?;
    info!(
        original_rows = df.height(),
        sampled_rows = sampled.height(),
        seed = seed,
        "Subsampled dataset for analysis"
    );
    Ok(sampled)
}

/// File name of an exported report
pub fn report_file_name(stem: &str) -> String {
    format!("{}_report.csv", stem)
}
