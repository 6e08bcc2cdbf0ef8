//! HTTP request handlers

use std::sync::Arc;
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, HeaderValue, StatusCode},
    response::IntoResponse,
    Json,
};
use polars::prelude::*;
use serde::Deserialize;
use tracing::info;

use crate::config::{ContaminationRate, FeatureMode, TriageConfig};
use crate::dataset::parse_csv;
use crate::pipeline::{TriageOutcome, TriagePipeline};

use super::error::{Result, ServerError};
use super::state::AppState;

/// Rows returned in the JSON previews
const PREVIEW_ROWS: usize = 100;

/// Analysis parameters shared by `/analyze` and `/report`
#[derive(Debug, Default, Deserialize)]
pub struct AnalyzeQuery {
    /// Contamination rate in percent (1-40)
    contamination: Option<u8>,
    /// Score only this column
    feature: Option<String>,
    /// Comma-separated list of columns that must be present
    require: Option<String>,
}

impl AnalyzeQuery {
    /// Auto-detect mode follows the interactive variant, a fixed feature the upload variant
    fn to_config(&self) -> crate::Result<TriageConfig> {
        let mut config = match self.feature.as_deref().map(str::trim) {
            Some(column) if !column.is_empty() => TriageConfig::upload()
                .with_feature_mode(FeatureMode::Fixed(column.to_string()))
                .with_required_column(column),
            _ => TriageConfig::interactive(),
        };

        if let Some(percent) = self.contamination {
            config = config.with_contamination(ContaminationRate::from_percent(percent)?);
        }

        for column in self.require.iter().flat_map(|r| r.split(',')) {
            let column = column.trim();
            if !column.is_empty() {
                config = config.with_required_column(column);
            }
        }
        Ok(config)
    }
}

/// Parse the uploaded CSV and run the pipeline off the async runtime
async fn run_upload(query: &AnalyzeQuery, body: Bytes) -> Result<TriageOutcome> {
    if body.is_empty() {
        return Err(ServerError::BadRequest("No file uploaded".to_string()));
    }

    let config = query.to_config()?;
    info!(bytes = body.len(), feature_mode = ?config.feature_mode, "Received CSV upload");

    tokio::task::spawn_blocking(move || -> crate::Result<TriageOutcome> {
        let df = parse_csv(&body)?;
        TriagePipeline::new(config)?.run(&df)
    })
    .await
    .map_err(|e| ServerError::Internal(format!("analysis task failed: {}", e)))?
    .map_err(ServerError::from)
}

/// Analyze an uploaded CSV and return summary, distribution and previews
pub async fn analyze(
    State(_state): State<Arc<AppState>>,
    Query(query): Query<AnalyzeQuery>,
    body: Bytes,
) -> Result<Json<serde_json::Value>> {
    let outcome = run_upload(&query, body).await?;

    let preview = frame_to_records(&outcome.augmented.frame().head(Some(PREVIEW_ROWS)));
    let suspicious = frame_to_records(&outcome.augmented.suspicious()?.head(Some(PREVIEW_ROWS)));

    Ok(Json(serde_json::json!({
        "success": true,
        "features": outcome.features.columns(),
        "summary": outcome.summary,
        "verdict": outcome.summary.verdict(),
        "distribution": outcome.distribution,
        "report_name": outcome.report_name,
        "preview": preview,
        "suspicious": suspicious,
    })))
}

/// Analyze an uploaded CSV and return the full report as a CSV attachment
pub async fn download_report(
    State(_state): State<Arc<AppState>>,
    Query(query): Query<AnalyzeQuery>,
    body: Bytes,
) -> Result<impl IntoResponse> {
    let outcome = run_upload(&query, body).await?;
    let csv = outcome.export()?;

    let disposition = format!("attachment; filename=\"{}\"", outcome.report_name);

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("text/csv")),
            (header::CONTENT_DISPOSITION, HeaderValue::from_str(&disposition)
                .map_err(|e| ServerError::Internal(format!("Invalid header: {}", e)))?),
        ],
        csv,
    ))
}

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": state.uptime_secs(),
    }))
}

/// Row-major JSON records of a frame
fn frame_to_records(df: &DataFrame) -> Vec<serde_json::Value> {
    (0..df.height())
        .map(|i| {
            let record: serde_json::Map<String, serde_json::Value> = df
                .get_columns()
                .iter()
                .map(|col| (col.name().to_string(), any_value_to_json(col.get(i).ok())))
                .collect();
            serde_json::Value::Object(record)
        })
        .collect()
}

fn any_value_to_json(value: Option<AnyValue>) -> serde_json::Value {
    match value {
        Some(AnyValue::Float64(v)) => serde_json::json!(v),
        Some(AnyValue::Float32(v)) => serde_json::json!(v),
        Some(AnyValue::Int64(v)) => serde_json::json!(v),
        Some(AnyValue::Int32(v)) => serde_json::json!(v),
        Some(AnyValue::Int16(v)) => serde_json::json!(v),
        Some(AnyValue::Int8(v)) => serde_json::json!(v),
        Some(AnyValue::UInt64(v)) => serde_json::json!(v),
        Some(AnyValue::UInt32(v)) => serde_json::json!(v),
        Some(AnyValue::String(v)) => serde_json::json!(v),
        Some(AnyValue::StringOwned(v)) => serde_json::json!(v.as_str()),
        Some(AnyValue::Boolean(v)) => serde_json::json!(v),
        Some(AnyValue::Null) | None => serde_json::Value::Null,
        Some(other) => serde_json::json!(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_defaults_to_interactive() {
        let config = AnalyzeQuery::default().to_config().unwrap();
        assert_eq!(config.feature_mode, FeatureMode::AutoNumeric);
        assert_eq!(config.contamination.value(), 0.05);
    }

    #[test]
    fn test_query_fixed_feature_and_requirements() {
        let query = AnalyzeQuery {
            contamination: Some(10),
            feature: Some("bytes_transferred".to_string()),
            require: Some("src_ip, dst_ip".to_string()),
        };
        let config = query.to_config().unwrap();
        assert_eq!(config.contamination.value(), 0.1);
        assert_eq!(config.required_columns, vec!["bytes_transferred", "src_ip", "dst_ip"]);
        assert_eq!(config.report_stem, "upload");
    }

    #[test]
    fn test_frame_to_records() {
        let df = df!("user" => &["alice"], "bytes" => &[Some(3i64)]).unwrap();
        let records = frame_to_records(&df);
        assert_eq!(records, vec![serde_json::json!({"user": "alice", "bytes": 3})]);
    }
}
