//! Integration test: Server API endpoints

use forensic_triage::server::{AppState, ServerConfig, create_router};
use std::sync::Arc;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use tower::ServiceExt;

const LOGS_CSV: &str = "src_ip,bytes_transferred,duration\n\
10.0.0.1,1000,0.5\n\
10.0.0.2,1050,0.6\n\
10.0.0.3,990,0.5\n\
10.0.0.4,1020,0.7\n\
10.0.0.5,9000000,0.6\n\
10.0.0.6,1010,0.5\n\
10.0.0.7,1005,0.6\n\
10.0.0.8,995,0.7\n\
10.0.0.9,1030,0.5\n\
10.0.0.10,1015,0.6\n";

fn test_app() -> axum::Router {
    let config = ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        max_upload_size: 10 * 1024 * 1024,
    };
    let state = Arc::new(AppState::new(config));
    create_router(state)
}

fn upload(uri: &str, csv: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "text/csv")
        .body(Body::from(csv.to_string()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = test_app();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_analyze_flags_large_transfer() {
    let app = test_app();
    let response = app
        .oneshot(upload("/api/analyze?contamination=10", LOGS_CSV))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["features"], serde_json::json!(["bytes_transferred", "duration"]));
    assert_eq!(body["summary"]["total_rows"], 10);
    assert_eq!(body["summary"]["suspicious_rows"], 1);
    assert_eq!(body["verdict"], "Potential anomalies detected!");
    assert_eq!(body["report_name"], "forensic_analysis_report.csv");

    let suspicious = body["suspicious"].as_array().unwrap();
    assert_eq!(suspicious.len(), 1);
    assert_eq!(suspicious[0]["src_ip"], "10.0.0.5");
    assert_eq!(suspicious[0]["anomaly"], -1);
    assert_eq!(suspicious[0]["severity"], "Suspicious");
    assert_eq!(body["preview"].as_array().unwrap().len(), 10);
}

#[tokio::test]
async fn test_analyze_text_only_rejected() {
    let app = test_app();
    let response = app
        .oneshot(upload("/api/analyze", "user,action\nalice,login\nbob,sudo\n"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = json_body(response).await;
    assert_eq!(body["error"], true);
    assert!(body["message"].as_str().unwrap().starts_with("No numeric columns detected"));
}

#[tokio::test]
async fn test_analyze_missing_feature_column() {
    let app = test_app();
    let response = app
        .oneshot(upload("/api/analyze?feature=packets", LOGS_CSV))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = json_body(response).await;
    assert_eq!(body["message"], "Dataset must contain 'packets'");
}

#[tokio::test]
async fn test_analyze_rejects_bad_contamination() {
    let app = test_app();
    let response = app
        .oneshot(upload("/api/analyze?contamination=90", LOGS_CSV))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_analyze_empty_body() {
    let app = test_app();
    let response = app
        .oneshot(upload("/api/analyze", ""))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_report_download() {
    let app = test_app();
    let response = app
        .oneshot(upload("/api/report?feature=bytes_transferred&contamination=10", LOGS_CSV))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/csv");
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"upload_report.csv\""
    );

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some("src_ip,bytes_transferred,duration,anomaly,severity"));
    assert_eq!(lines.count(), 10);
    assert!(text.contains("10.0.0.5,9000000,0.6,-1,Suspicious"));
}

#[tokio::test]
async fn test_unknown_route() {
    let app = test_app();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/nonexistent")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_analyze_requires_post() {
    let app = test_app();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/analyze")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}
