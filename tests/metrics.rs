// tests/metrics.rs
// One test per binary: the Prometheus recorder is process-global.
mod common;

use std::sync::Arc;

use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use news_bias_analyzer::metrics::Metrics;
use tower::ServiceExt;

#[tokio::test]
async fn metrics_endpoint_reports_analysis_counters() {
    let metrics = Metrics::init().expect("recorder installs once");
    let app = news_bias_analyzer::router(Arc::new(common::analyzer())).merge(metrics.router());

    let text = [common::TAX_CLAIM, common::SHORT_FACT].join(" ");
    let req = Request::builder()
        .method("POST")
        .uri("/analyze")
        .header("content-type", "application/json")
        .body(Body::from(
            serde_json::json!({ "text": text, "source": "Qwxyz Bulletin" }).to_string(),
        ))
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body::to_bytes(resp.into_body(), 1_048_576).await.unwrap();
    let text = String::from_utf8_lossy(&body);

    assert!(text.contains("bias_analyses_total 1"), "{text}");
    assert!(text.contains("bias_source_match_miss_total 1"), "{text}");
    assert!(text.contains("bias_sentences_total 2"), "{text}");
    assert!(text.contains("bias_claim_sentences_total 1"), "{text}");
}
