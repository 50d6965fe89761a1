//! HTTP surfaces of the web app and the analysis service.

pub mod analysis;
pub mod error;
pub mod extract;
pub mod upload;

use std::future::Future;
use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::pipeline::{AnalysisPipeline, UploadPipeline};

pub use error::{ApiError, ErrorResponse};
pub use extract::{ImageUpload, SubmissionKind};

/// Shared state for the web app handlers.
#[derive(Clone)]
pub struct WebState {
    pub pipeline: Arc<UploadPipeline>,
}

/// Shared state for the analysis service handlers.
#[derive(Clone)]
pub struct AnalysisState {
    pub pipeline: Arc<AnalysisPipeline>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Request body ceiling for an image ceiling of `max_image_size` bytes.
///
/// Base64 and multipart framing inflate the payload, and the ceiling applies
/// to the re-encoded JPEG, not to what the client sends.
pub fn body_limit(max_image_size: u64) -> usize {
    let limit = max_image_size.saturating_mul(2).saturating_add(1024 * 1024);
    usize::try_from(limit).unwrap_or(usize::MAX)
}

/// Routes:
/// - POST / and /upload
/// - GET /uploads/{id}
/// - GET /documents/{id}
/// - GET /health
pub fn web_router(state: WebState, body_limit: usize) -> Router {
    Router::new()
        .route("/", post(upload::post_upload))
        .route("/upload", post(upload::post_upload))
        .route("/uploads/{id}", get(upload::get_upload))
        .route("/documents/{id}", get(upload::get_document))
        .route("/health", get(web_health))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Routes:
/// - POST / and /analyze
/// - GET /analysis/{id}
/// - GET /health
pub fn analysis_router(state: AnalysisState, body_limit: usize) -> Router {
    Router::new()
        .route("/", post(analysis::post_analyze))
        .route("/analyze", post(analysis::post_analyze))
        .route("/analysis/{id}", get(analysis::get_analysis))
        .route("/health", get(analysis_health))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn web_health() -> Json<HealthResponse> {
    Json(health("web"))
}

async fn analysis_health() -> Json<HealthResponse> {
    Json(health("analyzer"))
}

fn health(service: &'static str) -> HealthResponse {
    HealthResponse {
        status: "ok",
        service,
        version: env!("CARGO_PKG_VERSION"),
    }
}

/// Serves `router` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, router: Router, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        tracing::info!("Listening on {}", addr);
    }
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisMode;
    use crate::normalizer::data_uri;
    use crate::store::DocumentStore;
    use crate::testing::{self, CountingAnalyzer};
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    const BOUNDARY: &str = "facemood-test-boundary";

    fn web(analyzer: Arc<CountingAnalyzer>) -> (Router, Arc<crate::store::SqliteStore>) {
        let store = testing::memory_store();
        let pipeline = UploadPipeline::new(store.clone(), analyzer, AnalysisMode::Sync, 1 << 24);
        let state = WebState {
            pipeline: Arc::new(pipeline),
        };
        (web_router(state, body_limit(1 << 24)), store)
    }

    fn analysis(analyzer: Arc<CountingAnalyzer>) -> Router {
        let store = testing::memory_store();
        let pipeline =
            AnalysisPipeline::new(store, analyzer, vec!["emotion".to_string()], 1 << 24);
        analysis_router(
            AnalysisState {
                pipeline: Arc::new(pipeline),
            },
            body_limit(1 << 24),
        )
    }

    fn multipart_file(field: &str, filename: &str, bytes: &[u8]) -> Body {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: image/jpeg\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        Body::from(body)
    }

    fn multipart_request(uri: &str, body: Body) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(body)
            .unwrap()
    }

    fn json_request(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_multipart_upload_redirects_and_serves_jpeg() {
        let analyzer = CountingAnalyzer::returning(serde_json::json!([{"dominant_emotion": "happy"}]));
        let (router, store) = web(analyzer.clone());

        let jpeg = testing::solid_jpeg(10, 10, [255, 0, 0]);
        let response = router
            .clone()
            .oneshot(multipart_request("/", multipart_file("image", "red.jpg", &jpeg)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let location = response.headers()[header::LOCATION].to_str().unwrap().to_string();
        let id = location.trim_start_matches("/documents/").to_string();
        assert_eq!(analyzer.calls(), 1);

        let stored = store.get_image(&id).await.unwrap().unwrap();
        assert_eq!(stored.filename, "red.jpg");

        let response = router
            .clone()
            .oneshot(get(&format!("/uploads/{}", id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/jpeg");
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "inline; filename=\"red.jpg\""
        );
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(bytes.as_ref(), stored.data.as_slice());

        let response = router.oneshot(get(&location)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let view = json_body(response).await;
        assert_eq!(view["status"], "complete");
        assert_eq!(view["prediction"]["result"][0]["dominant_emotion"], "happy");
    }

    #[tokio::test]
    async fn test_json_upload_returns_receipt() {
        let analyzer = CountingAnalyzer::failing("offline");
        let (router, _store) = web(analyzer);

        let uri = data_uri::encode("image/jpeg", &testing::solid_jpeg(4, 4, [0, 0, 255]));
        let response = router
            .oneshot(json_request("/upload", serde_json::json!({ "image": uri })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let receipt = json_body(response).await;
        assert_eq!(receipt["filename"], "captured.jpg");
        assert_eq!(receipt["status"], "complete");
        assert!(receipt["prediction"]["error"]
            .as_str()
            .unwrap()
            .starts_with("Error during prediction"));
    }

    #[tokio::test]
    async fn test_upload_without_image_is_bad_request() {
        let analyzer = CountingAnalyzer::returning(serde_json::json!([]));
        let (router, _store) = web(analyzer.clone());

        let response = router
            .oneshot(json_request("/", serde_json::json!({ "other": 1 })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "No file selected");
        assert_eq!(analyzer.calls(), 0);
    }

    #[tokio::test]
    async fn test_unknown_and_malformed_ids_are_not_found() {
        let analyzer = CountingAnalyzer::returning(serde_json::json!([]));
        let (router, _store) = web(analyzer);

        for path in [
            "/uploads/not-a-valid-id".to_string(),
            format!("/uploads/{}", crate::store::IdScheme::Uuid.generate()),
            "/documents/123".to_string(),
        ] {
            let response = router.clone().oneshot(get(&path)).await.unwrap();
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "{}", path);
            assert_eq!(json_body(response).await["error"], "Image not found");
        }
    }

    #[tokio::test]
    async fn test_analyze_gif_data_uri_unsupported() {
        let analyzer = CountingAnalyzer::returning(serde_json::json!([{"age": 30}]));
        let router = analysis(analyzer.clone());

        let response = router
            .oneshot(json_request(
                "/",
                serde_json::json!({ "image": "data:image/gif;base64,R0lGODlhAQABAAAAACw=" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "Unsupported image type");
        assert_eq!(analyzer.calls(), 0);
    }

    #[tokio::test]
    async fn test_analyze_requires_json() {
        let router = analysis(CountingAnalyzer::returning(serde_json::json!([])));
        let request = Request::builder()
            .method("POST")
            .uri("/analyze")
            .header(header::CONTENT_TYPE, "text/plain")
            .body(Body::from("hello"))
            .unwrap();

        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "Request must be JSON");
    }

    #[tokio::test]
    async fn test_analyze_missing_image_field() {
        let router = analysis(CountingAnalyzer::returning(serde_json::json!([])));
        let response = router
            .oneshot(json_request("/", serde_json::json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "No file provided");
    }

    #[tokio::test]
    async fn test_analyze_then_fetch() {
        let analyzer = CountingAnalyzer::returning(serde_json::json!([{"dominant_emotion": "fear"}]));
        let router = analysis(analyzer);

        let uri = data_uri::encode("image/png", &testing::encode(
            &testing::noise_image(8, 8),
            image::ImageFormat::Png,
        ));
        let response = router
            .clone()
            .oneshot(json_request("/analyze", serde_json::json!({ "image": uri })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["models"], serde_json::json!(["emotion"]));
        assert_eq!(body["results"][0]["dominant_emotion"], "fear");

        let id = body["analysis_id"].as_str().unwrap();
        let response = router
            .oneshot(get(&format!("/analysis/{}", id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let record = json_body(response).await;
        assert_eq!(record["analysis_id"], id);
        assert!(record["image_id"].is_string());
    }

    #[tokio::test]
    async fn test_analyze_no_face() {
        let router = analysis(CountingAnalyzer::returning(serde_json::json!([])));
        let uri = data_uri::encode("image/jpeg", &testing::solid_jpeg(4, 4, [1, 1, 1]));
        let response = router
            .oneshot(json_request("/", serde_json::json!({ "image": uri })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "No faces detected");
    }

    #[tokio::test]
    async fn test_unknown_analysis_not_found() {
        let router = analysis(CountingAnalyzer::returning(serde_json::json!([])));
        let response = router.oneshot(get("/analysis/unknown")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(response).await["error"], "Analysis not found");
    }

    #[tokio::test]
    async fn test_health() {
        let router = analysis(CountingAnalyzer::returning(serde_json::json!([])));
        let response = router.oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "analyzer");
    }
}
