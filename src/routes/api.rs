use crate::{
    handlers::{diagnostics, execute, health_check, ready_check, run_local, run_piston},
    websocket::handler::websocket_handler,
    AppState,
};
use axum::{routing::{get, post}, Router};
use std::sync::Arc;

/// Create API routes
pub fn create_api_routes(state: Arc<AppState>) -> Router {
    Router::<Arc<AppState>>::new()
        .route("/health", get(health_check))
        .route("/ready", get(ready_check))
        .route("/diagnostics", get(diagnostics))
        .route("/run", post(run_local))
        .route("/run-piston", post(run_piston))
        .route("/execute", post(execute))
        .route("/ws", get(websocket_handler))
        .with_state(state)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::config::Config;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
        routing::post,
        Json,
    };
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tower::ServiceExt;

    async fn fake_piston(reply: Value) -> String {
        let router = Router::new().route("/execute", post(move || async move { Json(reply) }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}/execute")
    }

    fn app(piston_url: String, compiler: &str, root: &TempDir) -> Router {
        let config = Config {
            piston_url,
            cpp_compiler: compiler.to_string(),
            workspace_root: Some(root.path().to_path_buf()),
            ..Config::default()
        };
        create_api_routes(Arc::new(AppState::from_config(&config).unwrap()))
    }

    async fn post_json(router: Router, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn health_answers_ok() {
        let root = TempDir::new().unwrap();
        let router = app("http://127.0.0.1:9/execute".to_string(), "false", &root);
        let response = router
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn run_rejects_missing_fields_and_other_languages() {
        let root = TempDir::new().unwrap();
        let router = app("http://127.0.0.1:9/execute".to_string(), "false", &root);

        let (status, body) = post_json(router.clone(), "/run", json!({"language": "cpp"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "language and code are required");

        let (status, body) = post_json(router, "/run", json!({"language": "python", "code": "print(1)"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Only C++ execution is supported server-side for now");
    }

    async fn post_raw(router: Router, uri: &str, body: &'static str, content_type: Option<&str>) -> (StatusCode, Value) {
        let mut request = Request::builder().method("POST").uri(uri);
        if let Some(content_type) = content_type {
            request = request.header("content-type", content_type);
        }
        let response = router.oneshot(request.body(Body::from(body)).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn missing_or_malformed_bodies_are_bad_requests() {
        let root = TempDir::new().unwrap();
        let router = app("http://127.0.0.1:9/execute".to_string(), "false", &root);

        for uri in ["/run", "/execute"] {
            let (status, body) = post_raw(router.clone(), uri, "", None).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(body["error"], "language and code are required");
        }
        let (status, body) = post_raw(router.clone(), "/run-piston", "", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "language and code/files required");

        let (status, body) = post_json(router.clone(), "/run", json!({"language": "cpp", "code": 5})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], 400);

        let (status, _) = post_raw(router, "/execute", "{not json", Some("application/json")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn run_reports_compile_errors_as_a_field() {
        let root = TempDir::new().unwrap();
        let router = app("http://127.0.0.1:9/execute".to_string(), "false", &root);
        let (status, body) = post_json(router, "/run", json!({"language": "c++", "code": "int main( {"})).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["compileError"].is_string());
        assert!(body.get("stdout").is_none());
    }

    #[tokio::test]
    async fn run_internal_failure_is_500() {
        let root = TempDir::new().unwrap();
        let router = app("http://127.0.0.1:9/execute".to_string(), "no-such-compiler", &root);
        let (status, body) = post_json(router, "/run", json!({"language": "cpp", "code": "int main() {}"})).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().unwrap().contains("no-such-compiler"));
    }

    #[tokio::test]
    async fn run_piston_validates_and_normalizes() {
        let root = TempDir::new().unwrap();
        let url = fake_piston(json!({"run": {"stdout": "3\n", "stderr": "", "code": 0}})).await;
        let router = app(url, "false", &root);

        let (status, _) = post_json(router.clone(), "/run-piston", json!({"language": "python"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = post_json(router, "/run-piston", json!({"language": "python", "code": "print(3)"})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["engine"], "piston");
        assert_eq!(body["success"], true);
        assert_eq!(body["stdout"], "3\n");
        assert_eq!(body["exitCode"], 0);
        assert_eq!(body["raw"]["run"]["code"], 0);
    }

    #[tokio::test]
    async fn run_piston_unreachable_is_500() {
        let root = TempDir::new().unwrap();
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/execute", listener.local_addr().unwrap());
        drop(listener);
        let router = app(url, "false", &root);
        let (status, body) = post_json(router, "/run-piston", json!({"language": "cpp", "code": "int main() {}"})).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn execute_falls_back_and_reports_it() {
        let root = TempDir::new().unwrap();
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/execute", listener.local_addr().unwrap());
        drop(listener);
        let router = app(url, "false", &root);

        let (status, body) = post_json(router.clone(), "/execute", json!({"language": "cpp", "code": "int main() {}"})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["outcome"]["status"], "compileError");
        assert_eq!(body["outcome"]["engine"], "local");
        assert_eq!(body["notices"].as_array().unwrap().len(), 1);

        let (status, _) = post_json(router, "/execute", json!({"language": "python", "code": "print(1)"})).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
    }
}
