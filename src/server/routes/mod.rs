//! Route table.

mod health;
mod prompts;

use axum::routing::{get, post};
use axum::Router;
use tower_http::services::{ServeDir, ServeFile};

use crate::server::state::AppState;

/// Build the complete router.
///
/// # Route Structure
///
/// - `GET /` - frontend homepage
/// - `GET /templates`, `GET /templates.html` - template gallery page
/// - `POST /api/create_prompt_chain` - generate a template with the configured strategy
/// - `POST /api/enhanced_prompt_generation` - retrieval-augmented generation
/// - `GET /api/test` - backend reachability check
/// - `GET /api/health` - health probe
/// - anything else - static asset, or the homepage when no file matches
pub fn router(state: AppState) -> Router {
    let frontend = state.whisperer.config().frontend_dir.clone();
    let index = frontend.join("index.html");
    let templates = frontend.join("templates.html");

    let api = Router::new()
        .route("/create_prompt_chain", post(prompts::create_prompt_chain))
        .route(
            "/enhanced_prompt_generation",
            post(prompts::enhanced_prompt_generation),
        )
        .route("/test", get(health::test_api))
        .route("/health", get(health::health_check));

    Router::new()
        .nest("/api", api)
        .route_service("/", ServeFile::new(&index))
        .route_service("/templates", ServeFile::new(&templates))
        .route_service("/templates.html", ServeFile::new(&templates))
        .fallback_service(ServeDir::new(&frontend).fallback(ServeFile::new(&index)))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use whisper::{
        AnalyticsRecord, Config, Error, ErrorMode, LanguageModel, SimilarPrompt, VectorStore, Whisperer,
    };

    use super::router;
    use crate::server::state::AppState;

    #[derive(Default)]
    struct FakeModel {
        calls: AtomicUsize,
        fail: bool,
        fail_embed: bool,
    }

    impl LanguageModel for FakeModel {
        fn generate(&self, _prompt: &str) -> whisper::Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(Error::Decode("quota exhausted".to_string()));
            }
            Ok("## Bakery template\n\n- Menu".to_string())
        }

        fn embed(&self, _text: &str) -> whisper::Result<Vec<f32>> {
            if self.fail_embed {
                return Err(Error::Decode("embedding quota exhausted".to_string()));
            }
            Ok(vec![0.5; 8])
        }
    }

    #[derive(Default)]
    struct FakeStore {
        fail_search: bool,
        fail_analytics: bool,
    }

    impl VectorStore for FakeStore {
        fn match_prompts(&self, _e: &[f32], _t: f32, _c: usize) -> whisper::Result<Vec<SimilarPrompt>> {
            if self.fail_search {
                return Err(Error::Status {
                    method: "POST",
                    url: "https://db.example/rest/v1/rpc/match_prompts".to_string(),
                    status: 503,
                    body: "unavailable".to_string(),
                });
            }
            Ok(vec![])
        }

        fn record_usage(&self, _record: &AnalyticsRecord) -> whisper::Result<()> {
            if self.fail_analytics {
                return Err(Error::Decode("insert rejected".to_string()));
            }
            Ok(())
        }
    }

    fn config(frontend: &Path, error_mode: ErrorMode) -> Config {
        let mut cfg = Config::with_dirs(
            frontend.join("data"),
            frontend.join("outputs"),
            frontend.to_path_buf(),
        );
        cfg.error_mode = error_mode;
        cfg
    }

    fn app(
        frontend: &Path,
        model: Arc<FakeModel>,
        store: Option<FakeStore>,
        error_mode: ErrorMode,
    ) -> axum::Router {
        let store = store.map(|s| Arc::new(s) as Arc<dyn VectorStore>);
        let whisperer = Whisperer::new(config(frontend, error_mode), model, store);
        router(AppState::new(whisperer))
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).expect("request")
    }

    async fn send(router: axum::Router, req: Request<Body>) -> (StatusCode, Vec<u8>) {
        let resp = router.oneshot(req).await.expect("router is infallible");
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.expect("body");
        (status, bytes.to_vec())
    }

    fn as_json(bytes: &[u8]) -> Value {
        serde_json::from_slice(bytes).expect("json body")
    }

    #[tokio::test]
    async fn prompt_chain_echoes_user_input() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let model = Arc::new(FakeModel::default());
        let router = app(tmp.path(), model.clone(), None, ErrorMode::Http);

        let (status, body) = send(
            router,
            post_json("/api/create_prompt_chain", r#"{"user_input":"Create a website for my bakery"}"#),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let body = as_json(&body);
        assert_eq!(body["user_input"], "Create a website for my bakery");
        assert_eq!(body["steps"][0]["step_number"], 1);
        assert_eq!(body["steps"][0]["success"], true);
        assert!(body["steps"][0]["html_output"]
            .as_str()
            .expect("html")
            .contains("<h2>Bakery template</h2>"));
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn blank_or_missing_input_is_rejected_before_generation() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let model = Arc::new(FakeModel::default());

        for body in [r#"{"user_input":"   "}"#, r#"{}"#, r#"{"user_input":42}"#, "not json"] {
            let chain = app(tmp.path(), model.clone(), None, ErrorMode::Http);
            let (status, resp) = send(chain, post_json("/api/create_prompt_chain", body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "body {}", body);
            assert_eq!(as_json(&resp), json!({"error": "Missing user_input"}));

            let enhanced = app(tmp.path(), model.clone(), None, ErrorMode::Http);
            let (status, _) = send(enhanced, post_json("/api/enhanced_prompt_generation", body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
        }
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn model_failure_maps_to_500_in_http_mode() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let model = Arc::new(FakeModel {
            fail: true,
            ..FakeModel::default()
        });
        let router = app(tmp.path(), model, None, ErrorMode::Http);

        let (status, body) =
            send(router, post_json("/api/create_prompt_chain", r#"{"user_input":"Write a bio"}"#)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(as_json(&body)["error"], "decode failed: quota exhausted");
    }

    #[tokio::test]
    async fn model_failure_is_a_failed_step_in_band_mode() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let model = Arc::new(FakeModel {
            fail: true,
            ..FakeModel::default()
        });
        let router = app(tmp.path(), model, None, ErrorMode::InBand);

        let (status, body) =
            send(router, post_json("/api/create_prompt_chain", r#"{"user_input":"Write a bio"}"#)).await;

        assert_eq!(status, StatusCode::OK);
        let body = as_json(&body);
        assert_eq!(body["user_input"], "Write a bio");
        assert_eq!(body["success"], false);
        assert_eq!(body["steps"][0]["success"], false);
        assert_eq!(
            body["steps"][0]["output"],
            "Error generating prompt: decode failed: quota exhausted"
        );
    }

    #[tokio::test]
    async fn enhanced_generation_without_neighbours() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let router = app(
            tmp.path(),
            Arc::new(FakeModel::default()),
            Some(FakeStore::default()),
            ErrorMode::Http,
        );

        let (status, body) = send(
            router,
            post_json(
                "/api/enhanced_prompt_generation",
                r#"{"user_input":"Create a website for my bakery"}"#,
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let body = as_json(&body);
        assert_eq!(body["similar_prompts_used"], 0);
        assert_eq!(body["context_quality"], 0.0);
        assert_eq!(body["success"], true);
        assert!(!body["generated_template"].as_str().expect("template").is_empty());
    }

    #[tokio::test]
    async fn analytics_failure_leaves_response_untouched() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let request = r#"{"user_input":"Landing page for a yoga studio"}"#;

        let ok = app(
            tmp.path(),
            Arc::new(FakeModel::default()),
            Some(FakeStore::default()),
            ErrorMode::Http,
        );
        let failing = app(
            tmp.path(),
            Arc::new(FakeModel::default()),
            Some(FakeStore {
                fail_analytics: true,
                ..FakeStore::default()
            }),
            ErrorMode::Http,
        );

        let a = send(ok, post_json("/api/enhanced_prompt_generation", request)).await;
        let b = send(failing, post_json("/api/enhanced_prompt_generation", request)).await;
        assert_eq!(a, b);
        assert_eq!(a.0, StatusCode::OK);
    }

    #[tokio::test]
    async fn similarity_search_failure_maps_to_500_in_http_mode() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let model = Arc::new(FakeModel::default());
        let router = app(
            tmp.path(),
            model.clone(),
            Some(FakeStore {
                fail_search: true,
                ..FakeStore::default()
            }),
            ErrorMode::Http,
        );

        let (status, body) = send(
            router,
            post_json("/api/enhanced_prompt_generation", r#"{"user_input":"Portfolio for a photographer"}"#),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let error = as_json(&body)["error"].as_str().expect("error text").to_string();
        assert!(error.contains("503"), "error was {}", error);
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn embedding_failure_is_reported_in_band() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let model = Arc::new(FakeModel {
            fail_embed: true,
            ..FakeModel::default()
        });
        let router = app(tmp.path(), model.clone(), Some(FakeStore::default()), ErrorMode::InBand);

        let (status, body) = send(
            router,
            post_json("/api/enhanced_prompt_generation", r#"{"user_input":"Portfolio for a photographer"}"#),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let body = as_json(&body);
        assert_eq!(body["user_input"], "Portfolio for a photographer");
        assert_eq!(body["success"], false);
        assert_eq!(body["similar_prompts_used"], 0);
        assert_eq!(
            body["generated_template"],
            "Error generating prompt: decode failed: embedding quota exhausted"
        );
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn health_and_test_endpoints() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let model = Arc::new(FakeModel::default());

        let (status, body) = send(app(tmp.path(), model.clone(), None, ErrorMode::Http), get("/api/health")).await;
        assert_eq!(status, StatusCode::OK);
        let body = as_json(&body);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
        let ts = body["timestamp"].as_str().expect("timestamp");
        assert!(chrono::DateTime::parse_from_rfc3339(ts).is_ok());

        let (status, body) = send(app(tmp.path(), model, None, ErrorMode::Http), get("/api/test")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(as_json(&body)["status"], "Prompt Optimizer API is working");
    }

    #[tokio::test]
    async fn static_pages_and_spa_fallback() {
        let tmp = tempfile::tempdir().expect("tempdir");
        std::fs::write(tmp.path().join("index.html"), "<h1>home</h1>").expect("index");
        std::fs::write(tmp.path().join("templates.html"), "<h1>templates</h1>").expect("templates");
        std::fs::write(tmp.path().join("script.js"), "console.log(1)").expect("script");
        let model = Arc::new(FakeModel::default());
        let make = || app(tmp.path(), model.clone(), None, ErrorMode::Http);

        let (status, body) = send(make(), get("/")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"<h1>home</h1>");

        for uri in ["/templates", "/templates.html"] {
            let (status, body) = send(make(), get(uri)).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body, b"<h1>templates</h1>");
        }

        let (_, body) = send(make(), get("/script.js")).await;
        assert_eq!(body, b"console.log(1)");

        let (status, body) = send(make(), get("/pricing")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"<h1>home</h1>");
    }
}
