//! HTTP API

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use stepcase_common::{Error, FormattedOutput, OutputFormat, Project, Step};

use crate::agents::{Agent, HttpAgent};
use crate::config::ServiceConfig;
use crate::pipeline;

/// Shared handler state. Read-only once built.
#[derive(Clone)]
pub struct AppState {
    agent: Arc<dyn Agent>,
}

impl AppState {
    pub fn new(agent: Arc<dyn Agent>) -> Self {
        Self { agent }
    }

    /// State talking to the configured HTTP agents.
    pub fn from_config(cfg: &ServiceConfig) -> stepcase_common::Result<Self> {
        let agent = HttpAgent::new(cfg.agents.clone(), cfg.request_timeout)?;
        Ok(Self::new(Arc::new(agent)))
    }
}

/// Build the API router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health_handler))
        .route("/ss-to-yaml", post(screenshot_to_yaml_handler))
        .route("/yaml-to-tc", post(yaml_to_test_cases_handler))
        .route("/project", post(project_handler))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the API until Ctrl-C.
pub async fn serve(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    info!("Stepcase API listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Stepcase API stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}

// ============================================================================
// Errors
// ============================================================================

/// Agent failures are 502, anything else 500. Bad request bodies never get
/// here: the `Json` extractor rejects them first.
struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = if self.0.is_upstream() {
            StatusCode::BAD_GATEWAY
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        error!("request failed ({}): {}", status, self.0);
        (
            status,
            Json(serde_json::json!({ "error": self.0.to_string() })),
        )
            .into_response()
    }
}

// ============================================================================
// Handlers
// ============================================================================

#[derive(Debug, Default, Deserialize)]
struct FormatQuery {
    #[serde(default)]
    format: OutputFormat,
}

fn formatted_response(output: FormattedOutput) -> Response {
    match output {
        FormattedOutput::Text(text) => text.into_response(),
        FormattedOutput::Json(suite) => Json(suite).into_response(),
    }
}

async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({ "message": "Hello, World!" }))
}

async fn screenshot_to_yaml_handler(
    State(state): State<AppState>,
    Json(step): Json<Step>,
) -> Result<Response, ApiError> {
    let yaml = pipeline::structure_for_step(state.agent.as_ref(), &step).await?;
    Ok(yaml.into_response())
}

/// Test cases straight from the submitted project, no screenshot pass.
async fn yaml_to_test_cases_handler(
    State(state): State<AppState>,
    Query(query): Query<FormatQuery>,
    Json(project): Json<Project>,
) -> Result<Response, ApiError> {
    let output =
        pipeline::test_cases_for_project(state.agent.as_ref(), &project, query.format).await?;
    Ok(formatted_response(output))
}

/// Screenshot pass over every step, then test cases.
async fn project_handler(
    State(state): State<AppState>,
    Query(query): Query<FormatQuery>,
    Json(project): Json<Project>,
) -> Result<Response, ApiError> {
    let output =
        pipeline::generate_from_project(state.agent.as_ref(), project, query.format).await?;
    Ok(formatted_response(output))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Call, RecordingAgent};
    use axum::body::Body;
    use axum::http::{header, Request};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    const LOGIN_PROJECT: &str = r#"{"project":"P","scenarios":[{"id":"s1","name":"Login","steps":[{"order":1,"image":"http://x/img.png"}]}]}"#;

    fn app(agent: Arc<RecordingAgent>) -> Router {
        router(AppState::new(agent))
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_string(resp: Response) -> String {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let resp = app(Arc::new(RecordingAgent::new("")))
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = serde_json::from_str(&body_string(resp).await).unwrap();
        assert_eq!(body, json!({ "message": "Hello, World!" }));
    }

    #[tokio::test]
    async fn test_screenshot_to_yaml_returns_plain_text() {
        let agent = Arc::new(RecordingAgent::new(""));
        let resp = app(agent.clone())
            .oneshot(post_json("/ss-to-yaml", r#"{"order":1,"image":"http://x/img.png"}"#))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        let content_type = resp.headers()[header::CONTENT_TYPE].to_str().unwrap().to_string();
        assert!(content_type.starts_with("text/plain"));
        assert_eq!(body_string(resp).await, "yaml for http://x/img.png");
        assert_eq!(
            agent.calls(),
            vec![Call::Screenshot {
                context: None,
                image: "http://x/img.png".into()
            }]
        );
    }

    #[tokio::test]
    async fn test_project_returns_generated_text() {
        let agent = Arc::new(RecordingAgent::new("TC1: ..."));
        let resp = app(agent.clone())
            .oneshot(post_json("/project", LOGIN_PROJECT))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_string(resp).await, "TC1: ...");
        assert_eq!(agent.screenshot_images(), vec!["http://x/img.png"]);
        match agent.calls().last() {
            Some(Call::TestCases { project }) => assert_eq!(
                project.scenarios[0].steps[0].yaml.as_deref(),
                Some("yaml for http://x/img.png")
            ),
            other => panic!("expected test-case call, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_project_is_idempotent() {
        let router = app(Arc::new(RecordingAgent::new("TC1: login works")));
        let first = router
            .clone()
            .oneshot(post_json("/project", LOGIN_PROJECT))
            .await
            .unwrap();
        let second = router
            .oneshot(post_json("/project", LOGIN_PROJECT))
            .await
            .unwrap();
        assert_eq!(body_string(first).await, body_string(second).await);
    }

    #[tokio::test]
    async fn test_yaml_to_tc_skips_enrichment() {
        let agent = Arc::new(RecordingAgent::new("TC1: ..."));
        let resp = app(agent.clone())
            .oneshot(post_json("/yaml-to-tc", LOGIN_PROJECT))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_string(resp).await, "TC1: ...");
        assert!(agent.screenshot_images().is_empty());
        match agent.calls().as_slice() {
            [Call::TestCases { project }] => {
                assert!(project.scenarios[0].steps[0].yaml.is_none())
            }
            other => panic!("expected a single test-case call, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_json_format() {
        let agent = Arc::new(RecordingAgent::new(
            "Feature: Login\n  Scenario: Valid user\n    Given the login page\n    Then the dashboard",
        ));
        let resp = app(agent)
            .oneshot(post_json("/project?format=json", LOGIN_PROJECT))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = serde_json::from_str(&body_string(resp).await).unwrap();
        assert_eq!(body["feature"], "Login");
        assert_eq!(body["scenarios"][0]["name"], "Valid user");
        assert_eq!(body["scenarios"][0]["steps"][1]["type"], "Then");
    }

    #[tokio::test]
    async fn test_unknown_format_is_client_error() {
        let agent = Arc::new(RecordingAgent::new("TC"));
        let resp = app(agent.clone())
            .oneshot(post_json("/yaml-to-tc?format=xml", LOGIN_PROJECT))
            .await
            .unwrap();
        assert!(resp.status().is_client_error());
        assert!(agent.calls().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_body_makes_no_agent_calls() {
        let agent = Arc::new(RecordingAgent::new("TC"));
        let router = app(agent.clone());

        for (uri, body) in [
            ("/project", r#"{"scenarios":[]}"#),
            ("/project", r#"{"project":"P","scenarios":[{"id":"s","name":"n","steps":[{"order":"one","image":"i"}]}]}"#),
            ("/yaml-to-tc", "not json"),
            ("/ss-to-yaml", r#"{"order":1}"#),
        ] {
            let resp = router.clone().oneshot(post_json(uri, body)).await.unwrap();
            assert!(resp.status().is_client_error(), "{} {} -> {}", uri, body, resp.status());
        }
        assert!(agent.calls().is_empty());
    }

    #[tokio::test]
    async fn test_agent_failure_is_bad_gateway() {
        let agent = Arc::new(RecordingAgent::new("TC").failing_on("http://x/img.png"));
        let resp = app(agent.clone())
            .oneshot(post_json("/project", LOGIN_PROJECT))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
        let body: Value = serde_json::from_str(&body_string(resp).await).unwrap();
        assert!(body["error"].as_str().unwrap().contains("500"));
        assert!(!agent
            .calls()
            .iter()
            .any(|call| matches!(call, Call::TestCases { .. })));
    }

    #[tokio::test]
    async fn test_missing_text_is_internal_error() {
        let agent = Arc::new(RecordingAgent::new("TC").without_text());
        let resp = app(agent)
            .oneshot(post_json("/ss-to-yaml", r#"{"order":1,"image":"http://x/img.png"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
