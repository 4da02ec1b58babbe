//! REST API Server for the account insight pipeline
//!
//! Exposes run / notify / state to a presentation client over HTTP

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::error::InsightError;
use crate::pipeline::InsightPipeline;

/// =============================
/// Response Wrapper
/// =============================

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub timestamp: String,
}

impl ApiResponse {
    pub fn success<T: Serialize>(data: T) -> Self {
        Self {
            success: true,
            data: serde_json::to_value(data).ok(),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub pipeline: Arc<InsightPipeline>,
}

fn status_for(error: &InsightError) -> StatusCode {
    match error {
        InsightError::ConcurrentRunError | InsightError::NotReadyError => StatusCode::CONFLICT,
        InsightError::ConfigError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        InsightError::FetchError { .. }
        | InsightError::CompletionError(_)
        | InsightError::NoCompletionError
        | InsightError::DeliveryError(_) => StatusCode::BAD_GATEWAY,
    }
}

fn error_response(error: InsightError) -> (StatusCode, Json<ApiResponse>) {
    (status_for(&error), Json(ApiResponse::error(error.to_string())))
}

/// =============================
/// Endpoints
/// =============================

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn pipeline_state(State(state): State<ApiState>) -> (StatusCode, Json<ApiResponse>) {
    let snapshot = state.pipeline.snapshot().await;
    (StatusCode::OK, Json(ApiResponse::success(snapshot)))
}

async fn run_summary(State(state): State<ApiState>) -> (StatusCode, Json<ApiResponse>) {
    info!("Received summary request");

    match state.pipeline.run().await {
        Ok(summary) => (
            StatusCode::OK,
            Json(ApiResponse::success(serde_json::json!({
                "state": state.pipeline.state(),
                "summary": summary.text,
            }))),
        ),
        Err(e) => error_response(e),
    }
}

async fn notify(State(state): State<ApiState>) -> (StatusCode, Json<ApiResponse>) {
    info!("Received notify request");

    match state.pipeline.notify().await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse::success(serde_json::json!({ "delivered": true }))),
        ),
        Err(e) => error_response(e),
    }
}

/// =============================
/// Router
/// =============================

pub fn create_router(pipeline: Arc<InsightPipeline>) -> Router {
    let state = ApiState { pipeline };

    Router::new()
        .route("/health", get(health))
        .route("/api/state", get(pipeline_state))
        .route("/api/summary", post(run_summary))
        .route("/api/notify", post(notify))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    pipeline: Arc<InsightPipeline>,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(pipeline);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::banking::{BankDataAggregator, BankingProvider};
    use crate::models::{
        AccountBalance, ChatCompletionResponse, ChatMessage, Choice, CompletionMessage,
        CurrencyAmount, DirectDebitSet, SpendingBreakdown,
    };
    use crate::notify::{NotificationDispatcher, VoiceProvider};
    use crate::summarizer::{CompletionProvider, Summarizer};
    use crate::Result;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    struct QuietBank;

    #[async_trait]
    impl BankingProvider for QuietBank {
        async fn fetch_balance(&self) -> Result<AccountBalance> {
            Ok(AccountBalance {
                amount: CurrencyAmount {
                    currency: "GBP".to_string(),
                    minor_units: 1000,
                },
            })
        }

        async fn fetch_spending(&self) -> Result<SpendingBreakdown> {
            Ok(SpendingBreakdown {
                total_spent: 0.0,
                currency: None,
                categories: vec![],
            })
        }

        async fn fetch_direct_debits(&self) -> Result<DirectDebitSet> {
            Ok(DirectDebitSet { mandates: vec![] })
        }
    }

    struct EchoCompletion;

    #[async_trait]
    impl CompletionProvider for EchoCompletion {
        async fn complete(&self, _messages: Vec<ChatMessage>) -> Result<ChatCompletionResponse> {
            Ok(ChatCompletionResponse {
                choices: vec![Choice {
                    index: 0,
                    message: CompletionMessage {
                        role: "assistant".to_string(),
                        content: Some("All quiet on your account.".to_string()),
                    },
                }],
            })
        }
    }

    struct SilentVoice;

    #[async_trait]
    impl VoiceProvider for SilentVoice {
        async fn place_call(&self, _twiml: &str) -> Result<()> {
            Ok(())
        }
    }

    fn router() -> Router {
        let pipeline = InsightPipeline::new(
            BankDataAggregator::new(Arc::new(QuietBank), "Mike"),
            Summarizer::new(Arc::new(EchoCompletion)),
            NotificationDispatcher::new(Arc::new(SilentVoice)),
        );
        create_router(Arc::new(pipeline))
    }

    async fn send(router: &Router, method: &str, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = router
            .clone()
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(&router(), "GET", "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_notify_before_summary_is_conflict() {
        let (status, body) = send(&router(), "POST", "/api/notify").await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_summary_then_state_then_notify() {
        let router = router();

        let (status, body) = send(&router, "GET", "/api/state").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["state"], "idle");
        assert!(body["data"]["summary"].is_null());

        let (status, body) = send(&router, "POST", "/api/summary").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["summary"], "All quiet on your account.");

        let (_, body) = send(&router, "GET", "/api/state").await;
        assert_eq!(body["data"]["state"], "ready");
        assert_eq!(body["data"]["summary"]["text"], "All quiet on your account.");

        let (status, body) = send(&router, "POST", "/api/notify").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["delivered"], true);
    }

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(
            status_for(&InsightError::ConcurrentRunError),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_for(&InsightError::NoCompletionError),
            StatusCode::BAD_GATEWAY
        );
    }
}
