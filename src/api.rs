use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::Extension;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_http::cors::CorsLayer;

use crate::context::ExecutionContext;
use crate::engine::CommandEngine;
use crate::error::EngineError;
use crate::registry::catalog::{self, CatalogEntry};
use crate::topics::TopicRecord;

// ── Response types ───────────────────────────────────────────────

#[derive(Serialize)]
struct ApiOk<T: Serialize> {
    ok: bool,
    data: T,
}

#[derive(Serialize)]
struct ApiErr {
    ok: bool,
    error: String,
}

fn ok_json<T: Serialize>(data: T) -> impl IntoResponse {
    Json(ApiOk { ok: true, data })
}

fn err_json(status: StatusCode, msg: String) -> impl IntoResponse {
    (status, Json(ApiErr { ok: false, error: msg }))
}

// ── Request types ────────────────────────────────────────────────

#[derive(Deserialize)]
struct ExecuteBody {
    input: String,
    #[serde(default)]
    context: ExecutionContext,
}

#[derive(Deserialize)]
struct ParseBody {
    input: String,
    #[serde(default)]
    topics: Vec<TopicRecord>,
}

/// Registered commands plus the schema of the context `/execute` accepts.
#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CatalogEntry>,
    context_schema: Value,
}

/// Reject anything that is not a `/command` before it reaches the engine.
fn check_command_input(input: &str) -> Result<&str, String> {
    let trimmed = input.trim();
    if trimmed.starts_with('/') {
        Ok(trimmed)
    } else {
        Err("Input must start with \"/\"".to_string())
    }
}

// ── Handlers ─────────────────────────────────────────────────────

async fn post_execute(
    Extension(engine): Extension<Arc<CommandEngine>>,
    Json(body): Json<ExecuteBody>,
) -> impl IntoResponse {
    let input = match check_command_input(&body.input) {
        Ok(input) => input,
        Err(e) => return err_json(StatusCode::BAD_REQUEST, e).into_response(),
    };
    ok_json(engine.execute(input, &body.context).await).into_response()
}

async fn post_parse(
    Extension(engine): Extension<Arc<CommandEngine>>,
    Json(body): Json<ParseBody>,
) -> impl IntoResponse {
    let input = match check_command_input(&body.input) {
        Ok(input) => input,
        Err(e) => return err_json(StatusCode::BAD_REQUEST, e).into_response(),
    };
    match engine.parse(input, &body.topics) {
        Some(parsed) => ok_json(parsed).into_response(),
        None => {
            let err = EngineError::MalformedInput {
                available: engine.registry().names(),
            };
            err_json(StatusCode::UNPROCESSABLE_ENTITY, err.into()).into_response()
        }
    }
}

async fn get_commands(Extension(engine): Extension<Arc<CommandEngine>>) -> impl IntoResponse {
    ok_json(CommandsResponse {
        commands: engine.registry().catalog(),
        context_schema: catalog::context_schema(),
    })
}

async fn get_help(Extension(engine): Extension<Arc<CommandEngine>>) -> impl IntoResponse {
    ok_json(catalog::help_text(engine.registry()))
}

// ── Server startup ───────────────────────────────────────────────

pub fn router(engine: Arc<CommandEngine>) -> Router {
    Router::new()
        .route("/execute", post(post_execute))
        .route("/parse", post(post_parse))
        .route("/commands", get(get_commands))
        .route("/help", get(get_help))
        .layer(CorsLayer::permissive())
        .layer(Extension(engine))
}

/// Bind `addr` and serve until the listener fails. Port 0 picks a free port.
pub async fn serve(engine: Arc<CommandEngine>, addr: SocketAddr) -> Result<(), EngineError> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let local = listener.local_addr()?;
    tracing::info!(addr = %local, "API server listening");
    axum::serve(listener, router(engine)).await?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn only_slash_commands_pass() {
        assert_eq!(check_command_input("  /help  ").unwrap(), "/help");
        assert!(check_command_input("explain photosynthesis").is_err());
        assert!(check_command_input("").is_err());
    }

    #[test]
    fn bodies_accept_missing_context() {
        let body: ExecuteBody = serde_json::from_str(r#"{"input": "/help"}"#).unwrap();
        assert_eq!(body.context, ExecutionContext::default());

        let body: ParseBody = serde_json::from_str(
            r#"{"input": "/explain @cells", "topics": [{"topic_name": "Cells", "topic_page_start": 1, "topic_page_end": 2}]}"#,
        )
        .unwrap();
        assert_eq!(body.topics.len(), 1);
    }
}
