//! Prompt generation endpoints.

use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use serde_json::Value;
use whisper::{EnhancedResult, ErrorMode, PromptChainResult, Whisperer};

use crate::server::error::ApiError;
use crate::server::state::AppState;

/// `POST /api/create_prompt_chain`
pub async fn create_prompt_chain(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<PromptChainResult>, ApiError> {
    let user_input = user_input(&body)?;
    tracing::info!(input_len = user_input.len(), "creating prompt chain");

    let input = user_input.clone();
    let outcome = run_blocking(state.whisperer, move |w| w.execute_prompt_chain(&input)).await?;

    match (outcome, state.error_mode) {
        (Ok(result), _) => Ok(Json(result)),
        (Err(err), ErrorMode::InBand) => {
            tracing::warn!(error = %err, "prompt chain failed; reporting in-band");
            Ok(Json(PromptChainResult::failed(&user_input, &err)))
        }
        (Err(err), ErrorMode::Http) => Err(err.into()),
    }
}

/// `POST /api/enhanced_prompt_generation`
pub async fn enhanced_prompt_generation(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<EnhancedResult>, ApiError> {
    let user_input = user_input(&body)?;
    tracing::info!(input_len = user_input.len(), "enhanced prompt generation");

    let input = user_input.clone();
    let outcome = run_blocking(state.whisperer, move |w| w.enhanced_generation(&input)).await?;

    match (outcome, state.error_mode) {
        (Ok(result), _) => Ok(Json(result)),
        (Err(err), ErrorMode::InBand) => {
            tracing::warn!(error = %err, "enhanced generation failed; reporting in-band");
            Ok(Json(EnhancedResult::failed(&user_input, &err)))
        }
        (Err(err), ErrorMode::Http) => Err(err.into()),
    }
}

/// Pull a non-blank `user_input` string out of the body.
///
/// A body that is not JSON, or lacks the field, is rejected the same way as a
/// blank value: before any external call is made.
fn user_input(body: &[u8]) -> Result<String, ApiError> {
    serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|v| v.get("user_input").and_then(Value::as_str).map(str::to_string))
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("Missing user_input".to_string()))
}

async fn run_blocking<T, F>(whisperer: Whisperer, f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&Whisperer) -> T + Send + 'static,
{
    tokio::task::spawn_blocking(move || f(&whisperer))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))
}
