//! HTTP front door: static frontend plus the JSON prompt API.
//!
//! Handlers never talk to the model directly. They hand the request to the
//! shared [`whisper::Whisperer`] on a blocking thread and map its outcome to a
//! response according to the configured [`whisper::ErrorMode`].

mod error;
mod routes;
mod state;

pub use self::routes::router;
pub use self::state::AppState;

use axum::http::Request;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::Level;
use whisper::Whisperer;

/// Bind `bind_addr` and serve until the process is stopped.
pub async fn serve(whisperer: Whisperer, bind_addr: &str) -> anyhow::Result<()> {
    let state = AppState::new(whisperer);

    let app = router(state)
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                tracing::span!(
                    Level::INFO,
                    "http_request",
                    method = %request.method(),
                    path = %request.uri().path(),
                )
            }),
        )
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!(addr = %bind_addr, "starting server");

    axum::serve(listener, app).await?;

    Ok(())
}
