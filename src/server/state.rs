use whisper::{ErrorMode, Whisperer};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub whisperer: Whisperer,
    pub error_mode: ErrorMode,
}

impl AppState {
    pub fn new(whisperer: Whisperer) -> Self {
        let error_mode = whisperer.config().error_mode;
        tracing::info!(
            template = %whisperer.config().template,
            error_mode = %error_mode,
            retrieval = whisperer.has_store(),
            frontend = %whisperer.config().frontend_dir.display(),
            "application state ready"
        );
        Self { whisperer, error_mode }
    }
}
