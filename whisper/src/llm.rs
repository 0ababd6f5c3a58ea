use crate::error::Result;

/// A hosted generative model: one text completion call and one embedding call.
///
/// Calls block; async callers run them on a blocking thread.
pub trait LanguageModel: Send + Sync {
    fn generate(&self, prompt: &str) -> Result<String>;

    fn embed(&self, text: &str) -> Result<Vec<f32>>;
}
