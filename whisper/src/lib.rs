mod chain;
mod config;
pub mod dataset;
mod error;
mod gemini;
mod http;
mod llm;
mod markdown;
pub mod report;
mod retrieval;
mod supabase;
mod templates;

pub use chain::{ChainStep, EnhancedResult, PromptChainResult, Whisperer};
pub use config::{Config, ErrorMode};
pub use error::{Error, Result};
pub use gemini::GeminiClient;
pub use llm::LanguageModel;
pub use markdown::render_markdown;
pub use retrieval::{context_quality, format_context, retrieve_context, RetrievedContext, NO_CONTEXT};
pub use supabase::{AnalyticsRecord, SimilarPrompt, SupabaseClient, VectorStore};
pub use templates::{build_prompt, TemplateStrategy};
