use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::gemini::GeminiClient;
use crate::llm::LanguageModel;
use crate::markdown::render_markdown;
use crate::retrieval::{retrieve_context, RetrievedContext};
use crate::supabase::{AnalyticsRecord, SupabaseClient, VectorStore};
use crate::templates::{build_prompt, TemplateStrategy};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChainStep {
    pub step_number: u32,
    pub output: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_output: Option<String>,
    pub success: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PromptChainResult {
    pub user_input: String,
    pub steps: Vec<ChainStep>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similar_prompts_used: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_quality: Option<f64>,
    pub success: bool,
}

impl PromptChainResult {
    /// A result whose only step carries the error text instead of a template.
    pub fn failed(user_input: &str, err: &Error) -> Self {
        Self {
            user_input: user_input.to_string(),
            steps: vec![ChainStep {
                step_number: 1,
                output: format!("Error generating prompt: {}", err),
                html_output: None,
                success: false,
            }],
            similar_prompts_used: None,
            context_quality: None,
            success: false,
        }
    }

    /// Text of the last step, which is what a user copies.
    pub fn final_output(&self) -> Option<&str> {
        self.steps.last().map(|s| s.output.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnhancedResult {
    pub user_input: String,
    pub similar_prompts_used: usize,
    pub generated_template: String,
    pub context_quality: f64,
    pub success: bool,
}

impl EnhancedResult {
    pub fn failed(user_input: &str, err: &Error) -> Self {
        Self {
            user_input: user_input.to_string(),
            similar_prompts_used: 0,
            generated_template: format!("Error generating prompt: {}", err),
            context_quality: 0.0,
            success: false,
        }
    }
}

/// Process-wide handles for the model and the optional vector store.
///
/// Built once at startup and shared read-only between requests.
#[derive(Clone)]
pub struct Whisperer {
    cfg: Arc<Config>,
    llm: Arc<dyn LanguageModel>,
    store: Option<Arc<dyn VectorStore>>,
}

impl Whisperer {
    pub fn new(cfg: Config, llm: Arc<dyn LanguageModel>, store: Option<Arc<dyn VectorStore>>) -> Self {
        Self {
            cfg: Arc::new(cfg),
            llm,
            store,
        }
    }

    /// Connect to Gemini and, when configured, Supabase.
    pub fn from_config(cfg: Config) -> Result<Self> {
        let llm: Arc<dyn LanguageModel> = Arc::new(GeminiClient::new(&cfg)?);
        let store = SupabaseClient::from_config(&cfg)?.map(|s| Arc::new(s) as Arc<dyn VectorStore>);
        if store.is_none() {
            tracing::info!("supabase not configured; retrieval disabled");
        }
        Ok(Self::new(cfg, llm, store))
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    pub fn has_store(&self) -> bool {
        self.store.is_some()
    }

    /// Run the chain with the configured template strategy.
    pub fn execute_prompt_chain(&self, user_input: &str) -> Result<PromptChainResult> {
        self.execute_with(self.cfg.template, user_input)
    }

    pub fn execute_with(&self, strategy: TemplateStrategy, user_input: &str) -> Result<PromptChainResult> {
        self.execute_with_context(strategy, user_input).map(|(result, _)| result)
    }

    /// Like [`Whisperer::execute_with`], also returning what retrieval found.
    ///
    /// The result echoes `user_input` as given; the prompt sees it trimmed.
    pub fn execute_with_context(
        &self,
        strategy: TemplateStrategy,
        user_input: &str,
    ) -> Result<(PromptChainResult, Option<RetrievedContext>)> {
        let request = user_input.trim();
        if request.is_empty() {
            return Err(Error::EmptyInput);
        }

        let context = if strategy.uses_retrieval() {
            Some(self.retrieve(request)?)
        } else {
            None
        };

        let prompt = build_prompt(strategy, request, context.as_ref().map(|c| c.text.as_str()));
        let output = self.llm.generate(&prompt)?.trim().to_string();
        tracing::info!(%strategy, output_len = output.len(), "prompt chain step completed");

        let html_output = strategy.renders_html().then(|| render_markdown(&output));
        let result = PromptChainResult {
            user_input: user_input.to_string(),
            steps: vec![ChainStep {
                step_number: 1,
                output,
                html_output,
                success: true,
            }],
            similar_prompts_used: context.as_ref().map(|c| c.hits.len()),
            context_quality: context.as_ref().map(|c| c.quality),
            success: true,
        };
        Ok((result, context))
    }

    /// Retrieval-augmented generation followed by a best-effort analytics write.
    pub fn enhanced_generation(&self, user_input: &str) -> Result<EnhancedResult> {
        let request = user_input.trim();
        if request.is_empty() {
            return Err(Error::EmptyInput);
        }

        let outcome = self.generate_enhanced(request).map(|mut r| {
            r.user_input = user_input.to_string();
            r
        });
        let (used, quality, success) = match &outcome {
            Ok(r) => (r.similar_prompts_used, r.context_quality, true),
            Err(_) => (0, 0.0, false),
        };
        self.log_usage(&AnalyticsRecord {
            timestamp: Utc::now(),
            user_input_length: request.chars().count(),
            similar_prompts_used: used,
            context_quality: quality,
            success,
        });
        outcome
    }

    fn generate_enhanced(&self, user_input: &str) -> Result<EnhancedResult> {
        let context = self.retrieve(user_input)?;
        let prompt = build_prompt(TemplateStrategy::ContextAugmented, user_input, Some(&context.text));
        let generated_template = self.llm.generate(&prompt)?.trim().to_string();
        tracing::info!(
            similar = context.hits.len(),
            quality = context.quality,
            "enhanced generation completed"
        );
        Ok(EnhancedResult {
            user_input: user_input.to_string(),
            similar_prompts_used: context.hits.len(),
            generated_template,
            context_quality: context.quality,
            success: true,
        })
    }

    pub fn retrieve(&self, user_input: &str) -> Result<RetrievedContext> {
        retrieve_context(&self.cfg, self.llm.as_ref(), self.store.as_deref(), user_input)
    }

    // Analytics must never affect the caller's result.
    fn log_usage(&self, record: &AnalyticsRecord) {
        let Some(store) = &self.store else {
            return;
        };
        if let Err(err) = store.record_usage(record) {
            tracing::warn!(error = %err, "analytics write failed");
        }
    }
}
