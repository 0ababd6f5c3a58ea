use chrono::{DateTime, Utc};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::http::{build_client, post_json, post_json_no_content};

/// One stored example returned by the similarity search.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimilarPrompt {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub task_description: String,
    #[serde(default)]
    pub good_prompt: String,
    #[serde(default)]
    pub prompt_type: Option<String>,
    pub similarity: f32,
}

/// Usage summary written after an enhanced generation.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AnalyticsRecord {
    pub timestamp: DateTime<Utc>,
    pub user_input_length: usize,
    pub similar_prompts_used: usize,
    pub context_quality: f64,
    pub success: bool,
}

/// A hosted store that can find stored examples near an embedding and accept usage records.
pub trait VectorStore: Send + Sync {
    fn match_prompts(&self, embedding: &[f32], threshold: f32, count: usize) -> Result<Vec<SimilarPrompt>>;

    fn record_usage(&self, record: &AnalyticsRecord) -> Result<()>;
}

#[derive(Serialize)]
struct MatchRequest<'a> {
    query_embedding: &'a [f32],
    match_threshold: f32,
    match_count: usize,
}

/// Supabase PostgREST client: one RPC for similarity search, one table for analytics.
pub struct SupabaseClient {
    client: Client,
    url: String,
    key: String,
    match_function: String,
    analytics_table: String,
}

impl SupabaseClient {
    pub fn new(cfg: &Config) -> Result<Self> {
        let url = cfg.supabase_url.clone().ok_or(Error::MissingConfig("SUPABASE_URL"))?;
        let key = cfg.supabase_key.clone().ok_or(Error::MissingConfig("SUPABASE_KEY"))?;
        Ok(Self {
            client: build_client(cfg.http_timeout)?,
            url: url.trim_end_matches('/').to_string(),
            key,
            match_function: cfg.match_function.clone(),
            analytics_table: cfg.analytics_table.clone(),
        })
    }

    /// Build the client only when both URL and key are configured.
    pub fn from_config(cfg: &Config) -> Result<Option<Self>> {
        if cfg.supabase_enabled() {
            Self::new(cfg).map(Some)
        } else {
            Ok(None)
        }
    }
}

impl VectorStore for SupabaseClient {
    fn match_prompts(&self, embedding: &[f32], threshold: f32, count: usize) -> Result<Vec<SimilarPrompt>> {
        if embedding.is_empty() {
            return Ok(vec![]);
        }
        let url = format!("{}/rest/v1/rpc/{}", self.url, self.match_function);
        let req = MatchRequest {
            query_embedding: embedding,
            match_threshold: threshold,
            match_count: count,
        };
        let hits: Vec<SimilarPrompt> = post_json(&self.client, &url, &req, |r| {
            r.header("apikey", &self.key).bearer_auth(&self.key)
        })?;
        tracing::debug!(hits = hits.len(), "similarity search");
        Ok(hits)
    }

    fn record_usage(&self, record: &AnalyticsRecord) -> Result<()> {
        let url = format!("{}/rest/v1/{}", self.url, self.analytics_table);
        post_json_no_content(&self.client, &url, record, |r| {
            r.header("apikey", &self.key)
                .bearer_auth(&self.key)
                .header("Prefer", "return=minimal")
        })
    }
}
