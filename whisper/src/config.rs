use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::Result;
use crate::templates::TemplateStrategy;

/// How a failed generation call is reported to HTTP clients.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ErrorMode {
    /// 500 with `{"error": ...}`.
    #[default]
    Http,
    /// 200 with a failed step carrying the error text.
    InBand,
}

impl FromStr for ErrorMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "http" | "5xx" => Ok(Self::Http),
            "in-band" | "inband" | "in_band" => Ok(Self::InBand),
            other => Err(format!("unknown error mode: {}", other)),
        }
    }
}

impl fmt::Display for ErrorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http => f.write_str("http"),
            Self::InBand => f.write_str("in-band"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub gemini_api_key: String,
    pub gemini_base_url: String,
    pub model_name: String,
    pub embed_model: String,
    /// Output-token cap sent to the model; `None` leaves the provider default.
    pub max_tokens: Option<u32>,
    pub temperature: f32,
    pub supabase_url: Option<String>,
    pub supabase_key: Option<String>,
    pub match_function: String,
    pub analytics_table: String,
    pub match_threshold: f32,
    pub match_count: usize,
    pub excerpt_chars: usize,
    pub data_dir: PathBuf,
    pub raw_data_dir: PathBuf,
    pub processed_data_dir: PathBuf,
    pub combined_dataset: PathBuf,
    pub output_dir: PathBuf,
    pub frontend_dir: PathBuf,
    /// Spacing between requests in batch mode. The server never throttles.
    pub request_delay: Duration,
    pub http_timeout: Duration,
    pub template: TemplateStrategy,
    pub error_mode: ErrorMode,
    pub bind_addr: String,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = PathBuf::from("data");
        Self::with_dirs(data_dir, PathBuf::from("outputs"), PathBuf::from("frontend"))
    }
}

impl Config {
    pub fn from_env() -> Self {
        // Optional .env in the working directory.
        let _ = dotenvy::dotenv();
        let data_dir = PathBuf::from(env::var("WHISPERER_DATA_DIR").unwrap_or_else(|_| "data".to_string()));
        let output_dir =
            PathBuf::from(env::var("WHISPERER_OUTPUT_DIR").unwrap_or_else(|_| "outputs".to_string()));
        let frontend_dir =
            PathBuf::from(env::var("WHISPERER_FRONTEND_DIR").unwrap_or_else(|_| "frontend".to_string()));
        let defaults = Self::with_dirs(data_dir, output_dir, frontend_dir);

        Self {
            gemini_api_key: env::var("GEMINI_API_KEY").unwrap_or_default(),
            gemini_base_url: env::var("GEMINI_BASE_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or(defaults.gemini_base_url),
            model_name: env::var("GEMINI_MODEL").unwrap_or(defaults.model_name),
            embed_model: env::var("GEMINI_EMBED_MODEL").unwrap_or(defaults.embed_model),
            max_tokens: parsed::<u32>("WHISPERER_MAX_TOKENS")
                .filter(|&n| n > 0)
                .or(defaults.max_tokens),
            temperature: parsed("WHISPERER_TEMPERATURE").unwrap_or(defaults.temperature),
            supabase_url: non_empty("SUPABASE_URL").map(|v| v.trim_end_matches('/').to_string()),
            supabase_key: non_empty("SUPABASE_KEY"),
            match_function: env::var("SUPABASE_MATCH_FUNCTION").unwrap_or(defaults.match_function),
            analytics_table: env::var("SUPABASE_ANALYTICS_TABLE").unwrap_or(defaults.analytics_table),
            match_threshold: parsed("WHISPERER_MATCH_THRESHOLD").unwrap_or(defaults.match_threshold),
            match_count: parsed("WHISPERER_MATCH_COUNT").unwrap_or(defaults.match_count),
            excerpt_chars: defaults.excerpt_chars,
            data_dir: defaults.data_dir,
            raw_data_dir: defaults.raw_data_dir,
            processed_data_dir: defaults.processed_data_dir,
            combined_dataset: defaults.combined_dataset,
            output_dir: defaults.output_dir,
            frontend_dir: defaults.frontend_dir,
            request_delay: parsed("WHISPERER_REQUEST_DELAY_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.request_delay),
            http_timeout: parsed("WHISPERER_HTTP_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.http_timeout),
            template: parsed("WHISPERER_TEMPLATE").unwrap_or(defaults.template),
            error_mode: parsed("WHISPERER_ERROR_MODE").unwrap_or(defaults.error_mode),
            bind_addr: parsed::<u16>("PORT")
                .map(|port| format!("0.0.0.0:{}", port))
                .unwrap_or(defaults.bind_addr),
        }
    }

    /// Defaults rooted at the given directories.
    pub fn with_dirs(data_dir: PathBuf, output_dir: PathBuf, frontend_dir: PathBuf) -> Self {
        let raw_data_dir = data_dir.join("raw");
        let processed_data_dir = data_dir.join("processed");
        let combined_dataset = processed_data_dir.join("combined_prompts.csv");
        Self {
            gemini_api_key: String::new(),
            gemini_base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model_name: "gemini-2.5-flash".to_string(),
            embed_model: "text-embedding-004".to_string(),
            max_tokens: None,
            temperature: 0.7,
            supabase_url: None,
            supabase_key: None,
            match_function: "match_prompts".to_string(),
            analytics_table: "prompt_analytics".to_string(),
            match_threshold: 0.45,
            match_count: 3,
            excerpt_chars: 400,
            data_dir,
            raw_data_dir,
            processed_data_dir,
            combined_dataset,
            output_dir,
            frontend_dir,
            request_delay: Duration::from_secs(1),
            http_timeout: Duration::from_secs(120),
            template: TemplateStrategy::default(),
            error_mode: ErrorMode::default(),
            bind_addr: "0.0.0.0:8000".to_string(),
        }
    }

    /// Retrieval and analytics are enabled only when both URL and key are set.
    pub fn supabase_enabled(&self) -> bool {
        self.supabase_url.is_some() && self.supabase_key.is_some()
    }

    pub fn ensure_directories(&self) -> Result<()> {
        for dir in [&self.output_dir, &self.processed_data_dir, &self.raw_data_dir] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}

fn parsed<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
