use crate::config::Config;
use crate::error::Result;
use crate::llm::LanguageModel;
use crate::supabase::{SimilarPrompt, VectorStore};

pub const NO_CONTEXT: &str = "No similar examples found.";

/// Retrieved neighbours plus the text block handed to the prompt template.
#[derive(Clone, Debug, PartialEq)]
pub struct RetrievedContext {
    pub hits: Vec<SimilarPrompt>,
    pub text: String,
    pub quality: f64,
}

impl RetrievedContext {
    pub fn empty() -> Self {
        Self {
            hits: Vec::new(),
            text: NO_CONTEXT.to_string(),
            quality: 0.0,
        }
    }

    pub fn from_hits(hits: Vec<SimilarPrompt>, excerpt_chars: usize) -> Self {
        let text = format_context(&hits, excerpt_chars);
        let quality = context_quality(&hits);
        Self { hits, text, quality }
    }
}

/// Embed the request, look up near neighbours and format them.
///
/// Without a store there is nothing to retrieve and the empty context is returned.
pub fn retrieve_context(
    cfg: &Config,
    llm: &dyn LanguageModel,
    store: Option<&dyn VectorStore>,
    user_input: &str,
) -> Result<RetrievedContext> {
    let Some(store) = store else {
        return Ok(RetrievedContext::empty());
    };
    let embedding = llm.embed(user_input)?;
    let hits = store.match_prompts(&embedding, cfg.match_threshold, cfg.match_count)?;
    tracing::info!(hits = hits.len(), "retrieved similar prompts");
    Ok(RetrievedContext::from_hits(hits, cfg.excerpt_chars))
}

pub fn format_context(hits: &[SimilarPrompt], excerpt_chars: usize) -> String {
    let mut blocks = Vec::new();
    for (i, hit) in hits.iter().enumerate() {
        blocks.push(format!(
            "Example {} (similarity: {:.3})\nTask: {}\nExample prompt: {}",
            i + 1,
            hit.similarity,
            hit.task_description.trim(),
            excerpt(hit.good_prompt.trim(), excerpt_chars)
        ));
    }

    if blocks.is_empty() {
        NO_CONTEXT.to_string()
    } else {
        blocks.join("\n\n")
    }
}

/// Mean similarity of the neighbours, rounded to three decimals; `0.0` when empty.
pub fn context_quality(hits: &[SimilarPrompt]) -> f64 {
    if hits.is_empty() {
        return 0.0;
    }
    let sum: f64 = hits.iter().map(|h| f64::from(h.similarity)).sum();
    round3(sum / hits.len() as f64)
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

fn excerpt(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(similarity: f32, prompt: &str) -> SimilarPrompt {
        SimilarPrompt {
            id: None,
            task_description: "Bakery website".to_string(),
            good_prompt: prompt.to_string(),
            prompt_type: None,
            similarity,
        }
    }

    #[test]
    fn quality_is_rounded_mean() {
        let hits = vec![hit(0.9, "a"), hit(0.5, "b"), hit(0.6, "c")];
        assert_eq!(context_quality(&hits), 0.667);
        assert_eq!(context_quality(&[]), 0.0);
    }

    #[test]
    fn empty_hits_use_placeholder() {
        assert_eq!(format_context(&[], 400), NO_CONTEXT);
    }

    #[test]
    fn long_examples_are_truncated_by_chars() {
        let long = "é".repeat(450);
        let text = format_context(&[hit(0.8126, &long)], 400);
        assert!(text.starts_with("Example 1 (similarity: 0.813)\nTask: Bakery website\n"));
        let body = text.split("Example prompt: ").nth(1).expect("prompt line");
        assert_eq!(body.chars().count(), 403);
        assert!(body.ends_with("..."));
    }

    #[test]
    fn short_examples_are_kept_whole() {
        let text = format_context(&[hit(0.5, "Write a menu"), hit(0.46, "Write hours")], 400);
        assert!(text.contains("Example prompt: Write a menu\n\nExample 2"));
        assert!(!text.contains("..."));
    }
}
