use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The instruction shapes the chain knows how to send to the model.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TemplateStrategy {
    Plain,
    #[default]
    Markdown,
    PlainText,
    FillInTheBlank,
    ContextAugmented,
}

impl TemplateStrategy {
    pub const ALL: [TemplateStrategy; 5] = [
        Self::Plain,
        Self::Markdown,
        Self::PlainText,
        Self::FillInTheBlank,
        Self::ContextAugmented,
    ];

    /// Whether the model is expected to answer in markdown worth rendering.
    pub fn renders_html(self) -> bool {
        !matches!(self, Self::PlainText)
    }

    pub fn uses_retrieval(self) -> bool {
        matches!(self, Self::ContextAugmented)
    }

    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|s| *s == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }
}

impl FromStr for TemplateStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "plain" => Ok(Self::Plain),
            "markdown" | "md" => Ok(Self::Markdown),
            "plain-text" | "text" => Ok(Self::PlainText),
            "fill-in-the-blank" | "fill-in" | "blank" => Ok(Self::FillInTheBlank),
            "context-augmented" | "context" | "rag" => Ok(Self::ContextAugmented),
            other => Err(format!("unknown template strategy: {}", other)),
        }
    }
}

impl fmt::Display for TemplateStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Plain => "plain",
            Self::Markdown => "markdown",
            Self::PlainText => "plain-text",
            Self::FillInTheBlank => "fill-in-the-blank",
            Self::ContextAugmented => "context-augmented",
        };
        f.write_str(name)
    }
}

/// Build the single instruction sent to the model.
///
/// `context` is only read by [`TemplateStrategy::ContextAugmented`]; when it is
/// `None` the retrieval block says no examples were found.
pub fn build_prompt(strategy: TemplateStrategy, user_input: &str, context: Option<&str>) -> String {
    match strategy {
        TemplateStrategy::Plain => format!(
            "You are an expert prompt engineer who creates detailed, professional prompt templates.\n\n\
             When given a user request, generate a comprehensive prompt template with clear structure and formatting.\n\n\
             User request: \"{}\"\n\n\
             Generate a detailed prompt template:\n",
            user_input
        ),
        TemplateStrategy::Markdown => format!(
            "You are an expert prompt engineer. Turn the user's request into a detailed, reusable prompt template.\n\n\
             Format the answer in Markdown: use headings for each section, bullet lists for requirements, \
             and **bold** for key terms. Do not wrap the whole answer in a code block.\n\n\
             User request: \"{}\"\n\n\
             Prompt template:\n",
            user_input
        ),
        TemplateStrategy::PlainText => format!(
            "You are an expert prompt engineer. Turn the user's request into a detailed, reusable prompt template.\n\n\
             Answer in plain text only: no Markdown, no asterisks, no pound signs, no code fences. \
             Use short numbered lines for structure.\n\n\
             User request: \"{}\"\n\n\
             Prompt template:\n",
            user_input
        ),
        TemplateStrategy::FillInTheBlank => format!(
            "You are an expert prompt engineer. Write a fill-in-the-blank prompt template for the user's request.\n\n\
             Mark every detail the user must supply as a placeholder in square brackets, for example \
             [BUSINESS NAME] or [TARGET AUDIENCE]. Keep the fixed wording specific to the request.\n\n\
             User request: \"{}\"\n\n\
             Fill-in-the-blank template:\n",
            user_input
        ),
        TemplateStrategy::ContextAugmented => format!(
            "You are an expert prompt engineer. Below are high-quality example prompts for similar tasks, \
             retrieved from a curated dataset. Study their structure, specificity and tone.\n\n\
             Similar examples:\n{}\n\n\
             Using the examples as guidance (do not copy them), write a detailed, professional prompt template \
             for the following request. Use Markdown headings and bullet lists.\n\n\
             User request: \"{}\"\n\n\
             Prompt template:\n",
            context.unwrap_or(crate::retrieval::NO_CONTEXT),
            user_input
        ),
    }
}
