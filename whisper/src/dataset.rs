//! Offline combiner that turns heterogeneous prompt datasets into one few-shot CSV.
//!
//! Each source file is described by a [`SourceLayout`] listing candidate column
//! names in priority order. Rows are cleaned so the output stays a simple
//! comma-separated file, short requests are dropped, and the result is
//! deduplicated on `(user_input, optimized_prompt)`.

use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Minimum-length filter used by the offline combine script.
pub const OFFLINE_MIN_LENGTH: usize = 5;
/// Minimum-length filter used by the data-processor pipeline.
pub const PROCESSOR_MIN_LENGTH: usize = 10;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombinedRow {
    pub user_input: String,
    pub optimized_prompt: String,
    pub category: String,
    pub source: String,
}

/// Where a source file keeps its request, improved prompt and category.
#[derive(Clone, Debug)]
pub struct SourceLayout {
    pub file_name: String,
    pub source: String,
    pub user_columns: Vec<String>,
    pub optimized_columns: Vec<String>,
    pub category_columns: Vec<String>,
    pub default_category: String,
}

impl SourceLayout {
    pub fn new(file_name: &str, source: &str) -> Self {
        Self {
            file_name: file_name.to_string(),
            source: source.to_string(),
            user_columns: Vec::new(),
            optimized_columns: Vec::new(),
            category_columns: Vec::new(),
            default_category: "general".to_string(),
        }
    }

    pub fn user_columns(mut self, cols: &[&str]) -> Self {
        self.user_columns = cols.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn optimized_columns(mut self, cols: &[&str]) -> Self {
        self.optimized_columns = cols.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn category_columns(mut self, cols: &[&str]) -> Self {
        self.category_columns = cols.iter().map(|c| c.to_string()).collect();
        self
    }
}

/// The two dataset variants shipped in `data/raw`.
pub fn builtin_layouts() -> Vec<SourceLayout> {
    vec![
        SourceLayout::new("Prompt_Examples.csv", "Prompt_Examples")
            .user_columns(&["original_prompt", "prompt", "input", "user_prompt", "original"])
            .optimized_columns(&["V1_Prompt", "Base_Prompt"]),
        SourceLayout::new("prompt_examples_dataset.csv", "prompt_examples_dataset")
            .user_columns(&[
                "bad_prompt",
                "task_description",
                "prompt",
                "original_prompt",
                "input_prompt",
                "user_input",
            ])
            .optimized_columns(&[
                "good_prompt",
                "optimized_prompt",
                "improved_prompt",
                "enhanced_prompt",
                "better_prompt",
            ])
            .category_columns(&["prompt_type", "category"]),
    ]
}

/// Replace commas with semicolons and collapse line breaks so a row stays on one line.
pub fn clean_text(text: &str) -> String {
    text.replace(',', ";")
        .replace(['\n', '\r'], " ")
        .trim()
        .to_string()
}

#[derive(Clone, Debug)]
pub struct Combiner {
    pub min_length: usize,
    pub include_website_examples: bool,
}

impl Default for Combiner {
    fn default() -> Self {
        Self {
            min_length: OFFLINE_MIN_LENGTH,
            include_website_examples: false,
        }
    }
}

/// Outcome of a combine run, for reporting.
#[derive(Clone, Debug, Default)]
pub struct CombineSummary {
    pub rows: Vec<CombinedRow>,
    pub loaded: Vec<(String, usize)>,
    pub missing: Vec<String>,
    pub duplicates_removed: usize,
}

impl Combiner {
    pub fn new(min_length: usize) -> Self {
        Self {
            min_length,
            ..Self::default()
        }
    }

    pub fn with_website_examples(mut self, include: bool) -> Self {
        self.include_website_examples = include;
        self
    }

    /// Read every layout's file from `raw_dir`; absent files are skipped.
    pub fn combine_dir(&self, raw_dir: &Path, layouts: &[SourceLayout]) -> Result<CombineSummary> {
        let mut summary = CombineSummary::default();
        let mut rows = Vec::new();
        for layout in layouts {
            let path = raw_dir.join(&layout.file_name);
            if !path.exists() {
                tracing::warn!(file = %path.display(), "source file not found");
                summary.missing.push(layout.file_name.clone());
                continue;
            }
            let file = std::fs::File::open(&path)?;
            let source_rows = self.read_source(file, layout)?;
            tracing::info!(file = %layout.file_name, rows = source_rows.len(), "loaded source");
            summary.loaded.push((layout.file_name.clone(), source_rows.len()));
            rows.extend(source_rows);
        }
        if self.include_website_examples {
            rows.extend(website_examples());
        }
        let before = rows.len();
        summary.rows = dedupe(rows);
        summary.duplicates_removed = before - summary.rows.len();
        Ok(summary)
    }

    /// Map one source onto canonical rows, dropping requests that are too short.
    pub fn read_source<R: Read>(&self, reader: R, layout: &SourceLayout) -> Result<Vec<CombinedRow>> {
        let mut reader = ReaderBuilder::new()
            .trim(Trim::Headers)
            .flexible(true)
            .from_reader(reader);
        let headers = reader.headers()?.clone();

        let user_idx = present_columns(&headers, &layout.user_columns);
        if user_idx.is_empty() {
            tracing::warn!(
                source = %layout.source,
                columns = ?headers.iter().collect::<Vec<_>>(),
                "no request column found"
            );
            return Ok(vec![]);
        }
        let optimized_idx = present_columns(&headers, &layout.optimized_columns);
        let category_idx = present_columns(&headers, &layout.category_columns);

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let user_input = first_value(&record, &user_idx).map(clean_text).unwrap_or_default();
            if user_input.chars().count() <= self.min_length {
                continue;
            }
            let optimized_prompt = first_value(&record, &optimized_idx)
                .map(clean_text)
                .unwrap_or_else(|| user_input.clone());
            let category = first_value(&record, &category_idx)
                .map(clean_text)
                .unwrap_or_else(|| layout.default_category.clone());
            rows.push(CombinedRow {
                user_input,
                optimized_prompt,
                category,
                source: layout.source.clone(),
            });
        }
        Ok(rows)
    }
}

fn present_columns(headers: &StringRecord, candidates: &[String]) -> Vec<usize> {
    candidates
        .iter()
        .filter_map(|name| headers.iter().position(|h| h == name))
        .collect()
}

fn first_value<'r>(record: &'r StringRecord, columns: &[usize]) -> Option<&'r str> {
    columns
        .iter()
        .filter_map(|&idx| record.get(idx))
        .find(|v| !v.trim().is_empty())
}

/// Keep the first row of each `(user_input, optimized_prompt)` pair, preserving order.
pub fn dedupe(rows: Vec<CombinedRow>) -> Vec<CombinedRow> {
    let mut seen = HashSet::new();
    rows.into_iter()
        .filter(|row| seen.insert((row.user_input.clone(), row.optimized_prompt.clone())))
        .collect()
}

pub fn write_combined(path: &Path, rows: &[CombinedRow]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = WriterBuilder::new().from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn read_combined(path: &Path) -> Result<Vec<CombinedRow>> {
    let mut reader = ReaderBuilder::new().from_path(path)?;
    let mut rows = Vec::new();
    for row in reader.deserialize() {
        rows.push(row?);
    }
    Ok(rows)
}

/// Hand-written website requests that seed the dataset's most common use case.
pub fn website_examples() -> Vec<CombinedRow> {
    let examples = [
        (
            "Create a website for my bakery",
            "Create a comprehensive bakery website with: homepage featuring daily specials; complete menu with prices and allergen info; about us page with baker's story; online ordering system; location and hours; customer testimonials; and photo gallery of baked goods.",
            "website_business",
        ),
        (
            "I need a portfolio website for my photography",
            "Design a professional photography portfolio with: striking homepage showcasing best work; organized galleries by category (weddings; portraits; landscapes); detailed about page with photographer's story and approach; services and pricing page; client testimonials; and easy contact form with booking system.",
            "website_portfolio",
        ),
        (
            "Build a website for my restaurant",
            "Create a restaurant website featuring: appetizing homepage with hero images; complete menu with descriptions and prices; online reservation system; about page with chef's background and restaurant story; location with map and parking info; hours of operation; customer reviews section; and special events page.",
            "website_business",
        ),
        (
            "Make a website for my consulting business",
            "Develop a professional consulting website with: authoritative homepage establishing expertise; detailed services page with case studies; about page highlighting experience and credentials; client testimonials and success stories; resources/blog section; clear contact information; and consultation booking system.",
            "website_business",
        ),
        (
            "Create a blog website for travel stories",
            "Build a travel blog website with: engaging homepage with featured posts; organized post categories by destination; interactive map of visited places; about page with traveler's story; photo galleries; travel tips section; subscription form for updates; and social media integration.",
            "website_blog",
        ),
    ];
    examples
        .into_iter()
        .map(|(user_input, optimized_prompt, category)| CombinedRow {
            user_input: user_input.to_string(),
            optimized_prompt: optimized_prompt.to_string(),
            category: category.to_string(),
            source: "custom".to_string(),
        })
        .collect()
}
