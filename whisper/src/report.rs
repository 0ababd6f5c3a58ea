use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::chain::PromptChainResult;
use crate::error::Result;

/// Write the result as pretty JSON to `results_<timestamp>.json` in `output_dir`.
pub fn save_results(output_dir: &Path, result: &PromptChainResult) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)?;
    let path = output_dir.join(format!("results_{}.json", stamp(Local::now())));
    std::fs::write(&path, serde_json::to_string_pretty(result)?)?;
    tracing::info!(path = %path.display(), "saved results");
    Ok(path)
}

pub fn save_report(output_dir: &Path, report: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)?;
    let path = output_dir.join(format!("report_{}.txt", stamp(Local::now())));
    std::fs::write(&path, report)?;
    tracing::info!(path = %path.display(), "saved report");
    Ok(path)
}

/// Human-readable summary of a chain run.
pub fn render_report(result: &PromptChainResult) -> String {
    let rule = "=".repeat(60);
    let mut out = String::new();
    let _ = writeln!(out, "{}", rule);
    let _ = writeln!(out, "PROMPT CHAIN REPORT");
    let _ = writeln!(out, "{}", rule);
    let _ = writeln!(out, "Request: {}", result.user_input);
    let _ = writeln!(out, "Status: {}", if result.success { "success" } else { "failed" });
    if let Some(used) = result.similar_prompts_used {
        let _ = writeln!(
            out,
            "Similar examples used: {} (context quality {:.3})",
            used,
            result.context_quality.unwrap_or(0.0)
        );
    }
    for step in &result.steps {
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "--- Step {} [{}] ---",
            step.step_number,
            if step.success { "ok" } else { "error" }
        );
        let _ = writeln!(out, "{}", step.output);
    }
    let _ = writeln!(out, "{}", rule);
    out
}

fn stamp(now: DateTime<Local>) -> String {
    now.format("%Y%m%d_%H%M%S_%3f").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::ChainStep;

    fn sample() -> PromptChainResult {
        PromptChainResult {
            user_input: "Create a website for my bakery".to_string(),
            steps: vec![ChainStep {
                step_number: 1,
                output: "# Bakery template".to_string(),
                html_output: Some("<h1>Bakery template</h1>\n".to_string()),
                success: true,
            }],
            similar_prompts_used: Some(2),
            context_quality: Some(0.7),
            success: true,
        }
    }

    #[test]
    fn report_lists_request_and_steps() {
        let report = render_report(&sample());
        assert!(report.contains("Request: Create a website for my bakery"));
        assert!(report.contains("Similar examples used: 2 (context quality 0.700)"));
        assert!(report.contains("--- Step 1 [ok] ---\n# Bakery template"));
    }

    #[test]
    fn saved_results_parse_back() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path = save_results(tmp.path(), &sample()).expect("save");
        let name = path.file_name().and_then(|n| n.to_str()).expect("file name");
        assert!(name.starts_with("results_") && name.ends_with(".json"));
        let text = std::fs::read_to_string(&path).expect("read");
        let back: PromptChainResult = serde_json::from_str(&text).expect("parse");
        assert_eq!(back, sample());
    }
}
