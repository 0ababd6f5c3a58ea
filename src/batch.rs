use std::path::Path;
use std::thread;

use whisper::report::{render_report, save_report, save_results};
use whisper::{PromptChainResult, TemplateStrategy, Whisperer};

pub const SAMPLE_REQUESTS: [&str; 4] = [
    "Create a website for my bakery that sells custom cakes and pastries",
    "I need a portfolio website for my photography business",
    "Build a website for my digital marketing consulting firm",
    "Make a travel blog website for my adventures around the world",
];

/// Read one request per non-blank line.
pub fn load_requests(path: &Path) -> anyhow::Result<Vec<String>> {
    let text = std::fs::read_to_string(path)?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect())
}

/// Run every request through the chain in order, pausing `request_delay` between calls.
///
/// A failed request is saved as a failed result and the run continues.
pub fn run(whisperer: &Whisperer, strategy: TemplateStrategy, requests: &[String]) -> anyhow::Result<usize> {
    let cfg = whisperer.config();
    let mut failures = 0;
    for (i, request) in requests.iter().enumerate() {
        if i > 0 && !cfg.request_delay.is_zero() {
            thread::sleep(cfg.request_delay);
        }
        tracing::info!(case = i + 1, total = requests.len(), request = %request, "running request");

        let result = match whisperer.execute_with(strategy, request) {
            Ok(result) => result,
            Err(err) => {
                tracing::warn!(case = i + 1, error = %err, "request failed");
                failures += 1;
                PromptChainResult::failed(request, &err)
            }
        };

        let results_path = save_results(&cfg.output_dir, &result)?;
        let report_path = save_report(&cfg.output_dir, &render_report(&result))?;
        println!(
            "[{}/{}] {}: {} {}",
            i + 1,
            requests.len(),
            if result.success { "ok" } else { "failed" },
            results_path.display(),
            report_path.display()
        );
    }
    Ok(failures)
}
