//! Prompt Whisperer: turns a short request into a reusable prompt template.
//!
//! `serve` runs the HTTP API and static frontend, `interactive` (the default)
//! opens the terminal client, `batch` runs a list of requests and `combine`
//! builds the few-shot dataset from raw CSV sources.

mod batch;
mod server;
mod tui;

use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use whisper::dataset::{self, Combiner, OFFLINE_MIN_LENGTH};
use whisper::{Config, ErrorMode, TemplateStrategy, Whisperer};

#[derive(Parser, Debug)]
#[command(name = "prompt-whisperer")]
#[command(about = "Generate prompt templates from short requests", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the JSON API and the static frontend.
    Serve {
        #[arg(long, env = "PORT")]
        port: Option<u16>,
        #[arg(long)]
        template: Option<TemplateStrategy>,
        #[arg(long)]
        error_mode: Option<ErrorMode>,
    },
    /// Merge the raw CSV sources into the combined dataset.
    Combine {
        #[arg(long)]
        raw_dir: Option<PathBuf>,
        #[arg(long)]
        output: Option<PathBuf>,
        /// Requests this many characters long or shorter are dropped.
        #[arg(long, default_value_t = OFFLINE_MIN_LENGTH)]
        min_length: usize,
        #[arg(long)]
        with_website_examples: bool,
    },
    /// Terminal client (default).
    Interactive {
        #[arg(long)]
        template: Option<TemplateStrategy>,
    },
    /// Run requests one after another and save every result.
    Batch {
        /// One request per line; the built-in samples are used when omitted.
        #[arg(long)]
        file: Option<PathBuf>,
        #[arg(long)]
        template: Option<TemplateStrategy>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut cfg = Config::from_env();

    match cli.command.unwrap_or(Command::Interactive { template: None }) {
        Command::Serve {
            port,
            template,
            error_mode,
        } => {
            init_tracing();
            if let Some(port) = port {
                cfg.bind_addr = format!("0.0.0.0:{}", port);
            }
            if let Some(template) = template {
                cfg.template = template;
            }
            if let Some(mode) = error_mode {
                cfg.error_mode = mode;
            }
            cfg.ensure_directories()?;
            let bind_addr = cfg.bind_addr.clone();
            let whisperer = connect(cfg).await?;
            server::serve(whisperer, &bind_addr).await
        }
        Command::Combine {
            raw_dir,
            output,
            min_length,
            with_website_examples,
        } => {
            init_tracing();
            cfg.ensure_directories()?;
            let raw_dir = raw_dir.unwrap_or_else(|| cfg.raw_data_dir.clone());
            let output = output.unwrap_or_else(|| cfg.combined_dataset.clone());
            combine(&raw_dir, &output, min_length, with_website_examples)
        }
        Command::Interactive { template } => {
            cfg.ensure_directories()?;
            init_file_tracing(&cfg)?;
            if let Some(template) = template {
                cfg.template = template;
            }
            let whisperer = connect(cfg).await?;
            tui::run(whisperer).await?;
            Ok(())
        }
        Command::Batch { file, template } => {
            init_tracing();
            cfg.ensure_directories()?;
            let requests = match file {
                Some(path) => batch::load_requests(&path)
                    .with_context(|| format!("reading requests from {}", path.display()))?,
                None => batch::SAMPLE_REQUESTS.iter().map(|s| s.to_string()).collect(),
            };
            let strategy = template.unwrap_or(cfg.template);
            let whisperer = connect(cfg).await?;
            let total = requests.len();
            let failures =
                tokio::task::spawn_blocking(move || batch::run(&whisperer, strategy, &requests)).await??;
            tracing::info!(total, failures, "batch finished");
            Ok(())
        }
    }
}

/// Build the model and store clients off the async runtime.
///
/// `reqwest::blocking` starts and drops its own runtime while building a client,
/// which tokio forbids on an async worker thread.
async fn connect(cfg: Config) -> anyhow::Result<Whisperer> {
    let whisperer = tokio::task::spawn_blocking(move || Whisperer::from_config(cfg)).await??;
    Ok(whisperer)
}

fn combine(raw_dir: &std::path::Path, output: &std::path::Path, min_length: usize, website: bool) -> anyhow::Result<()> {
    let summary = Combiner::new(min_length)
        .with_website_examples(website)
        .combine_dir(raw_dir, &dataset::builtin_layouts())?;

    if summary.rows.is_empty() {
        tracing::warn!(raw_dir = %raw_dir.display(), "No valid data found");
        return Ok(());
    }

    dataset::write_combined(output, &summary.rows)?;
    for (file, rows) in &summary.loaded {
        println!("{}: {} rows", file, rows);
    }
    for file in &summary.missing {
        println!("{}: not found", file);
    }
    println!(
        "Combined {} rows ({} duplicates removed) into {}",
        summary.rows.len(),
        summary.duplicates_removed,
        output.display()
    );
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

// The terminal owns stdout/stderr while the UI is up.
fn init_file_tracing(cfg: &Config) -> anyhow::Result<()> {
    let path = cfg.output_dir.join("whisperer.log");
    let file = File::options()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("opening log file {}", path.display()))?;
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .init();
    Ok(())
}
