mod config;
mod error;
mod suite;

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use adapter::{BackendAdapter, MessageSender, NormalizedResult, ProviderKind, RESPONSE_TIME_TARGET};
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use config::Config;
use error::{Error, Result};
use suite::{SuiteOutcome, SuiteSummary};

const CONFIG_FILE: &str = "chatrelay.toml";

#[derive(Parser)]
#[command(name = "chatrelay")]
#[command(about = "Talk to a hosted chatbot backend through one normalized interface", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, global = true, default_value = CONFIG_FILE)]
    config: PathBuf,

    /// Override the configured hosting provider
    #[arg(short, long, global = true)]
    provider: Option<ProviderKind>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive chat session
    Chat,
    /// Ask a single question
    Ask {
        /// The question to ask
        #[arg(required = true)]
        question: Vec<String>,
        /// Print the normalized result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Probe the backend health endpoint
    Health,
    /// Fetch the backend status endpoint
    Status {
        /// Job id to look up
        job_id: Option<String>,
    },
    /// Run a batch of questions and report latency against the 8s target
    Suite {
        /// Question to ask (repeatable); defaults to a built-in list
        #[arg(short, long = "question")]
        questions: Vec<String>,
        /// Pause between requests, in milliseconds
        #[arg(long, default_value = "2000")]
        delay_ms: u64,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    let mut config = load_config(&cli.config)?;
    config.apply_env()?;
    if let Some(provider) = cli.provider {
        config.backend.provider = provider;
    }
    init_logging(&config.log_level);

    let profile = config.profile()?;
    tracing::debug!(
        provider = %profile.provider(),
        chat_url = %profile.chat_url(),
        timeout_ms = profile.timeout().as_millis() as u64,
        "backend profile loaded"
    );
    let adapter = BackendAdapter::from_profile(profile);

    match cli.command {
        Some(Commands::Chat) | None => cmd_chat(&adapter).await,
        Some(Commands::Ask { question, json }) => cmd_ask(&adapter, &question.join(" "), json).await,
        Some(Commands::Health) => cmd_health(&adapter).await,
        Some(Commands::Status { job_id }) => cmd_status(&adapter, job_id.as_deref()).await,
        Some(Commands::Suite {
            questions,
            delay_ms,
        }) => cmd_suite(&adapter, questions, Duration::from_millis(delay_ms)).await,
    }
}

fn load_config(path: &Path) -> Result<Config> {
    if path.exists() {
        Ok(Config::load(path)?)
    } else {
        Ok(Config::default_config())
    }
}

fn init_logging(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(filter)
        .try_init();
}

async fn cmd_chat(adapter: &BackendAdapter) -> Result<()> {
    println!("chatrelay v{}", env!("CARGO_PKG_VERSION"));
    let profile = adapter.profile();
    println!("Backend: {} ({})", profile.chat_url(), profile.provider());
    println!("Type 'quit' or Ctrl+D to exit.\n");

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut asked = 0usize;

    loop {
        print!("> ");
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            // EOF
            break;
        }

        let input = line.trim();
        if input == "quit" || input == "exit" {
            break;
        }

        // Blank input sends nothing.
        let Some(result) = adapter.send(input).await else {
            continue;
        };
        asked += 1;
        println!();
        print_result(&result);
        println!();
    }

    println!("\n{asked} message(s) sent.");
    Ok(())
}

async fn cmd_ask(adapter: &BackendAdapter, question: &str, json: bool) -> Result<()> {
    let Some(result) = adapter.send(question).await else {
        println!("Nothing to ask.");
        return Ok(());
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_result(&result);
    }
    Ok(())
}

async fn cmd_health(adapter: &BackendAdapter) -> Result<()> {
    let report = adapter.health().await;
    let mark = if report.ok { "healthy" } else { "unhealthy" };
    println!(
        "{mark}: {} ({:.2}s)",
        report.status,
        report.elapsed_ms as f64 / 1000.0
    );
    if let Some(detail) = &report.detail {
        println!("{}", serde_json::to_string_pretty(detail)?);
    }
    Ok(())
}

async fn cmd_status(adapter: &BackendAdapter, job_id: Option<&str>) -> Result<()> {
    let body = adapter.status(job_id).await?;
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}

async fn cmd_suite(adapter: &BackendAdapter, questions: Vec<String>, delay: Duration) -> Result<()> {
    let questions = if questions.is_empty() {
        suite::DEFAULT_QUESTIONS.iter().map(|q| q.to_string()).collect()
    } else {
        questions
    };
    let total = questions.len();

    println!("Endpoint: {}\n", adapter.profile().chat_url());

    let outcomes = suite::run(adapter, &questions, delay, |i, outcome| {
        print_outcome(i, total, outcome);
    })
    .await;

    let summary = SuiteSummary::from_outcomes(&outcomes);
    println!("{}", "-".repeat(80));
    println!("Successful: {}/{}", summary.succeeded, summary.total);
    println!("Failed:     {}/{}", summary.failed(), summary.total);
    if let Some(avg) = summary.average {
        let target = RESPONSE_TIME_TARGET.as_secs();
        let verdict = if summary.meets_target() {
            format!("meets the {target}s target")
        } else {
            format!("exceeds the {target}s target")
        };
        println!("Average response time: {:.2}s ({verdict})", avg.as_secs_f64());
    }

    if summary.total > 0 && summary.succeeded == 0 {
        return Err(Error::SuiteFailed {
            total: summary.total,
        });
    }
    Ok(())
}

fn print_outcome(index: usize, total: usize, outcome: &SuiteOutcome) {
    println!("[{}/{}] {}", index + 1, total, outcome.question);
    print_result(&outcome.result);
    println!();
}

fn print_result(result: &NormalizedResult) {
    if !result.ok {
        let kind = result
            .error_kind
            .map(|k| k.to_string())
            .unwrap_or_default();
        println!("Error ({kind}): {}", result.answer);
        println!("Elapsed: {:.2}s", result.elapsed_secs());
        return;
    }

    println!("{}", result.answer);

    if !result.sources.is_empty() {
        println!("\nSources ({}):", result.sources.len());
        for (i, source) in result.sources.iter().enumerate() {
            let name = source
                .get("source")
                .and_then(|s| s.as_str())
                .or_else(|| source.as_str())
                .unwrap_or("Unknown");
            match source.get("similarity").and_then(|s| s.as_f64()) {
                Some(similarity) => println!("  {}. {name} (similarity: {:.0}%)", i + 1, similarity * 100.0),
                None => println!("  {}. {name}", i + 1),
            }
        }
    }

    println!("\nConfidence: {}", result.confidence.to_uppercase());
    let timing = result
        .timing
        .iter()
        .map(|(k, v)| format!("{k}={v:.2}s"))
        .collect::<Vec<_>>()
        .join(", ");
    println!("Timing: {timing}");
    if result.documents_searched > 0 {
        println!("Documents searched: {}", result.documents_searched);
    }
    println!("Elapsed: {:.2}s", result.elapsed_secs());
}
