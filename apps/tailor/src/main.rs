mod config;
mod errors;
mod generation;
mod ledger;
mod llm_client;
mod models;
mod pipeline;
mod profile;
mod render;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::generation::PromptOrchestrator;
use crate::ledger::{CsvLedger, Ledger};
use crate::llm_client::LlmClient;
use crate::pipeline::Controller;
use crate::render::process::run as run_process;
use crate::render::ExternalTool;

#[derive(Parser)]
#[command(name = "tailor", version, about = "Tailored CV and cover letter generation per job posting")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate documents for every pending job record (default)
    Run,

    /// List pending job records without changing anything
    Pending,

    /// Check that the LaTeX compiler and the converter can be started
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;

    // Initialize structured logging
    let level = if cli.verbose { "debug" } else { config.log_level.as_str() };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), level))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => cmd_run(config).await,
        Commands::Pending => cmd_pending(&config).await,
        Commands::Check => cmd_check(&config).await,
    }
}

async fn cmd_run(config: Config) -> Result<()> {
    info!("Starting tailor v{}", env!("CARGO_PKG_VERSION"));

    let llm = LlmClient::new(config.require_api_key()?.to_string(), config.model.clone())?;
    info!("LLM client initialized (model: {})", llm.model());

    let orchestrator = PromptOrchestrator::new(Arc::new(llm), config.generation_timeout);
    let ledger = Arc::new(CsvLedger::new(config.jobs_csv.clone()));
    let controller = Controller::new(config, ledger, orchestrator);

    let summary = match controller.run().await {
        Ok(summary) => summary,
        Err(e) => {
            error!(code = e.code(), fatal = e.is_fatal(), "Run aborted: {e}");
            return Err(e.into());
        }
    };
    println!("{summary}");
    Ok(())
}

async fn cmd_pending(config: &Config) -> Result<()> {
    let ledger = CsvLedger::new(config.jobs_csv.clone());
    let pending = ledger.list_pending().await?;
    if pending.is_empty() {
        println!("No pending job records.");
    }
    for record in &pending {
        println!("{} | {} | {}", record.company, record.title, record.language());
    }
    Ok(())
}

async fn cmd_check(config: &Config) -> Result<()> {
    let mut missing = Vec::new();
    for tool in [&config.compiler, &config.converter] {
        let version_check = ExternalTool {
            program: tool.program.clone(),
            leading_args: Vec::new(),
            timeout: tool.timeout.min(Duration::from_secs(30)),
        };
        match run_process(&version_check, &["--version".to_string()], None, None).await {
            Ok(output) => {
                // Some tools print their banner on stderr.
                let text = if output.stdout.trim().is_empty() {
                    &output.stderr
                } else {
                    &output.stdout
                };
                let version = text.lines().next().unwrap_or("").trim();
                info!("'{}' available: {version}", tool.program);
            }
            Err(e) => {
                error!("'{}' is not usable: {e}", tool.program);
                missing.push(tool.program.clone());
            }
        }
    }
    if !missing.is_empty() {
        anyhow::bail!("missing tools: {}", missing.join(", "));
    }
    println!("All external tools are available.");
    Ok(())
}
