//! Keep running a command and let an LLM edit the code until it passes.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::debug;

use makeitpass_lib::config::Config;
use makeitpass_lib::llm::LlmClient;
use makeitpass_lib::logging;
use makeitpass_lib::progress::ConsoleProgress;
use makeitpass_lib::runner::CommandRunner;
use makeitpass_lib::tools::{ToolDispatcher, Workspace};
use makeitpass_lib::workflows::{ConversationEngine, RepairOrchestrator};

#[derive(Parser, Debug)]
#[command(
    name = "makeitpass",
    version,
    about = "Run a command and let an LLM fix the code until it exits 0"
)]
struct Cli {
    /// Give up after this many repair attempts (default: keep going).
    #[arg(long, value_name = "N")]
    max_iterations: Option<usize>,

    /// More diagnostic output on stderr (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Model id, overriding MODEL.
    #[arg(long)]
    model: Option<String>,

    /// The command to make pass, with its arguments.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "COMMAND")]
    command: Vec<String>,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{:#}", err);
        std::process::exit(1);
    }
}

/// The command line to repair, or an error when none was given.
fn command_line(cli: &Cli) -> Result<String> {
    let command = cli.command.join(" ");
    if command.trim().is_empty() {
        bail!("Please provide a command that should pass");
    }
    Ok(command)
}

async fn run() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    let command = command_line(&cli)?;

    let mut config = Config::from_env().context("load configuration")?;
    if let Some(model) = cli.model {
        config.model = model;
    }
    config.verbosity = config.verbosity.max(cli.verbose);
    let max_iterations = cli.max_iterations.or(config.max_iterations);

    logging::init(config.verbosity);
    debug!(?config, %command, "starting");

    let workspace = Workspace::current().context("resolve working directory")?;
    let client = LlmClient::new(config.llm_config(), config.api_key.clone())?;
    let engine = ConversationEngine::new(
        client,
        ToolDispatcher::new(workspace.clone()),
        config.transcript_policy(),
    )
    .with_instructions(config.instructions.clone());

    let mut orchestrator = RepairOrchestrator::new(CommandRunner::new(workspace.root()), engine)
        .with_progress(Arc::new(ConsoleProgress::default()))
        .with_max_iterations(max_iterations);

    match orchestrator.run(&command).await {
        Ok(_) => Ok(()),
        Err(err) => {
            if let Some(transcript) = err.transcript_dump() {
                eprintln!("Transcript:\n{}", transcript);
            }
            Err(err.into())
        }
    }
}
