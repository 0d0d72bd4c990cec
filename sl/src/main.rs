//! SandLoop - sandboxed agent loop
//!
//! CLI entry point for running a session against a working directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use eyre::{Context, Result};
use tokio::sync::mpsc;
use tracing::info;

use sandloop::cli::{Cli, Command};
use sandloop::config::Config;
use sandloop::{AgentEvent, AgentLoop, Root, Session, SessionOutcome, ToolRegistry, create_planner};

fn setup_logging(level: Option<&str>) -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("sandloop")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Write to the log file so stdout stays the session report
    let level = match level {
        Some(level) => level
            .parse::<tracing::Level>()
            .map_err(|_| eyre::eyre!("Invalid log level: {}", level))?,
        None => tracing::Level::INFO,
    };
    let log_file = fs::File::create(log_dir.join("sandloop.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // CLI flag wins over the config file
    let log_level = cli
        .log_level
        .clone()
        .or_else(|| Config::load_log_level(cli.config.as_ref()));
    setup_logging(log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    info!(
        "SandLoop loaded config: provider={}, model={}",
        config.planner.provider, config.planner.model
    );

    match cli.command {
        Command::Run {
            root,
            max_iterations,
            verbose,
            prompt,
        } => cmd_run(&config, &root, max_iterations, verbose, &prompt.join(" ")).await,
        Command::Tools => cmd_tools(&config),
    }
}

/// Run one session and print its outcome
async fn cmd_run(
    config: &Config,
    root: &Path,
    max_iterations: Option<u32>,
    verbose: bool,
    prompt: &str,
) -> Result<()> {
    config.validate()?;

    let root = Root::new(root).context("Invalid working directory")?;
    let planner = create_planner(&config.planner).context("Failed to create planner")?;
    let registry = Arc::new(ToolRegistry::standard(&config.sandbox));
    let max_iterations = max_iterations.unwrap_or(config.agent.max_iterations);

    if verbose {
        println!("User prompt: {}", prompt);
        println!("Working directory: {}", root);
    }

    let mut session = Session::start(root, prompt, max_iterations);
    info!(session_id = %session.id(), %max_iterations, "Starting session");

    let (tx, rx) = mpsc::channel(64);
    let printer = tokio::spawn(print_events(rx, verbose));

    let agent = AgentLoop::new(planner, registry, config.agent.clone()).with_events(tx);
    let result = agent.run_to_completion(&mut session).await;
    // Closes the event channel so the printer drains and exits
    drop(agent);
    printer.await.context("Event printer failed")?;

    let outcome = result.context("Session failed")?;
    info!(session_id = %session.id(), rounds = outcome.rounds(), "Session finished");

    match outcome {
        SessionOutcome::Done {
            answer: Some(answer), ..
        } => {
            println!("Final response:");
            println!("{}", answer);
        }
        SessionOutcome::Done { answer: None, .. } => {
            println!("No function call detected. Exiting loop.");
        }
        SessionOutcome::MaxIterationsReached { .. } => {
            println!("Max iterations reached without producing a final response.");
        }
    }

    Ok(())
}

/// Print tool activity as the session runs
async fn print_events(mut rx: mpsc::Receiver<AgentEvent>, verbose: bool) {
    while let Some(event) = rx.recv().await {
        match event {
            AgentEvent::ToolCalled { name, arguments } => {
                if verbose {
                    println!("Calling function: {}({})", name, arguments);
                } else {
                    println!(" - Calling function: {}", name);
                }
            }
            AgentEvent::ToolFinished { result, .. } if verbose => {
                println!("-> {}", result.content());
            }
            AgentEvent::RoundStarted { round, max_iterations } if verbose => {
                println!("--- Round {}/{} ---", round, max_iterations);
            }
            _ => {}
        }
    }
}

/// Print the advertised tool definitions
fn cmd_tools(config: &Config) -> Result<()> {
    let registry = ToolRegistry::standard(&config.sandbox);
    let tools: Vec<serde_json::Value> = registry
        .list()
        .iter()
        .map(|spec| {
            serde_json::json!({
                "name": spec.name,
                "description": spec.description,
                "input_schema": spec.input_schema(),
            })
        })
        .collect();

    println!("{}", serde_json::to_string_pretty(&tools)?);
    Ok(())
}
