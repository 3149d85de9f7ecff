//! # openhoud CLI
//!
//! Command-line interface for the local coding agent.
//!
//! Usage:
//!   openhoud <task> [--write] [--run] [--pipeline]
//!   echo "<task>" | openhoud
//!
//! Examples:
//!   openhoud "List repo and READ src/main.rs"
//!   PROVIDER=deepseek MODEL=deepseek-coder openhoud --write "Fix the typo in README.md"
//!   openhoud --pipeline --run "Add a CHANGELOG and check the build"

mod logging;

use clap::builder::FalseyValueParser;
use clap::Parser;
use openhoud_agent::{
    Agent, AgentSettings, Capabilities, Limits, Pipeline, PipelineOptions, RunConfig, Workspace,
    WorkspaceConfig, DEFAULT_MAX_STEPS, DEFAULT_MODEL,
};
use openhoud_llm::{OpenAIProvider, ProviderPreset, Result};
use std::io::{IsTerminal, Read};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

const USAGE: &str = "Usage: openhoud \"Your task\" [--write] [--run] [--pipeline]
Example:
  PROVIDER=ollama MODEL=qwen2.5-coder:7b openhoud \"List repo and READ src/main.rs\"";

#[derive(Parser, Debug)]
#[command(name = "openhoud")]
#[command(author, version, about = "openhoud - a small coding agent for local repositories")]
struct Cli {
    /// Task to execute; read from stdin when omitted
    task: Vec<String>,

    /// Let WRITE modify files (otherwise dry-run)
    #[arg(long)]
    write: bool,

    /// Let RUN execute shell commands (otherwise dry-run)
    #[arg(long)]
    run: bool,

    /// Plan the task first, then run each step with a specialised agent
    #[arg(long)]
    pipeline: bool,

    /// Model name sent to the provider
    #[arg(long, env = "MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    /// Step budget for each agent run
    #[arg(long, env = "MAX_STEPS", default_value_t = DEFAULT_MAX_STEPS)]
    max_steps: usize,

    /// Provider preset: ollama, lmstudio, deepseek, qwen, groq, together, openai
    #[arg(long, env = "PROVIDER", default_value = "")]
    provider: String,

    /// Override the preset's endpoint
    #[arg(long, env = "BASE_URL")]
    base_url: Option<String>,

    /// API key; takes precedence over the preset's key variable
    #[arg(long, env = "API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Ask the backend for a JSON object response
    #[arg(long, env = "RESPONSE_FORMAT_JSON", value_parser = FalseyValueParser::new())]
    json_mode: bool,

    /// Verbose diagnostics on stderr, including raw model output
    #[arg(long, env = "DEBUG", value_parser = FalseyValueParser::new())]
    debug: bool,

    /// Repository the agent is confined to
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Seconds before a RUN command is killed; 0 waits indefinitely
    #[arg(long, default_value_t = 120)]
    run_timeout: u64,

    /// Characters of tool output fed back to the model
    #[arg(long, default_value_t = 8000)]
    tool_result_chars: usize,

    /// Characters of RUN output kept
    #[arg(long, default_value_t = 5000)]
    run_output_chars: usize,
}

impl Cli {
    fn capabilities(&self) -> Capabilities {
        Capabilities::read_only()
            .with_write(self.write)
            .with_run(self.run)
    }

    fn limits(&self) -> Limits {
        Limits {
            tool_result_chars: self.tool_result_chars,
            run_output_chars: self.run_output_chars,
        }
    }

    fn run_timeout(&self) -> Option<Duration> {
        (self.run_timeout > 0).then(|| Duration::from_secs(self.run_timeout))
    }
}

/// Positional words win; piped input is the fallback
fn resolve_task(words: &[String], piped: Option<String>) -> Option<String> {
    let joined = words.join(" ");
    let task = if joined.trim().is_empty() {
        piped.unwrap_or_default()
    } else {
        joined
    };

    let task = task.trim();
    (!task.is_empty()).then(|| task.to_string())
}

fn read_piped_stdin() -> Option<String> {
    let mut stdin = std::io::stdin();
    if stdin.is_terminal() {
        return None;
    }
    let mut buf = String::new();
    stdin.read_to_string(&mut buf).ok()?;
    Some(buf)
}

fn build_provider(cli: &Cli) -> Result<OpenAIProvider> {
    let preset = ProviderPreset::from_name(&cli.provider);
    let api_key = cli
        .api_key
        .clone()
        .or_else(|| std::env::var(preset.key_env()).ok());

    let config = preset.config(cli.base_url.as_deref(), api_key.as_deref(), &cli.model)?;
    info!(provider = preset.name(), base_url = ?config.base_url, model = %cli.model, "provider resolved");
    OpenAIProvider::new(config)
}

async fn run_task(cli: &Cli, task: &str) -> Result<()> {
    let provider = build_provider(cli)?;
    let workspace = Workspace::new(
        WorkspaceConfig::new(&cli.root)
            .with_limits(cli.limits())
            .with_run_timeout(cli.run_timeout()),
    )?;
    let settings = AgentSettings::default()
        .with_json_mode(cli.json_mode)
        .with_limits(cli.limits());

    if cli.pipeline {
        let options = PipelineOptions::default()
            .with_model(cli.model.clone())
            .with_max_steps(cli.max_steps)
            .with_capabilities(cli.capabilities());
        let outcome = Pipeline::new(&provider, &workspace)
            .with_settings(settings)
            .plan_and_run(task, &options)
            .await?;

        println!("\n=== PIPELINE RESULTS ===");
        for (i, result) in outcome.results.iter().enumerate() {
            println!("Step {}: {}", i + 1, result.summary);
        }
    } else {
        let config = RunConfig::new(task)
            .with_model(cli.model.clone())
            .with_max_steps(cli.max_steps)
            .with_capabilities(cli.capabilities());
        let outcome = Agent::new(&provider, &workspace)
            .with_settings(settings)
            .run(&config)
            .await?;

        println!("\n=== AGENT SUMMARY ===");
        println!("{}", outcome.summary);
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init(cli.debug);

    let piped = if cli.task.is_empty() { read_piped_stdin() } else { None };
    let Some(task) = resolve_task(&cli.task, piped) else {
        eprintln!("{}", USAGE);
        std::process::exit(1);
    };

    if let Err(err) = run_task(&cli, &task).await {
        eprintln!("Error: {}", err.message());
        tracing::debug!(error = ?err, "run failed");
        std::process::exit(1);
    }
}
