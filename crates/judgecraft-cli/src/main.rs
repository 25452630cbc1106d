mod requests;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use futures::stream::{self, StreamExt};
use judgecraft_core::{summary_table, Engine, EngineConfig, EvaluationRecord, EvaluatorInput};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::requests::load_requests;

#[derive(Debug, Parser)]
#[command(name = "judgecraft", about = "Run evaluator calls against model outputs")]
struct Cli {
	#[command(subcommand)]
	command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
	/// Evaluate every request of a JSONL file
	Run(RunArgs),
	/// Run one evaluator on a structured input and print its raw output
	Exec(ExecArgs),
}

#[derive(Debug, Clone, Parser)]
struct RunArgs {
	/// JSONL file; each line: { "id"?, "evaluator", "output", "data_point"?, "app_params"?, "settings"?, "credentials"? }
	#[arg(long)]
	requests: PathBuf,

	/// Engine config (YAML)
	#[arg(long)]
	config: Option<PathBuf>,

	/// Concurrency (requests in-flight)
	#[arg(long, default_value_t = 8)]
	concurrency: usize,

	/// Output JSON results to a file
	#[arg(long)]
	json_out: Option<PathBuf>,
}

#[derive(Debug, Clone, Parser)]
struct ExecArgs {
	/// Evaluator key, e.g. auto_exact_match
	#[arg(long)]
	evaluator: String,

	/// JSON file with { "inputs", "settings"?, "credentials"? }
	#[arg(long)]
	input: PathBuf,

	/// Engine config (YAML)
	#[arg(long)]
	config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
	tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
		.with_writer(std::io::stderr)
		.init();

	let cli = Cli::parse();
	match cli.command {
		Commands::Run(args) => run(args).await?,
		Commands::Exec(args) => exec(args).await?,
	}
	Ok(())
}

fn build_engine(config: Option<&Path>) -> Result<Engine> {
	let config = match config {
		Some(path) => EngineConfig::from_yaml_file(path)?,
		None => EngineConfig::default(),
	};
	Engine::from_config(&config)
}

async fn run(args: RunArgs) -> Result<()> {
	let engine = build_engine(args.config.as_deref())?;
	let requests = load_requests(&args.requests).await?;
	info!(count = requests.len(), path = ?args.requests, "loaded requests");

	// buffered keeps output in file order while calls overlap.
	let records: Vec<EvaluationRecord> = stream::iter(requests)
		.map(|req| {
			let engine = engine.clone();
			async move {
				let result = engine.evaluate(&req.evaluator, &req.call).await;
				EvaluationRecord { id: req.id, evaluator: req.evaluator, result }
			}
		})
		.buffered(args.concurrency.max(1))
		.collect()
		.await;

	println!("{}", summary_table(&records));

	if let Some(path) = args.json_out {
		let json = serde_json::to_string_pretty(&records)?;
		tokio::fs::write(&path, json)
			.await
			.with_context(|| format!("Failed to write {:?}", path))?;
	}

	Ok(())
}

async fn exec(args: ExecArgs) -> Result<()> {
	let engine = build_engine(args.config.as_deref())?;
	let content = tokio::fs::read_to_string(&args.input)
		.await
		.with_context(|| format!("Failed to read {:?}", args.input))?;
	let input: EvaluatorInput = serde_json::from_str(&content).context("Invalid evaluator input")?;

	let output = engine.run(&args.evaluator, &input).await?;
	println!("{}", serde_json::to_string_pretty(&output)?);
	Ok(())
}
