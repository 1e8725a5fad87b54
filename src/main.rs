use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use fleet_executor::{
  Api, CallError, ChannelNotifier, Identity, JobEvent, JobExecutor, LocalIdentityProvider,
  RunOutcome, TracingJobLog,
};
use fleet_job::{Job, Record, validate_job};
use fleet_vector::InMemoryRepository;

/// Fleet Jobs - expand a job's parameter vector into API calls and run them
#[derive(Parser)]
#[command(name = "fleet-jobs")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to the data directory (default: ~/.fleet-jobs)
  #[arg(long, global = true)]
  data_dir: Option<PathBuf>,

  /// JSON array of live objects to resolve against (default: <data-dir>/objects.json)
  #[arg(long, global = true)]
  objects: Option<PathBuf>,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Run one job, or several in sequence
  Run {
    /// Paths to job files (JSON)
    #[arg(required = true)]
    job_files: Vec<PathBuf>,
  },

  /// Print the parameter records a job would be called with
  Resolve {
    /// Path to the job file (JSON)
    job_file: PathBuf,
  },

  /// Check a job file against the stored-job schema
  Validate {
    /// Path to the job file (JSON)
    job_file: PathBuf,
  },
}

/// Answers every call with the method and params it was given.
struct EchoApi;

#[async_trait]
impl Api for EchoApi {
  async fn invoke(
    &self,
    identity: &Identity,
    method: &str,
    params: Record,
  ) -> Result<Value, CallError> {
    Ok(serde_json::json!({
      "method": method,
      "userId": identity.user_id,
      "params": params,
    }))
  }
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_writer(std::io::stderr)
    .init();

  let data_dir = match cli.data_dir {
    Some(dir) => dir,
    None => dirs::home_dir()
      .context("could not determine home directory")?
      .join(".fleet-jobs"),
  };
  let objects_file = cli
    .objects
    .unwrap_or_else(|| data_dir.join("objects.json"));

  match cli.command {
    Some(Commands::Run { job_files }) => {
      let rt = runtime()?;
      rt.block_on(run_jobs(job_files, objects_file))?;
    }
    Some(Commands::Resolve { job_file }) => {
      let rt = runtime()?;
      rt.block_on(resolve_job(job_file, objects_file))?;
    }
    Some(Commands::Validate { job_file }) => {
      validate_job_file(&job_file)?;
    }
    None => {
      println!("fleet-jobs - use --help to see available commands");
    }
  }

  Ok(())
}

/// Calls are multiplexed on the current thread rather than a worker pool.
fn runtime() -> Result<tokio::runtime::Runtime> {
  tokio::runtime::Builder::new_current_thread()
    .enable_all()
    .build()
    .context("failed to build tokio runtime")
}

async fn run_jobs(job_files: Vec<PathBuf>, objects_file: PathBuf) -> Result<()> {
  let mut jobs = Vec::with_capacity(job_files.len());
  for job_file in &job_files {
    jobs.push(load_job(job_file).await?);
  }

  let (sender, mut receiver) = mpsc::unbounded_channel();
  let executor = executor(&objects_file, ChannelNotifier::new(sender)).await?;

  let outcomes = executor.exec_sequence(&jobs).await;
  drop(executor);

  for outcome in &outcomes {
    if let RunOutcome::Failed { run_job_id, error } = outcome {
      eprintln!("Run {} failed: {}", run_job_id, error);
    }
  }

  // Terminated runs report through the notifier
  while let Some(event) = receiver.recv().await {
    match &event {
      JobEvent::Terminated(status) => {
        eprintln!(
          "Run {} terminated: {} calls, {} failed",
          status.run_job_id,
          status.calls.len(),
          status.failed_calls().count()
        );
      }
    }
    println!("{}", serde_json::to_string_pretty(&event)?);
  }

  let failed = outcomes.iter().filter(|o| o.error().is_some()).count();
  if failed > 0 {
    anyhow::bail!("{} of {} jobs failed", failed, outcomes.len());
  }

  Ok(())
}

async fn resolve_job(job_file: PathBuf, objects_file: PathBuf) -> Result<()> {
  let job = load_job(&job_file).await?;
  let executor = executor(&objects_file, fleet_executor::NoopNotifier).await?;

  let records = executor
    .resolve_params(&job)
    .await
    .with_context(|| format!("failed to resolve params of job: {}", job.id))?;

  eprintln!("Resolved {} parameter records", records.len());
  println!("{}", serde_json::to_string_pretty(&records)?);

  Ok(())
}

fn validate_job_file(job_file: &Path) -> Result<()> {
  let content = std::fs::read_to_string(job_file)
    .with_context(|| format!("failed to read job file: {}", job_file.display()))?;
  let value: Value = serde_json::from_str(&content)
    .with_context(|| format!("failed to parse job file: {}", job_file.display()))?;

  validate_job(&value).with_context(|| format!("invalid job file: {}", job_file.display()))?;

  println!("{} is valid", job_file.display());
  Ok(())
}

async fn executor<N: fleet_executor::ExecutionNotifier>(
  objects_file: &Path,
  notifier: N,
) -> Result<JobExecutor<N>> {
  let objects = load_objects(objects_file).await?;
  eprintln!("Loaded {} objects", objects.len());

  Ok(JobExecutor::with_notifier(
    Arc::new(EchoApi),
    Arc::new(LocalIdentityProvider::new()),
    Arc::new(InMemoryRepository::new(objects)),
    Arc::new(TracingJobLog),
    notifier,
  ))
}

async fn load_job(job_file: &Path) -> Result<Job> {
  let content = tokio::fs::read_to_string(job_file)
    .await
    .with_context(|| format!("failed to read job file: {}", job_file.display()))?;

  serde_json::from_str(&content)
    .with_context(|| format!("failed to parse job file: {}", job_file.display()))
}

async fn load_objects(objects_file: &Path) -> Result<Vec<Value>> {
  if !tokio::fs::try_exists(objects_file).await.unwrap_or(false) {
    // No snapshot yet, resolve against an empty fleet
    return Ok(Vec::new());
  }

  let content = tokio::fs::read_to_string(objects_file)
    .await
    .with_context(|| format!("failed to read objects file: {}", objects_file.display()))?;

  serde_json::from_str(&content)
    .with_context(|| format!("failed to parse objects file: {}", objects_file.display()))
}
