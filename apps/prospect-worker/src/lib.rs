pub mod error;
pub mod worker;

pub use error::{Error, Result};

use std::{fs, path::PathBuf, sync::Arc};

use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use prospect_service::{Providers, ResearchService, SubmitRequest};
use prospect_storage::db::Db;

#[derive(Debug, Parser)]
#[command(
	version = prospect_cli::VERSION,
	rename_all = "kebab",
	styles = prospect_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	#[command(subcommand)]
	pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
	/// Poll for pending jobs and run them until interrupted. The default.
	Serve,
	/// Submit a job and print its id.
	Submit {
		#[arg(long)]
		name: Option<String>,
		#[arg(long)]
		submitted_by: Option<String>,
		/// File with one company name per line.
		#[arg(long, value_name = "FILE")]
		file: Option<PathBuf>,
		companies: Vec<String>,
	},
	/// Run one pending job in the foreground.
	Run { job_id: Uuid },
	/// Print a job's progress and usage as JSON.
	Progress { job_id: Uuid },
	/// Submit the unfinished companies of a finished job as a new job.
	Resubmit {
		job_id: Uuid,
		#[arg(long)]
		submitted_by: Option<String>,
	},
	/// Delete a job that is not running.
	Delete { job_id: Uuid },
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = prospect_config::load(&args.config)?;
	let filter = EnvFilter::new(config.service.log_level.clone());

	tracing_subscriber::fmt().with_env_filter(filter).init();

	let db = Db::connect(&config.storage.postgres).await?;

	db.ensure_schema().await?;

	let service = Arc::new(ResearchService::new(config, Arc::new(db), Providers::default()));

	match args.command.unwrap_or(Command::Serve) {
		Command::Serve => worker::run_worker(service).await?,
		Command::Submit { name, submitted_by, file, mut companies } => {
			if let Some(path) = file {
				companies.extend(fs::read_to_string(path)?.lines().map(str::to_string));
			}

			let job_id = service.submit(SubmitRequest { name, submitted_by, companies }).await?;

			println!("{job_id}");
		},
		Command::Run { job_id } => {
			service.start(job_id).await?;

			tokio::select! {
				_ = worker::wait_for_job(&service, job_id) => {},
				_ = tokio::signal::ctrl_c() => {
					tracing::info!(job_id = %job_id, "Interrupted. Cancelling job.");

					service.shutdown().await;
				},
			}

			print_summary(&service, job_id).await?;
		},
		Command::Progress { job_id } => print_summary(&service, job_id).await?,
		Command::Resubmit { job_id, submitted_by } => {
			let new_id = service.resubmit(job_id, submitted_by.as_deref()).await?;

			println!("{new_id}");
		},
		Command::Delete { job_id } => service.delete_job(job_id).await?,
	}

	Ok(())
}

async fn print_summary(service: &ResearchService, job_id: Uuid) -> Result<()> {
	let summary = service.job_summary(job_id).await?;
	let mut value = serde_json::to_value(&summary)?;

	if let Value::Object(map) = &mut value {
		map.insert("cost".to_string(), Value::String(summary.cost_display()));

		if let Some(duration) = summary.duration_display() {
			map.insert("duration".to_string(), Value::String(duration));
		}
	}

	println!("{}", serde_json::to_string_pretty(&value)?);

	Ok(())
}
