//! Job lifecycle: `pending -> running -> {completed | failed | cancelled}`.
//!
//! Phase 1 fetches and validates evidence for every pending company; companies left without
//! evidence are marked failed as soon as it ends. Phase 2 analyzes the rest. Job aggregates are
//! written only after a Phase 2 window has fully completed.

use std::{any::Any, panic::AssertUnwindSafe, sync::Arc};

use futures::FutureExt;
use time::OffsetDateTime;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{
	Error, ResearchService, Result,
	analyze::{self, Analysis, AnalyzeOutcome},
	fetch::{self, FetchOutcome},
	registry::Registration,
	scheduler::{self, ItemOutcome},
};
use prospect_domain::{sanitize, status::JobStatus};
use prospect_storage::models::{AnalysisRecord, Company, WindowCommit};

/// A company with the evidence Phase 1 produced for it.
#[derive(Debug, Clone)]
pub struct Phase1Entry {
	pub company: Company,
	pub outcome: FetchOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityResult {
	Completed,
	Failed,
}

struct PhaseRun<T> {
	items: Vec<T>,
	cancelled: bool,
}

impl ResearchService {
	/// Moves a pending job to running and drives it on a background task.
	pub async fn start(self: &Arc<Self>, job_id: Uuid) -> Result<()> {
		let token = self.begin(job_id).await?;

		self.spawn(job_id, token);

		Ok(())
	}

	/// Like [`ResearchService::start`], but drives the job in the caller's task.
	pub async fn run(self: &Arc<Self>, job_id: Uuid) -> Result<JobStatus> {
		let token = self.begin(job_id).await?;

		Ok(self.drive(job_id, token).await)
	}

	/// Claims the oldest pending job and starts it. Returns the claimed job id.
	pub async fn start_next(self: &Arc<Self>) -> Result<Option<Uuid>> {
		let Some(job_id) = self.store.claim_next_pending(OffsetDateTime::now_utc()).await? else {
			return Ok(None);
		};
		let token = self.register(job_id)?;

		self.spawn(job_id, token);

		Ok(Some(job_id))
	}

	/// Requests cancellation. Returns false when no task is running the job.
	pub fn cancel(&self, job_id: Uuid) -> bool {
		let cancelled = self.registry.cancel(job_id);

		if cancelled {
			tracing::info!(job_id = %job_id, "Cancellation requested.");
		}

		cancelled
	}

	/// Cancels every running job and waits for their tasks to exit.
	pub async fn shutdown(&self) {
		let handles = self.registry.cancel_all();

		tracing::info!(jobs = handles.len(), "Waiting for running jobs to stop.");

		for joined in futures::future::join_all(handles).await {
			if let Err(err) = joined {
				tracing::error!(error = %err, "Job task ended abnormally.");
			}
		}
	}

	async fn begin(&self, job_id: Uuid) -> Result<CancellationToken> {
		let job = self
			.store
			.get_job(job_id)
			.await?
			.ok_or_else(|| Error::NotFound { message: format!("Job {job_id} not found.") })?;

		match job.status()? {
			JobStatus::Pending => {},
			JobStatus::Running =>
				return Err(Error::Conflict { message: format!("Job {job_id} is already running.") }),
			status =>
				return Err(Error::Conflict {
					message: format!("Job {job_id} is {status} and cannot be started."),
				}),
		}

		if !self.store.begin_job(job_id, OffsetDateTime::now_utc()).await? {
			return Err(Error::Conflict { message: format!("Job {job_id} is no longer pending.") });
		}

		self.register(job_id)
	}

	/// Registers a job whose row this process has just moved to running.
	fn register(&self, job_id: Uuid) -> Result<CancellationToken> {
		// The pending guard admits one transition per job, so an existing entry is its driver.
		self.registry.register(job_id).ok_or_else(|| Error::Conflict {
			message: format!("Job {job_id} is already running."),
		})
	}

	fn spawn(self: &Arc<Self>, job_id: Uuid, token: CancellationToken) {
		let service = Arc::clone(self);
		let handle = tokio::spawn(async move {
			service.drive(job_id, token).await;
		});

		self.registry.attach(job_id, handle);
	}

	/// Runs the job to a terminal status. The job is never left running when this returns.
	async fn drive(self: &Arc<Self>, job_id: Uuid, token: CancellationToken) -> JobStatus {
		let _registration = Registration::new(Arc::clone(self), job_id);
		let failure = match AssertUnwindSafe(self.execute(job_id, &token)).catch_unwind().await {
			Ok(Ok(status)) => return status,
			Ok(Err(err)) => sanitize::sanitize_error(&err.to_string()),
			Err(panic) => format!("Job task panicked: {}", panic_message(panic.as_ref())),
		};

		tracing::error!(job_id = %job_id, error = %failure, "Research job failed.");

		if let Err(err) = self
			.store
			.finish_job(job_id, JobStatus::Failed, Some(&failure), OffsetDateTime::now_utc())
			.await
		{
			tracing::error!(job_id = %job_id, error = %err, "Failed to mark job as failed.");
		}

		JobStatus::Failed
	}

	async fn execute(self: &Arc<Self>, job_id: Uuid, token: &CancellationToken) -> Result<JobStatus> {
		let companies = self.store.pending_companies(job_id).await?;

		tracing::info!(job_id = %job_id, companies = companies.len(), "Research job started.");

		let phase1 = self.run_phase1(job_id, companies, token).await?;

		for entry in &phase1.items {
			if let Some(message) = entry.outcome.error() {
				self.fail_company(&entry.company, message).await;
			}
		}

		if phase1.cancelled {
			return self.finish(job_id, JobStatus::Cancelled).await;
		}

		let ready = phase1.items.iter().filter(|entry| entry.outcome.evidence().is_some()).count();
		let cached =
			phase1.items.iter().filter(|entry| matches!(entry.outcome, FetchOutcome::Cached(_))).count();

		tracing::info!(
			job_id = %job_id,
			ready,
			cached,
			failed = phase1.items.len() - ready,
			"Evidence phase finished."
		);

		let phase2 = self.run_phase2(job_id, phase1.items, token).await?;

		if phase2.cancelled {
			return self.finish(job_id, JobStatus::Cancelled).await;
		}

		self.finish(job_id, JobStatus::Completed).await
	}

	async fn run_phase1(
		self: &Arc<Self>,
		job_id: Uuid,
		companies: Vec<Company>,
		token: &CancellationToken,
	) -> Result<PhaseRun<Phase1Entry>> {
		let store = self.store.as_ref();
		let total = companies.len();
		let snapshot = companies.clone();
		let service = Arc::clone(self);
		let mut done = 0;
		let run = scheduler::run_windows(
			companies,
			self.cfg.research.phase1_window_size,
			token,
			move |company: Company| {
				let service = Arc::clone(&service);

				async move {
					let outcome = match fetch::fetch_and_validate(&service, &company).await {
						Ok(outcome) => outcome,
						Err(err) => FetchOutcome::Failed(sanitize::sanitize_error(&format!(
							"Evidence stage storage error: {err}"
						))),
					};

					Phase1Entry { company, outcome }
				}
			},
			|window: &[ItemOutcome<Phase1Entry>]| {
				done += window.len();

				let progress = done;

				Box::pin(async move {
					store.touch_job(job_id, OffsetDateTime::now_utc()).await?;

					tracing::info!(job_id = %job_id, done = progress, total, "Evidence window finished.");

					Ok::<(), Error>(())
				})
			},
		)
		.await?;
		let items = run
			.outcomes
			.into_iter()
			.map(|item| match item.result {
				Ok(entry) => entry,
				Err(panic) => Phase1Entry {
					company: snapshot[item.index].clone(),
					outcome: FetchOutcome::Failed(format!("Evidence stage panicked: {}", panic.0)),
				},
			})
			.collect();

		Ok(PhaseRun { items, cancelled: run.cancelled })
	}

	async fn run_phase2(
		self: &Arc<Self>,
		job_id: Uuid,
		entries: Vec<Phase1Entry>,
		token: &CancellationToken,
	) -> Result<PhaseRun<EntityResult>> {
		let store = self.store.as_ref();
		let usd_per_credit = self.cfg.cost.usd_per_credit;
		let company_ids: Vec<Uuid> = entries.iter().map(|entry| entry.company.company_id).collect();
		let service = Arc::clone(self);
		let run = scheduler::run_windows(
			entries,
			self.cfg.research.phase2_window_size,
			token,
			move |entry: Phase1Entry| {
				let service = Arc::clone(&service);

				async move { service.settle(entry).await }
			},
			|window: &[ItemOutcome<EntityResult>]| {
				let mut completed = 0;
				let mut failed = 0;
				let mut panicked = Vec::new();

				for item in window {
					match &item.result {
						Ok(EntityResult::Completed) => completed += 1,
						Ok(EntityResult::Failed) => failed += 1,
						Err(panic) => {
							failed += 1;

							panicked.push((company_ids[item.index], panic.0.clone()));
						},
					}
				}

				Box::pin(async move {
					let now = OffsetDateTime::now_utc();

					for (company_id, message) in panicked {
						let message = format!("Analysis stage panicked: {message}");

						store.fail_company(company_id, &message, now).await?;
					}

					let commit = WindowCommit { completed, failed, usd_per_credit, at: now };

					if !store.commit_window(job_id, commit).await? {
						tracing::warn!(job_id = %job_id, "Job is no longer running. Window not counted.");
					}

					tracing::info!(job_id = %job_id, completed, failed, "Analysis window committed.");

					Ok::<(), Error>(())
				})
			},
		)
		.await?;
		let items = run
			.outcomes
			.into_iter()
			.map(|item| item.result.unwrap_or(EntityResult::Failed))
			.collect();

		Ok(PhaseRun { items, cancelled: run.cancelled })
	}

	/// Analyzes one company and persists the outcome. Companies without evidence were already
	/// recorded as failed when the evidence phase ended.
	async fn settle(&self, entry: Phase1Entry) -> EntityResult {
		let company = &entry.company;
		let analyzed = match &entry.outcome {
			FetchOutcome::Cached(evidence) | FetchOutcome::Fetched(evidence) =>
				analyze::analyze(self, company, evidence).await,
			FetchOutcome::Failed(_) => return EntityResult::Failed,
		};

		match analyzed {
			AnalyzeOutcome::Analyzed(analysis) => {
				let record = analysis_record(&analysis, OffsetDateTime::now_utc());

				match self.store.complete_company(company.company_id, &record).await {
					Ok(()) => EntityResult::Completed,
					Err(err) => {
						let message = format!("Failed to store analysis: {err}");

						self.fail_company(company, &message).await;

						EntityResult::Failed
					},
				}
			},
			AnalyzeOutcome::Failed(message) => {
				self.fail_company(company, &message).await;

				EntityResult::Failed
			},
		}
	}

	async fn fail_company(&self, company: &Company, message: &str) {
		let message = sanitize::sanitize_error(message);

		if let Err(err) =
			self.store.fail_company(company.company_id, &message, OffsetDateTime::now_utc()).await
		{
			tracing::error!(
				company = %company.name,
				error = %err,
				"Failed to record company failure."
			);
		}
	}

	async fn finish(&self, job_id: Uuid, status: JobStatus) -> Result<JobStatus> {
		let moved = self.store.finish_job(job_id, status, None, OffsetDateTime::now_utc()).await?;

		if !moved {
			tracing::warn!(job_id = %job_id, status = %status, "Job was not running. Status unchanged.");
		}

		match self.job_summary(job_id).await {
			Ok(summary) => tracing::info!(
				job_id = %job_id,
				status = %status,
				completed = summary.progress.completed,
				failed = summary.progress.failed,
				total = summary.progress.total,
				cost = %summary.cost_display(),
				duration = %summary.duration_display().unwrap_or_default(),
				"Research job finished."
			),
			Err(err) => tracing::warn!(job_id = %job_id, error = %err, "Failed to summarize job."),
		}

		Ok(status)
	}
}

fn analysis_record(analysis: &Analysis, now: OffsetDateTime) -> AnalysisRecord {
	let result = &analysis.result;

	AnalysisRecord {
		analysis: serde_json::to_value(result).unwrap_or_else(|_| result.raw.clone()),
		score_total: i32::try_from(result.scores.total).unwrap_or(i32::MAX),
		priority_tier: result.priority_tier.as_str().to_string(),
		recommended_action: result.recommended_action.clone(),
		llm_response_raw: analysis.raw_text.clone(),
		llm_tokens_used: analysis.tokens_used,
		llm_response_ms: analysis.response_ms,
		researched_at: now,
	}
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
	if let Some(message) = panic.downcast_ref::<&str>() {
		return (*message).to_string();
	}
	if let Some(message) = panic.downcast_ref::<String>() {
		return message.clone();
	}

	"unknown panic".to_string()
}
