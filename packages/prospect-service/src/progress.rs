use serde::Serialize;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::{Error, ResearchService, Result};
use prospect_domain::{
	cost,
	progress::{self, Progress},
};
use prospect_storage::models::ResearchJob;

/// Progress plus usage totals for one job.
#[derive(Debug, Clone, Serialize)]
pub struct JobSummary {
	pub job_id: Uuid,
	pub name: Option<String>,
	pub progress: Progress,
	pub total_search_credits: f64,
	pub total_cost_usd: f64,
	pub error_message: Option<String>,
	/// Seconds between start and completion, or until `now` while the job runs.
	pub duration_seconds: Option<f64>,
}
impl JobSummary {
	pub fn from_job(job: &ResearchJob, stall_threshold: Duration, now: OffsetDateTime) -> Result<Self> {
		let status = job.status()?;
		let stalled = job.is_stalled
			|| progress::is_stalled(
				status,
				job.last_activity_at.or(job.started_at),
				now,
				stall_threshold,
			);
		let duration_seconds =
			job.started_at.map(|started| (job.completed_at.unwrap_or(now) - started).as_seconds_f64());

		Ok(Self {
			job_id: job.job_id,
			name: job.name.clone(),
			progress: Progress::new(
				status,
				i64::from(job.total_companies),
				i64::from(job.completed_companies),
				i64::from(job.failed_companies),
				stalled,
			),
			total_search_credits: job.total_search_credits,
			total_cost_usd: job.total_cost_usd,
			error_message: job.error_message.clone(),
			duration_seconds,
		})
	}

	pub fn cost_display(&self) -> String {
		cost::format_cost(self.total_cost_usd)
	}

	pub fn duration_display(&self) -> Option<String> {
		self.duration_seconds.map(cost::format_duration)
	}
}

impl ResearchService {
	pub async fn get_progress(&self, job_id: Uuid) -> Result<Progress> {
		Ok(self.job_summary(job_id).await?.progress)
	}

	pub async fn job_summary(&self, job_id: Uuid) -> Result<JobSummary> {
		let job = self
			.store
			.get_job(job_id)
			.await?
			.ok_or_else(|| Error::NotFound { message: format!("Job {job_id} not found.") })?;

		JobSummary::from_job(&job, self.stall_threshold(), OffsetDateTime::now_utc())
	}

	/// Flags running jobs whose last activity is older than the configured threshold.
	pub async fn mark_stalled_jobs(&self) -> Result<u64> {
		let cutoff = OffsetDateTime::now_utc() - self.stall_threshold();
		let marked = self.store.mark_stalled(cutoff).await?;

		if marked > 0 {
			tracing::warn!(jobs = marked, "Marked stalled research jobs.");
		}

		Ok(marked)
	}

	fn stall_threshold(&self) -> Duration {
		Duration::seconds(self.cfg.health.stall_threshold_seconds)
	}
}
