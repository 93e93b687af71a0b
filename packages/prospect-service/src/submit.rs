use serde::Deserialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{Error, ResearchService, Result};
use prospect_storage::jobs::NewJob;

pub const MAX_COMPANIES_PER_JOB: usize = 500;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmitRequest {
	#[serde(default)]
	pub name: Option<String>,
	#[serde(default)]
	pub submitted_by: Option<String>,
	pub companies: Vec<String>,
}
impl SubmitRequest {
	/// Trimmed, non-blank company names in submission order.
	pub fn normalized_companies(&self) -> Result<Vec<String>> {
		let companies: Vec<String> = self
			.companies
			.iter()
			.map(|name| name.trim())
			.filter(|name| !name.is_empty())
			.map(str::to_string)
			.collect();

		if companies.is_empty() {
			return Err(Error::InvalidRequest {
				message: "At least one company name is required.".to_string(),
			});
		}
		if companies.len() > MAX_COMPANIES_PER_JOB {
			return Err(Error::InvalidRequest {
				message: format!(
					"A job holds at most {MAX_COMPANIES_PER_JOB} companies; got {}.",
					companies.len()
				),
			});
		}

		Ok(companies)
	}
}

impl ResearchService {
	/// Creates a pending job with one pending company per name.
	pub async fn submit(&self, req: SubmitRequest) -> Result<Uuid> {
		let companies = req.normalized_companies()?;
		let job_id = Uuid::new_v4();
		let job = NewJob {
			job_id,
			name: trimmed(req.name.as_deref()),
			submitted_by: trimmed(req.submitted_by.as_deref()),
			companies: &companies,
			created_at: OffsetDateTime::now_utc(),
		};

		self.store.insert_job(job).await?;

		tracing::info!(job_id = %job_id, companies = companies.len(), "Research job submitted.");

		Ok(job_id)
	}

	/// Creates a new pending job from the companies a finished job did not complete.
	///
	/// Verified evidence carries over, so cached companies skip the evidence fetch.
	pub async fn resubmit(&self, job_id: Uuid, submitted_by: Option<&str>) -> Result<Uuid> {
		let job = self
			.store
			.get_job(job_id)
			.await?
			.ok_or_else(|| Error::NotFound { message: format!("Job {job_id} not found.") })?;
		let status = job.status()?;

		if !status.is_terminal() {
			return Err(Error::Conflict {
				message: format!("Job {job_id} is {status}; only finished jobs can be resubmitted."),
			});
		}

		let name = job.name.as_deref().map(|name| format!("{name} (resubmitted)"));
		let new_id = Uuid::new_v4();
		let new_job = NewJob {
			job_id: new_id,
			name: name.as_deref(),
			submitted_by: trimmed(submitted_by).or(job.submitted_by.as_deref()),
			companies: &[],
			created_at: OffsetDateTime::now_utc(),
		};
		let copied = self.store.clone_unfinished(job_id, new_job).await?;

		if copied == 0 {
			self.store.delete_job(new_id).await?;

			return Err(Error::InvalidRequest {
				message: format!("Job {job_id} has no unfinished companies."),
			});
		}

		tracing::info!(
			source_job_id = %job_id,
			job_id = %new_id,
			companies = copied,
			"Research job resubmitted."
		);

		Ok(new_id)
	}

	/// Removes a job that is not running, with its companies.
	pub async fn delete_job(&self, job_id: Uuid) -> Result<()> {
		if self.store.get_job(job_id).await?.is_none() {
			return Err(Error::NotFound { message: format!("Job {job_id} not found.") });
		}
		if self.registry.contains(job_id) || !self.store.delete_job(job_id).await? {
			return Err(Error::Conflict {
				message: format!("Job {job_id} is running and cannot be deleted."),
			});
		}

		tracing::info!(job_id = %job_id, "Research job deleted.");

		Ok(())
	}
}

fn trimmed(value: Option<&str>) -> Option<&str> {
	value.map(str::trim).filter(|value| !value.is_empty())
}
