//! Persistence seam for the pipeline.
//!
//! [`Db`] is the production store. Every write the pipeline performs goes through this trait so
//! a job's single writer is always the orchestrator task that owns it.

use time::OffsetDateTime;
use uuid::Uuid;

use crate::{BoxFuture, Result};
use prospect_domain::status::JobStatus;
use prospect_storage::{
	companies,
	db::Db,
	jobs::{self, NewJob},
	models::{AnalysisRecord, CacheUpdate, Company, FetchAttempt, ResearchJob, WindowCommit},
};

pub trait JobStore
where
	Self: Send + Sync,
{
	fn insert_job<'a>(&'a self, job: NewJob<'a>) -> BoxFuture<'a, Result<()>>;

	fn get_job(&self, job_id: Uuid) -> BoxFuture<'_, Result<Option<ResearchJob>>>;

	/// Pending to running. Returns false when the job was not pending.
	fn begin_job(&self, job_id: Uuid, now: OffsetDateTime) -> BoxFuture<'_, Result<bool>>;

	fn claim_next_pending(&self, now: OffsetDateTime) -> BoxFuture<'_, Result<Option<Uuid>>>;

	fn touch_job(&self, job_id: Uuid, now: OffsetDateTime) -> BoxFuture<'_, Result<()>>;

	fn commit_window(&self, job_id: Uuid, commit: WindowCommit) -> BoxFuture<'_, Result<bool>>;

	fn finish_job<'a>(
		&'a self,
		job_id: Uuid,
		status: JobStatus,
		error_message: Option<&'a str>,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<bool>>;

	fn mark_stalled(&self, cutoff: OffsetDateTime) -> BoxFuture<'_, Result<u64>>;

	fn delete_job(&self, job_id: Uuid) -> BoxFuture<'_, Result<bool>>;

	fn clone_unfinished<'a>(&'a self, source: Uuid, job: NewJob<'a>)
	-> BoxFuture<'a, Result<i32>>;

	fn list_companies(&self, job_id: Uuid) -> BoxFuture<'_, Result<Vec<Company>>>;

	fn pending_companies(&self, job_id: Uuid) -> BoxFuture<'_, Result<Vec<Company>>>;

	fn mark_researching(&self, company_id: Uuid, now: OffsetDateTime) -> BoxFuture<'_, Result<()>>;

	fn record_fetch_attempt<'a>(
		&'a self,
		company_id: Uuid,
		attempt: &'a FetchAttempt,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<()>>;

	fn store_cache<'a>(
		&'a self,
		company_id: Uuid,
		update: &'a CacheUpdate,
	) -> BoxFuture<'a, Result<()>>;

	fn record_validation<'a>(
		&'a self,
		company_id: Uuid,
		message: &'a str,
		verified: bool,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<()>>;

	fn complete_company<'a>(
		&'a self,
		company_id: Uuid,
		record: &'a AnalysisRecord,
	) -> BoxFuture<'a, Result<()>>;

	fn fail_company<'a>(
		&'a self,
		company_id: Uuid,
		error_message: &'a str,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<()>>;
}

impl JobStore for Db {
	fn insert_job<'a>(&'a self, job: NewJob<'a>) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move { Ok(jobs::insert_job(self, &job).await?) })
	}

	fn get_job(&self, job_id: Uuid) -> BoxFuture<'_, Result<Option<ResearchJob>>> {
		Box::pin(async move { Ok(jobs::get_job(self, job_id).await?) })
	}

	fn begin_job(&self, job_id: Uuid, now: OffsetDateTime) -> BoxFuture<'_, Result<bool>> {
		Box::pin(async move { Ok(jobs::begin_job(self, job_id, now).await?) })
	}

	fn claim_next_pending(&self, now: OffsetDateTime) -> BoxFuture<'_, Result<Option<Uuid>>> {
		Box::pin(async move { Ok(jobs::claim_next_pending(self, now).await?) })
	}

	fn touch_job(&self, job_id: Uuid, now: OffsetDateTime) -> BoxFuture<'_, Result<()>> {
		Box::pin(async move { Ok(jobs::touch_job(self, job_id, now).await?) })
	}

	fn commit_window(&self, job_id: Uuid, commit: WindowCommit) -> BoxFuture<'_, Result<bool>> {
		Box::pin(async move { Ok(jobs::commit_window(self, job_id, &commit).await?) })
	}

	fn finish_job<'a>(
		&'a self,
		job_id: Uuid,
		status: JobStatus,
		error_message: Option<&'a str>,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<bool>> {
		Box::pin(async move { Ok(jobs::finish_job(self, job_id, status, error_message, now).await?) })
	}

	fn mark_stalled(&self, cutoff: OffsetDateTime) -> BoxFuture<'_, Result<u64>> {
		Box::pin(async move { Ok(jobs::mark_stalled(self, cutoff).await?) })
	}

	fn delete_job(&self, job_id: Uuid) -> BoxFuture<'_, Result<bool>> {
		Box::pin(async move { Ok(jobs::delete_job(self, job_id).await?) })
	}

	fn clone_unfinished<'a>(
		&'a self,
		source: Uuid,
		job: NewJob<'a>,
	) -> BoxFuture<'a, Result<i32>> {
		Box::pin(async move { Ok(jobs::clone_unfinished(self, source, &job).await?) })
	}

	fn list_companies(&self, job_id: Uuid) -> BoxFuture<'_, Result<Vec<Company>>> {
		Box::pin(async move { Ok(companies::list_companies(self, job_id).await?) })
	}

	fn pending_companies(&self, job_id: Uuid) -> BoxFuture<'_, Result<Vec<Company>>> {
		Box::pin(async move { Ok(companies::pending_companies(self, job_id).await?) })
	}

	fn mark_researching(&self, company_id: Uuid, now: OffsetDateTime) -> BoxFuture<'_, Result<()>> {
		Box::pin(async move { Ok(companies::mark_researching(self, company_id, now).await?) })
	}

	fn record_fetch_attempt<'a>(
		&'a self,
		company_id: Uuid,
		attempt: &'a FetchAttempt,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			Ok(companies::record_fetch_attempt(self, company_id, attempt, now).await?)
		})
	}

	fn store_cache<'a>(
		&'a self,
		company_id: Uuid,
		update: &'a CacheUpdate,
	) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move { Ok(companies::store_cache(self, company_id, update).await?) })
	}

	fn record_validation<'a>(
		&'a self,
		company_id: Uuid,
		message: &'a str,
		verified: bool,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			Ok(companies::record_validation(self, company_id, message, verified, now).await?)
		})
	}

	fn complete_company<'a>(
		&'a self,
		company_id: Uuid,
		record: &'a AnalysisRecord,
	) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move { Ok(companies::complete_company(self, company_id, record).await?) })
	}

	fn fail_company<'a>(
		&'a self,
		company_id: Uuid,
		error_message: &'a str,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			Ok(companies::fail_company(self, company_id, error_message, now).await?)
		})
	}
}
