use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
	Result,
	db::Db,
	models::{ResearchJob, WindowCommit},
};
use prospect_domain::status::JobStatus;

const JOB_COLUMNS: &str = "\
job_id,
name,
submitted_by,
status,
total_companies,
completed_companies,
failed_companies,
total_search_credits,
total_cost_usd,
error_message,
is_stalled,
created_at,
started_at,
completed_at,
last_activity_at";

/// Fields of a job created by a submission.
#[derive(Debug, Clone)]
pub struct NewJob<'a> {
	pub job_id: Uuid,
	pub name: Option<&'a str>,
	pub submitted_by: Option<&'a str>,
	pub companies: &'a [String],
	pub created_at: OffsetDateTime,
}

/// Inserts a pending job and its pending companies in one transaction.
pub async fn insert_job(db: &Db, job: &NewJob<'_>) -> Result<()> {
	let total = i32::try_from(job.companies.len()).map_err(|_| {
		crate::Error::InvalidArgument("Too many companies for one job.".to_string())
	})?;
	let mut tx = db.pool.begin().await?;

	sqlx::query(
		"\
INSERT INTO research_jobs (job_id, name, submitted_by, status, total_companies, created_at)
VALUES ($1, $2, $3, 'pending', $4, $5)",
	)
	.bind(job.job_id)
	.bind(job.name)
	.bind(job.submitted_by)
	.bind(total)
	.bind(job.created_at)
	.execute(&mut *tx)
	.await?;

	for (position, name) in job.companies.iter().enumerate() {
		sqlx::query(
			"\
INSERT INTO companies (company_id, job_id, position, name, status, created_at, updated_at)
VALUES ($1, $2, $3, $4, 'pending', $5, $5)",
		)
		.bind(Uuid::new_v4())
		.bind(job.job_id)
		.bind(position as i32)
		.bind(name.as_str())
		.bind(job.created_at)
		.execute(&mut *tx)
		.await?;
	}

	tx.commit().await?;

	Ok(())
}

pub async fn get_job(db: &Db, job_id: Uuid) -> Result<Option<ResearchJob>> {
	let sql = format!("SELECT {JOB_COLUMNS} FROM research_jobs WHERE job_id = $1");
	let job = sqlx::query_as::<_, ResearchJob>(&sql).bind(job_id).fetch_optional(&db.pool).await?;

	Ok(job)
}

/// Moves a pending job to running. Returns false when the job is not pending.
pub async fn begin_job(db: &Db, job_id: Uuid, now: OffsetDateTime) -> Result<bool> {
	let result = sqlx::query(
		"\
UPDATE research_jobs
SET status = 'running', started_at = $2, last_activity_at = $2, is_stalled = false
WHERE job_id = $1 AND status = 'pending'",
	)
	.bind(job_id)
	.bind(now)
	.execute(&db.pool)
	.await?;

	Ok(result.rows_affected() == 1)
}

/// Claims the oldest pending job and moves it to running.
pub async fn claim_next_pending(db: &Db, now: OffsetDateTime) -> Result<Option<Uuid>> {
	let mut tx = db.pool.begin().await?;
	let row: Option<(Uuid,)> = sqlx::query_as(
		"\
SELECT job_id
FROM research_jobs
WHERE status = 'pending'
ORDER BY created_at ASC
LIMIT 1
FOR UPDATE SKIP LOCKED",
	)
	.fetch_optional(&mut *tx)
	.await?;
	let Some((job_id,)) = row else {
		tx.commit().await?;

		return Ok(None);
	};

	sqlx::query(
		"\
UPDATE research_jobs
SET status = 'running', started_at = $2, last_activity_at = $2, is_stalled = false
WHERE job_id = $1",
	)
	.bind(job_id)
	.bind(now)
	.execute(&mut *tx)
	.await?;

	tx.commit().await?;

	Ok(Some(job_id))
}

/// Records activity on a running job without touching its aggregates.
pub async fn touch_job(db: &Db, job_id: Uuid, now: OffsetDateTime) -> Result<()> {
	sqlx::query(
		"\
UPDATE research_jobs
SET last_activity_at = $2, is_stalled = false
WHERE job_id = $1 AND status = 'running'",
	)
	.bind(job_id)
	.bind(now)
	.execute(&db.pool)
	.await?;

	Ok(())
}

/// Applies one window's counters and recomputes spend from the company rows.
pub async fn commit_window(db: &Db, job_id: Uuid, commit: &WindowCommit) -> Result<bool> {
	let result = sqlx::query(
		"\
WITH usage AS (
	SELECT COALESCE(SUM(search_credits_used), 0)::double precision AS credits
	FROM companies
	WHERE job_id = $1
)
UPDATE research_jobs
SET
	completed_companies = completed_companies + $2,
	failed_companies = failed_companies + $3,
	total_search_credits = usage.credits,
	total_cost_usd = usage.credits * $4,
	last_activity_at = $5,
	is_stalled = false
FROM usage
WHERE job_id = $1 AND status = 'running'",
	)
	.bind(job_id)
	.bind(commit.completed)
	.bind(commit.failed)
	.bind(commit.usd_per_credit)
	.bind(commit.at)
	.execute(&db.pool)
	.await?;

	Ok(result.rows_affected() == 1)
}

/// Moves a job to a terminal status when its current status allows it.
pub async fn finish_job(
	db: &Db,
	job_id: Uuid,
	status: JobStatus,
	error_message: Option<&str>,
	now: OffsetDateTime,
) -> Result<bool> {
	let from: Vec<String> = [JobStatus::Pending, JobStatus::Running]
		.into_iter()
		.filter(|candidate| candidate.can_transition_to(status))
		.map(|candidate| candidate.as_str().to_string())
		.collect();
	let result = sqlx::query(
		"\
UPDATE research_jobs
SET status = $2, error_message = $3, completed_at = $4, is_stalled = false
WHERE job_id = $1 AND status = ANY($5)",
	)
	.bind(job_id)
	.bind(status.as_str())
	.bind(error_message)
	.bind(now)
	.bind(from)
	.execute(&db.pool)
	.await?;

	Ok(result.rows_affected() == 1)
}

/// Flags running jobs with no activity since `cutoff`. Returns the number of newly flagged jobs.
pub async fn mark_stalled(db: &Db, cutoff: OffsetDateTime) -> Result<u64> {
	let result = sqlx::query(
		"\
UPDATE research_jobs
SET is_stalled = true
WHERE status = 'running'
	AND NOT is_stalled
	AND COALESCE(last_activity_at, started_at) < $1",
	)
	.bind(cutoff)
	.execute(&db.pool)
	.await?;

	Ok(result.rows_affected())
}

/// Deletes a job that is not running, together with its companies.
pub async fn delete_job(db: &Db, job_id: Uuid) -> Result<bool> {
	let result = sqlx::query("DELETE FROM research_jobs WHERE job_id = $1 AND status <> 'running'")
		.bind(job_id)
		.execute(&db.pool)
		.await?;

	Ok(result.rows_affected() == 1)
}

/// Creates a pending job from the unfinished companies of `source`, carrying their cache fields.
///
/// Returns the number of companies copied.
pub async fn clone_unfinished(
	db: &Db,
	source: Uuid,
	job: &NewJob<'_>,
) -> Result<i32> {
	let mut tx = db.pool.begin().await?;

	sqlx::query(
		"\
INSERT INTO research_jobs (job_id, name, submitted_by, status, total_companies, created_at)
VALUES ($1, $2, $3, 'pending', 0, $4)",
	)
	.bind(job.job_id)
	.bind(job.name)
	.bind(job.submitted_by)
	.bind(job.created_at)
	.execute(&mut *tx)
	.await?;

	let copied = sqlx::query(
		"\
INSERT INTO companies (
	company_id,
	job_id,
	position,
	name,
	status,
	cached,
	verified,
	cached_at,
	formatted_snapshot,
	validation_message,
	created_at,
	updated_at
)
SELECT
	gen_random_uuid(),
	$2,
	(row_number() OVER (ORDER BY position) - 1)::integer,
	name,
	'pending',
	cached,
	verified,
	cached_at,
	formatted_snapshot,
	validation_message,
	$3,
	$3
FROM companies
WHERE job_id = $1 AND status <> 'completed'",
	)
	.bind(source)
	.bind(job.job_id)
	.bind(job.created_at)
	.execute(&mut *tx)
	.await?
	.rows_affected();
	let copied = i32::try_from(copied)
		.map_err(|_| crate::Error::InvalidArgument("Too many companies for one job.".to_string()))?;

	sqlx::query("UPDATE research_jobs SET total_companies = $2 WHERE job_id = $1")
		.bind(job.job_id)
		.bind(copied)
		.execute(&mut *tx)
		.await?;

	tx.commit().await?;

	Ok(copied)
}
