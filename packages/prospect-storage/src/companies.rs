use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
	Result,
	db::Db,
	models::{AnalysisRecord, CacheUpdate, Company, FetchAttempt},
};

const COMPANY_COLUMNS: &str = "\
company_id,
job_id,
position,
name,
status,
error_message,
search_results_raw,
search_credits_used,
search_response_ms,
cached,
verified,
cached_at,
formatted_snapshot,
validation_message,
analysis,
score_total,
priority_tier,
recommended_action,
llm_response_raw,
llm_tokens_used,
llm_response_ms,
researched_at,
created_at,
updated_at";

pub async fn list_companies(db: &Db, job_id: Uuid) -> Result<Vec<Company>> {
	let sql = format!("SELECT {COMPANY_COLUMNS} FROM companies WHERE job_id = $1 ORDER BY position");
	let rows = sqlx::query_as::<_, Company>(&sql).bind(job_id).fetch_all(&db.pool).await?;

	Ok(rows)
}

pub async fn pending_companies(db: &Db, job_id: Uuid) -> Result<Vec<Company>> {
	let sql = format!(
		"SELECT {COMPANY_COLUMNS} FROM companies WHERE job_id = $1 AND status = 'pending' ORDER BY position"
	);
	let rows = sqlx::query_as::<_, Company>(&sql).bind(job_id).fetch_all(&db.pool).await?;

	Ok(rows)
}

pub async fn mark_researching(db: &Db, company_id: Uuid, now: OffsetDateTime) -> Result<()> {
	sqlx::query(
		"\
UPDATE companies
SET status = 'researching', updated_at = $2
WHERE company_id = $1 AND status IN ('pending', 'researching')",
	)
	.bind(company_id)
	.bind(now)
	.execute(&db.pool)
	.await?;

	Ok(())
}

pub async fn record_fetch_attempt(
	db: &Db,
	company_id: Uuid,
	attempt: &FetchAttempt,
	now: OffsetDateTime,
) -> Result<()> {
	sqlx::query(
		"\
UPDATE companies
SET
	search_results_raw = $2,
	search_credits_used = COALESCE(search_credits_used, 0) + $3,
	search_response_ms = $4,
	updated_at = $5
WHERE company_id = $1",
	)
	.bind(company_id)
	.bind(&attempt.raw)
	.bind(attempt.credits_used)
	.bind(attempt.response_ms)
	.bind(now)
	.execute(&db.pool)
	.await?;

	Ok(())
}

pub async fn store_cache(db: &Db, company_id: Uuid, update: &CacheUpdate) -> Result<()> {
	sqlx::query(
		"\
UPDATE companies
SET
	cached = true,
	verified = true,
	cached_at = $2,
	formatted_snapshot = $3,
	validation_message = $4,
	updated_at = $2
WHERE company_id = $1",
	)
	.bind(company_id)
	.bind(update.cached_at)
	.bind(update.snapshot.as_str())
	.bind(update.validation_message.as_str())
	.execute(&db.pool)
	.await?;

	Ok(())
}

/// Stores the judge's message. A `verified` of false clears the flag; true leaves it unchanged.
pub async fn record_validation(
	db: &Db,
	company_id: Uuid,
	message: &str,
	verified: bool,
	now: OffsetDateTime,
) -> Result<()> {
	sqlx::query(
		"\
UPDATE companies
SET validation_message = $2, verified = verified AND $3, updated_at = $4
WHERE company_id = $1",
	)
	.bind(company_id)
	.bind(message)
	.bind(verified)
	.bind(now)
	.execute(&db.pool)
	.await?;

	Ok(())
}

pub async fn complete_company(db: &Db, company_id: Uuid, record: &AnalysisRecord) -> Result<()> {
	sqlx::query(
		"\
UPDATE companies
SET
	status = 'completed',
	error_message = NULL,
	analysis = $2,
	score_total = $3,
	priority_tier = $4,
	recommended_action = $5,
	llm_response_raw = $6,
	llm_tokens_used = $7,
	llm_response_ms = $8,
	researched_at = $9,
	updated_at = $9
WHERE company_id = $1",
	)
	.bind(company_id)
	.bind(&record.analysis)
	.bind(record.score_total)
	.bind(record.priority_tier.as_str())
	.bind(record.recommended_action.as_str())
	.bind(record.llm_response_raw.as_str())
	.bind(record.llm_tokens_used)
	.bind(record.llm_response_ms)
	.bind(record.researched_at)
	.execute(&db.pool)
	.await?;

	Ok(())
}

pub async fn fail_company(
	db: &Db,
	company_id: Uuid,
	error_message: &str,
	now: OffsetDateTime,
) -> Result<()> {
	sqlx::query(
		"\
UPDATE companies
SET status = 'failed', error_message = $2, updated_at = $3
WHERE company_id = $1",
	)
	.bind(company_id)
	.bind(error_message)
	.bind(now)
	.execute(&db.pool)
	.await?;

	Ok(())
}
