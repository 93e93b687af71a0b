use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use prospect_domain::status::{CompanyStatus, JobStatus};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ResearchJob {
	pub job_id: Uuid,
	pub name: Option<String>,
	pub submitted_by: Option<String>,
	pub status: String,
	pub total_companies: i32,
	pub completed_companies: i32,
	pub failed_companies: i32,
	pub total_search_credits: f64,
	pub total_cost_usd: f64,
	pub error_message: Option<String>,
	pub is_stalled: bool,
	pub created_at: OffsetDateTime,
	pub started_at: Option<OffsetDateTime>,
	pub completed_at: Option<OffsetDateTime>,
	pub last_activity_at: Option<OffsetDateTime>,
}
impl ResearchJob {
	pub fn status(&self) -> crate::Result<JobStatus> {
		Ok(self.status.parse()?)
	}
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Company {
	pub company_id: Uuid,
	pub job_id: Uuid,
	pub position: i32,
	pub name: String,
	pub status: String,
	pub error_message: Option<String>,
	pub search_results_raw: Option<Value>,
	pub search_credits_used: Option<f64>,
	pub search_response_ms: Option<i64>,
	pub cached: bool,
	pub verified: bool,
	pub cached_at: Option<OffsetDateTime>,
	pub formatted_snapshot: Option<String>,
	pub validation_message: Option<String>,
	pub analysis: Option<Value>,
	pub score_total: Option<i32>,
	pub priority_tier: Option<String>,
	pub recommended_action: Option<String>,
	pub llm_response_raw: Option<String>,
	pub llm_tokens_used: Option<i64>,
	pub llm_response_ms: Option<i64>,
	pub researched_at: Option<OffsetDateTime>,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}
impl Company {
	pub fn status(&self) -> crate::Result<CompanyStatus> {
		Ok(self.status.parse()?)
	}

	/// The stored snapshot, when the row holds verified evidence.
	pub fn verified_snapshot(&self) -> Option<&str> {
		if !(self.cached && self.verified) {
			return None;
		}

		self.formatted_snapshot.as_deref().filter(|snapshot| !snapshot.is_empty())
	}
}

/// Usage recorded for one evidence fetch.
#[derive(Debug, Clone)]
pub struct FetchAttempt {
	pub raw: Value,
	pub credits_used: f64,
	pub response_ms: i64,
}

/// Verified evidence written to the row's cache fields.
#[derive(Debug, Clone)]
pub struct CacheUpdate {
	pub snapshot: String,
	pub validation_message: String,
	pub cached_at: OffsetDateTime,
}

/// Analysis outputs promoted onto the company row.
#[derive(Debug, Clone)]
pub struct AnalysisRecord {
	pub analysis: Value,
	pub score_total: i32,
	pub priority_tier: String,
	pub recommended_action: String,
	pub llm_response_raw: String,
	pub llm_tokens_used: Option<i64>,
	pub llm_response_ms: i64,
	pub researched_at: OffsetDateTime,
}

/// Job aggregate deltas produced by one completed window.
#[derive(Debug, Clone, Copy)]
pub struct WindowCommit {
	pub completed: i32,
	pub failed: i32,
	pub usd_per_credit: f64,
	pub at: OffsetDateTime,
}
