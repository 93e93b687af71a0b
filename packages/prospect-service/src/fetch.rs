//! Fetch and validate evidence for one company, consulting the row's cache first.

use std::time::Duration;

use time::OffsetDateTime;

use crate::{ResearchService, Result, retry};
use prospect_domain::{evidence, sanitize};
use prospect_providers::judge::Judgement;
use prospect_storage::models::{CacheUpdate, Company, FetchAttempt};

pub const VALIDATION_DISABLED_MESSAGE: &str = "Validation skipped (disabled)";
pub const JUDGE_UNAVAILABLE_CONFIDENCE: f32 = 0.5;

const MAX_VALIDATION_BACKOFF_EXPONENT: u32 = 10;

#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
	/// Verified evidence served from the row's cache without external calls.
	Cached(String),
	/// Freshly fetched evidence that passed validation.
	Fetched(String),
	Failed(String),
}
impl FetchOutcome {
	pub fn evidence(&self) -> Option<&str> {
		match self {
			Self::Cached(text) | Self::Fetched(text) => Some(text),
			Self::Failed(_) => None,
		}
	}

	pub fn error(&self) -> Option<&str> {
		match self {
			Self::Failed(message) => Some(message),
			_ => None,
		}
	}
}

enum Verdict {
	Accepted(String),
	Rejected(String),
}

/// Produces validated evidence text for `company` or the reason none could be produced.
///
/// Errors are storage failures only; provider failures are reported as [`FetchOutcome::Failed`].
pub async fn fetch_and_validate(service: &ResearchService, company: &Company) -> Result<FetchOutcome> {
	let research = &service.cfg.research;

	if research.cache_enabled
		&& let Some(snapshot) = company.verified_snapshot()
	{
		tracing::info!(
			company = %company.name,
			cached_at = ?company.cached_at,
			"Using cached evidence."
		);

		return Ok(FetchOutcome::Cached(snapshot.to_string()));
	}

	let store = service.store.as_ref();
	let policy = retry::RetryPolicy::from_config(&service.cfg.retry);
	let attempts = if research.validation_enabled { research.max_validation_retries.max(1) } else { 1 };

	store.mark_researching(company.company_id, OffsetDateTime::now_utc()).await?;

	for attempt in 0..attempts {
		let is_last = attempt + 1 == attempts;

		tracing::info!(
			company = %company.name,
			attempt = attempt + 1,
			attempts,
			"Fetching evidence."
		);

		let fetched = retry::retry(&policy, "search", || {
			service.providers.evidence.fetch(&service.cfg.providers.search, &company.name)
		})
		.await;
		let response = match fetched {
			Ok(response) => response,
			Err(err) => {
				let message = format!("Search failed: {}", sanitize::sanitize_error(&err.to_string()));

				tracing::warn!(company = %company.name, error = %message, "Evidence fetch failed.");

				if is_last {
					return Ok(FetchOutcome::Failed(message));
				}

				validation_backoff(service, attempt).await;

				continue;
			},
		};
		let usage = FetchAttempt {
			raw: response.raw,
			credits_used: response.credits_used,
			response_ms: response.response_ms,
		};

		store.record_fetch_attempt(company.company_id, &usage, OffsetDateTime::now_utc()).await?;

		let text = evidence::format_evidence(&company.name, &response.evidence);
		let verdict = if research.validation_enabled {
			judge(service, company, &text).await
		} else {
			Verdict::Accepted(VALIDATION_DISABLED_MESSAGE.to_string())
		};

		match verdict {
			Verdict::Accepted(message) => {
				accept(service, company, &text, message).await?;

				return Ok(FetchOutcome::Fetched(text));
			},
			Verdict::Rejected(message) => {
				if is_last {
					store
						.record_validation(
							company.company_id,
							&message,
							false,
							OffsetDateTime::now_utc(),
						)
						.await?;

					return Ok(FetchOutcome::Failed(format!(
						"Data validation failed after {attempts} attempts: {message}"
					)));
				}

				validation_backoff(service, attempt).await;
			},
		}
	}

	Ok(FetchOutcome::Failed("Evidence fetch made no attempts.".to_string()))
}

async fn judge(service: &ResearchService, company: &Company, text: &str) -> Verdict {
	let threshold = service.cfg.research.validation_threshold;
	let judgement = match service
		.providers
		.judge
		.validate(&service.cfg.providers.judge, &company.name, text)
		.await
	{
		Ok(judgement) => judgement,
		Err(err) => {
			tracing::warn!(
				company = %company.name,
				error = %sanitize::sanitize_error(&err.to_string()),
				"Evidence judge unavailable. Accepting evidence."
			);

			return Verdict::Accepted(format!(
				"Validation unavailable; accepted with confidence {JUDGE_UNAVAILABLE_CONFIDENCE:.2}."
			));
		},
	};

	if passes(&judgement, threshold) {
		tracing::info!(
			company = %company.name,
			confidence = judgement.confidence,
			"Evidence accepted."
		);

		Verdict::Accepted(judgement.message)
	} else {
		tracing::warn!(
			company = %company.name,
			confidence = judgement.confidence,
			issues = %judgement.issues.join(", "),
			"Evidence rejected."
		);

		Verdict::Rejected(judgement.message)
	}
}

fn passes(judgement: &Judgement, threshold: f32) -> bool {
	judgement.is_valid && judgement.confidence >= threshold
}

async fn accept(
	service: &ResearchService,
	company: &Company,
	text: &str,
	message: String,
) -> Result<()> {
	let now = OffsetDateTime::now_utc();

	if service.cfg.research.cache_enabled {
		let update =
			CacheUpdate { snapshot: text.to_string(), validation_message: message, cached_at: now };

		service.store.store_cache(company.company_id, &update).await
	} else {
		service.store.record_validation(company.company_id, &message, true, now).await
	}
}

async fn validation_backoff(service: &ResearchService, attempt: u32) {
	let base = service.cfg.research.validation_backoff_base_ms;
	let delay = base.saturating_mul(1 << attempt.min(MAX_VALIDATION_BACKOFF_EXPONENT));

	tokio::time::sleep(Duration::from_millis(delay)).await;
}
