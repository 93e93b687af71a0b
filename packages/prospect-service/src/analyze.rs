use crate::{
	ResearchService,
	retry::{self, RetryPolicy},
};
use prospect_domain::{analysis::AnalysisResult, evidence, sanitize};
use prospect_providers::{ErrorKind, analyzer::AnalyzerResponse};
use prospect_storage::models::Company;

#[derive(Debug, Clone)]
pub struct Analysis {
	pub result: AnalysisResult,
	pub raw_text: String,
	pub tokens_used: Option<i64>,
	pub response_ms: i64,
	/// Whether the evidence had to be shortened after a payload-too-large rejection.
	pub truncated: bool,
}

#[derive(Debug, Clone)]
pub enum AnalyzeOutcome {
	Analyzed(Box<Analysis>),
	Failed(String),
}

/// Runs the analyzer over validated evidence.
///
/// Rejected requests are retried. A payload-too-large rejection is answered once with evidence
/// truncated to half its length (capped at `research.max_evidence_chars`) under a reduced retry
/// budget.
pub async fn analyze(service: &ResearchService, company: &Company, evidence: &str) -> AnalyzeOutcome {
	let policy = RetryPolicy::from_config(&service.cfg.retry).allowing_rejected();

	match call(service, &policy, company, evidence).await {
		Ok(response) => finish(company, response, false),
		Err(err) if err.kind() == ErrorKind::TooLarge => {
			let budget = truncation_budget(evidence, service.cfg.research.max_evidence_chars);
			let shortened = evidence::truncate_evidence(evidence, budget);
			let reduced = policy.with_max_retries(policy.max_retries / 2);

			tracing::warn!(
				company = %company.name,
				original_chars = evidence.chars().count(),
				budget,
				"Analyzer payload too large. Retrying with truncated evidence."
			);

			match call(service, &reduced, company, &shortened).await {
				Ok(response) => finish(company, response, true),
				Err(err) => failed(company, &err),
			}
		},
		Err(err) => failed(company, &err),
	}
}

pub fn truncation_budget(evidence: &str, max_evidence_chars: usize) -> usize {
	(evidence.chars().count() / 2).min(max_evidence_chars)
}

async fn call(
	service: &ResearchService,
	policy: &RetryPolicy,
	company: &Company,
	evidence: &str,
) -> prospect_providers::Result<AnalyzerResponse> {
	retry::retry(policy, "analyzer", || {
		service.providers.analyzer.analyze(&service.cfg.providers.analyzer, &company.name, evidence)
	})
	.await
}

fn finish(company: &Company, response: AnalyzerResponse, truncated: bool) -> AnalyzeOutcome {
	let result = AnalysisResult::from_provider_json(response.payload);

	if !result.defaulted.is_empty() {
		tracing::warn!(
			company = %company.name,
			defaulted = %result.defaulted.join(", "),
			"Analyzer response was missing fields. Defaults applied."
		);
	}

	tracing::info!(
		company = %company.name,
		score = result.scores.total,
		tier = %result.priority_tier,
		"Company analyzed."
	);

	AnalyzeOutcome::Analyzed(Box::new(Analysis {
		result,
		raw_text: response.raw_text,
		tokens_used: response.tokens_used,
		response_ms: response.response_ms,
		truncated,
	}))
}

fn failed(company: &Company, err: &prospect_providers::Error) -> AnalyzeOutcome {
	let message = format!("Analysis failed: {}", sanitize::sanitize_error(&err.to_string()));

	tracing::warn!(company = %company.name, error = %message, "Company analysis failed.");

	AnalyzeOutcome::Failed(message)
}
