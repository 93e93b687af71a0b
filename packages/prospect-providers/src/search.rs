use serde_json::Value;

use crate::{Error, Result};
use prospect_config::SearchProviderConfig;
use prospect_domain::evidence::{Evidence, EvidenceSource};

#[derive(Debug, Clone)]
pub struct SearchResponse {
	pub evidence: Evidence,
	pub credits_used: f64,
	pub response_ms: i64,
	pub raw: Value,
}

pub fn build_query(company: &str) -> String {
	format!("{company} AI startup company funding employees training models infrastructure")
}

pub async fn fetch(cfg: &SearchProviderConfig, company: &str) -> Result<SearchResponse> {
	let query = build_query(company);
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({
		"query": query,
		"search_depth": cfg.search_depth,
		"max_results": cfg.max_results,
		"include_answer": true,
		"include_domains": cfg.include_domains,
	});
	let (json, response_ms) = crate::post_json(
		cfg.timeout_ms,
		&url,
		crate::auth_headers(&cfg.api_key, &cfg.default_headers)?,
		&body,
	)
	.await?;

	parse_search_response(query, json, cfg.credits_per_request, response_ms)
}

fn parse_search_response(
	query: String,
	json: Value,
	default_credits: f64,
	measured_ms: i64,
) -> Result<SearchResponse> {
	let results = json.get("results").and_then(|v| v.as_array()).ok_or_else(|| {
		Error::InvalidResponse { message: "Search response is missing results array.".to_string() }
	})?;
	let sources = results
		.iter()
		.map(|item| EvidenceSource {
			title: item.get("title").and_then(Value::as_str).map(str::to_string),
			url: item.get("url").and_then(Value::as_str).map(str::to_string),
			content: item.get("content").and_then(Value::as_str).map(str::to_string),
		})
		.collect();
	let answer = json.get("answer").and_then(Value::as_str).map(str::to_string);
	let credits_used = json
		.get("usage")
		.and_then(|usage| usage.get("credits"))
		.and_then(Value::as_f64)
		.unwrap_or(default_credits);
	// Provider-reported latency is in seconds and excludes transport time.
	let response_ms = json
		.get("response_time")
		.and_then(|v| v.as_f64().or_else(|| v.as_str().and_then(|s| s.parse().ok())))
		.filter(|secs| secs.is_finite() && *secs >= 0.0)
		.map(|secs| (secs * 1_000.0).round() as i64)
		.unwrap_or(measured_ms);

	Ok(SearchResponse {
		evidence: Evidence { query, answer, sources },
		credits_used,
		response_ms,
		raw: json,
	})
}
