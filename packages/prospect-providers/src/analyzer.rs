use serde_json::Value;

use crate::Result;
use prospect_config::LlmProviderConfig;

const SYSTEM_PROMPT: &str = "You are a research analyst qualifying companies as prospects for GPU \
infrastructure. Using only the supplied search results, respond with a JSON object containing \
\"research\" (company profile facts), \"classification\" (use case tier, label, reasoning, positive \
and negative signals), \"scores\" (integer sub-scores and their total) and \"recommended_action\".";

#[derive(Debug, Clone)]
pub struct AnalyzerResponse {
	/// Parsed JSON object produced by the model.
	pub payload: Value,
	/// Model output before parsing.
	pub raw_text: String,
	pub tokens_used: Option<i64>,
	pub response_ms: i64,
}

pub async fn analyze(
	cfg: &LlmProviderConfig,
	company: &str,
	evidence: &str,
) -> Result<AnalyzerResponse> {
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({
		"model": cfg.model,
		"temperature": cfg.temperature,
		"response_format": { "type": "json_object" },
		"messages": [
			{ "role": "system", "content": SYSTEM_PROMPT },
			{ "role": "user", "content": format!("Company: {company}\n\n{evidence}") },
		],
	});
	let (json, response_ms) = crate::post_json(
		cfg.timeout_ms,
		&url,
		crate::auth_headers(&cfg.api_key, &cfg.default_headers)?,
		&body,
	)
	.await?;

	parse_analyzer_response(&json, response_ms)
}

fn parse_analyzer_response(json: &Value, response_ms: i64) -> Result<AnalyzerResponse> {
	let raw_text = crate::chat_content(json)?.to_string();
	let payload = crate::extract_json_object(&raw_text)?;

	Ok(AnalyzerResponse { payload, raw_text, tokens_used: crate::total_tokens(json), response_ms })
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::ErrorKind;

	#[test]
	fn parses_payload_raw_text_and_usage() {
		let json = serde_json::json!({
			"choices": [{ "message": { "content": "{\"scores\": {\"total\": 40}}" } }],
			"usage": { "total_tokens": 1834 }
		});
		let parsed = parse_analyzer_response(&json, 1_200).expect("parse failed");

		assert_eq!(parsed.payload["scores"]["total"], Value::from(40));
		assert_eq!(parsed.raw_text, "{\"scores\": {\"total\": 40}}");
		assert_eq!(parsed.tokens_used, Some(1_834));
		assert_eq!(parsed.response_ms, 1_200);
	}

	#[test]
	fn missing_choices_is_a_rejection() {
		let err = parse_analyzer_response(&serde_json::json!({ "error": "overloaded" }), 0)
			.expect_err("Expected rejection.");

		assert_eq!(err.kind(), ErrorKind::Rejected);
	}
}
