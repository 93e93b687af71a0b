use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Result;
use prospect_config::LlmProviderConfig;

const SYSTEM_PROMPT: &str = "You review web search results gathered about a company. Decide whether the \
results describe the named company (not a namesake) and contain enough concrete facts to research it. \
Respond with a JSON object: {\"is_valid\": bool, \"confidence\": number between 0 and 1, \
\"message\": string, \"issues\": [string]}.";

/// Verdict on fetched evidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Judgement {
	pub is_valid: bool,
	/// In the range 0.0-1.0.
	pub confidence: f32,
	pub message: String,
	pub issues: Vec<String>,
}

pub async fn validate(cfg: &LlmProviderConfig, company: &str, evidence: &str) -> Result<Judgement> {
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({
		"model": cfg.model,
		"temperature": cfg.temperature,
		"response_format": { "type": "json_object" },
		"messages": build_messages(company, evidence),
	});
	let (json, _) = crate::post_json(
		cfg.timeout_ms,
		&url,
		crate::auth_headers(&cfg.api_key, &cfg.default_headers)?,
		&body,
	)
	.await?;

	parse_judgement(&json)
}

fn build_messages(company: &str, evidence: &str) -> Vec<Value> {
	vec![
		serde_json::json!({ "role": "system", "content": SYSTEM_PROMPT }),
		serde_json::json!({
			"role": "user",
			"content": format!("Company: {company}\n\n{evidence}"),
		}),
	]
}

fn parse_judgement(json: &Value) -> Result<Judgement> {
	let content = crate::chat_content(json)?;
	let object = crate::extract_json_object(content)?;
	let is_valid = object.get("is_valid").and_then(Value::as_bool).unwrap_or(false);
	let confidence = object
		.get("confidence")
		.and_then(Value::as_f64)
		.filter(|c| c.is_finite())
		.map(|c| c.clamp(0.0, 1.0) as f32)
		.unwrap_or(0.0);
	let message = object.get("message").and_then(Value::as_str).unwrap_or_default().to_string();
	let issues = object
		.get("issues")
		.and_then(Value::as_array)
		.map(|items| items.iter().filter_map(Value::as_str).map(str::to_string).collect())
		.unwrap_or_default();

	Ok(Judgement { is_valid, confidence, message, issues })
}
