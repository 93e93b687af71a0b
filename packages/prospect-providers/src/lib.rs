pub mod analyzer;
pub mod error;
pub mod judge;
pub mod search;

pub use error::{Error, ErrorKind, Result};

use std::time::{Duration, Instant};

use reqwest::{
	Client,
	header::{AUTHORIZATION, HeaderMap, HeaderName},
};
use serde_json::{Map, Value};

const MAX_ERROR_BODY_CHARS: usize = 512;

pub fn auth_headers(api_key: &str, default_headers: &Map<String, Value>) -> Result<HeaderMap> {
	let mut headers = HeaderMap::new();

	headers.insert(AUTHORIZATION, format!("Bearer {api_key}").parse()?);

	for (key, value) in default_headers {
		let Some(raw) = value.as_str() else {
			return Err(Error::InvalidConfig {
				message: "Default header values must be strings.".to_string(),
			});
		};

		headers.insert(HeaderName::from_bytes(key.as_bytes())?, raw.parse()?);
	}

	Ok(headers)
}

/// Posts a JSON body and returns the decoded JSON response with the request latency.
///
/// Non-success statuses become [`Error::Status`] carrying a bounded excerpt of the body so the
/// caller can classify them through [`Error::kind`].
pub(crate) async fn post_json(
	timeout_ms: u64,
	url: &str,
	headers: HeaderMap,
	body: &Value,
) -> Result<(Value, i64)> {
	let client = Client::builder().timeout(Duration::from_millis(timeout_ms)).build()?;
	let started = Instant::now();
	let res = client.post(url).headers(headers).json(body).send().await?;
	let status = res.status();

	if !status.is_success() {
		let text = res.text().await.unwrap_or_default();

		return Err(Error::Status {
			status: status.as_u16(),
			body: text.chars().take(MAX_ERROR_BODY_CHARS).collect(),
		});
	}

	let json: Value = res.json().await?;
	let elapsed_ms = i64::try_from(started.elapsed().as_millis()).unwrap_or(i64::MAX);

	Ok((json, elapsed_ms))
}

/// Content of the first choice of an OpenAI-compatible chat completion.
pub(crate) fn chat_content(json: &Value) -> Result<&str> {
	json.get("choices")
		.and_then(|v| v.as_array())
		.and_then(|arr| arr.first())
		.and_then(|choice| choice.get("message"))
		.and_then(|msg| msg.get("content"))
		.and_then(|c| c.as_str())
		.ok_or_else(|| Error::InvalidResponse {
			message: "Chat completion is missing choice content.".to_string(),
		})
}

/// Parses a JSON object from model output, tolerating code fences and surrounding prose.
pub(crate) fn extract_json_object(text: &str) -> Result<Value> {
	let trimmed = text.trim();

	if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(trimmed) {
		return Ok(value);
	}

	let start = trimmed.find('{');
	let end = trimmed.rfind('}');

	if let (Some(start), Some(end)) = (start, end)
		&& start < end
		&& let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(&trimmed[start..=end])
	{
		return Ok(value);
	}

	Err(Error::InvalidResponse { message: "Model output does not contain a JSON object.".to_string() })
}

pub(crate) fn total_tokens(json: &Value) -> Option<i64> {
	json.get("usage").and_then(|usage| usage.get("total_tokens")).and_then(Value::as_i64)
}
