pub const MAX_ERROR_CHARS: usize = 1_024;
pub const REDACTED: &str = "[REDACTED]";

const SECRET_KEYS: [&str; 6] = ["api_key", "apikey", "authorization", "password", "secret", "token"];

/// Redacts credentials from provider error text before it is persisted or logged.
///
/// Bearer tokens and `key=value` / `key:value` pairs whose key looks secret are replaced, and
/// the result is capped at [`MAX_ERROR_CHARS`] characters.
pub fn sanitize_error(text: &str) -> String {
	let mut parts = Vec::new();
	let mut redact_next = false;

	for raw in text.split_whitespace() {
		let mut word = raw.to_string();

		if redact_next {
			word = REDACTED.to_string();
			redact_next = false;
		}
		if raw.eq_ignore_ascii_case("bearer") {
			redact_next = true;
		}

		let lowered = raw.to_ascii_lowercase();

		if SECRET_KEYS.iter().any(|key| lowered.contains(key))
			&& let Some(sep) = raw.find(['=', ':']).map(|idx| &raw[idx..idx + 1])
		{
			let prefix = raw.split(sep).next().unwrap_or(raw);

			word = format!("{prefix}{sep}{REDACTED}");
		}

		parts.push(word);
	}

	let mut out = parts.join(" ");

	if out.chars().count() > MAX_ERROR_CHARS {
		out = out.chars().take(MAX_ERROR_CHARS).collect();
		out.push_str("...");
	}

	out
}
