use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

pub const SOURCE_HEADING: &str = "### Source ";
pub const TRUNCATION_MARKER: &str = "\n[Evidence truncated]";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvidenceSource {
	pub title: Option<String>,
	pub url: Option<String>,
	pub content: Option<String>,
}

/// Evidence returned by a search provider for one company.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
	pub query: String,
	pub answer: Option<String>,
	pub sources: Vec<EvidenceSource>,
}

/// Renders evidence into the canonical text handed to the judge and the analyzer.
pub fn format_evidence(company: &str, evidence: &Evidence) -> String {
	let mut parts = vec![format!("# Search Results for: {company}\n")];

	if let Some(answer) = evidence.answer.as_deref().filter(|answer| !answer.trim().is_empty()) {
		parts.push(format!("## Summary\n{}\n", answer.trim()));
	}

	parts.push("## Sources\n".to_string());

	for (idx, source) in evidence.sources.iter().enumerate() {
		let title = source.title.as_deref().unwrap_or("No title");
		let url = source.url.as_deref().unwrap_or("");
		let content = source.content.as_deref().unwrap_or("No content");

		parts.push(format!("{SOURCE_HEADING}{}: {title}", idx + 1));
		parts.push(format!("URL: {url}"));
		parts.push(format!("Content: {content}\n"));
	}

	parts.join("\n")
}

/// Deterministically shortens formatted evidence to at most `max_chars` characters.
///
/// Earlier content is kept since the summary and the highest-ranked sources come first. The cut
/// lands on the last whole source section that fits; when not even the first section fits, it
/// falls back to a grapheme boundary so multi-byte text is never split.
pub fn truncate_evidence(text: &str, max_chars: usize) -> String {
	if text.chars().count() <= max_chars {
		return text.to_string();
	}

	let marker_chars = TRUNCATION_MARKER.chars().count();

	if max_chars <= marker_chars {
		return take_graphemes(text, max_chars);
	}

	let budget = max_chars - marker_chars;
	let mut section_cut = None;

	for (offset, _) in text.match_indices(SOURCE_HEADING) {
		if offset == 0 {
			continue;
		}
		if text[..offset].chars().count() > budget {
			break;
		}

		section_cut = Some(offset);
	}

	let kept = match section_cut {
		Some(offset) => text[..offset].trim_end().to_string(),
		None => take_graphemes(text, budget),
	};

	format!("{kept}{TRUNCATION_MARKER}")
}

fn take_graphemes(text: &str, max_chars: usize) -> String {
	let mut out = String::new();
	let mut count = 0;

	for grapheme in text.graphemes(true) {
		let len = grapheme.chars().count();

		if count + len > max_chars {
			break;
		}

		out.push_str(grapheme);

		count += len;
	}

	out
}
