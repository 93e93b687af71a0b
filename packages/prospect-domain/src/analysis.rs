//! Structured analysis results.
//!
//! The analyzer's rubric is opaque to the pipeline. Every field is optional on the wire; parsing
//! fills conservative defaults so a partially formed response still yields a usable result, and
//! the full provider payload is kept in [`AnalysisResult::raw`].

use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::status::UnknownStatus;

pub const UNKNOWN_TIER: &str = "UNKNOWN";
pub const TOTAL_KEY: &str = "total";
/// Upper bound for a single score component.
pub const MAX_COMPONENT_SCORE: i64 = 100;

/// Legacy score names and the component they map onto.
const SCORE_ALIASES: [(&str, &str); 1] = [("timing_urgency", "growth_signals")];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PriorityTier {
	Hot,
	Warm,
	Watch,
	Cold,
}
impl PriorityTier {
	pub fn from_total(total: i64) -> Self {
		match total {
			75.. => Self::Hot,
			55..=74 => Self::Warm,
			35..=54 => Self::Watch,
			_ => Self::Cold,
		}
	}

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Hot => "HOT",
			Self::Warm => "WARM",
			Self::Watch => "WATCH",
			Self::Cold => "COLD",
		}
	}

	pub fn default_action(self) -> &'static str {
		match self {
			Self::Hot => "High-priority outreach - strong infrastructure needs with budget",
			Self::Warm => "Worth qualifying - potential needs, investigate further",
			Self::Watch => "Monitor for future - may develop needs as they grow",
			Self::Cold => "Low priority - minimal infrastructure needs",
		}
	}
}
impl fmt::Display for PriorityTier {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}
impl FromStr for PriorityTier {
	type Err = UnknownStatus;

	fn from_str(raw: &str) -> Result<Self, Self::Err> {
		match raw.trim().to_ascii_uppercase().as_str() {
			"HOT" => Ok(Self::Hot),
			"WARM" => Ok(Self::Warm),
			"WATCH" => Ok(Self::Watch),
			"COLD" => Ok(Self::Cold),
			_ => Err(UnknownStatus(raw.to_string())),
		}
	}
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanyProfile {
	pub description: Option<String>,
	pub employee_count: Option<String>,
	pub total_funding: Option<String>,
	pub funding_millions: Option<f64>,
	pub last_round: Option<String>,
	pub investors: Vec<String>,
	pub headquarters: Option<String>,
	pub founded_year: Option<i32>,
	pub industry: Option<String>,
	pub business_model: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UseCaseAssessment {
	pub tier: String,
	pub label: Option<String>,
	pub reasoning: Option<String>,
	pub signals_positive: Vec<String>,
	pub signals_negative: Vec<String>,
}
impl Default for UseCaseAssessment {
	fn default() -> Self {
		Self {
			tier: UNKNOWN_TIER.to_string(),
			label: None,
			reasoning: None,
			signals_positive: Vec::new(),
			signals_negative: Vec::new(),
		}
	}
}

/// Score components keyed by rubric name. `total` always equals the sum of `components`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scores {
	pub components: BTreeMap<String, i64>,
	pub total: i64,
}
impl Scores {
	pub fn from_components(components: BTreeMap<String, i64>) -> Self {
		let total = sum_components(&components);

		Self { components, total }
	}

	pub fn is_consistent(&self) -> bool {
		sum_components(&self.components) == self.total
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
	pub profile: CompanyProfile,
	pub use_case: UseCaseAssessment,
	pub scores: Scores,
	pub priority_tier: PriorityTier,
	pub recommended_action: String,
	/// Which fields were missing and defaulted during parsing.
	pub defaulted: Vec<String>,
	pub raw: Value,
}
impl AnalysisResult {
	/// Parses an analyzer payload, injecting defaults for anything missing.
	///
	/// Sub-scores are recomputed into `total`; a declared total that disagrees with the
	/// components is discarded. The priority tier always follows the recomputed total.
	pub fn from_provider_json(raw: Value) -> Self {
		let empty = Map::new();
		let root = raw.as_object().unwrap_or(&empty);
		let mut defaulted = Vec::new();
		let profile = match root.get("research").and_then(Value::as_object) {
			Some(research) => parse_profile(research),
			None => {
				defaulted.push("research".to_string());

				CompanyProfile::default()
			},
		};
		let use_case = match root
			.get("classification")
			.or_else(|| root.get("gpu_analysis"))
			.and_then(Value::as_object)
		{
			Some(section) => parse_use_case(section),
			None => {
				defaulted.push("classification".to_string());

				UseCaseAssessment::default()
			},
		};
		let scores = match root.get("scores").and_then(Value::as_object) {
			Some(section) => parse_scores(section),
			None => {
				defaulted.push("scores".to_string());

				Scores::default()
			},
		};
		let priority_tier = PriorityTier::from_total(scores.total);
		let recommended_action = match string_field(root, "recommended_action") {
			Some(action) => action,
			None => {
				defaulted.push("recommended_action".to_string());

				priority_tier.default_action().to_string()
			},
		};

		Self { profile, use_case, scores, priority_tier, recommended_action, defaulted, raw }
	}
}

fn parse_profile(section: &Map<String, Value>) -> CompanyProfile {
	CompanyProfile {
		description: string_field(section, "description"),
		employee_count: section.get("employee_count").and_then(scalar_to_string),
		total_funding: string_field(section, "total_funding"),
		funding_millions: section.get("funding_millions").and_then(Value::as_f64),
		last_round: string_field(section, "last_round"),
		investors: string_list(section, "investors"),
		headquarters: string_field(section, "headquarters"),
		founded_year: section
			.get("founded_year")
			.and_then(Value::as_i64)
			.and_then(|year| i32::try_from(year).ok()),
		industry: string_field(section, "industry"),
		business_model: string_field(section, "business_model"),
	}
}

fn parse_use_case(section: &Map<String, Value>) -> UseCaseAssessment {
	let tier = string_field(section, "tier")
		.or_else(|| string_field(section, "use_case_tier"))
		.map(|tier| tier.to_ascii_uppercase())
		.unwrap_or_else(|| UNKNOWN_TIER.to_string());

	UseCaseAssessment {
		tier,
		label: string_field(section, "label").or_else(|| string_field(section, "use_case_label")),
		reasoning: string_field(section, "reasoning"),
		signals_positive: string_list(section, "signals_positive"),
		signals_negative: string_list(section, "signals_negative"),
	}
}

fn parse_scores(section: &Map<String, Value>) -> Scores {
	let mut components = BTreeMap::new();

	for (key, value) in section {
		if key == TOTAL_KEY {
			continue;
		}

		let Some(score) = score_value(value) else {
			continue;
		};
		let key = SCORE_ALIASES
			.iter()
			.find(|(legacy, canonical)| key == legacy && !section.contains_key(*canonical))
			.map(|(_, canonical)| (*canonical).to_string())
			.unwrap_or_else(|| key.clone());

		components.insert(key, score);
	}

	Scores::from_components(components)
}

fn sum_components(components: &BTreeMap<String, i64>) -> i64 {
	components.values().fold(0_i64, |total, score| total.saturating_add(*score))
}

fn score_value(value: &Value) -> Option<i64> {
	if let Some(int) = value.as_i64() {
		return Some(int.clamp(0, MAX_COMPONENT_SCORE));
	}

	value
		.as_f64()
		.filter(|float| float.is_finite())
		.map(|float| float.round().clamp(0.0, MAX_COMPONENT_SCORE as f64) as i64)
}

fn string_field(section: &Map<String, Value>, key: &str) -> Option<String> {
	section
		.get(key)
		.and_then(Value::as_str)
		.map(str::trim)
		.filter(|value| !value.is_empty())
		.map(str::to_string)
}

fn scalar_to_string(value: &Value) -> Option<String> {
	match value {
		Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
		Value::Number(number) => Some(number.to_string()),
		_ => None,
	}
}

fn string_list(section: &Map<String, Value>, key: &str) -> Vec<String> {
	section
		.get(key)
		.and_then(Value::as_array)
		.map(|items| {
			items
				.iter()
				.filter_map(Value::as_str)
				.map(str::trim)
				.filter(|item| !item.is_empty())
				.map(str::to_string)
				.collect()
		})
		.unwrap_or_default()
}
