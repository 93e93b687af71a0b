use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	#[serde(default)]
	pub research: Research,
	#[serde(default)]
	pub retry: Retry,
	#[serde(default)]
	pub cost: Cost,
	#[serde(default)]
	pub health: Health,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Service {
	pub log_level: String,
	#[serde(default = "default_poll_interval_ms")]
	pub poll_interval_ms: u64,
	/// Upper bound on jobs the worker runs at the same time.
	#[serde(default = "default_max_concurrent_jobs")]
	pub max_concurrent_jobs: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Providers {
	pub search: SearchProviderConfig,
	pub judge: LlmProviderConfig,
	pub analyzer: LlmProviderConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
	#[serde(default = "default_search_depth")]
	pub search_depth: String,
	#[serde(default = "default_max_results")]
	pub max_results: u32,
	#[serde(default)]
	pub include_domains: Vec<String>,
	/// Credits charged per request when the provider does not report usage.
	#[serde(default = "default_credits_per_request")]
	pub credits_per_request: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub temperature: f32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Research {
	pub cache_enabled: bool,
	pub validation_enabled: bool,
	/// Minimum judge confidence, in the range 0.0-1.0, for evidence to be accepted.
	pub validation_threshold: f32,
	pub max_validation_retries: u32,
	/// Base of the `2^attempt` sleep between validation attempts.
	pub validation_backoff_base_ms: u64,
	pub phase1_window_size: usize,
	pub phase2_window_size: usize,
	/// Evidence budget handed to the analyzer after a payload-too-large rejection.
	pub max_evidence_chars: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Retry {
	pub max_retries: u32,
	pub base_delay_ms: u64,
	pub max_delay_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Cost {
	pub usd_per_credit: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Health {
	pub stall_threshold_seconds: i64,
	pub sweep_interval_seconds: i64,
}

impl Default for Research {
	fn default() -> Self {
		Self {
			cache_enabled: true,
			validation_enabled: true,
			validation_threshold: 0.6,
			max_validation_retries: 2,
			validation_backoff_base_ms: 1_000,
			phase1_window_size: 100,
			phase2_window_size: 50,
			max_evidence_chars: 24_000,
		}
	}
}

impl Default for Retry {
	fn default() -> Self {
		Self { max_retries: 3, base_delay_ms: 2_000, max_delay_ms: 30_000 }
	}
}

impl Default for Cost {
	fn default() -> Self {
		Self { usd_per_credit: 0.008 }
	}
}

impl Default for Health {
	fn default() -> Self {
		Self { stall_threshold_seconds: 300, sweep_interval_seconds: 60 }
	}
}

fn default_poll_interval_ms() -> u64 {
	1_000
}

fn default_max_concurrent_jobs() -> usize {
	4
}

fn default_search_depth() -> String {
	"advanced".to_string()
}

fn default_max_results() -> u32 {
	8
}

fn default_credits_per_request() -> f64 {
	2.0
}
