pub mod analyze;
pub mod fetch;
pub mod orchestrator;
pub mod progress;
pub mod registry;
pub mod retry;
pub mod scheduler;
pub mod store;
pub mod submit;

mod error;

pub use error::{Error, Result};
pub use progress::JobSummary;
pub use registry::TaskRegistry;
pub use store::JobStore;
pub use submit::SubmitRequest;

use std::{future::Future, pin::Pin, sync::Arc};

use prospect_config::{Config, LlmProviderConfig, SearchProviderConfig};
use prospect_providers::{
	analyzer::{self, AnalyzerResponse},
	judge::{self, Judgement},
	search::{self, SearchResponse},
};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait EvidenceProvider
where
	Self: Send + Sync,
{
	fn fetch<'a>(
		&'a self,
		cfg: &'a SearchProviderConfig,
		company: &'a str,
	) -> BoxFuture<'a, prospect_providers::Result<SearchResponse>>;
}

pub trait QualityJudge
where
	Self: Send + Sync,
{
	fn validate<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		company: &'a str,
		evidence: &'a str,
	) -> BoxFuture<'a, prospect_providers::Result<Judgement>>;
}

pub trait Analyzer
where
	Self: Send + Sync,
{
	fn analyze<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		company: &'a str,
		evidence: &'a str,
	) -> BoxFuture<'a, prospect_providers::Result<AnalyzerResponse>>;
}

struct HttpEvidenceProvider;
impl EvidenceProvider for HttpEvidenceProvider {
	fn fetch<'a>(
		&'a self,
		cfg: &'a SearchProviderConfig,
		company: &'a str,
	) -> BoxFuture<'a, prospect_providers::Result<SearchResponse>> {
		Box::pin(search::fetch(cfg, company))
	}
}

struct HttpQualityJudge;
impl QualityJudge for HttpQualityJudge {
	fn validate<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		company: &'a str,
		evidence: &'a str,
	) -> BoxFuture<'a, prospect_providers::Result<Judgement>> {
		Box::pin(judge::validate(cfg, company, evidence))
	}
}

struct HttpAnalyzer;
impl Analyzer for HttpAnalyzer {
	fn analyze<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		company: &'a str,
		evidence: &'a str,
	) -> BoxFuture<'a, prospect_providers::Result<AnalyzerResponse>> {
		Box::pin(analyzer::analyze(cfg, company, evidence))
	}
}

#[derive(Clone)]
pub struct Providers {
	pub evidence: Arc<dyn EvidenceProvider>,
	pub judge: Arc<dyn QualityJudge>,
	pub analyzer: Arc<dyn Analyzer>,
}
impl Providers {
	pub fn new(
		evidence: Arc<dyn EvidenceProvider>,
		judge: Arc<dyn QualityJudge>,
		analyzer: Arc<dyn Analyzer>,
	) -> Self {
		Self { evidence, judge, analyzer }
	}
}
impl Default for Providers {
	fn default() -> Self {
		Self {
			evidence: Arc::new(HttpEvidenceProvider),
			judge: Arc::new(HttpQualityJudge),
			analyzer: Arc::new(HttpAnalyzer),
		}
	}
}

/// Owns the research pipeline for one process.
///
/// Shared by `Arc`: job tasks hold a clone while they run, and the [`TaskRegistry`] maps running
/// jobs to their cancellation tokens.
pub struct ResearchService {
	pub cfg: Config,
	pub store: Arc<dyn JobStore>,
	pub providers: Providers,
	pub registry: TaskRegistry,
}
impl ResearchService {
	pub fn new(cfg: Config, store: Arc<dyn JobStore>, providers: Providers) -> Self {
		Self { cfg, store, providers, registry: TaskRegistry::default() }
	}
}
