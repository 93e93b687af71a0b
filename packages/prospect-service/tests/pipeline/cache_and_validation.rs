use std::collections::HashSet;

use prospect_domain::status::JobStatus;
use prospect_service::fetch::VALIDATION_DISABLED_MESSAGE;

use super::{CREDITS_PER_SEARCH, Harness, StubAnalyzer, StubJudge, StubSearch};

#[tokio::test(start_paused = true)]
async fn cached_rejected_and_fresh_companies_settle_independently() {
	let judge = StubJudge { rejecting: HashSet::from(["Borealis".to_string()]), ..Default::default() };
	let harness =
		Harness::new(super::test_config(), StubSearch::default(), judge, StubAnalyzer::default());
	let job_id = harness.submit(&["Acme", "Borealis", "Cinder"]).await;

	harness.store.seed_cache(job_id, "Acme", "# Search Results for: Acme\nSeeded evidence.");

	let status = harness.service.run(job_id).await.expect("Job must run.");
	let job = harness.store.job(job_id);

	assert_eq!(status, JobStatus::Completed);
	assert_eq!(super::status_of(&job), JobStatus::Completed);
	assert_eq!((job.completed_companies, job.failed_companies), (2, 1));
	assert!(job.completed_at.is_some());

	assert_eq!(harness.search.calls.count("Acme"), 0);
	assert_eq!(harness.judge.calls.count("Acme"), 0);
	assert_eq!(harness.search.calls.count("Borealis"), 2);
	assert_eq!(harness.judge.calls.count("Borealis"), 2);
	assert_eq!(harness.search.calls.count("Cinder"), 1);
	assert_eq!(harness.judge.calls.count("Cinder"), 1);
	assert_eq!(harness.analyzer.calls.count("Borealis"), 0);
	assert_eq!(harness.analyzer.calls.total(), 2);

	let rejected = harness.store.company(job_id, "Borealis");

	assert_eq!(rejected.status, "failed");
	assert!(!rejected.verified);
	assert!(
		rejected
			.error_message
			.as_deref()
			.is_some_and(|message| message.starts_with("Data validation failed after 2 attempts"))
	);

	let fresh = harness.store.company(job_id, "Cinder");

	assert_eq!(fresh.status, "completed");
	assert!(fresh.cached && fresh.verified);
	assert!(fresh.formatted_snapshot.as_deref().is_some_and(|text| text.contains("Cinder")));
	assert_eq!(fresh.score_total, Some(75));
	assert_eq!(fresh.priority_tier.as_deref(), Some("HOT"));
	super::assert_value_present(&fresh.analysis);
}

#[tokio::test(start_paused = true)]
async fn search_usage_accumulates_into_job_cost() {
	let judge = StubJudge { rejecting: HashSet::from(["Borealis".to_string()]), ..Default::default() };
	let harness =
		Harness::new(super::test_config(), StubSearch::default(), judge, StubAnalyzer::default());
	let job_id = harness.submit(&["Acme", "Borealis", "Cinder"]).await;

	harness.store.seed_cache(job_id, "Acme", "Seeded evidence.");
	harness.service.run(job_id).await.expect("Job must run.");

	let job = harness.store.job(job_id);
	let rejected = harness.store.company(job_id, "Borealis");

	assert_eq!(rejected.search_credits_used, Some(2.0 * CREDITS_PER_SEARCH));
	assert_eq!(job.total_search_credits, 3.0 * CREDITS_PER_SEARCH);
	assert!((job.total_cost_usd - 3.0 * CREDITS_PER_SEARCH * 0.008).abs() < 1e-9);
}

#[tokio::test(start_paused = true)]
async fn judge_outage_accepts_evidence() {
	let judge = StubJudge { unavailable: true, ..Default::default() };
	let harness =
		Harness::new(super::test_config(), StubSearch::default(), judge, StubAnalyzer::default());
	let job_id = harness.submit(&["Acme"]).await;

	harness.service.run(job_id).await.expect("Job must run.");

	let company = harness.store.company(job_id, "Acme");

	assert_eq!(company.status, "completed");
	assert_eq!(harness.search.calls.count("Acme"), 1);
	assert!(
		company
			.validation_message
			.as_deref()
			.is_some_and(|message| message.starts_with("Validation unavailable"))
	);
}

#[tokio::test(start_paused = true)]
async fn disabled_validation_skips_the_judge() {
	let mut cfg = super::test_config();

	cfg.research.validation_enabled = false;

	let judge = StubJudge { rejecting: HashSet::from(["Acme".to_string()]), ..Default::default() };
	let harness = Harness::new(cfg, StubSearch::default(), judge, StubAnalyzer::default());
	let job_id = harness.submit(&["Acme"]).await;

	harness.service.run(job_id).await.expect("Job must run.");

	let company = harness.store.company(job_id, "Acme");

	assert_eq!(harness.judge.calls.total(), 0);
	assert_eq!(company.status, "completed");
	assert_eq!(company.validation_message.as_deref(), Some(VALIDATION_DISABLED_MESSAGE));
}

#[tokio::test(start_paused = true)]
async fn disabled_cache_neither_reads_nor_writes_snapshots() {
	let mut cfg = super::test_config();

	cfg.research.cache_enabled = false;

	let harness =
		Harness::new(cfg, StubSearch::default(), StubJudge::default(), StubAnalyzer::default());
	let job_id = harness.submit(&["Acme", "Borealis"]).await;

	harness.store.seed_cache(job_id, "Acme", "Seeded evidence.");
	harness.service.run(job_id).await.expect("Job must run.");

	let fresh = harness.store.company(job_id, "Borealis");

	assert_eq!(harness.search.calls.count("Acme"), 1);
	assert!(!fresh.cached);
	assert!(fresh.formatted_snapshot.is_none());
	assert_eq!(fresh.status, "completed");
}
