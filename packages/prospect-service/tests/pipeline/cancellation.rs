use std::{collections::HashMap, time::Duration};

use uuid::Uuid;

use prospect_domain::status::JobStatus;

use super::{Harness, StubAnalyzer, StubJudge, StubSearch};

const NAMES: [&str; 5] = ["Acme", "Borealis", "Cinder", "Dynamo", "Ember"];

fn two_per_window() -> Harness {
	let mut cfg = super::test_config();

	cfg.research.phase1_window_size = 2;

	Harness::new(cfg, StubSearch::default(), StubJudge::default(), StubAnalyzer::default())
}

#[tokio::test(start_paused = true)]
async fn cancelling_during_evidence_phase_skips_analysis() {
	let harness = two_per_window();
	let job_id = harness.submit(&NAMES).await;

	harness.cancel_after_touches(job_id, 1);

	let status = harness.service.run(job_id).await.expect("Job must run.");
	let job = harness.store.job(job_id);
	let rows = harness.store.companies(job_id);

	assert_eq!(status, JobStatus::Cancelled);
	assert_eq!(super::status_of(&job), JobStatus::Cancelled);
	assert_eq!(harness.analyzer.calls.total(), 0);
	assert_eq!(harness.search.calls.total(), 2);
	assert_eq!((job.completed_companies, job.failed_companies), (0, 0));
	assert!(harness.store.commits().is_empty());

	for row in &rows[..2] {
		assert!(row.verified_snapshot().is_some());
	}
	for row in &rows[2..] {
		assert_eq!(row.status, "pending");
		assert!(!row.cached);
	}

	assert!(!harness.service.registry.contains(job_id));
}

#[tokio::test(start_paused = true)]
async fn evidence_failures_are_recorded_before_analysis_is_cancelled() {
	let mut cfg = super::test_config();

	cfg.research.phase2_window_size = 1;

	let search =
		StubSearch { failing: HashMap::from([("Ember".to_string(), 401)]), ..Default::default() };
	let harness = Harness::new(cfg, search, StubJudge::default(), StubAnalyzer::default());
	let job_id = harness.submit(&NAMES).await;

	harness.cancel_on_first_analysis(job_id);

	let status = harness.service.run(job_id).await.expect("Job must run.");
	let rows = harness.store.companies(job_id);
	let ember = harness.store.company(job_id, "Ember");

	assert_eq!(status, JobStatus::Cancelled);
	assert_eq!(harness.analyzer.calls.total(), 1);
	assert_eq!(harness.store.commits(), vec![(1, 0)]);
	assert_eq!(rows[0].status, "completed");
	assert_eq!(ember.status, "failed");
	assert!(ember.error_message.as_deref().is_some_and(|message| message.contains("401")));

	for row in &rows[1..4] {
		assert_eq!(row.status, "researching");
		assert!(row.verified_snapshot().is_some());
	}
}

#[tokio::test(start_paused = true)]
async fn resubmitted_work_reuses_verified_evidence() {
	let harness = two_per_window();
	let job_id = harness.submit(&NAMES).await;

	harness.cancel_after_touches(job_id, 1);
	harness.service.run(job_id).await.expect("Job must run.");

	let retry_id = harness.service.resubmit(job_id, None).await.expect("Resubmission must succeed.");

	assert_ne!(retry_id, job_id);
	assert_eq!(harness.store.job(retry_id).total_companies, 5);

	let status = harness.service.run(retry_id).await.expect("Resubmitted job must run.");
	let job = harness.store.job(retry_id);

	assert_eq!(status, JobStatus::Completed);
	assert_eq!(job.completed_companies, 5);
	assert_eq!(harness.search.calls.total(), 5);
	assert_eq!(harness.search.calls.count("Acme"), 1);
	assert_eq!(harness.analyzer.calls.total(), 5);
	// The source job keeps its terminal status.
	assert_eq!(super::status_of(&harness.store.job(job_id)), JobStatus::Cancelled);
}

#[tokio::test(start_paused = true)]
async fn cancel_without_a_running_task_is_a_no_op() {
	let harness = Harness::with_defaults();
	let job_id = harness.submit(&["Acme"]).await;

	assert!(!harness.service.cancel(Uuid::new_v4()));
	assert!(!harness.service.cancel(job_id));

	harness.service.run(job_id).await.expect("Job must run.");

	assert!(!harness.service.cancel(job_id));
	assert_eq!(super::status_of(&harness.store.job(job_id)), JobStatus::Completed);
}

#[tokio::test(start_paused = true)]
async fn shutdown_stops_background_jobs() {
	let mut cfg = super::test_config();

	cfg.research.phase1_window_size = 1;

	let search = StubSearch { delay: Some(Duration::from_secs(1)), ..Default::default() };
	let harness = Harness::new(cfg, search, StubJudge::default(), StubAnalyzer::default());
	let job_id = harness.submit(&["Acme", "Borealis", "Cinder", "Dynamo"]).await;

	harness.service.start(job_id).await.expect("Job must start.");
	tokio::time::sleep(Duration::from_millis(1_500)).await;
	harness.service.shutdown().await;

	assert_eq!(super::status_of(&harness.store.job(job_id)), JobStatus::Cancelled);
	assert!(harness.search.calls.total() < 4);
	assert_eq!(harness.analyzer.calls.total(), 0);
	assert!(harness.service.registry.is_empty());
}
