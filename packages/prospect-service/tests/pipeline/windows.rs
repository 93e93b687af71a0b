use std::collections::{HashMap, HashSet};

use prospect_domain::status::JobStatus;

use super::{Harness, StubAnalyzer, StubJudge, StubSearch};

const NAMES: [&str; 5] = ["Acme", "Borealis", "Cinder", "Dynamo", "Ember"];

#[tokio::test(start_paused = true)]
async fn aggregates_advance_once_per_analysis_window() {
	let mut cfg = super::test_config();

	cfg.research.phase2_window_size = 2;

	let analyzer =
		StubAnalyzer { failing: HashMap::from([("Cinder".to_string(), 401)]), ..Default::default() };
	let harness = Harness::new(cfg, StubSearch::default(), StubJudge::default(), analyzer);
	let job_id = harness.submit(&NAMES).await;

	harness.service.run(job_id).await.expect("Job must run.");

	let commits = harness.store.commits();

	assert_eq!(commits, vec![(2, 0), (3, 1), (4, 1)]);

	for pair in commits.windows(2) {
		assert!(pair[1].0 + pair[1].1 >= pair[0].0 + pair[0].1);
	}

	let progress = harness.service.get_progress(job_id).await.expect("Progress must load.");

	assert_eq!(progress.status, JobStatus::Completed);
	assert_eq!((progress.completed, progress.failed, progress.pending), (4, 1, 0));
	assert_eq!(progress.percent, 100.0);
}

#[tokio::test(start_paused = true)]
async fn evidence_windows_heartbeat_the_job() {
	let mut cfg = super::test_config();

	cfg.research.phase1_window_size = 2;

	let harness =
		Harness::new(cfg, StubSearch::default(), StubJudge::default(), StubAnalyzer::default());
	let job_id = harness.submit(&NAMES).await;
	let touches = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
	let seen = touches.clone();

	harness.store.on_touch(move |count| seen.store(count, std::sync::atomic::Ordering::SeqCst));
	harness.service.run(job_id).await.expect("Job must run.");

	assert_eq!(touches.load(std::sync::atomic::Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn panicking_workers_fail_only_their_company() {
	let search = StubSearch { panicking: HashSet::from(["Borealis".to_string()]), ..Default::default() };
	let analyzer =
		StubAnalyzer { panicking: HashSet::from(["Dynamo".to_string()]), ..Default::default() };
	let harness = Harness::new(super::test_config(), search, StubJudge::default(), analyzer);
	let job_id = harness.submit(&NAMES).await;
	let status = harness.service.run(job_id).await.expect("Job must run.");
	let job = harness.store.job(job_id);
	let rows = super::company_names(&harness.store.companies(job_id));

	assert_eq!(status, JobStatus::Completed);
	assert_eq!((job.completed_companies, job.failed_companies), (3, 2));
	assert_eq!(
		rows,
		vec![
			("Acme".to_string(), "completed".to_string()),
			("Borealis".to_string(), "failed".to_string()),
			("Cinder".to_string(), "completed".to_string()),
			("Dynamo".to_string(), "failed".to_string()),
			("Ember".to_string(), "completed".to_string()),
		]
	);

	let crashed = harness.store.company(job_id, "Dynamo");

	assert!(
		crashed
			.error_message
			.as_deref()
			.is_some_and(|message| message.starts_with("Analysis stage panicked"))
	);
}
