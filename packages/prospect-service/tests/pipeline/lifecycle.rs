use std::sync::{Arc, atomic::Ordering};

use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use prospect_domain::status::JobStatus;
use prospect_service::{Error, JobStore, SubmitRequest};

use super::Harness;

#[tokio::test(start_paused = true)]
async fn submission_trims_names_and_rejects_empty_batches() {
	let harness = Harness::with_defaults();
	let req = SubmitRequest {
		name: Some("  ".to_string()),
		submitted_by: None,
		companies: vec!["  Acme  ".to_string(), String::new(), "Borealis".to_string()],
	};
	let job_id = harness.service.submit(req).await.expect("Submission must succeed.");
	let job = harness.store.job(job_id);
	let names: Vec<_> = harness.store.companies(job_id).into_iter().map(|c| c.name).collect();

	assert_eq!(super::status_of(&job), JobStatus::Pending);
	assert_eq!(job.total_companies, 2);
	assert_eq!(job.name, None);
	assert_eq!(names, vec!["Acme".to_string(), "Borealis".to_string()]);

	let empty = SubmitRequest { companies: vec![" ".to_string()], ..Default::default() };

	assert!(matches!(harness.service.submit(empty).await, Err(Error::InvalidRequest { .. })));
}

#[tokio::test(start_paused = true)]
async fn only_pending_jobs_can_start() {
	let harness = Harness::with_defaults();

	assert!(matches!(harness.service.start(Uuid::new_v4()).await, Err(Error::NotFound { .. })));

	let running = harness.submit(&["Acme"]).await;

	harness.store.begin_job(running, OffsetDateTime::now_utc()).await.expect("Begin must succeed.");

	assert!(matches!(harness.service.start(running).await, Err(Error::Conflict { .. })));
	assert!(matches!(harness.service.run(running).await, Err(Error::Conflict { .. })));
	assert!(!harness.service.registry.contains(running));

	let finished = harness.submit(&["Borealis"]).await;

	harness.service.run(finished).await.expect("Job must run.");

	assert!(matches!(harness.service.start(finished).await, Err(Error::Conflict { .. })));
	assert_eq!(super::status_of(&harness.store.job(finished)), JobStatus::Completed);
}

#[tokio::test(start_paused = true)]
async fn a_started_job_cannot_be_started_twice() {
	let harness = Harness::with_defaults();
	let job_id = harness.submit(&["Acme", "Borealis"]).await;

	harness.service.start(job_id).await.expect("First start must succeed.");

	assert!(matches!(harness.service.start(job_id).await, Err(Error::Conflict { .. })));

	harness.wait_until_idle(job_id).await;

	assert_eq!(super::status_of(&harness.store.job(job_id)), JobStatus::Completed);
}

#[tokio::test(start_paused = true)]
async fn start_next_claims_each_pending_job_once() {
	let harness = Harness::with_defaults();
	let first = harness.submit(&["Acme"]).await;
	let second = harness.submit(&["Borealis"]).await;
	let claimed_a = harness.service.start_next().await.expect("Claim must succeed.");
	let claimed_b = harness.service.start_next().await.expect("Claim must succeed.");

	assert!(claimed_a.is_some() && claimed_b.is_some());
	assert_ne!(claimed_a, claimed_b);
	assert_eq!(harness.service.start_next().await.expect("Claim must succeed."), None);

	harness.wait_until_idle(first).await;
	harness.wait_until_idle(second).await;

	for job_id in [first, second] {
		assert_eq!(super::status_of(&harness.store.job(job_id)), JobStatus::Completed);
	}
}

#[tokio::test(start_paused = true)]
async fn a_claim_racing_a_direct_start_still_gets_a_driver() {
	let harness = Harness::with_defaults();
	let job_id = harness.submit(&["Acme", "Borealis"]).await;
	let gate = harness.store.hold_next_begin();
	let service = Arc::clone(&harness.service);
	let direct = tokio::spawn(async move { service.start(job_id).await });

	while !harness.store.begin_parked() {
		tokio::task::yield_now().await;
	}

	let claimed = harness.service.start_next().await.expect("Claim must succeed.");

	assert_eq!(claimed, Some(job_id));

	gate.notify_one();

	let direct = direct.await.expect("Start task must not panic.");

	assert!(matches!(direct, Err(Error::Conflict { .. })));

	harness.wait_until_idle(job_id).await;

	assert_eq!(super::status_of(&harness.store.job(job_id)), JobStatus::Completed);
	assert_eq!(harness.store.job(job_id).completed_companies, 2);
}

#[tokio::test(start_paused = true)]
async fn storage_failures_fail_the_job_with_a_redacted_message() {
	let harness = Harness::with_defaults();
	let job_id = harness.submit(&["Acme"]).await;

	harness.store.fail_commits.store(true, Ordering::SeqCst);

	let status = harness.service.run(job_id).await.expect("Run must report a status.");
	let job = harness.store.job(job_id);
	let message = job.error_message.clone().unwrap_or_default();

	assert_eq!(status, JobStatus::Failed);
	assert_eq!(super::status_of(&job), JobStatus::Failed);
	assert!(job.completed_at.is_some());
	assert!(message.contains("connection reset"));
	assert!(!message.contains("hunter2"));
	assert!(!harness.service.registry.contains(job_id));
}

#[tokio::test(start_paused = true)]
async fn quiet_running_jobs_are_flagged_as_stalled() {
	let harness = Harness::with_defaults();
	let job_id = harness.submit(&["Acme"]).await;
	let long_ago = OffsetDateTime::now_utc() - Duration::hours(1);

	harness.store.begin_job(job_id, long_ago).await.expect("Begin must succeed.");

	let before = harness.service.get_progress(job_id).await.expect("Progress must load.");

	assert!(before.is_stalled);
	assert_eq!(harness.service.mark_stalled_jobs().await.expect("Sweep must succeed."), 1);
	assert_eq!(harness.service.mark_stalled_jobs().await.expect("Sweep must succeed."), 0);
	assert!(harness.store.job(job_id).is_stalled);

	harness.store.set_last_activity(job_id, OffsetDateTime::now_utc());
	harness.store.touch_job(job_id, OffsetDateTime::now_utc()).await.expect("Touch must succeed.");

	assert!(!harness.store.job(job_id).is_stalled);
}

#[tokio::test(start_paused = true)]
async fn summaries_report_progress_and_cost() {
	let harness = Harness::with_defaults();
	let job_id = harness.submit(&["Acme", "Borealis"]).await;
	let pending = harness.service.get_progress(job_id).await.expect("Progress must load.");

	assert_eq!((pending.total, pending.pending, pending.percent), (2, 2, 0.0));
	assert!(!pending.is_stalled);

	harness.service.run(job_id).await.expect("Job must run.");

	let summary = harness.service.job_summary(job_id).await.expect("Summary must load.");

	assert_eq!(summary.progress.completed, 2);
	assert_eq!(summary.total_search_credits, 2.0 * super::CREDITS_PER_SEARCH);
	assert_eq!(summary.cost_display(), "$0.032");
	assert!(summary.duration_display().is_some());
	assert!(matches!(
		harness.service.get_progress(Uuid::new_v4()).await,
		Err(Error::NotFound { .. })
	));
}

#[tokio::test(start_paused = true)]
async fn finished_jobs_can_be_deleted_but_running_ones_cannot() {
	let harness = Harness::with_defaults();
	let running = harness.submit(&["Acme"]).await;

	harness.store.begin_job(running, OffsetDateTime::now_utc()).await.expect("Begin must succeed.");

	assert!(matches!(harness.service.delete_job(running).await, Err(Error::Conflict { .. })));
	assert!(matches!(
		harness.service.delete_job(Uuid::new_v4()).await,
		Err(Error::NotFound { .. })
	));

	let finished = harness.submit(&["Borealis"]).await;

	harness.service.run(finished).await.expect("Job must run.");
	harness.service.delete_job(finished).await.expect("Delete must succeed.");

	assert!(matches!(harness.service.get_progress(finished).await, Err(Error::NotFound { .. })));
	assert!(harness.store.companies(finished).is_empty());
}

#[tokio::test(start_paused = true)]
async fn resubmission_requires_a_finished_job_with_leftovers() {
	let harness = Harness::with_defaults();
	let job_id = harness.submit(&["Acme"]).await;

	assert!(matches!(harness.service.resubmit(job_id, None).await, Err(Error::Conflict { .. })));

	harness.service.run(job_id).await.expect("Job must run.");

	assert!(matches!(
		harness.service.resubmit(job_id, Some("ops")).await,
		Err(Error::InvalidRequest { .. })
	));
}
