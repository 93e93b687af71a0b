use std::collections::HashMap;

use prospect_domain::status::JobStatus;

use super::{Harness, StubAnalyzer, StubJudge, StubSearch};

#[tokio::test(start_paused = true)]
async fn transient_search_errors_respect_the_retry_bound() {
	let search =
		StubSearch { failing: HashMap::from([("Acme".to_string(), 503)]), ..Default::default() };
	let harness =
		Harness::new(super::test_config(), search, StubJudge::default(), StubAnalyzer::default());
	let job_id = harness.submit(&["Acme"]).await;
	let status = harness.service.run(job_id).await.expect("Job must run.");
	let company = harness.store.company(job_id, "Acme");

	// Two validation attempts, each allowed `max_retries + 1` calls.
	assert_eq!(harness.search.calls.count("Acme"), 2 * 3);
	assert_eq!(harness.analyzer.calls.total(), 0);
	assert_eq!(status, JobStatus::Completed);
	assert_eq!(company.status, "failed");
	assert!(
		company.error_message.as_deref().is_some_and(|message| message.starts_with("Search failed"))
	);
}

#[tokio::test(start_paused = true)]
async fn fatal_search_errors_are_not_retried() {
	let search =
		StubSearch { failing: HashMap::from([("Acme".to_string(), 401)]), ..Default::default() };
	let harness =
		Harness::new(super::test_config(), search, StubJudge::default(), StubAnalyzer::default());
	let job_id = harness.submit(&["Acme"]).await;

	harness.service.run(job_id).await.expect("Job must run.");

	assert_eq!(harness.search.calls.count("Acme"), 2);
	assert_eq!(harness.store.job(job_id).failed_companies, 1);
}

#[tokio::test(start_paused = true)]
async fn oversized_evidence_is_truncated_once() {
	let search = StubSearch { content_chars: 600, ..Default::default() };
	let analyzer = StubAnalyzer { max_chars: Some(1_200), ..Default::default() };
	let harness = Harness::new(super::test_config(), search, StubJudge::default(), analyzer);
	let job_id = harness.submit(&["Acme"]).await;

	harness.service.run(job_id).await.expect("Job must run.");

	let seen = harness.analyzer.seen_chars();
	let company = harness.store.company(job_id, "Acme");

	assert_eq!(seen.len(), 2);
	assert!(seen[0] > 1_200);
	assert!(seen[1] <= seen[0] / 2);
	assert_eq!(company.status, "completed");
	// The cached snapshot keeps the full evidence.
	assert_eq!(company.formatted_snapshot.as_deref().map(|text| text.chars().count()), Some(seen[0]));
}

#[tokio::test(start_paused = true)]
async fn evidence_that_stays_too_large_fails_the_company() {
	let search = StubSearch { content_chars: 600, ..Default::default() };
	let analyzer = StubAnalyzer { max_chars: Some(100), ..Default::default() };
	let harness = Harness::new(super::test_config(), search, StubJudge::default(), analyzer);
	let job_id = harness.submit(&["Acme"]).await;

	harness.service.run(job_id).await.expect("Job must run.");

	let company = harness.store.company(job_id, "Acme");

	assert_eq!(harness.analyzer.calls.count("Acme"), 2);
	assert_eq!(company.status, "failed");
	assert!(
		company
			.error_message
			.as_deref()
			.is_some_and(|message| message.starts_with("Analysis failed"))
	);
	// Evidence was validated before analysis failed, so it stays reusable.
	assert!(company.verified);
}

#[tokio::test(start_paused = true)]
async fn rejected_analyzer_requests_are_retried() {
	let analyzer =
		StubAnalyzer { failing: HashMap::from([("Acme".to_string(), 422)]), ..Default::default() };
	let harness =
		Harness::new(super::test_config(), StubSearch::default(), StubJudge::default(), analyzer);
	let job_id = harness.submit(&["Acme"]).await;

	harness.service.run(job_id).await.expect("Job must run.");

	assert_eq!(harness.analyzer.calls.count("Acme"), 3);
	assert_eq!(harness.store.company(job_id, "Acme").status, "failed");
}
