use std::{sync::Arc, time::Duration as StdDuration};

use time::{Duration, OffsetDateTime};
use tokio::time as tokio_time;
use uuid::Uuid;

use crate::Result;
use prospect_service::ResearchService;

/// Runs pending jobs until Ctrl-C, then cancels the running ones and waits for them to stop.
pub async fn run_worker(service: Arc<ResearchService>) -> Result<()> {
	let poll = StdDuration::from_millis(service.cfg.service.poll_interval_ms);
	let sweep_every = Duration::seconds(service.cfg.health.sweep_interval_seconds);
	let mut last_sweep = OffsetDateTime::now_utc();

	tracing::info!(
		max_concurrent_jobs = service.cfg.service.max_concurrent_jobs,
		poll_interval_ms = service.cfg.service.poll_interval_ms,
		"Worker started."
	);

	loop {
		if let Err(err) = fill_slots(&service).await {
			tracing::error!(error = %err, "Failed to claim pending jobs.");
		}

		let now = OffsetDateTime::now_utc();

		if now - last_sweep >= sweep_every {
			match service.mark_stalled_jobs().await {
				Ok(_) => last_sweep = now,
				Err(err) => tracing::error!(error = %err, "Stall sweep failed."),
			}
		}

		tokio::select! {
			_ = tokio_time::sleep(poll) => {},
			signal = tokio::signal::ctrl_c() => {
				signal?;

				break;
			},
		}
	}

	tracing::info!(running = service.registry.len(), "Shutting down worker.");
	service.shutdown().await;

	Ok(())
}

/// Starts pending jobs until every slot is taken or none are left. Returns the number started.
pub async fn fill_slots(service: &Arc<ResearchService>) -> Result<usize> {
	let mut started = 0;

	while free_slots(service.registry.len(), service.cfg.service.max_concurrent_jobs) > 0 {
		match service.start_next().await? {
			Some(job_id) => {
				tracing::info!(job_id = %job_id, "Claimed pending job.");

				started += 1;
			},
			None => break,
		}
	}

	Ok(started)
}

/// Resolves once no task in this process is running `job_id`.
pub async fn wait_for_job(service: &ResearchService, job_id: Uuid) {
	let poll = StdDuration::from_millis(service.cfg.service.poll_interval_ms);

	while service.registry.contains(job_id) {
		tokio_time::sleep(poll).await;
	}
}

fn free_slots(running: usize, max_concurrent_jobs: usize) -> usize {
	max_concurrent_jobs.saturating_sub(running)
}
