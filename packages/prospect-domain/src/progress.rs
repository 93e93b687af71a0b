use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::status::JobStatus;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Progress {
	pub status: JobStatus,
	pub total: i64,
	pub completed: i64,
	pub failed: i64,
	pub pending: i64,
	/// Finished share of the job, rounded to one decimal place.
	pub percent: f64,
	pub is_stalled: bool,
}
impl Progress {
	pub fn new(status: JobStatus, total: i64, completed: i64, failed: i64, is_stalled: bool) -> Self {
		let pending = (total - completed - failed).max(0);

		Self {
			status,
			total,
			completed,
			failed,
			pending,
			percent: percent_done(total, completed, failed),
			is_stalled,
		}
	}
}

pub fn percent_done(total: i64, completed: i64, failed: i64) -> f64 {
	if total <= 0 {
		return 0.0;
	}

	let done = (completed + failed) as f64 / total as f64 * 100.0;

	(done * 10.0).round() / 10.0
}

/// A running job with no recorded activity for longer than `threshold` is stalled.
pub fn is_stalled(
	status: JobStatus,
	last_activity: Option<OffsetDateTime>,
	now: OffsetDateTime,
	threshold: Duration,
) -> bool {
	if status != JobStatus::Running {
		return false;
	}

	match last_activity {
		Some(at) => now - at > threshold,
		None => false,
	}
}
