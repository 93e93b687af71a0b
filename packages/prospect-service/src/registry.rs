use std::{
	collections::HashMap,
	sync::{Arc, Mutex, MutexGuard},
};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

struct RegisteredTask {
	token: CancellationToken,
	handle: Option<JoinHandle<()>>,
}

/// Running jobs in this process, keyed by job id.
#[derive(Default)]
pub struct TaskRegistry {
	tasks: Mutex<HashMap<Uuid, RegisteredTask>>,
}
impl TaskRegistry {
	/// Registers a job and returns its token, or `None` when the job is already registered.
	pub fn register(&self, job_id: Uuid) -> Option<CancellationToken> {
		let mut tasks = self.lock();

		if tasks.contains_key(&job_id) {
			return None;
		}

		let token = CancellationToken::new();

		tasks.insert(job_id, RegisteredTask { token: token.clone(), handle: None });

		Some(token)
	}

	/// Attaches the spawned task. Ignored when the task already finished and deregistered.
	pub fn attach(&self, job_id: Uuid, handle: JoinHandle<()>) {
		if let Some(task) = self.lock().get_mut(&job_id) {
			task.handle = Some(handle);
		}
	}

	/// Requests cancellation. Returns false when no task is registered for the job.
	pub fn cancel(&self, job_id: Uuid) -> bool {
		match self.lock().get(&job_id) {
			Some(task) => {
				task.token.cancel();

				true
			},
			None => false,
		}
	}

	pub fn remove(&self, job_id: Uuid) {
		self.lock().remove(&job_id);
	}

	pub fn contains(&self, job_id: Uuid) -> bool {
		self.lock().contains_key(&job_id)
	}

	pub fn len(&self) -> usize {
		self.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.lock().is_empty()
	}

	/// Cancels every registered job and hands back the task handles to await.
	pub fn cancel_all(&self) -> Vec<JoinHandle<()>> {
		let mut tasks = self.lock();

		tasks
			.values_mut()
			.filter_map(|task| {
				task.token.cancel();

				task.handle.take()
			})
			.collect()
	}

	fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, RegisteredTask>> {
		self.tasks.lock().unwrap_or_else(|err| err.into_inner())
	}
}

/// Deregisters a job when dropped, so every exit path of a job task releases its entry.
pub(crate) struct Registration {
	service: Arc<crate::ResearchService>,
	job_id: Uuid,
}
impl Registration {
	pub(crate) fn new(service: Arc<crate::ResearchService>, job_id: Uuid) -> Self {
		Self { service, job_id }
	}
}
impl Drop for Registration {
	fn drop(&mut self) {
		self.service.registry.remove(self.job_id);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn registration_is_exclusive_per_job() {
		let registry = TaskRegistry::default();
		let job_id = Uuid::new_v4();

		assert!(registry.register(job_id).is_some());
		assert!(registry.register(job_id).is_none());
		assert_eq!(registry.len(), 1);
	}

	#[test]
	fn cancel_reaches_the_registered_token() {
		let registry = TaskRegistry::default();
		let job_id = Uuid::new_v4();
		let token = registry.register(job_id).expect("Expected a new registration.");

		assert!(registry.cancel(job_id));
		assert!(token.is_cancelled());
	}

	#[test]
	fn cancel_without_task_returns_false() {
		let registry = TaskRegistry::default();

		assert!(!registry.cancel(Uuid::new_v4()));
	}

	#[test]
	fn removed_jobs_can_no_longer_be_cancelled() {
		let registry = TaskRegistry::default();
		let job_id = Uuid::new_v4();
		let token = registry.register(job_id).expect("Expected a new registration.");

		registry.remove(job_id);

		assert!(!registry.cancel(job_id));
		assert!(!token.is_cancelled());
		assert!(registry.is_empty());
	}

	#[tokio::test]
	async fn cancel_all_cancels_tokens_and_returns_handles() {
		let registry = TaskRegistry::default();
		let job_id = Uuid::new_v4();
		let token = registry.register(job_id).expect("Expected a new registration.");
		let waiter = token.clone();

		registry.attach(job_id, tokio::spawn(async move { waiter.cancelled().await }));

		let handles = registry.cancel_all();

		assert_eq!(handles.len(), 1);
		assert!(token.is_cancelled());

		for handle in handles {
			handle.await.expect("Task must finish after cancellation.");
		}
	}
}
