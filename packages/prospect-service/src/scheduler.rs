//! Fixed-size window scheduling.
//!
//! Items run concurrently within a window and each window is awaited fully before the next one
//! starts. Every item runs in its own task, so a panicking item is reported as an outcome instead
//! of tearing down its siblings.

use std::future::Future;

use futures::future;
use tokio_util::sync::CancellationToken;

use crate::BoxFuture;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerPanic(pub String);

#[derive(Debug)]
pub struct ItemOutcome<O> {
	/// Position of the item in the scheduled list.
	pub index: usize,
	pub result: Result<O, WorkerPanic>,
}

#[derive(Debug)]
pub struct Windowed<O> {
	/// Outcomes of the items that ran, in input order.
	pub outcomes: Vec<ItemOutcome<O>>,
	/// Whether cancellation stopped the run before every window started.
	pub cancelled: bool,
}

/// Runs `worker` over `items` in consecutive windows of `window_size`.
///
/// The token is checked before each window. `on_window` receives each window's outcomes once all
/// of its items have finished; an error from it stops the run.
pub async fn run_windows<'a, T, O, W, Fut, C, E>(
	items: Vec<T>,
	window_size: usize,
	token: &CancellationToken,
	worker: W,
	mut on_window: C,
) -> Result<Windowed<O>, E>
where
	T: Send + 'static,
	O: Send + 'static,
	W: Fn(T) -> Fut,
	Fut: Future<Output = O> + Send + 'static,
	C: FnMut(&[ItemOutcome<O>]) -> BoxFuture<'a, Result<(), E>>,
{
	let window_size = window_size.max(1);
	let total = items.len();
	let mut outcomes = Vec::with_capacity(total);
	let mut items = items.into_iter().enumerate().peekable();

	while items.peek().is_some() {
		if token.is_cancelled() {
			tracing::info!(completed = outcomes.len(), total, "Window run cancelled.");

			return Ok(Windowed { outcomes, cancelled: true });
		}

		let (indices, handles): (Vec<_>, Vec<_>) = items
			.by_ref()
			.take(window_size)
			.map(|(index, item)| (index, tokio::spawn(worker(item))))
			.unzip();
		let window: Vec<_> = future::join_all(handles)
			.await
			.into_iter()
			.zip(indices)
			.map(|(joined, index)| ItemOutcome {
				index,
				result: joined.map_err(|err| {
					tracing::error!(index, error = %err, "Window item panicked.");

					WorkerPanic(err.to_string())
				}),
			})
			.collect();

		on_window(&window).await?;

		outcomes.extend(window);
	}

	Ok(Windowed { outcomes, cancelled: false })
}
