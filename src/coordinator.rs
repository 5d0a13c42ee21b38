//! Refresh deduplication state shared by every call issued through one client.
//!
//! The first caller that observes an expired session becomes the refresh *leader* and
//! receives a [`RefreshTicket`]; callers arriving while that refresh is in flight become
//! *waiters* and park on a [`RefreshWaiter`]. Settling the ticket flips `in_progress` back to
//! `false` and drains the waiters in the order they were enqueued, handing each a clone of
//! the outcome. The state lock is never held across an `.await`.
//!
//! A cycle that ends with the session expired leaves a pending logout behind. Every
//! participant of that cycle may perform the local sign-out, but only the one that claims the
//! pending logout raises the notice and the redirect, so the logout survives a cancelled
//! leader and still happens once.

mod metrics;

pub use metrics::RefreshMetrics;

// std
use std::collections::VecDeque;
// crates.io
use tokio::sync::oneshot;
// self
use crate::{_prelude::*, error::RefreshError};

/// Outcome of one refresh cycle, fanned out to the leader and every waiter.
pub type RefreshOutcome = Result<(), RefreshError>;

#[derive(Debug, Default)]
struct RefreshState {
	in_progress: bool,
	logout_pending: bool,
	waiters: VecDeque<oneshot::Sender<RefreshOutcome>>,
}

/// Owns the refresh-in-progress flag and the FIFO queue of parked callers.
#[derive(Debug, Default)]
pub struct RefreshCoordinator {
	state: Mutex<RefreshState>,
	metrics: RefreshMetrics,
}
impl RefreshCoordinator {
	/// Creates an idle coordinator.
	pub fn new() -> Self {
		Self::default()
	}

	/// Joins the current refresh cycle, starting one if none is in flight.
	pub fn join(&self) -> RefreshRole<'_> {
		let mut state = self.state.lock();

		if state.in_progress {
			let (tx, rx) = oneshot::channel();

			state.waiters.push_back(tx);
			self.metrics.record_queued();

			RefreshRole::Waiter(RefreshWaiter(rx))
		} else {
			state.in_progress = true;
			self.metrics.record_attempt();

			RefreshRole::Leader(RefreshTicket { coordinator: self, outcome: None })
		}
	}

	/// Returns `true` while a refresh is in flight.
	pub fn in_progress(&self) -> bool {
		self.state.lock().in_progress
	}

	/// Returns `true` while the last cycle's forced logout has not been claimed.
	pub fn logout_pending(&self) -> bool {
		self.state.lock().logout_pending
	}

	/// Claims the pending forced logout; only the first claim after a cycle succeeds.
	pub fn claim_logout(&self) -> bool {
		std::mem::take(&mut self.state.lock().logout_pending)
	}

	/// Number of callers parked behind the in-flight refresh.
	pub fn waiting(&self) -> usize {
		self.state.lock().waiters.len()
	}

	/// Counters describing refresh activity.
	pub fn metrics(&self) -> &RefreshMetrics {
		&self.metrics
	}

	fn release(&self, outcome: RefreshOutcome) {
		let waiters = {
			let mut state = self.state.lock();

			state.in_progress = false;
			state.logout_pending = matches!(&outcome, Err(e) if e.is_session_expired());

			std::mem::take(&mut state.waiters)
		};

		match &outcome {
			Ok(()) => self.metrics.record_success(),
			Err(_) => self.metrics.record_failure(),
		}

		for waiter in waiters {
			// A waiter whose caller went away has nothing left to resume.
			let _ = waiter.send(outcome.clone());
		}
	}
}

/// Part a caller plays in the current refresh cycle.
#[derive(Debug)]
pub enum RefreshRole<'a> {
	/// The caller must perform the refresh and settle the ticket.
	Leader(RefreshTicket<'a>),
	/// A refresh is already in flight; the caller waits for its outcome.
	Waiter(RefreshWaiter),
}

/// Obligation to settle the in-flight refresh.
///
/// Dropping an unsettled ticket settles it with [`RefreshError::Abandoned`], so waiters never
/// hang on a leader that was cancelled.
#[derive(Debug)]
pub struct RefreshTicket<'a> {
	coordinator: &'a RefreshCoordinator,
	outcome: Option<RefreshOutcome>,
}
impl RefreshTicket<'_> {
	/// Publishes the refresh outcome to every waiter, in enqueue order.
	pub fn settle(mut self, outcome: RefreshOutcome) {
		self.outcome = Some(outcome);
	}
}
impl Drop for RefreshTicket<'_> {
	fn drop(&mut self) {
		let outcome = self.outcome.take().unwrap_or(Err(RefreshError::Abandoned));

		self.coordinator.release(outcome);
	}
}

/// Parked caller waiting on someone else's refresh.
#[derive(Debug)]
pub struct RefreshWaiter(oneshot::Receiver<RefreshOutcome>);
impl RefreshWaiter {
	/// Suspends until the in-flight refresh settles.
	pub async fn wait(self) -> RefreshOutcome {
		self.0.await.unwrap_or(Err(RefreshError::Abandoned))
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn leader(coordinator: &RefreshCoordinator) -> RefreshTicket<'_> {
		match coordinator.join() {
			RefreshRole::Leader(ticket) => ticket,
			RefreshRole::Waiter(_) => panic!("Idle coordinator should hand out a leader ticket."),
		}
	}

	fn waiter(coordinator: &RefreshCoordinator) -> RefreshWaiter {
		match coordinator.join() {
			RefreshRole::Waiter(waiter) => waiter,
			RefreshRole::Leader(_) => panic!("Busy coordinator should enqueue a waiter."),
		}
	}

	#[tokio::test]
	async fn only_the_first_caller_leads() {
		let coordinator = RefreshCoordinator::new();
		let ticket = leader(&coordinator);
		let first = waiter(&coordinator);
		let second = waiter(&coordinator);

		assert!(coordinator.in_progress());
		assert_eq!(coordinator.waiting(), 2);

		ticket.settle(Ok(()));

		assert!(!coordinator.in_progress());
		assert_eq!(coordinator.waiting(), 0);
		assert!(first.wait().await.is_ok());
		assert!(second.wait().await.is_ok());
		assert_eq!(coordinator.metrics().attempts(), 1);
		assert_eq!(coordinator.metrics().queued(), 2);
		assert_eq!(coordinator.metrics().successes(), 1);
	}

	#[tokio::test]
	async fn failures_fan_out_to_every_waiter() {
		let coordinator = RefreshCoordinator::new();
		let ticket = leader(&coordinator);
		let waiters = [waiter(&coordinator), waiter(&coordinator), waiter(&coordinator)];

		ticket.settle(Err(RefreshError::Rejected { status: 401 }));

		for waiter in waiters {
			let outcome = waiter.wait().await;

			assert!(matches!(outcome, Err(RefreshError::Rejected { status: 401 })));
		}

		assert_eq!(coordinator.metrics().failures(), 1);
	}

	#[tokio::test]
	async fn dropped_ticket_abandons_waiters_and_resets() {
		let coordinator = RefreshCoordinator::new();
		let ticket = leader(&coordinator);
		let parked = waiter(&coordinator);

		drop(ticket);

		assert!(matches!(parked.wait().await, Err(RefreshError::Abandoned)));
		assert!(!coordinator.in_progress());

		// The next expired call starts a new cycle.
		let _next = leader(&coordinator);

		assert_eq!(coordinator.metrics().attempts(), 2);
	}

	#[test]
	fn expired_cycles_leave_one_claimable_logout() {
		let coordinator = RefreshCoordinator::new();

		leader(&coordinator).settle(Err(RefreshError::Rejected { status: 401 }));

		assert!(coordinator.logout_pending());
		assert!(coordinator.claim_logout());
		assert!(!coordinator.claim_logout());

		leader(&coordinator).settle(Err(RefreshError::Rejected { status: 401 }));
		// A later successful cycle means the session is usable again.
		leader(&coordinator).settle(Ok(()));

		assert!(!coordinator.logout_pending());

		leader(&coordinator).settle(Err(RefreshError::Rejected { status: 503 }));

		assert!(!coordinator.logout_pending());
	}

	#[test]
	fn settling_completes_every_waiter_before_returning() {
		let coordinator = RefreshCoordinator::new();
		let ticket = leader(&coordinator);
		let mut receivers = (0..4).map(|_| waiter(&coordinator).0).collect::<Vec<_>>();

		ticket.settle(Ok(()));

		for rx in receivers.iter_mut() {
			assert!(matches!(rx.try_recv(), Ok(Ok(()))));
		}
	}
}
