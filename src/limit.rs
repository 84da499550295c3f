//! Sliding-window request admission.
//!
//! The window holds one expiry instant per recently sent request ("this slot is occupied until
//! T") plus the reservations of requests that are still in flight. Admission evicts expired
//! entries from the heads, then either reserves a slot, fails, or suspends the caller until a
//! slot frees up. A reservation turns into a 1-second entry only when its request actually
//! produced a response; a request that never left the machine gives its slot back, and one that
//! never reports back stops counting after one window.

// std
use std::{
	sync::atomic::{AtomicBool, Ordering},
	time::Duration as StdDuration,
};
// crates.io
use tokio::{sync::Notify, time::Instant};
// self
use crate::{
	_prelude::*,
	obs::{self, LimitMode},
};

/// Length of the rolling window; each sent request occupies a slot for this long.
pub const WINDOW: StdDuration = StdDuration::from_secs(1);

/// Capacity plus the runtime-togglable blocking flag.
#[derive(Debug)]
pub struct RateLimitPolicy {
	capacity: NonZeroU32,
	block_on_limit: AtomicBool,
}
impl RateLimitPolicy {
	/// Creates a policy admitting `capacity` requests per rolling second.
	pub fn new(capacity: NonZeroU32, block_on_limit: bool) -> Self {
		Self { capacity, block_on_limit: AtomicBool::new(block_on_limit) }
	}

	/// Window capacity, fixed at construction.
	pub fn capacity(&self) -> NonZeroU32 {
		self.capacity
	}

	/// Whether a full window suspends the caller.
	pub fn block_on_limit(&self) -> bool {
		self.block_on_limit.load(Ordering::Acquire)
	}

	/// Switches between suspending and failing on a full window.
	pub fn set_block_on_limit(&self, enabled: bool) {
		self.block_on_limit.store(enabled, Ordering::Release);
	}
}

/// Handle on one reserved slot.
///
/// A reservation occupies the window until its request reports back or, at the latest, until
/// [`Reservation::lapses_at`], so a request that never returns cannot hold a slot forever.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Reservation {
	lapses_at: Instant,
}
impl Reservation {
	/// Instant after which the window stops counting this reservation.
	pub fn lapses_at(&self) -> Instant {
		self.lapses_at
	}
}

/// Result of a single admission check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WindowDecision {
	/// A slot was reserved for the caller.
	Admitted(Reservation),
	/// Every slot is taken.
	Full {
		/// Earliest instant a committed entry expires or a reservation lapses.
		earliest_expiry: Instant,
	},
}

/// Bounded deques of slot expiries with lazy head eviction.
#[derive(Debug)]
pub struct RateWindow {
	capacity: usize,
	expiries: VecDeque<Instant>,
	reservations: VecDeque<Instant>,
}
impl RateWindow {
	/// Creates an empty window.
	pub fn new(capacity: NonZeroU32) -> Self {
		let capacity = usize::try_from(capacity.get()).unwrap_or(usize::MAX);
		let preallocated = capacity.min(1024);

		Self {
			capacity,
			expiries: VecDeque::with_capacity(preallocated),
			reservations: VecDeque::with_capacity(preallocated),
		}
	}

	/// Drops every committed entry and every reservation whose expiry is `<= now`.
	pub fn evict_expired(&mut self, now: Instant) {
		for queue in [&mut self.expiries, &mut self.reservations] {
			while queue.front().is_some_and(|expiry| *expiry <= now) {
				queue.pop_front();
			}
		}
	}

	/// Committed entries plus live reservations.
	pub fn occupied(&self) -> usize {
		self.expiries.len() + self.reservations.len()
	}

	/// Live reservations.
	pub fn reserved(&self) -> usize {
		self.reservations.len()
	}

	/// Earliest instant at which a slot frees up on its own.
	pub fn earliest_expiry(&self) -> Option<Instant> {
		match (self.expiries.front(), self.reservations.front()) {
			(Some(committed), Some(reserved)) => Some(*committed.min(reserved)),
			(committed, reserved) => committed.or(reserved).copied(),
		}
	}

	/// Evicts expired entries, then reserves a slot if one is free.
	pub fn try_reserve(&mut self, now: Instant) -> WindowDecision {
		self.evict_expired(now);

		match self.earliest_expiry() {
			Some(earliest_expiry) if self.occupied() >= self.capacity =>
				WindowDecision::Full { earliest_expiry },
			_ => {
				let lapses_at = push_sorted(&mut self.reservations, now + WINDOW);

				WindowDecision::Admitted(Reservation { lapses_at })
			},
		}
	}

	/// Replaces `reservation` with an entry expiring at `now + WINDOW`.
	///
	/// A reservation that already lapsed is still recorded, since its request did go out.
	pub fn commit(&mut self, reservation: Reservation, now: Instant) {
		self.forget(reservation);
		push_sorted(&mut self.expiries, now + WINDOW);
	}

	/// Gives `reservation` back without occupying the window.
	pub fn release(&mut self, reservation: Reservation) {
		self.forget(reservation);
	}

	fn forget(&mut self, reservation: Reservation) {
		if let Some(index) =
			self.reservations.iter().position(|lapses_at| *lapses_at == reservation.lapses_at)
		{
			self.reservations.remove(index);
		}
	}
}

// Head eviction needs both queues sorted.
fn push_sorted(queue: &mut VecDeque<Instant>, expiry: Instant) -> Instant {
	let expiry = queue.back().map_or(expiry, |last| expiry.max(*last));

	queue.push_back(expiry);

	expiry
}

#[derive(Debug)]
struct WindowState {
	window: Mutex<RateWindow>,
	freed: Notify,
}
impl WindowState {
	fn commit(&self, reservation: Reservation) {
		self.window.lock().commit(reservation, Instant::now());
		self.freed.notify_waiters();
	}

	fn release(&self, reservation: Reservation) {
		self.window.lock().release(reservation);
		self.freed.notify_waiters();
	}
}

/// Shared admission controller.
#[derive(Debug)]
pub struct RateLimiter {
	policy: RateLimitPolicy,
	state: Arc<WindowState>,
}
impl RateLimiter {
	/// Creates a limiter with an empty window.
	pub fn new(policy: RateLimitPolicy) -> Self {
		let window = Mutex::new(RateWindow::new(policy.capacity()));

		Self { policy, state: Arc::new(WindowState { window, freed: Notify::new() }) }
	}

	/// The policy consulted on every admission.
	pub fn policy(&self) -> &RateLimitPolicy {
		&self.policy
	}

	/// Slots currently taken, after evicting expired entries.
	pub fn occupied(&self) -> usize {
		let mut window = self.state.window.lock();

		window.evict_expired(Instant::now());

		window.occupied()
	}

	/// Reservations whose requests have not reported back yet.
	pub fn in_flight(&self) -> usize {
		let mut window = self.state.window.lock();

		window.evict_expired(Instant::now());

		window.reserved()
	}

	/// Reserves a slot for the caller's next request.
	///
	/// With blocking enabled the caller sleeps until the earliest entry expires or an in-flight
	/// reservation reports back, whichever comes first, and then re-checks. Every wait is bounded
	/// by one [`WINDOW`]. Without blocking a full window fails with [`Error::RateLimitExceeded`].
	pub async fn admit(&self) -> Result<RequestPermit> {
		loop {
			// Registered before the check so a release between check and wait is not lost.
			let freed = self.state.freed.notified();
			let now = Instant::now();
			let decision = self.state.window.lock().try_reserve(now);
			let earliest_expiry = match decision {
				WindowDecision::Admitted(reservation) =>
					return Ok(RequestPermit { state: Some(Arc::clone(&self.state)), reservation }),
				WindowDecision::Full { earliest_expiry } => earliest_expiry,
			};
			let delay = earliest_expiry.saturating_duration_since(now);

			if !self.policy.block_on_limit() {
				obs::record_rate_limited(LimitMode::Rejected);

				return Err(Error::RateLimitExceeded {
					capacity: self.policy.capacity(),
					retry_after: Duration::try_from(delay).ok(),
				});
			}

			obs::record_rate_limited(LimitMode::Waited);
			obs::rate_limit_wait(delay);

			tokio::select! {
				_ = tokio::time::sleep_until(earliest_expiry) => {},
				_ = freed => {},
			}
		}
	}
}

/// A reserved window slot.
///
/// [`RequestPermit::commit`] records the request as sent; dropping the permit without
/// committing hands the slot back.
#[derive(Debug)]
#[must_use = "dropping a permit releases its slot; commit it once the request was sent"]
pub struct RequestPermit {
	state: Option<Arc<WindowState>>,
	reservation: Reservation,
}
impl RequestPermit {
	/// Occupies the slot for [`WINDOW`] starting now.
	pub fn commit(mut self) {
		if let Some(state) = self.state.take() {
			state.commit(self.reservation);
		}
	}
}
impl Drop for RequestPermit {
	fn drop(&mut self) {
		if let Some(state) = self.state.take() {
			state.release(self.reservation);
		}
	}
}
