use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::Duration;

use geo::{Coord, LineString};
use tracing::warn;

use crate::matching::{MapMatcher, MatchedGeometry, WayProperties};
use crate::routing::{Router, RoutingResult};
use crate::{FailureReason, NoMatchFound, NoRouteFound, TransportProfile};

/// Bounds the duration of each call to a blocking matcher or router.
///
/// Every call runs on its own worker thread; if the timeout elapses first the call is abandoned
/// and reported as [`FailureReason::Timeout`], the same way as if the capability found nothing.
///
/// An abandoned call keeps its worker thread until the inner capability returns. At most
/// `max_running` calls (waited for or abandoned) run at the same time across all the clones of
/// the decorator; further calls are refused with [`FailureReason::Unavailable`] without starting
/// a thread.
#[derive(Debug)]
pub struct Timeout<C> {
    inner: Arc<C>,
    timeout: Duration,
    running: Arc<AtomicUsize>,
    max_running: usize,
}

impl<C> Timeout<C> {
    pub const DEFAULT_MAX_RUNNING: usize = 64;

    pub fn new(inner: C, timeout: Duration) -> Self {
        Self::from_arc(Arc::new(inner), timeout)
    }

    pub fn from_arc(inner: Arc<C>, timeout: Duration) -> Self {
        Self {
            inner,
            timeout,
            running: Arc::new(AtomicUsize::new(0)),
            max_running: Self::DEFAULT_MAX_RUNNING,
        }
    }

    /// Sets the maximum number of calls running at the same time.
    pub const fn with_max_running(mut self, max_running: usize) -> Self {
        self.max_running = max_running;
        self
    }

    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Number of calls whose worker thread has not finished yet, abandoned calls included.
    pub fn running(&self) -> usize {
        self.running.load(Ordering::Acquire)
    }

    fn call<T, F>(&self, call: F) -> Result<T, FailureReason>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let slot = Slot::acquire(&self.running, self.max_running).ok_or_else(|| {
            warn!("Refusing call, {} calls are still running", self.max_running);
            FailureReason::Unavailable
        })?;

        call_with_timeout(self.timeout, slot, call)
    }
}

impl<C> Clone for Timeout<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            timeout: self.timeout,
            running: Arc::clone(&self.running),
            max_running: self.max_running,
        }
    }
}

/// A running call, released when the worker thread finishes.
struct Slot(Arc<AtomicUsize>);

impl Slot {
    fn acquire(running: &Arc<AtomicUsize>, max_running: usize) -> Option<Self> {
        running
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < max_running).then_some(n + 1)
            })
            .ok()
            .map(|_| Self(Arc::clone(running)))
    }
}

impl Drop for Slot {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

fn call_with_timeout<T, F>(timeout: Duration, slot: Slot, call: F) -> Result<T, FailureReason>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let (sender, receiver) = mpsc::sync_channel(1);

    // the slot is released with the closure, also if the thread can't be spawned
    thread::Builder::new()
        .name("netzbezug-capability".into())
        .spawn(move || {
            let result = call();
            drop(slot);
            // the receiver is gone if the call timed out
            let _ = sender.send(result);
        })
        .map_err(|_| FailureReason::Unavailable)?;

    receiver.recv_timeout(timeout).map_err(|error| match error {
        mpsc::RecvTimeoutError::Timeout => {
            warn!("Call timed out after {timeout:?}");
            FailureReason::Timeout
        }
        mpsc::RecvTimeoutError::Disconnected => FailureReason::Unavailable,
    })
}

impl<M> MapMatcher for Timeout<M>
where
    M: MapMatcher + Send + Sync + 'static,
{
    fn match_geometry(
        &self,
        geometry: &LineString,
        profile: TransportProfile,
    ) -> Result<MatchedGeometry, NoMatchFound> {
        let matcher = Arc::clone(&self.inner);
        let geometry = geometry.clone();

        self.call(move || matcher.match_geometry(&geometry, profile))
            .map_err(NoMatchFound::new)?
    }

    fn match_with_properties(
        &self,
        geometry: &LineString,
        profile: TransportProfile,
    ) -> Result<(MatchedGeometry, Vec<WayProperties>), NoMatchFound> {
        let matcher = Arc::clone(&self.inner);
        let geometry = geometry.clone();

        self.call(move || {
            matcher.match_with_properties(&geometry, profile)
        })
        .map_err(NoMatchFound::new)?
    }
}

impl<R> Router for Timeout<R>
where
    R: Router + Send + Sync + 'static,
{
    fn route(
        &self,
        coordinates: &[Coord],
        profile: TransportProfile,
        prefer_short: bool,
    ) -> Result<RoutingResult, NoRouteFound> {
        let router = Arc::clone(&self.inner);
        let coordinates = coordinates.to_vec();

        self.call(move || {
            router.route(&coordinates, profile, prefer_short)
        })
        .map_err(NoRouteFound::new)?
    }
}
