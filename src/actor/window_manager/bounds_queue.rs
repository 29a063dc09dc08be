//! Debounced, per-window coalescing of native bound changes.
//!
//! Updates land in a pending map keyed by window id. The first update after
//! a flush schedules one delayed flush; later updates to the same window
//! before it fires overwrite the pending value. Each flush is tied to the
//! cancellation token that was live when it was scheduled, so once
//! [`BoundsQueue::cancel`] is called nothing queued earlier reaches the
//! backend.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::sys::backend::{WindowBackend, WindowId};
use crate::sys::geometry::Bounds;

pub(super) struct BoundsQueue<B: ?Sized> {
    backend: Arc<B>,
    delay: Duration,
    pending: Arc<Mutex<BTreeMap<WindowId, Bounds>>>,
    scheduled: Arc<AtomicBool>,
    token: Mutex<CancellationToken>,
}

impl<B: WindowBackend + ?Sized> BoundsQueue<B> {
    pub(super) fn new(backend: Arc<B>, delay: Duration) -> Self {
        Self {
            backend,
            delay,
            pending: Arc::default(),
            scheduled: Arc::default(),
            token: Mutex::new(CancellationToken::new()),
        }
    }

    /// Queues `bounds` for `id`. Outside a Tokio runtime no flush can be
    /// scheduled, and the update waits for [`BoundsQueue::flush_now`].
    pub(super) fn push(&self, id: WindowId, bounds: Bounds) {
        let token = self.token.lock().clone();
        if token.is_cancelled() {
            trace!(window = %id, "bounds queue stopped; dropping update");
            return;
        }
        self.pending.lock().insert(id, bounds);
        if self.scheduled.swap(true, Ordering::AcqRel) {
            return;
        }

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            self.scheduled.store(false, Ordering::Release);
            debug!(window = %id, "no runtime to schedule a flush; update waits for an explicit flush");
            return;
        };
        let backend = self.backend.clone();
        let pending = self.pending.clone();
        let scheduled = self.scheduled.clone();
        let delay = self.delay;
        runtime.spawn(async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }
            scheduled.store(false, Ordering::Release);
            let batch = std::mem::take(&mut *pending.lock());
            send(&*backend, batch, &token).await;
        });
    }

    /// Sends everything pending right away instead of waiting out the delay.
    pub(super) async fn flush_now(&self) {
        let token = self.token.lock().clone();
        let batch = std::mem::take(&mut *self.pending.lock());
        send(&*self.backend, batch, &token).await;
    }

    /// Drops pending updates and stops every scheduled flush.
    pub(super) fn cancel(&self) {
        self.token.lock().cancel();
        self.pending.lock().clear();
        self.scheduled.store(false, Ordering::Release);
    }

    /// Accepts updates again after [`BoundsQueue::cancel`].
    pub(super) fn resume(&self) {
        let mut token = self.token.lock();
        if token.is_cancelled() {
            *token = CancellationToken::new();
        }
    }

    pub(super) fn pending(&self) -> usize { self.pending.lock().len() }
}

async fn send<B: WindowBackend + ?Sized>(
    backend: &B,
    batch: BTreeMap<WindowId, Bounds>,
    token: &CancellationToken,
) {
    for (id, bounds) in batch {
        if token.is_cancelled() {
            return;
        }
        trace!(window = %id, ?bounds, "setting bounds");
        if let Err(err) = backend.set_window_bounds(id, bounds).await {
            warn!(%err, "failed to set window bounds");
        }
    }
}
