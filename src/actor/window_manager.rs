//! The reconciler: keeps native window bounds in line with the current
//! screen-set.
//!
//! A [`WindowManager`] is a cheap handle; clones share one engine. All tree
//! edits and placement run synchronously under the state lock, so passes
//! never interleave. Backend I/O happens only in [`WindowManager::refresh`],
//! [`WindowManager::poll_focus`] and the debounced bounds queue.

mod bounds_queue;
mod error;
#[cfg(test)]
pub(crate) mod testing;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, trace, warn};

use self::bounds_queue::BoundsQueue;
pub use self::error::WindowManagerError;
use crate::common::collections::HashMap;
use crate::common::config::{Config, HostSettings, Settings};
use crate::layout_engine::locate;
use crate::layout_engine::{Caches, MoveOutcome, Placement, VisitDetails, mover, placement};
use crate::model::{Application, ScreenSet, default_screen_set};
use crate::sys::backend::{Monitor, Window, WindowBackend, WindowId};
use crate::sys::geometry::{Bounds, SameAs};

/// An immutable view of the engine for callers outside the control loop.
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct WindowManagerState {
    pub monitors: Vec<Monitor>,
    pub windows: Vec<Window>,
    pub current_layout: ScreenSet,
    pub current_application: Option<Application>,
    pub located_at: BTreeMap<WindowId, String>,
    pub placement: Option<Placement>,
}

struct EngineState {
    caches: Caches,
    layout: ScreenSet,
    /// Windows sent to a stack on a non-main monitor, by monitor name.
    located_at: HashMap<WindowId, String>,
    current_application: Option<Application>,
    last_placement: Option<Placement>,
}

struct Inner<B: ?Sized> {
    backend: Arc<B>,
    settings: Settings,
    host: HostSettings,
    state: Mutex<EngineState>,
    in_flight: AtomicBool,
    bounds: BoundsQueue<B>,
    timers: Mutex<Option<CancellationToken>>,
}

/// Held for the duration of a pass; at most one exists at a time.
struct PassGuard<'a>(&'a AtomicBool);

impl<'a> PassGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| PassGuard(flag))
    }
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) { self.0.store(false, Ordering::Release); }
}

pub struct WindowManager<B: ?Sized> {
    inner: Arc<Inner<B>>,
}

impl<B: ?Sized> Clone for WindowManager<B> {
    fn clone(&self) -> Self { Self { inner: self.inner.clone() } }
}

impl<B: WindowBackend + ?Sized> WindowManager<B> {
    /// Creates a stopped engine. The current layout starts as the config's
    /// default layout, or a single full-screen stack.
    pub fn new(backend: Arc<B>, config: &Config) -> Self {
        let layout = config.default_layout().cloned().unwrap_or_else(default_screen_set);
        Self {
            inner: Arc::new(Inner {
                bounds: BoundsQueue::new(backend.clone(), config.settings.bounds_debounce()),
                backend,
                settings: config.settings.clone(),
                host: config.host.clone(),
                state: Mutex::new(EngineState {
                    caches: Caches::default(),
                    layout,
                    located_at: HashMap::default(),
                    current_application: None,
                    last_placement: None,
                }),
                in_flight: AtomicBool::new(false),
                timers: Mutex::new(None),
            }),
        }
    }

    pub fn is_running(&self) -> bool { self.inner.timers.lock().is_some() }

    /// Starts the reconciliation and focus timers. Does nothing if already
    /// running. Must be called from within a Tokio runtime.
    pub fn start(&self) {
        let token = {
            let mut timers = self.inner.timers.lock();
            if timers.is_some() {
                debug!("already running");
                return;
            }
            let token = CancellationToken::new();
            *timers = Some(token.clone());
            token
        };
        self.inner.bounds.resume();

        let poll = self.inner.settings.poll_interval();
        let focus = self.inner.settings.focus_poll_interval();
        info!(?poll, ?focus, "starting window manager");

        let this = self.clone();
        tokio::spawn(run_every(poll, token.clone(), move || {
            let this = this.clone();
            async move {
                if let Err(err) = this.tick().await {
                    warn!(%err, "tick failed; retrying next period");
                }
            }
        }));

        let this = self.clone();
        tokio::spawn(run_every(focus, token, move || {
            let this = this.clone();
            async move {
                if let Err(err) = this.poll_focus().await {
                    warn!(%err, "focus poll failed");
                }
            }
        }));
    }

    /// Cancels both timers and every bounds update not yet sent. A pass
    /// already underway finishes, but issues no native calls.
    pub fn stop(&self) {
        if let Some(token) = self.inner.timers.lock().take() {
            token.cancel();
            info!("stopped window manager");
        }
        self.inner.bounds.cancel();
    }

    /// One scheduled step: refresh the caches, then reconcile. Skipped if
    /// another pass is in flight. Returns whether a pass ran.
    pub async fn tick(&self) -> Result<bool, WindowManagerError> {
        let Some(_guard) = PassGuard::acquire(&self.inner.in_flight) else {
            debug!("reconciliation already in flight; skipping tick");
            return Ok(false);
        };
        self.refresh().await?;
        self.run_pass();
        Ok(true)
    }

    /// Replaces the caches with a fresh listing from the backend.
    pub async fn refresh(&self) -> Result<(), WindowManagerError> {
        let caches = Caches::refresh(&*self.inner.backend, &self.inner.host)
            .await
            .map_err(WindowManagerError::Refresh)?;

        let mut state = self.inner.state.lock();
        state.located_at.retain(|id, _| caches.contains_window(*id));
        trace!(
            monitors = caches.monitors().count(),
            windows = caches.windows().count(),
            "refreshed caches"
        );
        state.caches = caches;
        Ok(())
    }

    /// Runs one pass against the caches as they are. Returns `false` if
    /// another pass was in flight.
    ///
    /// Bounds changes are flushed after the debounce delay on the current
    /// Tokio runtime. Outside one they stay queued until [`Self::flush_pending`].
    pub fn reconcile(&self) -> bool {
        let Some(_guard) = PassGuard::acquire(&self.inner.in_flight) else {
            debug!("reconciliation already in flight; skipping");
            return false;
        };
        self.run_pass();
        true
    }

    fn run_pass(&self) {
        let _span = info_span!("reconcile").entered();
        let mut state = self.inner.state.lock();

        let placement = match placement::plan(&state.layout, &state.caches, &state.located_at) {
            Ok(placement) => placement,
            Err(err) => {
                warn!(%err, "skipping reconciliation");
                return;
            }
        };

        let mut changed = 0;
        for (id, bounds) in &placement.assignments {
            if self.update_bounds(&mut state, *id, *bounds) {
                changed += 1;
            }
        }
        debug!(changed, "reconciled");
        state.last_placement = Some(placement);
    }

    /// Replaces the current screen-set and reconciles right away.
    ///
    /// Bounds changes are flushed after the debounce delay on the current
    /// Tokio runtime. Outside one they stay queued until [`Self::flush_pending`].
    pub fn set_layout(&self, layout: ScreenSet) -> bool {
        info!(screens = layout.len(), "setting layout");
        self.inner.state.lock().layout = layout;
        self.reconcile()
    }

    /// Moves the source's application or window to the destination slot and
    /// reconciles.
    ///
    /// Bounds changes are flushed after the debounce delay on the current
    /// Tokio runtime. Outside one they stay queued until [`Self::flush_pending`].
    pub fn move_to(&self, source: &VisitDetails, destination: &VisitDetails) -> MoveOutcome {
        let outcome = {
            let mut state = self.inner.state.lock();
            let outcome = mover::move_to(&mut state.layout, source, destination);

            let windows: Vec<WindowId> = if source.windows.is_empty() {
                source
                    .application_name
                    .as_deref()
                    .map(|app| state.caches.application_windows(app).map(|w| w.id).collect())
                    .unwrap_or_default()
            } else {
                source.windows.clone()
            };
            for id in windows {
                if destination.layout.is_stack() && !destination.monitor.main {
                    state.located_at.insert(id, destination.monitor.name.clone());
                } else if destination.layout.is_stack() || outcome.added {
                    state.located_at.remove(&id);
                }
            }
            outcome
        };
        self.reconcile();
        outcome
    }

    /// Requests new bounds for one window. Returns whether a native call was
    /// queued; matching cached bounds short-circuit.
    ///
    /// Bounds changes are flushed after the debounce delay on the current
    /// Tokio runtime. Outside one they stay queued until [`Self::flush_pending`].
    pub fn set_window_bounds(&self, id: WindowId, bounds: Bounds) -> bool {
        let mut state = self.inner.state.lock();
        self.update_bounds(&mut state, id, bounds)
    }

    fn update_bounds(&self, state: &mut EngineState, id: WindowId, bounds: Bounds) -> bool {
        let Some(window) = state.caches.window(id) else {
            trace!(window = %id, "not in cache; ignoring bounds");
            return false;
        };
        if window.bounds.same_as(bounds) {
            return false;
        }
        state.caches.set_shadow_bounds(id, bounds);
        self.inner.bounds.push(id, bounds);
        true
    }

    /// Checks the frontmost application. Returns whether the recorded
    /// current application changed. The host launcher never replaces it.
    pub async fn poll_focus(&self) -> Result<bool, WindowManagerError> {
        let Some(focused) = self
            .inner
            .backend
            .focused_application()
            .await
            .map_err(WindowManagerError::Focus)?
        else {
            return Ok(false);
        };
        if self.inner.host.is_host(&focused) {
            trace!(name = %focused.name, "ignoring host focus");
            return Ok(false);
        }

        let mut state = self.inner.state.lock();
        let application = Application {
            windows: state.caches.application_windows(&focused.name).cloned().collect(),
            focused_window: focused.window.and_then(|w| state.caches.window(w.id).cloned()),
            name: focused.name,
            pid: focused.pid,
            bundle_id: focused.bundle_id,
        };
        if state.current_application.as_ref().is_some_and(|current| current.same_focus(&application)) {
            return Ok(false);
        }
        debug!(name = %application.name, pid = application.pid, "focus changed");
        state.current_application = Some(application);
        Ok(true)
    }

    /// Sends queued bounds updates without waiting out the debounce delay.
    pub async fn flush_pending(&self) { self.inner.bounds.flush_now().await }

    pub fn pending_updates(&self) -> usize { self.inner.bounds.pending() }

    pub fn get_state(&self) -> WindowManagerState {
        let state = self.inner.state.lock();
        WindowManagerState {
            monitors: state.caches.monitors().cloned().collect(),
            windows: state.caches.windows().cloned().collect(),
            current_layout: state.layout.clone(),
            current_application: state.current_application.clone(),
            located_at: state.located_at.iter().map(|(id, name)| (*id, name.clone())).collect(),
            placement: state.last_placement.clone(),
        }
    }

    pub fn visit(&self) -> Vec<VisitDetails> {
        let state = self.inner.state.lock();
        locate::visit_screen_set(&state.layout, &state.caches)
    }

    pub fn locate_application(&self, application: &str) -> Option<VisitDetails> {
        let state = self.inner.state.lock();
        locate::locate_application(&state.layout, &state.caches, &state.located_at, application)
    }

    pub fn locate_window(&self, id: WindowId) -> Option<VisitDetails> {
        let state = self.inner.state.lock();
        locate::locate_window(&state.layout, &state.caches, &state.located_at, id)
    }
}

async fn run_every<F, Fut>(period: Duration, token: CancellationToken, mut f: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    let mut ticker = time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = ticker.tick() => {}
        }
        f().await;
    }
}
