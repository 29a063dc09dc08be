//! In-memory backend and fixtures for engine tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::sys::backend::{
    BackendError, FocusedApplication, FocusedWindowRef, Monitor, Window, WindowBackend, WindowId,
};
use crate::sys::geometry::Bounds;

/// A 1920x1080 monitor whose left edge is at `x`.
pub fn monitor(id: u32, name: &str, main: bool, x: f64) -> Monitor {
    Monitor {
        id,
        name: name.to_string(),
        bounds: Bounds::new(x, 0.0, 1920.0, 1080.0),
        main,
    }
}

pub fn window(id: u32, application: &str, title: &str) -> Window {
    Window {
        id: WindowId(id),
        title: title.to_string(),
        application: application.to_string(),
        bounds: Bounds::new(100.0, 100.0, 800.0, 600.0),
    }
}

pub fn focused(name: &str, pid: i32, window: Option<u32>) -> FocusedApplication {
    FocusedApplication {
        name: name.to_string(),
        pid,
        bundle_id: None,
        window: window.map(|id| FocusedWindowRef { id: WindowId(id) }),
    }
}

/// Records every call and applies bound changes to its own window list, so
/// the next listing reflects them.
#[derive(Default)]
pub struct FakeBackend {
    monitors: Mutex<Vec<Monitor>>,
    windows: Mutex<Vec<Window>>,
    focused: Mutex<Option<FocusedApplication>>,
    fail_listing: AtomicBool,
    list_delay: Mutex<Option<Duration>>,
    list_calls: AtomicUsize,
    focus_calls: AtomicUsize,
    bounds_calls: Mutex<Vec<(WindowId, Bounds)>>,
}

impl FakeBackend {
    pub fn new(monitors: Vec<Monitor>, windows: Vec<Window>) -> Self {
        Self {
            monitors: Mutex::new(monitors),
            windows: Mutex::new(windows),
            ..Default::default()
        }
    }

    pub fn fail_listing(&self, fail: bool) { self.fail_listing.store(fail, Ordering::SeqCst); }

    /// Makes `list_windows` take this long.
    pub fn set_list_delay(&self, delay: Option<Duration>) { *self.list_delay.lock() = delay; }

    pub fn set_focused(&self, app: Option<FocusedApplication>) { *self.focused.lock() = app; }

    pub fn set_windows(&self, windows: Vec<Window>) { *self.windows.lock() = windows; }

    pub fn list_calls(&self) -> usize { self.list_calls.load(Ordering::SeqCst) }

    pub fn focus_calls(&self) -> usize { self.focus_calls.load(Ordering::SeqCst) }

    pub fn bounds_calls(&self) -> Vec<(WindowId, Bounds)> { self.bounds_calls.lock().clone() }

    pub fn window_bounds(&self, id: WindowId) -> Option<Bounds> {
        self.windows.lock().iter().find(|w| w.id == id).map(|w| w.bounds)
    }
}

#[async_trait]
impl WindowBackend for FakeBackend {
    async fn list_monitors(&self) -> Result<Vec<Monitor>, BackendError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(BackendError::ListMonitors("injected failure".to_string()));
        }
        Ok(self.monitors.lock().clone())
    }

    async fn list_windows(&self) -> Result<Vec<Window>, BackendError> {
        let delay = *self.list_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(BackendError::ListWindows("injected failure".to_string()));
        }
        Ok(self.windows.lock().clone())
    }

    async fn set_window_bounds(&self, id: WindowId, bounds: Bounds) -> Result<(), BackendError> {
        self.bounds_calls.lock().push((id, bounds));
        match self.windows.lock().iter_mut().find(|w| w.id == id) {
            Some(window) => {
                window.bounds = bounds;
                Ok(())
            }
            None => Err(BackendError::SetBounds(id, "no such window".to_string())),
        }
    }

    async fn focused_application(&self) -> Result<Option<FocusedApplication>, BackendError> {
        self.focus_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.focused.lock().clone())
    }
}
