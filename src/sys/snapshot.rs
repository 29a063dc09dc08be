//! A backend backed by a JSON dump of the window system.
//!
//! Lets the engine plan against a recorded desktop without touching any
//! native API. Bound changes are applied to the in-memory copy and recorded.

use std::path::Path;

use anyhow::Context;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::backend::{BackendError, FocusedApplication, Monitor, Window, WindowBackend, WindowId};
use super::geometry::Bounds;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct Snapshot {
    pub monitors: Vec<Monitor>,
    #[serde(default)]
    pub windows: Vec<Window>,
    #[serde(default)]
    pub focused: Option<FocusedApplication>,
}

impl Snapshot {
    pub fn read(path: &Path) -> anyhow::Result<Snapshot> {
        let buf = std::fs::read_to_string(path)
            .with_context(|| format!("reading snapshot {}", path.display()))?;
        serde_json::from_str(&buf).with_context(|| format!("parsing snapshot {}", path.display()))
    }
}

#[derive(Debug, Default)]
pub struct SnapshotBackend {
    snapshot: Mutex<Snapshot>,
    applied: Mutex<Vec<(WindowId, Bounds)>>,
}

impl SnapshotBackend {
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            snapshot: Mutex::new(snapshot),
            applied: Mutex::default(),
        }
    }

    pub fn monitors(&self) -> Vec<Monitor> { self.snapshot.lock().monitors.clone() }

    /// The windows with every applied change folded in.
    pub fn windows(&self) -> Vec<Window> { self.snapshot.lock().windows.clone() }

    /// Every bounds change in the order it was received.
    pub fn applied(&self) -> Vec<(WindowId, Bounds)> { self.applied.lock().clone() }
}

#[async_trait]
impl WindowBackend for SnapshotBackend {
    async fn list_monitors(&self) -> Result<Vec<Monitor>, BackendError> { Ok(self.monitors()) }

    async fn list_windows(&self) -> Result<Vec<Window>, BackendError> { Ok(self.windows()) }

    async fn set_window_bounds(&self, id: WindowId, bounds: Bounds) -> Result<(), BackendError> {
        let mut snapshot = self.snapshot.lock();
        let window = snapshot
            .windows
            .iter_mut()
            .find(|window| window.id == id)
            .ok_or_else(|| BackendError::SetBounds(id, "window not in snapshot".to_string()))?;
        window.bounds = bounds;
        self.applied.lock().push((id, bounds));
        Ok(())
    }

    async fn focused_application(&self) -> Result<Option<FocusedApplication>, BackendError> {
        Ok(self.snapshot.lock().focused.clone())
    }
}
