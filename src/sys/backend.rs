//! The contract between the engine and the platform window system.
//!
//! The engine never talks to the OS directly. Everything it knows about
//! monitors and windows comes through a [`WindowBackend`], and every change
//! it makes goes back out through [`WindowBackend::set_window_bounds`].

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::geometry::Bounds;

/// An identifier for a native window.
///
/// Stable for the lifetime of the window on the OS side.
#[derive(Serialize, Deserialize, Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(transparent)]
pub struct WindowId(pub u32);

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "#{}", self.0) }
}

#[allow(non_camel_case_types)]
pub type pid_t = i32;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Monitor {
    pub id: u32,
    pub name: String,
    pub bounds: Bounds,
    #[serde(default)]
    pub main: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Window {
    pub id: WindowId,
    #[serde(default)]
    pub title: String,
    pub application: String,
    pub bounds: Bounds,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct FocusedWindowRef {
    pub id: WindowId,
}

/// What the backend reports about the frontmost application.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FocusedApplication {
    pub name: String,
    pub pid: pid_t,
    #[serde(default)]
    pub bundle_id: Option<String>,
    #[serde(default)]
    pub window: Option<FocusedWindowRef>,
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("listing monitors failed: {0}")]
    ListMonitors(String),
    #[error("listing windows failed: {0}")]
    ListWindows(String),
    #[error("setting bounds of window {0} failed: {1}")]
    SetBounds(WindowId, String),
    #[error("querying the focused application failed: {0}")]
    FocusedApplication(String),
}

/// A per-platform binding to the native window system.
///
/// Every method is a suspension point for the engine; implementations are
/// free to block on OS calls inside them.
#[async_trait]
pub trait WindowBackend: Send + Sync + 'static {
    async fn list_monitors(&self) -> Result<Vec<Monitor>, BackendError>;

    async fn list_windows(&self) -> Result<Vec<Window>, BackendError>;

    async fn set_window_bounds(&self, id: WindowId, bounds: Bounds) -> Result<(), BackendError>;

    async fn focused_application(&self) -> Result<Option<FocusedApplication>, BackendError>;
}
