use serde::{Deserialize, Serialize};

use crate::sys::backend::{Window, pid_t};

/// The frontmost application as last seen by the focus poller, with its
/// windows taken from the window cache at the time of the check.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub name: String,
    pub pid: pid_t,
    pub bundle_id: Option<String>,
    pub windows: Vec<Window>,
    pub focused_window: Option<Window>,
}

impl Application {
    /// Whether two observations describe the same focus target.
    pub fn same_focus(&self, other: &Application) -> bool {
        self.pid == other.pid
            && self.name == other.name
            && self.focused_window.as_ref().map(|w| w.id) == other.focused_window.as_ref().map(|w| w.id)
    }
}
