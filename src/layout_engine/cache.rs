use std::collections::BTreeMap;

use tracing::trace;

use crate::common::collections::HashMap;
use crate::common::config::HostSettings;
use crate::model::PinnedLayout;
use crate::sys::backend::{BackendError, Monitor, Window, WindowBackend, WindowId};
use crate::sys::geometry::Bounds;

/// The last polled view of the window system.
///
/// Rebuilt wholesale on every refresh. Between refreshes the only change
/// is the bounds shadow written by [`Caches::set_shadow_bounds`].
#[derive(Debug, Clone, Default)]
pub struct Caches {
    monitors_by_name: BTreeMap<String, Monitor>,
    windows_by_id: BTreeMap<WindowId, Window>,
    windows_by_application: HashMap<String, BTreeMap<WindowId, Window>>,
}

impl Caches {
    pub async fn refresh<B: WindowBackend + ?Sized>(
        backend: &B,
        host: &HostSettings,
    ) -> Result<Self, BackendError> {
        let monitors = backend.list_monitors().await?;
        let windows = backend.list_windows().await?;
        Ok(Self::rebuild(monitors, windows, host))
    }

    pub fn rebuild(monitors: Vec<Monitor>, windows: Vec<Window>, host: &HostSettings) -> Self {
        let monitors_by_name =
            monitors.into_iter().map(|monitor| (monitor.name.clone(), monitor)).collect();

        let mut windows_by_id = BTreeMap::new();
        let mut windows_by_application: HashMap<String, BTreeMap<WindowId, Window>> =
            HashMap::default();
        for window in windows {
            if host.owns_window(&window) {
                trace!(id = %window.id, title = %window.title, "skipping host window");
                continue;
            }
            windows_by_application
                .entry(window.application.clone())
                .or_default()
                .insert(window.id, window.clone());
            windows_by_id.insert(window.id, window);
        }

        Self {
            monitors_by_name,
            windows_by_id,
            windows_by_application,
        }
    }

    pub fn monitors(&self) -> impl Iterator<Item = &Monitor> + Clone { self.monitors_by_name.values() }

    pub fn monitor(&self, name: &str) -> Option<&Monitor> { self.monitors_by_name.get(name) }

    pub fn main_monitor(&self) -> Option<&Monitor> { self.monitors().find(|monitor| monitor.main) }

    pub fn windows(&self) -> impl Iterator<Item = &Window> { self.windows_by_id.values() }

    pub fn window(&self, id: WindowId) -> Option<&Window> { self.windows_by_id.get(&id) }

    pub fn contains_window(&self, id: WindowId) -> bool { self.windows_by_id.contains_key(&id) }

    pub fn application_windows(&self, application: &str) -> impl Iterator<Item = &Window> {
        self.windows_by_application.get(application).into_iter().flat_map(BTreeMap::values)
    }

    /// The windows a pinned entry claims, in id order.
    pub fn windows_matching<'a>(&'a self, pinned: &'a PinnedLayout) -> impl Iterator<Item = &'a Window> {
        self.application_windows(&pinned.application).filter(move |window| pinned.matches(window))
    }

    /// Records bounds the engine has just asked the backend for, so later
    /// placement steps see them before the next refresh does.
    pub fn set_shadow_bounds(&mut self, id: WindowId, bounds: Bounds) {
        let Some(window) = self.windows_by_id.get_mut(&id) else {
            return;
        };
        window.bounds = bounds;
        if let Some(entry) = self
            .windows_by_application
            .get_mut(&window.application)
            .and_then(|windows| windows.get_mut(&id))
        {
            entry.bounds = bounds;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::window_manager::testing::{FakeBackend, monitor, window};

    fn host() -> HostSettings {
        HostSettings {
            name: Some("Modal Commander".to_string()),
            bundle_id: None,
            window_titles: vec!["Command Palette".to_string()],
        }
    }

    #[test]
    fn rebuild_indexes_windows_by_application() {
        let caches = Caches::rebuild(
            vec![monitor(1, "MSI PS341WU", true, 0.0)],
            vec![window(1, "Mail", "Inbox"), window(2, "Mail", "Drafts"), window(3, "Notes", "")],
            &HostSettings::default(),
        );

        let mail: Vec<_> = caches.application_windows("Mail").map(|w| w.id).collect();
        assert_eq!(mail, vec![WindowId(1), WindowId(2)]);
        assert_eq!(caches.application_windows("Missing").count(), 0);
        assert_eq!(caches.windows().count(), 3);
        assert_eq!(caches.main_monitor().map(|m| m.id), Some(1));
        assert!(caches.monitor("MSI PS341WU").is_some());
    }

    #[test]
    fn rebuild_skips_host_windows() {
        let caches = Caches::rebuild(
            vec![],
            vec![
                window(1, "Mail", "Inbox"),
                window(2, "Launcher", "Command Palette"),
                window(3, "Modal Commander", "Settings"),
            ],
            &host(),
        );
        let ids: Vec<_> = caches.windows().map(|w| w.id).collect();
        assert_eq!(ids, vec![WindowId(1)]);
    }

    #[test]
    fn windows_matching_respects_title() {
        let caches = Caches::rebuild(
            vec![],
            vec![window(1, "Mail", "Inbox"), window(2, "Mail", "Drafts")],
            &HostSettings::default(),
        );
        let pinned = PinnedLayout {
            title: Some("Drafts".to_string()),
            ..PinnedLayout::application("Mail")
        };
        let ids: Vec<_> = caches.windows_matching(&pinned).map(|w| w.id).collect();
        assert_eq!(ids, vec![WindowId(2)]);
    }

    #[test]
    fn shadow_bounds_update_both_indexes() {
        let mut caches =
            Caches::rebuild(vec![], vec![window(1, "Mail", "Inbox")], &HostSettings::default());
        let bounds = Bounds::new(10.0, 10.0, 500.0, 400.0);
        caches.set_shadow_bounds(WindowId(1), bounds);
        caches.set_shadow_bounds(WindowId(99), bounds);
        assert_eq!(caches.window(WindowId(1)).map(|w| w.bounds), Some(bounds));
        assert_eq!(caches.application_windows("Mail").next().map(|w| w.bounds), Some(bounds));
    }

    #[tokio::test]
    async fn refresh_propagates_backend_failures() {
        let backend = FakeBackend::new(vec![monitor(1, "Main", true, 0.0)], vec![]);
        backend.fail_listing(true);
        assert!(Caches::refresh(&backend, &HostSettings::default()).await.is_err());

        backend.fail_listing(false);
        let caches = Caches::refresh(&backend, &HostSettings::default()).await.unwrap();
        assert_eq!(caches.monitors().count(), 1);
    }
}
