//! Finding where an application or window currently lives in the tree.
//!
//! Produces the [`VisitDetails`] the mover consumes.

use tracing::trace;

use super::cache::Caches;
use super::mover::VisitDetails;
use crate::common::collections::HashMap;
use crate::model::{Layout, Path, PinnedLayout, ScreenSet};
use crate::sys::backend::{Monitor, Window, WindowId};

fn preorder<'a>(layout: &'a Layout, path: Path, f: &mut impl FnMut(&Path, &'a Layout)) {
    f(&path, layout);
    match layout {
        Layout::FloatZoomed { layout: inner, .. } => preorder(inner, path, f),
        other => {
            for (i, child) in other.children().iter().enumerate() {
                preorder(child, path.child(i), f);
            }
        }
    }
}

/// Screens of `screen_set` with their monitors, non-main first.
fn screens<'a>(screen_set: &'a ScreenSet, caches: &'a Caches) -> Vec<(&'a Monitor, &'a Layout)> {
    let mut screens: Vec<_> = screen_set
        .iter()
        .filter_map(|(key, layout)| key.resolve(caches.monitors()).map(|monitor| (monitor, layout)))
        .collect();
    screens.sort_by_key(|(monitor, _)| monitor.main);
    screens
}

/// Every node of every connected screen in pre-order.
///
/// An overlay shares its path with its nested layout, so both appear with
/// the same location. Pinned nodes list the windows they match.
pub fn visit_screen_set(screen_set: &ScreenSet, caches: &Caches) -> Vec<VisitDetails> {
    let mut visits = Vec::new();
    for (monitor, root) in screens(screen_set, caches) {
        preorder(root, Path::root(), &mut |path, node| {
            let (application_name, windows) = match node {
                Layout::Pinned(pinned) => (
                    Some(pinned.application.clone()),
                    caches.windows_matching(pinned).map(|w| w.id).collect(),
                ),
                _ => (None, Vec::new()),
            };
            visits.push(VisitDetails {
                location: path.clone(),
                layout: node.clone(),
                monitor: monitor.clone(),
                application_name,
                windows,
                overlay: false,
            });
        });
    }
    visits
}

fn in_overlay(node: &Layout, matches: impl Fn(&PinnedLayout) -> bool) -> bool {
    match node {
        Layout::FloatZoomed { floats, zoomed, .. } => floats.iter().chain(zoomed).any(matches),
        _ => false,
    }
}

/// A node found by a search, and whether the match was one of its overlay
/// entries rather than the node itself.
struct Found {
    monitor: Monitor,
    location: Path,
    layout: Layout,
    overlay: bool,
}

/// The first node in reconciliation order whose claim matches.
fn find_claim(screen_set: &ScreenSet, caches: &Caches, matches: impl Fn(&PinnedLayout) -> bool) -> Option<Found> {
    for (monitor, root) in screens(screen_set, caches) {
        let mut found = None;
        preorder(root, Path::root(), &mut |path, node| {
            if found.is_some() {
                return;
            }
            let claimed = match node {
                Layout::Pinned(pinned) => matches(pinned).then_some(false),
                other => in_overlay(other, &matches).then_some(true),
            };
            if let Some(overlay) = claimed {
                found = Some((path.clone(), node.clone(), overlay));
            }
        });
        if let Some((location, layout, overlay)) = found {
            return Some(Found {
                monitor: monitor.clone(),
                location,
                layout,
                overlay,
            });
        }
    }
    None
}

/// The first stack on the screen that absorbs unclaimed `windows`.
fn find_stack(
    screen_set: &ScreenSet,
    caches: &Caches,
    located_at: &HashMap<WindowId, String>,
    windows: &[WindowId],
) -> Option<Found> {
    let located = windows
        .iter()
        .find_map(|id| located_at.get(id))
        .and_then(|name| caches.monitor(name))
        .filter(|monitor| !monitor.main);

    let monitor = match located {
        Some(monitor) if screen_set.key_for(monitor).is_some() => monitor,
        _ => caches.main_monitor()?,
    };
    let root = screen_set.get(&screen_set.key_for(monitor)?)?;

    let mut found = None;
    preorder(root, Path::root(), &mut |path, node| {
        if found.is_none() && node.is_stack() {
            found = Some((path.clone(), node.clone()));
        }
    });
    found.map(|(location, layout)| Found {
        monitor: monitor.clone(),
        location,
        layout,
        overlay: false,
    })
}

/// Where `application` sits: its first pin or overlay entry, otherwise the
/// stack holding its windows.
pub fn locate_application(
    screen_set: &ScreenSet,
    caches: &Caches,
    located_at: &HashMap<WindowId, String>,
    application: &str,
) -> Option<VisitDetails> {
    let windows: Vec<WindowId> = caches.application_windows(application).map(|w| w.id).collect();
    let found = find_claim(screen_set, caches, |pinned| pinned.application == application)
        .or_else(|| find_stack(screen_set, caches, located_at, &windows))?;
    trace!(%application, location = %found.location, monitor = %found.monitor.name, "located application");
    Some(VisitDetails {
        location: found.location,
        layout: found.layout,
        monitor: found.monitor,
        application_name: Some(application.to_string()),
        windows,
        overlay: found.overlay,
    })
}

/// Where one window sits. Pins narrowed to other windows of the same
/// application do not match.
pub fn locate_window(
    screen_set: &ScreenSet,
    caches: &Caches,
    located_at: &HashMap<WindowId, String>,
    id: WindowId,
) -> Option<VisitDetails> {
    let window: &Window = caches.window(id)?;
    let found = find_claim(screen_set, caches, |pinned| pinned.matches(window))
        .or_else(|| find_stack(screen_set, caches, located_at, &[id]))?;
    trace!(window = %id, location = %found.location, monitor = %found.monitor.name, "located window");
    Some(VisitDetails {
        location: found.location,
        layout: found.layout,
        monitor: found.monitor,
        application_name: Some(window.application.clone()),
        windows: vec![id],
        overlay: found.overlay,
    })
}
