//! Turning a screen-set into concrete window bounds.
//!
//! Placement is pure: it reads the caches and the tree and returns a
//! [`Placement`] describing where every claimed window should go, plus a
//! side table of resolved bounds per tree path. Applying the result is the
//! reconciler's job.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_with::serde_as;
use thiserror::Error;
use tracing::{debug, trace, warn};

use super::cache::Caches;
use crate::common::collections::{HashMap, HashSet};
use crate::model::{Layout, Path, PinnedLayout, ScreenKey, ScreenSet};
use crate::sys::backend::{Monitor, WindowId};
use crate::sys::geometry::{Bounds, Round};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PlacementError {
    #[error("no connected monitor for screen `{0}`")]
    MissingScreen(ScreenKey),
}

/// Resolved bounds and occupants of one addressed node.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct NodeInfo {
    pub kind: &'static str,
    pub bounds: Bounds,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub windows: Vec<WindowId>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct StackSlot {
    pub path: Path,
    pub bounds: Bounds,
}

/// Everything placement decided for one monitor.
#[serde_as]
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScreenPlacement {
    pub key: ScreenKey,
    pub monitor: Monitor,
    #[serde_as(as = "Vec<(_, _)>")]
    pub nodes: BTreeMap<Path, NodeInfo>,
    pub stack: Option<StackSlot>,
    /// Claimed by a `floats` list: excluded from the stack, never moved.
    pub floating: Vec<WindowId>,
    /// Claimed by a `zoomed` list: placed over the whole monitor.
    pub zoomed: Vec<WindowId>,
    /// Windows destined for this screen's stack that stayed put because
    /// the screen has no stack.
    pub unplaced: Vec<WindowId>,
}

/// The outcome of planning one screen-set.
#[derive(Serialize, Debug, Clone, PartialEq, Default)]
pub struct Placement {
    /// In reconciliation order: every non-main screen, then the main one.
    pub screens: Vec<ScreenPlacement>,
    /// Target bounds per window in the order they were decided. Rounded to
    /// whole pixels.
    pub assignments: Vec<(WindowId, Bounds)>,
}

impl Placement {
    pub fn screen(&self, key: &ScreenKey) -> Option<&ScreenPlacement> {
        self.screens.iter().find(|screen| screen.key == *key)
    }

    pub fn bounds_for(&self, id: WindowId) -> Option<Bounds> {
        self.assignments.iter().rev().find(|(wid, _)| *wid == id).map(|(_, bounds)| *bounds)
    }
}

/// Plans a full reconciliation pass for `screen_set`.
///
/// `located_at` maps windows that were explicitly sent to a stack on a
/// non-main monitor to that monitor's name. Every other unclaimed window
/// belongs to the main monitor's stack.
pub fn plan(
    screen_set: &ScreenSet,
    caches: &Caches,
    located_at: &HashMap<WindowId, String>,
) -> Result<Placement, PlacementError> {
    let Some(mut screens) = screen_set.resolve_all(caches.monitors()) else {
        let key = screen_set.first_unresolved(caches.monitors()).cloned().unwrap_or(ScreenKey::Primary);
        return Err(PlacementError::MissingScreen(key));
    };
    // Stable, so non-main screens keep their key order.
    screens.sort_by_key(|(_, monitor, _)| monitor.main);

    let mut claimed = HashSet::default();
    let mut placement = Placement::default();

    for (key, monitor, layout) in screens {
        let mut walker = Walker::new(key.clone(), monitor.clone(), caches, &mut claimed);
        walker.walk(layout, Path::root(), monitor.bounds);
        let (mut screen, assignments) = walker.finish();
        placement.assignments.extend(assignments);

        let occupants: Vec<WindowId> = caches
            .windows()
            .map(|window| window.id)
            .filter(|id| !claimed.contains(id))
            .filter(|id| match located_at.get(id) {
                Some(name) if !monitor.main => *name == monitor.name,
                Some(name) => screen_set_owner(screen_set, caches, name).is_none(),
                None => monitor.main,
            })
            .collect();

        match &screen.stack {
            Some(stack) => {
                let bounds = stack.bounds.round();
                for id in &occupants {
                    trace!(window = %id, screen = %key, "stacking");
                    claimed.insert(*id);
                    placement.assignments.push((*id, bounds));
                }
                if let Some(node) = screen.nodes.get_mut(&stack.path) {
                    node.windows.extend(occupants.iter().copied());
                }
            }
            None if !occupants.is_empty() => {
                warn!(
                    screen = %key,
                    count = occupants.len(),
                    "screen has no stack; leaving unclaimed windows where they are"
                );
                screen.unplaced = occupants;
            }
            None => {}
        }

        placement.screens.push(screen);
    }

    debug!(
        screens = placement.screens.len(),
        assignments = placement.assignments.len(),
        "planned layout"
    );
    Ok(placement)
}

/// The screen-set key that puts `monitor_name` on screen, if the monitor is
/// both connected and part of the set.
fn screen_set_owner<'a>(screen_set: &'a ScreenSet, caches: &Caches, monitor_name: &str) -> Option<&'a Layout> {
    let monitor = caches.monitor(monitor_name)?;
    if monitor.main {
        return None;
    }
    screen_set.key_for(monitor).and_then(|key| screen_set.get(&key))
}

struct Walker<'a> {
    caches: &'a Caches,
    claimed: &'a mut HashSet<WindowId>,
    screen: ScreenPlacement,
    assignments: Vec<(WindowId, Bounds)>,
}

impl<'a> Walker<'a> {
    fn new(key: ScreenKey, monitor: Monitor, caches: &'a Caches, claimed: &'a mut HashSet<WindowId>) -> Self {
        Self {
            caches,
            claimed,
            screen: ScreenPlacement {
                key,
                monitor,
                nodes: BTreeMap::new(),
                stack: None,
                floating: Vec::new(),
                zoomed: Vec::new(),
                unplaced: Vec::new(),
            },
            assignments: Vec::new(),
        }
    }

    fn finish(self) -> (ScreenPlacement, Vec<(WindowId, Bounds)>) { (self.screen, self.assignments) }

    fn record(&mut self, path: &Path, layout: &Layout, bounds: Bounds, windows: Vec<WindowId>) {
        self.screen.nodes.insert(path.clone(), NodeInfo {
            kind: layout.kind(),
            bounds,
            windows,
        });
    }

    /// Claims every not-yet-claimed window matching `pinned`.
    fn claim(&mut self, pinned: &PinnedLayout) -> Vec<WindowId> {
        let mut ids = Vec::new();
        for window in self.caches.windows_matching(pinned) {
            if self.claimed.insert(window.id) {
                ids.push(window.id);
            }
        }
        ids
    }

    fn walk(&mut self, layout: &Layout, path: Path, bounds: Bounds) {
        match layout {
            Layout::Columns { columns, .. } => {
                self.record(&path, layout, bounds, vec![]);
                let mut offset = 0.0;
                for (i, column) in columns.iter().enumerate() {
                    let slice = bounds.column(offset, column.percentage().unwrap_or(0.0));
                    self.walk(column, path.child(i), slice);
                    offset += slice.width;
                }
            }
            Layout::Rows { rows, .. } => {
                self.record(&path, layout, bounds, vec![]);
                let mut offset = 0.0;
                for (i, row) in rows.iter().enumerate() {
                    let slice = bounds.row(offset, row.percentage().unwrap_or(0.0));
                    self.walk(row, path.child(i), slice);
                    offset += slice.height;
                }
            }
            Layout::Pinned(pinned) => {
                let ids = self.claim(pinned);
                let target = bounds.round();
                for id in &ids {
                    trace!(window = %id, application = %pinned.application, "pinning");
                    self.assignments.push((*id, target));
                }
                self.record(&path, layout, bounds, ids);
            }
            Layout::Stack { .. } => {
                if let Some(existing) = &self.screen.stack {
                    warn!(
                        screen = %self.screen.key,
                        first = %existing.path,
                        ignored = %path,
                        "more than one stack on screen; using the first"
                    );
                } else {
                    self.screen.stack = Some(StackSlot { path: path.clone(), bounds });
                }
                self.record(&path, layout, bounds, vec![]);
            }
            Layout::Empty { .. } => self.record(&path, layout, bounds, vec![]),
            Layout::FloatZoomed { layout: inner, floats, zoomed, .. } => {
                for float in floats {
                    let ids = self.claim(float);
                    self.screen.floating.extend(ids);
                }
                let full = self.screen.monitor.bounds.round();
                for zoom in zoomed {
                    let ids = self.claim(zoom);
                    for id in &ids {
                        trace!(window = %id, application = %zoom.application, "zooming");
                        self.assignments.push((*id, full));
                    }
                    self.screen.zoomed.extend(ids);
                }
                self.walk(inner, path, bounds);
            }
        }
    }
}
