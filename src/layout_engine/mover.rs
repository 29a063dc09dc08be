//! Structural edits that move an application or window between tree slots.
//!
//! The mover never searches. Callers locate the source and destination first
//! (see [`super::locate`]) and hand over [`VisitDetails`] whose paths are
//! taken at face value. Paths that lead nowhere are silent no-ops.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::{Layout, Path, PathVisitor, PinnedLayout, ScreenSet, walk_path};
use crate::sys::backend::{Monitor, WindowId};

/// A located node: where it is, what it was, and what it holds.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VisitDetails {
    pub location: Path,
    pub layout: Layout,
    pub monitor: Monitor,
    #[serde(default)]
    pub application_name: Option<String>,
    #[serde(default)]
    pub windows: Vec<WindowId>,
    /// The application is held by a `floats` or `zoomed` list of the
    /// `float_zoomed` node at `location`, not by the node itself.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub overlay: bool,
}

/// What a [`move_to`] actually changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MoveOutcome {
    pub removed: bool,
    pub added: bool,
}

impl MoveOutcome {
    pub fn changed(&self) -> bool { self.removed || self.added }
}

struct RemoveSource<'a> {
    application: Option<&'a str>,
    overlay: bool,
    stripped: bool,
}

impl PathVisitor for RemoveSource<'_> {
    /// Whether a slot was emptied.
    type Output = bool;

    fn pass_through(&mut self, node: &mut Layout) {
        if let (Layout::FloatZoomed { floats, zoomed, .. }, Some(application)) = (node, self.application) {
            let before = floats.len() + zoomed.len();
            floats.retain(|float| float.application != application);
            zoomed.retain(|zoom| zoom.application != application);
            self.stripped |= floats.len() + zoomed.len() != before;
        }
    }

    fn found(&mut self, node: &mut Layout) -> bool {
        if self.overlay {
            return false;
        }
        match node {
            Layout::Stack { .. } | Layout::Empty { .. } => false,
            other => {
                *other = Layout::Empty { percentage: other.percentage() };
                true
            }
        }
    }

    // Collapse upwards: the whole slot the source sat in becomes empty, up to
    // the outermost slot that holds no stack.
    fn unwind(&mut self, parent: &mut Layout, index: usize, emptied: bool) -> bool {
        if !emptied {
            return false;
        }
        if let Some(slot) = parent.child_mut(index)
            && !slot.contains_stack()
        {
            *slot = Layout::Empty { percentage: slot.percentage() };
        }
        true
    }
}

struct AddDestination<'a> {
    source: &'a VisitDetails,
    at_root: bool,
}

impl PathVisitor for AddDestination<'_> {
    type Output = bool;

    fn found(&mut self, node: &mut Layout) -> bool {
        if node.is_stack() {
            return false;
        }
        let Some(application) = &self.source.application_name else {
            return false;
        };
        let percentage = match node.percentage() {
            None if self.at_root => Some(100.0),
            p => p,
        };
        let id = match self.source.windows.as_slice() {
            [only] => Some(*only),
            _ => None,
        };
        *node = Layout::Pinned(PinnedLayout {
            percentage,
            id,
            ..PinnedLayout::application(application.clone())
        });
        true
    }
}

/// Vacates the source slot.
///
/// The addressed node becomes `empty` unless it is a stack, and every
/// enclosing split slot without a stack is emptied with it, keeping its
/// percentage. Overlay lists along the way lose the source application; an
/// overlay source is only taken out of those lists.
pub fn remove_source(layout: &mut Layout, source: &VisitDetails) -> bool {
    let mut visitor = RemoveSource {
        application: source.application_name.as_deref(),
        overlay: source.overlay,
        stripped: false,
    };
    let emptied = walk_path(layout, &source.location, &mut visitor).unwrap_or(false);
    emptied || visitor.stripped
}

/// Pins the source application into the destination slot. A stack is
/// never replaced.
pub fn add_destination(layout: &mut Layout, source: &VisitDetails, destination: &VisitDetails) -> bool {
    let mut visitor = AddDestination {
        source,
        at_root: destination.location.is_root(),
    };
    walk_path(layout, &destination.location, &mut visitor).unwrap_or(false)
}

/// Applies a move to whichever screens hold the source and destination.
pub fn move_to(screen_set: &mut ScreenSet, source: &VisitDetails, destination: &VisitDetails) -> MoveOutcome {
    let mut outcome = MoveOutcome::default();

    match screen_set.key_for(&source.monitor) {
        Some(key) => {
            if let Some(layout) = screen_set.get_mut(&key) {
                outcome.removed = remove_source(layout, source);
            }
        }
        None => debug!(monitor = %source.monitor.name, "source monitor is not in the screen-set"),
    }

    match screen_set.key_for(&destination.monitor) {
        Some(key) => {
            if let Some(layout) = screen_set.get_mut(&key) {
                outcome.added = add_destination(layout, source, destination);
            }
        }
        None => debug!(monitor = %destination.monitor.name, "destination monitor is not in the screen-set"),
    }

    debug!(
        from = %source.location,
        to = %destination.location,
        removed = outcome.removed,
        added = outcome.added,
        "moved"
    );
    outcome
}
