use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use strum::IntoStaticStr;

use crate::sys::backend::{Monitor, Window, WindowId};

/// The literal key that stands for "whichever monitor is main" in a
/// serialized screen-set.
pub const SCREEN_PRIMARY: &str = "$PRIMARY";

/// A leaf that claims the windows of one application, optionally narrowed
/// to a single window by title or id.
///
/// Also used as the entry type of the `floats`, `zoomed` and stack
/// `windows` lists.
#[skip_serializing_none]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct PinnedLayout {
    pub percentage: Option<f64>,
    pub application: String,
    pub title: Option<String>,
    pub id: Option<WindowId>,
}

impl PinnedLayout {
    pub fn application(application: impl Into<String>) -> Self {
        Self {
            application: application.into(),
            ..Default::default()
        }
    }

    pub fn matches(&self, window: &Window) -> bool {
        if window.application != self.application {
            return false;
        }
        if let Some(id) = self.id {
            return window.id == id;
        }
        match &self.title {
            Some(title) => *title == window.title,
            None => true,
        }
    }
}

#[skip_serializing_none]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, IntoStaticStr)]
#[serde(tag = "type", rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Layout {
    Columns {
        percentage: Option<f64>,
        columns: Vec<Layout>,
    },
    Rows {
        percentage: Option<f64>,
        rows: Vec<Layout>,
    },
    Stack {
        percentage: Option<f64>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        windows: Vec<PinnedLayout>,
    },
    Pinned(PinnedLayout),
    Empty {
        percentage: Option<f64>,
    },
    FloatZoomed {
        percentage: Option<f64>,
        layout: Box<Layout>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        floats: Vec<PinnedLayout>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        zoomed: Vec<PinnedLayout>,
    },
}

impl Layout {
    pub fn stack(percentage: f64) -> Self {
        Layout::Stack {
            percentage: Some(percentage),
            windows: Vec::new(),
        }
    }

    pub fn empty(percentage: f64) -> Self { Layout::Empty { percentage: Some(percentage) } }

    pub fn pinned(application: impl Into<String>, percentage: f64) -> Self {
        Layout::Pinned(PinnedLayout {
            percentage: Some(percentage),
            ..PinnedLayout::application(application)
        })
    }

    pub fn columns(columns: Vec<Layout>) -> Self {
        Layout::Columns { percentage: None, columns }
    }

    pub fn rows(rows: Vec<Layout>) -> Self { Layout::Rows { percentage: None, rows } }

    pub fn kind(&self) -> &'static str { self.into() }

    pub fn percentage(&self) -> Option<f64> {
        match self {
            Layout::Columns { percentage, .. }
            | Layout::Rows { percentage, .. }
            | Layout::Stack { percentage, .. }
            | Layout::Empty { percentage }
            | Layout::FloatZoomed { percentage, .. } => *percentage,
            Layout::Pinned(pinned) => pinned.percentage,
        }
    }

    pub fn is_stack(&self) -> bool { matches!(self, Layout::Stack { .. }) }

    /// The split children of a `columns` or `rows` node. Every other node
    /// has none; `float_zoomed` is not a split and exposes its nested layout
    /// through path traversal instead.
    pub fn children(&self) -> &[Layout] {
        match self {
            Layout::Columns { columns, .. } => columns,
            Layout::Rows { rows, .. } => rows,
            _ => &[],
        }
    }

    pub fn child_mut(&mut self, index: usize) -> Option<&mut Layout> {
        match self {
            Layout::Columns { columns, .. } => columns.get_mut(index),
            Layout::Rows { rows, .. } => rows.get_mut(index),
            _ => None,
        }
    }

    pub fn contains_stack(&self) -> bool {
        match self {
            Layout::Stack { .. } => true,
            Layout::FloatZoomed { layout, .. } => layout.contains_stack(),
            other => other.children().iter().any(Layout::contains_stack),
        }
    }

    /// Every percentage in the tree that falls outside `0..=100`, as
    /// human-readable issues.
    pub fn percentage_issues(&self) -> Vec<String> {
        let mut issues = Vec::new();
        self.collect_percentage_issues(&mut issues);
        issues
    }

    fn collect_percentage_issues(&self, issues: &mut Vec<String>) {
        if let Some(p) = self.percentage()
            && !(0.0..=100.0).contains(&p)
        {
            issues.push(format!("{} node has percentage {p} outside 0..=100", self.kind()));
        }
        match self {
            Layout::FloatZoomed { layout, .. } => layout.collect_percentage_issues(issues),
            other => {
                for child in other.children() {
                    child.collect_percentage_issues(issues);
                }
            }
        }
    }
}

/// The key of one entry in a [`ScreenSet`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(from = "String", into = "String")]
pub enum ScreenKey {
    Named(String),
    Primary,
}

impl ScreenKey {
    pub fn named(name: impl Into<String>) -> Self { ScreenKey::Named(name.into()) }

    pub fn matches(&self, monitor: &Monitor) -> bool {
        match self {
            ScreenKey::Named(name) => *name == monitor.name,
            ScreenKey::Primary => monitor.main,
        }
    }

    /// Finds the connected monitor this key refers to.
    pub fn resolve<'a>(&self, monitors: impl IntoIterator<Item = &'a Monitor>) -> Option<&'a Monitor> {
        monitors.into_iter().find(|monitor| self.matches(monitor))
    }
}

impl From<String> for ScreenKey {
    fn from(s: String) -> Self {
        if s == SCREEN_PRIMARY {
            ScreenKey::Primary
        } else {
            ScreenKey::Named(s)
        }
    }
}

impl From<ScreenKey> for String {
    fn from(key: ScreenKey) -> Self {
        match key {
            ScreenKey::Named(name) => name,
            ScreenKey::Primary => SCREEN_PRIMARY.to_string(),
        }
    }
}

impl fmt::Display for ScreenKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScreenKey::Named(name) => f.write_str(name),
            ScreenKey::Primary => f.write_str(SCREEN_PRIMARY),
        }
    }
}

/// One root layout per monitor.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(transparent)]
pub struct ScreenSet(BTreeMap<ScreenKey, Layout>);

impl ScreenSet {
    pub fn new() -> Self { Self::default() }

    pub fn single(key: ScreenKey, layout: Layout) -> Self {
        let mut set = Self::new();
        set.insert(key, layout);
        set
    }

    pub fn insert(&mut self, key: ScreenKey, layout: Layout) -> Option<Layout> {
        self.0.insert(key, layout)
    }

    pub fn get(&self, key: &ScreenKey) -> Option<&Layout> { self.0.get(key) }

    pub fn get_mut(&mut self, key: &ScreenKey) -> Option<&mut Layout> { self.0.get_mut(key) }

    pub fn iter(&self) -> impl Iterator<Item = (&ScreenKey, &Layout)> { self.0.iter() }

    pub fn len(&self) -> usize { self.0.len() }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    /// Resolves every key against the connected monitors, or `None` if any
    /// key has no monitor.
    pub fn resolve_all<'a, 'm, M>(&'a self, monitors: M) -> Option<Vec<(&'a ScreenKey, &'m Monitor, &'a Layout)>>
    where M: IntoIterator<Item = &'m Monitor> + Clone {
        self.0
            .iter()
            .map(|(key, layout)| key.resolve(monitors.clone()).map(|monitor| (key, monitor, layout)))
            .collect()
    }

    /// The first key with no connected monitor, if any.
    pub fn first_unresolved<'m, M>(&self, monitors: M) -> Option<&ScreenKey>
    where M: IntoIterator<Item = &'m Monitor> + Clone {
        self.0.keys().find(|key| key.resolve(monitors.clone()).is_none())
    }

    pub fn matches(&self, monitors: &[Monitor]) -> bool { self.resolve_all(monitors).is_some() }

    /// The key whose layout is shown on `monitor`. An exact name wins over
    /// the `$PRIMARY` alias.
    pub fn key_for(&self, monitor: &Monitor) -> Option<ScreenKey> {
        let named = ScreenKey::Named(monitor.name.clone());
        if self.0.contains_key(&named) {
            return Some(named);
        }
        (monitor.main && self.0.contains_key(&ScreenKey::Primary)).then_some(ScreenKey::Primary)
    }
}

impl Default for Layout {
    fn default() -> Self { Layout::columns(vec![Layout::stack(100.0)]) }
}

/// The screen-set in effect before anyone calls `set_layout`: a single
/// full-width stack on the main monitor.
pub fn default_screen_set() -> ScreenSet { ScreenSet::single(ScreenKey::Primary, Layout::default()) }

/// Picks the first screen-set whose every key resolves to a connected monitor.
pub fn find_matching_screen_set<'a>(
    layouts: impl IntoIterator<Item = &'a ScreenSet>,
    monitors: &[Monitor],
) -> Option<&'a ScreenSet> {
    layouts.into_iter().find(|set| set.matches(monitors))
}
