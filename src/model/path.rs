//! Addressing nodes inside a single monitor's layout tree.
//!
//! A [`Path`] is the list of child indices from the root. `columns` and
//! `rows` consume one index per level. `float_zoomed` is an overlay, not a
//! split: it consumes no index and the path continues into its nested
//! layout.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::layout::Layout;

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct Path(Vec<usize>);

impl Path {
    pub fn root() -> Self { Self::default() }

    pub fn child(&self, index: usize) -> Self {
        let mut indices = self.0.clone();
        indices.push(index);
        Path(indices)
    }

    pub fn indices(&self) -> &[usize] { &self.0 }

    pub fn is_root(&self) -> bool { self.0.is_empty() }
}

impl From<Vec<usize>> for Path {
    fn from(indices: Vec<usize>) -> Self { Path(indices) }
}

impl<const N: usize> From<[usize; N]> for Path {
    fn from(indices: [usize; N]) -> Self { Path(indices.to_vec()) }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, index) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{index}")?;
        }
        f.write_str("]")
    }
}

/// Callbacks for [`walk_path`].
pub trait PathVisitor {
    type Output;

    /// Called on every node the walk passes through, including the target.
    fn pass_through(&mut self, _node: &mut Layout) {}

    /// Called once on the node the path points at.
    fn found(&mut self, node: &mut Layout) -> Self::Output;

    /// Called on the way back up, on each split whose child at `index` lies
    /// on the path, innermost first.
    fn unwind(&mut self, _parent: &mut Layout, _index: usize, output: Self::Output) -> Self::Output { output }
}

/// Walks `path` down from `root` and hands the addressed node to `visitor`.
///
/// Returns `None` without calling [`PathVisitor::found`] if the path leaves
/// the tree: an index out of range, or an index into a node that has no
/// children.
pub fn walk_path<V: PathVisitor>(root: &mut Layout, path: &Path, visitor: &mut V) -> Option<V::Output> {
    descend(root, path.indices(), visitor)
}

fn descend<V: PathVisitor>(node: &mut Layout, rest: &[usize], visitor: &mut V) -> Option<V::Output> {
    visitor.pass_through(node);
    match node {
        Layout::FloatZoomed { layout, .. } => descend(layout, rest, visitor),
        _ => match rest.split_first() {
            None => Some(visitor.found(node)),
            Some((&index, tail)) => {
                let output = descend(node.child_mut(index)?, tail, visitor)?;
                Some(visitor.unwind(node, index, output))
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Kind {
        passed: Vec<&'static str>,
        unwound: Vec<(&'static str, usize)>,
    }

    impl PathVisitor for Kind {
        type Output = &'static str;

        fn pass_through(&mut self, node: &mut Layout) { self.passed.push(node.kind()); }

        fn found(&mut self, node: &mut Layout) -> Self::Output { node.kind() }

        fn unwind(&mut self, parent: &mut Layout, index: usize, output: Self::Output) -> Self::Output {
            self.unwound.push((parent.kind(), index));
            output
        }
    }

    fn tree() -> Layout {
        Layout::columns(vec![
            Layout::stack(50.0),
            Layout::FloatZoomed {
                percentage: Some(50.0),
                layout: Box::new(Layout::rows(vec![Layout::empty(50.0), Layout::pinned("Mail", 50.0)])),
                floats: vec![],
                zoomed: vec![],
            },
        ])
    }

    #[test]
    fn walks_to_nested_nodes() {
        let mut layout = tree();
        let mut kind = Kind::default();
        let found = walk_path(&mut layout, &Path::from([1, 1]), &mut kind).unwrap();
        assert_eq!(found, "pinned");
        assert_eq!(kind.passed, vec!["columns", "float_zoomed", "rows", "pinned"]);
        // The overlay is not a split, so only the rows and the root unwind.
        assert_eq!(kind.unwound, vec![("rows", 1), ("columns", 1)]);
    }

    #[test]
    fn root_path_addresses_the_root() {
        let mut layout = tree();
        let mut kind = Kind::default();
        let found = walk_path(&mut layout, &Path::root(), &mut kind).unwrap();
        assert_eq!(found, "columns");
        assert!(kind.unwound.is_empty());
    }

    #[test]
    fn invalid_paths_return_none() {
        let mut layout = tree();
        let mut kind = Kind::default();
        assert!(walk_path(&mut layout, &Path::from([2]), &mut kind).is_none());
        assert!(walk_path(&mut layout, &Path::from([0, 0]), &mut kind).is_none());
        assert!(walk_path(&mut layout, &Path::from([1, 1, 0]), &mut kind).is_none());
        assert!(kind.unwound.is_empty());
    }

    #[test]
    fn display_and_child() {
        let path = Path::root().child(0).child(3);
        assert_eq!(path.to_string(), "[0,3]");
        assert_eq!(Path::root().to_string(), "[]");
        assert!(Path::root().is_root());
    }
}
