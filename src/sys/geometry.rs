//! Pixel rectangles and the comparison helpers used to decide whether a
//! window already sits where the layout wants it.

use serde::{Deserialize, Serialize};

/// A rectangle in global screen coordinates, as reported by the backend.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn max_x(&self) -> f64 { self.x + self.width }

    pub fn max_y(&self) -> f64 { self.y + self.height }

    /// Slice `share` percent of the width starting `offset` pixels from the left edge.
    pub fn column(&self, offset: f64, share: f64) -> Self {
        Self {
            x: self.x + offset,
            width: self.width * share / 100.0,
            ..*self
        }
    }

    /// Slice `share` percent of the height starting `offset` pixels from the top edge.
    pub fn row(&self, offset: f64, share: f64) -> Self {
        Self {
            y: self.y + offset,
            height: self.height * share / 100.0,
            ..*self
        }
    }
}

pub trait Round {
    fn round(&self) -> Self;
}

impl Round for Bounds {
    // Rounds the edges rather than the size so that adjacent slices keep
    // sharing an edge after rounding.
    fn round(&self) -> Self {
        let min_x = self.x.round();
        let min_y = self.y.round();
        let max_x = self.max_x().round();
        let max_y = self.max_y().round();
        Bounds {
            x: min_x,
            y: min_y,
            width: max_x - min_x,
            height: max_y - min_y,
        }
    }
}

pub trait IsWithin {
    fn is_within(&self, how_much: f64, other: Self) -> bool;
}

impl IsWithin for Bounds {
    fn is_within(&self, how_much: f64, other: Self) -> bool {
        self.x.is_within(how_much, other.x)
            && self.y.is_within(how_much, other.y)
            && self.width.is_within(how_much, other.width)
            && self.height.is_within(how_much, other.height)
    }
}

impl IsWithin for f64 {
    fn is_within(&self, how_much: f64, other: Self) -> bool { (self - other).abs() < how_much }
}

pub trait SameAs: IsWithin + Sized {
    fn same_as(&self, other: Self) -> bool { self.is_within(0.1, other) }
}

impl SameAs for Bounds {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_bounds_keeps_edges() {
        let rect = Bounds::new(10.4, 20.7, 100.3, 200.0);
        let rounded = rect.round();
        assert_eq!(rounded.x, 10.0);
        assert_eq!(rounded.y, 21.0);
        // max x is 110.7 -> 111, so the width absorbs the difference
        assert_eq!(rounded.width, 101.0);
        assert_eq!(rounded.height, 200.0);
    }

    #[test]
    fn test_thirds_round_to_shared_edges() {
        let screen = Bounds::new(0.0, 0.0, 1000.0, 500.0);
        let third = 100.0 / 3.0;
        let a = screen.column(0.0, third).round();
        let b = screen.column(screen.width * third / 100.0, third).round();
        assert_eq!(a.max_x(), b.x);
    }

    #[test]
    fn test_is_within_f64() {
        let a = 10.0;
        let b = 10.05;
        assert!(a.is_within(0.1, b));
        assert!(!a.is_within(0.01, b));
    }

    #[test]
    fn test_same_as_bounds() {
        let a = Bounds::new(10.0, 20.0, 100.0, 200.0);
        let b = Bounds::new(10.05, 20.05, 100.05, 200.05);
        assert!(a.same_as(b));
        assert!(!a.same_as(Bounds::new(11.0, 20.0, 100.0, 200.0)));
    }

    #[test]
    fn test_column_and_row_slices() {
        let screen = Bounds::new(100.0, 50.0, 1920.0, 1080.0);
        assert_eq!(screen.column(960.0, 50.0), Bounds::new(1060.0, 50.0, 960.0, 1080.0));
        assert_eq!(screen.row(270.0, 25.0), Bounds::new(100.0, 320.0, 1920.0, 270.0));
    }
}
