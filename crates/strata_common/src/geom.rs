//! 2-D geometry primitives for the placement engine.
//!
//! Placement works in continuous device coordinates, so points and rectangles
//! are stored as `f64`. A [`Rect`] is half-open: it contains points with
//! `xmin <= x < xmax` and `ymin <= y < ymax`.

use serde::{Deserialize, Serialize};

/// A point in continuous 2-D device coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// The x coordinate.
    pub x: f64,
    /// The y coordinate.
    pub y: f64,
}

impl Point {
    /// Creates a new point.
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned rectangle in continuous 2-D device coordinates.
///
/// The rectangle is half-open on both axes; its width and height are
/// `xmax - xmin` and `ymax - ymin` respectively.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    /// The minimum (bottom-left) x coordinate.
    pub xmin: f64,
    /// The minimum (bottom-left) y coordinate.
    pub ymin: f64,
    /// The maximum (top-right) x coordinate.
    pub xmax: f64,
    /// The maximum (top-right) y coordinate.
    pub ymax: f64,
}

impl Rect {
    /// Creates a rectangle from its bottom-left and top-right corners.
    pub fn new(bottom_left: Point, top_right: Point) -> Self {
        Self {
            xmin: bottom_left.x,
            ymin: bottom_left.y,
            xmax: top_right.x,
            ymax: top_right.y,
        }
    }

    /// Returns the bottom-left corner.
    pub fn bottom_left(&self) -> Point {
        Point::new(self.xmin, self.ymin)
    }

    /// Returns the top-right corner.
    pub fn top_right(&self) -> Point {
        Point::new(self.xmax, self.ymax)
    }

    /// Returns the width of the rectangle.
    pub fn width(&self) -> f64 {
        self.xmax - self.xmin
    }

    /// Returns the height of the rectangle.
    pub fn height(&self) -> f64 {
        self.ymax - self.ymin
    }

    /// Returns the center point of the rectangle.
    pub fn center(&self) -> Point {
        Point::new(
            self.xmin + self.width() / 2.0,
            self.ymin + self.height() / 2.0,
        )
    }

    /// Returns `true` if the rectangle contains the given point.
    ///
    /// The rectangle is half-open, so points on the max edges are outside.
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.xmin && p.x < self.xmax && p.y >= self.ymin && p.y < self.ymax
    }
}
