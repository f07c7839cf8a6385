//! The sampling parallelogram and the operations that reshape it.
//!
//! Pixel coordinates are image coordinates: origin at the top-left of the
//! rendered picture, `y` growing downward. Grid row `height - py` is the
//! row drawn at image line `py`.

use crate::error::{LyapError, LyapResult};
use crate::math::Point;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Window {
    pub lower_left: Point,
    pub lower_right: Point,
    pub upper_left: Point,
}

/// One cell of a tiling pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tile {
    /// 1-based running number, column-major.
    pub index: usize,
    pub column: usize,
    pub row: usize,
    pub window: Window,
}

impl Default for Window {
    fn default() -> Self {
        Window::new(Point::new(2.0, 2.0), Point::new(4.0, 2.0), Point::new(2.0, 4.0))
    }
}

impl Window {
    pub fn new(lower_left: Point, lower_right: Point, upper_left: Point) -> Self {
        Window { lower_left, lower_right, upper_left }
    }

    /// Axis-aligned window spanning `[x0, x1] × [y0, y1]`.
    pub fn axis_aligned(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Window::new(Point::new(x0, y0), Point::new(x1, y0), Point::new(x0, y1))
    }

    pub fn edge_x(&self) -> Point {
        self.lower_right - self.lower_left
    }

    pub fn edge_y(&self) -> Point {
        self.upper_left - self.lower_left
    }

    pub fn centroid(&self) -> Point {
        self.lower_right.midpoint(self.upper_left)
    }

    pub fn upper_right(&self) -> Point {
        self.lower_right + self.edge_y()
    }

    /// Per-pixel step vectors for a `width × height` grid.
    pub fn basis(&self, width: usize, height: usize) -> (Point, Point) {
        (self.edge_x() * (1.0 / width as f64), self.edge_y() * (1.0 / height as f64))
    }

    /// The parameter pair sampled at grid column `col`, row `row`.
    pub fn sample_point(&self, width: usize, height: usize, col: f64, row: f64) -> Point {
        let (vx, vy) = self.basis(width, height);
        self.lower_left + vy * row + vx * col
    }

    /// Point under image pixel `(px, py)`.
    pub fn pixel_point(&self, width: usize, height: usize, px: i64, py: i64) -> Point {
        self.sample_point(width, height, px as f64, (height as i64 - py) as f64)
    }

    /// Longer of the two edge lengths.
    pub fn size(&self) -> f64 {
        self.edge_x().len_sq().max(self.edge_y().len_sq()).sqrt()
    }

    pub fn rotate(&mut self, degrees: f64) {
        let m = self.centroid();
        let angle = degrees.to_radians();
        for corner in self.corners_mut() {
            *corner = m + (*corner - m).rotated(angle);
        }
    }

    pub fn stretch(&mut self, fx: f64, fy: f64) {
        let m = self.centroid();
        for corner in self.corners_mut() {
            *corner = m + (*corner - m).scaled(fx, fy);
        }
    }

    /// Zooms to the image-pixel rectangle `left..right`, `top..bottom`.
    pub fn crop(&mut self, width: usize, height: usize, left: i64, bottom: i64, right: i64, top: i64) {
        let lower_left = self.pixel_point(width, height, left, bottom);
        let lower_right = self.pixel_point(width, height, right, bottom);
        let upper_left = self.pixel_point(width, height, left, top);
        *self = Window::new(lower_left, lower_right, upper_left);
    }

    /// Moves the window so image pixel `(px, py)` becomes its centroid.
    pub fn recenter(&mut self, width: usize, height: usize, px: i64, py: i64) {
        let shift = self.pixel_point(width, height, px, py) - self.centroid();
        for corner in self.corners_mut() {
            *corner = *corner + shift;
        }
    }

    /// Splits the window into `columns × rows` equal tiles, column-major.
    pub fn tiles(&self, columns: usize, rows: usize) -> LyapResult<Vec<Tile>> {
        if columns == 0 || rows == 0 {
            return Err(LyapError::unsupported(format!("cannot tile into {columns}x{rows}")));
        }
        let vx = self.edge_x() * (1.0 / columns as f64);
        let vy = self.edge_y() * (1.0 / rows as f64);
        let at = |c: usize, r: usize| self.lower_left + vx * c as f64 + vy * r as f64;

        let mut tiles = Vec::with_capacity(columns * rows);
        for column in 0..columns {
            for row in 0..rows {
                tiles.push(Tile {
                    index: tiles.len() + 1,
                    column,
                    row,
                    window: Window::new(at(column, row), at(column + 1, row), at(column, row + 1)),
                });
            }
        }
        Ok(tiles)
    }

    pub fn approx_eq(&self, other: &Window, eps: f64) -> bool {
        self.lower_left.approx_eq(other.lower_left, eps)
            && self.lower_right.approx_eq(other.lower_right, eps)
            && self.upper_left.approx_eq(other.upper_left, eps)
    }

    fn corners_mut(&mut self) -> [&mut Point; 3] {
        [&mut self.lower_left, &mut self.lower_right, &mut self.upper_left]
    }
}
