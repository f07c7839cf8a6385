use std::f64::consts::PI;
use std::ops::{Add, Mul, Sub};

/// A point (or offset) in the 2-D parameter plane.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }

    pub fn len_sq(&self) -> f64 {
        self.x * self.x + self.y * self.y
    }

    pub fn midpoint(self, other: Point) -> Point {
        Point::new(0.5 * (self.x + other.x), 0.5 * (self.y + other.y))
    }

    /// Rotates this offset counter-clockwise by `angle` radians.
    pub fn rotated(self, angle: f64) -> Point {
        let (s, c) = angle.sin_cos();
        Point::new(self.x * c - self.y * s, self.x * s + self.y * c)
    }

    /// Componentwise scaling.
    pub fn scaled(self, fx: f64, fy: f64) -> Point {
        Point::new(self.x * fx, self.y * fy)
    }

    pub fn approx_eq(&self, other: Point, eps: f64) -> bool {
        (self.x - other.x).abs() <= eps && (self.y - other.y).abs() <= eps
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, other: Point) -> Point {
        Point::new(self.x + other.x, self.y + other.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, other: Point) -> Point {
        Point::new(self.x - other.x, self.y - other.y)
    }
}

impl Mul<f64> for Point {
    type Output = Point;

    fn mul(self, k: f64) -> Point {
        Point::new(self.x * k, self.y * k)
    }
}

const TWO_PI: f64 = 2.0 * PI;

// Polynomial sine after Garrett, "Fast Polynomial Approximations to Sine
// and Cosine" (2012). Absolute error stays below 3.1e-7.
pub fn fast_sin(x: f64) -> f64 {
    let x = if x < -PI {
        x + ((PI - x) / TWO_PI).floor() * TWO_PI
    } else if x > PI {
        x - ((x + PI) / TWO_PI).floor() * TWO_PI
    } else {
        x
    };

    let x2 = x * x;
    (((((-2.05342856289746600727e-08 * x2 + 2.70405218307799040084e-06) * x2
        - 1.98125763417806681909e-04)
        * x2
        + 8.33255814755188010464e-03)
        * x2
        - 1.66665772196961623983e-01)
        * x2
        + 9.99999707044156546685e-01)
        * x
}

pub fn fast_cos(x: f64) -> f64 {
    fast_sin(x + 0.5 * PI)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn fast_sin_tracks_std_sin() {
        let mut x = -20.0;
        while x < 20.0 {
            assert!((fast_sin(x) - x.sin()).abs() < 1e-5, "x = {x}");
            assert!((fast_cos(x) - x.cos()).abs() < 1e-5, "x = {x}");
            x += 0.173;
        }
    }

    #[test]
    fn point_arithmetic() {
        let a = Point::new(1.0, 2.0);
        let b = Point::new(3.0, -1.0);
        assert_eq!(a + b, Point::new(4.0, 1.0));
        assert_eq!(b - a, Point::new(2.0, -3.0));
        assert_eq!(a * 2.0, Point::new(2.0, 4.0));
        assert_eq!(a.midpoint(b), Point::new(2.0, 0.5));
        assert!(Point::new(1.0, 0.0).rotated(PI / 2.0).approx_eq(Point::new(0.0, 1.0), 1e-12));
    }
}
