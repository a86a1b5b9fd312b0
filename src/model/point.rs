//! 3D point with Euclidean distance.

use serde::{Deserialize, Serialize};

/// A point in 3D space. Coordinates carry no global origin or orientation
/// guarantee — an embedding is unique only up to rigid transform and
/// reflection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    pub const ORIGIN: Point3 = Point3 { x: 0.0, y: 0.0, z: 0.0 };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance to another point.
    pub fn distance(&self, other: &Point3) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// Read a point from three consecutive reals of a flattened
    /// coordinate vector.
    ///
    /// # Panics
    /// Panics if the slice holds fewer than 3 elements.
    pub fn from_slice(s: &[f64]) -> Self {
        Self { x: s[0], y: s[1], z: s[2] }
    }

    pub fn to_array(self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    /// Arithmetic mean of a set of points. Empty input yields the origin.
    pub fn centroid(points: &[Point3]) -> Point3 {
        if points.is_empty() {
            return Point3::ORIGIN;
        }
        let n = points.len() as f64;
        let (mut x, mut y, mut z) = (0.0, 0.0, 0.0);
        for p in points {
            x += p.x;
            y += p.y;
            z += p.z;
        }
        Point3::new(x / n, y / n, z / n)
    }
}

impl std::fmt::Display for Point3 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}
