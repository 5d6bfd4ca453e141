//! Ground-plane geometry.
//!
//! The simulation is 3D but every decision the AI makes happens on the
//! ground plane, so positions are `(x, z)` pairs.

use serde::{Deserialize, Serialize};

/// A point or direction on the ground plane.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub z: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, z: 0.0 };

    pub fn new(x: f32, z: f32) -> Self {
        Self { x, z }
    }

    /// Unit vector pointing along `angle` (radians, measured from +x toward +z).
    pub fn from_angle(angle: f32) -> Self {
        Self {
            x: angle.cos(),
            z: angle.sin(),
        }
    }

    pub fn distance(&self, other: &Self) -> f32 {
        self.distance_sq(other).sqrt()
    }

    pub fn distance_sq(&self, other: &Self) -> f32 {
        let dx = self.x - other.x;
        let dz = self.z - other.z;
        dx * dx + dz * dz
    }

    pub fn length(&self) -> f32 {
        (self.x * self.x + self.z * self.z).sqrt()
    }

    pub fn normalize(&self) -> Self {
        let len = self.length();
        if len > 0.0001 {
            Self {
                x: self.x / len,
                z: self.z / len,
            }
        } else {
            Self::default()
        }
    }

    /// Left-hand perpendicular.
    pub fn perp(&self) -> Self {
        Self {
            x: -self.z,
            z: self.x,
        }
    }

    /// Heading of this vector in radians.
    pub fn angle(&self) -> f32 {
        self.z.atan2(self.x)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.z.is_finite()
    }

    /// Arithmetic mean of a set of points, `None` when the set is empty.
    pub fn centroid<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = Vec2>,
    {
        let mut sum = Vec2::ZERO;
        let mut count = 0usize;
        for p in points {
            sum = sum + p;
            count += 1;
        }
        if count == 0 {
            None
        } else {
            Some(sum * (1.0 / count as f32))
        }
    }
}

impl std::ops::Add for Vec2 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self {
            x: self.x + rhs.x,
            z: self.z + rhs.z,
        }
    }
}

impl std::ops::Sub for Vec2 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self {
            x: self.x - rhs.x,
            z: self.z - rhs.z,
        }
    }
}

impl std::ops::Mul<f32> for Vec2 {
    type Output = Self;
    fn mul(self, rhs: f32) -> Self {
        Self {
            x: self.x * rhs,
            z: self.z * rhs,
        }
    }
}

impl std::ops::Neg for Vec2 {
    type Output = Self;
    fn neg(self) -> Self {
        Self {
            x: -self.x,
            z: -self.z,
        }
    }
}

/// Extent of the playable map in world units. The origin is one corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapDimensions {
    pub width: f32,
    pub height: f32,
}

impl MapDimensions {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.width * 0.5, self.height * 0.5)
    }

    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= 0.0 && p.z >= 0.0 && p.x <= self.width && p.z <= self.height
    }

    /// True when `p` lies at least `margin` away from every map edge.
    pub fn contains_with_margin(&self, p: Vec2, margin: f32) -> bool {
        p.x >= margin && p.z >= margin && p.x <= self.width - margin && p.z <= self.height - margin
    }

    pub fn clamp(&self, p: Vec2, margin: f32) -> Vec2 {
        let max_x = (self.width - margin).max(margin);
        let max_z = (self.height - margin).max(margin);
        Vec2::new(p.x.clamp(margin, max_x), p.z.clamp(margin, max_z))
    }

    /// Point reflection through the map center.
    pub fn mirror(&self, p: Vec2) -> Vec2 {
        Vec2::new(self.width - p.x, self.height - p.z)
    }
}

impl Default for MapDimensions {
    fn default() -> Self {
        Self {
            width: 4096.0,
            height: 4096.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_and_normalize() {
        let a = Vec2::new(0.0, 0.0);
        let b = Vec2::new(3.0, 4.0);
        assert_eq!(a.distance(&b), 5.0);
        assert_eq!(a.distance_sq(&b), 25.0);

        let n = b.normalize();
        assert!((n.length() - 1.0).abs() < 1e-5);
        assert_eq!(Vec2::ZERO.normalize(), Vec2::ZERO);
    }

    #[test]
    fn test_centroid() {
        assert_eq!(Vec2::centroid(Vec::new()), None);
        let c = Vec2::centroid(vec![Vec2::new(0.0, 0.0), Vec2::new(10.0, 20.0)]).unwrap();
        assert_eq!(c, Vec2::new(5.0, 10.0));
    }

    #[test]
    fn test_perp_is_orthogonal() {
        let v = Vec2::new(2.0, 1.0);
        let p = v.perp();
        assert_eq!(v.x * p.x + v.z * p.z, 0.0);
    }

    #[test]
    fn test_map_margin_and_mirror() {
        let map = MapDimensions::new(1000.0, 500.0);
        assert!(map.contains_with_margin(Vec2::new(100.0, 100.0), 50.0));
        assert!(!map.contains_with_margin(Vec2::new(20.0, 100.0), 50.0));
        assert_eq!(map.mirror(Vec2::new(100.0, 100.0)), Vec2::new(900.0, 400.0));
        assert_eq!(map.clamp(Vec2::new(-5.0, 900.0), 10.0), Vec2::new(10.0, 490.0));
    }
}
