use crate::{DVec3, Interval};

/// Axis-Aligned Bounding Box in 64-bit space.
///
/// An AABB is defined by three intervals (one per axis). Unlike a render
/// acceleration box it is never padded: implicit-surface sampling clamps
/// points against it and needs the exact declared domain.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Aabb {
    pub x: Interval,
    pub y: Interval,
    pub z: Interval,
}

impl Aabb {
    /// Create a new AABB from three intervals.
    pub fn new(x: Interval, y: Interval, z: Interval) -> Self {
        Self { x, y, z }
    }

    /// Create an AABB from two corner points.
    pub fn from_points(a: DVec3, b: DVec3) -> Self {
        Self {
            x: Interval::new(a.x.min(b.x), a.x.max(b.x)),
            y: Interval::new(a.y.min(b.y), a.y.max(b.y)),
            z: Interval::new(a.z.min(b.z), a.z.max(b.z)),
        }
    }

    /// Smallest box containing every point, or `EMPTY` for no points.
    pub fn from_point_cloud(points: &[DVec3]) -> Self {
        points.iter().fold(Self::EMPTY, |acc, p| acc.include(*p))
    }

    /// Grow the box to include a point.
    pub fn include(&self, p: DVec3) -> Aabb {
        Aabb {
            x: self.x.include(p.x),
            y: self.y.include(p.y),
            z: self.z.include(p.z),
        }
    }

    /// Clamp a point component-wise into the box.
    pub fn clamp_point(&self, p: DVec3) -> DVec3 {
        DVec3::new(self.x.clamp(p.x), self.y.clamp(p.y), self.z.clamp(p.z))
    }

    pub fn min(&self) -> DVec3 {
        DVec3::new(self.x.min, self.y.min, self.z.min)
    }

    pub fn max(&self) -> DVec3 {
        DVec3::new(self.x.max, self.y.max, self.z.max)
    }

    /// Size of the box along each axis.
    pub fn extents(&self) -> DVec3 {
        DVec3::new(self.x.size(), self.y.size(), self.z.size())
    }

    /// Returns the center point of the bounding box.
    pub fn centroid(&self) -> DVec3 {
        DVec3::new(
            (self.x.min + self.x.max) * 0.5,
            (self.y.min + self.y.max) * 0.5,
            (self.z.min + self.z.max) * 0.5,
        )
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty() || self.y.is_empty() || self.z.is_empty()
    }

    pub const EMPTY: Aabb = Aabb {
        x: Interval::EMPTY,
        y: Interval::EMPTY,
        z: Interval::EMPTY,
    };
}
