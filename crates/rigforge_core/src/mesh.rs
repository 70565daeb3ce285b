//! Tessellated geometry.
//!
//! Geometry is produced once per primitive by the tessellator and never
//! edited afterwards. A [`Mesh`] is the ordered concatenation of its
//! primitives, with each primitive's vertex and index range recorded so later
//! stages can address primitive-local data.

use std::fmt;
use std::ops::Range;

use rigforge_math::{Aabb, DVec3};

use crate::error::TessellationError;
use crate::scene::ShapeKind;

/// Which named face of a shape produced a triangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SurfaceKey {
    PosX,
    NegX,
    PosY,
    NegY,
    PosZ,
    NegZ,
    Slope,
    Surface,
    Side,
    TopCap,
    BottomCap,
    TopHemisphere,
    BottomHemisphere,
    Isosurface,
}

impl SurfaceKey {
    pub fn name(&self) -> &'static str {
        match self {
            SurfaceKey::PosX => "+x",
            SurfaceKey::NegX => "-x",
            SurfaceKey::PosY => "+y",
            SurfaceKey::NegY => "-y",
            SurfaceKey::PosZ => "+z",
            SurfaceKey::NegZ => "-z",
            SurfaceKey::Slope => "slope",
            SurfaceKey::Surface => "surface",
            SurfaceKey::Side => "side",
            SurfaceKey::TopCap => "top_cap",
            SurfaceKey::BottomCap => "bottom_cap",
            SurfaceKey::TopHemisphere => "top_hemisphere",
            SurfaceKey::BottomHemisphere => "bottom_hemisphere",
            SurfaceKey::Isosurface => "isosurface",
        }
    }
}

impl fmt::Display for SurfaceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Geometry of a single primitive.
#[derive(Clone, Debug, PartialEq)]
pub struct PrimitiveGeometry {
    /// Vertex positions (one per vertex)
    pub positions: Vec<DVec3>,

    /// Unit vertex normals (one per vertex)
    pub normals: Vec<DVec3>,

    /// Triangle indices, local to this primitive
    pub indices: Vec<u32>,

    /// One key per triangle
    pub surface_keys: Vec<SurfaceKey>,

    /// Axis-aligned bounding box
    pub bounds: Aabb,
}

impl PrimitiveGeometry {
    pub fn new(
        positions: Vec<DVec3>,
        normals: Vec<DVec3>,
        indices: Vec<u32>,
        surface_keys: Vec<SurfaceKey>,
    ) -> Self {
        debug_assert_eq!(positions.len(), normals.len());
        debug_assert_eq!(indices.len(), surface_keys.len() * 3);
        let bounds = Aabb::from_point_cloud(&positions);
        Self {
            positions,
            normals,
            indices,
            surface_keys,
            bounds,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new(), Vec::new(), Vec::new())
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Map every position and normal through `point` and `normal`, keeping topology.
    pub fn map(
        self,
        point: impl Fn(DVec3) -> DVec3,
        normal: impl Fn(DVec3) -> DVec3,
    ) -> PrimitiveGeometry {
        let positions = self.positions.into_iter().map(point).collect();
        let normals = self.normals.into_iter().map(normal).collect();
        PrimitiveGeometry::new(positions, normals, self.indices, self.surface_keys)
    }
}

/// Where one primitive's data lives inside a merged [`Mesh`].
#[derive(Clone, Debug, PartialEq)]
pub struct PrimitiveRange {
    pub id: String,
    pub kind: ShapeKind,
    pub material: Option<String>,
    pub vertices: Range<usize>,
    pub indices: Range<usize>,
}

impl PrimitiveRange {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }
}

/// All primitives of a mesh, concatenated in declaration order.
///
/// Indices are rebased to the merged vertex array.
#[derive(Clone, Debug, PartialEq)]
pub struct Mesh {
    pub id: String,
    pub positions: Vec<DVec3>,
    pub normals: Vec<DVec3>,
    pub indices: Vec<u32>,
    pub surface_keys: Vec<SurfaceKey>,
    pub primitives: Vec<PrimitiveRange>,
    pub bounds: Aabb,
}

/// Declaration data carried alongside a tessellated primitive into the merge.
#[derive(Clone, Debug)]
pub struct PrimitivePart {
    pub id: String,
    pub kind: ShapeKind,
    pub material: Option<String>,
    pub geometry: PrimitiveGeometry,
}

impl Mesh {
    /// Merge tessellated primitives in the order given.
    ///
    /// Every part's destination range is reserved up front by a prefix sum
    /// over vertex and index counts, then filled in declaration order.
    pub fn merge(id: impl Into<String>, parts: Vec<PrimitivePart>) -> Result<Self, TessellationError> {
        let id = id.into();

        let mut ranges = Vec::with_capacity(parts.len());
        let mut vertex_offset = 0usize;
        let mut index_offset = 0usize;
        for part in &parts {
            let vertices = vertex_offset..vertex_offset + part.geometry.vertex_count();
            let indices = index_offset..index_offset + part.geometry.index_count();
            vertex_offset = vertices.end;
            index_offset = indices.end;
            ranges.push(PrimitiveRange {
                id: part.id.clone(),
                kind: part.kind,
                material: part.material.clone(),
                vertices,
                indices,
            });
        }

        if vertex_offset > u32::MAX as usize {
            return Err(TessellationError::TooManyVertices(vertex_offset));
        }

        let mut positions = Vec::with_capacity(vertex_offset);
        let mut normals = Vec::with_capacity(vertex_offset);
        let mut indices = Vec::with_capacity(index_offset);
        let mut surface_keys = Vec::with_capacity(index_offset / 3);

        for (part, range) in parts.into_iter().zip(&ranges) {
            let base = range.vertices.start as u32;
            positions.extend(part.geometry.positions);
            normals.extend(part.geometry.normals);
            indices.extend(part.geometry.indices.iter().map(|i| i + base));
            surface_keys.extend(part.geometry.surface_keys);
        }

        let bounds = Aabb::from_point_cloud(&positions);
        log::debug!(
            "Merged mesh {}: {} primitives, {} vertices, {} indices",
            id,
            ranges.len(),
            positions.len(),
            indices.len()
        );

        Ok(Self {
            id,
            positions,
            normals,
            indices,
            surface_keys,
            primitives: ranges,
            bounds,
        })
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    pub fn primitive(&self, id: &str) -> Option<&PrimitiveRange> {
        self.primitives.iter().find(|p| p.id == id)
    }

    /// Indices of one primitive, rebased to its own first vertex.
    pub fn local_indices(&self, range: &PrimitiveRange) -> Vec<u32> {
        let base = range.vertices.start as u32;
        self.indices[range.indices.clone()]
            .iter()
            .map(|i| i - base)
            .collect()
    }

    /// Bounds of one primitive's vertices.
    pub fn primitive_bounds(&self, range: &PrimitiveRange) -> Aabb {
        Aabb::from_point_cloud(&self.positions[range.vertices.clone()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle(offset: f64) -> PrimitiveGeometry {
        PrimitiveGeometry::new(
            vec![
                DVec3::new(offset, 0.0, 0.0),
                DVec3::new(offset + 1.0, 0.0, 0.0),
                DVec3::new(offset, 1.0, 0.0),
            ],
            vec![DVec3::Z; 3],
            vec![0, 1, 2],
            vec![SurfaceKey::PosZ],
        )
    }

    fn part(id: &str, geometry: PrimitiveGeometry) -> PrimitivePart {
        PrimitivePart {
            id: id.to_string(),
            kind: ShapeKind::Wedge,
            material: None,
            geometry,
        }
    }

    #[test]
    fn test_primitive_bounds() {
        let geometry = triangle(2.0);
        assert_eq!(geometry.bounds.min(), DVec3::new(2.0, 0.0, 0.0));
        assert_eq!(geometry.bounds.max(), DVec3::new(3.0, 1.0, 0.0));
        assert_eq!(geometry.triangle_count(), 1);
    }

    #[test]
    fn test_merge_rebases_indices() {
        let mesh = Mesh::merge("m", vec![part("a", triangle(0.0)), part("b", triangle(5.0))])
            .unwrap();

        assert_eq!(mesh.vertex_count(), 6);
        assert_eq!(mesh.indices, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(mesh.primitives[1].vertices, 3..6);
        assert_eq!(mesh.primitives[1].indices, 3..6);
        assert_eq!(mesh.bounds.max().x, 6.0);
    }

    #[test]
    fn test_local_indices() {
        let mesh = Mesh::merge("m", vec![part("a", triangle(0.0)), part("b", triangle(5.0))])
            .unwrap();
        let b = mesh.primitive("b").unwrap();

        assert_eq!(mesh.local_indices(b), vec![0, 1, 2]);
        assert_eq!(mesh.primitive_bounds(b).min().x, 5.0);
    }

    #[test]
    fn test_merge_empty_part() {
        let mesh = Mesh::merge(
            "m",
            vec![part("a", PrimitiveGeometry::empty()), part("b", triangle(0.0))],
        )
        .unwrap();

        assert_eq!(mesh.primitives[0].vertices, 0..0);
        assert_eq!(mesh.primitives[1].vertices, 0..3);
        assert_eq!(mesh.indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_map_keeps_topology() {
        let moved = triangle(0.0).map(|p| p + DVec3::Y, |n| n);
        assert_eq!(moved.indices, vec![0, 1, 2]);
        assert_eq!(moved.bounds.min().y, 1.0);
    }
}
