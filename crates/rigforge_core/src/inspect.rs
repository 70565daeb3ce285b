//! Per-primitive diagnostics for a tessellated mesh.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::mesh::Mesh;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrimitiveReport {
    pub id: String,
    pub shape: &'static str,
    pub vertices: usize,
    pub indices: usize,
    pub triangles: usize,
    pub min: [f64; 3],
    pub max: [f64; 3],
    pub center: [f64; 3],
    pub extents: [f64; 3],
    /// Triangles per surface key, keyed by name.
    pub surfaces: BTreeMap<&'static str, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeshReport {
    pub id: String,
    pub vertices: usize,
    pub indices: usize,
    pub primitives: Vec<PrimitiveReport>,
}

pub fn inspect_mesh(mesh: &Mesh) -> MeshReport {
    let primitives = mesh
        .primitives
        .iter()
        .map(|range| {
            let bounds = mesh.primitive_bounds(range);
            let triangles = range.indices.len() / 3;
            let first_triangle = range.indices.start / 3;

            let mut surfaces = BTreeMap::new();
            for key in &mesh.surface_keys[first_triangle..first_triangle + triangles] {
                *surfaces.entry(key.name()).or_insert(0) += 1;
            }

            PrimitiveReport {
                id: range.id.clone(),
                shape: range.kind.name(),
                vertices: range.vertex_count(),
                indices: range.indices.len(),
                triangles,
                min: bounds.min().to_array(),
                max: bounds.max().to_array(),
                center: bounds.centroid().to_array(),
                extents: bounds.extents().to_array(),
                surfaces,
            }
        })
        .collect();

    MeshReport {
        id: mesh.id.clone(),
        vertices: mesh.vertex_count(),
        indices: mesh.index_count(),
        primitives,
    }
}
