//! Deterministic tessellation.
//!
//! Each primitive is tessellated independently from its shape descriptor,
//! moved into mesh space by its transform, and then merged with its
//! siblings in declaration order. Per-primitive work may run on the rayon
//! pool; the merge is always ordered.

pub mod implicit;
pub mod shapes;
mod tables;

use rayon::prelude::*;

use crate::config::{CompileOptions, DEFAULT_PROFILE};
use crate::error::TessellationError;
use crate::mesh::{Mesh, PrimitiveGeometry, PrimitivePart};
use crate::scene::{MeshDef, Primitive, Shape};

pub use implicit::tessellate_implicit;
pub use shapes::{
    tessellate_box, tessellate_capsule, tessellate_cylinder, tessellate_sphere, tessellate_wedge,
};

/// Reject profiles other than the one this build implements.
pub fn check_profile(profile: &str) -> Result<(), TessellationError> {
    if profile == DEFAULT_PROFILE {
        Ok(())
    } else {
        Err(TessellationError::UnknownProfile(profile.to_string()))
    }
}

/// Vertex and index counts for fixed-topology shapes.
///
/// These depend only on the shape kind. Implicit surfaces return `None`.
pub fn expected_counts(shape: &Shape) -> Option<(usize, usize)> {
    match shape {
        Shape::Box { .. } => Some((24, 36)),
        Shape::Wedge { .. } => Some((18, 24)),
        Shape::Sphere { .. } => Some((561, 3072)),
        Shape::Cylinder { .. } => Some((134, 384)),
        Shape::Capsule { .. } => Some((858, 4800)),
        Shape::ImplicitSurface(_) => None,
    }
}

/// Tessellate one primitive in its local frame.
fn tessellate_shape(shape: &Shape, max_cells: usize) -> Result<PrimitiveGeometry, TessellationError> {
    Ok(match shape {
        Shape::Box { x, y, z } => tessellate_box(*x, *y, *z),
        Shape::Wedge { x, y, z } => tessellate_wedge(*x, *y, *z),
        Shape::Sphere { radius } => tessellate_sphere(*radius),
        Shape::Cylinder { radius, height } => tessellate_cylinder(*radius, *height),
        Shape::Capsule { radius, height } => tessellate_capsule(*radius, *height),
        Shape::ImplicitSurface(surface) => tessellate_implicit(surface, max_cells)?,
    })
}

/// Tessellate one primitive and place it in mesh space.
pub fn tessellate_primitive(
    primitive: &Primitive,
    options: &CompileOptions,
) -> Result<PrimitiveGeometry, TessellationError> {
    check_profile(&options.tessellation_profile)?;

    let local = tessellate_shape(&primitive.shape, options.max_implicit_cells)?;

    if let Some((vertices, indices)) = expected_counts(&primitive.shape) {
        if local.vertex_count() != vertices || local.index_count() != indices {
            return Err(TessellationError::CountMismatch {
                primitive: primitive.id.clone(),
                expected: vertices,
                actual: local.vertex_count(),
            });
        }
    }

    let geometry = match &primitive.transform {
        Some(transform) => {
            let t = transform.resolve();
            local.map(|p| t.apply_point(p), |n| t.apply_normal(n))
        }
        None => local,
    };

    log::debug!(
        "Tessellated {} ({}): {} vertices, {} indices",
        primitive.id,
        primitive.shape.kind().name(),
        geometry.vertex_count(),
        geometry.index_count()
    );
    Ok(geometry)
}

/// Tessellate every primitive of a mesh and merge them in declaration order.
pub fn tessellate_mesh(mesh: &MeshDef, options: &CompileOptions) -> Result<Mesh, TessellationError> {
    check_profile(&options.tessellation_profile)?;

    let tessellate = |primitive: &Primitive| -> Result<PrimitivePart, TessellationError> {
        Ok(PrimitivePart {
            id: primitive.id.clone(),
            kind: primitive.shape.kind(),
            material: primitive.effective_material().map(str::to_string),
            geometry: tessellate_primitive(primitive, options)?,
        })
    };

    // Collect every result first so the reported error is the first in
    // declaration order, not whichever worker failed first.
    let results: Vec<Result<PrimitivePart, TessellationError>> = if options.parallel {
        mesh.primitives.par_iter().map(tessellate).collect()
    } else {
        mesh.primitives.iter().map(tessellate).collect()
    };
    let parts = results.into_iter().collect::<Result<Vec<_>, _>>()?;

    Mesh::merge(mesh.id.clone(), parts)
}
