//! UV channel generation.
//!
//! Generators are closed-form and frozen per version tag. They are
//! index-driven: coordinates come from the ring/segment/face a vertex was
//! emitted for, using the same emission order as the shape recipes, so seam
//! duplicates get their own values. Values are never clamped or wrapped.
//! Channels are always computed from rest-pose geometry.

use std::f64::consts::PI;

use rigforge_math::DVec3;

use crate::error::UvError;
use crate::mesh::Mesh;
use crate::scene::{MeshDef, ShapeKind};
use crate::tessellation::shapes::{
    CAPSULE_HEIGHT_ROWS, CAPSULE_HEMISPHERE_RINGS, CAPSULE_RADIAL, CYLINDER_RADIAL, SPHERE_LAT,
    SPHERE_LON,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UvGenerator {
    PlanarXy,
    BoxProject,
    SphereLatLong,
    Cylindrical,
    CapsuleCylLatLong,
}

struct GeneratorEntry {
    tag: &'static str,
    generator: UvGenerator,
    /// `None` means every shape kind.
    shapes: Option<&'static [ShapeKind]>,
}

/// Closed registry of generator tags and the shapes each accepts.
const REGISTRY: [GeneratorEntry; 5] = [
    GeneratorEntry {
        tag: "planar_xy@1",
        generator: UvGenerator::PlanarXy,
        shapes: None,
    },
    GeneratorEntry {
        tag: "box_project@1",
        generator: UvGenerator::BoxProject,
        shapes: Some(&[ShapeKind::Box]),
    },
    GeneratorEntry {
        tag: "sphere_latlong@1",
        generator: UvGenerator::SphereLatLong,
        shapes: Some(&[ShapeKind::Sphere]),
    },
    GeneratorEntry {
        tag: "cylindrical@1",
        generator: UvGenerator::Cylindrical,
        shapes: Some(&[ShapeKind::Cylinder]),
    },
    GeneratorEntry {
        tag: "capsule_cyl_latlong@1",
        generator: UvGenerator::CapsuleCylLatLong,
        shapes: Some(&[ShapeKind::Capsule]),
    },
];

impl UvGenerator {
    pub fn from_tag(tag: &str) -> Option<Self> {
        REGISTRY
            .iter()
            .find(|e| e.tag == tag)
            .map(|e| e.generator)
    }

    fn entry(&self) -> &'static GeneratorEntry {
        // Every variant has exactly one registry entry.
        match self {
            UvGenerator::PlanarXy => &REGISTRY[0],
            UvGenerator::BoxProject => &REGISTRY[1],
            UvGenerator::SphereLatLong => &REGISTRY[2],
            UvGenerator::Cylindrical => &REGISTRY[3],
            UvGenerator::CapsuleCylLatLong => &REGISTRY[4],
        }
    }

    pub fn tag(&self) -> &'static str {
        self.entry().tag
    }

    pub fn supports(&self, kind: ShapeKind) -> bool {
        match self.entry().shapes {
            None => true,
            Some(kinds) => kinds.contains(&kind),
        }
    }

    /// Coordinates for one primitive's vertices, by primitive-local index.
    fn generate(&self, positions: &[DVec3]) -> Vec<[f64; 2]> {
        positions
            .iter()
            .enumerate()
            .map(|(i, p)| match self {
                UvGenerator::PlanarXy => [p.x, p.y],
                UvGenerator::BoxProject => box_project(i, *p),
                UvGenerator::SphereLatLong => sphere_latlong(i),
                UvGenerator::Cylindrical => cylindrical(i),
                UvGenerator::CapsuleCylLatLong => capsule_cyl_latlong(i),
            })
            .collect()
    }
}

/// Face order +X, -X, +Y, -Y, +Z, -Z; 4 vertices per face.
fn box_project(i: usize, p: DVec3) -> [f64; 2] {
    match i / 4 {
        0 => [-p.z, p.y],
        1 => [p.z, p.y],
        2 => [p.x, -p.z],
        3 => [p.x, p.z],
        4 => [p.x, p.y],
        _ => [-p.x, p.y],
    }
}

fn sphere_latlong(i: usize) -> [f64; 2] {
    let lat = i / (SPHERE_LON + 1);
    let lon = i % (SPHERE_LON + 1);
    [lon as f64 / SPHERE_LON as f64, lat as f64 / SPHERE_LAT as f64]
}

/// Side rings first (v = 0 top, 1 bottom), then two caps of center + rim.
fn cylindrical(i: usize) -> [f64; 2] {
    let ring = CYLINDER_RADIAL + 1;
    let side = 2 * ring;
    if i < side {
        let row = i / ring;
        let seg = i % ring;
        return [seg as f64 / CYLINDER_RADIAL as f64, row as f64];
    }
    let cap_index = (i - side) % (ring + 1);
    if cap_index == 0 {
        return [0.5, 0.5];
    }
    let seg = cap_index - 1;
    let angle = 2.0 * PI * seg as f64 / CYLINDER_RADIAL as f64;
    [0.5 + 0.5 * angle.cos(), 0.5 + 0.5 * angle.sin()]
}

/// `v` runs continuously over the 24 divisions of top hemisphere, cylinder,
/// and bottom hemisphere.
fn capsule_cyl_latlong(i: usize) -> [f64; 2] {
    let ring = CAPSULE_RADIAL + 1;
    let rings = CAPSULE_HEMISPHERE_RINGS;
    let rows = CAPSULE_HEIGHT_ROWS;
    let v_total = (rings + rows + rings) as f64;

    let row = i / ring;
    let seg = i % ring;
    let divisions = if row <= rings {
        row
    } else if row <= rings + rows + 1 {
        rings + (row - (rings + 1))
    } else {
        rings + rows + (row - (rings + rows + 1))
    };
    [seg as f64 / CAPSULE_RADIAL as f64, divisions as f64 / v_total]
}

/// One generated UV channel for a whole mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct UvChannel {
    pub name: String,
    pub index: u32,
    pub generator: UvGenerator,
    pub coords: Vec<[f64; 2]>,
}

/// Parse `uv<N>` into `N`.
pub fn channel_index(name: &str) -> Result<u32, UvError> {
    name.strip_prefix("uv")
        .filter(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|digits| digits.parse().ok())
        .ok_or_else(|| UvError::InvalidChannelName(name.to_string()))
}

/// Generate every declared channel of a mesh, ordered by channel index.
pub fn generate_uv_channels(def: &MeshDef, mesh: &Mesh) -> Result<Vec<UvChannel>, UvError> {
    let mut declared = Vec::with_capacity(def.uv_sets.len());
    for (name, set) in &def.uv_sets {
        let index = channel_index(name)?;
        let generator = UvGenerator::from_tag(&set.generator)
            .ok_or_else(|| UvError::UnknownGenerator(set.generator.clone()))?;
        for prim in &mesh.primitives {
            if !generator.supports(prim.kind) {
                return Err(UvError::UnsupportedShape {
                    channel: name.clone(),
                    generator: set.generator.clone(),
                    shape: prim.kind.name().to_string(),
                });
            }
        }
        declared.push((index, name.clone(), generator));
    }
    declared.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));

    let channels = declared
        .into_iter()
        .map(|(index, name, generator)| {
            let mut coords = Vec::with_capacity(mesh.vertex_count());
            for prim in &mesh.primitives {
                coords.extend(generator.generate(&mesh.positions[prim.vertices.clone()]));
            }
            log::debug!(
                "Mesh {}: channel {} ({}) with {} coordinates",
                mesh.id,
                name,
                generator.tag(),
                coords.len()
            );
            UvChannel {
                name,
                index,
                generator,
                coords,
            }
        })
        .collect();
    Ok(channels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompileOptions;
    use crate::scene::{Primitive, PrimitiveTransform, Shape};
    use crate::tessellation::tessellate_mesh;

    fn compile(def: &MeshDef) -> Result<Vec<UvChannel>, UvError> {
        let mesh = tessellate_mesh(def, &CompileOptions::default()).unwrap();
        generate_uv_channels(def, &mesh)
    }

    #[test]
    fn test_registry() {
        assert_eq!(UvGenerator::from_tag("box_project@1"), Some(UvGenerator::BoxProject));
        assert_eq!(UvGenerator::from_tag("box_project@2"), None);
        assert!(UvGenerator::PlanarXy.supports(ShapeKind::ImplicitSurface));
        assert!(!UvGenerator::SphereLatLong.supports(ShapeKind::Capsule));
        assert_eq!(UvGenerator::Cylindrical.tag(), "cylindrical@1");
    }

    #[test]
    fn test_channel_names() {
        assert_eq!(channel_index("uv0"), Ok(0));
        assert_eq!(channel_index("uv12"), Ok(12));
        assert!(channel_index("uv").is_err());
        assert!(channel_index("uvA").is_err());
        assert!(channel_index("tex0").is_err());
    }

    #[test]
    fn test_channels_sorted_numerically() {
        let def = MeshDef::new("m")
            .with_primitive(Primitive::new("s", Shape::Sphere { radius: 1.0 }))
            .with_uv_set("uv10", "planar_xy@1")
            .with_uv_set("uv2", "sphere_latlong@1");
        let channels = compile(&def).unwrap();

        assert_eq!(channels[0].name, "uv2");
        assert_eq!(channels[1].name, "uv10");
    }

    #[test]
    fn test_sphere_latlong_seam() {
        let def = MeshDef::new("m")
            .with_primitive(Primitive::new("s", Shape::Sphere { radius: 1.0 }))
            .with_uv_set("uv0", "sphere_latlong@1");
        let uv = &compile(&def).unwrap()[0].coords;

        assert_eq!(uv.len(), 561);
        assert_eq!(uv[0], [0.0, 0.0]);
        // Seam duplicate at the end of the first ring.
        assert_eq!(uv[32], [1.0, 0.0]);
        assert_eq!(uv[560], [1.0, 1.0]);
    }

    #[test]
    fn test_box_project_faces() {
        let def = MeshDef::new("m")
            .with_primitive(Primitive::new(
                "b",
                Shape::Box {
                    x: 2.0,
                    y: 2.0,
                    z: 2.0,
                },
            ))
            .with_uv_set("uv0", "box_project@1");
        let uv = &compile(&def).unwrap()[0].coords;

        // +X face, first vertex (1, -1, -1): u = -z, v = y.
        assert_eq!(uv[0], [1.0, -1.0]);
        // -Z face, first vertex (1, -1, -1): u = -x, v = y.
        assert_eq!(uv[20], [-1.0, -1.0]);
    }

    #[test]
    fn test_cylindrical_layout() {
        let def = MeshDef::new("m")
            .with_primitive(Primitive::new(
                "c",
                Shape::Cylinder {
                    radius: 1.0,
                    height: 1.0,
                },
            ))
            .with_uv_set("uv0", "cylindrical@1");
        let uv = &compile(&def).unwrap()[0].coords;

        assert_eq!(uv[33], [0.0, 1.0]);
        assert_eq!(uv[66], [0.5, 0.5]);
        assert_eq!(uv[67], [1.0, 0.5]);
        assert_eq!(uv[100], [0.5, 0.5]);
        assert_eq!(uv[101], [1.0, 0.5]);
    }

    #[test]
    fn test_capsule_v_is_continuous() {
        let def = MeshDef::new("m")
            .with_primitive(Primitive::new(
                "c",
                Shape::Capsule {
                    radius: 0.2,
                    height: 1.0,
                },
            ))
            .with_uv_set("uv0", "capsule_cyl_latlong@1");
        let uv = &compile(&def).unwrap()[0].coords;

        assert_eq!(uv.len(), 858);
        // Last top-hemisphere ring and first cylinder row share v = 8/24.
        assert_eq!(uv[8 * 33][1], 8.0 / 24.0);
        assert_eq!(uv[9 * 33][1], 8.0 / 24.0);
        assert_eq!(uv[17 * 33][1], 16.0 / 24.0);
        assert_eq!(uv[18 * 33][1], 17.0 / 24.0);
        assert_eq!(uv[857], [1.0, 1.0]);
    }

    #[test]
    fn test_planar_uses_mesh_space_and_never_clamps() {
        let def = MeshDef::new("m")
            .with_primitive(
                Primitive::new(
                    "b",
                    Shape::Box {
                        x: 1.0,
                        y: 1.0,
                        z: 1.0,
                    },
                )
                .with_transform(PrimitiveTransform::from_translation([5.0, -3.0, 0.0])),
            )
            .with_uv_set("uv0", "planar_xy@1");
        let uv = &compile(&def).unwrap()[0].coords;
        assert_eq!(uv[0], [5.5, -3.5]);
    }

    #[test]
    fn test_generator_must_fit_every_shape() {
        let def = MeshDef::new("m")
            .with_primitive(Primitive::new("s", Shape::Sphere { radius: 1.0 }))
            .with_primitive(Primitive::new(
                "w",
                Shape::Wedge {
                    x: 1.0,
                    y: 1.0,
                    z: 1.0,
                },
            ))
            .with_uv_set("uv0", "sphere_latlong@1");

        assert!(matches!(
            compile(&def),
            Err(UvError::UnsupportedShape { ref shape, .. }) if shape == "wedge"
        ));
    }

    #[test]
    fn test_unknown_generator() {
        let def = MeshDef::new("m")
            .with_primitive(Primitive::new("s", Shape::Sphere { radius: 1.0 }))
            .with_uv_set("uv0", "spherical@1");
        assert_eq!(
            compile(&def),
            Err(UvError::UnknownGenerator("spherical@1".to_string()))
        );
    }
}
