//! Validated input model.
//!
//! These types describe a rig after upstream parsing, schema checks, and
//! symmetry expansion. They deserialize from JSON with serde, but nothing in
//! the pipeline depends on where they came from.

use std::collections::BTreeMap;

use rigforge_math::quat::quat_from_wxyz;
use rigforge_math::{DQuat, DVec3, RotationMatrix};
use serde::Deserialize;

/// Material used for implicit primitives that do not name one.
pub const IMPLICIT_DEFAULT_MATERIAL: &str = "implicit_default";

/// A complete compilation input.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Scene {
    pub meshes: Vec<MeshDef>,
    pub armatures: Vec<Armature>,
    pub bindings: Vec<Binding>,
    pub poses: Vec<Pose>,
    pub materials: Vec<Material>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mesh(mut self, mesh: MeshDef) -> Self {
        self.meshes.push(mesh);
        self
    }

    pub fn with_armature(mut self, armature: Armature) -> Self {
        self.armatures.push(armature);
        self
    }

    pub fn with_binding(mut self, binding: Binding) -> Self {
        self.bindings.push(binding);
        self
    }

    pub fn with_pose(mut self, pose: Pose) -> Self {
        self.poses.push(pose);
        self
    }

    pub fn with_material(mut self, material: Material) -> Self {
        self.materials.push(material);
        self
    }

    pub fn mesh(&self, id: &str) -> Option<&MeshDef> {
        self.meshes.iter().find(|m| m.id == id)
    }

    pub fn armature(&self, id: &str) -> Option<&Armature> {
        self.armatures.iter().find(|a| a.id == id)
    }

    pub fn pose(&self, id: &str) -> Option<&Pose> {
        self.poses.iter().find(|p| p.id == id)
    }

    /// The binding for a mesh, if it is skinned. Compilation rejects a
    /// scene that binds one mesh twice.
    pub fn binding_for(&self, mesh_id: &str) -> Option<&Binding> {
        self.bindings.iter().find(|b| b.mesh_id == mesh_id)
    }

    pub fn material(&self, id: &str) -> Option<&Material> {
        self.materials.iter().find(|m| m.id == id)
    }
}

/// A mesh: an ordered list of primitives plus optional UV channels.
#[derive(Debug, Clone, Deserialize)]
pub struct MeshDef {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub primitives: Vec<Primitive>,
    /// Channel name (`uv0`, `uv1`, ...) to generator declaration.
    #[serde(default)]
    pub uv_sets: BTreeMap<String, UvSet>,
}

impl MeshDef {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            primitives: Vec::new(),
            uv_sets: BTreeMap::new(),
        }
    }

    pub fn with_primitive(mut self, primitive: Primitive) -> Self {
        self.primitives.push(primitive);
        self
    }

    pub fn with_uv_set(mut self, channel: impl Into<String>, generator: impl Into<String>) -> Self {
        self.uv_sets.insert(
            channel.into(),
            UvSet {
                generator: generator.into(),
            },
        );
        self
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UvSet {
    /// Versioned generator tag, e.g. `sphere_latlong@1`.
    pub generator: String,
}

/// One shape instance inside a mesh.
#[derive(Debug, Clone, Deserialize)]
pub struct Primitive {
    pub id: String,
    pub shape: Shape,
    #[serde(default)]
    pub material: Option<String>,
    #[serde(default)]
    pub transform: Option<PrimitiveTransform>,
}

impl Primitive {
    pub fn new(id: impl Into<String>, shape: Shape) -> Self {
        Self {
            id: id.into(),
            shape,
            material: None,
            transform: None,
        }
    }

    pub fn with_material(mut self, material: impl Into<String>) -> Self {
        self.material = Some(material.into());
        self
    }

    pub fn with_transform(mut self, transform: PrimitiveTransform) -> Self {
        self.transform = Some(transform);
        self
    }

    /// Material id after applying the implicit-surface default.
    pub fn effective_material(&self) -> Option<&str> {
        match (&self.material, &self.shape) {
            (Some(m), _) => Some(m.as_str()),
            (None, Shape::ImplicitSurface(_)) => Some(IMPLICIT_DEFAULT_MATERIAL),
            (None, _) => None,
        }
    }
}

/// Shape kind with its validated dimensions.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Shape {
    Box {
        #[serde(alias = "width")]
        x: f64,
        #[serde(alias = "height")]
        y: f64,
        #[serde(alias = "depth")]
        z: f64,
    },
    Sphere {
        radius: f64,
    },
    Cylinder {
        radius: f64,
        height: f64,
    },
    Capsule {
        radius: f64,
        height: f64,
    },
    Wedge {
        x: f64,
        y: f64,
        z: f64,
    },
    ImplicitSurface(ImplicitSurface),
}

impl Shape {
    pub fn kind(&self) -> ShapeKind {
        match self {
            Shape::Box { .. } => ShapeKind::Box,
            Shape::Sphere { .. } => ShapeKind::Sphere,
            Shape::Cylinder { .. } => ShapeKind::Cylinder,
            Shape::Capsule { .. } => ShapeKind::Capsule,
            Shape::Wedge { .. } => ShapeKind::Wedge,
            Shape::ImplicitSurface(_) => ShapeKind::ImplicitSurface,
        }
    }
}

/// Shape discriminant without parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShapeKind {
    Box,
    Sphere,
    Cylinder,
    Capsule,
    Wedge,
    ImplicitSurface,
}

impl ShapeKind {
    pub fn name(&self) -> &'static str {
        match self {
            ShapeKind::Box => "box",
            ShapeKind::Sphere => "sphere",
            ShapeKind::Cylinder => "cylinder",
            ShapeKind::Capsule => "capsule",
            ShapeKind::Wedge => "wedge",
            ShapeKind::ImplicitSurface => "implicit_surface",
        }
    }
}

/// A scalar-field surface extracted on a regular grid.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ImplicitSurface {
    pub domain: Domain,
    pub grid: GridResolution,
    pub iso: f64,
    pub ops: Vec<FieldOperator>,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Domain {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

/// Samples per axis (not cells).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct GridResolution {
    pub nx: usize,
    pub ny: usize,
    pub nz: usize,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FieldOperator {
    /// Versioned field tag, e.g. `metaball_sphere@1`.
    pub field: String,
    #[serde(default)]
    pub op: FieldOp,
    pub radius: f64,
    #[serde(default)]
    pub height: Option<f64>,
    #[serde(default = "default_strength")]
    pub strength: f64,
    #[serde(default)]
    pub transform: Option<PrimitiveTransform>,
}

fn default_strength() -> f64 {
    1.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldOp {
    #[default]
    Add,
    Subtract,
}

/// Rotation as authored.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rotation {
    /// Radians, applied X then Y then Z.
    Euler([f64; 3]),
    /// Scalar-first `[w, x, y, z]`, used as given.
    Quat([f64; 4]),
    AxisAngle { axis: [f64; 3], degrees: f64 },
}

impl Rotation {
    pub fn matrix(&self) -> RotationMatrix {
        match *self {
            Rotation::Euler([rx, ry, rz]) => RotationMatrix::from_euler_xyz(rx, ry, rz),
            Rotation::Quat([w, x, y, z]) => RotationMatrix::from_quat_wxyz(w, x, y, z),
            Rotation::AxisAngle { axis, degrees } => {
                RotationMatrix::from_axis_angle_degrees(DVec3::from_array(axis), degrees)
            }
        }
    }
}

/// Placement of a primitive (or field operator) in mesh space.
///
/// Rotation is applied first, then translation. Normals only rotate.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct PrimitiveTransform {
    pub translation: Option<[f64; 3]>,
    pub rotation: Option<Rotation>,
}

impl PrimitiveTransform {
    pub fn from_translation(t: [f64; 3]) -> Self {
        Self {
            translation: Some(t),
            rotation: None,
        }
    }

    pub fn with_rotation(mut self, rotation: Rotation) -> Self {
        self.rotation = Some(rotation);
        self
    }

    /// Precompute the rotation matrix once for a batch of points.
    pub fn resolve(&self) -> ResolvedTransform {
        ResolvedTransform {
            rotation: self.rotation.as_ref().map(Rotation::matrix),
            translation: self.translation.map(DVec3::from_array),
        }
    }
}

/// A transform with its rotation matrix evaluated.
///
/// Absent parts are skipped rather than applied as identity, so signed zeros
/// in the input survive untouched.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ResolvedTransform {
    pub rotation: Option<RotationMatrix>,
    pub translation: Option<DVec3>,
}

impl ResolvedTransform {
    pub fn apply_point(&self, p: DVec3) -> DVec3 {
        let rotated = match &self.rotation {
            Some(m) => m.apply(p),
            None => p,
        };
        match self.translation {
            Some(t) => rotated + t,
            None => rotated,
        }
    }

    pub fn apply_normal(&self, n: DVec3) -> DVec3 {
        match &self.rotation {
            Some(m) => m.apply(n),
            None => n,
        }
    }

    /// Inverse mapping: subtract translation, then apply the transposed rotation.
    pub fn to_local(&self, p: DVec3) -> DVec3 {
        let shifted = match self.translation {
            Some(t) => p - t,
            None => p,
        };
        match &self.rotation {
            Some(m) => m.apply_transposed(shifted),
            None => shifted,
        }
    }
}

/// A bone as authored, with its rest head/tail in mesh space.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Bone {
    pub id: String,
    #[serde(default)]
    pub parent: Option<String>,
    pub head: [f64; 3],
    pub tail: [f64; 3],
    #[serde(default)]
    pub roll: f64,
}

impl Bone {
    pub fn new(id: impl Into<String>, parent: Option<&str>, head: [f64; 3], tail: [f64; 3]) -> Self {
        Self {
            id: id.into(),
            parent: parent.map(str::to_string),
            head,
            tail,
            roll: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Armature {
    pub id: String,
    pub bones: Vec<Bone>,
}

impl Armature {
    pub fn new(id: impl Into<String>, bones: Vec<Bone>) -> Self {
        Self {
            id: id.into(),
            bones,
        }
    }
}

/// Skinning solver selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Solver {
    #[default]
    LinearBlend,
    DualQuaternion,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BoneWeight {
    pub bone_id: String,
    pub weight: f64,
}

impl BoneWeight {
    pub fn new(bone_id: impl Into<String>, weight: f64) -> Self {
        Self {
            bone_id: bone_id.into(),
            weight,
        }
    }
}

/// Uniform weights for every vertex of one primitive.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PrimitiveWeights {
    pub primitive_id: String,
    pub bones: Vec<BoneWeight>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub fn component(&self, p: DVec3) -> f64 {
        match self {
            Axis::X => p.x,
            Axis::Y => p.y,
            Axis::Z => p.z,
        }
    }
}

/// Linear blend between two weight sets along one axis.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Gradient {
    pub axis: Axis,
    pub range: [f64; 2],
    pub from: Vec<BoneWeight>,
    pub to: Vec<BoneWeight>,
}

/// Explicit weights for vertices of one primitive, by primitive-local index.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VertexOverride {
    pub vertices: Vec<usize>,
    pub bones: Vec<BoneWeight>,
}

/// Per-vertex weights loaded from an external table.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExternalWeights {
    pub primitive_id: String,
    pub vertex_count: usize,
    pub weights: Vec<ExternalVertex>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExternalVertex {
    pub vertex: usize,
    pub bones: Vec<BoneWeight>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WeightMap {
    pub primitive_id: String,
    #[serde(default)]
    pub external: Option<ExternalWeights>,
    #[serde(default)]
    pub gradients: Vec<Gradient>,
    #[serde(default)]
    pub overrides: Vec<VertexOverride>,
}

/// Associates one mesh with one armature.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Binding {
    pub mesh_id: String,
    pub armature_id: String,
    #[serde(default)]
    pub solver: Option<Solver>,
    #[serde(default)]
    pub weights: Vec<PrimitiveWeights>,
    #[serde(default)]
    pub weight_maps: Vec<WeightMap>,
}

impl Binding {
    pub fn new(mesh_id: impl Into<String>, armature_id: impl Into<String>) -> Self {
        Self {
            mesh_id: mesh_id.into(),
            armature_id: armature_id.into(),
            solver: None,
            weights: Vec::new(),
            weight_maps: Vec::new(),
        }
    }

    pub fn with_solver(mut self, solver: Solver) -> Self {
        self.solver = Some(solver);
        self
    }

    pub fn with_weights(mut self, primitive_id: impl Into<String>, bones: Vec<BoneWeight>) -> Self {
        self.weights.push(PrimitiveWeights {
            primitive_id: primitive_id.into(),
            bones,
        });
        self
    }

    pub fn with_weight_map(mut self, map: WeightMap) -> Self {
        self.weight_maps.push(map);
        self
    }
}

/// A named pose: per-bone local rotation and translation offsets.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Pose {
    pub id: String,
    #[serde(default)]
    pub bones: BTreeMap<String, PoseBone>,
}

impl Pose {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            bones: BTreeMap::new(),
        }
    }

    pub fn with_bone(mut self, bone_id: impl Into<String>, bone: PoseBone) -> Self {
        self.bones.insert(bone_id.into(), bone);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct PoseBone {
    /// Scalar-first `[w, x, y, z]`.
    pub rotation: [f64; 4],
    pub translation: [f64; 3],
    pub scale: Option<[f64; 3]>,
}

impl Default for PoseBone {
    fn default() -> Self {
        Self {
            rotation: [1.0, 0.0, 0.0, 0.0],
            translation: [0.0, 0.0, 0.0],
            scale: None,
        }
    }
}

impl PoseBone {
    pub fn rotation(rotation: [f64; 4]) -> Self {
        Self {
            rotation,
            ..Default::default()
        }
    }

    pub fn with_translation(mut self, translation: [f64; 3]) -> Self {
        self.translation = translation;
        self
    }

    pub fn with_scale(mut self, scale: [f64; 3]) -> Self {
        self.scale = Some(scale);
        self
    }

    pub fn quat(&self) -> DQuat {
        quat_from_wxyz(self.rotation)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Material {
    pub id: String,
    #[serde(default = "default_base_color")]
    pub base_color: [f64; 4],
}

fn default_base_color() -> [f64; 4] {
    [0.8, 0.8, 0.8, 1.0]
}

impl Material {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            base_color: default_base_color(),
        }
    }

    /// Linear RGBA.
    pub fn with_base_color(mut self, base_color: [f64; 4]) -> Self {
        self.base_color = base_color;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_from_json() {
        let json = r#"{ "type": "box", "width": 2.0, "height": 1.0, "depth": 0.5 }"#;
        let shape: Shape = serde_json::from_str(json).unwrap();
        assert_eq!(
            shape,
            Shape::Box {
                x: 2.0,
                y: 1.0,
                z: 0.5
            }
        );

        let json = r#"{ "type": "capsule", "radius": 0.1, "height": 0.6 }"#;
        let shape: Shape = serde_json::from_str(json).unwrap();
        assert_eq!(shape.kind(), ShapeKind::Capsule);
    }

    #[test]
    fn test_implicit_shape_from_json() {
        let json = r#"{
            "type": "implicit_surface",
            "domain": { "min": [-1, -1, -1], "max": [1, 1, 1] },
            "grid": { "nx": 8, "ny": 8, "nz": 8 },
            "iso": 0.3,
            "ops": [ { "field": "metaball_sphere@1", "radius": 0.8 } ]
        }"#;
        let shape: Shape = serde_json::from_str(json).unwrap();

        let Shape::ImplicitSurface(surface) = shape else {
            panic!("expected implicit surface");
        };
        assert_eq!(surface.grid.nx, 8);
        assert_eq!(surface.ops[0].op, FieldOp::Add);
        assert_eq!(surface.ops[0].strength, 1.0);
    }

    #[test]
    fn test_rotation_variants_from_json() {
        let r: Rotation = serde_json::from_str(r#"{ "euler": [0.0, 1.0, 0.0] }"#).unwrap();
        assert_eq!(r, Rotation::Euler([0.0, 1.0, 0.0]));

        let r: Rotation =
            serde_json::from_str(r#"{ "axis_angle": { "axis": [0, 0, 1], "degrees": 90 } }"#)
                .unwrap();
        let m = r.matrix();
        assert!((m.apply(DVec3::X) - DVec3::Y).length() < 1e-12);
    }

    #[test]
    fn test_transform_roundtrip_to_local() {
        let t = PrimitiveTransform::from_translation([1.0, 2.0, 3.0])
            .with_rotation(Rotation::Euler([0.3, -0.2, 1.1]))
            .resolve();
        let p = DVec3::new(0.5, -0.25, 2.0);
        let back = t.to_local(t.apply_point(p));

        assert!((back - p).length() < 1e-12);
    }

    #[test]
    fn test_absent_rotation_keeps_signed_zero() {
        let t = PrimitiveTransform::default().resolve();
        let p = t.apply_point(DVec3::new(-0.0, 1.0, 0.0));
        assert!(p.x.is_sign_negative());
    }

    #[test]
    fn test_implicit_default_material() {
        let surface = ImplicitSurface {
            domain: Domain {
                min: [-1.0; 3],
                max: [1.0; 3],
            },
            grid: GridResolution {
                nx: 2,
                ny: 2,
                nz: 2,
            },
            iso: 0.5,
            ops: vec![],
        };
        let implicit = Primitive::new("blob", Shape::ImplicitSurface(surface));
        let sphere = Primitive::new("ball", Shape::Sphere { radius: 1.0 });

        assert_eq!(implicit.effective_material(), Some(IMPLICIT_DEFAULT_MATERIAL));
        assert_eq!(sphere.effective_material(), None);
        assert_eq!(sphere.with_material("skin").effective_material(), Some("skin"));
    }

    #[test]
    fn test_pose_bone_defaults() {
        let bone: PoseBone = serde_json::from_str("{}").unwrap();
        assert_eq!(bone.rotation, [1.0, 0.0, 0.0, 0.0]);
        assert_eq!(bone.quat(), DQuat::IDENTITY);
        assert!(bone.scale.is_none());
    }
}
