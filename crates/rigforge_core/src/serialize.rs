//! Binary artifact assembly.
//!
//! All geometry, UV, influence and pose data arrive as 64-bit values and are
//! narrowed to 32 bits here, once, with [`narrow`]. Blocks are laid out in a
//! fixed order and aligned to four bytes with zero padding, so the buffer is a
//! pure function of its inputs.
//!
//! Per mesh and per accessor group (the whole mesh, or one primitive when
//! split): positions, normals, UV channels in ascending channel index, indices,
//! then joints and weights when skinned. A skinned mesh ends with one
//! inverse-bind-matrix block shared by all of its groups.
//!
//! Materials become records in first-use order and primitives refer to them by
//! index. A referenced id missing from the palette gets the default color.

use std::ops::Range;

use rigforge_math::{narrow, DMat4, DQuat, DVec3};
use serde::Serialize;

use crate::armature::Skeleton;
use crate::config::PrimitiveSplit;
use crate::influence::{InfluenceTable, MAX_INFLUENCES};
use crate::mesh::Mesh;
use crate::scene::Material;
use crate::uv::UvChannel;

/// Byte alignment of every block.
pub const ALIGNMENT: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComponentType {
    Float,
    UnsignedInt,
    UnsignedShort,
}

impl ComponentType {
    pub fn size(&self) -> usize {
        match self {
            ComponentType::Float | ComponentType::UnsignedInt => 4,
            ComponentType::UnsignedShort => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccessorType {
    Scalar,
    Vec2,
    Vec3,
    Vec4,
    Mat4,
}

impl AccessorType {
    pub fn components(&self) -> usize {
        match self {
            AccessorType::Scalar => 1,
            AccessorType::Vec2 => 2,
            AccessorType::Vec3 => 3,
            AccessorType::Vec4 => 4,
            AccessorType::Mat4 => 16,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BufferView {
    pub offset: usize,
    pub length: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Accessor {
    pub view: usize,
    pub component_type: ComponentType,
    #[serde(rename = "type")]
    pub accessor_type: AccessorType,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<[f32; 3]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<[f32; 3]>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UvAccessor {
    pub channel: String,
    pub generator: String,
    pub accessor: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrimitiveRecord {
    /// Source primitives covered by this accessor group, in order.
    pub sources: Vec<String>,
    pub position: usize,
    pub normal: usize,
    pub uvs: Vec<UvAccessor>,
    pub indices: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub joints: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weights: Option<usize>,
    /// Index into [`Artifact::materials`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub material: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlphaMode {
    Opaque,
    Blend,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaterialRecord {
    pub id: String,
    pub base_color: [f32; 4],
    pub metallic: f32,
    pub roughness: f32,
    pub alpha_mode: AlphaMode,
}

impl MaterialRecord {
    pub fn from_material(material: &Material) -> Self {
        let alpha_mode = if material.base_color[3] < 1.0 {
            AlphaMode::Blend
        } else {
            AlphaMode::Opaque
        };
        Self {
            id: material.id.clone(),
            base_color: material.base_color.map(narrow),
            metallic: 0.0,
            roughness: 1.0,
            alpha_mode,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeshRecord {
    pub id: String,
    pub primitives: Vec<PrimitiveRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skin: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkinRecord {
    pub mesh: String,
    pub armature: String,
    /// Bone ids in joint-index order.
    pub joints: Vec<String>,
    pub inverse_bind_matrices: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoseRecord {
    pub id: String,
    pub armature: String,
    pub bones: Vec<String>,
    /// Vector-first `xyzw` rotations, one per bone.
    pub rotations: usize,
    pub translations: usize,
}

/// The compiled binary buffer and the records describing it.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Artifact {
    #[serde(skip)]
    pub buffer: Vec<u8>,
    pub byte_length: usize,
    pub views: Vec<BufferView>,
    pub accessors: Vec<Accessor>,
    pub materials: Vec<MaterialRecord>,
    pub meshes: Vec<MeshRecord>,
    pub skins: Vec<SkinRecord>,
    pub poses: Vec<PoseRecord>,
}

/// Skin data for one mesh.
#[derive(Debug, Clone, Copy)]
pub struct SkinInput<'a> {
    pub armature_id: &'a str,
    pub skeleton: &'a Skeleton,
    pub table: &'a InfluenceTable,
}

/// Everything serialized for one mesh.
///
/// `positions` and `normals` are the rest geometry, or a deformed copy on the
/// bake path. UVs always come from the rest geometry.
#[derive(Debug, Clone, Copy)]
pub struct MeshInput<'a> {
    pub mesh: &'a Mesh,
    pub positions: &'a [DVec3],
    pub normals: &'a [DVec3],
    pub uv_channels: &'a [UvChannel],
    pub skin: Option<SkinInput<'a>>,
}

impl<'a> MeshInput<'a> {
    /// Rest-pose input without skin data.
    pub fn rest(mesh: &'a Mesh, uv_channels: &'a [UvChannel]) -> Self {
        Self {
            mesh,
            positions: &mesh.positions,
            normals: &mesh.normals,
            uv_channels,
            skin: None,
        }
    }

    pub fn with_skin(mut self, skin: SkinInput<'a>) -> Self {
        self.skin = Some(skin);
        self
    }
}

/// One set of accessors: a contiguous vertex and index range.
#[derive(Debug, Clone, PartialEq)]
struct Group {
    sources: Vec<String>,
    material: Option<String>,
    vertices: Range<usize>,
    indices: Range<usize>,
    /// Set when the group is a single primitive whose indices get rebased.
    primitive: Option<usize>,
}

fn groups(mesh: &Mesh, split: PrimitiveSplit) -> Vec<Group> {
    let mut materials: Vec<Option<&str>> = mesh
        .primitives
        .iter()
        .map(|p| p.material.as_deref())
        .collect();
    materials.dedup();
    let split = match split {
        PrimitiveSplit::Merged => false,
        PrimitiveSplit::Always => true,
        PrimitiveSplit::ByMaterial => {
            let first = materials.first().copied().flatten();
            materials.iter().any(|m| *m != first)
        }
    };

    if split {
        mesh.primitives
            .iter()
            .enumerate()
            .map(|(i, p)| Group {
                sources: vec![p.id.clone()],
                material: p.material.clone(),
                vertices: p.vertices.clone(),
                indices: p.indices.clone(),
                primitive: Some(i),
            })
            .collect()
    } else {
        let shared = match materials.as_slice() {
            [single] => single.map(str::to_string),
            _ => None,
        };
        vec![Group {
            sources: mesh.primitives.iter().map(|p| p.id.clone()).collect(),
            material: shared,
            vertices: 0..mesh.vertex_count(),
            indices: 0..mesh.index_count(),
            primitive: None,
        }]
    }
}

/// Accumulates blocks into one buffer.
#[derive(Debug, Default)]
pub struct ArtifactBuilder {
    artifact: Artifact,
    palette: Vec<Material>,
}

impl ArtifactBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A builder that looks material ids up in `palette`.
    pub fn with_materials(palette: &[Material]) -> Self {
        Self {
            artifact: Artifact::default(),
            palette: palette.to_vec(),
        }
    }

    fn material_index(&mut self, id: &str) -> usize {
        if let Some(index) = self.artifact.materials.iter().position(|m| m.id == id) {
            return index;
        }
        let record = match self.palette.iter().find(|m| m.id == id) {
            Some(material) => MaterialRecord::from_material(material),
            None => MaterialRecord::from_material(&Material::new(id)),
        };
        self.artifact.materials.push(record);
        self.artifact.materials.len() - 1
    }

    fn align(&mut self) {
        let buffer = &mut self.artifact.buffer;
        let padding = (ALIGNMENT - buffer.len() % ALIGNMENT) % ALIGNMENT;
        buffer.extend(std::iter::repeat(0u8).take(padding));
    }

    fn push_view(&mut self, data: &[u8]) -> usize {
        self.align();
        let offset = self.artifact.buffer.len();
        self.artifact.buffer.extend_from_slice(data);
        self.artifact.views.push(BufferView {
            offset,
            length: data.len(),
        });
        self.artifact.views.len() - 1
    }

    fn push_accessor(
        &mut self,
        data: &[u8],
        component_type: ComponentType,
        accessor_type: AccessorType,
        count: usize,
        bounds: Option<([f32; 3], [f32; 3])>,
    ) -> usize {
        debug_assert_eq!(
            data.len(),
            count * accessor_type.components() * component_type.size()
        );
        let view = self.push_view(data);
        self.artifact.accessors.push(Accessor {
            view,
            component_type,
            accessor_type,
            count,
            min: bounds.map(|b| b.0),
            max: bounds.map(|b| b.1),
        });
        self.artifact.accessors.len() - 1
    }

    fn push_floats(&mut self, values: &[f32], accessor_type: AccessorType, count: usize) -> usize {
        let data: Vec<u8> = values.iter().flat_map(|f| f.to_le_bytes()).collect();
        self.push_accessor(&data, ComponentType::Float, accessor_type, count, None)
    }

    /// Positions, with bounds taken from the narrowed values.
    fn push_positions(&mut self, values: &[DVec3]) -> usize {
        let narrowed: Vec<[f32; 3]> = values.iter().map(|v| narrow_vec3(*v)).collect();
        let bounds = narrowed_bounds(&narrowed);
        let data: Vec<u8> = narrowed
            .iter()
            .flatten()
            .flat_map(|f| f.to_le_bytes())
            .collect();
        self.push_accessor(
            &data,
            ComponentType::Float,
            AccessorType::Vec3,
            values.len(),
            bounds,
        )
    }

    fn push_vec3(&mut self, values: &[DVec3]) -> usize {
        let floats: Vec<f32> = values.iter().flat_map(|v| narrow_vec3(*v)).collect();
        self.push_floats(&floats, AccessorType::Vec3, values.len())
    }

    fn push_vec2(&mut self, values: &[[f64; 2]]) -> usize {
        let floats: Vec<f32> = values.iter().flatten().map(|&v| narrow(v)).collect();
        self.push_floats(&floats, AccessorType::Vec2, values.len())
    }

    fn push_vec4(&mut self, values: &[[f64; 4]]) -> usize {
        let floats: Vec<f32> = values.iter().flatten().map(|&v| narrow(v)).collect();
        self.push_floats(&floats, AccessorType::Vec4, values.len())
    }

    fn push_indices(&mut self, values: &[u32]) -> usize {
        let data: Vec<u8> = values.iter().flat_map(|i| i.to_le_bytes()).collect();
        self.push_accessor(
            &data,
            ComponentType::UnsignedInt,
            AccessorType::Scalar,
            values.len(),
            None,
        )
    }

    fn push_joints(&mut self, values: &[[u16; MAX_INFLUENCES]]) -> usize {
        let data: Vec<u8> = values
            .iter()
            .flatten()
            .flat_map(|j| j.to_le_bytes())
            .collect();
        self.push_accessor(
            &data,
            ComponentType::UnsignedShort,
            AccessorType::Vec4,
            values.len(),
            None,
        )
    }

    /// Matrices are written column-major.
    fn push_matrices(&mut self, values: &[DMat4]) -> usize {
        let floats: Vec<f32> = values
            .iter()
            .flat_map(|m| m.to_cols_array())
            .map(narrow)
            .collect();
        self.push_floats(&floats, AccessorType::Mat4, values.len())
    }

    /// Append one mesh's blocks.
    pub fn add_mesh(&mut self, input: &MeshInput<'_>, split: PrimitiveSplit) {
        let mesh = input.mesh;
        let joints = input.skin.map(|s| s.table.joints());
        let weights = input.skin.map(|s| s.table.weights());

        let mut primitives = Vec::new();
        for group in groups(mesh, split) {
            let vertices = group.vertices.clone();
            let position = self.push_positions(&input.positions[vertices.clone()]);
            let normal = self.push_vec3(&input.normals[vertices.clone()]);

            let uvs = input
                .uv_channels
                .iter()
                .map(|channel| UvAccessor {
                    channel: channel.name.clone(),
                    generator: channel.generator.tag().to_string(),
                    accessor: self.push_vec2(&channel.coords[vertices.clone()]),
                })
                .collect();

            let indices = match group.primitive {
                Some(i) => self.push_indices(&mesh.local_indices(&mesh.primitives[i])),
                None => self.push_indices(&mesh.indices[group.indices.clone()]),
            };

            let joints = joints
                .as_ref()
                .map(|j| self.push_joints(&j[vertices.clone()]));
            let weights = weights
                .as_ref()
                .map(|w| self.push_vec4(&w[vertices.clone()]));

            let material = group.material.as_deref().map(|id| self.material_index(id));
            primitives.push(PrimitiveRecord {
                sources: group.sources,
                position,
                normal,
                uvs,
                indices,
                joints,
                weights,
                material,
            });
        }

        let skin = input.skin.map(|s| {
            let inverse_bind_matrices = self.push_matrices(&s.skeleton.inverse_bind_matrices());
            self.artifact.skins.push(SkinRecord {
                mesh: mesh.id.clone(),
                armature: s.armature_id.to_string(),
                joints: s.skeleton.ids.clone(),
                inverse_bind_matrices,
            });
            self.artifact.skins.len() - 1
        });

        log::debug!(
            "Serialized mesh {}: {} accessor groups, {} bytes so far",
            mesh.id,
            primitives.len(),
            self.artifact.buffer.len()
        );
        self.artifact.meshes.push(MeshRecord {
            id: mesh.id.clone(),
            primitives,
            skin,
        });
    }

    /// Append a pose block: per-bone rotations stored `xyzw`, then translations.
    pub fn add_pose(
        &mut self,
        pose_id: &str,
        armature_id: &str,
        skeleton: &Skeleton,
        bones: &[(DQuat, DVec3)],
    ) {
        let rotations: Vec<[f64; 4]> = bones.iter().map(|(q, _)| [q.x, q.y, q.z, q.w]).collect();
        let translations: Vec<DVec3> = bones.iter().map(|(_, t)| *t).collect();
        let rotations = self.push_vec4(&rotations);
        let translations = self.push_vec3(&translations);
        self.artifact.poses.push(PoseRecord {
            id: pose_id.to_string(),
            armature: armature_id.to_string(),
            bones: skeleton.ids.clone(),
            rotations,
            translations,
        });
    }

    pub fn finish(mut self) -> Artifact {
        self.align();
        self.artifact.byte_length = self.artifact.buffer.len();
        self.artifact
    }
}

fn narrow_vec3(v: DVec3) -> [f32; 3] {
    [narrow(v.x), narrow(v.y), narrow(v.z)]
}

fn narrowed_bounds(values: &[[f32; 3]]) -> Option<([f32; 3], [f32; 3])> {
    let (first, rest) = values.split_first()?;
    let mut min = *first;
    let mut max = *first;
    for v in rest {
        for axis in 0..3 {
            if v[axis] < min[axis] {
                min[axis] = v[axis];
            }
            if v[axis] > max[axis] {
                max[axis] = v[axis];
            }
        }
    }
    Some((min, max))
}
