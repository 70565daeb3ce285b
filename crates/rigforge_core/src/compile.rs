//! The compilation driver.
//!
//! Each mesh goes through tessellation, UV generation and (when bound)
//! influence resolution independently, optionally on the rayon pool. Results
//! are then serialized sequentially in declaration order. The first error in
//! declaration order aborts the run and no artifact is produced.

use rayon::prelude::*;

use crate::advisory::{self, Advisory, AdvisoryCode};
use crate::armature::Skeleton;
use crate::config::CompileOptions;
use crate::error::{CompileError, CompileResult, ResolveError, SolverError};
use crate::influence::{resolve_influences, InfluenceTable};
use crate::mesh::Mesh;
use crate::scene::{Binding, MeshDef, Pose, Scene, ShapeKind, IMPLICIT_DEFAULT_MATERIAL};
use crate::serialize::{Artifact, ArtifactBuilder, MeshInput, SkinInput};
use crate::skinning::{deform, evaluate_pose, pose_rotations, resolve_solver, DeformedGeometry};
use crate::tessellation::{check_profile, tessellate_mesh};
use crate::uv::{generate_uv_channels, UvChannel};

/// Output of a successful compilation.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledScene {
    pub artifact: Artifact,
    /// Advisories in mesh order, including suppressed ones.
    pub advisories: Vec<Advisory>,
}

/// A bound mesh's armature and resolved influences.
#[derive(Debug, Clone)]
struct SkinStage<'s> {
    binding: &'s Binding,
    skeleton: Skeleton,
    table: InfluenceTable,
}

/// Everything computed for one mesh before serialization.
#[derive(Debug, Clone)]
struct MeshStage<'s> {
    mesh: Mesh,
    uv_channels: Vec<UvChannel>,
    skin: Option<SkinStage<'s>>,
    advisories: Vec<Advisory>,
}

impl<'s> MeshStage<'s> {
    fn input(&self) -> MeshInput<'_> {
        let input = MeshInput::rest(&self.mesh, &self.uv_channels);
        match &self.skin {
            Some(skin) => input.with_skin(SkinInput {
                armature_id: &skin.binding.armature_id,
                skeleton: &skin.skeleton,
                table: &skin.table,
            }),
            None => input,
        }
    }
}

/// Bindings must name existing meshes and armatures, at most one per mesh.
fn check_bindings(scene: &Scene) -> Result<(), ResolveError> {
    let mut bound: Vec<&str> = Vec::with_capacity(scene.bindings.len());
    for binding in &scene.bindings {
        if scene.mesh(&binding.mesh_id).is_none() {
            return Err(ResolveError::UnknownMesh(binding.mesh_id.clone()));
        }
        if scene.armature(&binding.armature_id).is_none() {
            return Err(ResolveError::UnknownArmature(binding.armature_id.clone()));
        }
        if bound.contains(&binding.mesh_id.as_str()) {
            return Err(ResolveError::DuplicateBinding(binding.mesh_id.clone()));
        }
        bound.push(&binding.mesh_id);
    }
    Ok(())
}

/// Primitive materials must be declared, except the implicit-surface default.
fn check_materials(scene: &Scene) -> Result<(), ResolveError> {
    for primitive in scene.meshes.iter().flat_map(|m| &m.primitives) {
        if let Some(material) = &primitive.material {
            if material != IMPLICIT_DEFAULT_MATERIAL && scene.material(material).is_none() {
                return Err(ResolveError::UnknownMaterial {
                    primitive: primitive.id.clone(),
                    material: material.clone(),
                });
            }
        }
    }
    Ok(())
}

fn influence_error(binding: &Binding, source: ResolveError) -> CompileError {
    CompileError::Influence {
        mesh: binding.mesh_id.clone(),
        armature: binding.armature_id.clone(),
        source,
    }
}

fn solver_error(binding: &Binding, source: SolverError) -> CompileError {
    CompileError::Solver {
        mesh: binding.mesh_id.clone(),
        armature: binding.armature_id.clone(),
        source,
    }
}

fn compile_mesh<'s>(
    scene: &'s Scene,
    def: &MeshDef,
    options: &CompileOptions,
) -> CompileResult<MeshStage<'s>> {
    let mesh = tessellate_mesh(def, options).map_err(|source| CompileError::Tessellation {
        mesh: def.id.clone(),
        source,
    })?;

    let mut advisories: Vec<Advisory> = mesh
        .primitives
        .iter()
        .filter(|p| p.kind == ShapeKind::ImplicitSurface && p.indices.is_empty())
        .map(|p| {
            Advisory::new(
                AdvisoryCode::W02,
                &mesh.id,
                format!("implicit primitive {} produced no triangles", p.id),
            )
        })
        .collect();

    let uv_channels = generate_uv_channels(def, &mesh).map_err(|source| CompileError::Uv {
        mesh: def.id.clone(),
        source,
    })?;

    let skin = match scene.binding_for(&def.id) {
        Some(binding) => {
            let armature = scene
                .armature(&binding.armature_id)
                .ok_or_else(|| ResolveError::UnknownArmature(binding.armature_id.clone()))?;
            let skeleton =
                Skeleton::resolve(armature).map_err(|e| influence_error(binding, e))?;
            let resolved = resolve_influences(binding, &mesh, &skeleton, options.parallel)
                .map_err(|e| influence_error(binding, e))?;
            advisories.extend(resolved.advisories);
            Some(SkinStage {
                binding,
                skeleton,
                table: resolved.table,
            })
        }
        None => None,
    };

    log::debug!(
        "Compiled mesh {}: {} vertices, {} UV channels, skinned: {}",
        mesh.id,
        mesh.vertex_count(),
        uv_channels.len(),
        skin.is_some()
    );
    Ok(MeshStage {
        mesh,
        uv_channels,
        skin,
        advisories,
    })
}

/// Run the per-mesh stages and keep declaration order.
fn compile_meshes<'s>(
    scene: &'s Scene,
    options: &CompileOptions,
) -> CompileResult<Vec<MeshStage<'s>>> {
    check_profile(&options.tessellation_profile)?;
    check_bindings(scene)?;
    check_materials(scene)?;

    let results: Vec<CompileResult<MeshStage<'s>>> = if options.parallel {
        scene
            .meshes
            .par_iter()
            .map(|def| compile_mesh(scene, def, options))
            .collect()
    } else {
        scene
            .meshes
            .iter()
            .map(|def| compile_mesh(scene, def, options))
            .collect()
    };
    results.into_iter().collect()
}

fn report(stages: &[MeshStage<'_>], options: &CompileOptions) -> Vec<Advisory> {
    let advisories: Vec<Advisory> = stages
        .iter()
        .flat_map(|stage| stage.advisories.iter().cloned())
        .collect();
    advisory::emit(&advisories, options);
    advisories
}

/// Compile a scene in its rest pose, with skin data for every bound mesh.
pub fn compile_scene(scene: &Scene, options: &CompileOptions) -> CompileResult<CompiledScene> {
    let stages = compile_meshes(scene, options)?;

    let mut builder = ArtifactBuilder::with_materials(&scene.materials);
    for stage in &stages {
        builder.add_mesh(&stage.input(), options.primitive_split);
    }
    let artifact = builder.finish();
    let advisories = report(&stages, options);

    log::info!(
        "Compiled {} meshes, {} skins: {} bytes, {} advisories",
        artifact.meshes.len(),
        artifact.skins.len(),
        artifact.byte_length,
        advisories.len()
    );
    Ok(CompiledScene {
        artifact,
        advisories,
    })
}

/// Compile a scene with one pose baked into the geometry.
///
/// Bound meshes are deformed by their binding's solver (or the default) and
/// emitted without skin data. UVs stay those of the rest geometry. One pose
/// block is written per distinct bound armature.
pub fn bake_scene(
    scene: &Scene,
    pose_id: &str,
    options: &CompileOptions,
) -> CompileResult<CompiledScene> {
    let pose: &Pose = scene
        .pose(pose_id)
        .ok_or_else(|| SolverError::UnknownPose(pose_id.to_string()))?;
    let stages = compile_meshes(scene, options)?;

    // Every pose evaluation is validated before any vertex moves.
    let mut posed = Vec::with_capacity(stages.len());
    for stage in &stages {
        posed.push(match &stage.skin {
            Some(skin) => Some(
                evaluate_pose(&skin.skeleton, pose).map_err(|e| solver_error(skin.binding, e))?,
            ),
            None => None,
        });
    }

    let mut deformed: Vec<Option<DeformedGeometry>> = Vec::with_capacity(stages.len());
    for (stage, posed) in stages.iter().zip(&posed) {
        deformed.push(match (&stage.skin, posed) {
            (Some(skin), Some(posed)) => {
                let solver = resolve_solver(skin.binding.solver, options.default_solver);
                Some(
                    deform(
                        &stage.mesh,
                        &skin.table,
                        &skin.skeleton,
                        posed,
                        solver,
                        options.parallel,
                    )
                    .map_err(|e| solver_error(skin.binding, e))?,
                )
            }
            _ => None,
        });
    }

    let mut builder = ArtifactBuilder::with_materials(&scene.materials);
    for (stage, geometry) in stages.iter().zip(&deformed) {
        let mut input = MeshInput::rest(&stage.mesh, &stage.uv_channels);
        if let Some(geometry) = geometry {
            input.positions = &geometry.positions;
            input.normals = &geometry.normals;
        }
        builder.add_mesh(&input, options.primitive_split);
    }

    let mut written: Vec<&str> = Vec::new();
    for skin in stages.iter().filter_map(|s| s.skin.as_ref()) {
        let armature_id = skin.binding.armature_id.as_str();
        if written.contains(&armature_id) {
            continue;
        }
        let bones =
            pose_rotations(&skin.skeleton, pose).map_err(|e| solver_error(skin.binding, e))?;
        builder.add_pose(pose_id, armature_id, &skin.skeleton, &bones);
        written.push(armature_id);
    }

    let artifact = builder.finish();
    let advisories = report(&stages, options);

    log::info!(
        "Baked pose {} into {} meshes: {} bytes, {} advisories",
        pose_id,
        artifact.meshes.len(),
        artifact.byte_length,
        advisories.len()
    );
    Ok(CompiledScene {
        artifact,
        advisories,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PrimitiveSplit;
    use crate::error::TessellationError;
    use crate::scene::{
        Armature, Axis, Bone, BoneWeight, Domain, Gradient, GridResolution, ImplicitSurface,
        Material, PoseBone, Primitive, PrimitiveTransform, Shape, Solver, WeightMap,
    };
    use crate::serialize::AlphaMode;
    use crate::serialize::Accessor;

    fn floats(artifact: &Artifact, accessor: usize) -> Vec<f32> {
        let view = &artifact.views[artifact.accessors[accessor].view];
        artifact.buffer[view.offset..view.offset + view.length]
            .chunks(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect()
    }

    fn shorts(artifact: &Artifact, accessor: usize) -> Vec<u16> {
        let view = &artifact.views[artifact.accessors[accessor].view];
        artifact.buffer[view.offset..view.offset + view.length]
            .chunks(2)
            .map(|b| u16::from_le_bytes([b[0], b[1]]))
            .collect()
    }

    fn unit_box() -> Shape {
        Shape::Box {
            x: 1.0,
            y: 1.0,
            z: 1.0,
        }
    }

    fn single_bone_scene() -> Scene {
        Scene::new()
            .with_mesh(MeshDef::new("cube").with_primitive(Primitive::new("body", unit_box())))
            .with_armature(Armature::new(
                "rig",
                vec![Bone::new("root", None, [0.0; 3], [0.0, 1.0, 0.0])],
            ))
            .with_binding(
                Binding::new("cube", "rig").with_weights("body", vec![BoneWeight::new("root", 1.0)]),
            )
    }

    fn arm_scene() -> Scene {
        let limb = Primitive::new(
            "limb",
            Shape::Capsule {
                radius: 0.1,
                height: 1.8,
            },
        )
        .with_transform(PrimitiveTransform::from_translation([0.0, 1.0, 0.0]));

        Scene::new()
            .with_mesh(
                MeshDef::new("arm")
                    .with_primitive(limb)
                    .with_uv_set("uv0", "capsule_cyl_latlong@1"),
            )
            .with_armature(Armature::new(
                "arm_rig",
                vec![
                    Bone::new("shoulder", None, [0.0, 2.0, 0.0], [0.0, 0.95, 0.0]),
                    Bone::new("elbow", Some("shoulder"), [0.0, 0.95, 0.0], [0.0, 0.0, 0.0]),
                ],
            ))
            .with_binding(Binding::new("arm", "arm_rig").with_weight_map(WeightMap {
                primitive_id: "limb".to_string(),
                external: None,
                gradients: vec![Gradient {
                    axis: Axis::Y,
                    range: [0.88, 1.02],
                    from: vec![BoneWeight::new("elbow", 1.0)],
                    to: vec![BoneWeight::new("shoulder", 1.0)],
                }],
                overrides: Vec::new(),
            }))
    }

    #[test]
    fn test_scenario_a_single_bone_box() {
        let compiled = compile_scene(&single_bone_scene(), &CompileOptions::default()).unwrap();
        let artifact = &compiled.artifact;
        let primitive = &artifact.meshes[0].primitives[0];

        let position: &Accessor = &artifact.accessors[primitive.position];
        assert_eq!(position.count, 24);
        assert_eq!(artifact.accessors[primitive.indices].count, 36);

        let joints = shorts(artifact, primitive.joints.unwrap());
        assert_eq!(joints, vec![0u16; 96]);
        let weights = floats(artifact, primitive.weights.unwrap());
        for vertex in weights.chunks(4) {
            assert_eq!(vertex, [1.0, 0.0, 0.0, 0.0]);
        }

        assert_eq!(artifact.skins.len(), 1);
        let ibm = floats(artifact, artifact.skins[0].inverse_bind_matrices);
        let identity: Vec<f32> = rigforge_math::DMat4::IDENTITY
            .to_cols_array()
            .iter()
            .map(|&v| v as f32)
            .collect();
        assert_eq!(ibm, identity);
        assert!(compiled.advisories.is_empty());
    }

    #[test]
    fn test_scenario_b_gradient_capsule() {
        let scene = arm_scene();
        let stages = compile_meshes(&scene, &CompileOptions::sequential()).unwrap();
        let stage = &stages[0];
        let table = &stage.skin.as_ref().unwrap().table;
        let (shoulder, elbow) = (0, 1);

        let mut blended = 0;
        for (p, slots) in stage.mesh.positions.iter().zip(&table.influences) {
            if p.y < 0.88 {
                assert_eq!(slots[0].bone, elbow);
                assert_eq!(slots[0].weight, 1.0);
                assert_eq!(slots[1].weight, 0.0);
            } else if p.y > 1.02 {
                assert_eq!(slots[0].bone, shoulder);
                assert_eq!(slots[0].weight, 1.0);
                assert_eq!(slots[1].weight, 0.0);
            } else {
                let t = (p.y - 0.88) / (1.02 - 0.88);
                let shoulder_weight = slots
                    .iter()
                    .find(|i| i.bone == shoulder && i.weight > 0.0)
                    .map_or(0.0, |i| i.weight);
                assert!((shoulder_weight - t).abs() < 1e-12);
                blended += 1;
            }
        }
        assert!(blended > 0);
    }

    #[test]
    fn test_scenario_c_sphere_counts_ignore_radius() {
        for radius in [0.01, 1.0, 250.0] {
            let scene = Scene::new().with_mesh(
                MeshDef::new("ball").with_primitive(Primitive::new("s", Shape::Sphere { radius })),
            );
            let artifact = compile_scene(&scene, &CompileOptions::default())
                .unwrap()
                .artifact;
            let primitive = &artifact.meshes[0].primitives[0];
            assert_eq!(artifact.accessors[primitive.position].count, 561);
            assert_eq!(artifact.accessors[primitive.indices].count, 3072);
        }
    }

    #[test]
    fn test_scenario_d_dual_quaternion_hemisphere() {
        let (s, c) = (10f64.to_radians().sin(), 10f64.to_radians().cos());
        let scene = Scene::new()
            .with_mesh(MeshDef::new("cube").with_primitive(Primitive::new("body", unit_box())))
            .with_armature(Armature::new(
                "rig",
                vec![
                    Bone::new("root", None, [0.0; 3], [0.0, 1.0, 0.0]),
                    Bone::new("a", Some("root"), [0.0; 3], [1.0, 0.0, 0.0]),
                    Bone::new("b", Some("root"), [0.0; 3], [-1.0, 0.0, 0.0]),
                ],
            ))
            .with_binding(
                Binding::new("cube", "rig")
                    .with_solver(Solver::DualQuaternion)
                    .with_weights(
                        "body",
                        vec![BoneWeight::new("a", 0.5), BoneWeight::new("b", 0.5)],
                    ),
            )
            .with_pose(
                Pose::new("twist")
                    .with_bone("a", PoseBone::rotation([c, 0.0, 0.0, s]))
                    .with_bone("b", PoseBone::rotation([-c, 0.0, 0.0, -s])),
            );

        let baked = bake_scene(&scene, "twist", &CompileOptions::default()).unwrap();
        let artifact = &baked.artifact;
        assert!(artifact.skins.is_empty());
        let primitive = &artifact.meshes[0].primitives[0];
        assert!(primitive.joints.is_none());

        let rest = compile_meshes(&scene, &CompileOptions::sequential()).unwrap();
        let positions = floats(artifact, primitive.position);
        let rotation = rigforge_math::DQuat::from_rotation_z(20f64.to_radians());
        for (p, baked) in rest[0].mesh.positions.iter().zip(positions.chunks(3)) {
            let expected = rotation * *p;
            assert!((baked[0] as f64 - expected.x).abs() < 1e-6);
            assert!((baked[1] as f64 - expected.y).abs() < 1e-6);
            assert!((baked[2] as f64 - expected.z).abs() < 1e-6);
        }

        // The pose block stores the normalized rotation vector-first.
        let pose = &artifact.poses[0];
        assert_eq!(pose.bones, vec!["root", "a", "b"]);
        let rotations = floats(artifact, pose.rotations);
        let expected = [0.0, 0.0, s, c];
        for (stored, expected) in rotations[4..8].iter().zip(expected) {
            assert!((*stored as f64 - expected).abs() < 1e-7);
        }
    }

    #[test]
    fn test_recompile_is_byte_identical() {
        let scene = arm_scene();
        let first = compile_scene(&scene, &CompileOptions::default()).unwrap();
        let second = compile_scene(&scene, &CompileOptions::default()).unwrap();
        let sequential = compile_scene(&scene, &CompileOptions::sequential()).unwrap();

        assert_eq!(first.artifact.buffer, second.artifact.buffer);
        assert_eq!(first.artifact, sequential.artifact);
    }

    #[test]
    fn test_rest_uvs_survive_bake() {
        let scene = arm_scene().with_pose(
            Pose::new("bend").with_bone("elbow", PoseBone::rotation([0.8, 0.6, 0.0, 0.0])),
        );
        let rest = compile_scene(&scene, &CompileOptions::default()).unwrap();
        let baked = bake_scene(&scene, "bend", &CompileOptions::default()).unwrap();

        let uv = |a: &Artifact| floats(a, a.meshes[0].primitives[0].uvs[0].accessor);
        assert_eq!(uv(&rest.artifact), uv(&baked.artifact));

        let position = |a: &Artifact| floats(a, a.meshes[0].primitives[0].position);
        assert_ne!(position(&rest.artifact), position(&baked.artifact));
    }

    #[test]
    fn test_errors_name_binding_and_bone() {
        let scene = arm_scene().with_pose(
            Pose::new("squash").with_bone("elbow", PoseBone::default().with_scale([1.0, 0.5, 1.0])),
        );
        let options = CompileOptions::default().with_solver(Solver::DualQuaternion);
        let err = bake_scene(&scene, "squash", &options).unwrap_err();
        assert_eq!(
            err,
            CompileError::Solver {
                mesh: "arm".to_string(),
                armature: "arm_rig".to_string(),
                source: SolverError::NonRigid {
                    bone: "elbow".to_string()
                },
            }
        );

        assert_eq!(
            bake_scene(&scene, "missing", &options).unwrap_err(),
            CompileError::Pose(SolverError::UnknownPose("missing".to_string()))
        );

        let unbound = arm_scene().with_binding(Binding::new("leg", "arm_rig"));
        assert_eq!(
            compile_scene(&unbound, &options).unwrap_err(),
            CompileError::Scene(ResolveError::UnknownMesh("leg".to_string()))
        );
    }

    #[test]
    fn test_first_error_in_declaration_order() {
        let bad_uv = |id: &str| {
            MeshDef::new(id)
                .with_primitive(Primitive::new("p", unit_box()))
                .with_uv_set("uv0", "sphere_latlong@1")
        };
        let scene = Scene::new().with_mesh(bad_uv("first")).with_mesh(bad_uv("second"));

        for options in [CompileOptions::default(), CompileOptions::sequential()] {
            match compile_scene(&scene, &options).unwrap_err() {
                CompileError::Uv { mesh, .. } => assert_eq!(mesh, "first"),
                other => panic!("unexpected error: {other}"),
            }
        }
    }

    #[test]
    fn test_unknown_profile_rejected() {
        let options = CompileOptions {
            tessellation_profile: "v2".to_string(),
            ..Default::default()
        };
        assert_eq!(
            compile_scene(&single_bone_scene(), &options).unwrap_err(),
            CompileError::Options(TessellationError::UnknownProfile("v2".to_string()))
        );
    }

    #[test]
    fn test_empty_implicit_reports_advisory() {
        let empty = ImplicitSurface {
            domain: Domain {
                min: [-1.0; 3],
                max: [1.0; 3],
            },
            grid: GridResolution {
                nx: 4,
                ny: 4,
                nz: 4,
            },
            iso: 0.5,
            ops: Vec::new(),
        };
        let scene = Scene::new().with_mesh(
            MeshDef::new("blob")
                .with_primitive(Primitive::new("field", Shape::ImplicitSurface(empty))),
        );
        let options = CompileOptions {
            suppress_advisories: vec![AdvisoryCode::W02],
            ..Default::default()
        };
        let compiled = compile_scene(&scene, &options).unwrap();

        assert_eq!(compiled.advisories.len(), 1);
        assert_eq!(compiled.advisories[0].code, AdvisoryCode::W02);
        let primitive = &compiled.artifact.meshes[0].primitives[0];
        assert_eq!(compiled.artifact.accessors[primitive.position].count, 0);
        let material = &compiled.artifact.materials[primitive.material.unwrap()];
        assert_eq!(material.id, IMPLICIT_DEFAULT_MATERIAL);
    }

    #[test]
    fn test_capped_influences_reported() {
        let bones = ["root", "a", "b", "c", "d"];
        let armature = Armature::new(
            "rig",
            bones
                .iter()
                .enumerate()
                .map(|(i, id)| {
                    Bone::new(*id, (i > 0).then_some("root"), [0.0; 3], [0.0, 1.0, 0.0])
                })
                .collect(),
        );
        let scene = Scene::new()
            .with_mesh(MeshDef::new("cube").with_primitive(Primitive::new("body", unit_box())))
            .with_armature(armature)
            .with_binding(Binding::new("cube", "rig").with_weights(
                "body",
                bones.iter().map(|b| BoneWeight::new(*b, 0.2)).collect(),
            ));
        let compiled = compile_scene(&scene, &CompileOptions::default()).unwrap();

        assert_eq!(compiled.advisories.len(), 24);
        assert!(compiled
            .advisories
            .iter()
            .all(|a| a.code == AdvisoryCode::W01));

        // Equal weights: the four lowest ids win ("a" < "b" < "c" < "d" < "root").
        let primitive = &compiled.artifact.meshes[0].primitives[0];
        let joints = shorts(&compiled.artifact, primitive.joints.unwrap());
        assert_eq!(&joints[..4], &[1, 2, 3, 4]);
        let weights = floats(&compiled.artifact, primitive.weights.unwrap());
        assert_eq!(&weights[..4], &[0.25f32; 4]);
    }

    #[test]
    fn test_material_split_keeps_one_skin() {
        let scene = Scene::new()
            .with_mesh(
                MeshDef::new("robot")
                    .with_primitive(Primitive::new("torso", unit_box()).with_material("steel"))
                    .with_primitive(
                        Primitive::new("head", Shape::Sphere { radius: 0.4 })
                            .with_material("glass")
                            .with_transform(PrimitiveTransform::from_translation([0.0, 1.0, 0.0])),
                    ),
            )
            .with_armature(Armature::new(
                "rig",
                vec![Bone::new("root", None, [0.0; 3], [0.0, 1.0, 0.0])],
            ))
            .with_binding(Binding::new("robot", "rig"))
            .with_material(Material::new("glass").with_base_color([0.7, 0.8, 0.9, 0.3]))
            .with_material(Material::new("steel").with_base_color([0.5, 0.5, 0.55, 1.0]));

        let split = compile_scene(&scene, &CompileOptions::default()).unwrap().artifact;
        assert_eq!(split.meshes[0].primitives.len(), 2);
        assert_eq!(split.skins.len(), 1);
        // First use order, not declaration order.
        assert_eq!(split.materials[0].id, "steel");
        assert_eq!(split.meshes[0].primitives[1].material, Some(1));
        assert_eq!(split.materials[1].alpha_mode, AlphaMode::Blend);

        let merged = compile_scene(
            &scene,
            &CompileOptions::default().with_split(PrimitiveSplit::Merged),
        )
        .unwrap()
        .artifact;
        assert_eq!(merged.meshes[0].primitives.len(), 1);
        assert_eq!(merged.accessors[merged.meshes[0].primitives[0].position].count, 24 + 561);
    }

    #[test]
    fn test_unknown_material_rejected() {
        let scene = Scene::new().with_mesh(
            MeshDef::new("cube")
                .with_primitive(Primitive::new("body", unit_box()).with_material("chrome")),
        );
        assert_eq!(
            compile_scene(&scene, &CompileOptions::default()).unwrap_err(),
            CompileError::Scene(ResolveError::UnknownMaterial {
                primitive: "body".to_string(),
                material: "chrome".to_string(),
            })
        );

        let declared = scene.with_material(Material::new("chrome"));
        let artifact = compile_scene(&declared, &CompileOptions::default())
            .unwrap()
            .artifact;
        assert_eq!(artifact.materials.len(), 1);
        assert_eq!(artifact.materials[0].alpha_mode, AlphaMode::Opaque);
    }

    #[test]
    fn test_duplicate_binding_rejected() {
        let scene = single_bone_scene().with_binding(Binding::new("cube", "rig"));
        for options in [CompileOptions::default(), CompileOptions::sequential()] {
            assert_eq!(
                compile_scene(&scene, &options).unwrap_err(),
                CompileError::Scene(ResolveError::DuplicateBinding("cube".to_string()))
            );
        }
    }
}
