//! Skinning solvers for the pose-bake path.
//!
//! Both solvers read the canonical influence table and the rest geometry and
//! return a new deformed copy. Nothing here mutates the mesh or the table.

pub mod dqs;
pub mod lbs;
pub mod pose;

use rayon::prelude::*;
use rigforge_math::DVec3;

use crate::armature::Skeleton;
use crate::error::SolverError;
use crate::influence::InfluenceTable;
use crate::mesh::Mesh;
use crate::scene::Solver;

pub use pose::{evaluate_pose, pose_rotations, BoneState, PosedSkeleton, MIN_QUAT_NORM};

/// Per-binding override, falling back to the compile default.
pub fn resolve_solver(binding: Option<Solver>, default: Solver) -> Solver {
    binding.unwrap_or(default)
}

/// Deformed positions and normals, in the mesh's vertex order.
#[derive(Debug, Clone, PartialEq)]
pub struct DeformedGeometry {
    pub positions: Vec<DVec3>,
    pub normals: Vec<DVec3>,
}

/// Deform a mesh with an evaluated pose.
///
/// For dual-quaternion skinning every contributing bone is checked for
/// rigidity before any vertex is evaluated.
pub fn deform(
    mesh: &Mesh,
    table: &InfluenceTable,
    skeleton: &Skeleton,
    posed: &PosedSkeleton,
    solver: Solver,
    parallel: bool,
) -> Result<DeformedGeometry, SolverError> {
    if solver == Solver::DualQuaternion {
        dqs::check_rigid(skeleton, posed, table)?;
    }

    let skin = |v: usize| -> Result<(DVec3, DVec3), SolverError> {
        let influences = &table.influences[v];
        let (p, n) = (mesh.positions[v], mesh.normals[v]);
        match solver {
            Solver::LinearBlend => Ok(lbs::skin_vertex(posed, influences, p, n)),
            Solver::DualQuaternion => dqs::skin_vertex(posed, influences, v, p, n),
        }
    };

    let results: Vec<Result<(DVec3, DVec3), SolverError>> = if parallel {
        (0..mesh.vertex_count()).into_par_iter().map(skin).collect()
    } else {
        (0..mesh.vertex_count()).map(skin).collect()
    };

    let mut positions = Vec::with_capacity(results.len());
    let mut normals = Vec::with_capacity(results.len());
    for result in results {
        let (p, n) = result?;
        positions.push(p);
        normals.push(n);
    }

    log::debug!(
        "Deformed {} with {:?}: {} vertices",
        mesh.id,
        solver,
        positions.len()
    );
    Ok(DeformedGeometry { positions, normals })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompileOptions;
    use crate::influence::resolve_influences;
    use crate::scene::{
        Armature, Axis, Binding, Bone, BoneWeight, Gradient, MeshDef, Pose, PoseBone, Primitive,
        Shape, WeightMap,
    };
    use crate::tessellation::tessellate_mesh;

    fn rig() -> Skeleton {
        Skeleton::resolve(&Armature::new(
            "arm_rig",
            vec![
                Bone::new("shoulder", None, [0.0, 0.0, 0.0], [0.0, 0.95, 0.0]),
                Bone::new("elbow", Some("shoulder"), [0.0, 0.95, 0.0], [0.0, 1.9, 0.0]),
            ],
        ))
        .unwrap()
    }

    fn arm() -> (Mesh, Binding) {
        let def = MeshDef::new("arm").with_primitive(Primitive::new(
            "limb",
            Shape::Capsule {
                radius: 0.1,
                height: 1.9,
            },
        ));
        let mesh = tessellate_mesh(&def, &CompileOptions::sequential()).unwrap();
        let binding = Binding::new("arm", "arm_rig").with_weight_map(WeightMap {
            primitive_id: "limb".to_string(),
            external: None,
            gradients: vec![Gradient {
                axis: Axis::Y,
                range: [-0.2, 0.2],
                from: vec![BoneWeight::new("shoulder", 1.0)],
                to: vec![BoneWeight::new("elbow", 1.0)],
            }],
            overrides: Vec::new(),
        });
        (mesh, binding)
    }

    #[test]
    fn test_resolve_solver() {
        assert_eq!(
            resolve_solver(None, Solver::DualQuaternion),
            Solver::DualQuaternion
        );
        assert_eq!(
            resolve_solver(Some(Solver::LinearBlend), Solver::DualQuaternion),
            Solver::LinearBlend
        );
    }

    #[test]
    fn test_identity_pose_dqs_matches_lbs() {
        let skeleton = rig();
        let (mesh, binding) = arm();
        let table = resolve_influences(&binding, &mesh, &skeleton, false)
            .unwrap()
            .table;
        let posed = evaluate_pose(&skeleton, &Pose::new("rest")).unwrap();

        let lbs = deform(&mesh, &table, &skeleton, &posed, Solver::LinearBlend, false).unwrap();
        let dqs = deform(&mesh, &table, &skeleton, &posed, Solver::DualQuaternion, true).unwrap();

        for v in 0..mesh.vertex_count() {
            assert!((lbs.positions[v] - dqs.positions[v]).length() < 1e-6);
            assert!((lbs.normals[v] - dqs.normals[v]).length() < 1e-6);
            assert!((lbs.positions[v] - mesh.positions[v]).length() < 1e-12);
        }
    }

    #[test]
    fn test_dqs_rejects_scaled_bone_before_evaluating() {
        let skeleton = rig();
        let (mesh, binding) = arm();
        let table = resolve_influences(&binding, &mesh, &skeleton, false)
            .unwrap()
            .table;
        let pose = Pose::new("squash").with_bone("elbow", PoseBone::default().with_scale([1.0, 0.5, 1.0]));
        let posed = evaluate_pose(&skeleton, &pose).unwrap();

        assert!(deform(&mesh, &table, &skeleton, &posed, Solver::LinearBlend, false).is_ok());
        assert_eq!(
            deform(&mesh, &table, &skeleton, &posed, Solver::DualQuaternion, false).unwrap_err(),
            SolverError::NonRigid {
                bone: "elbow".to_string()
            }
        );
    }
}
