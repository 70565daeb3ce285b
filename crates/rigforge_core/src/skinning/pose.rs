//! Pose evaluation: validated local bone transforms composed into world and
//! skin transforms.

use rigforge_math::quat::{quat_mul, quat_norm, quat_rotate, quat_scale};
use rigforge_math::{DAffine3, DQuat, DVec3, DualQuat};

use crate::armature::Skeleton;
use crate::error::SolverError;
use crate::scene::{Pose, PoseBone};

/// Pose quaternions with a norm at or below this are rejected.
pub const MIN_QUAT_NORM: f64 = 1e-12;

/// One bone's evaluated transforms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoneState {
    /// Accumulated world rotation (unit).
    pub rotation: DQuat,
    /// World transform, including any scale.
    pub world: DAffine3,
    /// World transform times the inverse bind matrix.
    pub skin: DAffine3,
    /// Every transform along the parent chain has unit scale.
    pub rigid: bool,
}

impl BoneState {
    /// The skin transform as a unit dual quaternion.
    ///
    /// Only meaningful for rigid bones.
    pub fn dual_quat(&self, head: DVec3) -> DualQuat {
        let translation = self.world.translation - quat_rotate(self.rotation, head);
        DualQuat::from_rotation_translation(self.rotation, translation)
    }
}

/// All bones of a skeleton evaluated for one pose, in bone order.
#[derive(Debug, Clone, PartialEq)]
pub struct PosedSkeleton {
    pub bones: Vec<BoneState>,
    pub dual_quats: Vec<DualQuat>,
}

/// A pose entry after validation.
#[derive(Debug, Clone, Copy, PartialEq)]
struct LocalPose {
    rotation: DQuat,
    translation: DVec3,
    scale: DVec3,
}

impl LocalPose {
    const REST: LocalPose = LocalPose {
        rotation: DQuat::IDENTITY,
        translation: DVec3::ZERO,
        scale: DVec3::ONE,
    };

    fn validate(bone: &str, entry: &PoseBone) -> Result<Self, SolverError> {
        let q = entry.quat();
        let norm = quat_norm(q);
        if !q.is_finite() || !(norm > MIN_QUAT_NORM) {
            return Err(SolverError::InvalidQuaternion {
                bone: bone.to_string(),
            });
        }

        let translation = DVec3::from_array(entry.translation);
        let scale = entry.scale.map(DVec3::from_array).unwrap_or(DVec3::ONE);
        if !translation.is_finite() || !scale.is_finite() {
            return Err(SolverError::NonFinite {
                bone: bone.to_string(),
            });
        }

        Ok(Self {
            rotation: quat_scale(q, 1.0 / norm),
            translation,
            scale,
        })
    }
}

/// Validate every pose entry and return normalized local poses in bone order.
///
/// Bones the pose does not mention stay at rest.
fn local_poses(skeleton: &Skeleton, pose: &Pose) -> Result<Vec<LocalPose>, SolverError> {
    let mut locals = vec![LocalPose::REST; skeleton.len()];
    for (id, entry) in &pose.bones {
        let bone = skeleton
            .bone_index(id)
            .map_err(|_| SolverError::UnknownPoseBone(id.clone()))?;
        locals[bone] = LocalPose::validate(id, entry)?;
    }
    Ok(locals)
}

/// Normalized pose rotations in bone order, for the pose block of a baked artifact.
pub fn pose_rotations(skeleton: &Skeleton, pose: &Pose) -> Result<Vec<(DQuat, DVec3)>, SolverError> {
    Ok(local_poses(skeleton, pose)?
        .into_iter()
        .map(|local| (local.rotation, local.translation))
        .collect())
}

/// Evaluate a pose. Every entry is validated before anything is composed.
pub fn evaluate_pose(skeleton: &Skeleton, pose: &Pose) -> Result<PosedSkeleton, SolverError> {
    let locals = local_poses(skeleton, pose)?;

    let mut states: Vec<Option<BoneState>> = vec![None; skeleton.len()];
    for bone in skeleton.topological_order() {
        let local = &locals[bone];
        let local_affine = DAffine3::from_scale_rotation_translation(
            local.scale,
            local.rotation,
            skeleton.rest_offset(bone) + local.translation,
        );
        let local_rigid = local.scale == DVec3::ONE;

        let parent = skeleton.parents[bone].and_then(|p| states[p]);
        let (rotation, world, rigid) = match parent {
            Some(parent) => (
                quat_mul(parent.rotation, local.rotation),
                parent.world * local_affine,
                parent.rigid && local_rigid,
            ),
            None => (local.rotation, local_affine, local_rigid),
        };

        states[bone] = Some(BoneState {
            rotation,
            world,
            skin: world * DAffine3::from_translation(-skeleton.heads[bone]),
            rigid,
        });
    }

    // Topological order visits every bone, so no slot is left empty.
    let bones: Vec<BoneState> = states.into_iter().flatten().collect();
    let dual_quats = bones
        .iter()
        .zip(&skeleton.heads)
        .map(|(state, head)| state.dual_quat(*head))
        .collect();

    Ok(PosedSkeleton { bones, dual_quats })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Armature, Bone};

    fn chain() -> Skeleton {
        Skeleton::resolve(&Armature::new(
            "rig",
            vec![
                Bone::new("root", None, [0.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
                Bone::new("upper", Some("root"), [0.0, 1.0, 0.0], [0.0, 2.0, 0.0]),
                Bone::new("lower", Some("upper"), [0.0, 2.0, 0.0], [0.0, 3.0, 0.0]),
            ],
        ))
        .unwrap()
    }

    #[test]
    fn test_rest_pose_is_identity_skin() {
        let posed = evaluate_pose(&chain(), &Pose::new("rest")).unwrap();
        for (state, dq) in posed.bones.iter().zip(&posed.dual_quats) {
            let p = DVec3::new(0.3, 1.7, -0.2);
            assert!((state.skin.transform_point3(p) - p).length() < 1e-12);
            assert!((dq.transform_point(p) - p).length() < 1e-12);
            assert!(state.rigid);
        }
    }

    #[test]
    fn test_rotation_propagates_to_children() {
        let half = std::f64::consts::FRAC_1_SQRT_2;
        // 90 degrees about Z at the upper bone.
        let pose = Pose::new("bend").with_bone("upper", PoseBone::rotation([half, 0.0, 0.0, half]));
        let posed = evaluate_pose(&chain(), &pose).unwrap();

        // The lower bone's head (0, 2, 0) swings around (0, 1, 0) to (-1, 1, 0).
        let lower = &posed.bones[2];
        assert!((lower.world.translation - DVec3::new(-1.0, 1.0, 0.0)).length() < 1e-12);
        let tip = lower.skin.transform_point3(DVec3::new(0.0, 3.0, 0.0));
        assert!((tip - DVec3::new(-2.0, 1.0, 0.0)).length() < 1e-12);
        assert!((posed.dual_quats[2].transform_point(DVec3::new(0.0, 3.0, 0.0)) - tip).length() < 1e-12);
    }

    #[test]
    fn test_quaternion_is_normalized() {
        let pose = Pose::new("p").with_bone("root", PoseBone::rotation([2.0, 0.0, 0.0, 0.0]));
        let rotations = pose_rotations(&chain(), &pose).unwrap();
        assert_eq!(rotations[0].0, DQuat::IDENTITY);
    }

    #[test]
    fn test_invalid_entries_rejected() {
        let zero = Pose::new("p").with_bone("upper", PoseBone::rotation([0.0, 0.0, 0.0, 0.0]));
        assert_eq!(
            evaluate_pose(&chain(), &zero).unwrap_err(),
            SolverError::InvalidQuaternion {
                bone: "upper".to_string()
            }
        );

        let nan = Pose::new("p").with_bone("upper", PoseBone::rotation([f64::NAN, 0.0, 0.0, 0.0]));
        assert!(matches!(
            evaluate_pose(&chain(), &nan),
            Err(SolverError::InvalidQuaternion { .. })
        ));

        let inf = Pose::new("p").with_bone("lower", PoseBone::default().with_translation([f64::INFINITY, 0.0, 0.0]));
        assert!(matches!(
            evaluate_pose(&chain(), &inf),
            Err(SolverError::NonFinite { .. })
        ));

        let unknown = Pose::new("p").with_bone("tail", PoseBone::default());
        assert_eq!(
            evaluate_pose(&chain(), &unknown).unwrap_err(),
            SolverError::UnknownPoseBone("tail".to_string())
        );
    }

    #[test]
    fn test_scale_marks_descendants_non_rigid() {
        let pose = Pose::new("p").with_bone("upper", PoseBone::default().with_scale([2.0, 2.0, 2.0]));
        let posed = evaluate_pose(&chain(), &pose).unwrap();
        assert!(posed.bones[0].rigid);
        assert!(!posed.bones[1].rigid);
        assert!(!posed.bones[2].rigid);
    }
}
