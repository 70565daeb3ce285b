//! Dual-quaternion skinning.
//!
//! Bones are blended as unit dual quaternions. Before summing, every
//! contributing quaternion is moved into the hemisphere of the contributing
//! bone with the lowest index, so rotations interpolate along the short path.
//! The sum is fully normalized (real part to unit length, dual part made
//! orthogonal to it) before it is applied.

use rigforge_math::quat::quat_dot;
use rigforge_math::{DVec3, DualQuat};

use crate::armature::Skeleton;
use crate::error::SolverError;
use crate::influence::{CanonicalInfluences, InfluenceTable};
use crate::skinning::pose::PosedSkeleton;

/// Reject any bone that contributes to the table but carries scale.
pub fn check_rigid(
    skeleton: &Skeleton,
    posed: &PosedSkeleton,
    table: &InfluenceTable,
) -> Result<(), SolverError> {
    let mut contributing = vec![false; skeleton.len()];
    for slots in &table.influences {
        for influence in slots.iter().filter(|i| i.weight != 0.0) {
            contributing[influence.bone] = true;
        }
    }

    match (0..skeleton.len()).find(|&b| contributing[b] && !posed.bones[b].rigid) {
        Some(bone) => Err(SolverError::NonRigid {
            bone: skeleton.ids[bone].clone(),
        }),
        None => Ok(()),
    }
}

/// Hemisphere-corrected weighted sum, before normalization.
pub fn blend(posed: &PosedSkeleton, influences: &CanonicalInfluences) -> DualQuat {
    let contributing = || influences.iter().filter(|i| i.weight != 0.0);
    let reference = match contributing().min_by_key(|i| i.bone) {
        Some(influence) => posed.dual_quats[influence.bone].real,
        None => return DualQuat::ZERO,
    };

    let mut sum = DualQuat::ZERO;
    for influence in contributing() {
        let dq = posed.dual_quats[influence.bone];
        let dq = if quat_dot(dq.real, reference) < 0.0 {
            dq.negated()
        } else {
            dq
        };
        sum = sum.add_weighted(&dq, influence.weight);
    }
    sum
}

/// Deform one vertex. Translation applies to the position only.
pub fn skin_vertex(
    posed: &PosedSkeleton,
    influences: &CanonicalInfluences,
    vertex: usize,
    position: DVec3,
    normal: DVec3,
) -> Result<(DVec3, DVec3), SolverError> {
    let dq = blend(posed, influences)
        .normalized()
        .ok_or(SolverError::DegenerateBlend { vertex })?;
    Ok((dq.transform_point(position), dq.transform_normal(normal)))
}
