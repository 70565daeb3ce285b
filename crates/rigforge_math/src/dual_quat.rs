//! Unit dual quaternions for rigid-transform blending.

use glam::{DQuat, DVec3};

use crate::quat::{
    quat_add, quat_conj, quat_dot, quat_mul, quat_pure, quat_rotate, quat_scale, quat_sub,
};

/// A dual quaternion `real + ε·dual`.
///
/// For a rigid transform, `real` is the rotation and
/// `dual = 0.5 · (0, t) · real`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DualQuat {
    pub real: DQuat,
    pub dual: DQuat,
}

impl DualQuat {
    /// All-zero accumulator for weighted sums.
    pub const ZERO: DualQuat = DualQuat {
        real: DQuat::from_xyzw(0.0, 0.0, 0.0, 0.0),
        dual: DQuat::from_xyzw(0.0, 0.0, 0.0, 0.0),
    };

    pub const IDENTITY: DualQuat = DualQuat {
        real: DQuat::IDENTITY,
        dual: DQuat::from_xyzw(0.0, 0.0, 0.0, 0.0),
    };

    /// Build from a unit rotation and a translation applied after it.
    pub fn from_rotation_translation(rotation: DQuat, translation: DVec3) -> Self {
        let dual = quat_scale(quat_mul(quat_pure(translation), rotation), 0.5);
        Self {
            real: rotation,
            dual,
        }
    }

    /// Negate both parts (same rigid transform, opposite hemisphere).
    pub fn negated(&self) -> Self {
        Self {
            real: quat_scale(self.real, -1.0),
            dual: quat_scale(self.dual, -1.0),
        }
    }

    /// `self + weight · other`, both parts.
    pub fn add_weighted(&self, other: &DualQuat, weight: f64) -> Self {
        Self {
            real: quat_add(self.real, quat_scale(other.real, weight)),
            dual: quat_add(self.dual, quat_scale(other.dual, weight)),
        }
    }

    /// Full normalization.
    ///
    /// Divides both parts by the norm of the real part, then removes from the
    /// dual part its projection onto the unit real part, so the result is
    /// unit length and satisfies `real · dual = 0`. Returns `None` when the
    /// real part has zero norm.
    pub fn normalized(&self) -> Option<Self> {
        let norm_sq = quat_dot(self.real, self.real);
        let norm = norm_sq.sqrt();
        if !(norm > 0.0) {
            return None;
        }
        let inv = 1.0 / norm;

        let real = quat_scale(self.real, inv);
        let dual_scaled = quat_scale(self.dual, inv);
        let dual = quat_sub(
            dual_scaled,
            quat_scale(real, quat_dot(real, dual_scaled)),
        );

        Some(Self { real, dual })
    }

    /// Translation encoded by a normalized dual quaternion: vector part of `2 · dual · conj(real)`.
    pub fn translation(&self) -> DVec3 {
        let t = quat_scale(quat_mul(self.dual, quat_conj(self.real)), 2.0);
        DVec3::new(t.x, t.y, t.z)
    }

    /// Rotate then translate a point.
    pub fn transform_point(&self, p: DVec3) -> DVec3 {
        quat_rotate(self.real, p) + self.translation()
    }

    /// Rotate a direction. Translation never applies to normals.
    pub fn transform_normal(&self, n: DVec3) -> DVec3 {
        quat_rotate(self.real, n)
    }
}
