//! Quaternion kernels with a fixed term order.
//!
//! Quaternions are carried in glam's `DQuat` (vector-first storage) but every
//! product here is written out in scalar-first Hamilton form, so results do
//! not depend on how glam happens to evaluate its own operators.

use glam::{DQuat, DVec3};

/// Build a quaternion from the authoring order `[w, x, y, z]`.
pub fn quat_from_wxyz(q: [f64; 4]) -> DQuat {
    DQuat::from_xyzw(q[1], q[2], q[3], q[0])
}

/// Hamilton product `a * b`.
pub fn quat_mul(a: DQuat, b: DQuat) -> DQuat {
    let (aw, ax, ay, az) = (a.w, a.x, a.y, a.z);
    let (bw, bx, by, bz) = (b.w, b.x, b.y, b.z);
    DQuat::from_xyzw(
        aw * bx + ax * bw + ay * bz - az * by,
        aw * by - ax * bz + ay * bw + az * bx,
        aw * bz + ax * by - ay * bx + az * bw,
        aw * bw - ax * bx - ay * by - az * bz,
    )
}

/// Conjugate (negated vector part).
pub fn quat_conj(q: DQuat) -> DQuat {
    DQuat::from_xyzw(-q.x, -q.y, -q.z, q.w)
}

/// 4D dot product, summed w, x, y, z.
pub fn quat_dot(a: DQuat, b: DQuat) -> f64 {
    a.w * b.w + a.x * b.x + a.y * b.y + a.z * b.z
}

/// Component-wise scale.
pub fn quat_scale(q: DQuat, s: f64) -> DQuat {
    DQuat::from_xyzw(q.x * s, q.y * s, q.z * s, q.w * s)
}

/// Component-wise sum.
pub fn quat_add(a: DQuat, b: DQuat) -> DQuat {
    DQuat::from_xyzw(a.x + b.x, a.y + b.y, a.z + b.z, a.w + b.w)
}

/// Component-wise difference.
pub fn quat_sub(a: DQuat, b: DQuat) -> DQuat {
    DQuat::from_xyzw(a.x - b.x, a.y - b.y, a.z - b.z, a.w - b.w)
}

/// Pure quaternion `(0, v)`.
pub fn quat_pure(v: DVec3) -> DQuat {
    DQuat::from_xyzw(v.x, v.y, v.z, 0.0)
}

/// Rotate `v` by `q` as `q * (0, v) * conj(q)`, keeping the vector part.
///
/// `q` is expected to be unit length.
pub fn quat_rotate(q: DQuat, v: DVec3) -> DVec3 {
    let r = quat_mul(quat_mul(q, quat_pure(v)), quat_conj(q));
    DVec3::new(r.x, r.y, r.z)
}

/// Euclidean norm, summed w, x, y, z.
pub fn quat_norm(q: DQuat) -> f64 {
    quat_dot(q, q).sqrt()
}
