// Rotation matrices for primitive transforms.
//
// Authoring rotations are row-major: Euler XYZ composes as Rz*Ry*Rx and
// quaternions arrive scalar-first. This type keeps that layout and spells
// every product out term by term, so tessellated positions follow the
// authoring arithmetic exactly. Pose composition and skinning use glam's
// affine types, so their output depends on the glam version in use.

use glam::DVec3;

/// A 3x3 rotation matrix stored row-major.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationMatrix {
    pub rows: [[f64; 3]; 3],
}

impl Default for RotationMatrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl RotationMatrix {
    pub const IDENTITY: RotationMatrix = RotationMatrix {
        rows: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
    };

    pub fn from_rows(rows: [[f64; 3]; 3]) -> Self {
        Self { rows }
    }

    /// Build from a quaternion given as `(w, x, y, z)`.
    ///
    /// The quaternion is used as-is; callers normalize first if needed.
    pub fn from_quat_wxyz(w: f64, x: f64, y: f64, z: f64) -> Self {
        let x2 = x + x;
        let y2 = y + y;
        let z2 = z + z;
        let xx = x * x2;
        let xy = x * y2;
        let xz = x * z2;
        let yy = y * y2;
        let yz = y * z2;
        let zz = z * z2;
        let wx = w * x2;
        let wy = w * y2;
        let wz = w * z2;

        Self::from_rows([
            [1.0 - (yy + zz), xy - wz, xz + wy],
            [xy + wz, 1.0 - (xx + zz), yz - wx],
            [xz - wy, yz + wx, 1.0 - (xx + yy)],
        ])
    }

    /// Build from Euler angles in radians, applied X then Y then Z (`Rz * Ry * Rx`).
    pub fn from_euler_xyz(rx: f64, ry: f64, rz: f64) -> Self {
        let (sx, cx) = rx.sin_cos();
        let (sy, cy) = ry.sin_cos();
        let (sz, cz) = rz.sin_cos();

        let rot_x = Self::from_rows([[1.0, 0.0, 0.0], [0.0, cx, -sx], [0.0, sx, cx]]);
        let rot_y = Self::from_rows([[cy, 0.0, sy], [0.0, 1.0, 0.0], [-sy, 0.0, cy]]);
        let rot_z = Self::from_rows([[cz, -sz, 0.0], [sz, cz, 0.0], [0.0, 0.0, 1.0]]);

        rot_z.mul(&rot_y).mul(&rot_x)
    }

    /// Rodrigues rotation about `axis` by `degrees`. A zero axis is left unnormalized.
    pub fn from_axis_angle_degrees(axis: DVec3, degrees: f64) -> Self {
        let angle = degrees.to_radians();
        let len = (axis.x * axis.x + axis.y * axis.y + axis.z * axis.z).sqrt();
        let (x, y, z) = if len > 0.0 {
            (axis.x / len, axis.y / len, axis.z / len)
        } else {
            (axis.x, axis.y, axis.z)
        };
        let (s, c) = angle.sin_cos();
        let t = 1.0 - c;

        Self::from_rows([
            [t * x * x + c, t * x * y - s * z, t * x * z + s * y],
            [t * y * x + s * z, t * y * y + c, t * y * z - s * x],
            [t * z * x - s * y, t * z * y + s * x, t * z * z + c],
        ])
    }

    /// Matrix product `self * rhs`.
    pub fn mul(&self, rhs: &RotationMatrix) -> RotationMatrix {
        let a = &self.rows;
        let b = &rhs.rows;
        let mut rows = [[0.0; 3]; 3];
        for (i, row) in rows.iter_mut().enumerate() {
            for (j, cell) in row.iter_mut().enumerate() {
                *cell = a[i][0] * b[0][j] + a[i][1] * b[1][j] + a[i][2] * b[2][j];
            }
        }
        RotationMatrix { rows }
    }

    /// Apply to a vector (`M * v`).
    pub fn apply(&self, v: DVec3) -> DVec3 {
        let r = &self.rows;
        DVec3::new(
            r[0][0] * v.x + r[0][1] * v.y + r[0][2] * v.z,
            r[1][0] * v.x + r[1][1] * v.y + r[1][2] * v.z,
            r[2][0] * v.x + r[2][1] * v.y + r[2][2] * v.z,
        )
    }

    /// Apply the transpose (`M^T * v`), the inverse for a pure rotation.
    pub fn apply_transposed(&self, v: DVec3) -> DVec3 {
        let r = &self.rows;
        DVec3::new(
            r[0][0] * v.x + r[1][0] * v.y + r[2][0] * v.z,
            r[0][1] * v.x + r[1][1] * v.y + r[2][1] * v.z,
            r[0][2] * v.x + r[1][2] * v.y + r[2][2] * v.z,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    fn close(a: DVec3, b: DVec3) -> bool {
        (a - b).length() < 1e-12
    }

    #[test]
    fn test_identity_quat_is_identity() {
        let m = RotationMatrix::from_quat_wxyz(1.0, 0.0, 0.0, 0.0);
        assert_eq!(m, RotationMatrix::IDENTITY);
    }

    #[test]
    fn test_euler_z_rotates_x_to_y() {
        let m = RotationMatrix::from_euler_xyz(0.0, 0.0, FRAC_PI_2);
        assert!(close(m.apply(DVec3::X), DVec3::Y));
    }

    #[test]
    fn test_quat_matches_euler_for_single_axis() {
        let half = FRAC_PI_2 / 2.0;
        let q = RotationMatrix::from_quat_wxyz(half.cos(), 0.0, half.sin(), 0.0);
        let e = RotationMatrix::from_euler_xyz(0.0, FRAC_PI_2, 0.0);
        let v = DVec3::new(0.3, -1.2, 2.5);

        assert!(close(q.apply(v), e.apply(v)));
    }

    #[test]
    fn test_axis_angle_normalizes_axis() {
        let m = RotationMatrix::from_axis_angle_degrees(DVec3::new(0.0, 0.0, 5.0), 90.0);
        assert!(close(m.apply(DVec3::X), DVec3::Y));
    }

    #[test]
    fn test_transpose_inverts_rotation() {
        let m = RotationMatrix::from_euler_xyz(0.4, -1.1, 2.0);
        let v = DVec3::new(5.0, 3.0, 2.0);
        let back = m.apply_transposed(m.apply(v));

        assert!(close(back, v));
    }
}
