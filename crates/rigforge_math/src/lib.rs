// Re-export glam for convenience
pub use glam::*;

// Rigforge math types
mod aabb;
mod dual_quat;
mod interval;
pub mod quat;
mod transform;

pub use aabb::Aabb;
pub use dual_quat::DualQuat;
pub use interval::Interval;
pub use transform::RotationMatrix;

/// Narrow a 64-bit value to 32 bits with round-to-nearest, ties-to-even.
///
/// This is the only narrowing conversion the pipeline performs.
#[inline]
pub fn narrow(value: f64) -> f32 {
    value as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dvec3_operations() {
        let a = DVec3::new(1.0, 2.0, 3.0);
        let b = DVec3::new(4.0, 5.0, 6.0);
        assert_eq!(a + b, DVec3::new(5.0, 7.0, 9.0));
    }

    #[test]
    fn test_narrow_rounds_to_nearest_even() {
        // 1 + 2^-24 sits exactly between two f32 values; ties go to the even one (1.0).
        let tie = 1.0 + f64::powi(2.0, -24);
        assert_eq!(narrow(tie), 1.0f32);

        // Slightly above the tie rounds up.
        let above = 1.0 + f64::powi(2.0, -24) + f64::powi(2.0, -40);
        assert_eq!(narrow(above), 1.0f32 + f32::EPSILON);

        // Truncation would give 0.1f32's lower neighbour; rounding gives 0.1f32.
        assert_eq!(narrow(0.1), 0.1f32);
    }
}
