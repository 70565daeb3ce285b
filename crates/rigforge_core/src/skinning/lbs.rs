//! Linear blend skinning.

use rigforge_math::DVec3;

use crate::influence::CanonicalInfluences;
use crate::skinning::pose::PosedSkeleton;

/// Normals shorter than this after blending keep their rest direction.
pub const MIN_NORMAL_LENGTH: f64 = 1e-12;

/// Deform one vertex: weighted sum of each bone's skin transform, in slot order.
pub fn skin_vertex(
    posed: &PosedSkeleton,
    influences: &CanonicalInfluences,
    position: DVec3,
    normal: DVec3,
) -> (DVec3, DVec3) {
    let mut p = DVec3::ZERO;
    let mut n = DVec3::ZERO;
    for influence in influences.iter().filter(|i| i.weight != 0.0) {
        let skin = &posed.bones[influence.bone].skin;
        p += skin.transform_point3(position) * influence.weight;
        n += skin.transform_vector3(normal) * influence.weight;
    }

    let length = n.length();
    let n = if length > MIN_NORMAL_LENGTH {
        n / length
    } else {
        normal
    };
    (p, n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::armature::Skeleton;
    use crate::influence::Influence;
    use crate::scene::{Armature, Bone, Pose, PoseBone};
    use crate::skinning::pose::evaluate_pose;

    fn two_bones() -> Skeleton {
        Skeleton::resolve(&Armature::new(
            "rig",
            vec![
                Bone::new("root", None, [0.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
                Bone::new("tip", Some("root"), [0.0, 1.0, 0.0], [0.0, 2.0, 0.0]),
            ],
        ))
        .unwrap()
    }

    #[test]
    fn test_translation_blend() {
        let pose = Pose::new("p").with_bone("tip", PoseBone::default().with_translation([2.0, 0.0, 0.0]));
        let posed = evaluate_pose(&two_bones(), &pose).unwrap();
        let influences = [
            Influence::new(0, 0.5),
            Influence::new(1, 0.5),
            Influence::EMPTY,
            Influence::EMPTY,
        ];

        let (p, n) = skin_vertex(&posed, &influences, DVec3::new(0.0, 1.5, 0.0), DVec3::Y);
        assert!((p - DVec3::new(1.0, 1.5, 0.0)).length() < 1e-12);
        assert!((n - DVec3::Y).length() < 1e-12);
    }

    #[test]
    fn test_cancelling_normals_fall_back_to_rest() {
        let pose = Pose::new("p").with_bone("tip", PoseBone::rotation([0.0, 0.0, 0.0, 1.0]));
        let posed = evaluate_pose(&two_bones(), &pose).unwrap();
        let influences = [
            Influence::new(0, 0.5),
            Influence::new(1, 0.5),
            Influence::EMPTY,
            Influence::EMPTY,
        ];

        // 180 degrees about Z flips X, so the blended normal vanishes.
        let (_, n) = skin_vertex(&posed, &influences, DVec3::new(0.0, 1.0, 0.0), DVec3::X);
        assert_eq!(n, DVec3::X);
    }

    #[test]
    fn test_blend_accumulates_in_slot_order() {
        let pose = Pose::new("p")
            .with_bone("root", PoseBone::rotation([0.9, 0.1, 0.3, 0.2]))
            .with_bone("tip", PoseBone::default().with_translation([0.1, 0.2, 0.3]));
        let posed = evaluate_pose(&two_bones(), &pose).unwrap();
        let influences = [
            Influence::new(1, 0.7),
            Influence::new(0, 0.3),
            Influence::EMPTY,
            Influence::EMPTY,
        ];
        let rest = DVec3::new(0.1, 1.3, -0.2);

        let (p, _) = skin_vertex(&posed, &influences, rest, DVec3::Y);
        let tip = &posed.bones[1].skin;
        let root = &posed.bones[0].skin;
        let expected =
            DVec3::ZERO + tip.transform_point3(rest) * 0.7 + root.transform_point3(rest) * 0.3;
        assert_eq!(p, expected);
    }
}
