use std::sync::Arc;

use nalgebra::{point, vector, UnitQuaternion, Vector3};
use proptest::prelude::*;
use raymarch_lib::{
    color,
    common::Ray,
    placement::{PlacementId, Transform, VolumePlacement},
    render::{composite, march_ray, MarchParams, PreparedLighting},
    test_helpers,
    transfer_function::{ControlPoint, TransferFunction},
};

fn scale_component() -> impl Strategy<Value = f32> {
    prop_oneof![0.1f32..10.0, -10.0f32..-0.1]
}

prop_compose! {
    fn transform()(
        t in prop::array::uniform3(-100.0f32..100.0),
        angles in prop::array::uniform3(-3.1f32..3.1),
        s in prop::array::uniform3(scale_component()),
    ) -> Transform {
        Transform::new(
            vector![t[0], t[1], t[2]],
            UnitQuaternion::from_euler_angles(angles[0], angles[1], angles[2]),
            vector![s[0], s[1], s[2]],
        )
        .unwrap()
    }
}

prop_compose! {
    fn curve()(mut scalars in prop::collection::vec(-2.0f32..2.0, 1..8),
               colors in prop::collection::vec(prop::array::uniform4(0.0f32..=1.0), 8))
        -> Vec<ControlPoint> {
        scalars.sort_by(|a, b| a.total_cmp(b));
        scalars.dedup();
        scalars
            .iter()
            .zip(colors)
            .map(|(s, c)| ControlPoint::new(*s, color::new(c[0], c[1], c[2], c[3])))
            .collect()
    }
}

prop_compose! {
    // Starts past one face of the unit cube and never comes back to it
    fn missing_ray()(
        axis in 0usize..3,
        above in any::<bool>(),
        gap in 0.01f32..5.0,
        start in prop::array::uniform3(-2.0f32..3.0),
        dir in prop::array::uniform3(-1.0f32..1.0),
        away in 0.1f32..1.0,
        parallel in any::<bool>(),
    ) -> Ray {
        let mut origin = point![start[0], start[1], start[2]];
        origin[axis] = if above { 1.0 + gap } else { -gap };

        let direction = if parallel {
            // Slides along another axis, outside the slab of `axis`
            let mut d = Vector3::zeros();
            d[(axis + 1) % 3] = if dir[0] < 0.0 { -1.0 } else { 1.0 };
            d
        } else {
            let mut d = vector![dir[0], dir[1], dir[2]];
            d[axis] = if above { away } else { -away };
            d
        };
        Ray::new(origin, direction)
    }
}

proptest! {
    #[test]
    fn world_local_round_trip(
        transform in transform(),
        p in prop::array::uniform3(-1.0f32..2.0),
    ) {
        let volume = Arc::new(test_helpers::ramp_volume(vector![4, 3, 5]));
        let placement = VolumePlacement::new(PlacementId(0), volume, test_helpers::red_tf())
            .with_transform(transform);

        let local = point![p[0], p[1], p[2]];
        let back = placement.world_to_local(&placement.local_to_world(&local));
        prop_assert!((back - local).norm() < 1e-3, "{:?} -> {:?}", local, back);
    }

    #[test]
    fn compositing_is_monotone_and_bounded(
        samples in prop::collection::vec(prop::array::uniform4(0.0f32..=1.0), 0..200),
    ) {
        let mut accum = color::zero();
        for s in samples {
            let before = accum.w;
            composite(&mut accum, &color::new(s[0], s[1], s[2], s[3]));
            prop_assert!(accum.w >= before);
            prop_assert!(accum.w <= 1.0);
            prop_assert!(accum.x <= accum.w + 1e-5);
        }
    }

    #[test]
    fn lookup_is_pure(points in curve(), scalar in -3.0f32..3.0) {
        let tf = TransferFunction::from_points(points).unwrap();
        let first = tf.lookup(scalar);
        let table = tf.build_lookup_texture(64).unwrap();
        let sampled = table.sample(scalar);

        for _ in 0..3 {
            prop_assert_eq!(tf.lookup(scalar), first);
            prop_assert_eq!(table.sample(scalar), sampled);
        }
        prop_assert!(first.iter().all(|c| (0.0..=1.0).contains(c)));
    }

    #[test]
    fn rays_missing_the_cube_stay_transparent(ray in missing_ray()) {
        let volume = test_helpers::uniform_volume(vector![4, 4, 4], 255);
        let table = test_helpers::opaque_tf(vector![1.0, 1.0, 1.0])
            .build_lookup_texture(64)
            .unwrap();
        let res = march_ray(
            &ray,
            &*volume.get_gpu_handle(),
            &table,
            &MarchParams::default(),
            &[],
            &PreparedLighting::unlit(),
        );
        prop_assert_eq!(res.opacity, 0.0);
        prop_assert_eq!(res.samples, 0);
    }
}
