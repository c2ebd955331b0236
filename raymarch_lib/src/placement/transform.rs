use nalgebra::{Matrix3, Matrix4, Point3, UnitQuaternion, Vector3};

use crate::{
    common::{BoundBox, Ray},
    error::validation_err,
    Result,
};

/// Scale, then rotation, then translation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    translation: Vector3<f32>,
    rotation: UnitQuaternion<f32>,
    scale: Vector3<f32>,
}

impl Transform {
    /// Scale must be finite and non-zero on every axis
    pub fn new(
        translation: Vector3<f32>,
        rotation: UnitQuaternion<f32>,
        scale: Vector3<f32>,
    ) -> Result<Transform> {
        if scale.iter().any(|s| !s.is_finite() || *s == 0.0) {
            return Err(validation_err(format!("invalid scale {:?}", scale.as_slice())));
        }
        if translation.iter().any(|t| !t.is_finite()) {
            return Err(validation_err("translation is not finite"));
        }
        Ok(Transform {
            translation,
            rotation,
            scale,
        })
    }

    pub fn identity() -> Transform {
        Transform {
            translation: Vector3::zeros(),
            rotation: UnitQuaternion::identity(),
            scale: Vector3::repeat(1.0),
        }
    }

    pub fn from_translation(translation: Vector3<f32>) -> Result<Transform> {
        Transform::new(translation, UnitQuaternion::identity(), Vector3::repeat(1.0))
    }

    pub fn translation(&self) -> Vector3<f32> {
        self.translation
    }

    pub fn rotation(&self) -> UnitQuaternion<f32> {
        self.rotation
    }

    pub fn scale(&self) -> Vector3<f32> {
        self.scale
    }

    /// Same transform applied after an extra per-axis scale
    pub(crate) fn pre_scaled(&self, factor: &Vector3<f32>) -> Transform {
        Transform {
            scale: self.scale.component_mul(factor),
            ..*self
        }
    }

    pub fn apply_point(&self, p: &Point3<f32>) -> Point3<f32> {
        Point3::from(self.apply_vector(&p.coords) + self.translation)
    }

    pub fn inverse_point(&self, p: &Point3<f32>) -> Point3<f32> {
        Point3::from(self.inverse_vector(&(p.coords - self.translation)))
    }

    pub fn apply_vector(&self, v: &Vector3<f32>) -> Vector3<f32> {
        self.rotation * v.component_mul(&self.scale)
    }

    pub fn inverse_vector(&self, v: &Vector3<f32>) -> Vector3<f32> {
        self.rotation.inverse_transform_vector(v).component_div(&self.scale)
    }

    /// Linear part, maps directions
    pub fn linear(&self) -> Matrix3<f32> {
        self.rotation.to_rotation_matrix().matrix() * Matrix3::from_diagonal(&self.scale)
    }

    pub fn matrix(&self) -> Matrix4<f32> {
        Matrix4::new_translation(&self.translation)
            * self.rotation.to_homogeneous()
            * Matrix4::new_nonuniform_scaling(&self.scale)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Transform::identity()
    }
}

/// Mapping between the unit cube of a volume and the world, fixed for one pass.
///
/// Local coordinates are `<0;1>^3` over the whole volume, regardless of its
/// resolution and voxel spacing.
#[derive(Debug, Clone, Copy)]
pub struct LocalFrame {
    transform: Transform,
}

impl LocalFrame {
    /// `extent` is the physical size of the volume
    pub fn new(transform: &Transform, extent: &Vector3<f32>) -> LocalFrame {
        LocalFrame {
            transform: transform.pre_scaled(extent),
        }
    }

    pub fn local_to_world(&self, p: &Point3<f32>) -> Point3<f32> {
        self.transform.apply_point(p)
    }

    pub fn world_to_local(&self, p: &Point3<f32>) -> Point3<f32> {
        self.transform.inverse_point(p)
    }

    /// Direction in world to local, not normalized
    pub fn vector_to_local(&self, v: &Vector3<f32>) -> Vector3<f32> {
        self.transform.inverse_vector(v)
    }

    /// Ray in local coordinates and the local length of one world unit along it.
    ///
    /// A world distance `t` along `ray` is `t * scale` along the returned ray.
    pub fn ray_to_local(&self, ray: &Ray) -> (Ray, f32) {
        let origin = self.world_to_local(&ray.origin);
        let direction = self.vector_to_local(&ray.direction);
        let scale = direction.norm();
        (
            Ray {
                origin,
                direction: direction / scale,
            },
            scale,
        )
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    /// Axis aligned world box around the unit cube
    pub fn world_bound_box(&self) -> BoundBox {
        let corners = BoundBox::unit().into_iter().map(|c| self.local_to_world(&c));
        // Unit box always has corners
        BoundBox::from_points(corners).unwrap_or_else(BoundBox::unit)
    }

    pub fn center_world(&self) -> Point3<f32> {
        self.local_to_world(&Point3::new(0.5, 0.5, 0.5))
    }

    /// Maps local gradients to world gradients, inverse transpose of the linear part
    pub fn normal_matrix(&self) -> Matrix3<f32> {
        let s = self.transform.scale;
        let inv_scale = Matrix3::from_diagonal(&s.map(|v| 1.0 / v));
        self.transform.rotation.to_rotation_matrix().matrix() * inv_scale
    }
}
