use nalgebra::{Point3, Vector3};

use crate::{error::validation_err, Result};

use super::LocalFrame;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaneSpace {
    World,
    /// Unit cube coordinates of the placement
    Local,
}

/// Half-space clip. Points with `normal · p >= distance` are kept,
/// the rest is cut away.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CuttingPlane {
    normal: Vector3<f32>,
    distance: f32,
    space: PlaneSpace,
}

impl CuttingPlane {
    pub fn new(normal: Vector3<f32>, distance: f32, space: PlaneSpace) -> Result<CuttingPlane> {
        let len = normal.norm();
        if !len.is_finite() || len <= f32::EPSILON || !distance.is_finite() {
            return Err(validation_err(format!(
                "invalid cutting plane normal {:?}, distance {distance}",
                normal.as_slice()
            )));
        }
        Ok(CuttingPlane {
            normal: normal / len,
            distance: distance / len,
            space,
        })
    }

    /// Plane through `center`, keeping the side `direction` points to
    pub fn from_point_normal(
        center: Point3<f32>,
        direction: Vector3<f32>,
        space: PlaneSpace,
    ) -> Result<CuttingPlane> {
        CuttingPlane::new(direction, direction.dot(&center.coords), space)
    }

    pub fn normal(&self) -> Vector3<f32> {
        self.normal
    }

    pub fn distance(&self) -> f32 {
        self.distance
    }

    pub fn space(&self) -> PlaneSpace {
        self.space
    }

    /// Test in the plane's own space
    pub fn keeps(&self, p: &Point3<f32>) -> bool {
        self.normal.dot(&p.coords) >= self.distance
    }

    /// Same plane in the unit cube of `frame`
    pub fn to_local(&self, frame: &LocalFrame) -> LocalPlane {
        match self.space {
            PlaneSpace::Local => LocalPlane {
                normal: self.normal,
                distance: self.distance,
            },
            PlaneSpace::World => {
                // n . (t + L p) >= d  <=>  (L^T n) . p >= d - n . t
                let t = frame.transform();
                let normal = t.linear().transpose() * self.normal;
                let distance = self.distance - self.normal.dot(&t.translation());
                LocalPlane { normal, distance }
            }
        }
    }
}

/// Cutting plane in local coordinates, normal not normalized
#[derive(Debug, Clone, Copy)]
pub struct LocalPlane {
    normal: Vector3<f32>,
    distance: f32,
}

impl LocalPlane {
    #[inline]
    pub fn keeps(&self, p: &Point3<f32>) -> bool {
        self.normal.dot(&p.coords) >= self.distance
    }
}
