use nalgebra::{Matrix3, Vector3};

use crate::{color::RGBA, error::validation_err, placement::LocalFrame, Result};

/// Post-sample color modifier.
///
/// Receives the classified sample and the density gradient in local
/// coordinates. Opacity must be passed through unchanged.
pub trait Lighting {
    fn shade(&self, color: RGBA, gradient: &Vector3<f32>) -> RGBA;

    /// If false, the kernel skips the gradient estimate
    fn needs_gradient(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    /// Direction the light travels in world space
    pub direction: Vector3<f32>,
    pub color: Vector3<f32>,
    pub intensity: f32,
}

impl DirectionalLight {
    pub fn new(direction: Vector3<f32>, color: Vector3<f32>, intensity: f32) -> DirectionalLight {
        DirectionalLight {
            direction,
            color,
            intensity,
        }
    }

    /// White light of intensity 1
    pub fn white(direction: Vector3<f32>) -> DirectionalLight {
        DirectionalLight::new(direction, Vector3::repeat(1.0), 1.0)
    }

    fn validate(&self) -> Result<()> {
        let len = self.direction.norm();
        if !len.is_finite() || len <= f32::EPSILON {
            return Err(validation_err("light direction must be non-zero"));
        }
        if self.color.iter().any(|c| !c.is_finite() || *c < 0.0) {
            return Err(validation_err("light color must be non-negative"));
        }
        if !self.intensity.is_finite() || self.intensity < 0.0 {
            return Err(validation_err("light intensity must be non-negative"));
        }
        Ok(())
    }
}

/// Lighting of one placement
#[derive(Debug, Clone, PartialEq, Default)]
pub enum LightingMode {
    /// Transfer function color as is
    #[default]
    Unlit,
    Lambertian {
        light: DirectionalLight,
        ambient: f32,
    },
    MultiLight {
        lights: Vec<DirectionalLight>,
        ambient: f32,
    },
}

impl LightingMode {
    pub fn validate(&self) -> Result<()> {
        let (lights, ambient) = match self {
            LightingMode::Unlit => return Ok(()),
            LightingMode::Lambertian { light, ambient } => (std::slice::from_ref(light), *ambient),
            LightingMode::MultiLight { lights, ambient } => (&lights[..], *ambient),
        };
        if !(0.0..=1.0).contains(&ambient) {
            return Err(validation_err(format!("ambient {ambient} outside <0;1>")));
        }
        lights.iter().try_for_each(DirectionalLight::validate)
    }

    /// Convert lights into the unit cube of `frame`
    pub fn prepare(&self, frame: &LocalFrame) -> PreparedLighting {
        let (lights, ambient) = match self {
            LightingMode::Unlit => return PreparedLighting::unlit(),
            LightingMode::Lambertian { light, ambient } => (std::slice::from_ref(light), *ambient),
            LightingMode::MultiLight { lights, ambient } => (&lights[..], *ambient),
        };
        let lights = lights
            .iter()
            .map(|l| LocalLight {
                // Gradient . this == world gradient . world direction
                direction: frame.vector_to_local(&l.direction.normalize()),
                radiance: l.color * l.intensity,
            })
            .collect();
        PreparedLighting {
            lights,
            ambient,
            normal_matrix: frame.normal_matrix(),
            enabled: true,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct LocalLight {
    direction: Vector3<f32>,
    radiance: Vector3<f32>,
}

/// [`LightingMode`] ready for one pass
#[derive(Debug, Clone)]
pub struct PreparedLighting {
    lights: Vec<LocalLight>,
    ambient: f32,
    normal_matrix: Matrix3<f32>,
    enabled: bool,
}

impl PreparedLighting {
    pub fn unlit() -> PreparedLighting {
        PreparedLighting {
            lights: vec![],
            ambient: 1.0,
            normal_matrix: Matrix3::identity(),
            enabled: false,
        }
    }
}

impl Lighting for PreparedLighting {
    fn shade(&self, color: RGBA, gradient: &Vector3<f32>) -> RGBA {
        if !self.enabled {
            return color;
        }
        let world_len = (self.normal_matrix * gradient).norm();
        if world_len <= f32::EPSILON {
            return color;
        }

        // Normal is the negated gradient, light comes from -direction
        let mut light = Vector3::repeat(self.ambient);
        for l in &self.lights {
            let cos = gradient.dot(&l.direction) / world_len;
            if cos > 0.0 {
                light += l.radiance * cos;
            }
        }

        let mut shaded = color;
        for i in 0..3 {
            shaded[i] = (color[i] * light[i]).min(1.0);
        }
        shaded
    }

    fn needs_gradient(&self) -> bool {
        self.enabled
    }
}
