use crate::{
    common::ValueRange, error::validation_err, render::LightingMode, Result,
};

use super::CuttingPlane;

pub const DEFAULT_STEP_SIZE: f32 = 0.01;

/// Per-placement rendering parameters.
///
/// Setters validate their input; a rejected value leaves the previous one active.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderParams {
    step_size: f32,
    window: ValueRange,
    cutting_planes: Vec<CuttingPlane>,
    lighting: LightingMode,
}

impl RenderParams {
    pub fn new() -> RenderParams {
        RenderParams {
            step_size: DEFAULT_STEP_SIZE,
            window: ValueRange::unit(),
            cutting_planes: vec![],
            lighting: LightingMode::Unlit,
        }
    }

    /// Distance between samples in unit cube coordinates
    pub fn step_size(&self) -> f32 {
        self.step_size
    }

    pub fn set_step_size(&mut self, step_size: f32) -> Result<()> {
        if !step_size.is_finite() || step_size <= 0.0 {
            log::warn!("Rejected step size {step_size}");
            return Err(validation_err(format!(
                "step size must be positive, got {step_size}"
            )));
        }
        self.step_size = step_size;
        Ok(())
    }

    /// Intensity window, samples are mapped from it onto `<0;1>` before classification
    pub fn window(&self) -> ValueRange {
        self.window
    }

    pub fn set_window(&mut self, window: ValueRange) -> Result<()> {
        if !window.low.is_finite() || !window.high.is_finite() || window.high <= window.low {
            log::warn!("Rejected intensity window {window:?}");
            return Err(validation_err(format!("invalid intensity window {window:?}")));
        }
        self.window = window;
        Ok(())
    }

    pub fn cutting_planes(&self) -> &[CuttingPlane] {
        &self.cutting_planes
    }

    pub fn add_cutting_plane(&mut self, plane: CuttingPlane) {
        self.cutting_planes.push(plane);
    }

    pub fn remove_cutting_plane(&mut self, index: usize) -> Option<CuttingPlane> {
        if index < self.cutting_planes.len() {
            Some(self.cutting_planes.remove(index))
        } else {
            None
        }
    }

    pub fn clear_cutting_planes(&mut self) {
        self.cutting_planes.clear();
    }

    pub fn lighting(&self) -> &LightingMode {
        &self.lighting
    }

    pub fn set_lighting(&mut self, lighting: LightingMode) -> Result<()> {
        if let Err(e) = lighting.validate() {
            log::warn!("Rejected lighting: {e}");
            return Err(e);
        }
        self.lighting = lighting;
        Ok(())
    }
}

impl Default for RenderParams {
    fn default() -> Self {
        RenderParams::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::RaymarchError;

    #[test]
    fn step_size_must_be_positive() {
        let mut params = RenderParams::new();
        assert!(matches!(
            params.set_step_size(0.0),
            Err(RaymarchError::Validation(_))
        ));
        assert!(params.set_step_size(-0.1).is_err());
        assert!(params.set_step_size(f32::NAN).is_err());
        assert_eq!(params.step_size(), DEFAULT_STEP_SIZE);

        params.set_step_size(0.05).unwrap();
        assert_eq!(params.step_size(), 0.05);
    }

    #[test]
    fn window_must_be_ordered() {
        let mut params = RenderParams::new();
        assert!(params.set_window(ValueRange::new(0.6, 0.6)).is_err());
        assert!(params.set_window(ValueRange::new(0.8, 0.2)).is_err());
        params.set_window(ValueRange::new(0.2, 0.8)).unwrap();
        assert_eq!(params.window(), ValueRange::new(0.2, 0.8));
    }

    #[test]
    fn plane_list() {
        use crate::placement::PlaneSpace;
        use nalgebra::vector;

        let mut params = RenderParams::new();
        let plane = CuttingPlane::new(vector![0.0, 1.0, 0.0], 0.5, PlaneSpace::Local).unwrap();
        params.add_cutting_plane(plane);
        assert_eq!(params.cutting_planes().len(), 1);
        assert!(params.remove_cutting_plane(3).is_none());
        assert_eq!(params.remove_cutting_plane(0), Some(plane));
        assert!(params.cutting_planes().is_empty());
    }
}
