use nalgebra::Vector3;

use crate::{error::validation_err, Result};

pub const DEFAULT_TERMINATION_THRESHOLD: f32 = 0.995;

/// Frame-wide rendering settings
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    pub resolution: (usize, usize),
    pub early_ray_termination: bool,
    pub termination_threshold: f32,
    /// Step over bricks whose values the transfer function maps to nothing
    pub empty_space_skipping: bool,
    /// Worker threads per frame
    pub workers: usize,
    /// Color the frame is cleared to
    pub background: Vector3<f32>,
}

impl RenderOptions {
    pub fn builder() -> RenderOptionsBuilder {
        RenderOptionsBuilder::new()
    }

    pub fn validate(&self) -> Result<()> {
        if self.resolution.0 == 0 || self.resolution.1 == 0 {
            return Err(validation_err(format!(
                "resolution {:?} has no pixels",
                self.resolution
            )));
        }
        if !(self.termination_threshold > 0.0 && self.termination_threshold <= 1.0) {
            return Err(validation_err(format!(
                "termination threshold {} outside (0;1>",
                self.termination_threshold
            )));
        }
        if self.workers == 0 {
            return Err(validation_err("at least one worker needed"));
        }
        if self.background.iter().any(|c| !(0.0..=1.0).contains(c)) {
            return Err(validation_err("background color outside <0;1>"));
        }
        Ok(())
    }
}

impl Default for RenderOptions {
    fn default() -> Self {
        RenderOptionsBuilder::new().build_unchecked()
    }
}

pub struct RenderOptionsBuilder {
    resolution: (usize, usize),
    early_ray_termination: bool,
    termination_threshold: f32,
    empty_space_skipping: bool,
    workers: Option<usize>,
    background: Vector3<f32>,
}

impl RenderOptionsBuilder {
    pub fn new() -> RenderOptionsBuilder {
        RenderOptionsBuilder {
            resolution: (512, 512),
            early_ray_termination: true,
            termination_threshold: DEFAULT_TERMINATION_THRESHOLD,
            empty_space_skipping: true,
            workers: None,
            background: Vector3::zeros(),
        }
    }

    pub fn resolution(mut self, width: usize, height: usize) -> Self {
        self.resolution = (width, height);
        self
    }

    pub fn early_ray_termination(mut self, enabled: bool) -> Self {
        self.early_ray_termination = enabled;
        self
    }

    pub fn termination_threshold(mut self, threshold: f32) -> Self {
        self.termination_threshold = threshold;
        self
    }

    pub fn empty_space_skipping(mut self, enabled: bool) -> Self {
        self.empty_space_skipping = enabled;
        self
    }

    /// Defaults to the number of available cores
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }

    pub fn background(mut self, background: Vector3<f32>) -> Self {
        self.background = background;
        self
    }

    pub fn build(self) -> Result<RenderOptions> {
        let options = self.build_unchecked();
        options.validate()?;
        Ok(options)
    }

    /// Skip validation
    pub fn build_unchecked(self) -> RenderOptions {
        let workers = self.workers.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        });
        RenderOptions {
            resolution: self.resolution,
            early_ray_termination: self.early_ray_termination,
            termination_threshold: self.termination_threshold,
            empty_space_skipping: self.empty_space_skipping,
            workers,
            background: self.background,
        }
    }
}

impl Default for RenderOptionsBuilder {
    fn default() -> Self {
        RenderOptionsBuilder::new()
    }
}

#[cfg(test)]
mod test {
    use nalgebra::vector;

    use super::*;

    #[test]
    fn defaults_are_valid() {
        let options = RenderOptions::builder().build().unwrap();
        assert_eq!(options.termination_threshold, 0.995);
        assert!(options.early_ray_termination);
        assert!(options.empty_space_skipping);
        assert!(options.workers >= 1);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(RenderOptions::builder().resolution(0, 10).build().is_err());
        assert!(RenderOptions::builder().termination_threshold(0.0).build().is_err());
        assert!(RenderOptions::builder().termination_threshold(1.2).build().is_err());
        assert!(RenderOptions::builder().workers(0).build().is_err());
        assert!(RenderOptions::builder()
            .background(vector![2.0, 0.0, 0.0])
            .build()
            .is_err());
    }
}
