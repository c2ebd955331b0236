//! Mapping of normalized scalar intensity to color and opacity.

mod lookup_table;
mod range;

use std::sync::Arc;

use parking_lot::Mutex;

use crate::{
    color::{self, RGBA},
    error::validation_err,
    Result,
};

pub use lookup_table::LookupTable;
pub use range::{CutoffMode, TfRangeParameters};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlPoint {
    pub scalar: f32,
    pub color: RGBA,
}

impl ControlPoint {
    pub fn new(scalar: f32, color: RGBA) -> ControlPoint {
        ControlPoint { scalar, color }
    }
}

/// Piecewise-linear curve of control points with strictly increasing scalars.
///
/// The lookup table used by the renderer is derived from the curve lazily
/// and kept until the curve or its range parameters change.
pub struct TransferFunction {
    points: Vec<ControlPoint>,
    range: TfRangeParameters,
    revision: u64,
    cache: Mutex<Option<Arc<LookupTable>>>,
}

impl TransferFunction {
    /// Empty curve, every lookup is transparent
    pub fn new() -> TransferFunction {
        TransferFunction {
            points: vec![],
            range: TfRangeParameters::default(),
            revision: 0,
            cache: Mutex::new(None),
        }
    }

    pub fn from_points(points: Vec<ControlPoint>) -> Result<TransferFunction> {
        let mut tf = TransferFunction::new();
        tf.set_control_points(points)?;
        Ok(tf)
    }

    /// Replace the curve. On error the previous curve stays active.
    pub fn set_control_points(&mut self, points: Vec<ControlPoint>) -> Result<()> {
        if let Err(e) = validate_points(&points) {
            log::warn!("Rejected transfer function curve: {e}");
            return Err(e);
        }
        self.points = points;
        self.revision += 1;
        Ok(())
    }

    pub fn control_points(&self) -> &[ControlPoint] {
        &self.points
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Changes with every accepted edit
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn range_parameters(&self) -> TfRangeParameters {
        self.range
    }

    /// Validate and apply range parameters. On error the previous ones stay active.
    pub fn set_range_parameters(&mut self, params: TfRangeParameters) -> Result<()> {
        let params = params.sanitized().map_err(|e| {
            log::warn!("Rejected transfer function range: {e}");
            e
        })?;
        self.range = params;
        self.revision += 1;
        Ok(())
    }

    /// Color at `scalar`, clamped to the curve ends
    pub fn lookup(&self, scalar: f32) -> RGBA {
        let points = &self.points;
        let (first, last) = match (points.first(), points.last()) {
            (Some(f), Some(l)) => (f, l),
            _ => return color::zero(),
        };
        if scalar <= first.scalar {
            return first.color;
        }
        if scalar >= last.scalar {
            return last.color;
        }
        // First point strictly above scalar, never 0 or len here
        let upper = points.partition_point(|p| p.scalar <= scalar);
        let a = &points[upper - 1];
        let b = &points[upper];
        let t = (scalar - a.scalar) / (b.scalar - a.scalar);
        color::lerp(&a.color, &b.color, t)
    }

    /// Curve resampled into `resolution` entries over the intensity domain.
    ///
    /// Built at most once per curve revision and resolution.
    pub fn build_lookup_texture(&self, resolution: usize) -> Result<Arc<LookupTable>> {
        if resolution < 2 {
            return Err(validation_err(format!(
                "lookup resolution must be at least 2, got {resolution}"
            )));
        }

        let mut cache = self.cache.lock();
        if let Some(table) = cache.as_ref() {
            if table.revision() == self.revision && table.resolution() == resolution {
                return Ok(table.clone());
            }
        }

        let table = Arc::new(LookupTable::resample(self, resolution));
        log::debug!(
            "Built transfer function table, revision {}, {} entries",
            self.revision,
            resolution
        );
        *cache = Some(table.clone());
        Ok(table)
    }
}

fn validate_points(points: &[ControlPoint]) -> Result<()> {
    if points.is_empty() {
        return Err(validation_err("transfer function needs at least one point"));
    }
    for point in points {
        if !point.scalar.is_finite() {
            return Err(validation_err("control point scalar is not finite"));
        }
        if point.color.iter().any(|c| !(0.0..=1.0).contains(c)) {
            return Err(validation_err(format!(
                "control point color {:?} outside <0;1>",
                point.color.as_slice()
            )));
        }
    }
    if let Some(w) = points.windows(2).find(|w| w[0].scalar >= w[1].scalar) {
        return Err(validation_err(format!(
            "control point scalars not strictly increasing: {} then {}",
            w[0].scalar, w[1].scalar
        )));
    }
    Ok(())
}

impl Default for TransferFunction {
    fn default() -> Self {
        TransferFunction::new()
    }
}

impl Clone for TransferFunction {
    fn clone(&self) -> Self {
        TransferFunction {
            points: self.points.clone(),
            range: self.range,
            revision: self.revision,
            cache: Mutex::new(self.cache.lock().clone()),
        }
    }
}

impl std::fmt::Debug for TransferFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferFunction")
            .field("points", &self.points.len())
            .field("range", &self.range)
            .field("revision", &self.revision)
            .finish()
    }
}
