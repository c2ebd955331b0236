use crate::{common::ValueRange, error::validation_err, Result};

/// What the lookup table holds outside the cutoff window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CutoffMode {
    /// Nearest value inside the window
    Clamp,
    /// Fully transparent
    Clear,
}

/// Part of the curve that is stretched over the lookup table.
///
/// `intensity_domain` is the sub-range of normalized intensity covered by the
/// table. Inside it, intensities below `cutoffs.low` and above `cutoffs.high`
/// are replaced according to `low_cut` and `high_cut`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TfRangeParameters {
    pub intensity_domain: ValueRange,
    pub cutoffs: ValueRange,
    pub low_cut: CutoffMode,
    pub high_cut: CutoffMode,
}

impl TfRangeParameters {
    pub fn new(
        intensity_domain: ValueRange,
        cutoffs: ValueRange,
        low_cut: CutoffMode,
        high_cut: CutoffMode,
    ) -> TfRangeParameters {
        TfRangeParameters {
            intensity_domain,
            cutoffs,
            low_cut,
            high_cut,
        }
    }

    /// Checked copy with the domain clamped into `<0;1>` and cutoffs into the domain
    pub fn sanitized(&self) -> Result<TfRangeParameters> {
        let finite = [self.intensity_domain, self.cutoffs]
            .iter()
            .all(|r| r.low.is_finite() && r.high.is_finite());
        if !finite {
            return Err(validation_err("range parameters must be finite"));
        }
        if self.intensity_domain.high <= self.intensity_domain.low
            || self.cutoffs.high <= self.cutoffs.low
        {
            return Err(validation_err(format!(
                "empty range: domain {:?}, cutoffs {:?}",
                self.intensity_domain, self.cutoffs
            )));
        }

        let domain = ValueRange::new(
            self.intensity_domain.low.clamp(0.0, 1.0),
            self.intensity_domain.high.clamp(0.0, 1.0),
        );
        if domain.high <= domain.low {
            return Err(validation_err(format!(
                "intensity domain {:?} does not overlap <0;1>",
                self.intensity_domain
            )));
        }
        let cutoffs = ValueRange::new(
            self.cutoffs.low.clamp(domain.low, domain.high),
            self.cutoffs.high.clamp(domain.low, domain.high),
        );

        Ok(TfRangeParameters {
            intensity_domain: domain,
            cutoffs,
            ..*self
        })
    }
}

impl Default for TfRangeParameters {
    fn default() -> Self {
        TfRangeParameters {
            intensity_domain: ValueRange::unit(),
            cutoffs: ValueRange::unit(),
            low_cut: CutoffMode::Clamp,
            high_cut: CutoffMode::Clamp,
        }
    }
}
