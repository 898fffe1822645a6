//! Per-board calibration images and the correction pipeline.
//!
//! Correction order for every staged sample:
//!
//! ```text
//! phase ──(+ WFC, mod 2^16)──(× NUC / 65535)──(LUT)──> drive code
//! ```
//!
//! WFC is a phase offset, so it wraps. NUC is a gain where 65535 is unity.
//! A missing image means no correction for that stage.

use std::sync::Arc;

use slm_hal::CalType;

use crate::frame::Frame;
use crate::lut::Lut;

/// NUC value that leaves a sample unchanged.
pub const NUC_UNITY: u16 = u16::MAX;

/// Calibration images held for one board.
#[derive(Debug, Clone)]
pub struct CalibrationStore {
    nuc: Option<Arc<[u16]>>,
    wfc: Option<Arc<[u16]>>,
    enabled: bool,
}

impl Default for CalibrationStore {
    fn default() -> Self {
        Self::new(true)
    }
}

impl CalibrationStore {
    /// Empty store.
    #[must_use]
    pub fn new(enabled: bool) -> Self {
        Self {
            nuc: None,
            wfc: None,
            enabled,
        }
    }

    /// Replace the image for `cal`. The caller has checked the size.
    ///
    /// Pipelines built before the call keep the old image.
    pub fn replace(&mut self, cal: CalType, image: &Frame) {
        let slot = match cal {
            CalType::Nuc => &mut self.nuc,
            CalType::Wfc => &mut self.wfc,
        };
        *slot = Some(image.shared_samples());
    }

    /// Drop the image for `cal`.
    pub fn clear(&mut self, cal: CalType) {
        match cal {
            CalType::Nuc => self.nuc = None,
            CalType::Wfc => self.wfc = None,
        }
    }

    /// Whether an image is stored for `cal`.
    #[must_use]
    pub fn has(&self, cal: CalType) -> bool {
        match cal {
            CalType::Nuc => self.nuc.is_some(),
            CalType::Wfc => self.wfc.is_some(),
        }
    }

    /// Toggle correction without discarding images.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Whether correction is applied.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Snapshot the active images together with `lut`.
    #[must_use]
    pub fn pipeline(&self, lut: &Lut) -> CorrectionPipeline {
        let (wfc, nuc) = if self.enabled {
            (self.wfc.clone(), self.nuc.clone())
        } else {
            (None, None)
        };
        CorrectionPipeline {
            wfc,
            nuc,
            lut: lut.clone(),
        }
    }
}

/// Immutable snapshot of a board's correction state.
#[derive(Debug, Clone, Default)]
pub struct CorrectionPipeline {
    wfc: Option<Arc<[u16]>>,
    nuc: Option<Arc<[u16]>>,
    lut: Lut,
}

impl CorrectionPipeline {
    /// Pipeline that only applies `lut`.
    #[must_use]
    pub fn lut_only(lut: Lut) -> Self {
        Self {
            wfc: None,
            nuc: None,
            lut,
        }
    }

    /// Whether the pipeline leaves samples unchanged.
    #[must_use]
    pub fn is_passthrough(&self) -> bool {
        self.wfc.is_none() && self.nuc.is_none() && self.lut.is_identity()
    }

    /// Convert phase samples to drive codes.
    #[must_use]
    pub fn render(&self, phase: &[u16]) -> Vec<u16> {
        let mut drive = phase.to_vec();
        if let Some(wfc) = &self.wfc {
            for (sample, offset) in drive.iter_mut().zip(wfc.iter()) {
                *sample = sample.wrapping_add(*offset);
            }
        }
        if let Some(nuc) = &self.nuc {
            for (sample, gain) in drive.iter_mut().zip(nuc.iter()) {
                *sample = apply_gain(*sample, *gain);
            }
        }
        self.lut.apply(&mut drive);
        drive
    }
}

/// `sample * gain / 65535`, rounded to nearest.
#[inline]
fn apply_gain(sample: u16, gain: u16) -> u16 {
    let scaled = (u32::from(sample) * u32::from(gain) + 32_767) / 65_535;
    u16::try_from(scaled).unwrap_or(u16::MAX)
}
