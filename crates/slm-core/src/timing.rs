//! Sub-frame timing and the true-frame calculation.
//!
//! The panel refreshes in hardware sub-frames. A logical frame shown at
//! `rate` frames/s is repeated for `n` sub-frames ("true frames"), where
//!
//! ```text
//! n = max(bit_plane_depth, ceil(min_refresh_hz / rate))
//! ```
//!
//! `min_refresh_hz` is the slowest refresh that still holds the liquid
//! crystal without visible relaxation; `bit_plane_depth` is how many
//! sub-frames one frame needs at full depth. The rate is representable when
//! `n <= 255` (the frame counter width) and `n * rate <= max_subframe_rate_hz`.
//!
//! | LC type        | max sub-frame rate | min refresh | bit planes | rate range        |
//! |----------------|--------------------|-------------|------------|-------------------|
//! | nematic        | 1000 Hz            | 500 Hz      | 1          | 1.96 – 1000 fps   |
//! | ferroelectric  | 3000 Hz            | 100 Hz      | 2          | 0.39 – 1500 fps   |
//!
//! Ferroelectric panels need two sub-frames per logical frame because every
//! image is followed by its DC-balancing inverse.

use serde::{Deserialize, Serialize};
use slm_hal::{LcType, TrueFrames};

use crate::error::{Result, SlmError};

/// Relative slack for `n * rate <= max` comparisons in floating point.
const CEILING_TOLERANCE: f64 = 1e-9;

/// Panel timing parameters for one liquid-crystal type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimingProfile {
    /// Panel technology the numbers describe.
    pub lc_type: LcType,
    /// Hardware refresh ceiling.
    pub max_subframe_rate_hz: f64,
    /// Slowest refresh that holds the LC state.
    pub min_refresh_hz: f64,
    /// Minimum sub-frames per logical frame.
    pub bit_plane_depth: u32,
}

impl TimingProfile {
    /// Analog nematic panels.
    pub const NEMATIC: Self = Self {
        lc_type: LcType::Nematic,
        max_subframe_rate_hz: 1000.0,
        min_refresh_hz: 500.0,
        bit_plane_depth: 1,
    };

    /// Binary ferroelectric panels.
    pub const FERROELECTRIC: Self = Self {
        lc_type: LcType::Ferroelectric,
        max_subframe_rate_hz: 3000.0,
        min_refresh_hz: 100.0,
        bit_plane_depth: 2,
    };

    /// Factory profile for `lc_type`.
    #[must_use]
    pub const fn for_lc(lc_type: LcType) -> Self {
        match lc_type {
            LcType::Nematic => Self::NEMATIC,
            LcType::Ferroelectric => Self::FERROELECTRIC,
        }
    }

    /// Check the parameters describe a usable panel.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid field.
    pub fn validate(&self) -> Result<(), &'static str> {
        if !(self.max_subframe_rate_hz.is_finite() && self.max_subframe_rate_hz > 0.0) {
            return Err("max_subframe_rate_hz must be finite and positive");
        }
        if !(self.min_refresh_hz.is_finite() && self.min_refresh_hz >= 0.0) {
            return Err("min_refresh_hz must be finite and non-negative");
        }
        if TrueFrames::try_new(self.bit_plane_depth).is_err() {
            return Err("bit_plane_depth must be 1..=255");
        }
        Ok(())
    }

    /// Fastest logical rate: every frame uses exactly `bit_plane_depth` sub-frames.
    #[must_use]
    pub fn max_rate(&self) -> f64 {
        self.max_subframe_rate_hz / f64::from(self.bit_plane_depth)
    }

    /// Slowest logical rate before the true-frame counter overflows.
    #[must_use]
    pub fn min_rate(&self) -> f64 {
        self.min_refresh_hz / f64::from(TrueFrames::MAX)
    }

    /// Fastest logical rate when every frame is held for `frames` sub-frames.
    #[must_use]
    pub fn max_rate_for(&self, frames: TrueFrames) -> f64 {
        self.max_subframe_rate_hz / f64::from(frames.get())
    }

    /// Whether `frames` sub-frames per logical frame fit the sub-frame budget at `rate`.
    #[must_use]
    pub fn fits(&self, frames: TrueFrames, rate: f64) -> bool {
        rate * f64::from(frames.get()) <= self.max_subframe_rate_hz * (1.0 + CEILING_TOLERANCE)
    }

    /// Minimum true frames for `rate`.
    ///
    /// # Errors
    ///
    /// [`SlmError::UnsupportedFrameRate`] when `rate` is not finite, not
    /// positive, below [`Self::min_rate`] or above [`Self::max_rate`].
    pub fn true_frames_for(&self, rate: f64) -> Result<TrueFrames> {
        let unsupported = || SlmError::UnsupportedFrameRate {
            rate,
            lc_type: self.lc_type,
            min: self.min_rate(),
            max: self.max_rate(),
        };
        if !(rate.is_finite() && rate > 0.0) {
            return Err(unsupported());
        }

        let hold = (self.min_refresh_hz / rate).ceil();
        let needed = hold.max(f64::from(self.bit_plane_depth)).max(1.0);
        if needed > f64::from(TrueFrames::MAX) {
            return Err(unsupported());
        }
        // 1.0 <= needed <= 255.0 and integral after ceil().
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let count = needed as u32;
        let frames = TrueFrames::try_new(count).map_err(|_| unsupported())?;
        if !self.fits(frames, rate) {
            return Err(unsupported());
        }
        Ok(frames)
    }
}
