//! Phase pattern generators
//!
//! Every generator returns 16-bit phase frames ready for
//! `Session::write_image` or `Session::load_sequence`. Values are phase in
//! units of 2π/65536 before calibration and LUT.
//!
//! | Module        | Output                                              |
//! |---------------|-----------------------------------------------------|
//! | [`uniform`]   | one flat frame                                      |
//! | [`stripes`]   | cosine gratings by pitch (µm), angle and phase      |
//! | [`sim`]       | structured-illumination set: angles × phases        |
//! | [`grating`]   | binary square gratings for alignment                |
//! | [`ramp`]      | sawtooth ramps between two levels, both axes        |

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(unused_must_use)]
// ────────────────────────────────────────────────────────────────────────────
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod grating;
pub mod ramp;
pub mod sim;
pub mod stripes;
pub mod uniform;

/// Pattern parameters that describe no drawable pattern.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PatternError {
    /// Period must be finite and positive.
    #[error("pattern period {0} px is not finite and positive")]
    InvalidPeriod(f64),
    /// Pixel pitch must be finite and positive.
    #[error("pixel pitch {0} µm is not finite and positive")]
    InvalidPixelPitch(f64),
}

/// Round and clamp to the 16-bit phase range.
pub(crate) fn to_sample(value: f64) -> u16 {
    // Clamped to 0..=65535 first; NaN saturates to 0.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let sample = value.round().clamp(0.0, f64::from(u16::MAX)) as u16;
    sample
}

pub(crate) fn check_period(period_px: f64) -> Result<f64, PatternError> {
    if period_px.is_finite() && period_px > 0.0 {
        Ok(period_px)
    } else {
        Err(PatternError::InvalidPeriod(period_px))
    }
}

pub(crate) fn check_pixel_pitch(pitch_um: f64) -> Result<f64, PatternError> {
    if pitch_um.is_finite() && pitch_um > 0.0 {
        Ok(pitch_um)
    } else {
        Err(PatternError::InvalidPixelPitch(pitch_um))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn samples_clamp_to_range() {
        assert_eq!(to_sample(-5.0), 0);
        assert_eq!(to_sample(70_000.0), u16::MAX);
        assert_eq!(to_sample(32_767.5), 32_768);
        assert_eq!(to_sample(f64::NAN), 0);
    }
}
