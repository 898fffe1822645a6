//! Cosine stripe gratings.
//!
//! ```text
//! phase(x, y) = 32768 + (waves · 65536 / 2) · cos(φ + 2π (x cos α + y sin α) / p)
//! ```
//!
//! with `p` the stripe pitch in pixels (pitch in µm over the pixel pitch).
//! `waves = 1` spans the full phase range; samples outside it are clamped.

use std::f64::consts::TAU;

use serde::{Deserialize, Serialize};
use slm_core::Frame;
use slm_hal::PanelSize;

use crate::{check_period, check_pixel_pitch, to_sample, PatternError};

/// One stripe frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StripeParams {
    /// Stripe period on the panel in µm.
    pub pitch_um: f64,
    /// Stripe normal, radians from the x axis.
    #[serde(default)]
    pub angle_rad: f64,
    /// Phase offset in radians.
    #[serde(default)]
    pub phase_rad: f64,
    /// Peak-to-peak modulation in waves.
    #[serde(default = "full_wave")]
    pub waves: f64,
}

fn full_wave() -> f64 {
    1.0
}

impl StripeParams {
    /// Vertical stripes of `pitch_um` at zero phase, full modulation.
    #[must_use]
    pub fn new(pitch_um: f64) -> Self {
        Self {
            pitch_um,
            angle_rad: 0.0,
            phase_rad: 0.0,
            waves: 1.0,
        }
    }
}

/// Render one stripe frame for a panel with `pixel_pitch_um` pixels.
pub fn generate(
    panel: PanelSize,
    pixel_pitch_um: f64,
    params: &StripeParams,
) -> Result<Frame, PatternError> {
    let pixel_pitch = check_pixel_pitch(pixel_pitch_um)?;
    let period = check_period(params.pitch_um / pixel_pitch)?;
    let amplitude = params.waves * 32_768.0;
    let (sin_a, cos_a) = params.angle_rad.sin_cos();
    Ok(Frame::from_fn(panel, |x, y| {
        let along = f64::from(x) * cos_a + f64::from(y) * sin_a;
        to_sample(32_768.0 + amplitude * (params.phase_rad + TAU * along / period).cos())
    }))
}

/// Render a sequence, one frame per entry.
pub fn series(
    panel: PanelSize,
    pixel_pitch_um: f64,
    params: &[StripeParams],
) -> Result<Vec<Frame>, PatternError> {
    params
        .iter()
        .map(|p| generate(panel, pixel_pitch_um, p))
        .collect()
}

/// Phase-stepped set: `steps` frames of one grating, phase advancing by 2π/steps.
pub fn phase_steps(
    panel: PanelSize,
    pixel_pitch_um: f64,
    base: StripeParams,
    steps: u32,
) -> Result<Vec<Frame>, PatternError> {
    (0..steps)
        .map(|i| {
            let params = StripeParams {
                phase_rad: base.phase_rad + TAU * f64::from(i) / f64::from(steps),
                ..base
            };
            generate(panel, pixel_pitch_um, &params)
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    const PANEL: PanelSize = PanelSize::new(32, 8);

    #[test]
    fn vertical_stripes_repeat_along_x_only() {
        // 60 µm on 15 µm pixels: 4 px period.
        let frame = generate(PANEL, 15.0, &StripeParams::new(60.0)).unwrap();
        assert_eq!(frame.get(0, 0), Some(u16::MAX));
        assert_eq!(frame.get(2, 0), Some(0));
        assert_eq!(frame.get(4, 5), frame.get(0, 0));
        assert_eq!(frame.get(1, 0), Some(32_768));
    }

    #[test]
    fn horizontal_stripes_repeat_along_y() {
        let params = StripeParams {
            angle_rad: FRAC_PI_2,
            ..StripeParams::new(60.0)
        };
        let frame = generate(PANEL, 15.0, &params).unwrap();
        assert_eq!(frame.get(7, 0), frame.get(0, 0));
        assert_eq!(frame.get(0, 2), Some(0));
    }

    #[test]
    fn phase_shifts_the_pattern() {
        let params = StripeParams {
            phase_rad: PI,
            ..StripeParams::new(60.0)
        };
        let frame = generate(PANEL, 15.0, &params).unwrap();
        assert_eq!(frame.get(0, 0), Some(0));
    }

    #[test]
    fn half_wave_halves_the_swing() {
        let params = StripeParams {
            waves: 0.5,
            ..StripeParams::new(60.0)
        };
        let frame = generate(PANEL, 15.0, &params).unwrap();
        assert_eq!(frame.get(0, 0), Some(49_152));
        assert_eq!(frame.get(2, 0), Some(16_384));
    }

    #[test]
    fn zero_pitch_is_rejected() {
        assert!(matches!(
            generate(PANEL, 15.0, &StripeParams::new(0.0)),
            Err(PatternError::InvalidPeriod(_))
        ));
        assert!(matches!(
            generate(PANEL, 0.0, &StripeParams::new(60.0)),
            Err(PatternError::InvalidPixelPitch(_))
        ));
    }

    #[test]
    fn phase_steps_cover_one_cycle() {
        let frames = phase_steps(PANEL, 15.0, StripeParams::new(60.0), 4).unwrap();
        assert_eq!(frames.len(), 4);
        // Quarter-cycle phase step equals a one-pixel shift at 4 px period.
        assert_eq!(frames[1].get(0, 0), Some(32_768));
        assert_eq!(frames[2].get(0, 0), Some(0));
    }

    #[test]
    fn params_read_from_toml_with_defaults() {
        let params: StripeParams = toml::from_str("pitch_um = 120.0").unwrap();
        assert_eq!(params, StripeParams::new(120.0));
    }
}
