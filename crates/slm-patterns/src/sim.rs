//! Structured-illumination pattern sets.
//!
//! A SIM set is one cosine grating per (angle, phase) pair. The grating
//! period comes from the grating equation for the first diffraction order
//! leaving the panel at `theta`:
//!
//! ```text
//! period · sin(theta) = wavelength      =>      pixels per period = λ / (pixel pitch · sin θ)
//! ```

use std::f64::consts::TAU;

use serde::{Deserialize, Serialize};
use slm_core::Frame;
use slm_hal::PanelSize;

use crate::{check_period, check_pixel_pitch, to_sample, PatternError};

/// Parameters of a SIM set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimParams {
    /// Grating orientations in degrees.
    pub angles_deg: Vec<f64>,
    /// Added to every angle, degrees.
    pub angle_offset_deg: f64,
    /// Phase steps in degrees.
    pub phases_deg: Vec<f64>,
    /// Illumination wavelength in nm.
    pub wavelength_nm: f64,
    /// First-order diffraction angle in degrees.
    pub theta_deg: f64,
    /// Peak-to-peak modulation in waves.
    pub waves: f64,
    /// Frame order: every phase of the first angle first (`true`), or every
    /// angle of the first phase first.
    pub phase_then_angle: bool,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            angles_deg: vec![0.0, 60.0, 120.0],
            angle_offset_deg: 0.0,
            phases_deg: vec![0.0, 72.0, 144.0, 216.0, 288.0],
            wavelength_nm: 532.0,
            theta_deg: 1.0,
            waves: 1.0,
            phase_then_angle: true,
        }
    }
}

impl SimParams {
    /// Grating period in pixels for a panel with `pixel_pitch_um` pixels.
    #[must_use]
    pub fn pixels_per_period(&self, pixel_pitch_um: f64) -> f64 {
        (self.wavelength_nm * 1e-3) / (pixel_pitch_um * self.theta_deg.to_radians().sin())
    }

    /// (angle, phase) pairs in frame order, degrees.
    #[must_use]
    pub fn order(&self) -> Vec<(f64, f64)> {
        let angles = self.angles_deg.iter().map(|a| a + self.angle_offset_deg);
        if self.phase_then_angle {
            angles
                .flat_map(|a| self.phases_deg.iter().map(move |&p| (a, p)))
                .collect()
        } else {
            let angles: Vec<f64> = angles.collect();
            self.phases_deg
                .iter()
                .flat_map(|&p| angles.iter().map(move |&a| (a, p)))
                .collect()
        }
    }
}

/// Render the full set, `angles × phases` frames.
pub fn generate(
    panel: PanelSize,
    pixel_pitch_um: f64,
    params: &SimParams,
) -> Result<Vec<Frame>, PatternError> {
    let pixel_pitch = check_pixel_pitch(pixel_pitch_um)?;
    let period = check_period(params.pixels_per_period(pixel_pitch))?;
    let amplitude = params.waves * 32_767.5;
    Ok(params
        .order()
        .into_iter()
        .map(|(angle, phase)| {
            let (sin_a, cos_a) = angle.to_radians().sin_cos();
            let phase = phase.to_radians();
            Frame::from_fn(panel, |x, y| {
                let along = f64::from(x) * cos_a + f64::from(y) * sin_a;
                to_sample(32_767.5 + amplitude * (TAU * along / period + phase).cos())
            })
        })
        .collect())
}
