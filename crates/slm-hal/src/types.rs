//! Board domain newtypes.
//!
//! These wrappers keep unit and range mistakes out of the engine:
//! - `BoardId`: session-local board handle, 0-indexed
//! - `PanelSize`: panel resolution, fixed at enumeration
//! - `TrueFrames`: hardware sub-frames per logical frame, 1–255
//! - `FrameRate`: finite, positive sequencing rate in frames/s
//! - `Temperature`: sensor reading, stored in Celsius and converted at the boundary

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

// ── Error types ──────────────────────────────────────────────────────────────

/// Error returned when an integer value is out of the valid range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("value {value} outside {min}..={max}")]
pub struct OutOfRangeError {
    /// The value that was out of range.
    pub value: u32,
    /// The inclusive minimum allowed value.
    pub min: u32,
    /// The inclusive maximum allowed value.
    pub max: u32,
}

/// Error returned when a frame rate is not finite or below [`FrameRate::MIN_HZ`].
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
#[error("frame rate {value} fps is not a finite rate >= {min} fps", min = FrameRate::MIN_HZ)]
pub struct InvalidRateError {
    /// The rejected rate.
    pub value: f64,
}

// ── BoardId ──────────────────────────────────────────────────────────────────

/// Session-local board handle.
///
/// Handles are assigned `0..count` in enumeration order when a session opens
/// and stay stable until it closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct BoardId(usize);

impl BoardId {
    /// Wrap a raw handle.
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Position of the board in the registry.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl From<usize> for BoardId {
    fn from(index: usize) -> Self {
        Self(index)
    }
}

impl fmt::Display for BoardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "board {}", self.0)
    }
}

// ── Liquid crystal / calibration / units ─────────────────────────────────────

/// Liquid-crystal technology of a board, fixed for the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LcType {
    /// Binary ferroelectric panel (needs DC-balanced frame pairs).
    Ferroelectric = 0,
    /// Analog nematic panel.
    Nematic = 1,
}

impl LcType {
    /// Lower-case name, as used in config files.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ferroelectric => "ferroelectric",
            Self::Nematic => "nematic",
        }
    }
}

impl TryFrom<u8> for LcType {
    type Error = OutOfRangeError;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        match raw {
            0 => Ok(Self::Ferroelectric),
            1 => Ok(Self::Nematic),
            other => Err(OutOfRangeError {
                value: u32::from(other),
                min: 0,
                max: 1,
            }),
        }
    }
}

impl fmt::Display for LcType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which calibration image a buffer replaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalType {
    /// Non-uniformity correction: per-pixel gain.
    Nuc = 0,
    /// Wavefront correction: per-pixel phase offset.
    Wfc = 1,
}

impl fmt::Display for CalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Nuc => "NUC",
            Self::Wfc => "WFC",
        })
    }
}

/// Unit requested for a temperature reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureUnit {
    /// Degrees Celsius (sensor native).
    #[default]
    Celsius = 0,
    /// Degrees Fahrenheit.
    Fahrenheit = 1,
}

// ── Temperature ──────────────────────────────────────────────────────────────

/// A board sensor reading.
///
/// Transports always report Celsius; conversion happens only when a caller
/// asks for a specific [`TemperatureUnit`].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Temperature(f64);

impl Temperature {
    /// Reading in degrees Celsius.
    #[must_use]
    pub const fn from_celsius(celsius: f64) -> Self {
        Self(celsius)
    }

    /// Degrees Celsius.
    #[must_use]
    pub const fn celsius(self) -> f64 {
        self.0
    }

    /// Degrees Fahrenheit: `C * 9/5 + 32`.
    #[must_use]
    pub fn fahrenheit(self) -> f64 {
        self.0 * 9.0 / 5.0 + 32.0
    }

    /// Value expressed in `unit`.
    #[must_use]
    pub fn in_unit(self, unit: TemperatureUnit) -> f64 {
        match unit {
            TemperatureUnit::Celsius => self.celsius(),
            TemperatureUnit::Fahrenheit => self.fahrenheit(),
        }
    }
}

// ── PanelSize ────────────────────────────────────────────────────────────────

/// Panel resolution in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PanelSize {
    /// Columns.
    pub width: u32,
    /// Rows.
    pub height: u32,
}

impl PanelSize {
    /// 512 × 512 panel (15 µm pitch).
    pub const P512: Self = Self::new(512, 512);

    /// 256 × 256 panel (24 µm pitch).
    pub const P256: Self = Self::new(256, 256);

    /// Panel of `width` × `height` pixels.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Number of 16-bit samples in one full frame.
    #[must_use]
    pub fn pixel_count(self) -> usize {
        // u32 × u32 fits in u64; usize is 64-bit on every supported host.
        #[allow(clippy::cast_possible_truncation)]
        let count = (u64::from(self.width) * u64::from(self.height)) as usize;
        count
    }
}

impl fmt::Display for PanelSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

// ── TrueFrames ───────────────────────────────────────────────────────────────

/// Hardware sub-frames shown per logical frame.
///
/// The board's frame counter is 8 bits wide, so valid values are 1–255.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
#[repr(transparent)]
pub struct TrueFrames(u16);

impl TrueFrames {
    /// Minimum sub-frames per logical frame.
    pub const MIN: u32 = 1;

    /// Maximum sub-frames per logical frame (8-bit hardware counter).
    pub const MAX: u32 = 255;

    /// Create a `TrueFrames`, returning an error outside 1–255.
    ///
    /// # Errors
    ///
    /// Returns [`OutOfRangeError`] if `count` is 0 or above 255.
    pub fn try_new(count: u32) -> Result<Self, OutOfRangeError> {
        match u16::try_from(count) {
            Ok(frames) if (Self::MIN..=Self::MAX).contains(&count) => Ok(Self(frames)),
            _ => Err(OutOfRangeError {
                value: count,
                min: Self::MIN,
                max: Self::MAX,
            }),
        }
    }

    /// Return the inner count (1–255).
    #[must_use]
    pub const fn get(self) -> u16 {
        self.0
    }
}

impl TryFrom<u32> for TrueFrames {
    type Error = OutOfRangeError;

    fn try_from(count: u32) -> Result<Self, Self::Error> {
        Self::try_new(count)
    }
}

impl From<TrueFrames> for u32 {
    fn from(frames: TrueFrames) -> Self {
        u32::from(frames.0)
    }
}

// ── FrameRate ────────────────────────────────────────────────────────────────

/// Sequencing rate in logical frames per second.
///
/// Always finite and at least [`FrameRate::MIN_HZ`], so [`FrameRate::period`]
/// is a representable [`Duration`].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct FrameRate(f64);

impl FrameRate {
    /// Slowest accepted rate: one frame every 1000 s.
    pub const MIN_HZ: f64 = 0.001;

    /// Create a `FrameRate`.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidRateError`] for NaN, infinities, zero, negative rates
    /// and rates below [`FrameRate::MIN_HZ`].
    pub fn try_new(hz: f64) -> Result<Self, InvalidRateError> {
        if hz.is_finite() && hz >= Self::MIN_HZ {
            Ok(Self(hz))
        } else {
            Err(InvalidRateError { value: hz })
        }
    }

    /// Frames per second.
    #[must_use]
    pub const fn hz(self) -> f64 {
        self.0
    }

    /// Time between two ticks.
    #[must_use]
    pub fn period(self) -> Duration {
        Duration::from_secs_f64(1.0 / self.0)
    }
}

impl TryFrom<f64> for FrameRate {
    type Error = InvalidRateError;

    fn try_from(hz: f64) -> Result<Self, Self::Error> {
        Self::try_new(hz)
    }
}

impl From<FrameRate> for f64 {
    fn from(rate: FrameRate) -> Self {
        rate.0
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} fps", self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn period_of_60_fps() {
        let rate = FrameRate::try_new(60.0).unwrap();
        let period = rate.period();
        assert!((period.as_secs_f64() - 1.0 / 60.0).abs() < 1e-9);
    }

    #[test]
    fn lc_type_from_raw() {
        assert_eq!(LcType::try_from(0).unwrap(), LcType::Ferroelectric);
        assert_eq!(LcType::try_from(1).unwrap(), LcType::Nematic);
        assert!(LcType::try_from(2).is_err());
    }

    #[test]
    fn panel_pixel_count() {
        assert_eq!(PanelSize::P512.pixel_count(), 262_144);
        assert_eq!(PanelSize::P256.pixel_count(), 65_536);
    }
}
