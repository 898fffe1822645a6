//! Sawtooth ramps between two levels.
//!
//! [`test_sequence`] gives six frames: one, two and three ramps across the
//! width, then the same down the height. Stepping through them on a
//! running sequence shows LUT and calibration errors as visible kinks.

use slm_core::Frame;
use slm_hal::PanelSize;

use crate::to_sample;

/// Axis a ramp rises along.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Rises left to right.
    Horizontal,
    /// Rises top to bottom.
    Vertical,
}

/// `periods` sawtooth ramps from `low` towards `high` across the panel.
#[must_use]
pub fn generate(panel: PanelSize, direction: Direction, periods: u32, low: u16, high: u16) -> Frame {
    let extent = match direction {
        Direction::Horizontal => panel.width,
        Direction::Vertical => panel.height,
    };
    let period = f64::from(extent.max(1)) / f64::from(periods.max(1));
    let span = f64::from(high) - f64::from(low);
    Frame::from_fn(panel, |x, y| {
        let position = match direction {
            Direction::Horizontal => x,
            Direction::Vertical => y,
        };
        let fraction = (f64::from(position) / period).fract();
        to_sample(f64::from(low) + span * fraction)
    })
}

/// Three horizontal then three vertical ramp frames.
#[must_use]
pub fn test_sequence(panel: PanelSize, low: u16, high: u16) -> Vec<Frame> {
    [Direction::Horizontal, Direction::Vertical]
        .into_iter()
        .flat_map(|direction| (1..=3).map(move |periods| generate(panel, direction, periods, low, high)))
        .collect()
}
