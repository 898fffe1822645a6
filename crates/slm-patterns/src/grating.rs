//! Binary square gratings.
//!
//! Quick alignment targets: half of every period sits at `low`, the other
//! half at `high`. [`alignment_set`] is the three-frame set used to check a
//! freshly installed panel (vertical, diagonal, horizontal).

use serde::{Deserialize, Serialize};
use slm_core::Frame;
use slm_hal::PanelSize;

/// Direction the grating varies along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    /// Varies with x: vertical bars.
    X,
    /// Varies with y: horizontal bars.
    Y,
    /// Varies with x + y.
    Diagonal,
}

/// Square grating with `period_px` pixels per period. A zero period gives
/// a flat frame at `low`.
#[must_use]
pub fn generate(panel: PanelSize, axis: Axis, period_px: u32, low: u16, high: u16) -> Frame {
    let half = period_px / 2;
    Frame::from_fn(panel, |x, y| {
        let coordinate = match axis {
            Axis::X => x,
            Axis::Y => y,
            Axis::Diagonal => x.wrapping_add(y),
        };
        match coordinate.checked_rem(period_px) {
            Some(offset) if offset >= half => high,
            _ => low,
        }
    })
}

/// Vertical 32 px, diagonal 48 px and horizontal 32 px gratings between
/// half and full phase.
#[must_use]
pub fn alignment_set(panel: PanelSize) -> Vec<Frame> {
    const LOW: u16 = 32_767;
    const HIGH: u16 = 65_534;
    vec![
        generate(panel, Axis::X, 32, LOW, HIGH),
        generate(panel, Axis::Diagonal, 48, LOW, HIGH),
        generate(panel, Axis::Y, 32, LOW, HIGH),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    const PANEL: PanelSize = PanelSize::new(64, 64);

    #[test]
    fn x_grating_switches_at_half_period() {
        let frame = generate(PANEL, Axis::X, 8, 1, 2);
        assert_eq!(frame.get(3, 10), Some(1));
        assert_eq!(frame.get(4, 10), Some(2));
        assert_eq!(frame.get(8, 0), Some(1));
    }

    #[test]
    fn diagonal_grating_depends_on_sum() {
        let frame = generate(PANEL, Axis::Diagonal, 8, 1, 2);
        assert_eq!(frame.get(2, 2), Some(2));
        assert_eq!(frame.get(1, 2), Some(1));
    }

    #[test]
    fn zero_period_is_flat() {
        let frame = generate(PANEL, Axis::Y, 0, 5, 9);
        assert!(frame.samples().iter().all(|&s| s == 5));
    }

    #[test]
    fn alignment_set_has_three_frames() {
        let set = alignment_set(PANEL);
        assert_eq!(set.len(), 3);
        assert_eq!(set[0].get(16, 0), Some(65_534));
        assert_eq!(set[2].get(0, 16), Some(65_534));
        assert_eq!(set[2].get(16, 0), Some(32_767));
    }
}
