//! Flat frames.

use slm_core::Frame;
use slm_hal::PanelSize;

/// Flat frame at `level`.
#[must_use]
pub fn generate(panel: PanelSize, level: u16) -> Frame {
    Frame::filled(panel, level)
}
