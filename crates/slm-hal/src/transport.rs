//! Board transport abstraction
//!
//! The PCIe driver is consumed through three traits:
//!
//! - [`BoardBus`] enumerates the boards attached to the host.
//! - [`BoardTransport`] carries bulk frame writes, reads and board
//!   configuration. Calls may block for the duration of a DMA transfer and are
//!   only made from caller threads.
//! - [`DisplayPort`] is the register-level handle the sequencer thread uses to
//!   latch a pre-written region onto the display plane. It takes `&self` and
//!   must not block.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::memory::FrameRegion;
use crate::types::{LcType, PanelSize, Temperature, TrueFrames};

/// Static description of a board, read once at enumeration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardInfo {
    /// Manufacturer serial, e.g. `slm7070`.
    pub serial: String,
    /// Liquid-crystal technology.
    pub lc_type: LcType,
    /// Panel resolution.
    pub panel: PanelSize,
    /// Pixel pitch in micrometres.
    pub pixel_pitch_um: f64,
    /// Frames per sequence bank.
    pub sequence_capacity: usize,
    /// Whether the board carries a readable temperature sensor.
    pub has_temperature_sensor: bool,
}

/// Transport-level failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The board did not answer within the bus deadline.
    #[error("transport timed out after {millis} ms")]
    Timeout {
        /// Deadline that elapsed.
        millis: u64,
    },
    /// The board dropped off the bus.
    #[error("board disconnected")]
    Disconnected,
    /// The region lies outside board memory.
    #[error("{0} is outside board memory")]
    InvalidRegion(FrameRegion),
    /// Buffer length differs from one panel frame.
    #[error("buffer holds {actual} samples, region holds {expected}")]
    LengthMismatch {
        /// Samples per panel frame.
        expected: usize,
        /// Samples supplied.
        actual: usize,
    },
    /// Nothing has been written to the region yet.
    #[error("{0} has never been written")]
    EmptyRegion(FrameRegion),
    /// Driver-reported failure.
    #[error("device error: {0}")]
    Device(String),
}

/// Register-level display pointer.
///
/// Implementations are shared between the caller thread and the sequencer
/// thread.
pub trait DisplayPort: Send + Sync {
    /// Point the display plane at `region` from the next vertical sync on.
    ///
    /// The region must already hold a complete frame.
    fn latch(&self, region: FrameRegion) -> Result<(), TransportError>;

    /// Region currently latched, `None` after reset.
    fn latched(&self) -> Option<FrameRegion>;
}

/// Bulk access to one board.
pub trait BoardTransport: Send {
    /// Static board description.
    fn info(&self) -> &BoardInfo;

    /// Shared handle to the board's display pointer.
    fn display_port(&self) -> Arc<dyn DisplayPort>;

    /// Write one full panel frame of drive codes into `region`.
    fn write_frame(&mut self, region: FrameRegion, drive: &[u16]) -> Result<(), TransportError>;

    /// Read one full panel frame of drive codes back from `region`.
    fn read_frame(&mut self, region: FrameRegion) -> Result<Vec<u16>, TransportError>;

    /// Program the number of hardware sub-frames per logical frame.
    fn set_true_frames(&mut self, frames: TrueFrames) -> Result<(), TransportError>;

    /// Panel power state.
    fn power(&mut self) -> Result<bool, TransportError>;

    /// Switch panel power.
    fn set_power(&mut self, on: bool) -> Result<(), TransportError>;

    /// Read the on-board sensor. `Ok(None)` when the board has no sensor.
    fn read_temperature(&mut self) -> Result<Option<Temperature>, TransportError>;
}

/// Host bus that owns the attached boards.
pub trait BoardBus: Send {
    /// Claim every attached board driven by `lc_type`, in slot order.
    fn enumerate(&mut self, lc_type: LcType) -> Result<Vec<Box<dyn BoardTransport>>, TransportError>;
}
