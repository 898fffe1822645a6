//! Error taxonomy for every session operation.
//!
//! Validation errors are returned before any state changes. The only
//! variant that can leave the session in a different state than before the
//! call is [`SlmError::HardwareFault`]; see [`crate::session::Session`] for the
//! recovery rules.

use std::path::PathBuf;

use slm_hal::{BoardId, LcType, TimerError, TransportError};

use crate::lut::LutError;

/// Result alias used throughout the crate.
pub type Result<T, E = SlmError> = std::result::Result<T, E>;

/// Session operation failure.
#[derive(Debug, thiserror::Error)]
pub enum SlmError {
    /// Handle does not name an open board (never opened, or session closed).
    #[error("invalid board handle {0}")]
    InvalidBoardHandle(usize),

    /// Buffer length does not match the panel.
    #[error("frame holds {actual} samples, expected {expected}")]
    SizeMismatch {
        /// Samples required.
        expected: usize,
        /// Samples supplied.
        actual: usize,
    },

    /// `load_sequence` with zero frames.
    #[error("sequence must contain at least one frame")]
    EmptySequence,

    /// More frames than one sequence bank holds.
    #[error("sequence of {len} frames exceeds {board} bank capacity of {capacity}")]
    SequenceTooLong {
        /// Target board.
        board: BoardId,
        /// Frames supplied.
        len: usize,
        /// Frames per bank.
        capacity: usize,
    },

    /// Rate is not finite, not positive, or above the sub-frame ceiling.
    #[error("invalid frame rate {rate} fps: {reason}")]
    InvalidFrameRate {
        /// Rejected rate.
        rate: f64,
        /// Which bound was violated.
        reason: &'static str,
    },

    /// `start_sequence` with no board holding a sequence.
    #[error("no board has a sequence loaded")]
    NoSequenceLoaded,

    /// `start_sequence` with sequences loaded but no rate set.
    #[error("sequencing rate has not been set")]
    RateNotSet,

    /// Operation is not allowed while the sequencer runs.
    #[error("sequencer is running")]
    SequenceRunning,

    /// Single-frame write to a board that is sequencing.
    #[error("{0} is sequencing; single-frame writes are rejected")]
    BoardBusy(BoardId),

    /// True-frame override outside 1..=255 or over the sub-frame budget.
    #[error("invalid true-frame count {0}")]
    InvalidTrueFrameCount(u32),

    /// Rate outside the range the timing profile can represent.
    #[error("frame rate {rate} fps unsupported by {lc_type} timing (supported {min}..={max} fps)")]
    UnsupportedFrameRate {
        /// Requested rate.
        rate: f64,
        /// Panel technology the profile describes.
        lc_type: LcType,
        /// Lowest supported rate.
        min: f64,
        /// Highest supported rate.
        max: f64,
    },

    /// LUT file is malformed.
    #[error("failed to parse LUT {}: {source}", .path.display())]
    LutParse {
        /// File that failed.
        path: PathBuf,
        /// Parser error.
        #[source]
        source: LutError,
    },

    /// Board has no readable temperature sensor.
    #[error("{0} has no readable temperature sensor")]
    SensorUnavailable(BoardId),

    /// Transport failure. The sequencer stops every board when this
    /// happens during a tick.
    #[error("hardware fault on {board}: {source}")]
    HardwareFault {
        /// Board that failed.
        board: BoardId,
        /// Transport error.
        #[source]
        source: TransportError,
    },

    /// Timing override in the session config describes no usable panel.
    #[error("invalid timing profile: {0}")]
    InvalidTimingProfile(&'static str),

    /// Enumeration found no boards of the requested type.
    #[error("no {0} boards found")]
    NoHardwareFound(LcType),

    /// File could not be read.
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        /// File that failed.
        path: PathBuf,
        /// OS error.
        #[source]
        source: std::io::Error,
    },

    /// Image file could not be decoded.
    #[error("failed to decode image {}: {reason}", .path.display())]
    Decode {
        /// File that failed.
        path: PathBuf,
        /// Decoder message.
        reason: String,
    },

    /// Tick source could not be armed.
    #[error("sequencer timer: {0}")]
    Timer(#[from] TimerError),
}

impl SlmError {
    /// Wrap a transport error for `board`.
    pub(crate) fn fault(board: BoardId) -> impl FnOnce(TransportError) -> Self {
        move |source| Self::HardwareFault { board, source }
    }

    /// Whether the call was rejected without touching session state.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        !matches!(
            self,
            Self::HardwareFault { .. } | Self::Io { .. } | Self::Decode { .. } | Self::Timer(_)
        )
    }
}
