//! Board telemetry: power, temperature and sequence position.

use std::sync::atomic::Ordering;

use serde::Serialize;
use slm_hal::{BoardId, BoardInfo, CalType, Temperature};

use crate::engine::SequenceState;
use crate::error::{Result, SlmError};
use crate::registry::{Board, BoardCore};

/// Point-in-time view of one board.
#[derive(Debug, Clone, Serialize)]
pub struct TelemetrySnapshot {
    /// Handle.
    pub board: BoardId,
    /// Static description.
    pub info: BoardInfo,
    /// Panel power.
    pub powered: bool,
    /// Sensor reading, `None` without a readable sensor.
    pub temperature_c: Option<f64>,
    /// Sequence state.
    pub state: SequenceState,
    /// Current sequence position.
    pub position: usize,
    /// Frames in the active sequence bank.
    pub sequence_len: Option<usize>,
    /// True frames last programmed.
    pub true_frames: Option<u16>,
    /// Whether the true-frame count is a caller override.
    pub true_frames_fixed: bool,
    /// Calibration state.
    pub calibration: CalibrationSummary,
}

/// Which corrections are active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CalibrationSummary {
    /// Correction toggle.
    pub enabled: bool,
    /// NUC image stored.
    pub nuc: bool,
    /// WFC image stored.
    pub wfc: bool,
    /// LUT entries, `None` for the identity table.
    pub lut_entries: Option<usize>,
}

impl Board {
    /// Position published by the sequencer thread. Lock-free.
    pub(crate) fn position(&self) -> usize {
        self.position.load(Ordering::Acquire)
    }

    /// Sensor reading. Transport errors are logged and reported as no sensor.
    pub(crate) fn temperature(&self, core: &mut BoardCore) -> Result<Temperature> {
        match core.transport.read_temperature() {
            Ok(Some(reading)) => Ok(reading),
            Ok(None) => Err(SlmError::SensorUnavailable(self.id)),
            Err(error) => {
                tracing::warn!(board = self.id.index(), %error, "temperature read failed");
                Err(SlmError::SensorUnavailable(self.id))
            }
        }
    }

    pub(crate) fn snapshot(&self, core: &mut BoardCore) -> Result<TelemetrySnapshot> {
        let powered = core.transport.power().map_err(SlmError::fault(self.id))?;
        let temperature_c = self.temperature(core).ok().map(Temperature::celsius);
        Ok(TelemetrySnapshot {
            board: self.id,
            info: self.info.clone(),
            powered,
            temperature_c,
            state: core.state,
            position: self.position(),
            sequence_len: core.sequence.active().map(|(_, len)| len),
            true_frames: core.programmed_frames.map(|frames| frames.get()),
            true_frames_fixed: core.true_frames.is_some(),
            calibration: CalibrationSummary {
                enabled: core.calibration.is_enabled(),
                nuc: core.calibration.has(CalType::Nuc),
                wfc: core.calibration.has(CalType::Wfc),
                lut_entries: (!core.lut.is_identity()).then(|| core.lut.len()),
            },
        })
    }
}
