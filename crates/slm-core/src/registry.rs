//! Board registry: enumeration, handles and per-board state.

use std::sync::atomic::AtomicUsize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use slm_hal::{BoardBus, BoardId, BoardInfo, BoardTransport, DisplayPort, LcType, TrueFrames};

use crate::calibration::{CalibrationStore, CorrectionPipeline};
use crate::engine::SequenceState;
use crate::error::{Result, SlmError};
use crate::frame::Frame;
use crate::framebuffer::{FrameSlots, SequenceBanks};
use crate::lut::Lut;

/// One open board.
///
/// `port` and `position` are shared with the sequencer thread; everything
/// else sits behind the board lock.
pub(crate) struct Board {
    pub(crate) id: BoardId,
    pub(crate) info: BoardInfo,
    pub(crate) port: Arc<dyn DisplayPort>,
    pub(crate) position: Arc<AtomicUsize>,
    core: Mutex<BoardCore>,
}

/// Mutable board state, guarded by the board lock.
pub(crate) struct BoardCore {
    pub(crate) transport: Box<dyn BoardTransport>,
    pub(crate) state: SequenceState,
    pub(crate) slots: FrameSlots,
    pub(crate) sequence: SequenceBanks,
    pub(crate) calibration: CalibrationStore,
    pub(crate) lut: Lut,
    /// Caller override; `None` means computed from the rate.
    pub(crate) true_frames: Option<TrueFrames>,
    /// Value last written to the board.
    pub(crate) programmed_frames: Option<TrueFrames>,
}

impl BoardCore {
    pub(crate) fn pipeline(&self) -> CorrectionPipeline {
        self.calibration.pipeline(&self.lut)
    }
}

impl Board {
    fn new(id: BoardId, transport: Box<dyn BoardTransport>, calibration_enabled: bool) -> Self {
        let info = transport.info().clone();
        let port = transport.display_port();
        Self {
            id,
            info,
            port,
            position: Arc::new(AtomicUsize::new(0)),
            core: Mutex::new(BoardCore {
                transport,
                state: SequenceState::Idle,
                slots: FrameSlots::default(),
                sequence: SequenceBanks::default(),
                calibration: CalibrationStore::new(calibration_enabled),
                lut: Lut::identity(),
                true_frames: None,
                programmed_frames: None,
            }),
        }
    }

    /// Take the board lock. A poisoned lock is recovered: board state is
    /// only ever replaced wholesale, so it is never left half-written.
    pub(crate) fn lock(&self) -> MutexGuard<'_, BoardCore> {
        self.core.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Samples per panel frame.
    pub(crate) fn pixel_count(&self) -> usize {
        self.info.panel.pixel_count()
    }

    /// Reject buffers that do not cover the panel exactly.
    pub(crate) fn check_size(&self, frame: &Frame) -> Result<()> {
        let expected = self.pixel_count();
        if frame.len() == expected {
            Ok(())
        } else {
            Err(SlmError::SizeMismatch {
                expected,
                actual: frame.len(),
            })
        }
    }
}

/// Boards claimed for one session, indexed by handle.
pub(crate) struct BoardRegistry {
    lc_type: LcType,
    boards: Vec<Board>,
}

impl BoardRegistry {
    /// Claim every `lc_type` board on `bus`.
    ///
    /// Fails with [`SlmError::NoHardwareFound`] when none are attached; no
    /// board is registered in that case.
    pub(crate) fn open(
        bus: &mut dyn BoardBus,
        lc_type: LcType,
        calibration_enabled: bool,
    ) -> Result<Self> {
        let transports = bus.enumerate(lc_type).map_err(|source| SlmError::HardwareFault {
            board: BoardId::new(0),
            source,
        })?;
        if transports.is_empty() {
            return Err(SlmError::NoHardwareFound(lc_type));
        }
        let boards = transports
            .into_iter()
            .enumerate()
            .map(|(index, transport)| Board::new(BoardId::new(index), transport, calibration_enabled))
            .collect();
        Ok(Self { lc_type, boards })
    }

    pub(crate) fn lc_type(&self) -> LcType {
        self.lc_type
    }

    pub(crate) fn len(&self) -> usize {
        self.boards.len()
    }

    pub(crate) fn get(&self, id: BoardId) -> Result<&Board> {
        self.boards
            .get(id.index())
            .ok_or(SlmError::InvalidBoardHandle(id.index()))
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Board> {
        self.boards.iter()
    }

    /// Release every board. Handles are invalid afterwards.
    pub(crate) fn close(&mut self) -> usize {
        let released = self.boards.len();
        self.boards.clear();
        released
    }
}
