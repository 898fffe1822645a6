//! Host API
//!
//! A [`Session`] owns every board claimed at open, the sequencing engine and
//! the tick source. All methods take `&self` and may be called from any
//! thread; [`Session::close`] and drop release the hardware.
//!
//! # Locking
//!
//! Sequencer control (rate, start, stop, and the running-board policies)
//! holds the engine lock and then board locks. Single-board operations hold
//! only that board's lock. [`Session::current_sequence_image`] takes no lock.
//!
//! # Hardware faults
//!
//! A transport error on the tick path stops every board. The next call into
//! the session puts them back to [`SequenceState::Idle`]; the event is
//! available from [`Session::take_fault`] and [`Session::fault_events`].

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crossbeam_channel::Receiver;
use slm_hal::{
    BoardBus, BoardId, BoardInfo, CalType, LcType, TemperatureUnit, TickSource, TrueFrames,
};

use crate::config::{RunningPolicy, SessionConfig};
use crate::engine::{program_true_frames, Engine, EngineState, SequenceState};
use crate::error::{Result, SlmError};
use crate::frame::Frame;
use crate::lut::Lut;
use crate::registry::{Board, BoardCore, BoardRegistry};
use crate::sequencer::{EngineShared, FaultEvent, SequencerStats};
use crate::telemetry::TelemetrySnapshot;
use crate::timing::TimingProfile;

/// Open connection to every board of one liquid-crystal type.
pub struct Session {
    registry: BoardRegistry,
    engine: Mutex<Engine>,
    shared: Arc<EngineShared>,
    config: SessionConfig,
    profile: TimingProfile,
    faults: Receiver<FaultEvent>,
}

impl Session {
    /// Claim every `lc_type` board on `bus`. `timer` paces the sequencer.
    ///
    /// # Errors
    ///
    /// [`SlmError::NoHardwareFound`] when no matching board is attached,
    /// [`SlmError::InvalidTimingProfile`] when the configured timing override
    /// is unusable.
    pub fn open(
        bus: &mut dyn BoardBus,
        timer: impl TickSource + 'static,
        lc_type: LcType,
        config: SessionConfig,
    ) -> Result<Self> {
        let profile = config.timing_for(lc_type);
        profile.validate().map_err(SlmError::InvalidTimingProfile)?;
        let registry = BoardRegistry::open(bus, lc_type, config.calibration_enabled)?;

        let shared = Arc::new(EngineShared::default());
        let (fault_tx, faults) = crossbeam_channel::unbounded();
        let engine = Engine::new(Box::new(timer), profile, Arc::clone(&shared), fault_tx);
        tracing::info!(boards = registry.len(), %lc_type, "session opened");
        Ok(Self {
            registry,
            engine: Mutex::new(engine),
            shared,
            config,
            profile,
            faults,
        })
    }

    /// Stop sequencing and release every board. Safe to call twice.
    pub fn close(&mut self) {
        let engine = self.engine.get_mut().unwrap_or_else(PoisonError::into_inner);
        engine.reap(&self.registry);
        engine.stop(&self.registry);
        engine.release();
        let released = self.registry.close();
        if released > 0 {
            tracing::info!(boards = released, "session closed");
        }
    }

    // ── Registry ──────────────────────────────────────────────────────────

    /// Boards claimed at open; 0 after close.
    #[must_use]
    pub fn board_count(&self) -> usize {
        self.registry.len()
    }

    /// Handles of every open board.
    pub fn boards(&self) -> impl Iterator<Item = BoardId> + '_ {
        self.registry.iter().map(|board| board.id)
    }

    /// Liquid-crystal type the session was opened with.
    #[must_use]
    pub fn lc_type(&self) -> LcType {
        self.registry.lc_type()
    }

    /// Static description of `board`.
    ///
    /// # Errors
    ///
    /// [`SlmError::InvalidBoardHandle`].
    pub fn board_info(&self, board: BoardId) -> Result<BoardInfo> {
        Ok(self.registry.get(board)?.info.clone())
    }

    /// Samples per frame on `board`.
    ///
    /// # Errors
    ///
    /// [`SlmError::InvalidBoardHandle`].
    pub fn image_size(&self, board: BoardId) -> Result<usize> {
        Ok(self.registry.get(board)?.pixel_count())
    }

    /// Timing parameters in effect.
    #[must_use]
    pub fn timing_profile(&self) -> &TimingProfile {
        &self.profile
    }

    // ── Frames ────────────────────────────────────────────────────────────

    /// Correct `frame` and show it on `board`.
    ///
    /// # Errors
    ///
    /// [`SlmError::BoardBusy`] while the board is sequencing,
    /// [`SlmError::SizeMismatch`] when the frame does not cover the panel,
    /// [`SlmError::HardwareFault`] when the write fails. The displayed frame
    /// is unchanged on error.
    pub fn write_image(&self, board: BoardId, frame: &Frame) -> Result<()> {
        self.reap();
        let target = self.registry.get(board)?;
        let mut core = target.lock();
        if core.state == SequenceState::Running {
            return Err(SlmError::BoardBusy(board));
        }
        target.check_size(frame)?;
        target.stage(&mut core, frame)
    }

    /// Drive codes currently on the panel, `None` before anything was shown.
    ///
    /// # Errors
    ///
    /// [`SlmError::InvalidBoardHandle`], [`SlmError::HardwareFault`].
    pub fn read_displayed_frame(&self, board: BoardId) -> Result<Option<Frame>> {
        self.reap();
        let target = self.registry.get(board)?;
        let mut core = target.lock();
        target.read_displayed(&mut core)
    }

    // ── Sequencing ────────────────────────────────────────────────────────

    /// Replace the sequence on `board`.
    ///
    /// If the board is running, the configured reload policy applies. The
    /// board ends up [`SequenceState::Armed`] when a rate is set and
    /// [`SequenceState::Loaded`] otherwise.
    ///
    /// # Errors
    ///
    /// [`SlmError::EmptySequence`], [`SlmError::SizeMismatch`] and
    /// [`SlmError::SequenceTooLong`] before any state changes;
    /// [`SlmError::SequenceRunning`] under [`RunningPolicy::Reject`];
    /// [`SlmError::HardwareFault`] when the upload fails, in which case the
    /// previous sequence stays active.
    pub fn load_sequence(&self, board: BoardId, frames: &[Frame]) -> Result<()> {
        let target = self.registry.get(board)?;
        if frames.is_empty() {
            return Err(SlmError::EmptySequence);
        }
        for frame in frames {
            target.check_size(frame)?;
        }
        if frames.len() > target.info.sequence_capacity {
            return Err(SlmError::SequenceTooLong {
                board,
                len: frames.len(),
                capacity: target.info.sequence_capacity,
            });
        }

        let mut engine = self.engine();
        let mut core = target.lock();
        apply_policy(&mut engine, target, &mut core, self.config.reload_policy, "reload")?;
        target.upload_sequence(&mut core, frames)?;
        core.state = if engine.rate().is_some() {
            SequenceState::Armed
        } else {
            SequenceState::Loaded
        };
        tracing::info!(board = board.index(), frames = frames.len(), state = %core.state, "sequence loaded");
        Ok(())
    }

    /// Set the global sequencing rate in frames per second.
    ///
    /// # Errors
    ///
    /// [`SlmError::SequenceRunning`] while sequencing,
    /// [`SlmError::InvalidFrameRate`] when the rate is not finite, not
    /// positive, or above what any board's true-frame setting allows.
    pub fn set_sequencing_rate(&self, fps: f64) -> Result<()> {
        self.engine().set_rate(&self.registry, fps)?;
        tracing::info!(rate = fps, "sequencing rate set");
        Ok(())
    }

    /// Rate set by [`Session::set_sequencing_rate`].
    #[must_use]
    pub fn sequencing_rate(&self) -> Option<f64> {
        self.engine().rate().map(|rate| rate.hz())
    }

    /// Start every board holding a sequence on the same tick. Boards
    /// stopped earlier restart from frame 0 without a reload. Returns how
    /// many started.
    ///
    /// # Errors
    ///
    /// [`SlmError::NoSequenceLoaded`], [`SlmError::RateNotSet`],
    /// [`SlmError::SequenceRunning`]; [`SlmError::HardwareFault`] when
    /// latching frame 0 fails, in which case no board starts.
    pub fn start_sequence(&self) -> Result<usize> {
        self.engine().start(&self.registry)
    }

    /// Stop sequencing and wait for the tick thread to exit. Idempotent.
    pub fn stop_sequence(&self) {
        self.engine().stop(&self.registry);
    }

    /// Index of the frame `board` is showing. Lock-free; 0 when idle.
    ///
    /// # Errors
    ///
    /// [`SlmError::InvalidBoardHandle`].
    pub fn current_sequence_image(&self, board: BoardId) -> Result<usize> {
        Ok(self.registry.get(board)?.position())
    }

    /// Sequence state of `board`.
    ///
    /// # Errors
    ///
    /// [`SlmError::InvalidBoardHandle`].
    pub fn sequence_state(&self, board: BoardId) -> Result<SequenceState> {
        self.reap();
        Ok(self.registry.get(board)?.lock().state)
    }

    /// Global run state.
    #[must_use]
    pub fn engine_state(&self) -> EngineState {
        self.reap();
        self.shared.state()
    }

    /// Tick counters.
    #[must_use]
    pub fn sequencer_stats(&self) -> SequencerStats {
        self.shared.stats()
    }

    /// Fault that last stopped the sequencer, if not yet taken.
    pub fn take_fault(&self) -> Option<FaultEvent> {
        self.engine().take_fault()
    }

    /// Channel receiving every tick-path fault as it happens.
    #[must_use]
    pub fn fault_events(&self) -> Receiver<FaultEvent> {
        self.faults.clone()
    }

    // ── True frames ───────────────────────────────────────────────────────

    /// Minimum true frames for `fps` under this session's timing.
    ///
    /// # Errors
    ///
    /// [`SlmError::UnsupportedFrameRate`].
    pub fn compute_true_frames(&self, fps: f64) -> Result<TrueFrames> {
        self.profile.true_frames_for(fps)
    }

    /// Fix `board`'s true frames at `count` instead of computing them.
    ///
    /// # Errors
    ///
    /// [`SlmError::InvalidTrueFrameCount`] when `count` is outside 1..=255
    /// or too large for the current rate; [`SlmError::SequenceRunning`]
    /// while the board sequences.
    pub fn set_true_frames(&self, board: BoardId, count: u32) -> Result<()> {
        let target = self.registry.get(board)?;
        let frames = TrueFrames::try_new(count).map_err(|_| SlmError::InvalidTrueFrameCount(count))?;
        let engine = self.engine();
        let mut core = target.lock();
        if core.state == SequenceState::Running {
            return Err(SlmError::SequenceRunning);
        }
        if let Some(rate) = engine.rate() {
            if !self.profile.fits(frames, rate.hz()) {
                return Err(SlmError::InvalidTrueFrameCount(count));
            }
        }
        program_true_frames(target, &mut core, frames)?;
        core.true_frames = Some(frames);
        Ok(())
    }

    /// Go back to computing `board`'s true frames from the rate.
    ///
    /// # Errors
    ///
    /// [`SlmError::InvalidBoardHandle`], [`SlmError::SequenceRunning`],
    /// [`SlmError::HardwareFault`].
    pub fn clear_true_frames(&self, board: BoardId) -> Result<()> {
        let target = self.registry.get(board)?;
        let engine = self.engine();
        let mut core = target.lock();
        if core.state == SequenceState::Running {
            return Err(SlmError::SequenceRunning);
        }
        if let Some(rate) = engine.rate() {
            let frames = self.profile.true_frames_for(rate.hz())?;
            program_true_frames(target, &mut core, frames)?;
        }
        core.true_frames = None;
        Ok(())
    }

    // ── Calibration ───────────────────────────────────────────────────────

    /// Replace the NUC or WFC image on `board`.
    ///
    /// # Errors
    ///
    /// [`SlmError::InvalidBoardHandle`], [`SlmError::SizeMismatch`].
    pub fn write_calibration(&self, board: BoardId, cal: CalType, image: &Frame) -> Result<()> {
        let target = self.registry.get(board)?;
        target.check_size(image)?;
        target.lock().calibration.replace(cal, image);
        tracing::debug!(board = board.index(), %cal, "calibration replaced");
        Ok(())
    }

    /// Drop the NUC or WFC image on `board`.
    ///
    /// # Errors
    ///
    /// [`SlmError::InvalidBoardHandle`].
    pub fn clear_calibration(&self, board: BoardId, cal: CalType) -> Result<()> {
        self.registry.get(board)?.lock().calibration.clear(cal);
        Ok(())
    }

    /// Toggle calibration on `board`. Affects frames staged afterwards.
    ///
    /// # Errors
    ///
    /// [`SlmError::InvalidBoardHandle`].
    pub fn set_calibration_enabled(&self, board: BoardId, enabled: bool) -> Result<()> {
        self.registry.get(board)?.lock().calibration.set_enabled(enabled);
        Ok(())
    }

    /// Parse the LUT file at `path` and make it active on `board`.
    ///
    /// # Errors
    ///
    /// [`SlmError::InvalidBoardHandle`], [`SlmError::Io`],
    /// [`SlmError::LutParse`]. The previous table stays active on error.
    pub fn load_lut(&self, board: BoardId, path: impl AsRef<Path>) -> Result<()> {
        let target = self.registry.get(board)?;
        let path = path.as_ref();
        let lut = Lut::load(path)?;
        tracing::info!(board = board.index(), path = %path.display(), entries = lut.len(), "LUT loaded");
        target.lock().lut = lut;
        Ok(())
    }

    /// Make `lut` active on `board`.
    ///
    /// # Errors
    ///
    /// [`SlmError::InvalidBoardHandle`].
    pub fn set_lut(&self, board: BoardId, lut: Lut) -> Result<()> {
        self.registry.get(board)?.lock().lut = lut;
        Ok(())
    }

    // ── Power and telemetry ───────────────────────────────────────────────

    /// Panel power on `board`.
    ///
    /// # Errors
    ///
    /// [`SlmError::InvalidBoardHandle`], [`SlmError::HardwareFault`].
    pub fn power(&self, board: BoardId) -> Result<bool> {
        self.reap();
        let target = self.registry.get(board)?;
        let mut core = target.lock();
        core.transport.power().map_err(SlmError::fault(board))
    }

    /// Switch panel power on `board`. A running board is handled by the
    /// configured power policy first.
    ///
    /// # Errors
    ///
    /// [`SlmError::InvalidBoardHandle`], [`SlmError::SequenceRunning`] under
    /// [`RunningPolicy::Reject`], [`SlmError::HardwareFault`].
    pub fn set_power(&self, board: BoardId, on: bool) -> Result<()> {
        let target = self.registry.get(board)?;
        let mut engine = self.engine();
        let mut core = target.lock();
        apply_policy(&mut engine, target, &mut core, self.config.power_policy, "power")?;
        core.transport.set_power(on).map_err(SlmError::fault(board))?;
        tracing::info!(board = board.index(), on, "power switched");
        Ok(())
    }

    /// On-board temperature in `unit`.
    ///
    /// # Errors
    ///
    /// [`SlmError::InvalidBoardHandle`], [`SlmError::SensorUnavailable`].
    pub fn internal_temperature(&self, board: BoardId, unit: TemperatureUnit) -> Result<f64> {
        let target = self.registry.get(board)?;
        let mut core = target.lock();
        target.temperature(&mut core).map(|reading| reading.in_unit(unit))
    }

    /// Snapshot of `board`.
    ///
    /// # Errors
    ///
    /// [`SlmError::InvalidBoardHandle`], [`SlmError::HardwareFault`] when
    /// power cannot be read.
    pub fn telemetry(&self, board: BoardId) -> Result<TelemetrySnapshot> {
        self.reap();
        let target = self.registry.get(board)?;
        let mut core = target.lock();
        target.snapshot(&mut core)
    }

    // ── Internals ─────────────────────────────────────────────────────────

    /// Engine lock, with any tick-path fault cleaned up first.
    fn engine(&self) -> MutexGuard<'_, Engine> {
        let mut engine = self.engine.lock().unwrap_or_else(PoisonError::into_inner);
        engine.reap(&self.registry);
        engine
    }

    fn reap(&self) {
        drop(self.engine());
    }
}

/// Run `policy` on a board that is sequencing. The caller holds the engine
/// lock and `board`'s lock.
fn apply_policy(
    engine: &mut Engine,
    board: &Board,
    core: &mut BoardCore,
    policy: RunningPolicy,
    operation: &'static str,
) -> Result<()> {
    if core.state != SequenceState::Running {
        return Ok(());
    }
    match policy {
        RunningPolicy::Reject => Err(SlmError::SequenceRunning),
        RunningPolicy::StopFirst => {
            tracing::warn!(board = board.id.index(), operation, "stopping running board first");
            engine.detach(board, core);
            Ok(())
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}
