//! Sequencing engine: rate, run state and the start/stop protocol.
//!
//! `Engine` lives behind the session's global lock. Every method here is
//! called with that lock held and takes board locks in handle order, which
//! keeps the lock order (engine, then boards) fixed.

use std::fmt;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use crossbeam_channel::Sender;
use serde::Serialize;
use slm_hal::{BoardId, FrameRate, FrameRegion, TickSource, TrueFrames};

use crate::error::{Result, SlmError};
use crate::registry::{Board, BoardCore, BoardRegistry};
use crate::sequencer::{EngineShared, FaultEvent, RunLane, Sequencer};
use crate::timing::TimingProfile;

/// Per-board sequence state.
///
/// ```text
/// Idle ──load──> Loaded ──rate──> Armed ──start──> Running
///   ^              │ (rate already set) ^             │
///   │              └────────────────────┘             │
///   └──────────── stop / power / fault ───────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SequenceState {
    /// No sequence, or stopped.
    #[default]
    Idle,
    /// Sequence written, no rate set.
    Loaded,
    /// Sequence written and rate set.
    Armed,
    /// Advancing on every tick.
    Running,
}

impl fmt::Display for SequenceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Loaded => "loaded",
            Self::Armed => "armed",
            Self::Running => "running",
        })
    }
}

/// Global run state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum EngineState {
    /// No rate set and nothing running.
    #[default]
    Idle = 0,
    /// Rate set, ready to start.
    Armed = 1,
    /// Sequencer thread running.
    Running = 2,
    /// Stop in progress.
    Stopping = 3,
}

impl EngineState {
    pub(crate) fn from_raw(raw: u8) -> Self {
        match raw {
            1 => Self::Armed,
            2 => Self::Running,
            3 => Self::Stopping,
            _ => Self::Idle,
        }
    }
}

pub(crate) struct Engine {
    timer: Box<dyn TickSource>,
    profile: TimingProfile,
    rate: Option<FrameRate>,
    runner: Option<Sequencer>,
    running: Vec<BoardId>,
    last_fault: Option<FaultEvent>,
    shared: Arc<EngineShared>,
    faults: Sender<FaultEvent>,
}

impl Engine {
    pub(crate) fn new(
        timer: Box<dyn TickSource>,
        profile: TimingProfile,
        shared: Arc<EngineShared>,
        faults: Sender<FaultEvent>,
    ) -> Self {
        Self {
            timer,
            profile,
            rate: None,
            runner: None,
            running: Vec::new(),
            last_fault: None,
            shared,
            faults,
        }
    }

    pub(crate) fn rate(&self) -> Option<FrameRate> {
        self.rate
    }

    pub(crate) fn is_running(&self) -> bool {
        self.runner.is_some()
    }

    pub(crate) fn take_fault(&mut self) -> Option<FaultEvent> {
        self.last_fault.take()
    }

    /// Clean up after the tick thread stopped itself on a transport error.
    pub(crate) fn reap(&mut self, boards: &BoardRegistry) {
        if !self.shared.is_faulted() {
            return;
        }
        if let Some(runner) = self.runner.take() {
            runner.halt();
        }
        self.timer.disarm();
        self.idle_running(boards);
        self.last_fault = self.shared.take_fault();
        self.shared.set_state(self.resting_state());
        if let Some(fault) = &self.last_fault {
            tracing::warn!(
                board = fault.board.index(),
                tick = fault.tick,
                error = %fault.error,
                "sequencer stopped by hardware fault"
            );
        }
    }

    /// Validate `hz` against every board's true-frame setting and program
    /// the boards.
    pub(crate) fn set_rate(&mut self, boards: &BoardRegistry, hz: f64) -> Result<()> {
        if self.is_running() {
            return Err(SlmError::SequenceRunning);
        }
        let rate = FrameRate::try_new(hz).map_err(|_| SlmError::InvalidFrameRate {
            rate: hz,
            reason: "rate must be finite and positive",
        })?;

        let mut cores: Vec<_> = boards.iter().map(|board| (board, board.lock())).collect();
        let mut plan = Vec::with_capacity(cores.len());
        for (_, core) in &cores {
            let frames = match core.true_frames {
                Some(frames) => frames,
                None => self.profile.true_frames_for(hz).map_err(|_| {
                    SlmError::InvalidFrameRate {
                        rate: hz,
                        reason: "outside the range the panel timing supports",
                    }
                })?,
            };
            if !self.profile.fits(frames, hz) {
                return Err(SlmError::InvalidFrameRate {
                    rate: hz,
                    reason: "exceeds the sub-frame ceiling for the true-frame setting",
                });
            }
            plan.push(frames);
        }

        for ((board, core), frames) in cores.iter_mut().zip(plan) {
            program_true_frames(board, core, frames)?;
            if core.state == SequenceState::Loaded {
                core.state = SequenceState::Armed;
            }
        }
        self.rate = Some(rate);
        self.shared.set_state(EngineState::Armed);
        Ok(())
    }

    /// Start every board holding a sequence: armed boards, and stopped
    /// boards that kept theirs. All start or none do.
    pub(crate) fn start(&mut self, boards: &BoardRegistry) -> Result<usize> {
        if self.is_running() {
            return Err(SlmError::SequenceRunning);
        }
        let mut cores: Vec<_> = boards.iter().map(|board| (board, board.lock())).collect();
        let armed: Vec<usize> = cores
            .iter()
            .enumerate()
            .filter(|(_, (_, core))| core.sequence.active().is_some())
            .map(|(i, _)| i)
            .collect();
        if armed.is_empty() {
            return Err(SlmError::NoSequenceLoaded);
        }
        let Some(rate) = self.rate else {
            return Err(SlmError::RateNotSet);
        };

        let mut lanes = Vec::with_capacity(armed.len());
        for &i in &armed {
            let Some((board, core)) = cores.get(i) else {
                continue;
            };
            let Some((bank, len)) = core.sequence.active() else {
                return Err(SlmError::NoSequenceLoaded);
            };
            let len = u32::try_from(len).map_err(|_| SlmError::SequenceTooLong {
                board: board.id,
                len,
                capacity: board.info.sequence_capacity,
            })?;
            board
                .port
                .latch(FrameRegion::sequence(bank, 0))
                .map_err(SlmError::fault(board.id))?;
            lanes.push(RunLane {
                board: board.id,
                port: Arc::clone(&board.port),
                bank,
                len,
                position: Arc::clone(&board.position),
            });
        }

        for lane in &lanes {
            lane.position.store(0, Ordering::Release);
        }
        let ticks = self.timer.arm(rate.period())?;
        let runner = match Sequencer::spawn(
            lanes,
            ticks,
            rate.period(),
            Arc::clone(&self.shared),
            self.faults.clone(),
        ) {
            Ok(runner) => runner,
            Err(e) => {
                self.timer.disarm();
                return Err(e);
            }
        };

        self.running.clear();
        for &i in &armed {
            if let Some((board, core)) = cores.get_mut(i) {
                core.state = SequenceState::Running;
                self.running.push(board.id);
            }
        }
        self.runner = Some(runner);
        self.shared.set_state(EngineState::Running);
        tracing::info!(boards = armed.len(), rate = rate.hz(), "sequencing started");
        Ok(armed.len())
    }

    /// Halt the sequencer, disarm the timer and return running boards to
    /// Idle. Returns whether anything was running.
    pub(crate) fn stop(&mut self, boards: &BoardRegistry) -> bool {
        let Some(runner) = self.runner.take() else {
            return false;
        };
        self.shared.set_state(EngineState::Stopping);
        runner.halt();
        self.timer.disarm();
        self.idle_running(boards);
        self.shared.set_state(self.resting_state());
        tracing::info!("sequencing stopped");
        true
    }

    /// Take one running board out of the rotation. The caller holds that
    /// board's lock; no other board lock is taken.
    pub(crate) fn detach(&mut self, board: &Board, core: &mut BoardCore) {
        if core.state != SequenceState::Running {
            return;
        }
        if let Some(runner) = &self.runner {
            runner.detach(board.id);
        }
        self.running.retain(|&id| id != board.id);
        core.state = SequenceState::Idle;
        board.position.store(0, Ordering::Release);

        if self.running.is_empty() {
            if let Some(runner) = self.runner.take() {
                runner.halt();
            }
            self.timer.disarm();
            self.shared.set_state(self.resting_state());
            tracing::info!("sequencing stopped, no boards left");
        }
    }

    /// Forget the rate once the boards are gone.
    pub(crate) fn release(&mut self) {
        self.rate = None;
        self.shared.set_state(EngineState::Idle);
    }

    fn idle_running(&mut self, boards: &BoardRegistry) {
        for id in self.running.drain(..) {
            if let Ok(board) = boards.get(id) {
                let mut core = board.lock();
                if core.state == SequenceState::Running {
                    core.state = SequenceState::Idle;
                }
                board.position.store(0, Ordering::Release);
            }
        }
    }

    fn resting_state(&self) -> EngineState {
        if self.rate.is_some() {
            EngineState::Armed
        } else {
            EngineState::Idle
        }
    }
}

/// Write `frames` to the board and remember what was programmed.
pub(crate) fn program_true_frames(
    board: &Board,
    core: &mut BoardCore,
    frames: TrueFrames,
) -> Result<()> {
    if core.programmed_frames == Some(frames) {
        return Ok(());
    }
    core.transport
        .set_true_frames(frames)
        .map_err(SlmError::fault(board.id))?;
    core.programmed_frames = Some(frames);
    tracing::debug!(board = board.id.index(), frames = frames.get(), "true frames programmed");
    Ok(())
}
