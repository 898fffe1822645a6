//! Tick thread
//!
//! The sequencer thread owns one [`RunLane`] per running board and waits on
//! two channels: ticks from the [`TickSource`](slm_hal::TickSource) and
//! control messages from the session. Per tick it only advances each lane's
//! position and latches the next pre-written frame. It never allocates,
//! takes a board lock, or touches frame data.
//!
//! ```text
//! caller thread                     slm-sequencer thread
//! ─────────────                     ────────────────────
//! start ── spawn(lanes, ticks) ───> loop select {
//! detach(board) ── Detach ────────>   control => drop lane, ack
//!            <──────────── ack ────
//! halt ── Halt ───────────────────>   control => exit
//!                                     tick => latch (pos+1) % len on every lane
//!                                             publish position
//!                                             on error: reset, report, exit
//! join <──────────────── exit ─────  }
//! ```

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{select, Receiver, Sender};
use serde::Serialize;
use slm_hal::{Bank, BoardId, DisplayPort, FrameRegion, Tick, TransportError};

use crate::engine::EngineState;
use crate::error::{Result, SlmError};

/// Transport failure observed on the tick path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaultEvent {
    /// Board whose latch failed.
    pub board: BoardId,
    /// Tick number (1-based since start) that failed.
    pub tick: u64,
    /// Transport error.
    pub error: TransportError,
}

impl From<FaultEvent> for SlmError {
    fn from(event: FaultEvent) -> Self {
        Self::HardwareFault {
            board: event.board,
            source: event.error,
        }
    }
}

/// Tick counters since the session opened.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SequencerStats {
    /// Ticks handled.
    pub ticks: u64,
    /// Ticks handled more than one period after their deadline.
    pub late_ticks: u64,
}

/// State shared between the session and the sequencer thread.
#[derive(Default)]
pub(crate) struct EngineShared {
    state: AtomicU8,
    faulted: AtomicBool,
    fault: Mutex<Option<FaultEvent>>,
    ticks: AtomicU64,
    late_ticks: AtomicU64,
}

impl EngineShared {
    pub(crate) fn state(&self) -> EngineState {
        EngineState::from_raw(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn set_state(&self, state: EngineState) {
        self.state.store(state as u8, Ordering::Release);
    }

    pub(crate) fn is_faulted(&self) -> bool {
        self.faulted.load(Ordering::Acquire)
    }

    /// Take the recorded fault and clear the flag.
    pub(crate) fn take_fault(&self) -> Option<FaultEvent> {
        let event = self
            .fault
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.faulted.store(false, Ordering::Release);
        event
    }

    pub(crate) fn stats(&self) -> SequencerStats {
        SequencerStats {
            ticks: self.ticks.load(Ordering::Relaxed),
            late_ticks: self.late_ticks.load(Ordering::Relaxed),
        }
    }

    fn record_fault(&self, event: FaultEvent) {
        *self.fault.lock().unwrap_or_else(PoisonError::into_inner) = Some(event);
        self.faulted.store(true, Ordering::Release);
    }
}

/// One board's view from the tick thread.
pub(crate) struct RunLane {
    pub(crate) board: BoardId,
    pub(crate) port: Arc<dyn DisplayPort>,
    pub(crate) bank: Bank,
    /// Sequence length, at least 1.
    pub(crate) len: u32,
    pub(crate) position: Arc<AtomicUsize>,
}

impl RunLane {
    fn advance(&self) -> std::result::Result<(), TransportError> {
        let current = u32::try_from(self.position.load(Ordering::Relaxed)).unwrap_or(0);
        let next = current.wrapping_add(1).checked_rem(self.len).unwrap_or(0);
        self.port.latch(FrameRegion::sequence(self.bank, next))?;
        self.position.store(next as usize, Ordering::Release);
        Ok(())
    }

    fn reset(&self) {
        self.position.store(0, Ordering::Release);
    }
}

enum Control {
    Detach { board: BoardId, done: Sender<()> },
    Halt,
}

/// Handle to a running sequencer thread.
pub(crate) struct Sequencer {
    control: Sender<Control>,
    thread: Option<JoinHandle<()>>,
}

impl Sequencer {
    /// Start the thread. Positions must already be at 0 and frame 0 latched.
    pub(crate) fn spawn(
        lanes: Vec<RunLane>,
        ticks: Receiver<Tick>,
        period: Duration,
        shared: Arc<EngineShared>,
        faults: Sender<FaultEvent>,
    ) -> Result<Self> {
        let (control, control_rx) = crossbeam_channel::unbounded();
        let thread = thread::Builder::new()
            .name("slm-sequencer".into())
            .spawn(move || run(lanes, &ticks, &control_rx, period, &shared, &faults))
            .map_err(|e| slm_hal::TimerError::Spawn(e.to_string()))?;
        Ok(Self {
            control,
            thread: Some(thread),
        })
    }

    /// Remove `board` from the rotation. Returns once the thread has
    /// acknowledged, so no further latch reaches that board.
    pub(crate) fn detach(&self, board: BoardId) {
        let (done, ack) = crossbeam_channel::bounded(1);
        if self.control.send(Control::Detach { board, done }).is_ok() {
            // Err means the thread already exited (fault); nothing left to stop.
            let _ = ack.recv();
        }
    }

    /// Stop the thread and wait for it to exit.
    pub(crate) fn halt(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        let _ = self.control.send(Control::Halt);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::error!("sequencer thread panicked");
            }
        }
    }
}

impl Drop for Sequencer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run(
    mut lanes: Vec<RunLane>,
    ticks: &Receiver<Tick>,
    control: &Receiver<Control>,
    period: Duration,
    shared: &EngineShared,
    faults: &Sender<FaultEvent>,
) {
    tracing::debug!(lanes = lanes.len(), period_us = period.as_micros(), "sequencer running");
    let mut count: u64 = 0;
    loop {
        select! {
            recv(control) -> message => match message {
                Ok(Control::Detach { board, done }) => {
                    if let Some(i) = lanes.iter().position(|lane| lane.board == board) {
                        lanes.swap_remove(i).reset();
                    }
                    let _ = done.send(());
                }
                Ok(Control::Halt) | Err(_) => break,
            },
            recv(ticks) -> tick => {
                let Ok(tick) = tick else {
                    // Timer disarmed underneath us.
                    break;
                };
                count = count.wrapping_add(1);
                shared.ticks.fetch_add(1, Ordering::Relaxed);
                if tick.scheduled().elapsed() > period {
                    shared.late_ticks.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!(tick = count, "late tick");
                }

                let failed = lanes
                    .iter()
                    .find_map(|lane| lane.advance().err().map(|error| (lane.board, error)));
                if let Some((board, error)) = failed {
                    tracing::warn!(board = board.index(), tick = count, %error, "latch failed, stopping all boards");
                    for lane in &lanes {
                        lane.reset();
                    }
                    let event = FaultEvent { board, tick: count, error };
                    shared.record_fault(event.clone());
                    let _ = faults.send(event);
                    tick.complete();
                    return;
                }
                tracing::trace!(tick = count, "tick");
                tick.complete();
            },
        }
    }
    for lane in &lanes {
        lane.reset();
    }
    tracing::debug!(ticks = count, "sequencer stopped");
}
