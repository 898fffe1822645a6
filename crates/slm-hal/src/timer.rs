//! Tick sources for the sequencing clock.
//!
//! A [`TickSource`] stands in for the board's frame interrupt. Arming it
//! yields a channel that delivers one [`Tick`] per period; the sequencer
//! thread blocks on that channel and does nothing else between ticks.
//!
//! Two implementations ship here:
//!
//! - [`IntervalTimer`]: a deadline-scheduled thread. Deadlines advance by
//!   exactly one period each tick (`next += period`), so the schedule does not
//!   drift with handler latency. A tick the consumer has not picked up by the
//!   next deadline is dropped and counted in [`IntervalTimer::missed_ticks`].
//! - [`ManualTicker`]: ticks are fired explicitly through a [`TickHandle`],
//!   which waits until the consumer has finished handling each one. Tests use
//!   it to step the sequencer deterministically.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, TrySendError};

/// Timer failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimerError {
    /// A zero period would spin.
    #[error("tick period must be non-zero")]
    ZeroPeriod,
    /// The timer thread could not be started.
    #[error("failed to start timer thread: {0}")]
    Spawn(String),
}

/// One timer expiry.
#[derive(Debug)]
pub struct Tick {
    scheduled: Instant,
    ack: Option<Sender<()>>,
}

impl Tick {
    /// Tick without completion tracking.
    #[must_use]
    pub fn at(scheduled: Instant) -> Self {
        Self {
            scheduled,
            ack: None,
        }
    }

    /// Deadline this tick was generated for.
    #[must_use]
    pub fn scheduled(&self) -> Instant {
        self.scheduled
    }

    /// Mark the tick as handled, releasing anyone waiting on it.
    pub fn complete(self) {
        if let Some(ack) = self.ack {
            // The waiter may have given up; nothing to report then.
            let _ = ack.send(());
        }
    }
}

/// Periodic interrupt source.
pub trait TickSource: Send {
    /// Start ticking every `period`. Re-arming replaces any previous schedule.
    fn arm(&mut self, period: Duration) -> Result<Receiver<Tick>, TimerError>;

    /// Stop ticking. Returns once no further tick will be produced.
    /// Calling it while disarmed is a no-op.
    fn disarm(&mut self);
}

impl<T: TickSource + ?Sized> TickSource for Box<T> {
    fn arm(&mut self, period: Duration) -> Result<Receiver<Tick>, TimerError> {
        (**self).arm(period)
    }

    fn disarm(&mut self) {
        (**self).disarm();
    }
}

// ── IntervalTimer ────────────────────────────────────────────────────────────

struct Worker {
    stop: Arc<AtomicBool>,
    thread: JoinHandle<()>,
}

/// Free-running deadline timer backed by a dedicated thread.
#[derive(Default)]
pub struct IntervalTimer {
    worker: Option<Worker>,
    missed: Arc<AtomicU64>,
}

impl IntervalTimer {
    /// Create a disarmed timer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ticks dropped because the consumer was still busy with the previous one.
    #[must_use]
    pub fn missed_ticks(&self) -> u64 {
        self.missed.load(Ordering::Relaxed)
    }

    /// Whether a schedule is running.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.worker.is_some()
    }
}

impl TickSource for IntervalTimer {
    fn arm(&mut self, period: Duration) -> Result<Receiver<Tick>, TimerError> {
        if period.is_zero() {
            return Err(TimerError::ZeroPeriod);
        }
        self.disarm();

        let (tx, rx) = crossbeam_channel::bounded(1);
        let stop = Arc::new(AtomicBool::new(false));
        let thread = thread::Builder::new()
            .name("slm-timer".into())
            .spawn({
                let stop = Arc::clone(&stop);
                let missed = Arc::clone(&self.missed);
                move || run_schedule(period, &tx, &stop, &missed)
            })
            .map_err(|e| TimerError::Spawn(e.to_string()))?;

        tracing::debug!(period_us = period.as_micros(), "interval timer armed");
        self.worker = Some(Worker { stop, thread });
        Ok(rx)
    }

    fn disarm(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.stop.store(true, Ordering::Release);
            worker.thread.thread().unpark();
            if worker.thread.join().is_err() {
                tracing::warn!("interval timer thread panicked");
            }
            tracing::debug!("interval timer disarmed");
        }
    }
}

impl Drop for IntervalTimer {
    fn drop(&mut self) {
        self.disarm();
    }
}

fn run_schedule(period: Duration, tx: &Sender<Tick>, stop: &AtomicBool, missed: &AtomicU64) {
    let Some(mut deadline) = Instant::now().checked_add(period) else {
        return;
    };
    loop {
        loop {
            if stop.load(Ordering::Acquire) {
                return;
            }
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            thread::park_timeout(deadline.saturating_duration_since(now));
        }

        match tx.try_send(Tick::at(deadline)) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                missed.fetch_add(1, Ordering::Relaxed);
            }
            Err(TrySendError::Disconnected(_)) => return,
        }

        deadline = match deadline.checked_add(period) {
            Some(next) => next,
            None => return,
        };
    }
}

// ── ManualTicker ─────────────────────────────────────────────────────────────

#[derive(Default)]
struct ManualShared {
    sender: Mutex<Option<Sender<Tick>>>,
    period: Mutex<Option<Duration>>,
    arms: AtomicU64,
}

/// Tick source driven by hand through a [`TickHandle`].
#[derive(Default)]
pub struct ManualTicker {
    shared: Arc<ManualShared>,
}

impl ManualTicker {
    /// Create a disarmed ticker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle used to fire ticks and observe the armed period.
    #[must_use]
    pub fn handle(&self) -> TickHandle {
        TickHandle {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl TickSource for ManualTicker {
    fn arm(&mut self, period: Duration) -> Result<Receiver<Tick>, TimerError> {
        if period.is_zero() {
            return Err(TimerError::ZeroPeriod);
        }
        let (tx, rx) = crossbeam_channel::bounded(1);
        if let Ok(mut sender) = self.shared.sender.lock() {
            *sender = Some(tx);
        }
        if let Ok(mut slot) = self.shared.period.lock() {
            *slot = Some(period);
        }
        self.shared.arms.fetch_add(1, Ordering::Relaxed);
        Ok(rx)
    }

    fn disarm(&mut self) {
        if let Ok(mut sender) = self.shared.sender.lock() {
            sender.take();
        }
        if let Ok(mut slot) = self.shared.period.lock() {
            slot.take();
        }
    }
}

/// Test-side control of a [`ManualTicker`].
#[derive(Clone)]
pub struct TickHandle {
    shared: Arc<ManualShared>,
}

impl TickHandle {
    /// Deliver one tick and wait until the consumer has handled it.
    ///
    /// Returns `false` if the ticker is disarmed or the consumer went away
    /// before handling the tick.
    pub fn fire(&self) -> bool {
        let sender = match self.shared.sender.lock() {
            Ok(guard) => guard.clone(),
            Err(_) => None,
        };
        let Some(sender) = sender else {
            return false;
        };

        let (ack_tx, ack_rx) = crossbeam_channel::bounded(1);
        let tick = Tick {
            scheduled: Instant::now(),
            ack: Some(ack_tx),
        };
        if sender.send(tick).is_err() {
            return false;
        }
        drop(sender);
        ack_rx.recv().is_ok()
    }

    /// Fire up to `count` ticks, stopping at the first one not handled.
    /// Returns how many were handled.
    pub fn fire_n(&self, count: usize) -> usize {
        (0..count).take_while(|_| self.fire()).count()
    }

    /// Whether the ticker is currently armed.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.shared
            .sender
            .lock()
            .map(|guard| guard.is_some())
            .unwrap_or(false)
    }

    /// Period passed to the most recent `arm`, while armed.
    #[must_use]
    pub fn period(&self) -> Option<Duration> {
        self.shared.period.lock().ok().and_then(|guard| *guard)
    }

    /// How many times the ticker has been armed.
    #[must_use]
    pub fn arm_count(&self) -> u64 {
        self.shared.arms.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn zero_period_is_rejected() {
        assert_eq!(
            IntervalTimer::new().arm(Duration::ZERO).unwrap_err(),
            TimerError::ZeroPeriod
        );
        assert_eq!(
            ManualTicker::new().arm(Duration::ZERO).unwrap_err(),
            TimerError::ZeroPeriod
        );
    }

    #[test]
    fn interval_timer_delivers_ticks_in_deadline_order() {
        let mut timer = IntervalTimer::new();
        let rx = timer.arm(Duration::from_millis(2)).unwrap();
        let first = rx.recv_timeout(Duration::from_secs(1)).unwrap();
        let second = rx.recv_timeout(Duration::from_secs(1)).unwrap();
        assert!(second.scheduled() > first.scheduled());
        timer.disarm();
        assert!(!timer.is_armed());
    }

    #[test]
    fn interval_timer_disarm_is_idempotent() {
        let mut timer = IntervalTimer::new();
        let _rx = timer.arm(Duration::from_millis(5)).unwrap();
        timer.disarm();
        timer.disarm();
        assert!(!timer.is_armed());
    }

    #[test]
    fn manual_fire_fails_while_disarmed() {
        let ticker = ManualTicker::new();
        assert!(!ticker.handle().fire());
    }

    #[test]
    fn manual_fire_waits_for_completion() {
        let mut ticker = ManualTicker::new();
        let handle = ticker.handle();
        let rx = ticker.arm(Duration::from_millis(10)).unwrap();
        let consumer = thread::spawn(move || {
            let mut handled = 0;
            while let Ok(tick) = rx.recv() {
                handled += 1;
                tick.complete();
            }
            handled
        });
        assert_eq!(handle.fire_n(3), 3);
        assert_eq!(handle.period(), Some(Duration::from_millis(10)));
        ticker.disarm();
        assert!(!handle.is_armed());
        assert_eq!(consumer.join().unwrap(), 3);
    }
}
