//! Simulated hardware for testing
//!
//! [`SimulatedBoard`] keeps board memory in a hash map and its registers in
//! atomics. [`SimulatedBus`] hands boards out by liquid-crystal type.
//! Each board comes with a [`SimHandle`] that stays valid after the board
//! has moved into a session: tests use it to observe the display pointer
//! and power, and to inject faults.

#![cfg(any(test, feature = "sim"))]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU16, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::memory::{FrameRegion, DEFAULT_SEQUENCE_CAPACITY};
use crate::transport::{BoardBus, BoardInfo, BoardTransport, DisplayPort, TransportError};
use crate::types::{LcType, PanelSize, Temperature, TrueFrames};

const UNLIMITED: u64 = u64::MAX;

struct SimShared {
    info: BoardInfo,
    memory: Mutex<HashMap<FrameRegion, Vec<u16>>>,
    latched: AtomicU64,
    latch_count: AtomicU64,
    latch_budget: AtomicU64,
    power: AtomicBool,
    true_frames: AtomicU16,
    temperature: Mutex<Option<f64>>,
    fail_writes: AtomicBool,
    disconnected: AtomicBool,
}

impl SimShared {
    fn check_connected(&self) -> Result<(), TransportError> {
        if self.disconnected.load(Ordering::Acquire) {
            Err(TransportError::Disconnected)
        } else {
            Ok(())
        }
    }

    fn check_region(&self, region: FrameRegion) -> Result<(), TransportError> {
        match region {
            FrameRegion::Slot(_) => Ok(()),
            FrameRegion::Sequence { index, .. } => {
                let in_range = usize::try_from(index)
                    .map(|i| i < self.info.sequence_capacity)
                    .unwrap_or(false);
                if in_range {
                    Ok(())
                } else {
                    Err(TransportError::InvalidRegion(region))
                }
            }
        }
    }
}

// ── Display port ─────────────────────────────────────────────────────────────

struct SimDisplayPort {
    shared: Arc<SimShared>,
}

impl DisplayPort for SimDisplayPort {
    fn latch(&self, region: FrameRegion) -> Result<(), TransportError> {
        let shared = &self.shared;
        shared.check_connected()?;
        shared.check_region(region)?;
        let budget = shared
            .latch_budget
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |left| {
                if left == UNLIMITED {
                    Some(left)
                } else {
                    left.checked_sub(1)
                }
            });
        if budget.is_err() {
            return Err(TransportError::Timeout { millis: 5 });
        }
        shared.latched.store(region.to_raw(), Ordering::Release);
        shared.latch_count.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn latched(&self) -> Option<FrameRegion> {
        FrameRegion::from_raw(self.shared.latched.load(Ordering::Acquire))
    }
}

// ── Board ────────────────────────────────────────────────────────────────────

/// In-memory board.
pub struct SimulatedBoard {
    shared: Arc<SimShared>,
    port: Arc<SimDisplayPort>,
}

impl SimulatedBoard {
    /// Board with the given description, powered off, true frames = 1.
    #[must_use]
    pub fn new(info: BoardInfo) -> Self {
        let temperature = info.has_temperature_sensor.then_some(30.0);
        let shared = Arc::new(SimShared {
            info,
            memory: Mutex::new(HashMap::new()),
            latched: AtomicU64::new(0),
            latch_count: AtomicU64::new(0),
            latch_budget: AtomicU64::new(UNLIMITED),
            power: AtomicBool::new(false),
            true_frames: AtomicU16::new(1),
            temperature: Mutex::new(temperature),
            fail_writes: AtomicBool::new(false),
            disconnected: AtomicBool::new(false),
        });
        let port = Arc::new(SimDisplayPort {
            shared: Arc::clone(&shared),
        });
        Self { shared, port }
    }

    /// 512 × 512 board with a temperature sensor, as fitted to most systems.
    #[must_use]
    pub fn p512(serial: &str, lc_type: LcType) -> Self {
        Self::new(BoardInfo {
            serial: serial.to_owned(),
            lc_type,
            panel: PanelSize::P512,
            pixel_pitch_um: 15.0,
            sequence_capacity: DEFAULT_SEQUENCE_CAPACITY,
            has_temperature_sensor: true,
        })
    }

    /// Small board for fast tests: `width` × `height`, `capacity` frames per bank.
    #[must_use]
    pub fn small(serial: &str, lc_type: LcType, width: u32, height: u32, capacity: usize) -> Self {
        Self::new(BoardInfo {
            serial: serial.to_owned(),
            lc_type,
            panel: PanelSize::new(width, height),
            pixel_pitch_um: 15.0,
            sequence_capacity: capacity,
            has_temperature_sensor: true,
        })
    }

    /// Observation and fault-injection handle.
    #[must_use]
    pub fn handle(&self) -> SimHandle {
        SimHandle {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl BoardTransport for SimulatedBoard {
    fn info(&self) -> &BoardInfo {
        &self.shared.info
    }

    fn display_port(&self) -> Arc<dyn DisplayPort> {
        Arc::clone(&self.port) as Arc<dyn DisplayPort>
    }

    fn write_frame(&mut self, region: FrameRegion, drive: &[u16]) -> Result<(), TransportError> {
        let shared = &self.shared;
        shared.check_connected()?;
        shared.check_region(region)?;
        if shared.fail_writes.load(Ordering::Acquire) {
            return Err(TransportError::Device("DMA write aborted".into()));
        }
        let expected = shared.info.panel.pixel_count();
        if drive.len() != expected {
            return Err(TransportError::LengthMismatch {
                expected,
                actual: drive.len(),
            });
        }
        let mut memory = shared
            .memory
            .lock()
            .map_err(|_| TransportError::Device("memory lock poisoned".into()))?;
        memory.insert(region, drive.to_vec());
        Ok(())
    }

    fn read_frame(&mut self, region: FrameRegion) -> Result<Vec<u16>, TransportError> {
        let shared = &self.shared;
        shared.check_connected()?;
        shared.check_region(region)?;
        let memory = shared
            .memory
            .lock()
            .map_err(|_| TransportError::Device("memory lock poisoned".into()))?;
        memory
            .get(&region)
            .cloned()
            .ok_or(TransportError::EmptyRegion(region))
    }

    fn set_true_frames(&mut self, frames: TrueFrames) -> Result<(), TransportError> {
        self.shared.check_connected()?;
        self.shared.true_frames.store(frames.get(), Ordering::Release);
        Ok(())
    }

    fn power(&mut self) -> Result<bool, TransportError> {
        self.shared.check_connected()?;
        Ok(self.shared.power.load(Ordering::Acquire))
    }

    fn set_power(&mut self, on: bool) -> Result<(), TransportError> {
        self.shared.check_connected()?;
        self.shared.power.store(on, Ordering::Release);
        Ok(())
    }

    fn read_temperature(&mut self) -> Result<Option<Temperature>, TransportError> {
        self.shared.check_connected()?;
        let reading = self
            .shared
            .temperature
            .lock()
            .map_err(|_| TransportError::Device("sensor lock poisoned".into()))?;
        Ok(reading.map(Temperature::from_celsius))
    }
}

// ── Handle ───────────────────────────────────────────────────────────────────

/// Shared view of a [`SimulatedBoard`].
#[derive(Clone)]
pub struct SimHandle {
    shared: Arc<SimShared>,
}

impl SimHandle {
    /// Region the display plane currently scans out.
    #[must_use]
    pub fn latched(&self) -> Option<FrameRegion> {
        FrameRegion::from_raw(self.shared.latched.load(Ordering::Acquire))
    }

    /// Successful latches since creation.
    #[must_use]
    pub fn latch_count(&self) -> u64 {
        self.shared.latch_count.load(Ordering::Relaxed)
    }

    /// Frame data stored at `region`, if written.
    #[must_use]
    pub fn frame_at(&self, region: FrameRegion) -> Option<Vec<u16>> {
        self.shared
            .memory
            .lock()
            .ok()
            .and_then(|memory| memory.get(&region).cloned())
    }

    /// Frame data the display plane currently shows.
    #[must_use]
    pub fn displayed(&self) -> Option<Vec<u16>> {
        self.latched().and_then(|region| self.frame_at(region))
    }

    /// Panel power.
    #[must_use]
    pub fn is_powered(&self) -> bool {
        self.shared.power.load(Ordering::Acquire)
    }

    /// Programmed true-frame count.
    #[must_use]
    pub fn true_frames(&self) -> u16 {
        self.shared.true_frames.load(Ordering::Acquire)
    }

    /// Set the sensor reading; `None` simulates a missing sensor.
    pub fn set_temperature(&self, celsius: Option<f64>) {
        if let Ok(mut reading) = self.shared.temperature.lock() {
            *reading = celsius;
        }
    }

    /// Allow `count` more latches, then time out every latch after that.
    pub fn fail_latch_after(&self, count: u64) {
        self.shared.latch_budget.store(count, Ordering::Release);
    }

    /// Make every frame write fail (`true`) or succeed (`false`).
    pub fn fail_writes(&self, fail: bool) {
        self.shared.fail_writes.store(fail, Ordering::Release);
    }

    /// Drop the board off the bus.
    pub fn disconnect(&self) {
        self.shared.disconnected.store(true, Ordering::Release);
    }

    /// Clear every injected fault.
    pub fn heal(&self) {
        self.shared.latch_budget.store(UNLIMITED, Ordering::Release);
        self.shared.fail_writes.store(false, Ordering::Release);
        self.shared.disconnected.store(false, Ordering::Release);
    }
}

// ── Bus ──────────────────────────────────────────────────────────────────────

/// Bus populated with simulated boards.
#[derive(Default)]
pub struct SimulatedBus {
    boards: Vec<SimulatedBoard>,
}

impl SimulatedBus {
    /// Empty bus: enumeration finds nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a board; returns its handle.
    pub fn attach(&mut self, board: SimulatedBoard) -> SimHandle {
        let handle = board.handle();
        self.boards.push(board);
        handle
    }

    /// Boards still attached and unclaimed.
    #[must_use]
    pub fn len(&self) -> usize {
        self.boards.len()
    }

    /// Whether no boards are attached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.boards.is_empty()
    }
}

impl BoardBus for SimulatedBus {
    fn enumerate(&mut self, lc_type: LcType) -> Result<Vec<Box<dyn BoardTransport>>, TransportError> {
        let (matching, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut self.boards)
            .into_iter()
            .partition(|board| board.shared.info.lc_type == lc_type);
        self.boards = rest;
        Ok(matching
            .into_iter()
            .map(|board| Box::new(board) as Box<dyn BoardTransport>)
            .collect())
    }
}
