//! Hardware Abstraction Layer (HAL) for PCIe spatial light modulator boards
//!
//! This crate provides the trait seams between the sequencing engine and the
//! board driver, so the engine can be developed and tested without hardware.
//!
//! # Architecture Layers
//!
//! ```text
//! Operator tooling (slmctl)
//!         ↓
//! Session / sequencing engine (slm-core)
//!         ↓
//! Board HAL (this crate - traits, newtypes, memory layout)
//!         ↓
//! PCIe driver + DMA transport (vendor)
//! ```
//!
//! # Abstractions
//!
//! - [`BoardBus`] - enumerates boards by liquid-crystal type
//! - [`BoardTransport`] - bulk frame writes/reads, power, sensor, true frames
//! - [`DisplayPort`] - non-blocking display pointer latch for the tick path
//! - [`TickSource`] - the frame interrupt, as a channel of [`Tick`]s
//!
//! # Features
//!
//! - `sim`: simulated boards and bus ([`mocks`]), used by tests and the CLI

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(unused_must_use)]
// all Results must be handled
// ────────────────────────────────────────────────────────────────────────────
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::print_stdout)] // prefer tracing over println! in lib code
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)] // hardware accessors; callers decide

pub mod memory;
pub mod mocks;
pub mod timer;
pub mod transport;
pub mod types;

pub use memory::{Bank, FrameRegion, DEFAULT_SEQUENCE_CAPACITY};
pub use timer::{IntervalTimer, ManualTicker, Tick, TickHandle, TickSource, TimerError};
pub use transport::{BoardBus, BoardInfo, BoardTransport, DisplayPort, TransportError};
pub use types::{
    BoardId, CalType, FrameRate, InvalidRateError, LcType, OutOfRangeError, PanelSize,
    Temperature, TemperatureUnit, TrueFrames,
};
