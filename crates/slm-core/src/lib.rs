//! Session and sequencing engine for PCIe spatial light modulator boards
//!
//! A [`Session`] claims every board of one liquid-crystal type on a
//! [`BoardBus`](slm_hal::BoardBus), stages single frames through the
//! calibration pipeline and runs timed frame sequences across all boards
//! from one tick source.
//!
//! ```text
//! Frame ──> size check ──> +WFC ──> ×NUC ──> LUT ──> board memory
//!                                                       │
//!                      TickSource ──> slm-sequencer ──> latch(next frame)
//! ```
//!
//! # Example
//!
//! ```
//! use slm_core::{Frame, Session, SessionConfig};
//! use slm_hal::mocks::{SimulatedBoard, SimulatedBus};
//! use slm_hal::{BoardId, LcType, ManualTicker};
//!
//! let mut bus = SimulatedBus::new();
//! bus.attach(SimulatedBoard::small("slm0001", LcType::Nematic, 4, 4, 16));
//! let ticker = ManualTicker::new();
//! let ticks = ticker.handle();
//!
//! let session = Session::open(&mut bus, ticker, LcType::Nematic, SessionConfig::default())?;
//! let board = BoardId::new(0);
//! let panel = session.board_info(board)?.panel;
//! let frames: Vec<Frame> = (0..3).map(|i| Frame::filled(panel, i * 1000)).collect();
//!
//! session.load_sequence(board, &frames)?;
//! session.set_sequencing_rate(60.0)?;
//! session.start_sequence()?;
//! ticks.fire_n(7);
//! assert_eq!(session.current_sequence_image(board)?, 1);
//! session.stop_sequence();
//! # Ok::<(), slm_core::SlmError>(())
//! ```
//!
//! # Features
//!
//! - `image-io` (default): [`decoder`] reads TIFF/PNG/BMP files into frames
//! - `sim`: enables `slm_hal::mocks` for downstream tools

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
#![warn(clippy::print_stdout)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod calibration;
pub mod config;
#[cfg(feature = "image-io")]
pub mod decoder;
mod engine;
pub mod error;
pub mod frame;
mod framebuffer;
pub mod library;
pub mod lut;
mod registry;
mod sequencer;
pub mod session;
pub mod telemetry;
pub mod timing;

pub use calibration::{CalibrationStore, CorrectionPipeline, NUC_UNITY};
pub use config::{RunningPolicy, SessionConfig};
#[cfg(feature = "image-io")]
pub use decoder::{FrameDecoder, ImageInfo, TiffDecoder};
pub use engine::{EngineState, SequenceState};
pub use error::{Result, SlmError};
pub use frame::Frame;
pub use library::{CalibrationLibrary, EntryKind, LibraryEntry};
pub use lut::{Lut, LutError};
pub use sequencer::{FaultEvent, SequencerStats};
pub use session::Session;
pub use telemetry::{CalibrationSummary, TelemetrySnapshot};
pub use timing::TimingProfile;
