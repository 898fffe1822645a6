//! `slmctl run`: load a sequence on every board, run it for a while, stop.
//!
//! Frames come from `--tiff` files when given, otherwise from the chosen
//! pattern generator at each board's own panel size and pixel pitch.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use colored::Colorize;
use slm_core::{Frame, FrameDecoder, SequencerStats, Session, SlmError, TiffDecoder};
use slm_hal::{BoardInfo, IntervalTimer};
use slm_patterns::stripes::StripeParams;
use slm_patterns::{grating, ramp, sim, stripes};

use crate::config::RigConfig;

/// Default stripe period in pixels when the rig lists no `[[stripes]]`.
const DEFAULT_STRIPE_PERIOD_PX: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Pattern {
    /// Cosine stripes: the rig's `[[stripes]]`, or three phase steps
    Stripes,
    /// Six sawtooth ramps, both axes
    Ramp,
    /// Structured-illumination set from the rig's `[sim]`
    Sim,
    /// Binary alignment gratings
    Grating,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Sequencing rate in frames per second
    #[arg(long)]
    pub rate: f64,

    /// How long to run
    #[arg(long, default_value_t = 2.0)]
    pub seconds: f64,

    /// Pattern to generate when no --tiff files are given
    #[arg(long, value_enum, default_value_t = Pattern::Stripes)]
    pub pattern: Pattern,

    /// LUT file applied to every board before loading
    #[arg(long)]
    pub lut: Option<PathBuf>,

    /// Image files to sequence instead of a generated pattern
    #[arg(long, num_args = 1..)]
    pub tiff: Vec<PathBuf>,

    /// Position log interval in milliseconds
    #[arg(long, default_value_t = 250)]
    pub report_ms: u64,
}

pub fn run(rig: &RigConfig, args: &RunArgs) -> Result<()> {
    let mut bus = rig.build_bus();
    let session = Session::open(&mut bus, IntervalTimer::new(), rig.lc_type, rig.session.clone())
        .context("opening session")?;
    let stats = execute(&session, rig, args)?;

    println!(
        "{}",
        format!("✓ {} ticks at {} fps", stats.ticks, args.rate).green().bold()
    );
    if stats.late_ticks > 0 {
        println!(
            "{}",
            format!("  ⚠ {} late ticks", stats.late_ticks).yellow().bold()
        );
    }
    Ok(())
}

/// Everything after `Session::open`, so tests can drive it with any session.
pub(crate) fn execute(session: &Session, rig: &RigConfig, args: &RunArgs) -> Result<SequencerStats> {
    let duration = Duration::try_from_secs_f64(args.seconds)
        .with_context(|| format!("--seconds {} is not a duration", args.seconds))?;

    for board in session.boards() {
        if let Some(lut) = &args.lut {
            session
                .load_lut(board, lut)
                .with_context(|| format!("loading LUT {} on {board}", lut.display()))?;
        }
        session.set_power(board, true)?;
        let info = session.board_info(board)?;
        let frames = build_frames(rig, args, &info)?;
        session
            .load_sequence(board, &frames)
            .with_context(|| format!("loading {} frames on {board}", frames.len()))?;
        tracing::info!(%board, serial = %info.serial, frames = frames.len(), "sequence loaded");
    }

    session.set_sequencing_rate(args.rate)?;
    let started = session.start_sequence()?;
    tracing::info!(boards = started, rate = args.rate, "sequence running");

    let watched = watch(session, duration, Duration::from_millis(args.report_ms.max(1)));
    session.stop_sequence();
    watched?;
    Ok(session.sequencer_stats())
}

/// Log positions every `every` until `duration` has passed or a fault arrives.
fn watch(session: &Session, duration: Duration, every: Duration) -> Result<()> {
    let faults = session.fault_events();
    let deadline = Instant::now() + duration;
    loop {
        let now = Instant::now();
        if now >= deadline {
            return Ok(());
        }
        if let Ok(fault) = faults.recv_timeout(every.min(deadline - now)) {
            return Err(SlmError::from(fault)).context("sequencer stopped");
        }
        for board in session.boards() {
            tracing::info!(%board, position = session.current_sequence_image(board)?, "sequencing");
        }
    }
}

pub(crate) fn build_frames(rig: &RigConfig, args: &RunArgs, info: &BoardInfo) -> Result<Vec<Frame>> {
    let panel = info.panel;
    if !args.tiff.is_empty() {
        let decoder = TiffDecoder::new();
        return args
            .tiff
            .iter()
            .map(|path| {
                decoder
                    .decode(path, panel.width, panel.height)
                    .with_context(|| format!("decoding {}", path.display()))
            })
            .collect();
    }

    let pitch = info.pixel_pitch_um;
    let frames = match args.pattern {
        Pattern::Stripes if rig.stripes.is_empty() => {
            let base = StripeParams::new(pitch * DEFAULT_STRIPE_PERIOD_PX);
            stripes::phase_steps(panel, pitch, base, 3)?
        }
        Pattern::Stripes => stripes::series(panel, pitch, &rig.stripes)?,
        Pattern::Ramp => ramp::test_sequence(panel, 0, u16::MAX),
        Pattern::Sim => sim::generate(panel, pitch, &rig.sim)?,
        Pattern::Grating => grating::alignment_set(panel),
    };
    Ok(frames)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use slm_core::{EngineState, SequenceState};
    use slm_hal::BoardId;

    fn small_rig() -> RigConfig {
        RigConfig::parse(
            r#"
            [[boards]]
            serial = "slm0001"
            panel = { width = 8, height = 8 }
            [[boards]]
            serial = "slm0002"
            panel = { width = 4, height = 4 }
            "#,
        )
        .unwrap()
    }

    fn args(pattern: Pattern) -> RunArgs {
        RunArgs {
            rate: 50.0,
            seconds: 0.3,
            pattern,
            lut: None,
            tiff: Vec::new(),
            report_ms: 50,
        }
    }

    #[test]
    fn pattern_frame_counts() {
        let rig = small_rig();
        let info = rig.boards[0].info();
        assert_eq!(build_frames(&rig, &args(Pattern::Stripes), &info).unwrap().len(), 3);
        assert_eq!(build_frames(&rig, &args(Pattern::Ramp), &info).unwrap().len(), 6);
        assert_eq!(build_frames(&rig, &args(Pattern::Sim), &info).unwrap().len(), 15);
        assert_eq!(build_frames(&rig, &args(Pattern::Grating), &info).unwrap().len(), 3);

        let frames = build_frames(&rig, &args(Pattern::Ramp), &info).unwrap();
        assert_eq!((frames[0].width(), frames[0].height()), (8, 8));
    }

    #[test]
    fn missing_tiff_names_file() {
        let rig = small_rig();
        let info = rig.boards[0].info();
        let mut run_args = args(Pattern::Stripes);
        run_args.tiff = vec![PathBuf::from("/nonexistent/frame.tiff")];
        let err = build_frames(&rig, &run_args, &info).unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/frame.tiff"));
    }

    #[test]
    fn runs_every_board_and_stops() {
        let rig = small_rig();
        let mut bus = rig.build_bus();
        let session =
            Session::open(&mut bus, IntervalTimer::new(), rig.lc_type, rig.session.clone())
                .unwrap();

        let stats = execute(&session, &rig, &args(Pattern::Grating)).unwrap();

        assert!(stats.ticks > 0);
        assert_eq!(session.engine_state(), EngineState::Armed);
        for board in session.boards() {
            assert_eq!(session.sequence_state(board).unwrap(), SequenceState::Idle);
            assert!(session.power(board).unwrap());
            assert_eq!(session.current_sequence_image(board).unwrap(), 0);
        }
    }

    #[test]
    fn negative_duration_is_rejected_before_loading() {
        let rig = small_rig();
        let mut bus = rig.build_bus();
        let session =
            Session::open(&mut bus, IntervalTimer::new(), rig.lc_type, rig.session.clone())
                .unwrap();
        let mut run_args = args(Pattern::Ramp);
        run_args.seconds = -1.0;
        assert!(execute(&session, &rig, &run_args).is_err());
        assert!(!session.power(BoardId::new(0)).unwrap());
    }

    #[test]
    fn unsupported_rate_fails_after_loading() {
        let rig = small_rig();
        let mut bus = rig.build_bus();
        let session =
            Session::open(&mut bus, IntervalTimer::new(), rig.lc_type, rig.session.clone())
                .unwrap();
        let mut run_args = args(Pattern::Ramp);
        run_args.rate = 0.0;
        let err = execute(&session, &rig, &run_args).unwrap_err();
        assert!(err.downcast_ref::<SlmError>().is_some());
    }
}
