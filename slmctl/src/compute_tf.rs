use anyhow::{Context, Result};
use colored::Colorize;
use slm_core::{Session, TimingProfile};
use slm_hal::{IntervalTimer, TrueFrames};

use crate::config::RigConfig;

pub fn run(rig: &RigConfig, rate: f64) -> Result<()> {
    let mut bus = rig.build_bus();
    let session = Session::open(&mut bus, IntervalTimer::new(), rig.lc_type, rig.session.clone())
        .context("opening session")?;
    let profile = *session.timing_profile();
    let frames = session
        .compute_true_frames(rate)
        .with_context(|| format!("{rate} fps on {} boards", rig.lc_type))?;

    println!("{}", summary(&profile, rate, frames).green().bold());
    println!(
        "  {} panels run {:.3}–{:.3} fps",
        profile.lc_type,
        profile.min_rate(),
        profile.max_rate()
    );
    Ok(())
}

pub(crate) fn summary(profile: &TimingProfile, rate: f64, frames: TrueFrames) -> String {
    format!(
        "✓ {rate} fps → {} true frames ({:.0} Hz refresh, up to {:.3} fps at this count)",
        frames.get(),
        f64::from(frames.get()) * rate,
        profile.max_rate_for(frames),
    )
}
