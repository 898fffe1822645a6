use anyhow::{Context, Result};
use colored::Colorize;
use slm_core::{Session, TelemetrySnapshot};
use slm_hal::IntervalTimer;

use crate::config::RigConfig;

pub fn run(rig: &RigConfig, json: bool) -> Result<()> {
    let snapshots = collect(rig)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&snapshots)?);
        return Ok(());
    }

    println!(
        "{}",
        format!("🔍 {} {} board(s)", snapshots.len(), rig.lc_type).cyan().bold()
    );
    for snapshot in &snapshots {
        println!("  {}", describe(snapshot));
    }
    Ok(())
}

/// Open a session on the rig and read every board's telemetry.
pub(crate) fn collect(rig: &RigConfig) -> Result<Vec<TelemetrySnapshot>> {
    let mut bus = rig.build_bus();
    let session = Session::open(&mut bus, IntervalTimer::new(), rig.lc_type, rig.session.clone())
        .context("opening session")?;
    session
        .boards()
        .map(|board| {
            session
                .telemetry(board)
                .with_context(|| format!("reading telemetry of {board}"))
        })
        .collect()
}

pub(crate) fn describe(snapshot: &TelemetrySnapshot) -> String {
    let power = if snapshot.powered {
        "on".green()
    } else {
        "off".yellow()
    };
    let temperature = snapshot
        .temperature_c
        .map_or_else(|| "no sensor".to_owned(), |c| format!("{c:.1} °C"));
    format!(
        "{}: {} {} {} µm, power {}, {}, {}",
        snapshot.board,
        snapshot.info.serial.bold(),
        snapshot.info.panel,
        snapshot.info.pixel_pitch_um,
        power,
        temperature,
        snapshot.state,
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn collects_one_snapshot_per_claimed_board() {
        let rig = RigConfig::parse(
            r#"
            [[boards]]
            serial = "slm0001"
            panel = { width = 4, height = 4 }
            temperature_c = 27.0
            [[boards]]
            serial = "slm0002"
            panel = { width = 4, height = 4 }
            sensor = false
            "#,
        )
        .unwrap();
        let snapshots = collect(&rig).unwrap();
        assert_eq!(snapshots.len(), 2);
        assert_eq!(snapshots[0].temperature_c, Some(27.0));
        assert_eq!(snapshots[1].temperature_c, None);
        assert!(!snapshots[0].powered);
    }

    #[test]
    fn description_names_serial_and_sensor() {
        colored::control::set_override(false);
        let rig = RigConfig::parse(
            "[[boards]]\nserial = \"slm0042\"\npanel = { width = 2, height = 2 }\nsensor = false\n",
        )
        .unwrap();
        let line = describe(&collect(&rig).unwrap()[0]);
        assert!(line.contains("slm0042"), "{line}");
        assert!(line.contains("2x2"), "{line}");
        assert!(line.contains("no sensor"), "{line}");
        assert!(line.contains("power off"), "{line}");
    }

    #[test]
    fn no_matching_boards_is_an_error() {
        let rig = RigConfig::parse(
            "lc_type = \"ferroelectric\"\n[[boards]]\nserial = \"slm0001\"\n",
        )
        .unwrap();
        assert!(collect(&rig).is_err());
    }
}
