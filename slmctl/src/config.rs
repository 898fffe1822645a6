//! Rig description: session tunables, simulated boards and pattern parameters.
//!
//! ```toml
//! lc_type = "nematic"
//!
//! [session]
//! reload_policy = "reject"
//!
//! [[boards]]
//! serial = "slm7070"
//! panel = { width = 512, height = 512 }
//! temperature_c = 31.5
//!
//! [[stripes]]
//! pitch_um = 120.0
//! angle_rad = 0.785
//!
//! [sim]
//! wavelength_nm = 488.0
//! ```
//!
//! Without a file the rig is one 512 × 512 nematic board.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use slm_core::SessionConfig;
use slm_hal::mocks::{SimulatedBoard, SimulatedBus};
use slm_hal::{BoardInfo, LcType, PanelSize, DEFAULT_SEQUENCE_CAPACITY};
use slm_patterns::sim::SimParams;
use slm_patterns::stripes::StripeParams;

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RigConfig {
    /// LC type the session claims.
    pub lc_type: LcType,
    pub session: SessionConfig,
    pub boards: Vec<BoardConfig>,
    /// Frames for `--pattern stripes`; empty means a three-step phase set.
    pub stripes: Vec<StripeParams>,
    pub sim: SimParams,
}

impl Default for RigConfig {
    fn default() -> Self {
        Self {
            lc_type: LcType::Nematic,
            session: SessionConfig::default(),
            boards: vec![BoardConfig::new("slm0001")],
            stripes: Vec::new(),
            sim: SimParams::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BoardConfig {
    pub serial: String,
    #[serde(default = "default_panel")]
    pub panel: PanelSize,
    #[serde(default = "default_lc_type")]
    pub lc_type: LcType,
    #[serde(default = "default_pitch")]
    pub pixel_pitch_um: f64,
    #[serde(default = "default_capacity")]
    pub sequence_capacity: usize,
    /// Board carries a temperature sensor.
    #[serde(default = "default_sensor")]
    pub sensor: bool,
    /// Initial sensor reading; ignored without a sensor.
    #[serde(default)]
    pub temperature_c: Option<f64>,
}

impl BoardConfig {
    fn new(serial: &str) -> Self {
        Self {
            serial: serial.to_owned(),
            panel: default_panel(),
            lc_type: default_lc_type(),
            pixel_pitch_um: default_pitch(),
            sequence_capacity: default_capacity(),
            sensor: default_sensor(),
            temperature_c: None,
        }
    }

    pub(crate) fn info(&self) -> BoardInfo {
        BoardInfo {
            serial: self.serial.clone(),
            lc_type: self.lc_type,
            panel: self.panel,
            pixel_pitch_um: self.pixel_pitch_um,
            sequence_capacity: self.sequence_capacity,
            has_temperature_sensor: self.sensor,
        }
    }
}

fn default_panel() -> PanelSize {
    PanelSize::P512
}

fn default_lc_type() -> LcType {
    LcType::Nematic
}

fn default_pitch() -> f64 {
    15.0
}

fn default_capacity() -> usize {
    DEFAULT_SEQUENCE_CAPACITY
}

fn default_sensor() -> bool {
    true
}

impl RigConfig {
    /// Read `path`, or the default rig when `None`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading rig config {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("parsing rig config {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        Ok(config)
    }

    /// Simulated bus holding every configured board.
    pub fn build_bus(&self) -> SimulatedBus {
        let mut bus = SimulatedBus::new();
        for board in &self.boards {
            let handle = bus.attach(SimulatedBoard::new(board.info()));
            if board.sensor {
                if let Some(celsius) = board.temperature_c {
                    handle.set_temperature(Some(celsius));
                }
            }
            tracing::debug!(
                serial = %board.serial,
                lc_type = %board.lc_type,
                panel = %board.panel,
                "simulated board attached"
            );
        }
        bus
    }
}
