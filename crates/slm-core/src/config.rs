//! Session configuration.
//!
//! Everything here has a default, so an empty `[session]` table is valid:
//!
//! ```toml
//! [session]
//! reload_policy = "stop-first"   # or "reject"
//! power_policy = "stop-first"
//! calibration_enabled = true
//!
//! [session.timing]               # optional, replaces the factory profile
//! lc_type = "nematic"
//! max_subframe_rate_hz = 1000.0
//! min_refresh_hz = 500.0
//! bit_plane_depth = 1
//! ```

use serde::{Deserialize, Serialize};
use slm_hal::LcType;

use crate::timing::TimingProfile;

/// What to do when an operation needs a board that is sequencing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunningPolicy {
    /// Detach the board from the sequencer, then proceed.
    #[default]
    StopFirst,
    /// Fail with [`SlmError::SequenceRunning`](crate::SlmError::SequenceRunning).
    Reject,
}

/// Tunables for one [`Session`](crate::Session).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// `load_sequence` on a running board.
    pub reload_policy: RunningPolicy,
    /// `set_power` on a running board.
    pub power_policy: RunningPolicy,
    /// Initial calibration toggle for every board.
    pub calibration_enabled: bool,
    /// Timing override; `None` uses the factory profile for the LC type.
    pub timing: Option<TimingProfile>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            reload_policy: RunningPolicy::StopFirst,
            power_policy: RunningPolicy::StopFirst,
            calibration_enabled: true,
            timing: None,
        }
    }
}

impl SessionConfig {
    /// Timing profile for a session opened with `lc_type`.
    #[must_use]
    pub fn timing_for(&self, lc_type: LcType) -> TimingProfile {
        match self.timing {
            Some(profile) if profile.lc_type == lc_type => profile,
            _ => TimingProfile::for_lc(lc_type),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config: SessionConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, SessionConfig::default());
        assert_eq!(config.reload_policy, RunningPolicy::StopFirst);
    }

    #[test]
    fn policies_use_kebab_case() {
        let config: SessionConfig =
            serde_json::from_str(r#"{"reload_policy":"reject","power_policy":"stop-first"}"#)
                .unwrap();
        assert_eq!(config.reload_policy, RunningPolicy::Reject);
        assert_eq!(config.power_policy, RunningPolicy::StopFirst);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(serde_json::from_str::<SessionConfig>(r#"{"reload":"reject"}"#).is_err());
    }

    #[test]
    fn timing_override_applies_only_to_matching_lc_type() {
        let custom = TimingProfile {
            max_subframe_rate_hz: 2000.0,
            ..TimingProfile::NEMATIC
        };
        let config = SessionConfig {
            timing: Some(custom),
            ..SessionConfig::default()
        };
        assert_eq!(config.timing_for(LcType::Nematic), custom);
        assert_eq!(
            config.timing_for(LcType::Ferroelectric),
            TimingProfile::FERROELECTRIC
        );
    }
}
