//! Property tests: every generator stays inside the levels it was given.

use proptest::prelude::*;
use slm_hal::PanelSize;
use slm_patterns::grating::{self, Axis};
use slm_patterns::ramp::{self, Direction};
use slm_patterns::sim::{self, SimParams};
use slm_patterns::stripes::{self, StripeParams};

const PANEL: PanelSize = PanelSize::new(24, 16);
const PIXEL_PITCH_UM: f64 = 15.0;

fn direction() -> impl Strategy<Value = Direction> {
    prop_oneof![Just(Direction::Horizontal), Just(Direction::Vertical)]
}

fn axis() -> impl Strategy<Value = Axis> {
    prop_oneof![Just(Axis::X), Just(Axis::Y), Just(Axis::Diagonal)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Ramp samples never leave the closed interval between the two levels,
    /// whichever way round they are given.
    #[test]
    fn ramp_stays_between_levels(
        direction in direction(),
        periods in 0u32..=12,
        low in any::<u16>(),
        high in any::<u16>(),
    ) {
        let frame = ramp::generate(PANEL, direction, periods, low, high);
        let (lo, hi) = (low.min(high), low.max(high));
        prop_assert!(frame.samples().iter().all(|&s| (lo..=hi).contains(&s)));
    }

    /// A square grating only ever shows its two levels.
    #[test]
    fn grating_is_two_level(
        axis in axis(),
        period in 0u32..=40,
        low in any::<u16>(),
        high in any::<u16>(),
    ) {
        let frame = grating::generate(PANEL, axis, period, low, high);
        prop_assert!(frame.samples().iter().all(|&s| s == low || s == high));
    }

    /// Stripe samples stay within `waves` half-ranges of mid-scale.
    #[test]
    fn stripes_respect_modulation_depth(
        pitch_um in 30.0f64..=2000.0,
        angle_rad in -6.3f64..=6.3,
        phase_rad in -6.3f64..=6.3,
        waves in 0.0f64..=1.0,
    ) {
        let params = StripeParams { pitch_um, angle_rad, phase_rad, waves };
        let frame = stripes::generate(PANEL, PIXEL_PITCH_UM, &params).unwrap();
        let reach = (waves * 32_768.0).ceil() + 1.0;
        prop_assert!(frame
            .samples()
            .iter()
            .all(|&s| (f64::from(s) - 32_768.0).abs() <= reach));
    }

    /// A SIM set holds one frame per angle and phase.
    #[test]
    fn sim_set_size_is_angles_times_phases(
        angles in prop::collection::vec(0.0f64..180.0, 1..4),
        phases in prop::collection::vec(0.0f64..360.0, 1..6),
        phase_then_angle in any::<bool>(),
    ) {
        let params = SimParams {
            angles_deg: angles.clone(),
            phases_deg: phases.clone(),
            phase_then_angle,
            ..SimParams::default()
        };
        let frames = sim::generate(PANEL, PIXEL_PITCH_UM, &params).unwrap();
        prop_assert_eq!(frames.len(), angles.len() * phases.len());
    }
}
