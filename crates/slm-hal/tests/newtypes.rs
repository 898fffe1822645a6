//! Range enforcement tests for board domain newtypes.
//! These types keep invalid handles, rates and counts out of the engine.

// ── TrueFrames ───────────────────────────────────────────────────────────────

#[test]
fn true_frames_rejects_zero() {
    use slm_hal::TrueFrames;
    let err = TrueFrames::try_new(0).unwrap_err();
    assert_eq!(err.min, 1);
    assert_eq!(err.max, 255);
}

#[test]
fn true_frames_rejects_above_counter_width() {
    use slm_hal::TrueFrames;
    assert!(TrueFrames::try_new(256).is_err());
    assert!(TrueFrames::try_new(u32::MAX).is_err());
}

#[test]
fn true_frames_accepts_full_counter_range() {
    use slm_hal::TrueFrames;
    assert_eq!(TrueFrames::try_new(1).unwrap().get(), 1);
    assert_eq!(TrueFrames::try_new(255).unwrap().get(), 255);
}

// ── FrameRate ────────────────────────────────────────────────────────────────

#[test]
fn frame_rate_rejects_non_positive() {
    use slm_hal::FrameRate;
    assert!(FrameRate::try_new(0.0).is_err());
    assert!(FrameRate::try_new(-60.0).is_err());
}

#[test]
fn frame_rate_rejects_non_finite() {
    use slm_hal::FrameRate;
    assert!(FrameRate::try_new(f64::NAN).is_err());
    assert!(FrameRate::try_new(f64::INFINITY).is_err());
}

#[test]
fn frame_rate_rejects_below_minimum() {
    use slm_hal::FrameRate;
    // One frame every 10 000 s is below the 1000 s floor.
    assert!(FrameRate::try_new(0.0001).is_err());
    assert!(FrameRate::try_new(FrameRate::MIN_HZ).is_ok());
}

#[test]
fn frame_rate_period_is_reciprocal() {
    use slm_hal::FrameRate;
    let rate = FrameRate::try_new(250.0).unwrap();
    assert_eq!(rate.period(), std::time::Duration::from_millis(4));
}

// ── BoardId ──────────────────────────────────────────────────────────────────

#[test]
fn board_id_displays_with_prefix() {
    use slm_hal::BoardId;
    assert_eq!(BoardId::new(3).to_string(), "board 3");
    assert_eq!(BoardId::from(3).index(), 3);
}

// ── Temperature ──────────────────────────────────────────────────────────────

#[test]
fn temperature_freezing_point() {
    use slm_hal::{Temperature, TemperatureUnit};
    let t = Temperature::from_celsius(0.0);
    assert!((t.in_unit(TemperatureUnit::Fahrenheit) - 32.0).abs() < 1e-12);
    assert!((t.in_unit(TemperatureUnit::Celsius)).abs() < 1e-12);
}

#[test]
fn temperature_body_heat() {
    use slm_hal::Temperature;
    // 37 °C is 98.6 °F
    assert!((Temperature::from_celsius(37.0).fahrenheit() - 98.6).abs() < 1e-9);
}

// ── Config parsing ───────────────────────────────────────────────────────────

#[test]
fn lc_type_parses_lower_case_names() {
    use slm_hal::LcType;
    #[derive(serde::Deserialize)]
    struct Wrapper {
        lc: LcType,
    }
    let w: Wrapper = serde_json::from_str(r#"{"lc":"nematic"}"#).unwrap();
    assert_eq!(w.lc, LcType::Nematic);
}
