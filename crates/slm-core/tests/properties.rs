//! Property-based tests for sequencing, LUT mapping and the true-frame formula.

use proptest::prelude::*;
use slm_core::{Frame, Lut, Session, SessionConfig, TimingProfile};
use slm_hal::mocks::{SimulatedBoard, SimulatedBus};
use slm_hal::{BoardId, LcType, ManualTicker, PanelSize, TrueFrames};

const PANEL: PanelSize = PanelSize::new(1, 1);

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// The position after `ticks` ticks is `ticks mod len` and never reaches `len`.
    #[test]
    fn position_wraps_modulo_length(len in 1u16..=8, ticks in 0usize..40) {
        let mut bus = SimulatedBus::new();
        bus.attach(SimulatedBoard::small("slm0001", LcType::Nematic, 1, 1, 8));
        let ticker = ManualTicker::new();
        let handle = ticker.handle();
        let session =
            Session::open(&mut bus, ticker, LcType::Nematic, SessionConfig::default()).unwrap();
        let board = BoardId::new(0);
        let frames: Vec<Frame> = (0..len).map(|i| Frame::filled(PANEL, i)).collect();

        session.load_sequence(board, &frames).unwrap();
        session.set_sequencing_rate(100.0).unwrap();
        session.start_sequence().unwrap();
        for _ in 0..ticks {
            prop_assert!(handle.fire());
            prop_assert!(session.current_sequence_image(board).unwrap() < usize::from(len));
        }
        prop_assert_eq!(
            session.current_sequence_image(board).unwrap(),
            ticks % usize::from(len)
        );
    }
}

proptest! {
    /// A table of 2^k entries maps every input through its top k bits.
    #[test]
    fn lut_indexes_by_top_bits(k in 1u32..=16, seed in any::<u16>(), input in any::<u16>()) {
        let len = 1usize << k;
        let table: Vec<u16> = (0..len)
            .map(|i| u16::try_from(i).unwrap_or(u16::MAX).wrapping_mul(31).wrapping_add(seed))
            .collect();
        let lut = Lut::from_table(table.clone()).unwrap();
        let index = usize::from(input) >> (16 - k);
        prop_assert_eq!(lut.map(input), table[index]);
    }

    /// The identity table leaves every sample alone.
    #[test]
    fn identity_lut_is_passthrough(input in any::<u16>()) {
        prop_assert_eq!(Lut::identity().map(input), input);
    }

    /// Computed true frames satisfy the hold floor and the sub-frame ceiling,
    /// and one fewer would break the hold floor (unless already at the bit-plane depth).
    #[test]
    fn true_frames_are_minimal_and_fit(
        nematic in any::<bool>(),
        rate in 0.5f64..=2000.0,
    ) {
        let profile = if nematic { TimingProfile::NEMATIC } else { TimingProfile::FERROELECTRIC };
        match profile.true_frames_for(rate) {
            Ok(frames) => {
                let n = f64::from(frames.get());
                prop_assert!(n * rate >= profile.min_refresh_hz);
                prop_assert!(n * rate <= profile.max_subframe_rate_hz * (1.0 + 1e-9));
                prop_assert!(frames.get() >= u16::try_from(profile.bit_plane_depth).unwrap());
                if u32::from(frames.get()) > profile.bit_plane_depth {
                    prop_assert!((n - 1.0) * rate < profile.min_refresh_hz);
                }
            }
            Err(_) => {
                prop_assert!(rate < profile.min_rate() || rate > profile.max_rate());
            }
        }
    }

    /// An explicit count fits exactly up to its own ceiling.
    #[test]
    fn explicit_frames_fit_below_ceiling(count in 1u32..=255, fraction in 0.01f64..=1.0) {
        let profile = TimingProfile::NEMATIC;
        let frames = TrueFrames::try_new(count).unwrap();
        let ceiling = profile.max_rate_for(frames);
        prop_assert!(profile.fits(frames, ceiling * fraction));
        prop_assert!(!profile.fits(frames, ceiling * 1.001));
    }
}
