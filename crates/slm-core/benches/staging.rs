//! Cost of the correction pipeline and of staging one full 512 × 512 frame.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use slm_core::{CalibrationStore, Frame, Lut, Session, SessionConfig};
use slm_hal::mocks::{SimulatedBoard, SimulatedBus};
use slm_hal::{BoardId, CalType, LcType, ManualTicker, PanelSize};

fn ramp() -> Frame {
    Frame::from_fn(PanelSize::P512, |x, y| {
        u16::try_from((x * 128 + y) & 0xFFFF).unwrap_or(u16::MAX)
    })
}

fn pipeline(c: &mut Criterion) {
    let frame = ramp();
    let lut = Lut::from_table((0..16_384u16).map(|i| i.wrapping_mul(4)).collect()).unwrap();

    let passthrough = CalibrationStore::new(true).pipeline(&Lut::identity());
    c.bench_function("render passthrough 512x512", |b| {
        b.iter(|| passthrough.render(black_box(frame.samples())));
    });

    let mut store = CalibrationStore::new(true);
    store.replace(CalType::Wfc, &Frame::filled(PanelSize::P512, 1234));
    store.replace(CalType::Nuc, &Frame::filled(PanelSize::P512, 60_000));
    let full = store.pipeline(&lut);
    c.bench_function("render wfc+nuc+lut 512x512", |b| {
        b.iter(|| full.render(black_box(frame.samples())));
    });
}

fn write_image(c: &mut Criterion) {
    let mut bus = SimulatedBus::new();
    bus.attach(SimulatedBoard::p512("slm0001", LcType::Nematic));
    let Ok(session) = Session::open(
        &mut bus,
        ManualTicker::new(),
        LcType::Nematic,
        SessionConfig::default(),
    ) else {
        return;
    };
    let frame = ramp();
    c.bench_function("write_image 512x512", |b| {
        b.iter(|| session.write_image(BoardId::new(0), black_box(&frame)));
    });
}

criterion_group!(benches, pipeline, write_image);
criterion_main!(benches);
