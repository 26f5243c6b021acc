use std::sync::Arc;

use codspeed_criterion_compat::{black_box, criterion_group, criterion_main, Criterion};
use statepad_device::{DeviceInfo, DeviceManager, SubscriptionKind};
use statepad_layout::{
    Capabilities, Capability, LayoutRegistry, StateFormat, ANDROID_AXIS_OFFSET,
    ANDROID_STATE_SIZE,
};

fn bench_ingest(c: &mut Criterion) {
    let registry = LayoutRegistry::with_builtin().expect("builtin layouts should build");
    let manager = DeviceManager::new(Arc::new(registry));
    let caps = Capabilities::new()
        .with(Capability::Gamepad)
        .with(Capability::DpadAxes);
    let info = DeviceInfo::new(1, "bench", StateFormat::ANDROID_GAME_CONTROLLER, caps);
    manager.connect(info);
    let sub = manager.subscribe(SubscriptionKind::Raw);

    let idle = vec![0u8; ANDROID_STATE_SIZE as usize];
    let mut moved = idle.clone();
    moved[12] = 0x01;
    let at = ANDROID_AXIS_OFFSET as usize;
    moved[at..at + 4].copy_from_slice(&0.75f32.to_le_bytes());

    c.bench_function("device_ingest_android_alternating", |b| {
        b.iter(|| {
            for buf in [&moved, &idle] {
                let changed = manager
                    .ingest(1, black_box(buf), StateFormat::ANDROID_GAME_CONTROLLER)
                    .expect("buffer should be accepted");
                black_box(changed);
            }
            for event in sub.try_iter() {
                black_box(event);
            }
        })
    });
}

criterion_group!(benches, bench_ingest);
criterion_main!(benches);
