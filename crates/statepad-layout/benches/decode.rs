use codspeed_criterion_compat::{black_box, criterion_group, criterion_main, Criterion};
use statepad_layout::{decode, LayoutRegistry, VariantTag};

fn bench_decode_android_state(c: &mut Criterion) {
    let registry = LayoutRegistry::with_builtin().expect("builtin layouts should build");
    let layout = registry
        .get("AndroidGameController")
        .expect("android layout should be registered");
    let variant = VariantTag::new("Gamepad;DpadAxes");
    let controls: Vec<_> = layout.active_controls(&variant).cloned().collect();

    let mut state = layout.default_state();
    state[12] = 0x01;
    state[28..32].copy_from_slice(&0.5f32.to_le_bytes());

    c.bench_function("layout_decode_android_all_controls", |b| {
        b.iter(|| {
            for control in &controls {
                let value = decode(black_box(&state), control).expect("control should decode");
                black_box(value);
            }
        })
    });
}

fn bench_build_builtin(c: &mut Criterion) {
    c.bench_function("layout_build_builtin_registry", |b| {
        b.iter(|| {
            let registry = LayoutRegistry::with_builtin().expect("builtin layouts should build");
            black_box(registry);
        })
    });
}

criterion_group!(benches, bench_decode_android_state, bench_build_builtin);
criterion_main!(benches);
