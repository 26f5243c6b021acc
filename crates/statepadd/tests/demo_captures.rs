use std::path::PathBuf;
use std::sync::Arc;

use statepad_device::DeviceManager;
use statepad_layout::LayoutRegistry;
use statepad_rebind::RebindState;
use statepadd::capture::Capture;
use statepadd::replay::{replay, ReplayOptions};

fn demo(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../demos")
        .join(name)
}

#[test]
fn wired_xbox_rebind_demo() {
    let capture = Capture::load(&demo("xbox-wired-rebind.yaml")).unwrap();
    let manager = DeviceManager::new(Arc::new(LayoutRegistry::with_builtin().unwrap()));
    let options = ReplayOptions {
        rebind: capture.rebind_config().unwrap(),
        ..ReplayOptions::default()
    };

    let report = replay(&manager, &capture, options).unwrap();
    assert_eq!(report.frames, 4);
    assert_eq!(report.rejected, 0);

    let status = report.rebind.unwrap();
    assert_eq!(status.state, RebindState::Matched);
    assert_eq!(status.result.unwrap().path(), Some("buttonSouth"));
}
