use std::time::{Duration, Instant};

use crossbeam_channel::{never, select, tick, Receiver};
use statepad_device::{DeviceEvent, DeviceManager, Observation, SubscriptionKind};
use statepad_rebind::{begin_rebind_at, RebindConfig, RebindStatus};

use crate::capture::Capture;
use crate::error::{Error, Result};

const PACING_TICK: Duration = Duration::from_millis(1);

#[derive(Debug, Default)]
pub struct ReplayOptions {
    /// Wait for each frame's timestamp instead of using a simulated clock.
    pub realtime: bool,
    pub rebind: Option<RebindConfig>,
    /// Stops the replay when a message arrives.
    pub stop: Option<Receiver<()>>,
}

#[derive(Debug, Default)]
pub struct ReplayReport {
    pub frames: usize,
    pub rejected: usize,
    pub observations: Vec<Observation>,
    pub rebind: Option<RebindStatus>,
    pub interrupted: bool,
}

/// Connects the captured device to `manager` and ingests every frame.
pub fn replay(
    manager: &DeviceManager,
    capture: &Capture,
    options: ReplayOptions,
) -> Result<ReplayReport> {
    let info = capture.device_info()?;
    let id = info.id;
    let frames = capture.frames()?;

    let status = manager.connect(info);
    if !status.is_usable() {
        return Err(Error::Unusable {
            id,
            reason: status.unusable_reason.unwrap_or_default(),
        });
    }

    let events = manager.subscribe(SubscriptionKind::Raw);
    let start = Instant::now();
    let mut rebind = options
        .rebind
        .map(|config| begin_rebind_at(manager, config, start))
        .transpose()?;

    let stop = options.stop.unwrap_or_else(never);
    let ticker = tick(PACING_TICK);
    let mut report = ReplayReport::default();

    'frames: for frame in &frames {
        let now = if options.realtime {
            while start.elapsed() < frame.at {
                select! {
                    recv(stop) -> _ => {
                        report.interrupted = true;
                        break 'frames;
                    }
                    recv(ticker) -> _ => {}
                }
            }
            Instant::now()
        } else {
            if stop.try_recv().is_ok() {
                report.interrupted = true;
                break;
            }
            start + frame.at
        };

        report.frames += 1;
        if let Err(err) = manager.ingest_at(id, &frame.bytes, frame.format, now) {
            log::warn!("frame at {:?} rejected: {err}", frame.at);
            report.rejected += 1;
        }

        for event in events.try_iter() {
            if let DeviceEvent::Observation(obs) = event {
                report.observations.push(obs);
            }
        }

        if let Some(handle) = rebind.as_mut() {
            let status = handle.poll_at(now);
            if status.state.is_terminal() {
                report.rebind = Some(status);
                rebind = None;
            }
        }
    }

    if let Some(mut handle) = rebind {
        let end = if options.realtime {
            Instant::now()
        } else {
            start + capture.duration()
        };
        report.rebind = Some(if report.interrupted {
            handle.cancel()
        } else {
            handle.poll_at(end)
        });
    }

    manager.disconnect(id)?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use statepad_layout::LayoutRegistry;
    use statepad_rebind::{CancelReason, RebindState};

    use super::*;

    fn manager() -> DeviceManager {
        DeviceManager::new(Arc::new(LayoutRegistry::with_builtin().unwrap()))
    }

    fn hid_capture(extra: &str) -> Capture {
        // wired 360 layout: 14 bytes, A is bit 4 of byte 3
        let yaml = format!(
            "version: 1\n\
             device: {{name: pad, format: HID, vendor_id: 0x045e, product_id: 0x028e}}\n\
             frames:\n  \
               - {{at_ms: 0, data: '0000000000000000000000000000'}}\n  \
               - {{at_ms: 10, data: '0000001000000000000000000000'}}\n\
             {extra}"
        );
        Capture::parse(&yaml).unwrap()
    }

    #[test]
    fn replay_reports_observations() {
        let manager = manager();
        let report = replay(&manager, &hid_capture(""), ReplayOptions::default()).unwrap();
        assert_eq!(report.frames, 2);
        assert_eq!(report.rejected, 0);
        assert!(report.observations.iter().any(|o| &*o.path == "buttonSouth"));
        assert!(manager.devices().is_empty());
    }

    #[test]
    fn replay_runs_rebind() {
        let manager = manager();
        let options = ReplayOptions {
            rebind: Some(RebindConfig::new()),
            ..ReplayOptions::default()
        };
        let report = replay(&manager, &hid_capture(""), options).unwrap();
        let status = report.rebind.unwrap();
        assert_eq!(status.state, RebindState::Matched);
        assert_eq!(status.result.unwrap().path(), Some("buttonSouth"));
    }

    #[test]
    fn rebind_times_out_after_capture_end() {
        let manager = manager();
        let capture = hid_capture("duration_ms: 6000\n");
        let options = ReplayOptions {
            rebind: Some(
                RebindConfig::new()
                    .exclude("buttonSouth")
                    .timeout(Duration::from_secs(5)),
            ),
            ..ReplayOptions::default()
        };
        let report = replay(&manager, &capture, options).unwrap();
        let status = report.rebind.unwrap();
        assert_eq!(status.state, RebindState::TimedOut);
        assert_eq!(status.reason, Some(CancelReason::Timeout));
    }
}
