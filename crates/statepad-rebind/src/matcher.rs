use std::time::{Duration, Instant};

use crossbeam_channel::RecvTimeoutError;
use statepad_device::{
    DeviceEvent, DeviceManager, Subscription, SubscriptionKind, SuppressionGuard,
};

use crate::config::RebindConfig;
use crate::error::Result;
use crate::session::{CancelReason, RebindResult, RebindSession, RebindState};

/// Snapshot of a rebind returned by polling.
#[derive(Debug, Clone, PartialEq)]
pub struct RebindStatus {
    pub state: RebindState,
    /// Composite part still waiting for a control.
    pub part: Option<String>,
    pub result: Option<RebindResult>,
    pub reason: Option<CancelReason>,
}

/// Starts rebinds against a device manager.
#[derive(Debug, Clone)]
pub struct RebindMatcher {
    manager: DeviceManager,
}

impl RebindMatcher {
    pub fn new(manager: &DeviceManager) -> Self {
        Self {
            manager: manager.clone(),
        }
    }

    pub fn begin(&self, config: RebindConfig) -> Result<RebindHandle> {
        begin_rebind(&self.manager, config)
    }
}

/// Subscribes to raw observations and starts listening. Action
/// notifications stay suppressed until the handle finishes when the
/// config asks for it.
pub fn begin_rebind(manager: &DeviceManager, config: RebindConfig) -> Result<RebindHandle> {
    begin_rebind_at(manager, config, Instant::now())
}

pub fn begin_rebind_at(
    manager: &DeviceManager,
    config: RebindConfig,
    now: Instant,
) -> Result<RebindHandle> {
    let suppress = config.suppress_action_notifications;
    let mut session = RebindSession::new(config)?;
    session.start(now)?;
    Ok(RebindHandle {
        session,
        subscription: Some(manager.subscribe(SubscriptionKind::Raw)),
        guard: suppress.then(|| manager.suppress()),
    })
}

/// An interactive rebind in progress. Owns its subscription and
/// suppression guard and releases both exactly once, on the first terminal
/// state or on drop.
#[derive(Debug)]
pub struct RebindHandle {
    session: RebindSession,
    subscription: Option<Subscription>,
    guard: Option<SuppressionGuard>,
}

impl RebindHandle {
    pub fn session(&self) -> &RebindSession {
        &self.session
    }

    pub fn state(&self) -> RebindState {
        self.session.state()
    }

    /// Whether the subscription and guard are still held.
    pub fn is_attached(&self) -> bool {
        self.subscription.is_some() || self.guard.is_some()
    }

    pub fn poll(&mut self) -> RebindStatus {
        self.poll_at(Instant::now())
    }

    /// Drains pending observations, applies the timeout and reports the
    /// state. Observations left in the queue after a terminal transition are
    /// dropped with the subscription.
    pub fn poll_at(&mut self, now: Instant) -> RebindStatus {
        if let Some(subscription) = &self.subscription {
            for event in subscription.try_iter() {
                if let DeviceEvent::Observation(obs) = event {
                    if self.session.observe(&obs, now).is_terminal() {
                        break;
                    }
                }
            }
        }
        self.session.tick(now);
        self.finish_if_done();
        self.status()
    }

    /// Blocks up to `wait` for the next event, then polls.
    pub fn wait(&mut self, wait: Duration) -> RebindStatus {
        let Some(subscription) = &self.subscription else {
            return self.status();
        };
        match subscription.recv_timeout(wait) {
            Ok(DeviceEvent::Observation(obs)) => {
                self.session.observe(&obs, Instant::now());
            }
            Ok(_) | Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                log::warn!("rebind event stream closed");
                self.session.cancel();
            }
        }
        self.poll()
    }

    pub fn cancel(&mut self) -> RebindStatus {
        self.session.cancel();
        self.finish_if_done();
        self.status()
    }

    pub fn status(&self) -> RebindStatus {
        RebindStatus {
            state: self.session.state(),
            part: self.session.current_part().map(str::to_string),
            result: self.session.result().cloned(),
            reason: self.session.cancel_reason().cloned(),
        }
    }

    fn finish_if_done(&mut self) {
        if self.session.state().is_terminal() {
            self.teardown();
        }
    }

    fn teardown(&mut self) {
        if let Some(mut subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
        if self.guard.take().is_some() {
            log::trace!("rebind released notification suppression");
        }
    }
}

impl Drop for RebindHandle {
    fn drop(&mut self) {
        self.teardown();
    }
}
