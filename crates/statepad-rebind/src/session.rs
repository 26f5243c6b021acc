use std::sync::Arc;
use std::time::Instant;

use ahash::{AHashMap, AHashSet};
use smallvec::SmallVec;
use statepad_device::{DeviceId, Observation};

use crate::config::RebindConfig;
use crate::error::{RebindError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RebindState {
    Idle,
    Listening,
    Matched,
    TimedOut,
    Cancelled,
}

impl RebindState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RebindState::Matched | RebindState::TimedOut | RebindState::Cancelled
        )
    }
}

/// Why a rebind ended without a match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelReason {
    Timeout,
    /// The caller cancelled.
    Requested,
    /// A configured cancel control was actuated.
    CancelControl(Arc<str>),
}

/// A resolved control for one part.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    /// Composite part name, `None` for a single binding.
    pub part: Option<String>,
    pub device: DeviceId,
    pub path: Arc<str>,
    pub magnitude: f32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RebindWarning {
    /// The control bound to `part` was already bound to `previous_part`,
    /// whose binding is cleared.
    AmbiguousComposite {
        path: Arc<str>,
        part: String,
        previous_part: String,
    },
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RebindResult {
    pub bindings: Vec<Binding>,
    /// Parts of `existing_bindings` that lost their control to a new binding.
    pub cleared_parts: Vec<String>,
    pub warnings: Vec<RebindWarning>,
}

impl RebindResult {
    /// Path of the only binding of a single rebind.
    pub fn path(&self) -> Option<&str> {
        match self.bindings.as_slice() {
            [binding] => Some(&binding.path),
            _ => None,
        }
    }
}

/// Why an observation did not count towards a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rejection {
    NotListening,
    Device,
    Excluded,
    Noisy,
    Composite,
    Type,
}

/// Interactive rebind state machine: `Idle -> Listening -> Matched | TimedOut | Cancelled`.
///
/// Time is passed in explicitly, so the session runs the same on live input
/// and on simulated clocks.
#[derive(Debug)]
pub struct RebindSession {
    config: RebindConfig,
    state: RebindState,
    part: usize,
    started_at: Option<Instant>,
    excluded: AHashSet<Box<str>>,
    cancel: SmallVec<[Box<str>; 2]>,
    scores: AHashMap<(DeviceId, Arc<str>), f32>,
    result: RebindResult,
    reason: Option<CancelReason>,
}

fn key(path: &str) -> Box<str> {
    path.to_ascii_lowercase().into_boxed_str()
}

impl RebindSession {
    pub fn new(config: RebindConfig) -> Result<Self> {
        if let Some(index) = config.composite_parts.iter().position(|p| p.trim().is_empty()) {
            return Err(RebindError::EmptyComposite(index));
        }
        let excluded = config.excluded_paths.iter().map(|p| key(p)).collect();
        let cancel = config.cancel_paths.iter().map(|p| key(p)).collect();
        Ok(Self {
            config,
            state: RebindState::Idle,
            part: 0,
            started_at: None,
            excluded,
            cancel,
            scores: AHashMap::new(),
            result: RebindResult::default(),
            reason: None,
        })
    }

    pub fn config(&self) -> &RebindConfig {
        &self.config
    }

    pub fn state(&self) -> RebindState {
        self.state
    }

    pub fn cancel_reason(&self) -> Option<&CancelReason> {
        self.reason.as_ref()
    }

    /// Name of the composite part currently being listened for.
    pub fn current_part(&self) -> Option<&str> {
        if self.state.is_terminal() {
            return None;
        }
        self.config.composite_parts.get(self.part).map(String::as_str)
    }

    /// Bindings made so far.
    pub fn bindings(&self) -> &[Binding] {
        &self.result.bindings
    }

    pub fn warnings(&self) -> &[RebindWarning] {
        &self.result.warnings
    }

    /// The outcome, once matched.
    pub fn result(&self) -> Option<&RebindResult> {
        (self.state == RebindState::Matched).then_some(&self.result)
    }

    /// Highest magnitude seen for a path while listening for the current part.
    pub fn score(&self, device: DeviceId, path: &str) -> Option<f32> {
        self.scores
            .iter()
            .find(|((id, p), _)| *id == device && p.eq_ignore_ascii_case(path))
            .map(|(_, score)| *score)
    }

    pub fn start(&mut self, now: Instant) -> Result<()> {
        if self.state != RebindState::Idle {
            return Err(RebindError::AlreadyStarted);
        }
        self.state = RebindState::Listening;
        self.started_at = Some(now);
        log::debug!(
            "rebind started: {} part(s), timeout {:?}",
            self.config.part_count(),
            self.config.timeout
        );
        Ok(())
    }

    /// Applies the timeout. Returns the resulting state.
    pub fn tick(&mut self, now: Instant) -> RebindState {
        if self.state != RebindState::Listening || self.config.timeout.is_zero() {
            return self.state;
        }
        let Some(started) = self.started_at else {
            return self.state;
        };
        if now.saturating_duration_since(started) >= self.config.timeout {
            log::debug!("rebind timed out after {:?}", self.config.timeout);
            self.terminate(RebindState::TimedOut, CancelReason::Timeout);
        }
        self.state
    }

    /// Cancels a session that has not finished yet.
    pub fn cancel(&mut self) -> RebindState {
        if !self.state.is_terminal() {
            self.terminate(RebindState::Cancelled, CancelReason::Requested);
        }
        self.state
    }

    /// Feeds one observation. Returns the resulting state.
    pub fn observe(&mut self, obs: &Observation, now: Instant) -> RebindState {
        if self.tick(now) != RebindState::Listening {
            return self.state;
        }

        if !self.watches(obs.device) {
            log::trace!("rebind ignores {} ({:?})", obs.path, Rejection::Device);
            return self.state;
        }

        let magnitude = obs.magnitude();
        if magnitude >= self.config.actuation_threshold
            && self.cancel.iter().any(|p| p.eq_ignore_ascii_case(&obs.path))
        {
            log::debug!("rebind cancelled by {}", obs.path);
            self.terminate(
                RebindState::Cancelled,
                CancelReason::CancelControl(Arc::clone(&obs.path)),
            );
            return self.state;
        }

        if let Err(rejection) = self.admit(obs) {
            log::trace!("rebind ignores {} ({rejection:?})", obs.path);
            return self.state;
        }

        let score = self
            .scores
            .entry((obs.device, Arc::clone(&obs.path)))
            .or_insert(0.0);
        *score = score.max(magnitude);

        if magnitude >= self.config.actuation_threshold {
            self.bind(obs, magnitude, now);
        }
        self.state
    }

    fn admit(&self, obs: &Observation) -> std::result::Result<(), Rejection> {
        if self.state != RebindState::Listening {
            return Err(Rejection::NotListening);
        }
        if self.excluded.contains(&key(&obs.path)) {
            return Err(Rejection::Excluded);
        }
        if obs.noisy {
            let loud_enough = self
                .config
                .noisy_threshold
                .is_some_and(|threshold| obs.magnitude() >= threshold);
            if !loud_enough {
                return Err(Rejection::Noisy);
            }
        }
        match self.config.expected {
            Some(expected) => {
                if !obs.leaf && !expected.wants_composite() {
                    return Err(Rejection::Composite);
                }
                if !expected.accepts(obs.kind, &obs.value) {
                    return Err(Rejection::Type);
                }
            }
            None if !obs.leaf => return Err(Rejection::Composite),
            None => {}
        }
        Ok(())
    }

    fn watches(&self, device: DeviceId) -> bool {
        self.config
            .devices
            .as_ref()
            .map_or(true, |devices| devices.contains(&device))
    }

    fn bind(&mut self, obs: &Observation, magnitude: f32, now: Instant) {
        let part = self.config.composite_parts.get(self.part).cloned();
        log::debug!(
            "rebind matched {} on device {}{}",
            obs.path,
            obs.device,
            part.as_deref().map(|p| format!(" for part {p}")).unwrap_or_default()
        );

        if let Some(part) = &part {
            self.check_existing(part, &obs.path);
        }

        self.excluded.insert(key(&obs.path));
        self.result.bindings.push(Binding {
            part,
            device: obs.device,
            path: Arc::clone(&obs.path),
            magnitude,
        });
        self.scores.clear();
        self.part += 1;

        if self.part >= self.config.part_count() {
            self.state = RebindState::Matched;
        } else {
            // next part listens with a fresh clock
            self.started_at = Some(now);
        }
    }

    fn check_existing(&mut self, part: &str, path: &str) {
        let ambiguous: Vec<String> = self
            .config
            .existing_bindings
            .iter()
            .filter(|existing| existing.part != part && existing.path.eq_ignore_ascii_case(path))
            // parts rebound in this session no longer hold their old control
            .filter(|existing| !self.is_bound(&existing.part))
            .map(|existing| existing.part.clone())
            .collect();

        for previous_part in ambiguous {
            log::warn!(
                "control {path} bound to part {part} was already bound to part {previous_part}"
            );
            if !self.result.cleared_parts.contains(&previous_part) {
                self.result.cleared_parts.push(previous_part.clone());
            }
            self.result.warnings.push(RebindWarning::AmbiguousComposite {
                path: Arc::from(path),
                part: part.to_string(),
                previous_part,
            });
        }
    }

    fn is_bound(&self, part: &str) -> bool {
        self.result
            .bindings
            .iter()
            .any(|b| b.part.as_deref() == Some(part))
    }

    fn terminate(&mut self, state: RebindState, reason: CancelReason) {
        self.state = state;
        self.reason = Some(reason);
        self.scores.clear();
    }
}
