use std::time::{Duration, Instant};

use ahash::AHashMap;

use crate::types::DeviceId;

pub const DEFAULT_RECENT_THRESHOLD: Duration = Duration::from_secs(3);
pub const DEFAULT_OUTPUT_FREQUENCY: f32 = 10.0;

/// Tracks which devices were used recently, for routing feedback such as
/// rumble or light bar colour.
#[derive(Debug, Clone)]
pub struct DeviceRecency {
    threshold: Duration,
    last_used: AHashMap<DeviceId, Instant>,
    most_recent: Option<DeviceId>,
}

impl Default for DeviceRecency {
    fn default() -> Self {
        Self::new(DEFAULT_RECENT_THRESHOLD)
    }
}

impl DeviceRecency {
    pub fn new(threshold: Duration) -> Self {
        Self {
            threshold,
            last_used: AHashMap::new(),
            most_recent: None,
        }
    }

    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    pub fn most_recent(&self) -> Option<DeviceId> {
        self.most_recent
    }

    /// Records a use of `id`. Returns `true` when the device is new or comes
    /// back after the threshold, meaning its feedback must be re-applied.
    pub fn record(&mut self, id: DeviceId, now: Instant) -> bool {
        let returning = match self.last_used.insert(id, now) {
            Some(last) => now.saturating_duration_since(last) >= self.threshold,
            None => true,
        };
        self.most_recent = Some(id);
        returning
    }

    pub fn is_recently_used(&self, id: DeviceId, now: Instant) -> bool {
        if self.most_recent == Some(id) {
            return true;
        }
        self.last_used
            .get(&id)
            .is_some_and(|last| now.saturating_duration_since(*last) < self.threshold)
    }

    /// Forgets devices idle for longer than the threshold. The most recent
    /// device is never pruned. Returns `true` if anything was removed.
    pub fn prune_abandoned(&mut self, now: Instant) -> bool {
        let before = self.last_used.len();
        let threshold = self.threshold;
        let most_recent = self.most_recent;
        self.last_used.retain(|id, last| {
            Some(*id) == most_recent || now.saturating_duration_since(*last) < threshold
        });
        self.last_used.len() != before
    }

    pub fn forget(&mut self, id: DeviceId) {
        self.last_used.remove(&id);
        if self.most_recent == Some(id) {
            self.most_recent = None;
        }
    }

    /// Devices currently considered in use.
    pub fn recent(&self, now: Instant) -> Vec<DeviceId> {
        let mut ids: Vec<DeviceId> = self
            .last_used
            .keys()
            .copied()
            .filter(|id| self.is_recently_used(*id, now))
            .collect();
        ids.sort_unstable();
        ids
    }
}

/// Next output tick at or after `elapsed`, aligned to `frequency_hz`.
/// A non-positive or non-finite frequency disables throttling, as does one
/// whose ticks no longer fit in a `Duration`.
pub fn next_update_time(elapsed: Duration, frequency_hz: f32) -> Duration {
    let Some(period) = period(frequency_hz) else {
        return elapsed;
    };
    let period = period.as_secs_f64();
    let ticks = (elapsed.as_secs_f64() / period).ceil();
    Duration::try_from_secs_f64(ticks * period).unwrap_or(elapsed)
}

fn period(frequency_hz: f32) -> Option<Duration> {
    if !frequency_hz.is_finite() || frequency_hz <= 0.0 {
        return None;
    }
    Duration::try_from_secs_f64(1.0 / f64::from(frequency_hz)).ok()
}

/// Rate-limits a feedback output. A value is emitted when the throttle's
/// next tick has passed and the value changed or the output was invalidated.
#[derive(Debug, Clone)]
pub struct OutputThrottle<T> {
    origin: Instant,
    frequency_hz: f32,
    next_update: Duration,
    invalidated: bool,
    last: Option<T>,
}

impl<T: Clone + PartialEq> OutputThrottle<T> {
    pub fn new(origin: Instant, frequency_hz: f32) -> Self {
        Self {
            origin,
            frequency_hz,
            next_update: Duration::ZERO,
            invalidated: true,
            last: None,
        }
    }

    /// Forces the next due update to be emitted even if unchanged.
    pub fn invalidate(&mut self) {
        self.invalidated = true;
    }

    pub fn last(&self) -> Option<&T> {
        self.last.as_ref()
    }

    /// Returns `true` when `value` should be sent to the device now.
    pub fn update(&mut self, value: &T, now: Instant) -> bool {
        let elapsed = now.saturating_duration_since(self.origin);
        if elapsed < self.next_update {
            return false;
        }
        if !self.invalidated && self.last.as_ref() == Some(value) {
            return false;
        }
        self.invalidated = false;
        self.last = Some(value.clone());
        self.next_update = next_update_time(elapsed, self.frequency_hz);
        if self.next_update == elapsed {
            if let Some(period) = period(self.frequency_hz) {
                self.next_update = self.next_update.saturating_add(period);
            }
        }
        true
    }
}
