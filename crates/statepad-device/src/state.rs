use std::time::Instant;

/// One state report as received from the platform.
#[derive(Debug, Clone, PartialEq)]
pub struct StateBuffer {
    bytes: Box<[u8]>,
    timestamp: Instant,
    sequence: u64,
}

impl StateBuffer {
    pub fn new(bytes: impl Into<Box<[u8]>>, timestamp: Instant, sequence: u64) -> Self {
        Self {
            bytes: bytes.into(),
            timestamp,
            sequence,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn timestamp(&self) -> Instant {
        self.timestamp
    }

    /// Monotonic per device, starting at 1 for the first ingested buffer.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// The two most recent buffers of a device. Published as a whole so readers
/// never see a half-updated pair.
#[derive(Debug, Clone, PartialEq)]
pub struct StatePair {
    pub previous: Option<StateBuffer>,
    pub current: StateBuffer,
}

impl StatePair {
    pub fn initial(current: StateBuffer) -> Self {
        Self {
            previous: None,
            current,
        }
    }

    /// A new pair with `next` as current and the old current as previous.
    #[must_use]
    pub fn advance(&self, next: StateBuffer) -> Self {
        Self {
            previous: Some(self.current.clone()),
            current: next,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_shifts_current() {
        let now = Instant::now();
        let pair = StatePair::initial(StateBuffer::new(vec![0u8], now, 0));
        let next = pair.advance(StateBuffer::new(vec![1u8], now, 1));
        assert_eq!(next.previous.as_ref().map(StateBuffer::bytes), Some(&[0u8][..]));
        assert_eq!(next.current.bytes(), &[1u8]);
        assert_eq!(next.current.sequence(), 1);
    }
}
