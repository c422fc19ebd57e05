use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Monotonically increasing tag attached to asynchronous requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

impl Generation {
    pub fn value(self) -> u64 {
        self.0
    }
}

/// Shared issuer of generations. Clones observe the same sequence.
#[derive(Debug, Clone, Default)]
pub struct GenerationCounter {
    latest: Arc<AtomicU64>,
}

impl GenerationCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues a fresh generation, superseding every earlier one.
    pub fn issue(&self) -> Generation {
        Generation(self.latest.fetch_add(1, Ordering::AcqRel) + 1)
    }

    /// The most recently issued generation, if any.
    pub fn latest(&self) -> Option<Generation> {
        match self.latest.load(Ordering::Acquire) {
            0 => None,
            value => Some(Generation(value)),
        }
    }

    pub fn is_latest(&self, generation: Generation) -> bool {
        self.latest() == Some(generation)
    }
}
