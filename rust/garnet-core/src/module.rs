//! Runtime modules and their structure generation counter.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A class or module as seen by the running program.
///
/// The generation changes every time the module's structure changes (method
/// added or removed, ancestor included, ...). Compiled code that assumed a
/// particular structure records the generation it saw and compares it later.
#[derive(Debug)]
pub struct RtModule {
    name: String,
    generation: AtomicU64,
}

impl RtModule {
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            generation: AtomicU64::new(0),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current generation. Readers on any thread see either the old or the
    /// new value of a concurrent bump, never a torn one.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Invalidate every assumption made about this module's structure.
    /// Returns the new generation.
    pub fn bump_generation(&self) -> u64 {
        let next = self.generation.fetch_add(1, Ordering::AcqRel).wrapping_add(1);
        tracing::trace!(module = %self.name, generation = next, "module generation bumped");
        next
    }
}

impl fmt::Display for RtModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}
