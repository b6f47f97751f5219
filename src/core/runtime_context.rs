use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;

/// Clock and id source for a run. Swapped for fakes in tests so timelines
/// are deterministic.
#[derive(Clone)]
pub struct RuntimeContext {
    pub time_provider: Arc<dyn TimeProvider>,
    pub id_generator: Arc<dyn IdGenerator>,
}

impl Default for RuntimeContext {
    fn default() -> Self {
        Self {
            time_provider: Arc::new(RealTimeProvider),
            id_generator: Arc::new(RealIdGenerator),
        }
    }
}

impl RuntimeContext {
    pub fn new(time_provider: Arc<dyn TimeProvider>, id_generator: Arc<dyn IdGenerator>) -> Self {
        Self {
            time_provider,
            id_generator,
        }
    }

    /// Fixed clock and `prefix-N` ids.
    pub fn fake(fixed_millis: i64, id_prefix: &str) -> Self {
        Self::new(
            Arc::new(FakeTimeProvider::new(fixed_millis)),
            Arc::new(FakeIdGenerator::new(id_prefix.to_string())),
        )
    }

    pub fn now_millis(&self) -> i64 {
        self.time_provider.now_millis()
    }

    pub fn next_id(&self) -> String {
        self.id_generator.next_id()
    }
}

impl std::fmt::Debug for RuntimeContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeContext").finish_non_exhaustive()
    }
}

pub trait TimeProvider: Send + Sync {
    /// Milliseconds since the Unix epoch.
    fn now_millis(&self) -> i64;
}

pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> String;
}

// --- Real implementations ---

#[derive(Debug, Default)]
pub struct RealTimeProvider;

impl TimeProvider for RealTimeProvider {
    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

#[derive(Debug, Default)]
pub struct RealIdGenerator;

impl IdGenerator for RealIdGenerator {
    fn next_id(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

// --- Fake implementations ---

#[derive(Debug)]
pub struct FakeTimeProvider {
    millis: AtomicI64,
}

impl FakeTimeProvider {
    pub fn new(fixed_millis: i64) -> Self {
        Self {
            millis: AtomicI64::new(fixed_millis),
        }
    }

    pub fn advance(&self, millis: i64) {
        self.millis.fetch_add(millis, Ordering::SeqCst);
    }
}

impl TimeProvider for FakeTimeProvider {
    fn now_millis(&self) -> i64 {
        self.millis.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
pub struct FakeIdGenerator {
    pub prefix: String,
    pub counter: AtomicU64,
}

impl FakeIdGenerator {
    pub fn new(prefix: String) -> Self {
        Self {
            prefix,
            counter: AtomicU64::new(0),
        }
    }
}

impl IdGenerator for FakeIdGenerator {
    fn next_id(&self) -> String {
        let id = self.counter.fetch_add(1, Ordering::SeqCst);
        format!("{}-{}", self.prefix, id)
    }
}
