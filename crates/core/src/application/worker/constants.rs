// Worker constants (No magic values)
use std::time::Duration;

/// Default number of simultaneously in-flight handler executions
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Default idle wait between poll ticks (100ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// How often `stop()` re-checks the active-dispatch counter while draining (10ms)
pub const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(10);
