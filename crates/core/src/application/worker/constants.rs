// Worker constants (no magic values)
use std::time::Duration;

/// First sleep when the queue is empty (100ms), doubled while idle
pub const IDLE_SLEEP_DURATION: Duration = Duration::from_millis(100);

/// Upper bound for the idle backoff (2s)
pub const MAX_IDLE_SLEEP_DURATION: Duration = Duration::from_secs(2);

/// Sleep duration after worker error before retry (1s)
pub const ERROR_RECOVERY_SLEEP_DURATION: Duration = Duration::from_secs(1);

/// Default bound on a single strategy invocation (2 minutes)
pub const DEFAULT_EXTRACTION_TIMEOUT: Duration = Duration::from_secs(120);

/// Deliveries of one queue item before its job is abandoned
pub const DEFAULT_MAX_DELIVERIES: u32 = 3;

/// Progress markers written by the worker
pub const PROGRESS_STARTED: &str = "started";
pub const PROGRESS_RESTARTED: &str = "restarted";
pub const PROGRESS_EXTRACTING: &str = "extracting";
