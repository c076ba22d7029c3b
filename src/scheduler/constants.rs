//! Scheduler tuning constants.

use std::time::Duration;

pub const ACTIVE_ALARM_INTERVAL: Duration = Duration::from_secs(30);
pub const ARM_DELAY: Duration = Duration::from_secs(5);
pub const STALE_THRESHOLD: Duration = Duration::from_secs(10 * 60);
pub const GUPP_THRESHOLD: Duration = Duration::from_secs(30 * 60);
pub const MAX_DISPATCH_ATTEMPTS: u32 = 5;
pub const REVIEW_RUNNING_TIMEOUT: Duration = Duration::from_secs(5 * 60);
pub const AGENT_EVENT_CAP: i64 = 2000;

/// Mayor session constants.
pub const MAYOR_ALARM_INTERVAL: Duration = Duration::from_secs(15);
pub const MAYOR_SESSION_STALE: Duration = Duration::from_secs(30 * 60);

/// Agent JWT lifetime for dispatch tokens.
pub const AGENT_TOKEN_TTL: Duration = Duration::from_secs(8 * 60 * 60);
/// Mayor JWT lifetime.
pub const MAYOR_TOKEN_TTL: Duration = Duration::from_secs(24 * 60 * 60);
