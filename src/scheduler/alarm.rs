//! `ArmAlarm` and its mayor-session counterpart.
//!
//! The source environment's alarm is a durable platform primitive; here it
//! is a KV row holding the next scheduled fire time, read by whatever drives
//! the town's tick loop (see `town.rs`). Arming is idempotent: a fire time
//! already in the future is left alone.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use tracing::debug;

use crate::domain::errors::TownResult;
use crate::domain::ports::{keys, KvStore};

use super::constants::ARM_DELAY;

/// Schedules the next tick `ARM_DELAY` from now unless one is already
/// pending in the future.
pub async fn arm_alarm(kv: &dyn KvStore) -> TownResult<()> {
    arm_at_key(kv, keys::SCHEDULER_ALARM, ARM_DELAY).await
}

/// Unsets the scheduler alarm (used at tail of a tick with no active work).
pub async fn disarm_alarm(kv: &dyn KvStore) -> TownResult<()> {
    kv.delete(keys::SCHEDULER_ALARM).await
}

/// Unconditionally schedules the next tick `delay` from now — used at the
/// tail of a tick that found active work, overriding whatever was armed.
pub async fn schedule_tick_in(kv: &dyn KvStore, delay: std::time::Duration) -> TownResult<()> {
    let fire_at = Utc::now() + ChronoDuration::from_std(delay).unwrap_or_default();
    debug!(%fire_at, "scheduling next tick");
    kv.set(keys::SCHEDULER_ALARM, &fire_at.to_rfc3339()).await
}

pub async fn next_alarm(kv: &dyn KvStore) -> TownResult<Option<DateTime<Utc>>> {
    read_fire_time(kv, keys::SCHEDULER_ALARM).await
}

pub async fn arm_mayor_alarm(kv: &dyn KvStore, delay: std::time::Duration) -> TownResult<()> {
    arm_at_key(kv, keys::MAYOR_ALARM, delay).await
}

pub async fn disarm_mayor_alarm(kv: &dyn KvStore) -> TownResult<()> {
    kv.delete(keys::MAYOR_ALARM).await
}

pub async fn next_mayor_alarm(kv: &dyn KvStore) -> TownResult<Option<DateTime<Utc>>> {
    read_fire_time(kv, keys::MAYOR_ALARM).await
}

async fn arm_at_key(kv: &dyn KvStore, key: &str, delay: std::time::Duration) -> TownResult<()> {
    let now = Utc::now();
    if let Some(existing) = read_fire_time(kv, key).await? {
        if existing > now {
            return Ok(());
        }
    }
    let fire_at = now + ChronoDuration::from_std(delay).unwrap_or_default();
    debug!(key, %fire_at, "arming alarm");
    kv.set(key, &fire_at.to_rfc3339()).await
}

async fn read_fire_time(kv: &dyn KvStore, key: &str) -> TownResult<Option<DateTime<Utc>>> {
    match kv.get(key).await? {
        Some(raw) => Ok(DateTime::parse_from_rfc3339(&raw).ok().map(|dt| dt.with_timezone(&Utc))),
        None => Ok(None),
    }
}
