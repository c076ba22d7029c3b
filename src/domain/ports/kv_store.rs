//! KV store port — town/rig config, mayor state, and the scheduler's next
//! alarm fire-time all live as rows in this one table.

use async_trait::async_trait;

use crate::domain::errors::TownResult;

#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> TownResult<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> TownResult<()>;
    async fn delete(&self, key: &str) -> TownResult<()>;
}

/// Typed convenience helpers layered over the raw string [`KvStore`]: the
/// well-known town-config/mayor-config/mayor-session JSON keys.
pub mod keys {
    pub const TOWN_CONFIG: &str = "town:config";
    pub const MAYOR_CONFIG: &str = "mayorConfig";
    pub const MAYOR_SESSION: &str = "mayorSession";
    pub const SCHEDULER_ALARM: &str = "scheduler:alarm_at";
    pub const MAYOR_ALARM: &str = "mayor:alarm_at";

    pub fn rig_config(rig_id: &str) -> String {
        format!("rig:config/{rig_id}")
    }
}
