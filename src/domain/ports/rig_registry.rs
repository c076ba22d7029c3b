//! Rig registry client port — the user/town/rig registry lives in a
//! separate keyed store outside this crate; the mayor tools routes only
//! ever need to list a town's rigs or confirm one belongs to it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::errors::TownResult;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rig {
    pub id: String,
    pub town_id: String,
    pub name: String,
}

#[async_trait]
pub trait RigRegistry: Send + Sync {
    async fn list_rigs(&self, town_id: &str) -> TownResult<Vec<Rig>>;
    async fn get_rig(&self, town_id: &str, rig_id: &str) -> TownResult<Option<Rig>>;
}

/// `rig must belong to town` check used by the mayor tools routes.
pub async fn rig_belongs_to_town(registry: &dyn RigRegistry, town_id: &str, rig_id: &str) -> TownResult<bool> {
    Ok(registry.get_rig(town_id, rig_id).await?.is_some())
}
