//! Mayor session domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stored under KV key `mayorConfig`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MayorConfig {
    pub town_id: String,
    pub user_id: String,
    pub git_url: Option<String>,
    pub default_branch: String,
    pub kilocode_token: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MayorSessionStatus {
    Idle,
    Active,
    Starting,
}

/// Stored under KV key `mayorSession`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MayorSession {
    pub agent_id: String,
    pub session_id: String,
    pub status: MayorSessionStatus,
    pub last_activity_at: DateTime<Utc>,
}

/// Snapshot returned by `GetMayorStatus`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MayorStatus {
    pub configured: bool,
    pub session: Option<MayorSession>,
    pub town_id: Option<String>,
}
