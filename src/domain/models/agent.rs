//! Agent domain model — beads of `type=agent` joined with `agent_metadata`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use super::bead::Bead;

/// The four roles an agent bead can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    Polecat,
    Refinery,
    Witness,
    Mayor,
}

impl AgentRole {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Polecat => "polecat",
            Self::Refinery => "refinery",
            Self::Witness => "witness",
            Self::Mayor => "mayor",
        }
    }

    /// Singleton roles: at most one live instance per town.
    pub const fn is_singleton(self) -> bool {
        matches!(self, Self::Refinery | Self::Witness | Self::Mayor)
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "polecat" => Some(Self::Polecat),
            "refinery" => Some(Self::Refinery),
            "witness" => Some(Self::Witness),
            "mayor" => Some(Self::Mayor),
            _ => None,
        }
    }
}

impl std::fmt::Display for AgentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AgentRole {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("invalid agent role: {s}"))
    }
}

/// Liveness status of an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Idle,
    Working,
    Blocked,
    Stalled,
    Dead,
}

impl AgentStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Working => "working",
            Self::Blocked => "blocked",
            Self::Stalled => "stalled",
            Self::Dead => "dead",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "idle" => Some(Self::Idle),
            "working" => Some(Self::Working),
            "blocked" => Some(Self::Blocked),
            "stalled" => Some(Self::Stalled),
            "dead" => Some(Self::Dead),
            _ => None,
        }
    }
}

impl std::fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AgentStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("invalid agent status: {s}"))
    }
}

/// The `agent_metadata` satellite row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentMetadata {
    pub bead_id: String,
    pub role: AgentRole,
    pub identity: String,
    pub container_process_id: Option<String>,
    pub status: AgentStatus,
    pub current_hook_bead_id: Option<String>,
    pub dispatch_attempts: u32,
    pub checkpoint: Option<String>,
    pub last_activity_at: Option<DateTime<Utc>>,
}

/// Joined projection of an agent bead + its satellite, returned by C3 reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: String,
    pub role: AgentRole,
    pub name: String,
    pub identity: String,
    pub rig_id: Option<String>,
    pub status: AgentStatus,
    pub current_hook_bead_id: Option<String>,
    pub dispatch_attempts: u32,
    pub checkpoint: Option<String>,
    pub last_activity_at: Option<DateTime<Utc>>,
    pub container_process_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Agent {
    /// Join a bead row with its satellite into the public projection.
    pub fn from_parts(bead: Bead, meta: AgentMetadata) -> Self {
        Self {
            id: bead.id,
            role: meta.role,
            name: bead.title,
            identity: meta.identity,
            rig_id: bead.rig_id,
            status: meta.status,
            current_hook_bead_id: meta.current_hook_bead_id,
            dispatch_attempts: meta.dispatch_attempts,
            checkpoint: meta.checkpoint,
            last_activity_at: meta.last_activity_at,
            container_process_id: meta.container_process_id,
            created_at: bead.created_at,
            updated_at: bead.updated_at,
        }
    }
}

/// Parameters for `RegisterAgent`.
#[derive(Debug, Clone)]
pub struct NewAgent {
    pub role: AgentRole,
    pub name: String,
    pub identity: String,
    pub rig_id: Option<String>,
}

/// Filter criteria for `ListAgents`.
#[derive(Debug, Clone, Default)]
pub struct AgentFilter {
    pub role: Option<AgentRole>,
    pub status: Option<AgentStatus>,
    pub rig_id: Option<String>,
}

/// Fixed ordered pool of 20 names `AllocatePolecatName` draws from before
/// falling back to `Polecat-N`.
pub const POLECAT_NAME_POOL: [&str; 20] = [
    "Toast", "Biscuit", "Ember", "Marble", "Pepper", "Juniper", "Quill", "Maple", "Cobalt",
    "Nutmeg", "Hazel", "Thistle", "Rowan", "Basil", "Clover", "Sable", "Birch", "Indigo",
    "Sorrel", "Flint",
];

/// Arbitrary opaque JSON a polecat checkpoints between dispatch attempts.
/// Never parsed by the control plane.
pub type Checkpoint = Json;

/// An append-only row in `agent_events` — the container's stream of status
/// updates for an agent, persisted so late-joining clients can replay it.
/// Pruned on insert to the highest [`crate::scheduler::constants::AGENT_EVENT_CAP`]
/// ids per agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentEvent {
    pub id: i64,
    pub agent_id: String,
    pub event_type: String,
    pub payload: Json,
    pub created_at: DateTime<Utc>,
}

/// Parameters for `LogAgentEvent`.
#[derive(Debug, Clone)]
pub struct NewAgentEvent {
    pub agent_id: String,
    pub event_type: String,
    pub payload: Option<Json>,
}

/// Filter for `ListAgentEvents`.
#[derive(Debug, Clone, Default)]
pub struct AgentEventFilter {
    pub agent_id: Option<String>,
    pub since_id: Option<i64>,
    pub limit: Option<i64>,
}
