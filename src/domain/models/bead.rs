//! Bead domain model — the universal work unit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

/// Discriminates which satellite row a bead must carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BeadType {
    Issue,
    Message,
    Escalation,
    MergeRequest,
    Agent,
    Molecule,
}

impl BeadType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Issue => "issue",
            Self::Message => "message",
            Self::Escalation => "escalation",
            Self::MergeRequest => "merge_request",
            Self::Agent => "agent",
            Self::Molecule => "molecule",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "issue" => Some(Self::Issue),
            "message" => Some(Self::Message),
            "escalation" => Some(Self::Escalation),
            "merge_request" => Some(Self::MergeRequest),
            "agent" => Some(Self::Agent),
            "molecule" => Some(Self::Molecule),
            _ => None,
        }
    }
}

impl std::fmt::Display for BeadType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BeadType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("invalid bead type: {s}"))
    }
}

/// Bead lifecycle status. Monotonic except reopen, which is disallowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BeadStatus {
    Open,
    InProgress,
    Closed,
    Failed,
}

impl BeadStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in_progress",
            Self::Closed => "closed",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "open" => Some(Self::Open),
            "in_progress" => Some(Self::InProgress),
            "closed" => Some(Self::Closed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for BeadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BeadStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("invalid bead status: {s}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Priority {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            "critical" => Some(Self::Critical),
            _ => None,
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Priority {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("invalid priority: {s}"))
    }
}

/// The universal work-unit record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bead {
    pub id: String,
    pub bead_type: BeadType,
    pub status: BeadStatus,
    pub title: String,
    pub body: Option<String>,
    pub rig_id: Option<String>,
    pub parent_bead_id: Option<String>,
    pub assignee_agent_bead_id: Option<String>,
    pub priority: Priority,
    pub labels: Vec<String>,
    pub metadata: Json,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

/// Fields accepted by `CreateBead`. Everything but `bead_type`
/// and `title` is optional and defaulted by the repository.
#[derive(Debug, Clone, Default)]
pub struct NewBead {
    pub bead_type: BeadType,
    pub title: String,
    pub body: Option<String>,
    pub rig_id: Option<String>,
    pub parent_bead_id: Option<String>,
    pub assignee_agent_bead_id: Option<String>,
    pub priority: Option<Priority>,
    pub labels: Option<Vec<String>>,
    pub metadata: Option<Json>,
    pub created_by: Option<String>,
}

impl Default for BeadType {
    fn default() -> Self {
        Self::Issue
    }
}

/// Filter criteria for `ListBeads`.
#[derive(Debug, Clone, Default)]
pub struct BeadFilter {
    pub status: Option<BeadStatus>,
    pub bead_type: Option<BeadType>,
    pub assignee: Option<String>,
    pub parent: Option<String>,
    pub rig: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl BeadFilter {
    /// Default page size when the caller does not specify one.
    pub const DEFAULT_LIMIT: i64 = 100;

    pub fn effective_limit(&self) -> i64 {
        self.limit.unwrap_or(Self::DEFAULT_LIMIT)
    }
}

/// The kind of edge stored in `bead_dependencies`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DependencyType {
    Blocks,
    Tracks,
    ParentChild,
}

impl DependencyType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Blocks => "blocks",
            Self::Tracks => "tracks",
            Self::ParentChild => "parent-child",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "blocks" => Some(Self::Blocks),
            "tracks" => Some(Self::Tracks),
            "parent-child" => Some(Self::ParentChild),
            _ => None,
        }
    }
}

/// A dependency edge between two beads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BeadDependency {
    pub bead_id: String,
    pub depends_on_bead_id: String,
    pub dependency_type: DependencyType,
}

/// Kind of immutable fact recorded in the bead event log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BeadEventType {
    Created,
    Assigned,
    Hooked,
    Unhooked,
    StatusChanged,
    Closed,
    Escalated,
    MailSent,
    ReviewSubmitted,
    ReviewCompleted,
    AgentSpawned,
    AgentExited,
}

impl BeadEventType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Assigned => "assigned",
            Self::Hooked => "hooked",
            Self::Unhooked => "unhooked",
            Self::StatusChanged => "status_changed",
            Self::Closed => "closed",
            Self::Escalated => "escalated",
            Self::MailSent => "mail_sent",
            Self::ReviewSubmitted => "review_submitted",
            Self::ReviewCompleted => "review_completed",
            Self::AgentSpawned => "agent_spawned",
            Self::AgentExited => "agent_exited",
        }
    }
}

/// An append-only row in `bead_events`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BeadEvent {
    pub id: i64,
    pub bead_id: String,
    pub agent_id: Option<String>,
    pub event_type: BeadEventType,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub metadata: Json,
    pub created_at: DateTime<Utc>,
}

/// Parameters for `LogBeadEvent`.
#[derive(Debug, Clone)]
pub struct NewBeadEvent {
    pub bead_id: String,
    pub agent_id: Option<String>,
    pub event_type: BeadEventType,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub metadata: Option<Json>,
}

/// Filter for `ListBeadEvents`.
#[derive(Debug, Clone, Default)]
pub struct BeadEventFilter {
    pub bead_id: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
}
