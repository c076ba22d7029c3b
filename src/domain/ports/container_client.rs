//! Container runtime client port.
//!
//! Stateless HTTP calls against the per-town container control server. The
//! control plane never talks to containers directly, only through this
//! interface, so tests can substitute an in-memory fake.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::errors::ContainerError;

pub type ContainerResult<T> = Result<T, ContainerError>;

#[derive(Debug, Clone, Serialize)]
pub struct StartAgentRequest {
    pub agent_id: String,
    pub rig_id: String,
    pub town_id: String,
    pub role: String,
    pub name: String,
    pub identity: String,
    pub prompt: String,
    pub model: Option<String>,
    pub system_prompt: Option<String>,
    pub git_url: Option<String>,
    pub branch: String,
    pub default_branch: Option<String>,
    pub env_vars: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StopAgentOptions {
    pub signal: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SendMessageRequest {
    pub prompt: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeAgentStatus {
    Starting,
    Running,
    Exited,
    NotFound,
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgentStatusResponse {
    pub status: RuntimeAgentStatus,
    pub exit_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StreamTicket {
    pub ticket: String,
    pub expires_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StartMergeRequest {
    pub entry_id: String,
    pub branch: String,
    pub bead_id: String,
    pub agent_id: String,
    pub pr_url: Option<String>,
    pub env_vars: BTreeMap<String, String>,
}

/// The small HTTP client interface onto the per-town container runtime.
/// All calls are time-bound (default 10s); a non-2xx response or transport
/// failure is always a recoverable [`ContainerError`].
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    async fn start_agent(&self, req: StartAgentRequest) -> ContainerResult<()>;
    async fn stop_agent(&self, agent_id: &str, opts: StopAgentOptions) -> ContainerResult<()>;
    async fn send_message(&self, agent_id: &str, req: SendMessageRequest) -> ContainerResult<()>;
    async fn agent_status(&self, agent_id: &str) -> ContainerResult<AgentStatusResponse>;
    async fn stream_ticket(&self, agent_id: &str) -> ContainerResult<StreamTicket>;
    async fn start_merge(&self, req: StartMergeRequest) -> ContainerResult<()>;
    async fn health(&self) -> ContainerResult<()>;
}
