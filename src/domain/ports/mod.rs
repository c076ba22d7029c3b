//! Domain ports (interfaces) for the town orchestration engine.

pub mod agent_repository;
pub mod bead_repository;
pub mod container_client;
pub mod kv_store;
pub mod rig_registry;
pub mod satellite_repository;

pub use agent_repository::{get_or_create_agent, AgentRepository};
pub use bead_repository::{close_bead, BeadRepository};
pub use container_client::{
    AgentStatusResponse, ContainerResult, ContainerRuntime, RuntimeAgentStatus,
    SendMessageRequest, StartAgentRequest, StartMergeRequest, StopAgentOptions, StreamTicket,
};
pub use kv_store::{keys, KvStore};
pub use rig_registry::{rig_belongs_to_town, Rig, RigRegistry};
pub use satellite_repository::SatelliteRepository;
