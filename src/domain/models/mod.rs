//! Domain models
//!
//! Pure domain entities for the town orchestration engine. Framework- and
//! storage-agnostic; repositories translate these to/from SQL rows.

pub mod agent;
pub mod bead;
pub mod config;
pub mod escalation;
pub mod mail;
pub mod mayor;
pub mod molecule;
pub mod review;

pub use agent::{
    Agent, AgentEvent, AgentEventFilter, AgentFilter, AgentMetadata, AgentRole, AgentStatus,
    Checkpoint, NewAgent, NewAgentEvent, POLECAT_NAME_POOL,
};
pub use bead::{
    Bead, BeadDependency, BeadEvent, BeadEventFilter, BeadEventType, BeadFilter, BeadStatus,
    BeadType, DependencyType, NewBead, NewBeadEvent, Priority,
};
pub use config::{RigConfig, TownConfig, SECRET_MASK_PREFIX};
pub use escalation::{EscalationMetadata, NewEscalation, Severity};
pub use mail::{MailMessage, NewMail, GUPP_CHECK_SUBJECT};
pub use mayor::{MayorConfig, MayorSession, MayorSessionStatus, MayorStatus};
pub use molecule::{ConvoyMetadata, Molecule, MoleculeStatus};
pub use review::{
    AgentCompletionStatus, AgentDoneReport, ReviewEntryStatus, ReviewMetadata, ReviewOutcome,
    ReviewQueueEntry, ReviewResult, ReviewResultStatus, SubmitReview,
};
