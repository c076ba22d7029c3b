//! Bead repository port.

use async_trait::async_trait;

use crate::domain::errors::TownResult;
use crate::domain::models::{
    Bead, BeadDependency, BeadEvent, BeadEventFilter, BeadFilter, BeadStatus, DependencyType,
    NewBead, NewBeadEvent,
};

#[async_trait]
pub trait BeadRepository: Send + Sync {
    async fn create_bead(&self, input: NewBead) -> TownResult<Bead>;
    async fn get_bead(&self, id: &str) -> TownResult<Option<Bead>>;
    async fn list_beads(&self, filter: BeadFilter) -> TownResult<Vec<Bead>>;

    /// Reads the old status, writes the new one, stamps `closed_at` when
    /// transitioning to `closed`, and emits a `status_changed` event.
    async fn update_bead_status(
        &self,
        id: &str,
        status: BeadStatus,
        agent_id: Option<&str>,
    ) -> TownResult<Bead>;

    /// Recursively deletes `id`'s children, unhooks any agent still
    /// referencing it, and removes its dependencies/satellites/events.
    async fn delete_bead(&self, id: &str) -> TownResult<()>;

    async fn log_bead_event(&self, event: NewBeadEvent) -> TownResult<BeadEvent>;
    async fn list_bead_events(&self, filter: BeadEventFilter) -> TownResult<Vec<BeadEvent>>;

    async fn add_dependency(
        &self,
        bead_id: &str,
        depends_on_bead_id: &str,
        dependency_type: DependencyType,
    ) -> TownResult<()>;
    async fn list_dependencies(&self, bead_id: &str) -> TownResult<Vec<BeadDependency>>;
    async fn list_children(&self, parent_bead_id: &str) -> TownResult<Vec<Bead>>;

    /// Patches a single top-level key of `bead.metadata` (used by
    /// `CreateMolecule` to stamp `metadata.molecule_bead_id` on the source
    /// bead).
    async fn patch_metadata(
        &self,
        id: &str,
        key: &str,
        value: serde_json::Value,
    ) -> TownResult<()>;
}

/// `CloseBead` is `UpdateBeadStatus(.., 'closed', ..)` — a free
/// function rather than a trait method so every repository gets it for free.
pub async fn close_bead(
    repo: &dyn BeadRepository,
    id: &str,
    agent_id: Option<&str>,
) -> TownResult<Bead> {
    repo.update_bead_status(id, BeadStatus::Closed, agent_id).await
}
