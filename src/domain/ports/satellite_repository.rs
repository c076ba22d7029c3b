//! Satellite repository port — `review_metadata`, `escalation_metadata`, and
//! `convoy_metadata` rows. Kept separate from [`super::BeadRepository`]
//! because only a handful of services (review queue, escalation creation)
//! ever touch these tables — split by the aggregate they own rather than
//! by raw table.

use async_trait::async_trait;

use crate::domain::errors::TownResult;
use crate::domain::models::{EscalationMetadata, ReviewMetadata, Severity};

#[async_trait]
pub trait SatelliteRepository: Send + Sync {
    async fn create_review_metadata(&self, meta: ReviewMetadata) -> TownResult<()>;
    async fn get_review_metadata(&self, bead_id: &str) -> TownResult<Option<ReviewMetadata>>;
    async fn update_review_metadata(&self, meta: ReviewMetadata) -> TownResult<()>;

    async fn create_escalation_metadata(
        &self,
        bead_id: &str,
        severity: Severity,
        category: Option<&str>,
    ) -> TownResult<()>;
    async fn get_escalation_metadata(&self, bead_id: &str) -> TownResult<Option<EscalationMetadata>>;
    async fn acknowledge_escalation(&self, bead_id: &str) -> TownResult<()>;
}
