//! Molecule domain model — a linear step chain of issue beads joined by
//! `blocks` dependencies.

use serde::{Deserialize, Serialize};

/// Derived status of a molecule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoleculeStatus {
    Active,
    Completed,
    Failed,
}

/// Projection returned by `GetMolecule`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Molecule {
    pub id: String,
    pub source_bead_id: Option<String>,
    pub formula: Vec<String>,
    pub current_step: usize,
    pub status: MoleculeStatus,
    pub step_bead_ids: Vec<String>,
}

/// The `convoy_metadata` satellite — out of core scope beyond field presence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvoyMetadata {
    pub bead_id: String,
    pub total_beads: u32,
    pub closed_beads: u32,
    pub landed_at: Option<chrono::DateTime<chrono::Utc>>,
}
