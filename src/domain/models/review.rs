//! Review queue domain model — merge-request beads + `review_metadata`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::bead::BeadStatus;

/// The `review_metadata` satellite row. Exists iff `bead.type = merge_request`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewMetadata {
    pub bead_id: String,
    pub branch: String,
    pub target_branch: String,
    pub merge_commit: Option<String>,
    pub pr_url: Option<String>,
    pub retry_count: u32,
}

impl ReviewMetadata {
    pub const DEFAULT_TARGET_BRANCH: &'static str = "main";
}

/// Public status of a review queue entry, distinct from the underlying
/// bead status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewEntryStatus {
    Pending,
    Running,
    Merged,
    Failed,
}

impl ReviewEntryStatus {
    /// `{beads.status -> entry.status}` mapping, kept in lockstep so a
    /// bead's lifecycle and its review entry never disagree.
    pub const fn from_bead_status(status: BeadStatus) -> Self {
        match status {
            BeadStatus::Open => Self::Pending,
            BeadStatus::InProgress => Self::Running,
            BeadStatus::Closed => Self::Merged,
            BeadStatus::Failed => Self::Failed,
        }
    }

    /// Inverse of [`Self::from_bead_status`], used when writing the mapping
    /// back.
    pub const fn to_bead_status(self) -> BeadStatus {
        match self {
            Self::Pending => BeadStatus::Open,
            Self::Running => BeadStatus::InProgress,
            Self::Merged => BeadStatus::Closed,
            Self::Failed => BeadStatus::Failed,
        }
    }
}

/// A merge-request bead joined with its review metadata, as returned by
/// `PopReviewQueue`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewQueueEntry {
    pub id: String,
    pub status: ReviewEntryStatus,
    pub branch: String,
    pub target_branch: String,
    pub pr_url: Option<String>,
    pub merge_commit: Option<String>,
    pub retry_count: u32,
    pub source_bead_id: Option<String>,
    pub agent_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Parameters for `SubmitToReviewQueue`.
#[derive(Debug, Clone)]
pub struct SubmitReview {
    pub agent_id: String,
    pub bead_id: String,
    pub branch: String,
    pub pr_url: Option<String>,
    pub summary: Option<String>,
}

/// Final disposition for `CompleteReview`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewOutcome {
    Merged,
    Failed,
}

/// Disposition reported by the container runtime's merge step, including
/// the `conflict` case that `CompleteReviewWithResult` folds into `Failed`
/// plus an escalation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewResultStatus {
    Merged,
    Failed,
    Conflict,
}

/// Parameters for `CompleteReviewWithResult`.
#[derive(Debug, Clone)]
pub struct ReviewResult {
    pub entry_id: String,
    pub status: ReviewResultStatus,
    pub message: Option<String>,
    pub commit_sha: Option<String>,
}

/// Parameters for `AgentDone`.
#[derive(Debug, Clone)]
pub struct AgentDoneReport {
    pub branch: String,
    pub pr_url: Option<String>,
    pub summary: Option<String>,
}

/// Terminal disposition reported by the container runtime's completion
/// callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentCompletionStatus {
    Completed,
    Failed,
}
