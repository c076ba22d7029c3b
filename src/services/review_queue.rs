//! Review queue — merge-request beads plus `review_metadata`, processed
//! FIFO by the scheduler's Pass C.

use chrono::Utc;
use tracing::instrument;

use crate::domain::errors::{TownError, TownResult};
use crate::domain::models::{
    AgentCompletionStatus, AgentDoneReport, AgentStatus, BeadEventType, BeadFilter, BeadStatus,
    BeadType, NewBead, NewBeadEvent, Priority, ReviewEntryStatus, ReviewMetadata, ReviewOutcome,
    ReviewQueueEntry, ReviewResult, ReviewResultStatus, SubmitReview,
};
use crate::domain::ports::{AgentRepository, BeadRepository, SatelliteRepository};
use crate::scheduler::constants::REVIEW_RUNNING_TIMEOUT;

#[instrument(skip(beads, satellites, submission), fields(bead_id = %submission.bead_id))]
pub async fn submit_to_review_queue(
    beads: &dyn BeadRepository,
    satellites: &dyn SatelliteRepository,
    submission: SubmitReview,
) -> TownResult<ReviewQueueEntry> {
    let merge_bead = beads
        .create_bead(NewBead {
            bead_type: BeadType::MergeRequest,
            title: format!("Merge {}", submission.branch),
            metadata: Some(serde_json::json!({ "source_bead_id": submission.bead_id })),
            ..Default::default()
        })
        .await?;

    satellites
        .create_review_metadata(ReviewMetadata {
            bead_id: merge_bead.id.clone(),
            branch: submission.branch.clone(),
            target_branch: ReviewMetadata::DEFAULT_TARGET_BRANCH.to_string(),
            merge_commit: None,
            pr_url: submission.pr_url.clone(),
            retry_count: 0,
        })
        .await?;

    beads
        .log_bead_event(NewBeadEvent {
            bead_id: submission.bead_id.clone(),
            agent_id: Some(submission.agent_id.clone()),
            event_type: BeadEventType::ReviewSubmitted,
            old_value: None,
            new_value: Some(merge_bead.id.clone()),
            metadata: submission.summary.map(|s| serde_json::json!({ "summary": s })),
        })
        .await?;

    to_entry(beads, satellites, &merge_bead.id, Some(submission.agent_id)).await
}

/// Selects the oldest `open` merge_request bead and flips it to
/// `in_progress`.
#[instrument(skip(beads, satellites))]
pub async fn pop_review_queue(
    beads: &dyn BeadRepository,
    satellites: &dyn SatelliteRepository,
) -> TownResult<Option<ReviewQueueEntry>> {
    let mut candidates = beads
        .list_beads(BeadFilter {
            status: Some(BeadStatus::Open),
            bead_type: Some(BeadType::MergeRequest),
            limit: Some(BeadFilter::DEFAULT_LIMIT),
            ..Default::default()
        })
        .await?;
    // list_beads orders DESC; the oldest is the minimum over this page.
    candidates.sort_by_key(|b| b.created_at);

    let Some(bead) = candidates.into_iter().next() else {
        return Ok(None);
    };

    beads.update_bead_status(&bead.id, BeadStatus::InProgress, None).await?;
    to_entry(beads, satellites, &bead.id, None).await.map(Some)
}

/// `CompleteReview` — the simple two-outcome variant.
#[instrument(skip(beads))]
pub async fn complete_review(beads: &dyn BeadRepository, entry_id: &str, outcome: ReviewOutcome) -> TownResult<()> {
    let status = match outcome {
        ReviewOutcome::Merged => BeadStatus::Closed,
        ReviewOutcome::Failed => BeadStatus::Failed,
    };
    beads.update_bead_status(entry_id, status, None).await?;
    Ok(())
}

/// `CompleteReviewWithResult` — folds `conflict` into `failed` for the
/// review bead, closes the originating bead on `merged`, and opens a
/// high-priority escalation on `conflict`.
#[instrument(skip(beads, satellites, result))]
pub async fn complete_review_with_result(
    beads: &dyn BeadRepository,
    satellites: &dyn SatelliteRepository,
    result: ReviewResult,
) -> TownResult<()> {
    let review_bead = beads
        .get_bead(&result.entry_id)
        .await?
        .ok_or_else(|| TownError::not_found(format!("review entry {}", result.entry_id)))?;
    let source_bead_id =
        review_bead.metadata.get("source_bead_id").and_then(|v| v.as_str()).map(str::to_string);

    let bead_status = match result.status {
        ReviewResultStatus::Merged => BeadStatus::Closed,
        ReviewResultStatus::Failed | ReviewResultStatus::Conflict => BeadStatus::Failed,
    };
    beads.update_bead_status(&result.entry_id, bead_status, None).await?;

    if let Some(meta) = satellites.get_review_metadata(&result.entry_id).await? {
        satellites
            .update_review_metadata(ReviewMetadata { merge_commit: result.commit_sha.clone(), ..meta })
            .await?;
    }

    beads
        .log_bead_event(NewBeadEvent {
            bead_id: result.entry_id.clone(),
            agent_id: None,
            event_type: BeadEventType::ReviewCompleted,
            old_value: None,
            new_value: Some(format!("{:?}", result.status)),
            metadata: result.message.clone().map(|m| serde_json::json!({ "message": m })),
        })
        .await?;

    match result.status {
        ReviewResultStatus::Merged => {
            if let Some(source_id) = source_bead_id {
                beads.update_bead_status(&source_id, BeadStatus::Closed, None).await?;
            }
        }
        ReviewResultStatus::Conflict => {
            let message = result.message.unwrap_or_else(|| "merge conflict".to_string());
            let mut metadata = serde_json::json!({ "conflict": true });
            if let Some(source_id) = &source_bead_id {
                metadata["source_bead_id"] = serde_json::Value::String(source_id.clone());
            }
            beads
                .create_bead(NewBead {
                    bead_type: BeadType::Escalation,
                    title: format!("Merge conflict: {message}"),
                    priority: Some(Priority::High),
                    metadata: Some(metadata),
                    ..Default::default()
                })
                .await?;
        }
        ReviewResultStatus::Failed => {}
    }

    Ok(())
}

/// Resets stuck `in_progress` review entries back to `open`.
#[instrument(skip(beads))]
pub async fn recover_stuck_reviews(beads: &dyn BeadRepository) -> TownResult<usize> {
    let running = beads
        .list_beads(BeadFilter {
            status: Some(BeadStatus::InProgress),
            bead_type: Some(BeadType::MergeRequest),
            limit: Some(BeadFilter::DEFAULT_LIMIT),
            ..Default::default()
        })
        .await?;

    let threshold = Utc::now() - chrono::Duration::from_std(REVIEW_RUNNING_TIMEOUT).unwrap();
    let mut recovered = 0;
    for bead in running {
        if bead.updated_at < threshold {
            beads.update_bead_status(&bead.id, BeadStatus::Open, None).await?;
            recovered += 1;
        }
    }
    Ok(recovered)
}

/// `AgentDone` — the agent reports its work complete and submits for review.
#[instrument(skip(beads, agents, satellites, report))]
pub async fn agent_done(
    beads: &dyn BeadRepository,
    agents: &dyn AgentRepository,
    satellites: &dyn SatelliteRepository,
    agent_id: &str,
    report: AgentDoneReport,
) -> TownResult<ReviewQueueEntry> {
    let hooked = agents
        .get_hooked_bead(agent_id)
        .await?
        .ok_or_else(|| TownError::Conflict("AgentNotHooked"))?;

    let entry = submit_to_review_queue(
        beads,
        satellites,
        SubmitReview {
            agent_id: agent_id.to_string(),
            bead_id: hooked.id,
            branch: report.branch,
            pr_url: report.pr_url,
            summary: report.summary,
        },
    )
    .await?;

    agents.unhook_bead(agent_id).await?;
    Ok(entry)
}

/// `AgentCompleted` — container-runtime completion callback.
#[instrument(skip(beads, agents))]
pub async fn agent_completed(
    beads: &dyn BeadRepository,
    agents: &dyn AgentRepository,
    agent_id: &str,
    status: AgentCompletionStatus,
) -> TownResult<()> {
    if let Some(hooked) = agents.get_hooked_bead(agent_id).await? {
        let bead_status = match status {
            AgentCompletionStatus::Completed => BeadStatus::Closed,
            AgentCompletionStatus::Failed => BeadStatus::Failed,
        };
        beads.update_bead_status(&hooked.id, bead_status, Some(agent_id)).await?;
    }
    agents.unhook_bead(agent_id).await?;
    agents.update_agent_status(agent_id, AgentStatus::Idle).await?;
    agents.reset_dispatch_attempts(agent_id).await?;
    Ok(())
}

async fn to_entry(
    beads: &dyn BeadRepository,
    satellites: &dyn SatelliteRepository,
    bead_id: &str,
    agent_id: Option<String>,
) -> TownResult<ReviewQueueEntry> {
    let bead = beads.get_bead(bead_id).await?.ok_or_else(|| TownError::not_found(format!("review entry {bead_id}")))?;
    let meta = satellites
        .get_review_metadata(bead_id)
        .await?
        .ok_or_else(|| TownError::not_found(format!("review metadata {bead_id}")))?;

    Ok(ReviewQueueEntry {
        id: bead.id,
        status: ReviewEntryStatus::from_bead_status(bead.status),
        branch: meta.branch,
        target_branch: meta.target_branch,
        pr_url: meta.pr_url,
        merge_commit: meta.merge_commit,
        retry_count: meta.retry_count,
        source_bead_id: bead.metadata.get("source_bead_id").and_then(|v| v.as_str()).map(str::to_string),
        agent_id,
        created_at: bead.created_at,
        updated_at: bead.updated_at,
    })
}
