mod helpers;

use gastown_town::adapters::sqlite::{SqliteBeadRepository, SqliteSatelliteRepository};
use gastown_town::domain::models::{
    BeadStatus, BeadType, NewBead, Priority, ReviewResult, ReviewResultStatus, SubmitReview,
};
use gastown_town::domain::ports::BeadRepository;
use gastown_town::services::review_queue::{
    complete_review_with_result, pop_review_queue, submit_to_review_queue,
};
use helpers::database::{setup_test_db, teardown_test_db};

/// S4 — merge conflict creates a high-priority escalation linked back to
/// the originating bead.
#[tokio::test]
async fn conflict_result_fails_the_entry_and_opens_an_escalation() {
    let pool = setup_test_db().await;
    let beads = SqliteBeadRepository::new(pool.clone());
    let satellites = SqliteSatelliteRepository::new(pool.clone());

    let source = beads.create_bead(NewBead { title: "B2".to_string(), ..Default::default() }).await.unwrap();

    let entry = submit_to_review_queue(
        &beads,
        &satellites,
        SubmitReview {
            agent_id: "A1".to_string(),
            bead_id: source.id.clone(),
            branch: "feat/x".to_string(),
            pr_url: None,
            summary: None,
        },
    )
    .await
    .unwrap();

    complete_review_with_result(
        &beads,
        &satellites,
        ReviewResult {
            entry_id: entry.id.clone(),
            status: ReviewResultStatus::Conflict,
            message: Some("merge conflict in foo.ts".to_string()),
            commit_sha: None,
        },
    )
    .await
    .unwrap();

    let merge_bead = beads.get_bead(&entry.id).await.unwrap().unwrap();
    assert_eq!(merge_bead.status, BeadStatus::Failed);

    let escalations = beads
        .list_beads(gastown_town::domain::models::BeadFilter {
            bead_type: Some(BeadType::Escalation),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(escalations.len(), 1);
    let escalation = &escalations[0];
    assert_eq!(escalation.priority, Priority::High);
    assert_eq!(escalation.title, "Merge conflict: merge conflict in foo.ts");
    assert_eq!(escalation.metadata["source_bead_id"], source.id.as_str());
    assert_eq!(escalation.metadata["conflict"], true);

    teardown_test_db(pool).await;
}

#[tokio::test]
async fn merged_result_closes_entry_and_source_bead() {
    let pool = setup_test_db().await;
    let beads = SqliteBeadRepository::new(pool.clone());
    let satellites = SqliteSatelliteRepository::new(pool.clone());

    let source = beads.create_bead(NewBead { title: "source".to_string(), ..Default::default() }).await.unwrap();
    let entry = submit_to_review_queue(
        &beads,
        &satellites,
        SubmitReview {
            agent_id: "A1".to_string(),
            bead_id: source.id.clone(),
            branch: "feat/y".to_string(),
            pr_url: None,
            summary: None,
        },
    )
    .await
    .unwrap();

    complete_review_with_result(
        &beads,
        &satellites,
        ReviewResult { entry_id: entry.id.clone(), status: ReviewResultStatus::Merged, message: None, commit_sha: Some("abc123".to_string()) },
    )
    .await
    .unwrap();

    let merge_bead = beads.get_bead(&entry.id).await.unwrap().unwrap();
    assert_eq!(merge_bead.status, BeadStatus::Closed);
    let source_bead = beads.get_bead(&source.id).await.unwrap().unwrap();
    assert_eq!(source_bead.status, BeadStatus::Closed);

    teardown_test_db(pool).await;
}

#[tokio::test]
async fn pop_review_queue_picks_oldest_open_entry_fifo() {
    let pool = setup_test_db().await;
    let beads = SqliteBeadRepository::new(pool.clone());
    let satellites = SqliteSatelliteRepository::new(pool.clone());

    let first = submit_to_review_queue(
        &beads,
        &satellites,
        SubmitReview { agent_id: "A1".to_string(), bead_id: "b1".to_string(), branch: "b1".to_string(), pr_url: None, summary: None },
    )
    .await
    .unwrap();
    let _second = submit_to_review_queue(
        &beads,
        &satellites,
        SubmitReview { agent_id: "A2".to_string(), bead_id: "b2".to_string(), branch: "b2".to_string(), pr_url: None, summary: None },
    )
    .await
    .unwrap();

    let popped = pop_review_queue(&beads, &satellites).await.unwrap().expect("queue should not be empty");
    assert_eq!(popped.id, first.id);

    let bead = beads.get_bead(&popped.id).await.unwrap().unwrap();
    assert_eq!(bead.status, BeadStatus::InProgress);

    teardown_test_db(pool).await;
}

#[tokio::test]
async fn pop_review_queue_returns_none_when_empty() {
    let pool = setup_test_db().await;
    let beads = SqliteBeadRepository::new(pool.clone());
    let satellites = SqliteSatelliteRepository::new(pool.clone());

    let popped = pop_review_queue(&beads, &satellites).await.unwrap();
    assert!(popped.is_none());

    teardown_test_db(pool).await;
}
