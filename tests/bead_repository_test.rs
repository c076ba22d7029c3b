mod helpers;

use gastown_town::adapters::sqlite::SqliteBeadRepository;
use gastown_town::domain::models::{
    BeadEventFilter, BeadEventType, BeadFilter, BeadStatus, BeadType, DependencyType, NewBead,
    NewBeadEvent, Priority,
};
use gastown_town::domain::ports::BeadRepository;
use helpers::database::{setup_test_db, teardown_test_db};

#[tokio::test]
async fn create_and_get_bead() {
    let pool = setup_test_db().await;
    let repo = SqliteBeadRepository::new(pool.clone());

    let bead = repo
        .create_bead(NewBead {
            bead_type: BeadType::Issue,
            title: "Fix widget".to_string(),
            priority: Some(Priority::High),
            rig_id: Some("R1".to_string()),
            ..Default::default()
        })
        .await
        .expect("create_bead failed");

    assert_eq!(bead.status, BeadStatus::Open);
    assert_eq!(bead.priority, Priority::High);

    let fetched = repo.get_bead(&bead.id).await.unwrap().expect("bead should exist");
    assert_eq!(fetched.title, "Fix widget");

    teardown_test_db(pool).await;
}

#[tokio::test]
async fn get_nonexistent_bead_returns_none() {
    let pool = setup_test_db().await;
    let repo = SqliteBeadRepository::new(pool.clone());

    let result = repo.get_bead("does-not-exist").await.expect("query should succeed");
    assert!(result.is_none());

    teardown_test_db(pool).await;
}

#[tokio::test]
async fn update_status_stamps_closed_at() {
    let pool = setup_test_db().await;
    let repo = SqliteBeadRepository::new(pool.clone());

    let bead = repo
        .create_bead(NewBead { title: "Do thing".to_string(), ..Default::default() })
        .await
        .unwrap();
    assert!(bead.closed_at.is_none());

    let closed = repo.update_bead_status(&bead.id, BeadStatus::Closed, None).await.unwrap();
    assert_eq!(closed.status, BeadStatus::Closed);
    assert!(closed.closed_at.is_some());

    teardown_test_db(pool).await;
}

#[tokio::test]
async fn list_beads_filters_by_status_and_rig() {
    let pool = setup_test_db().await;
    let repo = SqliteBeadRepository::new(pool.clone());

    for i in 0..3 {
        repo.create_bead(NewBead {
            title: format!("r1-{i}"),
            rig_id: Some("R1".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    }
    let other = repo
        .create_bead(NewBead { title: "r2-0".to_string(), rig_id: Some("R2".to_string()), ..Default::default() })
        .await
        .unwrap();
    repo.update_bead_status(&other.id, BeadStatus::Closed, None).await.unwrap();

    let r1_open = repo
        .list_beads(BeadFilter { rig: Some("R1".to_string()), status: Some(BeadStatus::Open), ..Default::default() })
        .await
        .unwrap();
    assert_eq!(r1_open.len(), 3);

    let r2_open = repo
        .list_beads(BeadFilter { rig: Some("R2".to_string()), status: Some(BeadStatus::Open), ..Default::default() })
        .await
        .unwrap();
    assert!(r2_open.is_empty());

    teardown_test_db(pool).await;
}

#[tokio::test]
async fn delete_bead_cascades_to_children() {
    let pool = setup_test_db().await;
    let repo = SqliteBeadRepository::new(pool.clone());

    let parent = repo.create_bead(NewBead { title: "parent".to_string(), ..Default::default() }).await.unwrap();
    let child = repo
        .create_bead(NewBead {
            title: "child".to_string(),
            parent_bead_id: Some(parent.id.clone()),
            ..Default::default()
        })
        .await
        .unwrap();

    repo.delete_bead(&parent.id).await.expect("delete should succeed");

    assert!(repo.get_bead(&parent.id).await.unwrap().is_none());
    assert!(repo.get_bead(&child.id).await.unwrap().is_none());

    teardown_test_db(pool).await;
}

#[tokio::test]
async fn delete_nonexistent_bead_is_idempotent() {
    let pool = setup_test_db().await;
    let repo = SqliteBeadRepository::new(pool.clone());

    repo.delete_bead("ghost").await.expect("deleting a missing bead should be a no-op, not an error");

    teardown_test_db(pool).await;
}

#[tokio::test]
async fn dependencies_and_children_round_trip() {
    let pool = setup_test_db().await;
    let repo = SqliteBeadRepository::new(pool.clone());

    let b1 = repo.create_bead(NewBead { title: "b1".to_string(), ..Default::default() }).await.unwrap();
    let b2 = repo.create_bead(NewBead { title: "b2".to_string(), ..Default::default() }).await.unwrap();

    repo.add_dependency(&b2.id, &b1.id, DependencyType::Blocks).await.unwrap();

    let deps = repo.list_dependencies(&b2.id).await.unwrap();
    assert_eq!(deps.len(), 1);
    assert_eq!(deps[0].depends_on_bead_id, b1.id);
    assert_eq!(deps[0].dependency_type, DependencyType::Blocks);

    teardown_test_db(pool).await;
}

#[tokio::test]
async fn bead_events_log_and_list() {
    let pool = setup_test_db().await;
    let repo = SqliteBeadRepository::new(pool.clone());

    let bead = repo.create_bead(NewBead { title: "with events".to_string(), ..Default::default() }).await.unwrap();
    repo.log_bead_event(NewBeadEvent {
        bead_id: bead.id.clone(),
        agent_id: None,
        event_type: BeadEventType::StatusChanged,
        old_value: Some("open".to_string()),
        new_value: Some("in_progress".to_string()),
        metadata: None,
    })
    .await
    .unwrap();

    let events = repo
        .list_bead_events(BeadEventFilter { bead_id: Some(bead.id.clone()), since: None, limit: None })
        .await
        .unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, BeadEventType::StatusChanged);

    teardown_test_db(pool).await;
}

#[tokio::test]
async fn patch_metadata_sets_single_key() {
    let pool = setup_test_db().await;
    let repo = SqliteBeadRepository::new(pool.clone());

    let bead = repo.create_bead(NewBead { title: "meta".to_string(), ..Default::default() }).await.unwrap();
    repo.patch_metadata(&bead.id, "molecule_bead_id", serde_json::json!("M1")).await.unwrap();

    let fetched = repo.get_bead(&bead.id).await.unwrap().unwrap();
    assert_eq!(fetched.metadata["molecule_bead_id"], "M1");

    teardown_test_db(pool).await;
}
