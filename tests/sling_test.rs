mod helpers;

use gastown_town::adapters::sqlite::{SqliteAgentRepository, SqliteBeadRepository, SqliteKvStore};
use gastown_town::domain::models::{AgentRole, AgentStatus, BeadStatus, BeadType};
use gastown_town::domain::ports::{AgentRepository, KvStore};
use gastown_town::scheduler::alarm;
use gastown_town::services::sling::{sling_bead, SlingRequest};
use helpers::database::{setup_test_db, teardown_test_db};

/// S1 — happy path sling: no existing polecats, a fresh bead+agent are
/// created, hooked to each other, and the alarm is armed.
#[tokio::test]
async fn happy_path_sling_creates_and_hooks_agent() {
    let pool = setup_test_db().await;
    let beads = SqliteBeadRepository::new(pool.clone());
    let agents = SqliteAgentRepository::new(pool.clone());
    let kv = SqliteKvStore::new(pool.clone());

    let result = sling_bead(
        &beads,
        &agents,
        &kv,
        "town-1",
        SlingRequest {
            title: "Fix widget".to_string(),
            body: None,
            metadata: None,
            rig_id: Some("R1".to_string()),
        },
    )
    .await
    .expect("sling should succeed");

    assert_eq!(result.bead.bead_type, BeadType::Issue);
    assert_eq!(result.bead.status, BeadStatus::InProgress);
    assert_eq!(result.agent.role, AgentRole::Polecat);
    assert_eq!(result.agent.status, AgentStatus::Idle);
    assert_eq!(result.agent.current_hook_bead_id.as_deref(), Some(result.bead.id.as_str()));

    assert!(alarm::next_alarm(&kv).await.unwrap().is_some(), "sling must arm the alarm");

    teardown_test_db(pool).await;
}

#[tokio::test]
async fn sling_reuses_idle_polecat_instead_of_spawning_another() {
    let pool = setup_test_db().await;
    let beads = SqliteBeadRepository::new(pool.clone());
    let agents = SqliteAgentRepository::new(pool.clone());
    let kv = SqliteKvStore::new(pool.clone());

    let first = sling_bead(
        &beads,
        &agents,
        &kv,
        "town-1",
        SlingRequest { title: "one".to_string(), body: None, metadata: None, rig_id: Some("R1".to_string()) },
    )
    .await
    .unwrap();

    // Free the first agent up before slinging again.
    agents.unhook_bead(&first.agent.id).await.unwrap();
    agents.update_agent_status(&first.agent.id, AgentStatus::Idle).await.unwrap();

    let second = sling_bead(
        &beads,
        &agents,
        &kv,
        "town-1",
        SlingRequest { title: "two".to_string(), body: None, metadata: None, rig_id: Some("R1".to_string()) },
    )
    .await
    .unwrap();

    assert_eq!(first.agent.id, second.agent.id);

    teardown_test_db(pool).await;
}
