mod helpers;

use gastown_town::adapters::sqlite::{SqliteAgentRepository, SqliteBeadRepository};
use gastown_town::domain::models::{AgentFilter, AgentRole, AgentStatus, NewAgent, NewBead, POLECAT_NAME_POOL};
use gastown_town::domain::ports::{get_or_create_agent, AgentRepository, BeadRepository};
use helpers::database::{setup_test_db, teardown_test_db};

#[tokio::test]
async fn register_and_get_agent() {
    let pool = setup_test_db().await;
    let repo = SqliteAgentRepository::new(pool.clone());

    let agent = repo
        .register_agent(NewAgent {
            role: AgentRole::Polecat,
            name: "Toast".to_string(),
            identity: "toast-polecat@abc".to_string(),
            rig_id: Some("R1".to_string()),
        })
        .await
        .expect("register_agent failed");

    assert_eq!(agent.status, AgentStatus::Idle);
    assert_eq!(agent.dispatch_attempts, 0);

    let fetched = repo.get_agent(&agent.id).await.unwrap().expect("agent should exist");
    assert_eq!(fetched.name, "Toast");

    teardown_test_db(pool).await;
}

#[tokio::test]
async fn hook_bead_is_noop_when_already_hooked_to_same_bead() {
    let pool = setup_test_db().await;
    let agents = SqliteAgentRepository::new(pool.clone());
    let beads = SqliteBeadRepository::new(pool.clone());

    let agent = agents
        .register_agent(NewAgent {
            role: AgentRole::Polecat,
            name: "Toast".to_string(),
            identity: "toast@abc".to_string(),
            rig_id: None,
        })
        .await
        .unwrap();
    let bead = beads.create_bead(NewBead { title: "work".to_string(), ..Default::default() }).await.unwrap();

    agents.hook_bead(&agent.id, &bead.id).await.unwrap();
    let again = agents.hook_bead(&agent.id, &bead.id).await.expect("re-hooking the same bead is a no-op");
    assert_eq!(again.current_hook_bead_id.as_deref(), Some(bead.id.as_str()));

    teardown_test_db(pool).await;
}

#[tokio::test]
async fn hook_bead_conflicts_when_hooked_elsewhere() {
    let pool = setup_test_db().await;
    let agents = SqliteAgentRepository::new(pool.clone());
    let beads = SqliteBeadRepository::new(pool.clone());

    let agent = agents
        .register_agent(NewAgent {
            role: AgentRole::Polecat,
            name: "Toast".to_string(),
            identity: "toast@abc".to_string(),
            rig_id: None,
        })
        .await
        .unwrap();
    let b1 = beads.create_bead(NewBead { title: "b1".to_string(), ..Default::default() }).await.unwrap();
    let b2 = beads.create_bead(NewBead { title: "b2".to_string(), ..Default::default() }).await.unwrap();

    agents.hook_bead(&agent.id, &b1.id).await.unwrap();
    let result = agents.hook_bead(&agent.id, &b2.id).await;
    assert!(result.is_err(), "hooking a different bead while already hooked should fail");

    teardown_test_db(pool).await;
}

#[tokio::test]
async fn hook_nonexistent_bead_fails() {
    let pool = setup_test_db().await;
    let agents = SqliteAgentRepository::new(pool.clone());

    let agent = agents
        .register_agent(NewAgent {
            role: AgentRole::Polecat,
            name: "Toast".to_string(),
            identity: "toast@abc".to_string(),
            rig_id: None,
        })
        .await
        .unwrap();

    let result = agents.hook_bead(&agent.id, "ghost-bead").await;
    assert!(result.is_err());

    teardown_test_db(pool).await;
}

#[tokio::test]
async fn unhook_unhooked_agent_is_noop() {
    let pool = setup_test_db().await;
    let agents = SqliteAgentRepository::new(pool.clone());

    let agent = agents
        .register_agent(NewAgent {
            role: AgentRole::Polecat,
            name: "Toast".to_string(),
            identity: "toast@abc".to_string(),
            rig_id: None,
        })
        .await
        .unwrap();

    let result = agents.unhook_bead(&agent.id).await.expect("unhooking an unhooked agent should be a no-op");
    assert!(result.current_hook_bead_id.is_none());

    teardown_test_db(pool).await;
}

#[tokio::test]
async fn delete_bead_unhooks_assigned_agent() {
    let pool = setup_test_db().await;
    let agents = SqliteAgentRepository::new(pool.clone());
    let beads = SqliteBeadRepository::new(pool.clone());

    let agent = agents
        .register_agent(NewAgent {
            role: AgentRole::Polecat,
            name: "Toast".to_string(),
            identity: "toast@abc".to_string(),
            rig_id: None,
        })
        .await
        .unwrap();
    let bead = beads.create_bead(NewBead { title: "work".to_string(), ..Default::default() }).await.unwrap();
    agents.hook_bead(&agent.id, &bead.id).await.unwrap();

    beads.delete_bead(&bead.id).await.unwrap();

    let refreshed = agents.get_agent(&agent.id).await.unwrap().unwrap();
    assert!(refreshed.current_hook_bead_id.is_none());

    teardown_test_db(pool).await;
}

#[tokio::test]
async fn get_or_create_agent_reuses_singleton_role() {
    let pool = setup_test_db().await;
    let agents = SqliteAgentRepository::new(pool.clone());

    let first = get_or_create_agent(&agents, AgentRole::Witness, Some("R1"), "town-1").await.unwrap();
    let second = get_or_create_agent(&agents, AgentRole::Witness, Some("R1"), "town-1").await.unwrap();

    assert_eq!(first.id, second.id);

    let all = agents.list_agents(AgentFilter { role: Some(AgentRole::Witness), ..Default::default() }).await.unwrap();
    assert_eq!(all.len(), 1);

    teardown_test_db(pool).await;
}

#[tokio::test]
async fn get_or_create_agent_reuses_idle_unhooked_polecat() {
    let pool = setup_test_db().await;
    let agents = SqliteAgentRepository::new(pool.clone());

    let first = get_or_create_agent(&agents, AgentRole::Polecat, Some("R1"), "town-1").await.unwrap();
    let second = get_or_create_agent(&agents, AgentRole::Polecat, Some("R1"), "town-1").await.unwrap();

    assert_eq!(first.id, second.id, "an idle, unhooked polecat should be reused rather than spawning a new one");

    teardown_test_db(pool).await;
}

#[tokio::test]
async fn polecat_name_pool_falls_back_after_twenty() {
    let pool = setup_test_db().await;
    let agents = SqliteAgentRepository::new(pool.clone());

    let mut names = Vec::new();
    for _ in 0..POLECAT_NAME_POOL.len() {
        let name = agents.allocate_polecat_name().await.unwrap();
        agents
            .register_agent(NewAgent {
                role: AgentRole::Polecat,
                name: name.clone(),
                identity: format!("{name}@abc"),
                rig_id: None,
            })
            .await
            .unwrap();
        names.push(name);
    }
    assert_eq!(names.len(), 20);
    assert!(names.iter().all(|n| POLECAT_NAME_POOL.contains(&n.as_str())));

    let twenty_first = agents.allocate_polecat_name().await.unwrap();
    assert_eq!(twenty_first, "Polecat-21");

    teardown_test_db(pool).await;
}

#[tokio::test]
async fn dispatch_attempts_increment_and_reset() {
    let pool = setup_test_db().await;
    let agents = SqliteAgentRepository::new(pool.clone());

    let agent = agents
        .register_agent(NewAgent {
            role: AgentRole::Polecat,
            name: "Toast".to_string(),
            identity: "toast@abc".to_string(),
            rig_id: None,
        })
        .await
        .unwrap();

    let n1 = agents.increment_dispatch_attempts(&agent.id).await.unwrap();
    let n2 = agents.increment_dispatch_attempts(&agent.id).await.unwrap();
    assert_eq!((n1, n2), (1, 2));

    agents.reset_dispatch_attempts(&agent.id).await.unwrap();
    let refreshed = agents.get_agent(&agent.id).await.unwrap().unwrap();
    assert_eq!(refreshed.dispatch_attempts, 0);

    teardown_test_db(pool).await;
}

#[tokio::test]
async fn checkpoint_write_and_read_round_trip() {
    let pool = setup_test_db().await;
    let agents = SqliteAgentRepository::new(pool.clone());

    let agent = agents
        .register_agent(NewAgent {
            role: AgentRole::Polecat,
            name: "Toast".to_string(),
            identity: "toast@abc".to_string(),
            rig_id: None,
        })
        .await
        .unwrap();

    assert!(agents.read_checkpoint(&agent.id).await.unwrap().is_none());

    agents.write_checkpoint(&agent.id, serde_json::json!({"step": 2})).await.unwrap();
    let checkpoint = agents.read_checkpoint(&agent.id).await.unwrap().unwrap();
    assert_eq!(checkpoint, serde_json::json!({"step": 2}));

    teardown_test_db(pool).await;
}

#[tokio::test]
async fn list_agents_filters_by_role_and_status() {
    let pool = setup_test_db().await;
    let agents = SqliteAgentRepository::new(pool.clone());

    agents
        .register_agent(NewAgent { role: AgentRole::Polecat, name: "A".to_string(), identity: "a@x".to_string(), rig_id: None })
        .await
        .unwrap();
    let refinery = agents
        .register_agent(NewAgent { role: AgentRole::Refinery, name: "R".to_string(), identity: "r@x".to_string(), rig_id: None })
        .await
        .unwrap();
    agents.update_agent_status(&refinery.id, AgentStatus::Working).await.unwrap();

    let polecats = agents.list_agents(AgentFilter { role: Some(AgentRole::Polecat), ..Default::default() }).await.unwrap();
    assert_eq!(polecats.len(), 1);

    let working = agents.list_agents(AgentFilter { status: Some(AgentStatus::Working), ..Default::default() }).await.unwrap();
    assert_eq!(working.len(), 1);
    assert_eq!(working[0].id, refinery.id);

    teardown_test_db(pool).await;
}

