mod helpers;

use gastown_town::adapters::sqlite::{SqliteAgentRepository, SqliteBeadRepository, SqliteKvStore, SqliteSatelliteRepository};
use gastown_town::auth::HmacTokenCodec;
use gastown_town::domain::models::{AgentRole, AgentStatus, NewAgent, NewBead};
use gastown_town::domain::ports::{AgentRepository, AgentStatusResponse, BeadRepository, RuntimeAgentStatus};
use gastown_town::scheduler::tick::{run_tick, TickContext};
use helpers::database::{setup_test_db, teardown_test_db};
use helpers::fakes::FakeContainerRuntime;

/// S2 — circuit breaker trip after 5 consecutive StartAgent failures.
#[tokio::test]
async fn circuit_breaker_trips_after_five_failed_dispatches() {
    let pool = setup_test_db().await;
    let beads = SqliteBeadRepository::new(pool.clone());
    let agents = SqliteAgentRepository::new(pool.clone());
    let satellites = SqliteSatelliteRepository::new(pool.clone());
    let kv = SqliteKvStore::new(pool.clone());
    let runtime = FakeContainerRuntime::new();
    let tokens = HmacTokenCodec::new(b"test-secret".to_vec());

    let bead = beads.create_bead(NewBead { title: "B1".to_string(), ..Default::default() }).await.unwrap();
    let agent = agents
        .register_agent(NewAgent { role: AgentRole::Polecat, name: "Toast".to_string(), identity: "toast@abc".to_string(), rig_id: None })
        .await
        .unwrap();
    agents.hook_bead(&agent.id, &bead.id).await.unwrap();

    runtime.set_start_agent_fails(true);

    let ctx = TickContext {
        beads: &beads,
        agents: &agents,
        satellites: &satellites,
        runtime: &runtime,
        kv: &kv,
        tokens: &tokens,
        town_id: "town-1".to_string(),
        user_id: "user-1".to_string(),
    };

    for _ in 0..5 {
        run_tick(&ctx).await.unwrap();
    }

    let mid = agents.get_agent(&agent.id).await.unwrap().unwrap();
    assert_eq!(mid.dispatch_attempts, 5);
    assert_eq!(mid.current_hook_bead_id.as_deref(), Some(bead.id.as_str()));

    let report = run_tick(&ctx).await.unwrap();
    assert_eq!(report.circuit_broken, 1);

    let final_bead = beads.get_bead(&bead.id).await.unwrap().unwrap();
    assert_eq!(final_bead.status, gastown_town::domain::models::BeadStatus::Failed);

    let final_agent = agents.get_agent(&agent.id).await.unwrap().unwrap();
    assert!(final_agent.current_hook_bead_id.is_none());
    assert_eq!(final_agent.status, AgentStatus::Idle);

    teardown_test_db(pool).await;
}

/// S3 — crash recovery within a single tick: a working agent whose runtime
/// probe returns not_found is reset to idle (keeping its hook) by pass A,
/// then immediately re-dispatched by pass B.
#[tokio::test]
async fn crashed_agent_recovers_and_redispatches_in_one_tick() {
    let pool = setup_test_db().await;
    let beads = SqliteBeadRepository::new(pool.clone());
    let agents = SqliteAgentRepository::new(pool.clone());
    let satellites = SqliteSatelliteRepository::new(pool.clone());
    let kv = SqliteKvStore::new(pool.clone());
    let runtime = FakeContainerRuntime::new();
    let tokens = HmacTokenCodec::new(b"test-secret".to_vec());

    let bead = beads.create_bead(NewBead { title: "B1".to_string(), ..Default::default() }).await.unwrap();
    let agent = agents
        .register_agent(NewAgent { role: AgentRole::Polecat, name: "Toast".to_string(), identity: "toast@abc".to_string(), rig_id: None })
        .await
        .unwrap();
    agents.hook_bead(&agent.id, &bead.id).await.unwrap();
    agents.update_agent_status(&agent.id, AgentStatus::Working).await.unwrap();
    agents.touch_agent(&agent.id).await.unwrap();

    runtime.set_status(Some(AgentStatusResponse { status: RuntimeAgentStatus::NotFound, exit_reason: None }));

    let ctx = TickContext {
        beads: &beads,
        agents: &agents,
        satellites: &satellites,
        runtime: &runtime,
        kv: &kv,
        tokens: &tokens,
        town_id: "town-1".to_string(),
        user_id: "user-1".to_string(),
    };

    run_tick(&ctx).await.unwrap();

    let recovered = agents.get_agent(&agent.id).await.unwrap().unwrap();
    assert_eq!(recovered.status, AgentStatus::Working, "pass B should have re-dispatched within the same tick");
    assert_eq!(recovered.current_hook_bead_id.as_deref(), Some(bead.id.as_str()));
    assert_eq!(runtime.start_agent_call_count(), 1);

    teardown_test_db(pool).await;
}
