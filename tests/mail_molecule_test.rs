mod helpers;

use gastown_town::adapters::sqlite::{SqliteAgentRepository, SqliteBeadRepository};
use gastown_town::domain::models::{AgentRole, BeadStatus, NewAgent, NewMail};
use gastown_town::domain::ports::{AgentRepository, BeadRepository};
use gastown_town::services::mail::{check_mail, send_mail};
use gastown_town::services::molecule::{advance_molecule_step, create_molecule, get_molecule};
use helpers::database::{setup_test_db, teardown_test_db};

async fn register(agents: &SqliteAgentRepository, name: &str) -> gastown_town::domain::models::Agent {
    agents
        .register_agent(NewAgent {
            role: AgentRole::Polecat,
            name: name.to_string(),
            identity: format!("{name}@abc"),
            rig_id: None,
        })
        .await
        .unwrap()
}

/// S5 — mail delivery: one round trip then an empty drain.
#[tokio::test]
async fn check_mail_drains_once_then_returns_empty() {
    let pool = setup_test_db().await;
    let beads = SqliteBeadRepository::new(pool.clone());
    let agents = SqliteAgentRepository::new(pool.clone());

    let a1 = register(&agents, "A1").await;
    let a2 = register(&agents, "A2").await;

    send_mail(
        &beads,
        &agents,
        NewMail { from: a1.id.clone(), to: a2.id.clone(), subject: "hi".to_string(), body: "yo".to_string() },
    )
    .await
    .unwrap();

    let first = check_mail(&beads, &a2.id).await.unwrap();
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].subject, "hi");
    assert_eq!(first[0].body.as_deref(), Some("yo"));
    assert_eq!(first[0].from.as_deref(), Some(a1.id.as_str()));

    let second = check_mail(&beads, &a2.id).await.unwrap();
    assert!(second.is_empty());

    teardown_test_db(pool).await;
}

#[tokio::test]
async fn check_mail_closes_the_message_bead() {
    let pool = setup_test_db().await;
    let beads = SqliteBeadRepository::new(pool.clone());
    let agents = SqliteAgentRepository::new(pool.clone());

    let a1 = register(&agents, "A1").await;
    let a2 = register(&agents, "A2").await;

    send_mail(
        &beads,
        &agents,
        NewMail { from: a1.id.clone(), to: a2.id.clone(), subject: "hi".to_string(), body: "yo".to_string() },
    )
    .await
    .unwrap();

    let delivered = check_mail(&beads, &a2.id).await.unwrap();
    let bead = beads.get_bead(&delivered[0].bead_id).await.unwrap().unwrap();
    assert_eq!(bead.status, BeadStatus::Closed);

    teardown_test_db(pool).await;
}

/// S6 — molecule linear advance: two steps, advanced in order.
#[tokio::test]
async fn molecule_linear_advance_completes_and_closes() {
    let pool = setup_test_db().await;
    let beads = SqliteBeadRepository::new(pool.clone());
    let agents = SqliteAgentRepository::new(pool.clone());

    let source = beads
        .create_bead(gastown_town::domain::models::NewBead { title: "B3".to_string(), ..Default::default() })
        .await
        .unwrap();

    let molecule = create_molecule(&beads, &source.id, vec!["step1".to_string(), "step2".to_string()])
        .await
        .unwrap();
    assert_eq!(molecule.step_bead_ids.len(), 2);

    let projection = get_molecule(&beads, &molecule.id).await.unwrap();
    assert_eq!(projection.current_step, 0);
    assert_eq!(projection.status, gastown_town::domain::models::MoleculeStatus::Active);

    let agent = register(&agents, "Worker").await;

    agents.hook_bead(&agent.id, &molecule.step_bead_ids[0]).await.unwrap();
    let after_first = advance_molecule_step(&beads, &agents, &agent.id).await.unwrap();
    assert!(after_first.is_some());

    agents.unhook_bead(&agent.id).await.unwrap();
    agents.hook_bead(&agent.id, &molecule.step_bead_ids[1]).await.unwrap();
    let after_second = advance_molecule_step(&beads, &agents, &agent.id).await.unwrap().unwrap();

    assert_eq!(after_second.current_step, 2);
    assert_eq!(after_second.status, gastown_town::domain::models::MoleculeStatus::Completed);

    let molecule_bead = beads.get_bead(&molecule.id).await.unwrap().unwrap();
    assert_eq!(molecule_bead.status, BeadStatus::Closed);

    teardown_test_db(pool).await;
}

#[tokio::test]
async fn advance_molecule_step_is_noop_when_agent_unhooked() {
    let pool = setup_test_db().await;
    let beads = SqliteBeadRepository::new(pool.clone());
    let agents = SqliteAgentRepository::new(pool.clone());

    let agent = register(&agents, "Idle").await;
    let result = advance_molecule_step(&beads, &agents, &agent.id).await.unwrap();
    assert!(result.is_none());

    teardown_test_db(pool).await;
}
