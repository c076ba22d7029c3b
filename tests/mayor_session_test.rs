mod helpers;

use gastown_town::adapters::sqlite::SqliteKvStore;
use gastown_town::auth::HmacTokenCodec;
use gastown_town::domain::models::{MayorConfig, MayorSessionStatus};
use gastown_town::domain::ports::{AgentStatusResponse, RuntimeAgentStatus};
use gastown_town::mayor::session::MayorSessionManager;
use helpers::database::{setup_test_db, teardown_test_db};
use helpers::fakes::FakeContainerRuntime;

fn config() -> MayorConfig {
    MayorConfig {
        town_id: "town-1".to_string(),
        user_id: "user-1".to_string(),
        git_url: None,
        default_branch: "main".to_string(),
        kilocode_token: None,
    }
}

#[tokio::test]
async fn send_message_starts_a_session_when_none_exists() {
    let pool = setup_test_db().await;
    let kv = SqliteKvStore::new(pool.clone());
    let runtime = FakeContainerRuntime::new();
    let tokens = HmacTokenCodec::new(b"test-secret".to_vec());
    let manager = MayorSessionManager::new(&kv, &runtime, &tokens);

    manager.configure(config()).await.unwrap();
    manager.send_message("hello".to_string(), None).await.unwrap();

    let status = manager.status().await.unwrap();
    assert!(status.configured);
    let session = status.session.expect("a session should have been started");
    assert_eq!(session.status, MayorSessionStatus::Starting);
    assert_eq!(runtime.start_agent_call_count(), 1);

    teardown_test_db(pool).await;
}

#[tokio::test]
async fn send_message_reuses_an_existing_running_session() {
    let pool = setup_test_db().await;
    let kv = SqliteKvStore::new(pool.clone());
    let runtime = FakeContainerRuntime::new();
    let tokens = HmacTokenCodec::new(b"test-secret".to_vec());
    let manager = MayorSessionManager::new(&kv, &runtime, &tokens);

    manager.configure(config()).await.unwrap();
    manager.send_message("first".to_string(), None).await.unwrap();
    runtime.set_status(Some(AgentStatusResponse { status: RuntimeAgentStatus::Running, exit_reason: None }));

    manager.send_message("second".to_string(), None).await.unwrap();

    assert_eq!(runtime.start_agent_call_count(), 1, "an active session should be reused, not restarted");

    let status = manager.status().await.unwrap();
    assert_eq!(status.session.unwrap().status, MayorSessionStatus::Active);

    teardown_test_db(pool).await;
}

#[tokio::test]
async fn send_message_without_configure_fails() {
    let pool = setup_test_db().await;
    let kv = SqliteKvStore::new(pool.clone());
    let runtime = FakeContainerRuntime::new();
    let tokens = HmacTokenCodec::new(b"test-secret".to_vec());
    let manager = MayorSessionManager::new(&kv, &runtime, &tokens);

    let result = manager.send_message("hello".to_string(), None).await;
    assert!(result.is_err());

    teardown_test_db(pool).await;
}

#[tokio::test]
async fn agent_completed_clears_matching_session_only() {
    let pool = setup_test_db().await;
    let kv = SqliteKvStore::new(pool.clone());
    let runtime = FakeContainerRuntime::new();
    let tokens = HmacTokenCodec::new(b"test-secret".to_vec());
    let manager = MayorSessionManager::new(&kv, &runtime, &tokens);

    manager.configure(config()).await.unwrap();
    manager.send_message("hello".to_string(), None).await.unwrap();

    manager.agent_completed("some-other-agent").await.unwrap();
    assert!(manager.status().await.unwrap().session.is_some(), "unrelated agent completion must not clear the session");

    let agent_id = manager.status().await.unwrap().session.unwrap().agent_id;
    manager.agent_completed(&agent_id).await.unwrap();
    assert!(manager.status().await.unwrap().session.is_none());

    teardown_test_db(pool).await;
}

#[tokio::test]
async fn destroy_stops_the_agent_and_clears_session() {
    let pool = setup_test_db().await;
    let kv = SqliteKvStore::new(pool.clone());
    let runtime = FakeContainerRuntime::new();
    let tokens = HmacTokenCodec::new(b"test-secret".to_vec());
    let manager = MayorSessionManager::new(&kv, &runtime, &tokens);

    manager.configure(config()).await.unwrap();
    manager.send_message("hello".to_string(), None).await.unwrap();

    manager.destroy().await.unwrap();
    assert!(manager.status().await.unwrap().session.is_none());

    teardown_test_db(pool).await;
}
