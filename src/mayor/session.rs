//! Mayor conversational session manager.
//!
//! The mayor is a town-level persistent agent, not bead-driven: all state
//! lives in two KV rows (`mayorConfig`, `mayorSession`) rather than in the
//! bead store.

use std::collections::BTreeMap;

use chrono::Utc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::auth::{build_claims, TokenCodec};
use crate::domain::errors::TownResult;
use crate::domain::models::{MayorConfig, MayorSession, MayorSessionStatus, MayorStatus};
use crate::domain::ports::{
    keys, ContainerRuntime, KvStore, RuntimeAgentStatus, SendMessageRequest, StartAgentRequest,
};

use crate::scheduler::alarm;
use crate::scheduler::constants::{MAYOR_ALARM_INTERVAL, MAYOR_SESSION_STALE, MAYOR_TOKEN_TTL};

pub struct MayorSessionManager<'a> {
    pub kv: &'a dyn KvStore,
    pub runtime: &'a dyn ContainerRuntime,
    pub tokens: &'a dyn TokenCodec,
}

const MAYOR_SYSTEM_PROMPT: &str =
    "You are the Gastown mayor: a conversational assistant that helps the \
     user manage their rigs, beads, and agents.";

impl<'a> MayorSessionManager<'a> {
    pub fn new(kv: &'a dyn KvStore, runtime: &'a dyn ContainerRuntime, tokens: &'a dyn TokenCodec) -> Self {
        Self { kv, runtime, tokens }
    }

    #[instrument(skip(self, config))]
    pub async fn configure(&self, config: MayorConfig) -> TownResult<()> {
        self.kv.set(keys::MAYOR_CONFIG, &serde_json::to_string(&config)?).await
    }

    async fn load_config(&self) -> TownResult<Option<MayorConfig>> {
        match self.kv.get(keys::MAYOR_CONFIG).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn load_session(&self) -> TownResult<Option<MayorSession>> {
        match self.kv.get(keys::MAYOR_SESSION).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn save_session(&self, session: &MayorSession) -> TownResult<()> {
        self.kv.set(keys::MAYOR_SESSION, &serde_json::to_string(session)?).await
    }

    async fn clear_session(&self) -> TownResult<()> {
        self.kv.delete(keys::MAYOR_SESSION).await
    }

    #[instrument(skip(self, message))]
    pub async fn send_message(&self, message: String, model: Option<String>) -> TownResult<()> {
        let config = self
            .load_config()
            .await?
            .ok_or_else(|| crate::domain::errors::TownError::Conflict("MayorNotConfigured"))?;

        let mut session = self.load_session().await?;
        if let Some(existing) = &session {
            if self.runtime.agent_status(&existing.agent_id).await.map(|s| s.status).unwrap_or(RuntimeAgentStatus::Unknown)
                != RuntimeAgentStatus::Running
            {
                self.clear_session().await?;
                session = None;
            }
        }

        match session {
            None => {
                self.start_session(&config, &message, model).await?;
            }
            Some(existing) => {
                match self.runtime.send_message(&existing.agent_id, SendMessageRequest { prompt: message.clone() }).await {
                    Ok(()) => {
                        let updated = MayorSession {
                            status: MayorSessionStatus::Active,
                            last_activity_at: Utc::now(),
                            ..existing
                        };
                        self.save_session(&updated).await?;
                        alarm::arm_mayor_alarm(self.kv, MAYOR_ALARM_INTERVAL).await?;
                    }
                    Err(err) => {
                        warn!(%err, "mayor send_message failed, recreating session");
                        self.clear_session().await?;
                        self.start_session(&config, &message, model).await?;
                    }
                }
            }
        }

        Ok(())
    }

    async fn start_session(&self, config: &MayorConfig, first_message: &str, model: Option<String>) -> TownResult<()> {
        let agent_id = Uuid::new_v4().to_string();
        let rig_id = format!("mayor-{}", config.town_id);
        let claims = build_claims(&agent_id, &rig_id, &config.town_id, &config.user_id, MAYOR_TOKEN_TTL);
        let token = self.tokens.mint(claims)?;

        let mut env_vars = BTreeMap::new();
        env_vars.insert("GASTOWN_SESSION_TOKEN".to_string(), token);
        env_vars.insert("GASTOWN_AGENT_ROLE".to_string(), "mayor".to_string());
        if let Ok(api_url) = std::env::var("GASTOWN_API_URL") {
            env_vars.insert(
                "GASTOWN_COMPLETION_CALLBACK_URL".to_string(),
                format!("{api_url}/api/towns/{}/mayor/completed", config.town_id),
            );
        }
        if let Some(kilocode_token) = &config.kilocode_token {
            env_vars.insert("KILOCODE_TOKEN".to_string(), kilocode_token.clone());
        }

        self.runtime
            .start_agent(StartAgentRequest {
                agent_id: agent_id.clone(),
                rig_id,
                town_id: config.town_id.clone(),
                role: "mayor".to_string(),
                name: "Mayor".to_string(),
                identity: format!("mayor@{}", config.town_id),
                prompt: first_message.to_string(),
                model,
                system_prompt: Some(MAYOR_SYSTEM_PROMPT.to_string()),
                git_url: config.git_url.clone(),
                branch: config.default_branch.clone(),
                default_branch: Some(config.default_branch.clone()),
                env_vars,
            })
            .await?;

        let session = MayorSession {
            agent_id,
            session_id: Uuid::new_v4().to_string(),
            status: MayorSessionStatus::Starting,
            last_activity_at: Utc::now(),
        };
        self.save_session(&session).await?;
        alarm::arm_mayor_alarm(self.kv, MAYOR_ALARM_INTERVAL).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn status(&self) -> TownResult<MayorStatus> {
        let config = self.load_config().await?;
        let session = self.load_session().await?;
        Ok(MayorStatus {
            configured: config.is_some(),
            town_id: config.map(|c| c.town_id),
            session,
        })
    }

    #[instrument(skip(self))]
    pub async fn agent_completed(&self, agent_id: &str) -> TownResult<()> {
        if let Some(session) = self.load_session().await? {
            if session.agent_id == agent_id {
                self.clear_session().await?;
                alarm::disarm_mayor_alarm(self.kv).await?;
            }
        }
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn destroy(&self) -> TownResult<()> {
        if let Some(session) = self.load_session().await? {
            let _ = self.runtime.stop_agent(&session.agent_id, crate::domain::ports::StopAgentOptions { signal: None }).await;
        }
        self.clear_session().await?;
        alarm::disarm_mayor_alarm(self.kv).await?;
        Ok(())
    }

    /// Mayor alarm tick: clears stale sessions, otherwise
    /// confirms liveness and rearms.
    #[instrument(skip(self))]
    pub async fn tick(&self) -> TownResult<()> {
        let (Some(_config), Some(session)) = (self.load_config().await?, self.load_session().await?) else {
            return Ok(());
        };

        let stale_after = chrono::Duration::from_std(MAYOR_SESSION_STALE).unwrap();
        if Utc::now() - session.last_activity_at > stale_after {
            let _ = self.runtime.stop_agent(&session.agent_id, crate::domain::ports::StopAgentOptions { signal: None }).await;
            self.clear_session().await?;
            return Ok(());
        }

        match self.runtime.agent_status(&session.agent_id).await {
            Ok(status) if status.status == RuntimeAgentStatus::Running => {
                alarm::arm_mayor_alarm(self.kv, MAYOR_ALARM_INTERVAL).await?;
            }
            _ => {
                self.clear_session().await?;
            }
        }

        info!("mayor tick complete");
        Ok(())
    }
}
