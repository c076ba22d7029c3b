//! `Town` — the composition root binding one town's store, services, and
//! scheduler together.
//!
//! Concurrency: a `tokio::sync::Mutex<()>` write-gate is held across every
//! mutating call's SQL + event-log writes, giving a single-writer
//! guarantee without a dedicated actor thread. It is never held across an
//! outbound container-runtime await.

use std::sync::Arc;

use sqlx::SqlitePool;
use tokio::sync::Mutex;
use tracing::instrument;

use crate::adapters::sqlite::{
    self, SqliteAgentRepository, SqliteBeadRepository, SqliteKvStore, SqliteSatelliteRepository,
};
use crate::auth::TokenCodec;
use crate::domain::errors::TownResult;
use crate::domain::ports::{ContainerRuntime, RigRegistry};
use crate::scheduler::{TickContext, TickReport};
use crate::services::{SlingRequest, SlingResult};

pub struct Town {
    pool: SqlitePool,
    write_gate: Mutex<()>,
    pub beads: SqliteBeadRepository,
    pub agents: SqliteAgentRepository,
    pub satellites: SqliteSatelliteRepository,
    pub kv: SqliteKvStore,
    pub runtime: Arc<dyn ContainerRuntime>,
    pub tokens: Arc<dyn TokenCodec>,
    pub rigs: Arc<dyn RigRegistry>,
    pub town_id: String,
    pub user_id: String,
}

impl Town {
    pub fn new(
        pool: SqlitePool,
        runtime: Arc<dyn ContainerRuntime>,
        tokens: Arc<dyn TokenCodec>,
        rigs: Arc<dyn RigRegistry>,
        town_id: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            beads: SqliteBeadRepository::new(pool.clone()),
            agents: SqliteAgentRepository::new(pool.clone()),
            satellites: SqliteSatelliteRepository::new(pool.clone()),
            kv: SqliteKvStore::new(pool.clone()),
            pool,
            write_gate: Mutex::new(()),
            runtime,
            tokens,
            rigs,
            town_id: town_id.into(),
            user_id: user_id.into(),
        }
    }

    /// Runs embedded schema migrations inside the write gate.
    #[instrument(skip(self))]
    pub async fn migrate(&self) -> TownResult<usize> {
        let _guard = self.write_gate.lock().await;
        sqlite::Migrator::new(self.pool.clone())
            .run_embedded_migrations()
            .await
            .map_err(|e| crate::domain::errors::TownError::Database(sqlx::Error::Configuration(e.to_string().into())))
    }

    fn tick_context(&self) -> TickContext<'_> {
        TickContext {
            beads: &self.beads,
            agents: &self.agents,
            satellites: &self.satellites,
            runtime: self.runtime.as_ref(),
            kv: &self.kv,
            tokens: self.tokens.as_ref(),
            town_id: self.town_id.clone(),
            user_id: self.user_id.clone(),
        }
    }

    /// Runs one scheduler tick under the write gate.
    #[instrument(skip(self))]
    pub async fn tick(&self) -> TownResult<TickReport> {
        let _guard = self.write_gate.lock().await;
        crate::scheduler::run_tick(&self.tick_context()).await
    }

    #[instrument(skip(self, request))]
    pub async fn sling(&self, request: SlingRequest) -> TownResult<SlingResult> {
        let _guard = self.write_gate.lock().await;
        crate::services::sling::sling_bead(&self.beads, &self.agents, &self.kv, &self.town_id, request).await
    }
}
