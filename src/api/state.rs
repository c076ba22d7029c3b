//! Shared router state: one process serves one town, so the state is just
//! the already-opened [`Town`] plus the config and collaborator handles
//! routes need for audience checks and tool calls.

use std::sync::Arc;

use crate::auth::TokenCodec;
use crate::domain::ports::RigRegistry;
use crate::infrastructure::config::AppConfig;
use crate::town::Town;

pub struct AppState {
    pub config: AppConfig,
    pub tokens: Arc<dyn TokenCodec>,
    pub rigs: Arc<dyn RigRegistry>,
    pub town: Arc<Town>,
}

impl AppState {
    pub fn new(config: AppConfig, town: Arc<Town>, tokens: Arc<dyn TokenCodec>, rigs: Arc<dyn RigRegistry>) -> Self {
        Self { config, tokens, rigs, town }
    }
}
