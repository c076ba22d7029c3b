//! Command handlers for the `gastown-town` binary.

use std::sync::Arc;

use anyhow::{Context, Result};
use comfy_table::{Attribute, Cell, Table};

use crate::adapters::http::{HttpContainerClient, HttpRigRegistryClient};
use crate::adapters::sqlite::{self, PoolConfig};
use crate::auth::HmacTokenCodec;
use crate::infrastructure::config::AppConfig;
use crate::town::Town;

async fn open_town(config: &AppConfig) -> Result<Arc<Town>> {
    let pool = sqlite::create_pool(&config.database_url, Some(PoolConfig::default()))
        .await
        .context("failed to open town database")?;
    let runtime = Arc::new(HttpContainerClient::new(config.container_runtime_url.clone()));
    let tokens = Arc::new(HmacTokenCodec::new(config.jwt_secret.clone().into_bytes()));
    let rigs = Arc::new(HttpRigRegistryClient::new(config.registry_url.clone()));
    Ok(Arc::new(Town::new(pool, runtime, tokens, rigs, config.town_id.clone(), config.user_id.clone())))
}

pub async fn handle_serve(config: AppConfig) -> Result<()> {
    let town = open_town(&config).await?;
    town.migrate().await.context("failed to run migrations")?;

    let state = Arc::new(crate::api::state::AppState::new(
        config.clone(),
        town.clone(),
        Arc::new(HmacTokenCodec::new(config.jwt_secret.clone().into_bytes())),
        Arc::new(HttpRigRegistryClient::new(config.registry_url.clone())),
    ));
    let router = crate::api::build_router(state);

    let ticker_town = town.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(5));
        loop {
            interval.tick().await;
            if let Err(err) = ticker_town.tick().await {
                tracing::error!(%err, "scheduler tick failed");
            }
        }
    });

    let addr = format!("{}:{}", config.server_host, config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await.context("failed to bind server address")?;
    tracing::info!(%addr, town_id = %config.town_id, "serving");
    axum::serve(listener, router).await.context("server error")?;
    Ok(())
}

pub async fn handle_migrate(config: AppConfig) -> Result<()> {
    let town = open_town(&config).await?;
    let applied = town.migrate().await.context("migration failed")?;
    println!("applied {applied} migration(s)");
    Ok(())
}

pub async fn handle_inspect_bead(config: AppConfig, id: String, json: bool) -> Result<()> {
    use crate::domain::ports::BeadRepository;

    let town = open_town(&config).await?;
    let Some(bead) = town.beads.get_bead(&id).await? else {
        println!("bead {id} not found");
        return Ok(());
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&bead)?);
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec![Cell::new("field").add_attribute(Attribute::Bold), Cell::new("value")]);
    table.add_row(vec!["id", &bead.id]);
    table.add_row(vec!["type", bead.bead_type.as_str()]);
    table.add_row(vec!["status", bead.status.as_str()]);
    table.add_row(vec!["title", &bead.title]);
    table.add_row(vec!["priority", bead.priority.as_str()]);
    table.add_row(vec!["assignee", bead.assignee_agent_bead_id.as_deref().unwrap_or("-")]);
    println!("{table}");

    let deps = town.beads.list_dependencies(&id).await?;
    if !deps.is_empty() {
        println!("\ndependencies:");
        for dep in deps {
            println!("  {} -> {} ({})", dep.bead_id, dep.depends_on_bead_id, dep.dependency_type.as_str());
        }
    }
    Ok(())
}

pub async fn handle_inspect_agent(config: AppConfig, id: String, json: bool) -> Result<()> {
    use crate::domain::ports::AgentRepository;

    let town = open_town(&config).await?;
    let Some(agent) = town.agents.get_agent(&id).await? else {
        println!("agent {id} not found");
        return Ok(());
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&agent)?);
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec![Cell::new("field").add_attribute(Attribute::Bold), Cell::new("value")]);
    table.add_row(vec!["id", &agent.id]);
    table.add_row(vec!["role", agent.role.as_str()]);
    table.add_row(vec!["name", &agent.name]);
    table.add_row(vec!["status", agent.status.as_str()]);
    table.add_row(vec!["hooked_bead", agent.current_hook_bead_id.as_deref().unwrap_or("-")]);
    table.add_row(vec!["dispatch_attempts", &agent.dispatch_attempts.to_string()]);
    println!("{table}");
    Ok(())
}
