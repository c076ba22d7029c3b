//! Scheduler tick — the three-pass reconciliation that
//! runs every time the town's alarm fires.

use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use crate::auth::{build_claims, TokenCodec};
use crate::domain::errors::TownResult;
use crate::domain::models::{
    AgentCompletionStatus, AgentFilter, AgentRole, AgentStatus, BeadFilter, BeadStatus, BeadType,
    NewMail, TownConfig,
};
use crate::domain::ports::{
    keys, AgentRepository, BeadRepository, ContainerRuntime, KvStore, RuntimeAgentStatus,
    SatelliteRepository, StartAgentRequest, StartMergeRequest,
};
use crate::services::{mail, review_queue};

use super::alarm;
use super::constants::{
    ACTIVE_ALARM_INTERVAL, AGENT_TOKEN_TTL, GUPP_THRESHOLD, MAX_DISPATCH_ATTEMPTS, STALE_THRESHOLD,
};

pub struct TickContext<'a> {
    pub beads: &'a dyn BeadRepository,
    pub agents: &'a dyn AgentRepository,
    pub satellites: &'a dyn SatelliteRepository,
    pub runtime: &'a dyn ContainerRuntime,
    pub kv: &'a dyn KvStore,
    pub tokens: &'a dyn TokenCodec,
    pub town_id: String,
    pub user_id: String,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TickReport {
    pub dead: usize,
    pub stale: usize,
    pub orphaned: usize,
    pub dispatched: usize,
    pub circuit_broken: usize,
    pub completed: usize,
    pub reviews_started: usize,
    pub reviews_failed: usize,
    pub re_armed: bool,
}

/// Runs passes A, B, C in order, then decides whether to re-arm.
#[instrument(skip(ctx), fields(town_id = %ctx.town_id))]
pub async fn run_tick(ctx: &TickContext<'_>) -> TownResult<TickReport> {
    let mut report = TickReport::default();

    witness_patrol(ctx, &mut report).await?;
    schedule_pending_work(ctx, &mut report).await?;
    process_reviews(ctx, &mut report).await?;

    let has_active_work = has_active_work(ctx).await?;
    report.re_armed = has_active_work;
    if has_active_work {
        alarm::schedule_tick_in(ctx.kv, ACTIVE_ALARM_INTERVAL).await?;
    } else {
        alarm::disarm_alarm(ctx.kv).await?;
    }

    debug!(
        dispatched = report.dispatched,
        circuit_broken = report.circuit_broken,
        completed = report.completed,
        reviews_started = report.reviews_started,
        reviews_failed = report.reviews_failed,
        re_armed = report.re_armed,
        "tick complete"
    );
    Ok(report)
}

async fn witness_patrol(ctx: &TickContext<'_>, report: &mut TickReport) -> TownResult<()> {
    let now = Utc::now();
    let stale_threshold = chrono::Duration::from_std(STALE_THRESHOLD).unwrap();
    let gupp_threshold = chrono::Duration::from_std(GUPP_THRESHOLD).unwrap();

    report.dead = ctx.agents.list_agents(AgentFilter { status: Some(AgentStatus::Dead), ..Default::default() }).await?.len();

    let working = ctx.agents.list_agents(AgentFilter { status: Some(AgentStatus::Working), ..Default::default() }).await?;
    report.stale = working
        .iter()
        .filter(|a| a.last_activity_at.map(|t| now - t > stale_threshold).unwrap_or(false))
        .count();

    let in_progress = ctx
        .beads
        .list_beads(BeadFilter { status: Some(BeadStatus::InProgress), limit: Some(BeadFilter::DEFAULT_LIMIT), ..Default::default() })
        .await?;
    let mut orphaned = 0;
    for bead in &in_progress {
        if let Some(assignee) = &bead.assignee_agent_bead_id {
            match ctx.agents.get_agent(assignee).await? {
                Some(agent) if agent.status != AgentStatus::Dead => {}
                _ => orphaned += 1,
            }
        } else {
            orphaned += 1;
        }
    }
    report.orphaned = orphaned;

    let blocked = ctx.agents.list_agents(AgentFilter { status: Some(AgentStatus::Blocked), ..Default::default() }).await?;
    for agent in working.into_iter().chain(blocked) {
        let status = match ctx.runtime.agent_status(&agent.id).await {
            Ok(s) => s,
            Err(err) => {
                warn!(agent_id = %agent.id, %err, "agent_status probe failed");
                continue;
            }
        };

        let status_str = serde_json::to_value(status.status)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_else(|| "unknown".to_string());
        ctx.agents
            .log_agent_event(crate::domain::models::NewAgentEvent {
                agent_id: agent.id.clone(),
                event_type: status_str,
                payload: Some(serde_json::json!({ "exit_reason": status.exit_reason })),
            })
            .await?;

        match status.status {
            RuntimeAgentStatus::Exited if status.exit_reason.as_deref() == Some("completed") => {
                review_queue::agent_completed(ctx.beads, ctx.agents, &agent.id, AgentCompletionStatus::Completed).await?;
                report.completed += 1;
            }
            RuntimeAgentStatus::Exited | RuntimeAgentStatus::NotFound => {
                ctx.agents.update_agent_status(&agent.id, AgentStatus::Idle).await?;
            }
            _ => {
                let stalled_long_enough =
                    agent.last_activity_at.map(|t| now - t > gupp_threshold).unwrap_or(false);
                if stalled_long_enough && !has_pending_gupp_check(ctx, &agent.id).await? {
                    mail::send_mail(
                        ctx.beads,
                        ctx.agents,
                        NewMail {
                            from: "witness".to_string(),
                            to: agent.id.clone(),
                            subject: crate::domain::models::GUPP_CHECK_SUBJECT.to_string(),
                            body: "Please self-report status or escalate.".to_string(),
                        },
                    )
                    .await?;
                }
            }
        }
    }

    Ok(())
}

async fn has_pending_gupp_check(ctx: &TickContext<'_>, agent_id: &str) -> TownResult<bool> {
    let open_messages = ctx
        .beads
        .list_beads(BeadFilter {
            status: Some(BeadStatus::Open),
            bead_type: Some(BeadType::Message),
            assignee: Some(agent_id.to_string()),
            limit: Some(BeadFilter::DEFAULT_LIMIT),
            ..Default::default()
        })
        .await?;
    Ok(open_messages.iter().any(|b| b.title == crate::domain::models::GUPP_CHECK_SUBJECT))
}

async fn schedule_pending_work(ctx: &TickContext<'_>, report: &mut TickReport) -> TownResult<()> {
    let idle_hooked: Vec<_> = ctx
        .agents
        .list_agents(AgentFilter { status: Some(AgentStatus::Idle), ..Default::default() })
        .await?
        .into_iter()
        .filter(|a| a.current_hook_bead_id.is_some())
        .collect();

    let town_config = load_town_config(ctx.kv).await?;

    for agent in idle_hooked {
        let Some(bead_id) = agent.current_hook_bead_id.clone() else { continue };
        let Some(bead) = ctx.beads.get_bead(&bead_id).await? else { continue };

        if agent.dispatch_attempts + 1 > MAX_DISPATCH_ATTEMPTS {
            ctx.beads.update_bead_status(&bead.id, BeadStatus::Failed, Some(&agent.id)).await?;
            ctx.agents.unhook_bead(&agent.id).await?;
            report.circuit_broken += 1;
            continue;
        }

        ctx.agents.increment_dispatch_attempts(&agent.id).await?;

        let rig_id = agent.rig_id.clone().unwrap_or_default();
        let claims = build_claims(&agent.id, &rig_id, &ctx.town_id, &ctx.user_id, AGENT_TOKEN_TTL);
        let token = ctx.tokens.mint(claims)?;

        let mut env_vars = town_config.env_vars.clone();
        env_vars.insert("GASTOWN_SESSION_TOKEN".to_string(), token);
        if let Ok(url) = std::env::var("KILO_API_URL") {
            env_vars.insert("KILO_API_URL".to_string(), url);
        }
        if let Ok(tok) = std::env::var("KILOCODE_TOKEN") {
            env_vars.insert("KILOCODE_TOKEN".to_string(), tok);
        }

        let mut prompt = bead.title.clone();
        if let Some(body) = &bead.body {
            prompt.push_str("\n\n");
            prompt.push_str(body);
        }
        if let Some(checkpoint) = ctx.agents.read_checkpoint(&agent.id).await? {
            prompt.push_str("\n\nResume from checkpoint:\n");
            prompt.push_str(&checkpoint.to_string());
        }

        let req = StartAgentRequest {
            agent_id: agent.id.clone(),
            rig_id,
            town_id: ctx.town_id.clone(),
            role: AgentRole::Polecat.as_str().to_string(),
            name: agent.name.clone(),
            identity: agent.identity.clone(),
            prompt,
            model: if town_config.default_model.is_empty() { None } else { Some(town_config.default_model.clone()) },
            system_prompt: None,
            git_url: None,
            branch: format!("gt/{}", slugify(&agent.name)),
            default_branch: None,
            env_vars,
        };

        match ctx.runtime.start_agent(req).await {
            Ok(()) => {
                ctx.agents.update_agent_status(&agent.id, AgentStatus::Working).await?;
                ctx.agents.reset_dispatch_attempts(&agent.id).await?;
                ctx.agents.touch_agent(&agent.id).await?;
                report.dispatched += 1;
            }
            Err(err) => {
                info!(agent_id = %agent.id, %err, "dispatch failed, will retry next tick");
            }
        }
    }

    Ok(())
}

async fn process_reviews(ctx: &TickContext<'_>, report: &mut TickReport) -> TownResult<()> {
    review_queue::recover_stuck_reviews(ctx.beads).await?;

    let Some(entry) = review_queue::pop_review_queue(ctx.beads, ctx.satellites).await? else {
        return Ok(());
    };

    let claims = build_claims("scheduler", "", &ctx.town_id, &ctx.user_id, AGENT_TOKEN_TTL);
    let token = ctx.tokens.mint(claims)?;
    let mut env_vars = std::collections::BTreeMap::new();
    env_vars.insert("GASTOWN_SESSION_TOKEN".to_string(), token);

    let req = StartMergeRequest {
        entry_id: entry.id.clone(),
        branch: entry.branch.clone(),
        bead_id: entry.source_bead_id.clone().unwrap_or_default(),
        agent_id: entry.agent_id.clone().unwrap_or_default(),
        pr_url: entry.pr_url.clone(),
        env_vars,
    };

    match ctx.runtime.start_merge(req).await {
        Ok(()) => report.reviews_started += 1,
        Err(err) => {
            warn!(entry_id = %entry.id, %err, "start_merge failed");
            review_queue::complete_review(ctx.beads, &entry.id, crate::domain::models::ReviewOutcome::Failed).await?;
            report.reviews_failed += 1;
        }
    }

    Ok(())
}

async fn has_active_work(ctx: &TickContext<'_>) -> TownResult<bool> {
    let active_agents = ctx
        .agents
        .list_agents(AgentFilter { status: Some(AgentStatus::Working), ..Default::default() })
        .await?;
    if !active_agents.is_empty() {
        return Ok(true);
    }
    let blocked_agents = ctx
        .agents
        .list_agents(AgentFilter { status: Some(AgentStatus::Blocked), ..Default::default() })
        .await?;
    if !blocked_agents.is_empty() {
        return Ok(true);
    }

    let in_progress = ctx
        .beads
        .list_beads(BeadFilter { status: Some(BeadStatus::InProgress), limit: Some(1), ..Default::default() })
        .await?;
    if !in_progress.is_empty() {
        return Ok(true);
    }

    let pending_or_running_reviews = ctx
        .beads
        .list_beads(BeadFilter { bead_type: Some(BeadType::MergeRequest), limit: Some(BeadFilter::DEFAULT_LIMIT), ..Default::default() })
        .await?
        .into_iter()
        .any(|b| matches!(b.status, BeadStatus::Open | BeadStatus::InProgress));

    Ok(pending_or_running_reviews)
}

async fn load_town_config(kv: &dyn KvStore) -> TownResult<TownConfig> {
    match kv.get(keys::TOWN_CONFIG).await? {
        Some(raw) => Ok(serde_json::from_str(&raw)?),
        None => Ok(TownConfig::default()),
    }
}

fn slugify(name: &str) -> String {
    name.to_lowercase().chars().map(|c| if c.is_ascii_alphanumeric() { c } else { '-' }).collect()
}
