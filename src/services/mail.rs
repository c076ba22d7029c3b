//! Inter-agent mail.
//!
//! Messages are beads of `type=message`; the sender lives in metadata rather
//! than as a first-class column since only the recipient side is ever
//! queried.

use tracing::instrument;

use crate::domain::errors::TownResult;
use crate::domain::models::{
    BeadEventType, BeadFilter, BeadStatus, BeadType, MailMessage, NewBead, NewBeadEvent, NewMail,
};
use crate::domain::ports::{AgentRepository, BeadRepository};

#[instrument(skip(beads, agents, mail), fields(to = %mail.to))]
pub async fn send_mail(
    beads: &dyn BeadRepository,
    agents: &dyn AgentRepository,
    mail: NewMail,
) -> TownResult<()> {
    let message = beads
        .create_bead(NewBead {
            bead_type: BeadType::Message,
            title: mail.subject,
            body: Some(mail.body),
            assignee_agent_bead_id: Some(mail.to.clone()),
            metadata: Some(serde_json::json!({ "from": mail.from })),
            ..Default::default()
        })
        .await?;

    if let Some(hooked) = agents.get_hooked_bead(&mail.to).await? {
        beads
            .log_bead_event(NewBeadEvent {
                bead_id: hooked.id,
                agent_id: Some(mail.to),
                event_type: BeadEventType::MailSent,
                old_value: None,
                new_value: Some(message.id),
                metadata: None,
            })
            .await?;
    }

    Ok(())
}

/// Reads every open message bead assigned to `agent_id` (oldest first), then
/// closes all of them. A second call returns empty.
#[instrument(skip(beads))]
pub async fn check_mail(beads: &dyn BeadRepository, agent_id: &str) -> TownResult<Vec<MailMessage>> {
    let open = beads
        .list_beads(BeadFilter {
            status: Some(BeadStatus::Open),
            bead_type: Some(BeadType::Message),
            assignee: Some(agent_id.to_string()),
            limit: Some(BeadFilter::DEFAULT_LIMIT),
            ..Default::default()
        })
        .await?;

    let mut messages = Vec::with_capacity(open.len());
    for bead in open {
        messages.push(MailMessage {
            bead_id: bead.id.clone(),
            from: bead.metadata.get("from").and_then(|v| v.as_str()).map(str::to_string),
            subject: bead.title.clone(),
            body: bead.body.clone(),
            created_at: bead.created_at,
        });
        beads.update_bead_status(&bead.id, BeadStatus::Closed, Some(agent_id)).await?;
    }

    messages.sort_by_key(|m| m.created_at);
    Ok(messages)
}
