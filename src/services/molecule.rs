//! Linear step-chain molecules.

use tracing::instrument;

use crate::domain::errors::{TownError, TownResult};
use crate::domain::models::{
    BeadStatus, BeadType, DependencyType, Molecule, MoleculeStatus, NewBead,
};
use crate::domain::ports::BeadRepository;

/// Creates a molecule bead plus one child step bead per formula entry,
/// chained by `blocks` dependencies (each step blocks its predecessor), and
/// stamps `metadata.molecule_bead_id` on the source bead.
#[instrument(skip(beads, formula))]
pub async fn create_molecule(
    beads: &dyn BeadRepository,
    source_bead_id: &str,
    formula: Vec<String>,
) -> TownResult<Molecule> {
    let molecule = beads
        .create_bead(NewBead {
            bead_type: BeadType::Molecule,
            title: format!("Molecule for {source_bead_id}"),
            ..Default::default()
        })
        .await?;

    let mut step_ids = Vec::with_capacity(formula.len());
    let mut previous: Option<String> = None;
    for step_title in &formula {
        let step = beads
            .create_bead(NewBead {
                bead_type: BeadType::Issue,
                title: step_title.clone(),
                parent_bead_id: Some(molecule.id.clone()),
                ..Default::default()
            })
            .await?;
        if let Some(prev_id) = &previous {
            beads.add_dependency(&step.id, prev_id, DependencyType::Blocks).await?;
        }
        previous = Some(step.id.clone());
        step_ids.push(step.id);
    }

    beads
        .patch_metadata(source_bead_id, "molecule_bead_id", serde_json::Value::String(molecule.id.clone()))
        .await?;

    Ok(Molecule {
        id: molecule.id,
        source_bead_id: Some(source_bead_id.to_string()),
        formula,
        current_step: 0,
        status: MoleculeStatus::Active,
        step_bead_ids: step_ids,
    })
}

/// Derives `current_step` and `status` from the child steps' bead statuses.
#[instrument(skip(beads))]
pub async fn get_molecule(beads: &dyn BeadRepository, molecule_id: &str) -> TownResult<Molecule> {
    let molecule_bead =
        beads.get_bead(molecule_id).await?.ok_or_else(|| TownError::not_found(format!("molecule {molecule_id}")))?;
    let steps = beads.list_children(molecule_id).await?;

    let current_step = steps.iter().filter(|s| s.status == BeadStatus::Closed).count();
    let status = if steps.iter().any(|s| s.status == BeadStatus::Failed) {
        MoleculeStatus::Failed
    } else if !steps.is_empty() && steps.iter().all(|s| s.status == BeadStatus::Closed) {
        MoleculeStatus::Completed
    } else {
        MoleculeStatus::Active
    };

    Ok(Molecule {
        id: molecule_bead.id,
        source_bead_id: None,
        formula: steps.iter().map(|s| s.title.clone()).collect(),
        current_step,
        status,
        step_bead_ids: steps.into_iter().map(|s| s.id).collect(),
    })
}

/// Closes the step bead the agent is currently hooked to, advancing the
/// molecule by one. Closes the molecule bead itself once every step is
/// closed. A no-op if the agent's hook does not resolve to a molecule step.
#[instrument(skip(beads))]
pub async fn advance_molecule_step(
    beads: &dyn BeadRepository,
    agents: &dyn crate::domain::ports::AgentRepository,
    agent_id: &str,
) -> TownResult<Option<Molecule>> {
    let hooked = match agents.get_hooked_bead(agent_id).await? {
        Some(b) => b,
        None => return Ok(None),
    };
    let molecule_id = match &hooked.parent_bead_id {
        Some(id) => id.clone(),
        None => return Ok(None),
    };
    let molecule_bead = match beads.get_bead(&molecule_id).await? {
        Some(b) if b.bead_type == BeadType::Molecule => b,
        _ => return Ok(None),
    };

    beads.update_bead_status(&hooked.id, BeadStatus::Closed, Some(agent_id)).await?;
    agents.unhook_bead(agent_id).await?;

    let molecule = get_molecule(beads, &molecule_bead.id).await?;
    if molecule.status == MoleculeStatus::Completed {
        beads.update_bead_status(&molecule_bead.id, BeadStatus::Closed, Some(agent_id)).await?;
    }

    Ok(Some(molecule))
}
