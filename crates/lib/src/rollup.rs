use crate::{ConsumptionRatio, PhaseId, ResourceId, ScalingRecord, TaskId, UAmount};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RollupError {
    #[error("Rollup resulted in an overflow")]
    Overflow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceRequirement {
    pub resource_id: ResourceId,
    pub computed_quantity: UAmount,
    pub acquired_quantity: UAmount,
    /// `computed - acquired`, clamped at zero.
    pub remaining_quantity: UAmount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseRequirement {
    pub phase_id: Option<PhaseId>,
    pub phase_order: Option<u32>,
    pub resource_id: ResourceId,
    pub quantity: UAmount,
}

/// Ratios grouped by the task consuming them.
fn index_ratios(ratios: &[ConsumptionRatio]) -> HashMap<TaskId, Vec<&ConsumptionRatio>> {
    let mut by_task: HashMap<TaskId, Vec<&ConsumptionRatio>> = HashMap::new();
    for ratio in ratios {
        by_task.entry(ratio.task_id).or_default().push(ratio);
    }
    by_task
}

/// Calls `f` with `(occurrence, ratio, per_unit * multiplier)` for every matching pair.
/// Occurrences of tasks without ratios contribute nothing.
fn for_each_contribution<F>(
    scaling: &[ScalingRecord],
    ratios: &[ConsumptionRatio],
    mut f: F,
) -> Result<(), RollupError>
where
    F: FnMut(&ScalingRecord, &ConsumptionRatio, UAmount) -> Result<(), RollupError>,
{
    let by_task = index_ratios(ratios);
    for occurrence in scaling {
        let Some(task_ratios) = by_task.get(&occurrence.task_id) else {
            continue;
        };
        for ratio in task_ratios {
            let contribution = ratio
                .per_unit_amount
                .checked_mul(occurrence.multiplier)
                .ok_or(RollupError::Overflow)?;
            f(occurrence, ratio, contribution)?;
        }
    }
    Ok(())
}

fn accumulate(total: &mut UAmount, contribution: UAmount) -> Result<(), RollupError> {
    *total = total
        .checked_add(contribution)
        .ok_or(RollupError::Overflow)?;
    Ok(())
}

/// Total need per resource across every task occurrence, ordered by resource id.
///
/// Every resource named by a ratio is reported, with a zero computed quantity when
/// none of its tasks occur. Acquired quantities default to zero.
pub fn rollup_quantities(
    scaling: &[ScalingRecord],
    ratios: &[ConsumptionRatio],
    acquired: Option<&HashMap<ResourceId, UAmount>>,
) -> Result<Vec<ResourceRequirement>, RollupError> {
    let mut computed: BTreeMap<ResourceId, UAmount> = ratios
        .iter()
        .map(|ratio| (ratio.resource_id, UAmount::ZERO))
        .collect();

    for_each_contribution(scaling, ratios, |_, ratio, contribution| {
        accumulate(computed.entry(ratio.resource_id).or_default(), contribution)
    })?;

    Ok(computed
        .into_iter()
        .map(|(resource_id, computed_quantity)| {
            let acquired_quantity = acquired
                .and_then(|acquired| acquired.get(&resource_id))
                .copied()
                .unwrap_or(UAmount::ZERO);
            ResourceRequirement {
                resource_id,
                computed_quantity,
                acquired_quantity,
                remaining_quantity: computed_quantity.saturating_sub(acquired_quantity),
            }
        })
        .collect())
}

/// Need per phase and resource. Phases are ordered by `phase_order` then id, occurrences
/// without phase metadata are collected last.
pub fn rollup_by_phase(
    scaling: &[ScalingRecord],
    ratios: &[ConsumptionRatio],
) -> Result<Vec<PhaseRequirement>, RollupError> {
    // (has no order, order, has no phase, phase, resource)
    type Slot = (bool, u32, bool, PhaseId, ResourceId);

    let mut per_phase: BTreeMap<Slot, (Option<PhaseId>, Option<u32>, UAmount)> = BTreeMap::new();
    for_each_contribution(scaling, ratios, |occurrence, ratio, contribution| {
        let slot = (
            occurrence.phase_order.is_none(),
            occurrence.phase_order.unwrap_or_default(),
            occurrence.phase_id.is_none(),
            occurrence.phase_id.unwrap_or(PhaseId(0)),
            ratio.resource_id,
        );
        let (_, _, total) = per_phase.entry(slot).or_insert((
            occurrence.phase_id,
            occurrence.phase_order,
            UAmount::ZERO,
        ));
        accumulate(total, contribution)
    })?;

    Ok(per_phase
        .into_iter()
        .map(
            |((.., resource_id), (phase_id, phase_order, quantity))| PhaseRequirement {
                phase_id,
                phase_order,
                resource_id,
                quantity,
            },
        )
        .collect())
}
