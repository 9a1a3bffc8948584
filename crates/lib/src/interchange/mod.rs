//! CSV adapters around the engine. Parsing and writing live here so the engine
//! modules only ever see in-memory records.

mod parser;
mod writer;

pub use parser::{
    csv_reader, parse_csv, parse_from_reader, AcquiredQuantity, CurrencyLabel, Header,
    HeaderIndex, ParserError, Row,
};
pub use writer::{write_balances, write_phase_requirements, write_requirements};

use crate::{
    error::Error, rollup_by_phase, rollup_quantities, CategoryNode, CategoryTree,
    ConsumptionRatio, CurrencyId, CurrencyProjector, Grouping, Ledger, MovementRecord,
    ProjectionMode, Rate, ResourceId, RollupError, ScalingRecord, TenantId, UAmount,
};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::io::{Read, Write};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceRequest {
    pub tenant: TenantId,
    pub base: CurrencyId,
    pub alternate: CurrencyId,
    pub mode: ProjectionMode,
    pub grouping: Grouping,
    pub alternate_rate: Option<Rate>,
    /// Inclusive date window applied before aggregating.
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl BalanceRequest {
    pub fn new(tenant: TenantId, base: CurrencyId, alternate: CurrencyId) -> Self {
        Self {
            tenant,
            base,
            alternate,
            mode: ProjectionMode::default(),
            grouping: Grouping::default(),
            alternate_rate: None,
            from: None,
            to: None,
        }
    }

    pub fn includes(&self, date: NaiveDate) -> bool {
        self.from.map_or(true, |from| date >= from) && self.to.map_or(true, |to| date <= to)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MaterialRequest {
    pub by_phase: bool,
}

pub fn execute_balances<C: Read, K: Read, M: Read, W: Write>(
    request: &BalanceRequest,
    categories: C,
    currencies: K,
    movements: M,
    writer: W,
) -> Result<(), Error> {
    let tree = CategoryTree::build(request.tenant, parse_csv::<CategoryNode, _>(categories)?)?;

    let labels = parse_csv::<CurrencyLabel, _>(currencies)?;
    let mut projector = CurrencyProjector::new(
        labels.into_iter().map(|c| (c.id, c.label)),
        request.base,
        request.alternate,
    );
    if let Some(rate) = request.alternate_rate {
        projector = projector.with_alternate_rate(rate);
    }

    let movements = parse_csv::<MovementRecord, _>(movements)?;
    let window = movements.iter().filter(|m| request.includes(m.date));

    let balances = Ledger::new(&tree, &projector, request.mode)
        .aggregate(window, request.grouping.key_fn())?;

    Ok(write_balances(&balances, &projector, writer)?)
}

/// Totals repeated rows for the same resource.
fn sum_acquired(rows: Vec<AcquiredQuantity>) -> Result<HashMap<ResourceId, UAmount>, RollupError> {
    let mut totals: HashMap<ResourceId, UAmount> = HashMap::new();
    for row in rows {
        let total = totals.entry(row.resource_id).or_insert(UAmount::ZERO);
        *total = total
            .checked_add(row.quantity)
            .ok_or(RollupError::Overflow)?;
    }
    Ok(totals)
}

pub fn execute_materials<S: Read, R: Read, A: Read, W: Write>(
    request: &MaterialRequest,
    scaling: S,
    ratios: R,
    acquired: Option<A>,
    writer: W,
) -> Result<(), Error> {
    let scaling = parse_csv::<ScalingRecord, _>(scaling)?;
    let ratios = parse_csv::<ConsumptionRatio, _>(ratios)?;

    if request.by_phase {
        let phases = rollup_by_phase(&scaling, &ratios)?;
        return Ok(write_phase_requirements(&phases, writer)?);
    }

    let acquired = acquired
        .map(parse_csv::<AcquiredQuantity, _>)
        .transpose()?
        .map(sum_acquired)
        .transpose()?;

    let requirements = rollup_quantities(&scaling, &ratios, acquired.as_ref())?;
    Ok(write_requirements(&requirements, writer)?)
}
