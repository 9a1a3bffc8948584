use crate::{
    category::{CategoryError, CategoryTree},
    currency::{CurrencyProjector, ProjectionError, ProjectionMode},
    CategoryId, CurrencyId, Flow, IAmount, MovementRecord, UAmount,
};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AggregationError {
    #[error(transparent)]
    Category(#[from] CategoryError),
    #[error(transparent)]
    Projection(#[from] ProjectionError),
    #[error("Aggregation resulted in an overflow")]
    Overflow,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatedBalance<K> {
    pub dimension_key: K,
    /// Gross amount of inflow movements.
    pub inflow: UAmount,
    /// Gross amount of outflow movements.
    pub outflow: UAmount,
    pub balance: IAmount,
    pub sample_count: usize,
    /// Currency every sample was projected into, `None` when the bucket mixes currencies.
    pub currency: Option<CurrencyId>,
}

#[derive(Debug)]
struct Accumulator {
    inflow: UAmount,
    outflow: UAmount,
    balance: IAmount,
    samples: usize,
    currency: Option<CurrencyId>,
    mixed: bool,
}

impl Accumulator {
    fn new() -> Self {
        Self {
            inflow: UAmount::ZERO,
            outflow: UAmount::ZERO,
            balance: IAmount::ZERO,
            samples: 0,
            currency: None,
            mixed: false,
        }
    }

    fn add(
        &mut self,
        sign: Flow,
        amount: UAmount,
        currency: CurrencyId,
    ) -> Result<(), AggregationError> {
        match sign {
            Flow::Inflow => {
                self.inflow = self
                    .inflow
                    .checked_add(amount)
                    .ok_or(AggregationError::Overflow)?;
                self.balance = self
                    .balance
                    .checked_add_unsigned(amount)
                    .ok_or(AggregationError::Overflow)?;
            }
            Flow::Outflow => {
                self.outflow = self
                    .outflow
                    .checked_add(amount)
                    .ok_or(AggregationError::Overflow)?;
                self.balance = self
                    .balance
                    .checked_sub_unsigned(amount)
                    .ok_or(AggregationError::Overflow)?;
            }
        }

        match self.currency {
            None if self.samples == 0 => self.currency = Some(currency),
            Some(seen) if seen != currency => self.mixed = true,
            _ => {}
        }
        self.samples += 1;

        Ok(())
    }

    fn finish<K>(self, dimension_key: K) -> AggregatedBalance<K> {
        AggregatedBalance {
            dimension_key,
            inflow: self.inflow,
            outflow: self.outflow,
            balance: self.balance,
            sample_count: self.samples,
            currency: if self.mixed { None } else { self.currency },
        }
    }
}

/// Folds movements into one balance per key, in ascending key order.
///
/// Holds no state between calls. Category signs are resolved once per distinct
/// category within a call.
#[derive(Debug, Clone, Copy)]
pub struct Ledger<'a> {
    tree: &'a CategoryTree,
    projector: &'a CurrencyProjector,
    mode: ProjectionMode,
}

impl<'a> Ledger<'a> {
    pub fn new(
        tree: &'a CategoryTree,
        projector: &'a CurrencyProjector,
        mode: ProjectionMode,
    ) -> Self {
        Self {
            tree,
            projector,
            mode,
        }
    }

    pub fn aggregate<'r, K, F, I>(
        &self,
        records: I,
        group_by: F,
    ) -> Result<Vec<AggregatedBalance<K>>, AggregationError>
    where
        K: Ord,
        F: Fn(&MovementRecord) -> K,
        I: IntoIterator<Item = &'r MovementRecord>,
    {
        let mut signs: HashMap<CategoryId, Flow> = HashMap::new();
        let mut buckets: BTreeMap<K, Accumulator> = BTreeMap::new();

        for record in records {
            let sign = match signs.get(&record.category_id) {
                Some(&sign) => sign,
                None => {
                    let sign = self.tree.resolve(record.category_id)?.sign;
                    signs.insert(record.category_id, sign);
                    sign
                }
            };
            let projection = self.projector.project(record, self.mode)?;
            let currency = self
                .projector
                .target(self.mode)
                .unwrap_or(record.currency_id);

            buckets
                .entry(group_by(record))
                .or_insert_with(Accumulator::new)
                .add(sign, projection.amount, currency)?;
        }

        Ok(buckets
            .into_iter()
            .map(|(key, acc)| acc.finish(key))
            .collect())
    }
}

pub fn aggregate_ledger<K, F>(
    records: &[MovementRecord],
    tree: &CategoryTree,
    group_by: F,
    projector: &CurrencyProjector,
    mode: ProjectionMode,
) -> Result<Vec<AggregatedBalance<K>>, AggregationError>
where
    K: Ord,
    F: Fn(&MovementRecord) -> K,
{
    Ledger::new(tree, projector, mode).aggregate(records, group_by)
}
