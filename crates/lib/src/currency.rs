use crate::{CurrencyId, MovementId, MovementRecord, Rate, UAmount};
use std::collections::HashMap;
use strum_macros::{Display, EnumString, EnumVariantNames};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProjectionError {
    #[error("Movement {movement} carries invalid exchange rate {rate}")]
    InvalidExchangeRate { movement: MovementId, rate: Rate },
    #[error("Exchange rate {0} is not positive")]
    NonPositiveRate(Rate),
    #[error("Currency {0} has no label")]
    UnknownCurrency(CurrencyId),
    #[error("Movement {movement} needs an alternate currency rate but none was supplied")]
    MissingAlternateRate { movement: MovementId },
    #[error("Projection resulted in an overflow")]
    Overflow,
}

#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumVariantNames,
)]
#[strum(serialize_all = "lowercase")]
pub enum ProjectionMode {
    /// Amount and currency as recorded.
    #[default]
    #[strum(to_string = "origin", serialize = "discriminated")]
    Origin,
    /// Everything in the base currency.
    #[strum(to_string = "normalized", serialize = "pesified")]
    Normalized,
    /// Everything in the alternate (usually hard) currency.
    #[strum(to_string = "alternate", serialize = "dollarized")]
    Alternate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection<'a> {
    pub amount: UAmount,
    pub label: &'a str,
}

impl Projection<'_> {
    pub fn display(&self) -> String {
        format!("{:.2} {}", self.amount, self.label)
    }
}

/// Converts recorded amounts into one of the [`ProjectionMode`]s.
///
/// `alternate_rate` is the number of base units per unit of the alternate
/// currency and is only needed for [`ProjectionMode::Alternate`].
#[derive(Debug, Clone)]
pub struct CurrencyProjector {
    labels: HashMap<CurrencyId, String>,
    base: CurrencyId,
    alternate: CurrencyId,
    alternate_rate: Option<Rate>,
}

impl CurrencyProjector {
    pub fn new<I, S>(labels: I, base: CurrencyId, alternate: CurrencyId) -> Self
    where
        I: IntoIterator<Item = (CurrencyId, S)>,
        S: Into<String>,
    {
        Self {
            labels: labels
                .into_iter()
                .map(|(id, label)| (id, label.into()))
                .collect(),
            base,
            alternate,
            alternate_rate: None,
        }
    }

    pub fn with_alternate_rate(mut self, rate: Rate) -> Self {
        self.alternate_rate = Some(rate);
        self
    }

    pub fn base(&self) -> CurrencyId {
        self.base
    }

    pub fn alternate(&self) -> CurrencyId {
        self.alternate
    }

    pub fn label(&self, currency: CurrencyId) -> Result<&str, ProjectionError> {
        self.labels
            .get(&currency)
            .map(String::as_str)
            .ok_or(ProjectionError::UnknownCurrency(currency))
    }

    /// Currency every projection in `mode` is expressed in, `None` for
    /// [`ProjectionMode::Origin`] where it depends on the record.
    pub fn target(&self, mode: ProjectionMode) -> Option<CurrencyId> {
        match mode {
            ProjectionMode::Origin => None,
            ProjectionMode::Normalized => Some(self.base),
            ProjectionMode::Alternate => Some(self.alternate),
        }
    }

    pub fn project(
        &self,
        record: &MovementRecord,
        mode: ProjectionMode,
    ) -> Result<Projection<'_>, ProjectionError> {
        self.project_with(record, mode, self.alternate_rate)
    }

    fn project_with(
        &self,
        record: &MovementRecord,
        mode: ProjectionMode,
        alternate_rate: Option<Rate>,
    ) -> Result<Projection<'_>, ProjectionError> {
        let rate = positive(record.id, record.exchange_rate)?;

        let (amount, currency) = match mode {
            ProjectionMode::Origin => (record.amount, record.currency_id),
            ProjectionMode::Normalized => (self.to_base(record, rate)?, self.base),
            ProjectionMode::Alternate if record.currency_id == self.alternate => {
                (record.amount, self.alternate)
            }
            ProjectionMode::Alternate => {
                let alternate_rate = alternate_rate.ok_or(ProjectionError::MissingAlternateRate {
                    movement: record.id,
                })?;
                let alternate_rate = positive(record.id, alternate_rate)?;
                let amount = self
                    .to_base(record, rate)?
                    .checked_div(alternate_rate)
                    .ok_or(ProjectionError::Overflow)?;
                (amount, self.alternate)
            }
        };

        Ok(Projection {
            amount,
            label: self.label(currency)?,
        })
    }

    fn to_base(&self, record: &MovementRecord, rate: UAmount) -> Result<UAmount, ProjectionError> {
        if record.currency_id == self.base {
            return Ok(record.amount);
        }
        record
            .amount
            .checked_mul(rate)
            .ok_or(ProjectionError::Overflow)
    }
}

/// Rejects zero and negative rates, returns the rate in the unsigned amount type.
fn positive(movement: MovementId, rate: Rate) -> Result<UAmount, ProjectionError> {
    if rate <= Rate::ZERO {
        return Err(ProjectionError::InvalidExchangeRate { movement, rate });
    }
    UAmount::checked_from_num(rate).ok_or(ProjectionError::Overflow)
}

pub fn project_currency<'a>(
    projector: &'a CurrencyProjector,
    record: &MovementRecord,
    mode: ProjectionMode,
    normalization_rate: Option<Rate>,
) -> Result<Projection<'a>, ProjectionError> {
    projector.project_with(record, mode, normalization_rate.or(projector.alternate_rate))
}

/// The rate converting back from the target of `rate` to its origin.
pub fn inverse_rate(rate: Rate) -> Result<Rate, ProjectionError> {
    if rate <= Rate::ZERO {
        return Err(ProjectionError::NonPositiveRate(rate));
    }
    Rate::ONE.checked_div(rate).ok_or(ProjectionError::Overflow)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CategoryId, WalletId};
    use chrono::NaiveDate;
    use fixed_macro::types::I64F64 as rate;
    use fixed_macro::types::U64F64 as ucur;
    use proptest::prelude::*;

    const ARS: CurrencyId = CurrencyId(1);
    const USD: CurrencyId = CurrencyId(2);
    const EUR: CurrencyId = CurrencyId(3);

    fn projector() -> CurrencyProjector {
        CurrencyProjector::new([(ARS, "ARS"), (USD, "USD"), (EUR, "EUR")], ARS, USD)
    }

    fn movement(amount: UAmount, currency_id: CurrencyId, exchange_rate: Rate) -> MovementRecord {
        MovementRecord {
            id: MovementId(7),
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            amount,
            currency_id,
            exchange_rate,
            wallet_id: WalletId(1),
            category_id: CategoryId(1),
            counterparty_id: None,
        }
    }

    #[test]
    fn origin_keeps_amount_and_currency() {
        let p = projector();
        let record = movement(ucur!(150.5), USD, rate!(1000));
        assert_eq!(
            p.project(&record, ProjectionMode::Origin),
            Ok(Projection {
                amount: ucur!(150.5),
                label: "USD"
            })
        );
    }

    #[test]
    fn normalized_multiplies_by_record_rate() {
        let p = projector();
        let record = movement(ucur!(150.5), USD, rate!(1000));
        let projection = p.project(&record, ProjectionMode::Normalized).unwrap();
        assert_eq!(projection.amount, ucur!(150500));
        assert_eq!(projection.display(), "150500.00 ARS");
    }

    #[test]
    fn normalized_base_record_is_untouched() {
        let p = projector();
        let record = movement(ucur!(99.99), ARS, rate!(1));
        assert_eq!(
            p.project(&record, ProjectionMode::Normalized).unwrap().amount,
            ucur!(99.99)
        );
    }

    #[test]
    fn alternate_divides_base_amount_by_alternate_rate() {
        let p = projector().with_alternate_rate(rate!(1000));
        let record = movement(ucur!(250000), ARS, rate!(1));
        assert_eq!(
            p.project(&record, ProjectionMode::Alternate),
            Ok(Projection {
                amount: ucur!(250),
                label: "USD"
            })
        );

        let euros = movement(ucur!(10), EUR, rate!(1100));
        assert_eq!(
            p.project(&euros, ProjectionMode::Alternate).unwrap().amount,
            ucur!(11)
        );
    }

    #[test]
    fn alternate_record_needs_no_rate() {
        let p = projector();
        let record = movement(ucur!(42), USD, rate!(950));
        assert_eq!(
            p.project(&record, ProjectionMode::Alternate).unwrap().amount,
            ucur!(42)
        );
    }

    #[test]
    fn alternate_without_rate_fails() {
        let record = movement(ucur!(42), ARS, rate!(1));
        assert_eq!(
            projector().project(&record, ProjectionMode::Alternate),
            Err(ProjectionError::MissingAlternateRate {
                movement: MovementId(7)
            })
        );
    }

    #[test]
    fn call_rate_overrides_configured_rate() {
        let p = projector().with_alternate_rate(rate!(1000));
        let record = movement(ucur!(5000), ARS, rate!(1));
        assert_eq!(
            project_currency(&p, &record, ProjectionMode::Alternate, Some(rate!(500)))
                .unwrap()
                .amount,
            ucur!(10)
        );
    }

    #[test]
    fn zero_rate_is_rejected() {
        let record = movement(ucur!(1), USD, rate!(0));
        assert_eq!(
            project_currency(&projector(), &record, ProjectionMode::Origin, None),
            Err(ProjectionError::InvalidExchangeRate {
                movement: MovementId(7),
                rate: rate!(0)
            })
        );
    }

    #[test]
    fn negative_rates_are_rejected() {
        let record = movement(ucur!(1), USD, rate!(-3));
        assert!(matches!(
            projector().project(&record, ProjectionMode::Normalized),
            Err(ProjectionError::InvalidExchangeRate { .. })
        ));

        let record = movement(ucur!(1), ARS, rate!(1));
        assert!(matches!(
            project_currency(&projector(), &record, ProjectionMode::Alternate, Some(rate!(-1))),
            Err(ProjectionError::InvalidExchangeRate { .. })
        ));
    }

    #[test]
    fn inverse_of_non_positive_rate_names_no_movement() {
        assert_eq!(
            inverse_rate(rate!(0)),
            Err(ProjectionError::NonPositiveRate(rate!(0)))
        );
        assert_eq!(
            inverse_rate(rate!(-4)),
            Err(ProjectionError::NonPositiveRate(rate!(-4)))
        );
        assert_eq!(inverse_rate(rate!(4)), Ok(rate!(0.25)));
    }

    #[test]
    fn unknown_currency_label_is_an_error() {
        let record = movement(ucur!(1), CurrencyId(9), rate!(2));
        assert_eq!(
            projector().project(&record, ProjectionMode::Origin),
            Err(ProjectionError::UnknownCurrency(CurrencyId(9)))
        );
    }

    #[test]
    fn modes_parse_from_legacy_names() {
        assert_eq!("pesified".parse(), Ok(ProjectionMode::Normalized));
        assert_eq!("dollarized".parse(), Ok(ProjectionMode::Alternate));
        assert_eq!("discriminated".parse(), Ok(ProjectionMode::Origin));
        assert_eq!("normalized".parse(), Ok(ProjectionMode::Normalized));
        assert_eq!(ProjectionMode::Alternate.to_string(), "alternate");
    }

    proptest! {
        #[test]
        fn normalize_then_invert_round_trips(cents in 0u64..1_000_000_000_000, rate_milli in 1u64..5_000_000) {
            let amount = UAmount::from_num(cents) / UAmount::from_num(100);
            let rate = Rate::from_num(rate_milli) / Rate::from_num(1000);
            let p = projector();

            let normalized = p.project(&movement(amount, USD, rate), ProjectionMode::Normalized).unwrap();
            let back = movement(normalized.amount, EUR, inverse_rate(rate).unwrap());
            let restored = p.project(&back, ProjectionMode::Normalized).unwrap().amount;

            let drift = if restored > amount { restored - amount } else { amount - restored };
            prop_assert!(drift <= ucur!(0.01), "drift {} for {} at {}", drift, amount, rate);
        }
    }
}
