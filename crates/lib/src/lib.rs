//! Ledger aggregation and material rollup for construction projects.
//!
//! The engine modules ([`category`], [`currency`], [`ledger`], [`rollup`]) are pure
//! folds over caller supplied snapshots. [`interchange`] adapts them to CSV.

pub mod category;
pub mod currency;
mod error;
pub mod grouping;
mod ids;
pub mod interchange;
pub mod ledger;
mod record;
pub mod rollup;

type FRAC = fixed::types::extra::U64;

/// Fixed point **unsigned** decimal with 64 fractional bits, used for amounts at rest,
/// exchange-converted amounts and material quantities.
// Converting through an exchange rate and back through its inverse multiplies the
// rounding error of the inverse by `amount * rate`. With 32 fractional bits that drifts
// past a cent once `amount * rate` reaches ~4e7, which is an ordinary pesified balance.
// 64 fractional bits keep the drift below 1e-5 up to `amount * rate` of ~1e14 while
// still leaving 2^64 (~1.8e19) for the integral part.
pub type UAmount = fixed::FixedU128<FRAC>;
/// Signed counterpart of [`UAmount`] for balances.
pub type IAmount = fixed::FixedI128<FRAC>;
/// Exchange rate, signed so a negative rate can be rejected as such instead of failing to parse.
pub type Rate = fixed::FixedI128<FRAC>;

pub use category::{resolve_category_sign, CategoryError, CategoryTree, Resolution, Vocabulary};
pub use currency::{
    inverse_rate, project_currency, CurrencyProjector, Projection, ProjectionError,
    ProjectionMode,
};
pub use error::Error;
pub use grouping::{DimensionKey, Grouping};
pub use ids::*;
pub use interchange::{execute_balances, execute_materials, BalanceRequest, MaterialRequest};
pub use ledger::{aggregate_ledger, AggregatedBalance, AggregationError, Ledger};
pub use record::*;
pub use rollup::{
    rollup_by_phase, rollup_quantities, PhaseRequirement, ResourceRequirement, RollupError,
};
