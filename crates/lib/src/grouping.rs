use crate::{CategoryId, CounterpartyId, CurrencyId, MovementRecord, WalletId};
use std::fmt;
use strum_macros::{Display, EnumString, EnumVariantNames};

/// Key produced by a [`Grouping`]. Keys are canonical ids, never display labels,
/// so two wallets sharing a name stay in separate buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DimensionKey {
    All,
    Wallet(WalletId),
    WalletCurrency(WalletId, CurrencyId),
    Currency(CurrencyId),
    /// `None` collects movements without a counterparty.
    Counterparty(Option<CounterpartyId>),
    Category(CategoryId),
}

impl fmt::Display for DimensionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DimensionKey::All => write!(f, "all"),
            DimensionKey::Wallet(w) => write!(f, "wallet:{w}"),
            DimensionKey::WalletCurrency(w, c) => write!(f, "wallet:{w}/currency:{c}"),
            DimensionKey::Currency(c) => write!(f, "currency:{c}"),
            DimensionKey::Counterparty(Some(p)) => write!(f, "counterparty:{p}"),
            DimensionKey::Counterparty(None) => write!(f, "counterparty:none"),
            DimensionKey::Category(c) => write!(f, "category:{c}"),
        }
    }
}

/// The grouping keys the reporting views use.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumVariantNames,
)]
#[strum(serialize_all = "kebab-case")]
pub enum Grouping {
    /// Single bucket.
    All,
    #[default]
    Wallet,
    WalletCurrency,
    Currency,
    Counterparty,
    Category,
}

impl Grouping {
    pub fn key(self, record: &MovementRecord) -> DimensionKey {
        match self {
            Grouping::All => DimensionKey::All,
            Grouping::Wallet => DimensionKey::Wallet(record.wallet_id),
            Grouping::WalletCurrency => {
                DimensionKey::WalletCurrency(record.wallet_id, record.currency_id)
            }
            Grouping::Currency => DimensionKey::Currency(record.currency_id),
            Grouping::Counterparty => DimensionKey::Counterparty(record.counterparty_id),
            Grouping::Category => DimensionKey::Category(record.category_id),
        }
    }

    /// Key function suitable for [`crate::aggregate_ledger`].
    pub fn key_fn(self) -> impl Fn(&MovementRecord) -> DimensionKey {
        move |record| self.key(record)
    }
}
