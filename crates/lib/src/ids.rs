use std::{fmt, num::ParseIntError, str::FromStr};

macro_rules! id_type {
    ($($(#[$meta:meta])* $name:ident),* $(,)?) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
            pub struct $name(pub u32);

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    fmt::Display::fmt(&self.0, f)
                }
            }

            impl FromStr for $name {
                type Err = ParseIntError;

                fn from_str(s: &str) -> Result<Self, Self::Err> {
                    s.parse().map(Self)
                }
            }

            impl From<u32> for $name {
                fn from(id: u32) -> Self {
                    Self(id)
                }
            }
        )*
    };
}

id_type!(
    /// Organization owning tenant-defined categories.
    TenantId,
    CategoryId,
    CurrencyId,
    MovementId,
    WalletId,
    /// Partner, supplier or subcontractor on the other side of a movement.
    CounterpartyId,
    ResourceId,
    TaskId,
    PhaseId,
);
