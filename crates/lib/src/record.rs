use crate::{
    CategoryId, CounterpartyId, CurrencyId, MovementId, PhaseId, Rate, ResourceId, TaskId,
    TenantId, UAmount, WalletId,
};
use chrono::NaiveDate;
use strum_macros::{Display, EnumString, EnumVariantNames};

/// Direction of money for a category root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumVariantNames)]
#[strum(serialize_all = "lowercase")]
pub enum Flow {
    Inflow,
    Outflow,
}

impl Flow {
    pub fn signum(self) -> i32 {
        match self {
            Flow::Inflow => 1,
            Flow::Outflow => -1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryNode {
    pub id: CategoryId,
    pub name: String,
    pub parent_id: Option<CategoryId>,
    /// `None` for system-provided categories shared by every tenant.
    pub tenant_id: Option<TenantId>,
    pub classification_hint: Option<Flow>,
}

impl CategoryNode {
    pub fn root(id: u32, name: impl Into<String>, hint: Option<Flow>) -> Self {
        Self {
            id: CategoryId(id),
            name: name.into(),
            parent_id: None,
            tenant_id: None,
            classification_hint: hint,
        }
    }

    pub fn child(id: u32, name: impl Into<String>, parent: u32) -> Self {
        Self {
            id: CategoryId(id),
            name: name.into(),
            parent_id: Some(CategoryId(parent)),
            tenant_id: None,
            classification_hint: None,
        }
    }

    pub fn owned_by(mut self, tenant: TenantId) -> Self {
        self.tenant_id = Some(tenant);
        self
    }
}

/// One ledger entry. `amount` is never negative, the direction comes from the category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovementRecord {
    pub id: MovementId,
    pub date: NaiveDate,
    pub amount: UAmount,
    pub currency_id: CurrencyId,
    /// Units of the base currency per unit of `currency_id`.
    pub exchange_rate: Rate,
    pub wallet_id: WalletId,
    pub category_id: CategoryId,
    pub counterparty_id: Option<CounterpartyId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsumptionRatio {
    pub resource_id: ResourceId,
    pub task_id: TaskId,
    pub per_unit_amount: UAmount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScalingRecord {
    pub task_id: TaskId,
    pub multiplier: UAmount,
    pub phase_id: Option<PhaseId>,
    pub phase_order: Option<u32>,
}

impl ScalingRecord {
    pub fn new(task_id: TaskId, multiplier: UAmount) -> Self {
        Self {
            task_id,
            multiplier,
            phase_id: None,
            phase_order: None,
        }
    }

    pub fn in_phase(mut self, phase_id: PhaseId, phase_order: u32) -> Self {
        self.phase_id = Some(phase_id);
        self.phase_order = Some(phase_order);
        self
    }
}
