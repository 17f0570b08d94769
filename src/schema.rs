use crate::error::RevenueError;
use chrono::NaiveDate;
use schemars::gen::SchemaGenerator;
use schemars::schema::Schema;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Commission charged by the sales platform when an event record does not carry one.
pub const DEFAULT_COMMISSION_PERCENT: f64 = 10.0;

fn default_commission_percent() -> f64 {
    DEFAULT_COMMISSION_PERCENT
}

fn default_true() -> bool {
    true
}

/// One of the two business partners.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, JsonSchema)]
pub enum PartnerSlot {
    A,
    B,
}

impl fmt::Display for PartnerSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartnerSlot::A => write!(f, "Partner A"),
            PartnerSlot::B => write!(f, "Partner B"),
        }
    }
}

/// Share of the profit that belongs to partner A, in `[0.0, 1.0]`.
///
/// Partner B always holds the complement, so the two percentages cannot drift
/// away from summing to 100.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct SplitRatio(f64);

impl SplitRatio {
    pub const EVEN: SplitRatio = SplitRatio(0.5);

    pub fn new(ratio: f64) -> Result<Self, RevenueError> {
        if !ratio.is_finite() || !(0.0..=1.0).contains(&ratio) {
            return Err(RevenueError::InvalidSplitRatio(ratio));
        }
        Ok(Self(ratio))
    }

    /// Builds the ratio from one partner's percentage, clamping to `[0, 100]`.
    pub fn from_percentage(slot: PartnerSlot, percentage: f64) -> Self {
        let pct = if percentage.is_finite() {
            percentage.clamp(0.0, 100.0)
        } else {
            0.0
        };
        match slot {
            PartnerSlot::A => Self(pct / 100.0),
            PartnerSlot::B => Self(1.0 - pct / 100.0),
        }
    }

    pub fn ratio(&self) -> f64 {
        self.0
    }

    pub fn share(&self, slot: PartnerSlot) -> f64 {
        match slot {
            PartnerSlot::A => self.0,
            PartnerSlot::B => 1.0 - self.0,
        }
    }

    pub fn percentage(&self, slot: PartnerSlot) -> f64 {
        self.share(slot) * 100.0
    }
}

impl Default for SplitRatio {
    fn default() -> Self {
        Self::EVEN
    }
}

impl TryFrom<f64> for SplitRatio {
    type Error = RevenueError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SplitRatio> for f64 {
    fn from(value: SplitRatio) -> Self {
        value.0
    }
}

impl JsonSchema for SplitRatio {
    fn schema_name() -> String {
        "SplitRatio".to_string()
    }

    fn json_schema(gen: &mut SchemaGenerator) -> Schema {
        <f64>::json_schema(gen)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ContributorRole {
    #[serde(alias = "socio")]
    #[schemars(description = "One of the two co-owners splitting the event profit")]
    Partner { slot: PartnerSlot },

    #[schemars(description = "External photographer paid a fixed fee, not entitled to profit share")]
    Freelancer,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    #[serde(alias = "nome")]
    pub name: String,

    pub role: ContributorRole,

    #[serde(default, alias = "valorVendido")]
    #[schemars(description = "Amount this contributor sold at the event")]
    pub amount_sold: f64,

    #[serde(default, alias = "totalConta")]
    #[schemars(description = "Running total received in the partner's bank account (partners only)")]
    pub bank_total: f64,

    #[serde(default, alias = "valorPago")]
    #[schemars(description = "Fee paid to the freelancer (freelancers only)")]
    pub amount_paid: f64,

    #[serde(default, alias = "valorLiquido")]
    #[schemars(description = "Computed net earnings of the partner (partners only)")]
    pub net_amount: f64,
}

impl Sale {
    pub fn partner(name: impl Into<String>, slot: PartnerSlot, amount_sold: f64, bank_total: f64) -> Self {
        Self {
            name: name.into(),
            role: ContributorRole::Partner { slot },
            amount_sold,
            bank_total,
            amount_paid: 0.0,
            net_amount: 0.0,
        }
    }

    pub fn freelancer(name: impl Into<String>, amount_sold: f64, amount_paid: f64) -> Self {
        Self {
            name: name.into(),
            role: ContributorRole::Freelancer,
            amount_sold,
            bank_total: 0.0,
            amount_paid,
            net_amount: 0.0,
        }
    }

    pub fn partner_slot(&self) -> Option<PartnerSlot> {
        match self.role {
            ContributorRole::Partner { slot } => Some(slot),
            ContributorRole::Freelancer => None,
        }
    }

    pub fn is_freelancer(&self) -> bool {
        self.role == ContributorRole::Freelancer
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
pub enum ExpensePayer {
    #[serde(rename = "partner")]
    Partner(PartnerSlot),

    /// The shared cash pool.
    #[serde(rename = "Caixa", alias = "caixa")]
    SharedPool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    #[serde(alias = "categoria")]
    pub category: String,

    #[serde(default, alias = "valor")]
    pub amount: f64,

    #[serde(alias = "pagoPor")]
    pub payer: ExpensePayer,
}

impl Expense {
    pub fn new(category: impl Into<String>, amount: f64, payer: ExpensePayer) -> Self {
        Self {
            category: category.into(),
            amount,
            payer,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SalesEvent {
    pub id: String,

    #[serde(alias = "nome")]
    pub name: String,

    #[serde(alias = "data")]
    #[schemars(description = "Date the race took place, YYYY-MM-DD")]
    pub date: NaiveDate,

    #[serde(alias = "pagadorFreelancers")]
    #[schemars(description = "Partner whose bank account pays the freelancers")]
    pub freelancer_payer: PartnerSlot,

    #[serde(default = "default_commission_percent", alias = "comissaoPercentual")]
    #[schemars(description = "Platform commission in percent (10.0 = 10%)")]
    pub commission_percent: f64,

    #[serde(default = "default_true", alias = "dividirLucro")]
    #[schemars(description = "Whether the profit is split between the partners with a balancing transfer")]
    pub split_profit: bool,

    #[serde(default)]
    #[schemars(description = "Share of the profit belonging to partner A (0.0 - 1.0)")]
    pub split: SplitRatio,

    #[serde(default, alias = "vendas")]
    pub sales: Vec<Sale>,

    #[serde(default, alias = "despesas")]
    pub expenses: Vec<Expense>,
}

impl SalesEvent {
    pub fn new(id: impl Into<String>, name: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            date,
            freelancer_payer: PartnerSlot::A,
            commission_percent: DEFAULT_COMMISSION_PERCENT,
            split_profit: true,
            split: SplitRatio::EVEN,
            sales: Vec::new(),
            expenses: Vec::new(),
        }
    }

    pub fn partner_sale(&self, slot: PartnerSlot) -> Option<&Sale> {
        self.sales.iter().find(|s| s.partner_slot() == Some(slot))
    }

    pub fn partner_count(&self) -> usize {
        self.sales.iter().filter(|s| s.partner_slot().is_some()).count()
    }

    /// Fails when the event has more than two partner sales or two sales
    /// claiming the same partner slot.
    pub fn check_partners(&self) -> crate::error::Result<()> {
        let count = self.partner_count();
        if count > 2 {
            return Err(RevenueError::TooManyPartners {
                event: self.id.clone(),
                count,
            });
        }

        let mut seen = [false; 2];
        for slot in self.sales.iter().filter_map(Sale::partner_slot) {
            if std::mem::replace(&mut seen[slot as usize], true) {
                return Err(RevenueError::DuplicatePartnerSlot {
                    event: self.id.clone(),
                    slot,
                });
            }
        }

        Ok(())
    }

    pub fn from_json(json: &str) -> crate::error::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(SalesEvent)
    }

    pub fn schema_as_json() -> Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}
