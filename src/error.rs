use crate::schema::PartnerSlot;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RevenueError {
    #[error("Gross sold amount must be greater than zero (got {0})")]
    NonPositiveGross(f64),

    #[error("Expense #{index} has an empty category")]
    EmptyExpenseCategory { index: usize },

    #[error("Invalid commission percentage {0}: must be between 0 and 100")]
    InvalidCommission(f64),

    #[error("Invalid split ratio {0}: must be between 0.0 and 1.0")]
    InvalidSplitRatio(f64),

    #[error("Event '{event}' has {count} partner sales, expected at most 2")]
    TooManyPartners { event: String, count: usize },

    #[error("Event '{event}' has more than one partner sale in slot {slot:?}")]
    DuplicatePartnerSlot { event: String, slot: PartnerSlot },

    #[error("Record references unknown event: {0}")]
    UnknownEvent(String),

    #[error("Unknown contributor role '{role}' for '{name}'")]
    UnknownRole { name: String, role: String },

    #[error("Unknown expense payer '{payer}' in event '{event}'")]
    UnknownPayer { event: String, payer: String },

    #[error("Sale index {0} is out of range")]
    SaleIndexOutOfRange(usize),

    #[error("Expense index {0} is out of range")]
    ExpenseIndexOutOfRange(usize),

    #[error("Reconciliation mismatch in {check}: expected {expected}, got {actual}")]
    ReconciliationMismatch {
        check: String,
        expected: f64,
        actual: f64,
    },

    #[error("Date calculation error: {0}")]
    DateError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RevenueError>;
