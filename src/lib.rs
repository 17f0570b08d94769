//! # Race Event Revenue
//!
//! Settles the money of a race event between the two partners who run the
//! photography business.
//!
//! ## Core Concepts
//!
//! - **Gross**: everything sold at the event, by partners and freelancers alike
//! - **Platform fee**: the commission kept by the sales platform (10% unless the event says otherwise)
//! - **Distributable**: what is left after the platform fee and the freelancer fees
//! - **Net profit**: distributable minus the event's expenses, shared by the partners
//! - **Balancing transfer**: the payment one partner makes to the other so both
//!   end up holding their share of the profit
//!
//! ## Example
//!
//! ```rust,ignore
//! use race_event_revenue::*;
//! use chrono::NaiveDate;
//!
//! let mut event = SalesEvent::new("evt-1", "Meia Maratona", NaiveDate::from_ymd_opt(2024, 4, 14).unwrap());
//! event.freelancer_payer = PartnerSlot::A;
//! event.sales = vec![
//!     Sale::partner("Ana", PartnerSlot::A, 2788.51, 2788.51),
//!     Sale::partner("Bruno", PartnerSlot::B, 1784.25, 1784.25),
//!     Sale::freelancer("Carla", 0.0, 300.0),
//! ];
//!
//! let summary = reconcile_event(&event).unwrap();
//! if let Some(transfer) = summary.settlement {
//!     println!("{} pays {} {}", transfer.from, transfer.to,
//!         format_currency(transfer.amount, NumberLocale::PtBr));
//! }
//! ```

pub mod balancer;
pub mod calculator;
pub mod currency;
pub mod error;
pub mod form;
pub mod ingestion;
pub mod reporting;
pub mod schema;
pub mod utils;

pub use balancer::{settle, verify_reconciliation, Settlement, SettlementBalancer};
pub use calculator::{
    summarize_event, summarize_event_with, EventSummary, PartnerPosition, RevenueCalculator,
    SplitMode,
};
pub use currency::{format_amount, format_currency, NumberLocale};
pub use error::{Result, RevenueError};
pub use form::{EventForm, SyncReport, SYNC_TOLERANCE};
pub use ingestion::*;
pub use reporting::*;
pub use schema::*;
pub use utils::*;

use log::{debug, info};

pub struct EventReconciler;

impl EventReconciler {
    pub fn reconcile(event: &SalesEvent, mode: SplitMode) -> Result<EventSummary> {
        validate_event_integrity(event)?;

        info!("Reconciling event '{}' ({})", event.name, event.date);
        debug!(
            "Event contains {} sales and {} expenses",
            event.sales.len(),
            event.expenses.len()
        );

        let summary = RevenueCalculator::new(mode).summarize(event);

        match &summary.settlement {
            Some(s) => debug!(
                "{} transfers {:.2} to {}",
                summary.partner(s.from).label(),
                s.amount,
                summary.partner(s.to).label()
            ),
            None => debug!("No balancing transfer needed"),
        }

        Ok(summary)
    }

    pub fn reconcile_with_verification(
        event: &SalesEvent,
        mode: SplitMode,
        tolerance: f64,
    ) -> Result<EventSummary> {
        let summary = Self::reconcile(event, mode)?;

        verify_reconciliation(event, &summary, tolerance)?;

        Ok(summary)
    }
}

pub fn reconcile_event(event: &SalesEvent) -> Result<EventSummary> {
    EventReconciler::reconcile(event, SplitMode::Weighted)
}

pub fn reconcile_with_verification(event: &SalesEvent, tolerance: f64) -> Result<EventSummary> {
    EventReconciler::reconcile_with_verification(event, SplitMode::Weighted, tolerance)
}

fn validate_event_integrity(event: &SalesEvent) -> Result<()> {
    let commission = event.commission_percent;
    if !commission.is_finite() || !(0.0..=100.0).contains(&commission) {
        return Err(RevenueError::InvalidCommission(commission));
    }

    event.check_partners()
}
