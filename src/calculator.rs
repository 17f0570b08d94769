use crate::balancer::{settle, Settlement};
use crate::schema::{ExpensePayer, PartnerSlot, SalesEvent};
use crate::utils::finite_or_zero;
use log::debug;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SplitMode {
    /// Each partner is entitled to half of the profit regardless of the stored split.
    Equal,
    /// Each partner is entitled to their percentage of the profit.
    #[default]
    Weighted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartnerPosition {
    pub slot: PartnerSlot,
    pub name: Option<String>,
    pub percentage: f64,
    pub amount_sold: f64,
    pub bank_total: f64,
    /// Freelancer fees paid out of this partner's account
    pub freelancer_payment: f64,
    /// Expenses this partner paid personally
    pub expenses_paid: f64,
    /// Money held after freelancer payments and expenses
    pub cash_position: f64,
    /// What this partner should end up holding
    pub ideal_share: f64,
}

impl PartnerPosition {
    pub fn surplus(&self) -> f64 {
        self.cash_position - self.ideal_share
    }

    /// The partner's name, or the slot when no partner sale exists.
    pub fn label(&self) -> String {
        match self.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => self.slot.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventSummary {
    pub event_id: String,
    pub gross: f64,
    pub commission_percent: f64,
    pub platform_fee: f64,
    pub net: f64,
    pub freelancer_cost: f64,
    pub distributable: f64,
    pub total_expenses: f64,
    pub shared_pool_expenses: f64,
    pub net_profit: f64,
    pub split_mode: SplitMode,
    pub partner_a: PartnerPosition,
    pub partner_b: PartnerPosition,
    pub settlement: Option<Settlement>,
}

impl EventSummary {
    pub fn partner(&self, slot: PartnerSlot) -> &PartnerPosition {
        match slot {
            PartnerSlot::A => &self.partner_a,
            PartnerSlot::B => &self.partner_b,
        }
    }
}

/// Computes the revenue summary of a single event.
///
/// Money flows in a fixed order: the platform keeps `commission_percent` of
/// the gross, freelancer fees come out of what is left (`distributable`), and
/// expenses come out of that, leaving the `net_profit` the partners share.
/// Each partner's cash position starts at their bank total. The partner who
/// pays the freelancers carries the whole freelancer cost, partner-paid
/// expenses are carried by whoever paid them, and shared-pool expenses touch
/// no partner ledger.
#[derive(Debug, Clone, Copy, Default)]
pub struct RevenueCalculator {
    mode: SplitMode,
}

impl RevenueCalculator {
    pub fn new(mode: SplitMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> SplitMode {
        self.mode
    }

    pub fn summarize(&self, event: &SalesEvent) -> EventSummary {
        let gross: f64 = event.sales.iter().map(|s| finite_or_zero(s.amount_sold)).sum();
        let commission_percent = finite_or_zero(event.commission_percent);
        let platform_fee = gross * commission_percent / 100.0;
        let net = gross - platform_fee;

        let freelancer_cost: f64 = event
            .sales
            .iter()
            .filter(|s| s.is_freelancer())
            .map(|s| finite_or_zero(s.amount_paid))
            .sum();
        let distributable = net - freelancer_cost;

        let total_expenses: f64 = event.expenses.iter().map(|e| finite_or_zero(e.amount)).sum();
        let shared_pool_expenses = expenses_paid_by(event, ExpensePayer::SharedPool);
        let net_profit = distributable - total_expenses;

        let partner_a = self.partner_position(event, PartnerSlot::A, freelancer_cost, net_profit);
        let partner_b = self.partner_position(event, PartnerSlot::B, freelancer_cost, net_profit);

        let settlement = if event.split_profit {
            settle(&partner_a, &partner_b)
        } else {
            None
        };

        debug!(
            "Event '{}': gross {:.2}, fee {:.2}, freelancers {:.2}, expenses {:.2}, profit {:.2}",
            event.id, gross, platform_fee, freelancer_cost, total_expenses, net_profit
        );

        EventSummary {
            event_id: event.id.clone(),
            gross,
            commission_percent,
            platform_fee,
            net,
            freelancer_cost,
            distributable,
            total_expenses,
            shared_pool_expenses,
            net_profit,
            split_mode: self.mode,
            partner_a,
            partner_b,
            settlement,
        }
    }

    fn partner_position(
        &self,
        event: &SalesEvent,
        slot: PartnerSlot,
        freelancer_cost: f64,
        net_profit: f64,
    ) -> PartnerPosition {
        let partner_sales: Vec<_> = event
            .sales
            .iter()
            .filter(|s| s.partner_slot() == Some(slot))
            .collect();

        let name = partner_sales.first().map(|s| s.name.clone());
        let amount_sold: f64 = partner_sales.iter().map(|s| finite_or_zero(s.amount_sold)).sum();
        let bank_total: f64 = partner_sales.iter().map(|s| finite_or_zero(s.bank_total)).sum();

        let freelancer_payment = if event.freelancer_payer == slot {
            freelancer_cost
        } else {
            0.0
        };
        let expenses_paid = expenses_paid_by(event, ExpensePayer::Partner(slot));

        let percentage = match self.mode {
            SplitMode::Equal => 50.0,
            SplitMode::Weighted => event.split.percentage(slot),
        };

        PartnerPosition {
            slot,
            name,
            percentage,
            amount_sold,
            bank_total,
            freelancer_payment,
            expenses_paid,
            cash_position: bank_total - freelancer_payment - expenses_paid,
            ideal_share: net_profit * percentage / 100.0,
        }
    }
}

fn expenses_paid_by(event: &SalesEvent, payer: ExpensePayer) -> f64 {
    event
        .expenses
        .iter()
        .filter(|e| e.payer == payer)
        .map(|e| finite_or_zero(e.amount))
        .sum()
}

/// Summarizes an event with the split stored on the event.
pub fn summarize_event(event: &SalesEvent) -> EventSummary {
    RevenueCalculator::default().summarize(event)
}

pub fn summarize_event_with(event: &SalesEvent, mode: SplitMode) -> EventSummary {
    RevenueCalculator::new(mode).summarize(event)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Expense, Sale, SplitRatio};
    use chrono::NaiveDate;

    fn event_with(sales: Vec<Sale>, expenses: Vec<Expense>) -> SalesEvent {
        let mut event = SalesEvent::new(
            "evt-1",
            "Meia Maratona",
            NaiveDate::from_ymd_opt(2024, 4, 14).unwrap(),
        );
        event.sales = sales;
        event.expenses = expenses;
        event
    }

    #[test]
    fn test_even_split_without_freelancers() {
        let event = event_with(
            vec![
                Sale::partner("Ana", PartnerSlot::A, 600.0, 600.0),
                Sale::partner("Bruno", PartnerSlot::B, 400.0, 400.0),
            ],
            vec![],
        );

        let summary = summarize_event(&event);

        assert!((summary.gross - 1000.0).abs() < 1e-9);
        assert!((summary.platform_fee - 100.0).abs() < 1e-9);
        assert!((summary.net - 900.0).abs() < 1e-9);
        assert!((summary.distributable - 900.0).abs() < 1e-9);
        assert!((summary.partner_a.ideal_share - 450.0).abs() < 1e-9);
        assert!((summary.partner_b.ideal_share - 450.0).abs() < 1e-9);
        assert_eq!(summary.partner_a.name.as_deref(), Some("Ana"));
    }

    #[test]
    fn test_partner_label_prefers_name() {
        let event = event_with(vec![Sale::partner("Ana", PartnerSlot::A, 100.0, 100.0)], vec![]);
        let summary = summarize_event(&event);

        assert_eq!(summary.partner_a.label(), "Ana");
        assert_eq!(summary.partner_b.label(), "Partner B");
    }

    #[test]
    fn test_freelancer_cost_charged_to_payer() {
        let mut event = event_with(
            vec![
                Sale::partner("Ana", PartnerSlot::A, 500.0, 900.0),
                Sale::partner("Bruno", PartnerSlot::B, 300.0, 300.0),
                Sale::freelancer("Carla", 200.0, 120.0),
            ],
            vec![],
        );
        event.freelancer_payer = PartnerSlot::B;

        let summary = summarize_event(&event);

        assert!((summary.freelancer_cost - 120.0).abs() < 1e-9);
        assert!((summary.distributable - (1000.0 * 0.9 - 120.0)).abs() < 1e-9);
        assert_eq!(summary.partner_a.freelancer_payment, 0.0);
        assert!((summary.partner_a.cash_position - 900.0).abs() < 1e-9);
        assert!((summary.partner_b.cash_position - 180.0).abs() < 1e-9);
    }

    #[test]
    fn test_weighted_versus_equal_mode() {
        let mut event = event_with(
            vec![
                Sale::partner("Ana", PartnerSlot::A, 700.0, 700.0),
                Sale::partner("Bruno", PartnerSlot::B, 300.0, 300.0),
            ],
            vec![],
        );
        event.split = SplitRatio::from_percentage(PartnerSlot::A, 70.0);

        let weighted = summarize_event(&event);
        assert!((weighted.partner_a.ideal_share - 630.0).abs() < 1e-9);
        assert!((weighted.partner_b.ideal_share - 270.0).abs() < 1e-9);

        let equal = summarize_event_with(&event, SplitMode::Equal);
        assert!((equal.partner_a.ideal_share - 450.0).abs() < 1e-9);
        assert!((equal.partner_b.ideal_share - 450.0).abs() < 1e-9);
        assert_eq!(equal.split_mode, SplitMode::Equal);
    }

    #[test]
    fn test_shared_pool_expense_not_on_partner_ledgers() {
        let event = event_with(
            vec![
                Sale::partner("Ana", PartnerSlot::A, 500.0, 500.0),
                Sale::partner("Bruno", PartnerSlot::B, 500.0, 500.0),
            ],
            vec![
                Expense::new("Combustível", 100.0, ExpensePayer::SharedPool),
                Expense::new("Lanche", 40.0, ExpensePayer::Partner(PartnerSlot::B)),
            ],
        );

        let summary = summarize_event(&event);

        assert!((summary.total_expenses - 140.0).abs() < 1e-9);
        assert!((summary.shared_pool_expenses - 100.0).abs() < 1e-9);
        assert!((summary.net_profit - (900.0 - 140.0)).abs() < 1e-9);
        assert_eq!(summary.partner_a.expenses_paid, 0.0);
        assert!((summary.partner_b.expenses_paid - 40.0).abs() < 1e-9);
        assert!((summary.partner_a.cash_position - 500.0).abs() < 1e-9);
        assert!((summary.partner_b.cash_position - 460.0).abs() < 1e-9);
    }

    #[test]
    fn test_non_finite_inputs_coalesce_to_zero() {
        let mut sale = Sale::partner("Ana", PartnerSlot::A, f64::NAN, 100.0);
        sale.amount_paid = f64::INFINITY;
        let event = event_with(vec![sale, Sale::freelancer("Rui", 50.0, f64::NAN)], vec![]);

        let summary = summarize_event(&event);

        assert!((summary.gross - 50.0).abs() < 1e-9);
        assert_eq!(summary.freelancer_cost, 0.0);
    }

    #[test]
    fn test_no_settlement_when_profit_not_split() {
        let mut event = event_with(
            vec![
                Sale::partner("Ana", PartnerSlot::A, 900.0, 900.0),
                Sale::partner("Bruno", PartnerSlot::B, 100.0, 100.0),
            ],
            vec![],
        );
        assert!(summarize_event(&event).settlement.is_some());

        event.split_profit = false;
        assert!(summarize_event(&event).settlement.is_none());
    }
}
