use crate::calculator::{EventSummary, PartnerPosition};
use crate::error::{Result, RevenueError};
use crate::schema::{PartnerSlot, SalesEvent};
use crate::utils::{differs, finite_or_zero, MONEY_TOLERANCE};
use serde::{Deserialize, Serialize};

/// Payment one partner owes the other after an event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Settlement {
    pub from: PartnerSlot,
    pub to: PartnerSlot,
    pub amount: f64,
}

impl Settlement {
    /// Cash held by `position` once this transfer has been made.
    pub fn final_position(&self, position: &PartnerPosition) -> f64 {
        if position.slot == self.from {
            position.cash_position - self.amount
        } else if position.slot == self.to {
            position.cash_position + self.amount
        } else {
            position.cash_position
        }
    }
}

pub struct SettlementBalancer<'a> {
    partner_a: &'a PartnerPosition,
    partner_b: &'a PartnerPosition,
}

impl<'a> SettlementBalancer<'a> {
    pub fn new(partner_a: &'a PartnerPosition, partner_b: &'a PartnerPosition) -> Self {
        Self {
            partner_a,
            partner_b,
        }
    }

    /// The partner holding more cash hands over whatever exceeds their ideal share.
    pub fn settle(&self) -> Option<Settlement> {
        let (a, b) = (self.partner_a, self.partner_b);
        if !differs(a.cash_position, b.cash_position, MONEY_TOLERANCE) {
            return None;
        }

        let (high, low) = if a.cash_position > b.cash_position {
            (a, b)
        } else {
            (b, a)
        };

        let surplus = high.surplus();
        if surplus <= MONEY_TOLERANCE {
            return None;
        }

        Some(Settlement {
            from: high.slot,
            to: low.slot,
            amount: surplus,
        })
    }

    pub fn verify(&self, settlement: Option<&Settlement>, tolerance: f64) -> Result<()> {
        let pct_total = self.partner_a.percentage + self.partner_b.percentage;
        check("partner percentages", 100.0, pct_total, tolerance)?;

        if let Some(settlement) = settlement {
            if settlement.amount <= 0.0 {
                return Err(RevenueError::ReconciliationMismatch {
                    check: "settlement amount".to_string(),
                    expected: 0.0,
                    actual: settlement.amount,
                });
            }

            let payer = match settlement.from {
                PartnerSlot::A => self.partner_a,
                PartnerSlot::B => self.partner_b,
            };
            check(
                "payer final position",
                payer.ideal_share,
                settlement.final_position(payer),
                tolerance,
            )?;
        }

        Ok(())
    }
}

pub fn settle(partner_a: &PartnerPosition, partner_b: &PartnerPosition) -> Option<Settlement> {
    SettlementBalancer::new(partner_a, partner_b).settle()
}

/// Re-derives the arithmetic identities of `summary` from `event`.
pub fn verify_reconciliation(
    event: &SalesEvent,
    summary: &EventSummary,
    tolerance: f64,
) -> Result<()> {
    let sold: f64 = event.sales.iter().map(|s| finite_or_zero(s.amount_sold)).sum();
    check("gross", sold, summary.gross, tolerance)?;

    let rate = summary.commission_percent / 100.0;
    check(
        "distributable",
        summary.gross * (1.0 - rate) - summary.freelancer_cost,
        summary.distributable,
        tolerance,
    )?;
    check(
        "net profit",
        summary.distributable - summary.total_expenses,
        summary.net_profit,
        tolerance,
    )?;

    SettlementBalancer::new(&summary.partner_a, &summary.partner_b)
        .verify(summary.settlement.as_ref(), tolerance)
}

fn check(name: &str, expected: f64, actual: f64, tolerance: f64) -> Result<()> {
    if differs(expected, actual, tolerance) || !actual.is_finite() {
        return Err(RevenueError::ReconciliationMismatch {
            check: name.to_string(),
            expected,
            actual,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position(slot: PartnerSlot, cash_position: f64, ideal_share: f64) -> PartnerPosition {
        PartnerPosition {
            slot,
            name: None,
            percentage: 50.0,
            amount_sold: 0.0,
            bank_total: cash_position,
            freelancer_payment: 0.0,
            expenses_paid: 0.0,
            cash_position,
            ideal_share,
        }
    }

    #[test]
    fn test_higher_position_pays_surplus() {
        let a = position(PartnerSlot::A, 700.0, 450.0);
        let b = position(PartnerSlot::B, 200.0, 450.0);

        let settlement = settle(&a, &b).unwrap();

        assert_eq!(settlement.from, PartnerSlot::A);
        assert_eq!(settlement.to, PartnerSlot::B);
        assert!((settlement.amount - 250.0).abs() < 1e-9);
        assert!((settlement.final_position(&a) - 450.0).abs() < 1e-9);
        assert!((settlement.final_position(&b) - 450.0).abs() < 1e-9);
    }

    #[test]
    fn test_equal_positions_no_transfer() {
        let a = position(PartnerSlot::A, 450.0, 450.0);
        let b = position(PartnerSlot::B, 450.004, 450.0);
        assert!(settle(&a, &b).is_none());
    }

    #[test]
    fn test_no_transfer_without_surplus() {
        let a = position(PartnerSlot::A, 300.0, 450.0);
        let b = position(PartnerSlot::B, 100.0, 450.0);
        assert!(settle(&a, &b).is_none());
    }

    #[test]
    fn test_verify_rejects_bad_percentages() {
        let mut a = position(PartnerSlot::A, 700.0, 450.0);
        a.percentage = 60.0;
        let b = position(PartnerSlot::B, 200.0, 450.0);

        let balancer = SettlementBalancer::new(&a, &b);
        assert!(matches!(
            balancer.verify(None, 0.01),
            Err(RevenueError::ReconciliationMismatch { .. })
        ));
    }

    #[test]
    fn test_verify_rejects_short_transfer() {
        let a = position(PartnerSlot::A, 700.0, 450.0);
        let b = position(PartnerSlot::B, 200.0, 450.0);
        let short = Settlement {
            from: PartnerSlot::A,
            to: PartnerSlot::B,
            amount: 100.0,
        };

        let balancer = SettlementBalancer::new(&a, &b);
        assert!(balancer.verify(Some(&short), 0.01).is_err());
        assert!(balancer.verify(settle(&a, &b).as_ref(), 0.01).is_ok());
    }
}
