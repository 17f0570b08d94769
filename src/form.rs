use crate::calculator::{EventSummary, RevenueCalculator, SplitMode};
use crate::error::{Result, RevenueError};
use crate::schema::{Expense, PartnerSlot, Sale, SalesEvent, SplitRatio};
use crate::utils::{differs, finite_or_zero};
use chrono::NaiveDate;
use log::{debug, warn};

pub const SYNC_TOLERANCE: f64 = 0.01;

/// Which derived fields a sync wrote back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub gross_changed: bool,
    pub distributable_changed: bool,
    pub net_profit_changed: bool,
    /// Indices into `sales` whose `net_amount` was rewritten
    pub partner_nets_changed: Vec<usize>,
}

impl SyncReport {
    pub fn is_converged(&self) -> bool {
        !self.gross_changed
            && !self.distributable_changed
            && !self.net_profit_changed
            && self.partner_nets_changed.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct EventForm {
    event: SalesEvent,
    calculator: RevenueCalculator,
    gross: f64,
    distributable: f64,
    net_profit: f64,
}

impl EventForm {
    pub fn new(id: impl Into<String>, name: impl Into<String>, date: NaiveDate) -> Self {
        Self::from_event(SalesEvent::new(id, name, date))
    }

    /// Opens an existing event for editing.
    pub fn from_event(event: SalesEvent) -> Self {
        let mut form = Self {
            event,
            calculator: RevenueCalculator::new(SplitMode::Weighted),
            gross: 0.0,
            distributable: 0.0,
            net_profit: 0.0,
        };
        form.sync();
        form
    }

    pub fn event(&self) -> &SalesEvent {
        &self.event
    }

    pub fn gross(&self) -> f64 {
        self.gross
    }

    pub fn distributable(&self) -> f64 {
        self.distributable
    }

    pub fn net_profit(&self) -> f64 {
        self.net_profit
    }

    pub fn partner_percentage(&self, slot: PartnerSlot) -> f64 {
        self.event.split.percentage(slot)
    }

    pub fn summary(&self) -> EventSummary {
        self.calculator.summarize(&self.event)
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.event.name = name.into();
    }

    pub fn set_date(&mut self, date: NaiveDate) {
        self.event.date = date;
    }

    pub fn set_commission_percent(&mut self, percent: f64) -> SyncReport {
        self.event.commission_percent = finite_or_zero(percent);
        self.sync()
    }

    pub fn set_freelancer_payer(&mut self, slot: PartnerSlot) -> SyncReport {
        self.event.freelancer_payer = slot;
        self.sync()
    }

    pub fn set_split_profit(&mut self, split_profit: bool) -> SyncReport {
        self.event.split_profit = split_profit;
        self.sync()
    }

    fn partner_label(&self, slot: PartnerSlot) -> String {
        self.event
            .partner_sale(slot)
            .map(|sale| sale.name.trim())
            .filter(|name| !name.is_empty())
            .map_or_else(|| slot.to_string(), str::to_string)
    }

    /// Sets one partner's percentage; the other partner receives `100 - percent`.
    pub fn set_partner_percentage(&mut self, slot: PartnerSlot, percent: f64) -> SyncReport {
        self.event.split = SplitRatio::from_percentage(slot, percent);
        debug!(
            "Split updated: {} {:.2}% / {} {:.2}%",
            self.partner_label(PartnerSlot::A),
            self.event.split.percentage(PartnerSlot::A),
            self.partner_label(PartnerSlot::B),
            self.event.split.percentage(PartnerSlot::B)
        );
        self.sync()
    }

    pub fn add_sale(&mut self, sale: Sale) -> SyncReport {
        self.event.sales.push(sale);
        self.sync()
    }

    pub fn remove_sale(&mut self, index: usize) -> Result<SyncReport> {
        if index >= self.event.sales.len() {
            return Err(RevenueError::SaleIndexOutOfRange(index));
        }
        self.event.sales.remove(index);
        Ok(self.sync())
    }

    pub fn set_amount_sold(&mut self, index: usize, amount: f64) -> Result<SyncReport> {
        self.sale_mut(index)?.amount_sold = finite_or_zero(amount);
        Ok(self.sync())
    }

    pub fn set_bank_total(&mut self, index: usize, amount: f64) -> Result<SyncReport> {
        self.sale_mut(index)?.bank_total = finite_or_zero(amount);
        Ok(self.sync())
    }

    pub fn set_amount_paid(&mut self, index: usize, amount: f64) -> Result<SyncReport> {
        self.sale_mut(index)?.amount_paid = finite_or_zero(amount);
        Ok(self.sync())
    }

    pub fn add_expense(&mut self, expense: Expense) -> SyncReport {
        self.event.expenses.push(expense);
        self.sync()
    }

    pub fn update_expense(&mut self, index: usize, expense: Expense) -> Result<SyncReport> {
        let slot = self
            .event
            .expenses
            .get_mut(index)
            .ok_or(RevenueError::ExpenseIndexOutOfRange(index))?;
        *slot = expense;
        Ok(self.sync())
    }

    pub fn remove_expense(&mut self, index: usize) -> Result<SyncReport> {
        if index >= self.event.expenses.len() {
            return Err(RevenueError::ExpenseIndexOutOfRange(index));
        }
        self.event.expenses.remove(index);
        Ok(self.sync())
    }

    fn sale_mut(&mut self, index: usize) -> Result<&mut Sale> {
        self.event
            .sales
            .get_mut(index)
            .ok_or(RevenueError::SaleIndexOutOfRange(index))
    }

    /// Recomputes derived values, committing only those that moved past the tolerance.
    pub fn sync(&mut self) -> SyncReport {
        let summary = self.calculator.summarize(&self.event);
        let mut report = SyncReport::default();

        if differs(self.gross, summary.gross, SYNC_TOLERANCE) {
            self.gross = summary.gross;
            report.gross_changed = true;
        }
        if differs(self.distributable, summary.distributable, SYNC_TOLERANCE) {
            self.distributable = summary.distributable;
            report.distributable_changed = true;
        }
        if differs(self.net_profit, summary.net_profit, SYNC_TOLERANCE) {
            self.net_profit = summary.net_profit;
            report.net_profit_changed = true;
        }

        for (idx, sale) in self.event.sales.iter_mut().enumerate() {
            let Some(slot) = sale.partner_slot() else {
                continue;
            };
            let target = summary.partner(slot).ideal_share;
            if differs(sale.net_amount, target, SYNC_TOLERANCE) {
                sale.net_amount = target;
                report.partner_nets_changed.push(idx);
            }
        }

        report
    }

    /// Checks performed before an event may be saved.
    pub fn validate(&self) -> Result<()> {
        let gross: f64 = self
            .event
            .sales
            .iter()
            .map(|s| finite_or_zero(s.amount_sold))
            .sum();
        if gross <= 0.0 {
            return Err(RevenueError::NonPositiveGross(gross));
        }

        for (index, expense) in self.event.expenses.iter().enumerate() {
            if expense.category.trim().is_empty() {
                return Err(RevenueError::EmptyExpenseCategory { index });
            }
        }

        let commission = self.event.commission_percent;
        if !(0.0..=100.0).contains(&commission) {
            return Err(RevenueError::InvalidCommission(commission));
        }

        self.event.check_partners()
    }

    /// Validates and hands back the finished event.
    pub fn submit(mut self) -> Result<SalesEvent> {
        if let Err(e) = self.validate() {
            warn!("Rejected submission of event '{}': {}", self.event.id, e);
            return Err(e);
        }
        self.sync();
        Ok(self.event)
    }
}
