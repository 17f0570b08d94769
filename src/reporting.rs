use crate::calculator::{RevenueCalculator, SplitMode};
use crate::error::Result;
use crate::schema::{PartnerSlot, SalesEvent};
use crate::utils::{finite_or_zero, first_day_of_month, last_day_of_month, month_key, month_label, parse_month_string};
use chrono::{Datelike, NaiveDate};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportFilter {
    /// Restrict to these event ids
    pub event_ids: Option<Vec<String>>,
    /// Restrict to events this contributor took part in (case-insensitive)
    pub contributor: Option<String>,
    pub month: Option<u32>,
    pub year: Option<i32>,
}

impl ReportFilter {
    pub fn with_events<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.event_ids = Some(ids.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_contributor(mut self, name: impl Into<String>) -> Self {
        self.contributor = Some(name.into());
        self
    }

    pub fn with_month(mut self, month: u32) -> Self {
        self.month = Some(month);
        self
    }

    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    /// Sets month and year from a "YYYY-MM" string.
    pub fn with_month_string(self, month: &str) -> Result<Self> {
        let (year, month) = parse_month_string(month)?;
        Ok(self.with_year(year).with_month(month))
    }

    fn contributor_key(&self) -> Option<String> {
        self.contributor
            .as_deref()
            .map(normalize_name)
            .filter(|n| !n.is_empty())
    }

    pub fn matches(&self, event: &SalesEvent) -> bool {
        if let Some(ids) = &self.event_ids {
            if !ids.iter().any(|id| id == &event.id) {
                return false;
            }
        }
        if let Some(month) = self.month {
            if event.date.month() != month {
                return false;
            }
        }
        if let Some(year) = self.year {
            if event.date.year() != year {
                return false;
            }
        }
        if let Some(key) = self.contributor_key() {
            if !event.sales.iter().any(|s| normalize_name(&s.name) == key) {
                return false;
            }
        }
        true
    }
}

fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

pub fn filter_events<'a>(events: &'a [SalesEvent], filter: &ReportFilter) -> Vec<&'a SalesEvent> {
    events.iter().filter(|e| filter.matches(e)).collect()
}

#[derive(Debug, Clone)]
pub struct MonthGroup<'a> {
    pub year: i32,
    pub month: u32,
    /// e.g. "Março de 2024"
    pub label: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub gross: f64,
    pub events: Vec<&'a SalesEvent>,
}

/// Groups the matching events by calendar month, oldest month first.
pub fn group_by_month<'a>(
    events: &'a [SalesEvent],
    filter: &ReportFilter,
) -> Result<Vec<MonthGroup<'a>>> {
    let mut buckets: BTreeMap<(i32, u32), Vec<&'a SalesEvent>> = BTreeMap::new();
    for event in filter_events(events, filter) {
        buckets.entry(month_key(event.date)).or_default().push(event);
    }

    let mut groups = Vec::with_capacity(buckets.len());
    for ((year, month), mut bucket) in buckets {
        bucket.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.name.cmp(&b.name)));
        let gross = bucket
            .iter()
            .flat_map(|e| e.sales.iter())
            .map(|s| finite_or_zero(s.amount_sold))
            .sum();

        groups.push(MonthGroup {
            year,
            month,
            label: month_label(year, month)?,
            start: first_day_of_month(year, month)?,
            end: last_day_of_month(year, month)?,
            gross,
            events: bucket,
        });
    }

    debug!("Grouped events into {} months", groups.len());
    Ok(groups)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContributorStats {
    pub name: String,
    pub total_sold: f64,
    pub total_paid: f64,
    pub event_count: usize,
    pub profit: f64,
    /// Profit as a percentage of the amount sold
    pub margin: f64,
}

/// Ranks contributors by total sold, highest first.
///
/// Names are matched case-insensitively; the first spelling seen is kept.
/// With a contributor filter only that contributor is ranked.
pub fn contributor_ranking(events: &[SalesEvent], filter: &ReportFilter) -> Vec<ContributorStats> {
    let only = filter.contributor_key();
    let mut stats: HashMap<String, ContributorStats> = HashMap::new();

    for event in filter_events(events, filter) {
        let mut seen_in_event: HashSet<String> = HashSet::new();

        for sale in &event.sales {
            let key = normalize_name(&sale.name);
            if key.is_empty() || only.as_ref().is_some_and(|o| o != &key) {
                continue;
            }

            let entry = stats.entry(key.clone()).or_insert_with(|| ContributorStats {
                name: sale.name.trim().to_string(),
                total_sold: 0.0,
                total_paid: 0.0,
                event_count: 0,
                profit: 0.0,
                margin: 0.0,
            });
            entry.total_sold += finite_or_zero(sale.amount_sold);
            entry.total_paid += finite_or_zero(sale.amount_paid);
            if seen_in_event.insert(key) {
                entry.event_count += 1;
            }
        }
    }

    let mut ranking: Vec<ContributorStats> = stats
        .into_values()
        .map(|mut s| {
            s.profit = s.total_sold - s.total_paid;
            s.margin = if s.total_sold != 0.0 {
                s.profit / s.total_sold * 100.0
            } else {
                0.0
            };
            s
        })
        .collect();

    ranking.sort_by(|a, b| {
        b.total_sold
            .total_cmp(&a.total_sold)
            .then_with(|| a.name.cmp(&b.name))
    });
    ranking
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportTotals {
    pub event_count: usize,
    pub total_revenue: f64,
    pub total_platform_fees: f64,
    pub total_net_profit: f64,
    pub total_expenses: f64,
    pub total_freelancer_spend: f64,
    pub partner_a_share: f64,
    pub partner_b_share: f64,
}

impl ReportTotals {
    pub fn partner_share(&self, slot: PartnerSlot) -> f64 {
        match slot {
            PartnerSlot::A => self.partner_a_share,
            PartnerSlot::B => self.partner_b_share,
        }
    }
}

/// Sums the per-event summaries of every matching event.
///
/// Each event's own commission is used.
pub fn aggregate_totals(events: &[SalesEvent], filter: &ReportFilter) -> ReportTotals {
    let calculator = RevenueCalculator::new(SplitMode::Weighted);
    let mut totals = ReportTotals::default();

    for event in filter_events(events, filter) {
        let summary = calculator.summarize(event);
        totals.event_count += 1;
        totals.total_revenue += summary.gross;
        totals.total_platform_fees += summary.platform_fee;
        totals.total_net_profit += summary.net_profit;
        totals.total_expenses += summary.total_expenses;
        totals.total_freelancer_spend += summary.freelancer_cost;
        totals.partner_a_share += summary.partner_a.ideal_share;
        totals.partner_b_share += summary.partner_b.ideal_share;
    }

    totals
}

#[derive(Debug, Clone)]
pub struct EventReport<'a> {
    pub months: Vec<MonthGroup<'a>>,
    pub ranking: Vec<ContributorStats>,
    pub totals: ReportTotals,
}

pub fn build_report<'a>(events: &'a [SalesEvent], filter: &ReportFilter) -> Result<EventReport<'a>> {
    let months = group_by_month(events, filter)?;
    let ranking = contributor_ranking(events, filter);
    let totals = aggregate_totals(events, filter);

    info!(
        "Report over {} events: revenue {:.2}, net profit {:.2}",
        totals.event_count, totals.total_revenue, totals.total_net_profit
    );

    Ok(EventReport {
        months,
        ranking,
        totals,
    })
}
