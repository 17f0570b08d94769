use crate::error::{Result, RevenueError};
use crate::schema::{
    ContributorRole, Expense, ExpensePayer, PartnerSlot, Sale, SalesEvent, SplitRatio,
    DEFAULT_COMMISSION_PERCENT,
};
use chrono::NaiveDate;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// An event row as stored by the backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    pub id: String,
    #[serde(alias = "nome")]
    pub name: String,
    #[serde(alias = "data")]
    pub date: NaiveDate,
    #[serde(default, alias = "pagadorFreelancers")]
    pub freelancer_payer: Option<PartnerSlot>,
    #[serde(default, alias = "comissaoPercentual")]
    pub commission_percent: Option<f64>,
    #[serde(default, alias = "dividirLucro")]
    pub split_profit: Option<bool>,
}

/// One contributor row. Partners carry their own split percentage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SaleRecord {
    #[serde(alias = "eventoId")]
    pub event_id: String,
    #[serde(alias = "nome")]
    pub name: String,
    #[serde(alias = "tipo")]
    pub role: String,
    /// Partner slot; rows without one are assigned the next free slot
    #[serde(default)]
    pub slot: Option<PartnerSlot>,
    #[serde(default, alias = "valorVendido")]
    pub amount_sold: Option<f64>,
    #[serde(default, alias = "totalConta")]
    pub bank_total: Option<f64>,
    #[serde(default, alias = "valorPago")]
    pub amount_paid: Option<f64>,
    #[serde(default, alias = "valorLiquido")]
    pub net_amount: Option<f64>,
    #[serde(default, alias = "percentual")]
    pub percentage: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseRecord {
    #[serde(alias = "eventoId")]
    pub event_id: String,
    #[serde(alias = "categoria")]
    pub category: String,
    #[serde(default, alias = "valor")]
    pub amount: Option<f64>,
    /// "Caixa", "A", "B" or the partner's name
    #[serde(alias = "pagoPor")]
    pub payer: String,
}

/// Rows making up one event, ready to be written back.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRows {
    pub event: EventRecord,
    pub sales: Vec<SaleRecord>,
    pub expenses: Vec<ExpenseRecord>,
}

fn is_partner_role(record: &SaleRecord) -> Result<bool> {
    match record.role.trim().to_lowercase().as_str() {
        "socio" | "sócio" | "partner" => Ok(true),
        "freelancer" | "freela" => Ok(false),
        _ => Err(RevenueError::UnknownRole {
            name: record.name.clone(),
            role: record.role.clone(),
        }),
    }
}

fn parse_payer(event: &SalesEvent, payer: &str) -> Result<ExpensePayer> {
    let key = payer.trim().to_lowercase();
    match key.as_str() {
        "caixa" | "shared" => return Ok(ExpensePayer::SharedPool),
        "a" => return Ok(ExpensePayer::Partner(PartnerSlot::A)),
        "b" => return Ok(ExpensePayer::Partner(PartnerSlot::B)),
        _ => {}
    }

    event
        .sales
        .iter()
        .find(|s| s.partner_slot().is_some() && s.name.trim().to_lowercase() == key)
        .and_then(|s| s.partner_slot())
        .map(ExpensePayer::Partner)
        .ok_or_else(|| RevenueError::UnknownPayer {
            event: event.id.clone(),
            payer: payer.to_string(),
        })
}

/// Rebuilds events from the flat rows delivered by the backend.
///
/// Partner rows keep their stored slot. Rows without one take the next free
/// slot, so legacy data maps its first partner to A and the second to B.
/// The split comes from partner A's stored percentage, falling back to
/// partner B's and then to an even split. Expenses are attached after all
/// sales so a payer can be named by the partner's name.
pub fn assemble_events(
    events: &[EventRecord],
    sales: &[SaleRecord],
    expenses: &[ExpenseRecord],
) -> Result<Vec<SalesEvent>> {
    let mut assembled: Vec<SalesEvent> = Vec::with_capacity(events.len());
    let mut index: HashMap<&str, usize> = HashMap::new();

    for record in events {
        let mut event = SalesEvent::new(record.id.clone(), record.name.clone(), record.date);
        event.freelancer_payer = record.freelancer_payer.unwrap_or(PartnerSlot::A);
        event.commission_percent = record.commission_percent.unwrap_or(DEFAULT_COMMISSION_PERCENT);
        event.split_profit = record.split_profit.unwrap_or(true);
        index.insert(record.id.as_str(), assembled.len());
        assembled.push(event);
    }

    let mut percentages: HashMap<usize, [Option<f64>; 2]> = HashMap::new();

    for record in sales {
        let idx = *index
            .get(record.event_id.as_str())
            .ok_or_else(|| RevenueError::UnknownEvent(record.event_id.clone()))?;
        let event = &mut assembled[idx];

        let role = if is_partner_role(record)? {
            let taken: Vec<PartnerSlot> = event.sales.iter().filter_map(Sale::partner_slot).collect();
            if taken.len() >= 2 {
                return Err(RevenueError::TooManyPartners {
                    event: event.id.clone(),
                    count: taken.len() + 1,
                });
            }
            let slot = match record.slot {
                Some(slot) => slot,
                None if taken.contains(&PartnerSlot::A) => PartnerSlot::B,
                None => PartnerSlot::A,
            };
            if taken.contains(&slot) {
                return Err(RevenueError::DuplicatePartnerSlot {
                    event: event.id.clone(),
                    slot,
                });
            }
            let stored = percentages.entry(idx).or_default();
            stored[slot as usize] = record.percentage;
            ContributorRole::Partner { slot }
        } else {
            ContributorRole::Freelancer
        };

        event.sales.push(Sale {
            name: record.name.clone(),
            role,
            amount_sold: record.amount_sold.unwrap_or(0.0),
            bank_total: record.bank_total.unwrap_or(0.0),
            amount_paid: record.amount_paid.unwrap_or(0.0),
            net_amount: record.net_amount.unwrap_or(0.0),
        });
    }

    for (idx, [pct_a, pct_b]) in percentages {
        let event = &mut assembled[idx];
        if let (Some(a), Some(b)) = (pct_a, pct_b) {
            if (a + b - 100.0).abs() > 0.01 {
                warn!(
                    "Event '{}' stores partner percentages {} and {} which do not sum to 100; using partner A's",
                    event.id, a, b
                );
            }
        }
        event.split = match (pct_a, pct_b) {
            (Some(a), _) => SplitRatio::from_percentage(PartnerSlot::A, a),
            (None, Some(b)) => SplitRatio::from_percentage(PartnerSlot::B, b),
            (None, None) => SplitRatio::EVEN,
        };
    }

    for record in expenses {
        let idx = *index
            .get(record.event_id.as_str())
            .ok_or_else(|| RevenueError::UnknownEvent(record.event_id.clone()))?;
        let payer = parse_payer(&assembled[idx], &record.payer)?;
        assembled[idx].expenses.push(Expense {
            category: record.category.clone(),
            amount: record.amount.unwrap_or(0.0),
            payer,
        });
    }

    debug!(
        "Assembled {} events from {} sale rows and {} expense rows",
        assembled.len(),
        sales.len(),
        expenses.len()
    );

    Ok(assembled)
}

impl SalesEvent {
    /// Flattens the event into backend rows.
    pub fn to_records(&self) -> EventRows {
        let event = EventRecord {
            id: self.id.clone(),
            name: self.name.clone(),
            date: self.date,
            freelancer_payer: Some(self.freelancer_payer),
            commission_percent: Some(self.commission_percent),
            split_profit: Some(self.split_profit),
        };

        let sales = self
            .sales
            .iter()
            .map(|sale| {
                let slot = sale.partner_slot();
                SaleRecord {
                    event_id: self.id.clone(),
                    name: sale.name.clone(),
                    role: (if slot.is_some() { "socio" } else { "freelancer" }).to_string(),
                    slot,
                    amount_sold: Some(sale.amount_sold),
                    bank_total: slot.map(|_| sale.bank_total),
                    amount_paid: if slot.is_none() { Some(sale.amount_paid) } else { None },
                    net_amount: slot.map(|_| sale.net_amount),
                    percentage: slot.map(|s| self.split.percentage(s)),
                }
            })
            .collect();

        let expenses = self
            .expenses
            .iter()
            .map(|expense| ExpenseRecord {
                event_id: self.id.clone(),
                category: expense.category.clone(),
                amount: Some(expense.amount),
                payer: match expense.payer {
                    ExpensePayer::SharedPool => "Caixa".to_string(),
                    ExpensePayer::Partner(slot) => self.payer_label(slot),
                },
            })
            .collect();

        EventRows {
            event,
            sales,
            expenses,
        }
    }

    /// Partner payers are written by name. The slot letter is used when the
    /// name is missing, is a payer keyword, or is shared by both partners.
    fn payer_label(&self, slot: PartnerSlot) -> String {
        let other = match slot {
            PartnerSlot::A => PartnerSlot::B,
            PartnerSlot::B => PartnerSlot::A,
        };
        let other_key = self
            .partner_sale(other)
            .map(|sale| sale.name.trim().to_lowercase());

        match self.partner_sale(slot).map(|sale| sale.name.trim()) {
            Some(name)
                if !name.is_empty()
                    && !matches!(name.to_lowercase().as_str(), "caixa" | "shared" | "a" | "b")
                    && other_key.as_deref() != Some(name.to_lowercase().as_str()) =>
            {
                name.to_string()
            }
            _ => match slot {
                PartnerSlot::A => "A".to_string(),
                PartnerSlot::B => "B".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event_record(id: &str) -> EventRecord {
        EventRecord {
            id: id.to_string(),
            name: "Maratona".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 6, 2).unwrap(),
            freelancer_payer: None,
            commission_percent: None,
            split_profit: None,
        }
    }

    fn sale_record(event_id: &str, name: &str, role: &str, sold: f64, percentage: Option<f64>) -> SaleRecord {
        SaleRecord {
            event_id: event_id.to_string(),
            name: name.to_string(),
            role: role.to_string(),
            slot: None,
            amount_sold: Some(sold),
            bank_total: None,
            amount_paid: None,
            net_amount: None,
            percentage,
        }
    }

    #[test]
    fn test_assemble_assigns_slots_and_split() {
        let events = vec![event_record("e1")];
        let sales = vec![
            sale_record("e1", "Ana", "socio", 100.0, Some(60.0)),
            sale_record("e1", "Rui", "freelancer", 50.0, None),
            sale_record("e1", "Bruno", "Sócio", 80.0, Some(40.0)),
        ];
        let expenses = vec![ExpenseRecord {
            event_id: "e1".to_string(),
            category: "Gasolina".to_string(),
            amount: Some(30.0),
            payer: "bruno".to_string(),
        }];

        let assembled = assemble_events(&events, &sales, &expenses).unwrap();
        let event = &assembled[0];

        assert_eq!(event.commission_percent, DEFAULT_COMMISSION_PERCENT);
        assert_eq!(event.sales[0].partner_slot(), Some(PartnerSlot::A));
        assert!(event.sales[1].is_freelancer());
        assert_eq!(event.sales[2].partner_slot(), Some(PartnerSlot::B));
        assert!((event.split.percentage(PartnerSlot::A) - 60.0).abs() < 1e-9);
        assert_eq!(event.expenses[0].payer, ExpensePayer::Partner(PartnerSlot::B));
        assert_eq!(event.sales[1].bank_total, 0.0);
    }

    #[test]
    fn test_assemble_split_from_partner_b() {
        let events = vec![event_record("e1")];
        let sales = vec![
            sale_record("e1", "Ana", "socio", 100.0, None),
            sale_record("e1", "Bruno", "socio", 80.0, Some(25.0)),
        ];
        let assembled = assemble_events(&events, &sales, &[]).unwrap();
        assert!((assembled[0].split.percentage(PartnerSlot::A) - 75.0).abs() < 1e-9);
    }

    #[test]
    fn test_assemble_errors() {
        let events = vec![event_record("e1")];

        let orphan = vec![sale_record("missing", "Ana", "socio", 1.0, None)];
        assert!(matches!(
            assemble_events(&events, &orphan, &[]),
            Err(RevenueError::UnknownEvent(_))
        ));

        let bad_role = vec![sale_record("e1", "Ana", "gerente", 1.0, None)];
        assert!(matches!(
            assemble_events(&events, &bad_role, &[]),
            Err(RevenueError::UnknownRole { .. })
        ));

        let three = vec![
            sale_record("e1", "Ana", "socio", 1.0, None),
            sale_record("e1", "Bruno", "socio", 1.0, None),
            sale_record("e1", "Caio", "socio", 1.0, None),
        ];
        assert!(matches!(
            assemble_events(&events, &three, &[]),
            Err(RevenueError::TooManyPartners { count: 3, .. })
        ));

        let bad_payer = vec![ExpenseRecord {
            event_id: "e1".to_string(),
            category: "Hotel".to_string(),
            amount: Some(1.0),
            payer: "Desconhecido".to_string(),
        }];
        assert!(matches!(
            assemble_events(&events, &[], &bad_payer),
            Err(RevenueError::UnknownPayer { .. })
        ));
    }

    #[test]
    fn test_to_records_reassembles() {
        let mut event = SalesEvent::new("e9", "Trail", NaiveDate::from_ymd_opt(2024, 9, 1).unwrap());
        event.split = SplitRatio::from_percentage(PartnerSlot::A, 70.0);
        event.freelancer_payer = PartnerSlot::B;
        event.sales = vec![
            Sale::partner("Ana", PartnerSlot::A, 300.0, 250.0),
            Sale::partner("Bruno", PartnerSlot::B, 200.0, 250.0),
            Sale::freelancer("Rui", 100.0, 60.0),
        ];
        event.expenses = vec![Expense::new("Hotel", 80.0, ExpensePayer::SharedPool)];

        let rows = event.to_records();
        assert_eq!(rows.sales[0].role, "socio");
        assert_eq!(rows.sales[2].bank_total, None);
        assert_eq!(rows.expenses[0].payer, "Caixa");

        let rebuilt = assemble_events(&[rows.event], &rows.sales, &rows.expenses).unwrap();
        assert_eq!(rebuilt[0].freelancer_payer, PartnerSlot::B);
        assert_eq!(rebuilt[0].sales, event.sales);
        assert_eq!(rebuilt[0].expenses, event.expenses);
        assert!((rebuilt[0].split.ratio() - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_round_trip_keeps_partners_when_b_comes_first() {
        let mut event = SalesEvent::new("e10", "Noturna", NaiveDate::from_ymd_opt(2024, 10, 5).unwrap());
        event.split = SplitRatio::from_percentage(PartnerSlot::A, 60.0);
        event.freelancer_payer = PartnerSlot::B;
        event.sales = vec![
            Sale::partner("Bruno", PartnerSlot::B, 200.0, 200.0),
            Sale::partner("Ana", PartnerSlot::A, 300.0, 300.0),
            Sale::freelancer("Rui", 0.0, 60.0),
        ];
        event.expenses = vec![Expense::new("Hotel", 40.0, ExpensePayer::Partner(PartnerSlot::A))];

        let rows = event.to_records();
        assert_eq!(rows.sales[0].slot, Some(PartnerSlot::B));
        assert_eq!(rows.expenses[0].payer, "Ana");

        let rebuilt = assemble_events(&[rows.event], &rows.sales, &rows.expenses).unwrap();
        let rebuilt = &rebuilt[0];
        assert_eq!(rebuilt.sales, event.sales);
        assert_eq!(rebuilt.expenses, event.expenses);
        assert!((rebuilt.split.percentage(PartnerSlot::A) - 60.0).abs() < 1e-9);

        let before = crate::calculator::summarize_event(&event);
        let after = crate::calculator::summarize_event(rebuilt);
        assert_eq!(after.partner_a.name.as_deref(), Some("Ana"));
        assert!((after.partner_a.cash_position - before.partner_a.cash_position).abs() < 1e-9);
        assert!((after.partner_b.cash_position - before.partner_b.cash_position).abs() < 1e-9);
        assert_eq!(after.settlement, before.settlement);
    }

    #[test]
    fn test_payer_falls_back_to_slot_letter() {
        let mut event = SalesEvent::new("e11", "Trail", NaiveDate::from_ymd_opt(2024, 11, 3).unwrap());
        event.sales = vec![
            Sale::partner("Caixa", PartnerSlot::A, 100.0, 100.0),
            Sale::partner("Bruno", PartnerSlot::B, 100.0, 100.0),
        ];
        event.expenses = vec![
            Expense::new("Gasolina", 10.0, ExpensePayer::Partner(PartnerSlot::A)),
            Expense::new("Lanche", 5.0, ExpensePayer::Partner(PartnerSlot::B)),
        ];

        let rows = event.to_records();
        assert_eq!(rows.expenses[0].payer, "A");
        assert_eq!(rows.expenses[1].payer, "Bruno");
    }

    #[test]
    fn test_assemble_honours_stored_slots() {
        let events = vec![event_record("e1")];
        let mut first = sale_record("e1", "Ana", "socio", 1.0, None);
        first.slot = Some(PartnerSlot::B);
        let second = sale_record("e1", "Bruno", "socio", 1.0, None);

        let assembled = assemble_events(&events, &[first.clone(), second], &[]).unwrap();
        assert_eq!(assembled[0].sales[0].partner_slot(), Some(PartnerSlot::B));
        assert_eq!(assembled[0].sales[1].partner_slot(), Some(PartnerSlot::A));

        let mut repeat = sale_record("e1", "Caio", "socio", 1.0, None);
        repeat.slot = Some(PartnerSlot::B);
        assert!(matches!(
            assemble_events(&events, &[first, repeat], &[]),
            Err(RevenueError::DuplicatePartnerSlot {
                slot: PartnerSlot::B,
                ..
            })
        ));
    }
}
