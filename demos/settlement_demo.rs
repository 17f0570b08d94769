use chrono::NaiveDate;
use race_event_revenue::*;

fn main() {
    println!("🏃 Race Event Settlement Demo\n");

    let mut event = SalesEvent::new(
        "2024-04-14-meia",
        "Meia Maratona de São Paulo",
        NaiveDate::from_ymd_opt(2024, 4, 14).unwrap(),
    );
    event.freelancer_payer = PartnerSlot::A;
    event.sales = vec![
        Sale::partner("Ana", PartnerSlot::A, 2788.51, 2788.51),
        Sale::partner("Bruno", PartnerSlot::B, 1784.25, 1784.25),
        Sale::freelancer("Carla", 0.0, 2600.0),
        Sale::freelancer("Davi", 0.0, 300.0),
        Sale::freelancer("Elisa", 0.0, 300.0),
        Sale::freelancer("Fábio", 0.0, 250.0),
    ];
    event.expenses = vec![Expense::new("Combustível", 85.0, ExpensePayer::SharedPool)];

    let brl = |v: f64| format_currency(v, NumberLocale::PtBr);

    match reconcile_with_verification(&event, 0.01) {
        Ok(summary) => {
            println!("📋 {} ({})", event.name, event.date);
            println!("  Gross:         {:>14}", brl(summary.gross));
            println!(
                "  Platform fee:  {:>14}  ({}%)",
                brl(summary.platform_fee),
                summary.commission_percent
            );
            println!("  Freelancers:   {:>14}", brl(summary.freelancer_cost));
            println!("  Distributable: {:>14}", brl(summary.distributable));
            println!("  Expenses:      {:>14}", brl(summary.total_expenses));
            println!("  Net profit:    {:>14}", brl(summary.net_profit));

            println!("\n👥 Partners:");
            for partner in [&summary.partner_a, &summary.partner_b] {
                println!(
                    "  {}: holds {}, entitled to {} ({:.0}%)",
                    partner.label(),
                    brl(partner.cash_position),
                    brl(partner.ideal_share),
                    partner.percentage
                );
            }

            match summary.settlement {
                Some(transfer) => println!(
                    "\n💸 {} pays {} {}",
                    summary.partner(transfer.from).label(),
                    summary.partner(transfer.to).label(),
                    brl(transfer.amount)
                ),
                None => println!("\n✅ No transfer needed"),
            }
        }
        Err(e) => {
            eprintln!("❌ Error: {}", e);
        }
    }
}
