use crate::error::{Result, RevenueError};
use chrono::{Datelike, Days, NaiveDate};

/// Tolerance used when comparing monetary amounts.
pub const MONEY_TOLERANCE: f64 = 0.01;

const MONTH_NAMES_PT: [&str; 12] = [
    "Janeiro",
    "Fevereiro",
    "Março",
    "Abril",
    "Maio",
    "Junho",
    "Julho",
    "Agosto",
    "Setembro",
    "Outubro",
    "Novembro",
    "Dezembro",
];

/// Treats NaN and infinities as missing values.
pub fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// True when `a` and `b` differ by more than `tolerance`.
pub fn differs(a: f64, b: f64, tolerance: f64) -> bool {
    (a - b).abs() > tolerance
}

pub fn month_key(date: NaiveDate) -> (i32, u32) {
    (date.year(), date.month())
}

pub fn month_name_pt(month: u32) -> Result<&'static str> {
    if !(1..=12).contains(&month) {
        return Err(RevenueError::DateError(format!(
            "Invalid month {}: must be between 1 and 12",
            month
        )));
    }
    Ok(MONTH_NAMES_PT[(month - 1) as usize])
}

/// Display label for a month, e.g. "Março de 2024".
pub fn month_label(year: i32, month: u32) -> Result<String> {
    Ok(format!("{} de {}", month_name_pt(month)?, year))
}

pub fn first_day_of_month(year: i32, month: u32) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| {
        RevenueError::DateError(format!("Invalid year/month: {}-{:02}", year, month))
    })
}

pub fn last_day_of_month(year: i32, month: u32) -> Result<NaiveDate> {
    let next_month = if month == 12 { 1 } else { month + 1 };
    let next_year = if month == 12 { year + 1 } else { year };

    first_day_of_month(next_year, next_month)?
        .checked_sub_days(Days::new(1))
        .ok_or_else(|| RevenueError::DateError(format!("No day before {}-{:02}-01", next_year, next_month)))
}

/// Parses a month string in the format "YYYY-MM".
/// Returns (year, month)
pub fn parse_month_string(month: &str) -> Result<(i32, u32)> {
    let start_str = format!("{}-01", month.trim());
    let date = NaiveDate::parse_from_str(&start_str, "%Y-%m-%d").map_err(|_| {
        RevenueError::DateError(format!(
            "Invalid month format: {}. Expected YYYY-MM",
            month
        ))
    })?;
    Ok((date.year(), date.month()))
}
