use crate::utils::finite_or_zero;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum NumberLocale {
    /// `1.234,56`, symbol `R$ `
    #[default]
    PtBr,
    /// `1,234.56`, symbol `$`
    EnUs,
}

impl NumberLocale {
    fn group_separator(self) -> char {
        match self {
            NumberLocale::PtBr => '.',
            NumberLocale::EnUs => ',',
        }
    }

    fn decimal_separator(self) -> char {
        match self {
            NumberLocale::PtBr => ',',
            NumberLocale::EnUs => '.',
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            NumberLocale::PtBr => "R$ ",
            NumberLocale::EnUs => "$",
        }
    }
}

/// Formats `value` with two decimals and thousands grouping.
pub fn format_amount(value: f64, locale: NumberLocale) -> String {
    let (negative, digits) = render_digits(value, locale);
    if negative {
        format!("-{}", digits)
    } else {
        digits
    }
}

/// Same as [`format_amount`] with the locale's currency symbol.
pub fn format_currency(value: f64, locale: NumberLocale) -> String {
    let (negative, digits) = render_digits(value, locale);
    let sign = if negative { "-" } else { "" };
    format!("{}{}{}", sign, locale.symbol(), digits)
}

fn render_digits(value: f64, locale: NumberLocale) -> (bool, String) {
    let value = finite_or_zero(value);
    let cents = (value.abs() * 100.0).round() as u64;
    let whole = (cents / 100).to_string();
    let fraction = cents % 100;

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(locale.group_separator());
        }
        grouped.push(ch);
    }

    let negative = value < 0.0 && cents > 0;
    (
        negative,
        format!("{}{}{:02}", grouped, locale.decimal_separator(), fraction),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_amount_pt_br() {
        assert_eq!(format_amount(0.0, NumberLocale::PtBr), "0,00");
        assert_eq!(format_amount(4572.76, NumberLocale::PtBr), "4.572,76");
        assert_eq!(format_amount(1_234_567.891, NumberLocale::PtBr), "1.234.567,89");
        assert_eq!(format_amount(999.999, NumberLocale::PtBr), "1.000,00");
        assert_eq!(format_amount(-661.49, NumberLocale::PtBr), "-661,49");
    }

    #[test]
    fn test_format_amount_en_us() {
        assert_eq!(format_amount(4572.76, NumberLocale::EnUs), "4,572.76");
        assert_eq!(format_amount(100.0, NumberLocale::EnUs), "100.00");
    }

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(900.0, NumberLocale::PtBr), "R$ 900,00");
        assert_eq!(format_currency(-1500.5, NumberLocale::EnUs), "-$1,500.50");
        assert_eq!(format_currency(-0.001, NumberLocale::PtBr), "R$ 0,00");
    }

    #[test]
    fn test_non_finite_renders_zero() {
        assert_eq!(format_amount(f64::NAN, NumberLocale::PtBr), "0,00");
        assert_eq!(format_currency(f64::INFINITY, NumberLocale::EnUs), "$0.00");
    }
}
