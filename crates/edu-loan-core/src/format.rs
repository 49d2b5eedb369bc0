//! Display-only currency formatting for summaries and tables. Mirrors
//! whole-unit currency display ("$23,000"); never feeds back into the math.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::RoundingStrategy;

use crate::types::{Currency, Money};

/// Format an amount with its currency symbol, rounded to whole units with
/// thousands separators.
pub fn format_money(value: Money, currency: Currency) -> String {
    let rounded = value.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    let units = rounded.abs().to_i128().unwrap_or(0);
    let sign = if rounded.is_sign_negative() && units != 0 {
        "-"
    } else {
        ""
    };
    format!("{}{}{}", sign, currency.symbol(), group_thousands(units))
}

fn group_thousands(mut units: i128) -> String {
    if units == 0 {
        return "0".into();
    }
    let mut groups: Vec<String> = Vec::new();
    while units > 0 {
        let group = units % 1000;
        units /= 1000;
        if units > 0 {
            groups.push(format!("{group:03}"));
        } else {
            groups.push(group.to_string());
        }
    }
    groups.reverse();
    groups.join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    #[test]
    fn test_whole_unit_grouping() {
        assert_eq!(format_money(dec!(23000), Currency::USD), "$23,000");
        assert_eq!(format_money(dec!(1234567.89), Currency::EUR), "€1,234,568");
        assert_eq!(format_money(dec!(999), Currency::GBP), "£999");
        assert_eq!(format_money(dec!(0), Currency::INR), "₹0");
    }

    #[test]
    fn test_rounds_half_away_from_zero() {
        assert_eq!(format_money(dec!(100.5), Currency::USD), "$101");
        assert_eq!(format_money(dec!(100.49), Currency::USD), "$100");
    }

    #[test]
    fn test_negative_amounts() {
        assert_eq!(format_money(dec!(-1500), Currency::USD), "-$1,500");
        // Sub-unit negatives round to a plain zero
        assert_eq!(format_money(dec!(-0.2), Currency::USD), "$0");
    }
}
