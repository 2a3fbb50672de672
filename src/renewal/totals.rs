use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use crate::storage::models::LineItem;

/// Net totals of a record in transaction and base currency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Totals {
    pub net_total: Decimal,
    pub net_total_base: Decimal,
}

pub struct TotalsCalculator;

impl TotalsCalculator {
    /// Round to 2 places, half to even
    pub fn round2(value: Decimal) -> Decimal {
        value.round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven)
    }

    /// Rate used for conversion; unset or non-positive rates mean 1
    pub fn effective_rate(exchange_rate: Option<Decimal>) -> Decimal {
        exchange_rate
            .filter(|rate| rate.is_sign_positive() && !rate.is_zero())
            .unwrap_or(Decimal::ONE)
    }

    /// Whether line values must be scaled into the base currency
    pub fn needs_conversion(currency: &str, base_currency: Option<&str>) -> bool {
        match base_currency {
            Some(base) => !currency.is_empty() && !base.is_empty() && currency != base,
            None => false,
        }
    }

    /// Recompute every line in place and return the net totals
    pub fn recompute(
        currency: &str,
        base_currency: Option<&str>,
        exchange_rate: Option<Decimal>,
        items: &mut [LineItem],
    ) -> Totals {
        let rate = Self::effective_rate(exchange_rate);
        let convert = Self::needs_conversion(currency, base_currency);

        for item in items.iter_mut() {
            Self::recompute_item(item, convert, rate);
        }

        Self::totals(items)
    }

    fn recompute_item(item: &mut LineItem, convert: bool, exchange_rate: Decimal) {
        item.amount = Self::round2(item.qty) * Self::round2(item.rate);

        if convert {
            item.base_rate = Self::round2(item.rate) * exchange_rate;
            item.base_amount = Self::round2(item.amount) * exchange_rate;
        } else {
            item.base_rate = item.rate;
            item.base_amount = item.amount;
        }
    }

    /// Sum of already computed line values, each rounded before summing
    pub fn totals(items: &[LineItem]) -> Totals {
        items.iter().fold(Totals::default(), |acc, item| Totals {
            net_total: acc.net_total + Self::round2(item.amount),
            net_total_base: acc.net_total_base + Self::round2(item.base_amount),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn items() -> Vec<LineItem> {
        vec![
            LineItem::new("FW-100", dec!(2), dec!(150.255)),
            LineItem::new("AV-20", dec!(3.5), dec!(12)),
            LineItem::new("SUP-1", dec!(1), dec!(0.1)),
        ]
    }

    #[test]
    fn test_amount_uses_rounded_qty_and_rate() {
        let mut lines = vec![LineItem::new("FW-100", dec!(1.005), dec!(10.125))];
        TotalsCalculator::recompute("GHS", Some("GHS"), None, &mut lines);

        // 1.005 -> 1.00, 10.125 -> 10.12 under half-even rounding
        assert_eq!(lines[0].amount, dec!(10.12));
    }

    #[test]
    fn test_same_currency_is_identity() {
        for rate in [None, Some(dec!(0)), Some(dec!(12.7)), Some(dec!(-3))] {
            let mut lines = items();
            let totals = TotalsCalculator::recompute("GHS", Some("GHS"), rate, &mut lines);

            for line in &lines {
                assert_eq!(line.base_amount, line.amount);
                assert_eq!(line.base_rate, line.rate);
            }
            assert_eq!(totals.net_total, totals.net_total_base);
        }
    }

    #[test]
    fn test_foreign_currency_scaled_by_rate() {
        let mut lines = items();
        let totals = TotalsCalculator::recompute("USD", Some("GHS"), Some(dec!(15.5)), &mut lines);

        assert_eq!(lines[0].amount, dec!(300.52));
        assert_eq!(lines[0].base_rate, dec!(150.26) * dec!(15.5));
        assert_eq!(lines[0].base_amount, dec!(300.52) * dec!(15.5));
        assert_eq!(lines[1].amount, dec!(42.00));
        assert_eq!(totals.net_total, dec!(342.62));
        assert_eq!(totals.net_total_base, dec!(342.62) * dec!(15.5));
    }

    #[test]
    fn test_linearity_within_rounding_drift() {
        let mut lines = vec![
            LineItem::new("A", dec!(3), dec!(19.99)),
            LineItem::new("B", dec!(7), dec!(4.13)),
        ];
        let rate = dec!(0.8731);
        let totals = TotalsCalculator::recompute("EUR", Some("USD"), Some(rate), &mut lines);

        let drift = (totals.net_total_base - totals.net_total * rate).abs();
        assert!(drift <= dec!(0.01) * Decimal::from(lines.len()));
    }

    #[test]
    fn test_missing_or_bad_rate_defaults_to_one() {
        assert_eq!(TotalsCalculator::effective_rate(None), Decimal::ONE);
        assert_eq!(TotalsCalculator::effective_rate(Some(dec!(0))), Decimal::ONE);
        assert_eq!(TotalsCalculator::effective_rate(Some(dec!(-2))), Decimal::ONE);
        assert_eq!(TotalsCalculator::effective_rate(Some(dec!(1.2))), dec!(1.2));

        let mut lines = items();
        let totals = TotalsCalculator::recompute("USD", Some("GHS"), Some(dec!(0)), &mut lines);
        assert_eq!(totals.net_total, totals.net_total_base);
    }

    #[test]
    fn test_unknown_base_currency_skips_conversion() {
        let mut lines = items();
        let totals = TotalsCalculator::recompute("USD", None, Some(dec!(15.5)), &mut lines);
        assert_eq!(totals.net_total, totals.net_total_base);
    }

    #[test]
    fn test_empty_items_total_zero() {
        let mut lines: Vec<LineItem> = Vec::new();
        let totals = TotalsCalculator::recompute("USD", Some("GHS"), Some(dec!(15.5)), &mut lines);
        assert_eq!(totals.net_total, Decimal::ZERO);
        assert_eq!(totals.net_total_base, Decimal::ZERO);
    }
}
