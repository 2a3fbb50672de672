use rust_decimal::Decimal;
use tracing::debug;

use crate::error::{Result, TrackerError};

/// Lookup of company currencies and stored currency pairs
#[cfg_attr(test, mockall::automock)]
pub trait RateSource {
    fn company_currency(&self, company: &str) -> Result<Option<String>>;
    fn exchange_rate(&self, from: &str, to: &str) -> Result<Option<Decimal>>;
}

fn is_positive(rate: &Decimal) -> bool {
    rate.is_sign_positive() && !rate.is_zero()
}

/// Decide the exchange rate a record is saved with.
///
/// Same currency forces 1. A positive rate already on the record is kept.
/// Otherwise the stored pair is adopted, and a missing pair is a hard
/// validation failure.
pub fn resolve_exchange_rate<S: RateSource + ?Sized>(
    source: &S,
    currency: &str,
    base_currency: &str,
    current: Option<Decimal>,
) -> Result<Decimal> {
    if currency == base_currency {
        return Ok(Decimal::ONE);
    }

    if let Some(rate) = current.filter(is_positive) {
        debug!("Keeping manual exchange rate {} for {}/{}", rate, currency, base_currency);
        return Ok(rate);
    }

    match source.exchange_rate(currency, base_currency)?.filter(is_positive) {
        Some(rate) => {
            debug!("Adopted stored exchange rate {} for {}/{}", rate, currency, base_currency);
            Ok(rate)
        }
        None => Err(TrackerError::MissingExchangeRate {
            from: currency.to_string(),
            to: base_currency.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;
    use rust_decimal_macros::dec;

    #[test]
    fn test_same_currency_forces_one() {
        let mut source = MockRateSource::new();
        source.expect_exchange_rate().never();

        let rate = resolve_exchange_rate(&source, "GHS", "GHS", Some(dec!(14))).unwrap();
        assert_eq!(rate, Decimal::ONE);
    }

    #[test]
    fn test_manual_rate_wins() {
        let mut source = MockRateSource::new();
        source.expect_exchange_rate().never();

        let rate = resolve_exchange_rate(&source, "USD", "GHS", Some(dec!(15.2))).unwrap();
        assert_eq!(rate, dec!(15.2));
    }

    #[test]
    fn test_stored_pair_adopted_when_unset() {
        let mut source = MockRateSource::new();
        source
            .expect_exchange_rate()
            .with(eq("USD"), eq("GHS"))
            .times(2)
            .returning(|_, _| Ok(Some(dec!(15.75))));

        assert_eq!(resolve_exchange_rate(&source, "USD", "GHS", None).unwrap(), dec!(15.75));
        assert_eq!(resolve_exchange_rate(&source, "USD", "GHS", Some(dec!(0))).unwrap(), dec!(15.75));
    }

    #[test]
    fn test_missing_pair_is_an_error() {
        let mut source = MockRateSource::new();
        source.expect_exchange_rate().returning(|_, _| Ok(None));

        let err = resolve_exchange_rate(&source, "EUR", "XOF", None).unwrap_err();
        match err {
            TrackerError::MissingExchangeRate { from, to } => {
                assert_eq!(from, "EUR");
                assert_eq!(to, "XOF");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_zero_stored_rate_treated_as_missing() {
        let mut source = MockRateSource::new();
        source.expect_exchange_rate().returning(|_, _| Ok(Some(Decimal::ZERO)));

        assert!(matches!(
            resolve_exchange_rate(&source, "EUR", "GHS", None),
            Err(TrackerError::MissingExchangeRate { .. })
        ));
    }
}
