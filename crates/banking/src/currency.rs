//! Currencies and conversion into the reference currency (EUR).

use std::collections::HashMap;
use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Currencies a transfer can be expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    #[serde(alias = "EURO")]
    EUR,
    USD,
    GBP,
    AUD,
    #[serde(alias = "YEN")]
    JPY,
}

impl Currency {
    pub fn code(self) -> &'static str {
        match self {
            Currency::EUR => "EUR",
            Currency::USD => "USD",
            Currency::GBP => "GBP",
            Currency::AUD => "AUD",
            Currency::JPY => "JPY",
        }
    }
}

impl core::fmt::Display for Currency {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "EUR" | "EURO" => Ok(Currency::EUR),
            "USD" => Ok(Currency::USD),
            "GBP" => Ok(Currency::GBP),
            "AUD" => Ok(Currency::AUD),
            "JPY" | "YEN" => Ok(Currency::JPY),
            other => Err(ConversionError::UnknownCurrency(other.to_string())),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConversionError {
    #[error("unknown currency code: {0}")]
    UnknownCurrency(String),

    #[error("no exchange rate configured for {0}")]
    MissingRate(Currency),

    #[error("invalid exchange rate for {currency}: {rate}")]
    InvalidRate { currency: Currency, rate: Decimal },
}

/// Converts amounts into the reference currency.
pub trait CurrencyConverter: Send + Sync {
    fn convert(&self, currency: Currency, amount: Decimal) -> Result<Decimal, ConversionError>;
}

/// Static rate table, expressed as units of `currency` per one EUR.
#[derive(Debug, Clone)]
pub struct FixedRateConverter {
    units_per_euro: HashMap<Currency, Decimal>,
}

impl FixedRateConverter {
    /// Empty table; only EUR converts (identity).
    pub fn empty() -> Self {
        Self {
            units_per_euro: HashMap::from([(Currency::EUR, Decimal::ONE)]),
        }
    }

    /// Rates used by the service when nothing else is configured.
    pub fn standard() -> Self {
        Self::empty()
            .with_rate(Currency::USD, Decimal::new(110, 2))
            .with_rate(Currency::GBP, Decimal::new(85, 2))
            .with_rate(Currency::AUD, Decimal::new(160, 2))
            .with_rate(Currency::JPY, Decimal::from(130))
    }

    pub fn with_rate(mut self, currency: Currency, units_per_euro: Decimal) -> Self {
        self.units_per_euro.insert(currency, units_per_euro);
        self
    }

    pub fn rate(&self, currency: Currency) -> Option<Decimal> {
        self.units_per_euro.get(&currency).copied()
    }
}

impl Default for FixedRateConverter {
    fn default() -> Self {
        Self::standard()
    }
}

impl CurrencyConverter for FixedRateConverter {
    fn convert(&self, currency: Currency, amount: Decimal) -> Result<Decimal, ConversionError> {
        let rate = self
            .rate(currency)
            .ok_or(ConversionError::MissingRate(currency))?;

        if rate <= Decimal::ZERO {
            return Err(ConversionError::InvalidRate { currency, rate });
        }

        let converted = amount
            .checked_div(rate)
            .ok_or(ConversionError::InvalidRate { currency, rate })?;

        Ok(round_money(converted))
    }
}

/// Decimal places money is kept at, both in memory and in the database.
pub const MONEY_SCALE: u32 = 2;

/// Round to cents, midpoint away from zero.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// True when `amount` has no significant digits past [`MONEY_SCALE`].
pub fn fits_money_scale(amount: Decimal) -> bool {
    amount.normalize().scale() <= MONEY_SCALE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn euro_converts_to_itself() {
        let converter = FixedRateConverter::standard();
        let amount = Decimal::new(9050, 2);
        assert_eq!(converter.convert(Currency::EUR, amount).unwrap(), amount);
    }

    #[test]
    fn foreign_amounts_are_divided_by_rate_and_rounded() {
        let converter = FixedRateConverter::standard();
        // 100 USD / 1.10 = 90.909.. -> 90.91
        assert_eq!(
            converter.convert(Currency::USD, Decimal::from(100)).unwrap(),
            Decimal::new(9091, 2)
        );
        // 100 GBP / 0.85 = 117.647.. -> 117.65
        assert_eq!(
            converter.convert(Currency::GBP, Decimal::from(100)).unwrap(),
            Decimal::new(11765, 2)
        );
    }

    #[test]
    fn missing_rate_is_reported() {
        let converter = FixedRateConverter::empty();
        let err = converter.convert(Currency::AUD, Decimal::ONE).unwrap_err();
        assert_eq!(err, ConversionError::MissingRate(Currency::AUD));
    }

    #[test]
    fn zero_rate_is_rejected() {
        let converter = FixedRateConverter::empty().with_rate(Currency::GBP, Decimal::ZERO);
        assert!(matches!(
            converter.convert(Currency::GBP, Decimal::ONE),
            Err(ConversionError::InvalidRate { .. })
        ));
    }

    #[test]
    fn parses_codes_and_legacy_aliases() {
        assert_eq!("usd".parse::<Currency>().unwrap(), Currency::USD);
        assert_eq!("EURO".parse::<Currency>().unwrap(), Currency::EUR);
        assert_eq!("YEN".parse::<Currency>().unwrap(), Currency::JPY);
        assert!("XYZ".parse::<Currency>().is_err());
    }

    #[test]
    fn deserializes_aliases() {
        let c: Currency = serde_json::from_str("\"EURO\"").unwrap();
        assert_eq!(c, Currency::EUR);
        assert_eq!(serde_json::to_string(&Currency::GBP).unwrap(), "\"GBP\"");
    }

    #[test]
    fn rounding_is_midpoint_away_from_zero() {
        assert_eq!(round_money(Decimal::new(1005, 3)), Decimal::new(101, 2));
        assert_eq!(round_money(Decimal::new(-1005, 3)), Decimal::new(-101, 2));
    }

    #[test]
    fn money_scale_ignores_trailing_zeros() {
        assert!(fits_money_scale(Decimal::new(9091, 2)));
        assert!(fits_money_scale(Decimal::new(1_000_500, 3)));
        assert!(!fits_money_scale(Decimal::new(5, 3)));
    }
}
