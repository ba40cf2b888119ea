//! Currencies, exchange rates and contravalue conversion.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::{Deserialize, Serialize};

use kwanza_core::{DomainError, DomainResult, Money};

/// Currency code, normalised to upper case (`AOA`, `USD`, `EUR`, ...).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Currency(String);

impl Currency {
    pub fn new(code: impl AsRef<str>) -> Self {
        Self(code.as_ref().trim().to_ascii_uppercase())
    }

    /// Angolan kwanza, the default base currency.
    pub fn aoa() -> Self {
        Self::new("AOA")
    }

    pub fn code(&self) -> &str {
        &self.0
    }
}

impl Default for Currency {
    fn default() -> Self {
        Self::aoa()
    }
}

impl core::fmt::Display for Currency {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Units of base currency per unit of document currency. Always positive.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct ExchangeRate(Decimal);

impl ExchangeRate {
    pub const ONE: ExchangeRate = ExchangeRate(Decimal::ONE);

    pub fn new(rate: Decimal) -> DomainResult<Self> {
        if rate <= Decimal::ZERO {
            return Err(DomainError::validation(format!(
                "exchange rate must be positive, got {rate}"
            )));
        }
        Ok(Self(rate))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Convert an amount in document currency into base currency.
    pub fn convert(&self, amount: Money) -> Money {
        amount.scale(self.0)
    }
}

impl Default for ExchangeRate {
    fn default() -> Self {
        Self::ONE
    }
}

impl TryFrom<Decimal> for ExchangeRate {
    type Error = DomainError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ExchangeRate> for Decimal {
    fn from(value: ExchangeRate) -> Self {
        value.0
    }
}

/// Lookup table of exchange rates into the base currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeRateTable {
    base: Currency,
    rates: BTreeMap<Currency, ExchangeRate>,
}

impl ExchangeRateTable {
    /// A table that only knows the base currency (rate 1).
    pub fn new(base: Currency) -> Self {
        let mut rates = BTreeMap::new();
        rates.insert(base.clone(), ExchangeRate::ONE);
        Self { base, rates }
    }

    /// Kwanza-based defaults used by the invoice and purchase forms.
    pub fn kwanza_defaults() -> Self {
        let mut table = Self::new(Currency::aoa());
        for (code, rate) in [("USD", 850u32), ("EUR", 920), ("EURO", 920), ("BRL", 170)] {
            table.rates.insert(Currency::new(code), ExchangeRate(Decimal::from(rate)));
        }
        table
    }

    pub fn base(&self) -> &Currency {
        &self.base
    }

    pub fn set(&mut self, currency: Currency, rate: ExchangeRate) {
        if currency != self.base {
            self.rates.insert(currency, rate);
        }
    }

    /// Rate for a currency; the base currency always resolves to 1.
    pub fn rate_for(&self, currency: &Currency) -> Option<ExchangeRate> {
        if *currency == self.base {
            return Some(ExchangeRate::ONE);
        }
        self.rates.get(currency).copied()
    }

    pub fn require(&self, currency: &Currency) -> DomainResult<ExchangeRate> {
        self.rate_for(currency).ok_or_else(|| {
            DomainError::validation(format!("no exchange rate configured for {currency}"))
        })
    }

    pub fn is_base(&self, currency: &Currency) -> bool {
        *currency == self.base
    }
}

impl Default for ExchangeRateTable {
    fn default() -> Self {
        Self::kwanza_defaults()
    }
}

/// Parse a rate from a float-ish string such as "850" or "920.5".
pub(crate) fn parse_rate(raw: &str) -> Option<ExchangeRate> {
    let value = raw
        .trim()
        .parse::<Decimal>()
        .ok()
        .or_else(|| raw.trim().parse::<f64>().ok().and_then(Decimal::from_f64))?;
    ExchangeRate::new(value).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn currency_codes_are_normalised() {
        assert_eq!(Currency::new(" usd "), Currency::new("USD"));
        assert_eq!(Currency::default().code(), "AOA");
    }

    #[test]
    fn defaults_match_form_rates() {
        let table = ExchangeRateTable::kwanza_defaults();
        assert_eq!(table.rate_for(&Currency::aoa()), Some(ExchangeRate::ONE));
        assert_eq!(table.rate_for(&Currency::new("USD")).unwrap().value(), dec!(850));
        assert_eq!(table.rate_for(&Currency::new("EUR")).unwrap().value(), dec!(920));
        assert_eq!(table.rate_for(&Currency::new("euro")).unwrap().value(), dec!(920));
        assert_eq!(table.rate_for(&Currency::new("BRL")).unwrap().value(), dec!(170));
        assert!(table.rate_for(&Currency::new("GBP")).is_none());
        assert!(table.require(&Currency::new("GBP")).is_err());
    }

    #[test]
    fn base_currency_rate_cannot_be_overridden() {
        let mut table = ExchangeRateTable::new(Currency::aoa());
        table.set(Currency::aoa(), ExchangeRate::new(dec!(2)).unwrap());
        assert_eq!(table.rate_for(&Currency::aoa()), Some(ExchangeRate::ONE));
    }

    #[test]
    fn exchange_rate_must_be_positive() {
        assert!(ExchangeRate::new(dec!(0)).is_err());
        assert!(ExchangeRate::new(dec!(-850)).is_err());
        assert!(serde_json::from_str::<ExchangeRate>("\"0\"").is_err());
        assert_eq!(
            serde_json::from_str::<ExchangeRate>("\"850\"").unwrap().value(),
            dec!(850)
        );
    }

    #[test]
    fn convert_scales_amount() {
        let rate = ExchangeRate::new(dec!(850)).unwrap();
        assert_eq!(rate.convert(Money::new(dec!(10.5))), Money::new(dec!(8925)));
    }

    #[test]
    fn parse_rate_accepts_plain_numbers() {
        assert_eq!(parse_rate("920.5").unwrap().value(), dec!(920.5));
        assert!(parse_rate("abc").is_none());
        assert!(parse_rate("0").is_none());
    }
}
