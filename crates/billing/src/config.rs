//! Billing configuration.
//!
//! Read from environment variables; anything unset falls back to the kwanza
//! defaults. The issuing company is explicit configuration and is handed to
//! the persistence layer by the caller, never hard-coded.

use rust_decimal::Decimal;
use thiserror::Error;

use kwanza_core::{CompanyId, DomainResult, Money, Rate};

use crate::currency::{Currency, ExchangeRateTable, parse_rate};
use crate::pos::PosCart;
use crate::purchase::PurchaseTax;
use crate::totals::{DocumentAggregator, WithholdingPolicy};

pub const ENV_COMPANY_ID: &str = "KWANZA_COMPANY_ID";
pub const ENV_BASE_CURRENCY: &str = "KWANZA_BASE_CURRENCY";
pub const ENV_DEFAULT_TAX_RATE: &str = "KWANZA_DEFAULT_TAX_RATE";
pub const ENV_WITHHOLDING_RATE: &str = "KWANZA_WITHHOLDING_RATE";
pub const ENV_WITHHOLDING_THRESHOLD: &str = "KWANZA_WITHHOLDING_THRESHOLD";
/// Comma-separated `CODE=rate` pairs, e.g. `USD=850,EUR=920`.
pub const ENV_EXCHANGE_RATES: &str = "KWANZA_EXCHANGE_RATES";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0} must be set")]
    Missing(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillingConfig {
    pub company_id: Option<CompanyId>,
    pub base_currency: Currency,
    pub default_tax_rate: Rate,
    pub withholding: WithholdingPolicy,
    pub exchange_rates: ExchangeRateTable,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            company_id: None,
            base_currency: Currency::aoa(),
            default_tax_rate: Rate::percent(Decimal::from(14)),
            withholding: WithholdingPolicy::default(),
            exchange_rates: ExchangeRateTable::kwanza_defaults(),
        }
    }
}

impl BillingConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using an arbitrary key lookup (tests inject a map here).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_COMPANY_ID) {
            let id = raw.trim().parse::<CompanyId>().map_err(|e| ConfigError::Invalid {
                key: ENV_COMPANY_ID,
                value: raw.clone(),
                reason: e.to_string(),
            })?;
            config.company_id = Some(id);
        }

        if let Some(raw) = lookup(ENV_BASE_CURRENCY) {
            let base = Currency::new(&raw);
            if base.code().is_empty() {
                return Err(ConfigError::Invalid {
                    key: ENV_BASE_CURRENCY,
                    value: raw,
                    reason: "empty currency code".to_string(),
                });
            }
            if base != config.base_currency {
                tracing::warn!(
                    base = %base,
                    "non-kwanza base currency; exchange-rate defaults dropped"
                );
                config.exchange_rates = ExchangeRateTable::new(base.clone());
            }
            config.base_currency = base;
        }

        if let Some(raw) = lookup(ENV_DEFAULT_TAX_RATE) {
            config.default_tax_rate = parse_percent(ENV_DEFAULT_TAX_RATE, &raw)?;
        }

        if let Some(raw) = lookup(ENV_WITHHOLDING_RATE) {
            config.withholding.rate = parse_percent(ENV_WITHHOLDING_RATE, &raw)?;
        }

        if let Some(raw) = lookup(ENV_WITHHOLDING_THRESHOLD) {
            let threshold = parse_decimal(ENV_WITHHOLDING_THRESHOLD, &raw)?;
            if threshold < Decimal::ZERO {
                return Err(ConfigError::Invalid {
                    key: ENV_WITHHOLDING_THRESHOLD,
                    value: raw,
                    reason: "must not be negative".to_string(),
                });
            }
            config.withholding.threshold = Money::new(threshold);
        }

        if let Some(raw) = lookup(ENV_EXCHANGE_RATES) {
            for pair in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
                let (code, rate) = pair.split_once('=').ok_or_else(|| ConfigError::Invalid {
                    key: ENV_EXCHANGE_RATES,
                    value: pair.to_string(),
                    reason: "expected CODE=rate".to_string(),
                })?;
                let rate = parse_rate(rate).ok_or_else(|| ConfigError::Invalid {
                    key: ENV_EXCHANGE_RATES,
                    value: pair.to_string(),
                    reason: "rate must be a positive number".to_string(),
                })?;
                config.exchange_rates.set(Currency::new(code), rate);
            }
        }

        tracing::debug!(
            base_currency = %config.base_currency,
            default_tax_rate = %config.default_tax_rate,
            withholding_rate = %config.withholding.rate,
            withholding_threshold = %config.withholding.threshold,
            company_configured = config.company_id.is_some(),
            "billing configuration loaded"
        );

        Ok(config)
    }

    /// The configured company, or an error when the caller needs one.
    pub fn require_company(&self) -> Result<CompanyId, ConfigError> {
        self.company_id.ok_or(ConfigError::Missing(ENV_COMPANY_ID))
    }

    pub fn aggregator(&self) -> DocumentAggregator {
        DocumentAggregator::new(self.withholding)
    }

    /// Automatic purchase tax at the configured default rate.
    pub fn purchase_tax(&self) -> PurchaseTax {
        PurchaseTax::Auto(self.default_tax_rate)
    }

    /// An empty POS cart taxed at the configured default rate.
    pub fn pos_cart(&self) -> DomainResult<PosCart> {
        PosCart::new(self.default_tax_rate)
    }
}

fn parse_decimal(key: &'static str, raw: &str) -> Result<Decimal, ConfigError> {
    raw.trim().parse::<Decimal>().map_err(|e| ConfigError::Invalid {
        key,
        value: raw.to_string(),
        reason: e.to_string(),
    })
}

fn parse_percent(key: &'static str, raw: &str) -> Result<Rate, ConfigError> {
    let points = parse_decimal(key, raw)?;
    Rate::try_percent(points).map_err(|e| ConfigError::Invalid {
        key,
        value: raw.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<BillingConfig, ConfigError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        BillingConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_when_environment_is_empty() {
        let config = load(&[]).unwrap();
        assert_eq!(config, BillingConfig::default());
        assert_eq!(config.withholding.rate.points(), dec!(6.5));
        assert_eq!(config.withholding.threshold, Money::from(20000));
        assert!(config.require_company().is_err());
    }

    #[test]
    fn overrides_are_applied() {
        let company = CompanyId::new();
        let company_str = company.to_string();
        let config = load(&[
            (ENV_COMPANY_ID, company_str.as_str()),
            (ENV_DEFAULT_TAX_RATE, "7"),
            (ENV_WITHHOLDING_RATE, "10"),
            (ENV_WITHHOLDING_THRESHOLD, "50000"),
            (ENV_EXCHANGE_RATES, "USD=900, GBP=1100"),
        ])
        .unwrap();

        assert_eq!(config.require_company().unwrap(), company);
        assert_eq!(config.default_tax_rate.points(), dec!(7));
        assert_eq!(config.aggregator().policy().rate.points(), dec!(10));
        assert_eq!(config.withholding.threshold, Money::from(50000));
        assert_eq!(
            config
                .exchange_rates
                .rate_for(&Currency::new("usd"))
                .unwrap()
                .value(),
            dec!(900)
        );
        assert!(config.exchange_rates.rate_for(&Currency::new("GBP")).is_some());
    }

    #[test]
    fn default_tax_rate_reaches_purchases_and_pos() {
        let config = load(&[(ENV_DEFAULT_TAX_RATE, "7")]).unwrap();
        assert_eq!(config.purchase_tax(), PurchaseTax::Auto(Rate::percent(dec!(7))));

        let mut cart = config.pos_cart().unwrap();
        assert_eq!(cart.tax_rate().points(), dec!(7));
        cart.add_product("p-1", "Arroz", Money::from(107));
        assert_eq!(cart.totals().net, Money::from(100));

        let defaults = load(&[]).unwrap();
        assert_eq!(defaults.purchase_tax(), PurchaseTax::default());
    }

    #[test]
    fn invalid_values_are_reported_with_key() {
        let err = load(&[(ENV_DEFAULT_TAX_RATE, "140")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key, .. } if key == ENV_DEFAULT_TAX_RATE));

        let err = load(&[(ENV_COMPANY_ID, "acme")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key, .. } if key == ENV_COMPANY_ID));

        let err = load(&[(ENV_EXCHANGE_RATES, "USD:850")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key, .. } if key == ENV_EXCHANGE_RATES));

        let err = load(&[(ENV_WITHHOLDING_THRESHOLD, "-1")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn foreign_base_currency_drops_kwanza_rates() {
        let config = load(&[(ENV_BASE_CURRENCY, "eur")]).unwrap();
        assert_eq!(config.base_currency, Currency::new("EUR"));
        assert!(config.exchange_rates.rate_for(&Currency::new("USD")).is_none());
    }
}
