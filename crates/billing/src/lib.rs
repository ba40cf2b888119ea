//! Billing calculations (pure functions, no IO).
//!
//! - [`line`]: line totals with metric factors and line discounts.
//! - [`totals`]: document aggregation (tax, global discount, withholding,
//!   VAT retention, contravalue).
//! - [`purchase`]: supplier purchase totals.
//! - [`currency`]: currencies and exchange rates.
//! - [`pos`]: tax-inclusive point-of-sale cart.
//! - [`config`]: billing configuration loaded from the environment.

pub mod config;
pub mod currency;
pub mod line;
pub mod pos;
pub mod purchase;
pub mod totals;

pub use config::{BillingConfig, ConfigError};
pub use currency::{Currency, ExchangeRate, ExchangeRateTable};
pub use line::{DocumentLine, LineKind, compute_line_total, metric_factor};
pub use pos::{PosCart, PosCartItem, PosTotals};
pub use purchase::{PurchaseLine, PurchaseTax, PurchaseTotals, compute_purchase_totals};
pub use totals::{
    DocumentAggregator, DocumentModifiers, DocumentTotals, RetentionCategory, WithholdingPolicy,
    compute_document_totals, derive_withholding,
};
