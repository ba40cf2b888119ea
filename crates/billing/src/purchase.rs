//! Supplier purchase totals.
//!
//! Purchases differ from sales invoices: the global discount reduces the
//! taxable base *before* tax, tax is computed on the document (one rate, or
//! a manual amount copied from the supplier's invoice), and there is no
//! withholding.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use kwanza_core::{DomainError, DomainResult, Money, Rate};

use crate::currency::ExchangeRate;
use crate::line::compute_line_total;
use crate::totals::RetentionCategory;

/// One line of a supplier purchase (no metric factors).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseLine {
    pub line_no: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    #[serde(default)]
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Money,
    #[serde(default)]
    pub discount: Rate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rubric: Option<String>,
}

impl PurchaseLine {
    pub fn new(line_no: u32, quantity: Decimal, unit_price: Money, discount: Rate) -> Self {
        Self {
            line_no,
            product_id: None,
            description: String::new(),
            quantity,
            unit_price,
            discount,
            rubric: None,
        }
    }

    pub fn total(&self) -> Money {
        compute_line_total(
            self.quantity,
            Decimal::ONE,
            Decimal::ONE,
            Decimal::ONE,
            self.unit_price,
            self.discount,
        )
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.quantity <= Decimal::ZERO {
            return Err(DomainError::validation(format!(
                "purchase line {}: quantity must be positive",
                self.line_no
            )));
        }
        if self.unit_price.is_negative() {
            return Err(DomainError::validation(format!(
                "purchase line {}: unit price must not be negative",
                self.line_no
            )));
        }
        self.discount
            .ensure_bounded(&format!("purchase line {} discount", self.line_no))
    }
}

/// How the purchase tax is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "value", rename_all = "snake_case")]
pub enum PurchaseTax {
    /// `taxable × rate / 100`.
    Auto(Rate),
    /// Amount as printed on the supplier document.
    Manual(Money),
}

impl Default for PurchaseTax {
    fn default() -> Self {
        PurchaseTax::Auto(Rate::percent(Decimal::from(14)))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseTotals {
    pub subtotal: Money,
    pub global_discount_amount: Money,
    pub taxable_amount: Money,
    pub tax_amount: Money,
    pub retention_amount: Money,
    pub total: Money,
    pub contra_value: Money,
}

impl PurchaseTotals {
    pub fn rounded(&self) -> PurchaseTotals {
        PurchaseTotals {
            subtotal: self.subtotal.rounded(),
            global_discount_amount: self.global_discount_amount.rounded(),
            taxable_amount: self.taxable_amount.rounded(),
            tax_amount: self.tax_amount.rounded(),
            retention_amount: self.retention_amount.rounded(),
            total: self.total.rounded(),
            contra_value: self.contra_value.rounded(),
        }
    }
}

pub fn compute_purchase_totals(
    lines: &[PurchaseLine],
    global_discount: Rate,
    tax: PurchaseTax,
    retention: RetentionCategory,
    exchange_rate: ExchangeRate,
) -> PurchaseTotals {
    let subtotal: Money = lines.iter().map(PurchaseLine::total).sum();
    let global_discount_amount = subtotal.percent(global_discount);
    let taxable_amount = subtotal - global_discount_amount;
    let tax_amount = match tax {
        PurchaseTax::Auto(rate) => taxable_amount.percent(rate),
        PurchaseTax::Manual(amount) => amount,
    };
    let retention_amount = retention.retained(tax_amount);
    let total = taxable_amount + tax_amount - retention_amount;

    PurchaseTotals {
        subtotal,
        global_discount_amount,
        taxable_amount,
        tax_amount,
        retention_amount,
        total,
        contra_value: exchange_rate.convert(total),
    }
}
