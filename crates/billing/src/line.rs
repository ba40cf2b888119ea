//! Document lines and the line total calculator.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use kwanza_core::{DomainError, DomainResult, Money, Rate};

/// Goods vs services. Only services count towards withholding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LineKind {
    #[default]
    Product,
    Service,
}

/// One line of an invoice.
///
/// `length`, `width` and `height` are optional metric factors (e.g. square
/// metres of tiling); absent or non-positive factors count as 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentLine {
    pub line_no: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    pub quantity: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<Decimal>,
    pub unit_price: Money,
    #[serde(default)]
    pub discount: Rate,
    pub tax_rate: Rate,
    #[serde(default)]
    pub kind: LineKind,
    /// Accounting rubric code (e.g. "61.1"); descriptive only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rubric: Option<String>,
}

impl DocumentLine {
    /// A plain line without metric factors.
    pub fn new(
        line_no: u32,
        quantity: Decimal,
        unit_price: Money,
        discount: Rate,
        tax_rate: Rate,
        kind: LineKind,
    ) -> Self {
        Self {
            line_no,
            product_id: None,
            description: String::new(),
            unit: None,
            quantity,
            length: None,
            width: None,
            height: None,
            unit_price,
            discount,
            tax_rate,
            kind,
            rubric: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_product(mut self, product_id: impl Into<String>) -> Self {
        self.product_id = Some(product_id.into());
        self
    }

    pub fn with_metrics(mut self, length: Decimal, width: Decimal, height: Decimal) -> Self {
        self.length = Some(length);
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    /// Line total before tax, after the line discount.
    pub fn total(&self) -> Money {
        compute_line_total(
            self.quantity,
            metric_factor(self.length),
            metric_factor(self.width),
            metric_factor(self.height),
            self.unit_price,
            self.discount,
        )
    }

    /// Tax charged on this line: `total × tax_rate / 100`.
    pub fn tax(&self) -> Money {
        self.total().percent(self.tax_rate)
    }

    pub fn is_service(&self) -> bool {
        self.kind == LineKind::Service
    }

    /// Caller-side input checks; the calculator itself never fails.
    pub fn validate(&self) -> DomainResult<()> {
        if self.quantity <= Decimal::ZERO {
            return Err(DomainError::validation(format!(
                "line {}: quantity must be positive",
                self.line_no
            )));
        }
        if self.unit_price.is_negative() {
            return Err(DomainError::validation(format!(
                "line {}: unit price must not be negative",
                self.line_no
            )));
        }
        self.discount
            .ensure_bounded(&format!("line {} discount", self.line_no))?;
        self.tax_rate
            .ensure_bounded(&format!("line {} tax rate", self.line_no))?;
        Ok(())
    }
}

/// Effective metric factor: the value when strictly positive, otherwise 1.
pub fn metric_factor(value: Option<Decimal>) -> Decimal {
    match value {
        Some(v) if v > Decimal::ZERO => v,
        _ => Decimal::ONE,
    }
}

/// `quantity × length × width × height × unit_price × (1 − discount/100)`.
///
/// Dimensions that are zero or negative are floored to 1, so a missing
/// metric never zeroes the line. Full precision, no rounding.
pub fn compute_line_total(
    quantity: Decimal,
    length: Decimal,
    width: Decimal,
    height: Decimal,
    unit_price: Money,
    discount: Rate,
) -> Money {
    let volume = metric_factor(Some(length)) * metric_factor(Some(width)) * metric_factor(Some(height));
    unit_price.scale(quantity * volume * discount.complement())
}
