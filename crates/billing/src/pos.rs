//! Point-of-sale cart.
//!
//! POS prices are tax-inclusive: the cart total is what the customer pays,
//! and the net/tax split is backed out of it with the cart's tax rate.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use kwanza_core::{DomainResult, Money, Rate};

use crate::line::{DocumentLine, LineKind, compute_line_total};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PosCartItem {
    pub product_id: String,
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Money,
    pub discount: Rate,
}

impl PosCartItem {
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
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PosTotals {
    /// Amount due, tax included.
    pub gross: Money,
    pub net: Money,
    pub tax: Money,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PosCart {
    tax_rate: Rate,
    items: Vec<PosCartItem>,
}

impl PosCart {
    /// An empty cart; the tax rate must lie within `0..=100`.
    pub fn new(tax_rate: Rate) -> DomainResult<Self> {
        tax_rate.ensure_bounded("pos tax rate")?;
        Ok(Self {
            tax_rate,
            items: Vec::new(),
        })
    }

    pub fn tax_rate(&self) -> Rate {
        self.tax_rate
    }

    pub fn items(&self) -> &[PosCartItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Add one unit of a product; scanning the same product again bumps its quantity.
    pub fn add_product(&mut self, product_id: &str, description: &str, unit_price: Money) {
        if let Some(item) = self.items.iter_mut().find(|i| i.product_id == product_id) {
            item.quantity += Decimal::ONE;
            return;
        }
        self.items.push(PosCartItem {
            product_id: product_id.to_string(),
            description: description.to_string(),
            quantity: Decimal::ONE,
            unit_price,
            discount: Rate::ZERO,
        });
    }

    /// Add a prepared item, merging quantities with an existing line for the same product.
    pub fn add_item(&mut self, item: PosCartItem) {
        if let Some(existing) = self.items.iter_mut().find(|i| i.product_id == item.product_id) {
            existing.quantity += item.quantity;
            return;
        }
        self.items.push(item);
    }

    /// Set a quantity; zero or less removes the item.
    pub fn set_quantity(&mut self, product_id: &str, quantity: Decimal) {
        if quantity <= Decimal::ZERO {
            self.items.retain(|i| i.product_id != product_id);
            return;
        }
        if let Some(item) = self.items.iter_mut().find(|i| i.product_id == product_id) {
            item.quantity = quantity;
        }
    }

    pub fn totals(&self) -> PosTotals {
        let gross: Money = self.items.iter().map(PosCartItem::total).sum();
        let net = Money::new(gross.amount() / (Decimal::ONE + self.tax_rate.fraction()));
        PosTotals {
            gross,
            net,
            tax: gross - net,
        }
    }

    /// Change to hand back; never negative.
    pub fn change_for(&self, received: Money) -> Money {
        let due = self.totals().gross;
        if received > due {
            received - due
        } else {
            Money::ZERO
        }
    }

    /// Convert the cart into invoice lines (tax-exclusive unit prices).
    pub fn to_document_lines(&self) -> Vec<DocumentLine> {
        let divisor = Decimal::ONE + self.tax_rate.fraction();
        self.items
            .iter()
            .zip(1u32..)
            .map(|(item, line_no)| {
                DocumentLine::new(
                    line_no,
                    item.quantity,
                    Money::new(item.unit_price.amount() / divisor),
                    item.discount,
                    self.tax_rate,
                    LineKind::Product,
                )
                .with_product(item.product_id.clone())
                .with_description(item.description.clone())
            })
            .collect()
    }
}
