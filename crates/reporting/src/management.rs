//! Management report: items sold and returned in a period.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use kwanza_core::Money;
use kwanza_invoicing::InvoiceSnapshot;

use crate::period::ReportingPeriod;

const TOP_SELLERS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRow {
    pub line_no: u32,
    /// First five characters of the product id, upper-cased.
    pub serial: String,
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Money,
    pub net: Money,
    pub tax: Money,
    pub gross: Money,
    pub document_number: String,
    pub document_type: String,
    pub date: NaiveDate,
    pub client_name: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportBucket {
    pub net: Money,
    pub tax: Money,
    pub gross: Money,
}

impl ReportBucket {
    fn of(rows: &[ItemRow]) -> Self {
        rows.iter().fold(Self::default(), |acc, r| Self {
            net: acc.net + r.net,
            tax: acc.tax + r.tax,
            gross: acc.gross + r.gross,
        })
    }

    fn minus(self, other: Self) -> Self {
        Self {
            net: self.net - other.net,
            tax: self.tax - other.tax,
            gross: self.gross - other.gross,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopSeller {
    pub description: String,
    pub serial: String,
    pub quantity: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagementReport {
    pub period: ReportingPeriod,
    pub sales: Vec<ItemRow>,
    pub returns: Vec<ItemRow>,
    pub sales_totals: ReportBucket,
    pub returns_totals: ReportBucket,
    /// Sales minus returns.
    pub grand_totals: ReportBucket,
    pub top_sellers: Vec<TopSeller>,
}

pub fn management_report(invoices: &[InvoiceSnapshot], period: ReportingPeriod) -> ManagementReport {
    let mut sales = Vec::new();
    let mut returns = Vec::new();

    for inv in invoices.iter().filter(|inv| period.contains(inv.date())) {
        let target = if inv.invoice_type().is_credit_note() {
            &mut returns
        } else {
            &mut sales
        };
        for line in &inv.content.lines {
            let net = line.total();
            let tax = line.tax();
            target.push(ItemRow {
                line_no: line.line_no,
                serial: serial_of(line.product_id.as_deref()),
                description: line.description.clone(),
                quantity: line.quantity,
                unit_price: line.unit_price,
                net,
                tax,
                gross: net + tax,
                document_number: inv.number.clone(),
                document_type: inv.invoice_type().code().to_string(),
                date: inv.date(),
                client_name: inv.content.client_name.clone(),
            });
        }
    }

    let sales_totals = ReportBucket::of(&sales);
    let returns_totals = ReportBucket::of(&returns);
    let top_sellers = top_sellers(&sales);

    ManagementReport {
        period,
        grand_totals: sales_totals.minus(returns_totals),
        sales_totals,
        returns_totals,
        top_sellers,
        sales,
        returns,
    }
}

fn serial_of(product_id: Option<&str>) -> String {
    match product_id {
        Some(id) => id.chars().take(5).collect::<String>().to_uppercase(),
        None => "N/A".to_string(),
    }
}

fn top_sellers(rows: &[ItemRow]) -> Vec<TopSeller> {
    let mut by_description: BTreeMap<&str, TopSeller> = BTreeMap::new();
    for row in rows {
        by_description
            .entry(row.description.as_str())
            .or_insert_with(|| TopSeller {
                description: row.description.clone(),
                serial: row.serial.clone(),
                quantity: Decimal::ZERO,
            })
            .quantity += row.quantity;
    }

    // BTreeMap order gives ascending descriptions; the stable sort keeps it for ties.
    let mut sellers: Vec<TopSeller> = by_description.into_values().collect();
    sellers.sort_by(|a, b| b.quantity.cmp(&a.quantity));
    sellers.truncate(TOP_SELLERS);
    sellers
}
