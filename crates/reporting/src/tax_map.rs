//! VAT calculation map.
//!
//! Sales rows credit the taxable base and add output VAT; credit notes and
//! cancelled documents reverse both. Purchase rows debit the taxable base.
//! All figures are in the base currency.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use kwanza_billing::Currency;
use kwanza_core::Money;
use kwanza_invoicing::{FINAL_CONSUMER_NIF, InvoiceSnapshot};
use kwanza_purchasing::PurchaseSnapshot;

use crate::period::ReportingPeriod;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxMapRow {
    pub document_number: String,
    pub document_type: String,
    pub date: NaiveDate,
    pub counterparty: String,
    pub nif: String,
    pub is_return: bool,
    pub credit: Money,
    pub debit: Money,
    pub tax: Money,
    pub total: Money,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxMapTotals {
    pub credit: Money,
    pub debit: Money,
    pub tax: Money,
    pub total: Money,
}

impl TaxMapTotals {
    fn add(mut self, row: &TaxMapRow) -> Self {
        self.credit += row.credit;
        self.debit += row.debit;
        self.tax += row.tax;
        self.total += row.total;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxMap {
    pub period: ReportingPeriod,
    pub rows: Vec<TaxMapRow>,
    pub totals: TaxMapTotals,
}

impl TaxMap {
    fn from_rows(period: ReportingPeriod, rows: Vec<TaxMapRow>) -> Self {
        let totals = rows.iter().fold(TaxMapTotals::default(), TaxMapTotals::add);
        Self {
            period,
            rows,
            totals,
        }
    }
}

/// Output VAT map for the certified sales dated inside `period`.
pub fn sales_tax_map(
    invoices: &[InvoiceSnapshot],
    period: ReportingPeriod,
    base: &Currency,
) -> TaxMap {
    let rows: Vec<TaxMapRow> = invoices
        .iter()
        .filter(|inv| period.contains(inv.date()))
        .map(|inv| {
            let amount = inv.base_amount(base);
            let tax = inv.base_tax(base);
            let taxable = amount - tax;
            let is_return = inv.is_return();
            let (credit, debit, tax, total) = if is_return {
                (Money::ZERO, taxable, -tax, -amount)
            } else {
                (taxable, Money::ZERO, tax, amount)
            };
            TaxMapRow {
                document_number: inv.number.clone(),
                document_type: inv.invoice_type().code().to_string(),
                date: inv.date(),
                counterparty: inv.content.client_name.clone(),
                nif: inv
                    .content
                    .client_nif
                    .clone()
                    .unwrap_or_else(|| FINAL_CONSUMER_NIF.to_string()),
                is_return,
                credit,
                debit,
                tax,
                total,
            }
        })
        .collect();

    tracing::debug!(%period, rows = rows.len(), "built sales tax map");
    TaxMap::from_rows(period, rows)
}

/// Deductible VAT map for the purchases dated inside `period`.
pub fn purchase_tax_map(purchases: &[PurchaseSnapshot], period: ReportingPeriod) -> TaxMap {
    let rows: Vec<TaxMapRow> = purchases
        .iter()
        .filter(|p| period.contains(p.date()))
        .map(|p| TaxMapRow {
            document_number: p.content.document_number.clone(),
            document_type: p.purchase_type().code().to_string(),
            date: p.date(),
            counterparty: p.content.supplier_name.clone(),
            nif: p.content.supplier_nif.clone(),
            is_return: false,
            credit: Money::ZERO,
            debit: p.totals.subtotal,
            tax: p.totals.tax_amount,
            total: p.totals.total,
        })
        .collect();

    tracing::debug!(%period, rows = rows.len(), "built purchase tax map");
    TaxMap::from_rows(period, rows)
}
