use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use kwanza_billing::{Currency, DocumentAggregator, DocumentTotals};
use kwanza_core::{CompanyId, Money};

use crate::document::{InvoiceContent, InvoiceStatus, InvoiceType};
use crate::invoice::InvoiceId;

/// Immutable record of a certified invoice, as handed to persistence and reports.
///
/// `totals` keeps full precision; round with [`DocumentTotals::rounded`] when presenting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceSnapshot {
    pub invoice_id: InvoiceId,
    pub company_id: CompanyId,
    pub number: String,
    pub content: InvoiceContent,
    pub status: InvoiceStatus,
    pub has_withholding: bool,
    pub totals: DocumentTotals,
    pub paid_amount: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancellation_reason: Option<String>,
    pub certified_at: DateTime<Utc>,
}

impl InvoiceSnapshot {
    pub fn invoice_type(&self) -> InvoiceType {
        self.content.invoice_type
    }

    pub fn date(&self) -> NaiveDate {
        self.content.date
    }

    pub fn accounting_date(&self) -> NaiveDate {
        self.content.accounting_date
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == InvoiceStatus::Cancelled
    }

    /// Credit notes and cancelled documents reverse revenue.
    pub fn is_return(&self) -> bool {
        self.invoice_type().is_credit_note() || self.is_cancelled()
    }

    /// Re-run the aggregation over the stored lines with the frozen withholding flag.
    pub fn recompute_totals(&self, aggregator: &DocumentAggregator) -> DocumentTotals {
        aggregator.aggregate_with(
            &self.content.lines,
            &self.content.modifiers,
            self.has_withholding,
        )
    }

    pub fn in_base_currency(&self, base: &Currency) -> bool {
        &self.content.modifiers.currency == base
    }

    /// Document total expressed in the base currency.
    pub fn base_amount(&self, base: &Currency) -> Money {
        if self.in_base_currency(base) || self.totals.contra_value.is_zero() {
            self.totals.total
        } else {
            self.totals.contra_value
        }
    }

    /// Tax amount expressed in the base currency.
    pub fn base_tax(&self, base: &Currency) -> Money {
        if self.in_base_currency(base) {
            self.totals.tax_amount
        } else {
            self.content
                .modifiers
                .exchange_rate
                .convert(self.totals.tax_amount)
        }
    }
}
