//! Per-document-type summary of a SAF-T export.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use kwanza_billing::Currency;
use kwanza_core::Money;
use kwanza_invoicing::InvoiceSnapshot;
use kwanza_purchasing::PurchaseSnapshot;

use crate::period::ReportingPeriod;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SaftKind {
    Sales,
    Purchase,
}

impl SaftKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SaftKind::Sales => "SALES",
            SaftKind::Purchase => "PURCHASE",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaftTypeSummary {
    pub document_type: String,
    pub count: usize,
    pub total: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaftSummary {
    pub kind: SaftKind,
    pub period: ReportingPeriod,
    /// Sorted by type code; types without documents are omitted.
    pub types: Vec<SaftTypeSummary>,
    pub record_count: usize,
    pub total_value: Money,
}

impl SaftSummary {
    fn build<'a>(
        kind: SaftKind,
        period: ReportingPeriod,
        entries: impl Iterator<Item = (&'a str, Money)>,
    ) -> Self {
        let mut by_type: BTreeMap<&str, (usize, Money)> = BTreeMap::new();
        for (code, amount) in entries {
            let slot = by_type.entry(code).or_insert((0, Money::ZERO));
            slot.0 += 1;
            slot.1 += amount;
        }

        let types: Vec<SaftTypeSummary> = by_type
            .into_iter()
            .map(|(code, (count, total))| SaftTypeSummary {
                document_type: code.to_string(),
                count,
                total,
            })
            .collect();

        Self {
            kind,
            period,
            record_count: types.iter().map(|t| t.count).sum(),
            total_value: types.iter().map(|t| t.total).sum(),
            types,
        }
    }

    /// `SAFT_{kind}_{from}_{to}.xml`
    pub fn file_name(&self) -> String {
        format!(
            "SAFT_{}_{}_{}.xml",
            self.kind.as_str(),
            self.period.from(),
            self.period.to()
        )
    }
}

/// Sales summary, filtered on the accounting date.
pub fn saft_sales_summary(
    invoices: &[InvoiceSnapshot],
    period: ReportingPeriod,
    base: &Currency,
) -> SaftSummary {
    SaftSummary::build(
        SaftKind::Sales,
        period,
        invoices
            .iter()
            .filter(|inv| period.contains(inv.accounting_date()))
            .map(|inv| (inv.invoice_type().code(), inv.base_amount(base))),
    )
}

pub fn saft_purchase_summary(purchases: &[PurchaseSnapshot], period: ReportingPeriod) -> SaftSummary {
    SaftSummary::build(
        SaftKind::Purchase,
        period,
        purchases
            .iter()
            .filter(|p| period.contains(p.date()))
            .map(|p| (p.purchase_type().code(), p.totals.total)),
    )
}
