use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;

use kwanza_billing::{Currency, DocumentAggregator, DocumentLine, ExchangeRate, LineKind, PurchaseLine};
use kwanza_core::{AggregateId, CompanyId, Money, Rate};
use kwanza_invoicing::{InvoiceContent, InvoiceId, InvoiceSnapshot, InvoiceStatus, InvoiceType};
use kwanza_purchasing::{PurchaseContent, PurchaseId, PurchaseSnapshot, PurchaseStatus, PurchaseType};

pub fn date(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, month, day).unwrap()
}

pub fn line(description: &str, qty: i64, price: i64, tax: i64) -> DocumentLine {
    DocumentLine::new(
        1,
        Decimal::from(qty),
        Money::from(price),
        Rate::ZERO,
        Rate::percent(Decimal::from(tax)),
        LineKind::Product,
    )
    .with_description(description)
}

pub fn invoice(invoice_type: InvoiceType, on: NaiveDate, lines: Vec<DocumentLine>) -> InvoiceSnapshot {
    let content = InvoiceContent::new(invoice_type, "serie", "client-1", "Cliente Lda", on, lines);
    snapshot_of(content)
}

pub fn foreign_invoice(
    on: NaiveDate,
    lines: Vec<DocumentLine>,
    currency: &str,
    rate: i64,
) -> InvoiceSnapshot {
    let content = InvoiceContent::new(InvoiceType::Invoice, "serie", "client-1", "Cliente Lda", on, lines)
        .with_currency(
            Currency::new(currency),
            ExchangeRate::new(Decimal::from(rate)).unwrap(),
        );
    snapshot_of(content)
}

pub fn snapshot_of(content: InvoiceContent) -> InvoiceSnapshot {
    let aggregator = DocumentAggregator::default();
    let (has_withholding, totals) = aggregator.aggregate_derived(&content.lines, &content.modifiers);
    let status = if content.invoice_type.is_paid_on_issue() {
        InvoiceStatus::Paid
    } else {
        InvoiceStatus::Pending
    };
    InvoiceSnapshot {
        invoice_id: InvoiceId::new(AggregateId::new()),
        company_id: CompanyId::new(),
        number: format!("{} 2024/1", content.invoice_type),
        status,
        has_withholding,
        totals,
        paid_amount: Money::ZERO,
        cancellation_reason: None,
        certified_at: Utc::now(),
        content,
    }
}

pub fn purchase(purchase_type: PurchaseType, on: NaiveDate, qty: i64, price: i64) -> PurchaseSnapshot {
    let content = PurchaseContent::new(
        purchase_type,
        "sup-1",
        "Fornecedor",
        "F-1",
        on,
        vec![PurchaseLine::new(1, Decimal::from(qty), Money::from(price), Rate::ZERO)],
    );
    PurchaseSnapshot {
        purchase_id: PurchaseId::new(AggregateId::new()),
        company_id: CompanyId::new(),
        status: PurchaseStatus::Pending,
        totals: content.totals(),
        cancellation_reason: None,
        recorded_at: Utc::now(),
        content,
    }
}
