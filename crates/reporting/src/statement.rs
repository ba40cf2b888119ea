//! Client current-account statement.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use kwanza_billing::Currency;
use kwanza_core::Money;
use kwanza_invoicing::InvoiceSnapshot;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementEntry {
    pub date: NaiveDate,
    pub document_number: String,
    pub document_type: String,
    pub debit: Money,
    pub credit: Money,
    /// Running balance after this entry.
    pub balance: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientStatement {
    pub client_id: String,
    pub initial_balance: Money,
    pub entries: Vec<StatementEntry>,
    pub total_debit: Money,
    pub total_credit: Money,
    pub balance: Money,
}

/// Statement over the client's certified documents, oldest first.
///
/// Credit notes and receipts credit the account at their document total;
/// everything else debits it in the base currency.
pub fn client_statement(
    client_id: &str,
    initial_balance: Money,
    invoices: &[InvoiceSnapshot],
    base: &Currency,
) -> ClientStatement {
    let mut documents: Vec<&InvoiceSnapshot> = invoices
        .iter()
        .filter(|inv| inv.content.client_id == client_id)
        .collect();
    documents.sort_by(|a, b| a.date().cmp(&b.date()).then_with(|| a.number.cmp(&b.number)));

    let mut balance = initial_balance;
    let mut total_debit = Money::ZERO;
    let mut total_credit = Money::ZERO;
    let mut entries = Vec::with_capacity(documents.len());

    for inv in documents {
        let (debit, credit) = if inv.invoice_type().credits_client_account() {
            (Money::ZERO, inv.totals.total)
        } else {
            (inv.base_amount(base), Money::ZERO)
        };
        total_debit += debit;
        total_credit += credit;
        balance += debit - credit;
        entries.push(StatementEntry {
            date: inv.date(),
            document_number: inv.number.clone(),
            document_type: inv.invoice_type().code().to_string(),
            debit,
            credit,
            balance,
        });
    }

    ClientStatement {
        client_id: client_id.to_string(),
        initial_balance,
        entries,
        total_debit,
        total_credit,
        balance,
    }
}
