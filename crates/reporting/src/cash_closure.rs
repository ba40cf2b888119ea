//! End-of-day cash register closure.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use kwanza_core::Money;
use kwanza_invoicing::{InvoiceSnapshot, InvoiceStatus};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashClosureInput {
    pub cash_register_id: String,
    pub day: NaiveDate,
    /// Opening float of the register.
    pub initial_balance: Money,
    /// Cash counted by the operator.
    pub actual_cash: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashClosure {
    pub cash_register_id: String,
    pub day: NaiveDate,
    pub sales_count: usize,
    pub total_sales: Money,
    pub initial_balance: Money,
    pub expected_cash: Money,
    pub actual_cash: Money,
    /// Counted minus expected; negative means the drawer is short.
    pub difference: Money,
    pub final_balance: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl CashClosure {
    pub fn is_balanced(&self) -> bool {
        self.difference.rounded().is_zero()
    }
}

/// Close a register over the paid sales it took on `input.day`.
pub fn close_cash_register(input: CashClosureInput, invoices: &[InvoiceSnapshot]) -> CashClosure {
    let sales: Vec<&InvoiceSnapshot> = invoices
        .iter()
        .filter(|inv| {
            inv.content.cash_register_id.as_deref() == Some(input.cash_register_id.as_str())
                && inv.date() == input.day
                && inv.status == InvoiceStatus::Paid
        })
        .collect();

    let total_sales: Money = sales.iter().map(|inv| inv.totals.total).sum();
    let expected_cash = input.initial_balance + total_sales;
    let difference = input.actual_cash - expected_cash;

    if !difference.rounded().is_zero() {
        tracing::warn!(
            cash_register_id = %input.cash_register_id,
            day = %input.day,
            %expected_cash,
            actual_cash = %input.actual_cash,
            %difference,
            "cash register closed with a difference"
        );
    }

    CashClosure {
        sales_count: sales.len(),
        total_sales,
        initial_balance: input.initial_balance,
        expected_cash,
        actual_cash: input.actual_cash,
        difference,
        final_balance: input.actual_cash,
        cash_register_id: input.cash_register_id,
        day: input.day,
        operator_name: input.operator_name,
        notes: input.notes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{date, invoice, line};
    use kwanza_invoicing::InvoiceType;

    fn register_sale(register: &str, day: NaiveDate, price: i64) -> InvoiceSnapshot {
        let mut sale = invoice(InvoiceType::InvoiceReceipt, day, vec![line("A", 1, price, 0)]);
        sale.content.cash_register_id = Some(register.to_string());
        sale
    }

    fn input(actual: i64) -> CashClosureInput {
        CashClosureInput {
            cash_register_id: "cx-1".into(),
            day: date(8, 1),
            initial_balance: Money::from(5000),
            actual_cash: Money::from(actual),
            operator_name: Some("Ana".into()),
            notes: None,
        }
    }

    #[test]
    fn expected_cash_includes_opening_float() {
        let docs = vec![
            register_sale("cx-1", date(8, 1), 1000),
            register_sale("cx-1", date(8, 1), 2500),
            register_sale("cx-2", date(8, 1), 9999),
            register_sale("cx-1", date(7, 31), 9999),
        ];
        let closure = close_cash_register(input(8500), &docs);
        assert_eq!(closure.sales_count, 2);
        assert_eq!(closure.total_sales, Money::from(3500));
        assert_eq!(closure.expected_cash, Money::from(8500));
        assert!(closure.is_balanced());
        assert_eq!(closure.final_balance, Money::from(8500));
    }

    #[test]
    fn shortfall_is_negative_difference() {
        let docs = vec![register_sale("cx-1", date(8, 1), 1000)];
        let closure = close_cash_register(input(5900), &docs);
        assert_eq!(closure.difference, Money::from(-100));
        assert!(!closure.is_balanced());
    }

    #[test]
    fn unpaid_sales_are_not_counted() {
        let mut pending = register_sale("cx-1", date(8, 1), 1000);
        pending.status = InvoiceStatus::Pending;
        let closure = close_cash_register(input(5000), &[pending]);
        assert_eq!(closure.sales_count, 0);
        assert_eq!(closure.expected_cash, Money::from(5000));
    }
}
