//! Reporting reductions over certified documents.
//!
//! Every report here is a pure function of a document slice and a period;
//! nothing is cached or streamed.

pub mod cash_closure;
pub mod management;
pub mod period;
pub mod saft;
pub mod statement;
pub mod tax_map;

#[cfg(test)]
pub(crate) mod fixtures;

pub use cash_closure::{CashClosure, CashClosureInput, close_cash_register};
pub use management::{ItemRow, ManagementReport, ReportBucket, TopSeller, management_report};
pub use period::ReportingPeriod;
pub use saft::{SaftKind, SaftSummary, SaftTypeSummary, saft_purchase_summary, saft_sales_summary};
pub use statement::{ClientStatement, StatementEntry, client_statement};
pub use tax_map::{TaxMap, TaxMapRow, TaxMapTotals, purchase_tax_map, sales_tax_map};
