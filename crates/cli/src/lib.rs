//! Offline command-line front end: read certified documents exported as JSON,
//! print totals and reports as JSON.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;
use serde::Serialize;
use serde::de::DeserializeOwned;

use kwanza_billing::{BillingConfig, DocumentTotals, PosCartItem};
use kwanza_core::Money;
use kwanza_invoicing::{InvoiceContent, InvoiceSnapshot};
use kwanza_reporting::{
    ReportingPeriod, client_statement, management_report, sales_tax_map, saft_sales_summary,
};

#[derive(Debug, Parser)]
#[command(
    name = "kwanza-cli",
    version,
    about = "Billing totals and reports over exported documents"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Totals of a single draft document.
    Totals {
        /// Invoice content as JSON.
        input: PathBuf,
    },
    /// Tax-inclusive totals of a POS cart at the configured tax rate.
    PosTotals {
        /// Cart items as a JSON array.
        input: PathBuf,
    },
    /// Output VAT map of certified sales.
    TaxMap(PeriodArgs),
    /// SAFT per-type summary of certified sales.
    Saft(PeriodArgs),
    /// Item-level sales and returns with top sellers.
    Management(PeriodArgs),
    /// Running-balance statement of one client.
    Statement {
        /// Certified invoices as a JSON array.
        input: PathBuf,
        client_id: String,
        #[arg(default_value = "0", value_parser = parse_money)]
        initial_balance: Money,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Args)]
pub struct PeriodArgs {
    /// Certified invoices as a JSON array.
    pub input: PathBuf,
    /// First day, YYYY-MM-DD.
    #[arg(value_parser = parse_date)]
    pub from: NaiveDate,
    /// Last day (inclusive), YYYY-MM-DD.
    #[arg(value_parser = parse_date)]
    pub to: NaiveDate,
}

impl PeriodArgs {
    fn period(&self) -> Result<ReportingPeriod> {
        ReportingPeriod::new(self.from, self.to).context("invalid reporting period")
    }

    fn invoices(&self) -> Result<Vec<InvoiceSnapshot>> {
        read_json(&self.input)
    }
}

#[derive(Debug, Serialize)]
struct TotalsOutput {
    has_withholding: bool,
    totals: DocumentTotals,
}

/// Execute `command`, returning pretty-printed JSON.
pub fn run(command: &Command, config: &BillingConfig) -> Result<String> {
    let base = &config.base_currency;
    match command {
        Command::Totals { input } => {
            let content: InvoiceContent = read_json(input)?;
            content.validate().context("invalid document")?;
            let (has_withholding, totals) = config
                .aggregator()
                .aggregate_derived(&content.lines, &content.modifiers);
            to_json(&TotalsOutput {
                has_withholding,
                totals: totals.rounded(),
            })
        }
        Command::PosTotals { input } => {
            let items: Vec<PosCartItem> = read_json(input)?;
            let mut cart = config.pos_cart().context("invalid default tax rate")?;
            for item in items {
                cart.add_item(item);
            }
            let totals = cart.totals();
            to_json(&kwanza_billing::PosTotals {
                gross: totals.gross.rounded(),
                net: totals.net.rounded(),
                tax: totals.tax.rounded(),
            })
        }
        Command::TaxMap(args) => {
            to_json(&sales_tax_map(&args.invoices()?, args.period()?, base))
        }
        Command::Saft(args) => {
            let summary = saft_sales_summary(&args.invoices()?, args.period()?, base);
            tracing::info!(file = %summary.file_name(), records = summary.record_count, "saft summary built");
            to_json(&summary)
        }
        Command::Management(args) => {
            to_json(&management_report(&args.invoices()?, args.period()?))
        }
        Command::Statement {
            input,
            client_id,
            initial_balance,
        } => {
            let invoices: Vec<InvoiceSnapshot> = read_json(input)?;
            to_json(&client_statement(client_id, *initial_balance, &invoices, base))
        }
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|e| format!("invalid date {raw:?}: {e}"))
}

fn parse_money(raw: &str) -> Result<Money, String> {
    raw.trim()
        .parse::<Decimal>()
        .map(Money::new)
        .map_err(|e| format!("invalid amount {raw:?}: {e}"))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("serializing output")
}
