//! Invoice document content: type codes, statuses, header fields and lines.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use kwanza_billing::{Currency, DocumentLine, DocumentModifiers, ExchangeRate, PosCart};
use kwanza_core::{DomainError, DomainResult};

/// Client id used for anonymous counter sales.
pub const FINAL_CONSUMER_ID: &str = "CONSUMIDOR_FINAL";
pub const FINAL_CONSUMER_NAME: &str = "Consumidor Final";
/// Placeholder tax number printed for clients without one.
pub const FINAL_CONSUMER_NIF: &str = "999999999";

/// Sales document type (fiscal series code).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum InvoiceType {
    #[serde(rename = "FT")]
    Invoice,
    #[serde(rename = "FR")]
    InvoiceReceipt,
    #[serde(rename = "PP")]
    ProForma,
    #[serde(rename = "OR")]
    Quote,
    #[serde(rename = "GR")]
    ShippingGuide,
    #[serde(rename = "GT")]
    TransportGuide,
    #[serde(rename = "GE")]
    DeliveryGuide,
    #[serde(rename = "NE")]
    OrderNote,
    #[serde(rename = "NC")]
    CreditNote,
    #[serde(rename = "ND")]
    DebitNote,
    #[serde(rename = "RG")]
    Receipt,
    #[serde(rename = "VD")]
    CashSale,
    #[serde(rename = "FS")]
    SimplifiedInvoice,
}

impl InvoiceType {
    pub const ALL: [InvoiceType; 13] = [
        InvoiceType::Invoice,
        InvoiceType::InvoiceReceipt,
        InvoiceType::ProForma,
        InvoiceType::Quote,
        InvoiceType::ShippingGuide,
        InvoiceType::TransportGuide,
        InvoiceType::DeliveryGuide,
        InvoiceType::OrderNote,
        InvoiceType::CreditNote,
        InvoiceType::DebitNote,
        InvoiceType::Receipt,
        InvoiceType::CashSale,
        InvoiceType::SimplifiedInvoice,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            InvoiceType::Invoice => "FT",
            InvoiceType::InvoiceReceipt => "FR",
            InvoiceType::ProForma => "PP",
            InvoiceType::Quote => "OR",
            InvoiceType::ShippingGuide => "GR",
            InvoiceType::TransportGuide => "GT",
            InvoiceType::DeliveryGuide => "GE",
            InvoiceType::OrderNote => "NE",
            InvoiceType::CreditNote => "NC",
            InvoiceType::DebitNote => "ND",
            InvoiceType::Receipt => "RG",
            InvoiceType::CashSale => "VD",
            InvoiceType::SimplifiedInvoice => "FS",
        }
    }

    /// Printed document name.
    pub fn label(&self) -> &'static str {
        match self {
            InvoiceType::Invoice => "Fatura",
            InvoiceType::InvoiceReceipt => "Fatura/Recibo",
            InvoiceType::ProForma => "Fatura Pró-forma",
            InvoiceType::Quote => "Orçamento",
            InvoiceType::ShippingGuide => "Guia de Remessa",
            InvoiceType::TransportGuide => "Guia de Transporte",
            InvoiceType::DeliveryGuide => "Guia de Entrega",
            InvoiceType::OrderNote => "Nota de Encomenda",
            InvoiceType::CreditNote => "Nota de Crédito",
            InvoiceType::DebitNote => "Nota de Débito",
            InvoiceType::Receipt => "Recibo",
            InvoiceType::CashSale => "Venda a Dinheiro",
            InvoiceType::SimplifiedInvoice => "Fatura Simplificada",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.code() == code)
    }

    /// Credit notes reverse a sale (returns bucket in reports).
    pub fn is_credit_note(&self) -> bool {
        matches!(self, InvoiceType::CreditNote)
    }

    /// Documents that credit the client's current account.
    pub fn credits_client_account(&self) -> bool {
        matches!(self, InvoiceType::CreditNote | InvoiceType::Receipt)
    }

    /// Documents settled at the moment they are issued.
    pub fn is_paid_on_issue(&self) -> bool {
        matches!(
            self,
            InvoiceType::InvoiceReceipt | InvoiceType::Receipt | InvoiceType::CashSale
        )
    }
}

impl core::fmt::Display for InvoiceType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.code())
    }
}

/// Invoice status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Draft,
    Pending,
    Partial,
    Paid,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Cash,
    Multicaixa,
    Transfer,
    Check,
    CreditCard,
    DebitCard,
    McxExpress,
    Others,
    CreditAccount,
}

/// Where the document was produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DocumentSource {
    #[default]
    Manual,
    Pos,
}

/// Everything the operator fills in on an invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceContent {
    pub invoice_type: InvoiceType,
    pub series_id: String,
    pub client_id: String,
    pub client_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_nif: Option<String>,
    pub date: NaiveDate,
    pub due_date: NaiveDate,
    pub accounting_date: NaiveDate,
    pub lines: Vec<DocumentLine>,
    #[serde(default)]
    pub modifiers: DocumentModifiers,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<PaymentMethod>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cash_register_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub source: DocumentSource,
}

impl InvoiceContent {
    /// A manual invoice dated `date` with due and accounting dates on the same day.
    pub fn new(
        invoice_type: InvoiceType,
        series_id: impl Into<String>,
        client_id: impl Into<String>,
        client_name: impl Into<String>,
        date: NaiveDate,
        lines: Vec<DocumentLine>,
    ) -> Self {
        Self {
            invoice_type,
            series_id: series_id.into(),
            client_id: client_id.into(),
            client_name: client_name.into(),
            client_nif: None,
            date,
            due_date: date,
            accounting_date: date,
            lines,
            modifiers: DocumentModifiers::default(),
            payment_method: None,
            cash_register_id: None,
            operator_name: None,
            notes: None,
            source: DocumentSource::Manual,
        }
    }

    /// Invoice/receipt for a POS cart sold to the final consumer.
    pub fn from_pos_cart(
        cart: &PosCart,
        series_id: impl Into<String>,
        date: NaiveDate,
        payment_method: PaymentMethod,
        cash_register_id: Option<String>,
    ) -> Self {
        let mut content = Self::new(
            InvoiceType::InvoiceReceipt,
            series_id,
            FINAL_CONSUMER_ID,
            FINAL_CONSUMER_NAME,
            date,
            cart.to_document_lines(),
        );
        content.client_nif = Some(FINAL_CONSUMER_NIF.to_string());
        content.payment_method = Some(payment_method);
        content.cash_register_id = cash_register_id;
        content.source = DocumentSource::Pos;
        content
    }

    pub fn with_currency(mut self, currency: Currency, exchange_rate: ExchangeRate) -> Self {
        self.modifiers.currency = currency;
        self.modifiers.exchange_rate = exchange_rate;
        self
    }

    /// Required fields: client, series and at least one valid line.
    pub fn validate(&self) -> DomainResult<()> {
        if self.client_id.trim().is_empty() {
            return Err(DomainError::validation("invoice requires a client"));
        }
        if self.series_id.trim().is_empty() {
            return Err(DomainError::validation("invoice requires a document series"));
        }
        if self.lines.is_empty() {
            return Err(DomainError::validation("cannot issue invoice without lines"));
        }
        for line in &self.lines {
            line.validate()?;
        }
        self.modifiers.validate()
    }
}
