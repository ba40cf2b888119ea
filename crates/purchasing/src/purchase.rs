use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use kwanza_billing::{
    Currency, ExchangeRate, PurchaseLine, PurchaseTax, PurchaseTotals, RetentionCategory,
    compute_purchase_totals,
};
use kwanza_core::{Aggregate, AggregateId, AggregateRoot, CompanyId, DomainError, DomainResult, Rate};
use kwanza_events::Event;
use kwanza_invoicing::{FINAL_CONSUMER_NIF, PaymentMethod};

/// Purchase identifier (company-scoped via `company_id` fields in events/commands).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PurchaseId(pub AggregateId);

impl PurchaseId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for PurchaseId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Supplier document type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PurchaseType {
    #[serde(rename = "FT")]
    Invoice,
    #[serde(rename = "FR")]
    InvoiceReceipt,
    #[serde(rename = "ND")]
    DebitNote,
    #[serde(rename = "NC")]
    CreditNote,
    #[serde(rename = "VD")]
    CashSale,
    #[serde(rename = "REC")]
    Receipt,
}

impl PurchaseType {
    pub const ALL: [PurchaseType; 6] = [
        PurchaseType::Invoice,
        PurchaseType::InvoiceReceipt,
        PurchaseType::DebitNote,
        PurchaseType::CreditNote,
        PurchaseType::CashSale,
        PurchaseType::Receipt,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            PurchaseType::Invoice => "FT",
            PurchaseType::InvoiceReceipt => "FR",
            PurchaseType::DebitNote => "ND",
            PurchaseType::CreditNote => "NC",
            PurchaseType::CashSale => "VD",
            PurchaseType::Receipt => "REC",
        }
    }

    /// Invoice/receipts and receipts are settled when recorded.
    pub fn is_paid_on_record(&self) -> bool {
        matches!(self, PurchaseType::InvoiceReceipt | PurchaseType::Receipt)
    }
}

impl core::fmt::Display for PurchaseType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseStatus {
    Pending,
    Paid,
    Cancelled,
}

fn default_supplier_nif() -> String {
    FINAL_CONSUMER_NIF.to_string()
}

/// The supplier document as keyed in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseContent {
    pub purchase_type: PurchaseType,
    pub supplier_id: String,
    pub supplier_name: String,
    #[serde(default = "default_supplier_nif")]
    pub supplier_nif: String,
    /// Number printed on the supplier's document.
    pub document_number: String,
    pub date: NaiveDate,
    pub due_date: NaiveDate,
    pub lines: Vec<PurchaseLine>,
    #[serde(default)]
    pub global_discount: Rate,
    #[serde(default)]
    pub tax: PurchaseTax,
    #[serde(default)]
    pub retention: RetentionCategory,
    #[serde(default)]
    pub currency: Currency,
    #[serde(default)]
    pub exchange_rate: ExchangeRate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<PaymentMethod>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cash_register_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warehouse_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl PurchaseContent {
    pub fn new(
        purchase_type: PurchaseType,
        supplier_id: impl Into<String>,
        supplier_name: impl Into<String>,
        document_number: impl Into<String>,
        date: NaiveDate,
        lines: Vec<PurchaseLine>,
    ) -> Self {
        Self {
            purchase_type,
            supplier_id: supplier_id.into(),
            supplier_name: supplier_name.into(),
            supplier_nif: default_supplier_nif(),
            document_number: document_number.into(),
            date,
            due_date: date,
            lines,
            global_discount: Rate::ZERO,
            tax: PurchaseTax::default(),
            retention: RetentionCategory::None,
            currency: Currency::aoa(),
            exchange_rate: ExchangeRate::ONE,
            payment_method: None,
            cash_register_id: None,
            warehouse_id: None,
            notes: None,
        }
    }

    pub fn with_tax(mut self, tax: PurchaseTax) -> Self {
        self.tax = tax;
        self
    }

    pub fn totals(&self) -> PurchaseTotals {
        compute_purchase_totals(
            &self.lines,
            self.global_discount,
            self.tax,
            self.retention,
            self.exchange_rate,
        )
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.supplier_id.trim().is_empty() {
            return Err(DomainError::validation("purchase requires a supplier"));
        }
        if self.document_number.trim().is_empty() {
            return Err(DomainError::validation("purchase requires the supplier document number"));
        }
        if self.lines.is_empty() {
            return Err(DomainError::validation("cannot record purchase without lines"));
        }
        for line in &self.lines {
            line.validate()?;
        }
        self.global_discount.ensure_bounded("global discount")?;
        match self.tax {
            PurchaseTax::Auto(rate) => rate.ensure_bounded("purchase tax rate")?,
            PurchaseTax::Manual(amount) if amount.is_negative() => {
                return Err(DomainError::validation("manual purchase tax must not be negative"));
            }
            PurchaseTax::Manual(_) => {}
        }
        if self.purchase_type.is_paid_on_record() {
            if self.payment_method.is_none() {
                return Err(DomainError::validation(format!(
                    "{} purchase requires a payment method",
                    self.purchase_type
                )));
            }
            if self.cash_register_id.is_none() {
                return Err(DomainError::validation(format!(
                    "{} purchase requires a cash register",
                    self.purchase_type
                )));
            }
        }
        Ok(())
    }
}

/// Aggregate root: Purchase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Purchase {
    id: PurchaseId,
    company_id: Option<CompanyId>,
    status: PurchaseStatus,
    content: Option<PurchaseContent>,
    recorded_at: Option<DateTime<Utc>>,
    cancellation_reason: Option<String>,
    version: u64,
    created: bool,
}

impl Purchase {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: PurchaseId) -> Self {
        Self {
            id,
            company_id: None,
            status: PurchaseStatus::Pending,
            content: None,
            recorded_at: None,
            cancellation_reason: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> PurchaseId {
        self.id
    }

    pub fn company_id(&self) -> Option<CompanyId> {
        self.company_id
    }

    pub fn status(&self) -> PurchaseStatus {
        self.status
    }

    pub fn content(&self) -> Option<&PurchaseContent> {
        self.content.as_ref()
    }

    pub fn totals(&self) -> PurchaseTotals {
        self.content
            .as_ref()
            .map(PurchaseContent::totals)
            .unwrap_or_default()
    }

    pub fn snapshot(&self) -> Option<PurchaseSnapshot> {
        Some(PurchaseSnapshot {
            purchase_id: self.id,
            company_id: self.company_id?,
            content: self.content.clone()?,
            status: self.status,
            totals: self.totals(),
            cancellation_reason: self.cancellation_reason.clone(),
            recorded_at: self.recorded_at?,
        })
    }
}

impl AggregateRoot for Purchase {
    type Id = PurchaseId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Immutable record of a purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseSnapshot {
    pub purchase_id: PurchaseId,
    pub company_id: CompanyId,
    pub content: PurchaseContent,
    pub status: PurchaseStatus,
    pub totals: PurchaseTotals,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancellation_reason: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl PurchaseSnapshot {
    pub fn purchase_type(&self) -> PurchaseType {
        self.content.purchase_type
    }

    pub fn date(&self) -> NaiveDate {
        self.content.date
    }
}

/// Command: RecordPurchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordPurchase {
    pub company_id: CompanyId,
    pub purchase_id: PurchaseId,
    pub content: PurchaseContent,
    pub occurred_at: DateTime<Utc>,
}

/// Command: MarkPurchasePaid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkPurchasePaid {
    pub company_id: CompanyId,
    pub purchase_id: PurchaseId,
    pub payment_method: PaymentMethod,
    pub occurred_at: DateTime<Utc>,
}

/// Command: CancelPurchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelPurchase {
    pub company_id: CompanyId,
    pub purchase_id: PurchaseId,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PurchaseCommand {
    RecordPurchase(RecordPurchase),
    MarkPurchasePaid(MarkPurchasePaid),
    CancelPurchase(CancelPurchase),
}

/// Event: PurchaseRecorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseRecorded {
    pub company_id: CompanyId,
    pub purchase_id: PurchaseId,
    pub content: PurchaseContent,
    pub status: PurchaseStatus,
    pub totals: PurchaseTotals,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PurchasePaid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchasePaid {
    pub company_id: CompanyId,
    pub purchase_id: PurchaseId,
    pub payment_method: PaymentMethod,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PurchaseCancelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseCancelled {
    pub company_id: CompanyId,
    pub purchase_id: PurchaseId,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PurchaseEvent {
    PurchaseRecorded(PurchaseRecorded),
    PurchasePaid(PurchasePaid),
    PurchaseCancelled(PurchaseCancelled),
}

impl Event for PurchaseEvent {
    fn event_type(&self) -> &'static str {
        match self {
            PurchaseEvent::PurchaseRecorded(_) => "purchasing.purchase.recorded",
            PurchaseEvent::PurchasePaid(_) => "purchasing.purchase.paid",
            PurchaseEvent::PurchaseCancelled(_) => "purchasing.purchase.cancelled",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            PurchaseEvent::PurchaseRecorded(e) => e.occurred_at,
            PurchaseEvent::PurchasePaid(e) => e.occurred_at,
            PurchaseEvent::PurchaseCancelled(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Purchase {
    type Command = PurchaseCommand;
    type Event = PurchaseEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            PurchaseEvent::PurchaseRecorded(e) => {
                self.id = e.purchase_id;
                self.company_id = Some(e.company_id);
                self.content = Some(e.content.clone());
                self.status = e.status;
                self.recorded_at = Some(e.occurred_at);
                self.created = true;
            }
            PurchaseEvent::PurchasePaid(e) => {
                if let Some(content) = self.content.as_mut() {
                    content.payment_method = Some(e.payment_method);
                }
                self.status = PurchaseStatus::Paid;
            }
            PurchaseEvent::PurchaseCancelled(e) => {
                self.status = PurchaseStatus::Cancelled;
                self.cancellation_reason = Some(e.reason.clone());
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            PurchaseCommand::RecordPurchase(cmd) => self.handle_record(cmd),
            PurchaseCommand::MarkPurchasePaid(cmd) => self.handle_mark_paid(cmd),
            PurchaseCommand::CancelPurchase(cmd) => self.handle_cancel(cmd),
        }
    }
}

impl Purchase {
    fn ensure_existing(&self, company_id: CompanyId, purchase_id: PurchaseId) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        if self.company_id != Some(company_id) {
            return Err(DomainError::invariant("company mismatch"));
        }
        if self.id != purchase_id {
            return Err(DomainError::invariant("purchase_id mismatch"));
        }
        Ok(())
    }

    fn handle_record(&self, cmd: &RecordPurchase) -> Result<Vec<PurchaseEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("purchase already exists"));
        }
        cmd.content.validate()?;

        let status = if cmd.content.purchase_type.is_paid_on_record() {
            PurchaseStatus::Paid
        } else {
            PurchaseStatus::Pending
        };
        let totals = cmd.content.totals();

        tracing::debug!(
            purchase_id = %cmd.purchase_id,
            purchase_type = %cmd.content.purchase_type,
            total = %totals.total,
            "recording purchase"
        );

        Ok(vec![PurchaseEvent::PurchaseRecorded(PurchaseRecorded {
            company_id: cmd.company_id,
            purchase_id: cmd.purchase_id,
            content: cmd.content.clone(),
            status,
            totals,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_mark_paid(&self, cmd: &MarkPurchasePaid) -> Result<Vec<PurchaseEvent>, DomainError> {
        self.ensure_existing(cmd.company_id, cmd.purchase_id)?;

        match self.status {
            PurchaseStatus::Pending => {}
            PurchaseStatus::Paid => return Err(DomainError::conflict("purchase is already paid")),
            PurchaseStatus::Cancelled => {
                return Err(DomainError::invariant("cannot pay a cancelled purchase"));
            }
        }

        Ok(vec![PurchaseEvent::PurchasePaid(PurchasePaid {
            company_id: cmd.company_id,
            purchase_id: cmd.purchase_id,
            payment_method: cmd.payment_method,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_cancel(&self, cmd: &CancelPurchase) -> Result<Vec<PurchaseEvent>, DomainError> {
        self.ensure_existing(cmd.company_id, cmd.purchase_id)?;

        if self.status == PurchaseStatus::Cancelled {
            return Err(DomainError::conflict("purchase is already cancelled"));
        }
        if cmd.reason.trim().is_empty() {
            return Err(DomainError::validation("cancellation requires a reason"));
        }

        Ok(vec![PurchaseEvent::PurchaseCancelled(PurchaseCancelled {
            company_id: cmd.company_id,
            purchase_id: cmd.purchase_id,
            reason: cmd.reason.trim().to_string(),
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kwanza_core::Money;
    use proptest::prelude::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn test_company_id() -> CompanyId {
        CompanyId::new()
    }

    fn test_purchase_id() -> PurchaseId {
        PurchaseId::new(AggregateId::new())
    }

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn content(purchase_type: PurchaseType) -> PurchaseContent {
        PurchaseContent::new(
            purchase_type,
            "sup-1",
            "Fornecedor SA",
            "FT A/123",
            NaiveDate::from_ymd_opt(2024, 4, 2).unwrap(),
            vec![PurchaseLine::new(1, dec!(10), Money::from(100), Rate::ZERO)],
        )
    }

    fn recorded(content: PurchaseContent) -> (Purchase, CompanyId, PurchaseId) {
        let company_id = test_company_id();
        let purchase_id = test_purchase_id();
        let mut purchase = Purchase::empty(purchase_id);
        let events = purchase
            .handle(&PurchaseCommand::RecordPurchase(RecordPurchase {
                company_id,
                purchase_id,
                content,
                occurred_at: test_time(),
            }))
            .unwrap();
        for e in &events {
            purchase.apply(e);
        }
        (purchase, company_id, purchase_id)
    }

    #[test]
    fn record_purchase_computes_totals() {
        let (purchase, _, _) = recorded(content(PurchaseType::Invoice));
        assert_eq!(purchase.status(), PurchaseStatus::Pending);
        assert_eq!(purchase.totals().tax_amount, Money::from(140));
        assert_eq!(purchase.totals().total, Money::from(1140));
        assert_eq!(purchase.content().unwrap().supplier_nif, "999999999");
    }

    #[test]
    fn configured_tax_rate_replaces_the_default() {
        let content = content(PurchaseType::Invoice).with_tax(PurchaseTax::Auto(Rate::percent(dec!(7))));
        let (purchase, _, _) = recorded(content);
        assert_eq!(purchase.totals().tax_amount, Money::from(70));
        assert_eq!(purchase.totals().total, Money::from(1070));
    }

    #[test]
    fn receipt_types_need_payment_details_and_are_paid() {
        let purchase = Purchase::empty(test_purchase_id());
        let err = purchase
            .handle(&PurchaseCommand::RecordPurchase(RecordPurchase {
                company_id: test_company_id(),
                purchase_id: test_purchase_id(),
                content: content(PurchaseType::Receipt),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(m) if m.contains("payment method")));

        let mut paid = content(PurchaseType::InvoiceReceipt);
        paid.payment_method = Some(PaymentMethod::Cash);
        paid.cash_register_id = Some("cx-1".into());
        let (purchase, _, _) = recorded(paid);
        assert_eq!(purchase.status(), PurchaseStatus::Paid);
    }

    #[test]
    fn mark_paid_only_from_pending() {
        let (mut purchase, company_id, purchase_id) = recorded(content(PurchaseType::Invoice));
        let pay = PurchaseCommand::MarkPurchasePaid(MarkPurchasePaid {
            company_id,
            purchase_id,
            payment_method: PaymentMethod::Transfer,
            occurred_at: test_time(),
        });
        for e in purchase.handle(&pay).unwrap() {
            purchase.apply(&e);
        }
        assert_eq!(purchase.status(), PurchaseStatus::Paid);
        assert_eq!(
            purchase.content().unwrap().payment_method,
            Some(PaymentMethod::Transfer)
        );
        assert!(matches!(purchase.handle(&pay).unwrap_err(), DomainError::Conflict(_)));
    }

    #[test]
    fn cancelled_purchase_cannot_be_paid() {
        let (mut purchase, company_id, purchase_id) = recorded(content(PurchaseType::Invoice));
        let cancel = PurchaseCommand::CancelPurchase(CancelPurchase {
            company_id,
            purchase_id,
            reason: "duplicado".into(),
            occurred_at: test_time(),
        });
        for e in purchase.handle(&cancel).unwrap() {
            purchase.apply(&e);
        }
        assert_eq!(purchase.status(), PurchaseStatus::Cancelled);
        assert!(matches!(purchase.handle(&cancel).unwrap_err(), DomainError::Conflict(_)));

        let err = purchase
            .handle(&PurchaseCommand::MarkPurchasePaid(MarkPurchasePaid {
                company_id,
                purchase_id,
                payment_method: PaymentMethod::Cash,
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn snapshot_serializes_type_codes() {
        let (purchase, _, _) = recorded(content(PurchaseType::DebitNote));
        let snapshot = purchase.snapshot().unwrap();
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["content"]["purchase_type"], "ND");
        assert_eq!(json["status"], "pending");
    }

    #[test]
    fn manual_tax_must_not_be_negative() {
        let mut c = content(PurchaseType::Invoice);
        c.tax = PurchaseTax::Manual(Money::from(-1));
        assert!(c.validate().is_err());
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]

        #[test]
        fn recorded_totals_match_content(
            qty in 1u32..100,
            price in 0i64..10_000,
            discount in 0u32..=100,
        ) {
            let mut c = content(PurchaseType::Invoice);
            c.lines = vec![PurchaseLine::new(1, Decimal::from(qty), Money::from(price), Rate::ZERO)];
            c.global_discount = Rate::percent(Decimal::from(discount));
            let (purchase, _, _) = recorded(c.clone());
            let totals = purchase.snapshot().unwrap().totals;
            prop_assert_eq!(totals, c.totals());
            prop_assert!(totals.taxable_amount <= totals.subtotal);
        }
    }
}
