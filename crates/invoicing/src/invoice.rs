use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use kwanza_billing::{DocumentAggregator, DocumentTotals};
use kwanza_core::{Aggregate, AggregateId, AggregateRoot, CompanyId, DomainError, Money};
use kwanza_events::Event;

use crate::document::{InvoiceContent, InvoiceStatus};
use crate::snapshot::InvoiceSnapshot;

/// Invoice identifier (company-scoped via `company_id` fields in events/commands).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvoiceId(pub AggregateId);

impl InvoiceId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for InvoiceId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Aggregate root: Invoice.
///
/// While drafted, totals are recomputed from the content through the
/// aggregator and the withholding flag follows the lines. Certification freezes
/// both; later policy changes never reach a certified invoice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invoice {
    id: InvoiceId,
    company_id: Option<CompanyId>,
    status: InvoiceStatus,
    content: Option<InvoiceContent>,
    number: Option<String>,
    frozen_withholding: Option<bool>,
    frozen_totals: Option<DocumentTotals>,
    certified_at: Option<DateTime<Utc>>,
    paid_amount: Money,
    cancellation_reason: Option<String>,
    aggregator: DocumentAggregator,
    version: u64,
    created: bool,
}

impl Invoice {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: InvoiceId) -> Self {
        Self {
            id,
            company_id: None,
            status: InvoiceStatus::Draft,
            content: None,
            number: None,
            frozen_withholding: None,
            frozen_totals: None,
            certified_at: None,
            paid_amount: Money::ZERO,
            cancellation_reason: None,
            aggregator: DocumentAggregator::default(),
            version: 0,
            created: false,
        }
    }

    /// Use a configured withholding policy instead of the default one.
    pub fn with_aggregator(mut self, aggregator: DocumentAggregator) -> Self {
        self.aggregator = aggregator;
        self
    }

    pub fn id_typed(&self) -> InvoiceId {
        self.id
    }

    pub fn company_id(&self) -> Option<CompanyId> {
        self.company_id
    }

    pub fn status(&self) -> InvoiceStatus {
        self.status
    }

    pub fn content(&self) -> Option<&InvoiceContent> {
        self.content.as_ref()
    }

    pub fn number(&self) -> Option<&str> {
        self.number.as_deref()
    }

    pub fn is_certified(&self) -> bool {
        self.certified_at.is_some()
    }

    pub fn paid_amount(&self) -> Money {
        self.paid_amount
    }

    pub fn cancellation_reason(&self) -> Option<&str> {
        self.cancellation_reason.as_deref()
    }

    pub fn has_withholding(&self) -> bool {
        match (self.frozen_withholding, &self.content) {
            (Some(frozen), _) => frozen,
            (None, Some(content)) => self.aggregator.derive_withholding(&content.lines),
            (None, None) => false,
        }
    }

    pub fn totals(&self) -> DocumentTotals {
        if let Some(frozen) = self.frozen_totals {
            return frozen;
        }
        match &self.content {
            Some(content) => self.aggregator.aggregate_with(
                &content.lines,
                &content.modifiers,
                self.has_withholding(),
            ),
            None => DocumentTotals::default(),
        }
    }

    pub fn outstanding_amount(&self) -> Money {
        let outstanding = self.totals().total - self.paid_amount;
        if outstanding.is_negative() {
            Money::ZERO
        } else {
            outstanding
        }
    }

    /// Invariant: only certified, open invoices take payments.
    pub fn can_accept_payment(&self) -> bool {
        self.is_certified()
            && matches!(self.status, InvoiceStatus::Pending | InvoiceStatus::Partial)
            && self.outstanding_amount() > Money::ZERO
    }

    /// Immutable record of a certified invoice.
    pub fn snapshot(&self) -> Option<InvoiceSnapshot> {
        let certified_at = self.certified_at?;
        let content = self.content.clone()?;
        Some(InvoiceSnapshot {
            invoice_id: self.id,
            company_id: self.company_id?,
            number: self.number.clone().unwrap_or_default(),
            status: self.status,
            has_withholding: self.has_withholding(),
            totals: self.totals(),
            paid_amount: self.paid_amount,
            cancellation_reason: self.cancellation_reason.clone(),
            certified_at,
            content,
        })
    }
}

impl AggregateRoot for Invoice {
    type Id = InvoiceId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: DraftInvoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftInvoice {
    pub company_id: CompanyId,
    pub invoice_id: InvoiceId,
    pub content: InvoiceContent,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ReviseInvoice (replaces the whole content of a draft).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviseInvoice {
    pub company_id: CompanyId,
    pub invoice_id: InvoiceId,
    pub content: InvoiceContent,
    pub occurred_at: DateTime<Utc>,
}

/// Command: CertifyInvoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertifyInvoice {
    pub company_id: CompanyId,
    pub invoice_id: InvoiceId,
    /// Fiscal number assigned by the series, e.g. `FT 2024/17`.
    pub number: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RegisterPayment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterPayment {
    pub company_id: CompanyId,
    pub invoice_id: InvoiceId,
    pub amount: Money,
    pub occurred_at: DateTime<Utc>,
}

/// Command: CancelInvoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelInvoice {
    pub company_id: CompanyId,
    pub invoice_id: InvoiceId,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvoiceCommand {
    DraftInvoice(DraftInvoice),
    ReviseInvoice(ReviseInvoice),
    CertifyInvoice(CertifyInvoice),
    RegisterPayment(RegisterPayment),
    CancelInvoice(CancelInvoice),
}

/// Event: InvoiceDrafted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceDrafted {
    pub company_id: CompanyId,
    pub invoice_id: InvoiceId,
    pub content: InvoiceContent,
    pub occurred_at: DateTime<Utc>,
}

/// Event: InvoiceRevised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceRevised {
    pub company_id: CompanyId,
    pub invoice_id: InvoiceId,
    pub content: InvoiceContent,
    pub occurred_at: DateTime<Utc>,
}

/// Event: InvoiceCertified.
///
/// Carries the frozen withholding flag and the totals as certified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceCertified {
    pub company_id: CompanyId,
    pub invoice_id: InvoiceId,
    pub number: String,
    pub status: InvoiceStatus,
    pub has_withholding: bool,
    pub totals: DocumentTotals,
    pub paid_amount: Money,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PaymentRegistered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRegistered {
    pub company_id: CompanyId,
    pub invoice_id: InvoiceId,
    pub amount: Money,
    pub new_paid_amount: Money,
    pub occurred_at: DateTime<Utc>,
}

/// Event: InvoiceCancelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceCancelled {
    pub company_id: CompanyId,
    pub invoice_id: InvoiceId,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvoiceEvent {
    InvoiceDrafted(InvoiceDrafted),
    InvoiceRevised(InvoiceRevised),
    InvoiceCertified(InvoiceCertified),
    PaymentRegistered(PaymentRegistered),
    InvoiceCancelled(InvoiceCancelled),
}

impl Event for InvoiceEvent {
    fn event_type(&self) -> &'static str {
        match self {
            InvoiceEvent::InvoiceDrafted(_) => "invoicing.invoice.drafted",
            InvoiceEvent::InvoiceRevised(_) => "invoicing.invoice.revised",
            InvoiceEvent::InvoiceCertified(_) => "invoicing.invoice.certified",
            InvoiceEvent::PaymentRegistered(_) => "invoicing.invoice.payment_registered",
            InvoiceEvent::InvoiceCancelled(_) => "invoicing.invoice.cancelled",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            InvoiceEvent::InvoiceDrafted(e) => e.occurred_at,
            InvoiceEvent::InvoiceRevised(e) => e.occurred_at,
            InvoiceEvent::InvoiceCertified(e) => e.occurred_at,
            InvoiceEvent::PaymentRegistered(e) => e.occurred_at,
            InvoiceEvent::InvoiceCancelled(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Invoice {
    type Command = InvoiceCommand;
    type Event = InvoiceEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            InvoiceEvent::InvoiceDrafted(e) => {
                self.id = e.invoice_id;
                self.company_id = Some(e.company_id);
                self.content = Some(e.content.clone());
                self.status = InvoiceStatus::Draft;
                self.paid_amount = Money::ZERO;
                self.created = true;
            }
            InvoiceEvent::InvoiceRevised(e) => {
                self.content = Some(e.content.clone());
            }
            InvoiceEvent::InvoiceCertified(e) => {
                self.number = Some(e.number.clone());
                self.status = e.status;
                self.frozen_withholding = Some(e.has_withholding);
                self.frozen_totals = Some(e.totals);
                self.paid_amount = e.paid_amount;
                self.certified_at = Some(e.occurred_at);
            }
            InvoiceEvent::PaymentRegistered(e) => {
                self.paid_amount = e.new_paid_amount;
                self.status = if self.paid_amount >= self.totals().total {
                    InvoiceStatus::Paid
                } else {
                    InvoiceStatus::Partial
                };
            }
            InvoiceEvent::InvoiceCancelled(e) => {
                self.status = InvoiceStatus::Cancelled;
                self.cancellation_reason = Some(e.reason.clone());
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            InvoiceCommand::DraftInvoice(cmd) => self.handle_draft(cmd),
            InvoiceCommand::ReviseInvoice(cmd) => self.handle_revise(cmd),
            InvoiceCommand::CertifyInvoice(cmd) => self.handle_certify(cmd),
            InvoiceCommand::RegisterPayment(cmd) => self.handle_register_payment(cmd),
            InvoiceCommand::CancelInvoice(cmd) => self.handle_cancel(cmd),
        }
    }
}

impl Invoice {
    fn ensure_company(&self, company_id: CompanyId) -> Result<(), DomainError> {
        if !self.created {
            return Ok(());
        }
        if self.company_id != Some(company_id) {
            return Err(DomainError::invariant("company mismatch"));
        }
        Ok(())
    }

    fn ensure_invoice_id(&self, invoice_id: InvoiceId) -> Result<(), DomainError> {
        if self.id != invoice_id {
            return Err(DomainError::invariant("invoice_id mismatch"));
        }
        Ok(())
    }

    fn ensure_existing(&self, company_id: CompanyId, invoice_id: InvoiceId) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_company(company_id)?;
        self.ensure_invoice_id(invoice_id)
    }

    fn ensure_editable(&self) -> Result<(), DomainError> {
        if self.status == InvoiceStatus::Cancelled {
            return Err(DomainError::conflict("invoice is cancelled"));
        }
        if self.is_certified() {
            return Err(DomainError::conflict("invoice is certified and read-only"));
        }
        Ok(())
    }

    fn handle_draft(&self, cmd: &DraftInvoice) -> Result<Vec<InvoiceEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("invoice already exists"));
        }
        cmd.content.validate()?;

        tracing::debug!(
            invoice_id = %cmd.invoice_id,
            invoice_type = %cmd.content.invoice_type,
            lines = cmd.content.lines.len(),
            "drafting invoice"
        );

        Ok(vec![InvoiceEvent::InvoiceDrafted(InvoiceDrafted {
            company_id: cmd.company_id,
            invoice_id: cmd.invoice_id,
            content: cmd.content.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_revise(&self, cmd: &ReviseInvoice) -> Result<Vec<InvoiceEvent>, DomainError> {
        self.ensure_existing(cmd.company_id, cmd.invoice_id)?;
        self.ensure_editable()?;
        cmd.content.validate()?;

        Ok(vec![InvoiceEvent::InvoiceRevised(InvoiceRevised {
            company_id: cmd.company_id,
            invoice_id: cmd.invoice_id,
            content: cmd.content.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_certify(&self, cmd: &CertifyInvoice) -> Result<Vec<InvoiceEvent>, DomainError> {
        self.ensure_existing(cmd.company_id, cmd.invoice_id)?;
        self.ensure_editable()?;

        if cmd.number.trim().is_empty() {
            return Err(DomainError::validation("certified invoice requires a number"));
        }
        let content = self
            .content
            .as_ref()
            .ok_or_else(|| DomainError::invariant("drafted invoice has no content"))?;
        content.validate()?;

        let has_withholding = self.aggregator.derive_withholding(&content.lines);
        let totals =
            self.aggregator
                .aggregate_with(&content.lines, &content.modifiers, has_withholding);
        let (status, paid_amount) = if content.invoice_type.is_paid_on_issue() {
            (InvoiceStatus::Paid, totals.total)
        } else {
            (InvoiceStatus::Pending, Money::ZERO)
        };

        tracing::debug!(
            invoice_id = %cmd.invoice_id,
            number = %cmd.number,
            has_withholding,
            total = %totals.total,
            "certifying invoice"
        );

        Ok(vec![InvoiceEvent::InvoiceCertified(InvoiceCertified {
            company_id: cmd.company_id,
            invoice_id: cmd.invoice_id,
            number: cmd.number.clone(),
            status,
            has_withholding,
            totals,
            paid_amount,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_register_payment(
        &self,
        cmd: &RegisterPayment,
    ) -> Result<Vec<InvoiceEvent>, DomainError> {
        self.ensure_existing(cmd.company_id, cmd.invoice_id)?;

        if !self.can_accept_payment() {
            return Err(DomainError::invariant(
                "cannot register payment on uncertified, cancelled or fully paid invoice",
            ));
        }

        if cmd.amount <= Money::ZERO {
            return Err(DomainError::validation("payment amount must be positive"));
        }

        let new_paid_amount = self.paid_amount + cmd.amount;
        if new_paid_amount > self.totals().total {
            return Err(DomainError::invariant("cannot overpay invoice"));
        }

        Ok(vec![InvoiceEvent::PaymentRegistered(PaymentRegistered {
            company_id: cmd.company_id,
            invoice_id: cmd.invoice_id,
            amount: cmd.amount,
            new_paid_amount,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_cancel(&self, cmd: &CancelInvoice) -> Result<Vec<InvoiceEvent>, DomainError> {
        self.ensure_existing(cmd.company_id, cmd.invoice_id)?;

        if self.status == InvoiceStatus::Cancelled {
            return Err(DomainError::conflict("invoice is already cancelled"));
        }
        if cmd.reason.trim().is_empty() {
            return Err(DomainError::validation("cancellation requires a reason"));
        }

        tracing::debug!(invoice_id = %cmd.invoice_id, "cancelling invoice");

        Ok(vec![InvoiceEvent::InvoiceCancelled(InvoiceCancelled {
            company_id: cmd.company_id,
            invoice_id: cmd.invoice_id,
            reason: cmd.reason.trim().to_string(),
            occurred_at: cmd.occurred_at,
        })])
    }
}
