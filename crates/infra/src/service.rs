//! Application services: dispatch a document command, then keep the snapshot
//! store in step with the aggregate.

use thiserror::Error;

use kwanza_billing::DocumentAggregator;
use kwanza_core::CompanyId;
use kwanza_events::EventEnvelope;
use kwanza_invoicing::{Invoice, InvoiceCommand, InvoiceEvent, InvoiceId, InvoiceSnapshot};
use kwanza_purchasing::{Purchase, PurchaseCommand, PurchaseEvent, PurchaseId, PurchaseSnapshot};

use crate::dispatcher::{CommandDispatcher, DispatchError};
use crate::document_store::{DocumentStore, StoreError};
use crate::journal::EventStore;

pub const INVOICE_KIND: &str = "invoicing.invoice";
pub const PURCHASE_KIND: &str = "purchasing.purchase";

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

fn invoice_target(command: &InvoiceCommand) -> (CompanyId, InvoiceId) {
    match command {
        InvoiceCommand::DraftInvoice(c) => (c.company_id, c.invoice_id),
        InvoiceCommand::ReviseInvoice(c) => (c.company_id, c.invoice_id),
        InvoiceCommand::CertifyInvoice(c) => (c.company_id, c.invoice_id),
        InvoiceCommand::RegisterPayment(c) => (c.company_id, c.invoice_id),
        InvoiceCommand::CancelInvoice(c) => (c.company_id, c.invoice_id),
    }
}

fn purchase_target(command: &PurchaseCommand) -> (CompanyId, PurchaseId) {
    match command {
        PurchaseCommand::RecordPurchase(c) => (c.company_id, c.purchase_id),
        PurchaseCommand::MarkPurchasePaid(c) => (c.company_id, c.purchase_id),
        PurchaseCommand::CancelPurchase(c) => (c.company_id, c.purchase_id),
    }
}

/// Invoices: certification submits the snapshot; later transitions supersede it.
pub struct InvoiceService<S, D> {
    dispatcher: CommandDispatcher<S>,
    snapshots: D,
    aggregator: DocumentAggregator,
}

impl<S, D> InvoiceService<S, D>
where
    S: EventStore,
    D: DocumentStore<InvoiceId, InvoiceSnapshot>,
{
    pub fn new(journal: S, snapshots: D, aggregator: DocumentAggregator) -> Self {
        Self {
            dispatcher: CommandDispatcher::new(journal),
            snapshots,
            aggregator,
        }
    }

    pub fn execute(&self, command: InvoiceCommand) -> Result<Invoice, ServiceError> {
        let (company_id, invoice_id) = invoice_target(&command);
        let certifying = matches!(command, InvoiceCommand::CertifyInvoice(_));
        let aggregator = self.aggregator;
        let (invoice, committed) = self.dispatcher.dispatch(
            company_id,
            invoice_id.0,
            INVOICE_KIND,
            command,
            |_, id| Invoice::empty(InvoiceId::new(id)).with_aggregator(aggregator),
        )?;

        if committed.is_empty() {
            return Ok(invoice);
        }
        if let Some(snapshot) = invoice.snapshot() {
            if certifying {
                self.snapshots.submit(company_id, invoice_id, snapshot)?;
                tracing::info!(%company_id, %invoice_id, "invoice snapshot submitted");
            } else {
                self.snapshots.supersede(company_id, invoice_id, snapshot)?;
            }
        }
        Ok(invoice)
    }

    pub fn load(&self, company_id: CompanyId, invoice_id: InvoiceId) -> Result<Invoice, ServiceError> {
        let aggregator = self.aggregator;
        Ok(self.dispatcher.load(company_id, invoice_id.0, |_, id| {
            Invoice::empty(InvoiceId::new(id)).with_aggregator(aggregator)
        })?)
    }

    /// Audit trail of one invoice.
    pub fn history(
        &self,
        company_id: CompanyId,
        invoice_id: InvoiceId,
    ) -> Result<Vec<EventEnvelope<InvoiceEvent>>, ServiceError> {
        Ok(self.dispatcher.history(company_id, invoice_id.0)?)
    }

    pub fn certified(&self, company_id: CompanyId) -> Result<Vec<InvoiceSnapshot>, ServiceError> {
        Ok(self.snapshots.list(company_id)?)
    }
}

/// Purchases: the snapshot is submitted when the purchase is recorded.
pub struct PurchaseService<S, D> {
    dispatcher: CommandDispatcher<S>,
    snapshots: D,
}

impl<S, D> PurchaseService<S, D>
where
    S: EventStore,
    D: DocumentStore<PurchaseId, PurchaseSnapshot>,
{
    pub fn new(journal: S, snapshots: D) -> Self {
        Self {
            dispatcher: CommandDispatcher::new(journal),
            snapshots,
        }
    }

    pub fn execute(&self, command: PurchaseCommand) -> Result<Purchase, ServiceError> {
        let (company_id, purchase_id) = purchase_target(&command);
        let recording = matches!(command, PurchaseCommand::RecordPurchase(_));
        let (purchase, committed) = self.dispatcher.dispatch(
            company_id,
            purchase_id.0,
            PURCHASE_KIND,
            command,
            |_, id| Purchase::empty(PurchaseId::new(id)),
        )?;

        if committed.is_empty() {
            return Ok(purchase);
        }
        if let Some(snapshot) = purchase.snapshot() {
            if recording {
                self.snapshots.submit(company_id, purchase_id, snapshot)?;
                tracing::info!(%company_id, %purchase_id, "purchase snapshot submitted");
            } else {
                self.snapshots.supersede(company_id, purchase_id, snapshot)?;
            }
        }
        Ok(purchase)
    }

    pub fn history(
        &self,
        company_id: CompanyId,
        purchase_id: PurchaseId,
    ) -> Result<Vec<EventEnvelope<PurchaseEvent>>, ServiceError> {
        Ok(self.dispatcher.history(company_id, purchase_id.0)?)
    }

    pub fn recorded(&self, company_id: CompanyId) -> Result<Vec<PurchaseSnapshot>, ServiceError> {
        Ok(self.snapshots.list(company_id)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::{NaiveDate, Utc};
    use kwanza_billing::{DocumentLine, LineKind, PurchaseLine};
    use kwanza_core::{AggregateId, DomainError, Money, Rate};
    use kwanza_invoicing::{
        CancelInvoice, CertifyInvoice, DraftInvoice, InvoiceContent, InvoiceStatus, InvoiceType,
        ReviseInvoice,
    };
    use kwanza_purchasing::{
        CancelPurchase, PurchaseContent, PurchaseStatus, PurchaseType, RecordPurchase,
    };
    use rust_decimal_macros::dec;

    use crate::document_store::InMemoryDocumentStore;
    use crate::journal::InMemoryEventStore;

    type Invoices =
        InvoiceService<Arc<InMemoryEventStore>, Arc<InMemoryDocumentStore<InvoiceId, InvoiceSnapshot>>>;

    fn invoices() -> Invoices {
        InvoiceService::new(
            Arc::new(InMemoryEventStore::new()),
            Arc::new(InMemoryDocumentStore::new()),
            DocumentAggregator::default(),
        )
    }

    fn content() -> InvoiceContent {
        InvoiceContent::new(
            InvoiceType::Invoice,
            "FT2024",
            "client-1",
            "Cliente",
            NaiveDate::from_ymd_opt(2024, 9, 1).unwrap(),
            vec![DocumentLine::new(
                1,
                dec!(3),
                Money::from(100),
                Rate::ZERO,
                Rate::percent(dec!(14)),
                LineKind::Product,
            )],
        )
    }

    fn draft_and_certify(service: &Invoices, company_id: CompanyId, invoice_id: InvoiceId) {
        service
            .execute(InvoiceCommand::DraftInvoice(DraftInvoice {
                company_id,
                invoice_id,
                content: content(),
                occurred_at: Utc::now(),
            }))
            .unwrap();
        service
            .execute(InvoiceCommand::CertifyInvoice(CertifyInvoice {
                company_id,
                invoice_id,
                number: "FT FT2024/1".into(),
                occurred_at: Utc::now(),
            }))
            .unwrap();
    }

    #[test]
    fn certification_submits_snapshot_once() {
        let service = invoices();
        let company_id = CompanyId::new();
        let invoice_id = InvoiceId::new(AggregateId::new());
        draft_and_certify(&service, company_id, invoice_id);

        let stored = service.certified(company_id).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].totals.total, Money::from(342));
        assert!(service.certified(CompanyId::new()).unwrap().is_empty());

        let err = service
            .execute(InvoiceCommand::ReviseInvoice(ReviseInvoice {
                company_id,
                invoice_id,
                content: content(),
                occurred_at: Utc::now(),
            }))
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Dispatch(DispatchError::Domain(DomainError::Conflict(_)))
        ));
    }

    #[test]
    fn cancellation_supersedes_stored_snapshot() {
        let service = invoices();
        let company_id = CompanyId::new();
        let invoice_id = InvoiceId::new(AggregateId::new());
        draft_and_certify(&service, company_id, invoice_id);

        service
            .execute(InvoiceCommand::CancelInvoice(CancelInvoice {
                company_id,
                invoice_id,
                reason: "cliente desistiu".into(),
                occurred_at: Utc::now(),
            }))
            .unwrap();

        let stored = service.certified(company_id).unwrap();
        assert_eq!(stored[0].status, InvoiceStatus::Cancelled);

        let reloaded = service.load(company_id, invoice_id).unwrap();
        assert_eq!(reloaded.status(), InvoiceStatus::Cancelled);
        assert_eq!(kwanza_core::AggregateRoot::version(&reloaded), 3);

        let history = service.history(company_id, invoice_id).unwrap();
        assert_eq!(
            history.iter().map(|e| e.sequence_number()).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert!(history.iter().all(|e| e.document_kind() == INVOICE_KIND));
        assert!(matches!(
            history[2].payload(),
            kwanza_invoicing::InvoiceEvent::InvoiceCancelled(_)
        ));
        assert!(service.history(CompanyId::new(), invoice_id).unwrap().is_empty());
    }

    #[test]
    fn drafts_are_not_stored() {
        let service = invoices();
        let company_id = CompanyId::new();
        service
            .execute(InvoiceCommand::DraftInvoice(DraftInvoice {
                company_id,
                invoice_id: InvoiceId::new(AggregateId::new()),
                content: content(),
                occurred_at: Utc::now(),
            }))
            .unwrap();
        assert!(service.certified(company_id).unwrap().is_empty());
    }

    #[test]
    fn purchases_are_stored_on_record_and_superseded_on_cancel() {
        let service = PurchaseService::new(
            InMemoryEventStore::new(),
            InMemoryDocumentStore::<PurchaseId, PurchaseSnapshot>::new(),
        );
        let company_id = CompanyId::new();
        let purchase_id = PurchaseId::new(AggregateId::new());
        let content = PurchaseContent::new(
            PurchaseType::Invoice,
            "sup",
            "Fornecedor",
            "A/1",
            NaiveDate::from_ymd_opt(2024, 9, 2).unwrap(),
            vec![PurchaseLine::new(1, dec!(1), Money::from(1000), Rate::ZERO)],
        );

        service
            .execute(PurchaseCommand::RecordPurchase(RecordPurchase {
                company_id,
                purchase_id,
                content,
                occurred_at: Utc::now(),
            }))
            .unwrap();
        assert_eq!(service.recorded(company_id).unwrap()[0].totals.total, Money::from(1140));

        service
            .execute(PurchaseCommand::CancelPurchase(CancelPurchase {
                company_id,
                purchase_id,
                reason: "lançado em duplicado".into(),
                occurred_at: Utc::now(),
            }))
            .unwrap();
        assert_eq!(
            service.recorded(company_id).unwrap()[0].status,
            PurchaseStatus::Cancelled
        );
    }
}
