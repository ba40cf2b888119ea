//! Invoicing domain module (event-sourced).
//!
//! Sales documents from draft to certification and cancellation,
//! implemented purely as deterministic domain logic (no IO, no storage).

pub mod document;
pub mod invoice;
pub mod snapshot;

pub use document::{
    DocumentSource, FINAL_CONSUMER_ID, FINAL_CONSUMER_NAME, FINAL_CONSUMER_NIF, InvoiceContent,
    InvoiceStatus, InvoiceType, PaymentMethod,
};
pub use invoice::{
    CancelInvoice, CertifyInvoice, DraftInvoice, Invoice, InvoiceCancelled, InvoiceCertified,
    InvoiceCommand, InvoiceDrafted, InvoiceEvent, InvoiceId, InvoiceRevised, PaymentRegistered,
    RegisterPayment, ReviseInvoice,
};
pub use snapshot::InvoiceSnapshot;
