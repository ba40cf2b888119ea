//! Infrastructure layer: event journal, command dispatch and the snapshot
//! store for certified documents. In-memory backends only.

pub mod dispatcher;
pub mod document_store;
pub mod journal;
pub mod service;

pub use dispatcher::{CommandDispatcher, DispatchError};
pub use document_store::{DocumentStore, InMemoryDocumentStore, StoreError};
pub use journal::{EventStore, EventStoreError, InMemoryEventStore, StoredEvent, UncommittedEvent};
pub use service::{InvoiceService, PurchaseService, ServiceError};
