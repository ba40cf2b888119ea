//! Purchasing domain module (supplier documents, event-sourced).
//!
//! Business rules for recording supplier purchases, implemented purely as
//! deterministic domain logic (no IO, no storage).

pub mod purchase;

pub use purchase::{
    CancelPurchase, MarkPurchasePaid, Purchase, PurchaseCancelled, PurchaseCommand,
    PurchaseContent, PurchaseEvent, PurchaseId, PurchasePaid, PurchaseRecorded, PurchaseSnapshot,
    PurchaseStatus, PurchaseType, RecordPurchase,
};
