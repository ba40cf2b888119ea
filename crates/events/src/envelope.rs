use serde::{Deserialize, Serialize};
use uuid::Uuid;

use kwanza_core::{AggregateId, CompanyId};

/// Company-scoped envelope around a journaled document event.
///
/// `sequence_number` is the position inside one document's stream and is
/// assigned by the journal at append time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope<E> {
    event_id: Uuid,
    company_id: CompanyId,

    document_id: AggregateId,
    document_kind: String,

    sequence_number: u64,

    payload: E,
}

impl<E> EventEnvelope<E> {
    pub fn new(
        event_id: Uuid,
        company_id: CompanyId,
        document_id: AggregateId,
        document_kind: impl Into<String>,
        sequence_number: u64,
        payload: E,
    ) -> Self {
        Self {
            event_id,
            company_id,
            document_id,
            document_kind: document_kind.into(),
            sequence_number,
            payload,
        }
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn company_id(&self) -> CompanyId {
        self.company_id
    }

    pub fn document_id(&self) -> AggregateId {
        self.document_id
    }

    /// Stream kind, e.g. `invoicing.invoice`.
    pub fn document_kind(&self) -> &str {
        &self.document_kind
    }

    pub fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    pub fn payload(&self) -> &E {
        &self.payload
    }

    pub fn into_payload(self) -> E {
        self.payload
    }
}
