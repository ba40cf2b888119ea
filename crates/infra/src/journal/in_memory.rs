use std::collections::HashMap;
use std::sync::RwLock;

use kwanza_core::{AggregateId, CompanyId, ExpectedVersion};

use super::store::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
struct StreamKey {
    company_id: CompanyId,
    document_id: AggregateId,
}

/// In-memory journal for tests and the CLI.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    streams: RwLock<HashMap<StreamKey, Vec<StoredEvent>>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn current_version(stream: &[StoredEvent]) -> u64 {
        stream.last().map(|e| e.sequence_number).unwrap_or(0)
    }
}

impl EventStore for InMemoryEventStore {
    fn append(
        &self,
        events: Vec<UncommittedEvent>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        let Some(first) = events.first() else {
            return Ok(vec![]);
        };
        let key = StreamKey {
            company_id: first.company_id,
            document_id: first.document_id,
        };
        let document_kind = first.document_kind.clone();

        for (idx, e) in events.iter().enumerate() {
            if e.company_id != key.company_id {
                return Err(EventStoreError::CompanyIsolation(format!(
                    "batch mixes companies (index {idx})"
                )));
            }
            if e.document_id != key.document_id {
                return Err(EventStoreError::InvalidAppend(format!(
                    "batch mixes documents (index {idx})"
                )));
            }
            if e.document_kind != document_kind {
                return Err(EventStoreError::DocumentKindMismatch(format!(
                    "batch mixes document kinds (index {idx})"
                )));
            }
        }

        let mut streams = self
            .streams
            .write()
            .map_err(|_| EventStoreError::InvalidAppend("lock poisoned".to_string()))?;

        let stream = streams.entry(key).or_default();
        let current = Self::current_version(stream);

        if !expected_version.matches(current) {
            return Err(EventStoreError::Concurrency(format!(
                "expected {expected_version:?}, found {current}"
            )));
        }

        if let Some(existing) = stream.first() {
            if existing.document_kind != document_kind {
                return Err(EventStoreError::DocumentKindMismatch(format!(
                    "stream holds '{}', attempted append of '{}'",
                    existing.document_kind, document_kind
                )));
            }
        }

        let committed: Vec<StoredEvent> = events
            .into_iter()
            .zip(current + 1..)
            .map(|(e, sequence_number)| StoredEvent {
                event_id: e.event_id,
                company_id: e.company_id,
                document_id: e.document_id,
                document_kind: e.document_kind,
                sequence_number,
                event_type: e.event_type,
                event_version: e.event_version,
                occurred_at: e.occurred_at,
                payload: e.payload,
            })
            .collect();
        stream.extend(committed.iter().cloned());

        Ok(committed)
    }

    fn load_stream(
        &self,
        company_id: CompanyId,
        document_id: AggregateId,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        let streams = self
            .streams
            .read()
            .map_err(|_| EventStoreError::InvalidAppend("lock poisoned".to_string()))?;

        Ok(streams
            .get(&StreamKey {
                company_id,
                document_id,
            })
            .cloned()
            .unwrap_or_default())
    }
}
