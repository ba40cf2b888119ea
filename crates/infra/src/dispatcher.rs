//! Command execution pipeline for document aggregates.
//!
//! ```text
//! command
//!   -> load stream (company-scoped)
//!   -> rehydrate aggregate
//!   -> handle (pure decision)
//!   -> append with optimistic concurrency
//! ```

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use uuid::Uuid;

use kwanza_core::{Aggregate, AggregateId, CompanyId, DomainError, ExpectedVersion};
use kwanza_events::EventEnvelope;

use crate::journal::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("concurrency conflict: {0}")]
    Concurrency(String),

    #[error("company isolation violation: {0}")]
    CompanyIsolation(String),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("failed to deserialize journaled event: {0}")]
    Deserialize(String),

    #[error(transparent)]
    Store(EventStoreError),
}

impl From<EventStoreError> for DispatchError {
    fn from(value: EventStoreError) -> Self {
        match value {
            EventStoreError::Concurrency(msg) => DispatchError::Concurrency(msg),
            EventStoreError::CompanyIsolation(msg) => DispatchError::CompanyIsolation(msg),
            other => DispatchError::Store(other),
        }
    }
}

/// Runs commands against journaled aggregates.
#[derive(Debug)]
pub struct CommandDispatcher<S> {
    store: S,
}

impl<S> CommandDispatcher<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn into_inner(self) -> S {
        self.store
    }
}

impl<S> CommandDispatcher<S>
where
    S: EventStore,
{
    /// Rebuild an aggregate from its stream.
    pub fn load<A>(
        &self,
        company_id: CompanyId,
        document_id: AggregateId,
        make_aggregate: impl FnOnce(CompanyId, AggregateId) -> A,
    ) -> Result<A, DispatchError>
    where
        A: Aggregate,
        A::Event: DeserializeOwned,
    {
        let history = self.store.load_stream(company_id, document_id)?;
        validate_loaded_stream(company_id, document_id, &history)?;
        let mut aggregate = make_aggregate(company_id, document_id);
        apply_history(&mut aggregate, &history)?;
        Ok(aggregate)
    }

    /// The document's journaled events, decoded, in stream order.
    pub fn history<E>(
        &self,
        company_id: CompanyId,
        document_id: AggregateId,
    ) -> Result<Vec<EventEnvelope<E>>, DispatchError>
    where
        E: DeserializeOwned,
    {
        let stream = self.store.load_stream(company_id, document_id)?;
        validate_loaded_stream(company_id, document_id, &stream)?;
        stream
            .into_iter()
            .map(|stored| {
                let payload: E = serde_json::from_value(stored.payload)
                    .map_err(|e| DispatchError::Deserialize(e.to_string()))?;
                Ok(EventEnvelope::new(
                    stored.event_id,
                    stored.company_id,
                    stored.document_id,
                    stored.document_kind,
                    stored.sequence_number,
                    payload,
                ))
            })
            .collect()
    }

    /// Execute `command` and return the rehydrated aggregate with the new events applied.
    pub fn dispatch<A>(
        &self,
        company_id: CompanyId,
        document_id: AggregateId,
        document_kind: &str,
        command: A::Command,
        make_aggregate: impl FnOnce(CompanyId, AggregateId) -> A,
    ) -> Result<(A, Vec<StoredEvent>), DispatchError>
    where
        A: Aggregate<Error = DomainError>,
        A::Event: kwanza_events::Event + Serialize + DeserializeOwned,
    {
        let history = self.store.load_stream(company_id, document_id)?;
        validate_loaded_stream(company_id, document_id, &history)?;
        let expected = ExpectedVersion::Exact(stream_version(&history));

        let mut aggregate = make_aggregate(company_id, document_id);
        apply_history(&mut aggregate, &history)?;

        let decided = aggregate.handle(&command)?;
        if decided.is_empty() {
            return Ok((aggregate, vec![]));
        }

        let uncommitted = decided
            .iter()
            .map(|ev| {
                UncommittedEvent::from_typed(
                    company_id,
                    document_id,
                    document_kind,
                    Uuid::now_v7(),
                    ev,
                )
            })
            .collect::<Result<Vec<_>, _>>()?;

        let committed = self.store.append(uncommitted, expected)?;
        for ev in &decided {
            aggregate.apply(ev);
        }

        tracing::debug!(
            %company_id,
            %document_id,
            document_kind,
            events = committed.len(),
            "command dispatched"
        );

        Ok((aggregate, committed))
    }
}

fn stream_version(stream: &[StoredEvent]) -> u64 {
    stream.last().map(|e| e.sequence_number).unwrap_or(0)
}

fn validate_loaded_stream(
    company_id: CompanyId,
    document_id: AggregateId,
    stream: &[StoredEvent],
) -> Result<(), DispatchError> {
    let mut last = 0u64;
    for (idx, e) in stream.iter().enumerate() {
        if e.company_id != company_id {
            return Err(DispatchError::CompanyIsolation(format!(
                "loaded stream contains wrong company_id at index {idx}"
            )));
        }
        if e.document_id != document_id {
            return Err(DispatchError::CompanyIsolation(format!(
                "loaded stream contains wrong document_id at index {idx}"
            )));
        }
        if e.sequence_number <= last {
            return Err(DispatchError::Store(EventStoreError::InvalidAppend(format!(
                "non-monotonic sequence_number in loaded stream (last={last}, found={})",
                e.sequence_number
            ))));
        }
        last = e.sequence_number;
    }
    Ok(())
}

fn apply_history<A>(aggregate: &mut A, history: &[StoredEvent]) -> Result<(), DispatchError>
where
    A: Aggregate,
    A::Event: DeserializeOwned,
{
    for stored in history {
        let ev: A::Event = serde_json::from_value(stored.payload.clone())
            .map_err(|e| DispatchError::Deserialize(e.to_string()))?;
        aggregate.apply(&ev);
    }
    Ok(())
}
