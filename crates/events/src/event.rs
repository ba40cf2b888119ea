use chrono::{DateTime, Utc};

/// A document event.
///
/// Events are immutable facts about an invoice or purchase (drafted,
/// certified, cancelled, ...). They carry their own schema version so the
/// journal can be replayed after the payload shape evolves.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable event name (e.g. "invoicing.invoice.certified").
    fn event_type(&self) -> &'static str;

    /// Schema version for this event type.
    fn version(&self) -> u32;

    /// When the event occurred (business time).
    fn occurred_at(&self) -> DateTime<Utc>;
}
