//! Domain events emitted by billing documents and the envelope used to journal them.

pub mod envelope;
pub mod event;

pub use envelope::EventEnvelope;
pub use event::Event;
