//! Domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives shared by the billing crates:
//! identifiers, the domain error model, aggregate traits and the decimal money
//! value objects. No IO lives here.

pub mod aggregate;
pub mod error;
pub mod id;
pub mod money;
pub mod value_object;

pub use aggregate::{Aggregate, AggregateRoot, ExpectedVersion};
pub use error::{DomainError, DomainResult};
pub use id::{AggregateId, CompanyId};
pub use money::{Money, Rate};
pub use value_object::ValueObject;
