//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are immutable and compared by their attributes. `Money`
/// and `Rate` are the canonical examples in this workspace: two amounts of
/// `1625.00` are the same amount regardless of which invoice produced them.
///
/// ```ignore
/// let a = Money::new(dec!(100));
/// let b = Money::new(dec!(100.00));
/// assert_eq!(a, b);
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
