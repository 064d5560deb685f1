//! Type-erased payloads.
//!
//! Signals carry arbitrary data and group options carry arbitrary static
//! call data; both travel as a [`Payload`] — a cheap-to-clone, type-erased
//! carrier the receiving side downcasts back to a concrete type.

use std::any::Any;
use std::sync::Arc;

/// A shared, type-erased value attached to a dispatch or a system call.
///
/// Cloning a payload clones the handle, not the value.
#[derive(Clone, Default)]
pub struct Payload(Option<Arc<dyn Any + Send + Sync>>);

impl Payload {
    /// Wrap a value.
    #[must_use]
    pub fn new<T: Send + Sync + 'static>(value: T) -> Self {
        Self(Some(Arc::new(value)))
    }

    /// The empty payload, for dispatches and systems that carry no data.
    #[must_use]
    pub fn none() -> Self {
        Self(None)
    }

    /// Whether the payload carries no value.
    #[must_use]
    pub fn is_none(&self) -> bool {
        self.0.is_none()
    }

    /// Borrow the carried value as `T`, if the payload holds one of that
    /// type.
    #[must_use]
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.0.as_ref().and_then(|value| value.downcast_ref::<T>())
    }
}

impl std::fmt::Debug for Payload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.0 {
            Some(_) => f.write_str("Payload(..)"),
            None => f.write_str("Payload(none)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_downcast_round_trip() {
        let payload = Payload::new(42u32);
        assert_eq!(payload.downcast_ref::<u32>(), Some(&42));
        assert!(payload.downcast_ref::<String>().is_none());
    }

    #[test]
    fn test_none_payload() {
        let payload = Payload::none();
        assert!(payload.is_none());
        assert!(payload.downcast_ref::<u32>().is_none());
    }

    #[test]
    fn test_clone_shares_the_value() {
        let payload = Payload::new(String::from("tick"));
        let clone = payload.clone();
        assert_eq!(clone.downcast_ref::<String>().map(String::as_str), Some("tick"));
    }
}
