//! Shared handles to resolved service instances.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::warn;

use crate::error::ServiceError;
use crate::provider::ServiceObject;
use crate::token::Token;

/// The memoized cell a resolved instance lives in. Every handle for one
/// (scope, token) pair shares the same cell.
pub(crate) type ServiceCell = Arc<RwLock<ServiceObject>>;

/// A shared handle to a resolved service instance.
///
/// Access goes through short closures rather than guards, so callers cannot
/// hold a lock across an await point. Reads are always allowed. Writes
/// through a handle resolved from an immutable provider are *reported* (a
/// warning, not an error) and dropped — best-effort guard rails, not a deep
/// immutability guarantee.
#[derive(Clone)]
pub struct ServiceHandle {
    cell: ServiceCell,
    token: Token,
    immutable: bool,
}

impl ServiceHandle {
    pub(crate) fn new(cell: ServiceCell, token: Token, immutable: bool) -> Self {
        Self {
            cell,
            token,
            immutable,
        }
    }

    /// The token this handle was resolved under.
    #[must_use]
    pub fn token(&self) -> Token {
        self.token
    }

    /// Whether writes through this handle are rejected.
    #[must_use]
    pub fn is_immutable(&self) -> bool {
        self.immutable
    }

    /// Whether two handles point at the same memoized instance.
    #[must_use]
    pub fn same_instance(&self, other: &ServiceHandle) -> bool {
        Arc::ptr_eq(&self.cell, &other.cell)
    }

    /// Borrow the instance as `T` for the duration of `f`.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::TypeMismatch`] if the instance is not a `T`.
    pub fn read<T: 'static, R>(&self, f: impl FnOnce(&T) -> R) -> Result<R, ServiceError> {
        let guard = self.cell.read();
        let value = guard
            .downcast_ref::<T>()
            .ok_or(ServiceError::TypeMismatch {
                token: self.token.describe(),
                requested: std::any::type_name::<T>(),
            })?;
        Ok(f(value))
    }

    /// Mutably borrow the instance as `T` for the duration of `f`.
    ///
    /// On an immutable handle the mutation attempt is reported via
    /// `tracing::warn!` and silently dropped; `Ok(None)` is returned and `f`
    /// never runs.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::TypeMismatch`] if the instance is not a `T`.
    pub fn write<T: 'static, R>(
        &self,
        f: impl FnOnce(&mut T) -> R,
    ) -> Result<Option<R>, ServiceError> {
        if self.immutable {
            warn!(
                token = self.token.describe(),
                "mutation of an immutable service was rejected; the write was dropped"
            );
            return Ok(None);
        }

        let mut guard = self.cell.write();
        let value = guard
            .downcast_mut::<T>()
            .ok_or(ServiceError::TypeMismatch {
                token: self.token.describe(),
                requested: std::any::type_name::<T>(),
            })?;
        Ok(Some(f(value)))
    }
}

impl std::fmt::Debug for ServiceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceHandle")
            .field("token", &self.token)
            .field("immutable", &self.immutable)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter {
        value: i32,
    }

    fn make_handle(value: i32, immutable: bool) -> ServiceHandle {
        let cell: ServiceCell = Arc::new(RwLock::new(Box::new(Counter { value })));
        ServiceHandle::new(cell, Token::named("counter"), immutable)
    }

    #[test]
    fn test_read_and_write() {
        let handle = make_handle(1, false);

        let observed = handle.read(|c: &Counter| c.value).unwrap();
        assert_eq!(observed, 1);

        let written = handle.write(|c: &mut Counter| {
            c.value = 5;
            c.value
        });
        assert_eq!(written.unwrap(), Some(5));
        assert_eq!(handle.read(|c: &Counter| c.value).unwrap(), 5);
    }

    #[test]
    fn test_immutable_write_is_dropped() {
        let handle = make_handle(1, true);

        let written = handle.write(|c: &mut Counter| c.value = 99).unwrap();
        assert!(written.is_none());
        // Value unchanged; reads still work.
        assert_eq!(handle.read(|c: &Counter| c.value).unwrap(), 1);
    }

    #[test]
    fn test_type_mismatch() {
        let handle = make_handle(1, false);
        let err = handle.read(|s: &String| s.len()).unwrap_err();
        assert!(matches!(err, ServiceError::TypeMismatch { .. }));
    }

    #[test]
    fn test_same_instance_tracks_cell_identity() {
        let a = make_handle(1, false);
        let b = a.clone();
        let c = make_handle(1, false);
        assert!(a.same_instance(&b));
        assert!(!a.same_instance(&c));
    }
}
