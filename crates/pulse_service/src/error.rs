//! Service-container error types.

/// Errors raised by container registration and resolution.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// No provider is registered for the token in the requested scope or the
    /// global scope. Fatal to the resolving call — there is no built-in
    /// retry or default.
    #[error("provider for token {token} not found in scope {scope} or global")]
    ProviderNotFound {
        /// The token description.
        token: &'static str,
        /// The scope the lookup started from.
        scope: String,
    },

    /// The memoized instance under this token is not the requested type.
    #[error("service under token {token} is not a {requested}")]
    TypeMismatch {
        /// The token description.
        token: &'static str,
        /// The type the caller asked for.
        requested: &'static str,
    },
}
