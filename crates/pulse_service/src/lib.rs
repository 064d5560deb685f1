//! # pulse_service
//!
//! Scoped dependency container for the pulse engine.
//!
//! Providers are registered under a scope — the always-present global scope
//! or a per-group scope keyed by the group's uuid — and resolved lazily:
//! the first `get` for a (scope, token) pair instantiates and memoizes, every
//! later `get` returns the same shared instance. Group scopes shadow global
//! registrations for the same token.
//!
//! This crate provides:
//!
//! - [`Token`] — provider keys: a type identity or an opaque named symbol.
//! - [`ScopeId`] — resolution namespaces (global or per-group).
//! - [`Provider`] — class (`Default`) or zero-argument-factory recipes, with
//!   an optional immutability flag.
//! - [`ServiceHandle`] — a shared handle to a resolved instance; writes
//!   through an immutable handle are reported and dropped.
//! - [`ServiceContainer`] — registration, resolution, and the per-system
//!   field-injection declaration table.

pub mod container;
pub mod error;
pub mod handle;
pub mod provider;
pub mod token;

pub use container::{InjectionDecl, ServiceContainer};
pub use error::ServiceError;
pub use handle::ServiceHandle;
pub use provider::Provider;
pub use token::{ScopeId, Token};
