//! The scoped service container.
//!
//! Two-level resolution: a lookup starts in the requested scope and falls
//! back to the global scope. Instances are memoized per *(requested scope,
//! token)* pair — two group scopes resolving the same global token therefore
//! hold distinct instances, which is what per-group provider overrides rely
//! on.
//!
//! The container also keeps the field-injection declaration table: for each
//! system type, which (token, field) pairs were declared for injection. The
//! executor walks this table when a system becomes active in a group and
//! assigns each declared field a handle resolved from the group's scope.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::error::ServiceError;
use crate::handle::{ServiceCell, ServiceHandle};
use crate::provider::Provider;
use crate::token::{ScopeId, Token};

/// One field-injection declaration: system type, provider token, field name.
///
/// Declarations are made once per field per system type, not per instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InjectionDecl {
    /// The declaring system's type identity.
    pub system_type: TypeId,
    /// The provider token to resolve.
    pub token: Token,
    /// The field the resolved handle is assigned to.
    pub field: &'static str,
}

/// Scoped provider/instance registry with memoized singleton resolution.
///
/// One container is constructed per engine and shared by `Arc`; there is no
/// hidden global instance.
///
/// # Examples
///
/// ```rust
/// use pulse_service::{Provider, ScopeId, ServiceContainer, Token};
///
/// #[derive(Default)]
/// struct Clock { ticks: u64 }
///
/// let container = ServiceContainer::new();
/// container.register_global(vec![Provider::of::<Clock>()]);
///
/// let first = container.get(Token::of::<Clock>(), ScopeId::Global).unwrap();
/// let second = container.get(Token::of::<Clock>(), ScopeId::Global).unwrap();
/// assert!(first.same_instance(&second));
/// ```
#[derive(Debug, Default)]
pub struct ServiceContainer {
    providers: RwLock<HashMap<ScopeId, HashMap<Token, Provider>>>,
    instances: RwLock<HashMap<ScopeId, HashMap<Token, ServiceCell>>>,
    declarations: RwLock<Vec<InjectionDecl>>,
}

impl ServiceContainer {
    /// Create an empty container with the global scope present.
    #[must_use]
    pub fn new() -> Self {
        let container = Self::default();
        container.providers.write().insert(ScopeId::Global, HashMap::new());
        container.instances.write().insert(ScopeId::Global, HashMap::new());
        container
    }

    /// Create an empty container behind an [`Arc`] for sharing.
    #[must_use]
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Register providers under a scope, creating the scope on first use.
    ///
    /// Entries merge by token: a later registration for the same token in
    /// the same scope wins. Already-memoized instances are not invalidated.
    pub fn register_module(&self, scope: ScopeId, providers: Vec<Provider>) {
        {
            let mut all = self.providers.write();
            let scoped = all.entry(scope).or_default();
            for provider in providers {
                scoped.insert(provider.token(), provider);
            }
        }
        self.instances.write().entry(scope).or_default();
    }

    /// Register providers into the global scope.
    pub fn register_global(&self, providers: Vec<Provider>) {
        self.register_module(ScopeId::Global, providers);
    }

    /// Resolve a token from a scope, falling back to the global scope.
    ///
    /// The first resolution for a (scope, token) pair instantiates via the
    /// provider's recipe and memoizes; later calls return a handle to the
    /// identical instance.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::ProviderNotFound`] if the token is registered
    /// in neither the requested scope nor the global scope.
    pub fn get(&self, token: Token, scope: ScopeId) -> Result<ServiceHandle, ServiceError> {
        let provider = {
            let providers = self.providers.read();
            providers
                .get(&scope)
                .and_then(|scoped| scoped.get(&token))
                .or_else(|| {
                    providers
                        .get(&ScopeId::Global)
                        .and_then(|global| global.get(&token))
                })
                .ok_or_else(|| ServiceError::ProviderNotFound {
                    token: token.describe(),
                    scope: scope.to_string(),
                })?
                .clone()
        };
        let immutable = provider.is_immutable();

        if let Some(cell) = self
            .instances
            .read()
            .get(&scope)
            .and_then(|scoped| scoped.get(&token))
        {
            return Ok(ServiceHandle::new(Arc::clone(cell), token, immutable));
        }

        // Instantiate outside the registry locks so a factory may itself
        // resolve other services.
        let instance = provider.instantiate();

        let mut instances = self.instances.write();
        let scoped = instances.entry(scope).or_default();
        let cell = scoped
            .entry(token)
            .or_insert_with(|| Arc::new(parking_lot::RwLock::new(instance)));
        Ok(ServiceHandle::new(Arc::clone(cell), token, immutable))
    }

    /// Record a field-injection declaration for a system type.
    ///
    /// Called once per field at system-definition time. Duplicate
    /// declarations are ignored.
    pub fn declare_injection(&self, system_type: TypeId, token: Token, field: &'static str) {
        let decl = InjectionDecl {
            system_type,
            token,
            field,
        };
        let mut declarations = self.declarations.write();
        if !declarations.contains(&decl) {
            declarations.push(decl);
        }
    }

    /// Resolve every declared injection matching one of the given type
    /// identities, from `scope` with global fallback.
    ///
    /// `memberships` is the system's concrete type id plus any extra
    /// identities it claims — the membership-based rendition of matching
    /// declarations across a subtype chain. Declarations whose token has no
    /// provider anywhere are skipped (with a debug log), not failed: a
    /// declared-but-unregistered dependency simply stays unassigned.
    #[must_use]
    pub fn injections_for(
        &self,
        scope: ScopeId,
        memberships: &[TypeId],
    ) -> Vec<(&'static str, ServiceHandle)> {
        let declarations: Vec<InjectionDecl> = self
            .declarations
            .read()
            .iter()
            .filter(|decl| memberships.contains(&decl.system_type))
            .copied()
            .collect();

        let mut resolved = Vec::with_capacity(declarations.len());
        for decl in declarations {
            match self.get(decl.token, scope) {
                Ok(handle) => resolved.push((decl.field, handle)),
                Err(ServiceError::ProviderNotFound { .. }) => {
                    debug!(
                        token = decl.token.describe(),
                        field = decl.field,
                        scope = %scope,
                        "skipping injection with no registered provider"
                    );
                }
                Err(other) => {
                    debug!(error = %other, "skipping unresolvable injection");
                }
            }
        }
        resolved
    }

    /// The number of recorded injection declarations.
    #[must_use]
    pub fn declaration_count(&self) -> usize {
        self.declarations.read().len()
    }
}
