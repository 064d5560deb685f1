//! Data-layer error types.

use crate::entity::EntityId;

/// Errors raised by entity and registry operations.
///
/// All variants carry identifying context (entity name and id, component
/// type name) so a failure can be traced without a debugger.
#[derive(Debug, thiserror::Error)]
pub enum EcsError {
    /// An entity with the same id is already registered.
    #[error("entity [{name}-{id}] already exists in the registry")]
    DuplicateEntity {
        /// Display name of the offending entity.
        name: String,
        /// The duplicated identity.
        id: EntityId,
    },

    /// A component of this type already exists on the entity, enabled or
    /// disabled.
    #[error("component {component} already exists in entity [{entity_name}-{entity_id}]")]
    DuplicateComponent {
        /// Component type name.
        component: &'static str,
        /// Owning entity display name.
        entity_name: String,
        /// Owning entity id.
        entity_id: EntityId,
    },

    /// The requested component is not in the entity's enabled set.
    #[error("component {component} is not found in entity [{entity_name}-{entity_id}]")]
    ComponentNotFound {
        /// Component type name.
        component: &'static str,
        /// Owning entity display name.
        entity_name: String,
        /// Owning entity id.
        entity_id: EntityId,
    },

    /// The component exists in neither the enabled nor the disabled set.
    #[error("component {component} does not exist in entity [{entity_name}-{entity_id}]")]
    ComponentMissing {
        /// Component type name.
        component: &'static str,
        /// Owning entity display name.
        entity_name: String,
        /// Owning entity id.
        entity_id: EntityId,
    },

    /// Attempted to enable a component that is not currently disabled.
    #[error(
        "cannot enable component {component} in entity [{entity_name}-{entity_id}] - \
         it does not exist or is already enabled"
    )]
    AlreadyEnabled {
        /// Component type name.
        component: &'static str,
        /// Owning entity display name.
        entity_name: String,
        /// Owning entity id.
        entity_id: EntityId,
    },

    /// Attempted to disable a component that is not currently enabled.
    #[error(
        "cannot disable component {component} in entity [{entity_name}-{entity_id}] - \
         it does not exist or is already disabled"
    )]
    AlreadyDisabled {
        /// Component type name.
        component: &'static str,
        /// Owning entity display name.
        entity_name: String,
        /// Owning entity id.
        entity_id: EntityId,
    },
}
