//! # pulse_ecs
//!
//! The data layer of the pulse engine — defines what a component is, how
//! entities own components, and how entity populations are filtered by
//! component composition.
//!
//! This crate provides:
//!
//! - [`Component`] — the contract all entity data satisfies (any plain
//!   `'static` data record qualifies).
//! - [`ComponentTypeId`] — runtime component type identity with a readable
//!   name for diagnostics.
//! - [`Entity`] — an identity owning disjoint enabled/disabled component sets.
//! - [`RaritySorter`] — live-population counters used to order filter
//!   evaluation for cheap early rejection.
//! - [`EntityRegistry`] — the id-to-entity map with active/inactive
//!   partitioning and filtered views.
//! - [`ComponentFilter`] / [`compile_filter`] — include/exclude predicates
//!   over component composition.
//! - [`Filtered`] — a filtered view with sync, sequential-async, and
//!   parallel-async iteration.

pub mod component;
pub mod entity;
pub mod error;
pub mod filter;
pub mod filtered;
pub mod rarity;
pub mod registry;

pub use component::{Component, ComponentTypeId};
pub use entity::{Entity, EntityId};
pub use error::EcsError;
pub use filter::{ComponentFilter, compile_filter};
pub use filtered::Filtered;
pub use rarity::RaritySorter;
pub use registry::{EntityRef, EntityRegistry};
