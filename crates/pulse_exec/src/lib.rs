//! # pulse_exec
//!
//! Signal-driven execution for the pulse engine.
//!
//! An external driver dispatches a [`Signal`] with a [`Payload`]. The
//! [`SignalController`] looks up the groups bound to that signal, filters
//! them through their gates, and hands the survivors to a fresh
//! [`Executor`], which flattens every group's sorted plan into one run-queue
//! and drains it sequentially — resolving each [`System`]'s dependencies
//! from the service container and awaiting each invocation before the next.
//!
//! Scheduling is cooperative and single-queue per dispatch: concurrency
//! exists only as interleaved suspension points (a paused drain loop, or a
//! system's own awaits), never as parallel system execution within one
//! queue.

pub mod controller;
pub mod executor;
pub mod group;
pub mod payload;
pub mod signal;
pub mod system;
pub mod tick;

pub use controller::{BindingConfig, ExecutionGate, ExecutionItem, SignalBinding, SignalController};
pub use executor::Executor;
pub use group::{GroupHandle, GroupOption, ORDER_STEP, SortedOption, SystemGate, SystemGroup};
pub use payload::Payload;
pub use signal::{Disposable, Signal};
pub use system::{SharedSystem, System, SystemCache, SystemContext, SystemRecipe};
pub use tick::UpdateTick;
