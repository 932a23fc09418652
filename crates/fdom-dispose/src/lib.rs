#![forbid(unsafe_code)]

//! Ownership and ordered-teardown primitives for FrankenDOM.
//!
//! Reactive bindings create long-lived resources (listeners, subscriptions,
//! live DOM regions) whose lifetime is not tied to a stack frame. This crate
//! provides the discipline that makes tearing them down total and ordered:
//!
//! - [`Disposable`]: the explicit-release trait. `dispose()` is idempotent
//!   for every implementor in this workspace.
//! - [`Owner`]: an ordered disposal list. Disposing an owner releases every
//!   registered resource in reverse registration order.
//! - [`Scoped`]: constructor-safe creation — either the caller receives a
//!   fully constructed value whose lifetime is tied to a parent owner, or
//!   nothing registered during construction leaks.
//! - [`Holder`] / [`MultiHolder`]: single-slot and multi-slot owners that
//!   replace-and-dispose on assignment.
//!
//! # Invariants
//!
//! 1. Disposal entries run in reverse insertion order, each at most once.
//! 2. An owner is marked disposed *before* its entries run, so re-entrant
//!    `dispose` calls are no-ops.
//! 3. A panicking disposer is caught and logged; remaining disposers still
//!    run. Partial teardown is never an outcome.

pub mod disposable;
pub mod holder;

pub use disposable::{Disposable, Disposer, Owner, Scoped};
pub use holder::{Holder, MultiHolder};
