#![forbid(unsafe_code)]

//! FrankenDOM reactive core.
//!
//! Observable cells, derived cells, and the scheduler that keeps a
//! dependency graph consistent with at most one recomputation per node per
//! change:
//!
//! - [`Observable`]: a value cell emitting `(new, old)` on change.
//! - [`Computed`] / [`PureComputed`]: derived cells with static and
//!   dynamically discovered dependencies; the pure variant suspends itself
//!   while unobserved.
//! - [`Subscription`]: the multi-source side-effect engine the computeds
//!   are built on.
//! - [`bundle_changes`] / [`BundleScope`]: coalesce a burst of mutations
//!   into a single scheduler drain.
//! - [`ObsArray`] / [`ComputedArray`] / [`LiveIndex`]: sequences with
//!   localized change descriptors and incrementally-maintained consumers.
//! - [`BindableValue`] / [`bind`]: the adapter that lets a constant, a
//!   cell, or a reader closure drive the same binding.
//!
//! # Architecture
//!
//! Mutating a cell emits synchronously to its listeners. Listeners that
//! stand in for derived cells do not recompute in place; they queue their
//! [`DepItem`] on a thread-local priority queue, and the drain that runs
//! after the outermost mutation (or bundle) recomputes each queued node
//! once, in dependency order. Priorities are a conservative longest-path
//! bound maintained incrementally — no explicit dependency DAG exists.
//!
//! All state is single-threaded (`Rc`/`RefCell`/`Cell`); the crate has no
//! locks and no async.

pub mod binding;
pub mod computed;
pub mod computed_array;
pub mod emit;
pub mod live_index;
pub mod obs_array;
pub mod observable;
pub mod pure_computed;
pub mod queue;
pub mod schedule;
pub mod source;
pub mod subscription;

pub use fdom_dispose::{Disposable, Disposer, Holder, MultiHolder, Owner, Scoped};

pub use binding::{BindableValue, BindingHandle, ReactiveRead, bind};
pub use computed::Computed;
pub use computed_array::ComputedArray;
pub use emit::{Emitter, Listener, ListenerEntry};
pub use live_index::LiveIndex;
pub use obs_array::{ArrayListener, ObsArray, Splice};
pub use observable::{ChangeListener, Observable};
pub use pure_computed::PureComputed;
pub use queue::PriorityQueue;
pub use schedule::{BundleScope, DepItem, bundle_changes, compute, is_bundling};
pub use source::Source;
pub use subscription::{Subscription, UseCx};
