#![forbid(unsafe_code)]

//! The uniform dependency surface implemented by every reactive cell kind.

use fdom_dispose::Disposable;

use crate::schedule::DepItem;

/// Something a subscription can depend on: readable, subscribable for
/// scheduling, and identifiable.
///
/// Implementors are cheap-clone handles; `Clone` here clones the handle,
/// never the value.
pub trait Source: Clone + 'static {
    type Value: Clone + 'static;

    /// Read the current value without registering a dependency.
    fn fetch(&self) -> Self::Value;

    /// Install a listener that queues `item` on every change. The returned
    /// handle detaches on dispose.
    ///
    /// For a lazily-activated cell this also activates it; the activation
    /// holds as long as the listener is attached, which is what keeps the
    /// [`source_dep`](Source::source_dep) captured alongside valid.
    fn listen_enqueue(&self, item: &DepItem) -> Box<dyn Disposable>;

    /// The scheduling record of this source, if it is itself derived.
    /// Leaf cells return `None` and count as priority 0.
    fn source_dep(&self) -> Option<DepItem>;

    /// Stable identity for dependency dedup, valid while any handle lives.
    fn source_key(&self) -> usize;
}
