#![forbid(unsafe_code)]

//! The scheduling record ([`DepItem`]) and the thread-local drain loop.
//!
//! # Design
//!
//! Every derived reactive node carries a [`DepItem`]: a priority, an
//! enqueued latch, and the recompute callback. A leaf cell has no DepItem
//! and counts as priority 0. The priority of a node is a conservative upper
//! bound on its longest dependency path from any leaf, maintained
//! incrementally: it resets to 0 at the start of each evaluation and each
//! dependency read raises it to `dep_priority + 1`. Draining the queue in
//! min-priority order therefore recomputes dependencies before dependents
//! without any explicit dependency graph.
//!
//! The queue, the bundle depth and the seen list are thread-local
//! singletons, the same shape as the batch context in the reference
//! runtime. All reactive work is single-threaded and synchronous.
//!
//! # Invariants
//!
//! 1. A DepItem is in the queue at most once (the enqueued latch).
//! 2. Within one drain every node runs at most once; enqueued latches are
//!    cleared only after the drain, so a node that re-triggers itself
//!    cannot loop.
//! 3. `compute()` re-entered from inside a drain or a bundle is a no-op;
//!    the outermost scope finishes the work.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::queue::PriorityQueue;

type RecomputeFn = Rc<dyn Fn()>;

struct DepItemInner {
    priority: Cell<u32>,
    enqueued: Cell<bool>,
    /// Cleared on retire; a retired item still drains but does nothing.
    callback: RefCell<Option<RecomputeFn>>,
}

/// Scheduling record of one derived reactive node.
///
/// Cloning is a cheap handle clone; the queue and the owning subscription
/// share one record.
pub struct DepItem {
    inner: Rc<DepItemInner>,
}

impl DepItem {
    pub fn new(recompute: impl Fn() + 'static) -> Self {
        Self {
            inner: Rc::new(DepItemInner {
                priority: Cell::new(0),
                enqueued: Cell::new(false),
                callback: RefCell::new(Some(Rc::new(recompute))),
            }),
        }
    }

    #[must_use]
    pub fn priority(&self) -> u32 {
        self.inner.priority.get()
    }

    /// Reset to leaf priority; called at the start of each evaluation.
    pub fn reset_priority(&self) {
        self.inner.priority.set(0);
    }

    /// Record a dependency read: raise this node's priority above the
    /// dependency's. `None` is a leaf (priority 0).
    pub fn use_dep(&self, dep: Option<&DepItem>) {
        let dep_priority = dep.map_or(0, DepItem::priority);
        if dep_priority >= self.inner.priority.get() {
            self.inner.priority.set(dep_priority + 1);
        }
    }

    /// Queue this node for recomputation in the next drain. Idempotent
    /// while already queued; a no-op after retire.
    pub fn enqueue(&self) {
        if self.inner.callback.borrow().is_none() {
            return;
        }
        if !self.inner.enqueued.replace(true) {
            QUEUE.with_borrow_mut(|q| q.push(self.clone()));
        }
    }

    #[must_use]
    pub fn is_enqueued(&self) -> bool {
        self.inner.enqueued.get()
    }

    /// Drop the recompute callback. Called on subscription teardown.
    pub fn retire(&self) {
        self.inner.callback.borrow_mut().take();
    }

    fn run(&self) {
        let cb = self.inner.callback.borrow().clone();
        if let Some(cb) = cb {
            cb();
        }
    }

    fn clear_enqueued(&self) {
        self.inner.enqueued.set(false);
    }
}

impl Clone for DepItem {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl std::fmt::Debug for DepItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DepItem")
            .field("priority", &self.priority())
            .field("enqueued", &self.is_enqueued())
            .finish()
    }
}

fn dep_is_prior(a: &DepItem, b: &DepItem) -> bool {
    a.priority() < b.priority()
}

type DepQueue = PriorityQueue<DepItem, fn(&DepItem, &DepItem) -> bool>;

thread_local! {
    static QUEUE: RefCell<DepQueue> = RefCell::new(PriorityQueue::new(dep_is_prior));
    static DEPTH: Cell<u32> = const { Cell::new(0) };
    static SEEN: RefCell<Vec<DepItem>> = const { RefCell::new(Vec::new()) };
}

/// Number of nodes currently queued. Exposed for tests and diagnostics.
#[must_use]
pub fn queued_len() -> usize {
    QUEUE.with_borrow(PriorityQueue::len)
}

/// Whether a bundle (or an active drain) is currently suppressing drains.
#[must_use]
pub fn is_bundling() -> bool {
    DEPTH.get() > 0
}

/// Drain the queue: recompute every queued node in priority order.
///
/// Called by every cell mutation; inside a bundle or an active drain the
/// call is a no-op and the outermost scope drains instead.
pub fn compute() {
    if DEPTH.get() > 0 {
        return;
    }
    if QUEUE.with_borrow(PriorityQueue::is_empty) {
        return;
    }
    DEPTH.set(1);
    let _guard = DrainGuard;
    tracing::trace!(target: "fdom.reactive", queued = queued_len(), "drain start");
    loop {
        let item = QUEUE.with_borrow_mut(PriorityQueue::pop);
        let Some(item) = item else { break };
        SEEN.with_borrow_mut(|seen| seen.push(item.clone()));
        item.run();
    }
}

/// Clears enqueued latches only after the whole drain, so a node whose
/// recompute re-triggers itself cannot re-enter the same drain. Runs on
/// unwind too.
struct DrainGuard;

impl Drop for DrainGuard {
    fn drop(&mut self) {
        SEEN.with_borrow_mut(|seen| {
            for item in seen.drain(..) {
                item.clear_enqueued();
            }
        });
        DEPTH.set(0);
    }
}

/// RAII bundle guard: while alive, cell mutations update values and queue
/// recomputations but no drain runs. Dropping the outermost scope drains.
pub struct BundleScope {
    _not_send: std::marker::PhantomData<*const ()>,
}

impl BundleScope {
    #[must_use]
    pub fn new() -> Self {
        DEPTH.set(DEPTH.get() + 1);
        Self {
            _not_send: std::marker::PhantomData,
        }
    }
}

impl Default for BundleScope {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for BundleScope {
    fn drop(&mut self) {
        DEPTH.set(DEPTH.get() - 1);
        if DEPTH.get() == 0 {
            compute();
        }
    }
}

/// Run `f` with drains deferred; the queued work runs when the outermost
/// bundle returns. Returns `f`'s result.
pub fn bundle_changes<R>(f: impl FnOnce() -> R) -> R {
    let _scope = BundleScope::new();
    f()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
