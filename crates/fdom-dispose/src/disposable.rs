#![forbid(unsafe_code)]

//! The [`Disposable`] trait, the [`Owner`] disposal list, and the
//! constructor-safe [`Scoped`] factory.
//!
//! # Design
//!
//! An [`Owner`] carries an ordered list of teardown entries. Registering is
//! O(1); disposing walks the list in reverse so that resources are released
//! in the opposite order of acquisition. The entry list is taken out of the
//! owner (marking it disposed) before any entry runs, which makes re-entrant
//! `dispose` calls no-ops and breaks owner/held reference cycles.
//!
//! # Failure Modes
//!
//! - **Disposer panics**: caught with `catch_unwind`, logged under the
//!   `fdom.dispose` target, and swallowed so the remaining entries still
//!   run. A partial teardown is strictly worse than a noisy complete one.
//! - **Registration after dispose**: panics. Registering a resource with a
//!   dead owner would leak it silently.

use std::any::type_name;
use std::cell::{Cell, RefCell};
use std::ops::Deref;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;

/// An explicitly releasable resource.
///
/// `dispose()` must be idempotent: the second and later calls are no-ops.
/// Idempotency is what lets a [`Holder`](crate::Holder) and its occupant
/// reference each other without double-release on teardown.
pub trait Disposable {
    /// Release the resource. Calling this twice is a no-op.
    fn dispose(&self);

    /// Whether [`dispose`](Disposable::dispose) has already run.
    fn is_disposed(&self) -> bool;
}

type DisposeFn = Box<dyn FnOnce()>;

struct Entry {
    /// Type name of the registered resource, kept for teardown logging.
    label: &'static str,
    run: DisposeFn,
}

struct OwnerInner {
    /// `None` means disposed.
    entries: RefCell<Option<Vec<Entry>>>,
    /// Wipe hooks run after all disposers, in registration order. Used to
    /// clear slots that would otherwise keep `Rc` cycles alive.
    wipes: RefCell<Vec<DisposeFn>>,
}

impl OwnerInner {
    fn drain(&self) {
        let Some(entries) = self.entries.borrow_mut().take() else {
            return;
        };
        for entry in entries.into_iter().rev() {
            let Entry { label, run } = entry;
            if catch_unwind(AssertUnwindSafe(run)).is_err() {
                tracing::error!(
                    target: "fdom.dispose",
                    resource = label,
                    "disposer panicked; continuing teardown"
                );
            }
        }
        let wipes = std::mem::take(&mut *self.wipes.borrow_mut());
        for wipe in wipes {
            if catch_unwind(AssertUnwindSafe(wipe)).is_err() {
                tracing::error!(target: "fdom.dispose", "wipe hook panicked");
            }
        }
    }
}

impl Drop for OwnerInner {
    fn drop(&mut self) {
        // Last handle gone without an explicit dispose: release everything
        // anyway so dropped owners cannot leak listeners or DOM regions.
        self.drain();
    }
}

/// An ordered disposal list.
///
/// Cloning an `Owner` clones the handle; all clones share one entry list.
///
/// # Invariants
///
/// 1. Entries are disposed in reverse insertion order.
/// 2. Each entry is disposed at most once.
/// 3. The owner is disposed iff its entry list has been taken.
pub struct Owner {
    inner: Rc<OwnerInner>,
}

impl Owner {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(OwnerInner {
                entries: RefCell::new(Some(Vec::new())),
                wipes: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Register `resource` so that disposing this owner disposes it.
    ///
    /// Returns a clone of the handle for call-site chaining.
    ///
    /// # Panics
    ///
    /// Panics if the owner is already disposed.
    pub fn auto_dispose<D: Disposable + Clone + 'static>(&self, resource: &D) -> D {
        let held = resource.clone();
        self.push(type_name::<D>(), Box::new(move || held.dispose()));
        resource.clone()
    }

    /// Register a bare teardown callback.
    ///
    /// # Panics
    ///
    /// Panics if the owner is already disposed.
    pub fn on_dispose(&self, f: impl FnOnce() + 'static) {
        self.push("callback", Box::new(f));
    }

    /// Register a wipe hook, run after every disposer has run.
    ///
    /// Wipe hooks exist to clear `RefCell` slots whose contents would keep
    /// reference cycles alive past teardown.
    ///
    /// # Panics
    ///
    /// Panics if the owner is already disposed.
    pub fn wipe_on_dispose(&self, f: impl FnOnce() + 'static) {
        assert!(!self.is_disposed(), "wipe_on_dispose on a disposed Owner");
        self.inner.wipes.borrow_mut().push(Box::new(f));
    }

    /// Number of pending disposal entries. Zero after dispose.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.entries.borrow().as_ref().map_or(0, Vec::len)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push(&self, label: &'static str, run: DisposeFn) {
        let mut entries = self.inner.entries.borrow_mut();
        match entries.as_mut() {
            Some(list) => list.push(Entry { label, run }),
            None => panic!("registration on a disposed Owner (resource: {label})"),
        }
    }
}

impl Default for Owner {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for Owner {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl Disposable for Owner {
    fn dispose(&self) {
        self.inner.drain();
    }

    fn is_disposed(&self) -> bool {
        self.inner.entries.borrow().is_none()
    }
}

impl std::fmt::Debug for Owner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Owner")
            .field("disposed", &self.is_disposed())
            .field("entries", &self.len())
            .finish()
    }
}

/// A one-shot teardown callback as a [`Disposable`].
///
/// Bridges ad-hoc cleanup (closures) into owner lists and holders.
pub struct Disposer {
    inner: Rc<RefCell<Option<DisposeFn>>>,
}

impl Disposer {
    #[must_use]
    pub fn new(f: impl FnOnce() + 'static) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Some(Box::new(f)))),
        }
    }

    /// A disposer that does nothing. Already-disposed from birth.
    #[must_use]
    pub fn noop() -> Self {
        Self {
            inner: Rc::new(RefCell::new(None)),
        }
    }
}

impl Clone for Disposer {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl Disposable for Disposer {
    fn dispose(&self) {
        if let Some(f) = self.inner.borrow_mut().take() {
            f();
        }
    }

    fn is_disposed(&self) -> bool {
        self.inner.borrow().is_none()
    }
}

impl std::fmt::Debug for Disposer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Disposer")
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

struct ScopedInner<T> {
    value: T,
    owner: Owner,
    disposed: Cell<bool>,
}

/// A value paired with the owner that tears down everything its constructor
/// acquired.
///
/// Built through [`Scoped::create`], which guarantees: either the caller
/// receives a fully constructed value registered with `parent`, or the
/// constructor's error propagates with every resource it had registered
/// already released, in reverse order.
pub struct Scoped<T> {
    inner: Rc<ScopedInner<T>>,
}

impl<T: 'static> Scoped<T> {
    /// Run `ctor` against a fresh owner.
    ///
    /// On `Ok`, the scoped value is registered with `parent` (when given) so
    /// disposing the parent disposes it. On `Err`, the fresh owner is
    /// disposed — releasing whatever the constructor had registered — and
    /// the error is returned.
    pub fn create<E>(
        parent: Option<&Owner>,
        ctor: impl FnOnce(&Owner) -> Result<T, E>,
    ) -> Result<Self, E> {
        let owner = Owner::new();
        match ctor(&owner) {
            Ok(value) => {
                let scoped = Self {
                    inner: Rc::new(ScopedInner {
                        value,
                        owner,
                        disposed: Cell::new(false),
                    }),
                };
                if let Some(parent) = parent {
                    parent.auto_dispose(&scoped);
                }
                Ok(scoped)
            }
            Err(err) => {
                owner.dispose();
                Err(err)
            }
        }
    }

    /// The owner holding everything the constructor registered.
    #[must_use]
    pub fn owner(&self) -> &Owner {
        &self.inner.owner
    }
}

impl<T> Deref for Scoped<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner.value
    }
}

impl<T> Clone for Scoped<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> Disposable for Scoped<T> {
    fn dispose(&self) {
        if !self.inner.disposed.replace(true) {
            self.inner.owner.dispose();
        }
    }

    fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Scoped<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scoped")
            .field("value", &self.inner.value)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispose_runs_in_reverse_order() {
        let owner = Owner::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        for tag in ['a', 'b', 'c'] {
            let log = Rc::clone(&log);
            owner.on_dispose(move || log.borrow_mut().push(tag));
        }

        owner.dispose();
        assert_eq!(*log.borrow(), vec!['c', 'b', 'a']);
    }

    #[test]
    fn dispose_is_idempotent() {
        let owner = Owner::new();
        let count = Rc::new(Cell::new(0u32));
        let count_clone = Rc::clone(&count);
        owner.on_dispose(move || count_clone.set(count_clone.get() + 1));

        owner.dispose();
        owner.dispose();
        assert_eq!(count.get(), 1);
        assert!(owner.is_disposed());
    }

    #[test]
    fn reentrant_dispose_is_noop() {
        let owner = Owner::new();
        let reentry = Owner::clone(&owner);
        let count = Rc::new(Cell::new(0u32));
        let count_clone = Rc::clone(&count);

        owner.on_dispose(move || {
            reentry.dispose(); // Already mid-dispose: must not recurse.
            count_clone.set(count_clone.get() + 1);
        });

        owner.dispose();
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn panicking_disposer_does_not_stop_teardown() {
        let owner = Owner::new();
        let ran = Rc::new(Cell::new(false));
        let ran_clone = Rc::clone(&ran);

        owner.on_dispose(move || ran_clone.set(true));
        owner.on_dispose(|| panic!("boom"));

        // The panicking entry runs first (reverse order) and is swallowed.
        owner.dispose();
        assert!(ran.get());
        assert!(owner.is_disposed());
    }

    #[test]
    fn auto_dispose_releases_disposable() {
        let owner = Owner::new();
        let inner = Disposer::new(|| {});
        owner.auto_dispose(&inner);

        assert!(!inner.is_disposed());
        owner.dispose();
        assert!(inner.is_disposed());
    }

    #[test]
    #[should_panic(expected = "disposed Owner")]
    fn registration_after_dispose_panics() {
        let owner = Owner::new();
        owner.dispose();
        owner.on_dispose(|| {});
    }

    #[test]
    fn wipe_hooks_run_after_disposers() {
        let owner = Owner::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        let log1 = Rc::clone(&log);
        owner.wipe_on_dispose(move || log1.borrow_mut().push("wipe"));
        let log2 = Rc::clone(&log);
        owner.on_dispose(move || log2.borrow_mut().push("dispose"));

        owner.dispose();
        assert_eq!(*log.borrow(), vec!["dispose", "wipe"]);
    }

    #[test]
    fn dropping_last_handle_disposes() {
        let ran = Rc::new(Cell::new(false));
        {
            let owner = Owner::new();
            let ran_clone = Rc::clone(&ran);
            owner.on_dispose(move || ran_clone.set(true));
        }
        assert!(ran.get());
    }

    #[test]
    fn disposer_runs_once() {
        let count = Rc::new(Cell::new(0u32));
        let count_clone = Rc::clone(&count);
        let d = Disposer::new(move || count_clone.set(count_clone.get() + 1));

        assert!(!d.is_disposed());
        d.dispose();
        d.dispose();
        assert_eq!(count.get(), 1);
        assert!(d.is_disposed());
    }

    #[test]
    fn noop_disposer_is_born_disposed() {
        let d = Disposer::noop();
        assert!(d.is_disposed());
        d.dispose();
    }

    #[test]
    fn scoped_create_success_ties_to_parent() {
        let parent = Owner::new();
        let inner = Disposer::new(|| {});
        let inner_clone = inner.clone();

        let scoped = Scoped::create(Some(&parent), move |own| {
            own.auto_dispose(&inner_clone);
            Ok::<_, std::convert::Infallible>(7u32)
        })
        .unwrap();

        assert_eq!(*scoped, 7);
        assert!(!inner.is_disposed());

        parent.dispose();
        assert!(scoped.is_disposed());
        assert!(inner.is_disposed());
    }

    #[test]
    fn scoped_create_failure_releases_partial_state() {
        let inner = Disposer::new(|| {});
        let inner_clone = inner.clone();

        let result: Result<Scoped<u32>, &str> = Scoped::create(None, move |own| {
            own.auto_dispose(&inner_clone);
            Err("constructor failed")
        });

        assert_eq!(result.err(), Some("constructor failed"));
        assert!(inner.is_disposed());
    }

    #[test]
    fn scoped_explicit_dispose() {
        let count = Rc::new(Cell::new(0u32));
        let count_clone = Rc::clone(&count);

        let scoped = Scoped::create(None, move |own| {
            own.on_dispose(move || count_clone.set(count_clone.get() + 1));
            Ok::<_, std::convert::Infallible>(())
        })
        .unwrap();

        scoped.dispose();
        scoped.dispose();
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn owner_len_tracks_entries() {
        let owner = Owner::new();
        assert!(owner.is_empty());
        owner.on_dispose(|| {});
        owner.on_dispose(|| {});
        assert_eq!(owner.len(), 2);
        owner.dispose();
        assert_eq!(owner.len(), 0);
    }
}
