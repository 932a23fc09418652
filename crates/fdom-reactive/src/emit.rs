#![forbid(unsafe_code)]

//! Listener lists with insertion-ordered emission.
//!
//! # Design
//!
//! [`Emitter<F>`] is generic over the callback object type (some
//! `dyn Fn(...)`), so each reactive cell kind picks its own listener
//! signature while sharing one list implementation. Listeners are stored as
//! strong `Rc` entries with a disposed latch; removal flips the latch in
//! O(1) and physical pruning happens lazily on later insertions, the same
//! way dead subscribers are pruned lazily elsewhere in this workspace.
//!
//! # Invariants
//!
//! 1. Emission visits listeners in insertion order.
//! 2. A listener disposed during an emit is not visited by that emit.
//! 3. A listener added during an emit is first visited by the *next* emit.
//! 4. The change callback fires on the empty↔non-empty transitions of the
//!    live set, and on those only.
//!
//! # Failure Modes
//!
//! - **Listener panics during emit**: the emit is abandoned at that point;
//!   remaining listeners are not visited. Swallowing would mask bugs; see
//!   the opposite policy for disposers in `fdom-dispose`.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use fdom_dispose::Disposable;
use smallvec::SmallVec;

/// One registered listener. The callback lives inline as the (possibly
/// unsized) last field.
pub struct ListenerEntry<F: ?Sized> {
    disposed: Cell<bool>,
    cb: F,
}

impl<F> ListenerEntry<F> {
    pub(crate) fn new(cb: F) -> Rc<Self> {
        Rc::new(Self {
            disposed: Cell::new(false),
            cb,
        })
    }
}

struct EmitterInner<F: ?Sized> {
    live: Cell<usize>,
    disposed: Cell<bool>,
    change_cb: RefCell<Option<Rc<dyn Fn(bool)>>>,
    listeners: RefCell<Vec<Rc<ListenerEntry<F>>>>,
}

impl<F: ?Sized> EmitterInner<F> {
    fn fire_change(&self, has_listeners: bool) {
        let cb = self.change_cb.borrow().clone();
        if let Some(cb) = cb {
            cb(has_listeners);
        }
    }
}

/// A list of subscribers sharing the callback signature `F`.
///
/// Cloning the emitter clones the handle; all clones share one list.
pub struct Emitter<F: ?Sized> {
    inner: Rc<EmitterInner<F>>,
}

impl<F: ?Sized + 'static> Emitter<F> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(EmitterInner {
                live: Cell::new(0),
                disposed: Cell::new(false),
                change_cb: RefCell::new(None),
                listeners: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Append a listener entry. Fires the change callback when the list
    /// transitions to non-empty.
    ///
    /// # Panics
    ///
    /// Panics if the emitter is disposed.
    pub fn add_entry(&self, entry: Rc<ListenerEntry<F>>) -> Listener<F> {
        assert!(
            !self.inner.disposed.get(),
            "listener added to a disposed Emitter"
        );
        {
            let mut listeners = self.inner.listeners.borrow_mut();
            // Amortized prune: drop latched entries once they dominate.
            if listeners.len() >= 8 && listeners.len() >= self.inner.live.get() * 2 {
                listeners.retain(|l| !l.disposed.get());
            }
            listeners.push(Rc::clone(&entry));
        }
        let live = self.inner.live.get() + 1;
        self.inner.live.set(live);
        if live == 1 {
            self.inner.fire_change(true);
        }
        Listener {
            entry,
            emitter: Rc::downgrade(&self.inner),
        }
    }

    /// Walk the listeners in insertion order, calling `invoke` on each
    /// callback that is still live.
    ///
    /// The walk runs over a snapshot: listeners added mid-emit are not
    /// visited, listeners disposed mid-emit are skipped.
    pub fn emit_with(&self, invoke: impl Fn(&F)) {
        let snapshot: SmallVec<[Rc<ListenerEntry<F>>; 4]> =
            self.inner.listeners.borrow().iter().cloned().collect();
        for entry in snapshot {
            if !entry.disposed.get() {
                invoke(&entry.cb);
            }
        }
    }

    #[must_use]
    pub fn has_listeners(&self) -> bool {
        self.inner.live.get() > 0
    }

    /// Install the single change callback, replacing any previous one.
    /// It receives `true` when the live set becomes non-empty and `false`
    /// when it empties.
    pub fn set_change_cb(&self, cb: impl Fn(bool) + 'static) {
        *self.inner.change_cb.borrow_mut() = Some(Rc::new(cb));
    }

    pub fn clear_change_cb(&self) {
        *self.inner.change_cb.borrow_mut() = None;
    }

    /// Drop every listener without firing the change callback.
    pub fn dispose(&self) {
        if self.inner.disposed.replace(true) {
            return;
        }
        let listeners = std::mem::take(&mut *self.inner.listeners.borrow_mut());
        for l in &listeners {
            l.disposed.set(true);
        }
        self.inner.live.set(0);
        self.inner.change_cb.borrow_mut().take();
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }
}

impl<F: ?Sized + 'static> Default for Emitter<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: ?Sized> Clone for Emitter<F> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<F: ?Sized> std::fmt::Debug for Emitter<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Emitter")
            .field("live", &self.inner.live.get())
            .field("disposed", &self.inner.disposed.get())
            .finish()
    }
}

/// Handle to one registered listener. Disposal is explicit and idempotent;
/// dropping the handle does not unsubscribe.
pub struct Listener<F: ?Sized> {
    entry: Rc<ListenerEntry<F>>,
    emitter: Weak<EmitterInner<F>>,
}

impl<F: ?Sized> Clone for Listener<F> {
    fn clone(&self) -> Self {
        Self {
            entry: Rc::clone(&self.entry),
            emitter: Weak::clone(&self.emitter),
        }
    }
}

impl<F: ?Sized + 'static> Disposable for Listener<F> {
    fn dispose(&self) {
        if self.entry.disposed.replace(true) {
            return;
        }
        if let Some(emitter) = self.emitter.upgrade() {
            let live = emitter.live.get().saturating_sub(1);
            emitter.live.set(live);
            if live == 0 {
                emitter.fire_change(false);
            }
        }
    }

    fn is_disposed(&self) -> bool {
        self.entry.disposed.get()
    }
}

impl<F: ?Sized> std::fmt::Debug for Listener<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listener")
            .field("disposed", &self.entry.disposed.get())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
