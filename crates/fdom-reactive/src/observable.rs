#![forbid(unsafe_code)]

//! The value cell.
//!
//! # Design
//!
//! [`Observable<T>`] wraps a value in shared, reference-counted storage and
//! emits `(new, old)` to its listeners on every change that passes the
//! equality gate. Listeners standing in for derived cells do not recompute
//! in place; they queue their [`DepItem`](crate::schedule::DepItem) and the
//! drain that every `set` triggers (or the outermost bundle) recomputes
//! them once, dependencies first.
//!
//! # Invariants
//!
//! 1. After `set(v)`, `get() == v`.
//! 2. Listeners fire only when the new value differs (`PartialEq`);
//!    `set_and_trigger` bypasses the gate.
//! 3. Listeners fire in registration order with `(new, old)`.
//!
//! # Failure Modes
//!
//! - **Listener panics**: the emit is abandoned; the value is already
//!   stored, remaining listeners are not notified.
//! - **Re-entrant `set` on the same cell from one of its listeners**: runs;
//!   the nested emission completes before the outer one resumes. Derived
//!   cells never do this (they go through the scheduler).

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use fdom_dispose::Disposable;

use crate::emit::{Emitter, Listener, ListenerEntry};
use crate::schedule::{self, DepItem};
use crate::source::Source;

/// Listener handle type for a value cell: callbacks take `(new, old)`.
pub type ChangeListener<T> = Listener<dyn Fn(&T, &T)>;

struct ObsInner<T> {
    value: RefCell<T>,
    emitter: Emitter<dyn Fn(&T, &T)>,
    disposed: Cell<bool>,
    /// Present when the cell owns its value (holder mode): runs on every
    /// replaced value and on the final value at dispose.
    value_disposer: RefCell<Option<Rc<dyn Fn(&T)>>>,
}

/// A single-value cell with change notification.
///
/// Cloning an `Observable` clones the handle; all clones share one value
/// and one listener list.
pub struct Observable<T> {
    inner: Rc<ObsInner<T>>,
}

impl<T: Clone + 'static> Observable<T> {
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(ObsInner {
                value: RefCell::new(value),
                emitter: Emitter::new(),
                disposed: Cell::new(false),
                value_disposer: RefCell::new(None),
            }),
        }
    }

    /// A cell that owns its value: `disposer` runs on each value replaced
    /// by a `set`, and on the current value when the cell is disposed.
    #[must_use]
    pub fn holding(value: T, disposer: impl Fn(&T) + 'static) -> Self {
        let obs = Self::new(value);
        *obs.inner.value_disposer.borrow_mut() = Some(Rc::new(disposer));
        obs
    }

    /// Clone of the current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.inner.value.borrow().clone()
    }

    /// Read the current value by reference without cloning.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.borrow())
    }

    /// Store `value`; if it differs from the current value, notify
    /// listeners and drain the scheduler.
    pub fn set(&self, value: T)
    where
        T: PartialEq,
    {
        if *self.inner.value.borrow() == value {
            return;
        }
        self.set_and_trigger(value);
    }

    /// Store `value` and notify unconditionally (no equality gate).
    pub fn set_and_trigger(&self, value: T) {
        let old = std::mem::replace(&mut *self.inner.value.borrow_mut(), value);
        let new = self.inner.value.borrow().clone();
        self.inner.emitter.emit_with(|cb| cb(&new, &old));
        self.run_value_disposer(&old);
        schedule::compute();
    }

    /// Modify the value in place; notifies when the result differs from the
    /// previous value.
    pub fn update(&self, f: impl FnOnce(&mut T))
    where
        T: PartialEq,
    {
        let old = self.inner.value.borrow().clone();
        f(&mut self.inner.value.borrow_mut());
        if *self.inner.value.borrow() == old {
            return;
        }
        let new = self.inner.value.borrow().clone();
        self.inner.emitter.emit_with(|cb| cb(&new, &old));
        self.run_value_disposer(&old);
        schedule::compute();
    }

    /// Subscribe to changes; the callback receives `(new, old)`.
    pub fn add_listener(&self, cb: impl Fn(&T, &T) + 'static) -> ChangeListener<T> {
        self.inner.emitter.add_entry(ListenerEntry::new(cb))
    }

    #[must_use]
    pub fn has_listeners(&self) -> bool {
        self.inner.emitter.has_listeners()
    }

    /// Install the single listener-presence callback (replaces any
    /// previous one). Lazily-activated derived cells use this to wake up
    /// and suspend.
    pub fn set_listener_change_cb(&self, cb: impl Fn(bool) + 'static) {
        self.inner.emitter.set_change_cb(cb);
    }

    pub(crate) fn emitter(&self) -> &Emitter<dyn Fn(&T, &T)> {
        &self.inner.emitter
    }

    pub(crate) fn key(&self) -> usize {
        Rc::as_ptr(&self.inner) as usize
    }

    fn run_value_disposer(&self, old: &T) {
        let disposer = self.inner.value_disposer.borrow().clone();
        if let Some(disposer) = disposer {
            disposer(old);
        }
    }
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Clone + 'static> Disposable for Observable<T> {
    fn dispose(&self) {
        if self.inner.disposed.replace(true) {
            return;
        }
        self.inner.emitter.dispose();
        let disposer = self.inner.value_disposer.borrow_mut().take();
        if let Some(disposer) = disposer {
            disposer(&self.inner.value.borrow());
        }
    }

    fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }
}

impl<T: Clone + 'static> Source for Observable<T> {
    type Value = T;

    fn fetch(&self) -> T {
        self.get()
    }

    fn listen_enqueue(&self, item: &DepItem) -> Box<dyn Disposable> {
        let item = item.clone();
        Box::new(self.add_listener(move |_, _| item.enqueue()))
    }

    fn source_dep(&self) -> Option<DepItem> {
        None
    }

    fn source_key(&self) -> usize {
        self.key()
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observable")
            .field("value", &self.inner.value.borrow())
            .field("disposed", &self.inner.disposed.get())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
