#![forbid(unsafe_code)]

//! Sequence cells with localized change descriptors.
//!
//! # Design
//!
//! [`ObsArray<T>`] is a value cell over a `Vec<T>` whose listeners receive,
//! besides the new contents, an optional [`Splice`] describing a localized
//! mutation. The mutating methods (`push`, `pop`, `shift`, `unshift`,
//! `splice`) all funnel through one splice implementation; `set` replaces
//! wholesale and emits with no descriptor. Consumers that can patch
//! incrementally (mapped arrays, DOM regions) use the descriptor; everyone
//! else rebuilds.
//!
//! # Ownership
//!
//! An array may own its elements: [`set_item_disposer`](ObsArray::set_item_disposer)
//! installs a hook that runs on every element spliced out, on every element
//! replaced by `set`, and on the remaining elements when the array is
//! disposed. Identity is positional — the hook sees each removed element
//! exactly once.
//!
//! # Invariants
//!
//! 1. After any splice, `new.len() == old.len() - deleted.len() + num_added`.
//! 2. The emitted descriptor's `start` is clamped into `[0, old.len()]`;
//!    a negative requested start counts from the end.
//! 3. `pop`/`shift` on an empty array return `None` and emit nothing.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use fdom_dispose::Disposable;

use crate::emit::{Emitter, Listener, ListenerEntry};
use crate::schedule::{self, DepItem};
use crate::source::Source;

/// Localized change summary: `deleted` elements were replaced by
/// `num_added` new elements at `start`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Splice<T> {
    pub start: usize,
    pub num_added: usize,
    pub deleted: Vec<T>,
}

/// Listener callback type: `(new_contents, splice)`. A `None` splice means
/// a full replacement.
pub type ArrayListener<T> = dyn Fn(&[T], Option<&Splice<T>>);

struct ObsArrayInner<T> {
    items: RefCell<Vec<T>>,
    emitter: Emitter<ArrayListener<T>>,
    item_disposer: RefCell<Option<Rc<dyn Fn(&T)>>>,
    disposed: Cell<bool>,
}

/// An observable sequence.
///
/// Cloning clones the handle; all clones share contents and listeners.
pub struct ObsArray<T> {
    inner: Rc<ObsArrayInner<T>>,
}

impl<T: Clone + 'static> ObsArray<T> {
    #[must_use]
    pub fn new(items: Vec<T>) -> Self {
        Self {
            inner: Rc::new(ObsArrayInner {
                items: RefCell::new(items),
                emitter: Emitter::new(),
                item_disposer: RefCell::new(None),
                disposed: Cell::new(false),
            }),
        }
    }

    /// Install the element-ownership hook (replaces any previous one).
    pub fn set_item_disposer(&self, disposer: impl Fn(&T) + 'static) {
        *self.inner.item_disposer.borrow_mut() = Some(Rc::new(disposer));
    }

    #[must_use]
    pub fn get(&self) -> Vec<T> {
        self.inner.items.borrow().clone()
    }

    /// Read the contents by reference without cloning.
    pub fn with<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        f(&self.inner.items.borrow())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.items.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.items.borrow().is_empty()
    }

    pub fn add_listener(
        &self,
        cb: impl Fn(&[T], Option<&Splice<T>>) + 'static,
    ) -> Listener<ArrayListener<T>> {
        self.inner.emitter.add_entry(ListenerEntry::new(cb))
    }

    #[must_use]
    pub fn has_listeners(&self) -> bool {
        self.inner.emitter.has_listeners()
    }

    /// Replace the whole sequence. Always notifies, with no splice
    /// descriptor; a freshly built sequence is never assumed equal to the
    /// old one.
    pub fn set(&self, items: Vec<T>) {
        let old = std::mem::replace(&mut *self.inner.items.borrow_mut(), items);
        self.emit(None);
        self.dispose_items(&old);
        schedule::compute();
    }

    pub fn push(&self, item: T) {
        let start = self.len();
        self.splice_impl(start, 0, vec![item]);
    }

    pub fn pop(&self) -> Option<T> {
        let len = self.len();
        if len == 0 {
            return None;
        }
        self.splice_impl(len - 1, 1, Vec::new()).pop()
    }

    pub fn unshift(&self, item: T) {
        self.splice_impl(0, 0, vec![item]);
    }

    pub fn shift(&self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        self.splice_impl(0, 1, Vec::new()).pop()
    }

    /// Replace `delete_count` elements at `start` with `items`, returning
    /// the deleted elements. `start` is clamped into `[0, len]`; a negative
    /// `start` counts back from the end.
    pub fn splice(&self, start: isize, delete_count: usize, items: Vec<T>) -> Vec<T> {
        let len = self.len();
        let start = if start < 0 {
            len.saturating_sub(start.unsigned_abs())
        } else {
            (start as usize).min(len)
        };
        self.splice_impl(start, delete_count, items)
    }

    fn splice_impl(&self, start: usize, delete_count: usize, items: Vec<T>) -> Vec<T> {
        let num_added = items.len();
        let deleted: Vec<T> = {
            let mut contents = self.inner.items.borrow_mut();
            let end = (start + delete_count).min(contents.len());
            contents.splice(start..end, items).collect()
        };
        let splice = Splice {
            start,
            num_added,
            deleted: deleted.clone(),
        };
        self.emit(Some(&splice));
        self.dispose_items(&deleted);
        schedule::compute();
        deleted
    }

    fn emit(&self, splice: Option<&Splice<T>>) {
        let snapshot = self.inner.items.borrow().clone();
        self.inner.emitter.emit_with(|cb| cb(&snapshot, splice));
    }

    fn dispose_items(&self, items: &[T]) {
        let disposer = self.inner.item_disposer.borrow().clone();
        if let Some(disposer) = disposer {
            for item in items {
                disposer(item);
            }
        }
    }

    pub(crate) fn key(&self) -> usize {
        Rc::as_ptr(&self.inner) as usize
    }
}

impl<T> Clone for ObsArray<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

/// Identity comparison: two handles are equal iff they share contents.
/// This is what lets an `ObsArray` sit inside an `Observable` with the
/// usual equality gate meaning "same array instance".
impl<T> PartialEq for ObsArray<T> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T> Eq for ObsArray<T> {}

impl<T: Clone + 'static> Disposable for ObsArray<T> {
    fn dispose(&self) {
        if self.inner.disposed.replace(true) {
            return;
        }
        self.inner.emitter.dispose();
        let remaining = std::mem::take(&mut *self.inner.items.borrow_mut());
        self.dispose_items(&remaining);
        self.inner.item_disposer.borrow_mut().take();
    }

    fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }
}

impl<T: Clone + 'static> Source for ObsArray<T> {
    type Value = Vec<T>;

    fn fetch(&self) -> Vec<T> {
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

impl<T: std::fmt::Debug> std::fmt::Debug for ObsArray<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObsArray")
            .field("items", &self.inner.items.borrow())
            .field("disposed", &self.inner.disposed.get())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
