#![forbid(unsafe_code)]

//! Mapped sequences that patch instead of rebuilding.
//!
//! # Design
//!
//! A [`ComputedArray<T, U>`] derives an [`ObsArray<U>`] from a source
//! `ObsArray<T>` (or an `Observable<ObsArray<T>>` whose occupant can be
//! swapped). A source event carrying a splice descriptor is applied
//! incrementally: only the added elements are mapped, and the derived array
//! re-emits a corresponding splice. A full-replace event, or a swap of the
//! source array instance, rebuilds the derived sequence from scratch.
//!
//! Mapped-out elements are handed to the derived array's item disposer, so
//! a map function producing owned resources (DOM nodes, subscriptions)
//! gets deterministic teardown.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use fdom_dispose::Disposable;

use crate::obs_array::{ObsArray, Splice};
use crate::observable::Observable;

type MapFn<T, U> = Box<dyn Fn(&T) -> U>;

struct CaInner<T, U> {
    out: ObsArray<U>,
    map: MapFn<T, U>,
    /// Listener on the current source array; replaced when the outer
    /// observable swaps arrays.
    source_listener: RefCell<Option<Box<dyn Disposable>>>,
    /// Listener on the outer observable, when mapping an
    /// `Observable<ObsArray<T>>`.
    outer_listener: RefCell<Option<Box<dyn Disposable>>>,
}

impl<T: Clone + 'static, U: Clone + 'static> CaInner<T, U> {
    fn rebuild(&self, items: &[T]) {
        let mapped: Vec<U> = items.iter().map(|item| (self.map)(item)).collect();
        self.out.set(mapped);
    }

    fn apply(&self, items: &[T], splice: Option<&Splice<T>>) {
        match splice {
            Some(sp) => {
                let added: Vec<U> = items[sp.start..sp.start + sp.num_added]
                    .iter()
                    .map(|item| (self.map)(item))
                    .collect();
                self.out.splice(sp.start as isize, sp.deleted.len(), added);
            }
            None => self.rebuild(items),
        }
    }
}

impl<T, U> Drop for CaInner<T, U> {
    fn drop(&mut self) {
        // Last handle gone: detach from the source even without an
        // explicit dispose.
        if let Some(listener) = self.source_listener.borrow_mut().take() {
            listener.dispose();
        }
        if let Some(listener) = self.outer_listener.borrow_mut().take() {
            listener.dispose();
        }
    }
}

/// A derived, incrementally-maintained mapped sequence.
pub struct ComputedArray<T, U> {
    inner: Rc<CaInner<T, U>>,
}

impl<T: Clone + 'static, U: Clone + 'static> ComputedArray<T, U> {
    /// Map a source array directly.
    pub fn map(source: &ObsArray<T>, map: impl Fn(&T) -> U + 'static) -> Self {
        let inner = Self::raw(map);
        Self::listen_to(&inner, source);
        inner.rebuild(&source.get());
        Self { inner }
    }

    /// Map through an observable holding the source array, re-wiring when
    /// the array instance itself is swapped.
    pub fn map_observable(
        source: &Observable<ObsArray<T>>,
        map: impl Fn(&T) -> U + 'static,
    ) -> Self {
        let inner = Self::raw(map);
        let weak = Rc::downgrade(&inner);
        let outer = source.add_listener(move |new_arr: &ObsArray<T>, _old| {
            if let Some(inner) = weak.upgrade() {
                Self::listen_to(&inner, new_arr);
                inner.rebuild(&new_arr.get());
            }
        });
        *inner.outer_listener.borrow_mut() = Some(Box::new(outer));
        let current = source.get();
        Self::listen_to(&inner, &current);
        inner.rebuild(&current.get());
        Self { inner }
    }

    fn raw(map: impl Fn(&T) -> U + 'static) -> Rc<CaInner<T, U>> {
        Rc::new(CaInner {
            out: ObsArray::new(Vec::new()),
            map: Box::new(map),
            source_listener: RefCell::new(None),
            outer_listener: RefCell::new(None),
        })
    }

    fn listen_to(inner: &Rc<CaInner<T, U>>, source: &ObsArray<T>) {
        if let Some(old) = inner.source_listener.borrow_mut().take() {
            old.dispose();
        }
        let weak: Weak<CaInner<T, U>> = Rc::downgrade(inner);
        let listener = source.add_listener(move |items, splice| {
            if let Some(inner) = weak.upgrade() {
                inner.apply(items, splice);
            }
        });
        *inner.source_listener.borrow_mut() = Some(Box::new(listener));
    }

    /// The derived array. Subscribe to it, read it, or hand it to a DOM
    /// region; its item disposer owns the mapped-out values.
    #[must_use]
    pub fn out(&self) -> &ObsArray<U> {
        &self.inner.out
    }

    /// Install the ownership hook for mapped values.
    pub fn set_item_disposer(&self, disposer: impl Fn(&U) + 'static) {
        self.inner.out.set_item_disposer(disposer);
    }
}

impl<T, U> Clone for ComputedArray<T, U> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Clone + 'static, U: Clone + 'static> Disposable for ComputedArray<T, U> {
    fn dispose(&self) {
        if let Some(l) = self.inner.source_listener.borrow_mut().take() {
            l.dispose();
        }
        if let Some(l) = self.inner.outer_listener.borrow_mut().take() {
            l.dispose();
        }
        self.inner.out.dispose();
    }

    fn is_disposed(&self) -> bool {
        self.inner.out.is_disposed()
    }
}

impl<T, U: std::fmt::Debug> std::fmt::Debug for ComputedArray<T, U> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComputedArray")
            .field("out", &self.inner.out)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
