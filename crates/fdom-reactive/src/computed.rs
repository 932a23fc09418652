#![forbid(unsafe_code)]

//! Eagerly-maintained derived cells.
//!
//! # Design
//!
//! A [`Computed<T>`] pairs a value cell with the [`Subscription`] that
//! keeps it current. Construction evaluates once to seed the cell; after
//! that the scheduler re-evaluates whenever a dependency changed, and the
//! result flows through the cell's equality gate, so downstream listeners
//! fire only on real changes.
//!
//! Static dependencies (`new1`..`new3`) are read on every evaluation and
//! passed to the callback by reference; anything else the callback needs
//! is read dynamically through the [`UseCx`] it receives.

use std::cell::RefCell;
use std::rc::Rc;

use fdom_dispose::Disposable;

use crate::observable::{ChangeListener, Observable};
use crate::schedule::DepItem;
use crate::source::Source;
use crate::subscription::{Subscription, UseCx};

struct ComputedInner<T> {
    obs: Observable<T>,
    sub: Subscription,
    write: RefCell<Option<Box<dyn Fn(T)>>>,
}

/// A cell whose value is a function of other cells, re-evaluated by the
/// scheduler when any dependency changes.
pub struct Computed<T> {
    inner: Rc<ComputedInner<T>>,
}

impl<T: Clone + PartialEq + 'static> Computed<T> {
    /// Derived cell over dynamic dependencies only: everything the callback
    /// reads through the [`UseCx`] becomes a dependency.
    pub fn new(read: impl Fn(&UseCx) -> T + 'static) -> Self {
        Self::build(|_| {}, Rc::new(read))
    }

    /// Derived cell with one static dependency.
    pub fn new1<S1: Source>(d1: &S1, read: impl Fn(&UseCx, &S1::Value) -> T + 'static) -> Self {
        let d1r = d1.clone();
        let wrapped = Rc::new(move |cx: &UseCx| {
            let v1 = d1r.fetch();
            read(cx, &v1)
        });
        let d1s = d1.clone();
        Self::build(move |sub| sub.add_static(&d1s), wrapped)
    }

    /// Derived cell with two static dependencies.
    pub fn new2<S1: Source, S2: Source>(
        d1: &S1,
        d2: &S2,
        read: impl Fn(&UseCx, &S1::Value, &S2::Value) -> T + 'static,
    ) -> Self {
        let (d1r, d2r) = (d1.clone(), d2.clone());
        let wrapped = Rc::new(move |cx: &UseCx| {
            let v1 = d1r.fetch();
            let v2 = d2r.fetch();
            read(cx, &v1, &v2)
        });
        let (d1s, d2s) = (d1.clone(), d2.clone());
        Self::build(
            move |sub| {
                sub.add_static(&d1s);
                sub.add_static(&d2s);
            },
            wrapped,
        )
    }

    /// Derived cell with three static dependencies.
    pub fn new3<S1: Source, S2: Source, S3: Source>(
        d1: &S1,
        d2: &S2,
        d3: &S3,
        read: impl Fn(&UseCx, &S1::Value, &S2::Value, &S3::Value) -> T + 'static,
    ) -> Self {
        let (d1r, d2r, d3r) = (d1.clone(), d2.clone(), d3.clone());
        let wrapped = Rc::new(move |cx: &UseCx| {
            let v1 = d1r.fetch();
            let v2 = d2r.fetch();
            let v3 = d3r.fetch();
            read(cx, &v1, &v2, &v3)
        });
        let (d1s, d2s, d3s) = (d1.clone(), d2.clone(), d3.clone());
        Self::build(
            move |sub| {
                sub.add_static(&d1s);
                sub.add_static(&d2s);
                sub.add_static(&d3s);
            },
            wrapped,
        )
    }

    fn build(attach: impl FnOnce(&Subscription), read: Rc<dyn Fn(&UseCx) -> T>) -> Self {
        let sub = Subscription::raw();
        attach(&sub);
        // Seed the cell directly with the first evaluation; there is no
        // earlier value an equality gate could compare against.
        let initial = sub.evaluate_value(&|cx| read(cx));
        let obs = Observable::new(initial);
        let sink = obs.clone();
        sub.install_deferred(Rc::new(move |cx: &UseCx| {
            let value = read(cx);
            sink.set(value);
        }));
        Self {
            inner: Rc::new(ComputedInner {
                obs,
                sub,
                write: RefCell::new(None),
            }),
        }
    }

    #[must_use]
    pub fn get(&self) -> T {
        self.inner.obs.get()
    }

    /// Read the current value by reference without cloning.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.inner.obs.with(f)
    }

    pub fn add_listener(&self, cb: impl Fn(&T, &T) + 'static) -> ChangeListener<T> {
        self.inner.obs.add_listener(cb)
    }

    #[must_use]
    pub fn has_listeners(&self) -> bool {
        self.inner.obs.has_listeners()
    }

    pub fn set_listener_change_cb(&self, cb: impl Fn(bool) + 'static) {
        self.inner.obs.set_listener_change_cb(cb);
    }

    /// Opt into writability: `set(v)` forwards `v` to `write` instead of
    /// touching the derived value.
    pub fn on_write(&self, write: impl Fn(T) + 'static) {
        *self.inner.write.borrow_mut() = Some(Box::new(write));
    }

    /// Forward a write to the callback installed by
    /// [`on_write`](Self::on_write).
    ///
    /// # Panics
    ///
    /// Panics if no write callback is installed.
    pub fn set(&self, value: T) {
        let write = self.inner.write.borrow();
        match write.as_ref() {
            Some(write) => write(value),
            None => panic!("set() on a non-writable Computed; install on_write first"),
        }
    }
}

impl<T> Clone for Computed<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Clone + 'static> Disposable for Computed<T> {
    fn dispose(&self) {
        self.inner.sub.dispose();
        self.inner.obs.dispose();
    }

    fn is_disposed(&self) -> bool {
        self.inner.obs.is_disposed()
    }
}

impl<T: Clone + PartialEq + 'static> Source for Computed<T> {
    type Value = T;

    fn fetch(&self) -> T {
        self.get()
    }

    fn listen_enqueue(&self, item: &DepItem) -> Box<dyn Disposable> {
        let item = item.clone();
        Box::new(self.inner.obs.add_listener(move |_, _| item.enqueue()))
    }

    fn source_dep(&self) -> Option<DepItem> {
        Some(self.inner.sub.dep_item())
    }

    fn source_key(&self) -> usize {
        self.inner.obs.key()
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Computed<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Computed")
            .field("obs", &self.inner.obs)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
