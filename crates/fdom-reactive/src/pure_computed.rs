#![forbid(unsafe_code)]

//! Derived cells that suspend themselves when nobody is watching.
//!
//! # Design
//!
//! A [`PureComputed<T>`] keeps a live [`Subscription`] only while it has
//! listeners (or is held as a dependency by another reactive node, which
//! amounts to the same thing). The transition is driven by the cell's
//! listener-presence callback: first listener in → build the subscription
//! (which evaluates eagerly); last listener out → dispose it, detaching
//! from every source.
//!
//! While suspended, `get()` re-reads the static dependencies and runs the
//! callback directly — correct but unmemoized. A recursion guard returns
//! the cached value if the callback re-enters the same cell through a
//! dependency cycle.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use fdom_dispose::{Disposable, Disposer, Holder};

use crate::observable::{ChangeListener, Observable};
use crate::schedule::DepItem;
use crate::source::Source;
use crate::subscription::{Subscription, UseCx};

type ReadFn<T> = Rc<dyn Fn(&UseCx) -> T>;

struct PureInner<T> {
    obs: Observable<T>,
    read: ReadFn<T>,
    /// Re-subscribes the static dependencies onto a fresh subscription at
    /// each activation.
    attach: Box<dyn Fn(&Subscription)>,
    sub: RefCell<Option<Subscription>>,
    in_call: Cell<bool>,
    disposed: Cell<bool>,
}

impl<T: Clone + PartialEq + 'static> PureInner<T> {
    fn on_listeners(inner: &Rc<Self>, has_listeners: bool) {
        if inner.disposed.get() {
            return;
        }
        if has_listeners {
            if inner.sub.borrow().is_some() {
                return;
            }
            let sub = Subscription::raw();
            (inner.attach)(&sub);
            let sink = inner.obs.clone();
            let read = Rc::clone(&inner.read);
            // Evaluates immediately; the fresh value flows through the
            // equality gate against the suspended-era cache.
            sub.install(Rc::new(move |cx: &UseCx| {
                let value = read(cx);
                sink.set(value);
            }));
            *inner.sub.borrow_mut() = Some(sub);
        } else {
            let sub = inner.sub.borrow_mut().take();
            if let Some(sub) = sub {
                sub.dispose();
            }
        }
    }
}

/// A lazily-subscribed derived cell.
pub struct PureComputed<T> {
    inner: Rc<PureInner<T>>,
}

impl<T: Clone + PartialEq + 'static> PureComputed<T> {
    pub fn new(read: impl Fn(&UseCx) -> T + 'static) -> Self {
        Self::build(Box::new(|_| {}), Rc::new(read))
    }

    pub fn new1<S1: Source>(d1: &S1, read: impl Fn(&UseCx, &S1::Value) -> T + 'static) -> Self {
        let d1r = d1.clone();
        let wrapped: ReadFn<T> = Rc::new(move |cx: &UseCx| {
            let v1 = d1r.fetch();
            read(cx, &v1)
        });
        let d1s = d1.clone();
        Self::build(Box::new(move |sub: &Subscription| sub.add_static(&d1s)), wrapped)
    }

    pub fn new2<S1: Source, S2: Source>(
        d1: &S1,
        d2: &S2,
        read: impl Fn(&UseCx, &S1::Value, &S2::Value) -> T + 'static,
    ) -> Self {
        let (d1r, d2r) = (d1.clone(), d2.clone());
        let wrapped: ReadFn<T> = Rc::new(move |cx: &UseCx| {
            let v1 = d1r.fetch();
            let v2 = d2r.fetch();
            read(cx, &v1, &v2)
        });
        let (d1s, d2s) = (d1.clone(), d2.clone());
        Self::build(
            Box::new(move |sub: &Subscription| {
                sub.add_static(&d1s);
                sub.add_static(&d2s);
            }),
            wrapped,
        )
    }

    pub fn new3<S1: Source, S2: Source, S3: Source>(
        d1: &S1,
        d2: &S2,
        d3: &S3,
        read: impl Fn(&UseCx, &S1::Value, &S2::Value, &S3::Value) -> T + 'static,
    ) -> Self {
        let (d1r, d2r, d3r) = (d1.clone(), d2.clone(), d3.clone());
        let wrapped: ReadFn<T> = Rc::new(move |cx: &UseCx| {
            let v1 = d1r.fetch();
            let v2 = d2r.fetch();
            let v3 = d3r.fetch();
            read(cx, &v1, &v2, &v3)
        });
        let (d1s, d2s, d3s) = (d1.clone(), d2.clone(), d3.clone());
        Self::build(
            Box::new(move |sub: &Subscription| {
                sub.add_static(&d1s);
                sub.add_static(&d2s);
                sub.add_static(&d3s);
            }),
            wrapped,
        )
    }

    fn build(attach: Box<dyn Fn(&Subscription)>, read: ReadFn<T>) -> Self {
        // One passive evaluation seeds the cache; no subscription exists
        // yet, so nothing is retained by it.
        let initial = passive_read(&read);
        let inner = Rc::new(PureInner {
            obs: Observable::new(initial),
            read,
            attach,
            sub: RefCell::new(None),
            in_call: Cell::new(false),
            disposed: Cell::new(false),
        });
        let weak = Rc::downgrade(&inner);
        inner.obs.set_listener_change_cb(move |has| {
            if let Some(inner) = weak.upgrade() {
                PureInner::on_listeners(&inner, has);
            }
        });
        Self { inner }
    }

    /// Current value. Memoized while subscribed; recomputed directly (and
    /// not cached) while suspended.
    #[must_use]
    pub fn get(&self) -> T {
        if self.inner.disposed.get() || self.inner.sub.borrow().is_some() {
            return self.inner.obs.get();
        }
        if self.inner.in_call.get() {
            // Cycle through a dependency: hand back the cache rather than
            // recursing without bound.
            return self.inner.obs.get();
        }
        self.inner.in_call.set(true);
        let _guard = InCallGuard(&self.inner.in_call);
        passive_read(&self.inner.read)
    }

    pub fn add_listener(&self, cb: impl Fn(&T, &T) + 'static) -> ChangeListener<T> {
        self.inner.obs.add_listener(cb)
    }

    #[must_use]
    pub fn has_listeners(&self) -> bool {
        self.inner.obs.has_listeners()
    }

    /// Whether a live subscription currently exists. Exposed for tests.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.inner.sub.borrow().is_some()
    }
}

fn passive_read<T>(read: &ReadFn<T>) -> T {
    let holder: Holder<Disposer> = Holder::new();
    let cx = UseCx::passive(&holder);
    let value = read(&cx);
    holder.dispose();
    value
}

struct InCallGuard<'a>(&'a Cell<bool>);

impl Drop for InCallGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl<T> Clone for PureComputed<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Clone + PartialEq + 'static> Disposable for PureComputed<T> {
    fn dispose(&self) {
        if self.inner.disposed.replace(true) {
            return;
        }
        let sub = self.inner.sub.borrow_mut().take();
        if let Some(sub) = sub {
            sub.dispose();
        }
        self.inner.obs.dispose();
    }

    fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }
}

impl<T: Clone + PartialEq + 'static> Source for PureComputed<T> {
    type Value = T;

    fn fetch(&self) -> T {
        self.get()
    }

    fn listen_enqueue(&self, item: &DepItem) -> Box<dyn Disposable> {
        let item = item.clone();
        // Adding the listener activates the cell via the presence callback,
        // so the dep item read below exists by the time anyone asks.
        Box::new(self.inner.obs.add_listener(move |_, _| item.enqueue()))
    }

    fn source_dep(&self) -> Option<DepItem> {
        self.inner.sub.borrow().as_ref().map(Subscription::dep_item)
    }

    fn source_key(&self) -> usize {
        self.inner.obs.key()
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for PureComputed<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PureComputed")
            .field("obs", &self.inner.obs)
            .field("active", &self.inner.sub.borrow().is_some())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
