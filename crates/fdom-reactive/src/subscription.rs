#![forbid(unsafe_code)]

//! Multi-source bindings: the engine behind computed cells.
//!
//! # Design
//!
//! A [`Subscription`] tracks two dependency sets. Static dependencies are
//! declared at construction and subscribed once. Dynamic dependencies are
//! discovered while the user callback runs, through the [`UseCx`] reader it
//! receives: `cx.get(&cell)` subscribes on first use, records the
//! dependency for priority accounting, and returns the current value.
//! After each evaluation, dynamic dependencies that were not read this time
//! are dropped (mark-and-sweep over an identity-keyed map).
//!
//! The listener installed on every dependency does not run the callback; it
//! queues the subscription's [`DepItem`]. Both edges of a diamond-shaped
//! graph therefore queue the same downstream node once, and the scheduler
//! runs it after its dependencies have settled.
//!
//! Passing the reader explicitly — rather than tracking an ambient
//! "currently evaluating" cell — means nested reactive reads in unrelated
//! code cannot be captured by accident.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use ahash::AHashMap;
use fdom_dispose::{Disposable, Disposer, Holder};

use crate::schedule::DepItem;
use crate::source::Source;

struct StaticDep {
    listener: Box<dyn Disposable>,
    dep: Option<DepItem>,
}

struct DynDep {
    listener: Box<dyn Disposable>,
    dep: Option<DepItem>,
    in_use: Cell<bool>,
}

type EvalFn = Rc<dyn Fn(&UseCx)>;

pub(crate) struct SubInner {
    dep_item: DepItem,
    statics: RefCell<Vec<StaticDep>>,
    dynamic: RefCell<AHashMap<usize, DynDep>>,
    eval: RefCell<Option<EvalFn>>,
    /// Slot for a disposable taken over via [`UseCx::owner`]; cleared at
    /// the start of the next evaluation and at teardown.
    owner_slot: Holder<Disposer>,
    disposed: Cell<bool>,
}

impl SubInner {
    fn reevaluate(&self) {
        if self.disposed.get() {
            return;
        }
        let eval = self.eval.borrow().clone();
        if let Some(eval) = eval {
            self.evaluate_with(&|cx| eval(cx));
        }
    }

    fn evaluate_with<R>(&self, read: &dyn Fn(&UseCx) -> R) -> R {
        for dep in self.dynamic.borrow().values() {
            dep.in_use.set(false);
        }
        self.dep_item.reset_priority();
        for dep in self.statics.borrow().iter() {
            self.dep_item.use_dep(dep.dep.as_ref());
        }
        // Anything taken over during the previous evaluation dies now.
        self.owner_slot.clear();

        let cx = UseCx {
            sub: Some(self),
            owner: &self.owner_slot,
        };
        let result = read(&cx);

        self.dynamic.borrow_mut().retain(|_, dep| {
            if dep.in_use.get() {
                true
            } else {
                dep.listener.dispose();
                false
            }
        });
        result
    }

    fn dispose_impl(&self) {
        if self.disposed.replace(true) {
            return;
        }
        self.dep_item.retire();
        for dep in self.statics.borrow_mut().drain(..) {
            dep.listener.dispose();
        }
        for (_, dep) in self.dynamic.borrow_mut().drain() {
            dep.listener.dispose();
        }
        self.owner_slot.dispose();
        self.eval.borrow_mut().take();
    }
}

impl Drop for SubInner {
    fn drop(&mut self) {
        self.dispose_impl();
    }
}

/// The dependency reader handed to read callbacks and effects.
///
/// In a live subscription, `get` records a dynamic dependency; in the
/// passive mode used by an unsubscribed pure computed it is a plain read.
pub struct UseCx<'a> {
    sub: Option<&'a SubInner>,
    owner: &'a Holder<Disposer>,
}

impl<'a> UseCx<'a> {
    pub(crate) fn passive(owner: &'a Holder<Disposer>) -> Self {
        Self { sub: None, owner }
    }

    /// Read `src`, recording it as a dependency of the running evaluation.
    pub fn get<S: Source>(&self, src: &S) -> S::Value {
        let Some(sub) = self.sub else {
            return src.fetch();
        };
        let key = src.source_key();
        let registered = sub.dynamic.borrow().contains_key(&key);
        if !registered {
            // No map borrow across this call: subscribing can activate a
            // lazy source, which evaluates it on the spot.
            let listener = src.listen_enqueue(&sub.dep_item);
            sub.dynamic.borrow_mut().insert(
                key,
                DynDep {
                    listener,
                    dep: src.source_dep(),
                    in_use: Cell::new(true),
                },
            );
        }
        if let Some(dep) = sub.dynamic.borrow().get(&key) {
            dep.in_use.set(true);
            sub.dep_item.use_dep(dep.dep.as_ref());
        }
        src.fetch()
    }

    /// Single-slot owner for a disposable created by this evaluation; it is
    /// disposed at the start of the next evaluation and at teardown. Taking
    /// a second disposable within one evaluation disposes the first.
    #[must_use]
    pub fn owner(&self) -> &Holder<Disposer> {
        self.owner
    }
}

/// A side-effect binding over any number of reactive sources.
///
/// The callback runs once at construction and once per scheduler drain in
/// which any dependency changed.
pub struct Subscription {
    inner: Rc<SubInner>,
}

impl Subscription {
    pub(crate) fn raw() -> Self {
        let inner = Rc::new_cyclic(|weak: &Weak<SubInner>| {
            let weak = weak.clone();
            SubInner {
                dep_item: DepItem::new(move || {
                    if let Some(sub) = weak.upgrade() {
                        sub.reevaluate();
                    }
                }),
                statics: RefCell::new(Vec::new()),
                dynamic: RefCell::new(AHashMap::new()),
                eval: RefCell::new(None),
                owner_slot: Holder::new(),
                disposed: Cell::new(false),
            }
        });
        Self { inner }
    }

    pub(crate) fn add_static<S: Source>(&self, src: &S) {
        let listener = src.listen_enqueue(&self.inner.dep_item);
        self.inner.statics.borrow_mut().push(StaticDep {
            listener,
            dep: src.source_dep(),
        });
    }

    /// Install the evaluation closure and run it immediately.
    pub(crate) fn install(&self, eval: EvalFn) {
        *self.inner.eval.borrow_mut() = Some(eval);
        self.inner.reevaluate();
    }

    /// Install the evaluation closure without running it (the caller has
    /// already evaluated once through [`evaluate_value`](Self::evaluate_value)).
    pub(crate) fn install_deferred(&self, eval: EvalFn) {
        *self.inner.eval.borrow_mut() = Some(eval);
    }

    /// Run one evaluation returning the callback's value. Used for the
    /// initial evaluation of computed cells.
    pub(crate) fn evaluate_value<R>(&self, read: &dyn Fn(&UseCx) -> R) -> R {
        self.inner.evaluate_with(read)
    }

    /// The scheduling record of this subscription.
    #[must_use]
    pub fn dep_item(&self) -> DepItem {
        self.inner.dep_item.clone()
    }

    /// Effect over dynamic dependencies only: everything read through the
    /// [`UseCx`] becomes a dependency.
    pub fn new(effect: impl Fn(&UseCx) + 'static) -> Self {
        let sub = Self::raw();
        sub.install(Rc::new(effect));
        sub
    }

    /// Effect with one static dependency.
    pub fn new1<S1: Source>(d1: &S1, effect: impl Fn(&UseCx, &S1::Value) + 'static) -> Self {
        let sub = Self::raw();
        sub.add_static(d1);
        let d1 = d1.clone();
        sub.install(Rc::new(move |cx: &UseCx| {
            let v1 = d1.fetch();
            effect(cx, &v1);
        }));
        sub
    }

    /// Effect with two static dependencies.
    pub fn new2<S1: Source, S2: Source>(
        d1: &S1,
        d2: &S2,
        effect: impl Fn(&UseCx, &S1::Value, &S2::Value) + 'static,
    ) -> Self {
        let sub = Self::raw();
        sub.add_static(d1);
        sub.add_static(d2);
        let d1 = d1.clone();
        let d2 = d2.clone();
        sub.install(Rc::new(move |cx: &UseCx| {
            let v1 = d1.fetch();
            let v2 = d2.fetch();
            effect(cx, &v1, &v2);
        }));
        sub
    }

    /// Effect with three static dependencies.
    pub fn new3<S1: Source, S2: Source, S3: Source>(
        d1: &S1,
        d2: &S2,
        d3: &S3,
        effect: impl Fn(&UseCx, &S1::Value, &S2::Value, &S3::Value) + 'static,
    ) -> Self {
        let sub = Self::raw();
        sub.add_static(d1);
        sub.add_static(d2);
        sub.add_static(d3);
        let d1 = d1.clone();
        let d2 = d2.clone();
        let d3 = d3.clone();
        sub.install(Rc::new(move |cx: &UseCx| {
            let v1 = d1.fetch();
            let v2 = d2.fetch();
            let v3 = d3.fetch();
            effect(cx, &v1, &v2, &v3);
        }));
        sub
    }
}

impl Clone for Subscription {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl Disposable for Subscription {
    fn dispose(&self) {
        self.inner.dispose_impl();
    }

    fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("statics", &self.inner.statics.borrow().len())
            .field("dynamic", &self.inner.dynamic.borrow().len())
            .field("disposed", &self.inner.disposed.get())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observable::Observable;
    use crate::schedule::bundle_changes;

    #[test]
    fn effect_runs_immediately_and_on_change() {
        let a = Observable::new(1);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = Rc::clone(&seen);

        let _sub = Subscription::new1(&a, move |_cx, av| seen_clone.borrow_mut().push(*av));
        assert_eq!(*seen.borrow(), vec![1]);

        a.set(5);
        assert_eq!(*seen.borrow(), vec![1, 5]);
    }

    #[test]
    fn two_static_deps_coalesce_in_bundle() {
        let x = Observable::new(1);
        let y = Observable::new(2);
        let runs = Rc::new(Cell::new(0u32));
        let runs_clone = Rc::clone(&runs);

        let _sub = Subscription::new2(&x, &y, move |_cx, _xv, _yv| {
            runs_clone.set(runs_clone.get() + 1);
        });
        assert_eq!(runs.get(), 1);

        bundle_changes(|| {
            x.set(10);
            y.set(20);
        });
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn dynamic_dep_registers_and_sweeps() {
        let flag = Observable::new(true);
        let a = Observable::new(1);
        let b = Observable::new(100);
        let runs = Rc::new(Cell::new(0u32));
        let runs_clone = Rc::clone(&runs);

        let a2 = a.clone();
        let b2 = b.clone();
        let _sub = Subscription::new1(&flag, move |cx, on| {
            runs_clone.set(runs_clone.get() + 1);
            if *on {
                cx.get(&a2);
            } else {
                cx.get(&b2);
            }
        });
        assert_eq!(runs.get(), 1);
        assert!(a.has_listeners());
        assert!(!b.has_listeners());

        a.set(2);
        assert_eq!(runs.get(), 2);

        // Switch branches: a is swept, b is registered.
        flag.set(false);
        assert_eq!(runs.get(), 3);
        assert!(!a.has_listeners());
        assert!(b.has_listeners());

        // a no longer triggers.
        a.set(3);
        assert_eq!(runs.get(), 3);
        b.set(101);
        assert_eq!(runs.get(), 4);
    }

    #[test]
    fn dispose_detaches_everything() {
        let a = Observable::new(1);
        let b = Observable::new(2);
        let runs = Rc::new(Cell::new(0u32));
        let runs_clone = Rc::clone(&runs);

        let b2 = b.clone();
        let sub = Subscription::new1(&a, move |cx, _av| {
            cx.get(&b2);
            runs_clone.set(runs_clone.get() + 1);
        });
        assert!(a.has_listeners());
        assert!(b.has_listeners());

        sub.dispose();
        assert!(sub.is_disposed());
        assert!(!a.has_listeners());
        assert!(!b.has_listeners());

        a.set(9);
        b.set(9);
        assert_eq!(runs.get(), 1);
        sub.dispose();
    }

    #[test]
    fn drop_detaches_like_dispose() {
        let a = Observable::new(1);
        {
            let _sub = Subscription::new1(&a, |_cx, _av| {});
            assert!(a.has_listeners());
        }
        assert!(!a.has_listeners());
    }

    #[test]
    fn owner_slot_disposed_on_next_evaluation() {
        let a = Observable::new(0);
        let live = Rc::new(Cell::new(0i32));
        let live_clone = Rc::clone(&live);

        let sub = Subscription::new1(&a, move |cx, _av| {
            let live = Rc::clone(&live_clone);
            live.set(live.get() + 1);
            let live_down = Rc::clone(&live_clone);
            cx.owner()
                .auto_dispose(Disposer::new(move || live_down.set(live_down.get() - 1)));
        });
        assert_eq!(live.get(), 1);

        a.set(1);
        // Previous evaluation's disposable died before the new one arrived.
        assert_eq!(live.get(), 1);

        sub.dispose();
        assert_eq!(live.get(), 0);
    }

    #[test]
    fn same_dep_read_twice_registers_once() {
        let a = Observable::new(1);
        let a2 = a.clone();
        let a3 = a.clone();
        let runs = Rc::new(Cell::new(0u32));
        let runs_clone = Rc::clone(&runs);

        let _sub = Subscription::new(move |cx| {
            runs_clone.set(runs_clone.get() + 1);
            let first = cx.get(&a2);
            let second = cx.get(&a3);
            assert_eq!(first, second);
        });
        assert_eq!(runs.get(), 1);

        a.set(7);
        assert_eq!(runs.get(), 2);
    }
}
