#![forbid(unsafe_code)]

//! Uniform wrapping of "plain value | reactive cell | reader function"
//! into one subscription shape.
//!
//! DOM modifiers accept an `impl Into<BindableValue<T>>`, so call sites can
//! pass a constant, any cell kind, or a closure over a [`UseCx`] and get
//! the same behavior: the apply callback runs once with the current value
//! and again on every change, with teardown through the returned handle.

use std::rc::Rc;

use fdom_dispose::{Disposable, Owner};

use crate::computed::Computed;
use crate::observable::Observable;
use crate::pure_computed::PureComputed;
use crate::subscription::UseCx;

/// A foreign read-only cell: anything that can be peeked and subscribed.
/// Lets types outside this crate participate in bindings.
pub trait ReactiveRead<T> {
    fn peek(&self) -> T;
    /// Subscribe `notify` to change events; the handle detaches on dispose.
    fn listen(&self, notify: Box<dyn Fn()>) -> Box<dyn Disposable>;
}

impl<T: Clone + 'static> ReactiveRead<T> for Observable<T> {
    fn peek(&self) -> T {
        self.get()
    }

    fn listen(&self, notify: Box<dyn Fn()>) -> Box<dyn Disposable> {
        Box::new(self.add_listener(move |_, _| notify()))
    }
}

impl<T: Clone + PartialEq + 'static> ReactiveRead<T> for Computed<T> {
    fn peek(&self) -> T {
        self.get()
    }

    fn listen(&self, notify: Box<dyn Fn()>) -> Box<dyn Disposable> {
        Box::new(self.add_listener(move |_, _| notify()))
    }
}

impl<T: Clone + PartialEq + 'static> ReactiveRead<T> for PureComputed<T> {
    fn peek(&self) -> T {
        self.get()
    }

    fn listen(&self, notify: Box<dyn Fn()>) -> Box<dyn Disposable> {
        Box::new(self.add_listener(move |_, _| notify()))
    }
}

/// One bindable argument: a constant, a cell, a reader closure, or a
/// foreign readable.
pub enum BindableValue<T> {
    Value(T),
    Obs(Observable<T>),
    Reader(Rc<dyn Fn(&UseCx) -> T>),
    Foreign(Rc<dyn ReactiveRead<T>>),
}

impl<T> BindableValue<T> {
    /// Wrap a reader closure; everything it reads through the [`UseCx`]
    /// becomes a dependency of the binding.
    pub fn from_fn(read: impl Fn(&UseCx) -> T + 'static) -> Self {
        Self::Reader(Rc::new(read))
    }
}

impl<T> From<T> for BindableValue<T> {
    fn from(value: T) -> Self {
        Self::Value(value)
    }
}

impl From<&str> for BindableValue<String> {
    fn from(value: &str) -> Self {
        Self::Value(value.to_string())
    }
}

impl<T> From<Observable<T>> for BindableValue<T> {
    fn from(obs: Observable<T>) -> Self {
        Self::Obs(obs)
    }
}

impl<T> From<&Observable<T>> for BindableValue<T> {
    fn from(obs: &Observable<T>) -> Self {
        Self::Obs(obs.clone())
    }
}

impl<T: Clone + PartialEq + 'static> From<&Computed<T>> for BindableValue<T> {
    fn from(computed: &Computed<T>) -> Self {
        Self::Foreign(Rc::new(computed.clone()))
    }
}

impl<T: Clone + PartialEq + 'static> From<Computed<T>> for BindableValue<T> {
    fn from(computed: Computed<T>) -> Self {
        Self::Foreign(Rc::new(computed))
    }
}

impl<T: Clone + PartialEq + 'static> From<&PureComputed<T>> for BindableValue<T> {
    fn from(pure: &PureComputed<T>) -> Self {
        Self::Foreign(Rc::new(pure.clone()))
    }
}

impl<T: Clone + PartialEq + 'static> From<PureComputed<T>> for BindableValue<T> {
    fn from(pure: PureComputed<T>) -> Self {
        Self::Foreign(Rc::new(pure))
    }
}

/// Teardown handle for one live binding.
pub struct BindingHandle {
    owner: Owner,
}

impl Clone for BindingHandle {
    fn clone(&self) -> Self {
        Self {
            owner: self.owner.clone(),
        }
    }
}

impl Disposable for BindingHandle {
    fn dispose(&self) {
        self.owner.dispose();
    }

    fn is_disposed(&self) -> bool {
        self.owner.is_disposed()
    }
}

impl std::fmt::Debug for BindingHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BindingHandle")
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Apply `bindable` now and on every subsequent change.
///
/// A plain value applies once and returns `None` — there is nothing to
/// tear down. Every other shape returns a handle that detaches the
/// binding. Reader closures are wrapped in an internal [`Computed`], so
/// re-applies are equality-gated.
pub fn bind<T: Clone + PartialEq + 'static>(
    bindable: BindableValue<T>,
    apply: impl Fn(&T) + 'static,
) -> Option<BindingHandle> {
    let apply: Rc<dyn Fn(&T)> = Rc::new(apply);
    match bindable {
        BindableValue::Value(value) => {
            apply(&value);
            None
        }
        BindableValue::Obs(obs) => {
            apply(&obs.get());
            let apply = Rc::clone(&apply);
            let listener = obs.add_listener(move |new, _old| apply(new));
            let owner = Owner::new();
            owner.auto_dispose(&listener);
            Some(BindingHandle { owner })
        }
        BindableValue::Reader(read) => {
            let computed = Computed::new(move |cx| read(cx));
            apply(&computed.get());
            let apply = Rc::clone(&apply);
            let listener = computed.add_listener(move |new, _old| apply(new));
            let owner = Owner::new();
            owner.auto_dispose(&listener);
            owner.auto_dispose(&computed);
            Some(BindingHandle { owner })
        }
        BindableValue::Foreign(read) => {
            apply(&read.peek());
            let apply = Rc::clone(&apply);
            let source = Rc::clone(&read);
            let listener = read.listen(Box::new(move || apply(&source.peek())));
            let owner = Owner::new();
            owner.on_dispose(move || listener.dispose());
            Some(BindingHandle { owner })
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
