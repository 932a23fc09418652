#![forbid(unsafe_code)]

//! FrankenDOM: a reactive-state core driving a direct-to-DOM toolkit.
//!
//! State lives in observable cells; derived cells recompute through a
//! priority scheduler that runs each dependent at most once per change;
//! ownership ties every listener, subscription, and live region to the
//! thing that created it; and the DOM layer binds cells straight onto a
//! retained node tree with no virtual tree in between.
//!
//! ```
//! use fdom::prelude::*;
//!
//! let name = observable("world".to_string());
//! let name_read = name.clone();
//! let view = element(
//!     "div#greeting",
//!     ("hello ", text(BindableValue::from_fn(move |cx| cx.get(&name_read)))),
//! )
//! .unwrap();
//!
//! assert_eq!(view.inner_html(), "hello world");
//! name.set("there".to_string());
//! assert_eq!(view.inner_html(), "hello there");
//! dom_dispose(&view);
//! ```

pub use fdom_dispose::{Disposable, Disposer, Holder, MultiHolder, Owner, Scoped};
pub use fdom_dom::{
    Apply, AttrValue, Content, Document, DomArg, DomError, Modifier, Namespace, Node, apply, attr,
    attr_opt, attrs, auto_dispose, auto_dispose_elem, bool_attr, cls, cls_if, cls_prefix,
    current_document, data, dom_computed, dom_dispose, element, for_each, fragment, get_data,
    get_prop, hide, maybe, on_dispose, on_dispose_elem, pop_document, prop, push_document,
    remove_data, replace_content, show, style, svg, text, update, with_document,
};
pub use fdom_reactive::{
    ArrayListener, BindableValue, BindingHandle, BundleScope, ChangeListener, Computed,
    ComputedArray, DepItem, Emitter, Listener, LiveIndex, ObsArray, Observable, PriorityQueue,
    PureComputed, ReactiveRead, Source, Splice, Subscription, UseCx, bind, bundle_changes, compute,
    is_bundling,
};

/// A value cell.
pub fn observable<T: Clone + 'static>(value: T) -> Observable<T> {
    Observable::new(value)
}

/// A sequence cell emitting splice descriptors.
pub fn obs_array<T: Clone + 'static>(items: Vec<T>) -> ObsArray<T> {
    ObsArray::new(items)
}

/// A derived cell over dynamically discovered dependencies. For static
/// dependency lists use [`Computed::new1`]..[`Computed::new3`].
pub fn computed<T: Clone + PartialEq + 'static>(
    read: impl Fn(&UseCx) -> T + 'static,
) -> Computed<T> {
    Computed::new(read)
}

/// A derived cell that suspends itself while unobserved.
pub fn pure_computed<T: Clone + PartialEq + 'static>(
    read: impl Fn(&UseCx) -> T + 'static,
) -> PureComputed<T> {
    PureComputed::new(read)
}

/// A side-effect binding over dynamically discovered dependencies. For
/// static dependency lists use [`Subscription::new1`]..[`Subscription::new3`].
pub fn subscribe(effect: impl Fn(&UseCx) + 'static) -> Subscription {
    Subscription::new(effect)
}

/// The working set: `use fdom::prelude::*;`.
pub mod prelude {
    pub use crate::{
        BindableValue, Computed, Disposable, Holder, ObsArray, Observable, Owner, PureComputed,
        Subscription, UseCx, attr, attrs, bundle_changes, cls, cls_if, computed, dom_computed,
        dom_dispose, element, for_each, fragment, maybe, obs_array, observable, on_dispose,
        pure_computed, show, style, subscribe, svg, text, update,
    };
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
