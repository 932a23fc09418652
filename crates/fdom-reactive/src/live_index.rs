#![forbid(unsafe_code)]

//! An index into an observable array that survives splices.
//!
//! The index is clamped to `[0, len)` and is `None` exactly when the array
//! is empty. On a splice it moves so that it keeps referencing the same
//! element; if that element was deleted it lands on the insertion point
//! just past the replacement block. The live flag can be turned off to
//! freeze the index (clamping still applies, an index must never dangle).

use std::cell::Cell;
use std::rc::Rc;

use fdom_dispose::Disposable;

use crate::obs_array::ObsArray;
use crate::observable::{ChangeListener, Observable};

struct LiveIndexInner {
    obs: Observable<Option<usize>>,
    live: Cell<bool>,
    /// Length after the last array event; the clamp bound for `set`.
    len: Cell<usize>,
    listener: Box<dyn Disposable>,
}

impl Drop for LiveIndexInner {
    fn drop(&mut self) {
        self.listener.dispose();
    }
}

/// An observable index bound to an [`ObsArray`].
pub struct LiveIndex {
    inner: Rc<LiveIndexInner>,
}

impl LiveIndex {
    pub fn new<T: Clone + 'static>(array: &ObsArray<T>, start: Option<usize>) -> Self {
        let obs = Observable::new(clamp(start, array.len()));

        let obs_for_listener = obs.clone();
        let inner = Rc::new_cyclic(|weak: &std::rc::Weak<LiveIndexInner>| {
            let weak = weak.clone();
            let listener = array.add_listener(move |items: &[T], splice| {
                let Some(inner) = weak.upgrade() else { return };
                inner.len.set(items.len());
                let adjusted = match splice {
                    Some(sp) if inner.live.get() => {
                        adjust(obs_for_listener.get(), sp.start, sp.deleted.len(), sp.num_added)
                    }
                    _ => obs_for_listener.get(),
                };
                obs_for_listener.set(clamp(adjusted, items.len()));
            });
            LiveIndexInner {
                obs,
                live: Cell::new(true),
                len: Cell::new(array.len()),
                listener: Box::new(listener),
            }
        });
        Self { inner }
    }

    #[must_use]
    pub fn get(&self) -> Option<usize> {
        self.inner.obs.get()
    }

    /// Move the index; the target is clamped against the array length.
    pub fn set(&self, index: Option<usize>) {
        self.inner.obs.set(clamp(index, self.inner.len.get()));
    }

    /// Toggle splice tracking. While off, only clamping applies.
    pub fn set_live(&self, live: bool) {
        self.inner.live.set(live);
    }

    #[must_use]
    pub fn is_live(&self) -> bool {
        self.inner.live.get()
    }

    pub fn add_listener(
        &self,
        cb: impl Fn(&Option<usize>, &Option<usize>) + 'static,
    ) -> ChangeListener<Option<usize>> {
        self.inner.obs.add_listener(cb)
    }

    /// The underlying observable, for use as a dependency.
    #[must_use]
    pub fn observable(&self) -> Observable<Option<usize>> {
        self.inner.obs.clone()
    }
}

fn clamp(index: Option<usize>, len: usize) -> Option<usize> {
    if len == 0 {
        return None;
    }
    Some(index.unwrap_or(0).min(len - 1))
}

fn adjust(
    index: Option<usize>,
    start: usize,
    num_deleted: usize,
    num_added: usize,
) -> Option<usize> {
    let i = index?;
    if i < start {
        Some(i)
    } else if i < start + num_deleted {
        // The referenced element is gone: land just past the inserted
        // block (the insertion point after the deletion).
        Some(start + num_added)
    } else {
        Some(i - num_deleted + num_added)
    }
}

impl Clone for LiveIndex {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl Disposable for LiveIndex {
    fn dispose(&self) {
        self.inner.listener.dispose();
        self.inner.obs.dispose();
    }

    fn is_disposed(&self) -> bool {
        self.inner.obs.is_disposed()
    }
}

impl std::fmt::Debug for LiveIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveIndex")
            .field("index", &self.inner.obs.get())
            .field("live", &self.inner.live.get())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
