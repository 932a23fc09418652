#![forbid(unsafe_code)]

//! Single-slot and multi-slot owners.
//!
//! A [`Holder`] owns at most one disposable at a time: assigning a new value
//! disposes the previous occupant. A holder and its occupant may reference
//! each other (the occupant's teardown should vacate the holder); the cycle
//! is broken by idempotent disposal plus lazy occupancy probing — a value
//! disposed externally makes the holder read as empty and is never disposed
//! a second time.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::disposable::Disposable;

struct HolderInner<D> {
    slot: RefCell<Option<D>>,
    disposed: Cell<bool>,
}

/// A single-slot owner.
///
/// # Invariants
///
/// 1. At most one live occupant at a time.
/// 2. Assignment disposes the previous occupant before installing the new.
/// 3. An occupant disposed externally is treated as absent and not
///    re-disposed.
pub struct Holder<D: Disposable> {
    inner: Rc<HolderInner<D>>,
}

impl<D: Disposable + Clone + 'static> Holder<D> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(HolderInner {
                slot: RefCell::new(None),
                disposed: Cell::new(false),
            }),
        }
    }

    /// Dispose the current occupant (if any live one remains) and install
    /// `resource` in its place. Returns a clone of the handle.
    ///
    /// # Panics
    ///
    /// Panics if the holder is already disposed.
    pub fn auto_dispose(&self, resource: D) -> D {
        assert!(!self.inner.disposed.get(), "auto_dispose on a disposed Holder");
        self.clear();
        *self.inner.slot.borrow_mut() = Some(resource.clone());
        resource
    }

    /// The current occupant, or `None` if the slot is vacant or the
    /// occupant was disposed externally (in which case the slot is pruned).
    #[must_use]
    pub fn get(&self) -> Option<D> {
        let mut slot = self.inner.slot.borrow_mut();
        match slot.as_ref() {
            Some(d) if d.is_disposed() => {
                *slot = None;
                None
            }
            Some(d) => Some(d.clone()),
            None => None,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.get().is_none()
    }

    /// Vacate the slot without disposing the occupant.
    pub fn release(&self) -> Option<D> {
        self.inner
            .slot
            .borrow_mut()
            .take()
            .filter(|d| !d.is_disposed())
    }

    /// Dispose the occupant and vacate the slot.
    pub fn clear(&self) {
        // Take before disposing: the occupant's teardown may reach back.
        let occupant = self.inner.slot.borrow_mut().take();
        if let Some(d) = occupant {
            d.dispose();
        }
    }
}

impl<D: Disposable + Clone + 'static> Default for Holder<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: Disposable> Clone for Holder<D> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<D: Disposable + Clone + 'static> Disposable for Holder<D> {
    fn dispose(&self) {
        if !self.inner.disposed.replace(true) {
            self.clear();
        }
    }

    fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }
}

impl<D: Disposable + Clone + 'static> std::fmt::Debug for Holder<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Holder")
            .field("occupied", &!self.is_empty())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

struct MultiHolderInner<D> {
    /// `None` means disposed.
    slots: RefCell<Option<Vec<D>>>,
}

/// An owner of any number of slots, disposed together in reverse order.
pub struct MultiHolder<D: Disposable> {
    inner: Rc<MultiHolderInner<D>>,
}

impl<D: Disposable + Clone + 'static> MultiHolder<D> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(MultiHolderInner {
                slots: RefCell::new(Some(Vec::new())),
            }),
        }
    }

    /// Append `resource` to the held set. Returns a clone of the handle.
    ///
    /// # Panics
    ///
    /// Panics if the holder is already disposed.
    pub fn auto_dispose(&self, resource: D) -> D {
        let mut slots = self.inner.slots.borrow_mut();
        match slots.as_mut() {
            Some(list) => list.push(resource.clone()),
            None => panic!("auto_dispose on a disposed MultiHolder"),
        }
        resource
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.slots.borrow().as_ref().map_or(0, Vec::len)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Empty the holder without disposing, handing the resources back.
    pub fn release(&self) -> Vec<D> {
        self.inner
            .slots
            .borrow_mut()
            .as_mut()
            .map(std::mem::take)
            .unwrap_or_default()
    }

    /// Dispose every held resource, newest first, leaving the holder usable.
    pub fn clear(&self) {
        let taken = self
            .inner
            .slots
            .borrow_mut()
            .as_mut()
            .map(std::mem::take);
        if let Some(list) = taken {
            for d in list.into_iter().rev() {
                d.dispose();
            }
        }
    }
}

impl<D: Disposable + Clone + 'static> Default for MultiHolder<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: Disposable> Clone for MultiHolder<D> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<D: Disposable + Clone + 'static> Disposable for MultiHolder<D> {
    fn dispose(&self) {
        let taken = self.inner.slots.borrow_mut().take();
        if let Some(list) = taken {
            for d in list.into_iter().rev() {
                d.dispose();
            }
        }
    }

    fn is_disposed(&self) -> bool {
        self.inner.slots.borrow().is_none()
    }
}

impl<D: Disposable + Clone + 'static> std::fmt::Debug for MultiHolder<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultiHolder")
            .field("held", &self.len())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disposable::Disposer;

    #[test]
    fn assignment_disposes_previous() {
        let holder = Holder::new();
        let first = Disposer::new(|| {});
        let second = Disposer::new(|| {});

        holder.auto_dispose(first.clone());
        assert!(!first.is_disposed());

        holder.auto_dispose(second.clone());
        assert!(first.is_disposed());
        assert!(!second.is_disposed());
    }

    #[test]
    fn external_disposal_empties_holder() {
        let holder = Holder::new();
        let held = Disposer::new(|| {});
        holder.auto_dispose(held.clone());

        held.dispose();
        assert!(holder.is_empty());
        assert!(holder.get().is_none());

        // Replacing afterwards must not re-dispose the old occupant; the
        // Disposer's one-shot closure already ran exactly once.
        holder.auto_dispose(Disposer::new(|| {}));
    }

    #[test]
    fn release_keeps_occupant_alive() {
        let holder = Holder::new();
        let held = Disposer::new(|| {});
        holder.auto_dispose(held.clone());

        let released = holder.release().expect("occupant");
        assert!(!released.is_disposed());
        assert!(holder.is_empty());
    }

    #[test]
    fn clear_disposes_and_empties() {
        let holder = Holder::new();
        let held = Disposer::new(|| {});
        holder.auto_dispose(held.clone());

        holder.clear();
        assert!(held.is_disposed());
        assert!(holder.is_empty());

        // Holder itself is still usable after clear.
        assert!(!holder.is_disposed());
    }

    #[test]
    fn dispose_equals_clear() {
        let holder = Holder::new();
        let held = Disposer::new(|| {});
        holder.auto_dispose(held.clone());

        holder.dispose();
        assert!(held.is_disposed());
        assert!(holder.is_disposed());
        holder.dispose(); // Idempotent.
    }

    #[test]
    fn multi_holder_disposes_in_reverse() {
        use std::cell::RefCell;
        use std::rc::Rc;

        let holder = MultiHolder::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        for tag in ['a', 'b', 'c'] {
            let log = Rc::clone(&log);
            holder.auto_dispose(Disposer::new(move || log.borrow_mut().push(tag)));
        }

        assert_eq!(holder.len(), 3);
        holder.dispose();
        assert_eq!(*log.borrow(), vec!['c', 'b', 'a']);
        assert!(holder.is_disposed());
    }

    #[test]
    fn multi_holder_clear_keeps_holder_usable() {
        let holder = MultiHolder::new();
        let held = Disposer::new(|| {});
        holder.auto_dispose(held.clone());

        holder.clear();
        assert!(held.is_disposed());
        assert!(!holder.is_disposed());
        holder.auto_dispose(Disposer::new(|| {}));
        assert_eq!(holder.len(), 1);
    }

    #[test]
    #[should_panic(expected = "disposed MultiHolder")]
    fn multi_holder_rejects_after_dispose() {
        let holder = MultiHolder::new();
        holder.dispose();
        holder.auto_dispose(Disposer::new(|| {}));
    }
}
