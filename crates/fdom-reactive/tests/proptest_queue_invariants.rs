//! Property-based invariant tests for the priority queue and the drain.
//!
//! 1. The heap pops in non-decreasing predicate order for arbitrary inputs.
//! 2. After a drain, no DepItem is left enqueued.
//! 3. Nodes queued in one drain run in non-decreasing priority order, which
//!    implies dependencies-before-dependents for any priority-consistent
//!    graph.

use std::cell::RefCell;
use std::rc::Rc;

use fdom_reactive::{DepItem, PriorityQueue, bundle_changes};
use proptest::prelude::*;

/// Build a DepItem whose priority is exactly `priority`, via a dependency
/// chain, the way evaluation establishes priorities in the real graph.
fn item_at(priority: u32, recompute: Rc<dyn Fn()>) -> DepItem {
    let item = DepItem::new(move || recompute());
    if priority == 0 {
        return item;
    }
    let below = item_at(priority - 1, Rc::new(|| {}));
    item.use_dep(if priority == 1 { None } else { Some(&below) });
    assert_eq!(item.priority(), priority);
    item
}

proptest! {
    #[test]
    fn heap_pops_sorted(values in prop::collection::vec(0u32..1000, 0..200)) {
        let mut queue = PriorityQueue::new(|a: &u32, b: &u32| a < b);
        for v in &values {
            queue.push(*v);
        }
        let mut drained = Vec::new();
        while let Some(v) = queue.pop() {
            drained.push(v);
        }
        let mut expected = values.clone();
        expected.sort_unstable();
        prop_assert_eq!(drained, expected);
    }

    #[test]
    fn heap_peek_is_minimum(values in prop::collection::vec(0u32..1000, 1..100)) {
        let mut queue = PriorityQueue::new(|a: &u32, b: &u32| a < b);
        for v in &values {
            queue.push(*v);
        }
        prop_assert_eq!(queue.peek().copied(), values.iter().min().copied());
    }

    #[test]
    fn drain_respects_priorities(priorities in prop::collection::vec(0u32..6, 1..40)) {
        let order = Rc::new(RefCell::new(Vec::new()));
        let items: Vec<DepItem> = priorities
            .iter()
            .map(|&p| {
                let order = Rc::clone(&order);
                item_at(p, Rc::new(move || order.borrow_mut().push(p)))
            })
            .collect();

        bundle_changes(|| {
            for item in &items {
                item.enqueue();
            }
        });

        // Every queued node ran, none is left latched.
        prop_assert_eq!(order.borrow().len(), items.len());
        for item in &items {
            prop_assert!(!item.is_enqueued());
        }
        // Non-decreasing priority order.
        let ran = order.borrow();
        for pair in ran.windows(2) {
            prop_assert!(pair[0] <= pair[1], "drain order violated: {:?}", *ran);
        }
    }
}
