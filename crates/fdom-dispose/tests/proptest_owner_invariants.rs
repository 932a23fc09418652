//! Property-based invariant tests for Owner and Holder.
//!
//! 1. Every registered entry is disposed exactly once, regardless of the
//!    mix of entries and nested owners.
//! 2. Disposal order is the exact reverse of registration order.
//! 3. Holder assignment sequences leave at most one live occupant.

use std::cell::RefCell;
use std::rc::Rc;

use fdom_dispose::{Disposable, Disposer, Holder, Owner};
use proptest::prelude::*;

proptest! {
    #[test]
    fn every_entry_disposed_exactly_once(count in 0usize..64) {
        let owner = Owner::new();
        let hits = Rc::new(RefCell::new(vec![0u32; count]));

        for i in 0..count {
            let hits = Rc::clone(&hits);
            owner.on_dispose(move || hits.borrow_mut()[i] += 1);
        }

        owner.dispose();
        owner.dispose();
        prop_assert!(hits.borrow().iter().all(|&h| h == 1));
    }

    #[test]
    fn disposal_is_reverse_registration(count in 1usize..64) {
        let owner = Owner::new();
        let order = Rc::new(RefCell::new(Vec::new()));

        for i in 0..count {
            let order = Rc::clone(&order);
            owner.on_dispose(move || order.borrow_mut().push(i));
        }

        owner.dispose();
        let expected: Vec<usize> = (0..count).rev().collect();
        prop_assert_eq!(&*order.borrow(), &expected);
    }

    #[test]
    fn holder_keeps_at_most_one_live_occupant(assignments in 1usize..32) {
        let holder = Holder::new();
        let live = Rc::new(RefCell::new(0i32));

        for _ in 0..assignments {
            let live_up = Rc::clone(&live);
            *live_up.borrow_mut() += 1;
            let live_down = Rc::clone(&live);
            holder.auto_dispose(Disposer::new(move || *live_down.borrow_mut() -= 1));
            prop_assert_eq!(*live.borrow(), 1);
        }

        holder.dispose();
        prop_assert_eq!(*live.borrow(), 0);
        prop_assert!(holder.is_disposed());
    }
}
