//! Property-based invariant tests for ObsArray splice semantics.
//!
//! 1. Contents always match a plain `Vec` model under arbitrary operation
//!    sequences.
//! 2. Every emitted splice descriptor satisfies
//!    `new.len() == old.len() - deleted.len() + num_added` and the added
//!    region equals the inserted elements.
//! 3. `push; pop` and `splice(i, 0, x); splice(i, 1)` are identities.

use std::cell::RefCell;
use std::rc::Rc;

use fdom_reactive::ObsArray;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Push(i32),
    Pop,
    Shift,
    Unshift(i32),
    Splice(isize, usize, Vec<i32>),
    Set(Vec<i32>),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        any::<i32>().prop_map(Op::Push),
        Just(Op::Pop),
        Just(Op::Shift),
        any::<i32>().prop_map(Op::Unshift),
        (-8isize..16, 0usize..6, prop::collection::vec(any::<i32>(), 0..4))
            .prop_map(|(s, d, items)| Op::Splice(s, d, items)),
        prop::collection::vec(any::<i32>(), 0..8).prop_map(Op::Set),
    ]
}

/// Apply one op to the reference model, mirroring the documented clamping.
fn apply_model(model: &mut Vec<i32>, op: &Op) {
    match op {
        Op::Push(v) => model.push(*v),
        Op::Pop => {
            model.pop();
        }
        Op::Shift => {
            if !model.is_empty() {
                model.remove(0);
            }
        }
        Op::Unshift(v) => model.insert(0, *v),
        Op::Splice(start, delete, items) => {
            let len = model.len();
            let start = if *start < 0 {
                len.saturating_sub(start.unsigned_abs())
            } else {
                (*start as usize).min(len)
            };
            let end = (start + delete).min(len);
            model.splice(start..end, items.iter().copied());
        }
        Op::Set(items) => *model = items.clone(),
    }
}

proptest! {
    #[test]
    fn contents_match_model(ops in prop::collection::vec(op_strategy(), 0..60)) {
        let arr = ObsArray::new(Vec::new());
        let mut model: Vec<i32> = Vec::new();

        for op in &ops {
            match op {
                Op::Push(v) => arr.push(*v),
                Op::Pop => {
                    arr.pop();
                }
                Op::Shift => {
                    arr.shift();
                }
                Op::Unshift(v) => arr.unshift(*v),
                Op::Splice(s, d, items) => {
                    arr.splice(*s, *d, items.clone());
                }
                Op::Set(items) => arr.set(items.clone()),
            }
            apply_model(&mut model, op);
            prop_assert_eq!(arr.get(), model.clone());
        }
    }

    #[test]
    fn splice_descriptors_are_consistent(ops in prop::collection::vec(op_strategy(), 0..60)) {
        let arr = ObsArray::new(Vec::new());
        let prev_len = Rc::new(RefCell::new(0usize));
        let violations = Rc::new(RefCell::new(Vec::new()));

        let prev_len_cb = Rc::clone(&prev_len);
        let violations_cb = Rc::clone(&violations);
        let _listener = arr.add_listener(move |items, splice| {
            let old_len = *prev_len_cb.borrow();
            if let Some(sp) = splice {
                let expected = old_len as i64 - sp.deleted.len() as i64 + sp.num_added as i64;
                if items.len() as i64 != expected {
                    violations_cb.borrow_mut().push(format!(
                        "length law: new={} old={} deleted={} added={}",
                        items.len(),
                        old_len,
                        sp.deleted.len(),
                        sp.num_added
                    ));
                }
                if sp.start + sp.num_added > items.len() {
                    violations_cb
                        .borrow_mut()
                        .push(format!("added region out of range: {sp:?}"));
                }
            }
            *prev_len_cb.borrow_mut() = items.len();
        });

        for op in &ops {
            match op {
                Op::Push(v) => arr.push(*v),
                Op::Pop => {
                    arr.pop();
                }
                Op::Shift => {
                    arr.shift();
                }
                Op::Unshift(v) => arr.unshift(*v),
                Op::Splice(s, d, items) => {
                    arr.splice(*s, *d, items.clone());
                }
                Op::Set(items) => arr.set(items.clone()),
            }
        }
        prop_assert!(violations.borrow().is_empty(), "{:?}", violations.borrow());
    }

    #[test]
    fn push_pop_is_identity(initial in prop::collection::vec(any::<i32>(), 0..8), v in any::<i32>()) {
        let arr = ObsArray::new(initial.clone());
        arr.push(v);
        prop_assert_eq!(arr.pop(), Some(v));
        prop_assert_eq!(arr.get(), initial);
    }

    #[test]
    fn insert_remove_is_identity(
        initial in prop::collection::vec(any::<i32>(), 0..8),
        at in 0usize..8,
        v in any::<i32>(),
    ) {
        let arr = ObsArray::new(initial.clone());
        let at = at.min(initial.len());
        arr.splice(at as isize, 0, vec![v]);
        arr.splice(at as isize, 1, Vec::new());
        prop_assert_eq!(arr.get(), initial);
    }
}
