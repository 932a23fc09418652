#![forbid(unsafe_code)]

//! Array-driven regions: one node (or nothing) per array element, patched
//! by splices.
//!
//! # Design
//!
//! [`for_each`] installs a marker pair and drives the run between them
//! from a [`ComputedArray`] mapping each element to `Option<Node>`. A
//! splice on the source removes exactly the nodes of the deleted elements
//! (running their disposers) and inserts the added elements' nodes before
//! the next surviving node; any other change rebuilds the region. A node
//! that was detached externally is left alone — the region does not
//! dispose what it no longer contains.

use fdom_dispose::Disposable;
use fdom_reactive::{ComputedArray, ObsArray};

use crate::arg::DomArg;
use crate::dynamic::{Content, install_markers, replace_content};
use crate::modifiers::Modifier;
use crate::node::{Node, dom_dispose};

pub fn for_each<T: Clone + 'static>(
    source: &ObsArray<T>,
    item_fn: impl Fn(&T) -> Option<Node> + 'static,
) -> impl DomArg {
    let source = source.clone();
    Modifier::new(move |elem| {
        let (pre, post) = install_markers(elem);
        let mapped: ComputedArray<T, Option<Node>> = ComputedArray::map(&source, item_fn);

        // Ownership: mapped-out nodes still sitting in the region are
        // removed and disposed; externally detached ones are skipped.
        let post_for_disposer = post.clone();
        mapped.set_item_disposer(move |node: &Option<Node>| {
            let Some(node) = node else { return };
            let Some(node_parent) = node.parent() else {
                return;
            };
            if Some(&node_parent) == post_for_disposer.parent().as_ref() {
                node_parent.remove_child(node);
                dom_dispose(node);
            }
        });

        let pre_for_listener = pre.clone();
        let post_for_listener = post.clone();
        let region_listener = mapped.out().add_listener(move |contents, splice| {
            let Some(parent) = post_for_listener.parent() else {
                return;
            };
            match splice {
                Some(sp) => {
                    // Insert before the first surviving node after the
                    // added block (deleted nodes are still present here;
                    // the item disposer removes them right after).
                    let anchor = contents[sp.start + sp.num_added..]
                        .iter()
                        .flatten()
                        .find(|n| n.parent().as_ref() == Some(&parent))
                        .cloned()
                        .unwrap_or_else(|| post_for_listener.clone());
                    for node in contents[sp.start..sp.start + sp.num_added].iter().flatten() {
                        parent.insert_before(node, Some(&anchor));
                    }
                }
                None => {
                    replace_content(&pre_for_listener, &post_for_listener, Content::Empty);
                    for node in contents.iter().flatten() {
                        parent.insert_before(node, Some(&post_for_listener));
                    }
                }
            }
        });

        // Initial render.
        if let Some(parent) = post.parent() {
            for node in mapped.out().get().iter().flatten() {
                parent.insert_before(node, Some(&post));
            }
        }

        let mapped_for_dispose = mapped.clone();
        post.on_dispose(move |_| {
            region_listener.dispose();
            mapped_for_dispose.dispose();
        });
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::element;
    use crate::modifiers::on_dispose;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn item(label: &str, log: &Rc<RefCell<Vec<String>>>) -> Option<Node> {
        let log = Rc::clone(log);
        let tag = label.to_string();
        element("li", (label.to_string(), on_dispose(move |_| log.borrow_mut().push(tag))))
            .ok()
    }

    #[test]
    fn initial_render_in_order() {
        let arr = ObsArray::new(vec!["x".to_string(), "y".to_string()]);
        let elem = element(
            "ul",
            for_each(&arr, |s: &String| element("li", s.clone()).ok()),
        )
        .unwrap();
        assert_eq!(elem.inner_html(), "<!----><li>x</li><li>y</li><!---->");
    }

    #[test]
    fn splice_patches_region() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let arr = ObsArray::new(vec!["x".to_string(), "y".to_string(), "z".to_string()]);
        let log_for_fn = Rc::clone(&log);
        let elem = element(
            "ul",
            for_each(&arr, move |s: &String| item(s, &log_for_fn)),
        )
        .unwrap();
        assert_eq!(
            elem.inner_html(),
            "<!----><li>x</li><li>y</li><li>z</li><!---->"
        );

        arr.splice(1, 1, vec!["p".to_string(), "q".to_string()]);
        assert_eq!(
            elem.inner_html(),
            "<!----><li>x</li><li>p</li><li>q</li><li>z</li><!---->"
        );
        // The removed element's node ran its disposers.
        assert_eq!(*log.borrow(), vec!["y".to_string()]);
    }

    #[test]
    fn push_and_pop_at_the_edges() {
        let arr = ObsArray::new(vec!["a".to_string()]);
        let elem = element(
            "ul",
            for_each(&arr, |s: &String| element("li", s.clone()).ok()),
        )
        .unwrap();

        arr.push("b".to_string());
        assert_eq!(elem.inner_html(), "<!----><li>a</li><li>b</li><!---->");

        arr.unshift("start".to_string());
        assert_eq!(
            elem.inner_html(),
            "<!----><li>start</li><li>a</li><li>b</li><!---->"
        );

        arr.pop();
        assert_eq!(elem.inner_html(), "<!----><li>start</li><li>a</li><!---->");

        arr.shift();
        assert_eq!(elem.inner_html(), "<!----><li>a</li><!---->");
    }

    #[test]
    fn none_items_render_nothing() {
        let arr = ObsArray::new(vec![1, 2, 3, 4]);
        let elem = element(
            "ul",
            for_each(&arr, |n: &i32| {
                if n % 2 == 0 {
                    element("li", n.to_string()).ok()
                } else {
                    None
                }
            }),
        )
        .unwrap();
        assert_eq!(elem.inner_html(), "<!----><li>2</li><li>4</li><!---->");

        arr.splice(0, 1, Vec::new()); // Remove the 1 (no node).
        assert_eq!(elem.inner_html(), "<!----><li>2</li><li>4</li><!---->");

        arr.unshift(6);
        assert_eq!(
            elem.inner_html(),
            "<!----><li>6</li><li>2</li><li>4</li><!---->"
        );
    }

    #[test]
    fn full_replace_rebuilds_region() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let arr = ObsArray::new(vec!["a".to_string(), "b".to_string()]);
        let log_for_fn = Rc::clone(&log);
        let elem = element(
            "ul",
            for_each(&arr, move |s: &String| item(s, &log_for_fn)),
        )
        .unwrap();

        arr.set(vec!["c".to_string()]);
        assert_eq!(elem.inner_html(), "<!----><li>c</li><!---->");
        let mut disposed = log.borrow().clone();
        disposed.sort();
        assert_eq!(disposed, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn externally_removed_nodes_are_left_alone() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let arr = ObsArray::new(vec!["a".to_string(), "b".to_string()]);
        let log_for_fn = Rc::clone(&log);
        let elem = element(
            "ul",
            for_each(&arr, move |s: &String| item(s, &log_for_fn)),
        )
        .unwrap();

        // Detach the first item's node out from under the region.
        let first_li = elem.children()[1].clone();
        assert_eq!(first_li.tag().as_deref(), Some("li"));
        elem.remove_child(&first_li);

        arr.splice(0, 1, Vec::new());
        // The externally removed node was not disposed by the region.
        assert!(log.borrow().is_empty());
        assert_eq!(elem.inner_html(), "<!----><li>b</li><!---->");
    }

    #[test]
    fn region_teardown_disposes_items_once() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let arr = ObsArray::new(vec!["a".to_string(), "b".to_string()]);
        let log_for_fn = Rc::clone(&log);
        let elem = element(
            "ul",
            for_each(&arr, move |s: &String| item(s, &log_for_fn)),
        )
        .unwrap();

        dom_dispose(&elem);
        let mut disposed = log.borrow().clone();
        disposed.sort();
        assert_eq!(disposed, vec!["a".to_string(), "b".to_string()]);
        assert!(!arr.has_listeners());

        // Mutations after teardown do not touch the dead region.
        arr.push("c".to_string());
        assert_eq!(log.borrow().iter().filter(|s| s.as_str() == "c").count(), 0);
    }
}
