#![forbid(unsafe_code)]

//! The retained node tree and its teardown discipline.
//!
//! # Design
//!
//! A [`Node`] is a cheap-clone handle onto one tree node: element, text,
//! comment, or fragment. Children hold strong references, parents weak
//! ones, so dropping the last external handle to a detached subtree frees
//! it.
//!
//! Per-node state that a browser runtime would key through global weak
//! maps lives in hidden fields instead: the disposer chain and the
//! user-data dictionary. The cost of that substitution is explicit
//! teardown — [`dom_dispose`] must run on any subtree that carried
//! bindings.
//!
//! # Invariants
//!
//! 1. A node has at most one parent; attaching it elsewhere detaches it
//!    first.
//! 2. [`dom_dispose`] visits the subtree post-order and drains each node's
//!    disposer chain in reverse registration order, each disposer at most
//!    once.
//! 3. A panicking disposer is logged and skipped; the rest of the chain
//!    and the rest of the tree still run.

use std::any::Any;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::{Rc, Weak};

use ahash::AHashMap;

/// Element namespace: plain HTML or SVG.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    Html,
    Svg,
}

pub(crate) enum NodeKind {
    Element {
        tag: String,
        ns: Namespace,
        attrs: RefCell<BTreeMap<String, String>>,
    },
    Text(RefCell<String>),
    Comment(String),
    Fragment,
}

type ElemDisposer = Box<dyn FnOnce(&Node)>;

pub(crate) struct NodeInner {
    kind: NodeKind,
    parent: RefCell<Weak<NodeInner>>,
    children: RefCell<Vec<Node>>,
    disposers: RefCell<Vec<ElemDisposer>>,
    data: RefCell<AHashMap<String, Rc<dyn Any>>>,
}

/// Handle to one node of the retained tree.
pub struct Node {
    inner: Rc<NodeInner>,
}

impl Node {
    fn from_kind(kind: NodeKind) -> Self {
        Self {
            inner: Rc::new(NodeInner {
                kind,
                parent: RefCell::new(Weak::new()),
                children: RefCell::new(Vec::new()),
                disposers: RefCell::new(Vec::new()),
                data: RefCell::new(AHashMap::new()),
            }),
        }
    }

    pub(crate) fn new_element(tag: &str, ns: Namespace) -> Self {
        Self::from_kind(NodeKind::Element {
            tag: tag.to_string(),
            ns,
            attrs: RefCell::new(BTreeMap::new()),
        })
    }

    pub(crate) fn new_text(text: &str) -> Self {
        Self::from_kind(NodeKind::Text(RefCell::new(text.to_string())))
    }

    pub(crate) fn new_comment(text: &str) -> Self {
        Self::from_kind(NodeKind::Comment(text.to_string()))
    }

    pub(crate) fn new_fragment() -> Self {
        Self::from_kind(NodeKind::Fragment)
    }

    // -- classification ----------------------------------------------------

    #[must_use]
    pub fn is_element(&self) -> bool {
        matches!(self.inner.kind, NodeKind::Element { .. })
    }

    #[must_use]
    pub fn is_text(&self) -> bool {
        matches!(self.inner.kind, NodeKind::Text(_))
    }

    #[must_use]
    pub fn is_comment(&self) -> bool {
        matches!(self.inner.kind, NodeKind::Comment(_))
    }

    #[must_use]
    pub fn is_fragment(&self) -> bool {
        matches!(self.inner.kind, NodeKind::Fragment)
    }

    /// Element tag name, lowercase as given.
    #[must_use]
    pub fn tag(&self) -> Option<String> {
        match &self.inner.kind {
            NodeKind::Element { tag, .. } => Some(tag.clone()),
            _ => None,
        }
    }

    #[must_use]
    pub fn namespace(&self) -> Option<Namespace> {
        match &self.inner.kind {
            NodeKind::Element { ns, .. } => Some(*ns),
            _ => None,
        }
    }

    // -- text --------------------------------------------------------------

    /// Text content of a text node.
    #[must_use]
    pub fn text(&self) -> Option<String> {
        match &self.inner.kind {
            NodeKind::Text(text) => Some(text.borrow().clone()),
            _ => None,
        }
    }

    /// Replace the content of a text node; no-op on other kinds.
    pub fn set_text(&self, text: &str) {
        if let NodeKind::Text(slot) = &self.inner.kind {
            *slot.borrow_mut() = text.to_string();
        }
    }

    // -- attributes --------------------------------------------------------

    #[must_use]
    pub fn attr(&self, name: &str) -> Option<String> {
        match &self.inner.kind {
            NodeKind::Element { attrs, .. } => attrs.borrow().get(name).cloned(),
            _ => None,
        }
    }

    pub fn set_attr(&self, name: &str, value: &str) {
        if let NodeKind::Element { attrs, .. } = &self.inner.kind {
            attrs.borrow_mut().insert(name.to_string(), value.to_string());
        }
    }

    pub fn remove_attr(&self, name: &str) {
        if let NodeKind::Element { attrs, .. } = &self.inner.kind {
            attrs.borrow_mut().remove(name);
        }
    }

    #[must_use]
    pub fn has_attr(&self, name: &str) -> bool {
        match &self.inner.kind {
            NodeKind::Element { attrs, .. } => attrs.borrow().contains_key(name),
            _ => false,
        }
    }

    /// Add one class token to the `class` attribute.
    pub fn add_class(&self, name: &str) {
        if name.is_empty() || self.has_class(name) {
            return;
        }
        let current = self.attr("class").unwrap_or_default();
        let joined = if current.is_empty() {
            name.to_string()
        } else {
            format!("{current} {name}")
        };
        self.set_attr("class", &joined);
    }

    /// Remove one class token; drops the attribute when it empties.
    pub fn remove_class(&self, name: &str) {
        let Some(current) = self.attr("class") else {
            return;
        };
        let remaining: Vec<&str> = current.split_whitespace().filter(|c| *c != name).collect();
        if remaining.is_empty() {
            self.remove_attr("class");
        } else {
            self.set_attr("class", &remaining.join(" "));
        }
    }

    #[must_use]
    pub fn has_class(&self, name: &str) -> bool {
        self.attr("class")
            .is_some_and(|c| c.split_whitespace().any(|t| t == name))
    }

    // -- tree --------------------------------------------------------------

    #[must_use]
    pub fn parent(&self) -> Option<Node> {
        self.inner.parent.borrow().upgrade().map(|inner| Node { inner })
    }

    /// Snapshot of the children, in order.
    #[must_use]
    pub fn children(&self) -> Vec<Node> {
        self.inner.children.borrow().clone()
    }

    #[must_use]
    pub fn child_count(&self) -> usize {
        self.inner.children.borrow().len()
    }

    #[must_use]
    pub fn first_child(&self) -> Option<Node> {
        self.inner.children.borrow().first().cloned()
    }

    #[must_use]
    pub fn last_child(&self) -> Option<Node> {
        self.inner.children.borrow().last().cloned()
    }

    #[must_use]
    pub fn next_sibling(&self) -> Option<Node> {
        let parent = self.parent()?;
        let index = parent.index_of(self)?;
        parent.inner.children.borrow().get(index + 1).cloned()
    }

    #[must_use]
    pub fn prev_sibling(&self) -> Option<Node> {
        let parent = self.parent()?;
        let index = parent.index_of(self)?;
        if index == 0 {
            None
        } else {
            parent.inner.children.borrow().get(index - 1).cloned()
        }
    }

    pub(crate) fn index_of(&self, child: &Node) -> Option<usize> {
        self.inner.children.borrow().iter().position(|c| c == child)
    }

    /// Append `child` (moving it out of any previous parent). Appending a
    /// fragment moves the fragment's children.
    pub fn append_child(&self, child: &Node) {
        self.insert_before(child, None);
    }

    /// Insert `child` before `reference` (or append when `None`).
    ///
    /// # Panics
    ///
    /// Panics if `reference` is given and is not a child of `self`.
    pub fn insert_before(&self, child: &Node, reference: Option<&Node>) {
        if child.is_fragment() {
            let moved = std::mem::take(&mut *child.inner.children.borrow_mut());
            for c in &moved {
                *c.inner.parent.borrow_mut() = Weak::new();
                self.insert_before(c, reference);
            }
            return;
        }
        child.detach();
        let index = match reference {
            Some(r) => self
                .index_of(r)
                .expect("insert_before: reference is not a child"),
            None => self.inner.children.borrow().len(),
        };
        self.inner.children.borrow_mut().insert(index, child.clone());
        *child.inner.parent.borrow_mut() = Rc::downgrade(&self.inner);
    }

    /// Detach `child` without disposing it. No-op if it is not a child.
    pub fn remove_child(&self, child: &Node) {
        let Some(index) = self.index_of(child) else {
            return;
        };
        self.inner.children.borrow_mut().remove(index);
        *child.inner.parent.borrow_mut() = Weak::new();
    }

    /// Detach from the current parent, if any.
    pub fn detach(&self) {
        if let Some(parent) = self.parent() {
            parent.remove_child(self);
        }
    }

    // -- disposers and data -------------------------------------------------

    /// Register a teardown callback on this node. Callbacks run when the
    /// node's subtree is disposed, newest first.
    pub fn on_dispose(&self, f: impl FnOnce(&Node) + 'static) {
        self.inner.disposers.borrow_mut().push(Box::new(f));
    }

    pub(crate) fn set_data(&self, key: &str, value: Rc<dyn Any>) {
        self.inner.data.borrow_mut().insert(key.to_string(), value);
    }

    pub(crate) fn data(&self, key: &str) -> Option<Rc<dyn Any>> {
        self.inner.data.borrow().get(key).cloned()
    }

    pub(crate) fn remove_data(&self, key: &str) {
        self.inner.data.borrow_mut().remove(key);
    }

    // -- serialization (tests and debugging) --------------------------------

    /// Serialize the subtree as markup. Attribute order is deterministic.
    #[must_use]
    pub fn outer_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    /// Concatenated markup of the children.
    #[must_use]
    pub fn inner_html(&self) -> String {
        let mut out = String::new();
        for child in self.inner.children.borrow().iter() {
            child.write_html(&mut out);
        }
        out
    }

    fn write_html(&self, out: &mut String) {
        match &self.inner.kind {
            NodeKind::Element { tag, attrs, .. } => {
                let _ = write!(out, "<{tag}");
                for (name, value) in attrs.borrow().iter() {
                    let _ = write!(out, " {name}=\"{}\"", escape_attr(value));
                }
                out.push('>');
                for child in self.inner.children.borrow().iter() {
                    child.write_html(out);
                }
                let _ = write!(out, "</{tag}>");
            }
            NodeKind::Text(text) => out.push_str(&escape_text(&text.borrow())),
            NodeKind::Comment(text) => {
                let _ = write!(out, "<!--{text}-->");
            }
            NodeKind::Fragment => {
                for child in self.inner.children.borrow().iter() {
                    child.write_html(out);
                }
            }
        }
    }
}

fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn escape_attr(s: &str) -> String {
    escape_text(s).replace('"', "&quot;")
}

impl Clone for Node {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

/// Node identity: two handles are equal iff they are the same node.
impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Node {}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.inner.kind {
            NodeKind::Element { tag, .. } => write!(f, "Node(<{tag}>)"),
            NodeKind::Text(text) => write!(f, "Node(text {:?})", text.borrow()),
            NodeKind::Comment(text) => write!(f, "Node(comment {text:?})"),
            NodeKind::Fragment => write!(f, "Node(fragment)"),
        }
    }
}

/// Run every disposer in the subtree: children first (post-order), then
/// this node's chain in reverse registration order.
///
/// Nodes are not detached; only their teardown state is drained. Running
/// this twice on the same subtree is a no-op the second time.
pub fn dom_dispose(node: &Node) {
    for child in node.children() {
        dom_dispose(&child);
    }
    let drained = std::mem::take(&mut *node.inner.disposers.borrow_mut());
    for disposer in drained.into_iter().rev() {
        if catch_unwind(AssertUnwindSafe(|| disposer(node))).is_err() {
            tracing::error!(
                target: "fdom.dispose",
                node = ?node,
                "element disposer panicked; continuing teardown"
            );
        }
    }
    node.inner.data.borrow_mut().clear();
}

/// Free-function form of [`Node::on_dispose`], matching the binding layer's
/// call shape.
pub fn on_dispose_elem(node: &Node, f: impl FnOnce(&Node) + 'static) {
    node.on_dispose(f);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tree_links() {
        let parent = Node::new_element("div", Namespace::Html);
        let a = Node::new_text("a");
        let b = Node::new_text("b");
        parent.append_child(&a);
        parent.append_child(&b);

        assert_eq!(parent.child_count(), 2);
        assert_eq!(a.parent(), Some(parent.clone()));
        assert_eq!(a.next_sibling(), Some(b.clone()));
        assert_eq!(b.prev_sibling(), Some(a.clone()));
        assert_eq!(b.next_sibling(), None);
    }

    #[test]
    fn insert_before_positions() {
        let parent = Node::new_element("div", Namespace::Html);
        let a = Node::new_text("a");
        let c = Node::new_text("c");
        parent.append_child(&a);
        parent.append_child(&c);

        let b = Node::new_text("b");
        parent.insert_before(&b, Some(&c));
        assert_eq!(parent.inner_html(), "abc");
    }

    #[test]
    fn reattach_moves_node() {
        let first = Node::new_element("div", Namespace::Html);
        let second = Node::new_element("span", Namespace::Html);
        let child = Node::new_text("x");

        first.append_child(&child);
        second.append_child(&child);

        assert_eq!(first.child_count(), 0);
        assert_eq!(child.parent(), Some(second));
    }

    #[test]
    fn fragment_insertion_moves_children() {
        let parent = Node::new_element("div", Namespace::Html);
        let frag = Node::new_fragment();
        frag.append_child(&Node::new_text("a"));
        frag.append_child(&Node::new_text("b"));

        parent.append_child(&frag);
        assert_eq!(parent.inner_html(), "ab");
        assert_eq!(frag.child_count(), 0);
    }

    #[test]
    fn class_tokens() {
        let elem = Node::new_element("div", Namespace::Html);
        elem.add_class("a");
        elem.add_class("b");
        elem.add_class("a"); // Duplicate ignored.
        assert_eq!(elem.attr("class").as_deref(), Some("a b"));
        assert!(elem.has_class("b"));

        elem.remove_class("a");
        assert_eq!(elem.attr("class").as_deref(), Some("b"));
        elem.remove_class("b");
        assert!(!elem.has_attr("class"));
    }

    #[test]
    fn dispose_order_is_postorder_reverse_registration() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let root = Node::new_element("div", Namespace::Html);
        let child = Node::new_element("span", Namespace::Html);
        root.append_child(&child);

        for (node, tag) in [(&root, 'A'), (&child, 'B'), (&root, 'C')] {
            let log = Rc::clone(&log);
            node.on_dispose(move |_| log.borrow_mut().push(tag));
        }

        dom_dispose(&root);
        assert_eq!(*log.borrow(), vec!['B', 'C', 'A']);
    }

    #[test]
    fn dispose_is_drained_once() {
        let count = Rc::new(std::cell::Cell::new(0u32));
        let node = Node::new_element("div", Namespace::Html);
        let count_clone = Rc::clone(&count);
        node.on_dispose(move |_| count_clone.set(count_clone.get() + 1));

        dom_dispose(&node);
        dom_dispose(&node);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn panicking_disposer_does_not_stop_the_chain() {
        let ran = Rc::new(std::cell::Cell::new(false));
        let node = Node::new_element("div", Namespace::Html);
        let ran_clone = Rc::clone(&ran);
        node.on_dispose(move |_| ran_clone.set(true));
        node.on_dispose(|_| panic!("boom"));

        dom_dispose(&node);
        assert!(ran.get());
    }

    #[test]
    fn outer_html_escapes() {
        let elem = Node::new_element("div", Namespace::Html);
        elem.set_attr("title", "a\"b<c");
        elem.append_child(&Node::new_text("x < y & z"));
        assert_eq!(
            elem.outer_html(),
            "<div title=\"a&quot;b&lt;c\">x &lt; y &amp; z</div>"
        );
    }

    #[test]
    fn comment_markup() {
        let c = Node::new_comment("");
        assert_eq!(c.outer_html(), "<!---->");
    }
}
