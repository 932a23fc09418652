#![forbid(unsafe_code)]

//! Marker-bounded dynamic regions.
//!
//! # Design
//!
//! A dynamic region is the run of siblings strictly between two empty
//! comment nodes. The binding that created the markers owns every node
//! between them: [`replace_content`] disposes and removes the old run,
//! then inserts the new content before the closing marker. The binding's
//! own teardown is registered on the closing marker, so disposing the
//! enclosing element cascades into the region.

use fdom_dispose::Disposable;
use fdom_reactive::{BindableValue, bind};

use crate::arg::DomArg;
use crate::document::current_document;
use crate::node::{Node, dom_dispose};

/// Content installable into a dynamic region.
pub enum Content {
    Empty,
    Node(Node),
    Nodes(Vec<Node>),
    Text(String),
}

impl From<()> for Content {
    fn from((): ()) -> Self {
        Self::Empty
    }
}

impl From<Node> for Content {
    fn from(node: Node) -> Self {
        Self::Node(node)
    }
}

impl From<Option<Node>> for Content {
    fn from(node: Option<Node>) -> Self {
        match node {
            Some(node) => Self::Node(node),
            None => Self::Empty,
        }
    }
}

impl From<Vec<Node>> for Content {
    fn from(nodes: Vec<Node>) -> Self {
        Self::Nodes(nodes)
    }
}

impl From<String> for Content {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for Content {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl<N, E> From<Result<N, E>> for Content
where
    N: Into<Content>,
    E: std::fmt::Display,
{
    /// Content functions routinely call `element(...)`; a construction
    /// error inside a region collapses it to empty rather than poisoning
    /// the binding.
    fn from(result: Result<N, E>) -> Self {
        match result {
            Ok(content) => content.into(),
            Err(err) => {
                tracing::error!(target: "fdom.dom", %err, "dynamic region content failed");
                Self::Empty
            }
        }
    }
}

/// Dispose and remove every node strictly between the markers, then
/// install `content` before `marker_post`.
///
/// # Panics
///
/// Panics if the markers are not siblings under a common parent.
pub fn replace_content(marker_pre: &Node, marker_post: &Node, content: Content) {
    let parent = marker_post
        .parent()
        .expect("replace_content: markers are detached");

    // Walk out the old run.
    loop {
        let next = marker_pre
            .next_sibling()
            .expect("replace_content: markers are not siblings");
        if &next == marker_post {
            break;
        }
        parent.remove_child(&next);
        dom_dispose(&next);
    }

    match content {
        Content::Empty => {}
        Content::Node(node) => parent.insert_before(&node, Some(marker_post)),
        Content::Nodes(nodes) => {
            for node in &nodes {
                parent.insert_before(node, Some(marker_post));
            }
        }
        Content::Text(text) => {
            let node = current_document().create_text(&text);
            parent.insert_before(&node, Some(marker_post));
        }
    }
}

/// Create a pair of empty comment markers inside `elem` and return them.
pub(crate) fn install_markers(elem: &Node) -> (Node, Node) {
    let doc = current_document();
    let pre = doc.create_comment("");
    let post = doc.create_comment("");
    elem.append_child(&pre);
    elem.append_child(&post);
    (pre, post)
}

/// A region whose content tracks a bindable value through `content_fn`.
pub fn dom_computed<T, C>(
    value: impl Into<BindableValue<T>>,
    content_fn: impl Fn(&T) -> C + 'static,
) -> impl DomArg
where
    T: Clone + PartialEq + 'static,
    C: Into<Content>,
{
    let value = value.into();
    crate::modifiers::Modifier::new(move |elem| {
        let (pre, post) = install_markers(elem);
        let post_for_bind = post.clone();
        let handle = bind(value, move |v: &T| {
            replace_content(&pre, &post_for_bind, content_fn(v).into());
        });
        if let Some(handle) = handle {
            // Anchored to the closing marker: disposing the enclosing
            // element tears the binding down with the region.
            post.on_dispose(move |_| handle.dispose());
        }
    })
}

/// A region rendered only while the optional value is present.
pub fn maybe<T, C>(
    value: impl Into<BindableValue<Option<T>>>,
    content_fn: impl Fn(&T) -> C + 'static,
) -> impl DomArg
where
    T: Clone + PartialEq + 'static,
    C: Into<Content>,
{
    dom_computed(value, move |opt: &Option<T>| match opt {
        Some(v) => content_fn(v).into(),
        None => Content::Empty,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
