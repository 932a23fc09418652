#![forbid(unsafe_code)]

//! The node factory and the replaceable-document stack.
//!
//! Builders never construct nodes directly; they go through the current
//! [`Document`]. Tests (and alternative backends) push their own document,
//! do their work, and pop it — the whole environment is swappable in one
//! move.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::node::{Namespace, Node};

struct DocumentInner {
    created: Cell<usize>,
}

/// A node factory. Cloning clones the handle.
pub struct Document {
    inner: Rc<DocumentInner>,
}

impl Document {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(DocumentInner {
                created: Cell::new(0),
            }),
        }
    }

    #[must_use]
    pub fn create_element(&self, tag: &str, ns: Namespace) -> Node {
        self.bump();
        Node::new_element(tag, ns)
    }

    #[must_use]
    pub fn create_text(&self, text: &str) -> Node {
        self.bump();
        Node::new_text(text)
    }

    #[must_use]
    pub fn create_comment(&self, text: &str) -> Node {
        self.bump();
        Node::new_comment(text)
    }

    #[must_use]
    pub fn create_fragment(&self) -> Node {
        self.bump();
        Node::new_fragment()
    }

    /// Number of nodes this document has created. A cheap leak probe for
    /// tests.
    #[must_use]
    pub fn created_count(&self) -> usize {
        self.inner.created.get()
    }

    fn bump(&self) {
        self.inner.created.set(self.inner.created.get() + 1);
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for Document {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("created", &self.created_count())
            .finish()
    }
}

thread_local! {
    static DOC_STACK: RefCell<Vec<Document>> = const { RefCell::new(Vec::new()) };
}

/// The document on top of the stack; a default one is installed lazily.
#[must_use]
pub fn current_document() -> Document {
    DOC_STACK.with_borrow_mut(|stack| {
        if stack.is_empty() {
            stack.push(Document::new());
        }
        stack.last().expect("non-empty").clone()
    })
}

/// Make `doc` the current document until the matching
/// [`pop_document`].
pub fn push_document(doc: Document) {
    DOC_STACK.with_borrow_mut(|stack| stack.push(doc));
}

/// Undo the most recent [`push_document`].
pub fn pop_document() -> Option<Document> {
    DOC_STACK.with_borrow_mut(Vec::pop)
}

/// Run `f` with `doc` current, restoring the previous document afterwards
/// (also on unwind).
pub fn with_document<R>(doc: Document, f: impl FnOnce() -> R) -> R {
    push_document(doc);
    struct PopGuard;
    impl Drop for PopGuard {
        fn drop(&mut self) {
            pop_document();
        }
    }
    let _guard = PopGuard;
    f()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
