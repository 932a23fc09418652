#![forbid(unsafe_code)]

//! FrankenDOM binding layer: build a retained node tree directly from
//! reactive state, with no virtual tree in between.
//!
//! # Key pieces
//!
//! - [`element`] / [`svg`] / [`fragment`] / [`update`]: builders taking a
//!   tag string (`"div#id.class"`) and a tree of [`DomArg`] arguments.
//! - Modifiers ([`attr`], [`text`], [`cls_if`], [`show`], ...): arguments
//!   that bind attributes, content, and styling to reactive values.
//! - [`dom_computed`] / [`maybe`] / [`for_each`]: marker-bounded regions
//!   whose content tracks a cell or an observable array.
//! - [`dom_dispose`] / [`Node::on_dispose`]: the teardown discipline.
//!   Every binding registers its own teardown on the element it serves, so
//!   disposing a subtree detaches everything it caused, in post-order,
//!   reverse registration order per node.
//!
//! The tree itself is this crate's [`Node`]: a plain retained structure
//! with the same shape the binding layer would drive in a browser, and a
//! swappable [`Document`] factory underneath for tests.

pub mod arg;
pub mod builder;
pub mod document;
pub mod dynamic;
pub mod error;
pub mod foreach;
pub mod modifiers;
pub mod node;

pub use arg::{Apply, DomArg, apply};
pub use builder::{element, fragment, svg, update};
pub use document::{Document, current_document, pop_document, push_document, with_document};
pub use dynamic::{Content, dom_computed, maybe, replace_content};
pub use error::DomError;
pub use foreach::for_each;
pub use modifiers::{
    AttrValue, Modifier, attr, attr_opt, attrs, auto_dispose, auto_dispose_elem, bool_attr, cls,
    cls_if, cls_prefix, data, get_data, get_prop, hide, on_dispose, prop, remove_data, show, style,
    text,
};
pub use node::{Namespace, Node, dom_dispose, on_dispose_elem};
