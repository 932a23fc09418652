#![forbid(unsafe_code)]

//! Element construction: the tag-string grammar and the builder entry
//! points.
//!
//! Grammar: `TAG ("#" ID)? ("." CLASS)*` — at most one id, any number of
//! classes, and the id must come before every class. `element("div#main.a.b",
//! ...)` is `<div id="main" class="a b">`.
//!
//! If applying any argument fails, the partially built element is disposed
//! (its whole subtree, disposer chains included) before the error
//! propagates: a failed construction never leaks bindings.

use crate::arg::DomArg;
use crate::document::current_document;
use crate::error::DomError;
use crate::node::{Namespace, Node, dom_dispose};

struct TagSpec {
    tag: String,
    id: Option<String>,
    classes: Vec<String>,
}

/// Which segment of the tag string the next characters belong to.
enum Seg {
    Tag,
    Id,
    Class,
}

fn commit_segment(
    spec: &str,
    out: &mut TagSpec,
    seg: &Seg,
    current: &mut String,
) -> Result<(), DomError> {
    if current.is_empty() {
        return Err(match seg {
            Seg::Tag => DomError::EmptyTag {
                spec: spec.to_string(),
            },
            Seg::Id | Seg::Class => DomError::EmptySegment {
                spec: spec.to_string(),
            },
        });
    }
    match seg {
        Seg::Tag => out.tag = std::mem::take(current),
        Seg::Id => out.id = Some(std::mem::take(current)),
        Seg::Class => out.classes.push(std::mem::take(current)),
    }
    Ok(())
}

fn parse_tag(spec: &str) -> Result<TagSpec, DomError> {
    let mut out = TagSpec {
        tag: String::new(),
        id: None,
        classes: Vec::new(),
    };
    let mut seg = Seg::Tag;
    let mut current = String::new();
    let mut seen_class = false;

    for ch in spec.chars() {
        match ch {
            '#' => {
                commit_segment(spec, &mut out, &seg, &mut current)?;
                if seen_class {
                    return Err(DomError::IdAfterClass {
                        spec: spec.to_string(),
                    });
                }
                if out.id.is_some() {
                    return Err(DomError::DuplicateId {
                        spec: spec.to_string(),
                    });
                }
                seg = Seg::Id;
            }
            '.' => {
                commit_segment(spec, &mut out, &seg, &mut current)?;
                seen_class = true;
                seg = Seg::Class;
            }
            _ => current.push(ch),
        }
    }
    commit_segment(spec, &mut out, &seg, &mut current)?;
    Ok(out)
}

fn build(spec: &str, ns: Namespace, args: impl DomArg) -> Result<Node, DomError> {
    let parsed = parse_tag(spec)?;
    let elem = current_document().create_element(&parsed.tag, ns);
    if let Some(id) = &parsed.id {
        elem.set_attr("id", id);
    }
    for class in &parsed.classes {
        elem.add_class(class);
    }
    match args.apply_to(&elem) {
        Ok(()) => Ok(elem),
        Err(err) => {
            // Everything attached so far gets its teardown before the
            // error leaves this frame.
            dom_dispose(&elem);
            Err(err)
        }
    }
}

/// Build an HTML element from a tag string and arguments.
pub fn element(spec: &str, args: impl DomArg) -> Result<Node, DomError> {
    build(spec, Namespace::Html, args)
}

/// Build an SVG-namespace element.
pub fn svg(spec: &str, args: impl DomArg) -> Result<Node, DomError> {
    build(spec, Namespace::Svg, args)
}

/// Build a document fragment holding the given children.
pub fn fragment(args: impl DomArg) -> Result<Node, DomError> {
    let frag = current_document().create_fragment();
    match args.apply_to(&frag) {
        Ok(()) => Ok(frag),
        Err(err) => {
            dom_dispose(&frag);
            Err(err)
        }
    }
}

/// Apply more arguments to an existing element.
pub fn update(elem: &Node, args: impl DomArg) -> Result<(), DomError> {
    args.apply_to(elem)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
