#![forbid(unsafe_code)]

//! Element modifiers: the builder arguments that set attributes, bind
//! reactive values, and hook into element lifecycle.
//!
//! Every reactive modifier accepts an `impl Into<BindableValue<_>>`, so a
//! constant, a cell, or a reader closure all work. The binding's teardown
//! is registered on the element, which is what makes bound DOM leak-free:
//! disposing the element detaches every listener it caused.

use std::cell::RefCell;
use std::rc::Rc;

use fdom_dispose::Disposable;
use fdom_reactive::{BindableValue, bind};

use crate::arg::DomArg;
use crate::document::current_document;
use crate::error::DomError;
use crate::node::Node;

/// A deferred element mutation; the common shape of all modifiers.
pub struct Modifier(Box<dyn FnOnce(&Node)>);

impl Modifier {
    pub(crate) fn new(f: impl FnOnce(&Node) + 'static) -> Self {
        Self(Box::new(f))
    }
}

impl DomArg for Modifier {
    fn apply_to(self, elem: &Node) -> Result<(), DomError> {
        (self.0)(elem);
        Ok(())
    }
}

impl std::fmt::Debug for Modifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Modifier")
    }
}

/// Subscribe a binding and tie its teardown to `elem`.
fn bind_elem<T: Clone + PartialEq + 'static>(
    elem: &Node,
    value: BindableValue<T>,
    apply: impl Fn(&T) + 'static,
) {
    if let Some(handle) = bind(value, apply) {
        elem.on_dispose(move |_| handle.dispose());
    }
}

/// One attribute value with the removal semantics of the attribute map:
/// absent and `false` remove, `true` sets the empty string, text sets text.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Absent,
    Flag(bool),
    Text(String),
}

impl AttrValue {
    fn apply(&self, elem: &Node, name: &str) {
        match self {
            Self::Absent | Self::Flag(false) => elem.remove_attr(name),
            Self::Flag(true) => elem.set_attr(name, ""),
            Self::Text(text) => elem.set_attr(name, text),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<bool> for AttrValue {
    fn from(b: bool) -> Self {
        Self::Flag(b)
    }
}

impl From<Option<&str>> for AttrValue {
    fn from(o: Option<&str>) -> Self {
        match o {
            Some(s) => Self::Text(s.to_string()),
            None => Self::Absent,
        }
    }
}

impl From<Option<String>> for AttrValue {
    fn from(o: Option<String>) -> Self {
        match o {
            Some(s) => Self::Text(s),
            None => Self::Absent,
        }
    }
}

macro_rules! attr_value_from_display {
    ($($ty:ty),+) => {
        $(impl From<$ty> for AttrValue {
            fn from(v: $ty) -> Self {
                Self::Text(v.to_string())
            }
        })+
    };
}

attr_value_from_display!(i32, i64, u32, u64, usize, f64);

/// Set a batch of attributes at once, with the map value semantics.
pub fn attrs<V: Into<AttrValue> + Clone>(pairs: &[(&str, V)]) -> Modifier {
    let owned: Vec<(String, AttrValue)> = pairs
        .iter()
        .map(|(name, value)| ((*name).to_string(), value.clone().into()))
        .collect();
    Modifier(Box::new(move |elem| {
        for (name, value) in &owned {
            value.apply(elem, name);
        }
    }))
}

/// Bind one attribute to a string value.
pub fn attr(name: &str, value: impl Into<BindableValue<String>>) -> Modifier {
    let name = name.to_string();
    let value = value.into();
    Modifier(Box::new(move |elem| {
        let elem_ref = elem.clone();
        bind_elem(elem, value, move |text: &String| {
            elem_ref.set_attr(&name, text);
        });
    }))
}

/// Bind one attribute to an optional value; `None` removes it.
pub fn attr_opt(name: &str, value: impl Into<BindableValue<Option<String>>>) -> Modifier {
    let name = name.to_string();
    let value = value.into();
    Modifier(Box::new(move |elem| {
        let elem_ref = elem.clone();
        bind_elem(elem, value, move |text: &Option<String>| match text {
            Some(text) => elem_ref.set_attr(&name, text),
            None => elem_ref.remove_attr(&name),
        });
    }))
}

/// Bind a boolean attribute: present-and-empty when true, absent when
/// false.
pub fn bool_attr(name: &str, value: impl Into<BindableValue<bool>>) -> Modifier {
    let name = name.to_string();
    let value = value.into();
    Modifier(Box::new(move |elem| {
        let elem_ref = elem.clone();
        bind_elem(elem, value, move |on: &bool| {
            if *on {
                elem_ref.set_attr(&name, "");
            } else {
                elem_ref.remove_attr(&name);
            }
        });
    }))
}

/// Append a text node bound to a string value.
pub fn text(value: impl Into<BindableValue<String>>) -> Modifier {
    let value = value.into();
    Modifier(Box::new(move |elem| {
        let node = current_document().create_text("");
        elem.append_child(&node);
        let node_ref = node.clone();
        bind_elem(elem, value, move |text: &String| {
            node_ref.set_text(text);
        });
    }))
}

/// Bind one style property; the empty string removes it.
pub fn style(name: &str, value: impl Into<BindableValue<String>>) -> Modifier {
    let name = name.to_string();
    let value = value.into();
    Modifier(Box::new(move |elem| {
        let elem_ref = elem.clone();
        bind_elem(elem, value, move |text: &String| {
            set_style_property(&elem_ref, &name, if text.is_empty() { None } else { Some(text) });
        });
    }))
}

/// Bind an arbitrary typed property, stored out-of-band on the node.
/// Read it back with [`get_prop`].
pub fn prop<T: Clone + PartialEq + 'static>(
    name: &str,
    value: impl Into<BindableValue<T>>,
) -> Modifier {
    let key = format!("prop:{name}");
    let value = value.into();
    Modifier(Box::new(move |elem| {
        let elem_ref = elem.clone();
        bind_elem(elem, value, move |v: &T| {
            elem_ref.set_data(&key, Rc::new(v.clone()));
        });
    }))
}

/// Read a property previously bound with [`prop`].
#[must_use]
pub fn get_prop<T: Clone + 'static>(elem: &Node, name: &str) -> Option<T> {
    let stored = elem.data(&format!("prop:{name}"))?;
    stored.downcast_ref::<T>().cloned()
}

/// Show the element while the value is true (`display: none` otherwise).
pub fn show(value: impl Into<BindableValue<bool>>) -> Modifier {
    display_toggle(value.into(), false)
}

/// Hide the element while the value is true.
pub fn hide(value: impl Into<BindableValue<bool>>) -> Modifier {
    display_toggle(value.into(), true)
}

fn display_toggle(value: BindableValue<bool>, invert: bool) -> Modifier {
    Modifier(Box::new(move |elem| {
        let elem_ref = elem.clone();
        bind_elem(elem, value, move |on: &bool| {
            let visible = *on != invert;
            set_style_property(&elem_ref, "display", if visible { None } else { Some("none") });
        });
    }))
}

/// Add a class unconditionally.
pub fn cls(name: &str) -> Modifier {
    let name = name.to_string();
    Modifier(Box::new(move |elem| elem.add_class(&name)))
}

/// Toggle a class with a boolean binding.
pub fn cls_if(name: &str, value: impl Into<BindableValue<bool>>) -> Modifier {
    let name = name.to_string();
    let value = value.into();
    Modifier(Box::new(move |elem| {
        let elem_ref = elem.clone();
        bind_elem(elem, value, move |on: &bool| {
            if *on {
                elem_ref.add_class(&name);
            } else {
                elem_ref.remove_class(&name);
            }
        });
    }))
}

/// Keep exactly one `{prefix}{value}` class in sync with a string binding;
/// the empty string clears it.
pub fn cls_prefix(prefix: &str, value: impl Into<BindableValue<String>>) -> Modifier {
    let prefix = prefix.to_string();
    let value = value.into();
    Modifier(Box::new(move |elem| {
        let elem_ref = elem.clone();
        let previous: RefCell<Option<String>> = RefCell::new(None);
        bind_elem(elem, value, move |suffix: &String| {
            if let Some(old) = previous.borrow_mut().take() {
                elem_ref.remove_class(&old);
            }
            if !suffix.is_empty() {
                let class = format!("{prefix}{suffix}");
                elem_ref.add_class(&class);
                *previous.borrow_mut() = Some(class);
            }
        });
    }))
}

/// Attach a typed datum to the node's out-of-band dictionary.
pub fn data<T: 'static>(key: &str, value: T) -> Modifier {
    let key = key.to_string();
    let value = Rc::new(value);
    Modifier(Box::new(move |elem| {
        elem.set_data(&key, value);
    }))
}

/// Read a datum attached with [`data`]. The `Rc` keeps it shareable.
#[must_use]
pub fn get_data<T: 'static>(elem: &Node, key: &str) -> Option<Rc<T>> {
    elem.data(key)?.downcast::<T>().ok()
}

/// Remove a datum attached with [`data`].
pub fn remove_data(elem: &Node, key: &str) {
    elem.remove_data(key);
}

/// Register a teardown callback on the element being built.
pub fn on_dispose(f: impl FnOnce(&Node) + 'static) -> Modifier {
    Modifier(Box::new(move |elem| elem.on_dispose(f)))
}

/// Tie a disposable's lifetime to the element being built.
pub fn auto_dispose(resource: impl Disposable + 'static) -> Modifier {
    Modifier(Box::new(move |elem| {
        elem.on_dispose(move |_| resource.dispose());
    }))
}

/// Free-function form of [`auto_dispose`] for an element already in hand.
pub fn auto_dispose_elem(elem: &Node, resource: impl Disposable + 'static) {
    elem.on_dispose(move |_| resource.dispose());
}

/// Rewrite one property of the `style` attribute, keeping the others.
fn set_style_property(elem: &Node, name: &str, value: Option<&str>) {
    let current = elem.attr("style").unwrap_or_default();
    let mut props: Vec<(String, String)> = current
        .split(';')
        .filter_map(|entry| {
            let (k, v) = entry.split_once(':')?;
            let (k, v) = (k.trim(), v.trim());
            if k.is_empty() || k == name {
                None
            } else {
                Some((k.to_string(), v.to_string()))
            }
        })
        .collect();
    if let Some(value) = value {
        props.push((name.to_string(), value.to_string()));
    }
    if props.is_empty() {
        elem.remove_attr("style");
    } else {
        let rendered: Vec<String> = props.iter().map(|(k, v)| format!("{k}: {v}")).collect();
        elem.set_attr("style", &rendered.join("; "));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
