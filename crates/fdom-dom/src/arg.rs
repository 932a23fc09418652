#![forbid(unsafe_code)]

//! Element-construction arguments.
//!
//! Everything passed to [`element`](crate::builder::element) implements
//! [`DomArg`] and is applied in order: nodes append, strings become text,
//! `Option` skips `None`, collections and tuples recurse, `Result`
//! propagates, and modifier structs mutate the element. Ad-hoc closures go
//! through [`apply`], which re-applies whatever the closure returns.

use crate::document::current_document;
use crate::error::DomError;
use crate::node::Node;

/// One argument of an element builder call.
pub trait DomArg {
    fn apply_to(self, elem: &Node) -> Result<(), DomError>;
}

impl DomArg for () {
    fn apply_to(self, _elem: &Node) -> Result<(), DomError> {
        Ok(())
    }
}

impl DomArg for Node {
    fn apply_to(self, elem: &Node) -> Result<(), DomError> {
        elem.append_child(&self);
        Ok(())
    }
}

impl DomArg for &str {
    fn apply_to(self, elem: &Node) -> Result<(), DomError> {
        elem.append_child(&current_document().create_text(self));
        Ok(())
    }
}

impl DomArg for String {
    fn apply_to(self, elem: &Node) -> Result<(), DomError> {
        self.as_str().apply_to(elem)
    }
}

macro_rules! impl_domarg_display {
    ($($ty:ty),+) => {
        $(impl DomArg for $ty {
            fn apply_to(self, elem: &Node) -> Result<(), DomError> {
                self.to_string().apply_to(elem)
            }
        })+
    };
}

impl_domarg_display!(i32, i64, u32, u64, usize, f64, char);

impl<A: DomArg> DomArg for Option<A> {
    fn apply_to(self, elem: &Node) -> Result<(), DomError> {
        match self {
            Some(arg) => arg.apply_to(elem),
            None => Ok(()),
        }
    }
}

impl<A: DomArg> DomArg for Vec<A> {
    fn apply_to(self, elem: &Node) -> Result<(), DomError> {
        for arg in self {
            arg.apply_to(elem)?;
        }
        Ok(())
    }
}

impl<A: DomArg, const N: usize> DomArg for [A; N] {
    fn apply_to(self, elem: &Node) -> Result<(), DomError> {
        for arg in self {
            arg.apply_to(elem)?;
        }
        Ok(())
    }
}

impl<A: DomArg> DomArg for Result<A, DomError> {
    fn apply_to(self, elem: &Node) -> Result<(), DomError> {
        self?.apply_to(elem)
    }
}

/// Ad-hoc modifier: runs a closure against the element and applies its
/// return value.
pub struct Apply<F>(F);

impl<F, R> DomArg for Apply<F>
where
    F: FnOnce(&Node) -> R,
    R: DomArg,
{
    fn apply_to(self, elem: &Node) -> Result<(), DomError> {
        (self.0)(elem).apply_to(elem)
    }
}

/// Wrap a closure as a builder argument.
pub fn apply<F, R>(f: F) -> Apply<F>
where
    F: FnOnce(&Node) -> R,
    R: DomArg,
{
    Apply(f)
}

macro_rules! impl_domarg_tuple {
    ($($name:ident),+) => {
        impl<$($name: DomArg),+> DomArg for ($($name,)+) {
            #[allow(non_snake_case)]
            fn apply_to(self, elem: &Node) -> Result<(), DomError> {
                let ($($name,)+) = self;
                $($name.apply_to(elem)?;)+
                Ok(())
            }
        }
    };
}

impl_domarg_tuple!(A);
impl_domarg_tuple!(A, B);
impl_domarg_tuple!(A, B, C);
impl_domarg_tuple!(A, B, C, D);
impl_domarg_tuple!(A, B, C, D, E);
impl_domarg_tuple!(A, B, C, D, E, F);
impl_domarg_tuple!(A, B, C, D, E, F, G);
impl_domarg_tuple!(A, B, C, D, E, F, G, H);
impl_domarg_tuple!(A, B, C, D, E, F, G, H, I);
impl_domarg_tuple!(A, B, C, D, E, F, G, H, I, J);
impl_domarg_tuple!(A, B, C, D, E, F, G, H, I, J, K);
impl_domarg_tuple!(A, B, C, D, E, F, G, H, I, J, K, L);

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Namespace;

    fn div() -> Node {
        current_document().create_element("div", Namespace::Html)
    }

    #[test]
    fn strings_become_text_nodes() {
        let elem = div();
        ("a", "b".to_string()).apply_to(&elem).unwrap();
        assert_eq!(elem.inner_html(), "ab");
    }

    #[test]
    fn options_skip_none() {
        let elem = div();
        (Some("x"), None::<&str>).apply_to(&elem).unwrap();
        assert_eq!(elem.inner_html(), "x");
    }

    #[test]
    fn vectors_recurse() {
        let elem = div();
        vec!["a", "b", "c"].apply_to(&elem).unwrap();
        assert_eq!(elem.inner_html(), "abc");
    }

    #[test]
    fn apply_closure_recurses_on_return() {
        let elem = div();
        apply(|e: &Node| {
            e.set_attr("id", "root");
            "inner"
        })
        .apply_to(&elem)
        .unwrap();
        assert_eq!(elem.outer_html(), "<div id=\"root\">inner</div>");
    }

    #[test]
    fn result_err_propagates() {
        let elem = div();
        let err: Result<Node, DomError> = Err(DomError::EmptyTag { spec: String::new() });
        let outcome = (err, "never").apply_to(&elem);
        assert!(outcome.is_err());
        // The earlier sibling check: application stops at the error.
        assert_eq!(elem.child_count(), 0);
    }
}
