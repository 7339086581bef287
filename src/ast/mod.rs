//! Predicate AST and select-list items.

pub mod builders;
mod predicate;
mod values;

pub use builders::*;
pub use predicate::{
    ColumnRef, CompareOp, ListSource, LogicalOp, Operand, PatternSource, Predicate, Var,
};
pub use values::Value;

/// One entry of a SELECT list.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectItem {
    Column(ColumnRef),
    /// A captured local, selected as its parameter.
    Captured(Var),
    /// A bare `null`; must be given a column alias.
    Null,
}

impl From<ColumnRef> for SelectItem {
    fn from(c: ColumnRef) -> Self {
        SelectItem::Column(c)
    }
}

impl From<&str> for SelectItem {
    fn from(path: &str) -> Self {
        SelectItem::Column(ColumnRef::path(path))
    }
}

impl From<Var> for SelectItem {
    fn from(v: Var) -> Self {
        SelectItem::Captured(v)
    }
}

/// Capture a local binding under its own name.
///
/// ```
/// use paramquery::capture;
/// use paramquery::ast::Value;
///
/// let age = 22;
/// let v = capture!(age);
/// assert_eq!(v.name, "age");
/// assert_eq!(v.value, Value::Int(22));
/// ```
#[macro_export]
macro_rules! capture {
    ($name:ident) => {
        $crate::ast::Var::new(stringify!($name), ::std::clone::Clone::clone(&$name))
    };
}
