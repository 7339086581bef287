use std::fmt;
use std::ops::{BitAnd, BitOr};

use chrono::NaiveDate;

use crate::ast::Value;
use crate::schema::EntityRef;

/// A column used in a clause.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnRef {
    /// A property of an entity; qualified with the entity's first alias.
    Property { entity: EntityRef, property: String },
    /// Alias-qualified text such as `"s.FirstName"`, parsed when resolved.
    Path(String),
}

impl ColumnRef {
    pub fn property(entity: EntityRef, property: impl Into<String>) -> Self {
        ColumnRef::Property {
            entity,
            property: property.into(),
        }
    }

    pub fn path(path: impl Into<String>) -> Self {
        ColumnRef::Path(path.into())
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnRef::Property { entity, property } => write!(f, "{}.{}", entity.name, property),
            ColumnRef::Path(path) => write!(f, "{}", path),
        }
    }
}

impl From<&str> for ColumnRef {
    fn from(path: &str) -> Self {
        ColumnRef::path(path)
    }
}

/// A local value captured into the query. Rendered as `@param_<name>`.
#[derive(Debug, Clone, PartialEq)]
pub struct Var {
    pub name: String,
    pub value: Value,
}

impl Var {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// One side of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Column(ColumnRef),
    Captured(Var),
    Literal(Value),
    /// A date built from its parts, bound as a date parameter.
    DateParts { year: i32, month: u32, day: u32 },
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Column(c) => write!(f, "{}", c),
            Operand::Captured(v) => write!(f, "{}", v),
            Operand::Literal(v) => write!(f, "{}", v),
            Operand::DateParts { year, month, day } => write!(f, "date({}, {}, {})", year, month, day),
        }
    }
}

impl From<ColumnRef> for Operand {
    fn from(c: ColumnRef) -> Self {
        Operand::Column(c)
    }
}

impl From<Var> for Operand {
    fn from(v: Var) -> Self {
        Operand::Captured(v)
    }
}

impl From<Value> for Operand {
    fn from(v: Value) -> Self {
        Operand::Literal(v)
    }
}

macro_rules! literal_operand {
    ($($t:ty),*) => {$(
        impl From<$t> for Operand {
            fn from(v: $t) -> Self {
                Operand::Literal(v.into())
            }
        }
    )*};
}

literal_operand!(
    i8, i16, i32, i64, u8, u16, u32, f32, f64, bool, char, &str, String, &String, NaiveDate,
    chrono::NaiveDateTime
);

impl<T: Into<Value>> From<Option<T>> for Operand {
    fn from(opt: Option<T>) -> Self {
        Operand::Literal(opt.into())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl CompareOp {
    pub fn sql_symbol(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "!=",
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            other => other.sql_symbol(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

impl LogicalOp {
    pub fn keyword(&self) -> &'static str {
        match self {
            LogicalOp::And => "and",
            LogicalOp::Or => "or",
        }
    }
}

/// Element list of an `IN` / `NOT IN` test.
#[derive(Debug, Clone, PartialEq)]
pub enum ListSource {
    Values(Vec<Value>),
    Captured(Var),
}

impl<T: Into<Value>> From<Vec<T>> for ListSource {
    fn from(items: Vec<T>) -> Self {
        ListSource::Values(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>, const N: usize> From<[T; N]> for ListSource {
    fn from(items: [T; N]) -> Self {
        ListSource::Values(items.into_iter().map(Into::into).collect())
    }
}

impl From<Var> for ListSource {
    fn from(v: Var) -> Self {
        ListSource::Captured(v)
    }
}

/// Text of a pattern test; `None` or empty means "no filter".
#[derive(Debug, Clone, PartialEq)]
pub enum PatternSource {
    Text(Option<String>),
    Captured(Var),
}

impl From<&str> for PatternSource {
    fn from(s: &str) -> Self {
        PatternSource::Text(Some(s.to_string()))
    }
}

impl From<String> for PatternSource {
    fn from(s: String) -> Self {
        PatternSource::Text(Some(s))
    }
}

impl From<Option<&str>> for PatternSource {
    fn from(s: Option<&str>) -> Self {
        PatternSource::Text(s.map(str::to_string))
    }
}

impl From<Option<String>> for PatternSource {
    fn from(s: Option<String>) -> Self {
        PatternSource::Text(s)
    }
}

impl From<Var> for PatternSource {
    fn from(v: Var) -> Self {
        PatternSource::Captured(v)
    }
}

/// A boolean filter expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Comparison {
        left: Operand,
        op: CompareOp,
        right: Operand,
    },
    Logical {
        op: LogicalOp,
        left: Box<Predicate>,
        right: Box<Predicate>,
    },
    InList {
        column: ColumnRef,
        values: ListSource,
    },
    NotInList {
        column: ColumnRef,
        values: ListSource,
    },
    Like {
        column: ColumnRef,
        pattern: PatternSource,
    },
    NotLike {
        column: ColumnRef,
        pattern: PatternSource,
    },
    StartsWith {
        column: ColumnRef,
        pattern: PatternSource,
    },
    EndsWith {
        column: ColumnRef,
        pattern: PatternSource,
    },
    IsNull(ColumnRef),
    IsNotNull(ColumnRef),
}

impl Predicate {
    pub fn and(self, other: Predicate) -> Predicate {
        Predicate::Logical {
            op: LogicalOp::And,
            left: Box::new(self),
            right: Box::new(other),
        }
    }

    pub fn or(self, other: Predicate) -> Predicate {
        Predicate::Logical {
            op: LogicalOp::Or,
            left: Box::new(self),
            right: Box::new(other),
        }
    }

    /// Left-fold with `and`; `None` for an empty input.
    pub fn all(items: impl IntoIterator<Item = Predicate>) -> Option<Predicate> {
        items.into_iter().reduce(Predicate::and)
    }

    /// Left-fold with `or`; `None` for an empty input.
    pub fn any(items: impl IntoIterator<Item = Predicate>) -> Option<Predicate> {
        items.into_iter().reduce(Predicate::or)
    }
}

impl BitAnd for Predicate {
    type Output = Predicate;

    fn bitand(self, rhs: Predicate) -> Predicate {
        self.and(rhs)
    }
}

impl BitOr for Predicate {
    type Output = Predicate;

    fn bitor(self, rhs: Predicate) -> Predicate {
        self.or(rhs)
    }
}

fn fmt_pattern(f: &mut fmt::Formatter<'_>, pattern: &PatternSource) -> fmt::Result {
    match pattern {
        PatternSource::Text(Some(s)) => write!(f, "\"{}\"", s),
        PatternSource::Text(None) => write!(f, "null"),
        PatternSource::Captured(v) => write!(f, "{}", v),
    }
}

fn fmt_list(f: &mut fmt::Formatter<'_>, values: &ListSource) -> fmt::Result {
    match values {
        ListSource::Values(items) => write!(f, "{}", Value::List(items.clone())),
        ListSource::Captured(v) => write!(f, "{}", v),
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Comparison { left, op, right } => {
                write!(f, "{} {} {}", left, op.symbol(), right)
            }
            Predicate::Logical { op, left, right } => {
                let sym = match op {
                    LogicalOp::And => "&&",
                    LogicalOp::Or => "||",
                };
                write!(f, "({} {} {})", left, sym, right)
            }
            Predicate::InList { column, values } => {
                write!(f, "{} in ", column)?;
                fmt_list(f, values)
            }
            Predicate::NotInList { column, values } => {
                write!(f, "{} not in ", column)?;
                fmt_list(f, values)
            }
            Predicate::Like { column, pattern } => {
                write!(f, "{}.like(", column)?;
                fmt_pattern(f, pattern)?;
                write!(f, ")")
            }
            Predicate::NotLike { column, pattern } => {
                write!(f, "{}.not_like(", column)?;
                fmt_pattern(f, pattern)?;
                write!(f, ")")
            }
            Predicate::StartsWith { column, pattern } => {
                write!(f, "{}.starts_with(", column)?;
                fmt_pattern(f, pattern)?;
                write!(f, ")")
            }
            Predicate::EndsWith { column, pattern } => {
                write!(f, "{}.ends_with(", column)?;
                fmt_pattern(f, pattern)?;
                write!(f, ")")
            }
            Predicate::IsNull(c) => write!(f, "{} is null", c),
            Predicate::IsNotNull(c) => write!(f, "{} is not null", c),
        }
    }
}
