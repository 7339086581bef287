//! Predicate builders for WHERE clauses.
//!
//! ```
//! use paramquery::prelude::*;
//!
//! let filter = gt(col("s.Id"), 0) & eq(col("s.FirstName"), "Steve");
//! assert_eq!(filter.to_string(), "(s.Id > 0 && s.FirstName == \"Steve\")");
//! ```

use crate::ast::{
    ColumnRef, CompareOp, ListSource, Operand, PatternSource, Predicate, Value, Var,
};

fn compare(left: impl Into<Operand>, op: CompareOp, right: impl Into<Operand>) -> Predicate {
    Predicate::Comparison {
        left: left.into(),
        op,
        right: right.into(),
    }
}

/// Alias-qualified column reference, e.g. `col("s.FirstName")`.
pub fn col(path: &str) -> ColumnRef {
    ColumnRef::path(path)
}

/// Capture a named local value; see also [`capture!`](crate::capture).
pub fn var(name: impl Into<String>, value: impl Into<Value>) -> Var {
    Var::new(name, value)
}

/// Date literal from its parts.
pub fn ymd(year: i32, month: u32, day: u32) -> Operand {
    Operand::DateParts { year, month, day }
}

/// Create an equality condition (left = right)
pub fn eq(left: impl Into<Operand>, right: impl Into<Operand>) -> Predicate {
    compare(left, CompareOp::Eq, right)
}

pub fn ne(left: impl Into<Operand>, right: impl Into<Operand>) -> Predicate {
    compare(left, CompareOp::Ne, right)
}

pub fn gt(left: impl Into<Operand>, right: impl Into<Operand>) -> Predicate {
    compare(left, CompareOp::Gt, right)
}

pub fn gte(left: impl Into<Operand>, right: impl Into<Operand>) -> Predicate {
    compare(left, CompareOp::Gte, right)
}

pub fn lt(left: impl Into<Operand>, right: impl Into<Operand>) -> Predicate {
    compare(left, CompareOp::Lt, right)
}

pub fn lte(left: impl Into<Operand>, right: impl Into<Operand>) -> Predicate {
    compare(left, CompareOp::Lte, right)
}

pub fn is_in(column: ColumnRef, values: impl Into<ListSource>) -> Predicate {
    Predicate::InList {
        column,
        values: values.into(),
    }
}

pub fn not_in(column: ColumnRef, values: impl Into<ListSource>) -> Predicate {
    Predicate::NotInList {
        column,
        values: values.into(),
    }
}

/// Containment test. `*` and `?` in the pattern act as `%` and `_`.
pub fn like(column: ColumnRef, pattern: impl Into<PatternSource>) -> Predicate {
    Predicate::Like {
        column,
        pattern: pattern.into(),
    }
}

pub fn not_like(column: ColumnRef, pattern: impl Into<PatternSource>) -> Predicate {
    Predicate::NotLike {
        column,
        pattern: pattern.into(),
    }
}

pub fn starts_with(column: ColumnRef, pattern: impl Into<PatternSource>) -> Predicate {
    Predicate::StartsWith {
        column,
        pattern: pattern.into(),
    }
}

pub fn ends_with(column: ColumnRef, pattern: impl Into<PatternSource>) -> Predicate {
    Predicate::EndsWith {
        column,
        pattern: pattern.into(),
    }
}

pub fn is_null(column: ColumnRef) -> Predicate {
    Predicate::IsNull(column)
}

pub fn is_not_null(column: ColumnRef) -> Predicate {
    Predicate::IsNotNull(column)
}

pub fn and(left: Predicate, right: Predicate) -> Predicate {
    left.and(right)
}

pub fn or(left: Predicate, right: Predicate) -> Predicate {
    left.or(right)
}
