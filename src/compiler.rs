//! Predicate compiler: turns a [`Predicate`] into WHERE clause lines.
//!
//! Compilation happens in two steps.
//!
//! 1. **Decomposition.** Every `and`/`or` node becomes a group of two
//!    [`LogicalNode`]s: the left child opens the group (no connective), the
//!    right child carries the operator. Anything else is a leaf.
//! 2. **Rendering.** Leaves are rendered to condition text, binding
//!    parameters as they are met, and groups are wrapped in parentheses
//!    one tab deeper than their parent:
//!
//! ```text
//! 	(
//! 		s.student_id > 0
//! 		and s.first_name = @param_value_1
//! 	)
//! 	or c.grade = 3
//! ```
//!
//! A leaf whose filter value is absent renders as [`ALWAYS_TRUE`]; the
//! statement assembler removes those lines afterwards.

use std::fmt::Write;

use chrono::NaiveDate;

use crate::aliases::{AliasRegistry, ResolvedColumn};
use crate::ast::{
    ColumnRef, CompareOp, ListSource, LogicalOp, Operand, PatternSource, Predicate, Value,
};
use crate::config::{BuildOptions, EmptyListPolicy};
use crate::error::{QueryError, QueryResult};
use crate::params::{ParameterTable, format_date, format_float};
use crate::schema::{DataKind, MetadataResolver};

/// Placeholder condition for a filter that should not apply.
pub const ALWAYS_TRUE: &str = "1 == 1";

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind<'a> {
    Leaf(&'a Predicate),
    Group(Vec<LogicalNode<'a>>),
}

/// Working tree of the compiler.
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalNode<'a> {
    /// Operator binding this node to its preceding sibling.
    pub connective: Option<LogicalOp>,
    pub kind: NodeKind<'a>,
}

impl<'a> LogicalNode<'a> {
    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf(_))
    }

    /// Indented outline of the tree, one node per line.
    pub fn explain(&self) -> String {
        let mut out = String::new();
        self.explain_into(&mut out, 0);
        out
    }

    fn explain_into(&self, out: &mut String, depth: usize) {
        let pad = "  ".repeat(depth);
        let connective = self.connective.map(|op| op.keyword()).unwrap_or("-");
        match &self.kind {
            NodeKind::Leaf(p) => {
                let _ = writeln!(out, "{}[{}] {}", pad, connective, p);
            }
            NodeKind::Group(children) => {
                let _ = writeln!(out, "{}[{}] group", pad, connective);
                for child in children {
                    child.explain_into(out, depth + 1);
                }
            }
        }
    }
}

/// Decompose a predicate into its logical tree.
pub fn decompose(predicate: &Predicate) -> LogicalNode<'_> {
    decompose_bound(predicate, None)
}

fn decompose_bound(predicate: &Predicate, connective: Option<LogicalOp>) -> LogicalNode<'_> {
    match predicate {
        Predicate::Logical { op, left, right } => LogicalNode {
            connective,
            kind: NodeKind::Group(vec![
                decompose_bound(left, None),
                decompose_bound(right, Some(*op)),
            ]),
        },
        leaf => LogicalNode {
            connective,
            kind: NodeKind::Leaf(leaf),
        },
    }
}

/// Outline of how `predicate` will be grouped in the WHERE clause.
pub fn explain(predicate: &Predicate) -> String {
    decompose(predicate).explain()
}

/// One line of WHERE clause output. `depth` is the number of leading tabs.
#[derive(Debug, Clone, PartialEq)]
pub enum WhereLine {
    Condition {
        depth: usize,
        connective: Option<LogicalOp>,
        text: String,
    },
    /// Connective of a parenthesized group, on its own line.
    Connective { depth: usize, op: LogicalOp },
    Open { depth: usize },
    Close { depth: usize },
}

impl WhereLine {
    pub fn depth(&self) -> usize {
        match self {
            WhereLine::Condition { depth, .. }
            | WhereLine::Connective { depth, .. }
            | WhereLine::Open { depth }
            | WhereLine::Close { depth } => *depth,
        }
    }

    pub fn is_always_true(&self) -> bool {
        matches!(self, WhereLine::Condition { text, .. } if text == ALWAYS_TRUE)
    }

    pub fn render(&self) -> String {
        let tabs = "\t".repeat(self.depth());
        match self {
            WhereLine::Condition {
                connective: Some(op),
                text,
                ..
            } => format!("{}{} {}", tabs, op.keyword(), text),
            WhereLine::Condition { text, .. } => format!("{}{}", tabs, text),
            WhereLine::Connective { op, .. } => format!("{}{}", tabs, op.keyword()),
            WhereLine::Open { .. } => format!("{}(", tabs),
            WhereLine::Close { .. } => format!("{})", tabs),
        }
    }
}

/// Compiles predicates against one query's aliases, binding parameters.
pub struct PredicateCompiler<'q> {
    aliases: &'q AliasRegistry,
    resolver: &'q dyn MetadataResolver,
    options: &'q BuildOptions,
    params: &'q mut ParameterTable,
}

impl<'q> PredicateCompiler<'q> {
    pub fn new(
        aliases: &'q AliasRegistry,
        resolver: &'q dyn MetadataResolver,
        options: &'q BuildOptions,
        params: &'q mut ParameterTable,
    ) -> Self {
        Self {
            aliases,
            resolver,
            options,
            params,
        }
    }

    /// Compile the WHERE clause body. Top-level conditions sit at depth 1
    /// and the root group gets no parentheses.
    pub fn compile(&mut self, predicate: &Predicate) -> QueryResult<Vec<WhereLine>> {
        let root = decompose(predicate);
        let mut lines = Vec::new();
        match &root.kind {
            NodeKind::Leaf(_) => self.emit(&root, 1, &mut lines)?,
            NodeKind::Group(children) => {
                for child in children {
                    self.emit(child, 1, &mut lines)?;
                }
            }
        }
        tracing::debug!(lines = lines.len(), "compiled where clause");
        Ok(lines)
    }

    fn emit(
        &mut self,
        node: &LogicalNode<'_>,
        depth: usize,
        lines: &mut Vec<WhereLine>,
    ) -> QueryResult<()> {
        match &node.kind {
            NodeKind::Leaf(predicate) => {
                let text = self.render_leaf(predicate)?;
                lines.push(WhereLine::Condition {
                    depth,
                    connective: node.connective,
                    text,
                });
            }
            NodeKind::Group(children) => {
                if let Some(op) = node.connective {
                    lines.push(WhereLine::Connective { depth, op });
                }
                lines.push(WhereLine::Open { depth });
                for child in children {
                    self.emit(child, depth + 1, lines)?;
                }
                lines.push(WhereLine::Close { depth });
            }
        }
        Ok(())
    }

    /// Render one terminal condition.
    pub fn render_leaf(&mut self, predicate: &Predicate) -> QueryResult<String> {
        match predicate {
            Predicate::IsNull(column) => Ok(format!("{} is null", self.column(column)?.qualified())),
            Predicate::IsNotNull(column) => {
                Ok(format!("{} is not null", self.column(column)?.qualified()))
            }
            Predicate::StartsWith { column, pattern } => {
                self.render_pattern(column, pattern, PatternShape::StartsWith)
            }
            Predicate::EndsWith { column, pattern } => {
                self.render_pattern(column, pattern, PatternShape::EndsWith)
            }
            Predicate::Like { column, pattern } => {
                self.render_pattern(column, pattern, PatternShape::Contains)
            }
            Predicate::NotLike { column, pattern } => {
                self.render_pattern(column, pattern, PatternShape::NotContains)
            }
            Predicate::InList { column, values } => self.render_in(column, values, false),
            Predicate::NotInList { column, values } => self.render_in(column, values, true),
            Predicate::Comparison { left, op, right } => self.render_comparison(left, *op, right),
            Predicate::Logical { .. } => Err(QueryError::usage(
                "a logical expression cannot be rendered as a single condition",
            )),
        }
    }

    fn column(&self, column: &ColumnRef) -> QueryResult<ResolvedColumn> {
        self.aliases.resolve(column, self.resolver)
    }

    fn render_comparison(
        &mut self,
        left: &Operand,
        op: CompareOp,
        right: &Operand,
    ) -> QueryResult<String> {
        let captured_null = |o: &Operand| matches!(o, Operand::Captured(var) if var.value.is_null());
        let literal_null = |o: &Operand| matches!(o, Operand::Literal(value) if value.is_null());

        if captured_null(left) || captured_null(right) {
            if self.options.ignore_null_filter_values {
                tracing::trace!("captured null, filter dropped");
                return Ok(ALWAYS_TRUE.to_string());
            }
            return self.render_null_comparison(left, op, right);
        }
        if literal_null(left) || literal_null(right) {
            return self.render_null_comparison(left, op, right);
        }

        let l = self.render_operand(left)?;
        let r = self.render_operand(right)?;
        Ok(format!("{} {} {}", l, op.sql_symbol(), r))
    }

    /// `col = null` / `col != null` as `is [not] null`.
    fn render_null_comparison(
        &mut self,
        left: &Operand,
        op: CompareOp,
        right: &Operand,
    ) -> QueryResult<String> {
        let column = match (left, right) {
            (Operand::Column(c), _) | (_, Operand::Column(c)) => self.column(c)?,
            _ => {
                return Err(QueryError::usage(
                    "a null comparison needs a column on one side",
                ));
            }
        };
        match op {
            CompareOp::Eq => Ok(format!("{} is null", column.qualified())),
            CompareOp::Ne => Ok(format!("{} is not null", column.qualified())),
            other => Err(QueryError::usage(format!(
                "'{}' cannot be applied to null (column {})",
                other.sql_symbol(),
                column.qualified()
            ))),
        }
    }

    fn render_operand(&mut self, operand: &Operand) -> QueryResult<String> {
        match operand {
            Operand::Column(c) => Ok(self.column(c)?.qualified()),
            Operand::Captured(var) => self.params.bind_captured(var),
            Operand::Literal(value) => self.render_literal(value),
            Operand::DateParts { year, month, day } => {
                let date = NaiveDate::from_ymd_opt(*year, *month, *day).ok_or_else(|| {
                    QueryError::InvalidValue(format!("{}-{}-{} is not a valid date", year, month, day))
                })?;
                self.params.bind_date(date)
            }
        }
    }

    /// Numbers inline, everything textual as a parameter.
    fn render_literal(&mut self, value: &Value) -> QueryResult<String> {
        match value {
            Value::Int(n) => Ok(n.to_string()),
            Value::Float(n) => format_float(*n),
            Value::Bool(b) => Ok(if *b { "1" } else { "0" }.to_string()),
            Value::Char(_) | Value::Text(_) | Value::Date(_) => self.params.bind_literal(value),
            Value::List(_) => Err(QueryError::usage(
                "a list cannot be compared; use is_in / not_in",
            )),
            Value::Null => Err(QueryError::usage("null must be compared with a column")),
        }
    }

    fn render_pattern(
        &mut self,
        column: &ColumnRef,
        pattern: &PatternSource,
        shape: PatternShape,
    ) -> QueryResult<String> {
        let column = self.column(column)?;
        let text = match pattern {
            PatternSource::Text(text) => text.clone(),
            PatternSource::Captured(var) => match &var.value {
                Value::Null => None,
                Value::Text(s) => Some(s.clone()),
                Value::Char(c) => Some(c.to_string()),
                other => {
                    return Err(QueryError::not_implemented(format!(
                        "pattern variable '{}' holds a {} value",
                        var.name,
                        other.kind_name()
                    )));
                }
            },
        };
        let Some(text) = text.filter(|t| !t.is_empty()) else {
            return Ok(ALWAYS_TRUE.to_string());
        };

        let escaped = text.replace('\'', "''");
        let wildcards = || escaped.replace('*', "%").replace('?', "_");
        let rendered = match shape {
            PatternShape::StartsWith => format!("like '{}%'", escaped),
            PatternShape::EndsWith => format!("like '%{}'", escaped),
            PatternShape::Contains => format!("like '%{}%'", wildcards()),
            PatternShape::NotContains => format!("not like '%{}%'", wildcards()),
        };
        Ok(format!("{} {}", column.qualified(), rendered))
    }

    fn render_in(
        &mut self,
        column: &ColumnRef,
        values: &ListSource,
        negated: bool,
    ) -> QueryResult<String> {
        let column = self.column(column)?;
        let items: &[Value] = match values {
            ListSource::Values(items) => items,
            ListSource::Captured(var) => match &var.value {
                Value::Null if self.options.ignore_null_filter_values => {
                    return Ok(ALWAYS_TRUE.to_string());
                }
                Value::List(items) if items.iter().all(|v| matches!(v, Value::Date(_))) => items,
                Value::List(_) => {
                    return Err(QueryError::not_implemented(format!(
                        "captured list '{}' must hold dates",
                        var.name
                    )));
                }
                other => {
                    return Err(QueryError::usage(format!(
                        "captured variable '{}' holds a {} value, not a list",
                        var.name,
                        other.kind_name()
                    )));
                }
            },
        };

        if items.is_empty() && self.options.empty_in_list == EmptyListPolicy::Fail {
            return Err(QueryError::usage(format!(
                "the IN list for {} is empty",
                column.qualified()
            )));
        }

        let mut rendered = Vec::with_capacity(items.len());
        for item in items {
            rendered.push(self.render_in_item(&column, item)?);
        }
        let keyword = if negated { "not in" } else { "in" };
        Ok(format!(
            "{} {} ({})",
            column.qualified(),
            keyword,
            rendered.join(", ")
        ))
    }

    fn render_in_item(&mut self, column: &ResolvedColumn, item: &Value) -> QueryResult<String> {
        let mismatch = || {
            QueryError::InvalidValue(format!(
                "a {} value cannot be listed for {} column {}",
                item.kind_name(),
                column.kind,
                column.qualified()
            ))
        };
        if column.kind.is_numeric() {
            return match item {
                Value::Int(n) => Ok(n.to_string()),
                Value::Float(n) => format_float(*n),
                _ => Err(mismatch()),
            };
        }
        match column.kind {
            DataKind::Text | DataKind::Char => match item {
                Value::Text(_) | Value::Char(_) => self.params.bind_literal(item),
                _ => Err(mismatch()),
            },
            DataKind::DateTime => match item {
                Value::Date(d) => Ok(format!("convert(datetime, '{}', 106)", format_date(*d))),
                _ => Err(mismatch()),
            },
            DataKind::Bool => Err(QueryError::not_implemented(format!(
                "IN lists over bool column {}",
                column.qualified()
            ))),
            DataKind::Int | DataKind::Decimal => Err(mismatch()),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum PatternShape {
    StartsWith,
    EndsWith,
    Contains,
    NotContains,
}
