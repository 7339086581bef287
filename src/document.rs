//! JSON query documents, turned into a [`ParameterizedQuery`] against a
//! loaded [`Schema`].
//!
//! ```json
//! {
//!   "aliases": [{ "entity": "Student", "alias": "s" }],
//!   "select": ["s.Id", "s.FirstName"],
//!   "from": "Student",
//!   "filter": { "and": [
//!     { "gt": [{ "col": "s.Id" }, 0] },
//!     { "eq": [{ "col": "s.FirstName" }, { "var": "firstName", "value": "Steve" }] }
//!   ]}
//! }
//! ```
//!
//! Literal values are JSON scalars or arrays; `{"date": "2000-01-31"}` and
//! `{"char": "A"}` spell the kinds JSON has no syntax for.

use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use crate::ast::{
    ColumnRef, CompareOp, ListSource, Operand, PatternSource, Predicate, SelectItem, Value, Var,
};
use crate::config::BuildOptions;
use crate::error::{QueryError, QueryResult};
use crate::joins::{JoinKind, JoinSpec};
use crate::query::ParameterizedQuery;
use crate::schema::Schema;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryDocument {
    pub aliases: Vec<AliasDoc>,
    #[serde(default)]
    pub distinct: bool,
    pub select: Vec<SelectDoc>,
    #[serde(default)]
    pub column_aliases: Vec<String>,
    pub from: String,
    #[serde(default)]
    pub joins: Vec<JoinDoc>,
    #[serde(default)]
    pub filter: Option<FilterDoc>,
    #[serde(default)]
    pub order_by: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AliasDoc {
    pub entity: String,
    pub alias: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SelectDoc {
    Column(String),
    Captured {
        var: String,
        #[serde(default)]
        value: Json,
    },
    Null,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JoinDoc {
    /// `from`'s `key` property against `to`'s primary key.
    Key {
        kind: JoinKind,
        from: String,
        to: String,
        key: String,
    },
    On {
        kind: JoinKind,
        on: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OperandDoc {
    Column {
        col: String,
    },
    Captured {
        var: String,
        #[serde(default)]
        value: Json,
    },
    Date {
        ymd: (i32, u32, u32),
    },
    Literal(Json),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListDoc {
    pub column: String,
    #[serde(default)]
    pub values: Option<Vec<Json>>,
    #[serde(default)]
    pub var: Option<String>,
    #[serde(default)]
    pub value: Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternDoc {
    pub column: String,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub var: Option<String>,
    #[serde(default)]
    pub value: Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterDoc {
    And(Vec<FilterDoc>),
    Or(Vec<FilterDoc>),
    Eq(OperandDoc, OperandDoc),
    Ne(OperandDoc, OperandDoc),
    Gt(OperandDoc, OperandDoc),
    Gte(OperandDoc, OperandDoc),
    Lt(OperandDoc, OperandDoc),
    Lte(OperandDoc, OperandDoc),
    In(ListDoc),
    NotIn(ListDoc),
    Like(PatternDoc),
    NotLike(PatternDoc),
    StartsWith(PatternDoc),
    EndsWith(PatternDoc),
    IsNull(String),
    IsNotNull(String),
}

impl QueryDocument {
    pub fn from_json(content: &str) -> QueryResult<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn load(path: &Path) -> QueryResult<Self> {
        let content = std::fs::read_to_string(path)?;
        tracing::debug!(path = %path.display(), "loading query document");
        Self::from_json(&content)
    }

    /// The WHERE predicate, if the document has one.
    pub fn predicate(&self) -> QueryResult<Option<Predicate>> {
        self.filter.as_ref().map(FilterDoc::to_predicate).transpose()
    }

    /// Replay the document against a fresh builder.
    pub fn into_query(self, schema: &Schema, options: BuildOptions) -> QueryResult<ParameterizedQuery> {
        let predicate = self.predicate()?;

        let pairs = self
            .aliases
            .iter()
            .map(|a| Ok((schema.get(&a.entity)?, a.alias.as_str())))
            .collect::<QueryResult<Vec<_>>>()?;
        let mut query = ParameterizedQuery::new()
            .with_options(options)
            .table_aliases(pairs)?;

        if self.distinct {
            query = query.distinct();
        }

        let items = self
            .select
            .into_iter()
            .map(|item| match item {
                SelectDoc::Column(path) => Ok(SelectItem::Column(ColumnRef::path(path))),
                SelectDoc::Captured { var, value } => {
                    Ok(SelectItem::Captured(Var::new(var, json_to_value(&value)?)))
                }
                SelectDoc::Null => Ok(SelectItem::Null),
            })
            .collect::<QueryResult<Vec<_>>>()?;
        query = query.select(items)?;

        if !self.column_aliases.is_empty() {
            query = query.column_aliases(&self.column_aliases)?;
        }

        query = query.from_entity(schema.get(&self.from)?)?;

        for join in self.joins {
            query = match join {
                JoinDoc::Key {
                    kind,
                    from,
                    to,
                    key,
                } => query.join(
                    kind,
                    JoinSpec::key_between(schema.get(&from)?, &key, schema.get(&to)?),
                )?,
                JoinDoc::On { kind, on } => query.join(kind, JoinSpec::Text(on))?,
            };
        }

        if let Some(predicate) = predicate {
            query = query.filter(predicate);
        }

        if !self.order_by.is_empty() {
            query = query.order_by(self.order_by.iter().map(String::as_str))?;
        }

        Ok(query)
    }
}

impl FilterDoc {
    pub fn to_predicate(&self) -> QueryResult<Predicate> {
        let compare = |l: &OperandDoc, op: CompareOp, r: &OperandDoc| -> QueryResult<Predicate> {
            Ok(Predicate::Comparison {
                left: l.to_operand()?,
                op,
                right: r.to_operand()?,
            })
        };
        match self {
            FilterDoc::And(items) => fold(items, |p| Predicate::all(p), "and"),
            FilterDoc::Or(items) => fold(items, |p| Predicate::any(p), "or"),
            FilterDoc::Eq(l, r) => compare(l, CompareOp::Eq, r),
            FilterDoc::Ne(l, r) => compare(l, CompareOp::Ne, r),
            FilterDoc::Gt(l, r) => compare(l, CompareOp::Gt, r),
            FilterDoc::Gte(l, r) => compare(l, CompareOp::Gte, r),
            FilterDoc::Lt(l, r) => compare(l, CompareOp::Lt, r),
            FilterDoc::Lte(l, r) => compare(l, CompareOp::Lte, r),
            FilterDoc::In(list) => Ok(Predicate::InList {
                column: ColumnRef::path(&list.column),
                values: list.to_source()?,
            }),
            FilterDoc::NotIn(list) => Ok(Predicate::NotInList {
                column: ColumnRef::path(&list.column),
                values: list.to_source()?,
            }),
            FilterDoc::Like(p) => Ok(Predicate::Like {
                column: ColumnRef::path(&p.column),
                pattern: p.to_source()?,
            }),
            FilterDoc::NotLike(p) => Ok(Predicate::NotLike {
                column: ColumnRef::path(&p.column),
                pattern: p.to_source()?,
            }),
            FilterDoc::StartsWith(p) => Ok(Predicate::StartsWith {
                column: ColumnRef::path(&p.column),
                pattern: p.to_source()?,
            }),
            FilterDoc::EndsWith(p) => Ok(Predicate::EndsWith {
                column: ColumnRef::path(&p.column),
                pattern: p.to_source()?,
            }),
            FilterDoc::IsNull(path) => Ok(Predicate::IsNull(ColumnRef::path(path))),
            FilterDoc::IsNotNull(path) => Ok(Predicate::IsNotNull(ColumnRef::path(path))),
        }
    }
}

fn fold(
    items: &[FilterDoc],
    combine: fn(Vec<Predicate>) -> Option<Predicate>,
    name: &str,
) -> QueryResult<Predicate> {
    let predicates = items
        .iter()
        .map(FilterDoc::to_predicate)
        .collect::<QueryResult<Vec<_>>>()?;
    combine(predicates).ok_or_else(|| QueryError::Document(format!("empty \"{}\" list", name)))
}

impl OperandDoc {
    pub fn to_operand(&self) -> QueryResult<Operand> {
        match self {
            OperandDoc::Column { col } => Ok(Operand::Column(ColumnRef::path(col))),
            OperandDoc::Captured { var, value } => {
                Ok(Operand::Captured(Var::new(var, json_to_value(value)?)))
            }
            OperandDoc::Date {
                ymd: (year, month, day),
            } => Ok(Operand::DateParts {
                year: *year,
                month: *month,
                day: *day,
            }),
            OperandDoc::Literal(json) => Ok(Operand::Literal(json_to_value(json)?)),
        }
    }
}

impl ListDoc {
    fn to_source(&self) -> QueryResult<ListSource> {
        match (&self.values, &self.var) {
            (Some(values), None) => Ok(ListSource::Values(
                values.iter().map(json_to_value).collect::<QueryResult<_>>()?,
            )),
            (None, Some(var)) => Ok(ListSource::Captured(Var::new(var, json_to_value(&self.value)?))),
            _ => Err(QueryError::Document(format!(
                "list on '{}' needs exactly one of \"values\" or \"var\"",
                self.column
            ))),
        }
    }
}

impl PatternDoc {
    fn to_source(&self) -> QueryResult<PatternSource> {
        match &self.var {
            Some(var) if self.pattern.is_none() => {
                Ok(PatternSource::Captured(Var::new(var, json_to_value(&self.value)?)))
            }
            Some(_) => Err(QueryError::Document(format!(
                "pattern on '{}' cannot have both \"pattern\" and \"var\"",
                self.column
            ))),
            None => Ok(PatternSource::Text(self.pattern.clone())),
        }
    }
}

/// Convert a JSON literal into a [`Value`].
pub fn json_to_value(json: &Json) -> QueryResult<Value> {
    match json {
        Json::Null => Ok(Value::Null),
        Json::Bool(b) => Ok(Value::Bool(*b)),
        Json::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => Ok(Value::Int(i)),
            (None, Some(f)) => Ok(Value::Float(f)),
            _ => Err(QueryError::InvalidValue(format!("number {} is out of range", n))),
        },
        Json::String(s) => Ok(Value::Text(s.clone())),
        Json::Array(items) => Ok(Value::List(
            items.iter().map(json_to_value).collect::<QueryResult<_>>()?,
        )),
        Json::Object(map) => {
            if let Some(Json::String(date)) = map.get("date") {
                let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
                    .map_err(|e| QueryError::InvalidValue(format!("date '{}': {}", date, e)))?;
                return Ok(Value::Date(date));
            }
            if let Some(Json::String(c)) = map.get("char") {
                let mut chars = c.chars();
                return match (chars.next(), chars.next()) {
                    (Some(ch), None) => Ok(Value::Char(ch)),
                    _ => Err(QueryError::InvalidValue(format!(
                        "'{}' is not a single character",
                        c
                    ))),
                };
            }
            Err(QueryError::InvalidValue(format!("unsupported value {}", json)))
        }
    }
}
