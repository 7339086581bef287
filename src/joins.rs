//! JOIN declarations and their resolution into column-pair equalities.

use std::fmt::Write;

use serde::{Deserialize, Serialize};

use crate::aliases::{AliasRegistry, ResolvedColumn};
use crate::ast::{ColumnRef, CompareOp, LogicalOp, Operand, Predicate};
use crate::error::{QueryError, QueryResult};
use crate::parser::parse_join_conditions;
use crate::schema::{Entity, EntityRef, MetadataResolver};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    FullOuter,
}

impl JoinKind {
    pub fn keyword(&self) -> &'static str {
        match self {
            JoinKind::Inner => "inner",
            JoinKind::Left => "left",
            JoinKind::Right => "right",
            JoinKind::FullOuter => "full outer",
        }
    }
}

/// How a join is declared.
#[derive(Debug, Clone, PartialEq)]
pub enum JoinSpec {
    /// `from.foreign_key = to.<primary key>`; the key is looked up.
    Key {
        from: EntityRef,
        foreign_key: String,
        to: EntityRef,
    },
    /// `"a.X == b.Y && a.Z == b.W"`
    Text(String),
    /// A conjunction of column equalities.
    Predicate(Predicate),
}

impl JoinSpec {
    /// Join `T` through `F`'s foreign key to `T`'s primary key.
    pub fn key<F: Entity, T: Entity>(foreign_key: &str) -> Self {
        JoinSpec::Key {
            from: F::entity(),
            foreign_key: foreign_key.to_string(),
            to: T::entity(),
        }
    }

    pub fn key_between(from: EntityRef, foreign_key: &str, to: EntityRef) -> Self {
        JoinSpec::Key {
            from,
            foreign_key: foreign_key.to_string(),
            to,
        }
    }

    pub fn on(conditions: impl Into<String>) -> Self {
        JoinSpec::Text(conditions.into())
    }

    pub fn predicate(predicate: Predicate) -> Self {
        JoinSpec::Predicate(predicate)
    }

    /// Resolve into a clause. The joined table is the right-hand side of
    /// the first equality.
    pub fn resolve(
        &self,
        kind: JoinKind,
        aliases: &AliasRegistry,
        resolver: &dyn MetadataResolver,
    ) -> QueryResult<JoinClause> {
        let pairs: Vec<(ColumnRef, ColumnRef)> = match self {
            JoinSpec::Key {
                from,
                foreign_key,
                to,
            } => {
                let key = resolver.primary_key(to)?;
                vec![(from.col(foreign_key), to.col(&key))]
            }
            JoinSpec::Text(text) => parse_join_conditions(text)
                .map_err(|e| QueryError::InvalidJoin(e.to_string()))?
                .into_iter()
                .map(|eq| {
                    (
                        ColumnRef::path(format!("{}.{}", eq.left.alias, eq.left.property)),
                        ColumnRef::path(format!("{}.{}", eq.right.alias, eq.right.property)),
                    )
                })
                .collect(),
            JoinSpec::Predicate(predicate) => {
                let mut pairs = Vec::new();
                collect_equalities(predicate, &mut pairs)?;
                pairs
            }
        };

        let mut conditions = Vec::with_capacity(pairs.len());
        for (from, to) in &pairs {
            conditions.push(JoinCondition {
                from: aliases.resolve(from, resolver)?,
                to: aliases.resolve(to, resolver)?,
            });
        }
        let target = conditions
            .first()
            .map(|c| c.to.clone())
            .ok_or_else(|| QueryError::InvalidJoin("no conditions".to_string()))?;

        Ok(JoinClause {
            kind,
            table: resolver.table_name(&target.entity),
            alias: target.alias,
            conditions,
        })
    }
}

impl From<Predicate> for JoinSpec {
    fn from(p: Predicate) -> Self {
        JoinSpec::Predicate(p)
    }
}

impl From<&str> for JoinSpec {
    fn from(text: &str) -> Self {
        JoinSpec::Text(text.to_string())
    }
}

fn collect_equalities(
    predicate: &Predicate,
    out: &mut Vec<(ColumnRef, ColumnRef)>,
) -> QueryResult<()> {
    match predicate {
        Predicate::Logical {
            op: LogicalOp::And,
            left,
            right,
        } => {
            collect_equalities(left, out)?;
            collect_equalities(right, out)
        }
        Predicate::Comparison {
            left: Operand::Column(l),
            op: CompareOp::Eq,
            right: Operand::Column(r),
        } => {
            out.push((l.clone(), r.clone()));
            Ok(())
        }
        other => Err(QueryError::InvalidJoin(format!(
            "'{}' is not an equality between two columns",
            other
        ))),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct JoinCondition {
    pub from: ResolvedColumn,
    pub to: ResolvedColumn,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JoinClause {
    pub kind: JoinKind,
    /// Database table being joined.
    pub table: String,
    pub alias: String,
    pub conditions: Vec<JoinCondition>,
}

impl JoinClause {
    /// Lines of this join inside the FROM block, without line endings.
    pub fn render_lines(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(self.conditions.len() + 1);
        lines.push(format!(
            "\t\t{} join {} as {} on",
            self.kind.keyword(),
            self.table,
            self.alias
        ));
        for (i, cond) in self.conditions.iter().enumerate() {
            let mut line = String::from("\t\t\t");
            if i > 0 {
                line.push_str("and ");
            }
            let _ = write!(line, "{} = {}", cond.from.qualified(), cond.to.qualified());
            lines.push(line);
        }
        lines
    }
}
