//! The fluent query builder.
//!
//! ```
//! use paramquery::prelude::*;
//!
//! paramquery::entity! {
//!     pub struct Student => "PQ_Student" {
//!         Id: Int => "student_id" [primary_key],
//!         FirstName: Text => "first_name",
//!     }
//! }
//!
//! # fn main() -> Result<(), QueryError> {
//! let built = ParameterizedQuery::new()
//!     .table_alias::<Student>("s")?
//!     .select(["s.Id", "s.FirstName"])?
//!     .from::<Student>()?
//!     .filter(gt(col("s.Id"), 0) & eq(col("s.FirstName"), "Steve"))
//!     .build()?;
//!
//! assert!(built.parameterized_query.contains("and s.first_name = @param_value_1"));
//! assert_eq!(built.command.parameters[0].value, "Steve");
//! # Ok(())
//! # }
//! ```

use std::fmt;

use serde::Serialize;

use crate::aliases::{AliasRegistry, ResolvedColumn};
use crate::assembler::{SelectColumn, SelectEntry, SelectStatement};
use crate::ast::{ColumnRef, Predicate, SelectItem};
use crate::compiler::PredicateCompiler;
use crate::config::BuildOptions;
use crate::error::{QueryError, QueryResult};
use crate::joins::{JoinClause, JoinKind, JoinSpec};
use crate::params::{Parameter, ParameterTable};
use crate::schema::{Entity, EntityRef, MetadataResolver, SchemaResolver};
use crate::script::render_script;

/// Statement kind a builder has committed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryType {
    Select,
    Insert,
    Update,
    Delete,
}

impl QueryType {
    pub fn keyword(&self) -> &'static str {
        match self {
            QueryType::Select => "SELECT",
            QueryType::Insert => "INSERT",
            QueryType::Update => "UPDATE",
            QueryType::Delete => "DELETE",
        }
    }
}

/// Query text plus its ordered parameters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SqlCommand {
    pub text: String,
    pub parameters: Vec<Parameter>,
}

/// Result of [`ParameterizedQuery::build`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuiltQuery {
    pub command: SqlCommand,
    /// Declarations and assignments followed by the query.
    pub runnable_script: String,
    pub parameterized_query: String,
}

/// Single-use builder for one parameterized statement.
pub struct ParameterizedQuery {
    options: BuildOptions,
    resolver: Box<dyn MetadataResolver>,
    aliases: AliasRegistry,
    query_type: Option<QueryType>,
    distinct: bool,
    columns: Vec<SelectEntry>,
    column_aliases_set: bool,
    from: Option<EntityRef>,
    joins: Vec<JoinClause>,
    filter: Option<Predicate>,
    order_by: Vec<ResolvedColumn>,
    params: ParameterTable,
}

impl ParameterizedQuery {
    pub fn new() -> Self {
        Self {
            options: BuildOptions::default(),
            resolver: Box::new(SchemaResolver),
            aliases: AliasRegistry::new(),
            query_type: None,
            distinct: false,
            columns: Vec::new(),
            column_aliases_set: false,
            from: None,
            joins: Vec::new(),
            filter: None,
            order_by: Vec::new(),
            params: ParameterTable::new(),
        }
    }

    pub fn with_options(mut self, options: BuildOptions) -> Self {
        self.options = options;
        self
    }

    /// Replace the schema lookups used for table and column names.
    pub fn with_resolver(mut self, resolver: impl MetadataResolver + 'static) -> Self {
        self.resolver = Box::new(resolver);
        self
    }

    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    pub fn aliases(&self) -> &AliasRegistry {
        &self.aliases
    }

    /// Register table aliases, e.g. `[(Student::entity(), "s"), (ClassRoom::entity(), "c")]`.
    pub fn table_aliases<I, A>(mut self, pairs: I) -> QueryResult<Self>
    where
        I: IntoIterator<Item = (EntityRef, A)>,
        A: AsRef<str>,
    {
        let mut any = false;
        for (entity, alias) in pairs {
            self.aliases.register(entity, alias.as_ref())?;
            any = true;
        }
        if !any {
            return Err(QueryError::usage("at least one table alias must be given"));
        }
        Ok(self)
    }

    pub fn table_alias<E: Entity>(mut self, alias: &str) -> QueryResult<Self> {
        self.aliases.register(E::entity(), alias)?;
        Ok(self)
    }

    fn set_query_type(&mut self, requested: QueryType) -> QueryResult<()> {
        match self.query_type {
            None => {
                self.query_type = Some(requested);
                Ok(())
            }
            Some(current) if current == requested => Ok(()),
            Some(current) => Err(QueryError::QueryTypeConflict {
                current: current.keyword(),
                requested: requested.keyword(),
            }),
        }
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// Add select-list items. Captured values are bound as parameters
    /// immediately, so they precede any filter parameters.
    pub fn select<I, S>(mut self, items: I) -> QueryResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<SelectItem>,
    {
        self.set_query_type(QueryType::Select)?;
        if self.column_aliases_set {
            return Err(QueryError::usage(
                "columns cannot be selected after their aliases were given",
            ));
        }
        for item in items {
            let column = match item.into() {
                SelectItem::Column(c) => {
                    SelectColumn::Column(self.aliases.resolve(&c, self.resolver.as_ref())?)
                }
                SelectItem::Captured(var) => SelectColumn::Parameter(self.params.bind_captured(&var)?),
                SelectItem::Null => SelectColumn::Null,
            };
            self.columns.push(SelectEntry {
                column,
                alias: None,
            });
        }
        Ok(self)
    }

    /// Name the selected columns, one alias per item in order. An empty
    /// string leaves that column unaliased.
    pub fn column_aliases<I, A>(mut self, aliases: I) -> QueryResult<Self>
    where
        I: IntoIterator<Item = A>,
        A: AsRef<str>,
    {
        let aliases: Vec<String> = aliases.into_iter().map(|a| a.as_ref().to_string()).collect();
        if aliases.len() != self.columns.len() {
            return Err(QueryError::ColumnAliasCount {
                aliases: aliases.len(),
                columns: self.columns.len(),
            });
        }
        for (entry, alias) in self.columns.iter_mut().zip(aliases) {
            if alias.is_empty() {
                if entry.column == SelectColumn::Null {
                    return Err(null_column_alias());
                }
                entry.alias = None;
            } else {
                entry.alias = Some(alias);
            }
        }
        self.column_aliases_set = true;
        Ok(self)
    }

    pub fn from<E: Entity>(self) -> QueryResult<Self> {
        self.from_entity(E::entity())
    }

    pub fn from_entity(mut self, entity: EntityRef) -> QueryResult<Self> {
        self.aliases.alias_for(&entity)?;
        self.from = Some(entity);
        Ok(self)
    }

    pub fn join(mut self, kind: JoinKind, spec: impl Into<JoinSpec>) -> QueryResult<Self> {
        let clause = spec
            .into()
            .resolve(kind, &self.aliases, self.resolver.as_ref())?;
        tracing::debug!(kind = kind.keyword(), table = %clause.table, "added join");
        self.joins.push(clause);
        Ok(self)
    }

    pub fn inner_join(self, spec: impl Into<JoinSpec>) -> QueryResult<Self> {
        self.join(JoinKind::Inner, spec)
    }

    pub fn left_join(self, spec: impl Into<JoinSpec>) -> QueryResult<Self> {
        self.join(JoinKind::Left, spec)
    }

    pub fn right_join(self, spec: impl Into<JoinSpec>) -> QueryResult<Self> {
        self.join(JoinKind::Right, spec)
    }

    pub fn full_outer_join(self, spec: impl Into<JoinSpec>) -> QueryResult<Self> {
        self.join(JoinKind::FullOuter, spec)
    }

    /// Set the WHERE predicate, replacing any earlier one.
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.filter = Some(predicate);
        self
    }

    /// Append ORDER BY columns; each must already be selected.
    pub fn order_by<I, C>(mut self, columns: I) -> QueryResult<Self>
    where
        I: IntoIterator<Item = C>,
        C: Into<ColumnRef>,
    {
        for column in columns {
            let resolved = self.aliases.resolve(&column.into(), self.resolver.as_ref())?;
            let selected = self.columns.iter().any(|e| match &e.column {
                SelectColumn::Column(c) => c.alias == resolved.alias && c.property == resolved.property,
                _ => false,
            });
            if !selected {
                return Err(QueryError::usage(
                    "Only column names present in the \"select\" clause are allowed in the \"order by\" clause.",
                ));
            }
            self.order_by.push(resolved);
        }
        Ok(self)
    }

    pub fn insert_into<E: Entity>(mut self) -> QueryResult<Self> {
        self.set_query_type(QueryType::Insert)?;
        self.from = Some(E::entity());
        Ok(self)
    }

    pub fn update<E: Entity>(mut self) -> QueryResult<Self> {
        self.set_query_type(QueryType::Update)?;
        self.from = Some(E::entity());
        Ok(self)
    }

    pub fn delete_from<E: Entity>(mut self) -> QueryResult<Self> {
        self.set_query_type(QueryType::Delete)?;
        self.from = Some(E::entity());
        Ok(self)
    }

    /// Compile the statement. Consumes the builder.
    pub fn build(self) -> QueryResult<BuiltQuery> {
        match self.query_type {
            Some(QueryType::Select) => self.build_select(),
            Some(other) => Err(QueryError::not_implemented(format!(
                "{} statements",
                other.keyword()
            ))),
            None => Err(QueryError::usage(
                "The type of the SQL query could not be identified.",
            )),
        }
    }

    fn build_select(self) -> QueryResult<BuiltQuery> {
        let Self {
            options,
            resolver,
            aliases,
            distinct,
            columns,
            from,
            joins,
            filter,
            order_by,
            mut params,
            ..
        } = self;

        if columns.is_empty() {
            return Err(QueryError::usage("no columns were selected"));
        }
        if columns
            .iter()
            .any(|e| e.column == SelectColumn::Null && e.alias.is_none())
        {
            return Err(null_column_alias());
        }
        let from = from.ok_or_else(|| QueryError::usage("the FROM table was not given"))?;

        let filter = match &filter {
            Some(predicate) => Some(
                PredicateCompiler::new(&aliases, resolver.as_ref(), &options, &mut params)
                    .compile(predicate)?,
            ),
            None => None,
        };

        let statement = SelectStatement {
            distinct,
            columns,
            from_table: resolver.table_name(&from),
            from_alias: aliases.alias_for(&from)?.to_string(),
            joins,
            filter,
            order_by,
        };
        let query = statement.render(options.line_ending);
        let parameters = params.into_vec();
        let runnable_script = render_script(&parameters, &query, &options);
        tracing::debug!(parameters = parameters.len(), "built select statement");

        Ok(BuiltQuery {
            command: SqlCommand {
                text: query.clone(),
                parameters,
            },
            runnable_script,
            parameterized_query: query,
        })
    }
}

impl Default for ParameterizedQuery {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ParameterizedQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParameterizedQuery")
            .field("query_type", &self.query_type)
            .field("aliases", &self.aliases)
            .field("distinct", &self.distinct)
            .field("columns", &self.columns)
            .field("from", &self.from)
            .field("joins", &self.joins)
            .field("filter", &self.filter)
            .field("order_by", &self.order_by)
            .finish_non_exhaustive()
    }
}

fn null_column_alias() -> QueryError {
    QueryError::usage(
        "A NULL column mentioned in the SELECT clause must have a valid alias specified.",
    )
}
