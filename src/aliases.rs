//! Table alias registry.

use crate::ast::ColumnRef;
use crate::error::{QueryError, QueryResult};
use crate::parser::{is_identifier, parse_column_path};
use crate::schema::{DataKind, EntityRef, EntitySchema, MetadataResolver};

#[derive(Debug, Clone, PartialEq)]
pub struct AliasBinding {
    pub alias: String,
    pub entity: EntityRef,
}

/// A column reference resolved against the registry and the schema.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedColumn {
    pub alias: String,
    pub entity: EntityRef,
    pub property: String,
    /// Database column name.
    pub column: String,
    pub kind: DataKind,
}

impl ResolvedColumn {
    /// `alias.column`
    pub fn qualified(&self) -> String {
        format!("{}.{}", self.alias, self.column)
    }
}

/// Ordered alias ⇄ entity bindings of one query.
#[derive(Debug, Clone, Default)]
pub struct AliasRegistry {
    bindings: Vec<AliasBinding>,
}

impl AliasRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `alias` to `entity`. Registering the same pair again is a no-op.
    pub fn register(&mut self, entity: EntityRef, alias: &str) -> QueryResult<()> {
        if !is_identifier(alias) {
            return Err(QueryError::InvalidAlias(alias.to_string()));
        }
        if let Some(existing) = self.bindings.iter().find(|b| b.alias == alias) {
            if existing.entity == entity {
                return Ok(());
            }
            return Err(QueryError::AliasConflict {
                alias: alias.to_string(),
                existing: existing.entity.name.clone(),
            });
        }
        tracing::debug!(alias, entity = %entity.name, "registered table alias");
        self.bindings.push(AliasBinding {
            alias: alias.to_string(),
            entity,
        });
        Ok(())
    }

    /// First alias registered for `entity`.
    pub fn alias_for(&self, entity: &EntitySchema) -> QueryResult<&str> {
        self.bindings
            .iter()
            .find(|b| b.entity.name == entity.name)
            .map(|b| b.alias.as_str())
            .ok_or_else(|| QueryError::UnregisteredEntity(entity.name.clone()))
    }

    pub fn entity_for(&self, alias: &str) -> QueryResult<&EntityRef> {
        self.bindings
            .iter()
            .find(|b| b.alias == alias)
            .map(|b| &b.entity)
            .ok_or_else(|| QueryError::UnknownAlias(alias.to_string()))
    }

    /// Resolve a column to its alias, entity, database column and kind.
    pub fn resolve(
        &self,
        column: &ColumnRef,
        resolver: &dyn MetadataResolver,
    ) -> QueryResult<ResolvedColumn> {
        let (alias, entity, property) = match column {
            ColumnRef::Property { entity, property } => {
                (self.alias_for(entity)?.to_string(), entity.clone(), property.clone())
            }
            ColumnRef::Path(path) => {
                let path = parse_column_path(path)?;
                let entity = self.entity_for(&path.alias)?.clone();
                (path.alias, entity, path.property)
            }
        };
        let column = resolver.column_name(&entity, &property)?;
        let kind = resolver.data_kind(&entity, &property)?;
        Ok(ResolvedColumn {
            alias,
            entity,
            property,
            column,
            kind,
        })
    }

    pub fn bindings(&self) -> &[AliasBinding] {
        &self.bindings
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
