//! Error types for paramquery.

use thiserror::Error;

/// The main error type for query construction.
#[derive(Debug, Error)]
pub enum QueryError {
    /// The builder was used in a way the generated SQL cannot honour.
    #[error("Usage error: {0}")]
    Usage(String),

    /// An alias was registered twice for different entities.
    #[error("The specified alias, \"{alias}\" has already been used for a different table entity ({existing}).")]
    AliasConflict { alias: String, existing: String },

    /// Alias text that cannot appear in generated SQL.
    #[error("Invalid alias: '{0}'. Aliases must be non-empty identifiers")]
    InvalidAlias(String),

    /// A clause referenced an alias nobody registered.
    #[error("The specified alias, \"{0}\" does not correspond to any of the registered aliases for tables.")]
    UnknownAlias(String),

    /// A clause referenced an entity that has no alias.
    #[error("The entity \"{0}\" has not been registered with a table alias.")]
    UnregisteredEntity(String),

    /// The entity schema has no such property.
    #[error("Property \"{property}\" could not be located on entity, \"{entity}\".")]
    PropertyNotFound { entity: String, property: String },

    /// A single-key join targeted an entity without a primary key.
    #[error("The entity \"{0}\" does not have a property that is marked as \"primary key\".")]
    MissingPrimaryKey(String),

    /// A join condition did not have the accepted shape.
    #[error("Invalid join condition: {0}. The expected format is: \"a.ForeignKeyId == b.PrimaryKeyId && a.SomeColumnName == b.SomeOtherColumnName\"")]
    InvalidJoin(String),

    /// Column aliases and select items disagree in number.
    #[error("The number of aliases ({aliases}) does not match with the count of SELECT clause columns ({columns}).")]
    ColumnAliasCount { aliases: usize, columns: usize },

    /// A second statement kind was requested on the same builder.
    #[error("Cannot accept a {requested} clause once another query type ({current}) has already started.")]
    QueryTypeConflict {
        current: &'static str,
        requested: &'static str,
    },

    /// Failed to parse an alias path or join text.
    #[error("Parse error at position {position}: {message}")]
    Parse { position: usize, message: String },

    /// Invalid value.
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// A recognised but unsupported construct.
    #[error("Not implemented: {0}")]
    NotImplemented(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed query document.
    #[error("Document error: {0}")]
    Document(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl QueryError {
    /// Create a parse error at the given position.
    pub fn parse(position: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            position,
            message: message.into(),
        }
    }

    /// Create a usage error.
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage(message.into())
    }

    /// Create a not-implemented error.
    pub fn not_implemented(message: impl Into<String>) -> Self {
        Self::NotImplemented(message.into())
    }

    pub fn property_not_found(entity: impl Into<String>, property: impl Into<String>) -> Self {
        Self::PropertyNotFound {
            entity: entity.into(),
            property: property.into(),
        }
    }

    /// True for the "unimplemented" class of failures.
    pub fn is_not_implemented(&self) -> bool {
        matches!(self, Self::NotImplemented(_))
    }
}

impl From<toml::de::Error> for QueryError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<serde_json::Error> for QueryError {
    fn from(err: serde_json::Error) -> Self {
        Self::Document(err.to_string())
    }
}

/// Result type alias for query construction.
pub type QueryResult<T> = Result<T, QueryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = QueryError::parse(5, "expected '.'");
        assert_eq!(err.to_string(), "Parse error at position 5: expected '.'");
    }

    #[test]
    fn test_unknown_alias_message() {
        let err = QueryError::UnknownAlias("zz".to_string());
        assert_eq!(
            err.to_string(),
            "The specified alias, \"zz\" does not correspond to any of the registered aliases for tables."
        );
    }

    #[test]
    fn test_not_implemented_class() {
        assert!(QueryError::not_implemented("INSERT").is_not_implemented());
        assert!(!QueryError::usage("bad").is_not_implemented());
    }
}
