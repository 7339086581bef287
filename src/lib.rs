//! # paramquery
//!
//! A fluent builder for parameterized T-SQL `SELECT` statements.
//!
//! Filters are written as predicate trees over alias-qualified columns.
//! The compiler walks the tree, inlines column references and numeric
//! literals, binds every other value as an `@param_` parameter, and lays
//! the result out as an indented `WHERE` block. Conditions whose captured
//! value is null become always-true and are stripped from the output.
//!
//! ## Quick Example
//!
//! ```
//! use paramquery::prelude::*;
//!
//! paramquery::entity! {
//!     pub struct Student => "PQ_Student" {
//!         Id: Int => "student_id" [primary_key],
//!         FirstName: Text => "first_name",
//!         LastName: Text => "last_name",
//!     }
//! }
//!
//! # fn main() -> Result<(), QueryError> {
//! let first_name = "Steve";
//! let last_name: Option<&str> = None;
//!
//! let built = ParameterizedQuery::new()
//!     .table_alias::<Student>("s")?
//!     .select(["s.Id", "s.FirstName"])?
//!     .from::<Student>()?
//!     .filter(
//!         eq(col("s.FirstName"), capture!(first_name))
//!             & eq(col("s.LastName"), capture!(last_name)),
//!     )
//!     .build()?;
//!
//! // the null last name drops out of the WHERE clause
//! assert_eq!(
//!     built.parameterized_query,
//!     "select\n\ts.student_id,\n\ts.first_name\nfrom\n\tPQ_Student as s\nwhere\n\ts.first_name = @param_first_name\n"
//! );
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! | Module       | Role                                          |
//! |--------------|-----------------------------------------------|
//! | `schema`     | Entity descriptors and metadata lookups       |
//! | `ast`        | Predicate tree, values and builders           |
//! | `compiler`   | Predicate tree to `WHERE` lines               |
//! | `assembler`  | Statement layout and always-true cleanup      |
//! | `query`      | The fluent builder                            |
//! | `document`   | JSON query documents                          |

pub mod aliases;
pub mod assembler;
pub mod ast;
pub mod compiler;
pub mod config;
pub mod document;
pub mod error;
pub mod joins;
pub mod params;
pub mod parser;
pub mod query;
pub mod schema;
pub mod script;

pub mod prelude {
    pub use crate::ast::*;
    pub use crate::capture;
    pub use crate::config::{BuildOptions, Config, EmptyListPolicy, LineEnding};
    pub use crate::document::QueryDocument;
    pub use crate::entity;
    pub use crate::error::*;
    pub use crate::joins::{JoinKind, JoinSpec};
    pub use crate::params::{ParamKind, Parameter};
    pub use crate::query::{BuiltQuery, ParameterizedQuery, SqlCommand};
    pub use crate::schema::{
        DataKind, Entity, EntityRef, EntitySchema, FieldSchema, MetadataResolver, Schema,
        SchemaResolver,
    };
}

pub use compiler::explain;
pub use error::{QueryError, QueryResult};
pub use query::{BuiltQuery, ParameterizedQuery};
