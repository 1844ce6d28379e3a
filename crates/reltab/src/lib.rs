//! Immutable relational query algebra with eager schema inference and per-dialect SQL
//! compilation.
//!
//! Build a [`QueryExp`] from a table (or raw SQL) with a known [`Schema`], compose operators on
//! it, and compile it with any [`SqlDialect`]:
//!
//! ```
//! use reltab::{col, const_val, dialect, ColumnType, FilterExp, QueryExp, Schema, SqlDialect};
//!
//! let schema = Schema::from_types([
//!     ("Region", ColumnType::string()),
//!     ("Amount", ColumnType::real()),
//! ])?;
//! let q = QueryExp::table("sales", schema)
//!     .filter(FilterExp::and().eq(col("Region"), const_val("West")))?
//!     .project(["Amount"])?;
//! let sql = dialect::sqlite().query_to_sql(&q, None, Some(10));
//! assert!(sql.ends_with("LIMIT 10"));
//! # Ok::<(), reltab::ReltabError>(())
//! ```

mod column_type;
mod connection;
pub mod dialect;
mod error;
mod filter;
mod query;
mod schema;
pub mod sql_ast;
mod sql_writer;
mod value;

pub use crate::column_type::{
    join_compatible, same_type, unify_column_types, AggFn, ColumnKind, ColumnType,
};
pub use crate::connection::{Connection, TableInfoMap, TableRep};
pub use crate::dialect::{dialect_by_name, PagingStrategy, SqlDialect};
pub use crate::error::{ReltabError, ReltabResult};
pub use crate::filter::{
    as_string, col, const_val, BoolOp, FilterExp, RelExp, RelOp, SubExp, ValExp,
};
pub use crate::query::{
    AggColSpec, ColumnExtendOptions, ColumnMapInfo, JoinType, QueryExp, QueryRep, SortKey,
};
pub use crate::schema::{ColumnMetadata, Schema};
pub use crate::value::Scalar;
