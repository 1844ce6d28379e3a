//! SQL dialects.
//!
//! A dialect is a capability set: identifier quoting, literal syntax, the engine's type
//! vocabulary, and a paging strategy. Compilation itself is shared (see [`query_to_sql`]); the
//! trait's default methods implement standard SQL and each engine overrides the handful of
//! methods where it differs.

mod bigquery;
mod duckdb;
mod presto;
mod sqlite;
mod snowflake;

pub use bigquery::BigQueryDialect;
pub use duckdb::DuckDbDialect;
pub use presto::PrestoDialect;
pub use snowflake::SnowflakeDialect;
pub use sqlite::SqliteDialect;

use crate::column_type::{ColumnKind, ColumnType};
use crate::filter::{col, const_val, FilterExp};
use crate::query::{QueryExp, SortKey};
use crate::sql_ast::{SqlFrom, SqlQuery, SqlSelect, SqlSelectItem, SqlValExp};
use crate::sql_writer::SqlWriter;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

/// Column holding the row number in row-number paging.
pub const ROW_NUMBER_COLUMN: &str = "_rowNum";

/// Column holding the result of a row-count query.
pub const ROW_COUNT_COLUMN: &str = "rowCount";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PagingStrategy {
    /// `LIMIT n OFFSET m` appended to the query.
    LimitOffset,
    /// Number rows with `ROW_NUMBER()` in a subquery and filter on the number.
    RowNumber,
}

/// The engine's type for each core kind.
#[derive(Clone, Debug)]
pub struct CoreColumnTypes {
    pub integer: Arc<ColumnType>,
    pub real: Arc<ColumnType>,
    pub string: Arc<ColumnType>,
    pub boolean: Arc<ColumnType>,
    pub date: Arc<ColumnType>,
    pub timestamp: Arc<ColumnType>,
    pub blob: Arc<ColumnType>,
}

impl CoreColumnTypes {
    pub fn get(&self, kind: ColumnKind) -> Option<&Arc<ColumnType>> {
        Some(match kind {
            ColumnKind::Integer => &self.integer,
            ColumnKind::Real => &self.real,
            ColumnKind::String => &self.string,
            ColumnKind::Boolean => &self.boolean,
            ColumnKind::Date => &self.date,
            ColumnKind::Timestamp => &self.timestamp,
            ColumnKind::Blob => &self.blob,
            ColumnKind::Other => return None,
        })
    }
}

/// A dialect's type vocabulary: one shared [`ColumnType`] per engine type name, including the
/// fallback types created for names outside the vocabulary.
#[derive(Debug)]
pub struct DialectTypes {
    core: CoreColumnTypes,
    known: HashMap<String, Arc<ColumnType>>,
    unknown: Mutex<HashMap<String, Arc<ColumnType>>>,
}

impl DialectTypes {
    /// `core` lists the engine type name used for each core kind (in [`ColumnKind::CORE`]
    /// order); `aliases` adds further engine names mapping to a kind.
    pub fn new(core: [&str; 7], aliases: &[(&str, ColumnKind)]) -> Self {
        let mut known: HashMap<String, Arc<ColumnType>> = HashMap::new();
        let mut core_type = |idx: usize| {
            let ct = Arc::new(ColumnType::new(core[idx], ColumnKind::CORE[idx]));
            known.insert(normalize_type_name(core[idx]), Arc::clone(&ct));
            ct
        };
        let core = CoreColumnTypes {
            integer: core_type(0),
            real: core_type(1),
            string: core_type(2),
            boolean: core_type(3),
            date: core_type(4),
            timestamp: core_type(5),
            blob: core_type(6),
        };
        for (name, kind) in aliases {
            known
                .entry(normalize_type_name(name))
                .or_insert_with(|| Arc::new(ColumnType::new(*name, *kind)));
        }
        Self {
            core,
            known,
            unknown: Mutex::new(HashMap::new()),
        }
    }

    pub fn core(&self) -> &CoreColumnTypes {
        &self.core
    }

    pub fn lookup(&self, sql_type_name: &str) -> Option<&Arc<ColumnType>> {
        self.known.get(&normalize_type_name(sql_type_name))
    }

    /// Shared fallback for a name outside the vocabulary, and whether this call created it.
    pub fn unknown(&self, sql_type_name: &str) -> (Arc<ColumnType>, bool) {
        let mut unknown = self.unknown.lock().unwrap_or_else(PoisonError::into_inner);
        match unknown.entry(normalize_type_name(sql_type_name)) {
            Entry::Occupied(entry) => (Arc::clone(entry.get()), false),
            Entry::Vacant(entry) => {
                let ct = Arc::new(ColumnType::unknown(sql_type_name));
                entry.insert(Arc::clone(&ct));
                (ct, true)
            }
        }
    }
}

/// Upper-case and drop any parameter list, so `varchar(255)` and `VARCHAR` share a type.
pub fn normalize_type_name(name: &str) -> String {
    let base = match name.find('(') {
        Some(idx) => &name[..idx],
        None => name,
    };
    base.trim().to_ascii_uppercase()
}

pub trait SqlDialect: fmt::Debug + Send + Sync {
    fn name(&self) -> &'static str;

    fn types(&self) -> &DialectTypes;

    fn core_column_types(&self) -> &CoreColumnTypes {
        self.types().core()
    }

    /// Type for an engine-reported type name. Unrecognized names get a conservative fallback
    /// (non-numeric, aggregating to NULL) instead of failing schema introspection.
    fn column_type(&self, sql_type_name: &str) -> Arc<ColumnType> {
        match self.types().lookup(sql_type_name) {
            Some(ct) => Arc::clone(ct),
            None => {
                let (ct, created) = self.types().unknown(sql_type_name);
                if created {
                    log::warn!(
                        "{}: unrecognized column type {sql_type_name:?}; treating as opaque",
                        self.name()
                    );
                }
                ct
            }
        }
    }

    /// Engine type name used when `ct` is rendered into SQL.
    fn type_name<'a>(&'a self, ct: &'a ColumnType) -> &'a str {
        match self.core_column_types().get(ct.kind) {
            Some(core) => &core.sql_type_name,
            None => &ct.sql_type_name,
        }
    }

    fn quote_identifier(&self, id: &str) -> String {
        format!("\"{}\"", id.replace('"', "\"\""))
    }

    fn string_literal(&self, s: &str) -> String {
        format!("'{}'", s.replace('\'', "''"))
    }

    fn bool_literal(&self, b: bool) -> &'static str {
        if b {
            "TRUE"
        } else {
            "FALSE"
        }
    }

    fn null_cast(&self, ct: &ColumnType) -> String {
        format!("CAST(NULL AS {})", self.type_name(ct))
    }

    fn null_safe_eq(&self, lhs: &str, rhs: &str) -> String {
        format!("{lhs} IS NOT DISTINCT FROM {rhs}")
    }

    fn like_escape_clause(&self) -> &'static str {
        " ESCAPE '\\'"
    }

    fn paging_strategy(&self) -> PagingStrategy {
        PagingStrategy::LimitOffset
    }

    /// Trailing paging clause for [`PagingStrategy::LimitOffset`].
    fn limit_offset_clause(&self, offset: Option<u64>, limit: Option<u64>) -> Option<String> {
        match (offset, limit) {
            (None, None) => None,
            (None, Some(limit)) => Some(format!("LIMIT {limit}")),
            (Some(offset), None) => Some(format!("OFFSET {offset}")),
            (Some(offset), Some(limit)) => Some(format!("LIMIT {limit} OFFSET {offset}")),
        }
    }

    /// Full select of `query`, optionally paged.
    fn query_to_sql(&self, query: &QueryExp, offset: Option<u64>, limit: Option<u64>) -> String {
        query_to_sql(self, query, offset, limit)
    }

    /// `COUNT(*)` over `query`.
    fn row_count_sql(&self, query: &QueryExp) -> String {
        row_count_sql(self, query)
    }
}

/// Compile `query` for `dialect`, paging with the dialect's strategy when `offset` or `limit`
/// is given.
pub fn query_to_sql<D: SqlDialect + ?Sized>(
    dialect: &D,
    query: &QueryExp,
    offset: Option<u64>,
    limit: Option<u64>,
) -> String {
    let ast = query.to_sql_ast();
    let paged = offset.is_some() || limit.is_some();
    let sql = match dialect.paging_strategy() {
        PagingStrategy::RowNumber if paged => {
            let paged_ast = row_number_page(ast, query, offset, limit);
            SqlWriter::new(dialect).query(&paged_ast)
        }
        _ => {
            let mut sql = SqlWriter::new(dialect).query(&ast);
            if let Some(clause) = dialect.limit_offset_clause(offset, limit) {
                sql.push('\n');
                sql.push_str(&clause);
            }
            sql
        }
    };
    log::debug!("{} query: {sql}", dialect.name());
    sql
}

pub fn row_count_sql<D: SqlDialect + ?Sized>(dialect: &D, query: &QueryExp) -> String {
    let count = SqlSelect::new(
        vec![SqlSelectItem {
            exp: SqlValExp::CountStar,
            col_type: ColumnType::integer(),
            alias: ROW_COUNT_COLUMN.to_string(),
        }],
        SqlFrom::Subquery(Box::new(query.to_sql_ast())),
    );
    let sql = SqlWriter::new(dialect).query(&SqlQuery::single(count));
    log::debug!("{} row count query: {sql}", dialect.name());
    sql
}

/// Page `ast` without LIMIT/OFFSET:
///
/// ```text
/// SELECT <cols> FROM (
///   SELECT <cols>, _rowNum FROM (
///     SELECT <cols>, ROW_NUMBER() OVER (ORDER BY <ast's order>) AS _rowNum FROM (<ast>)
///   ) WHERE _rowNum >= offset + 1 AND _rowNum <= offset + limit
/// ) ORDER BY _rowNum
/// ```
///
/// Column order and aliases of the result match `ast` exactly.
fn row_number_page(
    ast: SqlQuery,
    query: &QueryExp,
    offset: Option<u64>,
    limit: Option<u64>,
) -> SqlQuery {
    let schema = query.schema();
    let (unpaged, order_by) = match ast.into_single() {
        Ok(mut sel) => {
            let order_by = std::mem::take(&mut sel.order_by);
            // The window orders over subquery outputs, so hidden sort columns must be exposed.
            sel.expose_order_only();
            (SqlQuery::single(sel), order_by)
        }
        Err(union) => (union, Vec::new()),
    };

    let mut numbered = SqlSelect::wrap(unpaged, schema);
    numbered.items.push(SqlSelectItem {
        exp: SqlValExp::RowNumber { order_by },
        col_type: ColumnType::integer(),
        alias: ROW_NUMBER_COLUMN.to_string(),
    });

    let first = offset.unwrap_or(0).saturating_add(1);
    let mut range = FilterExp::and().ge(col(ROW_NUMBER_COLUMN), const_val(to_i64(first)));
    if let Some(limit) = limit {
        range = range.le(
            col(ROW_NUMBER_COLUMN),
            const_val(to_i64(offset.unwrap_or(0).saturating_add(limit))),
        );
    }
    let filtered_items = numbered
        .items
        .iter()
        .map(|item| SqlSelectItem::column(&item.alias, Arc::clone(&item.col_type)))
        .collect();
    let mut filtered = SqlSelect::new(
        filtered_items,
        SqlFrom::Subquery(Box::new(SqlQuery::single(numbered))),
    );
    filtered.where_ = Some(range);

    let mut outer = SqlSelect::wrap(SqlQuery::single(filtered), schema);
    outer.order_by = vec![SortKey::asc(ROW_NUMBER_COLUMN)];
    SqlQuery::single(outer)
}

fn to_i64(v: u64) -> i64 {
    i64::try_from(v).unwrap_or(i64::MAX)
}

static SQLITE: OnceLock<SqliteDialect> = OnceLock::new();
static DUCKDB: OnceLock<DuckDbDialect> = OnceLock::new();
static BIGQUERY: OnceLock<BigQueryDialect> = OnceLock::new();
static SNOWFLAKE: OnceLock<SnowflakeDialect> = OnceLock::new();
static PRESTO: OnceLock<PrestoDialect> = OnceLock::new();

pub fn sqlite() -> &'static SqliteDialect {
    SQLITE.get_or_init(SqliteDialect::new)
}

pub fn duckdb() -> &'static DuckDbDialect {
    DUCKDB.get_or_init(DuckDbDialect::new)
}

pub fn bigquery() -> &'static BigQueryDialect {
    BIGQUERY.get_or_init(BigQueryDialect::new)
}

pub fn snowflake() -> &'static SnowflakeDialect {
    SNOWFLAKE.get_or_init(SnowflakeDialect::new)
}

pub fn presto() -> &'static PrestoDialect {
    PRESTO.get_or_init(PrestoDialect::new)
}

/// Look up a registered dialect by name (case-insensitive). `athena` is an alias for `presto`.
pub fn dialect_by_name(name: &str) -> Option<&'static dyn SqlDialect> {
    Some(match name.to_ascii_lowercase().as_str() {
        "sqlite" => sqlite(),
        "duckdb" => duckdb(),
        "bigquery" => bigquery(),
        "snowflake" => snowflake(),
        "presto" | "athena" => presto(),
        _ => return None,
    })
}

pub fn all_dialects() -> [&'static dyn SqlDialect; 5] {
    [sqlite(), duckdb(), bigquery(), snowflake(), presto()]
}
