use super::{DialectTypes, SqlDialect};
use crate::column_type::ColumnKind;

/// SQLite. Booleans are stored as integers and `LIMIT` is mandatory before `OFFSET`.
#[derive(Debug)]
pub struct SqliteDialect {
    types: DialectTypes,
}

impl SqliteDialect {
    pub(crate) fn new() -> Self {
        Self {
            types: DialectTypes::new(
                ["INTEGER", "REAL", "TEXT", "BOOLEAN", "DATE", "TIMESTAMP", "BLOB"],
                &[
                    ("INT", ColumnKind::Integer),
                    ("BIGINT", ColumnKind::Integer),
                    ("SMALLINT", ColumnKind::Integer),
                    ("TINYINT", ColumnKind::Integer),
                    ("FLOAT", ColumnKind::Real),
                    ("DOUBLE", ColumnKind::Real),
                    ("NUMERIC", ColumnKind::Real),
                    ("DECIMAL", ColumnKind::Real),
                    ("VARCHAR", ColumnKind::String),
                    ("CHAR", ColumnKind::String),
                    ("CLOB", ColumnKind::String),
                    ("DATETIME", ColumnKind::Timestamp),
                ],
            ),
        }
    }
}

impl SqlDialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn types(&self) -> &DialectTypes {
        &self.types
    }

    fn bool_literal(&self, b: bool) -> &'static str {
        if b {
            "1"
        } else {
            "0"
        }
    }

    fn null_safe_eq(&self, lhs: &str, rhs: &str) -> String {
        format!("{lhs} IS {rhs}")
    }

    fn limit_offset_clause(&self, offset: Option<u64>, limit: Option<u64>) -> Option<String> {
        match (offset, limit) {
            (None, None) => None,
            (None, Some(limit)) => Some(format!("LIMIT {limit}")),
            (Some(offset), None) => Some(format!("LIMIT -1 OFFSET {offset}")),
            (Some(offset), Some(limit)) => Some(format!("LIMIT {limit} OFFSET {offset}")),
        }
    }
}
