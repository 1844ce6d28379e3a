use super::{DialectTypes, SqlDialect};
use crate::column_type::ColumnKind;

#[derive(Debug)]
pub struct DuckDbDialect {
    types: DialectTypes,
}

impl DuckDbDialect {
    pub(crate) fn new() -> Self {
        Self {
            types: DialectTypes::new(
                ["BIGINT", "DOUBLE", "VARCHAR", "BOOLEAN", "DATE", "TIMESTAMP", "BLOB"],
                &[
                    ("INTEGER", ColumnKind::Integer),
                    ("INT", ColumnKind::Integer),
                    ("TINYINT", ColumnKind::Integer),
                    ("SMALLINT", ColumnKind::Integer),
                    ("HUGEINT", ColumnKind::Integer),
                    ("UTINYINT", ColumnKind::Integer),
                    ("USMALLINT", ColumnKind::Integer),
                    ("UINTEGER", ColumnKind::Integer),
                    ("UBIGINT", ColumnKind::Integer),
                    ("FLOAT", ColumnKind::Real),
                    ("REAL", ColumnKind::Real),
                    ("DECIMAL", ColumnKind::Real),
                    ("NUMERIC", ColumnKind::Real),
                    ("TEXT", ColumnKind::String),
                    ("STRING", ColumnKind::String),
                    ("BOOL", ColumnKind::Boolean),
                    ("TIMESTAMP WITH TIME ZONE", ColumnKind::Timestamp),
                    ("TIMESTAMPTZ", ColumnKind::Timestamp),
                    ("DATETIME", ColumnKind::Timestamp),
                    ("BYTEA", ColumnKind::Blob),
                ],
            ),
        }
    }
}

impl SqlDialect for DuckDbDialect {
    fn name(&self) -> &'static str {
        "duckdb"
    }

    fn types(&self) -> &DialectTypes {
        &self.types
    }
}
