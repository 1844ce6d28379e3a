use super::{DialectTypes, SqlDialect};
use crate::column_type::ColumnKind;

/// Snowflake. `NUMBER` is reported for integer columns, so it maps to the integer kind.
/// Backslash is an escape character inside string literals, including the `LIKE` escape.
#[derive(Debug)]
pub struct SnowflakeDialect {
    types: DialectTypes,
}

impl SnowflakeDialect {
    pub(crate) fn new() -> Self {
        Self {
            types: DialectTypes::new(
                ["NUMBER", "FLOAT", "TEXT", "BOOLEAN", "DATE", "TIMESTAMP_NTZ", "BINARY"],
                &[
                    ("INTEGER", ColumnKind::Integer),
                    ("INT", ColumnKind::Integer),
                    ("BIGINT", ColumnKind::Integer),
                    ("FIXED", ColumnKind::Integer),
                    ("DOUBLE", ColumnKind::Real),
                    ("REAL", ColumnKind::Real),
                    ("DECIMAL", ColumnKind::Real),
                    ("VARCHAR", ColumnKind::String),
                    ("STRING", ColumnKind::String),
                    ("TIMESTAMP", ColumnKind::Timestamp),
                    ("TIMESTAMP_LTZ", ColumnKind::Timestamp),
                    ("TIMESTAMP_TZ", ColumnKind::Timestamp),
                    ("DATETIME", ColumnKind::Timestamp),
                    ("VARBINARY", ColumnKind::Blob),
                ],
            ),
        }
    }
}

impl SqlDialect for SnowflakeDialect {
    fn name(&self) -> &'static str {
        "snowflake"
    }

    fn types(&self) -> &DialectTypes {
        &self.types
    }

    fn string_literal(&self, s: &str) -> String {
        format!("'{}'", s.replace('\\', "\\\\").replace('\'', "''"))
    }

    fn like_escape_clause(&self) -> &'static str {
        " ESCAPE '\\\\'"
    }
}
