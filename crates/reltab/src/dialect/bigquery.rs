use super::{DialectTypes, SqlDialect};
use crate::column_type::ColumnKind;

/// Google BigQuery (standard SQL). Identifiers are backtick-quoted and string literals use
/// backslash escapes, which `LIKE` also uses as its (fixed) escape character.
#[derive(Debug)]
pub struct BigQueryDialect {
    types: DialectTypes,
}

impl BigQueryDialect {
    pub(crate) fn new() -> Self {
        Self {
            types: DialectTypes::new(
                ["INT64", "FLOAT64", "STRING", "BOOL", "DATE", "TIMESTAMP", "BYTES"],
                &[
                    ("INTEGER", ColumnKind::Integer),
                    ("INT", ColumnKind::Integer),
                    ("FLOAT", ColumnKind::Real),
                    ("NUMERIC", ColumnKind::Real),
                    ("BIGNUMERIC", ColumnKind::Real),
                    ("BOOLEAN", ColumnKind::Boolean),
                    ("DATETIME", ColumnKind::Timestamp),
                ],
            ),
        }
    }
}

impl SqlDialect for BigQueryDialect {
    fn name(&self) -> &'static str {
        "bigquery"
    }

    fn types(&self) -> &DialectTypes {
        &self.types
    }

    fn quote_identifier(&self, id: &str) -> String {
        format!("`{}`", id.replace('\\', "\\\\").replace('`', "\\`"))
    }

    fn string_literal(&self, s: &str) -> String {
        format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'"))
    }

    fn like_escape_clause(&self) -> &'static str {
        ""
    }
}
