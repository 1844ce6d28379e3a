use super::{DialectTypes, PagingStrategy, SqlDialect};
use crate::column_type::ColumnKind;

/// Presto / Amazon Athena. Arbitrary subqueries cannot be paged with `OFFSET`, so paging goes
/// through a `ROW_NUMBER()` window.
#[derive(Debug)]
pub struct PrestoDialect {
    types: DialectTypes,
}

impl PrestoDialect {
    pub(crate) fn new() -> Self {
        Self {
            types: DialectTypes::new(
                ["BIGINT", "DOUBLE", "VARCHAR", "BOOLEAN", "DATE", "TIMESTAMP", "VARBINARY"],
                &[
                    ("INTEGER", ColumnKind::Integer),
                    ("INT", ColumnKind::Integer),
                    ("SMALLINT", ColumnKind::Integer),
                    ("TINYINT", ColumnKind::Integer),
                    ("REAL", ColumnKind::Real),
                    ("FLOAT", ColumnKind::Real),
                    ("DECIMAL", ColumnKind::Real),
                    ("CHAR", ColumnKind::String),
                    ("STRING", ColumnKind::String),
                    ("TIMESTAMP WITH TIME ZONE", ColumnKind::Timestamp),
                ],
            ),
        }
    }
}

impl SqlDialect for PrestoDialect {
    fn name(&self) -> &'static str {
        "presto"
    }

    fn types(&self) -> &DialectTypes {
        &self.types
    }

    fn paging_strategy(&self) -> PagingStrategy {
        PagingStrategy::RowNumber
    }
}
