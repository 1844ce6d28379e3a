use crate::schema::Schema;

pub type ReltabResult<T> = Result<T, ReltabError>;

/// Errors raised while building or executing reltab queries.
///
/// Algebra errors are raised by the operator that introduced the problem (e.g. `project` on an
/// unknown column), never deferred to SQL compilation.
#[derive(Debug, thiserror::Error)]
pub enum ReltabError {
    #[error("unknown column {column} (available: {available:?})")]
    UnknownColumn {
        column: String,
        available: Vec<String>,
    },

    #[error("unknown table: {0}")]
    UnknownTable(String),

    #[error("duplicate column: {0}")]
    DuplicateColumn(String),

    #[error("type mismatch: {message}")]
    TypeMismatch {
        message: String,
        lhs: Box<Schema>,
        rhs: Box<Schema>,
    },

    #[error("concat requires at least one query")]
    EmptyConcat,

    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("connection error: {0}")]
    Connection(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ReltabError {
    pub(crate) fn unknown_column(column: &str, schema: &Schema) -> Self {
        ReltabError::UnknownColumn {
            column: column.to_string(),
            available: schema.columns().to_vec(),
        }
    }

    pub(crate) fn type_mismatch(message: impl Into<String>, lhs: &Schema, rhs: &Schema) -> Self {
        ReltabError::TypeMismatch {
            message: message.into(),
            lhs: Box::new(lhs.clone()),
            rhs: Box::new(rhs.clone()),
        }
    }

    /// Wrap a backend failure without interpreting it.
    pub fn connection(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        ReltabError::Connection(Box::new(err))
    }
}
