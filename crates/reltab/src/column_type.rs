//! Column types and aggregation functions.
//!
//! A [`ColumnType`] pairs an engine-reported SQL type name with one of a small set of core
//! kinds. Types are shared behind an [`Arc`]; each dialect keeps one instance per known type
//! name (see [`SqlDialect::column_type`](crate::SqlDialect::column_type)). Types compare by
//! value, so a type revived from JSON equals the dialect's shared instance.

use crate::value::Scalar;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, OnceLock};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ColumnKind {
    Integer,
    Real,
    String,
    Boolean,
    Date,
    Timestamp,
    Blob,
    /// An engine type with no core counterpart.
    Other,
}

impl ColumnKind {
    pub const CORE: [ColumnKind; 7] = [
        ColumnKind::Integer,
        ColumnKind::Real,
        ColumnKind::String,
        ColumnKind::Boolean,
        ColumnKind::Date,
        ColumnKind::Timestamp,
        ColumnKind::Blob,
    ];

    pub fn is_numeric(self) -> bool {
        matches!(self, ColumnKind::Integer | ColumnKind::Real)
    }

    pub fn is_core(self) -> bool {
        self != ColumnKind::Other
    }

    pub fn default_agg_fn(self) -> AggFn {
        match self {
            ColumnKind::Integer | ColumnKind::Real => AggFn::Sum,
            ColumnKind::String | ColumnKind::Boolean | ColumnKind::Date | ColumnKind::Timestamp => {
                AggFn::Uniq
            }
            ColumnKind::Blob | ColumnKind::Other => AggFn::Null,
        }
    }

    /// Canonical, dialect-neutral SQL type name for a core kind.
    pub(crate) fn neutral_type_name(self) -> &'static str {
        match self {
            ColumnKind::Integer => "INTEGER",
            ColumnKind::Real => "REAL",
            ColumnKind::String => "TEXT",
            ColumnKind::Boolean => "BOOLEAN",
            ColumnKind::Date => "DATE",
            ColumnKind::Timestamp => "TIMESTAMP",
            ColumnKind::Blob => "BLOB",
            ColumnKind::Other => "OTHER",
        }
    }
}

/// Aggregation applied to a column when rows are grouped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggFn {
    Avg,
    Count,
    Min,
    Max,
    Sum,
    /// The group's value if every row agrees, otherwise NULL.
    Uniq,
    /// Always NULL, typed like the input column.
    Null,
    /// Always NULL, typed as a string.
    NullStr,
}

impl AggFn {
    pub fn name(self) -> &'static str {
        match self {
            AggFn::Avg => "avg",
            AggFn::Count => "count",
            AggFn::Min => "min",
            AggFn::Max => "max",
            AggFn::Sum => "sum",
            AggFn::Uniq => "uniq",
            AggFn::Null => "null",
            AggFn::NullStr => "nullstr",
        }
    }

    /// Type of the aggregated column given the type of its input column.
    pub fn result_type(self, input: &Arc<ColumnType>) -> Arc<ColumnType> {
        match self {
            AggFn::Count => ColumnType::core(ColumnKind::Integer),
            AggFn::NullStr => ColumnType::core(ColumnKind::String),
            _ => Arc::clone(input),
        }
    }
}

impl fmt::Display for AggFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnType {
    pub sql_type_name: String,
    pub kind: ColumnKind,
    pub default_agg_fn: AggFn,
}

impl ColumnType {
    pub fn new(sql_type_name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            sql_type_name: sql_type_name.into(),
            kind,
            default_agg_fn: kind.default_agg_fn(),
        }
    }

    /// Fallback for an engine type name no dialect mapping recognizes: non-numeric, and
    /// aggregates to NULL.
    pub fn unknown(sql_type_name: impl Into<String>) -> Self {
        Self {
            sql_type_name: sql_type_name.into(),
            kind: ColumnKind::Other,
            default_agg_fn: AggFn::Null,
        }
    }

    /// Dialect-neutral type for a core kind. Dialects map the kind to their own type name when
    /// the type is rendered into SQL. Every call for a kind returns the same instance.
    pub fn core(kind: ColumnKind) -> Arc<ColumnType> {
        static NEUTRAL: OnceLock<Vec<Arc<ColumnType>>> = OnceLock::new();
        let table = NEUTRAL.get_or_init(|| {
            ColumnKind::CORE
                .iter()
                .chain(std::iter::once(&ColumnKind::Other))
                .map(|k| Arc::new(ColumnType::new(k.neutral_type_name(), *k)))
                .collect()
        });
        let idx = ColumnKind::CORE
            .iter()
            .position(|k| *k == kind)
            .unwrap_or(ColumnKind::CORE.len());
        Arc::clone(&table[idx])
    }

    pub fn integer() -> Arc<ColumnType> {
        Self::core(ColumnKind::Integer)
    }

    pub fn real() -> Arc<ColumnType> {
        Self::core(ColumnKind::Real)
    }

    pub fn string() -> Arc<ColumnType> {
        Self::core(ColumnKind::String)
    }

    pub fn boolean() -> Arc<ColumnType> {
        Self::core(ColumnKind::Boolean)
    }

    pub fn is_numeric(&self) -> bool {
        self.kind.is_numeric()
    }

    /// String rendering used for display; NULL renders as the empty string.
    pub fn render(&self, value: &Scalar) -> String {
        match value {
            Scalar::Null => String::new(),
            Scalar::Bool(b) => match self.kind {
                ColumnKind::Integer | ColumnKind::Real => u8::from(*b).to_string(),
                _ => b.to_string(),
            },
            Scalar::Int(v) => match self.kind {
                ColumnKind::Boolean => (*v != 0).to_string(),
                _ => v.to_string(),
            },
            Scalar::Real(v) => {
                if self.kind == ColumnKind::Integer && v.fract() == 0.0 {
                    format!("{}", *v as i64)
                } else {
                    v.to_string()
                }
            }
            Scalar::Text(s) => s.clone(),
        }
    }
}

/// Whether values of `lhs` can stand in for `rhs` without a cast: equal types, or two engine
/// names for the same core kind (e.g. a dialect's `BIGINT` and the neutral integer type).
pub fn same_type(lhs: &ColumnType, rhs: &ColumnType) -> bool {
    lhs == rhs || (lhs.kind == rhs.kind && lhs.kind.is_core())
}

/// Common supertype for two columns combined by UNION ALL.
///
/// Identical types pass through (the left one wins); anything else falls back to the string
/// type, so an integer and a real column unify to text rather than widening to real.
pub fn unify_column_types(lhs: &Arc<ColumnType>, rhs: &Arc<ColumnType>) -> Arc<ColumnType> {
    if same_type(lhs, rhs) {
        Arc::clone(lhs)
    } else {
        ColumnType::string()
    }
}

/// Whether two columns may be compared as join keys.
pub fn join_compatible(lhs: &ColumnType, rhs: &ColumnType) -> bool {
    lhs.kind == rhs.kind || (lhs.is_numeric() && rhs.is_numeric())
}
