//! The relational query algebra.
//!
//! A [`QueryExp`] is an immutable tree of operators. Every builder method consumes its input and
//! returns a new node that owns it, inferring the output [`Schema`] as it goes; invalid column
//! references and incompatible inputs are reported by the builder call that introduced them.
//!
//! Nodes serialize as their [`QueryRep`] (an `operator`-tagged enum). Reviving a node from JSON
//! re-runs schema inference, so a revived tree is validated exactly like a freshly built one.

use crate::column_type::{join_compatible, unify_column_types, AggFn, ColumnType};
use crate::error::{ReltabError, ReltabResult};
use crate::filter::{FilterExp, ValExp};
use crate::schema::{ColumnMetadata, Schema};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Type and display metadata for a column added by [`QueryExp::extend`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnExtendOptions {
    pub column_type: Arc<ColumnType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl ColumnExtendOptions {
    pub fn new(column_type: Arc<ColumnType>) -> Self {
        Self {
            column_type,
            display_name: None,
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }
}

/// One aggregated output column of a group-by. The output column keeps the input's id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggColSpec {
    pub agg_fn: AggFn,
    pub col: String,
}

impl AggColSpec {
    pub fn new(agg_fn: AggFn, col: impl Into<String>) -> Self {
        Self {
            agg_fn,
            col: col.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    pub col: String,
    pub asc: bool,
}

impl SortKey {
    pub fn new(col: impl Into<String>, asc: bool) -> Self {
        Self {
            col: col.into(),
            asc,
        }
    }

    pub fn asc(col: impl Into<String>) -> Self {
        Self::new(col, true)
    }

    pub fn desc(col: impl Into<String>) -> Self {
        Self::new(col, false)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum JoinType {
    Inner,
    #[default]
    LeftOuter,
}

/// New id and/or display name for one column of [`QueryExp::map_columns`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnMapInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl ColumnMapInfo {
    pub fn rename(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            display_name: None,
        }
    }

    pub fn display_name(display_name: impl Into<String>) -> Self {
        Self {
            id: None,
            display_name: Some(display_name.into()),
        }
    }
}

/// The operator of a query node, with its operator-specific arguments.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operator", rename_all = "camelCase")]
pub enum QueryRep {
    #[serde(rename_all = "camelCase")]
    Table { table_name: String, schema: Schema },
    #[serde(rename_all = "camelCase")]
    Sql { sql_query: String, schema: Schema },
    Project {
        from: Box<QueryExp>,
        cols: Vec<String>,
    },
    Filter {
        from: Box<QueryExp>,
        fexp: FilterExp,
    },
    #[serde(rename_all = "camelCase")]
    Extend {
        from: Box<QueryExp>,
        col_id: String,
        col_exp: ValExp,
        opts: ColumnExtendOptions,
    },
    GroupBy {
        from: Box<QueryExp>,
        cols: Vec<String>,
        aggs: Vec<AggColSpec>,
    },
    #[serde(rename_all = "camelCase")]
    Join {
        lhs: Box<QueryExp>,
        rhs: Box<QueryExp>,
        on: Vec<String>,
        join_type: JoinType,
    },
    /// UNION ALL of every query, in order.
    Concat { queries: Vec<QueryExp> },
    Sort {
        from: Box<QueryExp>,
        keys: Vec<SortKey>,
    },
    MapColumns {
        from: Box<QueryExp>,
        cmap: BTreeMap<String, ColumnMapInfo>,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "QueryRep", into = "QueryRep")]
pub struct QueryExp {
    rep: QueryRep,
    schema: Schema,
}

impl TryFrom<QueryRep> for QueryExp {
    type Error = ReltabError;

    fn try_from(rep: QueryRep) -> ReltabResult<Self> {
        QueryExp::from_rep(rep)
    }
}

impl From<QueryExp> for QueryRep {
    fn from(exp: QueryExp) -> Self {
        exp.rep
    }
}

fn into_strings<I>(ids: I) -> Vec<String>
where
    I: IntoIterator,
    I::Item: Into<String>,
{
    ids.into_iter().map(Into::into).collect()
}

fn require_columns<'a>(schema: &Schema, ids: impl IntoIterator<Item = &'a str>) -> ReltabResult<()> {
    for id in ids {
        schema.require(id)?;
    }
    Ok(())
}

fn infer_schema(rep: &QueryRep) -> ReltabResult<Schema> {
    match rep {
        QueryRep::Table { schema, .. } | QueryRep::Sql { schema, .. } => Ok(schema.clone()),
        QueryRep::Project { from, cols } => from.schema.project(cols),
        QueryRep::Filter { from, fexp } => {
            require_columns(&from.schema, fexp.columns())?;
            Ok(from.schema.clone())
        }
        QueryRep::Extend {
            from,
            col_id,
            col_exp,
            opts,
        } => {
            let mut refs = Vec::new();
            col_exp.collect_columns(&mut refs);
            require_columns(&from.schema, refs)?;
            let display_name = opts.display_name.clone().unwrap_or_else(|| col_id.clone());
            from.schema.extend(
                col_id,
                ColumnMetadata::new(display_name, Arc::clone(&opts.column_type)),
            )
        }
        QueryRep::GroupBy { from, cols, aggs } => {
            let mut out = Vec::with_capacity(cols.len() + aggs.len());
            for id in cols {
                out.push((id.clone(), from.schema.require(id)?.clone()));
            }
            for agg in aggs {
                let md = from.schema.require(&agg.col)?;
                out.push((
                    agg.col.clone(),
                    ColumnMetadata::new(
                        md.display_name.clone(),
                        agg.agg_fn.result_type(&md.column_type),
                    ),
                ));
            }
            Schema::new(out)
        }
        QueryRep::Join { lhs, rhs, on, .. } => {
            for key in on {
                let lt = lhs.schema.require_type(key)?;
                let rt = rhs.schema.require_type(key)?;
                if !join_compatible(lt, rt) {
                    return Err(ReltabError::type_mismatch(
                        format!(
                            "join key {key}: {} is not comparable with {}",
                            lt.sql_type_name, rt.sql_type_name
                        ),
                        &lhs.schema,
                        &rhs.schema,
                    ));
                }
            }
            if let Some(clash) = rhs
                .schema
                .columns()
                .iter()
                .find(|id| lhs.schema.has_column(id.as_str()) && !on.contains(*id))
            {
                return Err(ReltabError::DuplicateColumn(clash.clone()));
            }
            let mut out: Vec<(String, ColumnMetadata)> = lhs
                .schema
                .iter()
                .map(|(id, md)| (id.to_string(), md.clone()))
                .collect();
            out.extend(
                rhs.schema
                    .iter()
                    .filter(|(id, _)| !on.iter().any(|key| key == id))
                    .map(|(id, md)| (id.to_string(), md.clone())),
            );
            Schema::new(out)
        }
        QueryRep::Concat { queries } => {
            let (first, rest) = queries.split_first().ok_or(ReltabError::EmptyConcat)?;
            let mut unified: Vec<(String, ColumnMetadata)> = first
                .schema
                .iter()
                .map(|(id, md)| (id.to_string(), md.clone()))
                .collect();
            for other in rest {
                if other.schema.len() != first.schema.len() {
                    return Err(ReltabError::type_mismatch(
                        format!(
                            "concat of {} columns with {} columns",
                            first.schema.len(),
                            other.schema.len()
                        ),
                        &first.schema,
                        &other.schema,
                    ));
                }
                for (id, md) in &mut unified {
                    let Some(other_type) = other.schema.column_type(id) else {
                        return Err(ReltabError::type_mismatch(
                            format!("concat branch has no column {id}"),
                            &first.schema,
                            &other.schema,
                        ));
                    };
                    md.column_type = unify_column_types(&md.column_type, other_type);
                }
            }
            Schema::new(unified)
        }
        QueryRep::Sort { from, keys } => {
            require_columns(&from.schema, keys.iter().map(|k| k.col.as_str()))?;
            Ok(from.schema.clone())
        }
        QueryRep::MapColumns { from, cmap } => {
            require_columns(&from.schema, cmap.keys().map(String::as_str))?;
            let out = from
                .schema
                .iter()
                .map(|(id, md)| match cmap.get(id) {
                    Some(info) => {
                        let new_id = info.id.clone().unwrap_or_else(|| id.to_string());
                        let display_name = info
                            .display_name
                            .clone()
                            .unwrap_or_else(|| md.display_name.clone());
                        (
                            new_id,
                            ColumnMetadata::new(display_name, Arc::clone(&md.column_type)),
                        )
                    }
                    None => (id.to_string(), md.clone()),
                })
                .collect();
            Schema::new(out)
        }
    }
}

impl QueryExp {
    /// Validate `rep` against its inputs and build the node.
    pub fn from_rep(rep: QueryRep) -> ReltabResult<Self> {
        let schema = infer_schema(&rep)?;
        Ok(Self { rep, schema })
    }

    /// Scan of a named table with a known schema.
    pub fn table(table_name: impl Into<String>, schema: Schema) -> Self {
        let rep = QueryRep::Table {
            table_name: table_name.into(),
            schema: schema.clone(),
        };
        Self { rep, schema }
    }

    /// An opaque SQL query producing `schema`.
    pub fn sql(sql_query: impl Into<String>, schema: Schema) -> Self {
        let rep = QueryRep::Sql {
            sql_query: sql_query.into(),
            schema: schema.clone(),
        };
        Self { rep, schema }
    }

    pub fn rep(&self) -> &QueryRep {
        &self.rep
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn project<I>(self, cols: I) -> ReltabResult<Self>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self::from_rep(QueryRep::Project {
            from: Box::new(self),
            cols: into_strings(cols),
        })
    }

    pub fn filter(self, fexp: FilterExp) -> ReltabResult<Self> {
        Self::from_rep(QueryRep::Filter {
            from: Box::new(self),
            fexp,
        })
    }

    pub fn extend(
        self,
        col_id: impl Into<String>,
        col_exp: ValExp,
        opts: ColumnExtendOptions,
    ) -> ReltabResult<Self> {
        Self::from_rep(QueryRep::Extend {
            from: Box::new(self),
            col_id: col_id.into(),
            col_exp,
            opts,
        })
    }

    pub fn group_by<I>(self, cols: I, aggs: Vec<AggColSpec>) -> ReltabResult<Self>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self::from_rep(QueryRep::GroupBy {
            from: Box::new(self),
            cols: into_strings(cols),
            aggs,
        })
    }

    /// Join on columns present (under the same id) on both sides. Keys match with null-safe
    /// equality; the output has every left column followed by the right-only columns.
    ///
    /// Any other column id present on both sides is a [`ReltabError::DuplicateColumn`]; rename
    /// one side with [`QueryExp::map_columns`] first.
    pub fn join<I>(self, rhs: QueryExp, on: I, join_type: JoinType) -> ReltabResult<Self>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self::from_rep(QueryRep::Join {
            lhs: Box::new(self),
            rhs: Box::new(rhs),
            on: into_strings(on),
            join_type,
        })
    }

    /// UNION ALL. The result's column types are the pairwise unification of both inputs.
    pub fn concat(self, other: QueryExp) -> ReltabResult<Self> {
        let queries = match self.rep {
            QueryRep::Concat { mut queries } => {
                queries.push(other);
                queries
            }
            rep => vec![
                QueryExp {
                    rep,
                    schema: self.schema,
                },
                other,
            ],
        };
        Self::concat_all(queries)
    }

    pub fn concat_all(queries: Vec<QueryExp>) -> ReltabResult<Self> {
        Self::from_rep(QueryRep::Concat { queries })
    }

    pub fn sort(self, keys: Vec<SortKey>) -> ReltabResult<Self> {
        Self::from_rep(QueryRep::Sort {
            from: Box::new(self),
            keys,
        })
    }

    pub fn map_columns(self, cmap: BTreeMap<String, ColumnMapInfo>) -> ReltabResult<Self> {
        Self::from_rep(QueryRep::MapColumns {
            from: Box::new(self),
            cmap,
        })
    }

    pub fn to_json(&self) -> ReltabResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> ReltabResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
