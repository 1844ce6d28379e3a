//! Dialect-neutral SQL AST and the lowering from [`QueryExp`].
//!
//! Each operator either merges into the `SELECT` produced by its input or wraps that input as an
//! aliased subquery. Merging is only done when the result is unambiguous in every dialect: a
//! `WHERE` or an extended expression may only reference input columns that are passed through
//! unchanged (never an expression alias defined in the same select list), and a group-by always
//! starts from a plain select.

use crate::column_type::{same_type, AggFn, ColumnType};
use crate::filter::{FilterExp, ValExp};
use crate::query::{JoinType, QueryExp, QueryRep, SortKey};
use crate::schema::Schema;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JoinSide {
    Left,
    Right,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SqlValExp {
    /// Expression over the columns of the select's `FROM` item.
    Val(ValExp),
    /// Column of one side of a join.
    JoinCol { side: JoinSide, col: String },
    Agg {
        agg_fn: AggFn,
        col: String,
        col_type: Arc<ColumnType>,
    },
    Cast {
        exp: Box<SqlValExp>,
        to: Arc<ColumnType>,
    },
    RowNumber { order_by: Vec<SortKey> },
    CountStar,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SqlSelectItem {
    pub exp: SqlValExp,
    pub col_type: Arc<ColumnType>,
    pub alias: String,
}

impl SqlSelectItem {
    pub fn column(id: &str, col_type: Arc<ColumnType>) -> Self {
        Self {
            exp: SqlValExp::Val(crate::filter::col(id)),
            col_type,
            alias: id.to_string(),
        }
    }

    /// A plain pass-through of the `FROM` column with the same name.
    pub fn is_identity(&self) -> bool {
        matches!(&self.exp, SqlValExp::Val(ValExp::ColRef { col_name }) if *col_name == self.alias)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum SqlFrom {
    Table(String),
    Sql(String),
    Subquery(Box<SqlQuery>),
    Join {
        lhs: Box<SqlQuery>,
        rhs: Box<SqlQuery>,
        join_type: JoinType,
        on: Vec<String>,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct SqlSelect {
    pub items: Vec<SqlSelectItem>,
    pub from: SqlFrom,
    pub where_: Option<FilterExp>,
    /// `FROM` columns to group by.
    pub group_by: Vec<String>,
    /// Output columns to order by.
    pub order_by: Vec<SortKey>,
    /// Pass-through columns dropped from the select list that `order_by` still references.
    /// Not rendered.
    pub order_only: Vec<SqlSelectItem>,
}

impl SqlSelect {
    pub fn new(items: Vec<SqlSelectItem>, from: SqlFrom) -> Self {
        Self {
            items,
            from,
            where_: None,
            group_by: Vec::new(),
            order_by: Vec::new(),
            order_only: Vec::new(),
        }
    }

    /// `SELECT <every column of schema> FROM (<query>)`.
    pub fn wrap(query: SqlQuery, schema: &Schema) -> Self {
        let items = schema
            .iter()
            .map(|(id, md)| SqlSelectItem::column(id, Arc::clone(&md.column_type)))
            .collect();
        Self::new(items, SqlFrom::Subquery(Box::new(query)))
    }

    fn item(&self, alias: &str) -> Option<&SqlSelectItem> {
        self.items.iter().find(|item| item.alias == alias)
    }

    fn passes_through(&self, cols: &[&str]) -> bool {
        cols.iter()
            .all(|c| self.item(c).is_some_and(SqlSelectItem::is_identity))
    }

    fn is_join(&self) -> bool {
        matches!(self.from, SqlFrom::Join { .. })
    }

    /// Whether `order_by` references `alias` without it being in the select list.
    fn orders_by_hidden(&self, alias: &str) -> bool {
        self.order_only.iter().any(|item| item.alias == alias)
    }

    /// Whether the select list may drop sort key `alias` while `ORDER BY` keeps resolving it
    /// against the `FROM` columns.
    fn can_hide_sort_key(&self, alias: &str) -> bool {
        self.orders_by_hidden(alias)
            || (self.group_by.is_empty()
                && !self.is_join()
                && self.item(alias).is_some_and(SqlSelectItem::is_identity))
    }

    /// Make hidden sort columns part of the select list again.
    pub fn expose_order_only(&mut self) {
        let hidden = std::mem::take(&mut self.order_only);
        self.items.extend(hidden);
    }
}

/// One or more selects combined with `UNION ALL`.
#[derive(Clone, Debug, PartialEq)]
pub struct SqlQuery {
    pub selects: Vec<SqlSelect>,
}

impl SqlQuery {
    pub fn single(select: SqlSelect) -> Self {
        Self {
            selects: vec![select],
        }
    }

    /// The lone select, or the query back if it is a union.
    pub fn into_single(mut self) -> Result<SqlSelect, SqlQuery> {
        if self.selects.len() == 1 {
            Ok(self.selects.remove(0))
        } else {
            Err(self)
        }
    }
}

/// Like [`select_for`], for operators that keep the input's row order. A sorted select that
/// has to be wrapped hands its `ORDER BY` to the wrapper.
fn ordered_select_for(
    input: SqlQuery,
    schema: &Schema,
    mergeable: impl FnOnce(&SqlSelect) -> bool,
) -> SqlSelect {
    match input.into_single() {
        Ok(sel) if mergeable(&sel) => {
            log::trace!("merging into existing select");
            sel
        }
        Ok(mut sel) if !sel.order_by.is_empty() => {
            let mut order_by = std::mem::take(&mut sel.order_by);
            // Hidden sort columns become outputs of the subquery under reserved names.
            let mut order_only = Vec::new();
            for (idx, mut item) in std::mem::take(&mut sel.order_only).into_iter().enumerate() {
                let exposed = format!("_order{idx}");
                for key in order_by.iter_mut().filter(|k| k.col == item.alias) {
                    key.col = exposed.clone();
                }
                item.alias = exposed.clone();
                sel.items.push(item.clone());
                order_only.push(SqlSelectItem::column(&exposed, item.col_type));
            }
            let mut wrapper = SqlSelect::wrap(SqlQuery::single(sel), schema);
            wrapper.order_by = order_by;
            wrapper.order_only = order_only;
            wrapper
        }
        Ok(sel) => SqlSelect::wrap(SqlQuery::single(sel), schema),
        Err(union) => SqlSelect::wrap(union, schema),
    }
}

/// Take the input's select if `mergeable` accepts it, otherwise wrap the input as a subquery.
fn select_for(
    input: SqlQuery,
    schema: &Schema,
    mergeable: impl FnOnce(&SqlSelect) -> bool,
) -> SqlSelect {
    match input.into_single() {
        Ok(sel) if mergeable(&sel) => {
            log::trace!("merging into existing select");
            sel
        }
        Ok(sel) => SqlSelect::wrap(SqlQuery::single(sel), schema),
        Err(union) => SqlSelect::wrap(union, schema),
    }
}

impl QueryExp {
    /// Lower this query to the dialect-neutral SQL AST.
    pub fn to_sql_ast(&self) -> SqlQuery {
        lower(self)
    }
}

fn lower(query: &QueryExp) -> SqlQuery {
    match query.rep() {
        QueryRep::Table { table_name, schema } => SqlQuery::single(SqlSelect::new(
            identity_items(schema),
            SqlFrom::Table(table_name.clone()),
        )),
        QueryRep::Sql { sql_query, schema } => SqlQuery::single(SqlSelect::new(
            identity_items(schema),
            SqlFrom::Sql(sql_query.clone()),
        )),
        QueryRep::Project { from, cols } => {
            let mut sel = ordered_select_for(lower(from), from.schema(), |sel| {
                sel.order_by
                    .iter()
                    .all(|k| cols.contains(&k.col) || sel.can_hide_sort_key(&k.col))
            });
            let dropped: Vec<SqlSelectItem> = sel
                .order_by
                .iter()
                .filter(|k| !cols.contains(&k.col) && !sel.orders_by_hidden(&k.col))
                .filter_map(|k| sel.item(&k.col).cloned())
                .collect();
            sel.order_only.extend(dropped);
            sel.items = cols
                .iter()
                .filter_map(|c| sel.item(c).cloned())
                .collect();
            SqlQuery::single(sel)
        }
        QueryRep::Filter { from, fexp } => {
            let refs = fexp.columns();
            let mut sel = ordered_select_for(lower(from), from.schema(), |sel| {
                sel.group_by.is_empty() && !sel.is_join() && sel.passes_through(&refs)
            });
            sel.where_ = Some(match sel.where_.take() {
                Some(existing) => FilterExp::and().sub_exp(existing).sub_exp(fexp.clone()),
                None => fexp.clone(),
            });
            SqlQuery::single(sel)
        }
        QueryRep::Extend {
            from,
            col_id,
            col_exp,
            opts,
        } => {
            let mut refs = Vec::new();
            col_exp.collect_columns(&mut refs);
            let mut sel = ordered_select_for(lower(from), from.schema(), |sel| {
                !sel.is_join() && sel.passes_through(&refs) && !sel.orders_by_hidden(col_id)
            });
            sel.items.push(SqlSelectItem {
                exp: SqlValExp::Val(col_exp.clone()),
                col_type: Arc::clone(&opts.column_type),
                alias: col_id.clone(),
            });
            SqlQuery::single(sel)
        }
        QueryRep::GroupBy { from, cols, aggs } => {
            let refs: Vec<&str> = cols
                .iter()
                .map(String::as_str)
                .chain(aggs.iter().map(|a| a.col.as_str()))
                .collect();
            let mut sel = select_for(lower(from), from.schema(), |sel| {
                sel.group_by.is_empty()
                    && sel.order_by.is_empty()
                    && !sel.is_join()
                    && sel.passes_through(&refs)
            });
            let in_schema = from.schema();
            let mut items: Vec<SqlSelectItem> = cols
                .iter()
                .filter_map(|c| {
                    let ct = in_schema.column_type(c)?;
                    Some(SqlSelectItem::column(c, Arc::clone(ct)))
                })
                .collect();
            items.extend(aggs.iter().filter_map(|agg| {
                let in_type = in_schema.column_type(&agg.col)?;
                Some(SqlSelectItem {
                    exp: SqlValExp::Agg {
                        agg_fn: agg.agg_fn,
                        col: agg.col.clone(),
                        col_type: Arc::clone(in_type),
                    },
                    col_type: agg.agg_fn.result_type(in_type),
                    alias: agg.col.clone(),
                })
            }));
            sel.items = items;
            sel.group_by = cols.clone();
            SqlQuery::single(sel)
        }
        QueryRep::Join {
            lhs,
            rhs,
            on,
            join_type,
        } => {
            let items = query
                .schema()
                .iter()
                .map(|(id, md)| {
                    let side = if lhs.schema().has_column(id) {
                        JoinSide::Left
                    } else {
                        JoinSide::Right
                    };
                    SqlSelectItem {
                        exp: SqlValExp::JoinCol {
                            side,
                            col: id.to_string(),
                        },
                        col_type: Arc::clone(&md.column_type),
                        alias: id.to_string(),
                    }
                })
                .collect();
            SqlQuery::single(SqlSelect::new(
                items,
                SqlFrom::Join {
                    lhs: Box::new(lower(lhs)),
                    rhs: Box::new(lower(rhs)),
                    join_type: *join_type,
                    on: on.clone(),
                },
            ))
        }
        QueryRep::Concat { queries } => {
            let target = query.schema();
            let mut selects = Vec::new();
            for branch in queries {
                let lowered = match lower(branch).into_single() {
                    Ok(sel) if sel.order_by.is_empty() => SqlQuery::single(sel),
                    Ok(sel) => SqlQuery::single(SqlSelect::wrap(SqlQuery::single(sel), branch.schema())),
                    Err(union) => union,
                };
                for mut sel in lowered.selects {
                    sel.items = target
                        .iter()
                        .filter_map(|(id, md)| {
                            let mut item = sel.item(id)?.clone();
                            if !same_type(&item.col_type, &md.column_type) {
                                item.exp = SqlValExp::Cast {
                                    exp: Box::new(item.exp),
                                    to: Arc::clone(&md.column_type),
                                };
                                item.col_type = Arc::clone(&md.column_type);
                            }
                            Some(item)
                        })
                        .collect();
                    selects.push(sel);
                }
            }
            SqlQuery { selects }
        }
        QueryRep::Sort { from, keys } => {
            let mut sel = select_for(lower(from), from.schema(), |sel| !sel.is_join());
            sel.order_by = keys.clone();
            sel.order_only.clear();
            SqlQuery::single(sel)
        }
        QueryRep::MapColumns { from, cmap } => {
            let mut sel = ordered_select_for(lower(from), from.schema(), |sel| {
                !cmap
                    .values()
                    .filter_map(|info| info.id.as_deref())
                    .any(|id| sel.orders_by_hidden(id))
            });
            for item in &mut sel.items {
                if let Some(new_id) = cmap.get(&item.alias).and_then(|info| info.id.as_ref()) {
                    item.alias = new_id.clone();
                }
            }
            for key in &mut sel.order_by {
                if let Some(new_id) = cmap.get(&key.col).and_then(|info| info.id.as_ref()) {
                    key.col = new_id.clone();
                }
            }
            SqlQuery::single(sel)
        }
    }
}

fn identity_items(schema: &Schema) -> Vec<SqlSelectItem> {
    schema
        .iter()
        .map(|(id, md)| SqlSelectItem::column(id, Arc::clone(&md.column_type)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{col, const_val};
    use crate::query::{AggColSpec, ColumnExtendOptions};

    fn base() -> QueryExp {
        QueryExp::table(
            "sales",
            Schema::from_types([
                ("Region", ColumnType::string()),
                ("Amount", ColumnType::real()),
            ])
            .unwrap(),
        )
    }

    #[test]
    fn filter_and_project_merge_into_table_select() {
        let q = base()
            .filter(FilterExp::and().eq(col("Region"), const_val("West")))
            .unwrap()
            .project(["Amount"])
            .unwrap();
        let ast = q.to_sql_ast();
        assert_eq!(ast.selects.len(), 1);
        assert_eq!(ast.selects[0].from, SqlFrom::Table("sales".into()));
        assert!(ast.selects[0].where_.is_some());
    }

    #[test]
    fn group_by_over_extended_column_uses_subquery() {
        let q = base()
            .extend(
                "_pivot",
                col("Region"),
                ColumnExtendOptions::new(ColumnType::string()),
            )
            .unwrap()
            .group_by(["_pivot"], vec![AggColSpec::new(AggFn::Sum, "Amount")])
            .unwrap();
        let ast = q.to_sql_ast();
        let sel = &ast.selects[0];
        assert!(matches!(sel.from, SqlFrom::Subquery(_)));
        assert_eq!(sel.group_by, ["_pivot"]);
    }

    #[test]
    fn project_dropping_sort_key_keeps_order_in_same_select() {
        let q = base()
            .sort(vec![SortKey::desc("Amount")])
            .unwrap()
            .project(["Region"])
            .unwrap();
        let sel = &q.to_sql_ast().selects[0];
        assert_eq!(sel.from, SqlFrom::Table("sales".into()));
        assert_eq!(sel.order_by, [SortKey::desc("Amount")]);
        assert_eq!(sel.items.len(), 1);
        assert_eq!(sel.order_only.len(), 1);
        assert_eq!(sel.order_only[0].alias, "Amount");
    }

    #[test]
    fn wrapping_a_sorted_select_moves_the_order_outward() {
        let q = base()
            .extend(
                "Label",
                crate::filter::as_string(col("Amount")),
                ColumnExtendOptions::new(ColumnType::string()),
            )
            .unwrap()
            .sort(vec![SortKey::asc("Label")])
            .unwrap()
            .project(["Region"])
            .unwrap();
        let sel = &q.to_sql_ast().selects[0];
        assert_eq!(sel.order_by, [SortKey::asc("Label")]);
        let SqlFrom::Subquery(inner) = &sel.from else {
            panic!("expected subquery, got {:?}", sel.from);
        };
        assert!(inner.selects[0].order_by.is_empty());
    }

    #[test]
    fn filter_after_group_by_wraps() {
        let q = base()
            .group_by(["Region"], vec![AggColSpec::new(AggFn::Sum, "Amount")])
            .unwrap()
            .filter(FilterExp::and().gt(col("Amount"), const_val(10)))
            .unwrap();
        let sel = &q.to_sql_ast().selects[0];
        assert!(matches!(sel.from, SqlFrom::Subquery(_)));
        assert!(sel.group_by.is_empty());
    }
}
