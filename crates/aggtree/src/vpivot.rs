//! Query generation for a vertical pivot tree.
//!
//! Every row of a tree query describes one visible node. Besides the base columns (aggregated
//! for interior nodes) each row carries:
//!
//! * `_depth`: 0 for the root, `k + 1` for the children of a length-`k` path
//! * `_pivot`: the node's own group value (or the leaf column at the bottom level)
//! * `_isRoot`
//! * `_path0 .. _path{n-1}`: the node's path, NULL past its depth
//! * `_sortVal_0 .. _sortVal_n`: `1` where `depth > i`, else `0`
//!
//! Ordering by `_sortVal_i` before anything else at level `i` is what keeps every node ahead of
//! its descendants whatever the user's sort key is.

use crate::config::PivotTreeConfig;
use crate::error::{AggTreeError, AggTreeResult};
use crate::path_tree::{PathComponent, PathTree};
use reltab::{
    as_string, col, const_val, AggColSpec, AggFn, ColumnExtendOptions, ColumnType, FilterExp,
    JoinType, QueryExp, Scalar, Schema, SortKey, ValExp,
};
use std::collections::BTreeMap;
use std::sync::Arc;

pub const DEPTH_COLUMN: &str = "_depth";
pub const PIVOT_COLUMN: &str = "_pivot";
pub const IS_ROOT_COLUMN: &str = "_isRoot";

pub fn path_column(depth: usize) -> String {
    format!("_path{depth}")
}

pub fn sort_val_column(depth: usize) -> String {
    format!("_sortVal_{depth}")
}

/// Aggregated value of sort-key column `key_idx` for the nodes at `depth`.
pub fn sort_key_column(depth: usize, key_idx: usize) -> String {
    format!("_sortVal_{depth}_{key_idx}")
}

#[derive(Clone, Debug, PartialEq)]
pub struct VPivotTree {
    base_query: QueryExp,
    pivot_columns: Vec<String>,
    pivot_leaf_column: Option<String>,
    out_cols: Vec<String>,
    root_query: Option<QueryExp>,
    sort_key: Vec<SortKey>,
    agg_map: BTreeMap<String, AggFn>,
}

fn extend_const(q: QueryExp, id: String, val: Scalar, ty: Arc<ColumnType>) -> AggTreeResult<QueryExp> {
    Ok(q.extend(id, const_val(val), ColumnExtendOptions::new(ty))?)
}

fn extend_string(q: QueryExp, id: String, exp: ValExp) -> AggTreeResult<QueryExp> {
    Ok(q.extend(id, exp, ColumnExtendOptions::new(ColumnType::string()))?)
}

impl VPivotTree {
    /// Build a pivot tree over `base_query`, grouping by `pivot_columns` in order.
    ///
    /// Every named column must exist in the base schema.
    pub fn vpivot(
        base_query: QueryExp,
        pivot_columns: Vec<String>,
        pivot_leaf_column: Option<String>,
        show_root: bool,
        sort_key: Vec<SortKey>,
        agg_map: BTreeMap<String, AggFn>,
    ) -> AggTreeResult<Self> {
        let schema = base_query.schema();
        let named = pivot_columns
            .iter()
            .chain(pivot_leaf_column.iter())
            .chain(sort_key.iter().map(|k| &k.col))
            .chain(agg_map.keys());
        for id in named {
            schema.require(id)?;
        }
        let out_cols = schema.columns().to_vec();
        let mut tree = Self {
            base_query,
            pivot_columns,
            pivot_leaf_column,
            out_cols,
            root_query: None,
            sort_key,
            agg_map,
        };
        if show_root {
            tree.root_query = Some(tree.build_root_query()?);
        }
        Ok(tree)
    }

    pub fn from_config(base_query: QueryExp, config: &PivotTreeConfig) -> AggTreeResult<Self> {
        Self::vpivot(
            base_query,
            config.pivot_columns.clone(),
            config.pivot_leaf_column.clone(),
            config.show_root,
            config.sort_key.clone(),
            config.agg_map.clone(),
        )
    }

    pub fn base_query(&self) -> &QueryExp {
        &self.base_query
    }

    pub fn base_schema(&self) -> &Schema {
        self.base_query.schema()
    }

    pub fn pivot_columns(&self) -> &[String] {
        &self.pivot_columns
    }

    pub fn pivot_leaf_column(&self) -> Option<&str> {
        self.pivot_leaf_column.as_deref()
    }

    pub fn out_cols(&self) -> &[String] {
        &self.out_cols
    }

    pub fn show_root(&self) -> bool {
        self.root_query.is_some()
    }

    pub fn root_query(&self) -> Option<&QueryExp> {
        self.root_query.as_ref()
    }

    pub fn sort_key(&self) -> &[SortKey] {
        &self.sort_key
    }

    pub fn agg_map(&self) -> &BTreeMap<String, AggFn> {
        &self.agg_map
    }

    /// Aggregation for `col`: the configured one, else its type's default.
    pub fn agg_fn(&self, col: &str) -> AggFn {
        self.agg_map.get(col).copied().unwrap_or_else(|| {
            self.base_schema()
                .column_type(col)
                .map_or(AggFn::Null, |ct| ct.default_agg_fn)
        })
    }

    fn out_aggs(&self) -> Vec<AggColSpec> {
        self.out_cols
            .iter()
            .map(|c| AggColSpec::new(self.agg_fn(c), c.as_str()))
            .collect()
    }

    /// Column order shared by every branch of the tree query.
    fn tree_columns(&self) -> Vec<String> {
        let n = self.pivot_columns.len();
        let mut cols = vec![
            DEPTH_COLUMN.to_string(),
            PIVOT_COLUMN.to_string(),
            IS_ROOT_COLUMN.to_string(),
        ];
        cols.extend((0..n).map(path_column));
        cols.extend((0..=n).map(sort_val_column));
        cols.extend(self.out_cols.iter().cloned());
        cols
    }

    fn build_root_query(&self) -> AggTreeResult<QueryExp> {
        let n = self.pivot_columns.len();
        let mut q = self
            .base_query
            .clone()
            .group_by(Vec::<String>::new(), self.out_aggs())?;
        q = extend_const(q, PIVOT_COLUMN.into(), Scalar::Null, ColumnType::string())?;
        q = extend_const(q, DEPTH_COLUMN.into(), Scalar::Int(0), ColumnType::integer())?;
        q = extend_const(q, IS_ROOT_COLUMN.into(), Scalar::Bool(true), ColumnType::boolean())?;
        for i in 0..n {
            q = extend_const(q, path_column(i), Scalar::Null, ColumnType::string())?;
        }
        for i in 0..=n {
            q = extend_const(q, sort_val_column(i), Scalar::Int(0), ColumnType::integer())?;
        }
        Ok(q.project(self.tree_columns())?)
    }

    /// Rows for the children of `path`: one aggregated row per distinct value of the next pivot
    /// column, or the matching base rows when `path` already names every pivot column.
    pub fn apply_path(&self, path: &[PathComponent]) -> AggTreeResult<QueryExp> {
        let n = self.pivot_columns.len();
        let k = path.len();
        if k > n {
            return Err(AggTreeError::InvalidPath {
                path_len: k,
                pivot_len: n,
            });
        }

        let mut fexp = FilterExp::and();
        for (pivot, component) in self.pivot_columns.iter().zip(path) {
            fexp = match component {
                None => fexp.is_null(col(pivot.as_str())),
                Some(value) => fexp.eq(as_string(col(pivot.as_str())), const_val(value.as_str())),
            };
        }
        let mut q = self.base_query.clone();
        if !fexp.is_empty() {
            q = q.filter(fexp)?;
        }

        if k < n {
            q = extend_string(q, PIVOT_COLUMN.into(), as_string(col(self.pivot_columns[k].as_str())))?;
            q = q.group_by([PIVOT_COLUMN], self.out_aggs())?;
        } else {
            let leaf = match &self.pivot_leaf_column {
                Some(leaf) => as_string(col(leaf.as_str())),
                None => const_val(""),
            };
            q = extend_string(q, PIVOT_COLUMN.into(), leaf)?;
        }

        let depth = i64::try_from(k + 1).unwrap_or(i64::MAX);
        q = extend_const(q, DEPTH_COLUMN.into(), Scalar::Int(depth), ColumnType::integer())?;
        q = extend_const(q, IS_ROOT_COLUMN.into(), Scalar::Bool(false), ColumnType::boolean())?;
        for i in 0..n {
            let exp = match path.get(i) {
                Some(Some(value)) => const_val(value.as_str()),
                Some(None) => const_val(Scalar::Null),
                None if i == k => col(PIVOT_COLUMN),
                None => const_val(Scalar::Null),
            };
            q = extend_string(q, path_column(i), exp)?;
        }
        for i in 0..=n {
            let val = if k + 1 > i { 1 } else { 0 };
            q = extend_const(q, sort_val_column(i), Scalar::Int(val), ColumnType::integer())?;
        }
        Ok(q.project(self.tree_columns())?)
    }

    /// Sort-key aggregates for the nodes at `depth` (1-based), keyed by `_path0 .. _path{depth-1}`.
    pub fn get_sort_query(&self, depth: usize) -> AggTreeResult<QueryExp> {
        let n = self.pivot_columns.len();
        if depth == 0 || depth > n {
            return Err(AggTreeError::InvalidPath {
                path_len: depth,
                pivot_len: n,
            });
        }
        let mut q = self.base_query.clone();
        for (i, pivot) in self.pivot_columns[..depth].iter().enumerate() {
            q = extend_string(q, path_column(i), as_string(col(pivot.as_str())))?;
        }
        let mut aggs = Vec::with_capacity(self.sort_key.len());
        for (j, key) in self.sort_key.iter().enumerate() {
            let id = sort_key_column(depth - 1, j);
            let ty = Arc::clone(self.base_schema().require_type(&key.col)?);
            q = q.extend(id.clone(), col(key.col.as_str()), ColumnExtendOptions::new(ty))?;
            aggs.push(AggColSpec::new(self.agg_fn(&key.col), id));
        }
        Ok(q.group_by((0..depth).map(path_column), aggs)?)
    }

    /// Union of the optional root row, the root's children and the children of every open path.
    fn tree_union(&self, open_paths: &PathTree) -> AggTreeResult<QueryExp> {
        let mut branches = Vec::with_capacity(open_paths.len() + 2);
        if let Some(root) = &self.root_query {
            branches.push(root.clone());
        }
        branches.push(self.apply_path(&[])?);
        for path in open_paths {
            branches.push(self.apply_path(&path)?);
        }
        log::debug!(
            "pivot tree over {} pivot column(s): {} branch(es)",
            self.pivot_columns.len(),
            branches.len()
        );
        Ok(QueryExp::concat_all(branches)?)
    }

    /// Every visible node, ordered by path.
    ///
    /// Paths in `open_paths` deeper than the pivot columns are rejected with
    /// [`AggTreeError::InvalidPath`]; trim the tree first when the pivots change.
    pub fn get_tree_query(&self, open_paths: &PathTree) -> AggTreeResult<QueryExp> {
        let q = self.tree_union(open_paths)?;
        let n = self.pivot_columns.len();
        if n < 2 {
            return Ok(q);
        }
        let keys = (0..n - 1).map(|i| SortKey::asc(path_column(i))).collect();
        Ok(q.sort(keys)?)
    }

    /// The tree query ordered for display: parents before children, siblings by the sort key.
    pub fn get_sorted_tree_query(&self, open_paths: &PathTree) -> AggTreeResult<QueryExp> {
        let n = self.pivot_columns.len();
        let mut q = self.tree_union(open_paths)?;
        if !self.sort_key.is_empty() {
            for depth in 1..=n {
                let sort_q = self.get_sort_query(depth)?;
                q = q.join(sort_q, (0..depth).map(path_column), JoinType::LeftOuter)?;
            }
        }

        let mut keys = Vec::new();
        if self.show_root() {
            keys.push(SortKey::desc(IS_ROOT_COLUMN));
        }
        for i in 0..n {
            keys.push(SortKey::asc(sort_val_column(i)));
            for (j, key) in self.sort_key.iter().enumerate() {
                keys.push(SortKey::new(sort_key_column(i, j), key.asc));
            }
            keys.push(SortKey::asc(path_column(i)));
        }
        keys.push(SortKey::asc(sort_val_column(n)));
        keys.extend(self.sort_key.iter().cloned());
        Ok(q.sort(keys)?)
    }
}
