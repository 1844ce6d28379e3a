//! The execution contract reltab compiles for.
//!
//! reltab never executes SQL itself. A backend implements [`Connection`] by compiling the
//! [`QueryExp`] with its dialect and running the text; failures are wrapped with
//! [`ReltabError::connection`] and passed through uninterpreted.

use crate::dialect::SqlDialect;
use crate::error::{ReltabError, ReltabResult};
use crate::query::QueryExp;
use crate::schema::Schema;
use crate::value::Scalar;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A materialized query result: rows in schema column order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableRep {
    pub schema: Schema,
    pub rows: Vec<Vec<Scalar>>,
}

impl TableRep {
    pub fn new(schema: Schema, rows: Vec<Vec<Scalar>>) -> Self {
        Self { schema, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Values of one column, top to bottom.
    pub fn column(&self, id: &str) -> ReltabResult<Vec<&Scalar>> {
        let idx = self
            .schema
            .column_index(id)
            .ok_or_else(|| ReltabError::unknown_column(id, &self.schema))?;
        Ok(self.rows.iter().filter_map(|row| row.get(idx)).collect())
    }

    /// Cell at `row` in column `id`.
    pub fn get(&self, row: usize, id: &str) -> Option<&Scalar> {
        let idx = self.schema.column_index(id)?;
        self.rows.get(row)?.get(idx)
    }
}

pub trait Connection {
    fn dialect(&self) -> &dyn SqlDialect;

    /// Evaluate `query`, optionally paged.
    fn eval_query(
        &self,
        query: &QueryExp,
        offset: Option<u64>,
        limit: Option<u64>,
    ) -> ReltabResult<TableRep>;

    fn row_count(&self, query: &QueryExp) -> ReltabResult<u64>;

    fn get_table_schema(&self, table_name: &str) -> ReltabResult<Schema>;

    /// Scan of `table_name` using the schema the backend reports.
    fn table_query(&self, table_name: &str) -> ReltabResult<QueryExp> {
        Ok(QueryExp::table(table_name, self.get_table_schema(table_name)?))
    }
}

/// Known table schemas, by table name.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TableInfoMap {
    tables: BTreeMap<String, Schema>,
}

impl TableInfoMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, table_name: impl Into<String>, schema: Schema) -> Option<Schema> {
        self.tables.insert(table_name.into(), schema)
    }

    pub fn get(&self, table_name: &str) -> Option<&Schema> {
        self.tables.get(table_name)
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.tables.keys().map(String::as_str)
    }

    pub fn table_query(&self, table_name: &str) -> ReltabResult<QueryExp> {
        let schema = self
            .tables
            .get(table_name)
            .ok_or_else(|| ReltabError::UnknownTable(table_name.to_string()))?;
        Ok(QueryExp::table(table_name, schema.clone()))
    }
}

impl FromIterator<(String, Schema)> for TableInfoMap {
    fn from_iter<T: IntoIterator<Item = (String, Schema)>>(iter: T) -> Self {
        Self {
            tables: iter.into_iter().collect(),
        }
    }
}
