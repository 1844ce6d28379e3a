#![allow(dead_code)]

use reltab::dialect;
use reltab::{
    ColumnType, Connection, QueryExp, ReltabError, ReltabResult, Scalar, Schema, SqlDialect,
    TableRep,
};
use rusqlite::types::ValueRef;

pub struct SqliteConnection {
    conn: rusqlite::Connection,
}

fn to_scalar(value: ValueRef<'_>) -> Scalar {
    match value {
        ValueRef::Null => Scalar::Null,
        ValueRef::Integer(v) => Scalar::Int(v),
        ValueRef::Real(v) => Scalar::Real(v),
        ValueRef::Text(bytes) => Scalar::Text(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(_) => Scalar::Null,
    }
}

impl Connection for SqliteConnection {
    fn dialect(&self) -> &dyn SqlDialect {
        dialect::sqlite()
    }

    fn eval_query(
        &self,
        query: &QueryExp,
        offset: Option<u64>,
        limit: Option<u64>,
    ) -> ReltabResult<TableRep> {
        let sql = self.dialect().query_to_sql(query, offset, limit);
        let mut stmt = self.conn.prepare(&sql).map_err(ReltabError::connection)?;
        let width = query.schema().len();
        let rows = stmt
            .query_map([], |row| {
                (0..width)
                    .map(|i| row.get_ref(i).map(to_scalar))
                    .collect::<rusqlite::Result<Vec<_>>>()
            })
            .map_err(ReltabError::connection)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(ReltabError::connection)?;
        Ok(TableRep::new(query.schema().clone(), rows))
    }

    fn row_count(&self, query: &QueryExp) -> ReltabResult<u64> {
        let sql = self.dialect().row_count_sql(query);
        let count: i64 = self
            .conn
            .query_row(&sql, [], |row| row.get(0))
            .map_err(ReltabError::connection)?;
        Ok(count.max(0) as u64)
    }

    fn get_table_schema(&self, table_name: &str) -> ReltabResult<Schema> {
        if table_name != "payroll" {
            return Err(ReltabError::UnknownTable(table_name.to_string()));
        }
        Schema::from_types([
            ("Name", ColumnType::string()),
            ("JobFamily", ColumnType::string()),
            ("Title", ColumnType::string()),
            ("Base", ColumnType::real()),
            ("TCOE", ColumnType::real()),
        ])
    }
}

/// Payroll rows; `TCOE` totals 1_000_000, split 550k / 310k / 140k / 0 over the job families
/// Engineering / Operations / Finance / NULL.
pub fn payroll() -> SqliteConnection {
    let conn = rusqlite::Connection::open_in_memory().expect("open sqlite");
    conn.execute_batch(
        r#"
        CREATE TABLE payroll ("Name" TEXT, "JobFamily" TEXT, "Title" TEXT, "Base" REAL, "TCOE" REAL);
        INSERT INTO payroll VALUES
            ('Ada',   'Engineering', 'Engineer',       120000.0, 180000.0),
            ('Brook', 'Engineering', 'Engineer',       110000.0, 165000.0),
            ('Cyrus', 'Engineering', 'Manager',        140000.0, 205000.0),
            ('Dana',  'Operations',  'Train Operator',  70000.0, 110000.0),
            ('Eli',   'Operations',  'Train Operator',  68000.0, 105000.0),
            ('Fern',  'Operations',  'Station Agent',   60000.0,  95000.0),
            ('Gus',   'Finance',     'Accountant',      80000.0, 140000.0),
            ('Hana',  NULL,          'Intern',               0.0,      0.0);
        "#,
    )
    .expect("seed payroll");
    SqliteConnection { conn }
}

pub fn text(s: &str) -> Scalar {
    Scalar::Text(s.to_string())
}
