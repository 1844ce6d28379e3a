#![allow(dead_code)]

use reltab::dialect::{self, SqliteDialect};
use reltab::{Connection, QueryExp, ReltabError, ReltabResult, Scalar, Schema, SqlDialect, TableRep};
use rusqlite::types::ValueRef;

/// In-memory SQLite backend for executing compiled queries in tests.
pub struct SqliteConnection {
    conn: rusqlite::Connection,
}

impl SqliteConnection {
    pub fn open_in_memory() -> Self {
        let conn = rusqlite::Connection::open_in_memory().expect("open sqlite");
        Self { conn }
    }

    pub fn execute_batch(&self, sql: &str) {
        self.conn.execute_batch(sql).expect("execute batch");
    }

    fn sqlite(&self) -> &'static SqliteDialect {
        dialect::sqlite()
    }
}

fn to_scalar(value: ValueRef<'_>) -> Scalar {
    match value {
        ValueRef::Null => Scalar::Null,
        ValueRef::Integer(v) => Scalar::Int(v),
        ValueRef::Real(v) => Scalar::Real(v),
        ValueRef::Text(bytes) => Scalar::Text(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Scalar::Text(format!("<{} bytes>", bytes.len())),
    }
}

impl Connection for SqliteConnection {
    fn dialect(&self) -> &dyn SqlDialect {
        self.sqlite()
    }

    fn eval_query(
        &self,
        query: &QueryExp,
        offset: Option<u64>,
        limit: Option<u64>,
    ) -> ReltabResult<TableRep> {
        let sql = self.sqlite().query_to_sql(query, offset, limit);
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
        let sql = self.sqlite().row_count_sql(query);
        let count: i64 = self
            .conn
            .query_row(&sql, [], |row| row.get(0))
            .map_err(ReltabError::connection)?;
        Ok(count.max(0) as u64)
    }

    fn get_table_schema(&self, table_name: &str) -> ReltabResult<Schema> {
        let sql = format!(
            "PRAGMA table_info({})",
            self.sqlite().quote_identifier(table_name)
        );
        let mut stmt = self.conn.prepare(&sql).map_err(ReltabError::connection)?;
        let cols = stmt
            .query_map([], |row| Ok((row.get::<_, String>(1)?, row.get::<_, String>(2)?)))
            .map_err(ReltabError::connection)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(ReltabError::connection)?;
        if cols.is_empty() {
            return Err(ReltabError::UnknownTable(table_name.to_string()));
        }
        Schema::from_types(
            cols.into_iter()
                .map(|(name, ty)| (name, self.sqlite().column_type(&ty))),
        )
    }
}

/// A small payroll table. `TCOE` sums to 1_000_000.
pub fn payroll() -> SqliteConnection {
    let conn = SqliteConnection::open_in_memory();
    conn.execute_batch(
        r#"
        CREATE TABLE payroll (
            "Name" TEXT,
            "JobFamily" TEXT,
            "Title" TEXT,
            "Union" TEXT,
            "Base" REAL,
            "TCOE" REAL,
            "Headcount" INTEGER
        );
        INSERT INTO payroll VALUES
            ('Ada',    'Engineering', 'Engineer',      'AFSCME', 120000.0, 180000.0, 1),
            ('Brook',  'Engineering', 'Engineer',      NULL,     110000.0, 165000.0, 1),
            ('Cyrus',  'Engineering', 'Manager',       NULL,     140000.0, 205000.0, 1),
            ('Dana',   'Operations',  'Train Operator','ATU',     70000.0, 110000.0, 1),
            ('Eli',    'Operations',  'Train Operator','ATU',     68000.0, 105000.0, 1),
            ('Fern',   'Operations',  'Station Agent', 'ATU',     60000.0,  95000.0, 1),
            ('Gus',    'Finance',     'Accountant',    'AFSCME',  80000.0, 140000.0, 1),
            ('Hana',   NULL,          'Intern',        NULL,           0.0,      0.0, 1);
        "#,
    );
    conn
}

impl SqliteConnection {
    /// Run already-compiled SQL (e.g. from another dialect) and collect `width` columns.
    pub fn eval_sql(&self, sql: &str, width: usize) -> Vec<Vec<Scalar>> {
        let mut stmt = self.conn.prepare(sql).expect("prepare");
        stmt.query_map([], |row| {
            (0..width)
                .map(|i| row.get_ref(i).map(to_scalar))
                .collect::<rusqlite::Result<Vec<_>>>()
        })
        .expect("query")
        .collect::<rusqlite::Result<Vec<_>>>()
        .expect("rows")
    }
}
