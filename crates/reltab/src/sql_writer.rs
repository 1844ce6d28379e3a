//! Renders the SQL AST as text for one dialect.

use crate::column_type::{AggFn, ColumnType};
use crate::dialect::SqlDialect;
use crate::filter::{FilterExp, RelExp, RelOp, SubExp, ValExp};
use crate::query::{JoinType, SortKey};
use crate::sql_ast::{JoinSide, SqlFrom, SqlQuery, SqlSelect, SqlSelectItem, SqlValExp};
use crate::value::Scalar;

const INDENT: &str = "  ";

/// Writes one query. Subquery aliases are numbered per writer, so compiling the same AST twice
/// produces identical text.
pub(crate) struct SqlWriter<'a, D: SqlDialect + ?Sized> {
    dialect: &'a D,
    next_alias: usize,
}

/// Aliases visible to the select list of one select.
enum Scope {
    Plain,
    Join { lhs: String, rhs: String },
}

impl<'a, D: SqlDialect + ?Sized> SqlWriter<'a, D> {
    pub(crate) fn new(dialect: &'a D) -> Self {
        Self {
            dialect,
            next_alias: 0,
        }
    }

    fn alias(&mut self) -> String {
        let alias = format!("_subq{}", self.next_alias);
        self.next_alias += 1;
        self.dialect.quote_identifier(&alias)
    }

    pub(crate) fn query(&mut self, query: &SqlQuery) -> String {
        let selects: Vec<String> = query.selects.iter().map(|s| self.select(s)).collect();
        selects.join("\nUNION ALL\n")
    }

    fn subquery(&mut self, query: &SqlQuery) -> String {
        let body = self.query(query);
        let indented: Vec<String> = body.lines().map(|l| format!("{INDENT}{l}")).collect();
        format!("(\n{}\n)", indented.join("\n"))
    }

    fn select(&mut self, sel: &SqlSelect) -> String {
        let (from, scope) = self.from(&sel.from);
        let items: Vec<String> = sel.items.iter().map(|item| self.item(item, &scope)).collect();
        let mut out = format!("SELECT {}\nFROM {from}", items.join(", "));
        if let Some(fexp) = sel.where_.as_ref().filter(|f| !f.is_empty()) {
            out.push_str("\nWHERE ");
            out.push_str(&self.filter(fexp));
        }
        if !sel.group_by.is_empty() {
            let cols: Vec<String> = sel
                .group_by
                .iter()
                .map(|c| self.dialect.quote_identifier(c))
                .collect();
            out.push_str("\nGROUP BY ");
            out.push_str(&cols.join(", "));
        }
        if !sel.order_by.is_empty() {
            out.push_str("\nORDER BY ");
            out.push_str(&self.sort_keys(&sel.order_by));
        }
        out
    }

    fn from(&mut self, from: &SqlFrom) -> (String, Scope) {
        match from {
            SqlFrom::Table(name) => (self.dialect.quote_identifier(name), Scope::Plain),
            SqlFrom::Sql(raw) => {
                let indented: Vec<String> = raw.lines().map(|l| format!("{INDENT}{l}")).collect();
                let alias = self.alias();
                (format!("(\n{}\n) AS {alias}", indented.join("\n")), Scope::Plain)
            }
            SqlFrom::Subquery(query) => {
                let body = self.subquery(query);
                let alias = self.alias();
                (format!("{body} AS {alias}"), Scope::Plain)
            }
            SqlFrom::Join {
                lhs,
                rhs,
                join_type,
                on,
            } => {
                let lhs_body = self.subquery(lhs);
                let lhs_alias = self.alias();
                let rhs_body = self.subquery(rhs);
                let rhs_alias = self.alias();
                let keyword = match join_type {
                    JoinType::Inner => "INNER JOIN",
                    JoinType::LeftOuter => "LEFT OUTER JOIN",
                };
                let conds: Vec<String> = on
                    .iter()
                    .map(|key| {
                        let key = self.dialect.quote_identifier(key);
                        self.dialect.null_safe_eq(
                            &format!("{lhs_alias}.{key}"),
                            &format!("{rhs_alias}.{key}"),
                        )
                    })
                    .collect();
                let on_sql = if conds.is_empty() {
                    self.dialect.bool_literal(true).to_string()
                } else {
                    conds.join(" AND ")
                };
                (
                    format!("{lhs_body} AS {lhs_alias}\n{keyword} {rhs_body} AS {rhs_alias}\nON {on_sql}"),
                    Scope::Join {
                        lhs: lhs_alias,
                        rhs: rhs_alias,
                    },
                )
            }
        }
    }

    fn item(&self, item: &SqlSelectItem, scope: &Scope) -> String {
        if item.is_identity() {
            return self.dialect.quote_identifier(&item.alias);
        }
        let exp = match &item.exp {
            SqlValExp::Val(ValExp::ConstVal { val: Scalar::Null }) => {
                self.dialect.null_cast(&item.col_type)
            }
            exp => self.sql_exp(exp, scope),
        };
        format!("{exp} AS {}", self.dialect.quote_identifier(&item.alias))
    }

    fn sql_exp(&self, exp: &SqlValExp, scope: &Scope) -> String {
        match exp {
            SqlValExp::Val(val) => self.val_exp(val),
            SqlValExp::JoinCol { side, col } => {
                let col = self.dialect.quote_identifier(col);
                match (scope, side) {
                    (Scope::Join { lhs, .. }, JoinSide::Left) => format!("{lhs}.{col}"),
                    (Scope::Join { rhs, .. }, JoinSide::Right) => format!("{rhs}.{col}"),
                    (Scope::Plain, _) => col,
                }
            }
            SqlValExp::Agg {
                agg_fn,
                col,
                col_type,
            } => self.agg(*agg_fn, col, col_type),
            SqlValExp::Cast { exp, to } => {
                if matches!(**exp, SqlValExp::Val(ValExp::ConstVal { val: Scalar::Null })) {
                    return self.dialect.null_cast(to);
                }
                format!(
                    "CAST({} AS {})",
                    self.sql_exp(exp, scope),
                    self.dialect.type_name(to)
                )
            }
            SqlValExp::RowNumber { order_by } => {
                if order_by.is_empty() {
                    "ROW_NUMBER() OVER ()".to_string()
                } else {
                    format!("ROW_NUMBER() OVER (ORDER BY {})", self.sort_keys(order_by))
                }
            }
            SqlValExp::CountStar => "COUNT(*)".to_string(),
        }
    }

    fn agg(&self, agg_fn: AggFn, col: &str, col_type: &ColumnType) -> String {
        let c = self.dialect.quote_identifier(col);
        match agg_fn {
            AggFn::Avg => format!("AVG({c})"),
            AggFn::Count => format!("COUNT({c})"),
            AggFn::Min => format!("MIN({c})"),
            AggFn::Max => format!("MAX({c})"),
            AggFn::Sum => format!("SUM({c})"),
            AggFn::Uniq => format!("CASE WHEN MIN({c}) = MAX({c}) THEN MIN({c}) ELSE NULL END"),
            AggFn::Null => self.dialect.null_cast(col_type),
            AggFn::NullStr => self.dialect.null_cast(&ColumnType::string()),
        }
    }

    fn val_exp(&self, val: &ValExp) -> String {
        match val {
            ValExp::ColRef { col_name } => self.dialect.quote_identifier(col_name),
            ValExp::ConstVal { val } => self.literal(val),
            ValExp::AsString { val_exp } => format!(
                "CAST({} AS {})",
                self.val_exp(val_exp),
                self.dialect.type_name(&ColumnType::string())
            ),
        }
    }

    fn literal(&self, val: &Scalar) -> String {
        match val {
            Scalar::Null => "NULL".to_string(),
            Scalar::Bool(b) => self.dialect.bool_literal(*b).to_string(),
            Scalar::Int(v) => v.to_string(),
            Scalar::Real(v) => format!("{v:?}"),
            Scalar::Text(s) => self.dialect.string_literal(s),
        }
    }

    fn sort_keys(&self, keys: &[SortKey]) -> String {
        let keys: Vec<String> = keys
            .iter()
            .map(|k| {
                format!(
                    "{} {}",
                    self.dialect.quote_identifier(&k.col),
                    if k.asc { "ASC" } else { "DESC" }
                )
            })
            .collect();
        keys.join(", ")
    }

    fn filter(&self, fexp: &FilterExp) -> String {
        let joiner = match fexp.op() {
            crate::filter::BoolOp::And => " AND ",
            crate::filter::BoolOp::Or => " OR ",
        };
        let parts: Vec<String> = fexp
            .args()
            .iter()
            .map(|arg| match arg {
                SubExp::RelExp(rel) => self.rel(rel),
                SubExp::FilterExp(sub) => self.filter(sub),
            })
            .collect();
        match parts.len() {
            0 => "1=1".to_string(),
            1 => parts.into_iter().next().unwrap_or_default(),
            _ => format!("({})", parts.join(joiner)),
        }
    }

    fn rel(&self, rel: &RelExp) -> String {
        let lhs = self.val_exp(rel.lhs());
        let op = rel.op();
        if let Some(cmp) = op.comparison_sql() {
            let rhs = rel.rhs().map(|r| self.val_exp(r)).unwrap_or_default();
            return format!("{lhs} {cmp} {rhs}");
        }
        match op {
            RelOp::IsNull => format!("{lhs} IS NULL"),
            RelOp::IsNotNull => format!("{lhs} IS NOT NULL"),
            _ => {
                let negated = matches!(op, RelOp::NotBegins | RelOp::NotEnds | RelOp::NotContains);
                let (prefix, suffix) = match op {
                    RelOp::Begins | RelOp::NotBegins => ("", "%"),
                    RelOp::Ends | RelOp::NotEnds => ("%", ""),
                    _ => ("%", "%"),
                };
                let pattern = match rel.rhs() {
                    Some(ValExp::ConstVal {
                        val: Scalar::Text(s),
                    }) => self
                        .dialect
                        .string_literal(&format!("{prefix}{}{suffix}", escape_like(s))),
                    Some(other) => {
                        let mut pieces = Vec::new();
                        if !prefix.is_empty() {
                            pieces.push(self.dialect.string_literal(prefix));
                        }
                        pieces.push(self.val_exp(other));
                        if !suffix.is_empty() {
                            pieces.push(self.dialect.string_literal(suffix));
                        }
                        pieces.join(" || ")
                    }
                    None => self.dialect.string_literal("%"),
                };
                let like = if negated { "NOT LIKE" } else { "LIKE" };
                format!("{lhs} {like} {pattern}{}", self.dialect.like_escape_clause())
            }
        }
    }
}

fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_patterns_escape_wildcards() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
    }
}
