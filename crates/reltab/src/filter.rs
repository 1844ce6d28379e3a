//! Scalar expressions and boolean filter expressions.

use crate::column_type::{ColumnKind, ColumnType};
use crate::error::{ReltabError, ReltabResult};
use crate::schema::Schema;
use crate::value::Scalar;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A scalar expression over the columns of a single input query.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "expType", rename_all = "camelCase")]
pub enum ValExp {
    #[serde(rename_all = "camelCase")]
    ColRef { col_name: String },
    ConstVal { val: Scalar },
    /// Cast to the dialect's string type.
    #[serde(rename_all = "camelCase")]
    AsString { val_exp: Box<ValExp> },
}

pub fn col(id: impl Into<String>) -> ValExp {
    ValExp::ColRef { col_name: id.into() }
}

pub fn const_val(val: impl Into<Scalar>) -> ValExp {
    ValExp::ConstVal { val: val.into() }
}

pub fn as_string(exp: ValExp) -> ValExp {
    ValExp::AsString {
        val_exp: Box::new(exp),
    }
}

impl ValExp {
    pub(crate) fn collect_columns<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            ValExp::ColRef { col_name } => out.push(col_name),
            ValExp::ConstVal { .. } => {}
            ValExp::AsString { val_exp } => val_exp.collect_columns(out),
        }
    }

    /// Type this expression produces when evaluated against `schema`.
    pub fn column_type(&self, schema: &Schema) -> ReltabResult<Arc<ColumnType>> {
        match self {
            ValExp::ColRef { col_name } => schema.require_type(col_name).cloned(),
            ValExp::ConstVal { val } => Ok(ColumnType::core(match val {
                Scalar::Bool(_) => ColumnKind::Boolean,
                Scalar::Int(_) => ColumnKind::Integer,
                Scalar::Real(_) => ColumnKind::Real,
                Scalar::Null | Scalar::Text(_) => ColumnKind::String,
            })),
            ValExp::AsString { .. } => Ok(ColumnType::string()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RelOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    IsNull,
    IsNotNull,
    Begins,
    NotBegins,
    Ends,
    NotEnds,
    Contains,
    NotContains,
}

impl RelOp {
    pub fn is_unary(self) -> bool {
        matches!(self, RelOp::IsNull | RelOp::IsNotNull)
    }

    pub fn is_text_op(self) -> bool {
        matches!(
            self,
            RelOp::Begins
                | RelOp::NotBegins
                | RelOp::Ends
                | RelOp::NotEnds
                | RelOp::Contains
                | RelOp::NotContains
        )
    }

    pub(crate) fn comparison_sql(self) -> Option<&'static str> {
        Some(match self {
            RelOp::Eq => "=",
            RelOp::Ne => "<>",
            RelOp::Gt => ">",
            RelOp::Ge => ">=",
            RelOp::Lt => "<",
            RelOp::Le => "<=",
            _ => return None,
        })
    }
}

/// An atomic comparison. Binary operators carry exactly two operands, unary ones exactly one.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawRelExp")]
pub struct RelExp {
    op: RelOp,
    lhs: ValExp,
    #[serde(skip_serializing_if = "Option::is_none")]
    rhs: Option<ValExp>,
}

#[derive(Deserialize)]
struct RawRelExp {
    op: RelOp,
    lhs: Option<ValExp>,
    rhs: Option<ValExp>,
}

impl TryFrom<RawRelExp> for RelExp {
    type Error = ReltabError;

    fn try_from(raw: RawRelExp) -> ReltabResult<Self> {
        let operands = raw.lhs.into_iter().chain(raw.rhs).collect();
        RelExp::new(raw.op, operands)
    }
}

impl RelExp {
    pub fn new(op: RelOp, operands: Vec<ValExp>) -> ReltabResult<Self> {
        let expected = if op.is_unary() { 1 } else { 2 };
        if operands.len() != expected {
            return Err(ReltabError::InvalidFilter(format!(
                "{op:?} expects {expected} operand(s), got {}",
                operands.len()
            )));
        }
        let mut operands = operands.into_iter();
        let lhs = operands
            .next()
            .ok_or_else(|| ReltabError::InvalidFilter(format!("{op:?} is missing its operand")))?;
        Ok(Self {
            op,
            lhs,
            rhs: operands.next(),
        })
    }

    pub fn binary(op: RelOp, lhs: ValExp, rhs: ValExp) -> ReltabResult<Self> {
        Self::new(op, vec![lhs, rhs])
    }

    pub fn unary(op: RelOp, arg: ValExp) -> ReltabResult<Self> {
        Self::new(op, vec![arg])
    }

    pub fn op(&self) -> RelOp {
        self.op
    }

    pub fn lhs(&self) -> &ValExp {
        &self.lhs
    }

    pub fn rhs(&self) -> Option<&ValExp> {
        self.rhs.as_ref()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BoolOp {
    And,
    Or,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "expType")]
pub enum SubExp {
    RelExp(RelExp),
    FilterExp(FilterExp),
}

/// `AND`/`OR` of comparisons and nested filters.
///
/// Built with chained calls: `FilterExp::and().eq(col("Region"), const_val("West"))`.
/// An empty filter, `AND` or `OR`, is always true, at the top level or nested.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterExp {
    op: BoolOp,
    op_args: Vec<SubExp>,
}

impl FilterExp {
    pub fn new(op: BoolOp) -> Self {
        Self {
            op,
            op_args: Vec::new(),
        }
    }

    pub fn and() -> Self {
        Self::new(BoolOp::And)
    }

    pub fn or() -> Self {
        Self::new(BoolOp::Or)
    }

    pub fn op(&self) -> BoolOp {
        self.op
    }

    pub fn args(&self) -> &[SubExp] {
        &self.op_args
    }

    pub fn is_empty(&self) -> bool {
        self.op_args.is_empty()
    }

    pub fn rel(mut self, exp: RelExp) -> Self {
        self.op_args.push(SubExp::RelExp(exp));
        self
    }

    pub fn sub_exp(mut self, exp: FilterExp) -> Self {
        self.op_args.push(SubExp::FilterExp(exp));
        self
    }

    fn bin(self, op: RelOp, lhs: ValExp, rhs: ValExp) -> Self {
        self.rel(RelExp {
            op,
            lhs,
            rhs: Some(rhs),
        })
    }

    fn un(self, op: RelOp, arg: ValExp) -> Self {
        self.rel(RelExp {
            op,
            lhs: arg,
            rhs: None,
        })
    }

    pub fn eq(self, lhs: ValExp, rhs: ValExp) -> Self {
        self.bin(RelOp::Eq, lhs, rhs)
    }

    pub fn ne(self, lhs: ValExp, rhs: ValExp) -> Self {
        self.bin(RelOp::Ne, lhs, rhs)
    }

    pub fn gt(self, lhs: ValExp, rhs: ValExp) -> Self {
        self.bin(RelOp::Gt, lhs, rhs)
    }

    pub fn ge(self, lhs: ValExp, rhs: ValExp) -> Self {
        self.bin(RelOp::Ge, lhs, rhs)
    }

    pub fn lt(self, lhs: ValExp, rhs: ValExp) -> Self {
        self.bin(RelOp::Lt, lhs, rhs)
    }

    pub fn le(self, lhs: ValExp, rhs: ValExp) -> Self {
        self.bin(RelOp::Le, lhs, rhs)
    }

    pub fn is_null(self, arg: ValExp) -> Self {
        self.un(RelOp::IsNull, arg)
    }

    pub fn is_not_null(self, arg: ValExp) -> Self {
        self.un(RelOp::IsNotNull, arg)
    }

    pub fn begins(self, lhs: ValExp, rhs: ValExp) -> Self {
        self.bin(RelOp::Begins, lhs, rhs)
    }

    pub fn not_begins(self, lhs: ValExp, rhs: ValExp) -> Self {
        self.bin(RelOp::NotBegins, lhs, rhs)
    }

    pub fn ends(self, lhs: ValExp, rhs: ValExp) -> Self {
        self.bin(RelOp::Ends, lhs, rhs)
    }

    pub fn not_ends(self, lhs: ValExp, rhs: ValExp) -> Self {
        self.bin(RelOp::NotEnds, lhs, rhs)
    }

    pub fn contains(self, lhs: ValExp, rhs: ValExp) -> Self {
        self.bin(RelOp::Contains, lhs, rhs)
    }

    pub fn not_contains(self, lhs: ValExp, rhs: ValExp) -> Self {
        self.bin(RelOp::NotContains, lhs, rhs)
    }

    pub(crate) fn collect_columns<'a>(&'a self, out: &mut Vec<&'a str>) {
        for arg in &self.op_args {
            match arg {
                SubExp::RelExp(rel) => {
                    rel.lhs.collect_columns(out);
                    if let Some(rhs) = &rel.rhs {
                        rhs.collect_columns(out);
                    }
                }
                SubExp::FilterExp(sub) => sub.collect_columns(out),
            }
        }
    }

    /// Column ids referenced anywhere in this filter.
    pub fn columns(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_columns(&mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_ops_require_two_operands() {
        let err = RelExp::new(RelOp::Eq, vec![col("x")]).unwrap_err();
        assert!(matches!(err, ReltabError::InvalidFilter(_)));
        assert!(RelExp::new(RelOp::IsNull, vec![col("x"), col("y")]).is_err());
        assert!(RelExp::unary(RelOp::IsNull, col("x")).is_ok());
    }

    #[test]
    fn revival_rejects_missing_rhs() {
        let json = r#"{"op":"AND","opArgs":[{"expType":"RelExp","op":"gt","lhs":{"expType":"colRef","colName":"x"}}]}"#;
        let err = serde_json::from_str::<FilterExp>(json).unwrap_err();
        assert!(err.to_string().contains("invalid filter"), "{err}");
    }

    #[test]
    fn builder_collects_referenced_columns() {
        let f = FilterExp::and()
            .eq(col("Region"), const_val("West"))
            .sub_exp(FilterExp::or().is_null(col("City")).gt(col("Sales"), const_val(10)));
        assert_eq!(f.columns(), ["Region", "City", "Sales"]);

        let json = serde_json::to_string(&f).unwrap();
        let revived: FilterExp = serde_json::from_str(&json).unwrap();
        assert_eq!(revived, f);
    }
}
