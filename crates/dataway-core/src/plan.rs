//! Query plan IR (§4.7): the dialect-neutral shape the compiler emits and a
//! provider's renderer turns into actual SQL/BSON. Grounded in the teacher's
//! `qb` module (`qb::select::Select`, `qb::expr::Expr`), generalized so a
//! single plan can be rendered by more than one dialect.

use crate::options::{LogicOp, ResponseFormat, SortDir};
use crate::value::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub enum FilterExpr {
    Compare {
        column: String,
        op: CompareOp,
        value: Value,
    },
    Between {
        column: String,
        low: Value,
        high: Value,
        inclusive: bool,
    },
    In {
        column: String,
        values: Vec<Value>,
    },
    IsNull {
        column: String,
        negated: bool,
    },
    /// A pre-sanitized raw fragment (custom WHERE/OR, or a preload scope).
    Raw(String),
    And(Vec<FilterExpr>),
    Or(Vec<FilterExpr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    Ilike,
}

/// Combine a list of filter expressions using each item's own logic flag,
/// left-to-right, matching `Filters[]`'s per-filter `AND|OR` composition.
pub fn combine_filters(exprs: Vec<(FilterExpr, LogicOp)>) -> Option<FilterExpr> {
    let mut iter = exprs.into_iter();
    let (first, _) = iter.next()?;
    let mut acc = first;
    for (expr, logic) in iter {
        acc = match logic {
            LogicOp::And => FilterExpr::And(vec![acc, expr]),
            LogicOp::Or => FilterExpr::Or(vec![acc, expr]),
        };
    }
    Some(acc)
}

#[derive(Debug, Clone)]
pub struct SortExpr {
    pub column: String,
    pub direction: SortDir,
    /// True for a parenthesized raw expression, emitted verbatim (§4.7 Sort).
    pub raw: bool,
}

#[derive(Debug, Clone)]
pub struct ProjectionColumn {
    pub expr: String,
    pub alias: Option<String>,
    /// Aliases containing "cql" are cast to text (§4.7 Projection).
    pub cast_text: bool,
}

#[derive(Debug, Clone)]
pub struct CursorToken {
    pub sort_values: Vec<Value>,
    pub pk_value: Value,
    pub forward: bool,
}

/// A preload, compiled into its own nested select with an alias derived from
/// its dotted relation path (§4.7 "Computed-column alias rewriting").
#[derive(Debug, Clone)]
pub struct PreloadPlan {
    pub relation_path: String,
    pub alias: String,
    pub related_table: String,
    pub foreign_key: String,
    pub references: String,
    pub join_table: Option<String>,
    pub columns: Vec<ProjectionColumn>,
    pub filter: Option<FilterExpr>,
    pub sort: Vec<SortExpr>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub recursive: bool,
    pub children: Vec<PreloadPlan>,
}

impl PreloadPlan {
    /// "lower(relation.path) with '.' replaced by '__'" (§4.7).
    pub fn derive_alias(relation_path: &str) -> String {
        relation_path.to_ascii_lowercase().replace('.', "__")
    }
}

#[derive(Debug, Clone)]
pub struct SelectPlan {
    pub schema: String,
    pub table: String,
    pub distinct: bool,
    pub columns: Vec<ProjectionColumn>,
    pub filter: Option<FilterExpr>,
    pub sort: Vec<SortExpr>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub cursor: Option<CursorToken>,
    pub preloads: Vec<PreloadPlan>,
    pub skip_count: bool,
    pub skip_cache: bool,
    pub fetch_row_number_for: Option<Value>,
    pub response_format: ResponseFormat,
    pub single_record_as_object: bool,
    pub clean_json: bool,
}

#[derive(Debug, Clone)]
pub struct InsertPlan {
    pub schema: String,
    pub table: String,
    pub values: BTreeMap<String, Value>,
}

#[derive(Debug, Clone)]
pub struct UpdatePlan {
    pub schema: String,
    pub table: String,
    pub values: BTreeMap<String, Value>,
    pub filter: FilterExpr,
}

#[derive(Debug, Clone)]
pub struct DeletePlan {
    pub schema: String,
    pub table: String,
    pub filter: FilterExpr,
}

#[derive(Debug, Clone)]
pub enum QueryPlan {
    Select(SelectPlan),
    Insert(InsertPlan),
    Update(UpdatePlan),
    Delete(DeletePlan),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combine_filters_chains_logic_left_to_right() {
        let a = FilterExpr::Compare { column: "a".into(), op: CompareOp::Eq, value: Value::Int(1) };
        let b = FilterExpr::Compare { column: "b".into(), op: CompareOp::Eq, value: Value::Int(2) };
        let combined = combine_filters(vec![(a, LogicOp::And), (b, LogicOp::Or)]).unwrap();
        assert!(matches!(combined, FilterExpr::Or(_)));
    }

    #[test]
    fn preload_alias_replaces_dots_with_double_underscore() {
        assert_eq!(PreloadPlan::derive_alias("Orders.Items"), "orders__items");
    }
}
