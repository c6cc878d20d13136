//! Decoded request options (§3 "Request options"): the typed record the
//! header decoder produces and the compiler consumes. Field shapes mirror
//! the wire JSON of §6 one-for-one so `serde` does most of the decoding
//! work, the way the teacher's `builder` types (`OrderBy`, `Pagination`,
//! `WhereExpr`) mirror their SQL counterparts.

use crate::value::Value;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicOp {
    And,
    Or,
}

impl Default for LogicOp {
    fn default() -> Self {
        LogicOp::And
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    Ilike,
    In,
    /// Exclusive range.
    Between,
    BetweenInclusive,
    IsNull,
    IsNotNull,
}

impl FilterOp {
    /// Accepts the documented synonyms (§4.7).
    pub fn parse(raw: &str) -> Option<Self> {
        Some(match raw.to_ascii_lowercase().as_str() {
            "eq" | "=" => FilterOp::Eq,
            "neq" | "ne" | "!=" | "<>" => FilterOp::Neq,
            "gt" | ">" => FilterOp::Gt,
            "gte" | ">=" => FilterOp::Gte,
            "lt" | "<" => FilterOp::Lt,
            "lte" | "<=" => FilterOp::Lte,
            "like" => FilterOp::Like,
            "ilike" => FilterOp::Ilike,
            "in" => FilterOp::In,
            "between" => FilterOp::Between,
            "between_inclusive" | "betweeninclusive" => FilterOp::BetweenInclusive,
            "is_null" | "isnull" => FilterOp::IsNull,
            "is_not_null" | "isnotnull" | "not_null" => FilterOp::IsNotNull,
            _ => return None,
        })
    }

    pub fn is_null_check(self) -> bool {
        matches!(self, FilterOp::IsNull | FilterOp::IsNotNull)
    }

    pub fn is_between(self) -> bool {
        matches!(self, FilterOp::Between | FilterOp::BetweenInclusive)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Filter {
    pub column: String,
    pub operator: FilterOp,
    #[serde(default)]
    pub value: FilterValue,
    #[serde(default)]
    pub logic: LogicOp,
}

/// A filter value is either scalar (most operators) or a list (`in`,
/// `between*`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    #[default]
    None,
    Scalar(Value),
    List(Vec<Value>),
}

impl FilterValue {
    pub fn as_list(&self) -> Vec<Value> {
        match self {
            FilterValue::None => vec![],
            FilterValue::Scalar(v) => vec![v.clone()],
            FilterValue::List(vs) => vs.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDir {
    Asc,
    Desc,
}

impl Default for SortDir {
    fn default() -> Self {
        SortDir::Asc
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SortTerm {
    pub column: String,
    #[serde(default)]
    pub direction: SortDir,
}

impl SortTerm {
    /// A parenthesized term is treated as a raw expression (§4.7 Sort).
    pub fn is_expression(&self) -> bool {
        self.column.trim_start().starts_with('(')
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PreloadSpec {
    pub relation: String,
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub filters: Vec<Filter>,
    #[serde(default)]
    pub sort: Vec<SortTerm>,
    #[serde(default)]
    pub where_fragment: Option<String>,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
    #[serde(default)]
    pub recursive: bool,
    #[serde(default)]
    pub computed_ql: std::collections::BTreeMap<String, String>,
    /// Nested preloads under this one; depth is capped at 5 (§3).
    #[serde(default)]
    pub preload: Vec<PreloadSpec>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    Detail,
    Simple,
    Syncfusion,
}

impl Default for ResponseFormat {
    fn default() -> Self {
        ResponseFormat::Detail
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestOptions {
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub omit_columns: Vec<String>,
    #[serde(default)]
    pub filters: Vec<Filter>,
    #[serde(default)]
    pub sort: Vec<SortTerm>,
    #[serde(default)]
    pub preload: Vec<PreloadSpec>,
    #[serde(default)]
    pub custom_sql_where: Option<String>,
    #[serde(default)]
    pub custom_sql_or: Option<String>,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
    #[serde(default)]
    pub cursor_forward: Option<String>,
    #[serde(default)]
    pub cursor_backward: Option<String>,
    #[serde(default)]
    pub computed_ql: std::collections::BTreeMap<String, String>,
    #[serde(default)]
    pub computed_columns: Vec<String>,
    #[serde(default)]
    pub distinct: bool,
    #[serde(default)]
    pub skip_count: bool,
    #[serde(default)]
    pub skip_cache: bool,
    #[serde(default)]
    pub single_record_as_object: bool,
    #[serde(default)]
    pub clean_json: bool,
    #[serde(default)]
    pub response_format: ResponseFormat,
    #[serde(default)]
    pub fetch_row_number: Option<Value>,
    #[serde(default)]
    pub search_columns: Vec<String>,
    #[serde(default)]
    pub advanced_sql: std::collections::BTreeMap<String, String>,
}

impl RequestOptions {
    pub const PRELOAD_MAX_DEPTH: u8 = 5;

    /// `Expand` entries normalize into `Preload` if not already present
    /// (§4.7 "Expand & Preload"). Callers decode `X-Expand` into
    /// `PreloadSpec`s directly and append here only when the name is new.
    pub fn merge_expand(&mut self, expand: Vec<PreloadSpec>) {
        for e in expand {
            if !self.preload.iter().any(|p| p.relation == e.relation) {
                self.preload.push(e);
            }
        }
    }
}
