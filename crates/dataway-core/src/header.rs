//! Header decoder (§4.6). Generic over anything that can hand back a header
//! value by name so this crate stays HTTP-framework-agnostic; `dataway-http`
//! implements [`HeaderSource`] over `axum::http::HeaderMap`.
//!
//! Contract: unknown headers are ignored, malformed values for a known
//! header drop that field with a warning and the rest of the request
//! continues to decode — never abort (§4.6).

use crate::options::{Filter, PreloadSpec, RequestOptions, ResponseFormat, SortDir, SortTerm};
use tracing::warn;

pub trait HeaderSource {
    fn get(&self, name: &str) -> Option<&str>;
}

impl HeaderSource for std::collections::HashMap<String, String> {
    fn get(&self, name: &str) -> Option<&str> {
        std::collections::HashMap::get(self, name).map(|s| s.as_str())
    }
}

macro_rules! decode_json_field {
    ($headers:expr, $name:expr, $target:expr) => {
        if let Some(raw) = $headers.get($name) {
            match serde_json::from_str(raw) {
                Ok(value) => $target = value,
                Err(err) => warn!(header = $name, error = %err, "dropping malformed header"),
            }
        }
    };
}

pub fn decode_headers<H: HeaderSource>(headers: &H) -> RequestOptions {
    let mut options = RequestOptions::default();

    decode_json_field!(headers, "X-Columns", options.columns);
    decode_json_field!(headers, "X-Omit-Columns", options.omit_columns);
    decode_json_field!(headers, "X-Filter", options.filters);
    decode_json_field!(headers, "X-Computed-QL", options.computed_ql);

    if let Some(raw) = headers.get("X-Sort") {
        options.sort = decode_sort(raw);
    }

    if let Some(raw) = headers.get("X-Expand") {
        match serde_json::from_str::<Vec<PreloadSpec>>(raw) {
            Ok(expand) => options.merge_expand(expand),
            Err(err) => warn!(header = "X-Expand", error = %err, "dropping malformed header"),
        }
    }
    decode_json_field!(headers, "X-Preload", options.preload);

    if let Some(raw) = headers.get("X-Limit") {
        options.limit = parse_int(raw, "X-Limit");
    }
    if let Some(raw) = headers.get("X-Offset") {
        options.offset = parse_int(raw, "X-Offset");
    }
    options.cursor_forward = headers.get("X-Cursor-Forward").map(str::to_string);
    options.cursor_backward = headers.get("X-Cursor-Backward").map(str::to_string);
    options.custom_sql_where = headers.get("X-Custom-Where").map(str::to_string);
    options.custom_sql_or = headers.get("X-Custom-Or").map(str::to_string);

    options.distinct = parse_bool(headers, "X-Distinct");
    options.skip_count = parse_bool(headers, "X-Skip-Count");
    options.skip_cache = parse_bool(headers, "X-Skip-Cache");
    options.single_record_as_object = parse_bool(headers, "X-Single-As-Object");
    options.clean_json = parse_bool(headers, "X-Clean-JSON");

    if let Some(raw) = headers.get("X-Response-Format") {
        options.response_format = match raw.to_ascii_lowercase().as_str() {
            "detail" => ResponseFormat::Detail,
            "simple" => ResponseFormat::Simple,
            "syncfusion" => ResponseFormat::Syncfusion,
            _ => {
                warn!(header = "X-Response-Format", value = raw, "dropping malformed header");
                ResponseFormat::Detail
            }
        };
    }

    if let Some(raw) = headers.get("X-Fetch-Row-Number") {
        options.fetch_row_number = Some(crate::value::Value::Text(raw.to_string()));
    }

    options
}

fn parse_int(raw: &str, header: &'static str) -> Option<i64> {
    match raw.parse() {
        Ok(n) => Some(n),
        Err(_) => {
            warn!(header, value = raw, "dropping malformed header");
            None
        }
    }
}

fn parse_bool<H: HeaderSource>(headers: &H, name: &'static str) -> bool {
    match headers.get(name) {
        None => false,
        Some(raw) => match raw.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => true,
            "false" | "0" | "no" | "" => false,
            _ => {
                warn!(header = name, value = raw, "dropping malformed header");
                false
            }
        },
    }
}

/// `X-Sort` accepts either a JSON array of `{column, direction}` or a CSV
/// shorthand (`col1,-col2` where a leading `-` means descending).
fn decode_sort(raw: &str) -> Vec<SortTerm> {
    if raw.trim_start().starts_with('[') {
        match serde_json::from_str(raw) {
            Ok(terms) => return terms,
            Err(err) => {
                warn!(header = "X-Sort", error = %err, "dropping malformed header");
                return vec![];
            }
        }
    }
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|term| {
            if let Some(col) = term.strip_prefix('-') {
                SortTerm { column: col.to_string(), direction: SortDir::Desc }
            } else {
                SortTerm { column: term.to_string(), direction: SortDir::Asc }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn headers(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn decodes_csv_sort_with_descending_prefix() {
        let h = headers(&[("X-Sort", "name,-created_at")]);
        let opts = decode_headers(&h);
        assert_eq!(opts.sort.len(), 2);
        assert_eq!(opts.sort[1].direction, SortDir::Desc);
    }

    #[test]
    fn malformed_filter_header_drops_field_without_aborting() {
        let h = headers(&[("X-Filter", "not json"), ("X-Limit", "10")]);
        let opts = decode_headers(&h);
        assert!(opts.filters.is_empty());
        assert_eq!(opts.limit, Some(10));
    }

    #[test]
    fn unknown_headers_are_ignored() {
        let h = headers(&[("X-Something-Else", "whatever")]);
        let opts = decode_headers(&h);
        assert!(opts.columns.is_empty());
    }
}
