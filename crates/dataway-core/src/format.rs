//! Response formatter: shapes executed results into one of three output
//! contracts, applies `SingleRecordAsObject`/`CleanJSON`, and computes the
//! range headers surfaced on read responses. Grounded in the compiler's own
//! `ResponseFormat`/`RequestOptions` fields plus the general shape axum JSON
//! responses take elsewhere in the workspace.

use crate::options::ResponseFormat;
use serde_json::{Map, Value as Json};

#[derive(Debug, Clone, Default)]
pub struct ResponseMetadata {
    pub total: i64,
    pub count: i64,
    pub filtered: i64,
    pub limit: Option<i64>,
    pub offset: i64,
    pub row_number: Option<i64>,
}

pub struct FormatOptions {
    pub format: ResponseFormat,
    pub single_record_as_object: bool,
    pub clean_json: bool,
}

pub struct FormattedResponse {
    pub body: Json,
    pub content_range: String,
    pub range_total: i64,
    pub range_size: i64,
}

pub fn format_response(mut payload: Json, metadata: ResponseMetadata, opts: &FormatOptions) -> FormattedResponse {
    if opts.single_record_as_object {
        payload = unwrap_single(payload);
    }
    if opts.clean_json {
        payload = clean_json(payload);
    }

    let body = match opts.format {
        ResponseFormat::Detail => serde_json::json!({
            "success": true,
            "data": payload,
            "metadata": metadata_json(&metadata),
        }),
        ResponseFormat::Simple => payload,
        ResponseFormat::Syncfusion => serde_json::json!({
            "result": payload,
            "count": metadata.total,
        }),
    };

    FormattedResponse {
        body,
        content_range: format!("{}-{}/{}", metadata.offset, metadata.offset + metadata.count, metadata.filtered),
        range_total: metadata.total,
        range_size: metadata.count,
    }
}

fn metadata_json(m: &ResponseMetadata) -> Json {
    let mut obj = Map::new();
    obj.insert("total".into(), Json::from(m.total));
    obj.insert("count".into(), Json::from(m.count));
    obj.insert("filtered".into(), Json::from(m.filtered));
    obj.insert("limit".into(), m.limit.map(Json::from).unwrap_or(Json::Null));
    obj.insert("offset".into(), Json::from(m.offset));
    if let Some(rn) = m.row_number {
        obj.insert("row_number".into(), Json::from(rn));
    }
    Json::Object(obj)
}

/// "If the underlying result set has exactly one row THEN the response
/// payload is an object (not a length-1 array)"; an empty collection
/// becomes an empty object (§4.10, §8).
fn unwrap_single(payload: Json) -> Json {
    match payload {
        Json::Array(mut items) if items.len() == 1 => items.remove(0),
        Json::Array(items) if items.is_empty() => Json::Object(Map::new()),
        other => other,
    }
}

/// Recursively elides null and empty-valued fields.
fn clean_json(value: Json) -> Json {
    match value {
        Json::Object(map) => {
            let cleaned: Map<String, Json> = map
                .into_iter()
                .filter_map(|(k, v)| {
                    let v = clean_json(v);
                    if is_empty_ish(&v) {
                        None
                    } else {
                        Some((k, v))
                    }
                })
                .collect();
            Json::Object(cleaned)
        }
        Json::Array(items) => Json::Array(items.into_iter().map(clean_json).collect()),
        other => other,
    }
}

fn is_empty_ish(value: &Json) -> bool {
    match value {
        Json::Null => true,
        Json::String(s) => s.is_empty(),
        Json::Object(m) => m.is_empty(),
        Json::Array(a) => a.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_format_wraps_data_and_metadata() {
        let out = format_response(
            serde_json::json!([{"id": 1}]),
            ResponseMetadata { total: 1, count: 1, filtered: 1, limit: None, offset: 0, row_number: None },
            &FormatOptions { format: ResponseFormat::Detail, single_record_as_object: false, clean_json: false },
        );
        assert!(out.body["success"].as_bool().unwrap());
        assert_eq!(out.content_range, "0-1/1");
    }

    #[test]
    fn single_record_as_object_unwraps_one_element_array() {
        let out = format_response(
            serde_json::json!([{"id": 1}]),
            ResponseMetadata::default(),
            &FormatOptions { format: ResponseFormat::Simple, single_record_as_object: true, clean_json: false },
        );
        assert!(out.body.is_object());
    }

    #[test]
    fn single_record_as_object_turns_empty_array_into_empty_object() {
        let out = format_response(
            serde_json::json!([]),
            ResponseMetadata::default(),
            &FormatOptions { format: ResponseFormat::Simple, single_record_as_object: true, clean_json: false },
        );
        assert_eq!(out.body, serde_json::json!({}));
    }

    #[test]
    fn clean_json_elides_null_and_empty_fields() {
        let out = format_response(
            serde_json::json!({"a": null, "b": "", "c": 1}),
            ResponseMetadata::default(),
            &FormatOptions { format: ResponseFormat::Simple, single_record_as_object: false, clean_json: true },
        );
        assert_eq!(out.body, serde_json::json!({"c": 1}));
    }

    #[test]
    fn syncfusion_format_uses_result_and_count_keys() {
        let out = format_response(
            serde_json::json!([{"id": 1}]),
            ResponseMetadata { total: 5, ..Default::default() },
            &FormatOptions { format: ResponseFormat::Syncfusion, single_record_as_object: false, clean_json: false },
        );
        assert_eq!(out.body["count"], 5);
        assert!(out.body.get("result").is_some());
    }
}
