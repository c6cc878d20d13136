//! Bridges `axum::http::HeaderMap` into `dataway_core::header::HeaderSource`
//! so `dataway_core::header::decode_headers` can be driven straight off the
//! request without an intermediate copy into a `HashMap`.

use axum::http::HeaderMap;
use dataway_core::header::HeaderSource;

pub struct AxumHeaders<'a>(pub &'a HeaderMap);

impl HeaderSource for AxumHeaders<'_> {
    fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(|v| v.to_str().ok())
    }
}
