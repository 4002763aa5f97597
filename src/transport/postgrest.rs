//! Count-only queries against a PostgREST endpoint.
//!
//! A count never fetches row contents: the request is a `HEAD` with
//! `Prefer: count=exact`, and the total comes back in the `Content-Range`
//! response header (`0-24/57`, or `*/0` for an empty result).

use reqwest::header::{HeaderValue, AUTHORIZATION, CONTENT_RANGE};
use reqwest::Client;
use tracing::debug;

use crate::domain::Filter;
use crate::error::TransportError;

/// Thin client for the REST half of a Supabase-style backend.
pub struct PostgrestClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl PostgrestClient {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
            api_key,
        }
    }

    /// Count rows in `table` matching `filter` via a count-only HEAD request.
    pub async fn count(
        &self,
        table: &str,
        filter: Option<&Filter>,
    ) -> Result<u64, TransportError> {
        let url = format!("{}/rest/v1/{}", self.base_url.trim_end_matches('/'), table);

        let mut request = self
            .client
            .head(&url)
            .query(&[("select", "*")])
            .header("apikey", &self.api_key)
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .header("Prefer", HeaderValue::from_static("count=exact"));

        if let Some(filter) = filter {
            request = request.query(&[(filter.column(), &filter.operator_value())]);
        }

        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::ServiceUnavailable {
                status: status.as_u16(),
            });
        }

        let range = response
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                TransportError::Protocol("count response missing Content-Range header".into())
            })?;

        let count = parse_content_range(range)?;
        debug!(table, count, "count query succeeded");
        Ok(count)
    }
}

/// Extract the total from a `Content-Range` value like `0-24/57` or `*/0`.
fn parse_content_range(value: &str) -> Result<u64, TransportError> {
    let total = value
        .rsplit('/')
        .next()
        .ok_or_else(|| TransportError::Protocol(format!("malformed Content-Range: {value}")))?;

    total
        .trim()
        .parse::<u64>()
        .map_err(|_| TransportError::Protocol(format!("malformed Content-Range: {value}")))
}
