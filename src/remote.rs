//! Hosted backend client (Supabase PostgREST + Storage).
//!
//! Each call is a single HTTP request against one table or one storage
//! object: equality filters, one sort key, no joins or multi-entity
//! transactions. Writes ask for `return=representation` so the affected
//! rows come back in the response.

use std::time::Duration;

use reqwest::{Client, Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::RemoteCredentials;
use crate::error::RemoteError;

/// Default timeout for backend requests (20 seconds).
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// Uploaded objects are served with this cache lifetime (seconds).
const UPLOAD_CACHE_SECONDS: u32 = 3600;

pub const ORDERS_TABLE: &str = "orders";
pub const PRODUCTS_TABLE: &str = "products";

// ---------------------------------------------------------------------------
// Query pieces
// ---------------------------------------------------------------------------

/// `column = value` filter, rendered as `column=eq.value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Eq {
    pub column: &'static str,
    pub value: String,
}

pub fn eq(column: &'static str, value: impl ToString) -> Eq {
    Eq {
        column,
        value: value.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sort {
    Asc(&'static str),
    Desc(&'static str),
}

impl Sort {
    fn render(self) -> String {
        match self {
            Sort::Asc(col) => format!("{col}.asc"),
            Sort::Desc(col) => format!("{col}.desc"),
        }
    }
}

// ---------------------------------------------------------------------------
// URL normalisation / error mapping
// ---------------------------------------------------------------------------

/// Strip whitespace and trailing slashes from the project URL.
pub fn normalize_base_url(url: &str) -> String {
    let mut url = url.trim().to_string();
    while url.ends_with('/') {
        url.pop();
    }
    url
}

/// Convert a `reqwest::Error` into a [`RemoteError`].
fn friendly_error(url: &str, err: &reqwest::Error) -> RemoteError {
    if err.is_connect() {
        return RemoteError::Connect(url.to_string());
    }
    if err.is_timeout() {
        return RemoteError::Timeout(url.to_string());
    }
    if err.is_builder() {
        return RemoteError::InvalidUrl(url.to_string());
    }
    RemoteError::Network {
        url: url.to_string(),
        message: err.to_string(),
    }
}

/// Pull the most useful message out of an error response body.
fn status_error(status: StatusCode, body: &str) -> RemoteError {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|json| {
            json.get("message")
                .or_else(|| json.get("error"))
                .or_else(|| json.get("msg"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .or_else(|| {
            let trimmed = body.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        })
        .unwrap_or_else(|| match status.as_u16() {
            401 => "Access key is invalid or expired".to_string(),
            403 => "Access denied".to_string(),
            404 => "Backend resource not found".to_string(),
            s if s >= 500 => "Backend server error".to_string(),
            _ => "Unexpected response from backend".to_string(),
        });
    RemoteError::Status {
        status: status.as_u16(),
        message,
    }
}

fn decode_rows<T: DeserializeOwned>(rows: Vec<Value>) -> Result<Vec<T>, RemoteError> {
    rows.into_iter()
        .map(|row| serde_json::from_value(row).map_err(|e| RemoteError::Decode(e.to_string())))
        .collect()
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Thin adapter over the hosted table and object storage APIs.
#[derive(Clone)]
pub struct SupabaseClient {
    base: String,
    anon_key: String,
    bucket: String,
    http: Client,
}

impl SupabaseClient {
    pub fn new(credentials: &RemoteCredentials) -> Result<Self, RemoteError> {
        let base = normalize_base_url(&credentials.url);
        Url::parse(&base).map_err(|_| RemoteError::InvalidUrl(base.clone()))?;
        let http = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| RemoteError::Network {
                url: base.clone(),
                message: format!("Failed to create HTTP client: {e}"),
            })?;
        Ok(Self {
            base,
            anon_key: credentials.anon_key.clone(),
            bucket: credentials.storage_bucket.clone(),
            http,
        })
    }

    /// `{base}/rest/v1/{table}?select=*&col=eq.v&order=col.desc`
    pub fn table_url(
        &self,
        table: &str,
        filters: &[Eq],
        sort: Option<Sort>,
        select: bool,
    ) -> Result<Url, RemoteError> {
        let mut url = Url::parse(&format!("{}/rest/v1/{table}", self.base))
            .map_err(|_| RemoteError::InvalidUrl(self.base.clone()))?;
        {
            let mut qp = url.query_pairs_mut();
            if select {
                qp.append_pair("select", "*");
            }
            for f in filters {
                qp.append_pair(f.column, &format!("eq.{}", f.value));
            }
            if let Some(sort) = sort {
                qp.append_pair("order", &sort.render());
            }
        }
        Ok(url)
    }

    /// Public, durable URL of an object in the configured bucket.
    pub fn public_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base,
            self.bucket,
            path.trim_start_matches('/')
        )
    }

    async fn send_rows(
        &self,
        method: Method,
        url: Url,
        body: Option<&Value>,
    ) -> Result<Vec<Value>, RemoteError> {
        debug!(method = %method, path = url.path(), "remote request");
        let mut req = self
            .http
            .request(method, url)
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", self.anon_key))
            .header("Content-Type", "application/json")
            .header("Prefer", "return=representation");
        if let Some(b) = body {
            req = req.json(b);
        }

        let resp = req.send().await.map_err(|e| friendly_error(&self.base, &e))?;
        let status = resp.status();
        let body_text = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            let err = status_error(status, &body_text);
            warn!(error = %err, "remote request failed");
            return Err(err);
        }
        if body_text.trim().is_empty() {
            return Ok(Vec::new());
        }
        match serde_json::from_str::<Value>(&body_text)
            .map_err(|e| RemoteError::Decode(e.to_string()))?
        {
            Value::Array(rows) => Ok(rows),
            Value::Null => Ok(Vec::new()),
            single => Ok(vec![single]),
        }
    }

    pub async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        filters: &[Eq],
        sort: Option<Sort>,
    ) -> Result<Vec<T>, RemoteError> {
        let url = self.table_url(table, filters, sort, true)?;
        decode_rows(self.send_rows(Method::GET, url, None).await?)
    }

    pub async fn insert<T: DeserializeOwned>(
        &self,
        table: &str,
        row: &Value,
    ) -> Result<Vec<T>, RemoteError> {
        let url = self.table_url(table, &[], None, true)?;
        let body = Value::Array(vec![row.clone()]);
        decode_rows(self.send_rows(Method::POST, url, Some(&body)).await?)
    }

    pub async fn update<T: DeserializeOwned>(
        &self,
        table: &str,
        filters: &[Eq],
        patch: &Value,
    ) -> Result<Vec<T>, RemoteError> {
        let url = self.table_url(table, filters, None, true)?;
        decode_rows(self.send_rows(Method::PATCH, url, Some(patch)).await?)
    }

    /// Delete matching rows, returning how many were removed.
    pub async fn delete(&self, table: &str, filters: &[Eq]) -> Result<usize, RemoteError> {
        let url = self.table_url(table, filters, None, false)?;
        Ok(self.send_rows(Method::DELETE, url, None).await?.len())
    }

    /// Store `bytes` at `path` in the bucket. Existing objects are never
    /// overwritten.
    pub async fn upload_object(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), RemoteError> {
        let url = format!(
            "{}/storage/v1/object/{}/{}",
            self.base,
            self.bucket,
            path.trim_start_matches('/')
        );
        debug!(path, size = bytes.len(), "uploading object");
        let resp = self
            .http
            .post(&url)
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", self.anon_key))
            .header("Content-Type", content_type)
            .header("cache-control", format!("max-age={UPLOAD_CACHE_SECONDS}"))
            .header("x-upsert", "false")
            .body(bytes)
            .send()
            .await
            .map_err(|e| friendly_error(&self.base, &e))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(status_error(status, &body));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(url: &str) -> SupabaseClient {
        SupabaseClient::new(&RemoteCredentials {
            url: url.into(),
            anon_key: "anon".into(),
            storage_bucket: "order-images".into(),
        })
        .expect("client")
    }

    #[test]
    fn test_normalize_base_url() {
        assert_eq!(
            normalize_base_url("  https://abc.supabase.co/// "),
            "https://abc.supabase.co"
        );
    }

    #[test]
    fn test_rejects_unparseable_url() {
        let err = SupabaseClient::new(&RemoteCredentials {
            url: "not a url".into(),
            anon_key: "k".into(),
            storage_bucket: "b".into(),
        })
        .err()
        .expect("should fail");
        assert!(matches!(err, RemoteError::InvalidUrl(_)));
    }

    #[test]
    fn test_table_url_encodes_filters_and_order() {
        let c = client("https://abc.supabase.co/");
        let url = c
            .table_url(
                ORDERS_TABLE,
                &[eq("customer_phone", "+91 98765")],
                Some(Sort::Desc("created_at")),
                true,
            )
            .unwrap();
        assert_eq!(url.path(), "/rest/v1/orders");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("select".to_string(), "*".to_string()),
                ("customer_phone".to_string(), "eq.+91 98765".to_string()),
                ("order".to_string(), "created_at.desc".to_string()),
            ]
        );
        assert!(url.as_str().contains("eq.%2B91"));
    }

    #[test]
    fn test_public_url() {
        let c = client("https://abc.supabase.co");
        assert_eq!(
            c.public_url("orders/1-abc.png"),
            "https://abc.supabase.co/storage/v1/object/public/order-images/orders/1-abc.png"
        );
    }

    #[test]
    fn test_status_error_prefers_backend_message() {
        let err = status_error(
            StatusCode::CONFLICT,
            r#"{"message":"duplicate key value violates unique constraint"}"#,
        );
        assert_eq!(
            err.to_string(),
            "Remote backend error (HTTP 409): duplicate key value violates unique constraint"
        );
        let err = status_error(StatusCode::UNAUTHORIZED, "");
        assert!(err.to_string().contains("Access key is invalid"));
    }
}
