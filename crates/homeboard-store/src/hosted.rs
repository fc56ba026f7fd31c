//! HostedStore — client for the hosted Postgres row API and object storage.
//!
//! Rows go through the PostgREST endpoint at `/rest/v1/{table}`; blobs
//! through `/storage/v1/object/{bucket}/{name}`. Every request carries the
//! access key both as `apikey` and as a bearer token. A non-2xx response is
//! turned into [`StoreError::Api`] with the response body as message, so
//! callers see whatever the service said.

use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, RequestBuilder, Response};
use serde_json::Value;
use tracing::debug;

use crate::backend::{Blob, BlobStore, ID_COLUMN, Query, RecordStore, Row, StoreFuture};
use crate::error::{StoreError, StoreResult};

/// `Prefer` header asking the row API not to echo written rows back.
const PREFER_MINIMAL: &str = "return=minimal";

/// `Prefer` header turning an insert into insert-or-merge on conflict.
const PREFER_MERGE: &str = "resolution=merge-duplicates,return=minimal";

/// Render a filter value the way PostgREST expects after `eq.`.
fn filter_literal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Client for the hosted store.
#[derive(Clone)]
pub struct HostedStore {
    client: reqwest::Client,
    base_url: String,
    key: String,
}

impl HostedStore {
    pub fn new(base_url: &str, key: &str) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, key)
    }

    pub fn with_client(client: reqwest::Client, base_url: &str, key: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            key: key.to_string(),
        }
    }

    pub fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.base_url)
    }

    pub fn object_url(&self, bucket: &str, name: &str) -> String {
        format!("{}/storage/v1/object/{bucket}/{name}", self.base_url)
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("apikey", &self.key)
            .bearer_auth(&self.key)
    }

    /// Query-string pairs for a select.
    fn select_params(query: &Query) -> Vec<(String, String)> {
        let mut params = vec![("select".to_string(), query.select_clause())];
        for (column, value) in query.filters() {
            params.push((column.clone(), format!("eq.{}", filter_literal(value))));
        }
        params.push(("order".to_string(), format!("{ID_COLUMN}.asc")));
        if let Some(limit) = query.max_rows() {
            params.push(("limit".to_string(), limit.to_string()));
        }
        params
    }

    /// Send and fail on any non-success status.
    async fn send(builder: RequestBuilder) -> StoreResult<Response> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(StoreError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

impl RecordStore for HostedStore {
    fn select<'a>(&'a self, table: &'a str, query: &'a Query) -> StoreFuture<'a, Vec<Row>> {
        Box::pin(async move {
            let builder = self
                .request(Method::GET, &self.rest_url(table))
                .query(&Self::select_params(query));
            let response = Self::send(builder).await?;
            let rows: Vec<Row> = response
                .json()
                .await
                .map_err(|e| StoreError::Deserialize(e.to_string()))?;
            debug!(%table, rows = rows.len(), "rows selected");
            Ok(rows)
        })
    }

    fn insert<'a>(&'a self, table: &'a str, rows: Vec<Row>) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let count = rows.len();
            let builder = self
                .request(Method::POST, &self.rest_url(table))
                .header("Prefer", PREFER_MINIMAL)
                .json(&rows);
            Self::send(builder).await?;
            debug!(%table, rows = count, "rows inserted");
            Ok(())
        })
    }

    fn update<'a>(&'a self, table: &'a str, id: i64, patch: Row) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let builder = self
                .request(Method::PATCH, &self.rest_url(table))
                .query(&[(ID_COLUMN, format!("eq.{id}"))])
                .header("Prefer", PREFER_MINIMAL)
                .json(&patch);
            Self::send(builder).await?;
            debug!(%table, id, "row updated");
            Ok(())
        })
    }

    fn upsert<'a>(&'a self, table: &'a str, row: Row) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let builder = self
                .request(Method::POST, &self.rest_url(table))
                .query(&[("on_conflict", ID_COLUMN)])
                .header("Prefer", PREFER_MERGE)
                .json(&vec![row]);
            Self::send(builder).await?;
            debug!(%table, "row upserted");
            Ok(())
        })
    }

    fn delete_all<'a>(&'a self, table: &'a str) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            // The row API refuses unfiltered deletes; -1 is never a real id.
            let builder = self
                .request(Method::DELETE, &self.rest_url(table))
                .query(&[(ID_COLUMN, "neq.-1")]);
            Self::send(builder).await?;
            debug!(%table, "rows deleted");
            Ok(())
        })
    }
}

impl BlobStore for HostedStore {
    fn upload<'a>(&'a self, bucket: &'a str, name: &'a str, blob: Blob) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let size = blob.data.len();
            let builder = self
                .request(Method::POST, &self.object_url(bucket, name))
                .header(CONTENT_TYPE, blob.content_type)
                .body(blob.data);
            Self::send(builder).await?;
            debug!(%bucket, %name, bytes = size, "blob uploaded");
            Ok(())
        })
    }

    fn public_url(&self, bucket: &str, name: &str) -> String {
        format!("{}/storage/v1/object/public/{bucket}/{name}", self.base_url)
    }

    fn download<'a>(&'a self, bucket: &'a str, name: &'a str) -> StoreFuture<'a, Option<Blob>> {
        Box::pin(async move {
            let response = self
                .request(Method::GET, &self.object_url(bucket, name))
                .send()
                .await?;
            // Storage reports a missing object as 400 or 404 depending on version.
            let status = response.status();
            if status == reqwest::StatusCode::NOT_FOUND || status == reqwest::StatusCode::BAD_REQUEST {
                return Ok(None);
            }
            if !status.is_success() {
                let message = response.text().await.unwrap_or_default();
                return Err(StoreError::Api {
                    status: status.as_u16(),
                    message,
                });
            }
            let content_type = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("application/octet-stream")
                .to_string();
            let data: Bytes = response.bytes().await?;
            Ok(Some(Blob { data, content_type }))
        })
    }
}
