//! Routing, auth gate, and operation dispatch.
//!
//! Path scheme: `/{bucket}` for bucket-level operations, `/{bucket}/{key}`
//! for object-level ones. The server accepts exactly one bucket; any other
//! first segment yields `NoSuchBucket`. After every successful PUT and
//! DELETE the handler fires its [`SyncTrigger`] capability — it never
//! waits for the sync itself.

use std::sync::Arc;

use bytes::Bytes;
use http::request::Parts;
use http::{Response, StatusCode};
use percent_encoding::percent_decode_str;
use syncbox_core::{Config, SyncTrigger};
use syncbox_store::ObjectStore;
use tracing::debug;

use crate::body::ResponseBody;
use crate::error::S3Error;
use crate::response::{apply_cors, build, empty, error_response};
use crate::xml;

/// Default `max-keys` when the listing query omits or mangles it.
const DEFAULT_MAX_KEYS: usize = 1000;

/// The S3 protocol handler.
///
/// Holds the object store, the configured credential, and the sync
/// capability. One instance serves all requests; it is shared behind an
/// `Arc` by the [`S3Service`](crate::S3Service).
pub struct S3Handler {
    store: ObjectStore,
    bucket: String,
    access_key: String,
    secret_key: String,
    region: String,
    syncer: Arc<dyn SyncTrigger>,
}

impl S3Handler {
    /// Create a handler over `cfg.dir` with the given sync capability.
    #[must_use]
    pub fn new(cfg: &Config, syncer: Arc<dyn SyncTrigger>) -> Self {
        Self {
            store: ObjectStore::new(&cfg.dir),
            bucket: cfg.bucket.clone(),
            access_key: cfg.access_key.clone(),
            secret_key: cfg.secret_key.clone(),
            region: cfg.region.clone(),
            syncer,
        }
    }

    /// Process one request: CORS, auth, routing, dispatch.
    pub async fn handle(&self, parts: Parts, body: Bytes) -> Response<ResponseBody> {
        apply_cors(self.dispatch(&parts, body).await)
    }

    async fn dispatch(&self, parts: &Parts, body: Bytes) -> Response<ResponseBody> {
        if parts.method == http::Method::OPTIONS {
            return empty(StatusCode::OK);
        }

        if !self.access_key.is_empty()
            && !syncbox_auth::verify(parts, &self.access_key, &self.secret_key, &self.region)
        {
            return error_response(&S3Error::access_denied("Invalid signature"));
        }

        let path = parts.uri.path().trim_start_matches('/');
        let (bucket, key) = match path.split_once('/') {
            Some((bucket, key)) => (decode(bucket), decode(key)),
            None => (decode(path), String::new()),
        };

        if bucket != self.bucket {
            return error_response(&S3Error::no_such_bucket());
        }

        if key.is_empty() {
            return match parts.method.as_str() {
                "GET" => self.list_objects(parts).await,
                "HEAD" => empty(StatusCode::OK),
                _ => empty(StatusCode::METHOD_NOT_ALLOWED),
            };
        }

        match parts.method.as_str() {
            "PUT" => self.put_object(&key, &body).await,
            "GET" => self.get_object(&key).await,
            "HEAD" => self.head_object(&key).await,
            "DELETE" => self.delete_object(&key).await,
            _ => empty(StatusCode::METHOD_NOT_ALLOWED),
        }
    }

    /// ListObjectsV2. Any GET on the bucket is treated as a listing,
    /// whether or not `list-type=2` is present.
    async fn list_objects(&self, parts: &Parts) -> Response<ResponseBody> {
        let query = parts.uri.query().unwrap_or("");
        let prefix = query_value(query, "prefix").unwrap_or_default();
        let max_keys = query_value(query, "max-keys")
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_MAX_KEYS);

        let objects = match self.store.list(&prefix, max_keys).await {
            Ok(objects) => objects,
            Err(err) => return error_response(&err.into()),
        };
        debug!(prefix = %prefix, count = objects.len(), "listed objects");

        match xml::list_bucket_result(&self.bucket, &prefix, max_keys, &objects) {
            Ok(body) => build(
                Response::builder()
                    .status(StatusCode::OK)
                    .header("Content-Type", "application/xml"),
                ResponseBody::from_xml(body),
            ),
            Err(err) => error_response(&S3Error::internal_error(err.to_string())),
        }
    }

    async fn put_object(&self, key: &str, body: &[u8]) -> Response<ResponseBody> {
        match self.store.put(key, body).await {
            Ok(etag) => {
                self.syncer.trigger();
                build(
                    Response::builder().status(StatusCode::OK).header("ETag", etag),
                    ResponseBody::empty(),
                )
            }
            Err(err) => error_response(&err.into()),
        }
    }

    async fn get_object(&self, key: &str) -> Response<ResponseBody> {
        match self.store.get(key).await {
            Ok((meta, data)) => build(
                Response::builder()
                    .status(StatusCode::OK)
                    .header("Content-Length", meta.size)
                    .header("Last-Modified", http_date(&meta.last_modified)),
                ResponseBody::from_bytes(data),
            ),
            Err(err) => error_response(&err.into()),
        }
    }

    async fn head_object(&self, key: &str) -> Response<ResponseBody> {
        match self.store.head(key).await {
            Ok(meta) => build(
                Response::builder()
                    .status(StatusCode::OK)
                    .header("Content-Length", meta.size)
                    .header("ETag", meta.etag)
                    .header("Last-Modified", http_date(&meta.last_modified)),
                ResponseBody::empty(),
            ),
            Err(err) => error_response(&err.into()),
        }
    }

    /// DELETE is idempotent: 204 whether or not the object existed, and the
    /// sync fires on both paths.
    async fn delete_object(&self, key: &str) -> Response<ResponseBody> {
        match self.store.delete(key).await {
            Ok(()) => {
                self.syncer.trigger();
                empty(StatusCode::NO_CONTENT)
            }
            Err(err) => error_response(&err.into()),
        }
    }
}

/// Format a timestamp as an HTTP date (`Mon, 02 Jan 2006 15:04:05 GMT`).
fn http_date(t: &chrono::DateTime<chrono::Utc>) -> String {
    t.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Decode a percent-encoded path or query component.
fn decode(s: &str) -> String {
    percent_decode_str(s).decode_utf8_lossy().into_owned()
}

/// Value of the first query parameter named `name`, percent-decoded.
fn query_value(query: &str, name: &str) -> Option<String> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .find_map(|pair| {
            let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
            (decode(k) == name).then(|| decode(v))
        })
}
