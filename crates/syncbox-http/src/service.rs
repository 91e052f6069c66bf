//! The hyper `Service` wrapper around [`S3Handler`].
//!
//! Collects the request body, delegates to the handler, stamps the common
//! response headers, and emits one access-log line per request: method,
//! path, status, elapsed milliseconds. Credential material — the
//! `Authorization` header in particular — is never logged.

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper::service::Service;
use tracing::{error, info};
use uuid::Uuid;

use crate::body::ResponseBody;
use crate::error::S3Error;
use crate::handler::S3Handler;
use crate::response::{add_common_headers, apply_cors, error_response};

/// Hyper service serving the S3 API.
#[derive(Clone)]
pub struct S3Service {
    handler: Arc<S3Handler>,
}

impl S3Service {
    /// Wrap a handler for serving.
    #[must_use]
    pub fn new(handler: S3Handler) -> Self {
        Self {
            handler: Arc::new(handler),
        }
    }
}

impl Service<http::Request<Incoming>> for S3Service {
    type Response = http::Response<ResponseBody>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: http::Request<Incoming>) -> Self::Future {
        let handler = Arc::clone(&self.handler);

        Box::pin(async move {
            let started = Instant::now();
            let method = req.method().clone();
            let path = req.uri().path().to_owned();
            let request_id = Uuid::new_v4().to_string();

            let (parts, incoming) = req.into_parts();
            let response = match incoming.collect().await {
                Ok(collected) => handler.handle(parts, collected.to_bytes()).await,
                Err(err) => {
                    error!(error = %err, request_id, "failed to read request body");
                    apply_cors(error_response(&S3Error::internal_error(
                        "Failed to read request body",
                    )))
                }
            };
            let response = add_common_headers(response, &request_id);

            info!(
                method = %method,
                path = %path,
                status = response.status().as_u16(),
                elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                "handled request"
            );

            Ok(response)
        })
    }
}
