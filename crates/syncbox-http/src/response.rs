//! Response construction helpers and the headers every response carries.

use http::header::HeaderValue;
use http::{Response, StatusCode};
use tracing::warn;

use crate::body::ResponseBody;
use crate::error::S3Error;
use crate::xml;

/// An empty-bodied response with the given status.
#[must_use]
pub fn empty(status: StatusCode) -> Response<ResponseBody> {
    build(Response::builder().status(status), ResponseBody::empty())
}

/// An XML `<Error>` response for the given error.
#[must_use]
pub fn error_response(err: &S3Error) -> Response<ResponseBody> {
    let body = match xml::error_document(err.code.as_str(), &err.message) {
        Ok(xml) => ResponseBody::from_xml(xml),
        Err(e) => {
            warn!(error = %e, "failed to serialize error document");
            ResponseBody::empty()
        }
    };
    build(
        Response::builder()
            .status(err.code.status_code())
            .header("Content-Type", "application/xml"),
        body,
    )
}

/// Attach the CORS headers every response carries.
#[must_use]
pub fn apply_cors(mut response: Response<ResponseBody>) -> Response<ResponseBody> {
    let headers = response.headers_mut();
    headers.insert("Access-Control-Allow-Origin", HeaderValue::from_static("*"));
    headers.insert(
        "Access-Control-Allow-Methods",
        HeaderValue::from_static("GET, PUT, DELETE, HEAD, POST"),
    );
    headers.insert("Access-Control-Allow-Headers", HeaderValue::from_static("*"));
    headers.insert(
        "Access-Control-Expose-Headers",
        HeaderValue::from_static("ETag, x-amz-request-id, x-amz-id-2"),
    );
    response
}

/// Attach the request id and `Server` headers.
#[must_use]
pub fn add_common_headers(
    mut response: Response<ResponseBody>,
    request_id: &str,
) -> Response<ResponseBody> {
    let headers = response.headers_mut();
    if let Ok(hv) = HeaderValue::from_str(request_id) {
        headers.insert("x-amz-request-id", hv.clone());
        headers.insert("x-amz-id-2", hv);
    }
    headers.insert("Server", HeaderValue::from_static("Syncbox"));
    response
}

/// Build a response from a builder, falling back to a bare 500 if the
/// builder rejects a header value.
pub(crate) fn build(
    builder: http::response::Builder,
    body: ResponseBody,
) -> Response<ResponseBody> {
    builder.body(body).unwrap_or_else(|e| {
        warn!(error = %e, "failed to build response");
        Response::builder()
            .status(StatusCode::INTERNAL_SERVER_ERROR)
            .body(ResponseBody::empty())
            .expect("static response should be valid")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::S3ErrorCode;

    #[test]
    fn test_should_build_error_response_with_xml_body() {
        let resp = error_response(&S3Error::access_denied("Invalid signature"));
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            resp.headers()
                .get("Content-Type")
                .and_then(|v| v.to_str().ok()),
            Some("application/xml"),
        );
    }

    #[test]
    fn test_should_apply_all_cors_headers() {
        let resp = apply_cors(empty(StatusCode::OK));
        assert_eq!(
            resp.headers()
                .get("Access-Control-Allow-Origin")
                .and_then(|v| v.to_str().ok()),
            Some("*"),
        );
        assert_eq!(
            resp.headers()
                .get("Access-Control-Allow-Methods")
                .and_then(|v| v.to_str().ok()),
            Some("GET, PUT, DELETE, HEAD, POST"),
        );
        assert_eq!(
            resp.headers()
                .get("Access-Control-Expose-Headers")
                .and_then(|v| v.to_str().ok()),
            Some("ETag, x-amz-request-id, x-amz-id-2"),
        );
    }

    #[test]
    fn test_should_add_request_id_headers() {
        let resp = add_common_headers(empty(StatusCode::OK), "req-42");
        assert_eq!(
            resp.headers()
                .get("x-amz-request-id")
                .and_then(|v| v.to_str().ok()),
            Some("req-42"),
        );
        assert_eq!(
            resp.headers().get("Server").and_then(|v| v.to_str().ok()),
            Some("Syncbox"),
        );
    }

    #[test]
    fn test_should_map_internal_error_status() {
        let resp = error_response(&S3Error::new(S3ErrorCode::InternalError, "boom"));
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
