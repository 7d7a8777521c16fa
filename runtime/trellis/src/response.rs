//! Shortcuts to build the most common [`Response`]s.
use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderValue};
use http::StatusCode;

use crate::transport::Response;

/// A `200 OK` response with a `text/plain` body.
///
/// ```rust
/// use trellis::response::plain_text;
///
/// let response = plain_text("Hello, world!");
/// assert_eq!(response.status(), 200);
/// assert_eq!(response.body().as_ref(), b"Hello, world!");
/// ```
pub fn plain_text<B>(body: B) -> Response
where
    B: Into<String>,
{
    with_status(StatusCode::OK, body)
}

/// A `text/plain` response with the given status code.
pub fn with_status<B>(status: StatusCode, body: B) -> Response
where
    B: Into<String>,
{
    let mut response = Response::new(Bytes::from(body.into()));
    *response.status_mut() = status;
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}

/// An empty response with the given status code.
pub fn empty(status: StatusCode) -> Response {
    let mut response = Response::new(Bytes::new());
    *response.status_mut() = status;
    response
}
