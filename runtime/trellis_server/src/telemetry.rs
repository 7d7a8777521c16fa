//! The span wrapped around each request handled by a [`Server`](crate::server::Server).
//!
//! Field names follow OpenTelemetry's semantic conventions for HTTP servers.
use trellis::transport::Request;

/// The HTTP method of the incoming request.
pub const HTTP_REQUEST_METHOD: &str = "http.request.method";

/// The status code of the outgoing response.
pub const HTTP_RESPONSE_STATUS_CODE: &str = "http.response.status_code";

/// The rule that matched the incoming request, e.g. `/users/{id}`.
pub const HTTP_ROUTE: &str = "http.route";

/// The path of the incoming request.
pub const URL_PATH: &str = "url.path";

/// The query string of the incoming request, if any.
pub const URL_QUERY: &str = "url.query";

/// Construct the root span for `request`.
///
/// The route and the status code are recorded later on, once they are known.
pub fn root_span(request: &Request) -> tracing::Span {
    // The `{ <expr> }` syntax makes `tracing` evaluate the constants
    // instead of using their identifiers as field names.
    tracing::info_span!(
        "HTTP request",
        { HTTP_REQUEST_METHOD } = %request.method(),
        { URL_PATH } = request.uri().path(),
        { URL_QUERY } = request.uri().query().unwrap_or_default(),
        { HTTP_ROUTE } = tracing::field::Empty,
        { HTTP_RESPONSE_STATUS_CODE } = tracing::field::Empty,
    )
}
