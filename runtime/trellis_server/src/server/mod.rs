//! An in-process [`Router`] implementation.
//!
//! [`Server`] matches incoming requests against the rules registered by
//! blueprint factories and invokes the corresponding handler, synchronously.
//! It doesn't open any socket: wrap it with the transport of your choice, or
//! drive it directly in tests.
pub use config::ServerConfig;
pub use params::RouteParams;
pub use socket::InMemorySocket;

mod config;
mod params;
mod socket;

use http::header::{ALLOW, HOST, HeaderValue};
use http::{StatusCode, Uri};
use indexmap::IndexMap;
use trellis::response::empty;
use trellis::router::{MethodGuard, RouteOptions, Router, WebSocketOptions};
use trellis::transport::{Request, RequestHandler, Response, WebSocket, WebSocketHandler};

use crate::telemetry::{HTTP_RESPONSE_STATUS_CODE, HTTP_ROUTE, root_span};

/// Dispatches requests to the handlers registered against it.
///
/// Rules use [`matchit`]'s syntax: `/users/{id}` for a named parameter,
/// `/static/{*path}` for a catch-all.
/// Several handlers can be registered for the same rule, as long as they
/// are guarded by different methods.
///
/// ```rust
/// use bytes::Bytes;
/// use http::{Method, StatusCode};
/// use trellis::response::plain_text;
/// use trellis::router::{GET, RouteOptions, Router};
/// use trellis::transport::Request;
/// use trellis_server::server::{Server, ServerConfig};
/// use std::sync::Arc;
///
/// let mut server = Server::new(ServerConfig::default());
/// server.add_route(
///     Arc::new(|_: &Request| plain_text("Hello, world!")),
///     "/hello",
///     &RouteOptions::new(GET),
/// );
///
/// let request = http::Request::builder()
///     .uri("/hello")
///     .body(Bytes::new())
///     .unwrap();
/// assert_eq!(server.call(request).status(), StatusCode::OK);
/// let request = http::Request::builder()
///     .method(Method::POST)
///     .uri("/hello")
///     .body(Bytes::new())
///     .unwrap();
/// assert_eq!(server.call(request).status(), StatusCode::METHOD_NOT_ALLOWED);
/// ```
pub struct Server {
    config: ServerConfig,
    router: matchit::Router<usize>,
    paths: IndexMap<String, Vec<Endpoint>>,
    websocket_router: matchit::Router<usize>,
    websocket_paths: IndexMap<String, WebSocketEndpoint>,
}

struct Endpoint {
    options: RouteOptions,
    handler: RequestHandler,
}

struct WebSocketEndpoint {
    options: WebSocketOptions,
    handler: WebSocketHandler,
}

/// No websocket route matches the URI passed to [`Server::connect`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("There is no websocket route for `{uri}`")]
pub struct NoWebSocketRoute {
    pub uri: Uri,
}

impl Server {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            router: matchit::Router::new(),
            paths: IndexMap::new(),
            websocket_router: matchit::Router::new(),
            websocket_paths: IndexMap::new(),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// The rules with at least one request handler, in registration order.
    pub fn routes(&self) -> impl Iterator<Item = &str> {
        self.paths.keys().map(String::as_str)
    }

    /// The rules with a websocket handler, in registration order.
    pub fn websocket_routes(&self) -> impl Iterator<Item = &str> {
        self.websocket_paths.keys().map(String::as_str)
    }

    /// The options of the route registered for `rule` that accepts `method`, if any.
    pub fn route_options(&self, rule: &str, method: &http::Method) -> Option<&RouteOptions> {
        self.paths
            .get(rule)?
            .iter()
            .find(|e| e.options.method_guard.allows(method))
            .map(|e| &e.options)
    }

    /// The options of the websocket route registered for `rule`, if any.
    pub fn websocket_route_options(&self, rule: &str) -> Option<&WebSocketOptions> {
        self.websocket_paths.get(rule).map(|e| &e.options)
    }

    /// Route `request` to the matching handler and return its response.
    ///
    /// - `404 Not Found` if the path doesn't match any rule, or if the `Host`
    ///   header doesn't match the configured host;
    /// - `405 Method Not Allowed` if the path matches a rule but none of its
    ///   handlers accepts the request method. The `Allow` header lists the
    ///   methods that would have been accepted.
    pub fn call(&self, mut request: Request) -> Response {
        let span = root_span(&request);
        let _guard = span.enter();

        let response = self.dispatch(&mut request, &span);
        span.record(HTTP_RESPONSE_STATUS_CODE, response.status().as_u16());
        tracing::info!("Request handled");
        response
    }

    fn dispatch(&self, request: &mut Request, span: &tracing::Span) -> Response {
        if !self.host_matches(request) {
            return empty(StatusCode::NOT_FOUND);
        }
        let path = request.uri().path();
        let Some((index, params)) = lookup(&self.router, path, self.config.strict_slashes) else {
            return empty(StatusCode::NOT_FOUND);
        };
        let Some((rule, endpoints)) = self.paths.get_index(index) else {
            return empty(StatusCode::NOT_FOUND);
        };
        span.record(HTTP_ROUTE, rule.as_str());

        let method = request.method().clone();
        let Some(endpoint) = endpoints
            .iter()
            .find(|e| e.options.method_guard.allows(&method))
        else {
            return method_not_allowed(endpoints.iter().map(|e| &e.options.method_guard));
        };
        request.extensions_mut().insert(params);
        (endpoint.handler)(&*request)
    }

    /// Open a websocket connection against `uri` and run the matching handler to completion.
    ///
    /// It returns the socket, which records the frames sent by the handler.
    pub fn connect(&self, uri: Uri) -> Result<InMemorySocket, NoWebSocketRoute> {
        self.connect_with(InMemorySocket::new(uri))
    }

    /// Same as [`connect`](Self::connect), but with a socket whose incoming
    /// frames have already been queued.
    pub fn connect_with(
        &self,
        mut socket: InMemorySocket,
    ) -> Result<InMemorySocket, NoWebSocketRoute> {
        let path = socket.uri().path().to_owned();
        let endpoint = lookup(&self.websocket_router, &path, self.config.strict_slashes)
            .and_then(|(i, _)| self.websocket_paths.get_index(i));
        let Some((rule, endpoint)) = endpoint else {
            return Err(NoWebSocketRoute {
                uri: socket.uri().clone(),
            });
        };

        let _span = tracing::info_span!("WebSocket connection", { HTTP_ROUTE } = %rule).entered();
        (endpoint.handler)(&mut socket as &mut dyn WebSocket);
        tracing::info!(frames_sent = socket.sent().len(), "WebSocket handler returned");
        Ok(socket)
    }

    fn host_matches(&self, request: &Request) -> bool {
        let Some(expected) = &self.config.host else {
            return true;
        };
        request
            .headers()
            .get(HOST)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|host| host.eq_ignore_ascii_case(expected))
    }
}

impl Router for Server {
    fn add_route(&mut self, handler: RequestHandler, rule: &str, options: &RouteOptions) {
        let endpoint = Endpoint {
            options: options.clone(),
            handler,
        };
        if let Some(endpoints) = self.paths.get_mut(rule) {
            endpoints.push(endpoint);
            return;
        }
        if let Err(e) = self.router.insert(rule, self.paths.len()) {
            tracing::error!(
                error.message = %e,
                { HTTP_ROUTE } = %rule,
                "Failed to register a route: it'll never be matched"
            );
            return;
        }
        self.paths.insert(rule.to_owned(), vec![endpoint]);
    }

    fn add_websocket_route(
        &mut self,
        handler: WebSocketHandler,
        rule: &str,
        options: &WebSocketOptions,
    ) {
        if let Err(e) = self.websocket_router.insert(rule, self.websocket_paths.len()) {
            tracing::error!(
                error.message = %e,
                { HTTP_ROUTE } = %rule,
                "Failed to register a websocket route: it'll never be matched"
            );
            return;
        }
        self.websocket_paths.insert(
            rule.to_owned(),
            WebSocketEndpoint {
                options: options.clone(),
                handler,
            },
        );
    }
}

/// Find the entry matching `path`.
///
/// Unless `strict_slashes` is set, `/a/` falls back to `/a` (and `/a` to `/a/`)
/// when there is no exact match.
fn lookup(
    router: &matchit::Router<usize>,
    path: &str,
    strict_slashes: bool,
) -> Option<(usize, RouteParams)> {
    if let Ok(matched) = router.at(path) {
        return Some((*matched.value, RouteParams::from(&matched.params)));
    }
    if strict_slashes {
        return None;
    }
    let alternative = match path.strip_suffix('/') {
        Some("") => return None,
        Some(trimmed) => trimmed.to_owned(),
        None => format!("{path}/"),
    };
    let matched = router.at(&alternative).ok()?;
    Some((*matched.value, RouteParams::from(&matched.params)))
}

fn method_not_allowed<'a>(guards: impl Iterator<Item = &'a MethodGuard>) -> Response {
    let mut allowed: Vec<String> = Vec::new();
    for guard in guards {
        // A guard that accepts every method never leads to a 405.
        let Some(methods) = guard.allowed_methods() else {
            continue;
        };
        for method in methods {
            if !allowed.iter().any(|m| m == method.as_str()) {
                allowed.push(method.as_str().to_owned());
            }
        }
    }
    let mut response = empty(StatusCode::METHOD_NOT_ALLOWED);
    if let Ok(value) = HeaderValue::from_str(&allowed.join(", ")) {
        response.headers_mut().insert(ALLOW, value);
    }
    response
}
