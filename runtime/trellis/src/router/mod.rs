//! The capability that [`BlueprintFactory`]s register handlers against.
//!
//! [`BlueprintFactory`]: crate::factory::BlueprintFactory
pub use method_guard::{
    ANY, CONNECT, DELETE, GET, HEAD, MethodGuard, OPTIONS, PATCH, POST, PUT, TRACE,
};

mod method_guard;

use crate::transport::{RequestHandler, WebSocketHandler};

/// Something that can serve handlers: usually an HTTP server.
///
/// Trellis hands over fully bound handlers, with their final rule
/// (i.e. including every mount prefix).
/// How rules are parsed and matched is entirely up to the implementor.
pub trait Router {
    /// Register a request handler for `rule`.
    fn add_route(&mut self, handler: RequestHandler, rule: &str, options: &RouteOptions);

    /// Register a websocket handler for `rule`.
    fn add_websocket_route(
        &mut self,
        handler: WebSocketHandler,
        rule: &str,
        options: &WebSocketOptions,
    );
}

impl<R> Router for &mut R
where
    R: Router + ?Sized,
{
    fn add_route(&mut self, handler: RequestHandler, rule: &str, options: &RouteOptions) {
        (**self).add_route(handler, rule, options)
    }

    fn add_websocket_route(
        &mut self,
        handler: WebSocketHandler,
        rule: &str,
        options: &WebSocketOptions,
    ) {
        (**self).add_websocket_route(handler, rule, options)
    }
}

/// Registration options for a request handler.
///
/// They are set when the route is declared (see [`RegisteredRoute`]) and passed
/// untouched to [`Router::add_route`].
///
/// [`RegisteredRoute`]: crate::blueprint::RegisteredRoute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteOptions {
    /// The HTTP methods the handler responds to.
    pub method_guard: MethodGuard,
    /// An optional name, to refer to the route in reverse lookups.
    pub name: Option<String>,
    /// Whether the route should appear in generated API schemas.
    pub include_in_schema: bool,
}

impl RouteOptions {
    /// Options for a route guarded by `method_guard`, with no name.
    pub fn new(method_guard: MethodGuard) -> Self {
        Self {
            method_guard,
            name: None,
            include_in_schema: true,
        }
    }
}

impl Default for RouteOptions {
    fn default() -> Self {
        Self::new(GET)
    }
}

/// Registration options for a websocket handler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WebSocketOptions {
    /// An optional name, to refer to the route in reverse lookups.
    pub name: Option<String>,
}
