//! The request, response and websocket types that handlers are written against.
//!
//! Trellis never touches the network: these are the shapes a [`Router`] must be
//! able to invoke.
//!
//! [`Router`]: crate::router::Router
use std::sync::Arc;

use bytes::Bytes;

/// An incoming HTTP request, with its body fully buffered.
pub type Request = http::Request<Bytes>;

/// An outgoing HTTP response.
pub type Response = http::Response<Bytes>;

/// A bound request handler, ready to be registered against a [`Router`].
///
/// [`Router`]: crate::router::Router
pub type RequestHandler = Arc<dyn Fn(&Request) -> Response + Send + Sync>;

/// A bound websocket handler, ready to be registered against a [`Router`].
///
/// [`Router`]: crate::router::Router
pub type WebSocketHandler = Arc<dyn Fn(&mut dyn WebSocket) + Send + Sync>;

/// An established websocket connection, as seen by a handler.
///
/// The transport behind it is up to the router: the server crate ships an
/// in-memory implementation that is handy in tests.
pub trait WebSocket {
    /// Accept the websocket handshake.
    fn accept(&mut self);

    /// Retrieve a query parameter from the URI used to open the connection.
    ///
    /// If the parameter appears more than once, the first value wins.
    fn query_param(&self, name: &str) -> Option<String>;

    /// Send a text frame to the peer.
    fn send_text(&mut self, text: String);

    /// Wait for the next text frame sent by the peer.
    ///
    /// It returns `None` once the peer has nothing left to send.
    fn receive_text(&mut self) -> Option<String>;

    /// Close the connection.
    fn close(&mut self);
}
