//! # Trellis - API reference
//!
//! Trellis sits between your handlers and the server that will eventually
//! serve them.
//!
//! You group route and websocket handlers into named, mountable [`Blueprint`]s.
//! Handlers can be free functions or methods on a component type whose
//! constructor has dependencies of its own.
//! When it's time to wire the application together, each root blueprint
//! produces a [`BlueprintFactory`]: it tells the dependency-injection host which
//! values it needs (one slot per distinct type) and, once invoked with those
//! values, it builds each component exactly once and registers every handler
//! against a [`Router`].
//!
//! Trellis doesn't parse URL patterns, dispatch requests or perform any I/O:
//! that's the router's job.
//!
//! [`Blueprint`]: blueprint::Blueprint
//! [`BlueprintFactory`]: factory::BlueprintFactory
//! [`Router`]: router::Router
pub use error::WiringError;

pub mod blueprint;
pub mod dependency;
pub mod error;
pub mod factory;
pub mod resolver;
pub mod response;
pub mod router;
pub mod transport;
