//! Declare handlers, group them into blueprints and compose blueprints into a tree.
//!
//! # Guide
//!
//! A [`Blueprint`] records route and websocket declarations without
//! registering them anywhere. Blueprints are stored in a [`Blueprints`] arena
//! and can be mounted under each other: when the root blueprint's factory is
//! produced (see [`Blueprints::produce_factory`]), the whole tree is
//! flattened into a single list of handlers, with the prefix of each mounted
//! blueprint prepended to its rules.
//!
//! Each blueprint can be consumed exactly once.
pub use arena::{BlueprintId, Blueprints, FlattenedHandlers};
pub use blueprint::Blueprint;
pub use package::{ComponentDescriptor, HandlerPackage, RoutePackage, WebSocketPackage};
pub use registered::{RegisteredComponent, RegisteredRoute, RegisteredWebSocket};

pub(crate) use package::{HandlerRef, Instance, MethodRef};

mod arena;
#[allow(clippy::module_inception)]
mod blueprint;
mod package;
mod registered;
