//! # Trellis server
//!
//! The collaborators that turn [`trellis`] blueprints into a running application:
//!
//! - [`Server`](server::Server), an in-process router that implements
//!   [`trellis::router::Router`];
//! - [`Harness`](harness::Harness), a dependency-injection host that
//!   supplies the values each blueprint factory asks for and wires the
//!   blueprints against a router;
//! - [`ConfigLoader`](config::ConfigLoader), to load the server configuration
//!   from YAML files and environment variables (behind the `config` feature).
#[cfg(feature = "config")]
pub mod config;
pub mod harness;
pub mod server;
pub mod telemetry;
