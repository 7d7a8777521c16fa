use std::any::{Any, TypeId, type_name};
use std::sync::Arc;

use indexmap::IndexMap;

use super::package::{
    ComponentDescriptor, HandlerPackage, HandlerRef, Instance, RoutePackage, WebSocketPackage,
};
use super::registered::{RegisteredComponent, RegisteredRoute, RegisteredWebSocket};
use super::BlueprintId;
use crate::dependency::Constructor;
use crate::router::{MethodGuard, RouteOptions, WebSocketOptions};
use crate::transport::{Request, RequestHandler, Response, WebSocket, WebSocketHandler};

/// A named group of route and websocket handlers, sharing a common path prefix.
///
/// A blueprint doesn't register anything right away: it records your
/// declarations and defers them until the application is wired together.
/// Blueprints can be [mounted](Blueprint::mount) under other blueprints to
/// build a tree, which is then flattened into a single list of routes by
/// [`Blueprints::produce_factory`].
///
/// Handlers come in two flavours:
///
/// - free functions, registered via [`Blueprint::route`] and [`Blueprint::websocket`];
/// - methods of a component type, registered via [`Blueprint::component`].
///   The component is built, once, when the blueprint's factory is invoked.
///
/// ```rust
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicI64, Ordering};
/// use trellis::blueprint::Blueprint;
/// use trellis::response::plain_text;
/// use trellis::router::GET;
/// use trellis::transport::{Request, Response};
///
/// #[derive(Default)]
/// pub struct Counter(AtomicI64);
///
/// pub struct Home {
///     counter: Arc<Counter>,
/// }
///
/// impl Home {
///     pub fn new(counter: Arc<Counter>) -> Self {
///         Self { counter }
///     }
///
///     pub fn go_up(&self, _request: &Request) -> Response {
///         let value = self.counter.0.fetch_add(1, Ordering::SeqCst) + 1;
///         plain_text(value.to_string())
///     }
/// }
///
/// pub fn hello(_request: &Request) -> Response {
///     plain_text("Hello, world!")
/// }
///
/// let mut bp = Blueprint::new("home");
/// bp.route(GET, "/hello", hello);
/// bp.component(Home::new).route(GET, "/go-up", Home::go_up);
/// assert_eq!(bp.prefix(), "/home");
/// ```
///
/// [`Blueprints::produce_factory`]: super::Blueprints::produce_factory
pub struct Blueprint {
    name: String,
    url_prefix: String,
    host: Option<String>,
    version: Option<String>,
    strict_slashes: bool,
    components: IndexMap<TypeId, Arc<ComponentDescriptor>>,
    pub(crate) deferred_routes: Vec<RoutePackage>,
    pub(crate) deferred_sockets: Vec<WebSocketPackage>,
    pub(crate) mounted: Vec<BlueprintId>,
    pub(crate) state: SealState,
    pub(crate) instances: IndexMap<TypeId, Instance>,
}

/// Blueprints are consumed exactly once: `Open` → `Sealed` is the only transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SealState {
    Open,
    Sealed { by: String },
}

impl Blueprint {
    /// Create a new [`Blueprint`].
    ///
    /// Its URL prefix defaults to `/{name}`.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            url_prefix: format!("/{name}"),
            host: None,
            version: None,
            strict_slashes: false,
            components: IndexMap::new(),
            deferred_routes: Vec::new(),
            deferred_sockets: Vec::new(),
            mounted: Vec::new(),
            state: SealState::Open,
            instances: IndexMap::new(),
        }
    }

    /// Set the prefix prepended to every rule registered against this blueprint.
    ///
    /// The prefix is concatenated as-is: no slash is added or removed.
    /// An empty prefix is ignored and the `/{name}` default is kept.
    pub fn url_prefix(mut self, prefix: &str) -> Self {
        if !prefix.is_empty() {
            self.url_prefix = prefix.to_owned();
        }
        self
    }

    /// Record the host this blueprint's routes are meant to be served on.
    ///
    /// This is metadata for whoever inspects the blueprint: it isn't part
    /// of the [`RouteOptions`] handed to the router, therefore it doesn't
    /// affect request matching. Host filtering is the router's business.
    pub fn host(mut self, host: &str) -> Self {
        self.host = Some(host.to_owned());
        self
    }

    /// Record the API version this blueprint belongs to.
    pub fn version(mut self, version: &str) -> Self {
        self.version = Some(version.to_owned());
        self
    }

    /// Record whether the blueprint's author considers `/path` and `/path/`
    /// to be different rules.
    ///
    /// Like [`host`](Self::host), it's metadata: trailing-slash handling is
    /// configured on the router.
    pub fn strict_slashes(mut self, strict: bool) -> Self {
        self.strict_slashes = strict;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn prefix(&self) -> &str {
        &self.url_prefix
    }

    pub fn host_name(&self) -> Option<&str> {
        self.host.as_deref()
    }

    pub fn api_version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn is_strict_about_slashes(&self) -> bool {
        self.strict_slashes
    }

    /// `true` once the blueprint has been consumed, either by a parent or by its own factory.
    pub fn is_sealed(&self) -> bool {
        matches!(self.state, SealState::Sealed { .. })
    }

    /// Who consumed the blueprint, if anybody did.
    pub fn sealed_by(&self) -> Option<&str> {
        match &self.state {
            SealState::Open => None,
            SealState::Sealed { by } => Some(by.as_str()),
        }
    }

    /// The routes recorded so far, including those absorbed from mounted blueprints.
    pub fn routes(&self) -> &[RoutePackage] {
        &self.deferred_routes
    }

    /// The websocket routes recorded so far, including those absorbed from mounted blueprints.
    pub fn websockets(&self) -> &[WebSocketPackage] {
        &self.deferred_sockets
    }

    /// The blueprints mounted under this one, in the order they were mounted.
    pub fn mounted(&self) -> &[BlueprintId] {
        &self.mounted
    }

    /// The instance of `T` built by this blueprint's factory, if any.
    pub fn instance<T>(&self) -> Option<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        let instance = self.instances.get(&TypeId::of::<T>())?;
        Arc::clone(instance).downcast::<T>().ok()
    }

    /// Register a free request handler for `rule`.
    ///
    /// The handler is returned untouched to the router, once the blueprint's
    /// prefix (and the prefixes of all the blueprints it's mounted under) has
    /// been prepended to `rule`.
    ///
    /// ```rust
    /// use trellis::blueprint::Blueprint;
    /// use trellis::router::{GET, MethodGuard};
    /// use trellis::transport::{Request, Response};
    /// use http::Method;
    /// # fn hello(_request: &Request) -> Response { todo!() }
    ///
    /// let mut bp = Blueprint::new("api");
    /// bp.route(GET, "/hello", hello).name("hello");
    /// bp.route(MethodGuard::new([Method::POST, Method::PUT]), "/hello", hello);
    /// ```
    pub fn route<F>(
        &mut self,
        method_guard: MethodGuard,
        rule: &str,
        handler: F,
    ) -> RegisteredRoute<'_>
    where
        F: Fn(&Request) -> Response + Send + Sync + 'static,
    {
        let handler = HandlerRef::Free {
            handler: Arc::new(handler) as RequestHandler,
            name: type_name::<F>(),
        };
        let package = HandlerPackage::new(handler, rule, RouteOptions::new(method_guard));
        self.register_route(package)
    }

    /// Register a free websocket handler for `rule`.
    pub fn websocket<F>(&mut self, rule: &str, handler: F) -> RegisteredWebSocket<'_>
    where
        F: Fn(&mut dyn WebSocket) + Send + Sync + 'static,
    {
        let handler = HandlerRef::Free {
            handler: Arc::new(handler) as WebSocketHandler,
            name: type_name::<F>(),
        };
        let package = HandlerPackage::new(handler, rule, WebSocketOptions::default());
        self.register_websocket(package)
    }

    /// Register a component type, built by `constructor`, whose methods handle
    /// requests or websocket connections.
    ///
    /// Each input of `constructor` is a dependency: the blueprint's factory
    /// will ask the dependency-injection host for it.
    /// If the same component type is registered more than once against this
    /// blueprint, the first constructor is kept.
    ///
    /// Check out [`RegisteredComponent`] to attach handlers.
    pub fn component<C, Inputs>(&mut self, constructor: C) -> RegisteredComponent<'_, C::Output>
    where
        C: Constructor<Inputs>,
        Inputs: 'static,
    {
        let descriptor = self
            .components
            .entry(TypeId::of::<C::Output>())
            .or_insert_with(|| Arc::new(ComponentDescriptor::new(constructor)))
            .clone();
        RegisteredComponent::new(self, descriptor)
    }

    /// Mount `child` under this blueprint.
    ///
    /// All the handlers of `child` (and of the blueprints mounted under it) will
    /// be absorbed into this blueprint when it's flattened, with `child`'s
    /// prefix prepended to their rules.
    /// A blueprint can only be absorbed once: mounting it in two places, or
    /// mounting it and providing it directly, results in a
    /// [`BlueprintAlreadySealed`](crate::error::BlueprintAlreadySealed) error
    /// at wiring time.
    pub fn mount(&mut self, child: BlueprintId) {
        self.mounted.push(child);
    }

    pub(crate) fn register_route(&mut self, package: RoutePackage) -> RegisteredRoute<'_> {
        let route_id = self.deferred_routes.len();
        self.deferred_routes.push(package);
        RegisteredRoute {
            blueprint: self,
            route_id,
        }
    }

    pub(crate) fn register_websocket(
        &mut self,
        package: WebSocketPackage,
    ) -> RegisteredWebSocket<'_> {
        let websocket_id = self.deferred_sockets.len();
        self.deferred_sockets.push(package);
        RegisteredWebSocket {
            blueprint: self,
            websocket_id,
        }
    }

    pub(crate) fn seal(&mut self, by: &str) {
        self.state = SealState::Sealed { by: by.to_owned() };
    }
}

impl std::fmt::Debug for Blueprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Blueprint")
            .field("name", &self.name)
            .field("url_prefix", &self.url_prefix)
            .field("routes", &self.deferred_routes.len())
            .field("websockets", &self.deferred_sockets.len())
            .field("mounted", &self.mounted)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::Blueprint;
    use crate::router::{GET, RouteOptions};
    use crate::transport::{Request, Response};

    fn noop(_request: &Request) -> Response {
        Response::default()
    }

    #[test]
    fn metadata_is_recorded_but_not_forwarded() {
        let mut bp = Blueprint::new("api")
            .host("api.example.com")
            .version("v2")
            .strict_slashes(true);
        bp.route(GET, "/users", noop);

        assert_eq!(bp.host_name(), Some("api.example.com"));
        assert_eq!(bp.api_version(), Some("v2"));
        assert!(bp.is_strict_about_slashes());
        assert_eq!(bp.routes()[0].options(), &RouteOptions::new(GET));
    }

    #[test]
    fn metadata_defaults() {
        let bp = Blueprint::new("api");
        assert_eq!(bp.prefix(), "/api");
        assert_eq!(bp.host_name(), None);
        assert_eq!(bp.api_version(), None);
        assert!(!bp.is_strict_about_slashes());
        assert!(!bp.is_sealed());
    }
}
