use std::any::type_name;
use std::marker::PhantomData;
use std::sync::Arc;

use super::package::{ComponentDescriptor, HandlerPackage, HandlerRef, Instance, MethodRef};
use super::Blueprint;
use crate::router::{MethodGuard, RouteOptions, WebSocketOptions};
use crate::transport::{Request, RequestHandler, Response, WebSocket, WebSocketHandler};

/// The type returned by [`Blueprint::route`] and [`RegisteredComponent::route`].
///
/// It allows you to further configure the behaviour of the registered route.
pub struct RegisteredRoute<'a> {
    pub(crate) blueprint: &'a mut Blueprint,
    /// The index of the registered route in the blueprint's `deferred_routes` vector.
    pub(crate) route_id: usize,
}

impl RegisteredRoute<'_> {
    /// Give the route a name, to refer to it in reverse lookups.
    pub fn name(mut self, name: &str) -> Self {
        self.options().name = Some(name.to_owned());
        self
    }

    /// Keep the route out of generated API schemas.
    pub fn exclude_from_schema(mut self) -> Self {
        self.options().include_in_schema = false;
        self
    }

    fn options(&mut self) -> &mut RouteOptions {
        &mut self.blueprint.deferred_routes[self.route_id].options
    }
}

/// The type returned by [`Blueprint::websocket`] and [`RegisteredComponent::websocket`].
///
/// It allows you to further configure the behaviour of the registered websocket route.
pub struct RegisteredWebSocket<'a> {
    pub(crate) blueprint: &'a mut Blueprint,
    /// The index of the registered route in the blueprint's `deferred_sockets` vector.
    pub(crate) websocket_id: usize,
}

impl RegisteredWebSocket<'_> {
    /// Give the websocket route a name, to refer to it in reverse lookups.
    pub fn name(mut self, name: &str) -> Self {
        self.options().name = Some(name.to_owned());
        self
    }

    fn options(&mut self) -> &mut WebSocketOptions {
        &mut self.blueprint.deferred_sockets[self.websocket_id].options
    }
}

/// The type returned by [`Blueprint::component`].
///
/// Use it to register methods of `T` as request or websocket handlers.
/// The instance of `T` is built once, when the blueprint's factory is
/// invoked, and shared by all the handlers registered here.
///
/// ```rust
/// use std::sync::Arc;
/// use trellis::blueprint::Blueprint;
/// use trellis::router::{GET, POST};
/// use trellis::transport::{Request, Response, WebSocket};
/// # struct Pool;
/// # struct Users { pool: Arc<Pool> }
/// # impl Users {
/// #     fn new(pool: Arc<Pool>) -> Self { Self { pool } }
/// #     fn list(&self, _r: &Request) -> Response { todo!() }
/// #     fn create(&self, _r: &Request) -> Response { todo!() }
/// #     fn feed(&self, _ws: &mut dyn WebSocket) { todo!() }
/// # }
///
/// let mut bp = Blueprint::new("users");
/// let mut users = bp.component(Users::new);
/// users.route(GET, "/", Users::list);
/// users.route(POST, "/", Users::create).exclude_from_schema();
/// users.websocket("/feed", Users::feed).name("users-feed");
/// ```
pub struct RegisteredComponent<'a, T> {
    blueprint: &'a mut Blueprint,
    descriptor: Arc<ComponentDescriptor>,
    component: PhantomData<fn() -> T>,
}

impl<'a, T> RegisteredComponent<'a, T>
where
    T: Send + Sync + 'static,
{
    pub(crate) fn new(blueprint: &'a mut Blueprint, descriptor: Arc<ComponentDescriptor>) -> Self {
        Self {
            blueprint,
            descriptor,
            component: PhantomData,
        }
    }

    /// Register `method` as the request handler for `rule`.
    pub fn route<M>(
        &mut self,
        method_guard: MethodGuard,
        rule: &str,
        method: M,
    ) -> RegisteredRoute<'_>
    where
        M: Fn(&T, &Request) -> Response + Send + Sync + 'static,
    {
        let method = Arc::new(method);
        let bind = move |instance: &Instance| -> RequestHandler {
            let component = downcast::<T>(instance);
            let method = Arc::clone(&method);
            Arc::new(move |request: &Request| method(&*component, request))
        };
        let handler = HandlerRef::Method(MethodRef::new(
            Arc::clone(&self.descriptor),
            type_name::<M>(),
            Arc::new(bind),
        ));
        let package = HandlerPackage::new(handler, rule, RouteOptions::new(method_guard));
        self.blueprint.register_route(package)
    }

    /// Register `method` as the websocket handler for `rule`.
    pub fn websocket<M>(&mut self, rule: &str, method: M) -> RegisteredWebSocket<'_>
    where
        M: Fn(&T, &mut dyn WebSocket) + Send + Sync + 'static,
    {
        let method = Arc::new(method);
        let bind = move |instance: &Instance| -> WebSocketHandler {
            let component = downcast::<T>(instance);
            let method = Arc::clone(&method);
            Arc::new(move |socket: &mut dyn WebSocket| method(&*component, socket))
        };
        let handler = HandlerRef::Method(MethodRef::new(
            Arc::clone(&self.descriptor),
            type_name::<M>(),
            Arc::new(bind),
        ));
        let package = HandlerPackage::new(handler, rule, WebSocketOptions::default());
        self.blueprint.register_websocket(package)
    }
}

fn downcast<T>(instance: &Instance) -> Arc<T>
where
    T: Send + Sync + 'static,
{
    match Arc::clone(instance).downcast::<T>() {
        Ok(component) => component,
        // Instances are always built by the descriptor they are bound through.
        Err(_) => unreachable!(
            "The instance bound to a `{}` method has the wrong type",
            type_name::<T>()
        ),
    }
}

#[cfg(test)]
mod tests {
    use crate::blueprint::Blueprint;
    use crate::router::{GET, POST};
    use crate::transport::{Request, Response, WebSocket};

    fn noop(_request: &Request) -> Response {
        Response::default()
    }

    struct Feed;

    impl Feed {
        fn list(&self, _request: &Request) -> Response {
            Response::default()
        }

        fn stream(&self, _socket: &mut dyn WebSocket) {}
    }

    #[test]
    fn route_handles_update_the_recorded_options() {
        let mut bp = Blueprint::new("api");
        bp.route(GET, "/a", noop).name("a");
        bp.route(POST, "/b", noop).exclude_from_schema();
        bp.websocket("/ws", |_: &mut dyn WebSocket| {}).name("ws");

        let routes = bp.routes();
        assert_eq!(routes[0].options().name.as_deref(), Some("a"));
        assert!(routes[0].options().include_in_schema);
        assert_eq!(routes[1].options().name, None);
        assert!(!routes[1].options().include_in_schema);
        assert_eq!(bp.websockets()[0].options().name.as_deref(), Some("ws"));
    }

    #[test]
    fn component_handles_update_the_recorded_options() {
        let mut bp = Blueprint::new("feed");
        let mut feed = bp.component(|| Feed);
        feed.route(GET, "/", Feed::list)
            .name("feed")
            .exclude_from_schema();
        feed.websocket("/live", Feed::stream).name("live");

        let route = &bp.routes()[0];
        assert_eq!(route.options().name.as_deref(), Some("feed"));
        assert!(!route.options().include_in_schema);
        assert_eq!(route.owner().map(|c| c.name()), Some(std::any::type_name::<Feed>()));
        assert_eq!(bp.websockets()[0].options().name.as_deref(), Some("live"));
    }
}
