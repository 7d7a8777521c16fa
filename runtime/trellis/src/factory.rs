//! The deferred, one-shot registration step produced by a root blueprint.
use std::any::TypeId;

use indexmap::IndexMap;

use crate::blueprint::{BlueprintId, Blueprints, Instance, RoutePackage, WebSocketPackage};
use crate::dependency::{DependencyKey, DependencyType, ResolvedValues};
use crate::error::{BlueprintAlreadySealed, WiringError};
use crate::resolver::{DependencyResolver, FreeHandler, ResolvedComponent};
use crate::router::{RouteOptions, Router, WebSocketOptions};
use crate::transport::{RequestHandler, WebSocketHandler};

type RouteResolver = DependencyResolver<RequestHandler, RouteOptions>;
type WebSocketResolver = DependencyResolver<WebSocketHandler, WebSocketOptions>;

/// Registers the handlers of a flattened blueprint against a [`Router`].
///
/// A factory is produced by [`Blueprints::produce_factory`].
/// Before invoking it, the dependency-injection host must look at
/// [`dependency_keys`](Self::dependency_keys) and supply a value of the
/// right type for each key.
///
/// When [invoked](Self::invoke), the factory:
///
/// 1. builds each component, once, out of the supplied values;
/// 2. registers the component methods and the free handlers, with the
///    blueprint's prefix prepended to their rules;
/// 3. seals the blueprint.
///
/// A component that owns both request and websocket handlers is built
/// once and shared between them.
pub struct BlueprintFactory {
    blueprint: BlueprintId,
    name: String,
    url_prefix: String,
    route_resolver: RouteResolver,
    websocket_resolver: WebSocketResolver,
    free_routes: Vec<FreeHandler<RequestHandler, RouteOptions>>,
    free_websockets: Vec<FreeHandler<WebSocketHandler, WebSocketOptions>>,
}

impl BlueprintFactory {
    /// Who a blueprint is sealed by when its factory is invoked.
    pub const CALLER: &'static str = "factory";

    pub(crate) fn new(
        blueprint: BlueprintId,
        name: &str,
        url_prefix: &str,
        routes: Vec<RoutePackage>,
        websockets: Vec<WebSocketPackage>,
    ) -> Self {
        let mut route_resolver = RouteResolver::new();
        let mut free_routes = Vec::new();
        for package in routes {
            if let Err(free) = route_resolver.add(package) {
                free_routes.push(free);
            }
        }

        // Websocket keys must not collide with the route keys.
        let mut websocket_resolver = WebSocketResolver::new();
        websocket_resolver.update_offset(route_resolver.dependency_keys().len());
        let mut free_websockets = Vec::new();
        for package in websockets {
            if let Err(free) = websocket_resolver.add(package) {
                free_websockets.push(free);
            }
        }

        tracing::debug!(
            blueprint = %name,
            components = route_resolver.components().len() + websocket_resolver.components().len(),
            free_routes = free_routes.len(),
            free_websockets = free_websockets.len(),
            "Classified blueprint handlers"
        );

        Self {
            blueprint,
            name: name.to_owned(),
            url_prefix: url_prefix.to_owned(),
            route_resolver,
            websocket_resolver,
            free_routes,
            free_websockets,
        }
    }

    /// The blueprint the factory was produced by.
    pub fn blueprint(&self) -> BlueprintId {
        self.blueprint
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The values the factory must be invoked with, one per key.
    ///
    /// Keys for request handlers' components come first, followed by the keys
    /// for websocket handlers' components.
    pub fn dependency_keys(&self) -> impl Iterator<Item = (&DependencyKey, DependencyType)> {
        self.route_resolver
            .dependency_keys()
            .chain(self.websocket_resolver.dependency_keys())
    }

    pub fn route_resolver(&self) -> &DependencyResolver<RequestHandler, RouteOptions> {
        &self.route_resolver
    }

    pub fn websocket_resolver(&self) -> &DependencyResolver<WebSocketHandler, WebSocketOptions> {
        &self.websocket_resolver
    }

    /// Build every component and register every handler against `router`.
    ///
    /// Components are all built before any handler is registered: if a value
    /// is missing, or has the wrong type, `router` is left untouched.
    ///
    /// It fails if the blueprint has already been sealed, including by a
    /// previous invocation of this factory.
    /// On success, it returns the identifier of the now-sealed blueprint: its
    /// component instances can be retrieved via [`Blueprint::instance`].
    ///
    /// [`Blueprint::instance`]: crate::blueprint::Blueprint::instance
    pub fn invoke<R>(
        &self,
        blueprints: &mut Blueprints,
        router: &mut R,
        values: &ResolvedValues,
    ) -> Result<BlueprintId, WiringError>
    where
        R: Router + ?Sized,
    {
        let _span =
            tracing::info_span!("Invoking blueprint factory", blueprint = %self.name).entered();

        if let Some(owner) = blueprints[self.blueprint].sealed_by() {
            return Err(BlueprintAlreadySealed {
                caller: Self::CALLER.to_owned(),
                blueprint: self.name.clone(),
                owner: owner.to_owned(),
            }
            .into());
        }

        let mut instances = IndexMap::new();
        for component in self.route_resolver.components() {
            build_once(component, values, &mut instances)?;
        }
        for component in self.websocket_resolver.components() {
            build_once(component, values, &mut instances)?;
        }

        for component in self.route_resolver.components() {
            let instance = instance_of(component, &instances);
            for handler in &component.handlers {
                let rule = self.full_rule(&handler.rule);
                tracing::debug!(%rule, handler = handler.method.name, "Registering route");
                router.add_route(handler.method.bind(instance), &rule, &handler.options);
            }
        }
        for free in &self.free_routes {
            let rule = self.full_rule(&free.rule);
            tracing::debug!(%rule, handler = free.name, "Registering route");
            router.add_route(free.handler.clone(), &rule, &free.options);
        }
        for component in self.websocket_resolver.components() {
            let instance = instance_of(component, &instances);
            for handler in &component.handlers {
                let rule = self.full_rule(&handler.rule);
                tracing::debug!(
                    %rule,
                    handler = handler.method.name,
                    "Registering websocket route"
                );
                router.add_websocket_route(
                    handler.method.bind(instance),
                    &rule,
                    &handler.options,
                );
            }
        }
        for free in &self.free_websockets {
            let rule = self.full_rule(&free.rule);
            tracing::debug!(%rule, handler = free.name, "Registering websocket route");
            router.add_websocket_route(free.handler.clone(), &rule, &free.options);
        }

        let blueprint = &mut blueprints[self.blueprint];
        blueprint.instances = instances;
        blueprint.seal(Self::CALLER);
        Ok(self.blueprint)
    }

    fn full_rule(&self, rule: &str) -> String {
        format!("{}{rule}", self.url_prefix)
    }
}

fn build_once<H, O>(
    component: &ResolvedComponent<H, O>,
    values: &ResolvedValues,
    instances: &mut IndexMap<TypeId, Instance>,
) -> Result<(), WiringError> {
    let id = component.descriptor().id();
    if instances.contains_key(&id) {
        return Ok(());
    }
    let instance = component.build(values)?;
    tracing::debug!(component = component.descriptor().name(), "Built component");
    instances.insert(id, instance);
    Ok(())
}

fn instance_of<'a, H, O>(
    component: &ResolvedComponent<H, O>,
    instances: &'a IndexMap<TypeId, Instance>,
) -> &'a Instance {
    let id = component.descriptor().id();
    match instances.get(&id) {
        Some(instance) => instance,
        None => unreachable!(
            "`{}` should have been built before registering its handlers",
            component.descriptor().name()
        ),
    }
}
