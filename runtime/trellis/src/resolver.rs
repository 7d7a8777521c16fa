//! Group method handlers by component and hoist their constructors' dependencies.
use std::any::TypeId;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::blueprint::{ComponentDescriptor, HandlerPackage, HandlerRef, Instance, MethodRef};
use crate::dependency::{ConstructorArgs, DependencyKey, DependencyType, ResolvedValues};
use crate::error::WiringError;

/// Classifies the handlers of a blueprint.
///
/// Method handlers are grouped by the component that owns them.
/// The constructor inputs of each component are mapped to [`DependencyKey`]s,
/// shared across all the components seen by the same resolver: two components
/// asking for the same type get the same key, therefore the
/// dependency-injection host only has to supply each type once.
///
/// Keys are minted as `arg<N>`, where `N` starts from the resolver's offset.
/// Use different offsets to make sure that two resolvers never hand out the
/// same key for different types.
pub struct DependencyResolver<H, O> {
    offset: usize,
    dependency_keys: IndexMap<DependencyKey, DependencyType>,
    components: IndexMap<TypeId, ResolvedComponent<H, O>>,
}

/// A component, the keys its constructor inputs are mapped to and the
/// method handlers it owns.
pub struct ResolvedComponent<H, O> {
    descriptor: Arc<ComponentDescriptor>,
    dependency_map: Vec<DependencyKey>,
    pub(crate) handlers: Vec<MethodHandler<H, O>>,
}

/// A method handler, waiting for an instance of its component.
pub(crate) struct MethodHandler<H, O> {
    pub(crate) method: MethodRef<H>,
    pub(crate) rule: String,
    pub(crate) options: O,
}

/// A handler that doesn't belong to any component.
///
/// It is returned by [`DependencyResolver::add`]: free handlers have no
/// dependencies to resolve and can be registered as they are.
pub struct FreeHandler<H, O> {
    pub handler: H,
    pub name: &'static str,
    pub rule: String,
    pub options: O,
}

impl<H, O> Default for DependencyResolver<H, O> {
    fn default() -> Self {
        Self {
            offset: 0,
            dependency_keys: IndexMap::new(),
            components: IndexMap::new(),
        }
    }
}

impl<H, O> DependencyResolver<H, O> {
    pub fn new() -> Self {
        Default::default()
    }

    /// A resolver whose first key is `arg{offset}`.
    pub fn with_offset(offset: usize) -> Self {
        Self {
            offset,
            ..Default::default()
        }
    }

    /// Change the number the next keys are minted from.
    ///
    /// Keys that were already minted are left untouched.
    pub fn update_offset(&mut self, offset: usize) {
        self.offset = offset;
    }

    /// Classify `package`.
    ///
    /// Method handlers are recorded against their component; the first time
    /// a component is seen, each of its constructor inputs is mapped to a key.
    /// Free handlers are handed back, as a [`FreeHandler`].
    pub fn add(&mut self, package: HandlerPackage<H, O>) -> Result<(), FreeHandler<H, O>> {
        let HandlerPackage {
            handler,
            rule,
            options,
        } = package;
        let method = match handler {
            HandlerRef::Free { handler, name } => {
                return Err(FreeHandler {
                    handler,
                    name,
                    rule,
                    options,
                });
            }
            HandlerRef::Method(method) => method,
        };

        let owner = Arc::clone(&method.owner);
        if !self.components.contains_key(&owner.id()) {
            let dependency_map: Vec<DependencyKey> = owner
                .input_types()
                .iter()
                .map(|ty| self.key_for(*ty))
                .collect();
            tracing::debug!(
                component = owner.name(),
                keys = ?dependency_map,
                "Resolved component dependencies"
            );
            self.components.insert(
                owner.id(),
                ResolvedComponent {
                    descriptor: Arc::clone(&owner),
                    dependency_map,
                    handlers: Vec::new(),
                },
            );
        }
        if let Some(component) = self.components.get_mut(&owner.id()) {
            component.handlers.push(MethodHandler {
                method,
                rule,
                options,
            });
        }
        Ok(())
    }

    /// All the distinct keys minted so far, with the type they must be
    /// supplied with, in the order they were minted.
    pub fn dependency_keys(
        &self,
    ) -> impl ExactSizeIterator<Item = (&DependencyKey, DependencyType)> {
        self.dependency_keys.iter().map(|(key, ty)| (key, *ty))
    }

    /// The components seen so far, in the order they were first seen.
    pub fn components(&self) -> impl ExactSizeIterator<Item = &ResolvedComponent<H, O>> {
        self.components.values()
    }

    fn key_for(&mut self, ty: DependencyType) -> DependencyKey {
        if let Some((key, _)) = self.dependency_keys.iter().find(|(_, t)| **t == ty) {
            return key.clone();
        }
        let key = DependencyKey::nth(self.dependency_keys.len() + self.offset);
        self.dependency_keys.insert(key.clone(), ty);
        key
    }
}

impl<H, O> ResolvedComponent<H, O> {
    pub fn descriptor(&self) -> &ComponentDescriptor {
        &self.descriptor
    }

    /// `dependency_map()[i]` is the key that supplies the `i`-th constructor input.
    pub fn dependency_map(&self) -> &[DependencyKey] {
        &self.dependency_map
    }

    /// The rules of the method handlers owned by the component, in declaration order.
    pub fn rules(&self) -> impl ExactSizeIterator<Item = &str> {
        self.handlers.iter().map(|h| h.rule.as_str())
    }

    /// Build the component out of `values`.
    pub(crate) fn build(&self, values: &ResolvedValues) -> Result<Instance, WiringError> {
        let mut args = ConstructorArgs::new(values, &self.dependency_map, self.descriptor.name());
        self.descriptor.build(&mut args)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::DependencyResolver;
    use crate::blueprint::{Blueprint, RoutePackage};
    use crate::dependency::DependencyType;
    use crate::router::{GET, RouteOptions};
    use crate::transport::{Request, RequestHandler, Response};

    struct Counter;
    struct Clock;

    struct Home {
        _counter: Arc<Counter>,
    }

    impl Home {
        fn new(counter: Arc<Counter>) -> Self {
            Self { _counter: counter }
        }

        fn get(&self, _request: &Request) -> Response {
            Response::default()
        }
    }

    struct Away {
        _clock: Arc<Clock>,
        _counter: Arc<Counter>,
    }

    impl Away {
        fn new(clock: Arc<Clock>, counter: Arc<Counter>) -> Self {
            Self {
                _clock: clock,
                _counter: counter,
            }
        }

        fn get(&self, _request: &Request) -> Response {
            Response::default()
        }
    }

    fn free(_request: &Request) -> Response {
        Response::default()
    }

    fn declared_routes() -> Vec<RoutePackage> {
        let mut bp = Blueprint::new("test");
        bp.route(GET, "/free", free);
        bp.component(Home::new).route(GET, "/home", Home::get);
        bp.component(Away::new).route(GET, "/away", Away::get);
        bp.component(Home::new).route(GET, "/home/again", Home::get);
        bp.routes().to_vec()
    }

    fn keys(
        resolver: &DependencyResolver<RequestHandler, RouteOptions>,
    ) -> Vec<(String, DependencyType)> {
        resolver
            .dependency_keys()
            .map(|(k, t)| (k.to_string(), t))
            .collect()
    }

    #[test]
    fn free_handlers_are_handed_back() {
        let mut resolver = DependencyResolver::new();
        let mut free_rules = vec![];
        for package in declared_routes() {
            if let Err(free) = resolver.add(package) {
                free_rules.push(free.rule);
            }
        }
        assert_eq!(free_rules, ["/free"]);
    }

    #[test]
    fn shared_dependency_types_get_a_single_key() {
        let mut resolver = DependencyResolver::new();
        for package in declared_routes() {
            let _ = resolver.add(package);
        }

        assert_eq!(
            keys(&resolver),
            vec![
                ("arg0".to_string(), DependencyType::of::<Arc<Counter>>()),
                ("arg1".to_string(), DependencyType::of::<Arc<Clock>>()),
            ]
        );
        let maps: Vec<Vec<&str>> = resolver
            .components()
            .map(|c| c.dependency_map().iter().map(|k| k.as_str()).collect())
            .collect();
        assert_eq!(maps, vec![vec!["arg0"], vec!["arg1", "arg0"]]);
    }

    #[test]
    fn methods_are_grouped_by_component() {
        let mut resolver = DependencyResolver::new();
        for package in declared_routes() {
            let _ = resolver.add(package);
        }

        let rules: Vec<Vec<&str>> = resolver.components().map(|c| c.rules().collect()).collect();
        assert_eq!(rules, vec![vec!["/home", "/home/again"], vec!["/away"]]);
    }

    #[test]
    fn keys_start_from_the_offset() {
        let mut resolver = DependencyResolver::with_offset(2);
        for package in declared_routes() {
            let _ = resolver.add(package);
        }
        let names: Vec<_> = keys(&resolver).into_iter().map(|(k, _)| k).collect();
        assert_eq!(names, ["arg2", "arg3"]);

        let mut resolver = DependencyResolver::new();
        resolver.update_offset(5);
        for package in declared_routes() {
            let _ = resolver.add(package);
        }
        let names: Vec<_> = keys(&resolver).into_iter().map(|(k, _)| k).collect();
        assert_eq!(names, ["arg5", "arg6"]);
    }
}
