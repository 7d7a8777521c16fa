//! A minimal dependency-injection host for blueprint factories.
use std::any::{Any, TypeId, type_name};

use indexmap::IndexMap;
use trellis::WiringError;
use trellis::blueprint::{BlueprintId, Blueprints};
use trellis::dependency::{Dependency, DependencyKey, DependencyType, ResolvedValues};
use trellis::error::BlueprintAlreadySealed;
use trellis::factory::BlueprintFactory;
use trellis::router::Router;

type Supplier = Box<dyn Fn() -> Box<dyn Any + Send + Sync> + Send + Sync>;

/// Supplies the values that blueprint factories ask for, by type.
///
/// Each provided value is cloned for every key that asks for its type:
/// wrap it in an [`Arc`](std::sync::Arc) to share a single instance.
///
/// ```rust
/// use std::sync::Arc;
/// use std::sync::atomic::AtomicI64;
/// use trellis::blueprint::{Blueprint, Blueprints};
/// use trellis::router::GET;
/// use trellis::transport::{Request, Response};
/// use trellis_server::harness::Harness;
/// use trellis_server::server::{Server, ServerConfig};
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
///     pub fn get(&self, _request: &Request) -> Response {
///         // [...]
///         # todo!()
///     }
/// }
///
/// let mut blueprints = Blueprints::new();
/// let mut home = Blueprint::new("home");
/// home.component(Home::new).route(GET, "/", Home::get);
/// let home = blueprints.add(home);
///
/// let mut server = Server::new(ServerConfig::default());
/// let mut harness = Harness::new();
/// harness.provide(Arc::new(Counter::default()));
/// harness.wire(&mut blueprints, &mut server, &[home]).unwrap();
///
/// assert_eq!(server.routes().collect::<Vec<_>>(), ["/home/"]);
/// ```
#[derive(Default)]
pub struct Harness {
    providers: IndexMap<TypeId, (&'static str, Supplier)>,
}

/// The error returned by [`Harness::resolve`] and [`Harness::wire`].
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum HarnessError {
    #[error(transparent)]
    Wiring(#[from] WiringError),
    #[error(transparent)]
    MissingProvider(#[from] MissingProvider),
}

/// A factory asked for a type that nobody provided.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("There is no provider for `{type_name}`, the type required for `{key}`")]
pub struct MissingProvider {
    pub key: DependencyKey,
    pub type_name: &'static str,
}

impl Harness {
    pub fn new() -> Self {
        Default::default()
    }

    /// Provide `value` to every factory that needs a `T`.
    ///
    /// If a value of the same type was already provided, it is replaced.
    pub fn provide<T>(&mut self, value: T) -> &mut Self
    where
        T: Dependency,
    {
        let supplier: Supplier =
            Box::new(move || Box::new(value.clone()) as Box<dyn Any + Send + Sync>);
        self.providers
            .insert(TypeId::of::<T>(), (type_name::<T>(), supplier));
        self
    }

    /// `true` if a value of type `T` has been provided.
    pub fn provides<T>(&self) -> bool
    where
        T: 'static,
    {
        self.providers.contains_key(&TypeId::of::<T>())
    }

    /// Build the values for `keys`, e.g. the output of
    /// [`BlueprintFactory::dependency_keys`](trellis::factory::BlueprintFactory::dependency_keys).
    pub fn resolve<'a, I>(&self, keys: I) -> Result<ResolvedValues, HarnessError>
    where
        I: IntoIterator<Item = (&'a DependencyKey, DependencyType)>,
    {
        let mut values = ResolvedValues::new();
        for (key, ty) in keys {
            let Some((provided, supplier)) = self.providers.get(&ty.id()) else {
                return Err(MissingProvider {
                    key: key.to_owned(),
                    type_name: ty.name(),
                }
                .into());
            };
            tracing::debug!(%key, type_name = provided, "Resolved dependency");
            values.insert_boxed(key.to_owned(), supplier());
        }
        Ok(values)
    }

    /// Wire every blueprint in `roots` against `router`.
    ///
    /// The factories of all roots are produced first, in order, and only then
    /// invoked, in the same order. A blueprint that shows up twice (listed
    /// twice, or mounted under a root and also listed as a root itself) is
    /// therefore reported before anything is registered against `router`.
    ///
    /// It returns the identifiers of the sealed roots.
    pub fn wire<R>(
        &self,
        blueprints: &mut Blueprints,
        router: &mut R,
        roots: &[BlueprintId],
    ) -> Result<Vec<BlueprintId>, HarnessError>
    where
        R: Router + ?Sized,
    {
        let _span = tracing::info_span!("Wiring blueprints", roots = roots.len()).entered();

        // Roots are only sealed when their factory is invoked: a repeated root
        // would get through production and fail after the first registration.
        for (i, root) in roots.iter().enumerate() {
            if roots[..i].contains(root) {
                return Err(WiringError::from(BlueprintAlreadySealed {
                    caller: BlueprintFactory::CALLER.to_owned(),
                    blueprint: blueprints[*root].name().to_owned(),
                    owner: BlueprintFactory::CALLER.to_owned(),
                })
                .into());
            }
        }

        let factories = roots
            .iter()
            .map(|&root| blueprints.produce_factory(root))
            .collect::<Result<Vec<_>, _>>()?;

        let mut wired = Vec::with_capacity(factories.len());
        for factory in &factories {
            let values = self.resolve(factory.dependency_keys())?;
            let id = factory.invoke(blueprints, router, &values)?;
            tracing::info!(blueprint = factory.name(), "Blueprint wired");
            wired.push(id);
        }
        Ok(wired)
    }
}
