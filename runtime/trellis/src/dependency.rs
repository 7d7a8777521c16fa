//! Describe, key and supply the constructor dependencies of component types.
//!
//! A component's constructor is a plain function: each of its input types is a
//! dependency that must be supplied by the dependency-injection host when a
//! [`BlueprintFactory`] is invoked.
//!
//! [`BlueprintFactory`]: crate::factory::BlueprintFactory
use std::any::{Any, TypeId, type_name};
use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};

use indexmap::IndexMap;

use crate::error::{DependencyTypeMismatch, MissingDependency, WiringError};

/// The identifier of a slot that the dependency-injection host must fill.
///
/// Keys are minted by a [`DependencyResolver`], one per distinct dependency
/// type, as `arg0`, `arg1`, etc.
///
/// [`DependencyResolver`]: crate::resolver::DependencyResolver
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DependencyKey(String);

impl DependencyKey {
    /// The key with index `n`, i.e. `arg{n}`.
    pub fn nth(n: usize) -> Self {
        Self(format!("arg{n}"))
    }

    /// The key, as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for DependencyKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The type of a dependency.
///
/// Two dependency types are equal if and only if they refer to the same Rust
/// type: the name is only there for diagnostics.
#[derive(Debug, Clone, Copy)]
pub struct DependencyType {
    id: TypeId,
    name: &'static str,
}

impl DependencyType {
    /// The dependency type for `T`.
    pub fn of<T>() -> Self
    where
        T: ?Sized + 'static,
    {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    /// The fully-qualified name of the type.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for DependencyType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for DependencyType {}

impl Hash for DependencyType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// A type that can be injected into a component's constructor.
///
/// The same value may have to be handed to several constructors (e.g. a shared
/// connection pool), therefore it must be cheap to clone: wrap it in an
/// [`Arc`](std::sync::Arc) if it isn't.
pub trait Dependency: Clone + Send + Sync + 'static {}

impl<T> Dependency for T where T: Clone + Send + Sync + 'static {}

/// The values supplied by the dependency-injection host, one per [`DependencyKey`].
#[derive(Default)]
pub struct ResolvedValues {
    values: IndexMap<DependencyKey, Box<dyn Any + Send + Sync>>,
}

impl ResolvedValues {
    pub fn new() -> Self {
        Default::default()
    }

    /// Supply `value` for `key`.
    ///
    /// If a value was already supplied for the same key, it is replaced.
    pub fn insert<T>(&mut self, key: DependencyKey, value: T) -> &mut Self
    where
        T: Dependency,
    {
        self.insert_boxed(key, Box::new(value))
    }

    /// Supply an already type-erased value for `key`.
    ///
    /// The value must be a `T`, where `T` is the type associated with `key`
    /// in [`BlueprintFactory::dependency_keys`]. A mismatch is reported when
    /// the factory is invoked.
    ///
    /// [`BlueprintFactory::dependency_keys`]: crate::factory::BlueprintFactory::dependency_keys
    pub fn insert_boxed(
        &mut self,
        key: DependencyKey,
        value: Box<dyn Any + Send + Sync>,
    ) -> &mut Self {
        self.values.insert(key, value);
        self
    }

    pub fn contains_key(&self, key: &DependencyKey) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn get<T>(&self, key: &DependencyKey, component: &'static str) -> Result<T, WiringError>
    where
        T: Dependency,
    {
        let Some(value) = self.values.get(key) else {
            return Err(MissingDependency {
                key: key.to_owned(),
                type_name: type_name::<T>(),
                component,
            }
            .into());
        };
        match value.downcast_ref::<T>() {
            Some(value) => Ok(value.clone()),
            None => Err(DependencyTypeMismatch {
                key: key.to_owned(),
                expected: type_name::<T>(),
            }
            .into()),
        }
    }
}

impl std::fmt::Debug for ResolvedValues {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.values.keys()).finish()
    }
}

/// The inputs of a single constructor invocation, fed positionally.
pub struct ConstructorArgs<'a> {
    values: &'a ResolvedValues,
    keys: &'a [DependencyKey],
    component: &'static str,
    position: usize,
}

impl<'a> ConstructorArgs<'a> {
    /// `keys[i]` is the key that supplies the `i`-th constructor input.
    pub(crate) fn new(
        values: &'a ResolvedValues,
        keys: &'a [DependencyKey],
        component: &'static str,
    ) -> Self {
        Self {
            values,
            keys,
            component,
            position: 0,
        }
    }

    /// Retrieve the value for the next constructor input.
    pub fn next<T>(&mut self) -> Result<T, WiringError>
    where
        T: Dependency,
    {
        let Some(key) = self.keys.get(self.position) else {
            unreachable!(
                "`{}` asked for more inputs than it declared",
                self.component
            )
        };
        self.position += 1;
        self.values.get(key, self.component)
    }
}

/// A function that builds a component out of its dependencies.
///
/// It is implemented for every function (or closure) that takes up to eight
/// [`Dependency`] inputs:
///
/// ```rust
/// use std::sync::Arc;
/// use trellis::dependency::Constructor;
///
/// // `constructor` can have an arbitrary number of inputs.
/// fn f<C, Inputs>(constructor: C)
/// where
///     C: Constructor<Inputs>,
/// {
///     // [...]
/// }
///
/// struct Counter;
/// struct Home {
///     counter: Arc<Counter>,
/// }
///
/// impl Home {
///     fn new(counter: Arc<Counter>) -> Self {
///         Self { counter }
///     }
/// }
///
/// // They all compile!
/// f(Home::new);
/// f(|| 42u64);
/// f(|a: u8, b: String| format!("{a}{b}"));
/// ```
pub trait Constructor<Inputs>: Send + Sync + 'static {
    /// The component built by the constructor.
    type Output: Send + Sync + 'static;

    /// The types of the constructor's inputs, in order.
    fn input_types() -> Vec<DependencyType>;

    /// Invoke the constructor, pulling its inputs from `args`.
    fn construct(&self, args: &mut ConstructorArgs<'_>) -> Result<Self::Output, WiringError>;
}

macro_rules! impl_constructor {
    ($($var:ident),*) => {
        impl<$($var,)* OutputType, FunctionType> Constructor<($($var,)*)> for FunctionType
        where
            FunctionType: Fn($($var,)*) -> OutputType + Send + Sync + 'static,
            OutputType: Send + Sync + 'static,
            $($var: Dependency,)*
        {
            type Output = OutputType;

            fn input_types() -> Vec<DependencyType> {
                vec![$(DependencyType::of::<$var>(),)*]
            }

            #[allow(non_snake_case, unused_variables)]
            fn construct(&self, args: &mut ConstructorArgs<'_>) -> Result<OutputType, WiringError> {
                $(let $var = args.next::<$var>()?;)*
                Ok((self)($($var,)*))
            }
        }
    };
}

impl_constructor!();
impl_constructor!(A);
impl_constructor!(A, B);
impl_constructor!(A, B, C);
impl_constructor!(A, B, C, D);
impl_constructor!(A, B, C, D, E);
impl_constructor!(A, B, C, D, E, F);
impl_constructor!(A, B, C, D, E, F, G);
impl_constructor!(A, B, C, D, E, F, G, H);
