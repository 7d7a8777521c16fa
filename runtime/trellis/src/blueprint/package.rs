use std::any::{Any, TypeId, type_name};
use std::sync::Arc;

use crate::dependency::{Constructor, ConstructorArgs, DependencyType};
use crate::error::WiringError;
use crate::router::{RouteOptions, WebSocketOptions};
use crate::transport::{RequestHandler, WebSocketHandler};

/// A type-erased component instance, shared by all the handlers bound to it.
pub(crate) type Instance = Arc<dyn Any + Send + Sync>;

type BuildFn = dyn Fn(&mut ConstructorArgs<'_>) -> Result<Instance, WiringError> + Send + Sync;
type BindFn<H> = dyn Fn(&Instance) -> H + Send + Sync;

/// A route declaration: a request handler, its rule and its options.
pub type RoutePackage = HandlerPackage<RequestHandler, RouteOptions>;

/// A websocket declaration: a websocket handler, its rule and its options.
pub type WebSocketPackage = HandlerPackage<WebSocketHandler, WebSocketOptions>;

/// A handler declaration, as recorded by a [`Blueprint`].
///
/// The rule is relative to the blueprint that recorded the handler.
/// It gets prefixed, mount after mount, as the blueprint is absorbed by its
/// ancestors.
///
/// [`Blueprint`]: super::Blueprint
#[derive(Clone)]
pub struct HandlerPackage<H, O> {
    pub(crate) handler: HandlerRef<H>,
    pub(crate) rule: String,
    pub(crate) options: O,
}

impl<H, O> HandlerPackage<H, O> {
    pub(crate) fn new(handler: HandlerRef<H>, rule: &str, options: O) -> Self {
        Self {
            handler,
            rule: rule.to_owned(),
            options,
        }
    }

    pub fn rule(&self) -> &str {
        &self.rule
    }

    pub fn options(&self) -> &O {
        &self.options
    }

    /// The fully-qualified path of the handler, e.g. `my_app::Home::increment`.
    pub fn handler_name(&self) -> &'static str {
        match &self.handler {
            HandlerRef::Free { name, .. } => *name,
            HandlerRef::Method(m) => m.name,
        }
    }

    /// The component that owns the handler.
    ///
    /// It returns `None` for free handlers.
    pub fn owner(&self) -> Option<&ComponentDescriptor> {
        match &self.handler {
            HandlerRef::Free { .. } => None,
            HandlerRef::Method(m) => Some(m.owner.as_ref()),
        }
    }

    /// Prepend `prefix` to the rule, verbatim.
    pub(crate) fn prefixed(mut self, prefix: &str) -> Self {
        self.rule = format!("{prefix}{}", self.rule);
        self
    }
}

/// Either a free handler or a method that needs an instance of its owner.
///
/// The variant is decided when the handler is declared.
#[derive(Clone)]
pub(crate) enum HandlerRef<H> {
    Free { handler: H, name: &'static str },
    Method(MethodRef<H>),
}

/// A method waiting for an instance of its owning component.
#[derive(Clone)]
pub(crate) struct MethodRef<H> {
    pub(crate) owner: Arc<ComponentDescriptor>,
    pub(crate) name: &'static str,
    bind: Arc<BindFn<H>>,
}

impl<H> MethodRef<H> {
    pub(crate) fn new(
        owner: Arc<ComponentDescriptor>,
        name: &'static str,
        bind: Arc<BindFn<H>>,
    ) -> Self {
        Self { owner, name, bind }
    }

    /// Turn the method into a handler bound to `instance`.
    ///
    /// `instance` must have been built by `self.owner`.
    pub(crate) fn bind(&self, instance: &Instance) -> H {
        (self.bind)(instance)
    }
}

/// A component type and the constructor used to build it.
pub struct ComponentDescriptor {
    id: TypeId,
    name: &'static str,
    input_types: Vec<DependencyType>,
    build: Box<BuildFn>,
}

impl ComponentDescriptor {
    pub(crate) fn new<C, Inputs>(constructor: C) -> Self
    where
        C: Constructor<Inputs>,
        Inputs: 'static,
    {
        Self {
            id: TypeId::of::<C::Output>(),
            name: type_name::<C::Output>(),
            input_types: C::input_types(),
            build: Box::new(move |args: &mut ConstructorArgs<'_>| {
                let component = constructor.construct(args)?;
                Ok(Arc::new(component) as Instance)
            }),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    /// The fully-qualified name of the component type.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The types of the constructor's inputs, in order.
    pub fn input_types(&self) -> &[DependencyType] {
        &self.input_types
    }

    pub(crate) fn build(&self, args: &mut ConstructorArgs<'_>) -> Result<Instance, WiringError> {
        (self.build)(args)
    }
}

impl std::fmt::Debug for ComponentDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentDescriptor")
            .field("name", &self.name)
            .field("input_types", &self.input_types)
            .finish_non_exhaustive()
    }
}
