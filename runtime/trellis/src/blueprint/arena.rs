use std::ops::{Index, IndexMut};

use la_arena::Arena;

use super::package::{RoutePackage, WebSocketPackage};
use super::Blueprint;
use crate::error::{BlueprintAlreadySealed, CyclicMount, WiringError};
use crate::factory::BlueprintFactory;

/// The identifier of a [`Blueprint`] stored in [`Blueprints`].
pub type BlueprintId = la_arena::Idx<Blueprint>;

/// The owner of every blueprint in the application.
///
/// Blueprints refer to the blueprints mounted under them by [`BlueprintId`],
/// therefore mounting never moves or clones a blueprint: the tree is
/// materialized when it's flattened.
///
/// ```rust
/// use trellis::blueprint::{Blueprint, Blueprints};
///
/// let mut blueprints = Blueprints::new();
/// let api = blueprints.add(Blueprint::new("api"));
/// let users = blueprints.add(Blueprint::new("users"));
/// blueprints.mount(api, users);
///
/// assert_eq!(blueprints[api].mounted(), &[users]);
/// ```
#[derive(Default)]
pub struct Blueprints {
    arena: Arena<Blueprint>,
}

/// The handlers collected by [`Blueprints::flatten`].
///
/// Rules include the prefixes of every blueprint that was mounted along the
/// way, but not the prefix of the flattened blueprint itself: that is added by
/// whoever flattened it.
pub struct FlattenedHandlers {
    routes: Vec<RoutePackage>,
    websockets: Vec<WebSocketPackage>,
}

impl FlattenedHandlers {
    pub fn routes(&self) -> &[RoutePackage] {
        &self.routes
    }

    pub fn websockets(&self) -> &[WebSocketPackage] {
        &self.websockets
    }

    pub fn into_parts(self) -> (Vec<RoutePackage>, Vec<WebSocketPackage>) {
        (self.routes, self.websockets)
    }
}

impl Blueprints {
    pub fn new() -> Self {
        Default::default()
    }

    /// Take ownership of `blueprint`, returning the identifier to refer to it.
    pub fn add(&mut self, blueprint: Blueprint) -> BlueprintId {
        self.arena.alloc(blueprint)
    }

    /// Mount `child` under `parent`.
    ///
    /// See [`Blueprint::mount`] for more details.
    pub fn mount(&mut self, parent: BlueprintId, child: BlueprintId) {
        self.arena[parent].mount(child);
    }

    /// Iterate over all blueprints, in insertion order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = (BlueprintId, &Blueprint)> {
        self.arena.iter()
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// Consume the blueprint identified by `id`, together with every blueprint
    /// mounted (directly or transitively) under it, on behalf of `caller`.
    ///
    /// The handlers of each mounted blueprint are appended, in mount order,
    /// after the blueprint's own handlers, with the mounted blueprint's prefix
    /// prepended to their rules.
    ///
    /// It fails if any blueprint in the subtree has already been consumed.
    /// Blueprints further down are consumed on behalf of a caller chain,
    /// e.g. `caller => parent`, which ends up in the error message when
    /// somebody else tries to consume them later.
    pub fn flatten(
        &mut self,
        id: BlueprintId,
        caller: &str,
    ) -> Result<FlattenedHandlers, WiringError> {
        let mut path = Vec::new();
        self.flatten_node(id, caller, &mut path)
    }

    /// Flatten the blueprint identified by `id` and classify its handlers,
    /// returning the factory that will register them.
    ///
    /// The blueprint itself isn't sealed yet: that happens when the factory
    /// is invoked. The blueprints mounted under it, instead, are consumed
    /// right away.
    pub fn produce_factory(&mut self, id: BlueprintId) -> Result<BlueprintFactory, WiringError> {
        let name = self[id].name().to_owned();
        let _span =
            tracing::debug_span!("Producing blueprint factory", blueprint = %name).entered();

        if let Some(owner) = self[id].sealed_by() {
            return Err(BlueprintAlreadySealed {
                caller: BlueprintFactory::CALLER.to_owned(),
                blueprint: name,
                owner: owner.to_owned(),
            }
            .into());
        }
        let mut path = vec![id];
        self.absorb_mounted(id, &name, &mut path)?;

        let blueprint = &self[id];
        Ok(BlueprintFactory::new(
            id,
            blueprint.name(),
            blueprint.prefix(),
            blueprint.deferred_routes.clone(),
            blueprint.deferred_sockets.clone(),
        ))
    }

    fn flatten_node(
        &mut self,
        id: BlueprintId,
        caller: &str,
        path: &mut Vec<BlueprintId>,
    ) -> Result<FlattenedHandlers, WiringError> {
        let blueprint = &self[id];
        if let Some(owner) = blueprint.sealed_by() {
            return Err(BlueprintAlreadySealed {
                caller: caller.to_owned(),
                blueprint: blueprint.name().to_owned(),
                owner: owner.to_owned(),
            }
            .into());
        }
        let chain = format!("{caller} => {}", blueprint.name());

        path.push(id);
        self.absorb_mounted(id, &chain, path)?;
        path.pop();

        let blueprint = &mut self[id];
        blueprint.seal(caller);
        Ok(FlattenedHandlers {
            routes: std::mem::take(&mut blueprint.deferred_routes),
            websockets: std::mem::take(&mut blueprint.deferred_sockets),
        })
    }

    /// Flatten every blueprint mounted under `id`, on behalf of `chain`, and
    /// append their handlers to `id`'s own.
    ///
    /// `path` holds the blueprints currently being flattened, `id` included.
    fn absorb_mounted(
        &mut self,
        id: BlueprintId,
        chain: &str,
        path: &mut Vec<BlueprintId>,
    ) -> Result<(), WiringError> {
        let mounted = self[id].mounted.clone();
        for child in mounted {
            if let Some(start) = path.iter().position(|&ancestor| ancestor == child) {
                let cycle = path[start..]
                    .iter()
                    .chain(std::iter::once(&child))
                    .map(|&b| self[b].name().to_owned())
                    .collect();
                return Err(CyclicMount {
                    blueprint: self[child].name().to_owned(),
                    cycle,
                }
                .into());
            }

            let (routes, websockets) = self.flatten_node(child, chain, path)?.into_parts();
            let prefix = self[child].prefix().to_owned();
            tracing::debug!(
                parent = %self[id].name(),
                child = %self[child].name(),
                %prefix,
                routes = routes.len(),
                websockets = websockets.len(),
                "Absorbed mounted blueprint"
            );

            let parent = &mut self[id];
            parent
                .deferred_routes
                .extend(routes.into_iter().map(|r| r.prefixed(&prefix)));
            parent
                .deferred_sockets
                .extend(websockets.into_iter().map(|w| w.prefixed(&prefix)));
        }
        Ok(())
    }
}

impl Index<BlueprintId> for Blueprints {
    type Output = Blueprint;

    fn index(&self, id: BlueprintId) -> &Self::Output {
        &self.arena[id]
    }
}

impl IndexMut<BlueprintId> for Blueprints {
    fn index_mut(&mut self, id: BlueprintId) -> &mut Self::Output {
        &mut self.arena[id]
    }
}

#[cfg(test)]
mod tests {
    use super::Blueprints;
    use crate::blueprint::Blueprint;
    use crate::router::GET;
    use crate::transport::{Request, Response, WebSocket};
    use crate::WiringError;

    fn noop(_request: &Request) -> Response {
        Response::default()
    }

    fn socket_noop(_socket: &mut dyn WebSocket) {}

    fn rules(blueprints: &Blueprints, id: super::BlueprintId) -> Vec<String> {
        blueprints[id].routes().iter().map(|r| r.rule().to_owned()).collect()
    }

    #[test]
    fn own_routes_come_first_then_mounted_ones_in_mount_order() {
        let mut blueprints = Blueprints::new();
        let mut root = Blueprint::new("root").url_prefix("/api");
        root.route(GET, "/own", noop);
        let root = blueprints.add(root);
        let mut a = Blueprint::new("a");
        a.route(GET, "/one", noop);
        let a = blueprints.add(a);
        let mut b = Blueprint::new("b").url_prefix("/bee");
        b.route(GET, "/two", noop);
        b.websocket("/ws", socket_noop);
        let b = blueprints.add(b);
        blueprints.mount(root, a);
        blueprints.mount(root, b);

        let flattened = blueprints.flatten(root, "main").unwrap();
        let rules: Vec<_> = flattened.routes().iter().map(|r| r.rule()).collect();
        assert_eq!(rules, ["/own", "/a/one", "/bee/two"]);
        let sockets: Vec<_> = flattened.websockets().iter().map(|r| r.rule()).collect();
        assert_eq!(sockets, ["/bee/ws"]);
    }

    #[test]
    fn flattening_seals_the_whole_subtree() {
        let mut blueprints = Blueprints::new();
        let root = blueprints.add(Blueprint::new("root"));
        let child = blueprints.add(Blueprint::new("child"));
        let grandchild = blueprints.add(Blueprint::new("grandchild"));
        blueprints.mount(root, child);
        blueprints.mount(child, grandchild);

        blueprints.flatten(root, "main").unwrap();

        assert_eq!(blueprints[root].sealed_by(), Some("main"));
        assert_eq!(blueprints[child].sealed_by(), Some("main => root"));
        assert_eq!(blueprints[grandchild].sealed_by(), Some("main => root => child"));
    }

    #[test]
    fn a_blueprint_cannot_be_flattened_twice() {
        let mut blueprints = Blueprints::new();
        let root = blueprints.add(Blueprint::new("root"));
        blueprints.flatten(root, "first").unwrap();

        let err = blueprints.flatten(root, "second").err().unwrap();
        assert!(matches!(err, WiringError::AlreadySealed(_)));
        insta::assert_snapshot!(
            err,
            @"second cannot invoke root because it was already invoked by first"
        );
    }

    #[test]
    fn flattened_handlers_are_moved_out_of_the_blueprint() {
        let mut blueprints = Blueprints::new();
        let mut root = Blueprint::new("root");
        root.route(GET, "/", noop);
        let root = blueprints.add(root);

        let flattened = blueprints.flatten(root, "main").unwrap();
        assert_eq!(flattened.routes().len(), 1);
        assert!(rules(&blueprints, root).is_empty());
    }

    #[test]
    fn self_mount_is_rejected() {
        let mut blueprints = Blueprints::new();
        let root = blueprints.add(Blueprint::new("root"));
        blueprints.mount(root, root);

        let err = blueprints.produce_factory(root).err().unwrap();
        insta::assert_snapshot!(err, @"`root` is mounted under itself: root => root");
    }

    #[test]
    fn transitive_cycles_are_rejected() {
        let mut blueprints = Blueprints::new();
        let root = blueprints.add(Blueprint::new("root"));
        let a = blueprints.add(Blueprint::new("a"));
        let b = blueprints.add(Blueprint::new("b"));
        blueprints.mount(root, a);
        blueprints.mount(a, b);
        blueprints.mount(b, a);

        let err = blueprints.produce_factory(root).err().unwrap();
        insta::assert_snapshot!(err, @"`a` is mounted under itself: a => b => a");
    }

    #[test]
    fn producing_a_factory_consumes_mounted_blueprints_but_not_the_root() {
        let mut blueprints = Blueprints::new();
        let root = blueprints.add(Blueprint::new("root"));
        let mut child = Blueprint::new("child");
        child.route(GET, "/x", noop);
        let child = blueprints.add(child);
        blueprints.mount(root, child);

        blueprints.produce_factory(root).unwrap();

        assert!(!blueprints[root].is_sealed());
        assert_eq!(blueprints[child].sealed_by(), Some("root"));
        assert_eq!(rules(&blueprints, root), ["/child/x"]);
    }
}
