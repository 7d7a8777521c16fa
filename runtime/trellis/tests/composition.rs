use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use trellis::WiringError;
use trellis::blueprint::{Blueprint, BlueprintId, Blueprints};
use trellis::dependency::ResolvedValues;
use trellis::response::plain_text;
use trellis::router::{GET, POST, RouteOptions, Router, WebSocketOptions};
use trellis::transport::{Request, RequestHandler, Response, WebSocket, WebSocketHandler};

/// A router that only remembers what was registered against it.
#[derive(Default)]
struct MockRouter {
    routes: Vec<(String, RouteOptions, RequestHandler)>,
    websockets: Vec<(String, WebSocketOptions)>,
}

impl MockRouter {
    fn rules(&self) -> Vec<&str> {
        self.routes.iter().map(|(rule, ..)| rule.as_str()).collect()
    }

    fn call(&self, rule: &str) -> String {
        let (.., handler) = self
            .routes
            .iter()
            .find(|(r, ..)| r == rule)
            .unwrap_or_else(|| panic!("No route registered for {rule}"));
        let response = handler(&Request::default());
        String::from_utf8(response.into_body().to_vec()).unwrap()
    }
}

impl Router for MockRouter {
    fn add_route(&mut self, handler: RequestHandler, rule: &str, options: &RouteOptions) {
        self.routes.push((rule.to_owned(), options.clone(), handler));
    }

    fn add_websocket_route(
        &mut self,
        _handler: WebSocketHandler,
        rule: &str,
        options: &WebSocketOptions,
    ) {
        self.websockets.push((rule.to_owned(), options.clone()));
    }
}

fn alpha(_request: &Request) -> Response {
    plain_text("alpha")
}

fn beta(_request: &Request) -> Response {
    plain_text("beta")
}

fn gamma(_request: &Request) -> Response {
    plain_text("gamma")
}

fn wire(blueprints: &mut Blueprints, root: BlueprintId) -> Result<MockRouter, WiringError> {
    let factory = blueprints.produce_factory(root)?;
    let mut router = MockRouter::default();
    factory.invoke(blueprints, &mut router, &ResolvedValues::new())?;
    Ok(router)
}

#[test]
fn prefixes_compose_along_the_mount_chain() {
    let mut blueprints = Blueprints::new();
    let root = blueprints.add(Blueprint::new("api"));
    let mut x = Blueprint::new("x");
    x.route(GET, "/gamma", gamma);
    let x = blueprints.add(x);
    let mut y = Blueprint::new("y");
    y.route(GET, "/beta", beta);
    let y = blueprints.add(y);
    let mut z = Blueprint::new("z");
    z.route(GET, "/alpha", alpha);
    let z = blueprints.add(z);
    blueprints.mount(y, z);
    blueprints.mount(x, y);
    blueprints.mount(root, x);

    let router = wire(&mut blueprints, root).unwrap();

    assert_eq!(
        router.rules(),
        ["/api/x/gamma", "/api/x/y/beta", "/api/x/y/z/alpha"]
    );
    assert_eq!(router.call("/api/x/y/z/alpha"), "alpha");
}

#[test]
fn prefixes_are_concatenated_verbatim() {
    let mut blueprints = Blueprints::new();
    let root = blueprints.add(Blueprint::new("root").url_prefix("/v1/"));
    let mut child = Blueprint::new("child").url_prefix("users");
    child.route(GET, "/", alpha);
    let child = blueprints.add(child);
    blueprints.mount(root, child);

    let router = wire(&mut blueprints, root).unwrap();

    assert_eq!(router.rules(), ["/v1/users/"]);
}

#[test]
fn an_empty_prefix_falls_back_to_the_name() {
    let bp = Blueprint::new("mounted_away").url_prefix("");
    assert_eq!(bp.prefix(), "/mounted_away");
}

#[test]
fn route_options_reach_the_router() {
    let mut blueprints = Blueprints::new();
    let mut bp = Blueprint::new("api");
    bp.route(POST, "/items", alpha)
        .name("create-item")
        .exclude_from_schema();
    bp.websocket("/feed", |_socket: &mut dyn WebSocket| {}).name("feed");
    let root = blueprints.add(bp);

    let router = wire(&mut blueprints, root).unwrap();

    let (rule, options, _) = &router.routes[0];
    assert_eq!(rule, "/api/items");
    assert_eq!(options.method_guard, POST);
    assert_eq!(options.name.as_deref(), Some("create-item"));
    assert!(!options.include_in_schema);
    assert_eq!(
        router.websockets,
        [("/api/feed".to_string(), WebSocketOptions { name: Some("feed".into()) })]
    );
}

#[test]
fn mounting_a_blueprint_in_two_places_fails() {
    let mut blueprints = Blueprints::new();
    let root = blueprints.add(Blueprint::new("root"));
    let v = blueprints.add(Blueprint::new("v"));
    let a = blueprints.add(Blueprint::new("a"));
    let b = blueprints.add(Blueprint::new("b"));
    blueprints.mount(a, b);
    blueprints.mount(v, a);
    blueprints.mount(root, v);
    blueprints.mount(root, b);

    let err = wire(&mut blueprints, root).err().unwrap();

    insta::assert_snapshot!(

        err,

        @"root cannot invoke b because it was already invoked by root => v => a"

    );
}

#[test]
fn the_error_names_both_mount_chains() {
    let mut blueprints = Blueprints::new();
    let names = ["root", "v", "a", "b", "c", "x", "y", "z"];
    let [root, v, a, b, c, x, y, z] = names.map(|name| blueprints.add(Blueprint::new(name)));
    blueprints.mount(b, c);
    blueprints.mount(a, b);
    blueprints.mount(v, a);
    blueprints.mount(root, v);
    blueprints.mount(y, z);
    blueprints.mount(x, y);
    blueprints.mount(c, z);
    blueprints.mount(root, x);

    let err = wire(&mut blueprints, root).err().unwrap();

    let WiringError::AlreadySealed(e) = &err else {
        panic!("Expected an `AlreadySealed` error, got {err:?}");
    };
    assert_eq!(e.caller, "root => x => y");
    assert_eq!(e.blueprint, "z");
    assert_eq!(e.owner, "root => v => a => b => c");
    insta::assert_snapshot!(
        err,
        @"root => x => y cannot invoke z because it was already invoked by root => v => a => b => c"
    );
}

#[test]
fn a_mounted_blueprint_cannot_be_wired_on_its_own() {
    let mut blueprints = Blueprints::new();
    let away = blueprints.add(Blueprint::new("other").url_prefix("/away"));
    let home = blueprints.add(Blueprint::new("home"));
    blueprints.mount(away, home);

    wire(&mut blueprints, away).unwrap();
    let err = wire(&mut blueprints, home).err().unwrap();

    insta::assert_snapshot!(

        err,

        @"factory cannot invoke home because it was already invoked by other"

    );
}

#[derive(Default)]
struct Counter(AtomicI64);

impl Counter {
    fn incr(&self) -> i64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn decr(&self) -> i64 {
        self.0.fetch_sub(1, Ordering::SeqCst) - 1
    }
}

struct Home {
    counter: Arc<Counter>,
}

impl Home {
    fn new(counter: Arc<Counter>) -> Self {
        Self { counter }
    }

    fn go_up(&self, _request: &Request) -> Response {
        plain_text(self.counter.incr().to_string())
    }
}

struct Away {
    counter: Arc<Counter>,
}

impl Away {
    fn new(counter: Arc<Counter>) -> Self {
        Self { counter }
    }

    fn go_down(&self, _request: &Request) -> Response {
        plain_text(self.counter.decr().to_string())
    }
}

#[test]
fn components_share_the_supplied_dependency() {
    let mut blueprints = Blueprints::new();
    let root = blueprints.add(Blueprint::new("root").url_prefix("/app"));
    let mut home = Blueprint::new("home");
    home.component(Home::new).route(GET, "/go-up", Home::go_up);
    let home = blueprints.add(home);
    let mut away = Blueprint::new("other").url_prefix("/away");
    away.component(Away::new).route(GET, "/go-down", Away::go_down);
    let away = blueprints.add(away);
    blueprints.mount(root, home);
    blueprints.mount(root, away);

    let factory = blueprints.produce_factory(root).unwrap();
    let keys: Vec<_> = factory.dependency_keys().map(|(k, _)| k.clone()).collect();
    assert_eq!(keys.len(), 1);

    let mut values = ResolvedValues::new();
    values.insert(keys[0].clone(), Arc::new(Counter::default()));
    let mut router = MockRouter::default();
    factory.invoke(&mut blueprints, &mut router, &values).unwrap();

    assert_eq!(router.call("/app/home/go-up"), "1");
    assert_eq!(router.call("/app/away/go-down"), "0");
    assert_eq!(router.call("/app/away/go-down"), "-1");
    assert_eq!(router.call("/app/home/go-up"), "0");
}
