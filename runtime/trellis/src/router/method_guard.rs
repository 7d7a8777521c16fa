use http::Method;

/// Match incoming requests based on their HTTP method.
///
/// Used by [`Blueprint::route`] to specify which HTTP methods the route should match.
///
/// If you want to match **any** HTTP method, use [`ANY`].
/// If you want to match a single HTTP method, use the dedicated constants in this
/// module ([`GET`], [`POST`], [`PATCH`], [`DELETE`], etc.).
/// If you want to match a list of HTTP methods, use [`MethodGuard::new`].
///
/// [`Blueprint::route`]: crate::blueprint::Blueprint::route
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodGuard {
    allowed_methods: AllowedMethods,
}

impl MethodGuard {
    /// Build a new [`MethodGuard`] that matches the specified list of HTTP methods.
    ///
    /// ```rust
    /// use trellis::router::MethodGuard;
    /// use http::Method;
    ///
    /// // Using an array of methods known at compile-time..
    /// let guard = MethodGuard::new([Method::GET, Method::POST]);
    /// // ..or a dynamic vector, built at runtime.
    /// let guard = MethodGuard::new(vec![Method::GET, Method::PUT]);
    /// ```
    ///
    /// Duplicates are ignored.
    pub fn new(allowed_methods: impl IntoIterator<Item = Method>) -> Self {
        let mut methods: Vec<Method> = Vec::new();
        for method in allowed_methods {
            if !methods.contains(&method) {
                methods.push(method);
            }
        }
        Self {
            allowed_methods: AllowedMethods::Multiple(methods),
        }
    }

    /// Returns `true` if a request using `method` should be routed to the guarded handler.
    pub fn allows(&self, method: &Method) -> bool {
        match &self.allowed_methods {
            AllowedMethods::All => true,
            AllowedMethods::Single(m) => m == method,
            AllowedMethods::Multiple(methods) => methods.contains(method),
        }
    }

    /// The methods matched by this guard.
    ///
    /// It returns `None` if the guard matches any method.
    pub fn allowed_methods(&self) -> Option<Vec<Method>> {
        match &self.allowed_methods {
            AllowedMethods::All => None,
            AllowedMethods::Single(m) => Some(vec![m.clone()]),
            AllowedMethods::Multiple(methods) => Some(methods.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum AllowedMethods {
    All,
    Single(Method),
    Multiple(Vec<Method>),
}

/// Matches every request, whatever its HTTP method.
pub const ANY: MethodGuard = MethodGuard {
    allowed_methods: AllowedMethods::All,
};

macro_rules! single_method_guards {
    ($($method:ident),+ $(,)?) => {
        $(
            #[doc = concat!("Matches `", stringify!($method), "` requests.")]
            pub const $method: MethodGuard = MethodGuard {
                allowed_methods: AllowedMethods::Single(Method::$method),
            };
        )+
    };
}

single_method_guards!(GET, POST, PATCH, OPTIONS, PUT, DELETE, TRACE, HEAD, CONNECT);
