/// The route parameters extracted from the path of an incoming request.
///
/// The server inserts them into the request extensions before invoking the
/// handler:
///
/// ```rust
/// use trellis::response::plain_text;
/// use trellis::transport::{Request, Response};
/// use trellis_server::server::RouteParams;
///
/// // Registered for `/users/{id}`.
/// pub fn get_user(request: &Request) -> Response {
///     let params = request.extensions().get::<RouteParams>().unwrap();
///     plain_text(format!("User {}", params.get("id").unwrap()))
/// }
/// ```
///
/// Values are not percent-decoded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteParams(Vec<(String, String)>);

impl RouteParams {
    /// The value of the first parameter registered under `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&matchit::Params<'_, '_>> for RouteParams {
    fn from(params: &matchit::Params<'_, '_>) -> Self {
        Self(
            params
                .iter()
                .map(|(k, v)| (k.to_owned(), v.to_owned()))
                .collect(),
        )
    }
}
