//! Explicit method registry describing a remote API.
//!
//! An [`ApiContract`] lists the operations a proxy can dispatch. Each operation is
//! a [`MethodDescriptor`]: its name, HTTP verb, route template and positional
//! parameters. The registry is built once, usually next to the trait it backs.

use std::sync::Arc;

use http::Method;
use indexmap::IndexMap;

/// Name of the reserved context accessor.
///
/// Invoking a method with this name through a proxy always fails with
/// [`ProxyError::NotSupported`](crate::ProxyError::NotSupported).
pub const CONTEXT_ACCESSOR: &str = "controller_context";

pub(crate) fn is_context_accessor(method_name: &str) -> bool {
    method_name == CONTEXT_ACCESSOR
}

/// Whether the method produces a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReturnShape {
    /// The method returns nothing, the response body is ignored.
    Void,
    /// The response body is deserialized into the return type.
    #[default]
    Value,
}

/// A positional parameter of a [`MethodDescriptor`].
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
#[display("{name}")]
pub struct ParameterDescriptor {
    name: String,
}

impl ParameterDescriptor {
    /// Creates a parameter with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self { name }
    }

    /// The parameter name, used as query key or body field.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Metadata of one operation of an API contract.
///
/// # Example
///
/// ```rust
/// use proxywire_core::{MethodDescriptor, ReturnShape};
///
/// let get_user = MethodDescriptor::get("get_user")
///     .with_template("users/{id}")
///     .with_param("id");
///
/// let delete_user = MethodDescriptor::delete("delete_user")
///     .with_template("users/{id}")
///     .with_param("id")
///     .with_return(ReturnShape::Void);
///
/// assert_eq!(get_user.template(), "users/{id}");
/// assert_eq!(delete_user.parameters().len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDescriptor {
    name: String,
    verb: Method,
    template: Option<String>,
    parameters: Vec<ParameterDescriptor>,
    returns: ReturnShape,
}

impl MethodDescriptor {
    /// Creates a method descriptor for the given HTTP verb.
    pub fn new(name: impl Into<String>, verb: Method) -> Self {
        Self {
            name: name.into(),
            verb,
            template: None,
            parameters: Vec::new(),
            returns: ReturnShape::default(),
        }
    }

    pub fn get(name: impl Into<String>) -> Self {
        Self::new(name, Method::GET)
    }

    pub fn post(name: impl Into<String>) -> Self {
        Self::new(name, Method::POST)
    }

    pub fn put(name: impl Into<String>) -> Self {
        Self::new(name, Method::PUT)
    }

    pub fn patch(name: impl Into<String>) -> Self {
        Self::new(name, Method::PATCH)
    }

    pub fn delete(name: impl Into<String>) -> Self {
        Self::new(name, Method::DELETE)
    }

    /// Sets the route template, relative to the contract route.
    ///
    /// Placeholders use the `{name}` syntax and are filled positionally by the
    /// leading arguments.
    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    /// Appends a positional parameter.
    pub fn with_param(mut self, name: impl Into<String>) -> Self {
        self.parameters.push(ParameterDescriptor::new(name));
        self
    }

    /// Appends several positional parameters.
    pub fn with_params<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parameters
            .extend(names.into_iter().map(ParameterDescriptor::new));
        self
    }

    pub fn with_return(mut self, returns: ReturnShape) -> Self {
        self.returns = returns;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn verb(&self) -> &Method {
        &self.verb
    }

    /// The route template, defaulting to the method name.
    pub fn template(&self) -> &str {
        self.template.as_deref().unwrap_or(&self.name)
    }

    pub fn parameters(&self) -> &[ParameterDescriptor] {
        &self.parameters
    }

    pub fn returns(&self) -> ReturnShape {
        self.returns
    }
}

/// A remote API: a route prefix, an optional region and its operations.
///
/// # Example
///
/// ```rust
/// use proxywire_core::{ApiContract, MethodDescriptor};
///
/// let contract = ApiContract::builder("UserApi")
///     .with_route("api")
///     .with_region_key("users")
///     .add_method(MethodDescriptor::get("get_user").with_template("users/{id}").with_param("id"))
///     .add_method(MethodDescriptor::get("search").with_params(["q", "page"]))
///     .build();
///
/// let get_user = contract.method("get_user").expect("registered");
/// assert_eq!(contract.route_template(get_user), "api/users/{id}");
/// ```
#[derive(Debug, Clone)]
pub struct ApiContract {
    name: String,
    route: String,
    region_key: Option<String>,
    methods: IndexMap<String, Arc<MethodDescriptor>>,
}

impl ApiContract {
    pub fn builder(name: impl Into<String>) -> ApiContractBuilder {
        ApiContractBuilder {
            name: name.into(),
            route: String::new(),
            region_key: None,
            methods: IndexMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn route(&self) -> &str {
        &self.route
    }

    pub fn region_key(&self) -> Option<&str> {
        self.region_key.as_deref()
    }

    /// Looks up an operation by name.
    pub fn method(&self, name: &str) -> Option<&Arc<MethodDescriptor>> {
        self.methods.get(name)
    }

    /// Iterates over the operations in registration order.
    pub fn methods(&self) -> impl Iterator<Item = &MethodDescriptor> {
        self.methods.values().map(AsRef::as_ref)
    }

    /// Joins the contract route and the method template.
    pub fn route_template(&self, method: &MethodDescriptor) -> String {
        let route = self.route.trim_matches('/');
        let template = method.template().trim_start_matches('/');
        match (route.is_empty(), template.is_empty()) {
            (true, _) => template.to_string(),
            (false, true) => route.to_string(),
            (false, false) => format!("{route}/{template}"),
        }
    }
}

/// Builder for [`ApiContract`].
#[derive(Debug, Clone)]
pub struct ApiContractBuilder {
    name: String,
    route: String,
    region_key: Option<String>,
    methods: IndexMap<String, Arc<MethodDescriptor>>,
}

impl ApiContractBuilder {
    /// Sets the route prefix shared by every operation.
    pub fn with_route(mut self, route: impl Into<String>) -> Self {
        self.route = route.into();
        self
    }

    /// Sets the region used to pick the endpoint of the remote API.
    pub fn with_region_key(mut self, region_key: impl Into<String>) -> Self {
        self.region_key = Some(region_key.into());
        self
    }

    /// Registers an operation, replacing any operation with the same name.
    pub fn add_method(mut self, method: MethodDescriptor) -> Self {
        self.methods
            .insert(method.name().to_string(), Arc::new(method));
        self
    }

    pub fn build(self) -> ApiContract {
        let Self {
            name,
            route,
            region_key,
            methods,
        } = self;
        ApiContract {
            name,
            route,
            region_key,
            methods,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_default_template_to_method_name() {
        let method = MethodDescriptor::get("Ping");

        assert_eq!(method.template(), "Ping");
        assert_eq!(method.verb(), Method::GET);
        assert_eq!(method.returns(), ReturnShape::Value);
    }

    #[test]
    fn should_detect_context_accessor() {
        assert!(is_context_accessor(CONTEXT_ACCESSOR));
        assert!(!is_context_accessor("controller"));
    }

    #[test]
    fn should_join_route_and_template() {
        let contract = ApiContract::builder("UserApi")
            .with_route("/api/v1/")
            .add_method(MethodDescriptor::get("get_user").with_template("/users/{id}"))
            .add_method(MethodDescriptor::get("list").with_template(""))
            .build();

        let get_user = contract.method("get_user").expect("registered");
        let list = contract.method("list").expect("registered");

        assert_eq!(contract.route_template(get_user), "api/v1/users/{id}");
        assert_eq!(contract.route_template(list), "api/v1");
    }

    #[test]
    fn should_use_template_alone_without_route() {
        let contract = ApiContract::builder("SearchApi")
            .add_method(MethodDescriptor::get("search").with_template("/search"))
            .build();

        let search = contract.method("search").expect("registered");
        assert_eq!(contract.route_template(search), "search");
    }

    #[test]
    fn should_keep_registration_order() {
        let contract = ApiContract::builder("Api")
            .add_method(MethodDescriptor::get("b"))
            .add_method(MethodDescriptor::post("a"))
            .add_method(MethodDescriptor::get("b").with_param("id"))
            .build();

        let names: Vec<_> = contract.methods().map(MethodDescriptor::name).collect();
        assert_eq!(names, ["b", "a"]);
        assert_eq!(contract.method("b").map(|it| it.parameters().len()), Some(1));
    }
}
