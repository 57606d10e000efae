//! Binding of argument values into the outgoing request.
//!
//! A [`ContentModelBinder`] is registered per HTTP verb. Every binder first fills
//! the route template with the leading arguments ([`ContentModelBinder::ensure_template`]),
//! then places the remaining ones: in the query string for [`HttpGetContentBinder`],
//! in a JSON body for [`HttpBodyContentBinder`].

use std::fmt::Debug;
use std::sync::Arc;

use http::Method;
use indexmap::IndexMap;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::contract::ParameterDescriptor;
use crate::request::{RequestBody, merge_query};

mod body;
pub use self::body::HttpBodyContentBinder;

mod get;
pub use self::get::HttpGetContentBinder;

mod resolver;
pub use self::resolver::{ModelContentResolver, ModelDictionaryResult};

mod template;

/// Errors raised while binding arguments into a request.
#[derive(Debug, derive_more::Error, derive_more::Display, derive_more::From)]
pub enum BindingError {
    /// Some route placeholders have no usable argument.
    #[display("Path '{template}' is missing required arguments: {missings:?}")]
    #[from(skip)]
    TemplateUnresolved {
        /// The route template being resolved.
        template: String,
        /// Names of the unresolved placeholders.
        missings: Vec<String>,
    },

    /// An argument value cannot be used where it is bound.
    #[display("Unsupported value for parameter '{name}': {message}")]
    #[from(skip)]
    UnsupportedParameterValue {
        name: String,
        message: String,
        value: Value,
    },

    /// No binder is registered for the HTTP verb.
    #[display("No content binder registered for {method}")]
    #[from(skip)]
    UnsupportedMethod { method: Method },

    /// The request body could not be serialized.
    JsonValueError(serde_json::Error),

    /// The query string could not be rebuilt.
    QuerySerializationError(serde_urlencoded::ser::Error),
}

/// Outcome of the route template step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnsureTemplateResult {
    /// Every argument was consumed by the template.
    pub binding_completed: bool,
    /// Number of leading arguments consumed by the template.
    pub parameter_offset: usize,
    /// Exactly one argument remains to be bound.
    pub ignore_model_prefix: bool,
}

/// The state a binder works on.
///
/// Holds the URL being built, starting from the endpoint with its base path and
/// the default query, and the optional body.
#[derive(Debug)]
pub struct ContentModelBindingContext<'a> {
    method: &'a Method,
    template: &'a str,
    parameters: &'a [ParameterDescriptor],
    args: &'a [Value],
    resolver: ModelContentResolver,
    url: Url,
    body: Option<RequestBody>,
}

impl<'a> ContentModelBindingContext<'a> {
    pub fn new(
        method: &'a Method,
        template: &'a str,
        parameters: &'a [ParameterDescriptor],
        args: &'a [Value],
        url: Url,
    ) -> Self {
        Self {
            method,
            template,
            parameters,
            args,
            resolver: ModelContentResolver,
            url,
            body: None,
        }
    }

    pub fn method(&self) -> &'a Method {
        self.method
    }

    /// The route template, contract route included.
    pub fn template(&self) -> &'a str {
        self.template
    }

    pub fn parameters(&self) -> &'a [ParameterDescriptor] {
        self.parameters
    }

    pub fn args(&self) -> &'a [Value] {
        self.args
    }

    pub fn resolver(&self) -> ModelContentResolver {
        self.resolver
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn body(&self) -> Option<&RequestBody> {
        self.body.as_ref()
    }

    /// Merges the dictionary into the URL query.
    ///
    /// Existing keys are replaced in place, new keys appended. Merging the same
    /// dictionary twice leaves the URL unchanged.
    pub fn try_update_uri(
        &mut self,
        dictionary: &IndexMap<String, String>,
    ) -> Result<(), BindingError> {
        for key in dictionary.keys() {
            if self.url.query_pairs().any(|(name, _)| name == key.as_str()) {
                debug!(%key, "query parameter replaced by argument");
            }
        }
        merge_query(&mut self.url, dictionary)?;
        Ok(())
    }

    /// Appends the resolved route to the base path of the URL.
    pub fn set_path(&mut self, route: &str) {
        let base = self.url.path().trim_end_matches('/');
        let route = route.trim_start_matches('/');
        let path = format!("{base}/{route}");
        self.url.set_path(&path);
    }

    pub fn set_body(&mut self, body: RequestBody) {
        self.body = Some(body);
    }

    pub fn into_parts(self) -> (Url, Option<RequestBody>) {
        (self.url, self.body)
    }
}

/// Binds the arguments of one HTTP verb family.
pub trait ContentModelBinder: Debug + Send + Sync {
    /// The HTTP verb this binder handles.
    fn method(&self) -> &Method;

    /// Places every argument of the context into the request.
    ///
    /// # Errors
    ///
    /// Fails if an argument cannot be bound.
    fn bind_content(&self, context: &mut ContentModelBindingContext<'_>)
    -> Result<(), BindingError>;

    /// Fills the route template with the leading arguments and sets the URL path.
    ///
    /// # Errors
    ///
    /// Fails with [`BindingError::TemplateUnresolved`] when a placeholder has no
    /// argument, or the argument is `null`.
    fn ensure_template(
        &self,
        context: &mut ContentModelBindingContext<'_>,
    ) -> Result<EnsureTemplateResult, BindingError> {
        let resolved = template::resolve_template(context.template(), context.args())?;
        context.set_path(&resolved.path);

        let remaining = context.args().len().saturating_sub(resolved.consumed);
        Ok(EnsureTemplateResult {
            binding_completed: remaining == 0,
            parameter_offset: resolved.consumed,
            ignore_model_prefix: remaining == 1,
        })
    }
}

/// Content binders by HTTP verb.
///
/// By default `GET`, `DELETE`, `HEAD` and `OPTIONS` bind into the query string,
/// `POST`, `PUT` and `PATCH` into a JSON body.
#[derive(Debug, Clone)]
pub struct ContentBinders {
    binders: IndexMap<Method, Arc<dyn ContentModelBinder>>,
}

impl Default for ContentBinders {
    fn default() -> Self {
        let mut binders = Self {
            binders: IndexMap::new(),
        };
        for method in [Method::GET, Method::DELETE, Method::HEAD, Method::OPTIONS] {
            binders.register(Arc::new(HttpGetContentBinder::new(method)));
        }
        for method in [Method::POST, Method::PUT, Method::PATCH] {
            binders.register(Arc::new(HttpBodyContentBinder::new(method)));
        }
        binders
    }
}

impl ContentBinders {
    /// Registers a binder, replacing the one bound to the same verb.
    pub fn register(&mut self, binder: Arc<dyn ContentModelBinder>) {
        let method = binder.method().clone();
        if self.binders.insert(method.clone(), binder).is_some() {
            debug!(%method, "content binder replaced");
        }
    }

    pub fn get(&self, method: &Method) -> Option<&Arc<dyn ContentModelBinder>> {
        self.binders.get(method)
    }

    /// Binds the context with the binder of its verb.
    ///
    /// # Errors
    ///
    /// Fails with [`BindingError::UnsupportedMethod`] if no binder handles the verb,
    /// or with the binder error.
    pub fn bind(&self, context: &mut ContentModelBindingContext<'_>) -> Result<(), BindingError> {
        let binder = self
            .get(context.method())
            .ok_or_else(|| BindingError::UnsupportedMethod {
                method: context.method().clone(),
            })?;
        binder.bind_content(context)
    }
}
