use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::try_join_all;
use http::header::{HeaderName, HeaderValue};
use http::HeaderMap;
use indexmap::IndexMap;

use crate::request::RequestContext;

/// Error returned by a [`RequestFilter`].
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Error, derive_more::Display)]
#[display("Request filter '{filter}' failed: {message}")]
pub struct FilterError {
    filter: String,
    message: String,
}

impl FilterError {
    pub fn new(filter: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            filter: filter.into(),
            message: message.into(),
        }
    }

    /// Name of the failing filter.
    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Changes requested by a filter.
///
/// Headers replace any header with the same name, query parameters are merged
/// into the URL query.
#[derive(Debug, Clone, Default)]
pub struct FilterOutcome {
    headers: HeaderMap,
    query: IndexMap<String, String>,
}

impl FilterOutcome {
    /// An outcome that leaves the request untouched.
    pub fn unchanged() -> Self {
        Self::default()
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_query_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn query(&self) -> &IndexMap<String, String> {
        &self.query
    }

    pub fn is_unchanged(&self) -> bool {
        self.headers.is_empty() && self.query.is_empty()
    }

    pub(crate) fn into_parts(self) -> (HeaderMap, IndexMap<String, String>) {
        (self.headers, self.query)
    }
}

/// A pre-send hook on the outgoing request.
///
/// Filters of one invocation run concurrently and all see the same request.
/// Their outcomes are applied once every filter succeeded.
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use http::header::{AUTHORIZATION, HeaderValue};
/// use proxywire_core::{FilterError, FilterOutcome, RequestContext, RequestFilter};
///
/// #[derive(Debug)]
/// struct BearerToken(&'static str);
///
/// #[async_trait]
/// impl RequestFilter for BearerToken {
///     async fn invoke(&self, _context: &RequestContext) -> Result<FilterOutcome, FilterError> {
///         let value = HeaderValue::from_str(&format!("Bearer {}", self.0))
///             .map_err(|err| FilterError::new("bearer", err.to_string()))?;
///         Ok(FilterOutcome::unchanged().with_header(AUTHORIZATION, value))
///     }
/// }
/// ```
#[async_trait]
pub trait RequestFilter: Debug + Send + Sync {
    /// Inspects the request and returns the changes to apply.
    ///
    /// # Errors
    ///
    /// Any error aborts the invocation before the request is sent.
    async fn invoke(&self, context: &RequestContext) -> Result<FilterOutcome, FilterError>;
}

/// Runs every filter against the context, then applies their outcomes in order.
pub(crate) async fn run_filters(
    filters: &[Arc<dyn RequestFilter>],
    context: &mut RequestContext,
) -> Result<(), FilterError> {
    if filters.is_empty() {
        return Ok(());
    }

    let outcomes = {
        let context = &*context;
        try_join_all(filters.iter().map(|filter| filter.invoke(context))).await?
    };

    for outcome in outcomes.into_iter().filter(|it| !it.is_unchanged()) {
        context
            .apply(outcome)
            .map_err(|err| FilterError::new("query", err.to_string()))?;
    }
    Ok(())
}
