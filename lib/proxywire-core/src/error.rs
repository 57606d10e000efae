use std::fmt::{self, Display};

use http::Method;

use crate::binding::BindingError;
use crate::filter::FilterError;
use crate::request::RequestContext;
use crate::transport::TransportError;

/// Errors returned by the proxy facade.
///
/// Callers only ever see this type: every failure happening at or after the
/// descriptor creation is wrapped once into [`ProxyError::Invocation`], with the
/// original cause available through [`std::error::Error::source`].
#[derive(Debug, derive_more::Error, derive_more::Display)]
pub enum ProxyError {
    /// The invoked accessor is reserved for in-process context access.
    ///
    /// Raised before any descriptor, filter or transport activity.
    #[display("\"{accessor}\" is not supported for proxy instance")]
    NotSupported {
        /// Name of the rejected accessor.
        accessor: &'static str,
    },

    /// The remote invocation failed.
    ///
    /// Covers binding, filter, transport, status and deserialization failures,
    /// and the `404 Not Found` case.
    #[display("{detail}")]
    Invocation {
        /// Diagnostic context of the failed call.
        detail: Box<CallContextDetail>,
        /// The underlying failure.
        source: InvocationError,
    },
}

impl ProxyError {
    pub(crate) fn invocation(detail: CallContextDetail, source: InvocationError) -> Self {
        Self::Invocation {
            detail: Box::new(detail),
            source,
        }
    }

    /// Diagnostic context of the failed call, if the call went past the facade checks.
    pub fn detail(&self) -> Option<&CallContextDetail> {
        match self {
            Self::NotSupported { .. } => None,
            Self::Invocation { detail, .. } => Some(detail),
        }
    }

    /// The wrapped cause, if any.
    pub fn cause(&self) -> Option<&InvocationError> {
        match self {
            Self::NotSupported { .. } => None,
            Self::Invocation { source, .. } => Some(source),
        }
    }

    /// Returns `true` if the remote API answered `404 Not Found`.
    pub fn is_not_found(&self) -> bool {
        matches!(self.cause(), Some(InvocationError::NotFound { .. }))
    }
}

/// The failures an invocation can run into, wrapped by [`ProxyError::Invocation`].
#[derive(Debug, derive_more::Error, derive_more::Display, derive_more::From)]
pub enum InvocationError {
    /// The arguments do not match the declared parameters of the method.
    #[display("Method '{method}' expects {expected} argument(s), got {actual}")]
    #[from(skip)]
    ArityMismatch {
        /// The invoked method.
        method: String,
        /// Number of declared parameters.
        expected: usize,
        /// Number of supplied arguments.
        actual: usize,
    },

    /// The contract declares no method with this name.
    #[display("Method '{method}' is not declared by contract '{contract}'")]
    #[from(skip)]
    UnknownMethod {
        /// Name of the API contract.
        contract: String,
        /// The invoked method.
        method: String,
    },

    /// Arguments could not be bound into the request.
    Binding(BindingError),

    /// A pre-send filter rejected the request.
    Filter(FilterError),

    /// The transport failed to deliver the request.
    Transport(TransportError),

    /// The response body could not be read.
    ReadBody(reqwest::Error),

    /// A header value contains invalid characters.
    InvalidHeaderValue(http::header::InvalidHeaderValue),

    /// The dedicated runtime of a blocking call could not be started.
    Runtime(std::io::Error),

    /// The remote API answered `404 Not Found`.
    #[display("Request error: {method} {url} responded 404 Not Found")]
    #[from(skip)]
    NotFound {
        /// The HTTP method of the request.
        method: Method,
        /// The requested URL.
        url: String,
    },

    /// The remote API answered with a non-success status code.
    #[display("Unexpected status code {status_code}: {body}")]
    #[from(skip)]
    UnexpectedStatusCode {
        /// The received status code.
        status_code: u16,
        /// The (truncated) response body.
        body: String,
    },

    /// The response body could not be deserialized into the expected type.
    #[display("Failed to deserialize JSON at '{path}': {error}\n{body}")]
    #[from(skip)]
    JsonError {
        /// Location of the failure inside the JSON document.
        path: String,
        /// The underlying JSON error.
        #[error(source)]
        error: serde_json::Error,
        /// The (truncated) response body.
        body: String,
    },
}

/// Errors raised while configuring a proxy.
#[derive(Debug, derive_more::Error, derive_more::Display, derive_more::From)]
pub enum ProxyConfigError {
    /// The endpoint URI could not be built.
    HttpError(http::Error),

    /// An endpoint URL could not be parsed.
    InvalidUrl(url::ParseError),

    /// An endpoint URL has no path to append routes to.
    #[display("Endpoint '{endpoint}' cannot be used as a base URL")]
    #[from(skip)]
    InvalidEndpoint {
        /// The rejected endpoint.
        endpoint: String,
    },

    /// A default header name is invalid.
    InvalidHeaderName(http::header::InvalidHeaderName),

    /// A default header value is invalid.
    InvalidHeaderValue(http::header::InvalidHeaderValue),

    /// Invalid base path configuration.
    #[display("Invalid base path: {error}")]
    #[from(skip)]
    InvalidBasePath {
        /// Description of why the base path is invalid.
        error: String,
    },
}

/// Diagnostic context attached to every [`ProxyError::Invocation`].
///
/// Request related fields are `None` when the failure happened before the request
/// context was created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallContextDetail {
    /// Name of the machine running the proxy.
    pub environment_name: String,
    /// Human readable summary naming the target method.
    pub message: String,
    /// HTTP method of the request.
    pub method: Option<Method>,
    /// Authority (`host:port`) of the request URL.
    pub authority: Option<String>,
    /// Path of the request URL.
    pub local_path: Option<String>,
    /// Region key of the request context.
    pub request_region: Option<String>,
}

impl CallContextDetail {
    pub(crate) fn new(environment_name: &str, target_method: &str) -> Self {
        Self {
            environment_name: environment_name.to_string(),
            message: format!(
                "Proxy call from Sandbox: {environment_name} to API method: {target_method}"
            ),
            method: None,
            authority: None,
            local_path: None,
            request_region: None,
        }
    }

    /// Records the request fields once the request context exists.
    pub(crate) fn record_request(&mut self, context: &RequestContext) {
        let url = context.url();
        self.method = Some(context.method().clone());
        self.authority = url.host_str().map(|host| match url.port_or_known_default() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        });
        self.local_path = Some(url.path().to_string());
        self.request_region = context.region_key().map(ToString::to_string);
    }
}

impl Display for CallContextDetail {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "{}", self.message)?;
        write!(fmt, "\nEnvironmentName: {}", self.environment_name)?;
        if let Some(method) = &self.method {
            write!(fmt, "\nMethod: {method}")?;
        }
        if let Some(authority) = &self.authority {
            write!(fmt, "\nAuthority: {authority}")?;
        }
        if let Some(local_path) = &self.local_path {
            write!(fmt, "\nLocalPath: {local_path}")?;
        }
        if let Some(region) = &self.request_region {
            write!(fmt, "\nRequestRegion: {region}")?;
        }
        Ok(())
    }
}
