use std::fmt::Debug;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

use async_trait::async_trait;
use http::header::{ACCEPT_LANGUAGE, HeaderName, HeaderValue, USER_AGENT};
use http::uri::{PathAndQuery, Scheme};
use http::{HeaderMap, Uri};
use indexmap::IndexMap;
use tracing::warn;
use url::Url;

use crate::binding::{BindingError, ContentBinders, ContentModelBinder, ContentModelBindingContext};
use crate::descriptor::RequestDescriptor;
use crate::error::{InvocationError, ProxyConfigError};
use crate::filter::RequestFilter;
use crate::request::{RequestContext, merge_query};
use crate::transport::Transport;

const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");

/// Creates requests and owns the collaborators of the proxy.
#[async_trait]
pub trait ProxyManager: Debug + Send + Sync {
    /// Builds the request context of a descriptor: endpoint, route, query,
    /// headers and bound arguments.
    ///
    /// # Errors
    ///
    /// Fails if the arguments cannot be bound or a header value is invalid.
    async fn create_request(
        &self,
        descriptor: RequestDescriptor,
    ) -> Result<RequestContext, InvocationError>;

    /// Returns `true` if at least one filter is registered.
    fn has_filter(&self) -> bool {
        !self.request_filters().is_empty()
    }

    /// The pre-send filters, in registration order.
    fn request_filters(&self) -> &[Arc<dyn RequestFilter>];

    fn transport(&self) -> &dyn Transport;
}

/// The [`ProxyManager`] built by [`ProxyManagerBuilder`].
#[derive(Debug, Clone)]
pub struct DefaultProxyManager {
    endpoint: Url,
    regions: IndexMap<String, Url>,
    default_headers: HeaderMap,
    filters: Vec<Arc<dyn RequestFilter>>,
    binders: ContentBinders,
    transport: Arc<dyn Transport>,
}

impl DefaultProxyManager {
    pub fn builder() -> ProxyManagerBuilder {
        ProxyManagerBuilder::default()
    }

    /// The endpoint used when the region has no endpoint of its own.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// The endpoint of a region.
    pub fn endpoint_for(&self, region_key: Option<&str>) -> &Url {
        let Some(region) = region_key else {
            return &self.endpoint;
        };
        match self.regions.get(region) {
            Some(endpoint) => endpoint,
            None => {
                warn!(region, endpoint = %self.endpoint, "no endpoint for region, using default");
                &self.endpoint
            }
        }
    }

    fn request_headers(&self, descriptor: &RequestDescriptor) -> Result<HeaderMap, InvocationError> {
        let mut headers = self.default_headers.clone();
        if let Some(user_agent) = descriptor.user_agent() {
            headers.insert(USER_AGENT, HeaderValue::from_str(user_agent)?);
        }
        if let Some(client_ip) = descriptor.client_ip() {
            headers.insert(X_FORWARDED_FOR, HeaderValue::from_str(&client_ip.to_string())?);
        }
        if let Some(culture) = descriptor.culture() {
            headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_str(culture)?);
        }
        Ok(headers)
    }
}

#[async_trait]
impl ProxyManager for DefaultProxyManager {
    async fn create_request(
        &self,
        descriptor: RequestDescriptor,
    ) -> Result<RequestContext, InvocationError> {
        let mut url = self.endpoint_for(descriptor.region_key()).clone();
        merge_query(&mut url, descriptor.query()).map_err(BindingError::from)?;
        let headers = self.request_headers(&descriptor)?;

        let (url, body) = {
            let method = descriptor.method();
            let mut binding = ContentModelBindingContext::new(
                method.verb(),
                descriptor.route_template(),
                method.parameters(),
                descriptor.args().as_slice(),
                url,
            );
            self.binders.bind(&mut binding)?;
            binding.into_parts()
        };

        Ok(RequestContext::new(descriptor, url)
            .with_headers(headers)
            .with_body(body))
    }

    fn request_filters(&self) -> &[Arc<dyn RequestFilter>] {
        &self.filters
    }

    fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }
}

/// Builder for [`DefaultProxyManager`].
///
/// # Default Configuration
///
/// - **Transport**: a default `reqwest::Client`
/// - **Scheme**: HTTP
/// - **Host**: 127.0.0.1
/// - **Port**: 80
/// - **Base path**: None
/// - **Regions**: none, every call uses the default endpoint
/// - **Binders**: query binding for `GET`, `DELETE`, `HEAD`, `OPTIONS`; JSON body
///   for `POST`, `PUT`, `PATCH`
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use http::uri::Scheme;
/// use proxywire_core::DefaultProxyManager;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let client = reqwest::Client::builder()
///     .timeout(Duration::from_secs(5))
///     .build()?;
///
/// let manager = DefaultProxyManager::builder()
///     .with_client(client)
///     .with_scheme(Scheme::HTTPS)
///     .with_host("api.example.com")
///     .with_port(443)
///     .with_base_path("/v1")?
///     .with_region("billing", "https://billing.example.com/v2")?
///     .with_default_header("x-api-version", "2")?
///     .build()?;
///
/// assert_eq!(manager.endpoint().as_str(), "https://api.example.com/v1");
/// assert_eq!(manager.endpoint_for(Some("billing")).host_str(), Some("billing.example.com"));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ProxyManagerBuilder {
    transport: Arc<dyn Transport>,
    scheme: Scheme,
    host: String,
    port: u16,
    base_path: Option<PathAndQuery>,
    regions: IndexMap<String, Url>,
    default_headers: HeaderMap,
    filters: Vec<Arc<dyn RequestFilter>>,
    binders: ContentBinders,
}

impl ProxyManagerBuilder {
    /// Builds the manager.
    ///
    /// # Errors
    ///
    /// Fails if scheme, host, port and base path do not form a valid URL.
    pub fn build(self) -> Result<DefaultProxyManager, ProxyConfigError> {
        let Self {
            transport,
            scheme,
            host,
            port,
            base_path,
            regions,
            default_headers,
            filters,
            binders,
        } = self;

        let builder = Uri::builder()
            .scheme(scheme)
            .authority(format!("{host}:{port}"));
        let builder = if let Some(path) = &base_path {
            builder.path_and_query(path.path())
        } else {
            builder.path_and_query("/")
        };
        let base_uri = builder.build()?;
        let endpoint = parse_endpoint(&base_uri.to_string())?;

        Ok(DefaultProxyManager {
            endpoint,
            regions,
            default_headers,
            filters,
            binders,
            transport,
        })
    }

    /// Uses the given client to send requests.
    ///
    /// Timeouts, TLS and connection pooling are configured on the client.
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.transport = Arc::new(client);
        self
    }

    /// Uses a custom transport to send requests.
    pub fn with_transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Arc::new(transport);
        self
    }

    pub fn with_scheme(mut self, scheme: Scheme) -> Self {
        self.scheme = scheme;
        self
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the path prefix of the default endpoint.
    ///
    /// # Errors
    ///
    /// Fails with [`ProxyConfigError::InvalidBasePath`] if the path is invalid.
    pub fn with_base_path<P>(mut self, base_path: P) -> Result<Self, ProxyConfigError>
    where
        P: TryInto<PathAndQuery>,
        P::Error: Debug + 'static,
    {
        let base_path = base_path
            .try_into()
            .map_err(|err| ProxyConfigError::InvalidBasePath {
                error: format!("{err:?}"),
            })?;
        self.base_path = Some(base_path);
        Ok(self)
    }

    /// Registers the endpoint of a region.
    ///
    /// Contracts with this region key are sent to `endpoint` instead of the
    /// default endpoint.
    ///
    /// # Errors
    ///
    /// Fails if the endpoint is not a valid base URL.
    pub fn with_region(
        mut self,
        region_key: impl Into<String>,
        endpoint: &str,
    ) -> Result<Self, ProxyConfigError> {
        let endpoint = parse_endpoint(endpoint)?;
        self.regions.insert(region_key.into(), endpoint);
        Ok(self)
    }

    /// Adds a header sent with every request.
    ///
    /// # Errors
    ///
    /// Fails if the header name or value is invalid.
    pub fn with_default_header(mut self, name: &str, value: &str) -> Result<Self, ProxyConfigError> {
        let name = HeaderName::from_bytes(name.as_bytes())?;
        let value = HeaderValue::from_str(value)?;
        self.default_headers.insert(name, value);
        Ok(self)
    }

    /// Appends a pre-send filter.
    pub fn add_filter(mut self, filter: impl RequestFilter + 'static) -> Self {
        self.filters.push(Arc::new(filter));
        self
    }

    /// Registers a content binder, replacing the one bound to the same verb.
    pub fn with_binder(mut self, binder: impl ContentModelBinder + 'static) -> Self {
        self.binders.register(Arc::new(binder));
        self
    }
}

impl Default for ProxyManagerBuilder {
    fn default() -> Self {
        Self {
            transport: Arc::new(reqwest::Client::new()),
            scheme: Scheme::HTTP,
            host: IpAddr::V4(Ipv4Addr::LOCALHOST).to_string(),
            port: 80,
            base_path: None,
            regions: IndexMap::new(),
            default_headers: HeaderMap::new(),
            filters: Vec::new(),
            binders: ContentBinders::default(),
        }
    }
}

fn parse_endpoint(endpoint: &str) -> Result<Url, ProxyConfigError> {
    let url = Url::parse(endpoint)?;
    if url.cannot_be_a_base() {
        return Err(ProxyConfigError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
        });
    }
    Ok(url)
}
