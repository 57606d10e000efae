use std::env;
use std::net::IpAddr;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::contract::ApiContract;

type CultureFactory = Arc<dyn Fn() -> Option<String> + Send + Sync>;

/// Process-wide configuration of a proxy instance.
///
/// Built once with [`ProxyContextBuilder`] and shared by every invocation of the
/// proxy; it is never mutated afterwards.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use proxywire_core::{ApiContract, ProxyContext};
///
/// let contract = Arc::new(ApiContract::builder("UserApi").build());
/// let context = ProxyContext::builder(contract)
///     .with_user_agent("billing-service/2.1")
///     .with_query_param("tenant", "acme")
///     .with_culture_factory(|| Some("en-GB".to_string()))
///     .build();
///
/// assert_eq!(context.user_agent(), Some("billing-service/2.1"));
/// assert_eq!(context.culture().as_deref(), Some("en-GB"));
/// ```
#[derive(derive_more::Debug, Clone)]
pub struct ProxyContext {
    contract: Arc<ApiContract>,
    client_ip: Option<IpAddr>,
    user_agent: Option<String>,
    query: IndexMap<String, String>,
    #[debug(skip)]
    culture_factory: Option<CultureFactory>,
    environment_name: String,
}

impl ProxyContext {
    pub fn builder(contract: Arc<ApiContract>) -> ProxyContextBuilder {
        ProxyContextBuilder {
            contract,
            client_ip: None,
            user_agent: None,
            query: IndexMap::new(),
            culture_factory: None,
            environment_name: None,
        }
    }

    /// The API contract the proxy dispatches to.
    pub fn contract(&self) -> &ApiContract {
        &self.contract
    }

    pub fn client_ip(&self) -> Option<IpAddr> {
        self.client_ip
    }

    pub fn user_agent(&self) -> Option<&str> {
        self.user_agent.as_deref()
    }

    /// Query parameters added to every request.
    pub fn query(&self) -> &IndexMap<String, String> {
        &self.query
    }

    /// Asks the culture factory for the current locale.
    pub fn culture(&self) -> Option<String> {
        self.culture_factory.as_ref().and_then(|factory| factory())
    }

    /// Machine name reported in error diagnostics.
    pub fn environment_name(&self) -> &str {
        &self.environment_name
    }
}

/// Builder for [`ProxyContext`].
///
/// # Default Configuration
///
/// - **Client IP**: None
/// - **User agent**: None
/// - **Default query**: empty
/// - **Culture factory**: None
/// - **Environment name**: `HOSTNAME`, then `COMPUTERNAME`, then `"localhost"`
#[derive(derive_more::Debug, Clone)]
pub struct ProxyContextBuilder {
    contract: Arc<ApiContract>,
    client_ip: Option<IpAddr>,
    user_agent: Option<String>,
    query: IndexMap<String, String>,
    #[debug(skip)]
    culture_factory: Option<CultureFactory>,
    environment_name: Option<String>,
}

impl ProxyContextBuilder {
    pub fn build(self) -> ProxyContext {
        let Self {
            contract,
            client_ip,
            user_agent,
            query,
            culture_factory,
            environment_name,
        } = self;

        let environment_name = environment_name.unwrap_or_else(machine_name);

        ProxyContext {
            contract,
            client_ip,
            user_agent,
            query,
            culture_factory,
            environment_name,
        }
    }

    /// Sets the IP address of the caller, forwarded in `X-Forwarded-For`.
    pub fn with_client_ip(mut self, client_ip: IpAddr) -> Self {
        self.client_ip = Some(client_ip);
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Adds a query parameter sent with every request.
    ///
    /// Arguments bound to the same key take precedence.
    pub fn with_query_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    /// Sets the locale provider, queried once per invocation.
    pub fn with_culture_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Option<String> + Send + Sync + 'static,
    {
        self.culture_factory = Some(Arc::new(factory));
        self
    }

    /// Overrides the machine name reported in error diagnostics.
    pub fn with_environment_name(mut self, environment_name: impl Into<String>) -> Self {
        self.environment_name = Some(environment_name.into());
        self
    }
}

fn machine_name() -> String {
    ["HOSTNAME", "COMPUTERNAME"]
        .into_iter()
        .find_map(|key| env::var(key).ok().filter(|name| !name.is_empty()))
        .unwrap_or_else(|| "localhost".to_string())
}
