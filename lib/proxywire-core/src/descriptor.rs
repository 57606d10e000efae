use std::net::IpAddr;

use indexmap::IndexMap;
use serde::Serialize;

use crate::contract::MethodDescriptor;
use crate::context::ProxyContext;
use crate::error::InvocationError;

/// Positional argument values of an invocation.
///
/// Values are serialized to JSON when added, so an `Arguments` instance is always
/// ready to be bound. Use the [`proxy_args!`](crate::proxy_args) macro for the
/// common case.
///
/// # Example
///
/// ```rust
/// use proxywire_core::Arguments;
///
/// # fn main() -> Result<(), serde_json::Error> {
/// let args = Arguments::new().arg(&"abc")?.arg(&2)?;
/// assert_eq!(args.len(), 2);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    values: Vec<serde_json::Value>,
}

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an argument.
    ///
    /// # Errors
    ///
    /// Fails if the value cannot be represented as JSON.
    pub fn arg<T>(mut self, value: &T) -> Result<Self, serde_json::Error>
    where
        T: Serialize + ?Sized,
    {
        self.values.push(serde_json::to_value(value)?);
        Ok(self)
    }

    /// Collects already serialized arguments, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// Returns the first serialization error.
    pub fn try_from_values<I>(values: I) -> Result<Self, serde_json::Error>
    where
        I: IntoIterator<Item = Result<serde_json::Value, serde_json::Error>>,
    {
        let values = values.into_iter().collect::<Result<Vec<_>, _>>()?;
        Ok(Self { values })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_slice(&self) -> &[serde_json::Value] {
        &self.values
    }
}

impl From<Vec<serde_json::Value>> for Arguments {
    fn from(values: Vec<serde_json::Value>) -> Self {
        Self { values }
    }
}

/// Builds [`Arguments`] from a list of serializable expressions.
///
/// Evaluates to `Result<Arguments, serde_json::Error>`.
///
/// # Example
///
/// ```rust
/// use proxywire_core::proxy_args;
///
/// # fn main() -> Result<(), serde_json::Error> {
/// let none = proxy_args![]?;
/// let some = proxy_args!["abc", 2, Some(true)]?;
///
/// assert!(none.is_empty());
/// assert_eq!(some.len(), 3);
/// # Ok(())
/// # }
/// ```
#[macro_export]
macro_rules! proxy_args {
    () => {
        ::core::result::Result::<$crate::Arguments, $crate::__private::JsonError>::Ok(
            $crate::Arguments::new(),
        )
    };
    ($($value:expr),+ $(,)?) => {
        $crate::Arguments::try_from_values([$($crate::__private::to_value(&$value)),+])
    };
}

/// Immutable snapshot of one intended remote call.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    contract: String,
    route_template: String,
    region_key: Option<String>,
    method: MethodDescriptor,
    client_ip: Option<IpAddr>,
    user_agent: Option<String>,
    query: IndexMap<String, String>,
    culture: Option<String>,
    args: Arguments,
}

impl RequestDescriptor {
    /// Assembles the descriptor of a call.
    ///
    /// # Errors
    ///
    /// Fails with [`InvocationError::ArityMismatch`] if the argument count differs
    /// from the declared parameters.
    pub fn build(
        context: &ProxyContext,
        method: &MethodDescriptor,
        args: Arguments,
    ) -> Result<Self, InvocationError> {
        let expected = method.parameters().len();
        if args.len() != expected {
            return Err(InvocationError::ArityMismatch {
                method: method.name().to_string(),
                expected,
                actual: args.len(),
            });
        }

        let contract = context.contract();
        let culture = context.culture();

        Ok(Self {
            contract: contract.name().to_string(),
            route_template: contract.route_template(method),
            region_key: contract.region_key().map(ToString::to_string),
            method: method.clone(),
            client_ip: context.client_ip(),
            user_agent: context.user_agent().map(ToString::to_string),
            query: context.query().clone(),
            culture,
            args,
        })
    }

    /// Name of the target API contract.
    pub fn contract(&self) -> &str {
        &self.contract
    }

    /// The route template of the call, contract route included.
    pub fn route_template(&self) -> &str {
        &self.route_template
    }

    /// Region of the target API contract.
    pub fn region_key(&self) -> Option<&str> {
        self.region_key.as_deref()
    }

    pub fn method(&self) -> &MethodDescriptor {
        &self.method
    }

    pub fn client_ip(&self) -> Option<IpAddr> {
        self.client_ip
    }

    pub fn user_agent(&self) -> Option<&str> {
        self.user_agent.as_deref()
    }

    /// Default query parameters forwarded with every call.
    pub fn query(&self) -> &IndexMap<String, String> {
        &self.query
    }

    /// Locale of the caller, if a culture factory provided one.
    pub fn culture(&self) -> Option<&str> {
        self.culture.as_deref()
    }

    pub fn args(&self) -> &Arguments {
        &self.args
    }
}
