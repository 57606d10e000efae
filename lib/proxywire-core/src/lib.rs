//! # Proxywire Core
//!
//! Call the operations of a remote HTTP API as if they were local functions.
//!
//! An [`ApiContract`] declares the operations of the API: their name, HTTP verb,
//! route template and positional parameters. An [`HttpDispatchProxy`] turns each
//! invocation into an HTTP request, sends it and materializes the response into
//! the expected type.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use proxywire_core::{
//!     ApiContract, DefaultProxyManager, HttpDispatchProxy, MethodDescriptor, ProxyContext,
//!     ReturnShape, proxy_args,
//! };
//! # use serde::Deserialize;
//! # #[derive(Deserialize)]
//! # struct User { id: u32, name: String }
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let contract = ApiContract::builder("UserApi")
//!     .with_route("api")
//!     .add_method(MethodDescriptor::get("get_user").with_template("users/{id}").with_param("id"))
//!     .add_method(MethodDescriptor::get("search").with_params(["q", "page"]))
//!     .add_method(
//!         MethodDescriptor::delete("delete_user")
//!             .with_template("users/{id}")
//!             .with_param("id")
//!             .with_return(ReturnShape::Void),
//!     )
//!     .build();
//!
//! let context = ProxyContext::builder(Arc::new(contract))
//!     .with_user_agent("billing-service/2.1")
//!     .build();
//! let manager = DefaultProxyManager::builder()
//!     .with_host("api.example.com")
//!     .build()?;
//! let proxy = HttpDispatchProxy::new(context, Arc::new(manager));
//!
//! // GET http://api.example.com/api/users/42
//! let user: User = proxy.invoke_typed("get_user", proxy_args![42]?).await?;
//!
//! // GET http://api.example.com/api/search?q=abc&page=2
//! let found: Vec<User> = proxy.invoke_typed("search", proxy_args!["abc", 2]?).await?;
//!
//! // DELETE http://api.example.com/api/users/42
//! proxy.invoke("delete_user", proxy_args![user.id]?).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Binding rules
//!
//! - `{name}` placeholders of the route template are filled positionally by the
//!   leading arguments
//! - for `GET`, `DELETE`, `HEAD` and `OPTIONS`, the other arguments go to the
//!   query string; objects are flattened (`filter.name=Ada`), arrays indexed
//!   (`ids[0]=1`) and `null` values omitted
//! - for `POST`, `PUT` and `PATCH`, the other arguments form the JSON body
//!
//! See [`binding`] to plug custom binders.
//!
//! ## Errors
//!
//! Every failure is reported as a [`ProxyError`]. Apart from the reserved
//! [`CONTEXT_ACCESSOR`], failures carry a [`CallContextDetail`] naming the target
//! method, the request and the machine, with the cause available as
//! [`std::error::Error::source`]. A `404 Not Found` answer is an error too, see
//! [`ProxyError::is_not_found`].
//!
//! ## Filters
//!
//! [`RequestFilter`]s registered on the manager run concurrently before each
//! call. They can add headers and query parameters, or abort the call.

pub mod binding;

mod context;
mod contract;
mod descriptor;
mod error;
mod filter;
mod manager;
mod proxy;
mod request;
mod response;
mod transport;

pub use self::binding::{BindingError, ContentBinders, ContentModelBinder};
pub use self::context::{ProxyContext, ProxyContextBuilder};
pub use self::contract::{
    ApiContract, ApiContractBuilder, CONTEXT_ACCESSOR, MethodDescriptor, ParameterDescriptor,
    ReturnShape,
};
pub use self::descriptor::{Arguments, RequestDescriptor};
pub use self::error::{CallContextDetail, InvocationError, ProxyConfigError, ProxyError};
pub use self::filter::{FilterError, FilterOutcome, RequestFilter};
pub use self::manager::{DefaultProxyManager, ProxyManager, ProxyManagerBuilder};
pub use self::proxy::HttpDispatchProxy;
pub use self::request::{RequestBody, RequestContext};
pub use self::response::{ProxyResultExecutor, ResponseContext};
pub use self::transport::{Transport, TransportError};

#[doc(hidden)]
pub mod __private {
    pub use serde_json::{Error as JsonError, to_value};
}
