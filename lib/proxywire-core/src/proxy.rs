use std::panic;
use std::sync::Arc;
use std::thread;

use serde::de::{DeserializeOwned, IgnoredAny};
use tracing::{debug, error};

use crate::contract::{CONTEXT_ACCESSOR, ReturnShape, is_context_accessor};
use crate::context::ProxyContext;
use crate::descriptor::{Arguments, RequestDescriptor};
use crate::error::{CallContextDetail, InvocationError, ProxyError};
use crate::filter::run_filters;
use crate::manager::ProxyManager;
use crate::response::{ProxyResultExecutor, ResponseContext};

type Finish<T, R> = fn(ResponseContext<T>) -> Result<R, InvocationError>;

fn reject_context_accessor(method_name: &str) -> Result<(), ProxyError> {
    if is_context_accessor(method_name) {
        return Err(ProxyError::NotSupported {
            accessor: CONTEXT_ACCESSOR,
        });
    }
    Ok(())
}

/// Dispatches the operations of an API contract as HTTP calls.
///
/// Every call shape goes through the same pipeline: descriptor, request
/// creation and binding, filters, transport, then response execution. Any
/// failure past the accessor check is reported as [`ProxyError::Invocation`]
/// with the diagnostic context of the call.
///
/// The proxy is cheap to clone and can be shared across tasks.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use proxywire_core::{
///     ApiContract, DefaultProxyManager, HttpDispatchProxy, MethodDescriptor, ProxyContext,
///     proxy_args,
/// };
/// use serde::Deserialize;
///
/// #[derive(Debug, Deserialize)]
/// struct User {
///     id: u32,
///     name: String,
/// }
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let contract = ApiContract::builder("UserApi")
///     .with_route("api")
///     .add_method(MethodDescriptor::get("get_user").with_template("users/{id}").with_param("id"))
///     .build();
/// let context = ProxyContext::builder(Arc::new(contract)).build();
/// let manager = DefaultProxyManager::builder().with_port(8080).build()?;
///
/// let proxy = HttpDispatchProxy::new(context, Arc::new(manager));
/// let user: User = proxy.invoke_typed("get_user", proxy_args![42]?).await?;
/// println!("{} is {}", user.id, user.name);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpDispatchProxy {
    context: Arc<ProxyContext>,
    manager: Arc<dyn ProxyManager>,
}

impl HttpDispatchProxy {
    pub fn new(context: ProxyContext, manager: Arc<dyn ProxyManager>) -> Self {
        Self {
            context: Arc::new(context),
            manager,
        }
    }

    pub fn context(&self) -> &ProxyContext {
        &self.context
    }

    pub fn manager(&self) -> &dyn ProxyManager {
        self.manager.as_ref()
    }

    /// Invokes a method and discards its result.
    ///
    /// The response body is read but never deserialized.
    ///
    /// # Errors
    ///
    /// See [`ProxyError`].
    pub async fn invoke(&self, method_name: &str, args: Arguments) -> Result<(), ProxyError> {
        let finish: Finish<IgnoredAny, ()> = |_| Ok(());
        self.internal_invoke(method_name, args, Some(ReturnShape::Void), finish)
            .await
    }

    /// Invokes a method and returns its deserialized result.
    ///
    /// Void methods produce `T` from JSON `null`, use `()` or an `Option`.
    ///
    /// # Errors
    ///
    /// See [`ProxyError`].
    pub async fn invoke_typed<T>(&self, method_name: &str, args: Arguments) -> Result<T, ProxyError>
    where
        T: DeserializeOwned,
    {
        self.internal_invoke(method_name, args, None, ResponseContext::into_typed)
            .await
    }

    /// Invokes a method and returns the whole response context.
    ///
    /// # Errors
    ///
    /// See [`ProxyError`].
    pub async fn invoke_response<T>(
        &self,
        method_name: &str,
        args: Arguments,
    ) -> Result<ResponseContext<T>, ProxyError>
    where
        T: DeserializeOwned,
    {
        self.internal_invoke(method_name, args, None, Ok).await
    }

    /// Blocking variant of [`invoke_typed`](Self::invoke_typed).
    ///
    /// The call runs on a dedicated thread with its own current-thread runtime,
    /// so it can be used outside of any async context. It must not be called
    /// from a single-threaded runtime that also serves the remote endpoint.
    ///
    /// Connections pooled by a `reqwest::Client` are bound to the runtime that
    /// opened them: prefer a dedicated client for blocking calls.
    ///
    /// # Errors
    ///
    /// See [`ProxyError`]. A failure to start the runtime is reported as
    /// [`InvocationError::Runtime`].
    pub fn invoke_blocking<T>(&self, method_name: &str, args: Arguments) -> Result<T, ProxyError>
    where
        T: DeserializeOwned + Send,
    {
        reject_context_accessor(method_name)?;

        thread::scope(|scope| {
            let handle = scope.spawn(move || {
                let runtime = tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .map_err(|err| {
                        let detail =
                            CallContextDetail::new(self.context.environment_name(), method_name);
                        ProxyError::invocation(detail, InvocationError::Runtime(err))
                    })?;
                runtime.block_on(self.invoke_typed(method_name, args))
            });
            handle
                .join()
                .unwrap_or_else(|payload| panic::resume_unwind(payload))
        })
    }

    /// The pipeline shared by every call shape.
    ///
    /// `returns` overrides the return shape declared by the method.
    pub(crate) async fn internal_invoke<T, R>(
        &self,
        method_name: &str,
        args: Arguments,
        returns: Option<ReturnShape>,
        finish: Finish<T, R>,
    ) -> Result<R, ProxyError>
    where
        T: DeserializeOwned,
    {
        reject_context_accessor(method_name)?;

        let mut detail = CallContextDetail::new(self.context.environment_name(), method_name);
        let result = self
            .dispatch(method_name, args, returns, &mut detail)
            .await
            .and_then(finish);

        result.map_err(|source| {
            error!(%detail, error = %source, "proxy invocation failed");
            ProxyError::invocation(detail, source)
        })
    }

    async fn dispatch<T>(
        &self,
        method_name: &str,
        args: Arguments,
        returns: Option<ReturnShape>,
        detail: &mut CallContextDetail,
    ) -> Result<ResponseContext<T>, InvocationError>
    where
        T: DeserializeOwned,
    {
        let contract = self.context.contract();
        let method = contract
            .method(method_name)
            .ok_or_else(|| InvocationError::UnknownMethod {
                contract: contract.name().to_string(),
                method: method_name.to_string(),
            })?;
        let returns = returns.unwrap_or(method.returns());

        let descriptor = RequestDescriptor::build(&self.context, method, args)?;
        let mut context = self.manager.create_request(descriptor).await?;
        detail.record_request(&context);

        if self.manager.has_filter() {
            run_filters(self.manager.request_filters(), &mut context).await?;
            detail.record_request(&context);
        }

        let request = context.to_request();
        debug!(?request, "sending...");
        let response = self.manager.transport().send(request).await?;
        debug!(?response, "...receiving");

        ProxyResultExecutor
            .execute(response, &context, returns)
            .await
    }
}
