#![allow(dead_code, clippy::missing_errors_doc)]
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::info;

use proxywire_core::{
    ApiContract, DefaultProxyManager, HttpDispatchProxy, MethodDescriptor, ProxyContext,
    ProxyManagerBuilder, ReturnShape,
};

use super::router;

/// An in-process server on an ephemeral port.
#[derive(Debug)]
pub struct TestApp {
    addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl TestApp {
    pub async fn start() -> anyhow::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .context("binding test listener")?;
        let addr = listener.local_addr()?;
        info!(%addr, "launching server");

        let handle = tokio::spawn(async move {
            if let Err(error) = axum::serve(listener, router()).await {
                tracing::error!(?error, "test server stopped");
            }
        });

        Ok(Self { addr, handle })
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// A manager builder targeting the test server.
    pub fn manager(&self) -> ProxyManagerBuilder {
        DefaultProxyManager::builder().with_port(self.port())
    }

    pub fn proxy(&self, context: ProxyContext) -> anyhow::Result<HttpDispatchProxy> {
        self.proxy_with(context, |builder| builder)
    }

    pub fn proxy_with(
        &self,
        context: ProxyContext,
        configure: impl FnOnce(ProxyManagerBuilder) -> ProxyManagerBuilder,
    ) -> anyhow::Result<HttpDispatchProxy> {
        let manager = configure(self.manager()).build()?;
        Ok(HttpDispatchProxy::new(context, Arc::new(manager)))
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// The contract of the test server.
pub fn user_contract() -> Arc<ApiContract> {
    let contract = ApiContract::builder("UserApi")
        .with_route("api")
        .with_region_key("users")
        .add_method(
            MethodDescriptor::get("get_user")
                .with_template("users/{id}")
                .with_param("id"),
        )
        .add_method(
            MethodDescriptor::get("list_users")
                .with_template("users")
                .with_param("filter"),
        )
        .add_method(
            MethodDescriptor::post("create_user")
                .with_template("users")
                .with_param("user"),
        )
        .add_method(
            MethodDescriptor::delete("delete_user")
                .with_template("users/{id}")
                .with_param("id")
                .with_return(ReturnShape::Void),
        )
        .add_method(MethodDescriptor::get("search").with_params(["q", "page"]))
        .add_method(MethodDescriptor::get("headers"))
        .add_method(MethodDescriptor::get("slow"))
        .add_method(MethodDescriptor::get("broken"))
        .build();
    Arc::new(contract)
}
