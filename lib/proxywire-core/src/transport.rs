//! HTTP transport seam.
//!
//! The proxy never owns connection management: it hands a fully built
//! [`reqwest::Request`] to a [`Transport`] and gets a [`reqwest::Response`] back.
//! Timeouts, TLS, DNS and pooling are configured on the transport itself.

use std::fmt::Debug;

use async_trait::async_trait;

/// Sends prepared requests to the remote API.
///
/// Implemented for [`reqwest::Client`]. Custom implementations are useful to
/// record or stub calls in tests.
///
/// # Example
///
/// ```rust
/// use proxywire_core::{Transport, TransportError};
///
/// #[derive(Debug)]
/// struct AlwaysUnavailable;
///
/// #[async_trait::async_trait]
/// impl Transport for AlwaysUnavailable {
///     async fn send(&self, _request: reqwest::Request) -> Result<reqwest::Response, TransportError> {
///         Err(TransportError::Unavailable {
///             reason: "maintenance".to_string(),
///         })
///     }
/// }
/// ```
#[async_trait]
pub trait Transport: Debug + Send + Sync {
    /// Sends the request and returns the raw response.
    async fn send(&self, request: reqwest::Request) -> Result<reqwest::Response, TransportError>;
}

#[async_trait]
impl Transport for reqwest::Client {
    async fn send(&self, request: reqwest::Request) -> Result<reqwest::Response, TransportError> {
        let response = self.execute(request).await?;
        Ok(response)
    }
}

/// Errors raised by a [`Transport`].
#[derive(Debug, derive_more::Error, derive_more::Display, derive_more::From)]
pub enum TransportError {
    /// HTTP client error from the underlying reqwest library.
    ///
    /// Network failures, timeouts, connection resets.
    ReqwestError(reqwest::Error),

    /// I/O error from a custom transport.
    IoError(std::io::Error),

    /// The transport refused to send the request.
    #[display("Transport unavailable: {reason}")]
    #[from(skip)]
    Unavailable {
        /// Why the transport is unavailable.
        reason: String,
    },
}

impl TransportError {
    /// Returns `true` if the failure is a timeout.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::ReqwestError(error) => error.is_timeout(),
            Self::IoError(error) => error.kind() == std::io::ErrorKind::TimedOut,
            Self::Unavailable { .. } => false,
        }
    }
}
