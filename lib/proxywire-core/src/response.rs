use http::{HeaderMap, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::contract::ReturnShape;
use crate::error::InvocationError;
use crate::request::RequestContext;

const BODY_MAX_LENGTH: usize = 1024;

/// The materialized response of one invocation.
///
/// The response body has been fully read when the context is created.
#[derive(Debug, Clone)]
pub struct ResponseContext<T> {
    status: StatusCode,
    headers: HeaderMap,
    url: Url,
    value: Option<T>,
}

impl<T> ResponseContext<T> {
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Final URL of the response, after redirects.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The deserialized value, `None` for void methods.
    pub fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub fn into_value(self) -> Option<T> {
        self.value
    }
}

impl<T> ResponseContext<T>
where
    T: DeserializeOwned,
{
    /// The deserialized value, or `T` read from JSON `null` for void methods.
    pub(crate) fn into_typed(self) -> Result<T, InvocationError> {
        match self.value {
            Some(value) => Ok(value),
            None => deserialize_json("null"),
        }
    }
}

/// Turns transport responses into [`ResponseContext`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProxyResultExecutor;

impl ProxyResultExecutor {
    /// Checks the status and reads the body of the response.
    ///
    /// The body is always read to the end, whatever the outcome.
    ///
    /// # Errors
    ///
    /// - [`InvocationError::NotFound`] for a `404 Not Found`
    /// - [`InvocationError::UnexpectedStatusCode`] for any other non-success status
    /// - [`InvocationError::JsonError`] if the body does not match `T`
    pub async fn execute<T>(
        &self,
        response: reqwest::Response,
        context: &RequestContext,
        returns: ReturnShape,
    ) -> Result<ResponseContext<T>, InvocationError>
    where
        T: DeserializeOwned,
    {
        let status = response.status();
        let headers = response.headers().clone();
        let url = response.url().clone();

        if status == StatusCode::NOT_FOUND {
            if let Err(err) = response.bytes().await {
                debug!(?err, "fail to drain 404 response body");
            }
            return Err(InvocationError::NotFound {
                method: context.method().clone(),
                url: context.url().to_string(),
            });
        }

        if !status.is_success() {
            let body = response
                .text()
                .await
                .map(|text| truncate(&text))
                .unwrap_or_else(|e| format!("<unable to read response body: {e}>"));
            return Err(InvocationError::UnexpectedStatusCode {
                status_code: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        let value = match returns {
            ReturnShape::Void => None,
            ReturnShape::Value => {
                let text = String::from_utf8_lossy(&bytes);
                let json = if text.trim().is_empty() { "null" } else { &*text };
                Some(deserialize_json(json)?)
            }
        };

        Ok(ResponseContext {
            status,
            headers,
            url,
            value,
        })
    }
}

fn deserialize_json<T>(json: &str) -> Result<T, InvocationError>
where
    T: DeserializeOwned,
{
    let deserializer = &mut serde_json::Deserializer::from_str(json);
    serde_path_to_error::deserialize(deserializer).map_err(|err| InvocationError::JsonError {
        path: err.path().to_string(),
        error: err.into_inner(),
        body: truncate(json),
    })
}

fn truncate(text: &str) -> String {
    match text.char_indices().nth(BODY_MAX_LENGTH) {
        Some((index, _)) => format!("{}... (truncated)", &text[..index]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde::Deserialize;

    use super::*;
    use crate::{ApiContract, MethodDescriptor, ProxyContext, RequestDescriptor, proxy_args};

    #[derive(Debug, PartialEq, Deserialize)]
    struct User {
        id: u32,
        name: String,
    }

    fn request_context() -> RequestContext {
        let contract = ApiContract::builder("UserApi")
            .add_method(MethodDescriptor::get("get_user").with_template("users/{id}").with_param("id"))
            .build();
        let context = ProxyContext::builder(Arc::new(contract)).build();
        let method = context.contract().method("get_user").expect("registered");
        let descriptor = RequestDescriptor::build(&context, method, proxy_args![42].expect("args"))
            .expect("valid descriptor");
        let url = "http://127.0.0.1/users/42".parse().expect("valid url");
        RequestContext::new(descriptor, url)
    }

    fn response(status: u16, body: &str) -> reqwest::Response {
        let response = http::Response::builder()
            .status(status)
            .header("content-type", "application/json")
            .body(body.to_string())
            .expect("valid response");
        reqwest::Response::from(response)
    }

    #[tokio::test]
    async fn should_deserialize_value() {
        let context = request_context();

        let result = ProxyResultExecutor
            .execute::<User>(response(200, r#"{"id":42,"name":"Ada"}"#), &context, ReturnShape::Value)
            .await
            .expect("should deserialize");

        assert_eq!(result.status(), StatusCode::OK);
        assert_eq!(
            result.into_value(),
            Some(User {
                id: 42,
                name: "Ada".to_string()
            })
        );
    }

    #[tokio::test]
    async fn should_read_empty_body_as_null() {
        let context = request_context();

        let result = ProxyResultExecutor
            .execute::<Option<User>>(response(200, ""), &context, ReturnShape::Value)
            .await
            .expect("should deserialize");

        assert_eq!(result.into_value(), Some(None));
    }

    #[tokio::test]
    async fn should_skip_body_for_void() {
        let context = request_context();

        let result = ProxyResultExecutor
            .execute::<User>(response(204, "ignored"), &context, ReturnShape::Void)
            .await
            .expect("should succeed");

        assert_eq!(result.status(), StatusCode::NO_CONTENT);
        assert!(result.value().is_none());
    }

    #[tokio::test]
    async fn should_synthesize_not_found() {
        let context = request_context();

        let result = ProxyResultExecutor
            .execute::<User>(response(404, "missing"), &context, ReturnShape::Value)
            .await;

        let Err(error) = result else {
            panic!("404 should fail");
        };
        insta::assert_snapshot!(error, @"Request error: GET http://127.0.0.1/users/42 responded 404 Not Found");
    }

    #[tokio::test]
    async fn should_report_unexpected_status_with_truncated_body() {
        let context = request_context();
        let body = "x".repeat(BODY_MAX_LENGTH + 10);

        let result = ProxyResultExecutor
            .execute::<User>(response(503, &body), &context, ReturnShape::Value)
            .await;

        let Err(InvocationError::UnexpectedStatusCode { status_code, body }) = result else {
            panic!("503 should fail");
        };
        assert_eq!(status_code, 503);
        assert!(body.ends_with("... (truncated)"));
        assert_eq!(body.len(), BODY_MAX_LENGTH + "... (truncated)".len());
    }

    #[tokio::test]
    async fn should_report_json_path() {
        let context = request_context();

        let result = ProxyResultExecutor
            .execute::<User>(response(200, r#"{"id":"abc","name":"Ada"}"#), &context, ReturnShape::Value)
            .await;

        let Err(InvocationError::JsonError { path, .. }) = result else {
            panic!("invalid body should fail");
        };
        assert_eq!(path, "id");
    }

    #[test]
    fn should_read_unit_for_void_typed_call() {
        let context: ResponseContext<()> = ResponseContext {
            status: StatusCode::NO_CONTENT,
            headers: HeaderMap::new(),
            url: "http://127.0.0.1/".parse().expect("valid url"),
            value: None,
        };

        context.into_typed().expect("unit from null");
    }

    #[test]
    fn should_truncate_on_char_boundary() {
        let text = "é".repeat(BODY_MAX_LENGTH + 1);

        let truncated = truncate(&text);

        assert!(truncated.starts_with(&"é".repeat(BODY_MAX_LENGTH)));
        assert!(truncated.ends_with("... (truncated)"));
    }
}
