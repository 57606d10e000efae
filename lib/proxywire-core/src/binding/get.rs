use http::Method;
use tracing::debug;

use super::{BindingError, ContentModelBinder, ContentModelBindingContext};

/// Binds arguments into the route template, then into the query string.
#[derive(Debug, Clone)]
pub struct HttpGetContentBinder {
    method: Method,
}

impl HttpGetContentBinder {
    pub fn new(method: Method) -> Self {
        Self { method }
    }
}

impl ContentModelBinder for HttpGetContentBinder {
    fn method(&self) -> &Method {
        &self.method
    }

    fn bind_content(
        &self,
        context: &mut ContentModelBindingContext<'_>,
    ) -> Result<(), BindingError> {
        let ensure_template_result = self.ensure_template(context)?;
        if ensure_template_result.binding_completed {
            return Ok(());
        }

        let result = context.resolver().resolve(
            context.parameters(),
            context.args(),
            ensure_template_result.parameter_offset,
            ensure_template_result.ignore_model_prefix,
        );
        if result.dictionary().is_empty() {
            debug!(template = context.template(), "no query parameter to bind");
        }

        context.try_update_uri(result.dictionary())
    }
}
