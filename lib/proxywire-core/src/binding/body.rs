use http::Method;
use serde_json::{Map, Value};

use super::{BindingError, ContentModelBinder, ContentModelBindingContext};
use crate::request::RequestBody;

/// Binds arguments into the route template, then into a JSON body.
///
/// A single remaining argument is the body itself. Several remaining arguments
/// are wrapped in a JSON object keyed by parameter name. A lone `null` argument
/// sends no body.
#[derive(Debug, Clone)]
pub struct HttpBodyContentBinder {
    method: Method,
}

impl HttpBodyContentBinder {
    pub fn new(method: Method) -> Self {
        Self { method }
    }
}

impl ContentModelBinder for HttpBodyContentBinder {
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

        let offset = ensure_template_result.parameter_offset;
        let value = if ensure_template_result.ignore_model_prefix {
            context.args().get(offset).cloned().unwrap_or(Value::Null)
        } else {
            let fields: Map<String, Value> = context
                .parameters()
                .iter()
                .zip(context.args())
                .skip(offset)
                .map(|(parameter, value)| (parameter.name().to_string(), value.clone()))
                .collect();
            Value::Object(fields)
        };

        if value.is_null() {
            return Ok(());
        }

        let data = serde_json::to_vec(&value)?;
        context.set_body(RequestBody::json(data));
        Ok(())
    }
}
