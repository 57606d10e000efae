use indexmap::IndexMap;
use serde_json::Value;

use crate::contract::ParameterDescriptor;

/// Flattened query parameters of an invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelDictionaryResult {
    dictionary: IndexMap<String, String>,
    parameter_offset: usize,
    ignore_model_prefix: bool,
}

impl ModelDictionaryResult {
    /// The resolved `key -> value` pairs, in parameter order.
    pub fn dictionary(&self) -> &IndexMap<String, String> {
        &self.dictionary
    }

    /// Number of leading arguments consumed by the route template.
    pub fn parameter_offset(&self) -> usize {
        self.parameter_offset
    }

    pub fn ignore_model_prefix(&self) -> bool {
        self.ignore_model_prefix
    }

    pub fn into_dictionary(self) -> IndexMap<String, String> {
        self.dictionary
    }
}

/// Turns argument values into query parameters.
///
/// - scalars give `name=value`, booleans lowercase and numbers as JSON text
/// - objects are flattened to `name.field`, recursively
/// - arrays give `name[0]`, `name[1]`, ...
/// - `null` values are left out at any depth
///
/// With `ignore_model_prefix`, the fields of an object argument are emitted
/// without the parameter name.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModelContentResolver;

impl ModelContentResolver {
    pub fn resolve(
        &self,
        parameters: &[ParameterDescriptor],
        args: &[Value],
        parameter_offset: usize,
        ignore_model_prefix: bool,
    ) -> ModelDictionaryResult {
        let mut dictionary = IndexMap::new();

        for (parameter, value) in parameters.iter().zip(args).skip(parameter_offset) {
            match value {
                Value::Object(fields) if ignore_model_prefix => {
                    for (field, value) in fields {
                        flatten(&mut dictionary, field.clone(), value);
                    }
                }
                _ => flatten(&mut dictionary, parameter.name().to_string(), value),
            }
        }

        ModelDictionaryResult {
            dictionary,
            parameter_offset,
            ignore_model_prefix,
        }
    }
}

fn flatten(dictionary: &mut IndexMap<String, String>, key: String, value: &Value) {
    match value {
        Value::Null => {}
        Value::Bool(flag) => {
            dictionary.insert(key, flag.to_string());
        }
        Value::Number(number) => {
            dictionary.insert(key, number.to_string());
        }
        Value::String(text) => {
            dictionary.insert(key, text.clone());
        }
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                flatten(dictionary, format!("{key}[{index}]"), item);
            }
        }
        Value::Object(fields) => {
            for (field, item) in fields {
                flatten(dictionary, format!("{key}.{field}"), item);
            }
        }
    }
}
