use std::sync::LazyLock;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use regex::Regex;
use serde_json::Value;

use super::BindingError;

/// Regular expression for matching path parameters in the format `{param_name}`.
static RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{(?<name>\w+)}").expect("a valid regex"));

/// Characters escaped in a path segment, RFC 3986 unreserved characters excepted.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

fn replace_path_param(path: &str, param_name: &str, value: &str) -> String {
    let pattern = ["{", param_name, "}"].concat();
    path.replace(&pattern, value)
}

fn encode_path_param_value(value: &str) -> String {
    utf8_percent_encode(value, PATH_SEGMENT).to_string()
}

/// Distinct placeholder names, in order of first appearance.
pub(super) fn placeholder_names(template: &str) -> Vec<&str> {
    let mut names: Vec<&str> = Vec::new();
    for name in RE
        .captures_iter(template)
        .filter_map(|caps| caps.name("name"))
        .map(|it| it.as_str())
    {
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names
}

/// A route template with its placeholders filled.
#[derive(Debug)]
pub(super) struct TemplateResolved {
    pub(super) path: String,
    pub(super) consumed: usize,
}

/// Fills the placeholders of the template positionally from the leading arguments.
pub(super) fn resolve_template(
    template: &str,
    args: &[Value],
) -> Result<TemplateResolved, BindingError> {
    let names = placeholder_names(template);
    if names.is_empty() {
        return Ok(TemplateResolved {
            path: template.to_string(),
            consumed: 0,
        });
    }

    let mut path = template.to_string();
    let mut missings = Vec::new();
    for (index, name) in names.iter().enumerate() {
        let Some(value) = args.get(index).and_then(|value| path_value(name, value).transpose())
        else {
            missings.push((*name).to_string());
            continue;
        };
        let encoded_value = encode_path_param_value(&value?);
        path = replace_path_param(&path, name, &encoded_value);
    }

    if !missings.is_empty() {
        return Err(BindingError::TemplateUnresolved {
            template: template.to_string(),
            missings,
        });
    }

    Ok(TemplateResolved {
        consumed: names.len(),
        path,
    })
}

/// String form of a path argument, `None` for `null`.
fn path_value(name: &str, value: &Value) -> Result<Option<String>, BindingError> {
    let result = match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Array(items) => {
            let mut values = Vec::with_capacity(items.len());
            for item in items {
                match path_value(name, item)? {
                    Some(text) if !item.is_array() => values.push(text),
                    _ => {
                        return Err(BindingError::UnsupportedParameterValue {
                            name: name.to_string(),
                            message: "nested or null values are not supported in path arrays"
                                .to_string(),
                            value: value.clone(),
                        });
                    }
                }
            }
            Some(values.join(","))
        }
        Value::Object(_) => {
            return Err(BindingError::UnsupportedParameterValue {
                name: name.to_string(),
                message: "object values are not supported in path parameters".to_string(),
                value: value.clone(),
            });
        }
    };
    Ok(result)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn should_resolve_single_placeholder() {
        let resolved = resolve_template("users/{id}", &[json!(42)]).expect("should resolve");

        insta::assert_debug_snapshot!(resolved, @r#"
        TemplateResolved {
            path: "users/42",
            consumed: 1,
        }
        "#);
    }

    #[test]
    fn should_resolve_positionally() {
        let resolved = resolve_template(
            "users/{user_id}/posts/{post_id}",
            &[json!(123), json!("abc"), json!("extra")],
        )
        .expect("should resolve");

        assert_eq!(resolved.path, "users/123/posts/abc");
        assert_eq!(resolved.consumed, 2);
    }

    #[test]
    fn should_keep_template_without_placeholders() {
        let resolved = resolve_template("search", &[json!("abc")]).expect("should resolve");

        assert_eq!(resolved.path, "search");
        assert_eq!(resolved.consumed, 0);
    }

    #[test]
    fn should_fill_duplicate_placeholders_once() {
        let resolved = resolve_template(
            "api/{version}/users/{id}/posts/{id}/comments/{version}",
            &[json!("v1"), json!(456)],
        )
        .expect("should resolve");

        assert_eq!(resolved.path, "api/v1/users/456/posts/456/comments/v1");
        assert_eq!(resolved.consumed, 2);
    }

    #[test]
    fn should_encode_path_values() {
        let resolved = resolve_template("search/{query}", &[json!("hello world/é")])
            .expect("should resolve");

        assert_eq!(resolved.path, "search/hello%20world%2F%C3%A9");
    }

    #[test]
    fn should_keep_unreserved_characters() {
        let resolved =
            resolve_template("items/{name}", &[json!("test@example.com")]).expect("should resolve");

        insta::assert_snapshot!(resolved.path, @"items/test%40example.com");
    }

    #[test]
    fn should_join_arrays_with_commas() {
        let resolved =
            resolve_template("search/{tags}", &[json!(["rust", "web", 3])]).expect("should resolve");

        assert_eq!(resolved.path, "search/rust%2Cweb%2C3");
    }

    #[test]
    fn should_report_missing_arguments() {
        let result = resolve_template("users/{user_id}/posts/{post_id}", &[json!(1)]);

        let Err(error) = result else {
            panic!("missing argument should fail");
        };
        insta::assert_snapshot!(error, @r#"Path 'users/{user_id}/posts/{post_id}' is missing required arguments: ["post_id"]"#);
    }

    #[test]
    fn should_treat_null_as_missing() {
        let result = resolve_template("users/{id}", &[serde_json::Value::Null]);

        assert!(matches!(
            result,
            Err(BindingError::TemplateUnresolved { missings, .. }) if missings == ["id"]
        ));
    }

    #[test]
    fn should_reject_object_values() {
        let result = resolve_template("users/{id}", &[json!({"id": 1})]);

        assert!(matches!(
            result,
            Err(BindingError::UnsupportedParameterValue { name, .. }) if name == "id"
        ));
    }

    #[test]
    fn should_list_distinct_placeholders() {
        let names = placeholder_names("/a/{x}/{y}/{x}/{user_id}");

        assert_eq!(names, ["x", "y", "user_id"]);
    }

    #[test]
    fn test_replace_path_param_no_collision() {
        let result = replace_path_param("/users/{user_id}/posts/{id}", "id", "123");
        assert_eq!(result, "/users/{user_id}/posts/123");
    }
}
