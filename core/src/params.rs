//! Query-string construction.
//!
//! # Design
//! Callers describe what to append with `QueryParams`, one variant per call
//! shape. `add_query_param` matches on the variant and appends with the
//! separator recomputed at every step, so a map is just a sequence of
//! single-pair appends.
//!
//! `add_query_param_value` is the untyped boundary: it takes JSON arguments,
//! infers the shape from their count and types, and rejects anything else
//! with `AjaxError::InvalidArgument`.
//!
//! A raw fragment is escaped as one opaque token. `"a=1&b=2"` becomes
//! `a%3D1%26b%3D2`, not two pairs.

use std::fmt;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde_json::Value;

use crate::error::AjaxError;

/// Characters left alone by `encodeURIComponent`: alphanumerics plus
/// `- _ . ! ~ * ' ( )`.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// A scalar query value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl ParamValue {
    /// Accept a JSON string, number or boolean.
    pub fn from_json(value: &Value) -> Result<Self, AjaxError> {
        match value {
            Value::String(s) => Ok(ParamValue::Str(s.clone())),
            Value::Bool(b) => Ok(ParamValue::Bool(*b)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Ok(ParamValue::Int(i)),
                None => n.as_f64().map(ParamValue::Float).ok_or_else(|| {
                    AjaxError::invalid_argument(format!("number {n} is not representable"))
                }),
            },
            other => Err(AjaxError::invalid_argument(format!(
                "query value must be a string, number or boolean, got {}",
                json_type(other)
            ))),
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Str(s) => f.write_str(s),
            ParamValue::Int(i) => write!(f, "{i}"),
            ParamValue::Bool(b) => write!(f, "{b}"),
            ParamValue::Float(v) if v.is_nan() => f.write_str("NaN"),
            ParamValue::Float(v) if v.is_infinite() => {
                f.write_str(if *v > 0.0 { "Infinity" } else { "-Infinity" })
            }
            // -0 prints as 0
            ParamValue::Float(v) if *v == 0.0 => f.write_str("0"),
            ParamValue::Float(v) if v.abs() >= 1e21 || v.abs() < 1e-6 => {
                // 1e21 -> "1e+21", 1.5e-7 -> "1.5e-7"
                let exp = format!("{v:e}");
                match exp.split_once('e') {
                    Some((mantissa, power)) if !power.starts_with('-') => {
                        write!(f, "{mantissa}e+{power}")
                    }
                    _ => f.write_str(&exp),
                }
            }
            ParamValue::Float(v) => write!(f, "{v}"),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        ParamValue::Str(s.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        ParamValue::Str(s)
    }
}

impl From<i64> for ParamValue {
    fn from(i: i64) -> Self {
        ParamValue::Int(i)
    }
}

impl From<i32> for ParamValue {
    fn from(i: i32) -> Self {
        ParamValue::Int(i64::from(i))
    }
}

impl From<u32> for ParamValue {
    fn from(i: u32) -> Self {
        ParamValue::Int(i64::from(i))
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<bool> for ParamValue {
    fn from(b: bool) -> Self {
        ParamValue::Bool(b)
    }
}

/// The three ways of describing what to append to a URL.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryParams {
    /// Every pair is appended in the order given.
    Map(Vec<(String, ParamValue)>),
    NamedPair { name: String, value: ParamValue },
    /// Escaped and appended as a single token.
    RawFragment(String),
}

impl QueryParams {
    pub fn map<K, V, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<ParamValue>,
    {
        QueryParams::Map(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    pub fn pair(name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        QueryParams::NamedPair {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn raw(fragment: impl Into<String>) -> Self {
        QueryParams::RawFragment(fragment.into())
    }

    /// Infer the shape from the arguments that follow the URL.
    pub fn from_args(args: &[Value]) -> Result<Self, AjaxError> {
        match args {
            [Value::Object(map)] => {
                let mut pairs = Vec::with_capacity(map.len());
                for (name, value) in map {
                    pairs.push((name.clone(), ParamValue::from_json(value)?));
                }
                Ok(QueryParams::Map(pairs))
            }
            [Value::String(fragment)] => Ok(QueryParams::RawFragment(fragment.clone())),
            [other] => Err(AjaxError::invalid_argument(format!(
                "expected an object or a query string, got {}",
                json_type(other)
            ))),
            [Value::String(name), value] => Ok(QueryParams::NamedPair {
                name: name.clone(),
                value: ParamValue::from_json(value)?,
            }),
            [name, _] => Err(AjaxError::invalid_argument(format!(
                "query name must be a string, got {}",
                json_type(name)
            ))),
            _ => Err(AjaxError::invalid_argument(format!(
                "expected 2 or 3 arguments, got {}",
                args.len() + 1
            ))),
        }
    }
}

/// Percent-encode one key or value the way `encodeURIComponent` does.
pub fn encode_component(input: &str) -> String {
    utf8_percent_encode(input, URI_COMPONENT).to_string()
}

/// Append `params` to `url`, introducing `?` only when `url` has none.
pub fn add_query_param(url: &str, params: &QueryParams) -> String {
    let mut url = url.to_string();
    match params {
        QueryParams::Map(pairs) => {
            for (name, value) in pairs {
                append_pair(&mut url, name, value);
            }
        }
        QueryParams::NamedPair { name, value } => append_pair(&mut url, name, value),
        QueryParams::RawFragment(fragment) => {
            push_separator(&mut url);
            url.push_str(&encode_component(fragment));
        }
    }
    url
}

/// Untyped entry point: `url` must be a JSON string and `args` one or two
/// further arguments.
pub fn add_query_param_value(url: &Value, args: &[Value]) -> Result<String, AjaxError> {
    let Value::String(url) = url else {
        return Err(AjaxError::invalid_argument(format!(
            "url must be a string, got {}",
            json_type(url)
        )));
    };
    let params = QueryParams::from_args(args)?;
    Ok(add_query_param(url, &params))
}

/// Render pairs as an `application/x-www-form-urlencoded` body.
pub fn form_encode(pairs: &[(String, ParamValue)]) -> String {
    pairs
        .iter()
        .map(|(name, value)| {
            format!("{}={}", encode_component(name), encode_component(&value.to_string()))
        })
        .collect::<Vec<_>>()
        .join("&")
}

fn append_pair(url: &mut String, name: &str, value: &ParamValue) {
    push_separator(url);
    url.push_str(&encode_component(name));
    url.push('=');
    url.push_str(&encode_component(&value.to_string()));
}

fn push_separator(url: &mut String) {
    url.push(if url.contains('?') { '&' } else { '?' });
}

pub(crate) fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn pair_encodes_name_and_value() {
        let url = add_query_param("http://x", &QueryParams::pair("a b", true));
        assert_eq!(url, "http://x?a%20b=true");
    }

    #[test]
    fn map_appends_to_existing_query() {
        let url = add_query_param("http://x?y=1", &QueryParams::map([("z", "q&r")]));
        assert_eq!(url, "http://x?y=1&z=q%26r");
    }

    #[test]
    fn map_introduces_single_question_mark() {
        let url = add_query_param("http://x/api", &QueryParams::map([("a", "1"), ("b", "2"), ("c", "3")]));
        assert_eq!(url, "http://x/api?a=1&b=2&c=3");
        assert_eq!(url.matches('?').count(), 1);
    }

    #[test]
    fn empty_map_leaves_url_unchanged() {
        let url = add_query_param("http://x", &QueryParams::Map(Vec::new()));
        assert_eq!(url, "http://x");
    }

    #[test]
    fn raw_fragment_is_escaped_as_one_token() {
        let url = add_query_param("http://x", &QueryParams::raw("firstname=Howie&lastname=Chen"));
        assert_eq!(url, "http://x?firstname%3DHowie%26lastname%3DChen");
    }

    #[test]
    fn raw_fragment_after_existing_query_uses_ampersand() {
        let url = add_query_param("http://x?a=1", &QueryParams::raw("b"));
        assert_eq!(url, "http://x?a=1&b");
    }

    #[test]
    fn component_encoding_keeps_unreserved_marks() {
        assert_eq!(encode_component("-_.!~*'()"), "-_.!~*'()");
        assert_eq!(encode_component("a/b?c#d"), "a%2Fb%3Fc%23d");
        assert_eq!(encode_component("中"), "%E4%B8%AD");
    }

    #[test]
    fn numbers_render_like_javascript() {
        assert_eq!(ParamValue::Int(42).to_string(), "42");
        assert_eq!(ParamValue::Float(1.0).to_string(), "1");
        assert_eq!(ParamValue::Float(2.5).to_string(), "2.5");
        assert_eq!(ParamValue::Float(-0.0).to_string(), "0");
        assert_eq!(ParamValue::Float(f64::NAN).to_string(), "NaN");
        assert_eq!(ParamValue::Float(f64::NEG_INFINITY).to_string(), "-Infinity");
        assert_eq!(ParamValue::Float(0.000001).to_string(), "0.000001");
        assert_eq!(ParamValue::Float(1e21).to_string(), "1e+21");
        assert_eq!(ParamValue::Float(-2.5e30).to_string(), "-2.5e+30");
        assert_eq!(ParamValue::Float(1e-7).to_string(), "1e-7");
        assert_eq!(ParamValue::Float(123e-20).to_string(), "1.23e-18");
        assert_eq!(ParamValue::Float(1e20).to_string(), "100000000000000000000");
    }

    #[test]
    fn dynamic_pair_accepts_scalars() {
        let url = add_query_param_value(&json!("http://x"), &[json!("n"), json!(3)]).unwrap();
        assert_eq!(url, "http://x?n=3");
        let url = add_query_param_value(&json!("http://x"), &[json!("f"), json!(false)]).unwrap();
        assert_eq!(url, "http://x?f=false");
    }

    #[test]
    fn dynamic_object_becomes_map() {
        let url = add_query_param_value(&json!("http://x"), &[json!({"a": "1", "b": 2})]).unwrap();
        assert!(url.starts_with("http://x?"));
        let query = &url["http://x?".len()..];
        let mut pairs: Vec<&str> = query.split('&').collect();
        pairs.sort_unstable();
        assert_eq!(pairs, vec!["a=1", "b=2"]);
    }

    #[test]
    fn dynamic_rejects_non_string_url() {
        let err = add_query_param_value(&json!(42), &[json!("a")]).unwrap_err();
        assert!(matches!(err, AjaxError::InvalidArgument(_)));
    }

    #[test]
    fn dynamic_rejects_wrong_arity() {
        let url = json!("http://x");
        assert!(matches!(
            add_query_param_value(&url, &[]),
            Err(AjaxError::InvalidArgument(_))
        ));
        assert!(matches!(
            add_query_param_value(&url, &[json!("a"), json!("b"), json!("c")]),
            Err(AjaxError::InvalidArgument(_))
        ));
    }

    #[test]
    fn dynamic_rejects_unsupported_types() {
        let url = json!("http://x");
        for args in [
            vec![json!(5)],
            vec![json!(null)],
            vec![json!(1), json!("v")],
            vec![json!("k"), json!(null)],
            vec![json!("k"), json!({"nested": true})],
            vec![json!({"k": [1, 2]})],
        ] {
            let err = add_query_param_value(&url, &args).unwrap_err();
            assert!(matches!(err, AjaxError::InvalidArgument(_)), "{args:?}");
        }
    }

    #[test]
    fn form_encode_joins_pairs() {
        let body = form_encode(&[("a".to_string(), "1".into()), ("b c".to_string(), "x&y".into())]);
        assert_eq!(body, "a=1&b%20c=x%26y");
    }
}
