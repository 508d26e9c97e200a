//! Query string serialization following `OpenAPI` `style`/`explode`.

use crate::schema::value_to_string;
use openapiv3::QueryStyle;
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq)]
pub struct QuerySerialization {
    pub style: QueryStyle,
    pub explode: bool,
    pub allow_reserved: bool,
    pub allow_empty_value: bool,
}

impl QuerySerialization {
    /// `explode` defaults to true for `form` and `deepObject`.
    #[must_use]
    pub fn new(style: QueryStyle, explode: Option<bool>) -> Self {
        let explode = explode.unwrap_or(matches!(style, QueryStyle::Form | QueryStyle::DeepObject));
        Self {
            style,
            explode,
            allow_reserved: false,
            allow_empty_value: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPair {
    pub key: String,
    pub value: String,
    pub allow_reserved: bool,
}

impl QueryPair {
    fn new(key: impl Into<String>, value: impl Into<String>, allow_reserved: bool) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            allow_reserved,
        }
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

/// Serialize one query parameter value into `key=value` pairs.
///
/// Empty values are dropped unless the parameter is required or allows empty values.
#[must_use]
pub fn serialize_param(
    name: &str,
    value: &Value,
    required: bool,
    ser: &QuerySerialization,
) -> Vec<QueryPair> {
    let reserved = ser.allow_reserved;

    if is_empty(value) {
        return if required || ser.allow_empty_value {
            vec![QueryPair::new(name, "", reserved)]
        } else {
            Vec::new()
        };
    }

    match value {
        Value::Array(items) => array_pairs(name, items, ser),
        Value::Object(map) => object_pairs(name, map, ser),
        scalar => vec![QueryPair::new(name, value_to_string(scalar), reserved)],
    }
}

fn array_pairs(name: &str, items: &[Value], ser: &QuerySerialization) -> Vec<QueryPair> {
    let reserved = ser.allow_reserved;
    let rendered: Vec<String> = items.iter().map(value_to_string).collect();
    let joined = |sep: &str| vec![QueryPair::new(name, rendered.join(sep), reserved)];

    match ser.style {
        // `login=a&login=b`, the shape Helix expects for multi-value filters.
        QueryStyle::Form if ser.explode => rendered
            .iter()
            .map(|v| QueryPair::new(name, v.as_str(), reserved))
            .collect(),
        QueryStyle::Form | QueryStyle::DeepObject => joined(","),
        QueryStyle::SpaceDelimited => joined(" "),
        QueryStyle::PipeDelimited => joined("|"),
    }
}

fn object_pairs(name: &str, map: &Map<String, Value>, ser: &QuerySerialization) -> Vec<QueryPair> {
    let reserved = ser.allow_reserved;
    match ser.style {
        QueryStyle::DeepObject => map
            .iter()
            .map(|(k, v)| QueryPair::new(format!("{name}[{k}]"), value_to_string(v), reserved))
            .collect(),
        QueryStyle::Form if ser.explode => map
            .iter()
            .map(|(k, v)| QueryPair::new(k.as_str(), value_to_string(v), reserved))
            .collect(),
        QueryStyle::Form => {
            let flat: Vec<String> = map
                .iter()
                .flat_map(|(k, v)| [k.clone(), value_to_string(v)])
                .collect();
            vec![QueryPair::new(name, flat.join(","), reserved)]
        }
        QueryStyle::SpaceDelimited | QueryStyle::PipeDelimited => vec![QueryPair::new(
            name,
            Value::Object(map.clone()).to_string(),
            reserved,
        )],
    }
}

/// Join pairs into an encoded query string (`a=1&b=2`).
#[must_use]
pub fn encode_pairs(pairs: &[QueryPair]) -> String {
    pairs
        .iter()
        .map(|p| {
            format!(
                "{}={}",
                encode_component(&p.key, false),
                encode_component(&p.value, p.allow_reserved)
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// Percent-encode everything but RFC 3986 unreserved characters. With `allow_reserved`,
/// reserved characters other than `&`, `=` and `#` are kept as-is.
#[must_use]
pub fn encode_component(s: &str, allow_reserved: bool) -> String {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    let mut out = String::with_capacity(s.len());
    for &b in s.as_bytes() {
        let unreserved = b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~');
        let kept_reserved = allow_reserved && b"!$'()*+,;:/?@[]".contains(&b);
        if unreserved || kept_reserved {
            out.push(char::from(b));
        } else {
            out.push('%');
            out.push(char::from(HEX[usize::from(b >> 4)]));
            out.push(char::from(HEX[usize::from(b & 0x0F)]));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn form() -> QuerySerialization {
        QuerySerialization::new(QueryStyle::Form, None)
    }

    fn keys_values(pairs: &[QueryPair]) -> Vec<(&str, &str)> {
        pairs
            .iter()
            .map(|p| (p.key.as_str(), p.value.as_str()))
            .collect()
    }

    #[test]
    fn form_explode_repeats_keys() {
        let pairs = serialize_param("login", &json!(["ninja", "shroud"]), false, &form());
        assert_eq!(
            keys_values(&pairs),
            vec![("login", "ninja"), ("login", "shroud")]
        );
        assert_eq!(encode_pairs(&pairs), "login=ninja&login=shroud");
    }

    #[test]
    fn form_without_explode_joins_with_commas() {
        let ser = QuerySerialization::new(QueryStyle::Form, Some(false));
        let pairs = serialize_param("id", &json!([1, 2, 3]), false, &ser);
        assert_eq!(keys_values(&pairs), vec![("id", "1,2,3")]);
    }

    #[test]
    fn delimited_styles() {
        let space = QuerySerialization::new(QueryStyle::SpaceDelimited, None);
        let pipe = QuerySerialization::new(QueryStyle::PipeDelimited, None);
        assert_eq!(
            encode_pairs(&serialize_param("lang", &json!(["en", "de"]), false, &space)),
            "lang=en%20de"
        );
        assert_eq!(
            keys_values(&serialize_param("lang", &json!(["en", "de"]), false, &pipe)),
            vec![("lang", "en|de")]
        );
    }

    #[test]
    fn deep_object_uses_bracket_keys() {
        let ser = QuerySerialization::new(QueryStyle::DeepObject, None);
        let pairs = serialize_param("filter", &json!({ "a": 1 }), false, &ser);
        assert_eq!(keys_values(&pairs), vec![("filter[a]", "1")]);
        assert_eq!(encode_pairs(&pairs), "filter%5Ba%5D=1");
    }

    #[test]
    fn empty_values_are_dropped_unless_required() {
        assert!(serialize_param("after", &json!(""), false, &form()).is_empty());
        assert_eq!(
            keys_values(&serialize_param("after", &json!(""), true, &form())),
            vec![("after", "")]
        );
    }

    #[test]
    fn encoding_respects_allow_reserved() {
        assert_eq!(encode_component("a/b c&d", false), "a%2Fb%20c%26d");
        assert_eq!(encode_component("a/b c&d", true), "a/b%20c%26d");
        assert_eq!(encode_component("é", false), "%C3%A9");
    }
}
