//! Canonical label keys and label string parsing.

use crate::error::MalformedBatch;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A label set. Keys iterate in sorted order.
pub type Labels = BTreeMap<String, String>;

/// Canonical identity of a label set.
///
/// Rendered as `{k1="v1", k2="v2"}` with keys sorted and values escaped, so
/// two label sets with the same pairs always produce the same key regardless
/// of the order they were written in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelKey(String);

impl LabelKey {
    /// Build the canonical key for a label set.
    pub fn from_labels(labels: &Labels) -> Self {
        let mut out = String::from("{");
        for (i, (name, value)) in labels.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            out.push_str(name);
            out.push_str("=\"");
            escape_into(&mut out, value);
            out.push('"');
        }
        out.push('}');
        LabelKey(out)
    }

    /// Key of the empty label set.
    pub fn empty() -> Self {
        LabelKey("{}".to_string())
    }

    pub fn is_empty(&self) -> bool {
        self.0 == "{}"
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LabelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn escape_into(out: &mut String, value: &str) {
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }
}

/// Parse a label string as carried in a `labels` column.
///
/// Accepts a JSON object of string values (`{"host":"a"}`) or the
/// Prometheus exposition form (`{host="a", dc="eu"}`, braces optional).
/// An empty string or `{}` yields an empty label set.
pub fn parse_labels(input: &str) -> std::result::Result<Labels, MalformedBatch> {
    let trimmed = input.trim();
    if trimmed.is_empty() || trimmed == "{}" {
        return Ok(Labels::new());
    }

    let is_json = trimmed
        .strip_prefix('{')
        .is_some_and(|rest| rest.trim_start().starts_with('"'));
    if is_json {
        return serde_json::from_str::<Labels>(trimmed).map_err(|e| invalid(input, e.to_string()));
    }

    let body = match (trimmed.strip_prefix('{'), trimmed.ends_with('}')) {
        (Some(rest), true) => &rest[..rest.len() - 1],
        (None, false) => trimmed,
        _ => return Err(invalid(input, "unbalanced braces")),
    };

    PromLabelParser::new(input, body).parse()
}

fn invalid(input: &str, reason: impl Into<String>) -> MalformedBatch {
    MalformedBatch::InvalidLabels {
        input: input.to_string(),
        reason: reason.into(),
    }
}

/// Scanner for `name="value", ...` pairs.
struct PromLabelParser<'a> {
    input: &'a str,
    chars: std::iter::Peekable<std::str::Chars<'a>>,
}

impl<'a> PromLabelParser<'a> {
    fn new(input: &'a str, body: &'a str) -> Self {
        Self {
            input,
            chars: body.chars().peekable(),
        }
    }

    fn parse(mut self) -> std::result::Result<Labels, MalformedBatch> {
        let mut labels = Labels::new();
        loop {
            self.skip_whitespace();
            if self.chars.peek().is_none() {
                return Ok(labels);
            }

            let name = self.name()?;
            self.skip_whitespace();
            if self.chars.next() != Some('=') {
                return Err(invalid(self.input, format!("expected '=' after {name:?}")));
            }
            self.skip_whitespace();
            let value = self.quoted()?;
            labels.insert(name, value);

            self.skip_whitespace();
            match self.chars.next() {
                None => return Ok(labels),
                Some(',') => {}
                Some(c) => return Err(invalid(self.input, format!("unexpected {c:?}"))),
            }
        }
    }

    fn skip_whitespace(&mut self) {
        while self.chars.peek().is_some_and(|c| c.is_whitespace()) {
            self.chars.next();
        }
    }

    fn name(&mut self) -> std::result::Result<String, MalformedBatch> {
        let mut name = String::new();
        while let Some(&c) = self.chars.peek() {
            if c.is_alphanumeric() || c == '_' || c == '.' || c == '-' {
                name.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        if name.is_empty() {
            return Err(invalid(self.input, "empty label name"));
        }
        Ok(name)
    }

    fn quoted(&mut self) -> std::result::Result<String, MalformedBatch> {
        if self.chars.next() != Some('"') {
            return Err(invalid(self.input, "label value must be quoted"));
        }
        let mut value = String::new();
        loop {
            match self.chars.next() {
                None => return Err(invalid(self.input, "unterminated label value")),
                Some('"') => return Ok(value),
                Some('\\') => match self.chars.next() {
                    Some('n') => value.push('\n'),
                    Some(c) => value.push(c),
                    None => return Err(invalid(self.input, "dangling escape")),
                },
                Some(c) => value.push(c),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(pairs: &[(&str, &str)]) -> Labels {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_key_is_order_independent() {
        let a = labels(&[("host", "a"), ("dc", "eu")]);
        let b = labels(&[("dc", "eu"), ("host", "a")]);
        assert_eq!(LabelKey::from_labels(&a), LabelKey::from_labels(&b));
        assert_eq!(LabelKey::from_labels(&a).as_str(), r#"{dc="eu", host="a"}"#);
    }

    #[test]
    fn test_empty_key() {
        let key = LabelKey::from_labels(&Labels::new());
        assert_eq!(key, LabelKey::empty());
        assert!(key.is_empty());
    }

    #[test]
    fn test_key_escapes_values() {
        let key = LabelKey::from_labels(&labels(&[("path", "a\"b, c=\"d")]));
        assert_eq!(key.as_str(), r#"{path="a\"b, c=\"d"}"#);
        assert_ne!(
            key,
            LabelKey::from_labels(&labels(&[("path", "a"), ("c", "d")]))
        );
    }

    #[test]
    fn test_parse_prometheus_style() {
        let parsed = parse_labels(r#"{host="a", dc="eu"}"#).unwrap();
        assert_eq!(parsed, labels(&[("host", "a"), ("dc", "eu")]));

        let bare = parse_labels(r#"host="a""#).unwrap();
        assert_eq!(bare, labels(&[("host", "a")]));
    }

    #[test]
    fn test_parse_escaped_value() {
        let parsed = parse_labels(r#"{msg="say \"hi\""}"#).unwrap();
        assert_eq!(parsed["msg"], "say \"hi\"");
    }

    #[test]
    fn test_parse_json_style() {
        let parsed = parse_labels(r#"{"host":"a","dc":"eu"}"#).unwrap();
        assert_eq!(parsed, labels(&[("host", "a"), ("dc", "eu")]));
    }

    #[test]
    fn test_parse_json_with_whitespace() {
        let parsed = parse_labels(r#"{ "host": "a" }"#).unwrap();
        assert_eq!(parsed, labels(&[("host", "a")]));

        let parsed = parse_labels("{\n  \"host\": \"a\",\n  \"dc\": \"eu\"\n}").unwrap();
        assert_eq!(parsed, labels(&[("host", "a"), ("dc", "eu")]));
    }

    #[test]
    fn test_parse_empty() {
        assert!(parse_labels("").unwrap().is_empty());
        assert!(parse_labels(" {} ").unwrap().is_empty());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_labels("{host=a}").is_err());
        assert!(parse_labels("{host=\"a\"").is_err());
        assert!(parse_labels("{=\"a\"}").is_err());
        assert!(parse_labels("{\"host\": 1}").is_err());
    }

    #[test]
    fn test_canonical_key_roundtrips_through_parser() {
        let original = labels(&[("job", "api"), ("note", "x\"y")]);
        let key = LabelKey::from_labels(&original);
        assert_eq!(parse_labels(key.as_str()).unwrap(), original);
    }
}
