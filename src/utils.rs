use std::borrow::Borrow;
use std::convert::Infallible;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub fn log_error<E: core::fmt::Display>(error: E) -> String {
    log::error!("{error}");
    error.to_string()
}

pub async fn async_sleep(timeout_ms: u64) {
    tokio::time::sleep(tokio::time::Duration::from_millis(timeout_ms)).await
}

/// Javascript-like truthiness of a JSON value
///
/// `null`, `false`, `0` and the empty string are falsy, everything else is truthy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Renders a JSON value for display in a table cell
pub fn display_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

pub type CheapClone<T> = std::sync::Arc<T>;
// pub type CheapClone<T> = std::rc::Rc<T>;

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct CCStr(CheapClone<str>);
impl Clone for CCStr {
    fn clone(&self) -> Self {
        Self(CheapClone::clone(&self.0))
    }
}

impl Serialize for CCStr {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.0.as_ref())
    }
}

impl<'de> Deserialize<'de> for CCStr {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        String::deserialize(deserializer).map(|s| CCStr(CheapClone::from(s)))
    }
}

impl core::str::FromStr for CCStr {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(CCStr(CheapClone::from(s)))
    }
}
impl From<String> for CCStr {
    fn from(value: String) -> Self {
        CCStr(CheapClone::from(value))
    }
}
impl From<&String> for CCStr {
    fn from(value: &String) -> Self {
        CCStr(CheapClone::from(value.as_str()))
    }
}
impl From<&str> for CCStr {
    fn from(value: &str) -> Self {
        CCStr(CheapClone::from(value))
    }
}
impl From<&CCStr> for CCStr {
    fn from(value: &CCStr) -> Self {
        value.clone()
    }
}
impl core::ops::Deref for CCStr {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}
impl AsRef<str> for CCStr {
    fn as_ref(&self) -> &str {
        self.0.as_ref()
    }
}

impl core::fmt::Display for CCStr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl Borrow<str> for CCStr {
    fn borrow(&self) -> &str {
        self.0.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn truthiness_follows_javascript() {
        assert!(!is_truthy(&json!(null)));
        assert!(!is_truthy(&json!(false)));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!("")));
        assert!(is_truthy(&json!("a")));
        assert!(is_truthy(&json!(3)));
        assert!(is_truthy(&json!([])));
    }

    #[test]
    fn display_value_unquotes_strings() {
        assert_eq!(display_value(Some(&json!("node-1"))), "node-1");
        assert_eq!(display_value(Some(&json!(4))), "4");
        assert_eq!(display_value(None), "");
        assert_eq!(display_value(Some(&json!(null))), "");
    }
}
