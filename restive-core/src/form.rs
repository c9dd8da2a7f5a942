//! Url-encoded form and query processing

use crate::Error;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;

/// Parse URL-encoded form data into a struct, matching fields by name
pub fn parse_form<T: DeserializeOwned>(body: &[u8]) -> Result<T, Error> {
    serde_urlencoded::from_bytes(body)
        .map_err(|e| Error::Binding(format!("Failed to parse form data: {}", e)))
}

/// Request parameter map: string keys, every value kept in arrival order.
///
/// This is what a handler taking query (GET) or form (POST) parameters
/// receives.
///
/// ```
/// use restive_core::Params;
///
/// let params = Params::parse_query("tag=a&tag=b&page=2").unwrap();
/// assert_eq!(params.get("page"), Some("2"));
/// assert_eq!(params.get_all("tag"), ["a", "b"]);
/// assert_eq!(params.get("missing"), None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    values: BTreeMap<String, Vec<String>>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from decoded key/value pairs; repeated keys accumulate.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut params = Self::new();
        for (key, value) in pairs {
            params.append(key, value);
        }
        params
    }

    /// Parse a raw query string (no leading `?`).
    pub fn parse_query(query: &str) -> Result<Self, Error> {
        let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query)
            .map_err(|e| Error::Binding(format!("Failed to parse query string: {}", e)))?;
        Ok(Self::from_pairs(pairs))
    }

    /// Parse an `application/x-www-form-urlencoded` body.
    pub fn parse_form(body: &[u8]) -> Result<Self, Error> {
        let pairs: Vec<(String, String)> = parse_form(body)?;
        Ok(Self::from_pairs(pairs))
    }

    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.entry(key.into()).or_default().push(value.into());
    }

    /// First value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .and_then(|v| v.first())
            .map(String::as_str)
    }

    /// Every value for `key`, empty when absent.
    pub fn get_all(&self, key: &str) -> &[String] {
        self.values.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[test]
    fn test_parse_form_params() {
        let body = b"name=John+Doe&email=john%40example.com&age=30";
        let form = Params::parse_form(body).unwrap();

        assert_eq!(form.get("name"), Some("John Doe"));
        assert_eq!(form.get("email"), Some("john@example.com"));
        assert_eq!(form.get("age"), Some("30"));
        assert_eq!(form.len(), 3);
    }

    #[test]
    fn test_repeated_keys_keep_order() {
        let params = Params::parse_query("tag=rust&tag=web&tag=framework").unwrap();
        assert_eq!(params.get("tag"), Some("rust"));
        assert_eq!(params.get_all("tag"), ["rust", "web", "framework"]);
    }

    #[test]
    fn test_empty_value_is_present() {
        let params = Params::parse_query("value=").unwrap();
        assert!(params.contains("value"));
        assert_eq!(params.get("value"), Some(""));
    }

    #[test]
    fn test_empty_query() {
        let params = Params::parse_query("").unwrap();
        assert!(params.is_empty());
        assert!(params.get_all("x").is_empty());
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct MyStruct {
        #[serde(rename = "A")]
        a: i32,
        #[serde(rename = "B")]
        b: String,
    }

    #[test]
    fn test_parse_form_into_struct() {
        let parsed: MyStruct = parse_form(b"A=1&B=Hello").unwrap();
        assert_eq!(
            parsed,
            MyStruct {
                a: 1,
                b: "Hello".to_string()
            }
        );
    }

    #[test]
    fn test_parse_form_type_mismatch() {
        let err = parse_form::<MyStruct>(b"A=one&B=Hello").unwrap_err();
        assert!(matches!(err, Error::Binding(_)));
    }
}
