//! Media type parsing for request `Content-Type` headers.
//!
//! Only the parts the binder needs are here: splitting `type/subtype`,
//! collecting parameters, and recognising the JSON, form and multipart
//! families.
//!
//! ```
//! use restive_core::media_type::MediaType;
//!
//! let mt = MediaType::parse("application/vnd.api+json; charset=utf-8").unwrap();
//! assert!(mt.is_json());
//! assert_eq!(mt.param("charset"), Some("utf-8"));
//! ```

use std::collections::HashMap;
use std::fmt;

/// Content type sent with HTML string payloads.
pub const TEXT_HTML: &str = "text/html; charset=utf-8";
/// Content type sent with plain string payloads and error bodies.
pub const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
/// Content type sent with struct payloads and JSON-looking strings.
pub const APPLICATION_JSON: &str = "application/json";
/// Content type of url-encoded form bodies.
pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// A media type (MIME type) with optional parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaType {
    /// The type (e.g., "application", "text")
    pub type_: String,
    /// The subtype (e.g., "json", "x-www-form-urlencoded")
    pub subtype: String,
    /// Parameters such as `charset`
    pub params: HashMap<String, String>,
}

impl MediaType {
    /// Parse a media type from a header value. Type, subtype and parameter
    /// names are lowercased.
    pub fn parse(s: &str) -> Option<Self> {
        let mut parts = s.trim().split(';');

        let type_subtype = parts.next()?.trim();
        let (type_, subtype) = type_subtype.split_once('/')?;
        let type_ = type_.trim().to_lowercase();
        let subtype = subtype.trim().to_lowercase();
        if type_.is_empty() || subtype.is_empty() {
            return None;
        }

        let mut params = HashMap::new();
        for param in parts {
            if let Some((key, value)) = param.trim().split_once('=') {
                params.insert(
                    key.trim().to_lowercase(),
                    value.trim().trim_matches('"').to_string(),
                );
            }
        }

        Some(Self {
            type_,
            subtype,
            params,
        })
    }

    /// `application/json` or any structured `+json` suffix.
    pub fn is_json(&self) -> bool {
        self.subtype == "json" || self.subtype.ends_with("+json")
    }

    /// `application/x-www-form-urlencoded`.
    pub fn is_form_urlencoded(&self) -> bool {
        self.type_ == "application" && self.subtype == "x-www-form-urlencoded"
    }

    /// Any `multipart/*` type.
    pub fn is_multipart(&self) -> bool {
        self.type_ == "multipart"
    }

    /// Look up a parameter by (lowercase) name.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Get the bare `type/subtype` string.
    pub fn mime_type(&self) -> String {
        format!("{}/{}", self.type_, self.subtype)
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mime_type())?;
        let mut params: Vec<_> = self.params.iter().collect();
        params.sort();
        for (key, value) in params {
            write!(f, "; {}={}", key, value)?;
        }
        Ok(())
    }
}
