//! Result encoding.
//!
//! A handler's return value is first flattened into a [`Returned`] (an
//! optional payload plus an optional error), then [`encode`] turns that
//! into an [`EncodedResponse`]. The rules, in order:
//!
//! 1. a returned error wins: `500`, `text/plain`, the error text;
//! 2. a string payload: `200`, content type sniffed from the text;
//! 3. a struct payload: `200`, `application/json`; a missing struct
//!    reference is a serialization error;
//! 4. nothing: `200`, empty body.

use crate::media_type::{APPLICATION_JSON, TEXT_HTML, TEXT_PLAIN};
use crate::shape::ReturnKind;
use crate::{Error, HttpResponse};
use serde::Serialize;
use std::borrow::Cow;
use std::fmt::Display;
use std::ops::Deref;

/// Struct payload, serialized to JSON.
///
/// # Example
///
/// ```
/// use restive_core::Json;
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct MyStruct {
///     #[serde(rename = "A")]
///     a: i32,
/// }
///
/// let handler = || Json(MyStruct { a: 1 });
/// # let _ = handler;
/// ```
///
/// `Option<Json<T>>` is the nullable form: returning `None` fails the
/// request with a serialization error instead of sending an empty body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Json<T>(pub T);

impl<T> Json<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for Json<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// A payload value as it comes back from a handler.
#[derive(Debug)]
pub enum PayloadValue {
    Empty,
    Text(String),
    /// Serialized struct, or the serializer's failure.
    Json(Result<Vec<u8>, String>),
    /// A struct reference that pointed nowhere.
    NullRef(&'static str),
}

/// Everything a handler returned, flattened.
#[derive(Debug)]
pub struct Returned {
    pub payload: PayloadValue,
    pub error: Option<String>,
}

impl Returned {
    pub fn empty() -> Self {
        Self::payload(PayloadValue::Empty)
    }

    pub fn payload(payload: PayloadValue) -> Self {
        Self {
            payload,
            error: None,
        }
    }

    pub fn with_error(mut self, error: impl Display) -> Self {
        self.error = Some(error.to_string());
        self
    }
}

/// A single value a handler can return.
///
/// Strings, [`Json`] and `Option<Json<T>>` are payloads. `()` stands for
/// "no payload". Scalars implement the trait only so that classification
/// can name and reject them.
pub trait Payload: Send + 'static {
    /// `None` when the value carries no payload at all.
    fn kind() -> Option<ReturnKind>;

    fn into_value(self) -> PayloadValue;
}

impl Payload for () {
    fn kind() -> Option<ReturnKind> {
        None
    }

    fn into_value(self) -> PayloadValue {
        PayloadValue::Empty
    }
}

impl Payload for String {
    fn kind() -> Option<ReturnKind> {
        Some(ReturnKind::Text)
    }

    fn into_value(self) -> PayloadValue {
        PayloadValue::Text(self)
    }
}

impl Payload for &'static str {
    fn kind() -> Option<ReturnKind> {
        Some(ReturnKind::Text)
    }

    fn into_value(self) -> PayloadValue {
        PayloadValue::Text(self.to_string())
    }
}

impl Payload for Cow<'static, str> {
    fn kind() -> Option<ReturnKind> {
        Some(ReturnKind::Text)
    }

    fn into_value(self) -> PayloadValue {
        PayloadValue::Text(self.into_owned())
    }
}

impl<T: Serialize + Send + 'static> Payload for Json<T> {
    fn kind() -> Option<ReturnKind> {
        Some(ReturnKind::Struct(std::any::type_name::<T>()))
    }

    fn into_value(self) -> PayloadValue {
        PayloadValue::Json(serde_json::to_vec(&self.0).map_err(|e| e.to_string()))
    }
}

impl<T: Serialize + Send + 'static> Payload for Option<Json<T>> {
    fn kind() -> Option<ReturnKind> {
        Some(ReturnKind::StructRef(std::any::type_name::<T>()))
    }

    fn into_value(self) -> PayloadValue {
        match self {
            Some(json) => json.into_value(),
            None => PayloadValue::NullRef(std::any::type_name::<T>()),
        }
    }
}

macro_rules! unsupported_payload {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Payload for $ty {
                fn kind() -> Option<ReturnKind> {
                    Some(ReturnKind::Other(stringify!($ty)))
                }

                fn into_value(self) -> PayloadValue {
                    PayloadValue::Text(self.to_string())
                }
            }
        )*
    };
}

unsupported_payload!(
    i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, bool, char,
);

/// A complete handler return type.
///
/// - `P` returns a payload;
/// - `Result<P, E>` returns a payload and an error (`E: Display`);
/// - `(A, B)` returns two payloads, which classification rejects.
pub trait HandlerOutput: Send + 'static {
    fn returns() -> Vec<ReturnKind>;

    fn into_returned(self) -> Returned;
}

impl<P: Payload> HandlerOutput for P {
    fn returns() -> Vec<ReturnKind> {
        P::kind().into_iter().collect()
    }

    fn into_returned(self) -> Returned {
        Returned::payload(self.into_value())
    }
}

impl<P, E> HandlerOutput for Result<P, E>
where
    P: Payload,
    E: Display + Send + 'static,
{
    fn returns() -> Vec<ReturnKind> {
        let mut kinds: Vec<ReturnKind> = P::kind().into_iter().collect();
        kinds.push(ReturnKind::Error);
        kinds
    }

    fn into_returned(self) -> Returned {
        match self {
            Ok(payload) => Returned::payload(payload.into_value()),
            Err(err) => Returned::empty().with_error(err),
        }
    }
}

// Always two entries, so classification sees both values. A `()` element
// has no payload kind and is reported as an unsupported type.
impl<A: Payload, B: Payload> HandlerOutput for (A, B) {
    fn returns() -> Vec<ReturnKind> {
        vec![
            A::kind().unwrap_or(ReturnKind::Other("()")),
            B::kind().unwrap_or(ReturnKind::Other("()")),
        ]
    }

    fn into_returned(self) -> Returned {
        Returned::payload(self.0.into_value())
    }
}

/// Guess a content type from the leading text of a string payload.
///
/// This is a best-effort heuristic for picking a sensible header. It is not
/// a content-type authority and must not be relied on for security
/// decisions. Leading whitespace is skipped, then `<` means HTML, `{` or
/// `[` means JSON, and anything else is plain text.
pub fn sniff_content_type(text: &str) -> &'static str {
    match text.trim_start().as_bytes().first() {
        Some(b'<') => TEXT_HTML,
        Some(b'{') | Some(b'[') => APPLICATION_JSON,
        _ => TEXT_PLAIN,
    }
}

/// Status, content type and body of one response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedResponse {
    pub status: u16,
    pub content_type: Option<&'static str>,
    pub body: Vec<u8>,
}

impl EncodedResponse {
    /// A 500 carrying `message` as plain text.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            status: 500,
            content_type: Some(TEXT_PLAIN),
            body: message.into().into_bytes(),
        }
    }

    pub fn from_error(err: &Error) -> Self {
        Self {
            status: err.status_code(),
            content_type: Some(TEXT_PLAIN),
            body: err.to_string().into_bytes(),
        }
    }
}

impl From<EncodedResponse> for HttpResponse {
    fn from(encoded: EncodedResponse) -> Self {
        let response = HttpResponse::new(encoded.status).with_body(encoded.body);
        match encoded.content_type {
            Some(ct) => response.with_header("Content-Type".to_string(), ct.to_string()),
            None => response,
        }
    }
}

/// Encode a handler's return values.
pub fn encode(returned: Returned) -> EncodedResponse {
    if let Some(message) = returned.error {
        return EncodedResponse::from_error(&Error::Handler(message));
    }

    match returned.payload {
        PayloadValue::Text(text) => EncodedResponse {
            status: 200,
            content_type: Some(sniff_content_type(&text)),
            body: text.into_bytes(),
        },
        PayloadValue::Json(Ok(body)) => EncodedResponse {
            status: 200,
            content_type: Some(APPLICATION_JSON),
            body,
        },
        PayloadValue::Json(Err(reason)) => {
            EncodedResponse::from_error(&Error::Serialization(reason))
        }
        PayloadValue::NullRef(type_name) => EncodedResponse::from_error(&Error::Serialization(
            format!("handler returned a nil {} reference", type_name),
        )),
        PayloadValue::Empty => EncodedResponse {
            status: 200,
            content_type: None,
            body: Vec::new(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[derive(Serialize)]
    struct MyStruct {
        #[serde(rename = "A")]
        a: i32,
        #[serde(rename = "B")]
        b: String,
    }

    fn my() -> MyStruct {
        MyStruct {
            a: 1,
            b: "Hello".to_string(),
        }
    }

    #[test]
    fn test_error_wins_over_every_payload() {
        let payloads = vec![
            PayloadValue::Empty,
            PayloadValue::Text("ok".into()),
            PayloadValue::Json(Ok(b"{}".to_vec())),
            PayloadValue::Json(Err("bad".into())),
            PayloadValue::NullRef("MyStruct"),
        ];
        for payload in payloads {
            let encoded = encode(Returned::payload(payload).with_error("boom"));
            assert_eq!(encoded, EncodedResponse::failure("boom"));
        }
    }

    #[test]
    fn test_text_is_sniffed() {
        let encoded = encode("<!doctype html><p>hi".into_returned());
        assert_eq!(encoded.status, 200);
        assert_eq!(encoded.content_type, Some(TEXT_HTML));
        assert_eq!(encoded.body, b"<!doctype html><p>hi");

        let encoded = encode(String::from(r#"{"a":1}"#).into_returned());
        assert_eq!(encoded.content_type, Some(APPLICATION_JSON));

        let encoded = encode("plain".into_returned());
        assert_eq!(encoded.content_type, Some(TEXT_PLAIN));
    }

    #[test]
    fn test_sniffing() {
        assert_eq!(sniff_content_type("  \n<html>"), TEXT_HTML);
        assert_eq!(sniff_content_type("[1,2]"), APPLICATION_JSON);
        assert_eq!(sniff_content_type(""), TEXT_PLAIN);
        assert_eq!(sniff_content_type("value = 4"), TEXT_PLAIN);
    }

    #[test]
    fn test_struct_value() {
        let encoded = encode(Json(my()).into_returned());
        assert_eq!(encoded.status, 200);
        assert_eq!(encoded.content_type, Some(APPLICATION_JSON));
        assert_eq!(encoded.body, br#"{"A":1,"B":"Hello"}"#);
    }

    #[test]
    fn test_struct_reference() {
        let encoded = encode(Some(Json(my())).into_returned());
        assert_eq!(encoded.body, br#"{"A":1,"B":"Hello"}"#);

        let encoded = encode(None::<Json<MyStruct>>.into_returned());
        assert_eq!(encoded.status, 500);
        assert_eq!(encoded.content_type, Some(TEXT_PLAIN));
        let body = String::from_utf8(encoded.body).unwrap();
        assert!(body.starts_with("Serialization error"));
        assert!(body.contains("MyStruct"));
    }

    #[test]
    fn test_serializer_failure() {
        // Non-string map keys cannot be represented in JSON.
        let mut map = BTreeMap::new();
        map.insert((1, 2), "x");
        let encoded = encode(Json(map).into_returned());
        assert_eq!(encoded.status, 500);
    }

    #[test]
    fn test_empty() {
        let encoded = encode(().into_returned());
        assert_eq!(
            encoded,
            EncodedResponse {
                status: 200,
                content_type: None,
                body: Vec::new()
            }
        );
    }

    #[test]
    fn test_result_outputs() {
        let ok: Result<String, String> = Ok("fine".into());
        assert_eq!(encode(ok.into_returned()).status, 200);

        let err: Result<String, String> = Err("Expecting GET parameter 'value'".into());
        let encoded = encode(err.into_returned());
        assert_eq!(encoded.status, 500);
        assert_eq!(encoded.body, b"Expecting GET parameter 'value'");

        let unit: Result<(), std::io::Error> = Ok(());
        assert_eq!(encode(unit.into_returned()).body, b"");
    }

    #[test]
    fn test_return_kinds() {
        assert_eq!(<()>::returns(), vec![]);
        assert_eq!(String::returns(), vec![ReturnKind::Text]);
        assert_eq!(
            <Result<(), String>>::returns(),
            vec![ReturnKind::Error]
        );
        assert_eq!(
            <Result<&'static str, String>>::returns(),
            vec![ReturnKind::Text, ReturnKind::Error]
        );
        assert_eq!(
            <(String, String)>::returns(),
            vec![ReturnKind::Text, ReturnKind::Text]
        );
        assert_eq!(
            <((), String)>::returns(),
            vec![ReturnKind::Other("()"), ReturnKind::Text]
        );
        assert_eq!(
            <(String, ())>::returns(),
            vec![ReturnKind::Text, ReturnKind::Other("()")]
        );
        assert_eq!(i64::returns(), vec![ReturnKind::Other("i64")]);
        assert!(matches!(
            <Option<Json<MyStruct>>>::returns()[0],
            ReturnKind::StructRef(name) if name.ends_with("MyStruct")
        ));
    }

    #[test]
    fn test_into_http_response() {
        let response: HttpResponse = encode(Json(my()).into_returned()).into();
        assert_eq!(response.status, 200);
        assert_eq!(response.content_type(), Some(APPLICATION_JSON));

        let response: HttpResponse = encode(().into_returned()).into();
        assert!(response.content_type().is_none());
    }
}
