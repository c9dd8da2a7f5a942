//! Handler classification.
//!
//! Every handler handed to the dispatcher reports a [`Signature`]: the kind
//! of each parameter and each return value. [`classify`] is a total
//! function from `(verb, signature)` to the pair of shapes the binder and
//! encoder work from, or a classification error. It runs once, at
//! registration.
//!
//! | parameters        | GET                 | POST                |
//! |-------------------|---------------------|---------------------|
//! | none              | `NoInput`           | `NoInput`           |
//! | `Params`          | `QueryOrFormParams` | `QueryOrFormParams` |
//! | `Body<T>`         | rejected            | `DecodedBodyStruct` |
//! | two or more       | rejected            | rejected            |
//!
//! Return lists accepted for both verbs: `()`, `(error)`, `(payload)` and
//! `(payload, error)`, where payload is a struct, a struct reference or a
//! string.

use crate::{Error, HttpMethod};
use std::fmt;

/// What the binder must produce for a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputShape {
    NoInput,
    QueryOrFormParams,
    DecodedBodyStruct,
}

/// Which payload a handler returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadShape {
    None,
    /// A struct value, `Json<T>`.
    Struct,
    /// A nullable reference to a struct, `Option<Json<T>>`.
    StructRef,
    /// A string, content type sniffed on encode.
    Text,
}

/// Payload shape plus whether an error can be returned alongside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OutputShape {
    pub payload: PayloadShape,
    pub fallible: bool,
}

impl OutputShape {
    pub const fn new(payload: PayloadShape, fallible: bool) -> Self {
        Self { payload, fallible }
    }

    /// All eight accepted combinations.
    pub fn all() -> [OutputShape; 8] {
        use PayloadShape::*;
        [
            Self::new(None, false),
            Self::new(None, true),
            Self::new(Struct, false),
            Self::new(Struct, true),
            Self::new(StructRef, false),
            Self::new(StructRef, true),
            Self::new(Text, false),
            Self::new(Text, true),
        ]
    }
}

/// Kind of a single handler parameter, as reported by its type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// The request parameter map.
    Params,
    /// A struct decoded from the request body; carries the type name.
    BodyStruct(&'static str),
}

/// Kind of a single handler return value, as reported by its type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnKind {
    Struct(&'static str),
    StructRef(&'static str),
    Text,
    Error,
    /// Any other concrete type; never accepted.
    Other(&'static str),
}

impl ReturnKind {
    fn payload_shape(self) -> Option<PayloadShape> {
        match self {
            ReturnKind::Struct(_) => Some(PayloadShape::Struct),
            ReturnKind::StructRef(_) => Some(PayloadShape::StructRef),
            ReturnKind::Text => Some(PayloadShape::Text),
            ReturnKind::Error | ReturnKind::Other(_) => None,
        }
    }
}

/// Static description of a handler: parameter and return kinds in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub params: Vec<ParamKind>,
    pub returns: Vec<ReturnKind>,
}

impl Signature {
    pub fn new(params: Vec<ParamKind>, returns: Vec<ReturnKind>) -> Self {
        Self { params, returns }
    }
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamKind::Params => f.write_str("Params"),
            ParamKind::BodyStruct(name) => write!(f, "Body<{}>", short_name(name)),
        }
    }
}

impl fmt::Display for ReturnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReturnKind::Struct(name) => f.write_str(short_name(name)),
            ReturnKind::StructRef(name) => write!(f, "*{}", short_name(name)),
            ReturnKind::Text => f.write_str("string"),
            ReturnKind::Error => f.write_str("error"),
            ReturnKind::Other(name) => f.write_str(short_name(name)),
        }
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: Vec<String> = self.params.iter().map(ToString::to_string).collect();
        write!(f, "fn({})", params.join(", "))?;
        match self.returns.as_slice() {
            [] => Ok(()),
            [single] => write!(f, " -> {}", single),
            many => {
                let returns: Vec<String> = many.iter().map(ToString::to_string).collect();
                write!(f, " -> ({})", returns.join(", "))
            }
        }
    }
}

// `my_crate::models::MyStruct` -> `MyStruct`; generic arguments are kept.
fn short_name(name: &str) -> &str {
    let head = name.split('<').next().unwrap_or(name);
    match head.rfind("::") {
        Some(idx) => &name[idx + 2..],
        None => name,
    }
}

/// Classify a handler signature for the given verb.
///
/// Only GET and POST handlers are registrable.
pub fn classify(method: HttpMethod, signature: &Signature) -> Result<(InputShape, OutputShape), Error> {
    let input = classify_input(method, signature)?;
    let output = classify_output(signature)?;
    Ok((input, output))
}

fn classify_input(method: HttpMethod, signature: &Signature) -> Result<InputShape, Error> {
    match (method, signature.params.as_slice()) {
        (HttpMethod::GET | HttpMethod::POST, []) => Ok(InputShape::NoInput),
        // The parameter map wins over body decoding for POST as well.
        (HttpMethod::GET | HttpMethod::POST, [ParamKind::Params]) => {
            Ok(InputShape::QueryOrFormParams)
        }
        (HttpMethod::POST, [ParamKind::BodyStruct(_)]) => Ok(InputShape::DecodedBodyStruct),
        (HttpMethod::GET, [ParamKind::BodyStruct(_)]) => Err(Error::classification(
            signature,
            "GET handlers cannot decode a request body; accept Params instead",
        )),
        (HttpMethod::GET | HttpMethod::POST, params) => Err(Error::classification(
            signature,
            format!("expected at most one parameter, found {}", params.len()),
        )),
        (other, _) => Err(Error::classification(
            signature,
            format!("handlers can only be registered for GET or POST, not {}", other),
        )),
    }
}

fn classify_output(signature: &Signature) -> Result<OutputShape, Error> {
    let returns = signature.returns.as_slice();

    if let Some(ReturnKind::Other(name)) = returns
        .iter()
        .find(|kind| matches!(kind, ReturnKind::Other(_)))
    {
        return Err(Error::classification(
            signature,
            format!(
                "unsupported payload type {}; return a struct, a struct reference or a string",
                short_name(name)
            ),
        ));
    }

    match returns {
        [] => Ok(OutputShape::new(PayloadShape::None, false)),
        [ReturnKind::Error] => Ok(OutputShape::new(PayloadShape::None, true)),
        [payload] => payload_of(signature, *payload).map(|p| OutputShape::new(p, false)),
        [payload, ReturnKind::Error] => {
            payload_of(signature, *payload).map(|p| OutputShape::new(p, true))
        }
        [_, _] => Err(Error::classification(
            signature,
            "a second return value must be the error",
        )),
        many => Err(Error::classification(
            signature,
            format!("expected at most two return values, found {}", many.len()),
        )),
    }
}

fn payload_of(signature: &Signature, kind: ReturnKind) -> Result<PayloadShape, Error> {
    kind.payload_shape().ok_or_else(|| {
        Error::classification(signature, "the error must be the last return value")
    })
}
