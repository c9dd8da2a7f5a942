// Handler signatures and type erasure
//
// Plain functions and closures become handlers through `IntoHandler`. Each
// parameter type implements `Argument` and the return type implements
// `HandlerOutput`, so every handler can describe itself as a `Signature`
// before it is ever called. The function itself is then erased into a
// `Callable` that the dispatcher stores next to the classified shapes.

use crate::binder::{self, BoundArguments};
use crate::encoder::{self, EncodedResponse, HandlerOutput, Returned};
use crate::form::Params;
use crate::shape::{InputShape, OutputShape, ParamKind, Signature, classify};
use crate::{Error, HttpMethod, HttpRequest};
use serde::de::DeserializeOwned;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// A struct decoded from the request body.
///
/// Only valid for POST handlers. The body is decoded as JSON unless the
/// request declares `application/x-www-form-urlencoded`.
///
/// ```
/// use restive_core::Body;
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct MyStruct {
///     #[serde(rename = "A")]
///     a: i32,
/// }
///
/// let handler = |Body(data): Body<MyStruct>| format!("got {}", data.a);
/// # let _ = handler;
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Body<T>(pub T);

impl<T> Body<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for Body<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// A handler parameter type.
pub trait Argument: Sized + Send + 'static {
    /// Decode target used when the parameter is read from the body.
    type Decoded: DeserializeOwned;

    fn kind() -> ParamKind;

    fn from_bound(bound: BoundArguments<Self::Decoded>) -> Result<Self, Error>;
}

impl Argument for Params {
    type Decoded = ();

    fn kind() -> ParamKind {
        ParamKind::Params
    }

    fn from_bound(bound: BoundArguments<()>) -> Result<Self, Error> {
        match bound {
            BoundArguments::Params(params) => Ok(params),
            other => Err(Error::Binding(format!(
                "expected request parameters, bound {:?}",
                other
            ))),
        }
    }
}

impl<T: DeserializeOwned + Send + 'static> Argument for Body<T> {
    type Decoded = T;

    fn kind() -> ParamKind {
        ParamKind::BodyStruct(std::any::type_name::<T>())
    }

    fn from_bound(bound: BoundArguments<T>) -> Result<Self, Error> {
        match bound {
            BoundArguments::Body(value) => Ok(Body(value)),
            BoundArguments::Params(_) => Err(Error::Binding(
                "expected a decoded body, bound request parameters".to_string(),
            )),
            BoundArguments::Empty => Err(Error::Binding(
                "expected a decoded body, bound nothing".to_string(),
            )),
        }
    }
}

type InvokeFn = dyn Fn(InputShape, &HttpRequest) -> Result<Returned, Error> + Send + Sync;

/// Type-erased handler plus the signature it was built from.
///
/// Cloning is cheap; the function lives behind an `Arc`.
#[derive(Clone)]
pub struct Callable {
    signature: Signature,
    invoke: Arc<InvokeFn>,
}

impl Callable {
    pub fn new<F>(signature: Signature, invoke: F) -> Self
    where
        F: Fn(InputShape, &HttpRequest) -> Result<Returned, Error> + Send + Sync + 'static,
    {
        Self {
            signature,
            invoke: Arc::new(invoke),
        }
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Bind arguments for `shape` from the request and run the function.
    pub fn call(&self, shape: InputShape, request: &HttpRequest) -> Result<Returned, Error> {
        (self.invoke)(shape, request)
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callable")
            .field("signature", &self.signature.to_string())
            .finish()
    }
}

/// Conversion from a function into a [`Callable`].
///
/// `Args` is the tuple of parameter types and only exists to keep the
/// implementations for different arities apart.
pub trait IntoHandler<Args>: Send + Sync + 'static {
    fn into_callable(self) -> Callable;
}

impl<F, R> IntoHandler<()> for F
where
    F: Fn() -> R + Send + Sync + 'static,
    R: HandlerOutput,
{
    fn into_callable(self) -> Callable {
        let signature = Signature::new(Vec::new(), R::returns());
        let f = self;
        Callable::new(signature, move |_shape, _request| Ok(f().into_returned()))
    }
}

impl<F, A, R> IntoHandler<(A,)> for F
where
    F: Fn(A) -> R + Send + Sync + 'static,
    A: Argument,
    R: HandlerOutput,
{
    fn into_callable(self) -> Callable {
        let signature = Signature::new(vec![A::kind()], R::returns());
        let f = self;
        Callable::new(signature, move |shape, request| {
            let bound = binder::bind::<A::Decoded>(shape, request)?;
            let arg = A::from_bound(bound)?;
            Ok(f(arg).into_returned())
        })
    }
}

// Two-parameter functions are accepted by the type system so that
// registration can report them; classification always refuses them.
impl<F, A, B, R> IntoHandler<(A, B)> for F
where
    F: Fn(A, B) -> R + Send + Sync + 'static,
    A: Argument,
    B: Argument,
    R: HandlerOutput,
{
    fn into_callable(self) -> Callable {
        let signature = Signature::new(vec![A::kind(), B::kind()], R::returns());
        let reported = signature.clone();
        Callable::new(signature, move |_shape, _request| {
            Err(Error::classification(
                &reported,
                "expected at most one parameter, found 2",
            ))
        })
    }
}

/// A classified, ready-to-dispatch handler.
#[derive(Debug, Clone)]
pub struct HandlerDescriptor {
    pub method: HttpMethod,
    pub path: String,
    pub input: InputShape,
    pub output: OutputShape,
    pub callable: Callable,
}

impl HandlerDescriptor {
    /// Classify `callable` for `method`; fails if the signature is unsupported.
    pub fn new(
        method: HttpMethod,
        path: impl Into<String>,
        callable: Callable,
    ) -> Result<Self, Error> {
        let (input, output) = classify(method, callable.signature())?;
        Ok(Self {
            method,
            path: path.into(),
            input,
            output,
            callable,
        })
    }

    pub fn signature(&self) -> &Signature {
        self.callable.signature()
    }

    /// Bind, call and encode. Binding failures become plain-text 500s.
    pub fn invoke(&self, request: &HttpRequest) -> EncodedResponse {
        match self.callable.call(self.input, request) {
            Ok(returned) => encoder::encode(returned),
            Err(err) => EncodedResponse::from_error(&err),
        }
    }
}
