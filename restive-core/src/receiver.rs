//! Handlers addressed by receiver and method name.
//!
//! A [`Receiver`] publishes its operations as a [`MethodSet`], a table from
//! method name to [`Callable`]. Registering `(receiver, "Name")` resolves
//! the name once and from then on the method is an ordinary handler.
//!
//! ```
//! use restive_core::{MethodSet, Params, Receiver};
//! use std::sync::Arc;
//!
//! struct Greeter {
//!     greeting: String,
//! }
//!
//! impl Receiver for Greeter {
//!     fn methods(self: Arc<Self>) -> MethodSet {
//!         let this = self.clone();
//!         MethodSet::new::<Self>().method("Greet", move |params: Params| {
//!             format!("{}, {}", this.greeting, params.get("name").unwrap_or("world"))
//!         })
//!     }
//! }
//!
//! let methods = Arc::new(Greeter { greeting: "Hello".into() }).methods();
//! assert!(methods.contains("Greet"));
//! ```

use crate::handler::{Callable, IntoHandler};
use crate::Error;
use std::collections::BTreeMap;
use std::sync::Arc;

/// An object exposing named handler methods.
pub trait Receiver: Send + Sync + 'static {
    fn methods(self: Arc<Self>) -> MethodSet;
}

/// Name to callable table for one receiver.
#[derive(Debug, Clone)]
pub struct MethodSet {
    receiver: &'static str,
    methods: BTreeMap<String, Callable>,
}

impl MethodSet {
    /// Empty set for receiver type `R`.
    pub fn new<R: ?Sized>() -> Self {
        Self::named(std::any::type_name::<R>())
    }

    pub fn named(receiver: &'static str) -> Self {
        Self {
            receiver,
            methods: BTreeMap::new(),
        }
    }

    /// Add a method. A later method with the same name replaces the earlier one.
    pub fn method<Args, H>(mut self, name: impl Into<String>, handler: H) -> Self
    where
        H: IntoHandler<Args>,
    {
        self.methods.insert(name.into(), handler.into_callable());
        self
    }

    pub fn receiver(&self) -> &'static str {
        self.receiver
    }

    pub fn contains(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.methods.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// Look up `name`, failing with [`Error::MethodNotFound`].
    pub fn resolve(&self, name: &str) -> Result<Callable, Error> {
        self.methods
            .get(name)
            .cloned()
            .ok_or_else(|| self.not_found(name, "no method with that name"))
    }

    pub(crate) fn not_found(&self, name: &str, reason: impl Into<String>) -> Error {
        Error::MethodNotFound {
            receiver: self.receiver.to_string(),
            method: name.to_string(),
            reason: reason.into(),
        }
    }
}
