//! Per-request context — namespace, deadline, and type-erased extensions.
//!
//! The dispatch pipeline builds one [`Context`] per request and threads it by
//! reference through the cache layer. The namespace lives in the extension
//! map and is resolved with [`crate::namespace::from_context`].

use std::{
    any::{Any, TypeId},
    collections::HashMap,
    time::Duration,
};

use thiserror::Error;
use tokio::time::Instant;

use crate::namespace::Namespace;

/// Type-erased extensions map, keyed by type.
#[derive(Default)]
pub struct Extensions {
    map: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl Extensions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, replacing any previous value of the same type.
    pub fn insert<T>(&mut self, value: T)
    where
        T: Send + Sync + 'static,
    {
        self.map.insert(TypeId::of::<T>(), Box::new(value));
    }

    pub fn get<T>(&self) -> Option<&T>
    where
        T: Send + Sync + 'static,
    {
        self.map
            .get(&TypeId::of::<T>())
            .and_then(|value| value.downcast_ref::<T>())
    }

    pub fn remove<T>(&mut self) -> Option<T>
    where
        T: Send + Sync + 'static,
    {
        self.map
            .remove(&TypeId::of::<T>())
            .and_then(|value| value.downcast::<T>().ok())
            .map(|value| *value)
    }
}

/// Returned when the context deadline has passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("request context deadline exceeded")]
pub struct DeadlineExceeded;

/// Per-request context.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use condcache::context::Context;
/// use condcache::namespace::{self, Namespace};
///
/// let ctx = Context::with_namespace(Namespace::new("ns1", "team-a"))
///     .with_timeout(Duration::from_secs(5));
///
/// assert_eq!(namespace::from_context(&ctx).unwrap().path(), "team-a/");
/// assert!(ctx.check_deadline().is_ok());
/// ```
#[derive(Default)]
pub struct Context {
    extensions: Extensions,
    deadline: Option<Instant>,
}

impl Context {
    /// Create an empty context with no namespace and no deadline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context already carrying `namespace`.
    pub fn with_namespace(namespace: Namespace) -> Self {
        let mut ctx = Self::new();
        ctx.extensions.insert(namespace);
        ctx
    }

    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Fails once the deadline, if any, has been reached.
    pub fn check_deadline(&self) -> Result<(), DeadlineExceeded> {
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(DeadlineExceeded),
            _ => Ok(()),
        }
    }

    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }
}
