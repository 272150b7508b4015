//! Named BEFORE/AFTER middleware units.
//!
//! A [`MiddlewareUnit`] is a reusable, named async step. BEFORE units run
//! ahead of input validation and own the [`RequestContext`] while they run:
//! they hand it back through [`Flow::Continue`] or end the request early with
//! [`Flow::Respond`]. AFTER units run once the handler has produced a
//! [`Reply`] and may amend or replace it.
//!
//! # Example
//!
//! ```
//! use galleria_middleware::{Flow, MiddlewareKind, MiddlewareUnit};
//!
//! let audit = MiddlewareUnit::before("audit", |ctx| async move {
//!     tracing::info!(path = ctx.path(), "audited");
//!     Ok(Flow::Continue(ctx))
//! });
//!
//! assert_eq!(audit.name(), "audit");
//! assert_eq!(audit.kind(), MiddlewareKind::Before);
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use galleria_core::ApiError;
use indexmap::IndexMap;
use parking_lot::RwLock;
use thiserror::Error;

use crate::context::{RequestContext, RequestMeta};
use crate::reply::Reply;
use crate::types::BoxFuture;

/// When a unit runs relative to the handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MiddlewareKind {
    /// Before input validation and the handler.
    Before,
    /// After the handler produced a reply.
    After,
}

impl fmt::Display for MiddlewareKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Before => write!(f, "before"),
            Self::After => write!(f, "after"),
        }
    }
}

/// Outcome of a BEFORE unit.
#[derive(Debug)]
pub enum Flow {
    /// Continue with the (possibly enriched) context.
    Continue(RequestContext),
    /// Stop here and send this reply; later units and the handler are skipped.
    Respond(Reply),
}

/// Boxed BEFORE function.
pub type BeforeFn =
    Arc<dyn Fn(RequestContext) -> BoxFuture<'static, Result<Flow, ApiError>> + Send + Sync>;

/// Boxed AFTER function.
pub type AfterFn =
    Arc<dyn Fn(RequestMeta, Reply) -> BoxFuture<'static, Result<Reply, ApiError>> + Send + Sync>;

#[derive(Clone)]
pub(crate) enum Action {
    Before(BeforeFn),
    After(AfterFn),
}

/// A named middleware step.
#[derive(Clone)]
pub struct MiddlewareUnit {
    name: String,
    action: Action,
}

impl fmt::Debug for MiddlewareUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareUnit")
            .field("name", &self.name)
            .field("kind", &self.kind())
            .finish()
    }
}

impl MiddlewareUnit {
    /// Creates a BEFORE unit.
    pub fn before<F, Fut>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Flow, ApiError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            action: Action::Before(Arc::new(move |ctx| Box::pin(f(ctx)))),
        }
    }

    /// Creates an AFTER unit.
    pub fn after<F, Fut>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(RequestMeta, Reply) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Reply, ApiError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            action: Action::After(Arc::new(move |meta, reply| Box::pin(f(meta, reply)))),
        }
    }

    /// Returns the unit's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns when the unit runs.
    #[must_use]
    pub fn kind(&self) -> MiddlewareKind {
        match self.action {
            Action::Before(_) => MiddlewareKind::Before,
            Action::After(_) => MiddlewareKind::After,
        }
    }

    pub(crate) fn action(&self) -> &Action {
        &self.action
    }
}

/// Errors raised by the [`MiddlewareRegistry`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MiddlewareError {
    /// A unit with this name is already registered.
    #[error("middleware '{0}' is already registered")]
    Duplicate(String),
    /// No unit with this name is registered.
    #[error("middleware '{0}' is not registered")]
    Unknown(String),
}

/// Process-wide catalogue of named units.
///
/// Units are usually passed directly to endpoint and controller builders;
/// the registry exists so that shared units can be declared once and looked
/// up by name, and so that two units cannot silently share a name.
#[derive(Debug, Default)]
pub struct MiddlewareRegistry {
    units: RwLock<IndexMap<String, Arc<MiddlewareUnit>>>,
}

impl MiddlewareRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a unit and returns the shared handle.
    pub fn register(&self, unit: MiddlewareUnit) -> Result<Arc<MiddlewareUnit>, MiddlewareError> {
        let mut units = self.units.write();
        if units.contains_key(unit.name()) {
            return Err(MiddlewareError::Duplicate(unit.name().to_string()));
        }
        let unit = Arc::new(unit);
        units.insert(unit.name().to_string(), Arc::clone(&unit));
        Ok(unit)
    }

    /// Looks up a unit by name.
    pub fn get(&self, name: &str) -> Result<Arc<MiddlewareUnit>, MiddlewareError> {
        self.units
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| MiddlewareError::Unknown(name.to_string()))
    }

    /// Returns registered names in registration order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.units.read().keys().cloned().collect()
    }

    /// Returns the number of registered units.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.read().len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.read().is_empty()
    }
}
