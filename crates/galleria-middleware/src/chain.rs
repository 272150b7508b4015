//! Effective middleware chain for one endpoint.
//!
//! The chain is composed once at registration from the global, controller
//! and endpoint layers, in that order. A unit whose name already appeared in
//! an earlier position is dropped, so shared units run once per request.
//!
//! ```text
//! global ─┐
//! controller ─┼─► dedupe by name ─► [BEFORE..] handler [AFTER..]
//! endpoint ─┘
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use galleria_core::ApiError;

use crate::context::{RequestContext, RequestMeta};
use crate::middleware::{Action, AfterFn, BeforeFn, Flow, MiddlewareKind, MiddlewareUnit};
use crate::reply::Reply;

/// The ordered BEFORE and AFTER units of an endpoint.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use galleria_middleware::{Flow, MiddlewareChain, MiddlewareUnit};
///
/// let auth = Arc::new(MiddlewareUnit::before("auth", |ctx| async move { Ok(Flow::Continue(ctx)) }));
/// let stamp = Arc::new(MiddlewareUnit::after("stamp", |_meta, reply| async move { Ok(reply) }));
///
/// let chain = MiddlewareChain::compose(&[&[Arc::clone(&auth)], &[auth, stamp]]);
/// assert_eq!(chain.names(), vec!["auth", "stamp"]);
/// ```
#[derive(Clone, Default)]
pub struct MiddlewareChain {
    before: Vec<(String, BeforeFn)>,
    after: Vec<(String, AfterFn)>,
}

impl std::fmt::Debug for MiddlewareChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MiddlewareChain")
            .field("before", &self.before.iter().map(|(n, _)| n).collect::<Vec<_>>())
            .field("after", &self.after.iter().map(|(n, _)| n).collect::<Vec<_>>())
            .finish()
    }
}

impl MiddlewareChain {
    /// Flattens the layers into one chain, keeping the first occurrence of
    /// each unit name.
    #[must_use]
    pub fn compose(layers: &[&[Arc<MiddlewareUnit>]]) -> Self {
        let mut seen = HashSet::new();
        let mut chain = Self::default();

        for unit in layers.iter().flat_map(|layer| layer.iter()) {
            if !seen.insert(unit.name().to_string()) {
                continue;
            }
            match unit.action() {
                Action::Before(f) => chain.before.push((unit.name().to_string(), Arc::clone(f))),
                Action::After(f) => chain.after.push((unit.name().to_string(), Arc::clone(f))),
            }
        }

        chain
    }

    /// Returns unit names: BEFORE units first, then AFTER units.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.before
            .iter()
            .map(|(name, _)| name.as_str())
            .chain(self.after.iter().map(|(name, _)| name.as_str()))
            .collect()
    }

    /// Returns the number of units of a kind.
    #[must_use]
    pub fn count(&self, kind: MiddlewareKind) -> usize {
        match kind {
            MiddlewareKind::Before => self.before.len(),
            MiddlewareKind::After => self.after.len(),
        }
    }

    /// Runs the BEFORE units in order.
    ///
    /// Stops at the first unit that responds or fails.
    pub async fn run_before(&self, mut ctx: RequestContext) -> Result<Flow, ApiError> {
        for (name, unit) in &self.before {
            tracing::trace!(middleware = %name, "before");
            match unit(ctx).await? {
                Flow::Continue(next) => ctx = next,
                Flow::Respond(reply) => {
                    tracing::debug!(middleware = %name, status = reply.status().as_u16(), "short-circuited");
                    return Ok(Flow::Respond(reply));
                }
            }
        }
        Ok(Flow::Continue(ctx))
    }

    /// Runs the AFTER units in order, threading the reply through each.
    pub async fn run_after(&self, meta: &RequestMeta, mut reply: Reply) -> Result<Reply, ApiError> {
        for (name, unit) in &self.after {
            tracing::trace!(middleware = %name, "after");
            reply = unit(meta.clone(), reply).await?;
        }
        Ok(reply)
    }
}
