//! Health and readiness hooks.
//!
//! Components register named async checks with a [`HealthRegistry`]. The
//! server answers `/healthz` with the conjunction of all health hooks and
//! `/readyz` with the conjunction of all health *and* readiness hooks. An
//! empty registry is healthy and ready.
//!
//! While a server drains it marks the registry as draining, which makes it
//! unready regardless of the hooks so load balancers stop routing to it.
//!
//! # Example
//!
//! ```rust
//! use galleria_server::{sync_check, HealthRegistry};
//!
//! # tokio_test::block_on(async {
//! let registry = HealthRegistry::new();
//! registry.register_health_hook("memory", sync_check(|| true));
//! registry.register_readiness_hook("warmup", || async { false });
//!
//! assert!(registry.check_health().await);
//! assert!(!registry.check_readiness().await);
//!
//! registry.unregister_readiness_hook("warmup");
//! assert!(registry.check_readiness().await);
//! # });
//! ```

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use futures_util::future::join_all;
use galleria_middleware::BoxFuture;
use indexmap::IndexMap;
use parking_lot::RwLock;

/// A named async check.
pub type HealthHook = Arc<dyn Fn() -> BoxFuture<'static, bool> + Send + Sync>;

/// Registry of health and readiness hooks.
#[derive(Default)]
pub struct HealthRegistry {
    health: RwLock<IndexMap<String, HealthHook>>,
    readiness: RwLock<IndexMap<String, HealthHook>>,
    draining: AtomicBool,
}

impl std::fmt::Debug for HealthRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthRegistry")
            .field("health", &self.health.read().keys().collect::<Vec<_>>())
            .field("readiness", &self.readiness.read().keys().collect::<Vec<_>>())
            .field("draining", &self.is_draining())
            .finish()
    }
}

impl HealthRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the process-wide registry.
    ///
    /// Servers use their own registry unless given this one explicitly.
    pub fn global() -> Arc<Self> {
        static GLOBAL: OnceLock<Arc<HealthRegistry>> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(Self::new())))
    }

    /// Registers a health hook, replacing any hook with the same name.
    pub fn register_health_hook<F, Fut>(&self, name: impl Into<String>, hook: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        let name = name.into();
        tracing::debug!(hook = %name, "registering health hook");
        self.health.write().insert(name, boxed(hook));
    }

    /// Removes a health hook. Returns `true` if it existed.
    pub fn unregister_health_hook(&self, name: &str) -> bool {
        self.health.write().shift_remove(name).is_some()
    }

    /// Registers a readiness hook, replacing any hook with the same name.
    pub fn register_readiness_hook<F, Fut>(&self, name: impl Into<String>, hook: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        let name = name.into();
        tracing::debug!(hook = %name, "registering readiness hook");
        self.readiness.write().insert(name, boxed(hook));
    }

    /// Removes a readiness hook. Returns `true` if it existed.
    pub fn unregister_readiness_hook(&self, name: &str) -> bool {
        self.readiness.write().shift_remove(name).is_some()
    }

    /// Returns `true` if every health hook passes.
    pub async fn check_health(&self) -> bool {
        let hooks: Vec<_> = self.health.read().iter().map(clone_entry).collect();
        run_all("health", hooks).await
    }

    /// Returns `true` if not draining and every health and readiness hook passes.
    pub async fn check_readiness(&self) -> bool {
        if self.is_draining() {
            return false;
        }
        if !self.check_health().await {
            return false;
        }
        let hooks: Vec<_> = self.readiness.read().iter().map(clone_entry).collect();
        run_all("readiness", hooks).await
    }

    /// Marks the process as draining (or not).
    pub fn set_draining(&self, draining: bool) {
        self.draining.store(draining, Ordering::SeqCst);
    }

    /// Returns `true` while draining.
    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::SeqCst)
    }
}

/// Adapts a synchronous check into a hook.
pub fn sync_check<F>(check: F) -> impl Fn() -> std::future::Ready<bool> + Send + Sync + 'static
where
    F: Fn() -> bool + Send + Sync + 'static,
{
    move || std::future::ready(check())
}

fn boxed<F, Fut>(hook: F) -> HealthHook
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = bool> + Send + 'static,
{
    Arc::new(move || Box::pin(hook()))
}

fn clone_entry((name, hook): (&String, &HealthHook)) -> (String, HealthHook) {
    (name.clone(), Arc::clone(hook))
}

async fn run_all(kind: &'static str, hooks: Vec<(String, HealthHook)>) -> bool {
    let results = join_all(hooks.iter().map(|(_, hook)| hook())).await;
    let mut passed = true;
    for ((name, _), ok) in hooks.iter().zip(results) {
        if !ok {
            tracing::warn!(hook = %name, kind, "check failed");
            passed = false;
        }
    }
    passed
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[tokio::test]
    async fn test_empty_registry_is_healthy_and_ready() {
        let registry = HealthRegistry::new();
        assert!(registry.check_health().await);
        assert!(registry.check_readiness().await);
    }

    #[tokio::test]
    async fn test_failing_health_hook_fails_readiness() {
        let registry = HealthRegistry::new();
        registry.register_health_hook("db", sync_check(|| false));

        assert!(!registry.check_health().await);
        assert!(!registry.check_readiness().await);

        assert!(registry.unregister_health_hook("db"));
        assert!(!registry.unregister_health_hook("db"));
        assert!(registry.check_readiness().await);
    }

    #[tokio::test]
    async fn test_readiness_hook_does_not_affect_health() {
        let registry = HealthRegistry::new();
        registry.register_readiness_hook("cache", sync_check(|| false));

        assert!(registry.check_health().await);
        assert!(!registry.check_readiness().await);
    }

    #[tokio::test]
    async fn test_register_replaces_same_name() {
        let registry = HealthRegistry::new();
        registry.register_health_hook("db", sync_check(|| false));
        registry.register_health_hook("db", sync_check(|| true));

        assert!(registry.check_health().await);
    }

    #[tokio::test]
    async fn test_draining_is_unready() {
        let registry = HealthRegistry::new();
        registry.set_draining(true);

        assert!(registry.check_health().await);
        assert!(!registry.check_readiness().await);

        registry.set_draining(false);
        assert!(registry.check_readiness().await);
    }

    #[tokio::test]
    async fn test_every_hook_runs() {
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = HealthRegistry::new();
        for name in ["a", "b", "c"] {
            let calls = Arc::clone(&calls);
            registry.register_health_hook(name, move || {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    name != "b"
                }
            });
        }

        assert!(!registry.check_health().await);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_global_is_shared() {
        let a = HealthRegistry::global();
        let b = HealthRegistry::global();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
