//! Seams the engine exposes to its callers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Decides whether a (resource, policy) verdict is forced to `Skipped`.
///
/// Baselines and inline annotations live outside the engine; they plug in here.
pub trait SuppressionHook: Send + Sync {
    fn should_skip(&self, resource_id: &str, policy_id: &str) -> bool;
}

impl<F> SuppressionHook for F
where
    F: Fn(&str, &str) -> bool + Send + Sync,
{
    fn should_skip(&self, resource_id: &str, policy_id: &str) -> bool {
        self(resource_id, policy_id)
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoSuppression;

impl SuppressionHook for NoSuppression {
    fn should_skip(&self, _resource_id: &str, _policy_id: &str) -> bool {
        false
    }
}

/// Cooperative cancellation flag, checked between units of work.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}
