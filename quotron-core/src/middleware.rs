use std::sync::Arc;

use crate::provider::Provider;

/// A layer that wraps an inner [`Provider`] to add cross-cutting behavior
/// (rate limiting, health-based gating, ...).
///
/// Mirrors the teacher's `Middleware` trait, trimmed down: this workspace's
/// `Provider` is a closed four-method capability set rather than an
/// open-ended fan-out of per-field traits, so a middleware stack here is
/// just a linear chain of wrappers applied outermost-last.
pub trait Middleware: Send + Sync {
    /// Wrap `inner`, returning a provider that layers this middleware's
    /// behavior on top.
    fn apply(self: Box<Self>, inner: Arc<dyn Provider>) -> Arc<dyn Provider>;

    /// Human-readable name for logging/introspection.
    fn name(&self) -> &'static str;
}

/// Apply a stack of middleware to a base provider, outermost-first in the
/// `stack` slice (the first middleware wraps the raw connector; later ones
/// wrap the result of the previous wrap).
#[must_use]
pub fn apply_stack(base: Arc<dyn Provider>, stack: Vec<Box<dyn Middleware>>) -> Arc<dyn Provider> {
    stack.into_iter().fold(base, |inner, mw| {
        tracing::debug!(middleware = mw.name(), "applying middleware layer");
        mw.apply(inner)
    })
}
