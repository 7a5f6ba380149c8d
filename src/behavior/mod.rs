//! Named lifecycle hooks ("behaviors") and named display templates.
//!
//! Hooks are registered under names like `Reads-PostOperation` and run at fixed pipeline stages.
//! An unregistered name is a no-op.

mod template;

pub use template::{render, TemplateError};

use crate::context::RequestContext;
use crate::error::AppError;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

#[async_trait]
pub trait Behavior: Send + Sync {
    async fn run(&self, ctx: &mut RequestContext) -> Result<(), AppError>;
}

#[async_trait]
impl<F> Behavior for F
where
    F: Fn(&mut RequestContext) -> Result<(), AppError> + Send + Sync,
{
    async fn run(&self, ctx: &mut RequestContext) -> Result<(), AppError> {
        self(ctx)
    }
}

#[derive(Default)]
pub struct BehaviorRegistry {
    behaviors: RwLock<HashMap<String, Arc<dyn Behavior>>>,
    templates: RwLock<HashMap<String, String>>,
}

impl BehaviorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace the hook for `name`.
    pub fn set_behavior(&self, name: impl Into<String>, behavior: impl Behavior + 'static) {
        self.set_behavior_arc(name, Arc::new(behavior));
    }

    pub fn set_behavior_arc(&self, name: impl Into<String>, behavior: Arc<dyn Behavior>) {
        self.behaviors
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), behavior);
    }

    pub fn behavior(&self, name: &str) -> Option<Arc<dyn Behavior>> {
        self.behaviors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    pub fn has_behavior(&self, name: &str) -> bool {
        self.behavior(name).is_some()
    }

    /// Run the hook registered for `name`; succeed immediately if there is none.
    pub async fn run_behavior(&self, name: &str, ctx: &mut RequestContext) -> Result<(), AppError> {
        // clone out so the lock is not held across the await
        let Some(hook) = self.behavior(name) else {
            return Ok(());
        };
        tracing::trace!(hook = name, request_id = %ctx.request_id, "running behavior");
        hook.run(ctx).await
    }

    pub fn set_template(&self, name: impl Into<String>, template: impl Into<String>) {
        self.templates
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), template.into());
    }

    pub fn template(&self, name: &str) -> Option<String> {
        self.templates
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Render the template registered for `name` (or `fallback` if none is) against `data`.
    ///
    /// A template that fails to render yields the rendered fallback, then the empty string.
    pub fn process_template(&self, name: &str, data: &Value, fallback: Option<&str>) -> String {
        let rendered_fallback = || fallback.and_then(|f| render(f, data).ok()).unwrap_or_default();
        match self.template(name) {
            Some(t) => match render(&t, data) {
                Ok(s) => s,
                Err(e) => {
                    tracing::warn!(template = name, error = %e, "template failed to render");
                    rendered_fallback()
                }
            },
            None => rendered_fallback(),
        }
    }
}
