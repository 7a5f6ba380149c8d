//! Named authorization predicates and the table-driven per-operation check.
//!
//! A predicate denies by calling [`RequestContext::deny`]; returning an error aborts the check.
//! Nothing here ever sets a context back to authorized.

mod builtin;

pub use builtin::{Allow, Deny, Mine, MyCustomer};

use crate::config::AuthorizationMode;
use crate::context::RequestContext;
use crate::error::AppError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

#[async_trait]
pub trait Authorizer: Send + Sync {
    async fn authorize(&self, ctx: &mut RequestContext) -> Result<(), AppError>;
}

#[async_trait]
impl<F> Authorizer for F
where
    F: Fn(&mut RequestContext) -> Result<(), AppError> + Send + Sync,
{
    async fn authorize(&self, ctx: &mut RequestContext) -> Result<(), AppError> {
        self(ctx)
    }
}

pub struct AuthorizerRegistry {
    mode: AuthorizationMode,
    authorizers: RwLock<HashMap<String, Arc<dyn Authorizer>>>,
}

impl AuthorizerRegistry {
    pub fn new(mode: AuthorizationMode) -> Self {
        let registry = AuthorizerRegistry {
            mode,
            authorizers: RwLock::new(HashMap::new()),
        };
        if mode == AuthorizationMode::SimpleOwnership {
            registry.set_authorizer("Allow", Allow);
            registry.set_authorizer("Deny", Deny);
            registry.set_authorizer("Mine", Mine);
            registry.set_authorizer("MyCustomer", MyCustomer);
        }
        registry
    }

    pub fn mode(&self) -> AuthorizationMode {
        self.mode
    }

    /// Register or replace the predicate for `name`.
    pub fn set_authorizer(&self, name: impl Into<String>, authorizer: impl Authorizer + 'static) {
        self.authorizers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), Arc::new(authorizer));
    }

    pub fn authorizer(&self, name: &str) -> Option<Arc<dyn Authorizer>> {
        self.authorizers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Run the named predicate against the context.
    ///
    /// With a record set and no single record, the predicate runs once per record, in order, with
    /// `ctx.record` pointing at that record; the scan stops at the first error or denial.
    pub async fn authorize(&self, name: &str, ctx: &mut RequestContext) -> Result<(), AppError> {
        if self.mode == AuthorizationMode::Disabled || ctx.authorize_override {
            return Ok(());
        }
        let Some(predicate) = self.authorizer(name) else {
            tracing::trace!(authorizer = name, "no authorizer registered");
            return Ok(());
        };

        if ctx.record.is_some() || ctx.records.is_none() {
            return predicate.authorize(ctx).await;
        }

        let count = ctx.records.as_ref().map_or(0, Vec::len);
        let mut outcome = Ok(());
        for i in 0..count {
            let Some(record) = ctx.records.as_ref().and_then(|r| r.get(i)).cloned() else {
                break;
            };
            ctx.record = Some(record);
            if let Err(e) = predicate.authorize(ctx).await {
                outcome = Err(e);
                break;
            }
            // per-record edits made by the predicate stay with that record
            if let (Some(updated), Some(slot)) = (ctx.record.take(), ctx.records.as_mut().and_then(|r| r.get_mut(i))) {
                *slot = updated;
            }
            if !ctx.is_authorized() {
                break;
            }
        }
        ctx.record = None;
        outcome
    }

    /// Look up the caller's role in the entity's authorizer table and run what it names for `operation`.
    pub async fn authorize_request(&self, operation: &str, ctx: &mut RequestContext) -> Result<(), AppError> {
        if self.mode == AuthorizationMode::Disabled {
            return Ok(());
        }
        ctx.endpoint_hash = Some(operation.to_string());
        let role = ctx.dal.role_name(ctx.session.role_index).to_string();
        let Some(entry) = ctx.dal.entity().authorizer_entry(&role, operation).cloned() else {
            return Ok(());
        };
        for name in entry.names() {
            self.authorize(name, ctx).await?;
        }
        Ok(())
    }
}
