//! Shared state for every endpoint of one entity scope.

use crate::authorizer::{Authorizer, AuthorizerRegistry};
use crate::behavior::{Behavior, BehaviorRegistry};
use crate::config::Settings;
use crate::context::RequestContext;
use crate::dal::Dal;
use crate::extractors::{HeaderSessionResolver, RequestMeta, SessionResolver};
use serde_json::{Map, Value};
use std::sync::Arc;

pub struct Endpoints {
    pub dal: Arc<dyn Dal>,
    pub settings: Settings,
    pub behaviors: BehaviorRegistry,
    pub authorizers: AuthorizerRegistry,
    pub sessions: Arc<dyn SessionResolver>,
}

pub type AppState = Arc<Endpoints>;

impl Endpoints {
    pub fn new(dal: Arc<dyn Dal>, settings: Settings) -> Self {
        let authorizers = AuthorizerRegistry::new(settings.authorization_mode);
        Endpoints {
            dal,
            settings,
            behaviors: BehaviorRegistry::new(),
            authorizers,
            sessions: Arc::new(HeaderSessionResolver),
        }
    }

    pub fn with_session_resolver(mut self, resolver: impl SessionResolver + 'static) -> Self {
        self.sessions = Arc::new(resolver);
        self
    }

    pub fn scope(&self) -> &str {
        self.dal.scope()
    }

    pub fn set_behavior(&self, name: impl Into<String>, behavior: impl Behavior + 'static) {
        self.behaviors.set_behavior(name, behavior);
    }

    pub fn set_authorizer(&self, name: impl Into<String>, authorizer: impl Authorizer + 'static) {
        self.authorizers.set_authorizer(name, authorizer);
    }

    pub fn set_template(&self, name: impl Into<String>, template: impl Into<String>) {
        self.behaviors.set_template(name, template);
    }

    /// Fresh context for one request.
    pub fn context(&self, meta: RequestMeta, params: Map<String, Value>, body: Option<Value>) -> RequestContext {
        let session = self.sessions.resolve(&meta.headers);
        RequestContext::new(self.dal.clone(), session, meta.request_id, meta.url)
            .with_params(params)
            .with_body(body)
    }
}
