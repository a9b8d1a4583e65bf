//! Shared types for the intake API layer.

use std::sync::Arc;

use crate::pipeline::WebhookDispatcher;

/// Shared context for all API routes.
#[derive(Clone)]
pub struct ApiContext {
    pub dispatcher: Arc<WebhookDispatcher>,
}

impl ApiContext {
    pub fn new(dispatcher: WebhookDispatcher) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
        }
    }
}
