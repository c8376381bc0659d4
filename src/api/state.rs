use std::sync::Arc;
use crate::{
    config::Settings,
    payments::StripeWebhookHandler,
    service::ServiceContext,
};

#[derive(Clone)]
pub struct AppState {
    pub service_context: Arc<ServiceContext>,
    pub stripe_webhooks: Arc<StripeWebhookHandler>,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(service_context: Arc<ServiceContext>, settings: Arc<Settings>) -> Self {
        let stripe_webhooks = Arc::new(StripeWebhookHandler::new(
            settings.stripe.webhook_secret.clone(),
            service_context.webhook_inbox.clone(),
            service_context.refund_service.clone(),
        ));

        Self {
            service_context,
            stripe_webhooks,
            settings,
        }
    }
}
