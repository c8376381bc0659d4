pub mod ticket_service;
pub mod refund_service;
pub mod webhook_service;

use std::sync::Arc;
use sqlx::SqlitePool;
use crate::auth::{AuthService, CsrfExemptions, CsrfService};
use crate::clock::Clock;
use crate::config::Settings;
use crate::repository::*;
use crate::uploads::AttachmentStore;

pub use refund_service::{RefundOutcome, RefundService};
pub use ticket_service::{TicketDetail, TicketPage, TicketService, TicketView, OrganizationSelection};
pub use webhook_service::WebhookInbox;

pub struct ServiceContext {
    pub organization_repo: Arc<dyn OrganizationRepository>,
    pub user_repo: Arc<dyn UserRepository>,
    pub subscription_repo: Arc<dyn SubscriptionRepository>,
    pub ticket_service: Arc<TicketService>,
    pub refund_service: Arc<RefundService>,
    pub webhook_inbox: Arc<WebhookInbox>,
    pub auth_service: Arc<AuthService>,
    pub csrf_service: Arc<CsrfService>,
    pub csrf_exemptions: CsrfExemptions,
    pub attachments: AttachmentStore,
    pub clock: Arc<dyn Clock>,
    pub db_pool: SqlitePool,
}

impl ServiceContext {
    pub fn new(db_pool: SqlitePool, settings: &Settings, clock: Arc<dyn Clock>) -> Self {
        let organization_repo: Arc<dyn OrganizationRepository> =
            Arc::new(SqliteOrganizationRepository::new(db_pool.clone()));
        let user_repo: Arc<dyn UserRepository> =
            Arc::new(SqliteUserRepository::new(db_pool.clone()));
        let subscription_repo: Arc<dyn SubscriptionRepository> =
            Arc::new(SqliteSubscriptionRepository::new(db_pool.clone()));
        let ticket_repo = Arc::new(SqliteTicketRepository::new(db_pool.clone()));
        let response_repo = Arc::new(SqliteTicketResponseRepository::new(db_pool.clone()));
        let refund_repo = Arc::new(SqliteRefundRepository::new(db_pool.clone()));
        let webhook_repo = Arc::new(SqliteWebhookEventRepository::new(db_pool.clone()));

        let attachments = AttachmentStore::new(&settings.uploads.dir);

        let ticket_service = Arc::new(TicketService::new(
            ticket_repo,
            response_repo,
            organization_repo.clone(),
            user_repo.clone(),
            attachments.clone(),
            clock.clone(),
        ));
        let refund_service = Arc::new(RefundService::new(
            refund_repo,
            subscription_repo.clone(),
            clock.clone(),
        ));
        let webhook_inbox = Arc::new(WebhookInbox::new(webhook_repo, clock.clone()));

        let auth_service = Arc::new(AuthService::new(
            db_pool.clone(),
            settings.auth.session_duration_hours,
        ));
        let csrf_service = Arc::new(CsrfService::new(db_pool.clone()));

        Self {
            organization_repo,
            user_repo,
            subscription_repo,
            ticket_service,
            refund_service,
            webhook_inbox,
            auth_service,
            csrf_service,
            csrf_exemptions: CsrfExemptions::new(settings.security.csrf_exempt.clone()),
            attachments,
            clock,
            db_pool,
        }
    }
}
