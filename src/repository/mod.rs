use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;
use crate::domain::*;
use crate::error::Result;

pub mod organization_repository;
pub mod user_repository;
pub mod subscription_repository;
pub mod ticket_repository;
pub mod ticket_response_repository;
pub mod refund_repository;
pub mod webhook_event_repository;

pub use organization_repository::SqliteOrganizationRepository;
pub use user_repository::SqliteUserRepository;
pub use subscription_repository::SqliteSubscriptionRepository;
pub use ticket_repository::SqliteTicketRepository;
pub use ticket_response_repository::SqliteTicketResponseRepository;
pub use refund_repository::SqliteRefundRepository;
pub use webhook_event_repository::SqliteWebhookEventRepository;

#[async_trait]
pub trait OrganizationRepository: Send + Sync {
    async fn create(&self, name: &str) -> Result<Organization>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Organization>>;
    async fn list(&self) -> Result<Vec<Organization>>;
    async fn add_member(&self, organization_id: Uuid, user_id: Uuid) -> Result<()>;
    async fn is_member(&self, organization_id: Uuid, user_id: Uuid) -> Result<bool>;
    /// Members of the organization ordered by name. Unknown organizations have none.
    async fn member_options(&self, organization_id: Uuid) -> Result<Vec<MemberOption>>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, request: CreateUserRequest) -> Result<User>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn password_hash(&self, email: &str) -> Result<Option<String>>;
}

#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    async fn create(&self, request: CreateSubscriptionRequest) -> Result<Subscription>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Subscription>>;
    async fn find_by_stripe_id(&self, stripe_subscription_id: &str) -> Result<Option<Subscription>>;
}

#[async_trait]
pub trait TicketRepository: Send + Sync {
    async fn create(&self, ticket: Ticket) -> Result<Ticket>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Ticket>>;
    async fn find_summary(&self, id: Uuid) -> Result<Option<TicketSummary>>;
    /// `now` stands in for `closed_at` of open tickets when sorting by lifetime.
    async fn list(&self, filter: &TicketFilter, now: DateTime<Utc>) -> Result<Vec<TicketSummary>>;
    async fn count(&self, filter: &TicketFilter) -> Result<i64>;
    async fn count_open(&self) -> Result<i64>;
    async fn update(&self, ticket: Ticket) -> Result<Ticket>;
    /// Whether any ticket other than `except` references the stored attachment.
    async fn attachment_in_use(&self, path: &str, except: Option<Uuid>) -> Result<bool>;
    async fn delete(&self, id: Uuid) -> Result<()>;
}

#[async_trait]
pub trait TicketResponseRepository: Send + Sync {
    async fn create(&self, response: TicketResponse) -> Result<TicketResponse>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<TicketResponse>>;
    async fn list_by_ticket(&self, ticket_id: Uuid) -> Result<Vec<TicketResponse>>;
    async fn delete(&self, id: Uuid) -> Result<()>;
}

/// Refunds are never deleted; the processor only moves them between statuses.
#[async_trait]
pub trait RefundRepository: Send + Sync {
    async fn create(&self, refund: SubscriptionRefund) -> Result<SubscriptionRefund>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<SubscriptionRefund>>;
    async fn find_by_refund_id(&self, refund_id: &str) -> Result<Option<SubscriptionRefund>>;
    async fn list_by_organization(&self, organization_id: Uuid) -> Result<Vec<SubscriptionRefund>>;
    async fn list_by_subscription(&self, subscription_id: Uuid) -> Result<Vec<SubscriptionRefund>>;
    async fn update(&self, refund: SubscriptionRefund) -> Result<SubscriptionRefund>;
}

#[async_trait]
pub trait WebhookEventRepository: Send + Sync {
    async fn record(&self, event: WebhookEvent) -> Result<WebhookEvent>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<WebhookEvent>>;
    async fn find_by_external_id(&self, source: WebhookSource, external_id: &str) -> Result<Option<WebhookEvent>>;
    async fn mark_processed(&self, id: Uuid, at: DateTime<Utc>) -> Result<()>;
    async fn delete_received_before(&self, cutoff: DateTime<Utc>) -> Result<u64>;
}
