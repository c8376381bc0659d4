use std::sync::Arc;

use uuid::Uuid;

use crate::{
    clock::Clock,
    domain::{CreateRefundRequest, RefundStatus, RefundUpdate, SubscriptionRefund},
    error::{AppError, Result},
    repository::{RefundRepository, SubscriptionRepository},
};

/// What happened to a processor update.
#[derive(Debug, Clone)]
pub enum RefundOutcome {
    Created(SubscriptionRefund),
    Updated(SubscriptionRefund),
    /// The refund is unknown locally and its subscription could not be resolved.
    Ignored,
}

pub struct RefundService {
    refunds: Arc<dyn RefundRepository>,
    subscriptions: Arc<dyn SubscriptionRepository>,
    clock: Arc<dyn Clock>,
}

impl RefundService {
    pub fn new(
        refunds: Arc<dyn RefundRepository>,
        subscriptions: Arc<dyn SubscriptionRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { refunds, subscriptions, clock }
    }

    pub async fn get(&self, id: Uuid) -> Result<SubscriptionRefund> {
        self.refunds.find_by_id(id).await?
            .ok_or_else(|| AppError::NotFound("Refund not found".to_string()))
    }

    pub async fn list_by_organization(&self, organization_id: Uuid) -> Result<Vec<SubscriptionRefund>> {
        self.refunds.list_by_organization(organization_id).await
    }

    pub async fn list_by_subscription(&self, subscription_id: Uuid) -> Result<Vec<SubscriptionRefund>> {
        self.refunds.list_by_subscription(subscription_id).await
    }

    /// Records a refund that has just been requested from the processor.
    pub async fn request_refund(&self, request: CreateRefundRequest) -> Result<SubscriptionRefund> {
        if request.amount <= 0 {
            return Err(AppError::Validation("amount: must be positive".to_string()));
        }
        if request.refund_id.trim().is_empty() {
            return Err(AppError::Validation("refund_id: is required".to_string()));
        }

        let subscription = self.subscriptions.find_by_id(request.subscription_id).await?
            .ok_or_else(|| AppError::NotFound("Subscription not found".to_string()))?;

        let now = self.clock.now();
        let refund = SubscriptionRefund {
            id: Uuid::new_v4(),
            subscription_id: subscription.id,
            organization_id: subscription.organization_id,
            price_id: subscription.price_id,
            refund_id: request.refund_id,
            status: RefundStatus::Pending,
            currency: request.currency.to_lowercase(),
            balance_transaction: None,
            amount: request.amount,
            reason: request.reason,
            object: Some("refund".to_string()),
            reference: request.reference,
            reference_status: None,
            failure_reason: None,
            created_at: now,
            updated_at: now,
        };

        let created = self.refunds.create(refund).await?;
        tracing::info!(
            refund_id = %created.refund_id,
            organization_id = %created.organization_id,
            amount = created.amount,
            "Refund requested"
        );
        Ok(created)
    }

    /// Applies refund state reported by the processor, creating the record when
    /// the refund has not been seen before.
    pub async fn apply_processor_update(&self, update: RefundUpdate) -> Result<RefundOutcome> {
        match self.refunds.find_by_refund_id(&update.refund_id).await? {
            Some(existing) => {
                let merged = merge_update(existing, update, self.clock.now());
                Ok(RefundOutcome::Updated(self.refunds.update(merged).await?))
            }
            None => self.create_from_update(update).await,
        }
    }

    async fn create_from_update(&self, update: RefundUpdate) -> Result<RefundOutcome> {
        let subscription = match update.stripe_subscription_id.as_deref() {
            Some(stripe_id) => self.subscriptions.find_by_stripe_id(stripe_id).await?,
            None => None,
        };
        let Some(subscription) = subscription else {
            tracing::warn!(
                refund_id = %update.refund_id,
                "Refund update for unknown subscription; ignoring"
            );
            return Ok(RefundOutcome::Ignored);
        };

        let (Some(amount), Some(currency)) = (update.amount, update.currency.clone()) else {
            tracing::warn!(refund_id = %update.refund_id, "Refund update without amount or currency; ignoring");
            return Ok(RefundOutcome::Ignored);
        };

        let now = self.clock.now();
        let refund = SubscriptionRefund {
            id: Uuid::new_v4(),
            subscription_id: subscription.id,
            organization_id: subscription.organization_id,
            price_id: subscription.price_id,
            refund_id: update.refund_id,
            status: update.status.unwrap_or(RefundStatus::Pending),
            currency: currency.to_lowercase(),
            balance_transaction: update.balance_transaction,
            amount,
            reason: update.reason,
            object: update.object,
            reference: update.reference,
            reference_status: update.reference_status,
            failure_reason: update.failure_reason,
            created_at: now,
            updated_at: now,
        };

        let created = self.refunds.create(refund).await?;
        tracing::info!(refund_id = %created.refund_id, status = created.status.as_str(), "Refund recorded from processor");
        Ok(RefundOutcome::Created(created))
    }
}

/// Folds a processor update into the stored refund. Amount and currency stay
/// fixed once the stored refund has succeeded.
fn merge_update(
    mut refund: SubscriptionRefund,
    update: RefundUpdate,
    now: chrono::DateTime<chrono::Utc>,
) -> SubscriptionRefund {
    if refund.is_settled() {
        let amount_changed = update.amount.is_some_and(|a| a != refund.amount);
        let currency_changed = update
            .currency
            .as_deref()
            .is_some_and(|c| !c.eq_ignore_ascii_case(&refund.currency));
        if amount_changed || currency_changed {
            tracing::warn!(
                refund_id = %refund.refund_id,
                "Ignoring amount/currency change on a succeeded refund"
            );
        }
    } else {
        if let Some(amount) = update.amount {
            refund.amount = amount;
        }
        if let Some(currency) = update.currency {
            refund.currency = currency.to_lowercase();
        }
    }

    if let Some(status) = update.status {
        refund.status = status;
    }
    if update.balance_transaction.is_some() {
        refund.balance_transaction = update.balance_transaction;
    }
    if update.reason.is_some() {
        refund.reason = update.reason;
    }
    if update.failure_reason.is_some() {
        refund.failure_reason = update.failure_reason;
    }
    if update.object.is_some() {
        refund.object = update.object;
    }
    if update.reference.is_some() {
        refund.reference = update.reference;
    }
    if update.reference_status.is_some() {
        refund.reference_status = update.reference_status;
    }
    refund.updated_at = now;
    refund
}
