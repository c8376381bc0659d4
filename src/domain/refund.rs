use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A refund issued against a subscription, mirroring the payment processor's record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionRefund {
    pub id: Uuid,
    pub subscription_id: Uuid,
    pub organization_id: Uuid,
    pub price_id: Option<String>,
    pub refund_id: String,
    pub status: RefundStatus,
    pub currency: String,
    pub balance_transaction: Option<String>,
    pub amount: i64,
    pub reason: Option<RefundReason>,
    pub object: Option<String>,
    pub reference: Option<String>,
    pub reference_status: Option<String>,
    pub failure_reason: Option<RefundFailureReason>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SubscriptionRefund {
    /// Once the processor reports success, amount and currency are settled.
    pub fn is_settled(&self) -> bool {
        self.status == RefundStatus::Succeeded
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RefundStatus {
    Pending,
    RequiresAction,
    Succeeded,
    Failed,
    Canceled,
}

impl RefundStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefundStatus::Pending => "pending",
            RefundStatus::RequiresAction => "requires_action",
            RefundStatus::Succeeded => "succeeded",
            RefundStatus::Failed => "failed",
            RefundStatus::Canceled => "canceled",
        }
    }
}

impl FromStr for RefundStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RefundStatus::Pending),
            "requires_action" => Ok(RefundStatus::RequiresAction),
            "succeeded" => Ok(RefundStatus::Succeeded),
            "failed" => Ok(RefundStatus::Failed),
            "canceled" => Ok(RefundStatus::Canceled),
            _ => Err(format!("Invalid refund status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RefundReason {
    Duplicate,
    Fraudulent,
    RequestedByCustomer,
    ExpiredUncapturedCharge,
}

impl RefundReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefundReason::Duplicate => "duplicate",
            RefundReason::Fraudulent => "fraudulent",
            RefundReason::RequestedByCustomer => "requested_by_customer",
            RefundReason::ExpiredUncapturedCharge => "expired_uncaptured_charge",
        }
    }
}

impl FromStr for RefundReason {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "duplicate" => Ok(RefundReason::Duplicate),
            "fraudulent" => Ok(RefundReason::Fraudulent),
            "requested_by_customer" => Ok(RefundReason::RequestedByCustomer),
            "expired_uncaptured_charge" => Ok(RefundReason::ExpiredUncapturedCharge),
            _ => Err(format!("Invalid refund reason: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RefundFailureReason {
    ChargeForPendingRefundDisputed,
    Declined,
    ExpiredOrCanceledCard,
    InsufficientFunds,
    LostOrStolenCard,
    MerchantRequest,
    Unknown,
}

impl RefundFailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefundFailureReason::ChargeForPendingRefundDisputed => "charge_for_pending_refund_disputed",
            RefundFailureReason::Declined => "declined",
            RefundFailureReason::ExpiredOrCanceledCard => "expired_or_canceled_card",
            RefundFailureReason::InsufficientFunds => "insufficient_funds",
            RefundFailureReason::LostOrStolenCard => "lost_or_stolen_card",
            RefundFailureReason::MerchantRequest => "merchant_request",
            RefundFailureReason::Unknown => "unknown",
        }
    }
}

impl FromStr for RefundFailureReason {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "charge_for_pending_refund_disputed" => Ok(RefundFailureReason::ChargeForPendingRefundDisputed),
            "declined" => Ok(RefundFailureReason::Declined),
            "expired_or_canceled_card" => Ok(RefundFailureReason::ExpiredOrCanceledCard),
            "insufficient_funds" => Ok(RefundFailureReason::InsufficientFunds),
            "lost_or_stolen_card" => Ok(RefundFailureReason::LostOrStolenCard),
            "merchant_request" => Ok(RefundFailureReason::MerchantRequest),
            "unknown" => Ok(RefundFailureReason::Unknown),
            _ => Err(format!("Invalid refund failure reason: {}", s)),
        }
    }
}

/// Admin-initiated refund request against a subscription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRefundRequest {
    pub subscription_id: Uuid,
    pub refund_id: String,
    pub amount: i64,
    pub currency: String,
    pub reason: Option<RefundReason>,
    pub reference: Option<String>,
}

/// Refund state as reported by the payment processor.
#[derive(Debug, Clone, Default)]
pub struct RefundUpdate {
    pub refund_id: String,
    pub status: Option<RefundStatus>,
    pub amount: Option<i64>,
    pub currency: Option<String>,
    pub balance_transaction: Option<String>,
    pub reason: Option<RefundReason>,
    pub failure_reason: Option<RefundFailureReason>,
    pub object: Option<String>,
    pub reference: Option<String>,
    pub reference_status: Option<String>,
    /// Processor-side subscription id, used to attach refunds seen for the first time.
    pub stripe_subscription_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refund_enums_use_processor_values() {
        assert_eq!("requires_action".parse::<RefundStatus>().unwrap(), RefundStatus::RequiresAction);
        assert_eq!(RefundReason::RequestedByCustomer.as_str(), "requested_by_customer");
        assert_eq!(
            serde_json::to_string(&RefundFailureReason::LostOrStolenCard).unwrap(),
            "\"lost_or_stolen_card\""
        );
        assert!("refunded".parse::<RefundStatus>().is_err());
    }
}
