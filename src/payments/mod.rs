pub mod stripe_webhook;

pub use stripe_webhook::StripeWebhookHandler;
