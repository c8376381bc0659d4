pub mod auth;
pub mod organizations;
pub mod refunds;
pub mod resources;
pub mod root;
pub mod ticket_responses;
pub mod tickets;
pub mod uploads;
pub mod webhooks;
