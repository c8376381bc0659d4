pub mod organization;
pub mod ticket;
pub mod ticket_form;
pub mod ticket_response;
pub mod refund;
pub mod resource;
pub mod webhook_event;

pub use organization::*;
pub use ticket::*;
pub use ticket_form::*;
pub use ticket_response::*;
pub use refund::*;
pub use resource::*;
pub use webhook_event::*;

use serde::Serialize;

/// Display color for enum badges in admin tables.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BadgeColor {
    Gray,
    Info,
    Primary,
    Success,
    Warning,
    Danger,
}
