use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Client-side state of the ticket form while it is being filled in.
///
/// Only the organization/user pair has behavior: the user list depends on the
/// organization, so picking an organization always drops the chosen user.
/// Any other field the client sends is carried through untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TicketFormState {
    pub organization_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl TicketFormState {
    pub fn select_organization(&mut self, organization_id: Option<Uuid>) {
        self.organization_id = organization_id;
        self.user_id = None;
    }

    pub fn select_user(&mut self, user_id: Option<Uuid>) {
        self.user_id = user_id;
    }
}
