use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;
use validator::Validate;

use crate::{
    clock::Clock,
    domain::*,
    error::{AppError, Result},
    repository::{OrganizationRepository, TicketRepository, TicketResponseRepository, UserRepository},
    uploads::{AttachmentKind, AttachmentStore},
};

/// A ticket as shown in the admin table and detail page, with its lifetime
/// computed at read time.
#[derive(Debug, Clone, Serialize)]
pub struct TicketView {
    #[serde(flatten)]
    pub ticket: Ticket,
    pub organization_name: String,
    pub user_name: String,
    pub lifetime: String,
    pub lifetime_hours: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TicketDetail {
    #[serde(flatten)]
    pub view: TicketView,
    pub responses: Vec<TicketResponse>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TicketPage {
    pub tickets: Vec<TicketView>,
    pub total: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrganizationSelection {
    pub state: TicketFormState,
    pub user_options: Vec<MemberOption>,
}

pub struct TicketService {
    tickets: Arc<dyn TicketRepository>,
    responses: Arc<dyn TicketResponseRepository>,
    organizations: Arc<dyn OrganizationRepository>,
    users: Arc<dyn UserRepository>,
    attachments: AttachmentStore,
    clock: Arc<dyn Clock>,
}

impl TicketService {
    pub fn new(
        tickets: Arc<dyn TicketRepository>,
        responses: Arc<dyn TicketResponseRepository>,
        organizations: Arc<dyn OrganizationRepository>,
        users: Arc<dyn UserRepository>,
        attachments: AttachmentStore,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { tickets, responses, organizations, users, attachments, clock }
    }

    fn view(&self, summary: TicketSummary, now: DateTime<Utc>) -> TicketView {
        let ticket = summary.ticket;
        if ticket.has_inverted_timestamps() {
            tracing::warn!(
                ticket_id = %ticket.id,
                "Ticket closed_at precedes created_at; lifetime clamped to zero"
            );
        }

        let lifetime = ticket.lifetime(now);
        TicketView {
            lifetime: lifetime.to_string(),
            lifetime_hours: lifetime.days * 24 + lifetime.hours,
            ticket,
            organization_name: summary.organization_name,
            user_name: summary.user_name,
        }
    }

    pub async fn list(&self, filter: TicketFilter) -> Result<TicketPage> {
        let now = self.clock.now();
        let (rows, total) = tokio::try_join!(
            self.tickets.list(&filter, now),
            self.tickets.count(&filter),
        )?;

        Ok(TicketPage {
            tickets: rows.into_iter().map(|s| self.view(s, now)).collect(),
            total,
        })
    }

    pub async fn get(&self, id: Uuid) -> Result<TicketDetail> {
        let summary = self.tickets.find_summary(id).await?
            .ok_or_else(|| AppError::NotFound("Ticket not found".to_string()))?;
        let responses = self.responses.list_by_ticket(id).await?;

        Ok(TicketDetail {
            view: self.view(summary, self.clock.now()),
            responses,
        })
    }

    /// Number shown on the navigation badge: tickets not yet closed or resolved.
    pub async fn open_count(&self) -> Result<i64> {
        self.tickets.count_open().await
    }

    /// Options for the requester select. Missing or unknown organizations, and
    /// lookup failures, give an empty list rather than an error.
    pub async fn user_options(&self, organization_id: Option<Uuid>) -> Result<Vec<MemberOption>> {
        let Some(organization_id) = organization_id else {
            return Ok(Vec::new());
        };

        match self.organizations.member_options(organization_id).await {
            Ok(options) => Ok(options),
            Err(e) => {
                tracing::warn!(%organization_id, "Member lookup failed: {}", e);
                Ok(Vec::new())
            }
        }
    }

    pub async fn select_organization(
        &self,
        mut state: TicketFormState,
        organization_id: Option<Uuid>,
    ) -> Result<OrganizationSelection> {
        state.select_organization(organization_id);
        let user_options = self.user_options(organization_id).await?;
        Ok(OrganizationSelection { state, user_options })
    }

    async fn ensure_requester(&self, organization_id: Uuid, user_id: Uuid) -> Result<()> {
        if self.organizations.find_by_id(organization_id).await?.is_none() {
            return Err(AppError::Validation("organization_id: organization not found".to_string()));
        }
        if !self.organizations.is_member(organization_id, user_id).await? {
            return Err(AppError::Validation(
                "user_id: user is not a member of the selected organization".to_string(),
            ));
        }
        Ok(())
    }

    /// Attachment paths must come from the upload endpoint and belong to no
    /// other ticket. Paths the ticket already holds are not rechecked.
    async fn ensure_attachments(
        &self,
        ticket: Option<&Ticket>,
        files: &[String],
        image_path: Option<&str>,
    ) -> Result<()> {
        let held = |path: &str| {
            ticket.is_some_and(|t| {
                t.files.iter().any(|f| f == path) || t.image_path.as_deref() == Some(path)
            })
        };
        let incoming = files
            .iter()
            .map(|p| (AttachmentKind::File, p.as_str()))
            .chain(image_path.map(|p| (AttachmentKind::Image, p)));

        for (kind, path) in incoming {
            if held(path) {
                continue;
            }
            self.attachments.ensure_stored(kind, path).await?;
            if self.tickets.attachment_in_use(path, ticket.map(|t| t.id)).await? {
                return Err(AppError::Validation(format!(
                    "Attachment already belongs to another ticket: {}",
                    path
                )));
            }
        }
        Ok(())
    }

    async fn remove_attachments<'a>(&self, ticket_id: Uuid, paths: impl IntoIterator<Item = &'a String>) {
        for path in paths {
            if let Err(e) = self.attachments.delete(path).await {
                tracing::warn!(ticket_id = %ticket_id, "Failed to remove attachment {}: {:?}", path, e);
            }
        }
    }

    pub async fn create(&self, request: CreateTicketRequest) -> Result<TicketView> {
        request.validate()?;
        self.ensure_requester(request.organization_id, request.user_id).await?;
        self.ensure_attachments(None, &request.files, request.image_path.as_deref()).await?;

        let now = self.clock.now();
        let ticket = Ticket {
            id: Uuid::new_v4(),
            organization_id: request.organization_id,
            user_id: request.user_id,
            title: request.title.trim().to_string(),
            description: request.description,
            status: request.status,
            ticket_type: request.ticket_type,
            priority: request.priority,
            files: request.files,
            image_path: request.image_path,
            created_at: now,
            updated_at: now,
            closed_at: request.status.is_terminal().then_some(now),
        };

        let created = self.tickets.create(ticket).await?;
        tracing::info!(ticket_id = %created.id, status = created.status.as_str(), "Ticket created");

        self.view_by_id(created.id).await
    }

    pub async fn update(&self, id: Uuid, request: UpdateTicketRequest) -> Result<TicketView> {
        request.validate()?;
        if let Some(description) = &request.description {
            validate_rich_text(description)
                .map_err(|_| AppError::Validation("description: is required".to_string()))?;
        }

        let mut ticket = self.tickets.find_by_id(id).await?
            .ok_or_else(|| AppError::NotFound("Ticket not found".to_string()))?;

        self.ensure_attachments(
            Some(&ticket),
            request.files.as_deref().unwrap_or_default(),
            request.image_path.as_deref(),
        ).await?;
        let previous_attachments: Vec<String> = ticket
            .files
            .iter()
            .chain(ticket.image_path.iter())
            .cloned()
            .collect();

        match (request.organization_id, request.user_id) {
            (Some(org), _) if org != ticket.organization_id => {
                // The previous requester belonged to the old organization
                let user = request.user_id.ok_or_else(|| {
                    AppError::Validation(
                        "user_id: a requester must be chosen after changing organization".to_string(),
                    )
                })?;
                self.ensure_requester(org, user).await?;
                ticket.organization_id = org;
                ticket.user_id = user;
            }
            (_, Some(user)) if user != ticket.user_id => {
                self.ensure_requester(ticket.organization_id, user).await?;
                ticket.user_id = user;
            }
            _ => {}
        }

        let now = self.clock.now();
        if let Some(status) = request.status {
            apply_status_transition(&mut ticket, status, now);
        }
        if let Some(title) = request.title {
            ticket.title = title.trim().to_string();
        }
        if let Some(description) = request.description {
            ticket.description = description;
        }
        if let Some(ticket_type) = request.ticket_type {
            ticket.ticket_type = ticket_type;
        }
        if let Some(priority) = request.priority {
            ticket.priority = priority;
        }
        if let Some(files) = request.files {
            ticket.files = files;
        }
        if request.image_path.is_some() {
            ticket.image_path = request.image_path;
        }
        ticket.updated_at = now;

        let ticket = self.tickets.update(ticket).await?;

        let dropped = previous_attachments.iter().filter(|path| {
            !ticket.files.contains(path) && ticket.image_path.as_ref() != Some(*path)
        });
        self.remove_attachments(id, dropped.collect::<Vec<_>>()).await;

        self.view_by_id(id).await
    }

    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let ticket = self.tickets.find_by_id(id).await?
            .ok_or_else(|| AppError::NotFound("Ticket not found".to_string()))?;

        self.tickets.delete(id).await?;
        self.remove_attachments(id, ticket.files.iter().chain(ticket.image_path.iter()).collect::<Vec<_>>()).await;

        tracing::info!(ticket_id = %id, "Ticket deleted");
        Ok(())
    }

    /// Deletes every listed ticket that exists; returns how many were removed.
    pub async fn delete_many(&self, ids: &[Uuid]) -> Result<usize> {
        let mut deleted = 0;
        for id in ids {
            match self.delete(*id).await {
                Ok(()) => deleted += 1,
                Err(AppError::NotFound(_)) => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(deleted)
    }

    pub async fn list_responses(&self, ticket_id: Uuid) -> Result<Vec<TicketResponse>> {
        self.ensure_ticket(ticket_id).await?;
        self.responses.list_by_ticket(ticket_id).await
    }

    pub async fn add_response(
        &self,
        ticket_id: Uuid,
        request: CreateTicketResponseRequest,
    ) -> Result<TicketResponse> {
        request.validate()?;
        self.ensure_ticket(ticket_id).await?;

        if self.users.find_by_id(request.user_id).await?.is_none() {
            return Err(AppError::Validation("user_id: user not found".to_string()));
        }

        self.responses
            .create(TicketResponse {
                id: Uuid::new_v4(),
                ticket_id,
                user_id: request.user_id,
                message: request.message,
                created_at: self.clock.now(),
            })
            .await
    }

    pub async fn delete_response(&self, ticket_id: Uuid, response_id: Uuid) -> Result<()> {
        let response = self.responses.find_by_id(response_id).await?
            .filter(|r| r.ticket_id == ticket_id)
            .ok_or_else(|| AppError::NotFound("Ticket response not found".to_string()))?;

        self.responses.delete(response.id).await
    }

    async fn ensure_ticket(&self, id: Uuid) -> Result<()> {
        self.tickets.find_by_id(id).await?
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound("Ticket not found".to_string()))
    }

    async fn view_by_id(&self, id: Uuid) -> Result<TicketView> {
        let summary = self.tickets.find_summary(id).await?
            .ok_or_else(|| AppError::Database("Failed to reload ticket".to_string()))?;
        Ok(self.view(summary, self.clock.now()))
    }
}

/// Entering a terminal status stamps `closed_at`; reopening clears it.
/// Moving between the two terminal statuses keeps the original stamp.
pub fn apply_status_transition(ticket: &mut Ticket, next: TicketStatus, now: DateTime<Utc>) {
    match (ticket.status.is_terminal(), next.is_terminal()) {
        (false, true) => ticket.closed_at = Some(now),
        (true, false) => ticket.closed_at = None,
        (true, true) => {
            if ticket.closed_at.is_none() {
                ticket.closed_at = Some(now);
            }
        }
        (false, false) => {}
    }
    ticket.status = next;
}
