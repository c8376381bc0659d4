use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::BadgeColor;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    pub status: TicketStatus,
    #[serde(rename = "type")]
    pub ticket_type: TicketType,
    pub priority: TicketPriority,
    pub files: Vec<String>,
    pub image_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl Ticket {
    /// Age of the ticket: up to `closed_at` when closed, otherwise up to `now`.
    pub fn lifetime(&self, now: DateTime<Utc>) -> Lifetime {
        Lifetime::between(self.created_at, self.closed_at.unwrap_or(now))
    }

    /// True when `closed_at` precedes `created_at`, which the lifetime clamps.
    pub fn has_inverted_timestamps(&self) -> bool {
        self.closed_at.map(|c| c < self.created_at).unwrap_or(false)
    }

    pub fn is_open(&self) -> bool {
        !self.status.is_terminal()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Open,
    InProgress,
    Resolved,
    Closed,
}

impl TicketStatus {
    pub const ALL: [TicketStatus; 4] = [
        TicketStatus::Open,
        TicketStatus::InProgress,
        TicketStatus::Resolved,
        TicketStatus::Closed,
    ];

    /// Statuses that stop the lifetime clock and drop out of the badge count.
    pub const TERMINAL: [TicketStatus; 2] = [TicketStatus::Closed, TicketStatus::Resolved];

    pub fn is_terminal(&self) -> bool {
        Self::TERMINAL.contains(self)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Open => "open",
            TicketStatus::InProgress => "in_progress",
            TicketStatus::Resolved => "resolved",
            TicketStatus::Closed => "closed",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TicketStatus::Open => "Aberto",
            TicketStatus::InProgress => "Em andamento",
            TicketStatus::Resolved => "Resolvido",
            TicketStatus::Closed => "Fechado",
        }
    }

    pub fn color(&self) -> BadgeColor {
        match self {
            TicketStatus::Open => BadgeColor::Info,
            TicketStatus::InProgress => BadgeColor::Warning,
            TicketStatus::Resolved => BadgeColor::Success,
            TicketStatus::Closed => BadgeColor::Gray,
        }
    }
}

impl FromStr for TicketStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(TicketStatus::Open),
            "in_progress" => Ok(TicketStatus::InProgress),
            "resolved" => Ok(TicketStatus::Resolved),
            "closed" => Ok(TicketStatus::Closed),
            _ => Err(format!("Invalid ticket status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TicketType {
    Question,
    Incident,
    FeatureRequest,
    Billing,
}

impl TicketType {
    pub const ALL: [TicketType; 4] = [
        TicketType::Question,
        TicketType::Incident,
        TicketType::FeatureRequest,
        TicketType::Billing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TicketType::Question => "question",
            TicketType::Incident => "incident",
            TicketType::FeatureRequest => "feature_request",
            TicketType::Billing => "billing",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TicketType::Question => "Dúvida",
            TicketType::Incident => "Incidente",
            TicketType::FeatureRequest => "Solicitação de melhoria",
            TicketType::Billing => "Financeiro",
        }
    }

    pub fn color(&self) -> BadgeColor {
        match self {
            TicketType::Question => BadgeColor::Info,
            TicketType::Incident => BadgeColor::Danger,
            TicketType::FeatureRequest => BadgeColor::Primary,
            TicketType::Billing => BadgeColor::Warning,
        }
    }
}

impl FromStr for TicketType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "question" => Ok(TicketType::Question),
            "incident" => Ok(TicketType::Incident),
            "feature_request" => Ok(TicketType::FeatureRequest),
            "billing" => Ok(TicketType::Billing),
            _ => Err(format!("Invalid ticket type: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TicketPriority {
    Low,
    Medium,
    High,
    Urgent,
}

impl TicketPriority {
    pub const ALL: [TicketPriority; 4] = [
        TicketPriority::Low,
        TicketPriority::Medium,
        TicketPriority::High,
        TicketPriority::Urgent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TicketPriority::Low => "low",
            TicketPriority::Medium => "medium",
            TicketPriority::High => "high",
            TicketPriority::Urgent => "urgent",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TicketPriority::Low => "Baixa",
            TicketPriority::Medium => "Média",
            TicketPriority::High => "Alta",
            TicketPriority::Urgent => "Urgente",
        }
    }

    pub fn color(&self) -> BadgeColor {
        match self {
            TicketPriority::Low => BadgeColor::Gray,
            TicketPriority::Medium => BadgeColor::Info,
            TicketPriority::High => BadgeColor::Warning,
            TicketPriority::Urgent => BadgeColor::Danger,
        }
    }
}

impl FromStr for TicketPriority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(TicketPriority::Low),
            "medium" => Ok(TicketPriority::Medium),
            "high" => Ok(TicketPriority::High),
            "urgent" => Ok(TicketPriority::Urgent),
            _ => Err(format!("Invalid ticket priority: {}", s)),
        }
    }
}

/// Elapsed time of a ticket in whole days plus the remaining whole hours.
///
/// `days` counts every elapsed day. It is not a calendar day-of-month part
/// and does not wrap at month boundaries, so 45 days shows as "45 dias".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Lifetime {
    pub days: i64,
    pub hours: i64,
}

impl Lifetime {
    pub const ZERO: Lifetime = Lifetime { days: 0, hours: 0 };

    /// Minutes and seconds are truncated. An `end` before `start` yields zero.
    pub fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        let elapsed = end - start;
        if elapsed < Duration::zero() {
            return Self::ZERO;
        }

        let total_hours = elapsed.num_hours();
        Self {
            days: total_hours / 24,
            hours: total_hours % 24,
        }
    }
}

impl fmt::Display for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} dias, {} horas", self.days, self.hours)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateTicketRequest {
    #[validate(custom(function = "validate_title"))]
    pub title: String,
    #[validate(custom(function = "validate_rich_text"))]
    pub description: String,
    pub organization_id: Uuid,
    pub user_id: Uuid,
    pub status: TicketStatus,
    #[serde(rename = "type")]
    pub ticket_type: TicketType,
    pub priority: TicketPriority,
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default)]
    pub image_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, Validate)]
pub struct UpdateTicketRequest {
    #[validate(custom(function = "validate_title"))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub organization_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub status: Option<TicketStatus>,
    #[serde(rename = "type")]
    pub ticket_type: Option<TicketType>,
    pub priority: Option<TicketPriority>,
    pub files: Option<Vec<String>>,
    pub image_path: Option<String>,
}

/// A ticket joined with the names shown in the admin table.
#[derive(Debug, Clone)]
pub struct TicketSummary {
    pub ticket: Ticket,
    pub organization_name: String,
    pub user_name: String,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TicketSort {
    Id,
    Organization,
    User,
    Title,
    Status,
    Priority,
    Type,
    Lifetime,
    #[default]
    CreatedAt,
    ClosedAt,
    UpdatedAt,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TicketFilter {
    pub search: Option<String>,
    pub status: Option<TicketStatus>,
    pub sort: TicketSort,
    pub direction: SortDirection,
    pub limit: i64,
    pub offset: i64,
}

pub const TITLE_MAX_CHARS: usize = 50;

/// Titles are stored trimmed, so the length rule applies to the trimmed text.
pub fn validate_title(title: &str) -> Result<(), ValidationError> {
    let len = title.trim().chars().count();
    if len == 0 || len > TITLE_MAX_CHARS {
        let mut err = ValidationError::new("length");
        err.message = Some("must be between 1 and 50 characters".into());
        return Err(err);
    }
    Ok(())
}

/// Rejects rich-text bodies that contain no visible text once markup is removed.
pub fn validate_rich_text(html: &str) -> Result<(), ValidationError> {
    if rich_text_is_blank(html) {
        let mut err = ValidationError::new("required");
        err.message = Some("is required".into());
        return Err(err);
    }
    Ok(())
}

fn rich_text_is_blank(html: &str) -> bool {
    let mut in_tag = false;
    let mut text = String::with_capacity(html.len());
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }
    text.replace("&nbsp;", " ").trim().is_empty()
}
