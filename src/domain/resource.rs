//! Declarative description of an admin resource: navigation entry, form
//! fieldsets and table columns. Rendering is left to whichever client consumes
//! the JSON.

use serde::Serialize;

use super::{BadgeColor, TicketPriority, TicketStatus, TicketType};

#[derive(Debug, Clone, Serialize)]
pub struct ResourceSchema {
    pub slug: &'static str,
    pub model_label: &'static str,
    pub model_label_plural: &'static str,
    pub navigation: Navigation,
    pub form: Vec<Fieldset>,
    pub table: Vec<Column>,
    pub row_actions: Vec<&'static str>,
    pub bulk_actions: Vec<&'static str>,
    pub pages: Vec<Page>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Navigation {
    pub icon: &'static str,
    pub group: &'static str,
    pub label: &'static str,
    pub sort: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct Fieldset {
    pub label: &'static str,
    pub columns: u8,
    pub fields: Vec<Field>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Select,
    RichEditor,
    FileUpload,
    ImageUpload,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SelectOption {
    pub value: &'static str,
    pub label: &'static str,
    pub color: Option<BadgeColor>,
}

/// Where a select gets its choices from.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum OptionSource {
    Static { options: Vec<SelectOption> },
    /// Loaded from an API endpoint, optionally keyed on another field's value.
    Remote {
        endpoint: &'static str,
        depends_on: Option<&'static str>,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct Field {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub max_length: Option<usize>,
    pub searchable: bool,
    pub multiple: bool,
    pub live: bool,
    pub full_width: bool,
    pub options: Option<OptionSource>,
    /// Fields reset to empty whenever this field changes.
    pub clears_on_change: Vec<&'static str>,
}

impl Field {
    fn new(name: &'static str, label: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            label,
            kind,
            required: false,
            max_length: None,
            searchable: false,
            multiple: false,
            live: false,
            full_width: false,
            options: None,
            clears_on_change: Vec::new(),
        }
    }

    fn required(mut self) -> Self {
        self.required = true;
        self
    }

    fn max_length(mut self, max: usize) -> Self {
        self.max_length = Some(max);
        self
    }

    fn searchable(mut self) -> Self {
        self.searchable = true;
        self
    }

    fn multiple(mut self) -> Self {
        self.multiple = true;
        self
    }

    fn live(mut self) -> Self {
        self.live = true;
        self
    }

    fn full_width(mut self) -> Self {
        self.full_width = true;
        self
    }

    fn options(mut self, source: OptionSource) -> Self {
        self.options = Some(source);
        self
    }

    fn clears(mut self, field: &'static str) -> Self {
        self.clears_on_change.push(field);
        self
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    Start,
    Center,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ColumnFormat {
    Text,
    Numeric,
    Badge,
    DateTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct Column {
    pub name: &'static str,
    pub label: &'static str,
    pub format: ColumnFormat,
    pub alignment: Alignment,
    pub sortable: bool,
    pub searchable: bool,
    pub toggleable: bool,
    pub hidden_by_default: bool,
}

impl Column {
    fn new(name: &'static str, label: &'static str, format: ColumnFormat) -> Self {
        Self {
            name,
            label,
            format,
            alignment: Alignment::Start,
            sortable: false,
            searchable: false,
            toggleable: false,
            hidden_by_default: false,
        }
    }

    fn centered(mut self) -> Self {
        self.alignment = Alignment::Center;
        self
    }

    fn sortable(mut self) -> Self {
        self.sortable = true;
        self
    }

    fn searchable(mut self) -> Self {
        self.searchable = true;
        self
    }

    fn hidden_toggle(mut self) -> Self {
        self.toggleable = true;
        self.hidden_by_default = true;
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Page {
    pub name: &'static str,
    pub path: &'static str,
}

fn status_options() -> Vec<SelectOption> {
    TicketStatus::ALL
        .iter()
        .map(|s| SelectOption { value: s.as_str(), label: s.label(), color: Some(s.color()) })
        .collect()
}

fn type_options() -> Vec<SelectOption> {
    TicketType::ALL
        .iter()
        .map(|t| SelectOption { value: t.as_str(), label: t.label(), color: Some(t.color()) })
        .collect()
}

fn priority_options() -> Vec<SelectOption> {
    TicketPriority::ALL
        .iter()
        .map(|p| SelectOption { value: p.as_str(), label: p.label(), color: Some(p.color()) })
        .collect()
}

pub fn ticket_resource() -> ResourceSchema {
    ResourceSchema {
        slug: "tickets",
        model_label: "Ticket",
        model_label_plural: "Tickets",
        navigation: Navigation {
            icon: "fas-comment-dots",
            group: "Administração",
            label: "Solicitações",
            sort: 2,
        },
        form: vec![
            Fieldset {
                label: "Empresa",
                columns: 3,
                fields: vec![
                    Field::new("title", "Assunto", FieldKind::Text).required().max_length(50),
                    Field::new("organization_id", "Empresa", FieldKind::Select)
                        .required()
                        .options(OptionSource::Remote {
                            endpoint: "/admin/organizations",
                            depends_on: None,
                        })
                        .clears("user_id"),
                    Field::new("user_id", "Usuario", FieldKind::Select)
                        .required()
                        .searchable()
                        .live()
                        .options(OptionSource::Remote {
                            endpoint: "/admin/tickets/form/user-options",
                            depends_on: Some("organization_id"),
                        }),
                ],
            },
            Fieldset {
                label: "Classificação",
                columns: 3,
                fields: vec![
                    Field::new("status", "Status", FieldKind::Select)
                        .required()
                        .searchable()
                        .options(OptionSource::Static { options: status_options() }),
                    Field::new("type", "Tipo", FieldKind::Select)
                        .required()
                        .searchable()
                        .options(OptionSource::Static { options: type_options() }),
                    Field::new("priority", "Prioridade", FieldKind::Select)
                        .required()
                        .searchable()
                        .options(OptionSource::Static { options: priority_options() }),
                ],
            },
            Fieldset {
                label: "Detalhes do Ticket",
                columns: 1,
                fields: vec![
                    Field::new("description", "Detalhamento", FieldKind::RichEditor)
                        .required()
                        .full_width(),
                ],
            },
            Fieldset {
                label: "Anexos",
                columns: 2,
                fields: vec![
                    Field::new("files", "Arquivos", FieldKind::FileUpload).multiple(),
                    Field::new("image_path", "Imagens", FieldKind::ImageUpload),
                ],
            },
        ],
        table: vec![
            Column::new("id", "Solicitação", ColumnFormat::Text).centered().sortable(),
            Column::new("organization", "Tenant", ColumnFormat::Numeric).sortable(),
            Column::new("user", "Solicitante", ColumnFormat::Numeric).sortable(),
            Column::new("title", "Assunto", ColumnFormat::Text).searchable(),
            Column::new("status", "Status", ColumnFormat::Badge).centered().sortable(),
            Column::new("priority", "Prioridade", ColumnFormat::Badge).centered().sortable(),
            Column::new("type", "Tipo", ColumnFormat::Badge).centered().sortable(),
            Column::new("lifetime", "Tempo de Vida", ColumnFormat::Text).centered().sortable(),
            Column::new("created_at", "Criado em", ColumnFormat::DateTime).sortable().hidden_toggle(),
            Column::new("closed_at", "Fechado em", ColumnFormat::DateTime).sortable().hidden_toggle(),
            Column::new("updated_at", "Atualizado em", ColumnFormat::DateTime).sortable().hidden_toggle(),
        ],
        row_actions: vec!["view", "edit", "delete"],
        bulk_actions: vec!["delete"],
        pages: vec![
            Page { name: "index", path: "/" },
            Page { name: "create", path: "/create" },
            Page { name: "view", path: "/{record}" },
            Page { name: "edit", path: "/{record}/edit" },
        ],
    }
}
