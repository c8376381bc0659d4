use std::sync::Arc;

use backoffice::{
    clock::FixedClock,
    config::Settings,
    domain::{
        CreateTicketRequest, CreateTicketResponseRequest, CreateUserRequest, Organization,
        SortDirection, TicketFilter, TicketFormState, TicketPriority, TicketSort, TicketStatus,
        TicketType, UpdateTicketRequest, User,
    },
    error::AppError,
    service::ServiceContext,
    uploads::AttachmentKind,
};
use chrono::{Duration, TimeZone, Utc};
use sqlx::sqlite::SqlitePoolOptions;

async fn setup() -> anyhow::Result<(ServiceContext, Arc<FixedClock>)> {
    // One connection so every query sees the same in-memory database
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await?;

    let mut settings = Settings::default();
    settings.uploads.dir = std::env::temp_dir()
        .join(format!("backoffice-test-{}", uuid::Uuid::new_v4()))
        .to_string_lossy()
        .into_owned();

    let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap()));
    let ctx = ServiceContext::new(pool, &settings, clock.clone());
    Ok((ctx, clock))
}

async fn user(ctx: &ServiceContext, name: &str) -> anyhow::Result<User> {
    Ok(ctx.user_repo.create(CreateUserRequest {
        name: name.to_string(),
        email: format!("{}@example.com", name.to_lowercase()),
        password: None,
        is_admin: false,
    }).await?)
}

async fn org_with_member(ctx: &ServiceContext, org: &str, member: &str) -> anyhow::Result<(Organization, User)> {
    let organization = ctx.organization_repo.create(org).await?;
    let user = user(ctx, member).await?;
    ctx.organization_repo.add_member(organization.id, user.id).await?;
    Ok((organization, user))
}

fn request(org: &Organization, user: &User, title: &str, status: TicketStatus) -> CreateTicketRequest {
    CreateTicketRequest {
        title: title.to_string(),
        description: "<p>Something broke</p>".to_string(),
        organization_id: org.id,
        user_id: user.id,
        status,
        ticket_type: TicketType::Incident,
        priority: TicketPriority::High,
        files: vec![],
        image_path: None,
    }
}

#[tokio::test]
async fn test_badge_counts_tickets_not_closed_or_resolved() -> anyhow::Result<()> {
    let (ctx, _clock) = setup().await?;
    let (org, member) = org_with_member(&ctx, "Acme", "Ana").await?;
    let tickets = &ctx.ticket_service;

    assert_eq!(tickets.open_count().await?, 0);

    let open = tickets.create(request(&org, &member, "Printer", TicketStatus::Open)).await?;
    tickets.create(request(&org, &member, "VPN", TicketStatus::InProgress)).await?;
    tickets.create(request(&org, &member, "Email", TicketStatus::Resolved)).await?;
    tickets.create(request(&org, &member, "Wifi", TicketStatus::Closed)).await?;
    assert_eq!(tickets.open_count().await?, 2);

    tickets.update(open.ticket.id, UpdateTicketRequest {
        status: Some(TicketStatus::Closed),
        ..Default::default()
    }).await?;
    assert_eq!(tickets.open_count().await?, 1);

    Ok(())
}

#[tokio::test]
async fn test_user_options_are_scoped_to_organization() -> anyhow::Result<()> {
    let (ctx, _clock) = setup().await?;
    let (acme, _) = org_with_member(&ctx, "Acme", "Zeca").await?;
    let bruna = user(&ctx, "Bruna").await?;
    ctx.organization_repo.add_member(acme.id, bruna.id).await?;
    let (_globex, _) = org_with_member(&ctx, "Globex", "Carlos").await?;
    let empty = ctx.organization_repo.create("Initech").await?;

    let options = ctx.ticket_service.user_options(Some(acme.id)).await?;
    let names: Vec<&str> = options.iter().map(|o| o.name.as_str()).collect();
    assert_eq!(names, vec!["Bruna", "Zeca"]);

    assert!(ctx.ticket_service.user_options(Some(empty.id)).await?.is_empty());
    assert!(ctx.ticket_service.user_options(Some(uuid::Uuid::new_v4())).await?.is_empty());
    assert!(ctx.ticket_service.user_options(None).await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_selecting_organization_resets_user() -> anyhow::Result<()> {
    let (ctx, _clock) = setup().await?;
    let (acme, ana) = org_with_member(&ctx, "Acme", "Ana").await?;
    let (globex, carlos) = org_with_member(&ctx, "Globex", "Carlos").await?;

    let mut state = TicketFormState::default();
    state.select_organization(Some(acme.id));
    state.select_user(Some(ana.id));

    let selection = ctx.ticket_service.select_organization(state, Some(globex.id)).await?;
    assert_eq!(selection.state.organization_id, Some(globex.id));
    assert_eq!(selection.state.user_id, None);
    assert_eq!(selection.user_options.len(), 1);
    assert_eq!(selection.user_options[0].id, carlos.id);

    Ok(())
}

#[tokio::test]
async fn test_requester_must_belong_to_organization() -> anyhow::Result<()> {
    let (ctx, _clock) = setup().await?;
    let (acme, ana) = org_with_member(&ctx, "Acme", "Ana").await?;
    let (globex, carlos) = org_with_member(&ctx, "Globex", "Carlos").await?;

    let err = ctx.ticket_service
        .create(request(&acme, &carlos, "Wrong org", TicketStatus::Open))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let ticket = ctx.ticket_service.create(request(&acme, &ana, "Right org", TicketStatus::Open)).await?;

    // Moving organizations without a new requester is rejected
    let err = ctx.ticket_service
        .update(ticket.ticket.id, UpdateTicketRequest {
            organization_id: Some(globex.id),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let moved = ctx.ticket_service
        .update(ticket.ticket.id, UpdateTicketRequest {
            organization_id: Some(globex.id),
            user_id: Some(carlos.id),
            ..Default::default()
        })
        .await?;
    assert_eq!(moved.organization_name, "Globex");
    assert_eq!(moved.user_name, "Carlos");

    Ok(())
}

#[tokio::test]
async fn test_create_rejects_blank_description_and_long_title() -> anyhow::Result<()> {
    let (ctx, _clock) = setup().await?;
    let (acme, ana) = org_with_member(&ctx, "Acme", "Ana").await?;

    let mut blank = request(&acme, &ana, "Blank", TicketStatus::Open);
    blank.description = "<p>&nbsp;</p>".to_string();
    assert!(matches!(
        ctx.ticket_service.create(blank).await.unwrap_err(),
        AppError::Validation(_)
    ));

    let long = request(&acme, &ana, &"x".repeat(51), TicketStatus::Open);
    assert!(matches!(
        ctx.ticket_service.create(long).await.unwrap_err(),
        AppError::Validation(_)
    ));

    Ok(())
}

#[tokio::test]
async fn test_whitespace_title_is_rejected() -> anyhow::Result<()> {
    let (ctx, _clock) = setup().await?;
    let (acme, ana) = org_with_member(&ctx, "Acme", "Ana").await?;

    assert!(matches!(
        ctx.ticket_service.create(request(&acme, &ana, "     ", TicketStatus::Open)).await.unwrap_err(),
        AppError::Validation(_)
    ));

    let ticket = ctx.ticket_service.create(request(&acme, &ana, "  Printer  ", TicketStatus::Open)).await?;
    assert_eq!(ticket.ticket.title, "Printer");

    let err = ctx.ticket_service
        .update(ticket.ticket.id, UpdateTicketRequest {
            title: Some("\t  ".to_string()),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    assert_eq!(ctx.ticket_service.get(ticket.ticket.id).await?.view.ticket.title, "Printer");

    Ok(())
}

#[tokio::test]
async fn test_lifetime_runs_until_closed() -> anyhow::Result<()> {
    let (ctx, clock) = setup().await?;
    let (acme, ana) = org_with_member(&ctx, "Acme", "Ana").await?;

    let ticket = ctx.ticket_service.create(request(&acme, &ana, "Slow", TicketStatus::Open)).await?;
    assert_eq!(ticket.lifetime, "0 dias, 0 horas");

    clock.advance(Duration::hours(26) + Duration::minutes(59));
    let view = ctx.ticket_service.get(ticket.ticket.id).await?;
    assert_eq!(view.view.lifetime, "1 dias, 2 horas");

    let closed = ctx.ticket_service
        .update(ticket.ticket.id, UpdateTicketRequest {
            status: Some(TicketStatus::Closed),
            ..Default::default()
        })
        .await?;
    assert!(closed.ticket.closed_at.is_some());

    clock.advance(Duration::days(10));
    let view = ctx.ticket_service.get(ticket.ticket.id).await?;
    assert_eq!(view.view.lifetime, "1 dias, 2 horas");

    // Reopening clears closed_at and the clock runs again
    let reopened = ctx.ticket_service
        .update(ticket.ticket.id, UpdateTicketRequest {
            status: Some(TicketStatus::Open),
            ..Default::default()
        })
        .await?;
    assert!(reopened.ticket.closed_at.is_none());
    assert_eq!(reopened.lifetime, "11 dias, 2 horas");

    Ok(())
}

#[tokio::test]
async fn test_list_search_filter_and_lifetime_sort() -> anyhow::Result<()> {
    let (ctx, clock) = setup().await?;
    let (acme, ana) = org_with_member(&ctx, "Acme", "Ana").await?;

    let oldest = ctx.ticket_service.create(request(&acme, &ana, "Printer jam", TicketStatus::Open)).await?;
    clock.advance(Duration::hours(5));
    ctx.ticket_service.create(request(&acme, &ana, "VPN down", TicketStatus::Open)).await?;
    clock.advance(Duration::hours(5));
    ctx.ticket_service.create(request(&acme, &ana, "printer toner", TicketStatus::Closed)).await?;
    clock.advance(Duration::hours(1));

    let page = ctx.ticket_service.list(TicketFilter {
        search: Some("PRINTER".to_string()),
        limit: 50,
        ..Default::default()
    }).await?;
    assert_eq!(page.total, 2);

    let page = ctx.ticket_service.list(TicketFilter {
        status: Some(TicketStatus::Open),
        sort: TicketSort::Lifetime,
        direction: SortDirection::Desc,
        limit: 50,
        ..Default::default()
    }).await?;
    assert_eq!(page.total, 2);
    assert_eq!(page.tickets[0].ticket.id, oldest.ticket.id);
    assert_eq!(page.tickets[0].lifetime, "0 dias, 11 horas");

    let page = ctx.ticket_service.list(TicketFilter {
        limit: 1,
        offset: 1,
        ..Default::default()
    }).await?;
    assert_eq!(page.total, 3);
    assert_eq!(page.tickets.len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_search_folds_unicode_case_and_matches_wildcards_literally() -> anyhow::Result<()> {
    let (ctx, _clock) = setup().await?;
    let (acme, ana) = org_with_member(&ctx, "Acme", "Ana").await?;

    ctx.ticket_service.create(request(&acme, &ana, "Solicitação urgente", TicketStatus::Open)).await?;
    ctx.ticket_service.create(request(&acme, &ana, "Desconto de 50% no plano", TicketStatus::Open)).await?;
    ctx.ticket_service.create(request(&acme, &ana, "Printer", TicketStatus::Open)).await?;

    let hits = |term: &str| {
        let filter = TicketFilter {
            search: Some(term.to_string()),
            limit: 50,
            ..Default::default()
        };
        let service = ctx.ticket_service.clone();
        async move { service.list(filter).await.map(|page| page.total) }
    };

    assert_eq!(hits("SOLICITAÇÃO").await?, 1);
    assert_eq!(hits("solicitação").await?, 1);
    assert_eq!(hits("%").await?, 1);
    assert_eq!(hits("_").await?, 0);
    assert_eq!(hits("50% NO").await?, 1);

    Ok(())
}

#[tokio::test]
async fn test_attachments_follow_the_ticket() -> anyhow::Result<()> {
    let (ctx, _clock) = setup().await?;
    let (acme, ana) = org_with_member(&ctx, "Acme", "Ana").await?;
    let store = &ctx.attachments;

    let first_pdf = store.save(AttachmentKind::File, "invoice.pdf", b"%PDF-1").await?;
    let second_pdf = store.save(AttachmentKind::File, "invoice-v2.pdf", b"%PDF-2").await?;
    let first_image = store.save(AttachmentKind::Image, "screen.png", b"png-1").await?;
    let second_image = store.save(AttachmentKind::Image, "screen-2.png", b"png-2").await?;

    let mut with_files = request(&acme, &ana, "Billing", TicketStatus::Open);
    with_files.files = vec![first_pdf.clone()];
    with_files.image_path = Some(first_image.clone());
    let ticket = ctx.ticket_service.create(with_files).await?;

    // Paths must come from the store and cannot be shared between tickets
    let mut shared = request(&acme, &ana, "Copy", TicketStatus::Open);
    shared.files = vec![first_pdf.clone()];
    assert!(matches!(ctx.ticket_service.create(shared).await.unwrap_err(), AppError::Validation(_)));

    let mut unknown = request(&acme, &ana, "Unknown", TicketStatus::Open);
    unknown.files = vec!["files/never-uploaded.pdf".to_string()];
    assert!(matches!(ctx.ticket_service.create(unknown).await.unwrap_err(), AppError::Validation(_)));

    let mut wrong_kind = request(&acme, &ana, "Wrong kind", TicketStatus::Open);
    wrong_kind.image_path = Some(second_pdf.clone());
    assert!(matches!(ctx.ticket_service.create(wrong_kind).await.unwrap_err(), AppError::Validation(_)));

    // Replacing the file list removes the dropped upload
    ctx.ticket_service
        .update(ticket.ticket.id, UpdateTicketRequest {
            files: Some(vec![second_pdf.clone()]),
            ..Default::default()
        })
        .await?;
    assert!(store.ensure_stored(AttachmentKind::File, &first_pdf).await.is_err());
    assert!(store.ensure_stored(AttachmentKind::File, &second_pdf).await.is_ok());
    assert!(store.ensure_stored(AttachmentKind::Image, &first_image).await.is_ok());

    ctx.ticket_service
        .update(ticket.ticket.id, UpdateTicketRequest {
            image_path: Some(second_image.clone()),
            ..Default::default()
        })
        .await?;
    assert!(store.ensure_stored(AttachmentKind::Image, &first_image).await.is_err());

    ctx.ticket_service.delete(ticket.ticket.id).await?;
    assert!(store.ensure_stored(AttachmentKind::File, &second_pdf).await.is_err());
    assert!(store.ensure_stored(AttachmentKind::Image, &second_image).await.is_err());

    Ok(())
}

#[tokio::test]
async fn test_delete_removes_responses() -> anyhow::Result<()> {
    let (ctx, _clock) = setup().await?;
    let (acme, ana) = org_with_member(&ctx, "Acme", "Ana").await?;

    let ticket = ctx.ticket_service.create(request(&acme, &ana, "Printer", TicketStatus::Open)).await?;
    let response = ctx.ticket_service
        .add_response(ticket.ticket.id, CreateTicketResponseRequest {
            user_id: ana.id,
            message: "<p>Still broken</p>".to_string(),
        })
        .await?;
    assert_eq!(ctx.ticket_service.list_responses(ticket.ticket.id).await?.len(), 1);

    ctx.ticket_service.delete(ticket.ticket.id).await?;

    assert!(matches!(
        ctx.ticket_service.get(ticket.ticket.id).await.unwrap_err(),
        AppError::NotFound(_)
    ));
    assert!(matches!(
        ctx.ticket_service.delete_response(ticket.ticket.id, response.id).await.unwrap_err(),
        AppError::NotFound(_)
    ));

    let deleted = ctx.ticket_service.delete_many(&[ticket.ticket.id, uuid::Uuid::new_v4()]).await?;
    assert_eq!(deleted, 0);

    Ok(())
}
