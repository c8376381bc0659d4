use std::sync::Arc;

use backoffice::{
    clock::SystemClock,
    config::Settings,
    domain::{
        CreateRefundRequest, CreateSubscriptionRequest, CreateTicketRequest,
        CreateTicketResponseRequest, CreateUserRequest, RefundReason, TicketPriority,
        TicketStatus, TicketType,
    },
    service::ServiceContext,
};
use clap::Parser;
use fake::faker::company::en::CompanyName;
use fake::faker::internet::en::SafeEmail;
use fake::faker::lorem::en::{Paragraph, Sentence};
use fake::faker::name::en::Name;
use fake::Fake;
use rand::Rng;
use sqlx::sqlite::SqlitePoolOptions;

#[derive(Parser)]
#[command(name = "seed")]
#[command(about = "Fill a backoffice database with sample organizations, tickets and refunds")]
struct Args {
    /// Database URL
    #[arg(long, default_value = "sqlite://backoffice.db?mode=rwc")]
    database_url: String,

    /// Number of organizations to create
    #[arg(long, default_value_t = 3)]
    organizations: usize,

    /// Members per organization
    #[arg(long, default_value_t = 4)]
    members: usize,

    /// Tickets per organization
    #[arg(long, default_value_t = 8)]
    tickets: usize,

    #[arg(long, default_value = "admin@backoffice.local")]
    admin_email: String,

    #[arg(long, default_value = "admin123")]
    admin_password: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    println!("🌱 Starting database seeding...");

    let db_pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&args.database_url)
        .await?;

    println!("📋 Running migrations...");
    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await?;

    let mut settings = Settings::default();
    settings.database.url = args.database_url.clone();
    let ctx = ServiceContext::new(db_pool.clone(), &settings, Arc::new(SystemClock));

    println!("👤 Creating admin user...");
    let admin = ctx.user_repo.create(CreateUserRequest {
        name: "Administrador".to_string(),
        email: args.admin_email.clone(),
        password: Some(args.admin_password.clone()),
        is_admin: true,
    }).await?;
    println!("  ✅ {} / {}", args.admin_email, args.admin_password);

    let mut rng = rand::thread_rng();
    let mut ticket_count = 0;
    let mut refund_count = 0;

    println!("🏢 Creating organizations, members and tickets...");
    for org_index in 0..args.organizations {
        let org_name: String = CompanyName().fake();
        let organization = ctx.organization_repo.create(&org_name).await?;

        let mut members = Vec::with_capacity(args.members);
        for _ in 0..args.members {
            let user = ctx.user_repo.create(CreateUserRequest {
                name: Name().fake(),
                email: SafeEmail().fake(),
                password: None,
                is_admin: false,
            }).await?;
            ctx.organization_repo.add_member(organization.id, user.id).await?;
            members.push(user);
        }

        if !members.is_empty() {
            for _ in 0..args.tickets {
                let requester = &members[rng.gen_range(0..members.len())];
                let sentence: String = Sentence(2..6).fake();
                let paragraph: String = Paragraph(1..3).fake();

                let ticket = ctx.ticket_service.create(CreateTicketRequest {
                    title: sentence.chars().take(50).collect(),
                    description: format!("<p>{}</p>", paragraph),
                    organization_id: organization.id,
                    user_id: requester.id,
                    status: pick(&mut rng, &TicketStatus::ALL),
                    ticket_type: pick(&mut rng, &TicketType::ALL),
                    priority: pick(&mut rng, &TicketPriority::ALL),
                    files: Vec::new(),
                    image_path: None,
                }).await?;

                let reply: String = Sentence(4..10).fake();
                ctx.ticket_service.add_response(ticket.ticket.id, CreateTicketResponseRequest {
                    user_id: admin.id,
                    message: format!("<p>{}</p>", reply),
                }).await?;
                ticket_count += 1;
            }
        }

        let subscription = ctx.subscription_repo.create(CreateSubscriptionRequest {
            organization_id: organization.id,
            stripe_subscription_id: format!("sub_seed_{:04}", org_index),
            price_id: Some("price_seed_monthly".to_string()),
            status: "active".to_string(),
        }).await?;

        if org_index % 2 == 0 {
            ctx.refund_service.request_refund(CreateRefundRequest {
                subscription_id: subscription.id,
                refund_id: format!("re_seed_{:04}", org_index),
                amount: 4990,
                currency: "brl".to_string(),
                reason: Some(RefundReason::RequestedByCustomer),
                reference: None,
            }).await?;
            refund_count += 1;
        }

        println!("  ✅ {} ({} members)", organization.name, members.len());
    }

    println!("\n🎉 Seeding complete!");
    println!("  Organizations: {}", args.organizations);
    println!("  Tickets:       {}", ticket_count);
    println!("  Refunds:       {}", refund_count);

    Ok(())
}

fn pick<T: Copy>(rng: &mut impl Rng, values: &[T]) -> T {
    values[rng.gen_range(0..values.len())]
}
