use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::routing::get;
use axum::{Extension, Router};
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use tracing::info;

use rentroll::config::AppConfig;
use rentroll::domain::{Service, ServiceId, ServiceKind};
use rentroll::error::AppError;
use rentroll::http::{app_router, healthcheck, metrics_endpoint, readiness_endpoint, AppState};
use rentroll::mailer::LoggingMailer;
use rentroll::store::{InMemoryStore, RecordStore};
use rentroll::telemetry;
use rentroll::workflows::billing::proration;

#[derive(Parser, Debug)]
#[command(
    name = "Rentroll",
    about = "Run the tenancy and billing back office from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Billing utilities for operators
    Billing {
        #[command(subcommand)]
        command: BillingCommand,
    },
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    port: Option<u16>,
}

#[derive(Subcommand, Debug)]
enum BillingCommand {
    /// Preview the prorated rent a bulk draft run would charge
    PreviewProration(PreviewProrationArgs),
}

#[derive(Args, Debug)]
struct PreviewProrationArgs {
    /// Full monthly room price in minor currency units
    #[arg(long)]
    monthly_price: i64,
    /// Most recent payment date (YYYY-MM-DD), if any
    #[arg(long, value_parser = parse_date)]
    last_paid: Option<NaiveDate>,
    /// Tenant move-in date (YYYY-MM-DD), if any
    #[arg(long, value_parser = parse_date)]
    move_in: Option<NaiveDate>,
    /// Billing date for the preview (defaults to today)
    #[arg(long, value_parser = parse_date)]
    today: Option<NaiveDate>,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run_cli().await {
        eprintln!("application error: {err}");
        std::process::exit(1);
    }
}

async fn run_cli() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => run_server(args).await,
        Command::Billing {
            command: BillingCommand::PreviewProration(args),
        } => run_proration_preview(args),
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

async fn run_server(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = telemetry::metrics_pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = Arc::new(InMemoryStore::new());
    seed_service_catalog(&store)?;
    let mailer = Arc::new(LoggingMailer);

    let app = app_router(store, mailer, config.billing.due_day)
        .merge(
            Router::new()
                .route("/health", get(healthcheck))
                .route("/ready", get(readiness_endpoint))
                .route("/metrics", get(metrics_endpoint)),
        )
        .layer(Extension(state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "tenancy and billing service ready");

    axum::serve(listener, app).await?;
    Ok(())
}

/// The standard metered and flat services every property starts with.
/// Operators adjust prices through the API once the server is up.
fn seed_service_catalog(store: &InMemoryStore) -> Result<(), AppError> {
    let catalog = [
        ("svc-electric", "Electricity", ServiceKind::Electricity, 3_500, "kWh"),
        ("svc-water", "Water", ServiceKind::Water, 15_000, "m3"),
        ("svc-internet", "Internet", ServiceKind::Internet, 100_000, "month"),
    ];
    for (id, name, kind, unit_price, unit) in catalog {
        store.insert_service(Service {
            id: ServiceId(id.to_string()),
            name: name.to_string(),
            kind,
            unit_price,
            unit: unit.to_string(),
            active: true,
        })?;
    }
    info!(services = catalog.len(), "service catalog seeded");
    Ok(())
}

fn run_proration_preview(args: PreviewProrationArgs) -> Result<(), AppError> {
    let today = args.today.unwrap_or_else(|| Local::now().date_naive());
    let (anchor, rule) = proration::resolve_anchor(args.last_paid, args.move_in, today);
    let result = proration::prorate(args.monthly_price, anchor, rule, today);

    println!("Proration preview for {today}");
    println!("Anchor: {} ({})", result.anchor, result.rule.describe());
    println!("Elapsed days: {}", result.elapsed_days);
    println!(
        "Daily rate: {:.2} (monthly {} / 30)",
        args.monthly_price as f64 / 30.0,
        args.monthly_price
    );
    println!("Prorated rent: {}", result.amount);

    Ok(())
}
