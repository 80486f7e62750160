use clap::Parser;
use hostel_booking_core::cli::{BookingCommands, Cli, Commands, DbCommands, RoomCommands};
use hostel_booking_core::services::NewRoom;
use hostel_booking_core::{
    adapters::PostgresBookingRepository, cli, config::Config, create_app, cors_layer, db,
    gateway::HttpPaymentGateway, AppState,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let args = Cli::parse();
    let config = Config::from_env()?;

    match args.command {
        None | Some(Commands::Serve) => serve(config).await,
        Some(Commands::Db(DbCommands::Migrate)) => cli::handle_db_migrate(&config).await,
        Some(Commands::Config) => cli::handle_config_validate(&config),
        Some(Commands::Booking(command)) => {
            let pool = db::create_pool(&config).await?;
            match command {
                BookingCommands::Cancel { booking_id } => {
                    cli::handle_booking_cancel(&pool, &config, booking_id).await
                }
                BookingCommands::Complete { booking_id } => {
                    cli::handle_booking_complete(&pool, &config, booking_id).await
                }
            }
        }
        Some(Commands::Room(RoomCommands::Add {
            property_id,
            room_number,
            room_type,
            capacity,
            daily_rate,
            monthly_rate,
            security_deposit,
        })) => {
            let pool = db::create_pool(&config).await?;
            let room = NewRoom {
                property_id,
                room_number,
                room_type,
                capacity,
                daily_rate,
                monthly_rate,
                security_deposit,
            };
            cli::handle_room_add(&pool, room).await
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    config.validate()?;

    let pool = db::create_pool(&config).await?;
    db::run_migrations(&pool).await?;

    let gateway = HttpPaymentGateway::with_circuit_breaker(
        config.payment_gateway_url.clone(),
        config.payment_gateway_key_id.clone(),
        config.payment_gateway_key_secret.clone(),
        config.gateway_failure_threshold,
        config.gateway_reset_timeout_secs,
    );
    tracing::info!(url = %config.payment_gateway_url, "Payment gateway client initialized");

    let state = AppState::new(
        Arc::new(PostgresBookingRepository::new(pool)),
        Arc::new(gateway),
        config.pricing_policy(),
        config.payment_currency.clone(),
    );

    let app = create_app(state).layer(cors_layer(config.cors_allowed_origins.as_deref()));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    tracing::info!("listening on {}", addr);

    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
