use bigdecimal::BigDecimal;
use clap::{Parser, Subcommand};
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use crate::adapters::PostgresBookingRepository;
use crate::config::{mask_password, mask_secret, Config};
use crate::domain::RoomType;
use crate::services::{BookingService, InventoryService, NewRoom};

#[derive(Parser)]
#[command(name = "hostel-booking-core")]
#[command(about = "Hostel Booking Core - pricing, booking lifecycle and payment reconciliation", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server (default)
    Serve,

    /// Booking operator commands
    #[command(subcommand)]
    Booking(BookingCommands),

    /// Room inventory commands
    #[command(subcommand)]
    Room(RoomCommands),

    /// Database management commands
    #[command(subcommand)]
    Db(DbCommands),

    /// Configuration validation
    Config,
}

#[derive(Subcommand)]
pub enum BookingCommands {
    /// Cancel a pending or confirmed booking, releasing its spots
    Cancel {
        #[arg(value_name = "BOOKING_ID")]
        booking_id: Uuid,
    },

    /// Mark a confirmed booking as completed
    Complete {
        #[arg(value_name = "BOOKING_ID")]
        booking_id: Uuid,
    },
}

#[derive(Subcommand)]
pub enum RoomCommands {
    /// Register a room listing
    Add {
        #[arg(long)]
        property_id: Uuid,
        #[arg(long)]
        room_number: String,
        /// shared, private or semi_private
        #[arg(long, default_value = "shared")]
        room_type: RoomType,
        #[arg(long)]
        capacity: i32,
        #[arg(long)]
        daily_rate: BigDecimal,
        #[arg(long)]
        monthly_rate: BigDecimal,
        #[arg(long)]
        security_deposit: Option<BigDecimal>,
    },
}

#[derive(Subcommand)]
pub enum DbCommands {
    /// Run database migrations
    Migrate,
}

fn booking_service(pool: &PgPool, config: &Config) -> BookingService {
    let repository = Arc::new(PostgresBookingRepository::new(pool.clone()));
    BookingService::new(repository, config.pricing_policy())
}

pub async fn handle_booking_cancel(
    pool: &PgPool,
    config: &Config,
    booking_id: Uuid,
) -> anyhow::Result<()> {
    let cancellation = booking_service(pool, config).cancel(booking_id).await?;

    println!("✓ Booking {} cancelled", booking_id);
    println!(
        "  Room {} occupancy: {}/{}",
        cancellation.room.room_number,
        cancellation.room.current_occupancy,
        cancellation.room.capacity
    );
    if let Some(payment) = cancellation.payment {
        println!("  Payment {}: {}", payment.order_id, payment.status);
    }
    Ok(())
}

pub async fn handle_booking_complete(
    pool: &PgPool,
    config: &Config,
    booking_id: Uuid,
) -> anyhow::Result<()> {
    let booking = booking_service(pool, config).complete(booking_id).await?;
    println!("✓ Booking {} marked as {}", booking.id, booking.status);
    Ok(())
}

pub async fn handle_room_add(pool: &PgPool, room: NewRoom) -> anyhow::Result<()> {
    let repository = Arc::new(PostgresBookingRepository::new(pool.clone()));
    let room = InventoryService::new(repository).register_room(room).await?;

    println!("✓ Room registered");
    println!("  ID: {}", room.id);
    println!("  Number: {} ({})", room.room_number, room.room_type);
    println!("  Capacity: {}", room.capacity);
    println!(
        "  Rates: {} daily, {} monthly, {} deposit",
        room.daily_rate, room.monthly_rate, room.security_deposit
    );
    Ok(())
}

pub async fn handle_db_migrate(config: &Config) -> anyhow::Result<()> {
    let pool = crate::db::create_pool(config).await?;

    tracing::info!("Running database migrations...");
    crate::db::run_migrations(&pool).await?;

    println!("✓ Database migrations completed");
    Ok(())
}

pub fn handle_config_validate(config: &Config) -> anyhow::Result<()> {
    tracing::info!("Validating configuration...");
    config.validate()?;

    println!("Configuration:");
    println!("  Server Port: {}", config.server_port);
    println!("  Database URL: {}", mask_password(&config.database_url));
    println!("  Database Max Connections: {}", config.database_max_connections);
    println!("  Payment Gateway URL: {}", config.payment_gateway_url);
    println!("  Payment Gateway Key ID: {}", config.payment_gateway_key_id);
    println!(
        "  Payment Gateway Key Secret: {}",
        mask_secret(&config.payment_gateway_key_secret)
    );
    println!("  Payment Currency: {}", config.payment_currency);
    println!("  Monthly Proration Days: {}", config.monthly_proration_days);
    println!(
        "  Gateway Circuit Breaker: {} failures, {}s reset",
        config.gateway_failure_threshold, config.gateway_reset_timeout_secs
    );
    match &config.cors_allowed_origins {
        Some(origins) => println!("  CORS Allowed Origins: {}", origins.join(", ")),
        None => println!("  CORS Allowed Origins: any"),
    }

    tracing::info!("Configuration is valid");
    println!("✓ Configuration is valid");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_booking_cancel() {
        let id = Uuid::new_v4();
        let cli = Cli::try_parse_from(["hostel-booking-core", "booking", "cancel", id.to_string().as_str()])
            .unwrap();
        match cli.command {
            Some(Commands::Booking(BookingCommands::Cancel { booking_id })) => {
                assert_eq!(booking_id, id)
            }
            _ => panic!("expected booking cancel"),
        }
    }

    #[test]
    fn test_parse_room_add() {
        let property = Uuid::new_v4();
        let cli = Cli::try_parse_from([
            "hostel-booking-core",
            "room",
            "add",
            "--property-id",
            property.to_string().as_str(),
            "--room-number",
            "101",
            "--room-type",
            "semi_private",
            "--capacity",
            "4",
            "--daily-rate",
            "800",
            "--monthly-rate",
            "15000",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Room(RoomCommands::Add {
                room_type,
                capacity,
                security_deposit,
                ..
            })) => {
                assert_eq!(room_type, RoomType::SemiPrivate);
                assert_eq!(capacity, 4);
                assert!(security_deposit.is_none());
            }
            _ => panic!("expected room add"),
        }
    }

    #[test]
    fn test_no_subcommand_means_serve() {
        let cli = Cli::try_parse_from(["hostel-booking-core"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_invalid_booking_id_rejected() {
        assert!(Cli::try_parse_from(["hostel-booking-core", "booking", "complete", "abc"]).is_err());
    }
}
