pub mod memory_booking_repository;
pub mod postgres_booking_repository;

pub use memory_booking_repository::InMemoryBookingRepository;
pub use postgres_booking_repository::PostgresBookingRepository;
