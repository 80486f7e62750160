//! Booking domain.
//! Framework-agnostic entities and the rules that govern them.

pub mod booking;
pub mod lifecycle;
pub mod payment;
pub mod pricing;
pub mod role;
pub mod room;

pub use booking::{Booking, BookingStatus};
pub use payment::{Payment, PaymentConfirmation, PaymentFailure, PaymentStatus};
pub use pricing::{BookingType, PriceQuote, PricingError, PricingPolicy};
pub use role::{Caller, Role};
pub use room::{Room, RoomType};
