pub mod booking;
pub mod inventory;
pub mod reconciliation;

pub use booking::{BookingService, CreateBookingInput};
pub use inventory::{InventoryService, NewRoom};
pub use reconciliation::{Checkout, ReconciliationService};
