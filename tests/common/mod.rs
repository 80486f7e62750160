#![allow(dead_code)]

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use hostel_booking_core::adapters::InMemoryBookingRepository;
use hostel_booking_core::domain::{
    Booking, Caller, PaymentConfirmation, PaymentFailure, PricingPolicy, Role, Room, RoomType,
};
use hostel_booking_core::gateway::{
    sign_failure, sign_payment, verify_failure_signature, verify_signature,
};
use hostel_booking_core::ports::{BookingRepository, GatewayError, OrderRequest, PaymentGateway};
use hostel_booking_core::services::{BookingService, CreateBookingInput, ReconciliationService};
use hostel_booking_core::AppState;

pub const KEY_ID: &str = "key_test_123";
pub const KEY_SECRET: &str = "test-gateway-secret";
pub const CURRENCY: &str = "INR";

/// Order-based gateway double. Hands out sequential order ids and signs the way the
/// real gateway does.
#[derive(Default)]
pub struct FakeGateway {
    next_order: AtomicU64,
    failing: AtomicBool,
    requests: Mutex<Vec<OrderRequest>>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn orders_created(&self) -> u64 {
        self.next_order.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<OrderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    fn key_id(&self) -> &str {
        KEY_ID
    }

    async fn create_order(&self, request: &OrderRequest) -> Result<String, GatewayError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(GatewayError::Rejected {
                status: 502,
                body: "upstream unavailable".to_string(),
            });
        }
        self.requests.lock().unwrap().push(request.clone());
        let n = self.next_order.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("order_{:06}", n))
    }

    fn verify_signature(&self, order_id: &str, payment_id: &str, signature: &str) -> bool {
        verify_signature(order_id, payment_id, signature, KEY_SECRET)
    }

    fn verify_failure_signature(&self, order_id: &str, reason: &str, signature: &str) -> bool {
        verify_failure_signature(order_id, reason, signature, KEY_SECRET)
    }
}

pub struct Harness {
    pub repository: Arc<InMemoryBookingRepository>,
    pub gateway: Arc<FakeGateway>,
    pub bookings: BookingService,
    pub reconciliation: ReconciliationService,
}

impl Harness {
    pub fn new() -> Self {
        let repository = Arc::new(InMemoryBookingRepository::new());
        let gateway = Arc::new(FakeGateway::new());
        Self {
            bookings: BookingService::new(repository.clone(), PricingPolicy::default()),
            reconciliation: ReconciliationService::new(
                repository.clone(),
                gateway.clone(),
                CURRENCY.to_string(),
            ),
            repository,
            gateway,
        }
    }

    pub fn app_state(&self) -> AppState {
        AppState::new(
            self.repository.clone(),
            self.gateway.clone(),
            PricingPolicy::default(),
            CURRENCY.to_string(),
        )
    }

    /// Capacity 4, daily 800, monthly 15000, deposit 5000.
    pub async fn standard_room(&self) -> Room {
        self.room_with(4, 0).await
    }

    pub async fn room_with(&self, capacity: i32, occupancy: i32) -> Room {
        let mut room = Room::new(
            Uuid::new_v4(),
            "101".to_string(),
            RoomType::Shared,
            capacity,
            money("800"),
            money("15000"),
            money("5000"),
        );
        room.current_occupancy = occupancy;
        self.repository.insert_room(&room).await.unwrap()
    }

    pub async fn room(&self, id: Uuid) -> Room {
        self.repository.get_room(id).await.unwrap()
    }

    pub async fn pending_booking(&self, room: &Room, guests: i32) -> Booking {
        self.bookings
            .create_booking(&guest(), daily_input(room.id, guests))
            .await
            .unwrap()
    }

    /// A pending booking with an open gateway order; returns the booking and its order id.
    pub async fn booking_with_order(&self, room: &Room, guests: i32) -> (Booking, String) {
        let booking = self.pending_booking(room, guests).await;
        let payment = self.reconciliation.open_order(booking.id).await.unwrap();
        (booking, payment.order_id)
    }
}

pub fn money(value: &str) -> BigDecimal {
    BigDecimal::from_str(value).unwrap()
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

pub fn guest() -> Caller {
    Caller::new(Uuid::new_v4(), Role::User)
}

pub fn admin() -> Caller {
    Caller::new(Uuid::new_v4(), Role::Admin)
}

/// Three nights from 2024-06-01.
pub fn daily_input(room_id: Uuid, guests: i32) -> CreateBookingInput {
    CreateBookingInput {
        room_id,
        booking_type: "daily".to_string(),
        check_in_date: date(2024, 6, 1),
        check_out_date: date(2024, 6, 4),
        guests,
        special_requests: None,
    }
}

pub fn signed(order_id: &str, payment_id: &str) -> PaymentConfirmation {
    PaymentConfirmation {
        order_id: order_id.to_string(),
        payment_id: payment_id.to_string(),
        signature: sign_payment(order_id, payment_id, KEY_SECRET),
    }
}

pub fn signed_failure(order_id: &str, reason: Option<&str>) -> PaymentFailure {
    PaymentFailure {
        order_id: order_id.to_string(),
        reason: reason.map(str::to_string),
        signature: sign_failure(order_id, reason.unwrap_or(""), KEY_SECRET),
    }
}
