use async_trait::async_trait;
use failsafe::futures::CircuitBreaker as FuturesCircuitBreaker;
use failsafe::{backoff, failure_policy, Config, Error as FailsafeError, StateMachine};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::ports::{GatewayError, OrderRequest, PaymentGateway};

#[derive(Debug, Serialize)]
struct CreateOrderBody<'a> {
    amount: i64,
    currency: &'a str,
    receipt: &'a str,
    payment_capture: u8,
}

/// Response from the gateway /v1/orders endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderResponse {
    pub id: String,
    pub amount: Option<i64>,
    pub currency: Option<String>,
    pub receipt: Option<String>,
    pub status: Option<String>,
}

/// HTTP client for an order-based payment gateway
#[derive(Clone)]
pub struct HttpPaymentGateway {
    client: Client,
    base_url: String,
    key_id: String,
    key_secret: String,
    circuit_breaker: StateMachine<failure_policy::ConsecutiveFailures<backoff::EqualJittered>, ()>,
}

impl HttpPaymentGateway {
    /// Creates a gateway client with the default circuit breaker (3 failures, 60s reset)
    pub fn new(base_url: String, key_id: String, key_secret: String) -> Self {
        Self::with_circuit_breaker(base_url, key_id, key_secret, 3, 60)
    }

    pub fn with_circuit_breaker(
        base_url: String,
        key_id: String,
        key_secret: String,
        failure_threshold: u32,
        reset_timeout_secs: u64,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        let backoff = backoff::equal_jittered(
            Duration::from_secs(reset_timeout_secs),
            Duration::from_secs(reset_timeout_secs * 2),
        );
        let policy = failure_policy::consecutive_failures(failure_threshold, backoff);
        let circuit_breaker = Config::new().failure_policy(policy).build();

        HttpPaymentGateway {
            client,
            base_url,
            key_id,
            key_secret,
            circuit_breaker,
        }
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    fn key_id(&self) -> &str {
        &self.key_id
    }

    async fn create_order(&self, request: &OrderRequest) -> Result<String, GatewayError> {
        let url = format!("{}/v1/orders", self.base_url.trim_end_matches('/'));
        let client = self.client.clone();
        let key_id = self.key_id.clone();
        let key_secret = self.key_secret.clone();
        let request = request.clone();

        let result = self
            .circuit_breaker
            .call(async move {
                let body = CreateOrderBody {
                    amount: request.amount_minor,
                    currency: &request.currency,
                    receipt: &request.receipt,
                    payment_capture: 1,
                };
                let response = client
                    .post(&url)
                    .basic_auth(key_id, Some(key_secret))
                    .json(&body)
                    .send()
                    .await?;

                let status = response.status();
                if !status.is_success() {
                    let body = response.text().await.unwrap_or_default();
                    return Err(GatewayError::Rejected {
                        status: status.as_u16(),
                        body,
                    });
                }

                let order = response.json::<OrderResponse>().await?;
                if order.id.trim().is_empty() {
                    return Err(GatewayError::InvalidResponse(
                        "order id missing".to_string(),
                    ));
                }
                Ok(order.id)
            })
            .await;

        match result {
            Ok(order_id) => Ok(order_id),
            Err(FailsafeError::Rejected) => Err(GatewayError::CircuitBreakerOpen(
                "payment gateway circuit breaker is open".to_string(),
            )),
            Err(FailsafeError::Inner(e)) => Err(e),
        }
    }

    fn verify_signature(&self, order_id: &str, payment_id: &str, signature: &str) -> bool {
        super::verify_signature(order_id, payment_id, signature, &self.key_secret)
    }

    fn verify_failure_signature(&self, order_id: &str, reason: &str, signature: &str) -> bool {
        super::verify_failure_signature(order_id, reason, signature, &self.key_secret)
    }

    fn circuit_state(&self) -> String {
        if self.circuit_breaker.is_call_permitted() {
            "closed".to_string()
        } else {
            "open".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{sign_failure, sign_payment};

    fn order_request() -> OrderRequest {
        OrderRequest {
            amount_minor: 740_000,
            currency: "INR".to_string(),
            receipt: "booking_1".to_string(),
        }
    }

    #[test]
    fn test_gateway_client_creation() {
        let gateway = HttpPaymentGateway::new(
            "https://api.gateway.test".to_string(),
            "rzp_test_key".to_string(),
            "secret".to_string(),
        );
        assert_eq!(gateway.base_url, "https://api.gateway.test");
        assert_eq!(gateway.key_id(), "rzp_test_key");
        assert_eq!(gateway.circuit_state(), "closed");
    }

    #[test]
    fn test_verifies_with_key_secret() {
        let gateway = HttpPaymentGateway::new(
            "https://api.gateway.test".to_string(),
            "rzp_test_key".to_string(),
            "secret".to_string(),
        );
        let signature = sign_payment("order_1", "pay_1", "secret");
        assert!(gateway.verify_signature("order_1", "pay_1", &signature));
        assert!(!gateway.verify_signature("order_1", "pay_9", &signature));

        let failure = sign_failure("order_1", "declined", "secret");
        assert!(gateway.verify_failure_signature("order_1", "declined", &failure));
        assert!(!gateway.verify_failure_signature("order_1", "declined", &signature));
    }

    #[tokio::test]
    async fn test_create_order_with_mock() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/orders")
            .match_header("authorization", mockito::Matcher::Regex("^Basic ".to_string()))
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "amount": 740000,
                "currency": "INR",
                "receipt": "booking_1",
                "payment_capture": 1
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id":"order_EKwxwAgItmmXdp","amount":740000,"currency":"INR","receipt":"booking_1","status":"created"}"#)
            .create_async()
            .await;

        let gateway = HttpPaymentGateway::new(server.url(), "key".to_string(), "secret".to_string());
        let order_id = gateway.create_order(&order_request()).await.unwrap();
        assert_eq!(order_id, "order_EKwxwAgItmmXdp");
    }

    #[tokio::test]
    async fn test_create_order_rejected() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/orders")
            .with_status(400)
            .with_body(r#"{"error":{"code":"BAD_REQUEST_ERROR"}}"#)
            .create_async()
            .await;

        let gateway = HttpPaymentGateway::new(server.url(), "key".to_string(), "secret".to_string());
        let result = gateway.create_order(&order_request()).await;
        assert!(matches!(result, Err(GatewayError::Rejected { status: 400, .. })));
    }

    #[tokio::test]
    async fn test_circuit_breaker_opens_after_failures() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/orders")
            .with_status(500)
            .expect_at_least(3)
            .create_async()
            .await;

        let gateway = HttpPaymentGateway::with_circuit_breaker(
            server.url(),
            "key".to_string(),
            "secret".to_string(),
            3,
            60,
        );

        for _ in 0..3 {
            let _ = gateway.create_order(&order_request()).await;
        }

        let result = gateway.create_order(&order_request()).await;
        assert!(matches!(result, Err(GatewayError::CircuitBreakerOpen(_))));
        assert_eq!(gateway.circuit_state(), "open");
    }
}
