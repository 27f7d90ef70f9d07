//! Stripe REST client over `reqwest`.

use std::sync::Arc;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use super::PaymentError;
use super::types::{Balance, Customer, ErrorBody, List, PaymentIntent, Refund, RefundReason};
use crate::config::StripeConfig;

/// Timeout for a single Stripe request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Parameters for creating a payment intent.
#[derive(Debug)]
pub struct CreateIntent<'a> {
    /// Amount in minor units.
    pub amount: i64,
    /// Lowercase ISO 4217 code.
    pub currency: &'a str,
    pub customer_id: &'a str,
    pub order_id: i32,
    pub order_number: &'a str,
    pub receipt_email: &'a str,
}

/// Stripe API client.
#[derive(Clone)]
pub struct StripeClient {
    inner: Arc<StripeClientInner>,
}

struct StripeClientInner {
    client: reqwest::Client,
    secret_key: SecretString,
    api_base: String,
}

impl std::fmt::Debug for StripeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeClient")
            .field("secret_key", &"[REDACTED]")
            .field("api_base", &self.inner.api_base)
            .finish_non_exhaustive()
    }
}

impl StripeClient {
    /// Create a new Stripe client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &StripeConfig) -> Result<Self, PaymentError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            inner: Arc::new(StripeClientInner {
                client,
                secret_key: config.secret_key.clone(),
                api_base: config.api_base.clone(),
            }),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.inner.api_base)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, PaymentError> {
        let response = self
            .inner
            .client
            .get(self.url(path))
            .bearer_auth(self.inner.secret_key.expose_secret())
            .query(query)
            .send()
            .await?;
        handle_response(response).await
    }

    async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        form: &[(&str, String)],
    ) -> Result<T, PaymentError> {
        let response = self
            .inner
            .client
            .post(self.url(path))
            .bearer_auth(self.inner.secret_key.expose_secret())
            .form(form)
            .send()
            .await?;
        handle_response(response).await
    }

    /// Find the first customer with this email.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self, email))]
    pub async fn find_customer_by_email(
        &self,
        email: &str,
    ) -> Result<Option<Customer>, PaymentError> {
        let list: List<Customer> = self
            .get("/v1/customers", &[("email", email), ("limit", "1")])
            .await?;
        Ok(list.data.into_iter().next())
    }

    /// Create a customer.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self, email))]
    pub async fn create_customer(&self, email: &str) -> Result<Customer, PaymentError> {
        let customer: Customer = self
            .post("/v1/customers", &[("email", email.to_string())])
            .await?;
        debug!(customer_id = %customer.id, "Stripe customer created");
        Ok(customer)
    }

    /// Reuse the customer with this email or create one.
    ///
    /// # Errors
    ///
    /// Returns error if either API request fails.
    pub async fn find_or_create_customer(&self, email: &str) -> Result<Customer, PaymentError> {
        if let Some(customer) = self.find_customer_by_email(email).await? {
            return Ok(customer);
        }
        self.create_customer(email).await
    }

    /// Create a payment intent for an order.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self, params), fields(order_id = params.order_id, amount = params.amount))]
    pub async fn create_payment_intent(
        &self,
        params: &CreateIntent<'_>,
    ) -> Result<PaymentIntent, PaymentError> {
        let form = [
            ("amount", params.amount.to_string()),
            ("currency", params.currency.to_string()),
            ("customer", params.customer_id.to_string()),
            ("receipt_email", params.receipt_email.to_string()),
            ("description", format!("Order {}", params.order_number)),
            ("metadata[order_id]", params.order_id.to_string()),
            ("metadata[order_number]", params.order_number.to_string()),
            ("automatic_payment_methods[enabled]", "true".to_string()),
        ];
        self.post("/v1/payment_intents", &form).await
    }

    /// Fetch a payment intent.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self))]
    pub async fn retrieve_payment_intent(&self, id: &str) -> Result<PaymentIntent, PaymentError> {
        self.get(&format!("/v1/payment_intents/{}", urlencoding::encode(id)), &[])
            .await
    }

    /// Confirm a payment intent with a payment method.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails or the card is declined.
    #[instrument(skip(self, payment_method, return_url))]
    pub async fn confirm_payment_intent(
        &self,
        id: &str,
        payment_method: &str,
        return_url: Option<&str>,
    ) -> Result<PaymentIntent, PaymentError> {
        let mut form = vec![("payment_method", payment_method.to_string())];
        if let Some(url) = return_url {
            form.push(("return_url", url.to_string()));
        }
        self.post(
            &format!("/v1/payment_intents/{}/confirm", urlencoding::encode(id)),
            &form,
        )
        .await
    }

    /// Cancel a payment intent.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self))]
    pub async fn cancel_payment_intent(&self, id: &str) -> Result<PaymentIntent, PaymentError> {
        self.post(
            &format!("/v1/payment_intents/{}/cancel", urlencoding::encode(id)),
            &[],
        )
        .await
    }

    /// Refund a payment intent in full, or `amount` minor units of it.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self))]
    pub async fn create_refund(
        &self,
        payment_intent_id: &str,
        amount: Option<i64>,
        reason: Option<RefundReason>,
    ) -> Result<Refund, PaymentError> {
        let mut form = vec![("payment_intent", payment_intent_id.to_string())];
        if let Some(amount) = amount {
            form.push(("amount", amount.to_string()));
        }
        if let Some(reason) = reason {
            form.push(("reason", reason.as_str().to_string()));
        }
        self.post("/v1/refunds", &form).await
    }

    /// Fetch the account balance. Used as a cheap authenticated health probe.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    pub async fn balance(&self) -> Result<Balance, PaymentError> {
        self.get("/v1/balance", &[]).await
    }
}

/// Parse a success body, or map Stripe's error envelope onto `PaymentError`.
async fn handle_response<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, PaymentError> {
    let status = response.status();

    if status.is_success() {
        return response
            .json()
            .await
            .map_err(|e| PaymentError::Parse(format!("Failed to parse response: {e}")));
    }

    let body = response.text().await.unwrap_or_default();
    let err = classify_error(status.as_u16(), &body);
    warn!(status = status.as_u16(), error = %err, "Stripe API error");
    Err(err)
}

/// Map a non-2xx Stripe response onto `PaymentError`.
fn classify_error(status: u16, body: &str) -> PaymentError {
    let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) else {
        return PaymentError::Api {
            status,
            message: body.chars().take(200).collect(),
        };
    };

    let message = parsed
        .error
        .message
        .unwrap_or_else(|| "Payment provider error".to_string());

    match parsed.error.kind.as_str() {
        "card_error" => PaymentError::Card {
            code: parsed.error.code,
            message,
        },
        "invalid_request_error" => PaymentError::InvalidRequest { message },
        _ => PaymentError::Api { status, message },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_card_error() {
        let err = classify_error(
            402,
            r#"{"error":{"type":"card_error","code":"card_declined","message":"Your card was declined."}}"#,
        );
        assert!(matches!(
            err,
            PaymentError::Card { code: Some(ref c), ref message }
                if c == "card_declined" && message == "Your card was declined."
        ));
    }

    #[test]
    fn test_classify_invalid_request() {
        let err = classify_error(
            404,
            r#"{"error":{"type":"invalid_request_error","message":"No such payment_intent: 'pi_123'"}}"#,
        );
        assert!(matches!(err, PaymentError::InvalidRequest { .. }));
    }

    #[test]
    fn test_classify_api_error() {
        let err = classify_error(500, r#"{"error":{"type":"api_error","message":"boom"}}"#);
        assert!(matches!(err, PaymentError::Api { status: 500, .. }));

        let err = classify_error(502, "<html>Bad Gateway</html>");
        assert!(matches!(err, PaymentError::Api { status: 502, .. }));
    }

    #[test]
    fn test_debug_redacts_secret_key() {
        let config = crate::config::tests::test_config();
        let client = StripeClient::new(&config.stripe).unwrap_or_else(|e| panic!("{e}"));
        let debug_output = format!("{client:?}");
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("sk_test"));
    }
}
