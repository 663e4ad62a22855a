//! HTTP client for the payment provider's order API
//!
//! Endpoints (relative to `api_url`): `POST order`, `GET order/{id}`,
//! `POST capture`, `POST release`. Every request carries the project id.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::application::ports::{GatewayOrder, GatewayOrderCreated, PaymentGateway};
use crate::shared::errors::{DomainError, DomainResult};

#[derive(Debug, Clone)]
pub struct HttpGatewayConfig {
    /// Base URL, e.g. `https://www.paysera.com/pay/v2/`
    pub api_url: String,
    pub project_id: String,
    /// Where the provider posts callbacks
    pub callback_url: Option<String>,
    /// Where the payer lands after paying or abandoning
    pub return_url: Option<String>,
    pub timeout: Duration,
}

pub struct HttpPaymentGateway {
    client: Client,
    base: Url,
    config: HttpGatewayConfig,
}

#[derive(Serialize)]
struct OrderRequest<'a> {
    projectid: &'a str,
    order_id: &'a str,
    amount: i64,
    currency: &'a str,
    description: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<&'a str>,
    /// "1" holds the amount, "2" charges immediately
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    callback_url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    return_url: Option<&'a str>,
}

#[derive(Deserialize)]
struct OrderResponse {
    orderid: String,
    status: String,
    url: String,
}

#[derive(Deserialize)]
struct StatusResponse {
    status: serde_json::Value,
}

#[derive(Serialize)]
struct CaptureRequest<'a> {
    projectid: &'a str,
    orderid: &'a str,
    amount: i64,
    #[serde(rename = "final")]
    final_capture: &'static str,
}

#[derive(Serialize)]
struct ReleaseRequest<'a> {
    projectid: &'a str,
    orderid: &'a str,
}

impl HttpPaymentGateway {
    pub fn new(config: HttpGatewayConfig) -> DomainResult<Self> {
        // A base without a trailing slash would drop its last segment on join
        let mut api_url = config.api_url.clone();
        if !api_url.ends_with('/') {
            api_url.push('/');
        }
        let base = Url::parse(&api_url)
            .map_err(|e| DomainError::Gateway(format!("invalid api url '{}': {e}", config.api_url)))?;
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| DomainError::Gateway(e.to_string()))?;
        Ok(Self { client, base, config })
    }

    fn endpoint(&self, path: &str) -> DomainResult<Url> {
        self.base
            .join(path)
            .map_err(|e| DomainError::Gateway(format!("invalid endpoint '{path}': {e}")))
    }

    async fn check(response: Response, operation: &str) -> DomainResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        error!(operation, status = status.as_u16(), body = %body, "Payment provider request failed");
        Err(DomainError::Gateway(format!(
            "{operation} failed with HTTP {}",
            status.as_u16()
        )))
    }
}

fn transport(operation: &str) -> impl FnOnce(reqwest::Error) -> DomainError + '_ {
    move |e| DomainError::Gateway(format!("{operation}: {e}"))
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn create_order(&self, order: &GatewayOrder) -> DomainResult<GatewayOrderCreated> {
        let request = OrderRequest {
            projectid: &self.config.project_id,
            order_id: &order.reference,
            amount: order.amount,
            currency: &order.currency,
            description: &order.description,
            email: order.email.as_deref(),
            status: if order.hold { "1" } else { "2" },
            callback_url: self.config.callback_url.as_deref(),
            return_url: self.config.return_url.as_deref(),
        };

        let response = self
            .client
            .post(self.endpoint("order")?)
            .json(&request)
            .send()
            .await
            .map_err(transport("create order"))?;
        let created: OrderResponse = Self::check(response, "create order")
            .await?
            .json()
            .await
            .map_err(transport("create order"))?;

        debug!(reference = %created.orderid, status = %created.status, "Provider order created");
        Ok(GatewayOrderCreated {
            reference: created.orderid,
            status: created.status,
            payment_url: created.url,
        })
    }

    async fn get_status(&self, reference: &str) -> DomainResult<String> {
        let response = self
            .client
            .get(self.endpoint(&format!("order/{reference}"))?)
            .query(&[("projectid", self.config.project_id.as_str())])
            .send()
            .await
            .map_err(transport("get status"))?;
        let body: StatusResponse = Self::check(response, "get status")
            .await?
            .json()
            .await
            .map_err(transport("get status"))?;

        // Providers send the code either as a string or a number
        Ok(match body.status {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        })
    }

    async fn capture(&self, reference: &str, amount: i64, final_capture: bool) -> DomainResult<()> {
        let request = CaptureRequest {
            projectid: &self.config.project_id,
            orderid: reference,
            amount,
            final_capture: if final_capture { "1" } else { "0" },
        };
        let response = self
            .client
            .post(self.endpoint("capture")?)
            .json(&request)
            .send()
            .await
            .map_err(transport("capture"))?;
        Self::check(response, "capture").await?;
        Ok(())
    }

    async fn release(&self, reference: &str) -> DomainResult<()> {
        let request = ReleaseRequest {
            projectid: &self.config.project_id,
            orderid: reference,
        };
        let response = self
            .client
            .post(self.endpoint("release")?)
            .json(&request)
            .send()
            .await
            .map_err(transport("release"))?;
        Self::check(response, "release").await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(api_url: &str) -> HttpGatewayConfig {
        HttpGatewayConfig {
            api_url: api_url.to_string(),
            project_id: "123".to_string(),
            callback_url: None,
            return_url: None,
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn test_endpoints_keep_base_path() {
        let gateway = HttpPaymentGateway::new(config("https://pay.example.com/pay/v2")).unwrap();
        assert_eq!(
            gateway.endpoint("order/ORD-1").unwrap().as_str(),
            "https://pay.example.com/pay/v2/order/ORD-1"
        );
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        assert!(matches!(
            HttpPaymentGateway::new(config("not a url")),
            Err(DomainError::Gateway(_))
        ));
    }
}
