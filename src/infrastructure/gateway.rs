use crate::domain::account::UserId;
use crate::domain::payment::GatewayStatus;
use crate::domain::ports::{GatewayIntent, PaymentGateway};
use crate::error::{LedgerError, Result};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const SECRET_HEADER: &str = "X-Gateway-Secret";

/// Connection details for the external QR gateway.
///
/// Injected at construction rather than read from ambient state, so tests and
/// offline runs swap the gateway out entirely.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub base_url: String,
    pub secret: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateRequest {
    user_id: UserId,
    amount: Decimal,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateResponse {
    txn_id: String,
    qr_image: Option<String>,
    payable_amount: Decimal,
}

#[derive(Deserialize)]
struct StatusResponse {
    status: GatewayStatus,
}

#[derive(Deserialize)]
struct CancelResponse {
    status: bool,
}

/// HTTP client for the QR payment gateway.
///
/// Wire protocol: `POST {base}/payments`, `GET {base}/payments/{txnId}`,
/// `DELETE {base}/payments/{txnId}`, all carrying the shared secret header.
/// Non-2xx responses surface as `ExternalServiceError` and are never treated
/// as success.
pub struct HttpGateway {
    config: GatewayConfig,
    client: reqwest::Client,
}

impl HttpGateway {
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/payments{path}", self.config.base_url.trim_end_matches('/'))
    }

    fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(LedgerError::ExternalServiceError(format!(
                "gateway returned {}",
                response.status()
            )))
        }
    }
}

fn external(e: reqwest::Error) -> LedgerError {
    LedgerError::ExternalServiceError(e.to_string())
}

#[async_trait]
impl PaymentGateway for HttpGateway {
    async fn create(&self, user_id: UserId, amount: Decimal) -> Result<GatewayIntent> {
        let response = self
            .client
            .post(self.url(""))
            .header(SECRET_HEADER, &self.config.secret)
            .json(&CreateRequest { user_id, amount })
            .send()
            .await
            .map_err(external)?;
        let body: CreateResponse = Self::check(response)?.json().await.map_err(external)?;
        Ok(GatewayIntent {
            txn_id: body.txn_id,
            qr_image: body.qr_image,
            payable_amount: body.payable_amount,
        })
    }

    async fn status(&self, txn_id: &str) -> Result<GatewayStatus> {
        let response = self
            .client
            .get(self.url(&format!("/{txn_id}")))
            .header(SECRET_HEADER, &self.config.secret)
            .send()
            .await
            .map_err(external)?;
        let body: StatusResponse = Self::check(response)?.json().await.map_err(external)?;
        Ok(body.status)
    }

    async fn cancel(&self, txn_id: &str) -> Result<bool> {
        let response = self
            .client
            .delete(self.url(&format!("/{txn_id}")))
            .header(SECRET_HEADER, &self.config.secret)
            .send()
            .await
            .map_err(external)?;
        let body: CancelResponse = Self::check(response)?.json().await.map_err(external)?;
        Ok(body.status)
    }
}

/// Gateway stand-in for offline replays: issues local transaction ids and
/// reports every payment as already settled.
#[derive(Default)]
pub struct OfflineGateway;

#[async_trait]
impl PaymentGateway for OfflineGateway {
    async fn create(&self, _user_id: UserId, amount: Decimal) -> Result<GatewayIntent> {
        Ok(GatewayIntent {
            txn_id: format!("OFFLINE-{}", Uuid::new_v4()),
            qr_image: None,
            payable_amount: amount,
        })
    }

    async fn status(&self, _txn_id: &str) -> Result<GatewayStatus> {
        Ok(GatewayStatus::Success)
    }

    async fn cancel(&self, _txn_id: &str) -> Result<bool> {
        Ok(true)
    }
}
