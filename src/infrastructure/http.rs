use crate::domain::funding::TxRef;
use crate::domain::money::{Amount, WalletSnapshot};
use crate::domain::payment::DriverCode;
use crate::domain::ports::{FundingLink, TransactionApi};
use crate::domain::session::Credential;
use crate::error::ApiError;
use async_trait::async_trait;
use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QrPaymentRequest<'a> {
    driver_unique_id: &'a str,
}

#[derive(Serialize)]
struct FundWalletRequest {
    #[serde(with = "rust_decimal::serde::float")]
    amount: Decimal,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FundWalletResponse {
    payment_link: Url,
    #[serde(default, alias = "tx_ref")]
    tx_ref: Option<String>,
}

#[derive(Deserialize)]
struct VerifyResponse {
    success: bool,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

/// `TransactionApi` over the backend's JSON HTTP endpoints.
pub struct HttpTransactionApi {
    base_url: Url,
    http: reqwest::Client,
}

impl HttpTransactionApi {
    /// `base_url` should end with `/` so endpoint paths join beneath it.
    #[must_use]
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            http: reqwest::Client::new(),
        }
    }

    /// Use a custom HTTP client (timeouts, proxies, connection reuse).
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path)
            .map_err(|e| ApiError::Transport(format!("invalid endpoint {}: {}", path, e)))
    }

    /// Maps non-success statuses onto the API error taxonomy.
    ///
    /// Only a client error carrying a backend `message` counts as a business
    /// refusal. Server errors and bare statuses leave the outcome unknown.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::UNAUTHORIZED {
            return Err(ApiError::AuthExpired);
        }
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|b| b.message);
        match message {
            Some(message) if status.is_client_error() => Err(ApiError::Rejected {
                status: status.as_u16(),
                message: Some(message),
            }),
            _ => Err(ApiError::Transport(format!("backend returned {}", status))),
        }
    }

    async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
        let response = Self::ensure_success(response).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::Transport(format!("unreadable response: {}", e)))
    }
}

#[async_trait]
impl TransactionApi for HttpTransactionApi {
    async fn pay_driver(&self, credential: &Credential, driver: &DriverCode) -> Result<(), ApiError> {
        let url = self.endpoint("payments/qr-payment")?;
        debug!(driver = %driver, "submitting QR payment");
        let response = self
            .http
            .post(url)
            .bearer_auth(credential.expose())
            .json(&QrPaymentRequest {
                driver_unique_id: driver.as_str(),
            })
            .send()
            .await?;
        Self::ensure_success(response).await.map(|_| ())
    }

    async fn fund_wallet(&self, credential: &Credential, amount: Amount) -> Result<FundingLink, ApiError> {
        let url = self.endpoint("payments/fund-wallet")?;
        debug!(%amount, "requesting funding link");
        let response = self
            .http
            .post(url)
            .bearer_auth(credential.expose())
            .json(&FundWalletRequest {
                amount: amount.value(),
            })
            .send()
            .await?;
        let body: FundWalletResponse = Self::read_json(response).await?;

        // Fall back to the tx_ref the gateway embeds in its checkout link.
        let reference = body
            .tx_ref
            .as_deref()
            .and_then(TxRef::new)
            .or_else(|| {
                body.payment_link
                    .query_pairs()
                    .find(|(k, _)| k == "tx_ref")
                    .and_then(|(_, v)| TxRef::new(&v))
            });
        Ok(FundingLink {
            payment_link: body.payment_link,
            reference,
        })
    }

    async fn verify_funding(&self, credential: &Credential, reference: &TxRef) -> Result<bool, ApiError> {
        let mut url = self.endpoint("payments/verify")?;
        url.query_pairs_mut().append_pair("tx_ref", reference.as_str());
        debug!(%reference, "verifying funding");
        let response = self
            .http
            .get(url)
            .bearer_auth(credential.expose())
            .send()
            .await?;
        let body: VerifyResponse = Self::read_json(response).await?;
        Ok(body.success)
    }

    async fn wallet(&self, credential: &Credential) -> Result<WalletSnapshot, ApiError> {
        let url = self.endpoint("wallets/my-wallet")?;
        let response = self
            .http
            .get(url)
            .bearer_auth(credential.expose())
            .send()
            .await?;
        Self::read_json(response).await
    }
}
