use super::funding::{FundingIntent, TxRef};
use super::money::{Amount, WalletSnapshot};
use super::payment::DriverCode;
use super::scan::{DecodeEvent, DeviceHandle};
use super::session::{Credential, Role, Session};
use crate::error::{ApiError, StoreError};
use async_trait::async_trait;
use futures::stream::BoxStream;
use std::sync::Arc;
use url::Url;

/// Response of `POST /payments/fund-wallet`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FundingLink {
    pub payment_link: Url,
    /// Present when the backend echoes the gateway reference.
    pub reference: Option<TxRef>,
}

/// The backend calls the orchestrators depend on.
#[async_trait]
pub trait TransactionApi: Send + Sync {
    async fn pay_driver(&self, credential: &Credential, driver: &DriverCode) -> Result<(), ApiError>;
    async fn fund_wallet(&self, credential: &Credential, amount: Amount) -> Result<FundingLink, ApiError>;
    /// `Ok(false)` is an explicit "not verified" from the backend.
    async fn verify_funding(&self, credential: &Credential, reference: &TxRef) -> Result<bool, ApiError>;
    async fn wallet(&self, credential: &Credential) -> Result<WalletSnapshot, ApiError>;
}

/// Durable checkpoint of funding intents, keyed by reference.
#[async_trait]
pub trait FundingIntentStore: Send + Sync {
    async fn store(&self, intent: FundingIntent) -> Result<(), StoreError>;
    async fn get(&self, reference: &TxRef) -> Result<Option<FundingIntent>, StoreError>;
}

/// Access to the single authenticated session of this client.
#[async_trait]
pub trait SessionPort: Send + Sync {
    async fn current(&self) -> Option<Session>;
    async fn invalidate(&self);

    async fn is_authenticated(&self) -> bool {
        self.current().await.is_some()
    }

    async fn role(&self) -> Option<Role> {
        self.current().await.map(|s| s.role)
    }
}

/// Camera-backed or manual source of scanned driver codes.
#[async_trait]
pub trait QrDecoder: Send + Sync {
    async fn list_devices(&self) -> Result<Vec<DeviceHandle>, String>;
    /// Lazy and possibly infinite. Transient errors do not end the stream.
    fn decode(&self, device: &DeviceHandle) -> BoxStream<'static, DecodeEvent>;
    async fn stop(&self);
}

pub type TransactionApiRef = Arc<dyn TransactionApi>;
pub type FundingIntentStoreBox = Box<dyn FundingIntentStore>;
pub type SessionRef = Arc<dyn SessionPort>;
