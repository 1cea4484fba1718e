use crate::domain::funding::{FundingIntent, TxRef};
use crate::domain::ports::{FundingIntentStore, SessionPort};
use crate::domain::session::Session;
use crate::error::StoreError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory store for funding intents.
///
/// Only outlives a redirect when the process does (tests, long-running hosts).
/// Intents without a reference cannot be keyed and are silently skipped.
#[derive(Default, Clone)]
pub struct InMemoryFundingStore {
    intents: Arc<RwLock<HashMap<TxRef, FundingIntent>>>,
}

impl InMemoryFundingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.intents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.intents.read().await.is_empty()
    }
}

#[async_trait]
impl FundingIntentStore for InMemoryFundingStore {
    async fn store(&self, intent: FundingIntent) -> Result<(), StoreError> {
        if let Some(reference) = intent.reference.clone() {
            let mut intents = self.intents.write().await;
            intents.insert(reference, intent);
        }
        Ok(())
    }

    async fn get(&self, reference: &TxRef) -> Result<Option<FundingIntent>, StoreError> {
        let intents = self.intents.read().await;
        Ok(intents.get(reference).cloned())
    }
}

/// Shared holder of the one active session.
///
/// Clones share the same slot, so invalidating through any clone is seen by all.
#[derive(Default, Clone)]
pub struct SessionHandle {
    slot: Arc<RwLock<Option<Session>>>,
}

impl SessionHandle {
    pub fn new(session: Session) -> Self {
        Self {
            slot: Arc::new(RwLock::new(Some(session))),
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Replaces whatever session was active.
    pub async fn sign_in(&self, session: Session) {
        *self.slot.write().await = Some(session);
    }
}

#[async_trait]
impl SessionPort for SessionHandle {
    async fn current(&self) -> Option<Session> {
        self.slot.read().await.clone()
    }

    async fn invalidate(&self) {
        self.slot.write().await.take();
    }
}
