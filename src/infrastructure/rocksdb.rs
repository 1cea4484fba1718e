use crate::domain::funding::{FundingIntent, TxRef};
use crate::domain::ports::FundingIntentStore;
use crate::error::StoreError;
use async_trait::async_trait;
use rocksdb::{ColumnFamilyDescriptor, DB, Options};
use std::path::Path;
use std::sync::Arc;

/// Column Family holding funding intents, keyed by `tx_ref` bytes.
pub const CF_FUNDING_INTENTS: &str = "funding_intents";

/// A persistent funding checkpoint backed by RocksDB.
///
/// Survives a process restart between the gateway hand-off and the redirect
/// return. `Clone` shares the underlying `Arc<DB>`.
#[derive(Clone)]
pub struct RocksDBFundingStore {
    db: Arc<DB>,
}

impl RocksDBFundingStore {
    /// Opens or creates a RocksDB instance at `path`, creating the column
    /// family when missing.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_intents = ColumnFamilyDescriptor::new(CF_FUNDING_INTENTS, Options::default());
        let db = DB::open_cf_descriptors(&opts, path, vec![cf_intents])?;

        Ok(Self { db: Arc::new(db) })
    }
}

#[async_trait]
impl FundingIntentStore for RocksDBFundingStore {
    async fn store(&self, intent: FundingIntent) -> Result<(), StoreError> {
        let Some(reference) = intent.reference.as_ref() else {
            return Ok(());
        };
        let cf = self
            .db
            .cf_handle(CF_FUNDING_INTENTS)
            .ok_or_else(|| StoreError::Backend("Funding intents column family not found".into()))?;

        let value = serde_json::to_vec(&intent)?;
        self.db.put_cf(&cf, reference.as_str().as_bytes(), value)?;

        Ok(())
    }

    async fn get(&self, reference: &TxRef) -> Result<Option<FundingIntent>, StoreError> {
        let cf = self
            .db
            .cf_handle(CF_FUNDING_INTENTS)
            .ok_or_else(|| StoreError::Backend("Funding intents column family not found".into()))?;

        match self.db.get_cf(&cf, reference.as_str().as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }
}
