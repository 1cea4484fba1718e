//! Adapters for the external collaborators behind the domain ports.

pub mod http;
pub mod in_memory;
pub mod manual_entry;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
