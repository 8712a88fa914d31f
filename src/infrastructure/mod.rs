//! Store implementations: in-memory (always available) and RocksDB behind
//! the `storage-rocksdb` feature.

pub mod in_memory;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
