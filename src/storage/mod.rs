//! Local and remote persistence
//!
//! Local state lives behind [`KeyValueStore`]; the optional remote database
//! lives behind [`RecordStore`]. Callers depend only on these contracts.

pub mod error;
pub mod kv;
pub mod record;
pub mod rest;

pub use error::StoreError;
pub use kv::{FileKvStore, KeyValueStore, MemoryKvStore, load_json, save_json};
pub use record::{Filter, MemoryRecordStore, OrderBy, Record, RecordStore};
pub use rest::RestRecordStore;
