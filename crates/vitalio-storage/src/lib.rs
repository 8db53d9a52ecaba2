//! Record storage for the Vitalio server.
//!
//! Defines the `RecordStorage` trait the request pipeline persists through,
//! plus an in-memory backend used by the server default wiring and by tests.

pub mod error;
pub mod memory;
pub mod traits;
pub mod types;

pub use error::StorageError;
pub use memory::InMemoryStorage;
pub use traits::RecordStorage;
pub use types::StoredRecord;

/// Type alias for a shareable RecordStorage instance.
pub type DynRecordStorage = std::sync::Arc<dyn RecordStorage>;

/// Creates a new in-memory RecordStorage instance.
pub fn create_memory_storage() -> DynRecordStorage {
    std::sync::Arc::new(InMemoryStorage::new())
}
