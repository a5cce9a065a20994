mod property_store;

#[cfg(test)]
pub(crate) use property_store::memory_store;
pub use property_store::{PropertyStore, SqlitePropertyStore, StoreError, default_db_path};
