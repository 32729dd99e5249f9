//! Local persistence and database migrations.
//!
//! Last-known pull request state lives in a local `SQLite` database. The
//! schema is managed with Diesel migrations so the database can be created
//! and upgraded consistently across machines.

mod error;
mod migrator;
mod state_store;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use error::StoreError;
pub use migrator::{
    INITIAL_SCHEMA_VERSION, MIGRATIONS, SchemaVersion, migrate_database,
};
pub use state_store::{SqliteStateStore, StateStore};

#[cfg(test)]
pub(crate) use state_store::MockStateStore;
