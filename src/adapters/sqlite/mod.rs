//! SQLite adapters for the town's embedded store.

pub mod agent_repository;
pub mod bead_repository;
pub mod connection;
pub mod kv_store;
pub mod migrations;
pub mod satellite_repository;

pub use agent_repository::SqliteAgentRepository;
pub use bead_repository::SqliteBeadRepository;
pub use connection::{create_pool, create_test_pool, ConnectionError, PoolConfig};
pub use kv_store::SqliteKvStore;
pub use migrations::{Migration, MigrationError, Migrator};
pub use satellite_repository::SqliteSatelliteRepository;
