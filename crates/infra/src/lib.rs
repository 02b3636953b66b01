//! Infrastructure layer: configuration and storage adapters behind the policy seams.
//!
//! Every adapter is read-only with respect to the mapping tables; those are
//! owned by administrative tooling outside this workspace.

pub mod config;
pub mod fixtures;
pub mod records;
pub mod store;

pub use config::{AppConfig, ConfigError};
pub use fixtures::{FixtureError, Fixtures};
pub use records::{
    InMemoryRecordStore, PostgresRecordStore, RecordKind, RecordQuery, RecordStatus, RecordStore, SiteRecord,
};
pub use store::{
    InMemoryMappingStore, InMemoryProfileStore, InMemorySiteDirectory, PostgresMappingSource,
    PostgresProfileStore, PostgresSiteDirectory,
};
