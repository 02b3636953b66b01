//! Adapters for the policy's read seams: partner→site mappings, the site
//! directory and actor profiles.

mod in_memory;
mod postgres;

pub use in_memory::{InMemoryMappingStore, InMemoryProfileStore, InMemorySiteDirectory};
pub(crate) use postgres::map_sqlx_error;
pub use postgres::{PostgresMappingSource, PostgresProfileStore, PostgresSiteDirectory};
