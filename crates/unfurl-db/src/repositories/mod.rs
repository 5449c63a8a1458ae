//! Storage port implementations for PostgreSQL.

mod cache;
mod generated;

pub use cache::PgCacheStore;
pub use generated::PgGeneratedStore;
