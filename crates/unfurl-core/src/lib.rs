//! Unfurl Core
//!
//! Core domain types, traits, and error handling for the unfurl link
//! resolver. This crate performs no I/O; it defines the vocabulary shared by
//! the cache engine, the storage adapters, the resolvers and the HTTP layer.

pub mod cache;
pub mod error;
pub mod loader;
pub mod markup;
pub mod ports;
pub mod resolver;
pub mod response;

pub use cache::{CacheDuration, CacheEntry, Expiry, GeneratedValue, Loaded, Response};
pub use error::{Error, Result};
pub use resolver::{DynResolver, Outcome, RequestContext, Resolver};
pub use response::ResolverResponse;

/// Content type used when a loader does not name one.
pub const APPLICATION_JSON: &str = "application/json";
