//! Storage abstraction layer for the Veracity access server.
//!
//! Defines the store traits the domain services depend on and the error type
//! storage backends surface. Backends live in their own crates (see
//! `veracity-db-memory`).

pub mod error;
pub mod traits;

pub use error::{ErrorCategory, StorageError};
pub use traits::{GrantStore, RecordStore, UserStore};
