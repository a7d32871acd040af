//! In-memory storage backends for the Veracity access server.
//!
//! Backed by `dashmap` concurrent maps. Uniqueness invariants (one Active
//! grant per pair, globally unique record anchors, unique user wallet and
//! subject) are enforced with atomic insert-if-absent on secondary index
//! maps, so concurrent writers serialize at the store as the concurrency
//! model requires.

pub mod grants;
pub mod records;
pub mod users;

pub use grants::MemoryGrantStore;
pub use records::MemoryRecordStore;
pub use users::MemoryUserStore;
