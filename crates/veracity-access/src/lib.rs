//! Access-grant lifecycle, query, and record linkage services.
//!
//! This crate is the core of the system: the grant state machine
//! (`Active -> {Expired, Revoked}`), the derived-status query service that
//! tolerates the gap between an expiry deadline and the next sweep, and the
//! record linkage service guarding anchor uniqueness and immutability. It is
//! transport-agnostic; `veracity-server` exposes it over REST.

pub mod error;
pub mod lifecycle;
pub mod linkage;
pub mod query;
pub mod sweeper;

pub use error::{AccessError, Result};
pub use lifecycle::{GrantLifecycle, MAX_TTL_SECONDS};
pub use linkage::RecordLinkage;
pub use query::{AccessQuery, GrantView};
pub use sweeper::ExpirySweeper;
