//! Trip and notification storage for Wayfarer.
//!
//! This crate provides the storage abstraction behind the backend: the
//! [`TripStore`] trait covering users, the city catalog, trip membership,
//! and notifications, a SQLite implementation backed by `sqlx`, and an
//! in-memory implementation for tests.

mod clock;
mod error;
mod memory;
mod sqlite;
mod store;

pub use clock::*;
pub use error::*;
pub use memory::*;
pub use sqlite::*;
pub use store::*;
