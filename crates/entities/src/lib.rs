//! Core entity definitions for Wayfarer.
//!
//! This crate defines all the core data types used across the Wayfarer
//! backend, including entities for users, cities, trips, notifications, and
//! their read projections.

mod city;
mod notification;
mod trip;
mod user;

pub use city::*;
pub use notification::*;
pub use trip::*;
pub use user::*;
