//! Trip entity definitions.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{City, UserSummary};

/// Maximum length of a trip name.
pub const MAX_TRIP_NAME_LEN: usize = 30;

/// A planned trip, anchored to a city and shared by its members.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trip {
    /// Unique identifier.
    pub id: i64,
    /// Trip name, at most [`MAX_TRIP_NAME_LEN`] characters.
    pub name: String,
    /// City the trip is anchored to.
    pub city_id: i64,
    /// When the trip starts.
    pub start_date: NaiveDate,
    /// Whether the trip is visible to non-members.
    pub is_public: bool,
}

/// Fields required to create a trip.
#[derive(Debug, Clone)]
pub struct NewTrip {
    /// Trip name.
    pub name: String,
    /// City the trip is anchored to.
    pub city_id: i64,
    /// When the trip starts.
    pub start_date: NaiveDate,
}

/// A trip as returned to a member, with the city resolved and the member
/// list shaped per-caller (the requesting user is excluded).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripView {
    /// Unique identifier.
    pub id: i64,
    /// Trip name.
    pub name: String,
    /// Resolved city.
    pub city: City,
    /// When the trip starts.
    pub start_date: NaiveDate,
    /// Whether the trip is visible to non-members.
    pub is_public: bool,
    /// The other participants, excluding the requesting user.
    pub users: Vec<UserSummary>,
}

/// A condensed trip row for listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripSummary {
    /// Unique identifier.
    pub id: i64,
    /// Trip name.
    pub name: String,
    /// Resolved city.
    pub city: City,
    /// When the trip starts.
    pub start_date: NaiveDate,
}

/// Validates a trip name: non-blank and at most [`MAX_TRIP_NAME_LEN`]
/// characters.
pub fn validate_trip_name(name: &str) -> Result<(), String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err("trip name must not be empty".to_string());
    }
    if trimmed.chars().count() > MAX_TRIP_NAME_LEN {
        return Err(format!(
            "trip name must be at most {} characters",
            MAX_TRIP_NAME_LEN
        ));
    }
    Ok(())
}
