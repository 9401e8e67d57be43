//! City catalog entity definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A city that trips can be anchored to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct City {
    /// Unique identifier.
    pub id: i64,
    /// City name.
    pub name: String,
    /// Country the city belongs to.
    pub country: String,
}

/// A short fact attached to a city.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CityFact {
    /// Unique identifier.
    pub id: i64,
    /// City this fact belongs to.
    pub city_id: i64,
    /// Short headline.
    pub title: String,
    /// The fact itself.
    pub fact: String,
}

/// An image attached to a city.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CityImage {
    /// Unique identifier.
    pub id: i64,
    /// City this image belongs to.
    pub city_id: i64,
    /// Image URL.
    pub url: String,
}

/// A city together with its total visit count, for the top-cities listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CityOverview {
    /// The city.
    #[serde(flatten)]
    pub city: City,
    /// Total number of recorded detail views.
    pub visit_count: u64,
}

/// A city detail view shaped for a specific viewer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CityDetail {
    /// The city.
    #[serde(flatten)]
    pub city: City,
    /// Whether the viewer has any trip anchored to this city.
    pub has_visited: bool,
    /// Total number of recorded detail views.
    pub visit_count: u64,
}

/// One row in the viewer's visit history, aggregated per city.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CityVisitCount {
    /// The visited city.
    #[serde(flatten)]
    pub city: City,
    /// How many times the viewer opened this city.
    pub visit_count: u64,
}

/// A single recorded city detail view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CityVisitLog {
    /// Unique identifier.
    pub id: i64,
    /// Visited city.
    pub city_id: i64,
    /// Visiting user.
    pub user_id: i64,
    /// When the view happened.
    pub visited_at: DateTime<Utc>,
}
