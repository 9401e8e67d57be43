//! Store trait definitions.

use async_trait::async_trait;
use chrono::Duration;
use entities::{
    City, CityDetail, CityFact, CityImage, CityOverview, CityVisitCount, NewNotification, NewTrip,
    NewUser, Notification, ProfileUpdate, TripSummary, TripView, User, UserStats,
};

use crate::TripStoreResult;

/// Trait for storage operations.
///
/// Every compound mutation (membership change plus its notification, the
/// last-member trip deletion) commits atomically inside the implementation.
#[async_trait]
pub trait TripStore: Send + Sync {
    // ========== User operations ==========

    /// Registers a new user. Fails with `Conflict` when the username or
    /// email is already taken.
    async fn create_user(&self, new_user: NewUser) -> TripStoreResult<User>;

    /// Gets a user by ID.
    async fn get_user(&self, id: i64) -> TripStoreResult<Option<User>>;

    /// Gets a user by username.
    async fn get_user_by_username(&self, username: &str) -> TripStoreResult<Option<User>>;

    /// Applies a partial profile update and returns the updated user.
    async fn update_profile(&self, id: i64, update: ProfileUpdate) -> TripStoreResult<User>;

    /// Stamps the user's last-active timestamp with the store clock.
    async fn touch_last_active(&self, id: i64) -> TripStoreResult<()>;

    /// Flags the account as verified; the seam the external identity flow
    /// calls back into.
    async fn mark_verified(&self, id: i64) -> TripStoreResult<()>;

    /// Returns aggregate user counts; "active" means a last-active stamp
    /// within `active_window` of the store clock's now.
    async fn user_stats(&self, active_window: Duration) -> TripStoreResult<UserStats>;

    // ========== City catalog operations ==========

    /// Adds a city to the catalog.
    async fn create_city(&self, name: &str, country: &str) -> TripStoreResult<City>;

    /// Attaches a fact to a city.
    async fn add_city_fact(&self, city_id: i64, title: &str, fact: &str)
        -> TripStoreResult<CityFact>;

    /// Attaches an image to a city.
    async fn add_city_image(&self, city_id: i64, url: &str) -> TripStoreResult<CityImage>;

    /// Lists cities with the most recorded visits, most visited first.
    async fn list_top_cities(&self, limit: u32) -> TripStoreResult<Vec<CityOverview>>;

    /// Lists cities whose name starts with `prefix`, case-insensitively.
    async fn search_cities(&self, prefix: &str, limit: u32) -> TripStoreResult<Vec<City>>;

    /// Returns the city detail shaped for `viewer_id` and records a visit.
    /// A failed visit-log write degrades to a logged no-op.
    async fn get_city(&self, city_id: i64, viewer_id: i64) -> TripStoreResult<CityDetail>;

    /// Lists the facts attached to a city.
    async fn list_city_facts(&self, city_id: i64) -> TripStoreResult<Vec<CityFact>>;

    /// Lists the images attached to a city.
    async fn list_city_images(&self, city_id: i64) -> TripStoreResult<Vec<CityImage>>;

    /// Returns the viewer's per-city visit counts, most visited first.
    async fn city_visits(&self, user_id: i64) -> TripStoreResult<Vec<CityVisitCount>>;

    /// Resolves a city's name without recording a visit.
    async fn city_name(&self, city_id: i64) -> TripStoreResult<Option<String>>;

    // ========== Trip membership operations ==========

    /// Creates a trip with `creator_id` as its sole member and returns the
    /// trip ID.
    async fn create_trip(&self, new_trip: NewTrip, creator_id: i64) -> TripStoreResult<i64>;

    /// Returns the trip view shaped for `viewer_id`; the member list
    /// excludes the viewer. Fails with `Unauthorized` for non-members.
    async fn trip_view(&self, trip_id: i64, viewer_id: i64) -> TripStoreResult<TripView>;

    /// Lists the user's trips, most recent start date first.
    async fn list_trips(&self, user_id: i64, limit: u32) -> TripStoreResult<Vec<TripSummary>>;

    /// Membership predicate: is `user_id` currently a member of `trip_id`?
    async fn is_member(&self, trip_id: i64, user_id: i64) -> TripStoreResult<bool>;

    /// Adds `target_id` to the trip and records a trip notification for
    /// them, atomically. Fails with `Conflict` when already a member.
    async fn add_member(&self, trip_id: i64, requester_id: i64, target_id: i64)
        -> TripStoreResult<()>;

    /// Removes `target_id` from the trip. Never deletes the trip, even when
    /// the removed user was the last member.
    async fn remove_member(&self, trip_id: i64, requester_id: i64, target_id: i64)
        -> TripStoreResult<()>;

    /// Removes the requester from the trip; deletes the trip entirely when
    /// they were the sole remaining member.
    async fn leave_trip(&self, trip_id: i64, requester_id: i64) -> TripStoreResult<()>;

    /// Renames the trip.
    async fn rename_trip(&self, trip_id: i64, requester_id: i64, new_name: &str)
        -> TripStoreResult<()>;

    /// Returns the trips both users are members of, shaped for the
    /// requester. Fails with `Validation` when the two IDs are equal.
    async fn common_trips(&self, requester_id: i64, other_id: i64)
        -> TripStoreResult<Vec<TripView>>;

    // ========== Notification operations ==========

    /// Records a notification.
    async fn create_notification(&self, notification: NewNotification)
        -> TripStoreResult<Notification>;

    /// Lists the notifications destined to the user, newest first.
    async fn list_notifications(&self, user_id: i64) -> TripStoreResult<Vec<Notification>>;

    /// Marks a notification as read. Idempotent; only the destined user may
    /// call it.
    async fn mark_notification_read(&self, id: i64, requester_id: i64) -> TripStoreResult<()>;

    /// Marks every unread notification destined to the user as read and
    /// returns how many were flipped.
    async fn mark_all_notifications_read(&self, user_id: i64) -> TripStoreResult<u64>;
}
