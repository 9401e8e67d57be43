//! In-memory store implementation for testing.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use entities::{
    City, CityDetail, CityFact, CityImage, CityOverview, CityVisitCount, CityVisitLog,
    NewNotification, NewTrip, NewUser, Notification, ProfileUpdate, Trip, TripSummary, TripView,
    User, UserStats, UserSummary, validate_trip_name,
};
use tokio::sync::RwLock;

use crate::{Clock, SystemClock, TripStore, TripStoreError, TripStoreResult};

/// Monotonic per-entity ID counters; IDs are never reused.
#[derive(Debug, Default)]
struct IdCounters {
    user: i64,
    city: i64,
    city_fact: i64,
    city_image: i64,
    visit_log: i64,
    trip: i64,
    notification: i64,
}

fn next_id(counter: &mut i64) -> i64 {
    *counter += 1;
    *counter
}

#[derive(Debug, Default)]
struct State {
    users: HashMap<i64, User>,
    cities: HashMap<i64, City>,
    city_facts: Vec<CityFact>,
    city_images: Vec<CityImage>,
    visit_logs: Vec<CityVisitLog>,
    trips: HashMap<i64, Trip>,
    /// Membership join relation as (trip_id, user_id) pairs.
    members: HashSet<(i64, i64)>,
    notifications: HashMap<i64, Notification>,
    ids: IdCounters,
}

impl State {
    fn trip_members(&self, trip_id: i64) -> Vec<&User> {
        let mut members: Vec<&User> = self
            .members
            .iter()
            .filter(|(t, _)| *t == trip_id)
            .filter_map(|(_, u)| self.users.get(u))
            .collect();
        members.sort_by_key(|u| u.id);
        members
    }

    fn member_count(&self, trip_id: i64) -> usize {
        self.members.iter().filter(|(t, _)| *t == trip_id).count()
    }

    /// Builds the per-viewer trip view; membership checks are the caller's
    /// responsibility.
    fn view_for(&self, trip: &Trip, viewer_id: i64) -> TripStoreResult<TripView> {
        let city = self
            .cities
            .get(&trip.city_id)
            .ok_or_else(|| TripStoreError::not_found("City", trip.city_id))?;
        let users = self
            .trip_members(trip.id)
            .into_iter()
            .filter(|u| u.id != viewer_id)
            .map(UserSummary::from)
            .collect();
        Ok(TripView {
            id: trip.id,
            name: trip.name.clone(),
            city: city.clone(),
            start_date: trip.start_date,
            is_public: trip.is_public,
            users,
        })
    }
}

/// In-memory store for testing purposes.
///
/// All state sits behind a single lock, so the compound operations are as
/// atomic as their SQL counterparts.
pub struct MemoryTripStore {
    state: RwLock<State>,
    clock: Arc<dyn Clock>,
}

impl MemoryTripStore {
    /// Creates a new in-memory store using the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Creates a new in-memory store using the given clock.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: RwLock::new(State::default()),
            clock,
        }
    }
}

impl Default for MemoryTripStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TripStore for MemoryTripStore {
    // =========================================================================
    // User operations
    // =========================================================================

    async fn create_user(&self, new_user: NewUser) -> TripStoreResult<User> {
        if new_user.username.trim().is_empty() || new_user.email.trim().is_empty() {
            return Err(TripStoreError::validation(
                "username and email must not be empty",
            ));
        }

        let mut state = self.state.write().await;
        if state.users.values().any(|u| u.username == new_user.username) {
            return Err(TripStoreError::conflict("Username already exists"));
        }
        if state.users.values().any(|u| u.email == new_user.email) {
            return Err(TripStoreError::conflict("Email already exists"));
        }

        let user = User {
            id: next_id(&mut state.ids.user),
            username: new_user.username,
            email: new_user.email,
            first_name: new_user.first_name,
            last_name: new_user.last_name,
            password_hash: new_user.password_hash,
            is_verified: false,
            last_active: None,
            date_joined: self.clock.now(),
        };
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: i64) -> TripStoreResult<Option<User>> {
        let state = self.state.read().await;
        Ok(state.users.get(&id).cloned())
    }

    async fn get_user_by_username(&self, username: &str) -> TripStoreResult<Option<User>> {
        let state = self.state.read().await;
        Ok(state.users.values().find(|u| u.username == username).cloned())
    }

    async fn update_profile(&self, id: i64, update: ProfileUpdate) -> TripStoreResult<User> {
        let mut state = self.state.write().await;
        let user = state
            .users
            .get_mut(&id)
            .ok_or_else(|| TripStoreError::not_found("User", id))?;
        if let Some(first_name) = update.first_name {
            user.first_name = first_name;
        }
        if let Some(last_name) = update.last_name {
            user.last_name = last_name;
        }
        Ok(user.clone())
    }

    async fn touch_last_active(&self, id: i64) -> TripStoreResult<()> {
        let now = self.clock.now();
        let mut state = self.state.write().await;
        if let Some(user) = state.users.get_mut(&id) {
            user.last_active = Some(now);
        }
        Ok(())
    }

    async fn mark_verified(&self, id: i64) -> TripStoreResult<()> {
        let mut state = self.state.write().await;
        let user = state
            .users
            .get_mut(&id)
            .ok_or_else(|| TripStoreError::not_found("User", id))?;
        user.is_verified = true;
        Ok(())
    }

    async fn user_stats(&self, active_window: Duration) -> TripStoreResult<UserStats> {
        let cutoff = self.clock.now() - active_window;
        let state = self.state.read().await;

        let mut stats = UserStats {
            total: 0,
            active: 0,
            verified: 0,
            active_verified: 0,
        };
        for user in state.users.values() {
            stats.total += 1;
            let active = user.last_active.is_some_and(|at| at >= cutoff);
            if active {
                stats.active += 1;
            }
            if user.is_verified {
                stats.verified += 1;
                if active {
                    stats.active_verified += 1;
                }
            }
        }
        Ok(stats)
    }

    // =========================================================================
    // City catalog operations
    // =========================================================================

    async fn create_city(&self, name: &str, country: &str) -> TripStoreResult<City> {
        let mut state = self.state.write().await;
        let city = City {
            id: next_id(&mut state.ids.city),
            name: name.to_string(),
            country: country.to_string(),
        };
        state.cities.insert(city.id, city.clone());
        Ok(city)
    }

    async fn add_city_fact(
        &self,
        city_id: i64,
        title: &str,
        fact: &str,
    ) -> TripStoreResult<CityFact> {
        let mut state = self.state.write().await;
        if !state.cities.contains_key(&city_id) {
            return Err(TripStoreError::not_found("City", city_id));
        }
        let fact = CityFact {
            id: next_id(&mut state.ids.city_fact),
            city_id,
            title: title.to_string(),
            fact: fact.to_string(),
        };
        state.city_facts.push(fact.clone());
        Ok(fact)
    }

    async fn add_city_image(&self, city_id: i64, url: &str) -> TripStoreResult<CityImage> {
        let mut state = self.state.write().await;
        if !state.cities.contains_key(&city_id) {
            return Err(TripStoreError::not_found("City", city_id));
        }
        let image = CityImage {
            id: next_id(&mut state.ids.city_image),
            city_id,
            url: url.to_string(),
        };
        state.city_images.push(image.clone());
        Ok(image)
    }

    async fn list_top_cities(&self, limit: u32) -> TripStoreResult<Vec<CityOverview>> {
        let state = self.state.read().await;
        let mut overviews: Vec<CityOverview> = state
            .cities
            .values()
            .map(|city| CityOverview {
                city: city.clone(),
                visit_count: state
                    .visit_logs
                    .iter()
                    .filter(|l| l.city_id == city.id)
                    .count() as u64,
            })
            .collect();
        overviews.sort_by(|a, b| {
            b.visit_count
                .cmp(&a.visit_count)
                .then(a.city.id.cmp(&b.city.id))
        });
        overviews.truncate(limit as usize);
        Ok(overviews)
    }

    async fn search_cities(&self, prefix: &str, limit: u32) -> TripStoreResult<Vec<City>> {
        let prefix = prefix.to_lowercase();
        let state = self.state.read().await;
        let mut cities: Vec<City> = state
            .cities
            .values()
            .filter(|c| c.name.to_lowercase().starts_with(&prefix))
            .cloned()
            .collect();
        cities.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        cities.truncate(limit as usize);
        Ok(cities)
    }

    async fn get_city(&self, city_id: i64, viewer_id: i64) -> TripStoreResult<CityDetail> {
        let now = self.clock.now();
        let mut state = self.state.write().await;
        let city = state
            .cities
            .get(&city_id)
            .cloned()
            .ok_or_else(|| TripStoreError::not_found("City", city_id))?;

        let has_visited = state
            .trips
            .values()
            .any(|t| t.city_id == city_id && state.members.contains(&(t.id, viewer_id)));

        let log = CityVisitLog {
            id: next_id(&mut state.ids.visit_log),
            city_id,
            user_id: viewer_id,
            visited_at: now,
        };
        state.visit_logs.push(log);

        let visit_count = state
            .visit_logs
            .iter()
            .filter(|l| l.city_id == city_id)
            .count() as u64;

        Ok(CityDetail {
            city,
            has_visited,
            visit_count,
        })
    }

    async fn list_city_facts(&self, city_id: i64) -> TripStoreResult<Vec<CityFact>> {
        let state = self.state.read().await;
        if !state.cities.contains_key(&city_id) {
            return Err(TripStoreError::not_found("City", city_id));
        }
        Ok(state
            .city_facts
            .iter()
            .filter(|f| f.city_id == city_id)
            .cloned()
            .collect())
    }

    async fn list_city_images(&self, city_id: i64) -> TripStoreResult<Vec<CityImage>> {
        let state = self.state.read().await;
        if !state.cities.contains_key(&city_id) {
            return Err(TripStoreError::not_found("City", city_id));
        }
        Ok(state
            .city_images
            .iter()
            .filter(|i| i.city_id == city_id)
            .cloned()
            .collect())
    }

    async fn city_visits(&self, user_id: i64) -> TripStoreResult<Vec<CityVisitCount>> {
        let state = self.state.read().await;
        let mut counts: HashMap<i64, u64> = HashMap::new();
        for log in state.visit_logs.iter().filter(|l| l.user_id == user_id) {
            *counts.entry(log.city_id).or_default() += 1;
        }
        let mut visits: Vec<CityVisitCount> = counts
            .into_iter()
            .filter_map(|(city_id, visit_count)| {
                state.cities.get(&city_id).map(|city| CityVisitCount {
                    city: city.clone(),
                    visit_count,
                })
            })
            .collect();
        visits.sort_by(|a, b| {
            b.visit_count
                .cmp(&a.visit_count)
                .then(a.city.id.cmp(&b.city.id))
        });
        Ok(visits)
    }

    async fn city_name(&self, city_id: i64) -> TripStoreResult<Option<String>> {
        let state = self.state.read().await;
        Ok(state.cities.get(&city_id).map(|c| c.name.clone()))
    }

    // =========================================================================
    // Trip membership operations
    // =========================================================================

    async fn create_trip(&self, new_trip: NewTrip, creator_id: i64) -> TripStoreResult<i64> {
        validate_trip_name(&new_trip.name).map_err(TripStoreError::validation)?;

        let mut state = self.state.write().await;
        if !state.cities.contains_key(&new_trip.city_id) {
            return Err(TripStoreError::not_found("City", new_trip.city_id));
        }

        let trip = Trip {
            id: next_id(&mut state.ids.trip),
            name: new_trip.name.trim().to_string(),
            city_id: new_trip.city_id,
            start_date: new_trip.start_date,
            is_public: false,
        };
        let trip_id = trip.id;
        state.trips.insert(trip_id, trip);
        state.members.insert((trip_id, creator_id));
        Ok(trip_id)
    }

    async fn trip_view(&self, trip_id: i64, viewer_id: i64) -> TripStoreResult<TripView> {
        let state = self.state.read().await;
        let trip = state
            .trips
            .get(&trip_id)
            .ok_or_else(|| TripStoreError::not_found("Trip", trip_id))?;
        if !state.members.contains(&(trip_id, viewer_id)) {
            return Err(TripStoreError::unauthorized("User not a member of trip"));
        }
        state.view_for(trip, viewer_id)
    }

    async fn list_trips(&self, user_id: i64, limit: u32) -> TripStoreResult<Vec<TripSummary>> {
        let state = self.state.read().await;
        let mut trips: Vec<&Trip> = state
            .trips
            .values()
            .filter(|t| state.members.contains(&(t.id, user_id)))
            .collect();
        trips.sort_by(|a, b| b.start_date.cmp(&a.start_date).then(b.id.cmp(&a.id)));
        trips.truncate(limit as usize);

        trips
            .into_iter()
            .map(|trip| {
                let city = state
                    .cities
                    .get(&trip.city_id)
                    .ok_or_else(|| TripStoreError::not_found("City", trip.city_id))?;
                Ok(TripSummary {
                    id: trip.id,
                    name: trip.name.clone(),
                    city: city.clone(),
                    start_date: trip.start_date,
                })
            })
            .collect()
    }

    async fn is_member(&self, trip_id: i64, user_id: i64) -> TripStoreResult<bool> {
        let state = self.state.read().await;
        Ok(state.members.contains(&(trip_id, user_id)))
    }

    async fn add_member(
        &self,
        trip_id: i64,
        requester_id: i64,
        target_id: i64,
    ) -> TripStoreResult<()> {
        let now = self.clock.now();
        let mut state = self.state.write().await;

        let trip = state
            .trips
            .get(&trip_id)
            .ok_or_else(|| TripStoreError::not_found("Trip", trip_id))?;
        if !state.members.contains(&(trip_id, requester_id)) {
            return Err(TripStoreError::unauthorized("User not a member of trip"));
        }
        if !state.users.contains_key(&target_id) {
            return Err(TripStoreError::not_found("User", target_id));
        }
        if state.members.contains(&(trip_id, target_id)) {
            return Err(TripStoreError::conflict("User already associated with trip"));
        }

        let requester = state
            .users
            .get(&requester_id)
            .ok_or_else(|| TripStoreError::not_found("User", requester_id))?;
        let city = state
            .cities
            .get(&trip.city_id)
            .ok_or_else(|| TripStoreError::not_found("City", trip.city_id))?;
        let text = format!(
            "You are added to {} trip by {} {}.",
            city.name, requester.first_name, requester.last_name
        );

        let notification = Notification {
            id: next_id(&mut state.ids.notification),
            initiator_id: requester_id,
            destined_id: target_id,
            text,
            kind: entities::NotificationKind::Trip,
            is_read: false,
            created_at: now,
        };
        state.members.insert((trip_id, target_id));
        state.notifications.insert(notification.id, notification);
        Ok(())
    }

    async fn remove_member(
        &self,
        trip_id: i64,
        requester_id: i64,
        target_id: i64,
    ) -> TripStoreResult<()> {
        let mut state = self.state.write().await;

        if !state.trips.contains_key(&trip_id) {
            return Err(TripStoreError::not_found("Trip", trip_id));
        }
        if !state.members.contains(&(trip_id, requester_id)) {
            return Err(TripStoreError::unauthorized("User not a member of trip"));
        }
        if !state.users.contains_key(&target_id) {
            return Err(TripStoreError::not_found("User", target_id));
        }
        if !state.members.contains(&(trip_id, target_id)) {
            return Err(TripStoreError::conflict("User already not a part of trip"));
        }

        // Deliberately no last-member deletion here; only leave_trip applies
        // that rule.
        state.members.remove(&(trip_id, target_id));
        Ok(())
    }

    async fn leave_trip(&self, trip_id: i64, requester_id: i64) -> TripStoreResult<()> {
        let mut state = self.state.write().await;

        if !state.trips.contains_key(&trip_id) {
            return Err(TripStoreError::not_found("Trip", trip_id));
        }
        if !state.members.contains(&(trip_id, requester_id)) {
            return Err(TripStoreError::unauthorized("User not a part of trip"));
        }

        state.members.remove(&(trip_id, requester_id));
        if state.member_count(trip_id) == 0 {
            state.trips.remove(&trip_id);
        }
        Ok(())
    }

    async fn rename_trip(
        &self,
        trip_id: i64,
        requester_id: i64,
        new_name: &str,
    ) -> TripStoreResult<()> {
        validate_trip_name(new_name).map_err(TripStoreError::validation)?;

        let mut state = self.state.write().await;
        if !state.trips.contains_key(&trip_id) {
            return Err(TripStoreError::not_found("Trip", trip_id));
        }
        if !state.members.contains(&(trip_id, requester_id)) {
            return Err(TripStoreError::unauthorized("User not a member of trip"));
        }
        if let Some(trip) = state.trips.get_mut(&trip_id) {
            trip.name = new_name.trim().to_string();
        }
        Ok(())
    }

    async fn common_trips(
        &self,
        requester_id: i64,
        other_id: i64,
    ) -> TripStoreResult<Vec<TripView>> {
        if requester_id == other_id {
            return Err(TripStoreError::validation(
                "Requested user and logged in user are same",
            ));
        }

        let state = self.state.read().await;
        if !state.users.contains_key(&other_id) {
            return Err(TripStoreError::not_found("User", other_id));
        }

        let mut trips: Vec<&Trip> = state
            .trips
            .values()
            .filter(|t| {
                state.members.contains(&(t.id, requester_id))
                    && state.members.contains(&(t.id, other_id))
            })
            .collect();
        trips.sort_by_key(|t| t.id);

        trips
            .into_iter()
            .map(|trip| state.view_for(trip, requester_id))
            .collect()
    }

    // =========================================================================
    // Notification operations
    // =========================================================================

    async fn create_notification(
        &self,
        notification: NewNotification,
    ) -> TripStoreResult<Notification> {
        let now = self.clock.now();
        let mut state = self.state.write().await;
        let notification = Notification {
            id: next_id(&mut state.ids.notification),
            initiator_id: notification.initiator_id,
            destined_id: notification.destined_id,
            text: notification.text,
            kind: notification.kind,
            is_read: false,
            created_at: now,
        };
        state
            .notifications
            .insert(notification.id, notification.clone());
        Ok(notification)
    }

    async fn list_notifications(&self, user_id: i64) -> TripStoreResult<Vec<Notification>> {
        let state = self.state.read().await;
        let mut notifications: Vec<Notification> = state
            .notifications
            .values()
            .filter(|n| n.destined_id == user_id)
            .cloned()
            .collect();
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(notifications)
    }

    async fn mark_notification_read(&self, id: i64, requester_id: i64) -> TripStoreResult<()> {
        let mut state = self.state.write().await;
        let notification = state
            .notifications
            .get_mut(&id)
            .ok_or_else(|| TripStoreError::not_found("Notification", id))?;
        if notification.destined_id != requester_id {
            return Err(TripStoreError::unauthorized(
                "Notification not addressed to user",
            ));
        }
        notification.is_read = true;
        Ok(())
    }

    async fn mark_all_notifications_read(&self, user_id: i64) -> TripStoreResult<u64> {
        let mut state = self.state.write().await;
        let mut flipped = 0;
        for notification in state
            .notifications
            .values_mut()
            .filter(|n| n.destined_id == user_id && !n.is_read)
        {
            notification.is_read = true;
            flipped += 1;
        }
        Ok(flipped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    async fn seed_user(store: &MemoryTripStore, username: &str) -> User {
        store
            .create_user(NewUser {
                username: username.to_string(),
                email: format!("{username}@example.com"),
                first_name: username.to_string(),
                last_name: "Tester".to_string(),
                password_hash: "hash".to_string(),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_user_rejects_duplicates() {
        let store = MemoryTripStore::new();
        seed_user(&store, "amelie").await;

        let err = store
            .create_user(NewUser {
                username: "amelie".to_string(),
                email: "other@example.com".to_string(),
                first_name: "A".to_string(),
                last_name: "B".to_string(),
                password_hash: "hash".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, TripStoreError::Conflict(_)));

        let err = store
            .create_user(NewUser {
                username: "someone".to_string(),
                email: "amelie@example.com".to_string(),
                first_name: "A".to_string(),
                last_name: "B".to_string(),
                password_hash: "hash".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, TripStoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_trip_ids_are_not_reused() {
        let store = MemoryTripStore::new();
        let user = seed_user(&store, "solo").await;
        let city = store.create_city("Paris", "France").await.unwrap();

        let start = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let first = store
            .create_trip(
                NewTrip {
                    name: "First".to_string(),
                    city_id: city.id,
                    start_date: start,
                },
                user.id,
            )
            .await
            .unwrap();
        store.leave_trip(first, user.id).await.unwrap();

        let second = store
            .create_trip(
                NewTrip {
                    name: "Second".to_string(),
                    city_id: city.id,
                    start_date: start,
                },
                user.id,
            )
            .await
            .unwrap();
        assert!(second > first);
    }
}
