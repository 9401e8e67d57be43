//! SQLite store implementation backed by `sqlx`.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use entities::{
    City, CityDetail, CityFact, CityImage, CityOverview, CityVisitCount, NewNotification, NewTrip,
    NewUser, Notification, NotificationKind, ProfileUpdate, TripSummary, TripView, User,
    UserStats, UserSummary, validate_trip_name,
};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{FromRow, SqlitePool};

use crate::{Clock, SystemClock, TripStore, TripStoreError, TripStoreResult};

/// Database row for User.
#[derive(Debug, Clone, FromRow)]
struct UserRow {
    id: i64,
    username: String,
    email: String,
    first_name: String,
    last_name: String,
    password_hash: String,
    is_verified: bool,
    last_active: Option<DateTime<Utc>>,
    date_joined: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            username: row.username,
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            password_hash: row.password_hash,
            is_verified: row.is_verified,
            last_active: row.last_active,
            date_joined: row.date_joined,
        }
    }
}

/// Database row for a trip member, shaped for member lists.
#[derive(Debug, Clone, FromRow)]
struct MemberRow {
    id: i64,
    username: String,
    first_name: String,
    last_name: String,
}

impl From<MemberRow> for UserSummary {
    fn from(row: MemberRow) -> Self {
        UserSummary {
            id: row.id,
            username: row.username,
            first_name: row.first_name,
            last_name: row.last_name,
        }
    }
}

/// Database row for City.
#[derive(Debug, Clone, FromRow)]
struct CityRow {
    id: i64,
    name: String,
    country: String,
}

impl From<CityRow> for City {
    fn from(row: CityRow) -> Self {
        City {
            id: row.id,
            name: row.name,
            country: row.country,
        }
    }
}

/// Database row for a city with its aggregated visit count.
#[derive(Debug, Clone, FromRow)]
struct CityCountRow {
    id: i64,
    name: String,
    country: String,
    visit_count: i64,
}

/// Database row for a trip joined with its city.
#[derive(Debug, Clone, FromRow)]
struct TripCityRow {
    id: i64,
    name: String,
    start_date: NaiveDate,
    is_public: bool,
    city_id: i64,
    city_name: String,
    city_country: String,
}

impl TripCityRow {
    fn city(&self) -> City {
        City {
            id: self.city_id,
            name: self.city_name.clone(),
            country: self.city_country.clone(),
        }
    }
}

/// Database row for Notification.
#[derive(Debug, Clone, FromRow)]
struct NotificationRow {
    id: i64,
    initiator_id: i64,
    destined_id: i64,
    text: String,
    kind: String,
    is_read: bool,
    created_at: DateTime<Utc>,
}

impl From<NotificationRow> for Notification {
    fn from(row: NotificationRow) -> Self {
        Notification {
            id: row.id,
            initiator_id: row.initiator_id,
            destined_id: row.destined_id,
            text: row.text,
            kind: NotificationKind::parse(&row.kind).unwrap_or_default(),
            is_read: row.is_read,
            created_at: row.created_at,
        }
    }
}

const TRIP_WITH_CITY: &str = "SELECT t.id AS id, t.name AS name, t.start_date AS start_date, \
     t.is_public AS is_public, c.id AS city_id, c.name AS city_name, c.country AS city_country \
     FROM trips t JOIN cities c ON c.id = t.city_id";

/// SQLite-backed store.
pub struct SqliteTripStore {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
}

impl SqliteTripStore {
    /// Creates a store over an existing pool.
    pub fn new(pool: SqlitePool, clock: Arc<dyn Clock>) -> Self {
        Self { pool, clock }
    }

    /// Connects to the database, applies the schema, and returns a store
    /// using the system clock.
    pub async fn connect(database_url: &str) -> TripStoreResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        let store = Self::new(pool, Arc::new(SystemClock));
        store.migrate().await?;
        Ok(store)
    }

    /// Applies the schema. Idempotent.
    pub async fn migrate(&self) -> TripStoreResult<()> {
        sqlx::raw_sql(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn members_excluding(
        &self,
        trip_id: i64,
        excluded_user_id: i64,
    ) -> TripStoreResult<Vec<UserSummary>> {
        let rows: Vec<MemberRow> = sqlx::query_as(
            "SELECT u.id AS id, u.username AS username, u.first_name AS first_name, \
             u.last_name AS last_name \
             FROM users u JOIN trip_members m ON m.user_id = u.id \
             WHERE m.trip_id = ? AND u.id <> ? \
             ORDER BY u.id",
        )
        .bind(trip_id)
        .bind(excluded_user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(UserSummary::from).collect())
    }
}

#[async_trait]
impl TripStore for SqliteTripStore {
    // =========================================================================
    // User operations
    // =========================================================================

    async fn create_user(&self, new_user: NewUser) -> TripStoreResult<User> {
        if new_user.username.trim().is_empty() || new_user.email.trim().is_empty() {
            return Err(TripStoreError::validation(
                "username and email must not be empty",
            ));
        }

        let username_taken: i64 =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE username = ?)")
                .bind(&new_user.username)
                .fetch_one(&self.pool)
                .await?;
        if username_taken != 0 {
            return Err(TripStoreError::conflict("Username already exists"));
        }

        let email_taken: i64 =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = ?)")
                .bind(&new_user.email)
                .fetch_one(&self.pool)
                .await?;
        if email_taken != 0 {
            return Err(TripStoreError::conflict("Email already exists"));
        }

        let date_joined = self.clock.now();
        let result = sqlx::query(
            "INSERT INTO users (username, email, first_name, last_name, password_hash, \
             is_verified, last_active, date_joined) \
             VALUES (?, ?, ?, ?, ?, 0, NULL, ?)",
        )
        .bind(&new_user.username)
        .bind(&new_user.email)
        .bind(&new_user.first_name)
        .bind(&new_user.last_name)
        .bind(&new_user.password_hash)
        .bind(date_joined)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            // Two concurrent sign-ups can pass the checks above; the unique
            // constraints are the backstop.
            if let sqlx::Error::Database(db) = &e {
                if db.is_unique_violation() {
                    return TripStoreError::conflict("Username or email already exists");
                }
            }
            TripStoreError::Database(e)
        })?;

        Ok(User {
            id: result.last_insert_rowid(),
            username: new_user.username,
            email: new_user.email,
            first_name: new_user.first_name,
            last_name: new_user.last_name,
            password_hash: new_user.password_hash,
            is_verified: false,
            last_active: None,
            date_joined,
        })
    }

    async fn get_user(&self, id: i64) -> TripStoreResult<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, username, email, first_name, last_name, password_hash, is_verified, \
             last_active, date_joined FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(User::from))
    }

    async fn get_user_by_username(&self, username: &str) -> TripStoreResult<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, username, email, first_name, last_name, password_hash, is_verified, \
             last_active, date_joined FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(User::from))
    }

    async fn update_profile(&self, id: i64, update: ProfileUpdate) -> TripStoreResult<User> {
        let mut user = self
            .get_user(id)
            .await?
            .ok_or_else(|| TripStoreError::not_found("User", id))?;
        if let Some(first_name) = update.first_name {
            user.first_name = first_name;
        }
        if let Some(last_name) = update.last_name {
            user.last_name = last_name;
        }

        sqlx::query("UPDATE users SET first_name = ?, last_name = ? WHERE id = ?")
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(user)
    }

    async fn touch_last_active(&self, id: i64) -> TripStoreResult<()> {
        sqlx::query("UPDATE users SET last_active = ? WHERE id = ?")
            .bind(self.clock.now())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn mark_verified(&self, id: i64) -> TripStoreResult<()> {
        let result = sqlx::query("UPDATE users SET is_verified = 1 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(TripStoreError::not_found("User", id));
        }
        Ok(())
    }

    async fn user_stats(&self, active_window: Duration) -> TripStoreResult<UserStats> {
        let cutoff = self.clock.now() - active_window;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        let verified: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE is_verified = 1")
                .fetch_one(&self.pool)
                .await?;
        let active: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM users WHERE last_active IS NOT NULL AND last_active >= ?",
        )
        .bind(cutoff)
        .fetch_one(&self.pool)
        .await?;
        let active_verified: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM users \
             WHERE is_verified = 1 AND last_active IS NOT NULL AND last_active >= ?",
        )
        .bind(cutoff)
        .fetch_one(&self.pool)
        .await?;

        Ok(UserStats {
            total: total as u64,
            active: active as u64,
            verified: verified as u64,
            active_verified: active_verified as u64,
        })
    }

    // =========================================================================
    // City catalog operations
    // =========================================================================

    async fn create_city(&self, name: &str, country: &str) -> TripStoreResult<City> {
        let result = sqlx::query("INSERT INTO cities (name, country) VALUES (?, ?)")
            .bind(name)
            .bind(country)
            .execute(&self.pool)
            .await?;
        Ok(City {
            id: result.last_insert_rowid(),
            name: name.to_string(),
            country: country.to_string(),
        })
    }

    async fn add_city_fact(
        &self,
        city_id: i64,
        title: &str,
        fact: &str,
    ) -> TripStoreResult<CityFact> {
        let exists: i64 = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM cities WHERE id = ?)")
            .bind(city_id)
            .fetch_one(&self.pool)
            .await?;
        if exists == 0 {
            return Err(TripStoreError::not_found("City", city_id));
        }

        let result = sqlx::query("INSERT INTO city_facts (city_id, title, fact) VALUES (?, ?, ?)")
            .bind(city_id)
            .bind(title)
            .bind(fact)
            .execute(&self.pool)
            .await?;
        Ok(CityFact {
            id: result.last_insert_rowid(),
            city_id,
            title: title.to_string(),
            fact: fact.to_string(),
        })
    }

    async fn add_city_image(&self, city_id: i64, url: &str) -> TripStoreResult<CityImage> {
        let exists: i64 = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM cities WHERE id = ?)")
            .bind(city_id)
            .fetch_one(&self.pool)
            .await?;
        if exists == 0 {
            return Err(TripStoreError::not_found("City", city_id));
        }

        let result = sqlx::query("INSERT INTO city_images (city_id, url) VALUES (?, ?)")
            .bind(city_id)
            .bind(url)
            .execute(&self.pool)
            .await?;
        Ok(CityImage {
            id: result.last_insert_rowid(),
            city_id,
            url: url.to_string(),
        })
    }

    async fn list_top_cities(&self, limit: u32) -> TripStoreResult<Vec<CityOverview>> {
        let rows: Vec<CityCountRow> = sqlx::query_as(
            "SELECT c.id AS id, c.name AS name, c.country AS country, \
             COUNT(l.id) AS visit_count \
             FROM cities c LEFT JOIN city_visit_logs l ON l.city_id = c.id \
             GROUP BY c.id, c.name, c.country \
             ORDER BY visit_count DESC, c.id ASC \
             LIMIT ?",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| CityOverview {
                visit_count: row.visit_count as u64,
                city: City {
                    id: row.id,
                    name: row.name,
                    country: row.country,
                },
            })
            .collect())
    }

    async fn search_cities(&self, prefix: &str, limit: u32) -> TripStoreResult<Vec<City>> {
        let rows: Vec<CityRow> = sqlx::query_as(
            "SELECT id, name, country FROM cities WHERE name LIKE ? \
             ORDER BY name COLLATE NOCASE LIMIT ?",
        )
        .bind(format!("{prefix}%"))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(City::from).collect())
    }

    async fn get_city(&self, city_id: i64, viewer_id: i64) -> TripStoreResult<CityDetail> {
        let row: Option<CityRow> =
            sqlx::query_as("SELECT id, name, country FROM cities WHERE id = ?")
                .bind(city_id)
                .fetch_optional(&self.pool)
                .await?;
        let city = row
            .map(City::from)
            .ok_or_else(|| TripStoreError::not_found("City", city_id))?;

        let has_visited: i64 = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM trips t \
             JOIN trip_members m ON m.trip_id = t.id \
             WHERE t.city_id = ? AND m.user_id = ?)",
        )
        .bind(city_id)
        .bind(viewer_id)
        .fetch_one(&self.pool)
        .await?;

        // A failed visit-log write must not fail the read.
        let logged = sqlx::query(
            "INSERT INTO city_visit_logs (city_id, user_id, visited_at) VALUES (?, ?, ?)",
        )
        .bind(city_id)
        .bind(viewer_id)
        .bind(self.clock.now())
        .execute(&self.pool)
        .await;
        if let Err(e) = logged {
            tracing::warn!(city_id, viewer_id, error = %e, "Failed to record city visit");
        }

        let visit_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM city_visit_logs WHERE city_id = ?")
                .bind(city_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(CityDetail {
            city,
            has_visited: has_visited != 0,
            visit_count: visit_count as u64,
        })
    }

    async fn list_city_facts(&self, city_id: i64) -> TripStoreResult<Vec<CityFact>> {
        let exists: i64 = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM cities WHERE id = ?)")
            .bind(city_id)
            .fetch_one(&self.pool)
            .await?;
        if exists == 0 {
            return Err(TripStoreError::not_found("City", city_id));
        }

        #[derive(FromRow)]
        struct FactRow {
            id: i64,
            city_id: i64,
            title: String,
            fact: String,
        }
        let rows: Vec<FactRow> = sqlx::query_as(
            "SELECT id, city_id, title, fact FROM city_facts WHERE city_id = ? ORDER BY id",
        )
        .bind(city_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|row| CityFact {
                id: row.id,
                city_id: row.city_id,
                title: row.title,
                fact: row.fact,
            })
            .collect())
    }

    async fn list_city_images(&self, city_id: i64) -> TripStoreResult<Vec<CityImage>> {
        let exists: i64 = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM cities WHERE id = ?)")
            .bind(city_id)
            .fetch_one(&self.pool)
            .await?;
        if exists == 0 {
            return Err(TripStoreError::not_found("City", city_id));
        }

        #[derive(FromRow)]
        struct ImageRow {
            id: i64,
            city_id: i64,
            url: String,
        }
        let rows: Vec<ImageRow> = sqlx::query_as(
            "SELECT id, city_id, url FROM city_images WHERE city_id = ? ORDER BY id",
        )
        .bind(city_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|row| CityImage {
                id: row.id,
                city_id: row.city_id,
                url: row.url,
            })
            .collect())
    }

    async fn city_visits(&self, user_id: i64) -> TripStoreResult<Vec<CityVisitCount>> {
        let rows: Vec<CityCountRow> = sqlx::query_as(
            "SELECT c.id AS id, c.name AS name, c.country AS country, \
             COUNT(l.id) AS visit_count \
             FROM city_visit_logs l JOIN cities c ON c.id = l.city_id \
             WHERE l.user_id = ? \
             GROUP BY c.id, c.name, c.country \
             ORDER BY visit_count DESC, c.id ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| CityVisitCount {
                visit_count: row.visit_count as u64,
                city: City {
                    id: row.id,
                    name: row.name,
                    country: row.country,
                },
            })
            .collect())
    }

    async fn city_name(&self, city_id: i64) -> TripStoreResult<Option<String>> {
        let name: Option<String> = sqlx::query_scalar("SELECT name FROM cities WHERE id = ?")
            .bind(city_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(name)
    }

    // =========================================================================
    // Trip membership operations
    // =========================================================================

    async fn create_trip(&self, new_trip: NewTrip, creator_id: i64) -> TripStoreResult<i64> {
        validate_trip_name(&new_trip.name).map_err(TripStoreError::validation)?;

        let mut tx = self.pool.begin().await?;

        let city_exists: i64 =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM cities WHERE id = ?)")
                .bind(new_trip.city_id)
                .fetch_one(&mut *tx)
                .await?;
        if city_exists == 0 {
            return Err(TripStoreError::not_found("City", new_trip.city_id));
        }

        let result = sqlx::query(
            "INSERT INTO trips (name, city_id, start_date, is_public) VALUES (?, ?, ?, 0)",
        )
        .bind(new_trip.name.trim())
        .bind(new_trip.city_id)
        .bind(new_trip.start_date)
        .execute(&mut *tx)
        .await?;
        let trip_id = result.last_insert_rowid();

        sqlx::query("INSERT INTO trip_members (trip_id, user_id) VALUES (?, ?)")
            .bind(trip_id)
            .bind(creator_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(trip_id)
    }

    async fn trip_view(&self, trip_id: i64, viewer_id: i64) -> TripStoreResult<TripView> {
        let row: Option<TripCityRow> =
            sqlx::query_as(&format!("{TRIP_WITH_CITY} WHERE t.id = ?"))
                .bind(trip_id)
                .fetch_optional(&self.pool)
                .await?;
        let trip = row.ok_or_else(|| TripStoreError::not_found("Trip", trip_id))?;

        if !self.is_member(trip_id, viewer_id).await? {
            return Err(TripStoreError::unauthorized("User not a member of trip"));
        }

        let users = self.members_excluding(trip_id, viewer_id).await?;
        Ok(TripView {
            id: trip.id,
            name: trip.name.clone(),
            city: trip.city(),
            start_date: trip.start_date,
            is_public: trip.is_public,
            users,
        })
    }

    async fn list_trips(&self, user_id: i64, limit: u32) -> TripStoreResult<Vec<TripSummary>> {
        let rows: Vec<TripCityRow> = sqlx::query_as(&format!(
            "{TRIP_WITH_CITY} JOIN trip_members m ON m.trip_id = t.id \
             WHERE m.user_id = ? ORDER BY t.start_date DESC, t.id DESC LIMIT ?"
        ))
        .bind(user_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| TripSummary {
                id: row.id,
                name: row.name.clone(),
                city: row.city(),
                start_date: row.start_date,
            })
            .collect())
    }

    async fn is_member(&self, trip_id: i64, user_id: i64) -> TripStoreResult<bool> {
        let exists: i64 = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM trip_members WHERE trip_id = ? AND user_id = ?)",
        )
        .bind(trip_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists != 0)
    }

    async fn add_member(
        &self,
        trip_id: i64,
        requester_id: i64,
        target_id: i64,
    ) -> TripStoreResult<()> {
        let mut tx = self.pool.begin().await?;

        let trip: Option<TripCityRow> =
            sqlx::query_as(&format!("{TRIP_WITH_CITY} WHERE t.id = ?"))
                .bind(trip_id)
                .fetch_optional(&mut *tx)
                .await?;
        let trip = trip.ok_or_else(|| TripStoreError::not_found("Trip", trip_id))?;

        let requester_member: i64 = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM trip_members WHERE trip_id = ? AND user_id = ?)",
        )
        .bind(trip_id)
        .bind(requester_id)
        .fetch_one(&mut *tx)
        .await?;
        if requester_member == 0 {
            return Err(TripStoreError::unauthorized("User not a member of trip"));
        }

        let target_exists: i64 = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = ?)")
            .bind(target_id)
            .fetch_one(&mut *tx)
            .await?;
        if target_exists == 0 {
            return Err(TripStoreError::not_found("User", target_id));
        }

        let target_member: i64 = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM trip_members WHERE trip_id = ? AND user_id = ?)",
        )
        .bind(trip_id)
        .bind(target_id)
        .fetch_one(&mut *tx)
        .await?;
        if target_member != 0 {
            return Err(TripStoreError::conflict("User already associated with trip"));
        }

        let requester: Option<MemberRow> = sqlx::query_as(
            "SELECT id, username, first_name, last_name FROM users WHERE id = ?",
        )
        .bind(requester_id)
        .fetch_optional(&mut *tx)
        .await?;
        let requester = requester.ok_or_else(|| TripStoreError::not_found("User", requester_id))?;

        // Membership change and its notification commit together or not at
        // all.
        sqlx::query("INSERT INTO trip_members (trip_id, user_id) VALUES (?, ?)")
            .bind(trip_id)
            .bind(target_id)
            .execute(&mut *tx)
            .await?;

        let text = format!(
            "You are added to {} trip by {} {}.",
            trip.city_name, requester.first_name, requester.last_name
        );
        sqlx::query(
            "INSERT INTO notifications (initiator_id, destined_id, text, kind, is_read, \
             created_at) VALUES (?, ?, ?, ?, 0, ?)",
        )
        .bind(requester_id)
        .bind(target_id)
        .bind(&text)
        .bind(NotificationKind::Trip.as_str())
        .bind(self.clock.now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn remove_member(
        &self,
        trip_id: i64,
        requester_id: i64,
        target_id: i64,
    ) -> TripStoreResult<()> {
        let mut tx = self.pool.begin().await?;

        let trip_exists: i64 = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM trips WHERE id = ?)")
            .bind(trip_id)
            .fetch_one(&mut *tx)
            .await?;
        if trip_exists == 0 {
            return Err(TripStoreError::not_found("Trip", trip_id));
        }

        let requester_member: i64 = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM trip_members WHERE trip_id = ? AND user_id = ?)",
        )
        .bind(trip_id)
        .bind(requester_id)
        .fetch_one(&mut *tx)
        .await?;
        if requester_member == 0 {
            return Err(TripStoreError::unauthorized("User not a member of trip"));
        }

        let target_exists: i64 = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = ?)")
            .bind(target_id)
            .fetch_one(&mut *tx)
            .await?;
        if target_exists == 0 {
            return Err(TripStoreError::not_found("User", target_id));
        }

        // Deliberately no last-member deletion here; only leave_trip applies
        // that rule.
        let result = sqlx::query("DELETE FROM trip_members WHERE trip_id = ? AND user_id = ?")
            .bind(trip_id)
            .bind(target_id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(TripStoreError::conflict("User already not a part of trip"));
        }

        tx.commit().await?;
        Ok(())
    }

    async fn leave_trip(&self, trip_id: i64, requester_id: i64) -> TripStoreResult<()> {
        let mut tx = self.pool.begin().await?;

        let trip_exists: i64 = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM trips WHERE id = ?)")
            .bind(trip_id)
            .fetch_one(&mut *tx)
            .await?;
        if trip_exists == 0 {
            return Err(TripStoreError::not_found("Trip", trip_id));
        }

        let result = sqlx::query("DELETE FROM trip_members WHERE trip_id = ? AND user_id = ?")
            .bind(trip_id)
            .bind(requester_id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(TripStoreError::unauthorized("User not a part of trip"));
        }

        // Conditional delete inside the same transaction; two concurrent
        // last-member departures cannot both see a sole member.
        sqlx::query(
            "DELETE FROM trips WHERE id = ? \
             AND NOT EXISTS (SELECT 1 FROM trip_members WHERE trip_id = ?)",
        )
        .bind(trip_id)
        .bind(trip_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn rename_trip(
        &self,
        trip_id: i64,
        requester_id: i64,
        new_name: &str,
    ) -> TripStoreResult<()> {
        validate_trip_name(new_name).map_err(TripStoreError::validation)?;

        let mut tx = self.pool.begin().await?;

        let trip_exists: i64 = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM trips WHERE id = ?)")
            .bind(trip_id)
            .fetch_one(&mut *tx)
            .await?;
        if trip_exists == 0 {
            return Err(TripStoreError::not_found("Trip", trip_id));
        }

        let requester_member: i64 = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM trip_members WHERE trip_id = ? AND user_id = ?)",
        )
        .bind(trip_id)
        .bind(requester_id)
        .fetch_one(&mut *tx)
        .await?;
        if requester_member == 0 {
            return Err(TripStoreError::unauthorized("User not a member of trip"));
        }

        sqlx::query("UPDATE trips SET name = ? WHERE id = ?")
            .bind(new_name.trim())
            .bind(trip_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
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

        let other_exists: i64 = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = ?)")
            .bind(other_id)
            .fetch_one(&self.pool)
            .await?;
        if other_exists == 0 {
            return Err(TripStoreError::not_found("User", other_id));
        }

        let rows: Vec<TripCityRow> = sqlx::query_as(&format!(
            "{TRIP_WITH_CITY} \
             WHERE EXISTS (SELECT 1 FROM trip_members m WHERE m.trip_id = t.id AND m.user_id = ?) \
             AND EXISTS (SELECT 1 FROM trip_members m WHERE m.trip_id = t.id AND m.user_id = ?) \
             ORDER BY t.id"
        ))
        .bind(requester_id)
        .bind(other_id)
        .fetch_all(&self.pool)
        .await?;

        let mut views = Vec::with_capacity(rows.len());
        for row in rows {
            let users = self.members_excluding(row.id, requester_id).await?;
            views.push(TripView {
                id: row.id,
                name: row.name.clone(),
                city: row.city(),
                start_date: row.start_date,
                is_public: row.is_public,
                users,
            });
        }
        Ok(views)
    }

    // =========================================================================
    // Notification operations
    // =========================================================================

    async fn create_notification(
        &self,
        notification: NewNotification,
    ) -> TripStoreResult<Notification> {
        let created_at = self.clock.now();
        let result = sqlx::query(
            "INSERT INTO notifications (initiator_id, destined_id, text, kind, is_read, \
             created_at) VALUES (?, ?, ?, ?, 0, ?)",
        )
        .bind(notification.initiator_id)
        .bind(notification.destined_id)
        .bind(&notification.text)
        .bind(notification.kind.as_str())
        .bind(created_at)
        .execute(&self.pool)
        .await?;

        Ok(Notification {
            id: result.last_insert_rowid(),
            initiator_id: notification.initiator_id,
            destined_id: notification.destined_id,
            text: notification.text,
            kind: notification.kind,
            is_read: false,
            created_at,
        })
    }

    async fn list_notifications(&self, user_id: i64) -> TripStoreResult<Vec<Notification>> {
        let rows: Vec<NotificationRow> = sqlx::query_as(
            "SELECT id, initiator_id, destined_id, text, kind, is_read, created_at \
             FROM notifications WHERE destined_id = ? \
             ORDER BY created_at DESC, id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Notification::from).collect())
    }

    async fn mark_notification_read(&self, id: i64, requester_id: i64) -> TripStoreResult<()> {
        let destined_id: Option<i64> =
            sqlx::query_scalar("SELECT destined_id FROM notifications WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        let destined_id = destined_id.ok_or_else(|| TripStoreError::not_found("Notification", id))?;
        if destined_id != requester_id {
            return Err(TripStoreError::unauthorized(
                "Notification not addressed to user",
            ));
        }

        sqlx::query("UPDATE notifications SET is_read = 1 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn mark_all_notifications_read(&self, user_id: i64) -> TripStoreResult<u64> {
        let result =
            sqlx::query("UPDATE notifications SET is_read = 1 WHERE destined_id = ? AND is_read = 0")
                .bind(user_id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }
}

/// SQL schema definition
const SCHEMA_SQL: &str = r#"
-- Users table
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL UNIQUE,
    email TEXT NOT NULL UNIQUE,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    password_hash TEXT NOT NULL,
    is_verified INTEGER NOT NULL DEFAULT 0,
    last_active TEXT,
    date_joined TEXT NOT NULL
);

-- Cities table
CREATE TABLE IF NOT EXISTS cities (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    country TEXT NOT NULL
);

-- City facts
CREATE TABLE IF NOT EXISTS city_facts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    city_id INTEGER NOT NULL REFERENCES cities(id) ON DELETE CASCADE,
    title TEXT NOT NULL,
    fact TEXT NOT NULL
);

-- City images
CREATE TABLE IF NOT EXISTS city_images (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    city_id INTEGER NOT NULL REFERENCES cities(id) ON DELETE CASCADE,
    url TEXT NOT NULL
);

-- City visit logs (one row per detail view)
CREATE TABLE IF NOT EXISTS city_visit_logs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    city_id INTEGER NOT NULL REFERENCES cities(id) ON DELETE CASCADE,
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    visited_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_city_visit_logs_city ON city_visit_logs(city_id);
CREATE INDEX IF NOT EXISTS idx_city_visit_logs_user ON city_visit_logs(user_id);

-- Trips table
CREATE TABLE IF NOT EXISTS trips (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    city_id INTEGER NOT NULL REFERENCES cities(id) ON DELETE CASCADE,
    start_date TEXT NOT NULL,
    is_public INTEGER NOT NULL DEFAULT 0
);

-- Trip members (M:N relationship)
CREATE TABLE IF NOT EXISTS trip_members (
    trip_id INTEGER NOT NULL REFERENCES trips(id) ON DELETE CASCADE,
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    PRIMARY KEY (trip_id, user_id)
);

CREATE INDEX IF NOT EXISTS idx_trip_members_user ON trip_members(user_id);

-- Notifications table
CREATE TABLE IF NOT EXISTS notifications (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    initiator_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    destined_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    text TEXT NOT NULL,
    kind TEXT NOT NULL,
    is_read INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_notifications_destined ON notifications(destined_id, created_at);
"#;
