//! City catalog API endpoints.

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use entities::{City, CityDetail, CityFact, CityImage, CityOverview, CityVisitCount};
use serde::{Deserialize, Serialize};
use trip_store::TripStore;

use crate::error::{ServerError, ServerResult};
use crate::middleware::AuthenticatedUser;
use crate::state::AppState;

/// Top-cities query parameters.
#[derive(Debug, Deserialize)]
pub struct ListCitiesQuery {
    #[serde(default = "default_city_limit")]
    pub limit: u32,
}

fn default_city_limit() -> u32 {
    8
}

/// Lists the most-visited cities.
pub async fn list_top_cities<S: TripStore>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<ListCitiesQuery>,
) -> ServerResult<Json<Vec<CityOverview>>> {
    let cities = state.store.list_top_cities(query.limit).await?;
    Ok(Json(cities))
}

/// Create-city request body.
#[derive(Debug, Deserialize)]
pub struct CreateCityRequest {
    pub name: Option<String>,
    pub country: Option<String>,
}

/// Adds a city to the catalog.
pub async fn create_city<S: TripStore>(
    State(state): State<Arc<AppState<S>>>,
    Json(request): Json<CreateCityRequest>,
) -> ServerResult<(StatusCode, Json<City>)> {
    let (Some(name), Some(country)) = (request.name, request.country) else {
        return Err(ServerError::Validation("Send name, country".to_string()));
    };
    if name.trim().is_empty() || country.trim().is_empty() {
        return Err(ServerError::Validation(
            "name and country must not be empty".to_string(),
        ));
    }

    let city = state.store.create_city(name.trim(), country.trim()).await?;
    Ok((StatusCode::CREATED, Json(city)))
}

/// Prefix-search query parameters.
#[derive(Debug, Deserialize)]
pub struct SearchCitiesQuery {
    #[serde(default = "default_search_limit")]
    pub limit: u32,
}

fn default_search_limit() -> u32 {
    5
}

/// Lists cities whose name starts with the given prefix.
pub async fn search_cities<S: TripStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(prefix): Path<String>,
    Query(query): Query<SearchCitiesQuery>,
) -> ServerResult<Json<Vec<City>>> {
    let cities = state.store.search_cities(&prefix, query.limit).await?;
    Ok(Json(cities))
}

/// Returns the caller's per-city visit counts.
pub async fn city_visits<S: TripStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> ServerResult<Json<Vec<CityVisitCount>>> {
    let visits = state.store.city_visits(user.id).await?;
    Ok(Json(visits))
}

/// Returns one city shaped for the caller, recording the visit.
pub async fn get_city<S: TripStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(city_id): Path<i64>,
) -> ServerResult<Json<CityDetail>> {
    let detail = state.store.get_city(city_id, user.id).await?;
    Ok(Json(detail))
}

/// Lists the facts attached to a city.
pub async fn list_city_facts<S: TripStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(city_id): Path<i64>,
) -> ServerResult<Json<Vec<CityFact>>> {
    let facts = state.store.list_city_facts(city_id).await?;
    Ok(Json(facts))
}

/// Add-fact request body.
#[derive(Debug, Deserialize)]
pub struct AddCityFactRequest {
    pub title: Option<String>,
    pub fact: Option<String>,
}

/// Attaches a fact to a city.
pub async fn add_city_fact<S: TripStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(city_id): Path<i64>,
    Json(request): Json<AddCityFactRequest>,
) -> ServerResult<(StatusCode, Json<CityFact>)> {
    let (Some(title), Some(fact)) = (request.title, request.fact) else {
        return Err(ServerError::Validation("Send title, fact".to_string()));
    };

    let fact = state.store.add_city_fact(city_id, &title, &fact).await?;
    Ok((StatusCode::CREATED, Json(fact)))
}

/// Lists the images attached to a city.
pub async fn list_city_images<S: TripStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(city_id): Path<i64>,
) -> ServerResult<Json<Vec<CityImage>>> {
    let images = state.store.list_city_images(city_id).await?;
    Ok(Json(images))
}

/// Add-image request body.
#[derive(Debug, Deserialize)]
pub struct AddCityImageRequest {
    pub url: Option<String>,
}

/// Attaches an image to a city.
pub async fn add_city_image<S: TripStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(city_id): Path<i64>,
    Json(request): Json<AddCityImageRequest>,
) -> ServerResult<(StatusCode, Json<CityImage>)> {
    let Some(url) = request.url else {
        return Err(ServerError::Validation("Send url".to_string()));
    };

    let image = state.store.add_city_image(city_id, &url).await?;
    Ok((StatusCode::CREATED, Json(image)))
}

/// City-information response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct CityInformationResponse {
    /// The city the information belongs to.
    pub city_id: i64,
    /// City name used for the lookup.
    pub name: String,
    /// Cleaned plain-text extract.
    pub information: String,
}

/// Returns the city's Wikipedia extract. Single attempt, no retries; a
/// failing upstream surfaces as 503.
pub async fn city_information<S: TripStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(city_id): Path<i64>,
) -> ServerResult<Json<CityInformationResponse>> {
    let name = state
        .store
        .city_name(city_id)
        .await?
        .ok_or_else(|| ServerError::NotFound("City does not exist".to_string()))?;

    let information = state
        .wiki
        .city_extract(&name)
        .await
        .map_err(|e| ServerError::Upstream(e.to_string()))?;

    Ok(Json(CityInformationResponse {
        city_id,
        name,
        information,
    }))
}
