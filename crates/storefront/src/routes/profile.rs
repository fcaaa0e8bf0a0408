//! Profile route handlers.

use axum::{Json, http::StatusCode};
use serde::Deserialize;
use tracing::instrument;

use tiffin_core::profile::UserProfile;

use crate::error::{AppError, Result};
use crate::models::BrowserStorage;

/// Profile form. Missing fields are treated as blank.
#[derive(Debug, Deserialize)]
pub struct ProfileRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
}

/// Display the saved profile.
#[instrument(skip(storage))]
pub async fn show(storage: BrowserStorage) -> Result<Json<UserProfile>> {
    UserProfile::load(&storage)
        .map(Json)
        .ok_or_else(|| AppError::NotFound("profile".to_string()))
}

/// Save the profile, replacing any previous one.
#[instrument(skip(storage, req))]
pub async fn save(
    mut storage: BrowserStorage,
    Json(req): Json<ProfileRequest>,
) -> Result<Json<UserProfile>> {
    let profile = UserProfile::new(&req.name, &req.phone, &req.address)?;
    profile.save(&mut storage)?;
    storage.save().await?;
    Ok(Json(profile))
}

/// Forget the saved profile.
#[instrument(skip(storage))]
pub async fn clear(mut storage: BrowserStorage) -> Result<StatusCode> {
    UserProfile::clear(&mut storage);
    storage.save().await?;
    Ok(StatusCode::NO_CONTENT)
}
