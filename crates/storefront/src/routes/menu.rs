//! Menu route handlers.

use axum::{
    Json,
    extract::{Path, State},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::instrument;

use tiffin_core::cutoff::{DaySchedule, build_schedule};
use tiffin_core::types::MealCategory;

use crate::error::{AppError, Result};
use crate::state::AppState;

/// One meal tab on the landing view.
#[derive(Debug, Serialize)]
pub struct MealView {
    pub meal: MealCategory,
    pub label: &'static str,
    /// Marked "available today" by the feed.
    pub active: bool,
    pub slot_label: Option<String>,
}

/// Landing view.
#[derive(Debug, Serialize)]
pub struct MenuOverview {
    pub store: String,
    pub active_meal: MealCategory,
    pub meals: Vec<MealView>,
    pub loaded: bool,
    pub generation: u64,
    pub fetched_at: Option<DateTime<Utc>>,
}

/// Delivery days for one meal.
#[derive(Debug, Serialize)]
pub struct ScheduleView {
    pub meal: MealCategory,
    pub loaded: bool,
    pub days: Vec<DaySchedule>,
}

/// Display the meal list and which one is active.
#[instrument(skip(state))]
pub async fn overview(State(state): State<AppState>) -> Json<MenuOverview> {
    let snapshot = state.catalog().snapshot().await;
    let active_meal = snapshot.menu.active_meal();
    let policy = &state.config().cutoffs;

    let meals = MealCategory::ALL
        .iter()
        .map(|&meal| MealView {
            meal,
            label: meal.label(),
            active: meal == active_meal,
            slot_label: policy.slot_label(meal).map(str::to_string),
        })
        .collect();

    Json(MenuOverview {
        store: state.config().store.name.clone(),
        active_meal,
        meals,
        loaded: snapshot.is_loaded(),
        generation: snapshot.generation,
        fetched_at: snapshot.fetched_at,
    })
}

/// Display the upcoming delivery days for a meal.
///
/// Before the first successful fetch the schedule is empty.
#[instrument(skip(state))]
pub async fn schedule(
    State(state): State<AppState>,
    Path(meal): Path<String>,
) -> Result<Json<ScheduleView>> {
    let meal: MealCategory = meal
        .parse()
        .map_err(|_| AppError::NotFound(format!("meal {meal}")))?;
    let snapshot = state.catalog().snapshot().await;
    let config = state.config();

    let days = build_schedule(
        &snapshot.menu,
        meal,
        &config.cutoffs,
        config.menu.window,
        state.now(),
    );

    Ok(Json(ScheduleView {
        meal,
        loaded: snapshot.is_loaded(),
        days,
    }))
}
