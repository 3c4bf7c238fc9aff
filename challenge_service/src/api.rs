//! HTTP API Handlers
//!
//! JSON endpoints consumed by the presentation layer:
//! - `GET  /branches` - List branches
//! - `POST /users` - Sign up (creates the user's own participant)
//! - `GET  /users/{id}` - Current user's name and branch
//! - `GET  /users/{id}/participants` - The user's participants
//! - `POST /users/{id}/participants` - Add a participant
//! - `PUT  /participants/{id}` - Rename a participant
//! - `DELETE /participants/{id}` - Remove a participant
//! - `GET  /users/{id}/charts` - Signed-in chart list
//! - `GET  /charts/summary` - Anonymous per-branch summary charts
//! - `GET  /participants/{id}/calendar` - Annotated month view
//! - `POST /participants/{id}/times` - Save a month's entered times

use std::collections::HashMap;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
};
use chrono::Datelike;
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::info;

use timecore::{DateValue, elapsed_from_string};

use crate::charts::{Chart, ChartCalc};
use crate::config::Config;
use crate::database::{Database, DatabaseError};
use crate::month_view::{MonthView, MonthViewBuilder};
use crate::session::Identity;
use crate::timestore::TimeStore;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub identity: Identity,
    pub store: TimeStore,
    pub charts: ChartCalc,
    pub months: MonthViewBuilder,
}

impl AppState {
    pub fn new(db: Database, config: &Config) -> Self {
        let store = TimeStore::new(db.clone());
        let charts = ChartCalc::new(db.clone(), store.clone(), config.national_goal);
        let months = MonthViewBuilder::new(store.clone(), config);
        let identity = Identity::new(db.clone());
        Self {
            db,
            identity,
            store,
            charts,
            months,
        }
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/branches", get(list_branches))
        .route("/users", post(signup))
        .route("/users/{id}", get(get_user))
        .route(
            "/users/{id}/participants",
            get(list_participants).post(create_participant),
        )
        .route(
            "/participants/{id}",
            put(rename_participant).delete(delete_participant),
        )
        .route("/users/{id}/charts", get(user_charts))
        .route("/charts/summary", get(summary_charts))
        .route("/participants/{id}/calendar", get(participant_calendar))
        .route("/participants/{id}/times", post(save_times))
        .layer(TraceLayer::new_for_http())
}

type ApiError = (StatusCode, String);

fn db_error(context: &str, err: DatabaseError) -> ApiError {
    let status = match &err {
        DatabaseError::NotFound(_) => StatusCode::NOT_FOUND,
        DatabaseError::InvalidData(_) => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!("{}: {}", context, err);
    }
    (status, format!("{}: {}", context, err))
}

#[derive(Debug, Serialize)]
struct BranchInfo {
    id: i64,
    name: String,
}

#[derive(Debug, Deserialize)]
struct SignupRequest {
    name: String,
    branch_id: i64,
    username: String,
    password: String,
}

#[derive(Debug, Serialize)]
struct UserInfo {
    id: i64,
    name: String,
    branch: BranchInfo,
}

#[derive(Debug, Serialize)]
struct ParticipantInfo {
    id: i64,
    name: String,
}

#[derive(Debug, Deserialize)]
struct ParticipantNameRequest {
    name: String,
}

#[derive(Debug, Deserialize)]
struct CalendarQuery {
    year: Option<i32>,
    month: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct SaveTimesRequest {
    year: i32,
    month: u32,
    /// Day of month mapped to the duration string as typed by the user,
    /// either bare minutes ("90") or hours:minutes ("1:30").
    days: HashMap<u32, String>,
}

#[derive(Debug, Serialize)]
struct SaveTimesResponse {
    saved: usize,
    skipped: usize,
}

async fn list_branches(State(state): State<AppState>) -> Result<Json<Vec<BranchInfo>>, ApiError> {
    let branches = state
        .db
        .branches()
        .await
        .map_err(|e| db_error("Failed to list branches", e))?;

    Ok(Json(
        branches
            .into_iter()
            .map(|b| BranchInfo {
                id: b.id,
                name: b.name,
            })
            .collect(),
    ))
}

async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    for (field, value) in [
        ("name", &req.name),
        ("username", &req.username),
        ("password", &req.password),
    ] {
        if value.is_empty() {
            return Err((
                StatusCode::BAD_REQUEST,
                format!("You must enter a {}", field),
            ));
        }
    }

    let user_id = state
        .db
        .create_user(&req.name, req.branch_id, &req.username, &req.password)
        .await
        .map_err(|e| db_error("Failed to sign up", e))?;

    info!(user_id, username = req.username.as_str(), "User signed up");
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "id": user_id })),
    ))
}

async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Json<UserInfo>, ApiError> {
    let user = state
        .identity
        .user(user_id)
        .await
        .map_err(|e| db_error("Failed to load user", e))?;
    let branch = state
        .identity
        .user_branch(user_id)
        .await
        .map_err(|e| db_error("Failed to load user branch", e))?;

    Ok(Json(UserInfo {
        id: user.id,
        name: user.name,
        branch: BranchInfo {
            id: branch.id,
            name: branch.name,
        },
    }))
}

async fn list_participants(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Json<Vec<ParticipantInfo>>, ApiError> {
    let participants = state
        .identity
        .user_participants(user_id)
        .await
        .map_err(|e| db_error("Failed to list participants", e))?;

    Ok(Json(
        participants
            .into_iter()
            .map(|p| ParticipantInfo {
                id: p.id,
                name: p.name,
            })
            .collect(),
    ))
}

async fn create_participant(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Json(req): Json<ParticipantNameRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    if req.name.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "You must enter a name".to_string()));
    }

    // Reject participants for users that do not exist.
    state
        .db
        .user(user_id)
        .await
        .map_err(|e| db_error("Failed to load user", e))?;

    let id = state
        .db
        .create_participant(user_id, &req.name)
        .await
        .map_err(|e| db_error("Failed to add participant", e))?;

    info!(participant_id = id, user_id, "Participant added");
    Ok((StatusCode::CREATED, Json(serde_json::json!({ "id": id }))))
}

async fn rename_participant(
    State(state): State<AppState>,
    Path(participant_id): Path<i64>,
    Json(req): Json<ParticipantNameRequest>,
) -> Result<StatusCode, ApiError> {
    if req.name.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "You must enter a name".to_string()));
    }

    state
        .db
        .rename_participant(participant_id, &req.name)
        .await
        .map_err(|e| db_error("Failed to rename participant", e))?;

    Ok(StatusCode::NO_CONTENT)
}

async fn delete_participant(
    State(state): State<AppState>,
    Path(participant_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state
        .db
        .delete_participant(participant_id)
        .await
        .map_err(|e| db_error("Failed to delete participant", e))?;

    info!(participant_id, "Participant deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn user_charts(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Json<Vec<Chart>>, ApiError> {
    state
        .charts
        .build_charts_for_user(user_id)
        .await
        .map(Json)
        .map_err(|e| db_error("Failed to build charts", e))
}

async fn summary_charts(State(state): State<AppState>) -> Result<Json<Vec<Chart>>, ApiError> {
    state
        .charts
        .build_summary_charts()
        .await
        .map(Json)
        .map_err(|e| db_error("Failed to build summary charts", e))
}

async fn participant_calendar(
    State(state): State<AppState>,
    Path(participant_id): Path<i64>,
    Query(query): Query<CalendarQuery>,
) -> Result<Json<MonthView>, ApiError> {
    state
        .db
        .participant(participant_id)
        .await
        .map_err(|e| db_error("Failed to load participant", e))?;

    let today = chrono::Local::now().date_naive();
    let year = query.year.unwrap_or_else(|| today.year());
    let month = query.month.unwrap_or_else(|| today.month());

    if !(1..=12).contains(&month) {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("Invalid month: {}", month),
        ));
    }

    state
        .months
        .build(year, month, participant_id)
        .await
        .map(Json)
        .map_err(|e| db_error("Failed to build calendar", e))
}

async fn save_times(
    State(state): State<AppState>,
    Path(participant_id): Path<i64>,
    Json(req): Json<SaveTimesRequest>,
) -> Result<Json<SaveTimesResponse>, ApiError> {
    if !(1..=12).contains(&req.month) {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("Invalid month: {}", req.month),
        ));
    }

    let mut saved = 0;
    let mut skipped = 0;

    for (day, entry) in &req.days {
        if !(1..=31).contains(day) {
            skipped += 1;
            continue;
        }

        // Unparseable entries mean "no change" for that day; the rest of
        // the request still goes through.
        let Some(num_minutes) = elapsed_from_string(entry) else {
            skipped += 1;
            continue;
        };

        let date = DateValue::new(req.year, req.month, *day).to_string();
        state
            .store
            .set(participant_id, &date, num_minutes)
            .await
            .map_err(|e| db_error("Failed to save times", e))?;
        saved += 1;
    }

    info!(participant_id, saved, skipped, "Saved time entries");
    Ok(Json(SaveTimesResponse { saved, skipped }))
}
