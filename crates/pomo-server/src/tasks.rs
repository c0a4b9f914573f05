use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use pomo_store::tasks::{NewTask, SessionType, TaskRow};

use crate::error::{ApiError, FieldError};
use crate::server::AppState;

/// POST/PUT /api/tasks body. All five fields are required; sessionType
/// must be one of the closed set of labels.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskBody {
    #[serde(default)]
    pub task_name: Option<String>,
    #[serde(default)]
    pub session_type: Option<String>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub duration: Option<i64>,
}

impl TaskBody {
    pub fn validate(self) -> Result<NewTask, ApiError> {
        let mut errors = Vec::new();

        let task_name = match self.task_name {
            Some(name) if !name.trim().is_empty() => name,
            _ => {
                errors.push(FieldError::new("taskName", "Task name is required"));
                String::new()
            }
        };

        // Placeholders below never escape: errors gate the return.
        let session_type = match self.session_type.as_deref() {
            None => {
                errors.push(FieldError::new("sessionType", "Session type is required"));
                SessionType::Work
            }
            Some(raw) => match raw.parse::<SessionType>() {
                Ok(session_type) => session_type,
                Err(_) => {
                    errors.push(FieldError::new(
                        "sessionType",
                        format!("Unknown session type: {raw}"),
                    ));
                    SessionType::Work
                }
            },
        };

        let start_time = require_timestamp(self.start_time, "startTime", "Start time", &mut errors);
        let end_time = require_timestamp(self.end_time, "endTime", "End time", &mut errors);

        let duration = match self.duration {
            None => {
                errors.push(FieldError::new("duration", "Duration is required"));
                0
            }
            Some(v) => v,
        };

        if !errors.is_empty() {
            return Err(ApiError::Validation(errors));
        }

        Ok(NewTask {
            task_name,
            session_type,
            start_time,
            end_time,
            duration,
        })
    }
}

fn require_timestamp(
    value: Option<String>,
    field: &'static str,
    label: &str,
    errors: &mut Vec<FieldError>,
) -> DateTime<Utc> {
    let Some(raw) = value else {
        errors.push(FieldError::new(field, format!("{label} is required")));
        return Utc::now();
    };
    match DateTime::parse_from_rfc3339(&raw) {
        Ok(dt) => dt.with_timezone(&Utc),
        Err(_) => {
            errors.push(FieldError::new(
                field,
                format!("{label} must be an RFC 3339 timestamp"),
            ));
            Utc::now()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub query: Option<String>,
}

/// GET /api/tasks, newest first.
pub async fn list_tasks(State(state): State<AppState>) -> Result<Json<Vec<TaskRow>>, ApiError> {
    Ok(Json(state.tasks.list_all()?))
}

/// GET /api/tasks/{id}
pub async fn get_task(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<TaskRow>, ApiError> {
    Ok(Json(state.tasks.get(id)?))
}

/// POST /api/tasks
pub async fn create_task(
    State(state): State<AppState>,
    Json(body): Json<TaskBody>,
) -> Result<Json<TaskRow>, ApiError> {
    let task = body.validate()?;
    Ok(Json(state.tasks.create(&task)?))
}

/// PUT /api/tasks/{id}: full-field replace; 404 for an unknown id.
pub async fn update_task(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<TaskBody>,
) -> Result<Json<TaskRow>, ApiError> {
    let task = body.validate()?;
    Ok(Json(state.tasks.update(id, &task)?))
}

/// DELETE /api/tasks/{id}: 200 with an empty body, or 404.
pub async fn delete_task(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.tasks.delete(id)?;
    Ok(StatusCode::OK)
}

/// GET /api/tasks/today
pub async fn today_tasks(State(state): State<AppState>) -> Result<Json<Vec<TaskRow>>, ApiError> {
    Ok(Json(state.tasks.list_for_today()?))
}

/// GET /api/tasks/today/duration: bare integer, 0 when no tasks.
pub async fn today_duration(State(state): State<AppState>) -> Result<Json<i64>, ApiError> {
    Ok(Json(state.tasks.total_duration_for_today()?))
}

/// GET /api/tasks/search?query=
pub async fn search_tasks(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<TaskRow>>, ApiError> {
    let Some(query) = params.query else {
        return Err(ApiError::Validation(vec![FieldError::new(
            "query",
            "Query parameter is required",
        )]));
    };
    Ok(Json(state.tasks.search_by_name(&query)?))
}
