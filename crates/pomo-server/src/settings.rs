use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use pomo_store::settings::SettingsRow;

use crate::error::{ApiError, FieldError};
use crate::server::AppState;

/// PUT /api/settings body. Every field is required; the three interval
/// fields must be at least one minute. Fields deserialize as Option so a
/// missing one is reported by name instead of failing the whole body parse.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsBody {
    #[serde(default)]
    pub work_time: Option<i64>,
    #[serde(default)]
    pub break_time: Option<i64>,
    #[serde(default)]
    pub long_break_time: Option<i64>,
    #[serde(default)]
    pub sessions_completed: Option<i64>,
}

pub struct ValidSettings {
    pub work_time: i64,
    pub break_time: i64,
    pub long_break_time: i64,
    pub sessions_completed: i64,
}

impl SettingsBody {
    pub fn validate(self) -> Result<ValidSettings, ApiError> {
        let mut errors = Vec::new();

        let work_time = require_minutes(self.work_time, "workTime", "Work time", &mut errors);
        let break_time = require_minutes(self.break_time, "breakTime", "Break time", &mut errors);
        let long_break_time = require_minutes(
            self.long_break_time,
            "longBreakTime",
            "Long break time",
            &mut errors,
        );

        let sessions_completed = match self.sessions_completed {
            None => {
                errors.push(FieldError::new(
                    "sessionsCompleted",
                    "Sessions completed is required",
                ));
                0
            }
            Some(v) if v < 0 => {
                errors.push(FieldError::new(
                    "sessionsCompleted",
                    "Sessions completed cannot be negative",
                ));
                0
            }
            Some(v) => v,
        };

        if !errors.is_empty() {
            return Err(ApiError::Validation(errors));
        }

        Ok(ValidSettings {
            work_time,
            break_time,
            long_break_time,
            sessions_completed,
        })
    }
}

fn require_minutes(
    value: Option<i64>,
    field: &'static str,
    label: &str,
    errors: &mut Vec<FieldError>,
) -> i64 {
    match value {
        None => {
            errors.push(FieldError::new(field, format!("{label} is required")));
            0
        }
        Some(v) if v < 1 => {
            errors.push(FieldError::new(
                field,
                format!("{label} must be at least 1 minute"),
            ));
            0
        }
        Some(v) => v,
    }
}

/// GET /api/settings: creates the default row on first read.
pub async fn get_settings(State(state): State<AppState>) -> Result<Json<SettingsRow>, ApiError> {
    Ok(Json(state.settings.get_or_create()?))
}

/// PUT /api/settings: full-field replace, never a partial merge.
pub async fn update_settings(
    State(state): State<AppState>,
    Json(body): Json<SettingsBody>,
) -> Result<Json<SettingsRow>, ApiError> {
    let valid = body.validate()?;
    Ok(Json(state.settings.update(
        valid.work_time,
        valid.break_time,
        valid.long_break_time,
        valid.sessions_completed,
    )?))
}

/// POST /api/settings/reset
pub async fn reset_settings(State(state): State<AppState>) -> Result<Json<SettingsRow>, ApiError> {
    Ok(Json(state.settings.reset()?))
}

/// POST /api/settings/increment-session
pub async fn increment_session(
    State(state): State<AppState>,
) -> Result<Json<SettingsRow>, ApiError> {
    Ok(Json(state.settings.increment_sessions()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_body() -> SettingsBody {
        SettingsBody {
            work_time: Some(25),
            break_time: Some(5),
            long_break_time: Some(15),
            sessions_completed: Some(0),
        }
    }

    #[test]
    fn valid_body_passes() {
        let valid = full_body().validate().unwrap();
        assert_eq!(valid.work_time, 25);
        assert_eq!(valid.sessions_completed, 0);
    }

    #[test]
    fn missing_field_is_reported_by_name() {
        let body = SettingsBody {
            work_time: None,
            ..full_body()
        };
        let Err(ApiError::Validation(errors)) = body.validate() else {
            panic!("expected validation error");
        };
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "workTime");
        assert_eq!(errors[0].message, "Work time is required");
    }

    #[test]
    fn sub_minute_interval_is_rejected() {
        let body = SettingsBody {
            break_time: Some(0),
            ..full_body()
        };
        let Err(ApiError::Validation(errors)) = body.validate() else {
            panic!("expected validation error");
        };
        assert_eq!(errors[0].field, "breakTime");
        assert!(errors[0].message.contains("at least 1 minute"));
    }

    #[test]
    fn negative_sessions_completed_is_rejected() {
        let body = SettingsBody {
            sessions_completed: Some(-1),
            ..full_body()
        };
        assert!(matches!(body.validate(), Err(ApiError::Validation(_))));
    }

    #[test]
    fn all_problems_are_collected() {
        let body = SettingsBody {
            work_time: None,
            break_time: Some(0),
            long_break_time: None,
            sessions_completed: None,
        };
        let Err(ApiError::Validation(errors)) = body.validate() else {
            panic!("expected validation error");
        };
        assert_eq!(errors.len(), 4);
    }
}
