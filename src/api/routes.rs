use crate::alarm;
use crate::api::get_embedded_asset;
use crate::config::Config;
use crate::daemon;
use crate::db::{Database, GoalRow, RoutineRow, ToggleOutcome};
use crate::scheduler;
use crate::stats;
use crate::stats::report::{DailySummary, summary_for_date};
use anyhow::{Context, Result};
use axum::extract::{Path, State};
use axum::http::{HeaderValue, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::sync::Notify;

#[derive(Clone)]
pub struct ApiState {
    pub config: Arc<Config>,
    pub refresh: Arc<Notify>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/v1/status", get(status))
        .route("/api/v1/today", get(today))
        .route("/api/v1/report/:date", get(report_by_date))
        .route("/api/v1/routines", get(routines))
        .route("/api/v1/routines/:id/toggle", post(toggle_routine))
        .route("/api/v1/goals", get(goals))
        .route("/api/v1/goals/:id/progress", axum::routing::put(goal_progress_put))
        .route("/api/v1/finance/summary", get(finance_summary))
        .route(
            "/api/v1/settings/review-schedule",
            get(review_schedule_get).put(review_schedule_put),
        )
        .fallback(get(static_assets))
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct StatusPayload {
    daemon: String,
    daemon_loaded: bool,
    due_count: usize,
    done_count: usize,
    streak_days: u32,
    next_alarm: Option<NextAlarmView>,
    api_port: u16,
}

#[derive(Debug, Serialize)]
struct NextAlarmView {
    title: String,
    at: String,
}

#[derive(Debug, Serialize)]
struct RoutinesPayload {
    count: usize,
    routines: Vec<RoutineRow>,
}

#[derive(Debug, Serialize)]
struct GoalsPayload {
    count: usize,
    goals: Vec<GoalRow>,
}

#[derive(Debug, Deserialize)]
struct ToggleBody {
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoalProgressBody {
    current_value: f64,
}

#[derive(Debug, Serialize)]
struct ReviewSchedulePayload {
    review_time: String,
    review_enabled: bool,
    cron_expression: String,
}

#[derive(Debug, Deserialize)]
struct ReviewScheduleUpdatePayload {
    review_time: String,
}

async fn status(State(state): State<ApiState>) -> ApiResult<Json<StatusPayload>> {
    let database = Database::open(&state.config.db_path)?;
    let daemon_status = daemon::status(&state.config)?;

    let today = Local::now().date_naive();
    let items = stats::today_items(
        &database.list_routines()?,
        &database.completions_for_date(today)?,
        today,
    );
    let streak_days = stats::current_streak(&database.completion_dates()?, today);

    let next_alarm = alarm::next_planned_fire(&database.alarm_routines()?, Local::now()).map(
        |(title, at)| NextAlarmView {
            title,
            at: at.format("%Y-%m-%d %H:%M").to_string(),
        },
    );

    let payload = StatusPayload {
        daemon: daemon_status.details,
        daemon_loaded: daemon_status.loaded,
        due_count: items.len(),
        done_count: items.iter().filter(|item| item.done).count(),
        streak_days,
        next_alarm,
        api_port: state.config.api_port,
    };

    Ok(Json(payload))
}

async fn today(State(state): State<ApiState>) -> ApiResult<Json<DailySummary>> {
    let summary = summary_for_date(&state.config, Local::now().date_naive())?;
    Ok(Json(summary))
}

async fn report_by_date(
    State(state): State<ApiState>,
    Path(date): Path<String>,
) -> ApiResult<Json<DailySummary>> {
    let target_date = parse_date(&date).map_err(|error| ApiError::BadRequest(error.to_string()))?;
    let summary = summary_for_date(&state.config, target_date)?;

    Ok(Json(summary))
}

async fn routines(State(state): State<ApiState>) -> ApiResult<Json<RoutinesPayload>> {
    let database = Database::open(&state.config.db_path)?;
    let routines = database.list_routines()?;

    Ok(Json(RoutinesPayload {
        count: routines.len(),
        routines,
    }))
}

async fn toggle_routine(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    body: Option<Json<ToggleBody>>,
) -> ApiResult<Json<Value>> {
    let date = match body.and_then(|Json(body)| body.date) {
        Some(raw) => parse_date(&raw).map_err(|error| ApiError::BadRequest(error.to_string()))?,
        None => Local::now().date_naive(),
    };

    let mut database = Database::open(&state.config.db_path)?;
    let routine = database
        .routine_by_id(&id)?
        .ok_or_else(|| ApiError::NotFound(format!("No routine with id: {id}")))?;

    let outcome = database.toggle_completion(&routine.id, date)?;
    state.refresh.notify_one();

    let action = match outcome {
        ToggleOutcome::Completed => "completed",
        ToggleOutcome::Unmarked => "uncompleted",
    };

    Ok(Json(json!({
        "action": action,
        "routine_id": routine.id,
        "date": date.format("%Y-%m-%d").to_string()
    })))
}

async fn goals(State(state): State<ApiState>) -> ApiResult<Json<GoalsPayload>> {
    let database = Database::open(&state.config.db_path)?;
    let goals = database.list_goals()?;

    Ok(Json(GoalsPayload {
        count: goals.len(),
        goals,
    }))
}

async fn goal_progress_put(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Json(body): Json<GoalProgressBody>,
) -> ApiResult<Json<Value>> {
    let database = Database::open(&state.config.db_path)?;
    let mut goal = database
        .find_goal(&id)?
        .ok_or_else(|| ApiError::NotFound(format!("No goal with id: {id}")))?;

    goal.current_value = Some(body.current_value);
    database.update_goal(&goal)?;

    Ok(Json(json!({
        "saved": true,
        "goal_id": goal.id,
        "percent": stats::goal_progress(goal.current_value, goal.target_value)
    })))
}

async fn finance_summary(State(state): State<ApiState>) -> ApiResult<Json<stats::FinanceOverview>> {
    let database = Database::open(&state.config.db_path)?;
    let overview = stats::finance_overview(
        database.finance_settings()?.as_ref(),
        &database.list_expenses()?,
        &database.list_savings_goals()?,
        Local::now().date_naive(),
    );

    Ok(Json(overview))
}

async fn review_schedule_get(
    State(state): State<ApiState>,
) -> ApiResult<Json<ReviewSchedulePayload>> {
    let config = Config::load().unwrap_or_else(|_| state.config.as_ref().clone());
    let cron_expression = scheduler::cron_from_review_time(&config.review_time)?;

    Ok(Json(ReviewSchedulePayload {
        review_time: config.review_time,
        review_enabled: config.review_enabled,
        cron_expression,
    }))
}

async fn review_schedule_put(
    State(state): State<ApiState>,
    Json(payload): Json<ReviewScheduleUpdatePayload>,
) -> ApiResult<Json<Value>> {
    let mut config = Config::load().unwrap_or_else(|_| state.config.as_ref().clone());
    let normalized_time = payload.review_time.trim().to_string();

    config
        .set_value("review_time", &normalized_time)
        .map_err(|error| ApiError::BadRequest(error.to_string()))?;
    config.save()?;

    let cron_expression = scheduler::cron_from_review_time(&config.review_time)?;

    Ok(Json(json!({
        "saved": true,
        "review_time": config.review_time,
        "cron_expression": cron_expression
    })))
}

async fn static_assets(uri: Uri) -> ApiResult<Response> {
    let path = uri.path();

    match get_embedded_asset(path) {
        Some((bytes, mime)) => {
            let mut response = Response::new(bytes.into_response().into_body());
            response
                .headers_mut()
                .insert(header::CONTENT_TYPE, HeaderValue::from_str(&mime)?);
            Ok(response)
        }
        None => Err(ApiError::NotFound("Static asset not found".to_string())),
    }
}

fn parse_date(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .with_context(|| format!("Invalid date format: {input}. Example: 2026-02-18"))
}

type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug)]
enum ApiError {
    BadRequest(String),
    NotFound(String),
    Internal(anyhow::Error),
}

impl From<anyhow::Error> for ApiError {
    fn from(value: anyhow::Error) -> Self {
        Self::Internal(value)
    }
}

impl From<axum::http::header::InvalidHeaderValue> for ApiError {
    fn from(value: axum::http::header::InvalidHeaderValue) -> Self {
        Self::Internal(value.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
            }
            ApiError::NotFound(message) => {
                (StatusCode::NOT_FOUND, Json(json!({ "error": message }))).into_response()
            }
            ApiError::Internal(error) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": error.to_string() })),
            )
                .into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::NewRoutine;
    use tempfile::TempDir;

    fn test_state(dir: &TempDir) -> ApiState {
        let config = Config {
            db_path: dir.path().join("orbit.db"),
            ..Config::default()
        };

        ApiState {
            config: Arc::new(config),
            refresh: Arc::new(Notify::new()),
        }
    }

    #[tokio::test]
    async fn toggle_flips_completion_and_reports_action() {
        let dir = TempDir::new().expect("tempdir");
        let state = test_state(&dir);

        let database = Database::open(&state.config.db_path).expect("open db");
        let routine = database
            .insert_routine(&NewRoutine {
                title: "Stretch".to_string(),
                description: None,
                start_time: "07:00".to_string(),
                duration_minutes: 30,
                frequency: "daily".to_string(),
                custom_days: None,
                alarm_enabled: true,
            })
            .expect("insert");

        let body = || {
            Some(Json(ToggleBody {
                date: Some("2024-03-11".to_string()),
            }))
        };
        let Json(first) = toggle_routine(
            State(state.clone()),
            Path(routine.id.clone()),
            body(),
        )
        .await
        .expect("toggle");
        assert_eq!(first["action"], "completed");
        assert_eq!(first["date"], "2024-03-11");

        let date = NaiveDate::from_ymd_opt(2024, 3, 11).expect("date");
        assert_eq!(database.completions_for_date(date).expect("query").len(), 1);

        let Json(second) = toggle_routine(State(state.clone()), Path(routine.id.clone()), body())
            .await
            .expect("toggle");
        assert_eq!(second["action"], "uncompleted");
        assert!(database.completions_for_date(date).expect("query").is_empty());
    }

    #[tokio::test]
    async fn toggle_rejects_unknown_routine() {
        let dir = TempDir::new().expect("tempdir");
        let state = test_state(&dir);

        let result = toggle_routine(
            State(state),
            Path("no-such-routine".to_string()),
            None,
        )
        .await;

        assert!(matches!(result, Err(ApiError::NotFound(_))));
    }
}
