use crate::{
    api::empty_as_none,
    auth::auth::AuthUser,
    error::AppError,
    model::task::{TaskStatus, TaskView},
    utils::db_utils::{SqlValue, build_update_sql, execute_update, reject_missing_reference},
};
use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{debug, info};
use utoipa::{IntoParams, ToSchema};

const UNKNOWN_ASSIGNEE: &str = "Assigned employee does not exist";

#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct TaskFilter {
    /// Employee the task is assigned to
    #[serde(default, deserialize_with = "empty_as_none")]
    pub assigned_to: Option<u64>,
    /// User who created the task
    #[serde(default, deserialize_with = "empty_as_none")]
    pub created_by: Option<u64>,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct TaskForm {
    #[serde(default)]
    #[schema(example = "Prepare the monthly timesheet")]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    #[schema(value_type = Option<u64>)]
    pub assigned_to: Option<u64>,
    #[serde(default, deserialize_with = "empty_as_none")]
    #[schema(value_type = Option<String>, format = "date", example = "2025-03-31")]
    pub deadline: Option<NaiveDate>,
}

impl TaskForm {
    fn title(&self) -> Result<&str, AppError> {
        let title = self.title.trim();
        if title.is_empty() {
            Err(AppError::required_fields(self))
        } else {
            Ok(title)
        }
    }

    fn description(&self) -> Option<String> {
        self.description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string)
    }
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct StatusForm {
    #[serde(default)]
    #[schema(example = "in_progress")]
    pub status: String,
}

impl StatusForm {
    fn parsed(&self) -> Result<TaskStatus, AppError> {
        self.status
            .trim()
            .parse()
            .map_err(|_| AppError::validation("Unknown task status", self))
    }
}

/// Tasks split into one lane per status.
#[derive(Debug, Default, Serialize, ToSchema)]
pub struct TaskBoard {
    pub todo: Vec<TaskView>,
    pub in_progress: Vec<TaskView>,
    pub done: Vec<TaskView>,
}

impl TaskBoard {
    fn lane_mut(&mut self, status: TaskStatus) -> &mut Vec<TaskView> {
        match status {
            TaskStatus::Todo => &mut self.todo,
            TaskStatus::InProgress => &mut self.in_progress,
            TaskStatus::Done => &mut self.done,
        }
    }

    /// Keeps the incoming order within each lane.
    pub fn from_tasks(tasks: impl IntoIterator<Item = TaskView>) -> Self {
        let mut board = Self::default();
        for task in tasks {
            board.lane_mut(task.status).push(task);
        }
        board
    }
}

const TASK_VIEW_SQL: &str = r#"
    SELECT t.id, t.title, t.description, t.status, t.assigned_to, t.created_by,
           t.deadline, t.created_at,
           e1.name AS assigned_to_name, e2.name AS created_by_name
    FROM tasks t
    LEFT JOIN employees e1 ON t.assigned_to = e1.id
    LEFT JOIN users u ON t.created_by = u.id
    LEFT JOIN employees e2 ON u.employee_id = e2.id
"#;

async fn fetch_tasks(pool: &MySqlPool, filter: &TaskFilter) -> Result<Vec<TaskView>, sqlx::Error> {
    let mut sql = format!("{TASK_VIEW_SQL} WHERE 1=1");
    let mut args: Vec<u64> = Vec::new();

    if let Some(assigned_to) = filter.assigned_to {
        sql.push_str(" AND t.assigned_to = ?");
        args.push(assigned_to);
    }
    if let Some(created_by) = filter.created_by {
        sql.push_str(" AND t.created_by = ?");
        args.push(created_by);
    }
    sql.push_str(" ORDER BY t.deadline ASC, t.id ASC");

    let mut query = sqlx::query_as::<_, TaskView>(&sql);
    for arg in args {
        query = query.bind(arg);
    }
    query.fetch_all(pool).await
}

async fn require_task(pool: &MySqlPool, id: u64) -> Result<TaskView, AppError> {
    sqlx::query_as::<_, TaskView>(&format!("{TASK_VIEW_SQL} WHERE t.id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("Task"))
}

/// Task board
#[utoipa::path(
    get,
    path = "/api/tasks",
    params(TaskFilter),
    responses((status = 200, description = "Tasks grouped by status, ordered by deadline", body = TaskBoard)),
    tag = "Task",
    security(("bearer_auth" = []))
)]
pub async fn list_tasks(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<TaskFilter>,
) -> Result<impl Responder, AppError> {
    let tasks = fetch_tasks(pool.get_ref(), &query).await?;
    debug!(count = tasks.len(), "Loaded tasks for board");
    Ok(HttpResponse::Ok().json(TaskBoard::from_tasks(tasks)))
}

/// Create Task. New tasks always start as `todo`.
#[utoipa::path(
    post,
    path = "/api/tasks",
    request_body = TaskForm,
    responses(
        (status = 201, description = "Task created", body = TaskView),
        (status = 403, description = "Manager/Admin only"),
        (status = 422, description = "Title missing or unknown assignee")
    ),
    tag = "Task",
    security(("bearer_auth" = []))
)]
pub async fn create_task(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<TaskForm>,
) -> Result<impl Responder, AppError> {
    auth.require_manager_or_admin()?;
    let title = payload.title()?;

    let id = sqlx::query(
        r#"
        INSERT INTO tasks (title, description, status, assigned_to, created_by, deadline, created_at)
        VALUES (?, ?, ?, ?, ?, ?, NOW())
        "#,
    )
    .bind(title)
    .bind(payload.description())
    .bind(TaskStatus::Todo.as_ref())
    .bind(payload.assigned_to)
    .bind(auth.user_id)
    .bind(payload.deadline)
    .execute(pool.get_ref())
    .await
    .map_err(|e| reject_missing_reference(e, UNKNOWN_ASSIGNEE, &*payload))?
    .last_insert_id();

    info!(task_id = id, created_by = auth.user_id, "Task created");

    let task = require_task(pool.get_ref(), id).await?;
    Ok(HttpResponse::Created().json(task))
}

#[utoipa::path(
    get,
    path = "/api/tasks/{task_id}",
    params(("task_id", Path, description = "Task ID")),
    responses(
        (status = 200, description = "Task found", body = TaskView),
        (status = 404, description = "Task not found")
    ),
    tag = "Task",
    security(("bearer_auth" = []))
)]
pub async fn get_task(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<impl Responder, AppError> {
    let task = require_task(pool.get_ref(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(task))
}

/// Edit Task. Status is changed through its own endpoint.
#[utoipa::path(
    put,
    path = "/api/tasks/{task_id}",
    params(("task_id", Path, description = "Task ID")),
    request_body = TaskForm,
    responses(
        (status = 200, description = "Task updated", body = TaskView),
        (status = 404, description = "Task not found"),
        (status = 422, description = "Title missing or unknown assignee")
    ),
    tag = "Task",
    security(("bearer_auth" = []))
)]
pub async fn update_task(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<TaskForm>,
) -> Result<impl Responder, AppError> {
    auth.require_manager_or_admin()?;
    let task_id = path.into_inner();
    require_task(pool.get_ref(), task_id).await?;

    let title = payload.title()?;
    let update = build_update_sql(
        "tasks",
        vec![
            ("title", SqlValue::String(title.to_string())),
            ("description", SqlValue::OptString(payload.description())),
            ("assigned_to", SqlValue::OptU64(payload.assigned_to)),
            ("deadline", SqlValue::OptDate(payload.deadline)),
        ],
        "id",
        task_id,
    )?;
    execute_update(pool.get_ref(), update)
        .await
        .map_err(|e| reject_missing_reference(e, UNKNOWN_ASSIGNEE, &*payload))?;

    let task = require_task(pool.get_ref(), task_id).await?;
    Ok(HttpResponse::Ok().json(task))
}

/// Move a task to another lane
#[utoipa::path(
    put,
    path = "/api/tasks/{task_id}/status",
    params(("task_id", Path, description = "Task ID")),
    request_body = StatusForm,
    responses(
        (status = 200, description = "Status changed", body = TaskView),
        (status = 404, description = "Task not found"),
        (status = 422, description = "Status is not todo, in_progress or done")
    ),
    tag = "Task",
    security(("bearer_auth" = []))
)]
pub async fn update_task_status(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<StatusForm>,
) -> Result<impl Responder, AppError> {
    let status = payload.parsed()?;
    let task_id = path.into_inner();
    require_task(pool.get_ref(), task_id).await?;

    sqlx::query("UPDATE tasks SET status = ? WHERE id = ?")
        .bind(status.as_ref())
        .bind(task_id)
        .execute(pool.get_ref())
        .await?;

    info!(task_id, %status, "Task status changed");

    let task = require_task(pool.get_ref(), task_id).await?;
    Ok(HttpResponse::Ok().json(task))
}

#[utoipa::path(
    delete,
    path = "/api/tasks/{task_id}",
    params(("task_id", Path, description = "Task ID")),
    responses(
        (status = 200, description = "Successfully deleted"),
        (status = 404, description = "Task not found")
    ),
    tag = "Task",
    security(("bearer_auth" = []))
)]
pub async fn delete_task(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<impl Responder, AppError> {
    auth.require_manager_or_admin()?;
    let task = require_task(pool.get_ref(), path.into_inner()).await?;

    sqlx::query("DELETE FROM tasks WHERE id = ?")
        .bind(task.id)
        .execute(pool.get_ref())
        .await?;

    info!(task_id = task.id, "Task deleted");

    Ok(HttpResponse::Ok().json(json!({
        "message": "Successfully deleted"
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;
    use strum::IntoEnumIterator;

    fn task(id: u64, status: TaskStatus) -> TaskView {
        TaskView {
            id,
            title: format!("task {id}"),
            description: None,
            status,
            assigned_to: None,
            created_by: Some(1),
            deadline: None,
            created_at: NaiveDateTime::parse_from_str("2025-03-01 10:00", "%Y-%m-%d %H:%M")
                .unwrap(),
            assigned_to_name: None,
            created_by_name: None,
        }
    }

    #[test]
    fn board_has_a_lane_for_every_status() {
        let tasks: Vec<TaskView> = TaskStatus::iter()
            .enumerate()
            .map(|(i, s)| task(i as u64, s))
            .collect();
        let board = TaskBoard::from_tasks(tasks);

        assert_eq!(board.todo.len(), 1);
        assert_eq!(board.in_progress.len(), 1);
        assert_eq!(board.done.len(), 1);
    }

    #[test]
    fn board_keeps_deadline_order_within_a_lane() {
        let board = TaskBoard::from_tasks(vec![
            task(3, TaskStatus::Todo),
            task(1, TaskStatus::Done),
            task(2, TaskStatus::Todo),
        ]);
        let ids: Vec<u64> = board.todo.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![3, 2]);
    }

    #[test]
    fn status_outside_the_board_is_rejected() {
        let ok = StatusForm {
            status: "in_progress".into(),
        };
        assert_eq!(ok.parsed().unwrap(), TaskStatus::InProgress);

        for bad in ["", "archived", "IN PROGRESS"] {
            let form = StatusForm { status: bad.into() };
            assert!(matches!(form.parsed(), Err(AppError::Validation { .. })));
        }
    }

    #[test]
    fn title_is_required() {
        let form = TaskForm {
            title: "  ".into(),
            description: Some("details".into()),
            assigned_to: Some(2),
            deadline: None,
        };
        assert!(form.title().is_err());
    }

    #[test]
    fn board_serializes_with_lane_names() {
        let board = TaskBoard::from_tasks(vec![task(1, TaskStatus::InProgress)]);
        let value = serde_json::to_value(&board).unwrap();
        assert_eq!(value["in_progress"][0]["status"], "in_progress");
        assert!(value["todo"].as_array().unwrap().is_empty());
    }
}
