/// Per-user dashboard
///
/// - `GET /api/v1/dashboard` - Projects, recent tasks and counters
/// - `GET /api/v1/dashboard/stats` - Project count, task breakdown, completion rate

use crate::{app::AppState, error::ApiResult, response::ApiResponse};
use axum::{extract::State, Extension};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use synergy_shared::{
    auth::middleware::AuthUser,
    models::{
        project::{Project, ProjectPriority, ProjectSummary, TaskStats},
        project_member::{ProjectMember, ProjectRole},
        task::{Task, TaskView},
    },
};
use uuid::Uuid;

/// Entries shown in each "recent" list
const RECENT_LIMIT: usize = 5;

#[derive(Debug, Clone, Serialize)]
pub struct DashboardProject {
    pub id: Uuid,
    pub name: String,
    pub priority: ProjectPriority,
    pub deadline: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub role: ProjectRole,
    pub stats: TaskStats,
}

impl From<ProjectSummary> for DashboardProject {
    fn from(summary: ProjectSummary) -> Self {
        Self {
            id: summary.project.id,
            name: summary.project.name,
            priority: summary.project.priority,
            deadline: summary.project.deadline,
            created_at: summary.project.created_at,
            role: summary.user_role,
            stats: summary.stats,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_projects: i64,
    pub total_tasks: i64,
    pub todo_tasks: i64,
    pub in_progress_tasks: i64,
    pub done_tasks: i64,
    pub overdue_tasks: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub stats: DashboardStats,
    pub recent_projects: Vec<DashboardProject>,
    pub recent_tasks: Vec<TaskView>,
    pub projects: Vec<DashboardProject>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskBreakdown {
    pub total: i64,
    pub todo: i64,
    pub in_progress: i64,
    pub done: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub project_count: i64,
    pub task_breakdown: TaskBreakdown,
    pub completion_rate: i64,
}

impl From<TaskStats> for TaskBreakdown {
    fn from(stats: TaskStats) -> Self {
        Self {
            total: stats.total_tasks,
            todo: stats.todo_tasks,
            in_progress: stats.in_progress_tasks,
            done: stats.done_tasks,
        }
    }
}

/// Percentage of done tasks, rounded half away from zero. 0 without tasks.
pub fn completion_rate(done: i64, total: i64) -> i64 {
    if total <= 0 {
        return 0;
    }
    ((done as f64 / total as f64) * 100.0).round() as i64
}

pub async fn overview(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<ApiResponse<Overview>> {
    let today = Utc::now().date_naive();

    let projects: Vec<DashboardProject> = Project::list_for_member(&state.db, user.id)
        .await?
        .into_iter()
        .map(DashboardProject::from)
        .collect();

    let recent_tasks = Task::list_by_assignee(&state.db, user.id, Some(RECENT_LIMIT as i64)).await?;

    let task_stats = Task::stats_for_assignee(&state.db, user.id).await?;
    let overdue_tasks = Task::count_overdue_for_assignee(&state.db, user.id, today).await?;

    let stats = DashboardStats {
        total_projects: projects.len() as i64,
        total_tasks: task_stats.total_tasks,
        todo_tasks: task_stats.todo_tasks,
        in_progress_tasks: task_stats.in_progress_tasks,
        done_tasks: task_stats.done_tasks,
        overdue_tasks,
    };

    let recent_projects = projects.iter().take(RECENT_LIMIT).cloned().collect();

    Ok(ApiResponse::data(Overview {
        stats,
        recent_projects,
        recent_tasks,
        projects,
    }))
}

pub async fn stats(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<ApiResponse<UserStats>> {
    let project_count = ProjectMember::count_by_user(&state.db, user.id).await?;
    let task_stats = Task::stats_for_assignee(&state.db, user.id).await?;

    Ok(ApiResponse::data(UserStats {
        project_count,
        completion_rate: completion_rate(task_stats.done_tasks, task_stats.total_tasks),
        task_breakdown: task_stats.into(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_rate() {
        assert_eq!(completion_rate(0, 0), 0);
        assert_eq!(completion_rate(1, 3), 33);
        assert_eq!(completion_rate(2, 3), 67);
        assert_eq!(completion_rate(1, 2), 50);
        assert_eq!(completion_rate(4, 4), 100);
    }

    #[test]
    fn test_stats_shape() {
        let stats = UserStats {
            project_count: 2,
            task_breakdown: TaskStats {
                total_tasks: 4,
                todo_tasks: 1,
                in_progress_tasks: 1,
                done_tasks: 2,
            }
            .into(),
            completion_rate: 50,
        };

        let value = serde_json::to_value(stats).unwrap();
        assert_eq!(value["projectCount"], 2);
        assert_eq!(value["taskBreakdown"]["inProgress"], 1);
        assert_eq!(value["completionRate"], 50);
    }
}
