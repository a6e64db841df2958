/// Project model and database operations
///
/// A project is owned by the profile in `project_manager`. Creating a project
/// also inserts the owner's `manager` membership in the same transaction, so
/// every project is visible to its owner through the membership join.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE project_priority AS ENUM ('Low', 'Medium', 'High');
///
/// CREATE TABLE projects (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name TEXT NOT NULL,
///     description TEXT,
///     deadline DATE,
///     priority project_priority NOT NULL DEFAULT 'Medium',
///     tags TEXT[] NOT NULL DEFAULT '{}',
///     image TEXT,
///     project_manager UUID NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use synergy_shared::models::project::{CreateProject, Project, ProjectPriority};
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, owner: Uuid) -> Result<(), sqlx::Error> {
/// let project = Project::create_with_manager(&pool, owner, CreateProject {
///     name: "Website relaunch".to_string(),
///     priority: Some(ProjectPriority::High),
///     tags: Some(vec!["web".to_string()]),
///     ..Default::default()
/// }).await?;
///
/// let mine = Project::list_for_member(&pool, owner).await?;
/// assert!(mine.iter().any(|p| p.project.id == project.id));
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::project_member::{ProjectMember, ProjectRole};

/// Project priority. Stored and serialized with its capitalized name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "project_priority")]
pub enum ProjectPriority {
    Low,
    #[default]
    Medium,
    High,
}

/// Project row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub deadline: Option<NaiveDate>,
    pub priority: ProjectPriority,
    pub tags: Vec<String>,
    pub image: Option<String>,

    /// Owning profile. Only the owner may delete the project.
    pub project_manager: Uuid,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Task counts per status for one project or one assignee
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TaskStats {
    pub total_tasks: i64,
    pub todo_tasks: i64,
    pub in_progress_tasks: i64,
    pub done_tasks: i64,
}

/// Project as listed for a member: the row, the member's role and task counts
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ProjectSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub project: Project,

    pub user_role: ProjectRole,

    #[sqlx(flatten)]
    pub stats: TaskStats,
}

/// Input for creating a project. Unset priority and tags take the column defaults.
#[derive(Debug, Clone, Default)]
pub struct CreateProject {
    pub name: String,
    pub description: Option<String>,
    pub deadline: Option<NaiveDate>,
    pub priority: Option<ProjectPriority>,
    pub tags: Option<Vec<String>>,
    pub image: Option<String>,
}

/// Partial project update. `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct UpdateProject {
    pub name: Option<String>,
    pub description: Option<String>,
    pub deadline: Option<NaiveDate>,
    pub priority: Option<ProjectPriority>,
    pub tags: Option<Vec<String>>,
    pub image: Option<String>,
}

impl UpdateProject {
    /// Names of the fields this update touches, recorded in notifications.
    pub fn changed_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.name.is_some() {
            fields.push("name");
        }
        if self.description.is_some() {
            fields.push("description");
        }
        if self.deadline.is_some() {
            fields.push("deadline");
        }
        if self.priority.is_some() {
            fields.push("priority");
        }
        if self.tags.is_some() {
            fields.push("tags");
        }
        if self.image.is_some() {
            fields.push("image");
        }
        fields
    }
}

const PROJECT_COLUMNS: &str =
    "id, name, description, deadline, priority, tags, image, project_manager, created_at, updated_at";

impl Project {
    /// Creates a project owned by `owner` and adds the owner as `manager`.
    ///
    /// Both inserts run in one transaction.
    pub async fn create_with_manager(
        pool: &PgPool,
        owner: Uuid,
        data: CreateProject,
    ) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let project = sqlx::query_as::<_, Project>(
            r#"
            INSERT INTO projects (name, description, deadline, priority, tags, image, project_manager)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, name, description, deadline, priority, tags, image,
                      project_manager, created_at, updated_at
            "#,
        )
        .bind(data.name.trim())
        .bind(data.description)
        .bind(data.deadline)
        .bind(data.priority.unwrap_or_default())
        .bind(data.tags.unwrap_or_default())
        .bind(data.image)
        .bind(owner)
        .fetch_one(&mut *tx)
        .await?;

        ProjectMember::create(&mut *tx, project.id, owner, ProjectRole::Manager).await?;

        tx.commit().await?;
        Ok(project)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {} FROM projects WHERE id = $1", PROJECT_COLUMNS);

        sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Applies a partial update and bumps `updated_at`.
    ///
    /// Returns `None` when the project does not exist.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateProject,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE projects SET updated_at = NOW()");
        let mut bind_count = 1;

        for (field, present) in [
            ("name", data.name.is_some()),
            ("description", data.description.is_some()),
            ("deadline", data.deadline.is_some()),
            ("priority", data.priority.is_some()),
            ("tags", data.tags.is_some()),
            ("image", data.image.is_some()),
        ] {
            if present {
                bind_count += 1;
                query.push_str(&format!(", {} = ${}", field, bind_count));
            }
        }

        query.push_str(" WHERE id = $1 RETURNING ");
        query.push_str(PROJECT_COLUMNS);

        let mut q = sqlx::query_as::<_, Project>(&query).bind(id);

        if let Some(name) = data.name {
            q = q.bind(name.trim().to_string());
        }
        if let Some(description) = data.description {
            q = q.bind(description);
        }
        if let Some(deadline) = data.deadline {
            q = q.bind(deadline);
        }
        if let Some(priority) = data.priority {
            q = q.bind(priority);
        }
        if let Some(tags) = data.tags {
            q = q.bind(tags);
        }
        if let Some(image) = data.image {
            q = q.bind(image);
        }

        q.fetch_optional(pool).await
    }

    /// Deletes the project. Members, tasks, invitations and notifications
    /// referencing it cascade.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Projects `user_id` is a member of, newest first, with the member's
    /// role and per-status task counts.
    pub async fn list_for_member(
        pool: &PgPool,
        user_id: Uuid,
    ) -> Result<Vec<ProjectSummary>, sqlx::Error> {
        sqlx::query_as::<_, ProjectSummary>(
            r#"
            SELECT p.id, p.name, p.description, p.deadline, p.priority, p.tags, p.image,
                   p.project_manager, p.created_at, p.updated_at,
                   pm.role AS user_role,
                   COUNT(t.id) AS total_tasks,
                   COUNT(t.id) FILTER (WHERE t.status = 'To-Do') AS todo_tasks,
                   COUNT(t.id) FILTER (WHERE t.status = 'In Progress') AS in_progress_tasks,
                   COUNT(t.id) FILTER (WHERE t.status = 'Done') AS done_tasks
            FROM projects p
            JOIN project_members pm ON pm.project_id = p.id AND pm.user_id = $1
            LEFT JOIN tasks t ON t.project_id = p.id
            GROUP BY p.id, pm.role
            ORDER BY p.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_serde_keeps_capitalization() {
        assert_eq!(serde_json::to_string(&ProjectPriority::High).unwrap(), "\"High\"");
        let p: ProjectPriority = serde_json::from_str("\"Low\"").unwrap();
        assert_eq!(p, ProjectPriority::Low);
        assert!(serde_json::from_str::<ProjectPriority>("\"urgent\"").is_err());
    }

    #[test]
    fn test_priority_default() {
        assert_eq!(ProjectPriority::default(), ProjectPriority::Medium);
    }

    #[test]
    fn test_task_stats_camel_case() {
        let stats = TaskStats {
            total_tasks: 3,
            todo_tasks: 1,
            in_progress_tasks: 1,
            done_tasks: 1,
        };
        let value = serde_json::to_value(stats).unwrap();
        assert_eq!(value["totalTasks"], 3);
        assert_eq!(value["inProgressTasks"], 1);
    }

    #[test]
    fn test_changed_fields() {
        let update = UpdateProject {
            name: Some("Renamed".to_string()),
            tags: Some(vec![]),
            ..Default::default()
        };
        assert_eq!(update.changed_fields(), vec!["name", "tags"]);
        assert!(UpdateProject::default().changed_fields().is_empty());
    }
}
