/// Project membership model
///
/// Links a profile to a project with a role. The pair `(project_id, user_id)`
/// is the primary key; handlers still check for an existing row first so a
/// duplicate add reports a readable error.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE project_role AS ENUM ('member', 'manager');
///
/// CREATE TABLE project_members (
///     project_id UUID NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
///     user_id UUID NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
///     role project_role NOT NULL DEFAULT 'member',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     PRIMARY KEY (project_id, user_id)
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{PgExecutor, PgPool};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Role inside a single project
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "project_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ProjectRole {
    /// Can read the project and work on tasks
    #[default]
    Member,

    /// Can update the project, manage members, tasks and invitations
    Manager,
}

impl ProjectRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectRole::Member => "member",
            ProjectRole::Manager => "manager",
        }
    }
}

impl fmt::Display for ProjectRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a role string is neither `member` nor `manager`
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Role must be either 'member' or 'manager'")]
pub struct InvalidRole;

impl FromStr for ProjectRole {
    type Err = InvalidRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "member" => Ok(ProjectRole::Member),
            "manager" => Ok(ProjectRole::Manager),
            _ => Err(InvalidRole),
        }
    }
}

/// Membership row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProjectMember {
    pub project_id: Uuid,
    pub user_id: Uuid,
    pub role: ProjectRole,
    pub created_at: DateTime<Utc>,
}

/// Profile fields embedded in member listings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberProfile {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
}

/// Membership row with the member's profile under `profiles`
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct MemberWithProfile {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub member: ProjectMember,

    pub profiles: Option<Json<MemberProfile>>,
}

const MEMBER_WITH_PROFILE: &str = r#"
    SELECT pm.project_id, pm.user_id, pm.role, pm.created_at,
           CASE WHEN pr.id IS NULL THEN NULL
                ELSE jsonb_build_object(
                    'first_name', pr.first_name,
                    'last_name', pr.last_name,
                    'email', pr.email)
           END AS profiles
    FROM project_members pm
    LEFT JOIN profiles pr ON pr.id = pm.user_id
"#;

impl ProjectMember {
    /// Inserts a membership. Accepts a pool or an open transaction.
    ///
    /// # Errors
    ///
    /// Fails with a unique violation when the membership exists, or a foreign
    /// key violation when the project or profile is missing.
    pub async fn create<'e, E>(
        executor: E,
        project_id: Uuid,
        user_id: Uuid,
        role: ProjectRole,
    ) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, ProjectMember>(
            r#"
            INSERT INTO project_members (project_id, user_id, role)
            VALUES ($1, $2, $3)
            RETURNING project_id, user_id, role, created_at
            "#,
        )
        .bind(project_id)
        .bind(user_id)
        .bind(role)
        .fetch_one(executor)
        .await
    }

    pub async fn find<'e, E>(
        executor: E,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, ProjectMember>(
            r#"
            SELECT project_id, user_id, role, created_at
            FROM project_members
            WHERE project_id = $1 AND user_id = $2
            "#,
        )
        .bind(project_id)
        .bind(user_id)
        .fetch_optional(executor)
        .await
    }

    pub async fn find_with_profile(
        pool: &PgPool,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<MemberWithProfile>, sqlx::Error> {
        let query = format!(
            "{} WHERE pm.project_id = $1 AND pm.user_id = $2",
            MEMBER_WITH_PROFILE
        );

        sqlx::query_as::<_, MemberWithProfile>(&query)
            .bind(project_id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Members of a project in join order, each with name and email.
    pub async fn list_with_profiles(
        pool: &PgPool,
        project_id: Uuid,
    ) -> Result<Vec<MemberWithProfile>, sqlx::Error> {
        let query = format!(
            "{} WHERE pm.project_id = $1 ORDER BY pm.created_at, pm.user_id",
            MEMBER_WITH_PROFILE
        );

        sqlx::query_as::<_, MemberWithProfile>(&query)
            .bind(project_id)
            .fetch_all(pool)
            .await
    }

    /// Ids of every member except `exclude`.
    pub async fn list_user_ids_except(
        pool: &PgPool,
        project_id: Uuid,
        exclude: Uuid,
    ) -> Result<Vec<Uuid>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT user_id FROM project_members WHERE project_id = $1 AND user_id <> $2",
        )
        .bind(project_id)
        .bind(exclude)
        .fetch_all(pool)
        .await
    }

    /// Returns `None` when the membership does not exist.
    pub async fn update_role(
        pool: &PgPool,
        project_id: Uuid,
        user_id: Uuid,
        role: ProjectRole,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, ProjectMember>(
            r#"
            UPDATE project_members
            SET role = $3
            WHERE project_id = $1 AND user_id = $2
            RETURNING project_id, user_id, role, created_at
            "#,
        )
        .bind(project_id)
        .bind(user_id)
        .bind(role)
        .fetch_optional(pool)
        .await
    }

    /// Returns whether a row was removed.
    pub async fn delete(pool: &PgPool, project_id: Uuid, user_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM project_members WHERE project_id = $1 AND user_id = $2")
            .bind(project_id)
            .bind(user_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Number of projects `user_id` belongs to.
    pub async fn count_by_user(pool: &PgPool, user_id: Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM project_members WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(pool)
            .await
    }

    /// Whether a profile with this email already belongs to the project.
    pub async fn exists_by_email(
        pool: &PgPool,
        project_id: Uuid,
        email: &str,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM project_members pm
                JOIN profiles pr ON pr.id = pm.user_id
                WHERE pm.project_id = $1 AND LOWER(pr.email) = LOWER($2)
            )
            "#,
        )
        .bind(project_id)
        .bind(email.trim())
        .fetch_one(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse() {
        assert_eq!("member".parse::<ProjectRole>(), Ok(ProjectRole::Member));
        assert_eq!("manager".parse::<ProjectRole>(), Ok(ProjectRole::Manager));
        assert_eq!("owner".parse::<ProjectRole>(), Err(InvalidRole));
        assert_eq!("Manager".parse::<ProjectRole>(), Err(InvalidRole));
    }

    #[test]
    fn test_role_default_is_member() {
        assert_eq!(ProjectRole::default(), ProjectRole::Member);
    }

    #[test]
    fn test_role_serde() {
        assert_eq!(serde_json::to_string(&ProjectRole::Manager).unwrap(), "\"manager\"");
        let role: ProjectRole = serde_json::from_str("\"member\"").unwrap();
        assert_eq!(role, ProjectRole::Member);
    }

    #[test]
    fn test_member_with_profile_shape() {
        let row = MemberWithProfile {
            member: ProjectMember {
                project_id: Uuid::nil(),
                user_id: Uuid::nil(),
                role: ProjectRole::Manager,
                created_at: Utc::now(),
            },
            profiles: Some(Json(MemberProfile {
                first_name: Some("Ada".to_string()),
                last_name: None,
                email: Some("ada@example.com".to_string()),
            })),
        };

        let value = serde_json::to_value(&row).unwrap();
        assert_eq!(value["role"], "manager");
        assert_eq!(value["profiles"]["first_name"], "Ada");
        assert_eq!(value["profiles"]["email"], "ada@example.com");
    }
}
