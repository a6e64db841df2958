/// Project invitation model
///
/// Managers invite an email address into a project with a role. The invitee
/// receives a random token by email; only its SHA-256 hash is stored.
///
/// # Status
///
/// ```text
/// pending → accepted
///         → declined
///         → expired   (set when an accept arrives after expires_at)
/// ```
///
/// Only pending invitations transition. Every other status is terminal.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE invitation_status AS ENUM ('pending', 'accepted', 'declined', 'expired');
///
/// CREATE TABLE project_invitations (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     project_id UUID NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
///     inviter_id UUID NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
///     invitee_email TEXT NOT NULL,
///     invitee_id UUID REFERENCES profiles(id) ON DELETE SET NULL,
///     role project_role NOT NULL DEFAULT 'member',
///     status invitation_status NOT NULL DEFAULT 'pending',
///     token_hash TEXT NOT NULL UNIQUE,
///     expires_at TIMESTAMPTZ NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use synergy_shared::auth::invitation_token;
/// use synergy_shared::models::invitation::Invitation;
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool, token: &str, email: &str) -> Result<(), sqlx::Error> {
/// let hash = invitation_token::hash_token(token);
/// if let Some(pending) = Invitation::find_pending(&pool, &hash, email).await? {
///     println!("invited to {}", pending.project_name);
/// }
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use super::profile::PersonName;
use super::project_member::{ProjectMember, ProjectRole};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "invitation_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Declined,
    Expired,
}

/// Invitation row
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Invitation {
    pub id: Uuid,
    pub project_id: Uuid,
    pub inviter_id: Uuid,
    pub invitee_email: String,
    pub invitee_id: Option<Uuid>,
    pub role: ProjectRole,
    pub status: InvitationStatus,

    /// SHA-256 of the emailed token. Never serialized.
    #[serde(skip_serializing)]
    pub token_hash: String,

    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Invitation {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Pending invitation resolved from a token, with the project's name
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PendingInvitation {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub invitation: Invitation,

    pub project_name: String,
}

/// Invitation as listed for project managers
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct InvitationListing {
    pub id: Uuid,
    pub invitee_email: String,
    pub role: ProjectRole,
    pub status: InvitationStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub inviter: Option<Json<PersonName>>,
    pub invitee: Option<Json<PersonName>>,
}

/// Input for creating an invitation
#[derive(Debug, Clone)]
pub struct CreateInvitation {
    pub project_id: Uuid,
    pub inviter_id: Uuid,
    pub invitee_email: String,
    pub invitee_id: Option<Uuid>,
    pub role: ProjectRole,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
}

const INVITATION_COLUMNS: &str = "id, project_id, inviter_id, invitee_email, invitee_id, role, status, \
     token_hash, expires_at, created_at, updated_at";

impl Invitation {
    pub async fn create(pool: &PgPool, data: CreateInvitation) -> Result<Self, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO project_invitations
                (project_id, inviter_id, invitee_email, invitee_id, role, token_hash, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            INVITATION_COLUMNS
        );

        sqlx::query_as::<_, Invitation>(&query)
            .bind(data.project_id)
            .bind(data.inviter_id)
            .bind(data.invitee_email.trim().to_lowercase())
            .bind(data.invitee_id)
            .bind(data.role)
            .bind(data.token_hash)
            .bind(data.expires_at)
            .fetch_one(pool)
            .await
    }

    /// Whether the project already has a pending invitation for `email`.
    pub async fn has_pending(pool: &PgPool, project_id: Uuid, email: &str) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM project_invitations
                WHERE project_id = $1
                  AND LOWER(invitee_email) = LOWER($2)
                  AND status = 'pending'
            )
            "#,
        )
        .bind(project_id)
        .bind(email.trim())
        .fetch_one(pool)
        .await
    }

    /// Pending invitation whose token hash and invitee email both match.
    pub async fn find_pending(
        pool: &PgPool,
        token_hash: &str,
        email: &str,
    ) -> Result<Option<PendingInvitation>, sqlx::Error> {
        sqlx::query_as::<_, PendingInvitation>(
            r#"
            SELECT i.id, i.project_id, i.inviter_id, i.invitee_email, i.invitee_id, i.role,
                   i.status, i.token_hash, i.expires_at, i.created_at, i.updated_at,
                   p.name AS project_name
            FROM project_invitations i
            JOIN projects p ON p.id = i.project_id
            WHERE i.token_hash = $1
              AND LOWER(i.invitee_email) = LOWER($2)
              AND i.status = 'pending'
            "#,
        )
        .bind(token_hash)
        .bind(email.trim())
        .fetch_optional(pool)
        .await
    }

    /// Moves a pending invitation to `status`. Returns whether a row changed.
    pub async fn set_status<'e, E>(
        executor: E,
        id: Uuid,
        status: InvitationStatus,
    ) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            r#"
            UPDATE project_invitations
            SET status = $2, updated_at = NOW()
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(id)
        .bind(status)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Adds `user_id` to the project with the invited role and marks the
    /// invitation accepted, in one transaction.
    pub async fn accept(&self, pool: &PgPool, user_id: Uuid) -> Result<ProjectMember, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let member = ProjectMember::create(&mut *tx, self.project_id, user_id, self.role).await?;

        sqlx::query(
            r#"
            UPDATE project_invitations
            SET status = 'accepted', invitee_id = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(self.id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(member)
    }

    /// Declines the pending invitation matching token hash and email.
    ///
    /// Returns the project's name, or `None` when nothing matched.
    pub async fn decline(
        pool: &PgPool,
        token_hash: &str,
        email: &str,
    ) -> Result<Option<String>, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            UPDATE project_invitations i
            SET status = 'declined', updated_at = NOW()
            FROM projects p
            WHERE p.id = i.project_id
              AND i.token_hash = $1
              AND LOWER(i.invitee_email) = LOWER($2)
              AND i.status = 'pending'
            RETURNING p.name
            "#,
        )
        .bind(token_hash)
        .bind(email.trim())
        .fetch_optional(pool)
        .await
    }

    /// Invitations of a project, newest first, with inviter and invitee names.
    pub async fn list_by_project(
        pool: &PgPool,
        project_id: Uuid,
    ) -> Result<Vec<InvitationListing>, sqlx::Error> {
        sqlx::query_as::<_, InvitationListing>(
            r#"
            SELECT i.id, i.invitee_email, i.role, i.status, i.created_at, i.expires_at,
                   CASE WHEN inviter.id IS NULL THEN NULL
                        ELSE jsonb_build_object(
                            'first_name', inviter.first_name,
                            'last_name', inviter.last_name)
                   END AS inviter,
                   CASE WHEN invitee.id IS NULL THEN NULL
                        ELSE jsonb_build_object(
                            'first_name', invitee.first_name,
                            'last_name', invitee.last_name)
                   END AS invitee
            FROM project_invitations i
            LEFT JOIN profiles inviter ON inviter.id = i.inviter_id
            LEFT JOIN profiles invitee ON invitee.id = i.invitee_id
            WHERE i.project_id = $1
            ORDER BY i.created_at DESC
            "#,
        )
        .bind(project_id)
        .fetch_all(pool)
        .await
    }

    /// Deletes a pending invitation of `project_id`. Returns whether one was removed.
    pub async fn delete_pending(pool: &PgPool, project_id: Uuid, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            DELETE FROM project_invitations
            WHERE id = $1 AND project_id = $2 AND status = 'pending'
            "#,
        )
        .bind(id)
        .bind(project_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn invitation(expires_at: DateTime<Utc>) -> Invitation {
        Invitation {
            id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            inviter_id: Uuid::new_v4(),
            invitee_email: "grace@example.com".to_string(),
            invitee_id: None,
            role: ProjectRole::Member,
            status: InvitationStatus::Pending,
            token_hash: "abc123".to_string(),
            expires_at,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_is_expired() {
        let now = Utc::now();
        assert!(invitation(now - Duration::minutes(1)).is_expired(now));
        assert!(!invitation(now + Duration::days(7)).is_expired(now));
    }

    #[test]
    fn test_token_hash_not_serialized() {
        let value = serde_json::to_value(invitation(Utc::now())).unwrap();
        assert!(value.get("token_hash").is_none());
        assert_eq!(value["status"], "pending");
        assert_eq!(value["role"], "member");
    }
}
