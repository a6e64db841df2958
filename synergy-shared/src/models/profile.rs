/// Profile model and database operations
///
/// A profile mirrors an identity-provider account. Its `id` is the auth
/// subject id carried in access tokens, so no separate lookup table exists.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE profiles (
///     id UUID PRIMARY KEY,
///     email TEXT,
///     first_name TEXT,
///     last_name TEXT,
///     avatar_url TEXT,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use synergy_shared::models::profile::{CreateProfile, Profile, UpdateProfile};
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, user_id: Uuid) -> Result<(), sqlx::Error> {
/// Profile::create(&pool, CreateProfile {
///     id: user_id,
///     email: Some("ada@example.com".to_string()),
///     first_name: Some("Ada".to_string()),
///     last_name: Some("Lovelace".to_string()),
/// }).await?;
///
/// let updated = Profile::update(&pool, user_id, UpdateProfile {
///     avatar_url: Some("https://cdn.example.com/ada.png".to_string()),
///     ..Default::default()
/// }).await?;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Maximum rows returned by the name directory.
pub const DIRECTORY_LIMIT: i64 = 50;

/// Maximum rows returned by the email search.
pub const EMAIL_SEARCH_LIMIT: i64 = 10;

/// A user's profile row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Profile {
    /// Same id as the auth account
    pub id: Uuid,

    /// Mirrored sign-up address, used to match invitations
    pub email: Option<String>,

    pub first_name: Option<String>,

    pub last_name: Option<String>,

    pub avatar_url: Option<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// First and last name, embedded wherever another row references a profile
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PersonName {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl PersonName {
    /// "First Last", skipping missing parts. Empty when both are missing.
    pub fn display_name(&self) -> String {
        [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Directory entry returned by the user listing
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserSummary {
    pub id: Uuid,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Email search hit
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserMatch {
    pub id: Uuid,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Profile fields visible to other users
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PublicProfile {
    pub id: Uuid,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a profile after sign-up
#[derive(Debug, Clone)]
pub struct CreateProfile {
    pub id: Uuid,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Partial profile update. `None` leaves the column untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProfile {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub avatar_url: Option<String>,
}

impl UpdateProfile {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none() && self.last_name.is_none() && self.avatar_url.is_none()
    }
}

/// Escapes `%`, `_` and `\` so user input matches literally inside LIKE patterns.
pub fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// `%term%` pattern for case-insensitive substring matching.
pub fn contains_pattern(term: &str) -> String {
    format!("%{}%", escape_like(term.trim()))
}

const PROFILE_COLUMNS: &str = "id, email, first_name, last_name, avatar_url, created_at, updated_at";

impl Profile {
    /// Inserts the profile row for a freshly signed-up account.
    ///
    /// # Errors
    ///
    /// Fails on a duplicate id or a lost connection.
    pub async fn create(pool: &PgPool, data: CreateProfile) -> Result<Self, sqlx::Error> {
        let profile = sqlx::query_as::<_, Profile>(
            r#"
            INSERT INTO profiles (id, email, first_name, last_name)
            VALUES ($1, $2, $3, $4)
            RETURNING id, email, first_name, last_name, avatar_url, created_at, updated_at
            "#,
        )
        .bind(data.id)
        .bind(data.email.map(|e| e.trim().to_lowercase()))
        .bind(data.first_name)
        .bind(data.last_name)
        .fetch_one(pool)
        .await?;

        Ok(profile)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {} FROM profiles WHERE id = $1", PROFILE_COLUMNS);

        sqlx::query_as::<_, Profile>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Case-insensitive exact match on the mirrored email.
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM profiles WHERE LOWER(email) = LOWER($1) LIMIT 1",
            PROFILE_COLUMNS
        );

        sqlx::query_as::<_, Profile>(&query)
            .bind(email.trim())
            .fetch_optional(pool)
            .await
    }

    pub async fn find_public(pool: &PgPool, id: Uuid) -> Result<Option<PublicProfile>, sqlx::Error> {
        sqlx::query_as::<_, PublicProfile>(
            r#"
            SELECT id, first_name, last_name, avatar_url, created_at
            FROM profiles
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Applies a partial update and bumps `updated_at`.
    ///
    /// Returns `None` when no profile exists for `id`.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateProfile,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE profiles SET updated_at = NOW()");
        let mut bind_count = 1;

        if data.first_name.is_some() {
            bind_count += 1;
            query.push_str(&format!(", first_name = ${}", bind_count));
        }
        if data.last_name.is_some() {
            bind_count += 1;
            query.push_str(&format!(", last_name = ${}", bind_count));
        }
        if data.avatar_url.is_some() {
            bind_count += 1;
            query.push_str(&format!(", avatar_url = ${}", bind_count));
        }

        query.push_str(" WHERE id = $1 RETURNING ");
        query.push_str(PROFILE_COLUMNS);

        let mut q = sqlx::query_as::<_, Profile>(&query).bind(id);

        if let Some(first_name) = data.first_name {
            q = q.bind(first_name);
        }
        if let Some(last_name) = data.last_name {
            q = q.bind(last_name);
        }
        if let Some(avatar_url) = data.avatar_url {
            q = q.bind(avatar_url);
        }

        q.fetch_optional(pool).await
    }

    /// Lists profiles ordered by first name, optionally filtered by a
    /// case-insensitive match on first or last name.
    pub async fn directory(
        pool: &PgPool,
        search: Option<&str>,
    ) -> Result<Vec<UserSummary>, sqlx::Error> {
        let pattern = search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(contains_pattern);

        sqlx::query_as::<_, UserSummary>(
            r#"
            SELECT id, first_name, last_name
            FROM profiles
            WHERE $1::TEXT IS NULL OR first_name ILIKE $1 OR last_name ILIKE $1
            ORDER BY first_name NULLS LAST
            LIMIT $2
            "#,
        )
        .bind(pattern)
        .bind(DIRECTORY_LIMIT)
        .fetch_all(pool)
        .await
    }

    /// Profiles whose email contains `term`, case-insensitively.
    pub async fn search_by_email(pool: &PgPool, term: &str) -> Result<Vec<UserMatch>, sqlx::Error> {
        sqlx::query_as::<_, UserMatch>(
            r#"
            SELECT id, email, first_name, last_name
            FROM profiles
            WHERE email ILIKE $1
            ORDER BY email
            LIMIT $2
            "#,
        )
        .bind(contains_pattern(term))
        .bind(EMAIL_SEARCH_LIMIT)
        .fetch_all(pool)
        .await
    }

    pub fn name(&self) -> PersonName {
        PersonName {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
        }
    }
}
