/// Database models for SynergySphere
///
/// Each model owns its SQL. Functions take a `&PgPool`, or any `PgExecutor`
/// where they also run inside a transaction.
///
/// # Models
///
/// - `profile`: user profiles mirrored from the identity provider
/// - `project`: projects and per-member task statistics
/// - `project_member`: project memberships and roles
/// - `task`: tasks and their status
/// - `invitation`: email invitations into a project
/// - `notification`: in-app notifications
///
/// Nested objects in listings (`profiles`, `projects`, `assignee_profile`)
/// are built with `jsonb_build_object` and decoded through `sqlx::types::Json`.

pub mod invitation;
pub mod notification;
pub mod profile;
pub mod project;
pub mod project_member;
pub mod task;
