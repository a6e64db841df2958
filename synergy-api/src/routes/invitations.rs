/// Project invitation endpoints
///
/// An invitation is addressed to an email. Its token is sent only in the
/// email links and stored as a SHA-256 hash; accepting or declining needs the
/// token and a session for the same address.
///
/// # Endpoints
///
/// - `POST /api/v1/invitations/projects/:project_id/invite` - Invite (owner or manager)
/// - `GET /api/v1/invitations/projects/:project_id/invitations` - List (owner or manager)
/// - `DELETE /api/v1/invitations/projects/:project_id/invitations/:invitation_id` - Cancel a pending one
/// - `PUT /api/v1/invitations/:token/accept`
/// - `PUT /api/v1/invitations/:token/decline`
///
/// # Lifecycle
///
/// ```text
/// pending ──accept──> accepted
///    │ ───decline──> declined
///    └───(expired when accepted too late)──> expired
/// ```

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{ApiJson, ApiPath},
    response::ApiResponse,
    routes::{requester_name, validation},
};
use axum::{extract::State, http::StatusCode, Extension};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use synergy_shared::{
    auth::{
        authorization::require_manager,
        invitation_token::{generate_token, hash_token, is_valid_format},
        middleware::AuthUser,
    },
    models::{
        invitation::{CreateInvitation, Invitation, InvitationListing, InvitationStatus},
        notification::NewNotification,
        profile::Profile,
        project::Project,
        project_member::{ProjectMember, ProjectRole},
    },
    notify::notify,
};
use uuid::Uuid;

const INVALID_INVITATION: &str = "Invalid or expired invitation";
const ALREADY_PROCESSED: &str = "Invalid invitation or already processed";

#[derive(Debug, Deserialize)]
pub struct InviteRequest {
    #[serde(default)]
    pub email: String,

    /// `member` (default) or `manager`
    pub role: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct InvitationSent {
    pub id: Uuid,
    pub email: String,
    pub role: ProjectRole,
    pub status: InvitationStatus,
    pub expires_at: DateTime<Utc>,
    pub email_sent: bool,
}

#[derive(Debug, Serialize)]
pub struct InvitationAccepted {
    pub project_id: Uuid,
    pub project_name: String,
    pub role: ProjectRole,
}

/// Email the requester's session belongs to, from the token or the profile.
async fn requester_email(state: &AppState, user: &AuthUser) -> ApiResult<Option<String>> {
    if let Some(email) = user.email.as_deref().filter(|e| !e.is_empty()) {
        return Ok(Some(email.to_string()));
    }

    Ok(Profile::find_by_id(&state.db, user.id)
        .await?
        .and_then(|p| p.email))
}

/// Sends the invitation email and, when the address already has an
/// account, an in-app notification.
pub async fn send_invitation(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(project_id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<InviteRequest>,
) -> ApiResult<(StatusCode, ApiResponse<InvitationSent>)> {
    let email = req.email.trim().to_lowercase();
    if !validation::is_valid_email(&email) {
        return Err(ApiError::BadRequest("Invalid email format".to_string()));
    }

    let role = match req.role.as_deref() {
        Some(role) => role.parse::<ProjectRole>()?,
        None => ProjectRole::default(),
    };

    require_manager(
        &state.db,
        project_id,
        user.id,
        "You do not have permission to invite members to this project",
    )
    .await?;

    if ProjectMember::exists_by_email(&state.db, project_id, &email).await? {
        return Err(ApiError::BadRequest(
            "User is already a member of this project".to_string(),
        ));
    }

    if Invitation::has_pending(&state.db, project_id, &email).await? {
        return Err(ApiError::BadRequest(
            "An invitation is already pending for this email".to_string(),
        ));
    }

    let project = Project::find_by_id(&state.db, project_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Project not found".to_string()))?;
    let invitee = Profile::find_by_email(&state.db, &email).await?;

    let (token, token_hash) = generate_token();
    let invitation = Invitation::create(
        &state.db,
        CreateInvitation {
            project_id,
            inviter_id: user.id,
            invitee_email: email.clone(),
            invitee_id: invitee.as_ref().map(|p| p.id),
            role,
            token_hash,
            expires_at: Utc::now() + Duration::hours(state.config.invitations.ttl_hours),
        },
    )
    .await?;

    tracing::info!(
        invitation_id = %invitation.id,
        project_id = %project_id,
        invited_by = %user.id,
        role = role.as_str(),
        "Invitation created"
    );

    let inviter_name = requester_name(&state.db, &user).await;

    let email_sent = match state
        .email
        .send_project_invitation(
            &email,
            &inviter_name,
            &project.name,
            &state.config.invitation_link(&token, "accept"),
            &state.config.invitation_link(&token, "decline"),
            state.config.invitations.ttl_hours,
        )
        .await
    {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, invitation_id = %invitation.id, "Invitation email not sent");
            false
        }
    };

    if let Some(invitee) = invitee {
        notify(
            &state.db,
            NewNotification::project_invitation(invitee.id, project_id, &project.name, &inviter_name, role),
        );
    }

    Ok((
        StatusCode::CREATED,
        ApiResponse::with_message(
            "Invitation sent successfully",
            InvitationSent {
                id: invitation.id,
                email: invitation.invitee_email,
                role: invitation.role,
                status: invitation.status,
                expires_at: invitation.expires_at,
                email_sent,
            },
        ),
    ))
}

pub async fn list_invitations(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(project_id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<Vec<InvitationListing>>> {
    require_manager(
        &state.db,
        project_id,
        user.id,
        "You do not have permission to view invitations for this project",
    )
    .await?;

    let invitations = Invitation::list_by_project(&state.db, project_id).await?;
    Ok(ApiResponse::data(invitations))
}

/// Only pending invitations can be canceled.
pub async fn cancel_invitation(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath((project_id, invitation_id)): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<ApiResponse<()>> {
    require_manager(
        &state.db,
        project_id,
        user.id,
        "You do not have permission to cancel invitations",
    )
    .await?;

    if !Invitation::delete_pending(&state.db, project_id, invitation_id).await? {
        return Err(ApiError::NotFound("Invitation not found".to_string()));
    }

    tracing::info!(invitation_id = %invitation_id, project_id = %project_id, "Invitation canceled");

    Ok(ApiResponse::message("Invitation canceled successfully"))
}

/// Joins the project with the invited role and notifies the inviter.
pub async fn accept_invitation(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(token): ApiPath<String>,
) -> ApiResult<ApiResponse<InvitationAccepted>> {
    let invalid = || ApiError::NotFound(INVALID_INVITATION.to_string());

    if !is_valid_format(&token) {
        return Err(invalid());
    }
    let email = requester_email(&state, &user).await?.ok_or_else(invalid)?;

    let pending = Invitation::find_pending(&state.db, &hash_token(&token), &email)
        .await?
        .ok_or_else(invalid)?;
    let invitation = pending.invitation;

    if invitation.is_expired(Utc::now()) {
        Invitation::set_status(&state.db, invitation.id, InvitationStatus::Expired).await?;
        return Err(ApiError::BadRequest("This invitation has expired".to_string()));
    }

    if ProjectMember::find(&state.db, invitation.project_id, user.id)
        .await?
        .is_some()
    {
        Invitation::set_status(&state.db, invitation.id, InvitationStatus::Accepted).await?;
        return Err(ApiError::BadRequest(
            "You are already a member of this project".to_string(),
        ));
    }

    let member = invitation.accept(&state.db, user.id).await?;

    tracing::info!(
        invitation_id = %invitation.id,
        project_id = %invitation.project_id,
        user_id = %user.id,
        "Invitation accepted"
    );

    if invitation.inviter_id != user.id {
        let accepted_by = requester_name(&state.db, &user).await;
        notify(
            &state.db,
            NewNotification::invitation_accepted(
                invitation.inviter_id,
                invitation.project_id,
                &pending.project_name,
                &accepted_by,
            ),
        );
    }

    Ok(ApiResponse::with_message(
        format!("Successfully joined project \"{}\"", pending.project_name),
        InvitationAccepted {
            project_id: member.project_id,
            project_name: pending.project_name,
            role: member.role,
        },
    ))
}

pub async fn decline_invitation(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(token): ApiPath<String>,
) -> ApiResult<ApiResponse<()>> {
    let processed = || ApiError::NotFound(ALREADY_PROCESSED.to_string());

    if !is_valid_format(&token) {
        return Err(processed());
    }
    let email = requester_email(&state, &user).await?.ok_or_else(processed)?;

    let project_name = Invitation::decline(&state.db, &hash_token(&token), &email)
        .await?
        .ok_or_else(processed)?;

    tracing::info!(user_id = %user.id, "Invitation declined");

    Ok(ApiResponse::message(format!(
        "Invitation to \"{}\" declined",
        project_name
    )))
}
