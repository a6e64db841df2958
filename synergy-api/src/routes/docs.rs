//! Endpoint documentation served next to each resource. Public.

use axum::Json;
use serde_json::{json, Value};

pub async fn auth_docs() -> Json<Value> {
    Json(json!({
        "version": "1.0",
        "endpoints": {
            "POST /signup": "Register a new user",
            "POST /login": "Authenticate user",
            "POST /logout": "Sign out user",
            "GET /me": "Get current user profile (requires auth)"
        },
        "examples": {
            "signup": {
                "method": "POST",
                "url": "/api/v1/auth/signup",
                "body": {
                    "email": "user@example.com",
                    "password": "password123",
                    "firstName": "John",
                    "lastName": "Doe"
                }
            },
            "login": {
                "method": "POST",
                "url": "/api/v1/auth/login",
                "body": {
                    "email": "user@example.com",
                    "password": "password123"
                }
            }
        }
    }))
}

pub async fn project_docs() -> Json<Value> {
    Json(json!({
        "version": "1.0",
        "description": "Project management endpoints",
        "endpoints": {
            "GET /": "Get all user projects",
            "GET /:id": "Get project by ID",
            "POST /": "Create new project",
            "PUT /:id": "Update project (owner/manager only)",
            "DELETE /:id": "Delete project (owner only)",
            "GET /:id/members": "List project members",
            "POST /:id/members": "Add member to project",
            "PUT /:id/members/:userId": "Change a member's role (owner/manager only)",
            "DELETE /:id/members/:userId": "Remove member from project"
        },
        "examples": {
            "createProject": {
                "method": "POST",
                "url": "/api/v1/projects",
                "headers": {
                    "Authorization": "Bearer your-jwt-token",
                    "Content-Type": "application/json"
                },
                "body": {
                    "name": "My Project",
                    "description": "Project description",
                    "deadline": "2024-12-31",
                    "priority": "High",
                    "tags": ["web", "react"]
                }
            }
        }
    }))
}

pub async fn invitation_docs() -> Json<Value> {
    Json(json!({
        "version": "1.0",
        "description": "Project invitation management endpoints",
        "endpoints": {
            "POST /projects/:projectId/invite": "Send invitation to user by email",
            "GET /projects/:projectId/invitations": "Get project invitations (managers only)",
            "DELETE /projects/:projectId/invitations/:invitationId": "Cancel invitation",
            "PUT /:token/accept": "Accept invitation using token",
            "PUT /:token/decline": "Decline invitation using token"
        },
        "examples": {
            "sendInvitation": {
                "method": "POST",
                "url": "/api/v1/invitations/projects/123e4567-e89b-12d3-a456-426614174000/invite",
                "headers": {
                    "Authorization": "Bearer your-jwt-token",
                    "Content-Type": "application/json"
                },
                "body": {
                    "email": "user@example.com",
                    "role": "member"
                }
            },
            "acceptInvitation": {
                "method": "PUT",
                "url": "/api/v1/invitations/inv_abc123def456/accept",
                "headers": {
                    "Authorization": "Bearer your-jwt-token"
                }
            }
        }
    }))
}
