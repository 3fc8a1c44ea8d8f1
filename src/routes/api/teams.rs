use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    errors::ServiceError,
    models::team::{Team, TeamMember},
    routes::auth::ApiUser,
    state::AppState,
    teams::{self, TeamView, UpdateTeamParams},
};

#[derive(Debug, Deserialize, Default)]
pub struct JoinTeamRequest {
    pub invite_code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTeamRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub avatar: Option<String>,
    pub max_members: Option<i32>,
    pub is_private: Option<bool>,
    pub invite_code: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct JoinTeamResponse {
    pub member: TeamMember,
}

#[derive(Debug, Serialize)]
pub struct TeamResponse {
    pub team: Team,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// GET /api/teams/:team_id — team with profile-joined members
pub async fn get_team(
    State(state): State<AppState>,
    Path(team_id): Path<Uuid>,
) -> Result<Json<TeamView>, ServiceError> {
    let view = teams::team_view(state.store.as_ref(), state.identity.as_ref(), team_id).await?;
    Ok(Json(view))
}

/// POST /api/teams/:team_id/join
pub async fn join_team(
    State(state): State<AppState>,
    ApiUser(user_id): ApiUser,
    Path(team_id): Path<Uuid>,
    body: Option<Json<JoinTeamRequest>>,
) -> Result<impl IntoResponse, ServiceError> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    let member = teams::join_team(
        state.store.as_ref(),
        team_id,
        user_id,
        request.invite_code.as_deref(),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(JoinTeamResponse { member })))
}

/// PATCH /api/teams/:team_id — owner only, partial update
pub async fn update_team(
    State(state): State<AppState>,
    ApiUser(user_id): ApiUser,
    Path(team_id): Path<Uuid>,
    Json(request): Json<UpdateTeamRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let team = teams::update_team(
        state.store.as_ref(),
        team_id,
        user_id,
        UpdateTeamParams {
            name: request.name,
            description: request.description,
            avatar: request.avatar,
            max_members: request.max_members,
            is_private: request.is_private,
            invite_code: request.invite_code,
        },
    )
    .await?;

    Ok(Json(TeamResponse { team }))
}

/// DELETE /api/teams/:team_id — owner only, memberships cascade
pub async fn delete_team(
    State(state): State<AppState>,
    ApiUser(user_id): ApiUser,
    Path(team_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    teams::delete_team(state.store.as_ref(), team_id, user_id).await?;
    Ok(Json(SuccessResponse { success: true }))
}

/// POST /api/teams/:team_id/leave — idempotent, owners refused
pub async fn leave_team(
    State(state): State<AppState>,
    ApiUser(user_id): ApiUser,
    Path(team_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    teams::leave_team(state.store.as_ref(), team_id, user_id).await?;
    Ok(Json(SuccessResponse { success: true }))
}
