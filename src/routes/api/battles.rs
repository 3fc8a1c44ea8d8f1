use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    battles::{self, BattleView, CreateBattleParams, SubmitParams},
    errors::ServiceError,
    models::battle::{Battle, BattleStatus, BattleSummary, BattleType, Participant, Submission},
    routes::auth::ApiUser,
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct ListBattlesQuery {
    #[serde(default)]
    pub status: Option<BattleStatus>,
}

#[derive(Debug, Serialize)]
pub struct ListBattlesResponse {
    pub battles: Vec<BattleSummary>,
}

#[derive(Debug, Serialize)]
pub struct BattleResponse {
    pub battle: Battle,
}

#[derive(Debug, Serialize)]
pub struct JoinResponse {
    pub participant: Participant,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub submission: Submission,
}

#[derive(Debug, Deserialize)]
pub struct CreateBattleRequest {
    pub title: String,
    pub description: Option<String>,
    pub battle_type: Option<BattleType>,
    #[serde(default)]
    pub problem_ids: Vec<i32>,
    pub max_participants: Option<i32>,
    pub duration_minutes: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub problem_id: i32,
    pub solved: bool,
    pub time_taken_seconds: Option<i32>,
}

/// GET /api/battles
pub async fn list_battles(
    State(state): State<AppState>,
    Query(query): Query<ListBattlesQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let battles = state.store.list_battles(query.status).await?;
    Ok(Json(ListBattlesResponse { battles }))
}

/// POST /api/battles
pub async fn create_battle(
    State(state): State<AppState>,
    ApiUser(user_id): ApiUser,
    Json(request): Json<CreateBattleRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let battle = battles::create_battle(
        state.store.as_ref(),
        user_id,
        CreateBattleParams {
            title: request.title,
            description: request.description,
            battle_type: request.battle_type,
            problem_ids: request.problem_ids,
            max_participants: request.max_participants,
            duration_minutes: request.duration_minutes,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(BattleResponse { battle })))
}

/// GET /api/battles/:battle_id — ranked, profile-joined view
pub async fn get_battle(
    State(state): State<AppState>,
    Path(battle_id): Path<Uuid>,
) -> Result<Json<BattleView>, ServiceError> {
    let view = battles::battle_view(state.store.as_ref(), state.identity.as_ref(), battle_id)
        .await?;
    Ok(Json(view))
}

/// POST /api/battles/:battle_id/join
pub async fn join_battle(
    State(state): State<AppState>,
    ApiUser(user_id): ApiUser,
    Path(battle_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let participant = battles::join_battle(state.store.as_ref(), battle_id, user_id).await?;
    Ok((StatusCode::CREATED, Json(JoinResponse { participant })))
}

/// POST /api/battles/:battle_id/start — creator only
pub async fn start_battle(
    State(state): State<AppState>,
    ApiUser(user_id): ApiUser,
    Path(battle_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let battle = battles::start_battle(state.store.as_ref(), battle_id, user_id).await?;
    Ok(Json(BattleResponse { battle }))
}

/// POST /api/battles/:battle_id/submit
pub async fn submit_solution(
    State(state): State<AppState>,
    ApiUser(user_id): ApiUser,
    Path(battle_id): Path<Uuid>,
    Json(request): Json<SubmitRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let submission = battles::submit_solution(
        state.store.as_ref(),
        battle_id,
        user_id,
        SubmitParams {
            problem_id: request.problem_id,
            solved: request.solved,
            time_taken_seconds: request.time_taken_seconds,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(SubmitResponse { submission })))
}
