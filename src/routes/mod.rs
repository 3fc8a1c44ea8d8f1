use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;

pub mod api;
pub mod auth;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route(
            "/api/battles",
            get(api::battles::list_battles).post(api::battles::create_battle),
        )
        .route("/api/battles/{battle_id}", get(api::battles::get_battle))
        .route("/api/battles/{battle_id}/join", post(api::battles::join_battle))
        .route(
            "/api/battles/{battle_id}/start",
            post(api::battles::start_battle),
        )
        .route(
            "/api/battles/{battle_id}/submit",
            post(api::battles::submit_solution),
        )
        .route(
            "/api/teams/{team_id}",
            get(api::teams::get_team)
                .patch(api::teams::update_team)
                .delete(api::teams::delete_team),
        )
        .route("/api/teams/{team_id}/join", post(api::teams::join_team))
        .route("/api/teams/{team_id}/leave", post(api::teams::leave_team))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}
