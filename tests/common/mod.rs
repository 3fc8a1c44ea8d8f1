#![allow(dead_code)]

use std::sync::Arc;

use axum::{Router, body::Body, http::Request, http::StatusCode};
use tower::ServiceExt as _;
use uuid::Uuid;

use algo_arena::models::battle::{Battle, BattleStatus, BattleType};
use algo_arena::models::team::Team;
use algo_arena::routes;
use algo_arena::state::AppState;
use algo_arena::store::{MemoryStore, StaticIdentityProvider};

pub const TOKEN_ALICE: &str = "token-alice";
pub const TOKEN_BOB: &str = "token-bob";
pub const TOKEN_CAROL: &str = "token-carol";
pub const TOKEN_DAVE: &str = "token-dave";

pub struct TestEnv {
    pub app: Router,
    pub store: Arc<MemoryStore>,
    pub alice: Uuid,
    pub bob: Uuid,
    pub carol: Uuid,
    /// Has a valid token but a failing profile lookup.
    pub dave: Uuid,
}

pub fn setup() -> TestEnv {
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();
    let carol = Uuid::new_v4();
    let dave = Uuid::new_v4();

    let identity = StaticIdentityProvider::new()
        .with_token(TOKEN_ALICE, alice)
        .with_token(TOKEN_BOB, bob)
        .with_token(TOKEN_CAROL, carol)
        .with_token(TOKEN_DAVE, dave)
        .with_profile(alice, "Alice", "fox", 1200)
        .with_profile(bob, "Bob", "owl", 800)
        .with_profile(carol, "Carol", "bear", 950)
        .with_failing_profile(dave);

    let store = Arc::new(MemoryStore::new());
    let state = AppState::new(store.clone(), Arc::new(identity));

    TestEnv {
        app: routes::router(state),
        store,
        alice,
        bob,
        carol,
        dave,
    }
}

pub fn waiting_battle(created_by: Uuid, max_participants: i32) -> Battle {
    battle_with_status(created_by, max_participants, BattleStatus::Waiting)
}

pub fn battle_with_status(created_by: Uuid, max_participants: i32, status: BattleStatus) -> Battle {
    Battle {
        battle_id: Uuid::new_v4(),
        title: "two sum showdown".to_string(),
        description: None,
        battle_type: BattleType::HeadToHead,
        status,
        problem_ids: vec![1, 2, 3],
        max_participants,
        duration_minutes: 30,
        created_by,
        started_at: None,
        ended_at: None,
        created_at: chrono::Utc::now(),
    }
}

pub fn team(owner_id: Uuid, max_members: i32, invite_code: Option<&str>) -> Team {
    Team {
        team_id: Uuid::new_v4(),
        name: "graph grinders".to_string(),
        description: None,
        avatar: "wolf".to_string(),
        owner_id,
        max_members,
        is_private: invite_code.is_some(),
        invite_code: invite_code.map(str::to_string),
        created_at: chrono::Utc::now(),
    }
}

pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
    };
    (status, json)
}
