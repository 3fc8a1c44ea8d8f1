//! Abstract persistence and identity boundaries.
//!
//! The service core only talks to these traits; `PgStore` backs production
//! and `MemoryStore` backs tests and local development.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::models::battle::{
    Battle, BattleStatus, BattleSummary, NewBattle, NewSubmission, Participant, Submission,
};
use crate::models::team::{Team, TeamMember, TeamUpdate};

pub mod memory;
pub mod pg;

pub use memory::{MemoryStore, StaticIdentityProvider};
pub use pg::PgStore;

/// Presentation attributes resolved from the identity provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub avatar: String,
    pub points: i64,
}

#[async_trait]
pub trait BattleStore: Send + Sync {
    async fn get_battle(&self, battle_id: Uuid) -> Result<Option<Battle>, ServiceError>;

    async fn list_battles(
        &self,
        status: Option<BattleStatus>,
    ) -> Result<Vec<BattleSummary>, ServiceError>;

    async fn create_battle(&self, new: NewBattle) -> Result<Battle, ServiceError>;

    /// Guarded waiting -> in_progress transition; `None` when the battle is
    /// missing or already past `waiting`.
    async fn mark_started(&self, battle_id: Uuid) -> Result<Option<Battle>, ServiceError>;

    async fn count_participants(&self, battle_id: Uuid) -> Result<i64, ServiceError>;

    async fn get_participant(
        &self,
        battle_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Participant>, ServiceError>;

    /// Atomic admission decision: battle existence, `waiting` status,
    /// capacity, and (battle, user) uniqueness are all verified under one
    /// serialization point, then the participant row is inserted. Exactly one
    /// of N concurrent calls for the last open slot succeeds.
    async fn admit_participant(
        &self,
        battle_id: Uuid,
        user_id: Uuid,
        team_id: Option<Uuid>,
    ) -> Result<Participant, ServiceError>;

    async fn list_participants(&self, battle_id: Uuid) -> Result<Vec<Participant>, ServiceError>;

    /// Append-only; fails with `AlreadySubmitted` for a duplicate
    /// (battle, user, problem) triple.
    async fn record_submission(&self, new: NewSubmission) -> Result<Submission, ServiceError>;

    /// Credit a solve. Score only ever increases; a problem already in the
    /// solved set is not credited twice.
    async fn apply_solve(
        &self,
        participant_id: Uuid,
        problem_id: i32,
        points: i32,
    ) -> Result<(), ServiceError>;

    async fn get_team(&self, team_id: Uuid) -> Result<Option<Team>, ServiceError>;

    async fn list_team_members(&self, team_id: Uuid) -> Result<Vec<TeamMember>, ServiceError>;

    /// Atomic membership admission, same guarantees as `admit_participant`
    /// with the team's `max_members` as the capacity bound.
    async fn admit_team_member(
        &self,
        team_id: Uuid,
        user_id: Uuid,
    ) -> Result<TeamMember, ServiceError>;

    /// Idempotent; removing an absent membership succeeds.
    async fn remove_team_member(&self, team_id: Uuid, user_id: Uuid) -> Result<(), ServiceError>;

    /// Partial update; `None` fields keep their current value. `NotFound`
    /// when the team is missing.
    async fn update_team(&self, team_id: Uuid, update: TeamUpdate) -> Result<Team, ServiceError>;

    /// Remove the team and all of its membership rows. `NotFound` when the
    /// team is missing.
    async fn delete_team(&self, team_id: Uuid) -> Result<(), ServiceError>;
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolve a bearer token to a user id; `None` when the token does not
    /// identify anyone.
    async fn current_user(&self, token: &str) -> Result<Option<Uuid>, ServiceError>;

    /// Profile attributes for display. `None` when the user has no profile;
    /// callers treat errors here as missing data rather than failing whole
    /// views.
    async fn get_profile(&self, user_id: Uuid) -> Result<Option<Profile>, ServiceError>;
}
