use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::models::battle::{
    self, AdmissionOutcome, Battle, BattleStatus, BattleSummary, NewBattle, NewSubmission,
    Participant, Submission,
};
use crate::models::team::{self, Team, TeamAdmission, TeamMember, TeamUpdate};
use crate::store::BattleStore;

/// Postgres-backed store. All uniqueness and capacity invariants are enforced
/// by the schema and the admission transactions in the model layer.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BattleStore for PgStore {
    async fn get_battle(&self, battle_id: Uuid) -> Result<Option<Battle>, ServiceError> {
        Ok(battle::get_battle_by_id(&self.pool, battle_id).await?)
    }

    async fn list_battles(
        &self,
        status: Option<BattleStatus>,
    ) -> Result<Vec<BattleSummary>, ServiceError> {
        Ok(battle::list_battles(&self.pool, status).await?)
    }

    async fn create_battle(&self, new: NewBattle) -> Result<Battle, ServiceError> {
        Ok(battle::create_battle(&self.pool, new).await?)
    }

    async fn mark_started(&self, battle_id: Uuid) -> Result<Option<Battle>, ServiceError> {
        Ok(battle::mark_started(&self.pool, battle_id).await?)
    }

    async fn count_participants(&self, battle_id: Uuid) -> Result<i64, ServiceError> {
        Ok(battle::count_participants(&self.pool, battle_id).await?)
    }

    async fn get_participant(
        &self,
        battle_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Participant>, ServiceError> {
        Ok(battle::get_participant(&self.pool, battle_id, user_id).await?)
    }

    async fn admit_participant(
        &self,
        battle_id: Uuid,
        user_id: Uuid,
        team_id: Option<Uuid>,
    ) -> Result<Participant, ServiceError> {
        match battle::admit_participant(&self.pool, battle_id, user_id, team_id).await? {
            AdmissionOutcome::Admitted(participant) => Ok(participant),
            AdmissionOutcome::BattleMissing => Err(ServiceError::NotFound("battle")),
            AdmissionOutcome::NotWaiting(status) => Err(ServiceError::battle_not_joinable(status)),
            AdmissionOutcome::Full => Err(ServiceError::CapacityExceeded("battle")),
            AdmissionOutcome::AlreadyJoined => Err(ServiceError::AlreadyJoined("battle")),
        }
    }

    async fn list_participants(&self, battle_id: Uuid) -> Result<Vec<Participant>, ServiceError> {
        Ok(battle::list_participants(&self.pool, battle_id).await?)
    }

    async fn record_submission(&self, new: NewSubmission) -> Result<Submission, ServiceError> {
        battle::record_submission(&self.pool, new)
            .await?
            .ok_or(ServiceError::AlreadySubmitted)
    }

    async fn apply_solve(
        &self,
        participant_id: Uuid,
        problem_id: i32,
        points: i32,
    ) -> Result<(), ServiceError> {
        Ok(battle::apply_solve(&self.pool, participant_id, problem_id, points).await?)
    }

    async fn get_team(&self, team_id: Uuid) -> Result<Option<Team>, ServiceError> {
        Ok(team::get_team_by_id(&self.pool, team_id).await?)
    }

    async fn list_team_members(&self, team_id: Uuid) -> Result<Vec<TeamMember>, ServiceError> {
        Ok(team::list_team_members(&self.pool, team_id).await?)
    }

    async fn admit_team_member(
        &self,
        team_id: Uuid,
        user_id: Uuid,
    ) -> Result<TeamMember, ServiceError> {
        match team::admit_member(&self.pool, team_id, user_id).await? {
            TeamAdmission::Admitted(member) => Ok(member),
            TeamAdmission::TeamMissing => Err(ServiceError::NotFound("team")),
            TeamAdmission::Full => Err(ServiceError::CapacityExceeded("team")),
            TeamAdmission::AlreadyMember => Err(ServiceError::AlreadyJoined("team")),
        }
    }

    async fn remove_team_member(&self, team_id: Uuid, user_id: Uuid) -> Result<(), ServiceError> {
        Ok(team::remove_member(&self.pool, team_id, user_id).await?)
    }

    async fn update_team(&self, team_id: Uuid, update: TeamUpdate) -> Result<Team, ServiceError> {
        team::update_team(&self.pool, team_id, update)
            .await?
            .ok_or(ServiceError::NotFound("team"))
    }

    async fn delete_team(&self, team_id: Uuid) -> Result<(), ServiceError> {
        if team::delete_team(&self.pool, team_id).await? {
            Ok(())
        } else {
            Err(ServiceError::NotFound("team"))
        }
    }
}
