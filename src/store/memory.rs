//! In-memory store and identity provider for tests and local development.
//!
//! A single async mutex guards all state, so every admission decision is
//! trivially atomic: the capacity check, the uniqueness check, and the insert
//! happen under one lock acquisition.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::models::battle::{
    Battle, BattleStatus, BattleSummary, NewBattle, NewSubmission, Participant, Submission,
};
use crate::models::team::{Team, TeamMember, TeamRole, TeamUpdate};
use crate::store::{BattleStore, IdentityProvider, Profile};

#[derive(Default)]
struct State {
    battles: HashMap<Uuid, Battle>,
    participants: Vec<Participant>,
    submissions: Vec<Submission>,
    teams: HashMap<Uuid, Team>,
    members: Vec<TeamMember>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Test fixture: install a battle in an arbitrary lifecycle state.
    pub async fn put_battle(&self, battle: Battle) {
        self.state
            .lock()
            .await
            .battles
            .insert(battle.battle_id, battle);
    }

    /// Test fixture: install a team, plus its owner membership row.
    pub async fn put_team(&self, team: Team) {
        let mut state = self.state.lock().await;
        let member = TeamMember {
            team_member_id: Uuid::new_v4(),
            team_id: team.team_id,
            user_id: team.owner_id,
            role: TeamRole::Owner,
            points_contributed: 0,
            joined_at: chrono::Utc::now(),
        };
        state.members.push(member);
        state.teams.insert(team.team_id, team);
    }
}

#[async_trait]
impl BattleStore for MemoryStore {
    async fn get_battle(&self, battle_id: Uuid) -> Result<Option<Battle>, ServiceError> {
        Ok(self.state.lock().await.battles.get(&battle_id).cloned())
    }

    async fn list_battles(
        &self,
        status: Option<BattleStatus>,
    ) -> Result<Vec<BattleSummary>, ServiceError> {
        let state = self.state.lock().await;
        let mut battles: Vec<&Battle> = state
            .battles
            .values()
            .filter(|b| status.is_none_or(|s| b.status == s))
            .collect();
        battles.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let summaries = battles
            .into_iter()
            .map(|b| BattleSummary {
                battle_id: b.battle_id,
                title: b.title.clone(),
                battle_type: b.battle_type,
                status: b.status,
                max_participants: b.max_participants,
                duration_minutes: b.duration_minutes,
                created_at: b.created_at,
                participant_count: state
                    .participants
                    .iter()
                    .filter(|p| p.battle_id == b.battle_id)
                    .count() as i64,
            })
            .collect();
        Ok(summaries)
    }

    async fn create_battle(&self, new: NewBattle) -> Result<Battle, ServiceError> {
        let battle = Battle {
            battle_id: Uuid::new_v4(),
            title: new.title,
            description: new.description,
            battle_type: new.battle_type,
            status: BattleStatus::Waiting,
            problem_ids: new.problem_ids,
            max_participants: new.max_participants,
            duration_minutes: new.duration_minutes,
            created_by: new.created_by,
            started_at: None,
            ended_at: None,
            created_at: chrono::Utc::now(),
        };
        self.state
            .lock()
            .await
            .battles
            .insert(battle.battle_id, battle.clone());
        Ok(battle)
    }

    async fn mark_started(&self, battle_id: Uuid) -> Result<Option<Battle>, ServiceError> {
        let mut state = self.state.lock().await;
        match state.battles.get_mut(&battle_id) {
            Some(battle) if battle.status == BattleStatus::Waiting => {
                battle.status = BattleStatus::InProgress;
                battle.started_at = Some(chrono::Utc::now());
                Ok(Some(battle.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn count_participants(&self, battle_id: Uuid) -> Result<i64, ServiceError> {
        let state = self.state.lock().await;
        Ok(state
            .participants
            .iter()
            .filter(|p| p.battle_id == battle_id)
            .count() as i64)
    }

    async fn get_participant(
        &self,
        battle_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Participant>, ServiceError> {
        let state = self.state.lock().await;
        Ok(state
            .participants
            .iter()
            .find(|p| p.battle_id == battle_id && p.user_id == user_id)
            .cloned())
    }

    async fn admit_participant(
        &self,
        battle_id: Uuid,
        user_id: Uuid,
        team_id: Option<Uuid>,
    ) -> Result<Participant, ServiceError> {
        let mut state = self.state.lock().await;

        let battle = state
            .battles
            .get(&battle_id)
            .ok_or(ServiceError::NotFound("battle"))?;
        if battle.status != BattleStatus::Waiting {
            return Err(ServiceError::battle_not_joinable(battle.status));
        }
        let max = battle.max_participants as usize;

        let count = state
            .participants
            .iter()
            .filter(|p| p.battle_id == battle_id)
            .count();
        if count >= max {
            return Err(ServiceError::CapacityExceeded("battle"));
        }

        if state
            .participants
            .iter()
            .any(|p| p.battle_id == battle_id && p.user_id == user_id)
        {
            return Err(ServiceError::AlreadyJoined("battle"));
        }

        let participant = Participant {
            participant_id: Uuid::new_v4(),
            battle_id,
            user_id,
            team_id,
            score: 0,
            problems_solved: vec![],
            rank: None,
            joined_at: chrono::Utc::now(),
        };
        state.participants.push(participant.clone());
        Ok(participant)
    }

    async fn list_participants(&self, battle_id: Uuid) -> Result<Vec<Participant>, ServiceError> {
        let state = self.state.lock().await;
        Ok(state
            .participants
            .iter()
            .filter(|p| p.battle_id == battle_id)
            .cloned()
            .collect())
    }

    async fn record_submission(&self, new: NewSubmission) -> Result<Submission, ServiceError> {
        let mut state = self.state.lock().await;
        if state.submissions.iter().any(|s| {
            s.battle_id == new.battle_id
                && s.user_id == new.user_id
                && s.problem_id == new.problem_id
        }) {
            return Err(ServiceError::AlreadySubmitted);
        }
        let submission = Submission {
            submission_id: Uuid::new_v4(),
            battle_id: new.battle_id,
            user_id: new.user_id,
            problem_id: new.problem_id,
            solved: new.solved,
            time_taken_seconds: new.time_taken_seconds,
            submitted_at: chrono::Utc::now(),
        };
        state.submissions.push(submission.clone());
        Ok(submission)
    }

    async fn apply_solve(
        &self,
        participant_id: Uuid,
        problem_id: i32,
        points: i32,
    ) -> Result<(), ServiceError> {
        let mut state = self.state.lock().await;
        if let Some(participant) = state
            .participants
            .iter_mut()
            .find(|p| p.participant_id == participant_id)
            && !participant.problems_solved.contains(&problem_id)
        {
            participant.score += points;
            participant.problems_solved.push(problem_id);
        }
        Ok(())
    }

    async fn get_team(&self, team_id: Uuid) -> Result<Option<Team>, ServiceError> {
        Ok(self.state.lock().await.teams.get(&team_id).cloned())
    }

    async fn list_team_members(&self, team_id: Uuid) -> Result<Vec<TeamMember>, ServiceError> {
        let state = self.state.lock().await;
        Ok(state
            .members
            .iter()
            .filter(|m| m.team_id == team_id)
            .cloned()
            .collect())
    }

    async fn admit_team_member(
        &self,
        team_id: Uuid,
        user_id: Uuid,
    ) -> Result<TeamMember, ServiceError> {
        let mut state = self.state.lock().await;

        let team = state
            .teams
            .get(&team_id)
            .ok_or(ServiceError::NotFound("team"))?;
        let max = team.max_members as usize;

        let count = state.members.iter().filter(|m| m.team_id == team_id).count();
        if count >= max {
            return Err(ServiceError::CapacityExceeded("team"));
        }

        if state
            .members
            .iter()
            .any(|m| m.team_id == team_id && m.user_id == user_id)
        {
            return Err(ServiceError::AlreadyJoined("team"));
        }

        let member = TeamMember {
            team_member_id: Uuid::new_v4(),
            team_id,
            user_id,
            role: TeamRole::Member,
            points_contributed: 0,
            joined_at: chrono::Utc::now(),
        };
        state.members.push(member.clone());
        Ok(member)
    }

    async fn remove_team_member(&self, team_id: Uuid, user_id: Uuid) -> Result<(), ServiceError> {
        let mut state = self.state.lock().await;
        state
            .members
            .retain(|m| !(m.team_id == team_id && m.user_id == user_id));
        Ok(())
    }

    async fn update_team(&self, team_id: Uuid, update: TeamUpdate) -> Result<Team, ServiceError> {
        let mut state = self.state.lock().await;
        let team = state
            .teams
            .get_mut(&team_id)
            .ok_or(ServiceError::NotFound("team"))?;

        if let Some(name) = update.name {
            team.name = name;
        }
        if let Some(description) = update.description {
            team.description = Some(description);
        }
        if let Some(avatar) = update.avatar {
            team.avatar = avatar;
        }
        if let Some(max_members) = update.max_members {
            team.max_members = max_members;
        }
        if let Some(is_private) = update.is_private {
            team.is_private = is_private;
        }
        if let Some(invite_code) = update.invite_code {
            team.invite_code = Some(invite_code);
        }
        Ok(team.clone())
    }

    async fn delete_team(&self, team_id: Uuid) -> Result<(), ServiceError> {
        let mut state = self.state.lock().await;
        state
            .teams
            .remove(&team_id)
            .ok_or(ServiceError::NotFound("team"))?;
        state.members.retain(|m| m.team_id != team_id);
        Ok(())
    }
}

/// Fixed-map identity provider. Tokens resolve to user ids; profiles are
/// looked up by user id. Users in the `failing` set simulate an identity
/// service outage for partial-failure tests.
#[derive(Default)]
pub struct StaticIdentityProvider {
    tokens: HashMap<String, Uuid>,
    profiles: HashMap<Uuid, Profile>,
    failing: HashSet<Uuid>,
}

impl StaticIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, token: &str, user_id: Uuid) -> Self {
        self.tokens.insert(token.to_string(), user_id);
        self
    }

    pub fn with_profile(mut self, user_id: Uuid, name: &str, avatar: &str, points: i64) -> Self {
        self.profiles.insert(
            user_id,
            Profile {
                name: name.to_string(),
                avatar: avatar.to_string(),
                points,
            },
        );
        self
    }

    pub fn with_failing_profile(mut self, user_id: Uuid) -> Self {
        self.failing.insert(user_id);
        self
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    async fn current_user(&self, token: &str) -> Result<Option<Uuid>, ServiceError> {
        Ok(self.tokens.get(token).copied())
    }

    async fn get_profile(&self, user_id: Uuid) -> Result<Option<Profile>, ServiceError> {
        if self.failing.contains(&user_id) {
            return Err(ServiceError::Store(color_eyre::eyre::eyre!(
                "identity service unavailable"
            )));
        }
        Ok(self.profiles.get(&user_id).cloned())
    }
}
