//! Team flows: the profile-joined team view, invite-gated join, the
//! idempotent leave, and the owner-only update and delete.

use serde::Serialize;
use uuid::Uuid;

use crate::battles::lookup_profile;
use crate::errors::ServiceError;
use crate::models::team::{Team, TeamMember, TeamRole, TeamUpdate};
use crate::store::{BattleStore, IdentityProvider, Profile};

#[derive(Debug, Serialize)]
pub struct TeamMemberView {
    pub team_member_id: Uuid,
    pub user_id: Uuid,
    pub role: TeamRole,
    pub points_contributed: i32,
    pub joined_at: chrono::DateTime<chrono::Utc>,
    pub name: Option<String>,
    pub avatar: Option<String>,
    pub points: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct TeamView {
    pub team: Team,
    pub members: Vec<TeamMemberView>,
}

/// Team with members joined against profile attributes; a failed lookup
/// leaves that member's fields null.
pub async fn team_view(
    store: &dyn BattleStore,
    identity: &dyn IdentityProvider,
    team_id: Uuid,
) -> Result<TeamView, ServiceError> {
    let team = store
        .get_team(team_id)
        .await?
        .ok_or(ServiceError::NotFound("team"))?;

    let members = store.list_team_members(team_id).await?;
    let profiles: Vec<Option<Profile>> =
        futures::future::join_all(members.iter().map(|m| lookup_profile(identity, m.user_id)))
            .await;

    let members = members
        .into_iter()
        .zip(profiles)
        .map(|(m, profile)| TeamMemberView {
            team_member_id: m.team_member_id,
            user_id: m.user_id,
            role: m.role,
            points_contributed: m.points_contributed,
            joined_at: m.joined_at,
            name: profile.as_ref().map(|p| p.name.clone()),
            avatar: profile.as_ref().map(|p| p.avatar.clone()),
            points: profile.as_ref().map(|p| p.points),
        })
        .collect();

    Ok(TeamView { team, members })
}

/// Join a team. Private teams require the matching invite code; capacity and
/// uniqueness are decided atomically by the store.
pub async fn join_team(
    store: &dyn BattleStore,
    team_id: Uuid,
    user_id: Uuid,
    invite_code: Option<&str>,
) -> Result<TeamMember, ServiceError> {
    let team = store
        .get_team(team_id)
        .await?
        .ok_or(ServiceError::NotFound("team"))?;

    if team.is_private && team.invite_code.as_deref() != invite_code {
        return Err(ServiceError::Forbidden("invalid invite code"));
    }

    let member = store.admit_team_member(team_id, user_id).await?;
    tracing::info!(team_id = %team_id, user_id = %user_id, "member joined team");
    Ok(member)
}

pub struct UpdateTeamParams {
    pub name: Option<String>,
    pub description: Option<String>,
    pub avatar: Option<String>,
    pub max_members: Option<i32>,
    pub is_private: Option<bool>,
    pub invite_code: Option<String>,
}

/// Owner-only partial update. Omitted fields keep their current value.
pub async fn update_team(
    store: &dyn BattleStore,
    team_id: Uuid,
    user_id: Uuid,
    params: UpdateTeamParams,
) -> Result<Team, ServiceError> {
    let team = store
        .get_team(team_id)
        .await?
        .ok_or(ServiceError::NotFound("team"))?;

    if team.owner_id != user_id {
        return Err(ServiceError::Forbidden("only the team owner can update it"));
    }

    if let Some(max_members) = params.max_members
        && max_members < 1
    {
        return Err(ServiceError::InvalidState("max_members must be at least 1"));
    }

    let team = store
        .update_team(
            team_id,
            TeamUpdate {
                name: params.name,
                description: params.description,
                avatar: params.avatar,
                max_members: params.max_members,
                is_private: params.is_private,
                invite_code: params.invite_code,
            },
        )
        .await?;
    tracing::info!(team_id = %team_id, "team updated");
    Ok(team)
}

/// Owner-only delete; membership rows go with the team.
pub async fn delete_team(
    store: &dyn BattleStore,
    team_id: Uuid,
    user_id: Uuid,
) -> Result<(), ServiceError> {
    let team = store
        .get_team(team_id)
        .await?
        .ok_or(ServiceError::NotFound("team"))?;

    if team.owner_id != user_id {
        return Err(ServiceError::Forbidden("only the team owner can delete it"));
    }

    store.delete_team(team_id).await?;
    tracing::info!(team_id = %team_id, "team deleted");
    Ok(())
}

/// Leave a team. Owners cannot leave; they transfer ownership or delete the
/// team instead. Leaving a team the user is not in succeeds (idempotent).
pub async fn leave_team(
    store: &dyn BattleStore,
    team_id: Uuid,
    user_id: Uuid,
) -> Result<(), ServiceError> {
    let team = store
        .get_team(team_id)
        .await?
        .ok_or(ServiceError::NotFound("team"))?;

    if team.owner_id == user_id {
        return Err(ServiceError::Forbidden(
            "team owner cannot leave; transfer ownership or delete the team",
        ));
    }

    store.remove_team_member(team_id, user_id).await?;
    tracing::info!(team_id = %team_id, user_id = %user_id, "member left team");
    Ok(())
}
