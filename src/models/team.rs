use color_eyre::eyre::Context as _;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "team_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TeamRole {
    Owner,
    Admin,
    Member,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Team {
    pub team_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub avatar: String,
    pub owner_id: Uuid,
    pub max_members: i32,
    pub is_private: bool,
    #[serde(skip_serializing, default)]
    pub invite_code: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TeamMember {
    pub team_member_id: Uuid,
    pub team_id: Uuid,
    pub user_id: Uuid,
    pub role: TeamRole,
    pub points_contributed: i32,
    pub joined_at: chrono::DateTime<chrono::Utc>,
}

/// Field set for a partial team update; `None` leaves the column untouched.
#[derive(Debug, Default)]
pub struct TeamUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub avatar: Option<String>,
    pub max_members: Option<i32>,
    pub is_private: Option<bool>,
    pub invite_code: Option<String>,
}

/// Outcome of the atomic team-membership admission, mirroring battle
/// admission.
#[derive(Debug)]
pub enum TeamAdmission {
    Admitted(TeamMember),
    TeamMissing,
    Full,
    AlreadyMember,
}

const TEAM_COLUMNS: &str = "team_id, name, description, avatar, owner_id, max_members,
     is_private, invite_code, created_at";

const MEMBER_COLUMNS: &str =
    "team_member_id, team_id, user_id, role, points_contributed, joined_at";

pub async fn get_team_by_id(pool: &PgPool, team_id: Uuid) -> color_eyre::Result<Option<Team>> {
    let row = sqlx::query_as::<_, Team>(&format!(
        "SELECT {TEAM_COLUMNS} FROM teams WHERE team_id = $1"
    ))
    .bind(team_id)
    .fetch_optional(pool)
    .await
    .wrap_err("Failed to fetch team")?;

    Ok(row)
}

pub async fn list_team_members(
    pool: &PgPool,
    team_id: Uuid,
) -> color_eyre::Result<Vec<TeamMember>> {
    let rows = sqlx::query_as::<_, TeamMember>(&format!(
        "SELECT {MEMBER_COLUMNS}
         FROM team_members
         WHERE team_id = $1
         ORDER BY joined_at ASC"
    ))
    .bind(team_id)
    .fetch_all(pool)
    .await
    .wrap_err("Failed to list team members")?;

    Ok(rows)
}

/// Atomic membership admission under a row lock on the team, same shape as
/// battle admission: capacity then uniqueness, backed by the
/// (team_id, user_id) unique constraint.
pub async fn admit_member(
    pool: &PgPool,
    team_id: Uuid,
    user_id: Uuid,
) -> color_eyre::Result<TeamAdmission> {
    let mut tx = pool.begin().await.wrap_err("Failed to begin admission")?;

    let team = sqlx::query_as::<_, Team>(&format!(
        "SELECT {TEAM_COLUMNS} FROM teams WHERE team_id = $1 FOR UPDATE"
    ))
    .bind(team_id)
    .fetch_optional(&mut *tx)
    .await
    .wrap_err("Failed to lock team for admission")?;

    let Some(team) = team else {
        return Ok(TeamAdmission::TeamMissing);
    };

    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM team_members WHERE team_id = $1")
        .bind(team_id)
        .fetch_one(&mut *tx)
        .await
        .wrap_err("Failed to count team members")?;

    if count.0 >= i64::from(team.max_members) {
        return Ok(TeamAdmission::Full);
    }

    let member = sqlx::query_as::<_, TeamMember>(&format!(
        "INSERT INTO team_members (team_id, user_id, role)
         VALUES ($1, $2, 'member')
         ON CONFLICT (team_id, user_id) DO NOTHING
         RETURNING {MEMBER_COLUMNS}"
    ))
    .bind(team_id)
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await
    .wrap_err("Failed to insert team member")?;

    match member {
        Some(member) => {
            tx.commit().await.wrap_err("Failed to commit admission")?;
            Ok(TeamAdmission::Admitted(member))
        }
        None => Ok(TeamAdmission::AlreadyMember),
    }
}

/// Partial update: `None` fields keep their current value.
pub async fn update_team(
    pool: &PgPool,
    team_id: Uuid,
    update: TeamUpdate,
) -> color_eyre::Result<Option<Team>> {
    let team = sqlx::query_as::<_, Team>(&format!(
        "UPDATE teams
         SET name = COALESCE($2, name),
             description = COALESCE($3, description),
             avatar = COALESCE($4, avatar),
             max_members = COALESCE($5, max_members),
             is_private = COALESCE($6, is_private),
             invite_code = COALESCE($7, invite_code)
         WHERE team_id = $1
         RETURNING {TEAM_COLUMNS}"
    ))
    .bind(team_id)
    .bind(update.name)
    .bind(update.description)
    .bind(update.avatar)
    .bind(update.max_members)
    .bind(update.is_private)
    .bind(update.invite_code)
    .fetch_optional(pool)
    .await
    .wrap_err("Failed to update team")?;

    Ok(team)
}

/// Membership rows go with the team via the ON DELETE CASCADE foreign key.
pub async fn delete_team(pool: &PgPool, team_id: Uuid) -> color_eyre::Result<bool> {
    let result = sqlx::query("DELETE FROM teams WHERE team_id = $1")
        .bind(team_id)
        .execute(pool)
        .await
        .wrap_err("Failed to delete team")?;

    Ok(result.rows_affected() > 0)
}

/// Idempotent: removing a membership that does not exist is a success.
pub async fn remove_member(pool: &PgPool, team_id: Uuid, user_id: Uuid) -> color_eyre::Result<()> {
    sqlx::query("DELETE FROM team_members WHERE team_id = $1 AND user_id = $2")
        .bind(team_id)
        .bind(user_id)
        .execute(pool)
        .await
        .wrap_err("Failed to remove team member")?;

    Ok(())
}
