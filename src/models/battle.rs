use std::fmt;

use color_eyre::eyre::Context as _;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "battle_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BattleStatus {
    Waiting,
    InProgress,
    Completed,
    Cancelled,
}

impl fmt::Display for BattleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BattleStatus::Waiting => "waiting",
            BattleStatus::InProgress => "in_progress",
            BattleStatus::Completed => "completed",
            BattleStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "battle_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BattleType {
    HeadToHead,
    Team,
    FreeForAll,
}

// Battle model
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Battle {
    pub battle_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub battle_type: BattleType,
    pub status: BattleStatus,
    pub problem_ids: Vec<i32>,
    pub max_participants: i32,
    pub duration_minutes: i32,
    pub created_by: Uuid,
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
    pub ended_at: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Battle {
    pub fn contains_problem(&self, problem_id: i32) -> bool {
        self.problem_ids.contains(&problem_id)
    }
}

// Participant: one per user per battle
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Participant {
    pub participant_id: Uuid,
    pub battle_id: Uuid,
    pub user_id: Uuid,
    pub team_id: Option<Uuid>,
    pub score: i32,
    pub problems_solved: Vec<i32>,
    pub rank: Option<i32>,
    pub joined_at: chrono::DateTime<chrono::Utc>,
}

// Submission: append-only record of a problem attempt within a battle
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Submission {
    pub submission_id: Uuid,
    pub battle_id: Uuid,
    pub user_id: Uuid,
    pub problem_id: i32,
    pub solved: bool,
    pub time_taken_seconds: Option<i32>,
    pub submitted_at: chrono::DateTime<chrono::Utc>,
}

// Battle listing row with its participant count
#[derive(Debug, Serialize, FromRow)]
pub struct BattleSummary {
    pub battle_id: Uuid,
    pub title: String,
    pub battle_type: BattleType,
    pub status: BattleStatus,
    pub max_participants: i32,
    pub duration_minutes: i32,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub participant_count: i64,
}

pub struct NewBattle {
    pub title: String,
    pub description: Option<String>,
    pub battle_type: BattleType,
    pub problem_ids: Vec<i32>,
    pub max_participants: i32,
    pub duration_minutes: i32,
    pub created_by: Uuid,
}

pub struct NewSubmission {
    pub battle_id: Uuid,
    pub user_id: Uuid,
    pub problem_id: i32,
    pub solved: bool,
    pub time_taken_seconds: Option<i32>,
}

/// Outcome of the atomic admission decision. Distinct from an error so the
/// storage layer can report exactly which precondition failed without losing
/// the underlying query errors.
#[derive(Debug)]
pub enum AdmissionOutcome {
    Admitted(Participant),
    BattleMissing,
    NotWaiting(BattleStatus),
    Full,
    AlreadyJoined,
}

const BATTLE_COLUMNS: &str = "battle_id, title, description, battle_type, status, problem_ids,
     max_participants, duration_minutes, created_by, started_at, ended_at, created_at";

const PARTICIPANT_COLUMNS: &str =
    "participant_id, battle_id, user_id, team_id, score, problems_solved, rank, joined_at";

// --- Battle queries ---
// Runtime sqlx::query_as (not the compile-time macros) so the crate builds
// without a live database or offline query cache.

pub async fn get_battle_by_id(pool: &PgPool, battle_id: Uuid) -> color_eyre::Result<Option<Battle>> {
    let row = sqlx::query_as::<_, Battle>(&format!(
        "SELECT {BATTLE_COLUMNS} FROM battles WHERE battle_id = $1"
    ))
    .bind(battle_id)
    .fetch_optional(pool)
    .await
    .wrap_err("Failed to fetch battle")?;

    Ok(row)
}

pub async fn list_battles(
    pool: &PgPool,
    status: Option<BattleStatus>,
) -> color_eyre::Result<Vec<BattleSummary>> {
    let rows = sqlx::query_as::<_, BattleSummary>(
        "SELECT
            b.battle_id, b.title, b.battle_type, b.status,
            b.max_participants, b.duration_minutes, b.created_at,
            COUNT(p.participant_id) AS participant_count
         FROM battles b
         LEFT JOIN battle_participants p ON p.battle_id = b.battle_id
         WHERE ($1::battle_status IS NULL OR b.status = $1)
         GROUP BY b.battle_id
         ORDER BY b.created_at DESC",
    )
    .bind(status)
    .fetch_all(pool)
    .await
    .wrap_err("Failed to list battles")?;

    Ok(rows)
}

pub async fn create_battle(pool: &PgPool, new: NewBattle) -> color_eyre::Result<Battle> {
    let battle = sqlx::query_as::<_, Battle>(&format!(
        "INSERT INTO battles
            (title, description, battle_type, problem_ids, max_participants,
             duration_minutes, created_by)
         VALUES ($1, $2, $3, $4, $5, $6, $7)
         RETURNING {BATTLE_COLUMNS}"
    ))
    .bind(new.title)
    .bind(new.description)
    .bind(new.battle_type)
    .bind(new.problem_ids)
    .bind(new.max_participants)
    .bind(new.duration_minutes)
    .bind(new.created_by)
    .fetch_one(pool)
    .await
    .wrap_err("Failed to create battle")?;

    Ok(battle)
}

/// Guarded waiting -> in_progress transition. Returns `None` when the battle
/// is missing or no longer in `waiting`; the guard lives in the WHERE clause
/// so the transition can never run backward.
pub async fn mark_started(pool: &PgPool, battle_id: Uuid) -> color_eyre::Result<Option<Battle>> {
    let battle = sqlx::query_as::<_, Battle>(&format!(
        "UPDATE battles
         SET status = 'in_progress', started_at = NOW()
         WHERE battle_id = $1 AND status = 'waiting'
         RETURNING {BATTLE_COLUMNS}"
    ))
    .bind(battle_id)
    .fetch_optional(pool)
    .await
    .wrap_err("Failed to start battle")?;

    Ok(battle)
}

// --- Participant queries ---

pub async fn count_participants(pool: &PgPool, battle_id: Uuid) -> color_eyre::Result<i64> {
    let row: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM battle_participants WHERE battle_id = $1")
            .bind(battle_id)
            .fetch_one(pool)
            .await
            .wrap_err("Failed to count participants")?;

    Ok(row.0)
}

pub async fn get_participant(
    pool: &PgPool,
    battle_id: Uuid,
    user_id: Uuid,
) -> color_eyre::Result<Option<Participant>> {
    let row = sqlx::query_as::<_, Participant>(&format!(
        "SELECT {PARTICIPANT_COLUMNS}
         FROM battle_participants
         WHERE battle_id = $1 AND user_id = $2"
    ))
    .bind(battle_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .wrap_err("Failed to fetch participant")?;

    Ok(row)
}

pub async fn list_participants(
    pool: &PgPool,
    battle_id: Uuid,
) -> color_eyre::Result<Vec<Participant>> {
    let rows = sqlx::query_as::<_, Participant>(&format!(
        "SELECT {PARTICIPANT_COLUMNS}
         FROM battle_participants
         WHERE battle_id = $1"
    ))
    .bind(battle_id)
    .fetch_all(pool)
    .await
    .wrap_err("Failed to list participants")?;

    Ok(rows)
}

/// Atomic admission: capacity check, uniqueness check, and insert run in one
/// transaction holding a row lock on the battle, so concurrent joins for the
/// same battle serialize. The (battle_id, user_id) unique constraint backs
/// the uniqueness check even against rows inserted outside this path.
pub async fn admit_participant(
    pool: &PgPool,
    battle_id: Uuid,
    user_id: Uuid,
    team_id: Option<Uuid>,
) -> color_eyre::Result<AdmissionOutcome> {
    let mut tx = pool.begin().await.wrap_err("Failed to begin admission")?;

    let battle = sqlx::query_as::<_, Battle>(&format!(
        "SELECT {BATTLE_COLUMNS} FROM battles WHERE battle_id = $1 FOR UPDATE"
    ))
    .bind(battle_id)
    .fetch_optional(&mut *tx)
    .await
    .wrap_err("Failed to lock battle for admission")?;

    let Some(battle) = battle else {
        return Ok(AdmissionOutcome::BattleMissing);
    };

    if battle.status != BattleStatus::Waiting {
        return Ok(AdmissionOutcome::NotWaiting(battle.status));
    }

    let count: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM battle_participants WHERE battle_id = $1")
            .bind(battle_id)
            .fetch_one(&mut *tx)
            .await
            .wrap_err("Failed to count participants for admission")?;

    if count.0 >= i64::from(battle.max_participants) {
        return Ok(AdmissionOutcome::Full);
    }

    let participant = sqlx::query_as::<_, Participant>(&format!(
        "INSERT INTO battle_participants (battle_id, user_id, team_id)
         VALUES ($1, $2, $3)
         ON CONFLICT (battle_id, user_id) DO NOTHING
         RETURNING {PARTICIPANT_COLUMNS}"
    ))
    .bind(battle_id)
    .bind(user_id)
    .bind(team_id)
    .fetch_optional(&mut *tx)
    .await
    .wrap_err("Failed to insert participant")?;

    match participant {
        Some(participant) => {
            tx.commit().await.wrap_err("Failed to commit admission")?;
            Ok(AdmissionOutcome::Admitted(participant))
        }
        None => Ok(AdmissionOutcome::AlreadyJoined),
    }
}

/// Credit a solve: bump the score and append the problem to the solved set.
/// The array guard keeps a problem from being counted twice.
pub async fn apply_solve(
    pool: &PgPool,
    participant_id: Uuid,
    problem_id: i32,
    points: i32,
) -> color_eyre::Result<()> {
    sqlx::query(
        "UPDATE battle_participants
         SET score = score + $2, problems_solved = array_append(problems_solved, $3)
         WHERE participant_id = $1 AND NOT (problems_solved @> ARRAY[$3])",
    )
    .bind(participant_id)
    .bind(points)
    .bind(problem_id)
    .execute(pool)
    .await
    .wrap_err("Failed to apply solve")?;

    Ok(())
}

// --- Submission queries ---

/// Append-only insert; returns `None` when the (battle, user, problem) triple
/// already has a submission.
pub async fn record_submission(
    pool: &PgPool,
    new: NewSubmission,
) -> color_eyre::Result<Option<Submission>> {
    let submission = sqlx::query_as::<_, Submission>(
        "INSERT INTO battle_submissions
            (battle_id, user_id, problem_id, solved, time_taken_seconds)
         VALUES ($1, $2, $3, $4, $5)
         ON CONFLICT (battle_id, user_id, problem_id) DO NOTHING
         RETURNING submission_id, battle_id, user_id, problem_id, solved,
                   time_taken_seconds, submitted_at",
    )
    .bind(new.battle_id)
    .bind(new.user_id)
    .bind(new.problem_id)
    .bind(new.solved)
    .bind(new.time_taken_seconds)
    .fetch_optional(pool)
    .await
    .wrap_err("Failed to record submission")?;

    Ok(submission)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_display_matches_wire_format() {
        assert_eq!(BattleStatus::Waiting.to_string(), "waiting");
        assert_eq!(BattleStatus::InProgress.to_string(), "in_progress");
        assert_eq!(
            serde_json::to_string(&BattleStatus::InProgress).unwrap(),
            "\"in_progress\""
        );
        assert_eq!(
            serde_json::from_str::<BattleType>("\"free_for_all\"").unwrap(),
            BattleType::FreeForAll
        );
    }

    #[test]
    fn contains_problem_checks_declared_set() {
        let battle = Battle {
            battle_id: Uuid::new_v4(),
            title: "test".to_string(),
            description: None,
            battle_type: BattleType::HeadToHead,
            status: BattleStatus::Waiting,
            problem_ids: vec![11, 42],
            max_participants: 2,
            duration_minutes: 30,
            created_by: Uuid::new_v4(),
            started_at: None,
            ended_at: None,
            created_at: chrono::Utc::now(),
        };
        assert!(battle.contains_problem(42));
        assert!(!battle.contains_problem(7));
    }
}
