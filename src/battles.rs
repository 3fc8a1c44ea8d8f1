//! Battle lifecycle: admission, leaderboard assembly, start transition, and
//! submission scoring.

use serde::Serialize;
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::models::battle::{
    Battle, BattleStatus, BattleType, NewBattle, NewSubmission, Participant, Submission,
};
use crate::scoring;
use crate::store::{BattleStore, IdentityProvider, Profile};

pub const DEFAULT_MAX_PARTICIPANTS: i32 = 2;
pub const DEFAULT_DURATION_MINUTES: i32 = 30;

/// Join a battle. Precondition order is part of the contract: missing battle,
/// then lifecycle state, then capacity, then uniqueness. The store's
/// admission operation re-verifies all of them atomically, so two concurrent
/// calls for the last slot can never both succeed.
pub async fn join_battle(
    store: &dyn BattleStore,
    battle_id: Uuid,
    user_id: Uuid,
) -> Result<Participant, ServiceError> {
    let battle = store
        .get_battle(battle_id)
        .await?
        .ok_or(ServiceError::NotFound("battle"))?;

    if battle.status != BattleStatus::Waiting {
        return Err(ServiceError::battle_not_joinable(battle.status));
    }

    let participant = store.admit_participant(battle_id, user_id, None).await?;
    tracing::info!(
        battle_id = %battle_id,
        user_id = %user_id,
        "participant admitted to battle"
    );
    Ok(participant)
}

pub struct CreateBattleParams {
    pub title: String,
    pub description: Option<String>,
    pub battle_type: Option<BattleType>,
    pub problem_ids: Vec<i32>,
    pub max_participants: Option<i32>,
    pub duration_minutes: Option<i32>,
}

/// Create a battle in `waiting` and admit the creator through the regular
/// admission path. A failed auto-join leaves the battle standing.
pub async fn create_battle(
    store: &dyn BattleStore,
    user_id: Uuid,
    params: CreateBattleParams,
) -> Result<Battle, ServiceError> {
    let max_participants = params.max_participants.unwrap_or(DEFAULT_MAX_PARTICIPANTS);
    if max_participants < 1 {
        return Err(ServiceError::InvalidState(
            "max_participants must be at least 1",
        ));
    }

    let battle = store
        .create_battle(NewBattle {
            title: params.title,
            description: params.description,
            battle_type: params.battle_type.unwrap_or(BattleType::HeadToHead),
            problem_ids: params.problem_ids,
            max_participants,
            duration_minutes: params.duration_minutes.unwrap_or(DEFAULT_DURATION_MINUTES),
            created_by: user_id,
        })
        .await?;

    if let Err(e) = store
        .admit_participant(battle.battle_id, user_id, None)
        .await
    {
        tracing::warn!(
            battle_id = %battle.battle_id,
            user_id = %user_id,
            error = %e,
            "creator auto-join failed"
        );
    }

    tracing::info!(battle_id = %battle.battle_id, "battle created");
    Ok(battle)
}

/// Creator-only waiting -> in_progress transition.
pub async fn start_battle(
    store: &dyn BattleStore,
    battle_id: Uuid,
    user_id: Uuid,
) -> Result<Battle, ServiceError> {
    let battle = store
        .get_battle(battle_id)
        .await?
        .ok_or(ServiceError::NotFound("battle"))?;

    if battle.created_by != user_id {
        return Err(ServiceError::Forbidden(
            "only the battle creator can start it",
        ));
    }

    // The guarded update loses a race against a concurrent start; report that
    // the same way as a battle found already started.
    store
        .mark_started(battle_id)
        .await?
        .ok_or(ServiceError::InvalidState("battle already started"))
}

pub struct SubmitParams {
    pub problem_id: i32,
    pub solved: bool,
    pub time_taken_seconds: Option<i32>,
}

/// Record an append-only submission and credit the score on a solve.
pub async fn submit_solution(
    store: &dyn BattleStore,
    battle_id: Uuid,
    user_id: Uuid,
    params: SubmitParams,
) -> Result<Submission, ServiceError> {
    let battle = store
        .get_battle(battle_id)
        .await?
        .ok_or(ServiceError::NotFound("battle"))?;

    if battle.status != BattleStatus::InProgress {
        return Err(ServiceError::InvalidState("battle not in progress"));
    }

    if !battle.contains_problem(params.problem_id) {
        return Err(ServiceError::InvalidState(
            "problem is not part of this battle",
        ));
    }

    let participant = store
        .get_participant(battle_id, user_id)
        .await?
        .ok_or(ServiceError::Forbidden("not a participant in this battle"))?;

    let submission = store
        .record_submission(NewSubmission {
            battle_id,
            user_id,
            problem_id: params.problem_id,
            solved: params.solved,
            time_taken_seconds: params.time_taken_seconds,
        })
        .await?;

    if submission.solved {
        let points = scoring::solve_points(submission.time_taken_seconds);
        store
            .apply_solve(participant.participant_id, submission.problem_id, points)
            .await?;
        tracing::info!(
            battle_id = %battle_id,
            user_id = %user_id,
            problem_id = submission.problem_id,
            points,
            "solve credited"
        );
    }

    Ok(submission)
}

/// A participant in leaderboard order, joined with profile attributes. The
/// profile fields stay null when the identity lookup fails or the user has no
/// profile.
#[derive(Debug, Serialize)]
pub struct RankedParticipant {
    pub rank: usize,
    pub participant_id: Uuid,
    pub user_id: Uuid,
    pub team_id: Option<Uuid>,
    pub score: i32,
    pub problems_solved: Vec<i32>,
    pub joined_at: chrono::DateTime<chrono::Utc>,
    pub name: Option<String>,
    pub avatar: Option<String>,
    pub points: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct BattleView {
    pub battle: Battle,
    pub participants: Vec<RankedParticipant>,
}

/// Leaderboard order: score descending, earlier joiners first on a tie.
/// Computed here rather than trusted from storage, where ordering is not
/// guaranteed stable.
pub fn rank_participants(mut participants: Vec<Participant>) -> Vec<Participant> {
    participants.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| a.joined_at.cmp(&b.joined_at))
    });
    participants
}

/// Assemble the ranked, profile-enriched view of a battle.
pub async fn battle_view(
    store: &dyn BattleStore,
    identity: &dyn IdentityProvider,
    battle_id: Uuid,
) -> Result<BattleView, ServiceError> {
    let battle = store
        .get_battle(battle_id)
        .await?
        .ok_or(ServiceError::NotFound("battle"))?;

    let ranked = rank_participants(store.list_participants(battle_id).await?);

    let profiles: Vec<Option<Profile>> =
        futures::future::join_all(ranked.iter().map(|p| lookup_profile(identity, p.user_id)))
            .await;

    let participants = ranked
        .into_iter()
        .zip(profiles)
        .enumerate()
        .map(|(i, (p, profile))| RankedParticipant {
            rank: i + 1,
            participant_id: p.participant_id,
            user_id: p.user_id,
            team_id: p.team_id,
            score: p.score,
            problems_solved: p.problems_solved,
            joined_at: p.joined_at,
            name: profile.as_ref().map(|pr| pr.name.clone()),
            avatar: profile.as_ref().map(|pr| pr.avatar.clone()),
            points: profile.as_ref().map(|pr| pr.points),
        })
        .collect();

    Ok(BattleView {
        battle,
        participants,
    })
}

/// A failed profile lookup degrades to missing attributes instead of failing
/// the whole view.
pub(crate) async fn lookup_profile(
    identity: &dyn IdentityProvider,
    user_id: Uuid,
) -> Option<Profile> {
    match identity.get_profile(user_id).await {
        Ok(profile) => profile,
        Err(e) => {
            tracing::warn!(user_id = %user_id, error = %e, "profile lookup failed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use proptest::prelude::*;

    use super::*;

    fn participant(score: i32, joined_offset_secs: i64) -> Participant {
        Participant {
            participant_id: Uuid::new_v4(),
            battle_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            team_id: None,
            score,
            problems_solved: vec![],
            rank: None,
            joined_at: Utc::now() + Duration::seconds(joined_offset_secs),
        }
    }

    #[test]
    fn ranks_by_score_then_join_time() {
        // Scores [10, 30, 30, 5] joined at increasing timestamps: the
        // earlier of the two 30s must come first.
        let a = participant(10, 0);
        let b = participant(30, 1);
        let c = participant(30, 2);
        let d = participant(5, 3);
        let first_thirty = b.participant_id;

        let ranked = rank_participants(vec![a, b, c, d]);
        let scores: Vec<i32> = ranked.iter().map(|p| p.score).collect();
        assert_eq!(scores, vec![30, 30, 10, 5]);
        assert_eq!(ranked[0].participant_id, first_thirty);
    }

    #[test]
    fn empty_input_is_fine() {
        assert!(rank_participants(vec![]).is_empty());
    }

    proptest! {
        #[test]
        fn prop_ordering_is_score_desc_then_joined_asc(
            entries in prop::collection::vec((0i32..1000, -10_000i64..10_000), 0..50)
        ) {
            let participants: Vec<Participant> = entries
                .into_iter()
                .map(|(score, offset)| participant(score, offset))
                .collect();
            let ranked = rank_participants(participants);

            for pair in ranked.windows(2) {
                prop_assert!(pair[0].score >= pair[1].score);
                if pair[0].score == pair[1].score {
                    prop_assert!(pair[0].joined_at <= pair[1].joined_at);
                }
            }
        }

        #[test]
        fn prop_ordering_preserves_membership(
            entries in prop::collection::vec((0i32..1000, -10_000i64..10_000), 0..50)
        ) {
            let participants: Vec<Participant> = entries
                .into_iter()
                .map(|(score, offset)| participant(score, offset))
                .collect();
            let mut before: Vec<Uuid> =
                participants.iter().map(|p| p.participant_id).collect();
            let mut after: Vec<Uuid> = rank_participants(participants)
                .iter()
                .map(|p| p.participant_id)
                .collect();
            before.sort();
            after.sort();
            prop_assert_eq!(before, after);
        }
    }
}
