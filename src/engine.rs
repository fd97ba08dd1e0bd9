use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use rand::Rng;
use rand::seq::SliceRandom;
use serde::Serialize;
use tracing::{info, warn};

use crate::errors::DrawError;
use crate::slots::SlotAccountant;
use crate::store::Store;
use crate::types::{
    Draw, DrawMode, NewDraw, NewWinner, Participant, PrizeStatus, Winner, WinnerDetail,
    WinnerPatch,
};
use crate::utils::now_seconds;

#[derive(Debug, Clone)]
pub struct DrawPolicy {
    /// Whether a participant who already won in this contest stays in the
    /// pool for later draws. The admin app historically allowed repeats.
    pub allow_repeat_winners: bool,
}

impl Default for DrawPolicy {
    fn default() -> Self {
        DrawPolicy {
            allow_repeat_winners: true,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DrawOutcome {
    pub draw: Draw,
    pub winners: Vec<WinnerDetail>,
}

/// Runs one draw attempt end to end: validates the request against the
/// eligible pool and the remaining prize slots, shuffles, then records the
/// draw and its winners. Validation failures leave no trace in the store.
pub struct DrawEngine<S: Store> {
    store: Arc<S>,
    accountant: SlotAccountant<S>,
    policy: DrawPolicy,
}

impl<S: Store> DrawEngine<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self::with_policy(store, DrawPolicy::default())
    }

    pub fn with_policy(store: Arc<S>, policy: DrawPolicy) -> Self {
        let accountant = SlotAccountant::new(Arc::clone(&store));
        Self {
            store,
            accountant,
            policy,
        }
    }

    pub async fn execute_draw(
        &self,
        contest_id: i64,
        executed_by: &str,
        winner_count: usize,
        prize_ids: Option<&[i64]>,
    ) -> Result<DrawOutcome, DrawError> {
        self.execute_draw_with_rng(
            contest_id,
            executed_by,
            winner_count,
            prize_ids,
            &mut rand::thread_rng(),
        )
        .await
    }

    pub async fn execute_draw_with_rng<R: Rng>(
        &self,
        contest_id: i64,
        executed_by: &str,
        winner_count: usize,
        prize_ids: Option<&[i64]>,
        rng: &mut R,
    ) -> Result<DrawOutcome, DrawError> {
        let mut pool = self.store.list_validated_participants(contest_id)?;
        if !self.policy.allow_repeat_winners {
            let previous: HashSet<i64> = self
                .store
                .list_winners(contest_id)?
                .iter()
                .map(|w| w.participant_id)
                .collect();
            pool.retain(|p| !previous.contains(&p.id));
        }

        if let Err(e) = self.validate(contest_id, winner_count, &pool, prize_ids).await {
            warn!("draw rejected for contest {}: {}", contest_id, e);
            return Err(e);
        }

        let mut shuffled = pool.clone();
        shuffled.shuffle(rng);
        let selected = &shuffled[..winner_count];

        // the draw row must exist before any winner can reference it
        let draw = self
            .store
            .insert_draw(&NewDraw {
                contest_id,
                draw_mode: DrawMode::Random,
                executed_by: executed_by.to_string(),
                executed_at: now_seconds(),
                total_winners: winner_count as i64,
            })
            .map_err(DrawError::DrawInsertFailed)?;

        let new_winners: Vec<NewWinner> = selected
            .iter()
            .enumerate()
            .map(|(i, participant)| NewWinner {
                draw_id: draw.id,
                participant_id: participant.id,
                prize_id: prize_ids.and_then(|ids| ids.get(i).copied()),
            })
            .collect();

        let winners = self
            .store
            .insert_winners(&new_winners)
            .map_err(|source| DrawError::PartialPersistence {
                draw_id: draw.id,
                source,
            })?;

        info!(
            "draw {} recorded {} winner(s) for contest {}",
            draw.id, draw.total_winners, contest_id
        );

        Ok(DrawOutcome {
            winners: self.join_for_display(contest_id, selected, winners)?,
            draw,
        })
    }

    // Every precondition fails fast with its own error kind, before any
    // write is issued.
    async fn validate(
        &self,
        contest_id: i64,
        winner_count: usize,
        pool: &[Participant],
        prize_ids: Option<&[i64]>,
    ) -> Result<(), DrawError> {
        if winner_count < 1 {
            return Err(DrawError::InvalidWinnerCount(winner_count));
        }
        if pool.is_empty() {
            return Err(DrawError::NoEligibleParticipants);
        }
        if winner_count > pool.len() {
            return Err(DrawError::RequestExceedsPool {
                requested: winner_count,
                pool: pool.len(),
            });
        }

        let slots = self.accountant.remaining_slots(contest_id).await?;
        if slots.total_remaining <= 0 {
            return Err(DrawError::NoSlotsRemaining);
        }
        if let Some(prize_ids) = prize_ids {
            // only the first winner_count entries will be assigned
            let mut demanded: HashMap<i64, i64> = HashMap::new();
            for prize_id in prize_ids.iter().take(winner_count) {
                *demanded.entry(*prize_id).or_insert(0) += 1;
            }
            for (prize_id, requested) in demanded {
                let remaining = slots.per_prize_remaining.get(&prize_id).copied().unwrap_or(0);
                if requested > remaining {
                    return Err(DrawError::PrizeExhausted {
                        prize_id,
                        requested,
                        remaining,
                    });
                }
            }
        }
        Ok(())
    }

    fn join_for_display(
        &self,
        contest_id: i64,
        selected: &[Participant],
        winners: Vec<Winner>,
    ) -> Result<Vec<WinnerDetail>, DrawError> {
        let prize_names: HashMap<i64, String> = self
            .store
            .list_prizes(contest_id)?
            .into_iter()
            .map(|p| (p.id, p.name))
            .collect();
        let participants: HashMap<i64, &Participant> =
            selected.iter().map(|p| (p.id, p)).collect();

        Ok(winners
            .into_iter()
            .map(|winner| {
                let participant = participants.get(&winner.participant_id);
                WinnerDetail {
                    participant_name: participant.map(|p| p.name.clone()).unwrap_or_default(),
                    participant_contact: participant
                        .map(|p| p.contact.clone())
                        .unwrap_or_default(),
                    prize_name: winner
                        .prize_id
                        .and_then(|id| prize_names.get(&id).cloned()),
                    winner,
                }
            })
            .collect())
    }

    /// Idempotent: a winner already notified is returned unchanged.
    pub async fn mark_notified(&self, winner_id: i64) -> Result<Winner, DrawError> {
        let winner = self.store.get_winner(winner_id)?;
        if winner.notified {
            return Ok(winner);
        }

        let patch = WinnerPatch {
            notified: Some(true),
            notified_at: Some(now_seconds()),
            ..WinnerPatch::default()
        };
        Ok(self.store.update_winner(winner_id, &patch)?)
    }

    /// Fulfilment status only moves forward; re-applying the current status
    /// is allowed.
    pub async fn update_prize_status(
        &self,
        winner_id: i64,
        new_status: PrizeStatus,
    ) -> Result<Winner, DrawError> {
        let winner = self.store.get_winner(winner_id)?;
        if new_status.rank() < winner.prize_status.rank() {
            return Err(DrawError::InvalidStatusTransition {
                from: winner.prize_status,
                to: new_status,
            });
        }

        let patch = WinnerPatch {
            prize_status: Some(new_status),
            ..WinnerPatch::default()
        };
        Ok(self.store.update_winner(winner_id, &patch)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::SqliteStore;
    use crate::errors::DrawError;
    use crate::types::{ApprovalStatus, ContestStatus, NewContest};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn seed_contest(store: &SqliteStore, validated: usize, unvalidated: usize) -> i64 {
        let contest = store
            .insert_contest(&NewContest {
                name: "Year End Draw".to_string(),
                theme: "year-end".to_string(),
                description: String::new(),
                start_time: Some("2025-01-01T09:00".to_string()),
                end_time: Some("2025-12-31T18:00".to_string()),
                status: ContestStatus::Ongoing,
                approval_status: ApprovalStatus::Approved,
            })
            .unwrap();
        for i in 0..validated {
            store
                .insert_participant(
                    contest.id,
                    &format!("member-{}", i),
                    &format!("member-{}@example.com", i),
                    true,
                )
                .unwrap();
        }
        for i in 0..unvalidated {
            store
                .insert_participant(
                    contest.id,
                    &format!("pending-{}", i),
                    &format!("pending-{}@example.com", i),
                    false,
                )
                .unwrap();
        }
        contest.id
    }

    #[tokio::test]
    async fn draw_allocates_prizes_and_exhausts_slots() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let contest_id = seed_contest(&store, 5, 0);
        let prize = store.insert_prize(contest_id, "Gift Card", 2, 50.0).unwrap();

        let engine = DrawEngine::new(Arc::clone(&store));
        let mut rng = StdRng::seed_from_u64(11);
        let outcome = engine
            .execute_draw_with_rng(contest_id, "admin", 2, Some(&[prize.id, prize.id]), &mut rng)
            .await
            .unwrap();

        assert_eq!(outcome.draw.total_winners, 2);
        assert_eq!(outcome.winners.len(), 2);

        let mut participant_ids = HashSet::new();
        for detail in &outcome.winners {
            assert_eq!(detail.winner.draw_id, outcome.draw.id);
            assert_eq!(detail.winner.prize_id, Some(prize.id));
            assert_eq!(detail.winner.prize_status, PrizeStatus::Pending);
            assert!(!detail.winner.notified);
            assert_eq!(detail.prize_name.as_deref(), Some("Gift Card"));
            participant_ids.insert(detail.winner.participant_id);
        }
        assert_eq!(participant_ids.len(), 2);

        let report = SlotAccountant::new(Arc::clone(&store))
            .remaining_slots(contest_id)
            .await
            .unwrap();
        assert_eq!(report.per_prize_remaining[&prize.id], 0);
        assert_eq!(report.total_remaining, 0);
    }

    #[tokio::test]
    async fn exhausted_prize_rejects_the_draw_before_writing() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let contest_id = seed_contest(&store, 5, 0);
        let prize = store.insert_prize(contest_id, "Gift Card", 2, 50.0).unwrap();

        let engine = DrawEngine::new(Arc::clone(&store));
        let err = engine
            .execute_draw(contest_id, "admin", 3, Some(&[prize.id, prize.id, prize.id]))
            .await
            .unwrap_err();

        assert!(matches!(err, DrawError::PrizeExhausted { requested: 3, remaining: 2, .. }));
        assert!(store.list_draws(contest_id).unwrap().is_empty());
    }

    #[tokio::test]
    async fn fully_allocated_contest_has_no_slots_left() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let contest_id = seed_contest(&store, 5, 0);
        let prize = store.insert_prize(contest_id, "Gift Card", 2, 50.0).unwrap();

        let engine = DrawEngine::new(Arc::clone(&store));
        let mut rng = StdRng::seed_from_u64(5);
        engine
            .execute_draw_with_rng(contest_id, "admin", 2, Some(&[prize.id, prize.id]), &mut rng)
            .await
            .unwrap();

        let err = engine
            .execute_draw(contest_id, "admin", 1, None)
            .await
            .unwrap_err();
        assert!(matches!(err, DrawError::NoSlotsRemaining));
        assert_eq!(store.list_draws(contest_id).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn request_cannot_exceed_the_eligible_pool() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let contest_id = seed_contest(&store, 5, 0);
        store.insert_prize(contest_id, "Gift Card", 10, 50.0).unwrap();

        let engine = DrawEngine::new(Arc::clone(&store));
        let err = engine
            .execute_draw(contest_id, "admin", 6, None)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DrawError::RequestExceedsPool {
                requested: 6,
                pool: 5
            }
        ));
        assert!(store.list_draws(contest_id).unwrap().is_empty());
    }

    #[tokio::test]
    async fn unvalidated_participants_never_win() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let contest_id = seed_contest(&store, 3, 2);
        store.insert_prize(contest_id, "Gift Card", 5, 50.0).unwrap();

        let engine = DrawEngine::new(Arc::clone(&store));
        let mut rng = StdRng::seed_from_u64(23);
        let outcome = engine
            .execute_draw_with_rng(contest_id, "admin", 3, None, &mut rng)
            .await
            .unwrap();

        let validated: HashSet<i64> = store
            .list_validated_participants(contest_id)
            .unwrap()
            .iter()
            .map(|p| p.id)
            .collect();
        for detail in &outcome.winners {
            assert!(validated.contains(&detail.winner.participant_id));
        }
    }

    #[tokio::test]
    async fn contest_without_validated_participants_is_rejected() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let contest_id = seed_contest(&store, 0, 3);
        store.insert_prize(contest_id, "Gift Card", 5, 50.0).unwrap();

        let engine = DrawEngine::new(Arc::clone(&store));
        let err = engine
            .execute_draw(contest_id, "admin", 1, None)
            .await
            .unwrap_err();
        assert!(matches!(err, DrawError::NoEligibleParticipants));
    }

    #[tokio::test]
    async fn zero_winners_is_an_invalid_request() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let contest_id = seed_contest(&store, 5, 0);

        let engine = DrawEngine::new(Arc::clone(&store));
        let err = engine
            .execute_draw(contest_id, "admin", 0, None)
            .await
            .unwrap_err();
        assert!(matches!(err, DrawError::InvalidWinnerCount(0)));
    }

    #[tokio::test]
    async fn prize_assignment_is_positional() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let contest_id = seed_contest(&store, 4, 0);
        let prize = store.insert_prize(contest_id, "Trophy", 1, 200.0).unwrap();

        let engine = DrawEngine::new(Arc::clone(&store));
        let mut rng = StdRng::seed_from_u64(31);
        // one prize id for two winners: only the first selected gets it
        let outcome = engine
            .execute_draw_with_rng(contest_id, "admin", 2, Some(&[prize.id]), &mut rng)
            .await
            .unwrap();

        assert_eq!(outcome.winners[0].winner.prize_id, Some(prize.id));
        assert_eq!(outcome.winners[0].prize_name.as_deref(), Some("Trophy"));
        assert_eq!(outcome.winners[1].winner.prize_id, None);
        assert_eq!(outcome.winners[1].prize_name, None);
    }

    #[tokio::test]
    async fn redraw_is_an_independent_attempt() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let contest_id = seed_contest(&store, 5, 0);
        store.insert_prize(contest_id, "Gift Card", 10, 50.0).unwrap();

        let engine = DrawEngine::new(Arc::clone(&store));
        let mut rng = StdRng::seed_from_u64(17);
        let first = engine
            .execute_draw_with_rng(contest_id, "admin", 2, None, &mut rng)
            .await
            .unwrap();
        let second = engine
            .execute_draw_with_rng(contest_id, "admin", 2, None, &mut rng)
            .await
            .unwrap();

        assert_ne!(first.draw.id, second.draw.id);
        assert_eq!(store.list_draws(contest_id).unwrap().len(), 2);
        assert_eq!(store.list_winners(contest_id).unwrap().len(), 4);
    }

    #[tokio::test]
    async fn repeat_winner_policy_shrinks_the_pool() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let contest_id = seed_contest(&store, 2, 0);
        store.insert_prize(contest_id, "Gift Card", 10, 50.0).unwrap();

        let engine = DrawEngine::with_policy(
            Arc::clone(&store),
            DrawPolicy {
                allow_repeat_winners: false,
            },
        );
        let mut rng = StdRng::seed_from_u64(29);
        let first = engine
            .execute_draw_with_rng(contest_id, "admin", 1, None, &mut rng)
            .await
            .unwrap();
        let second = engine
            .execute_draw_with_rng(contest_id, "admin", 1, None, &mut rng)
            .await
            .unwrap();

        assert_ne!(
            first.winners[0].winner.participant_id,
            second.winners[0].winner.participant_id
        );

        // both participants have now won, the pool is empty
        let err = engine
            .execute_draw(contest_id, "admin", 1, None)
            .await
            .unwrap_err();
        assert!(matches!(err, DrawError::NoEligibleParticipants));
    }

    #[tokio::test]
    async fn mark_notified_is_idempotent() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let contest_id = seed_contest(&store, 3, 0);
        store.insert_prize(contest_id, "Gift Card", 5, 50.0).unwrap();

        let engine = DrawEngine::new(Arc::clone(&store));
        let mut rng = StdRng::seed_from_u64(41);
        let outcome = engine
            .execute_draw_with_rng(contest_id, "admin", 1, None, &mut rng)
            .await
            .unwrap();
        let winner_id = outcome.winners[0].winner.id;

        let first = engine.mark_notified(winner_id).await.unwrap();
        assert!(first.notified);
        let stamped_at = first.notified_at.clone();
        assert!(stamped_at.is_some());

        let second = engine.mark_notified(winner_id).await.unwrap();
        assert!(second.notified);
        assert_eq!(second.notified_at, stamped_at);
    }

    #[tokio::test]
    async fn prize_status_only_moves_forward() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let contest_id = seed_contest(&store, 3, 0);
        store.insert_prize(contest_id, "Gift Card", 5, 50.0).unwrap();

        let engine = DrawEngine::new(Arc::clone(&store));
        let mut rng = StdRng::seed_from_u64(43);
        let outcome = engine
            .execute_draw_with_rng(contest_id, "admin", 1, None, &mut rng)
            .await
            .unwrap();
        let winner_id = outcome.winners[0].winner.id;

        let claimed = engine
            .update_prize_status(winner_id, PrizeStatus::Claimed)
            .await
            .unwrap();
        assert_eq!(claimed.prize_status, PrizeStatus::Claimed);

        // re-applying the current status is harmless
        let still_claimed = engine
            .update_prize_status(winner_id, PrizeStatus::Claimed)
            .await
            .unwrap();
        assert_eq!(still_claimed.prize_status, PrizeStatus::Claimed);

        let shipped = engine
            .update_prize_status(winner_id, PrizeStatus::Shipped)
            .await
            .unwrap();
        assert_eq!(shipped.prize_status, PrizeStatus::Shipped);

        let err = engine
            .update_prize_status(winner_id, PrizeStatus::Pending)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DrawError::InvalidStatusTransition {
                from: PrizeStatus::Shipped,
                to: PrizeStatus::Pending
            }
        ));
    }
}
