use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use crate::errors::StoreError;
use crate::store::Store;

#[derive(Debug, Clone, Serialize)]
pub struct SlotReport {
    pub total_remaining: i64,
    pub per_prize_remaining: HashMap<i64, i64>,
}

/// Computes how many prize slots a contest still has to allocate. Always
/// recomputed from the store; winners may be created by other admin sessions
/// between calls.
pub struct SlotAccountant<S: Store> {
    store: Arc<S>,
}

impl<S: Store> SlotAccountant<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn remaining_slots(&self, contest_id: i64) -> Result<SlotReport, StoreError> {
        let prizes = self.store.list_prizes(contest_id)?;
        let winners = self.store.list_winners(contest_id)?;

        let mut allocated_by_prize: HashMap<i64, i64> = HashMap::new();
        for winner in &winners {
            if let Some(prize_id) = winner.prize_id {
                *allocated_by_prize.entry(prize_id).or_insert(0) += 1;
            }
        }

        let mut per_prize_remaining = HashMap::new();
        for prize in &prizes {
            let allocated = allocated_by_prize.get(&prize.id).copied().unwrap_or(0);
            // clamped: a concurrent oversell must not show up as negative
            per_prize_remaining.insert(prize.id, (prize.quantity - allocated).max(0));
        }

        // Winners without an assigned prize still consume overall capacity,
        // so this total can sit below the sum of the per-prize remainders.
        let total_slots: i64 = prizes.iter().map(|p| p.quantity).sum();
        let total_remaining = (total_slots - winners.len() as i64).max(0);

        Ok(SlotReport {
            total_remaining,
            per_prize_remaining,
        })
    }
}
