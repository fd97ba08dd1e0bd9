use std::sync::Arc;

use anyhow::Result;
use chrono::{Duration, Local};

use crate::database::SqliteStore;
use crate::engine::{DrawEngine, DrawPolicy};
use crate::selector::{pick_weighted, validate_probabilities};
use crate::slots::SlotAccountant;
use crate::status::ContestStatusService;
use crate::types::{ApprovalStatus, ContestStatus, NewContest, PrizeStatus};
use crate::utils::MINUTE_FORMAT;

/// Seeds a demonstration contest and walks the whole admin surface: status
/// refresh, slot accounting, a random draw, winner follow-up, the failure
/// paths, and a scratch-card reveal.
pub async fn run(store: Arc<SqliteStore>, policy: DrawPolicy) -> Result<()> {
    println!("\n🎰 Seeding demonstration contest...\n");

    let now = Local::now();
    let contest = store.insert_contest(&NewContest {
        name: "Grand Opening Lucky Draw".to_string(),
        theme: "grand-opening".to_string(),
        description: "launch week giveaway".to_string(),
        start_time: Some((now - Duration::hours(1)).format(MINUTE_FORMAT).to_string()),
        end_time: Some((now + Duration::hours(2)).format(MINUTE_FORMAT).to_string()),
        status: ContestStatus::Upcoming,
        approval_status: ApprovalStatus::Approved,
    })?;

    for i in 1..=6 {
        store.insert_participant(
            contest.id,
            &format!("participant-{}", i),
            &format!("participant-{}@example.com", i),
            true,
        )?;
    }
    // one unvalidated entry that must never be drawn
    store.insert_participant(contest.id, "pending-entry", "pending@example.com", false)?;

    let speaker = store.insert_prize(contest.id, "Bluetooth Speaker", 1, 350.0)?;
    let voucher = store.insert_prize(contest.id, "Coffee Voucher", 3, 25.0)?;

    store.insert_scratch_prize(contest.id, "Free Drink", 10.0)?;
    store.insert_scratch_prize(contest.id, "20% Discount", 30.0)?;
    store.insert_scratch_prize(contest.id, "Thanks for Playing", 60.0)?;

    println!("1️⃣  Refreshing contest status from its time window:");
    let service = ContestStatusService::new(Arc::clone(&store));
    let resolution = service.refresh(contest.id).await?;
    println!(
        "   • {} is {} (active: {})",
        contest.name,
        resolution.status.as_str(),
        resolution.is_active
    );

    println!("\n2️⃣  Prize slots before any draw:");
    let accountant = SlotAccountant::new(Arc::clone(&store));
    let report = accountant.remaining_slots(contest.id).await?;
    println!("   {}", serde_json::to_string(&report)?);

    println!("\n3️⃣  Executing a random draw for 3 winners:");
    let engine = DrawEngine::with_policy(Arc::clone(&store), policy);
    let outcome = engine
        .execute_draw(
            contest.id,
            "admin",
            3,
            Some(&[speaker.id, voucher.id, voucher.id]),
        )
        .await?;
    println!(
        "   Draw {} by {} at {}",
        outcome.draw.id, outcome.draw.executed_by, outcome.draw.executed_at
    );
    for detail in &outcome.winners {
        println!(
            "   • {} ({}) wins {}",
            detail.participant_name,
            detail.participant_contact,
            detail.prize_name.as_deref().unwrap_or("no prize")
        );
    }

    println!("\n4️⃣  Notifying the first winner and marking the prize claimed:");
    let first = &outcome.winners[0].winner;
    let notified = engine.mark_notified(first.id).await?;
    println!(
        "   • winner {} notified at {}",
        notified.id,
        notified.notified_at.as_deref().unwrap_or("-")
    );
    let claimed = engine.update_prize_status(first.id, PrizeStatus::Claimed).await?;
    println!("   • prize status is now {}", claimed.prize_status.as_str());

    println!("\n5️⃣  Re-draw against the exhausted speaker prize:");
    match engine.execute_draw(contest.id, "admin", 1, Some(&[speaker.id])).await {
        Ok(_) => println!("   ⚠ unexpected success"),
        Err(e) => println!("   ✗ rejected: {}", e),
    }

    println!("\n6️⃣  Scratch-card configuration and reveal:");
    let scratch_prizes = store.list_scratch_prizes(contest.id)?;
    let check = validate_probabilities(&scratch_prizes);
    println!("   probabilities sum to {} (valid: {})", check.total, check.valid);
    for _ in 0..5 {
        let revealed = pick_weighted(&scratch_prizes)?;
        println!("   • scratched: {}", revealed.name);
    }

    println!("\n7️⃣  Final slot report and draw history:");
    let report = accountant.remaining_slots(contest.id).await?;
    println!("   {}", serde_json::to_string(&report)?);
    let draws = store.list_draws(contest.id)?;
    println!("   {} draw(s) on record", draws.len());
    for draw in &draws {
        println!(
            "   • draw {}: {} winner(s), mode {}",
            draw.id,
            draw.total_winners,
            draw.draw_mode.as_str()
        );
    }

    println!("\n✅ Demonstration completed!\n");
    Ok(())
}
