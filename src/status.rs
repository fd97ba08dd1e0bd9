use std::sync::Arc;

use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::info;

use crate::errors::StoreError;
use crate::store::Store;
use crate::types::{Contest, ContestStatus};
use crate::utils::{MINUTE_FORMAT, now_minute};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusResolution {
    pub status: ContestStatus,
    pub is_active: bool,
}

const MINUTE_LEN: usize = 16;

fn draft() -> StatusResolution {
    StatusResolution {
        status: ContestStatus::Draft,
        is_active: false,
    }
}

// Truncates a stored timestamp to YYYY-MM-DDTHH:MM. Anything that does not
// parse at that precision is treated as absent.
fn minute_prefix(ts: &str) -> Option<&str> {
    let prefix = ts.get(..MINUTE_LEN)?;
    NaiveDateTime::parse_from_str(prefix, MINUTE_FORMAT).ok()?;
    Some(prefix)
}

/// Computes the lifecycle state of a contest window against `now`, all three
/// taken as local wall-clock strings and compared lexicographically at minute
/// precision. Never fails: a missing or malformed window resolves to DRAFT.
pub fn resolve_window(start: Option<&str>, end: Option<&str>, now: &str) -> StatusResolution {
    let (Some(start), Some(end)) = (start, end) else {
        return draft();
    };
    let (Some(start), Some(end), Some(now)) =
        (minute_prefix(start), minute_prefix(end), minute_prefix(now))
    else {
        return draft();
    };

    if now < start {
        StatusResolution {
            status: ContestStatus::Upcoming,
            is_active: false,
        }
    } else if now <= end {
        StatusResolution {
            status: ContestStatus::Ongoing,
            is_active: true,
        }
    } else {
        StatusResolution {
            status: ContestStatus::Completed,
            is_active: false,
        }
    }
}

/// Manually-held states always win over the computed window.
pub fn effective_status(contest: &Contest, now: &str) -> StatusResolution {
    match contest.status {
        ContestStatus::Draft | ContestStatus::Cancelled => StatusResolution {
            status: contest.status,
            is_active: false,
        },
        _ => resolve_window(
            contest.start_time.as_deref(),
            contest.end_time.as_deref(),
            now,
        ),
    }
}

pub struct ContestStatusService<S: Store> {
    store: Arc<S>,
}

impl<S: Store> ContestStatusService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    // Called on every contest read/poll. Only writes when the computed status
    // differs from the stored one.
    pub async fn refresh(&self, contest_id: i64) -> Result<StatusResolution, StoreError> {
        let contest = self.store.get_contest(contest_id)?;
        let resolution = effective_status(&contest, &now_minute());

        if resolution.status != contest.status {
            self.store
                .update_contest_status(contest_id, resolution.status)?;
            info!(
                "contest {} status {} -> {}",
                contest_id,
                contest.status.as_str(),
                resolution.status.as_str()
            );
        }

        Ok(resolution)
    }
}
