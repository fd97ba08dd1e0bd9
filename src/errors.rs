use std::error::Error;
use std::fmt;

use crate::types::PrizeStatus;

#[derive(Debug)]
pub enum StoreError {
    NotFound { entity: &'static str, id: i64 },
    Backend(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NotFound { entity, id } => write!(f, "{} {} not found", entity, id),
            StoreError::Backend(message) => write!(f, "storage backend error: {}", message),
        }
    }
}

impl Error for StoreError {}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Backend(e.to_string())
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum SelectionError {
    EmptyInput,
}

impl fmt::Display for SelectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionError::EmptyInput => write!(f, "cannot select a prize from an empty list"),
        }
    }
}

impl Error for SelectionError {}

// Every variant carries its own user-facing message so the admin UI never
// shows a generic failure for an audit-sensitive draw.
#[derive(Debug)]
pub enum DrawError {
    InvalidWinnerCount(usize),
    NoEligibleParticipants,
    RequestExceedsPool { requested: usize, pool: usize },
    NoSlotsRemaining,
    PrizeExhausted { prize_id: i64, requested: i64, remaining: i64 },
    DrawInsertFailed(StoreError),
    PartialPersistence { draw_id: i64, source: StoreError },
    InvalidStatusTransition { from: PrizeStatus, to: PrizeStatus },
    Store(StoreError),
}

impl fmt::Display for DrawError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DrawError::InvalidWinnerCount(count) => {
                write!(f, "number of winners must be at least 1, got {}", count)
            }
            DrawError::NoEligibleParticipants => {
                write!(f, "this contest has no validated participants to draw from")
            }
            DrawError::RequestExceedsPool { requested, pool } => write!(
                f,
                "number of winners ({}) cannot exceed number of eligible participants ({})",
                requested, pool
            ),
            DrawError::NoSlotsRemaining => {
                write!(f, "no prize slots remaining for this contest")
            }
            DrawError::PrizeExhausted {
                prize_id,
                requested,
                remaining,
            } => write!(
                f,
                "prize {} has only {} slot(s) remaining, {} requested",
                prize_id, remaining, requested
            ),
            DrawError::DrawInsertFailed(source) => {
                write!(f, "failed to record the draw: {}", source)
            }
            DrawError::PartialPersistence { draw_id, source } => write!(
                f,
                "draw {} was recorded but its winners failed to persist ({}); re-read the winners for this draw before retrying",
                draw_id, source
            ),
            DrawError::InvalidStatusTransition { from, to } => write!(
                f,
                "prize status cannot move backward from {} to {}",
                from.as_str(),
                to.as_str()
            ),
            DrawError::Store(source) => write!(f, "storage error: {}", source),
        }
    }
}

impl Error for DrawError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            DrawError::DrawInsertFailed(source)
            | DrawError::PartialPersistence { source, .. }
            | DrawError::Store(source) => Some(source),
            _ => None,
        }
    }
}

impl From<StoreError> for DrawError {
    fn from(e: StoreError) -> Self {
        DrawError::Store(e)
    }
}
