use crate::errors::StoreError;
use crate::types::{
    Contest, ContestStatus, Draw, NewDraw, NewWinner, Participant, Prize, Winner, WinnerPatch,
};

/// Row access the draw engine needs from the backing datastore. Injected into
/// every component so tests can swap in an in-memory database.
pub trait Store {
    fn get_contest(&self, contest_id: i64) -> Result<Contest, StoreError>;

    fn update_contest_status(&self, contest_id: i64, status: ContestStatus)
    -> Result<(), StoreError>;

    fn list_validated_participants(&self, contest_id: i64) -> Result<Vec<Participant>, StoreError>;

    fn list_prizes(&self, contest_id: i64) -> Result<Vec<Prize>, StoreError>;

    /// Winners across every draw of the contest.
    fn list_winners(&self, contest_id: i64) -> Result<Vec<Winner>, StoreError>;

    fn get_winner(&self, winner_id: i64) -> Result<Winner, StoreError>;

    fn insert_draw(&self, draw: &NewDraw) -> Result<Draw, StoreError>;

    /// Inserts the whole batch or nothing.
    fn insert_winners(&self, winners: &[NewWinner]) -> Result<Vec<Winner>, StoreError>;

    fn update_winner(&self, winner_id: i64, patch: &WinnerPatch) -> Result<Winner, StoreError>;
}
