use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::errors::StoreError;
use crate::store::Store;
use crate::types::{
    ApprovalStatus, Contest, ContestStatus, Draw, DrawMode, NewContest, NewDraw, NewWinner,
    Participant, Prize, PrizeStatus, ScratchCardPrize, Winner, WinnerDetail, WinnerPatch,
};

/// SQLite-backed store standing in for the hosted backend. One connection,
/// serialized behind a mutex; draw pools are small enough that contention is
/// a non-issue.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: &str) -> Result<SqliteStore, StoreError> {
        if let Some(dir) = Path::new(path).parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir).map_err(|e| {
                    StoreError::Backend(format!("cannot create {}: {}", dir.display(), e))
                })?;
            }
        }
        let conn = Connection::open(path)?;
        create_tables(&conn)?;
        Ok(SqliteStore {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<SqliteStore, StoreError> {
        let conn = Connection::open_in_memory()?;
        create_tables(&conn)?;
        Ok(SqliteStore {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Backend("database connection poisoned".to_string()))
    }

    pub fn insert_contest(&self, contest: &NewContest) -> Result<Contest, StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO contests (name, theme, description, start_time, end_time, status, approval_status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                contest.name,
                contest.theme,
                contest.description,
                contest.start_time,
                contest.end_time,
                contest.status.as_str(),
                contest.approval_status.as_str(),
            ],
        )?;
        get_contest_with(&conn, conn.last_insert_rowid())
    }

    /// A bare draft contest, enough to hang prizes and participants off in
    /// tests and seeds.
    pub fn seed_minimal_contest(&self, name: &str) -> Result<i64, StoreError> {
        let contest = self.insert_contest(&NewContest {
            name: name.to_string(),
            theme: String::new(),
            description: String::new(),
            start_time: None,
            end_time: None,
            status: ContestStatus::Draft,
            approval_status: ApprovalStatus::Pending,
        })?;
        Ok(contest.id)
    }

    pub fn insert_participant(
        &self,
        contest_id: i64,
        name: &str,
        contact: &str,
        validated: bool,
    ) -> Result<Participant, StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO participants (contest_id, name, contact, validated)
             VALUES (?1, ?2, ?3, ?4)",
            params![contest_id, name, contact, validated],
        )?;
        let id = conn.last_insert_rowid();
        let participant = conn
            .query_row(
                "SELECT id, contest_id, name, contact, validated FROM participants WHERE id = ?1",
                [id],
                participant_from_row,
            )
            .optional()?
            .ok_or(StoreError::NotFound {
                entity: "participant",
                id,
            })?;
        Ok(participant)
    }

    pub fn insert_prize(
        &self,
        contest_id: i64,
        name: &str,
        quantity: i64,
        value: f64,
    ) -> Result<Prize, StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO prizes (contest_id, name, quantity, value) VALUES (?1, ?2, ?3, ?4)",
            params![contest_id, name, quantity, value],
        )?;
        let id = conn.last_insert_rowid();
        let prize = conn
            .query_row(
                "SELECT id, contest_id, name, quantity, value FROM prizes WHERE id = ?1",
                [id],
                prize_from_row,
            )
            .optional()?
            .ok_or(StoreError::NotFound { entity: "prize", id })?;
        Ok(prize)
    }

    pub fn insert_scratch_prize(
        &self,
        contest_id: i64,
        name: &str,
        probability: f64,
    ) -> Result<ScratchCardPrize, StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO scratch_prizes (contest_id, name, probability) VALUES (?1, ?2, ?3)",
            params![contest_id, name, probability],
        )?;
        let id = conn.last_insert_rowid();
        let prize = conn
            .query_row(
                "SELECT id, contest_id, name, probability FROM scratch_prizes WHERE id = ?1",
                [id],
                scratch_prize_from_row,
            )
            .optional()?
            .ok_or(StoreError::NotFound {
                entity: "scratch prize",
                id,
            })?;
        Ok(prize)
    }

    pub fn list_scratch_prizes(
        &self,
        contest_id: i64,
    ) -> Result<Vec<ScratchCardPrize>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, contest_id, name, probability FROM scratch_prizes
             WHERE contest_id = ?1 ORDER BY id",
        )?;
        let prize_iter = stmt.query_map([contest_id], scratch_prize_from_row)?;

        let mut results = Vec::new();
        for prize in prize_iter {
            results.push(prize?);
        }
        Ok(results)
    }

    /// Draw history for a contest, newest first.
    pub fn list_draws(&self, contest_id: i64) -> Result<Vec<Draw>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, contest_id, draw_mode, executed_by, executed_at, total_winners
             FROM draws WHERE contest_id = ?1 ORDER BY id DESC",
        )?;
        let draw_iter = stmt.query_map([contest_id], draw_from_row)?;

        let mut results = Vec::new();
        for draw in draw_iter {
            results.push(draw?);
        }
        Ok(results)
    }

    /// Winners joined with participant and prize info, for the winner list
    /// screen.
    pub fn list_winner_details(&self, contest_id: i64) -> Result<Vec<WinnerDetail>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT w.id, w.draw_id, w.participant_id, w.prize_id, w.prize_status,
                    w.notified, w.notified_at, pa.name, pa.contact, pr.name
             FROM winners w
             JOIN draws d ON w.draw_id = d.id
             JOIN participants pa ON w.participant_id = pa.id
             LEFT JOIN prizes pr ON w.prize_id = pr.id
             WHERE d.contest_id = ?1
             ORDER BY w.id",
        )?;
        let detail_iter = stmt.query_map([contest_id], |row| {
            Ok(WinnerDetail {
                winner: winner_from_row(row)?,
                participant_name: row.get(7)?,
                participant_contact: row.get(8)?,
                prize_name: row.get(9)?,
            })
        })?;

        let mut results = Vec::new();
        for detail in detail_iter {
            results.push(detail?);
        }
        Ok(results)
    }
}

impl Store for SqliteStore {
    fn get_contest(&self, contest_id: i64) -> Result<Contest, StoreError> {
        let conn = self.lock()?;
        get_contest_with(&conn, contest_id)
    }

    fn update_contest_status(
        &self,
        contest_id: i64,
        status: ContestStatus,
    ) -> Result<(), StoreError> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE contests SET status = ?1 WHERE id = ?2",
            params![status.as_str(), contest_id],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound {
                entity: "contest",
                id: contest_id,
            });
        }
        Ok(())
    }

    fn list_validated_participants(&self, contest_id: i64) -> Result<Vec<Participant>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, contest_id, name, contact, validated FROM participants
             WHERE contest_id = ?1 AND validated = 1 ORDER BY id",
        )?;
        let participant_iter = stmt.query_map([contest_id], participant_from_row)?;

        let mut results = Vec::new();
        for participant in participant_iter {
            results.push(participant?);
        }
        Ok(results)
    }

    fn list_prizes(&self, contest_id: i64) -> Result<Vec<Prize>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, contest_id, name, quantity, value FROM prizes
             WHERE contest_id = ?1 ORDER BY id",
        )?;
        let prize_iter = stmt.query_map([contest_id], prize_from_row)?;

        let mut results = Vec::new();
        for prize in prize_iter {
            results.push(prize?);
        }
        Ok(results)
    }

    fn list_winners(&self, contest_id: i64) -> Result<Vec<Winner>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT w.id, w.draw_id, w.participant_id, w.prize_id, w.prize_status,
                    w.notified, w.notified_at
             FROM winners w
             JOIN draws d ON w.draw_id = d.id
             WHERE d.contest_id = ?1
             ORDER BY w.id",
        )?;
        let winner_iter = stmt.query_map([contest_id], winner_from_row)?;

        let mut results = Vec::new();
        for winner in winner_iter {
            results.push(winner?);
        }
        Ok(results)
    }

    fn get_winner(&self, winner_id: i64) -> Result<Winner, StoreError> {
        let conn = self.lock()?;
        get_winner_with(&conn, winner_id)
    }

    fn insert_draw(&self, draw: &NewDraw) -> Result<Draw, StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO draws (contest_id, draw_mode, executed_by, executed_at, total_winners)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                draw.contest_id,
                draw.draw_mode.as_str(),
                draw.executed_by,
                draw.executed_at,
                draw.total_winners,
            ],
        )?;
        let id = conn.last_insert_rowid();
        let draw = conn
            .query_row(
                "SELECT id, contest_id, draw_mode, executed_by, executed_at, total_winners
                 FROM draws WHERE id = ?1",
                [id],
                draw_from_row,
            )
            .optional()?
            .ok_or(StoreError::NotFound { entity: "draw", id })?;
        Ok(draw)
    }

    fn insert_winners(&self, winners: &[NewWinner]) -> Result<Vec<Winner>, StoreError> {
        let mut conn = self.lock()?;
        // one transaction for the whole batch, so a failed draw leaves a draw
        // row with zero winners rather than a ragged subset
        let tx = conn.transaction()?;
        let mut inserted = Vec::with_capacity(winners.len());
        for winner in winners {
            tx.execute(
                "INSERT INTO winners (draw_id, participant_id, prize_id) VALUES (?1, ?2, ?3)",
                params![winner.draw_id, winner.participant_id, winner.prize_id],
            )?;
            let id = tx.last_insert_rowid();
            inserted.push(get_winner_with(&tx, id)?);
        }
        tx.commit()?;
        Ok(inserted)
    }

    fn update_winner(&self, winner_id: i64, patch: &WinnerPatch) -> Result<Winner, StoreError> {
        let conn = self.lock()?;
        let current = get_winner_with(&conn, winner_id)?;
        let prize_status = patch.prize_status.unwrap_or(current.prize_status);
        let notified = patch.notified.unwrap_or(current.notified);
        let notified_at = patch.notified_at.clone().or(current.notified_at);
        conn.execute(
            "UPDATE winners SET prize_status = ?1, notified = ?2, notified_at = ?3 WHERE id = ?4",
            params![prize_status.as_str(), notified, notified_at, winner_id],
        )?;
        get_winner_with(&conn, winner_id)
    }
}

fn create_tables(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS contests (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            theme TEXT NOT NULL DEFAULT '',
            description TEXT NOT NULL DEFAULT '',
            start_time TEXT,
            end_time TEXT,
            status TEXT NOT NULL DEFAULT 'DRAFT',
            approval_status TEXT NOT NULL DEFAULT 'PENDING',
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS participants (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            contest_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            contact TEXT NOT NULL,
            validated INTEGER NOT NULL DEFAULT 0,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            FOREIGN KEY (contest_id) REFERENCES contests (id)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS prizes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            contest_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            quantity INTEGER NOT NULL,
            value REAL NOT NULL DEFAULT 0,
            FOREIGN KEY (contest_id) REFERENCES contests (id)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS draws (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            contest_id INTEGER NOT NULL,
            draw_mode TEXT NOT NULL,
            executed_by TEXT NOT NULL,
            executed_at TEXT NOT NULL,
            total_winners INTEGER NOT NULL,
            FOREIGN KEY (contest_id) REFERENCES contests (id)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS winners (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            draw_id INTEGER NOT NULL,
            participant_id INTEGER NOT NULL,
            prize_id INTEGER,
            prize_status TEXT NOT NULL DEFAULT 'PENDING',
            notified INTEGER NOT NULL DEFAULT 0,
            notified_at TEXT,
            FOREIGN KEY (draw_id) REFERENCES draws (id),
            FOREIGN KEY (participant_id) REFERENCES participants (id),
            FOREIGN KEY (prize_id) REFERENCES prizes (id)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS scratch_prizes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            contest_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            probability REAL NOT NULL,
            FOREIGN KEY (contest_id) REFERENCES contests (id)
        )",
        [],
    )?;

    Ok(())
}

fn get_contest_with(conn: &Connection, contest_id: i64) -> Result<Contest, StoreError> {
    let contest = conn
        .query_row(
            "SELECT id, name, theme, description, start_time, end_time, status, approval_status
             FROM contests WHERE id = ?1",
            [contest_id],
            contest_from_row,
        )
        .optional()?
        .ok_or(StoreError::NotFound {
            entity: "contest",
            id: contest_id,
        })?;
    Ok(contest)
}

fn get_winner_with(conn: &Connection, winner_id: i64) -> Result<Winner, StoreError> {
    let winner = conn
        .query_row(
            "SELECT id, draw_id, participant_id, prize_id, prize_status, notified, notified_at
             FROM winners WHERE id = ?1",
            [winner_id],
            winner_from_row,
        )
        .optional()?
        .ok_or(StoreError::NotFound {
            entity: "winner",
            id: winner_id,
        })?;
    Ok(winner)
}

// Status columns are stored as the uppercase tags the hosted backend used;
// an unknown tag is a corrupt row, not a default.
fn bad_tag(idx: usize, tag: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        Type::Text,
        format!("unrecognized tag `{}`", tag).into(),
    )
}

fn contest_from_row(row: &Row<'_>) -> rusqlite::Result<Contest> {
    let status: String = row.get(6)?;
    let approval: String = row.get(7)?;
    Ok(Contest {
        id: row.get(0)?,
        name: row.get(1)?,
        theme: row.get(2)?,
        description: row.get(3)?,
        start_time: row.get(4)?,
        end_time: row.get(5)?,
        status: ContestStatus::parse(&status).ok_or_else(|| bad_tag(6, &status))?,
        approval_status: ApprovalStatus::parse(&approval).ok_or_else(|| bad_tag(7, &approval))?,
    })
}

fn participant_from_row(row: &Row<'_>) -> rusqlite::Result<Participant> {
    Ok(Participant {
        id: row.get(0)?,
        contest_id: row.get(1)?,
        name: row.get(2)?,
        contact: row.get(3)?,
        validated: row.get(4)?,
    })
}

fn prize_from_row(row: &Row<'_>) -> rusqlite::Result<Prize> {
    Ok(Prize {
        id: row.get(0)?,
        contest_id: row.get(1)?,
        name: row.get(2)?,
        quantity: row.get(3)?,
        value: row.get(4)?,
    })
}

fn draw_from_row(row: &Row<'_>) -> rusqlite::Result<Draw> {
    let mode: String = row.get(2)?;
    Ok(Draw {
        id: row.get(0)?,
        contest_id: row.get(1)?,
        draw_mode: DrawMode::parse(&mode).ok_or_else(|| bad_tag(2, &mode))?,
        executed_by: row.get(3)?,
        executed_at: row.get(4)?,
        total_winners: row.get(5)?,
    })
}

fn winner_from_row(row: &Row<'_>) -> rusqlite::Result<Winner> {
    let status: String = row.get(4)?;
    Ok(Winner {
        id: row.get(0)?,
        draw_id: row.get(1)?,
        participant_id: row.get(2)?,
        prize_id: row.get(3)?,
        prize_status: PrizeStatus::parse(&status).ok_or_else(|| bad_tag(4, &status))?,
        notified: row.get(5)?,
        notified_at: row.get(6)?,
    })
}

fn scratch_prize_from_row(row: &Row<'_>) -> rusqlite::Result<ScratchCardPrize> {
    Ok(ScratchCardPrize {
        id: row.get(0)?,
        contest_id: row.get(1)?,
        name: row.get(2)?,
        probability: row.get(3)?,
    })
}
