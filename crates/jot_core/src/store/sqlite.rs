//! SQLite-backed note store.
//!
//! # Responsibility
//! - Implement the `Store` contract over a migrated SQLite connection.
//! - Keep all SQL for the notes schema inside this module.
//!
//! # Invariants
//! - Note ids come from the `next_id` allocator table and are monotonic
//!   across sessions; deleted ids are never reused.
//! - `date_saved` is stamped server-side on every insert/update.

use crate::db::{open_db, open_db_in_memory};
use crate::model::color::NoteColor;
use crate::model::note::{NoteId, NoteSnapshot};
use crate::store::{Store, StoreError, StoreResult};
use log::info;
use rusqlite::{params, Connection, Row};
use std::path::Path;

const NOTE_SELECT_SQL: &str = "SELECT id, title, content, date_saved, open, color FROM notes";

/// SQLite implementation of the note store.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
    /// Per-session counter for `"untitled note N"` default titles.
    untitled_counter: u64,
}

impl SqliteStore {
    /// Wraps a migrated/ready connection.
    pub fn new(conn: Connection) -> StoreResult<Self> {
        ensure_connection_ready(&conn)?;
        Ok(Self {
            conn,
            untitled_counter: 1,
        })
    }

    /// Opens (and migrates) a database file.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Self::new(open_db(path)?)
    }

    /// Opens (and migrates) an in-memory database, mainly for tests.
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::new(open_db_in_memory()?)
    }

    fn allocate_id(&mut self) -> StoreResult<NoteId> {
        let tx = self.conn.transaction()?;
        let id: NoteId = tx.query_row("SELECT id FROM next_id;", [], |row| row.get(0))?;
        tx.execute("UPDATE next_id SET id = ?1;", [id + 1])?;
        tx.commit()?;
        Ok(id)
    }
}

impl Store for SqliteStore {
    fn create_note(&mut self) -> StoreResult<NoteSnapshot> {
        let id = self.allocate_id()?;
        let title = format!("untitled note {}", self.untitled_counter);
        self.untitled_counter += 1;
        let color = NoteColor::DEFAULT;

        self.conn.execute(
            "INSERT INTO notes (id, title, content, date_saved, open, color)
             VALUES (?1, ?2, '', (strftime('%s', 'now') * 1000), 0, ?3);",
            params![id, title.as_str(), color.to_field()],
        )?;

        info!("event=note_create module=store status=ok note_id={id}");

        let mut stmt = self
            .conn
            .prepare(&format!("{NOTE_SELECT_SQL} WHERE id = ?1;"))?;
        let snapshot = stmt.query_row([id], parse_note_row)?;
        Ok(snapshot)
    }

    fn get_notes(&mut self, filter: Option<&str>) -> StoreResult<Vec<NoteSnapshot>> {
        // instr() keeps the substring match case-sensitive regardless of
        // LIKE collation settings.
        let filter = filter.unwrap_or("");
        let mut stmt = self.conn.prepare(&format!(
            "{NOTE_SELECT_SQL} WHERE (?1 = '' OR instr(title, ?1) > 0) ORDER BY id ASC;"
        ))?;
        let mut rows = stmt.query([filter])?;
        let mut notes = Vec::new();
        while let Some(row) = rows.next()? {
            notes.push(parse_note_row(row)?);
        }
        Ok(notes)
    }

    fn get_open_notes(&mut self) -> StoreResult<Vec<NoteSnapshot>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{NOTE_SELECT_SQL} WHERE open != 0 ORDER BY id ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut notes = Vec::new();
        while let Some(row) = rows.next()? {
            notes.push(parse_note_row(row)?);
        }
        Ok(notes)
    }

    fn get_note(&mut self, id: NoteId) -> StoreResult<Option<NoteSnapshot>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{NOTE_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_note_row(row)?));
        }
        Ok(None)
    }

    fn update(&mut self, snapshot: &NoteSnapshot) -> StoreResult<()> {
        let changed = self.conn.execute(
            "UPDATE notes
             SET
                title = ?2,
                content = ?3,
                date_saved = (strftime('%s', 'now') * 1000),
                open = ?4,
                color = ?5
             WHERE id = ?1;",
            params![
                snapshot.id,
                snapshot.title.as_str(),
                snapshot.text.as_str(),
                i64::from(snapshot.open),
                snapshot.color.to_field(),
            ],
        )?;

        if changed == 0 {
            return Err(StoreError::NotFound(snapshot.id));
        }

        Ok(())
    }

    fn delete(&mut self, id: NoteId) -> StoreResult<()> {
        self.conn.execute("DELETE FROM notes WHERE id = ?1;", [id])?;
        Ok(())
    }

    fn close(self: Box<Self>) -> StoreResult<()> {
        info!("event=store_close module=store status=start");
        self.conn
            .close()
            .map_err(|(_, err)| StoreError::from(err))?;
        info!("event=store_close module=store status=ok");
        Ok(())
    }
}

fn parse_note_row(row: &Row<'_>) -> Result<NoteSnapshot, rusqlite::Error> {
    let color_field: String = row.get("color")?;
    Ok(NoteSnapshot {
        id: row.get("id")?,
        title: row.get("title")?,
        text: row.get("content")?,
        // Malformed color fields degrade to the default color; a bad row
        // must never fail the whole load.
        color: NoteColor::parse_field(&color_field),
        saved_at: row.get("date_saved")?,
        open: row.get::<_, i64>("open")? != 0,
    })
}

fn ensure_connection_ready(conn: &Connection) -> StoreResult<()> {
    for table in ["notes", "next_id"] {
        let exists: i64 = conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table],
            |row| row.get(0),
        )?;
        if exists != 1 {
            return Err(StoreError::InvalidData(format!(
                "required table `{table}` is missing"
            )));
        }
    }
    Ok(())
}
