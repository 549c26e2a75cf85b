//! Relational storage for videos, chunks, chat messages, and notes.
//!
//! A single SQLite database owns the durable record of a video: its
//! metadata, its transcript chunks keyed by `(video_id, chunk_index)`,
//! the chat history, and timestamped notes. The vector index lives in a
//! separate store; keeping the two consistent is the orchestrator's
//! concern, not this module's.

use crate::error::{GraspError, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS videos (
        id TEXT PRIMARY KEY,
        youtube_id TEXT UNIQUE,
        title TEXT NOT NULL,
        duration INTEGER NOT NULL,
        transcript TEXT NOT NULL,
        processed_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
    );

    CREATE TABLE IF NOT EXISTS chunks (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        video_id TEXT NOT NULL,
        chunk_index INTEGER NOT NULL,
        start_time REAL NOT NULL,
        end_time REAL NOT NULL,
        text TEXT NOT NULL,
        UNIQUE (video_id, chunk_index),
        FOREIGN KEY (video_id) REFERENCES videos(id)
    );

    CREATE TABLE IF NOT EXISTS messages (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        video_id TEXT NOT NULL,
        timestamp REAL NOT NULL,
        role TEXT NOT NULL,
        content TEXT NOT NULL,
        context_chunks TEXT NOT NULL,
        created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
        FOREIGN KEY (video_id) REFERENCES videos(id)
    );

    CREATE TABLE IF NOT EXISTS notes (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        video_id TEXT NOT NULL,
        timestamp REAL NOT NULL,
        content TEXT NOT NULL,
        tags TEXT NOT NULL,
        created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
        updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
        FOREIGN KEY (video_id) REFERENCES videos(id)
    );

    CREATE INDEX IF NOT EXISTS idx_chunks_video_id ON chunks(video_id);
    CREATE INDEX IF NOT EXISTS idx_messages_video_id ON messages(video_id);
    CREATE INDEX IF NOT EXISTS idx_notes_video_id ON notes(video_id);
"#;

/// A stored video row.
#[derive(Debug, Clone, Serialize)]
pub struct VideoRecord {
    pub id: String,
    pub youtube_id: String,
    pub title: String,
    pub duration: i64,
    pub processed_at: String,
}

/// A persisted transcript chunk.
#[derive(Debug, Clone, Serialize)]
pub struct ChunkRecord {
    pub video_id: String,
    pub chunk_index: i64,
    pub start_time: f64,
    pub end_time: f64,
    pub text: String,
}

/// A stored chat message.
#[derive(Debug, Clone, Serialize)]
pub struct MessageRecord {
    pub id: i64,
    pub video_id: String,
    pub timestamp: f64,
    pub role: String,
    pub content: String,
    pub context_chunks: Vec<i64>,
    pub created_at: String,
}

/// A timestamped note.
#[derive(Debug, Clone, Serialize)]
pub struct NoteRecord {
    pub id: i64,
    pub video_id: String,
    pub timestamp: f64,
    pub content: String,
    pub tags: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Fields for creating a note.
#[derive(Debug, Clone)]
pub struct NewNote {
    pub video_id: String,
    pub timestamp: f64,
    pub content: String,
    pub tags: Vec<String>,
}

/// SQLite-backed relational store.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) the database at the given path.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized database at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory database (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| GraspError::Config(format!("Failed to acquire database lock: {}", e)))
    }

    // === Videos ===

    /// Insert a video row together with its chunk rows, in one transaction.
    #[instrument(skip(self, transcript, chunks), fields(chunk_count = chunks.len()))]
    pub fn insert_video(
        &self,
        video_id: &str,
        title: &str,
        duration: i64,
        transcript: &str,
        chunks: &[ChunkRecord],
    ) -> Result<()> {
        let conn = self.conn()?;
        let tx = conn.unchecked_transaction()?;

        tx.execute(
            r#"
            INSERT INTO videos (id, youtube_id, title, duration, transcript)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![video_id, video_id, title, duration, transcript],
        )?;

        for chunk in chunks {
            tx.execute(
                r#"
                INSERT INTO chunks (video_id, chunk_index, start_time, end_time, text)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
                params![
                    chunk.video_id,
                    chunk.chunk_index,
                    chunk.start_time,
                    chunk.end_time,
                    chunk.text,
                ],
            )?;
        }

        tx.commit()?;
        info!("Stored video {} with {} chunks", video_id, chunks.len());
        Ok(())
    }

    /// Get a video row.
    pub fn get_video(&self, video_id: &str) -> Result<Option<VideoRecord>> {
        let conn = self.conn()?;

        let video = conn
            .query_row(
                r#"
                SELECT id, youtube_id, title, duration, processed_at
                FROM videos WHERE id = ?1
                "#,
                params![video_id],
                video_from_row,
            )
            .optional()?;

        Ok(video)
    }

    /// List all videos, most recently processed first.
    pub fn list_videos(&self) -> Result<Vec<VideoRecord>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT id, youtube_id, title, duration, processed_at
            FROM videos ORDER BY processed_at DESC
            "#,
        )?;

        let videos = stmt.query_map([], video_from_row)?;
        Ok(videos.filter_map(|v| v.ok()).collect())
    }

    /// Check whether a video row exists.
    pub fn video_exists(&self, video_id: &str) -> Result<bool> {
        Ok(self.get_video(video_id)?.is_some())
    }

    /// Delete a video and everything hanging off it.
    #[instrument(skip(self))]
    pub fn delete_video(&self, video_id: &str) -> Result<bool> {
        let conn = self.conn()?;
        let tx = conn.unchecked_transaction()?;

        tx.execute("DELETE FROM chunks WHERE video_id = ?1", params![video_id])?;
        tx.execute("DELETE FROM messages WHERE video_id = ?1", params![video_id])?;
        tx.execute("DELETE FROM notes WHERE video_id = ?1", params![video_id])?;
        let deleted = tx.execute("DELETE FROM videos WHERE id = ?1", params![video_id])?;

        tx.commit()?;
        Ok(deleted > 0)
    }

    // === Chunks ===

    /// All chunks of a video in index order.
    pub fn chunks_for_video(&self, video_id: &str) -> Result<Vec<ChunkRecord>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT video_id, chunk_index, start_time, end_time, text
            FROM chunks WHERE video_id = ?1 ORDER BY chunk_index
            "#,
        )?;

        let chunks = stmt.query_map(params![video_id], chunk_from_row)?;
        Ok(chunks.filter_map(|c| c.ok()).collect())
    }

    /// Chunks of a video falling inside a time window, ordered by start time.
    ///
    /// A chunk qualifies when `start_time >= from` and `end_time <= to`.
    pub fn chunks_in_window(&self, video_id: &str, from: f64, to: f64) -> Result<Vec<ChunkRecord>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT video_id, chunk_index, start_time, end_time, text
            FROM chunks
            WHERE video_id = ?1 AND start_time >= ?2 AND end_time <= ?3
            ORDER BY start_time
            "#,
        )?;

        let chunks = stmt.query_map(params![video_id, from, to], chunk_from_row)?;
        let result: Vec<ChunkRecord> = chunks.filter_map(|c| c.ok()).collect();
        debug!(
            "Found {} chunks for video {} in window [{}, {}]",
            result.len(),
            video_id,
            from,
            to
        );
        Ok(result)
    }

    /// Number of persisted chunks for a video.
    pub fn chunk_count(&self, video_id: &str) -> Result<usize> {
        let conn = self.conn()?;

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM chunks WHERE video_id = ?1",
            params![video_id],
            |row| row.get(0),
        )?;

        Ok(count as usize)
    }

    // === Messages ===

    /// Append a chat message.
    pub fn insert_message(
        &self,
        video_id: &str,
        timestamp: f64,
        role: &str,
        content: &str,
        context_chunks: &[i64],
    ) -> Result<()> {
        let conn = self.conn()?;

        conn.execute(
            r#"
            INSERT INTO messages (video_id, timestamp, role, content, context_chunks)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                video_id,
                timestamp,
                role,
                content,
                serde_json::to_string(context_chunks)?,
            ],
        )?;

        Ok(())
    }

    /// Chat history for a video in insertion order.
    pub fn chat_history(&self, video_id: &str) -> Result<Vec<MessageRecord>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT id, video_id, timestamp, role, content, context_chunks, created_at
            FROM messages WHERE video_id = ?1 ORDER BY id
            "#,
        )?;

        let messages = stmt.query_map(params![video_id], message_from_row)?;
        Ok(messages.filter_map(|m| m.ok()).collect())
    }

    // === Notes ===

    /// Create a note and return the stored row.
    pub fn insert_note(&self, note: &NewNote) -> Result<NoteRecord> {
        let conn = self.conn()?;

        conn.execute(
            r#"
            INSERT INTO notes (video_id, timestamp, content, tags)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![
                note.video_id,
                note.timestamp,
                note.content,
                serde_json::to_string(&note.tags)?,
            ],
        )?;

        let id = conn.last_insert_rowid();
        drop(conn);

        self.get_note(id)?
            .ok_or_else(|| GraspError::NotFound(format!("Note {}", id)))
    }

    /// Get a note by id.
    pub fn get_note(&self, note_id: i64) -> Result<Option<NoteRecord>> {
        let conn = self.conn()?;

        let note = conn
            .query_row(
                r#"
                SELECT id, video_id, timestamp, content, tags, created_at, updated_at
                FROM notes WHERE id = ?1
                "#,
                params![note_id],
                note_from_row,
            )
            .optional()?;

        Ok(note)
    }

    /// Notes for a video, ordered by video timestamp.
    pub fn notes_for_video(&self, video_id: &str) -> Result<Vec<NoteRecord>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT id, video_id, timestamp, content, tags, created_at, updated_at
            FROM notes WHERE video_id = ?1 ORDER BY timestamp
            "#,
        )?;

        let notes = stmt.query_map(params![video_id], note_from_row)?;
        Ok(notes.filter_map(|n| n.ok()).collect())
    }

    /// Update a note's content and/or tags, touching `updated_at`.
    ///
    /// Fields left as `None` keep their stored value.
    pub fn update_note(
        &self,
        note_id: i64,
        content: Option<&str>,
        tags: Option<&[String]>,
    ) -> Result<NoteRecord> {
        let existing = self
            .get_note(note_id)?
            .ok_or_else(|| GraspError::NotFound(format!("Note {}", note_id)))?;

        let content = content.unwrap_or(&existing.content);
        let tags_json = match tags {
            Some(t) => serde_json::to_string(t)?,
            None => serde_json::to_string(&existing.tags)?,
        };

        let conn = self.conn()?;
        conn.execute(
            r#"
            UPDATE notes SET content = ?1, tags = ?2, updated_at = CURRENT_TIMESTAMP
            WHERE id = ?3
            "#,
            params![content, tags_json, note_id],
        )?;
        drop(conn);

        self.get_note(note_id)?
            .ok_or_else(|| GraspError::NotFound(format!("Note {}", note_id)))
    }

    /// Delete a note.
    pub fn delete_note(&self, note_id: i64) -> Result<()> {
        let conn = self.conn()?;

        let deleted = conn.execute("DELETE FROM notes WHERE id = ?1", params![note_id])?;
        if deleted == 0 {
            return Err(GraspError::NotFound(format!("Note {}", note_id)));
        }
        Ok(())
    }
}

fn video_from_row(row: &Row<'_>) -> rusqlite::Result<VideoRecord> {
    Ok(VideoRecord {
        id: row.get(0)?,
        youtube_id: row.get(1)?,
        title: row.get(2)?,
        duration: row.get(3)?,
        processed_at: row.get(4)?,
    })
}

fn chunk_from_row(row: &Row<'_>) -> rusqlite::Result<ChunkRecord> {
    Ok(ChunkRecord {
        video_id: row.get(0)?,
        chunk_index: row.get(1)?,
        start_time: row.get(2)?,
        end_time: row.get(3)?,
        text: row.get(4)?,
    })
}

fn message_from_row(row: &Row<'_>) -> rusqlite::Result<MessageRecord> {
    let context_json: String = row.get(5)?;
    Ok(MessageRecord {
        id: row.get(0)?,
        video_id: row.get(1)?,
        timestamp: row.get(2)?,
        role: row.get(3)?,
        content: row.get(4)?,
        context_chunks: serde_json::from_str(&context_json).unwrap_or_default(),
        created_at: row.get(6)?,
    })
}

fn note_from_row(row: &Row<'_>) -> rusqlite::Result<NoteRecord> {
    let tags_json: String = row.get(4)?;
    Ok(NoteRecord {
        id: row.get(0)?,
        video_id: row.get(1)?,
        timestamp: row.get(2)?,
        content: row.get(3)?,
        tags: serde_json::from_str(&tags_json).unwrap_or_default(),
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(video_id: &str, index: i64, start: f64, end: f64) -> ChunkRecord {
        ChunkRecord {
            video_id: video_id.to_string(),
            chunk_index: index,
            start_time: start,
            end_time: end,
            text: format!("chunk {}", index),
        }
    }

    fn seed_video(db: &Database) {
        let chunks = vec![
            chunk("vid", 0, 0.0, 10.0),
            chunk("vid", 1, 10.0, 20.0),
            chunk("vid", 2, 20.0, 30.0),
        ];
        db.insert_video("vid", "Test Video", 30, "full transcript", &chunks)
            .unwrap();
    }

    #[test]
    fn test_insert_and_get_video() {
        let db = Database::in_memory().unwrap();
        seed_video(&db);

        let video = db.get_video("vid").unwrap().unwrap();
        assert_eq!(video.title, "Test Video");
        assert_eq!(video.duration, 30);
        assert_eq!(db.chunk_count("vid").unwrap(), 3);
        assert!(db.video_exists("vid").unwrap());
        assert!(!db.video_exists("other").unwrap());
    }

    #[test]
    fn test_chunks_in_window() {
        let db = Database::in_memory().unwrap();
        seed_video(&db);

        // Window covering everything
        let chunks = db.chunks_in_window("vid", 0.0, 135.0).unwrap();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].chunk_index, 0);
        assert_eq!(chunks[2].chunk_index, 2);

        // Window covering only the middle chunk
        let chunks = db.chunks_in_window("vid", 5.0, 25.0).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].chunk_index, 1);

        // Other video
        assert!(db.chunks_in_window("other", 0.0, 100.0).unwrap().is_empty());
    }

    #[test]
    fn test_delete_video_cascades() {
        let db = Database::in_memory().unwrap();
        seed_video(&db);

        db.insert_message("vid", 5.0, "user", "hi", &[0]).unwrap();
        db.insert_note(&NewNote {
            video_id: "vid".to_string(),
            timestamp: 5.0,
            content: "note".to_string(),
            tags: vec![],
        })
        .unwrap();

        assert!(db.delete_video("vid").unwrap());
        assert!(!db.video_exists("vid").unwrap());
        assert_eq!(db.chunk_count("vid").unwrap(), 0);
        assert!(db.chat_history("vid").unwrap().is_empty());
        assert!(db.notes_for_video("vid").unwrap().is_empty());
        assert!(!db.delete_video("vid").unwrap());
    }

    #[test]
    fn test_chat_history_order() {
        let db = Database::in_memory().unwrap();
        seed_video(&db);

        db.insert_message("vid", 5.0, "user", "first", &[0, 1]).unwrap();
        db.insert_message("vid", 5.0, "assistant", "second", &[0, 1]).unwrap();

        let history = db.chat_history("vid").unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, "user");
        assert_eq!(history[0].content, "first");
        assert_eq!(history[0].context_chunks, vec![0, 1]);
        assert_eq!(history[1].role, "assistant");
    }

    #[test]
    fn test_notes_crud() {
        let db = Database::in_memory().unwrap();
        seed_video(&db);

        let note = db
            .insert_note(&NewNote {
                video_id: "vid".to_string(),
                timestamp: 12.5,
                content: "Key insight".to_string(),
                tags: vec!["ml".to_string()],
            })
            .unwrap();
        assert_eq!(note.tags, vec!["ml".to_string()]);

        let updated = db
            .update_note(note.id, Some("Revised"), None)
            .unwrap();
        assert_eq!(updated.content, "Revised");
        assert_eq!(updated.tags, vec!["ml".to_string()]);

        let notes = db.notes_for_video("vid").unwrap();
        assert_eq!(notes.len(), 1);

        db.delete_note(note.id).unwrap();
        assert!(matches!(
            db.delete_note(note.id),
            Err(GraspError::NotFound(_))
        ));
    }

    #[test]
    fn test_update_missing_note_not_found() {
        let db = Database::in_memory().unwrap();
        assert!(matches!(
            db.update_note(42, Some("x"), None),
            Err(GraspError::NotFound(_))
        ));
    }
}
