//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the RecordSink trait.

use crate::crawler::{Comment, PublishTime, Record};
use crate::state::TaskStatus;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{RecordSink, StorageError, StorageResult};
use crate::storage::{KeywordRecord, SinkStatistics};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

const NOTE_COLUMNS: &str = "note_id, title, description, like_count, collect_count, \
                            comment_count, publish_time, image_urls, note_type";

/// SQLite storage backend
pub struct SqliteSink {
    conn: Connection,
}

/// Raw note columns before JSON fields are decoded
struct NoteRow {
    id: String,
    title: String,
    description: String,
    liked: i64,
    collected: i64,
    commented: i64,
    publish_time: Option<String>,
    image_urls: String,
    record_type: String,
}

impl NoteRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            description: row.get(2)?,
            liked: row.get(3)?,
            collected: row.get(4)?,
            commented: row.get(5)?,
            publish_time: row.get(6)?,
            image_urls: row.get(7)?,
            record_type: row.get(8)?,
        })
    }

    fn into_record(self, comments: Vec<Comment>) -> StorageResult<Record> {
        let publish_time = self
            .publish_time
            .as_deref()
            .map(serde_json::from_str::<PublishTime>)
            .transpose()?;

        Ok(Record {
            id: self.id,
            title: self.title,
            description: self.description,
            liked_count: self.liked.max(0) as u64,
            collected_count: self.collected.max(0) as u64,
            commented_count: self.commented.max(0) as u64,
            publish_time,
            image_urls: serde_json::from_str(&self.image_urls)?,
            record_type: self.record_type,
            comments,
        })
    }
}

impl SqliteSink {
    /// Creates a new SqliteSink instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteSink)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn load_records(&self, sql: &str, params: impl rusqlite::Params) -> StorageResult<Vec<Record>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt
            .query_map(params, NoteRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|row| {
                let comments = self.comments_for_record(&row.id)?;
                row.into_record(comments)
            })
            .collect()
    }
}

fn upsert_keyword_row(conn: &Connection, keyword: &str, status: TaskStatus) -> StorageResult<i64> {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO keywords (keyword, status, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)
         ON CONFLICT(keyword) DO UPDATE SET status = excluded.status, updated_at = excluded.updated_at",
        params![keyword, status.to_db_string(), now],
    )?;

    let id = conn.query_row(
        "SELECT id FROM keywords WHERE keyword = ?1",
        params![keyword],
        |row| row.get(0),
    )?;
    Ok(id)
}

fn comment_from_row(row: &Row<'_>) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: row.get(0)?,
        author_display_name: row.get(1)?,
        content: row.get(2)?,
        liked_count: row.get::<_, i64>(3)?.max(0) as u64,
    })
}

impl RecordSink for SqliteSink {
    // ===== Keywords =====

    fn upsert_keyword(&mut self, keyword: &str, status: TaskStatus) -> StorageResult<i64> {
        upsert_keyword_row(&self.conn, keyword, status)
    }

    fn get_keyword(&self, keyword: &str) -> StorageResult<Option<KeywordRecord>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, keyword, status, total_notes, last_crawl_time, created_at, updated_at
                 FROM keywords WHERE keyword = ?1",
                params![keyword],
                |row| {
                    Ok(KeywordRecord {
                        id: row.get(0)?,
                        keyword: row.get(1)?,
                        status: TaskStatus::from_db_string(&row.get::<_, String>(2)?)
                            .unwrap_or(TaskStatus::Pending),
                        total_notes: row.get::<_, i64>(3)?.max(0) as u64,
                        last_crawl_time: row.get(4)?,
                        created_at: row.get(5)?,
                        updated_at: row.get(6)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    // ===== Records =====

    fn save_records(&mut self, keyword: &str, records: &[Record]) -> StorageResult<usize> {
        let now = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;

        let keyword_id = upsert_keyword_row(&tx, keyword, TaskStatus::Success)?;
        tx.execute(
            "UPDATE keywords SET total_notes = ?1, last_crawl_time = ?2 WHERE id = ?3",
            params![records.len() as i64, now, keyword_id],
        )?;
        tx.execute(
            "DELETE FROM keyword_notes WHERE keyword_id = ?1",
            params![keyword_id],
        )?;

        for (position, record) in records.iter().enumerate() {
            let publish_time = record
                .publish_time
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?;
            let image_urls = serde_json::to_string(&record.image_urls)?;

            tx.execute(
                "INSERT INTO notes (note_id, title, description, like_count, collect_count,
                                    comment_count, publish_time, image_urls, note_type, crawl_time)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                 ON CONFLICT(note_id) DO UPDATE SET
                    title = excluded.title,
                    description = excluded.description,
                    like_count = excluded.like_count,
                    collect_count = excluded.collect_count,
                    comment_count = excluded.comment_count,
                    publish_time = excluded.publish_time,
                    image_urls = excluded.image_urls,
                    note_type = excluded.note_type,
                    crawl_time = excluded.crawl_time",
                params![
                    record.id,
                    record.title,
                    record.description,
                    record.liked_count as i64,
                    record.collected_count as i64,
                    record.commented_count as i64,
                    publish_time,
                    image_urls,
                    record.record_type,
                    now
                ],
            )?;

            tx.execute(
                "INSERT OR REPLACE INTO keyword_notes (keyword_id, note_id, position) VALUES (?1, ?2, ?3)",
                params![keyword_id, record.id, position as i64],
            )?;

            tx.execute(
                "DELETE FROM comments WHERE note_id = ?1",
                params![record.id],
            )?;
            for (index, comment) in record.comments.iter().enumerate() {
                tx.execute(
                    "INSERT INTO comments (note_id, comment_id, user_name, content, like_count, position)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![
                        record.id,
                        comment.id,
                        comment.author_display_name,
                        comment.content,
                        comment.liked_count as i64,
                        index as i64
                    ],
                )?;
            }
        }

        tx.commit()?;
        Ok(records.len())
    }

    fn get_record(&self, record_id: &str) -> StorageResult<Option<Record>> {
        let sql = format!("SELECT {} FROM notes WHERE note_id = ?1", NOTE_COLUMNS);
        let row = self
            .conn
            .query_row(&sql, params![record_id], NoteRow::from_row)
            .optional()?;

        match row {
            Some(row) => {
                let comments = self.comments_for_record(record_id)?;
                Ok(Some(row.into_record(comments)?))
            }
            None => Ok(None),
        }
    }

    fn update_record_counts(
        &mut self,
        record_id: &str,
        liked: u64,
        collected: u64,
        commented: u64,
    ) -> StorageResult<()> {
        let changed = self.conn.execute(
            "UPDATE notes SET like_count = ?1, collect_count = ?2, comment_count = ?3 WHERE note_id = ?4",
            params![liked as i64, collected as i64, commented as i64, record_id],
        )?;

        if changed == 0 {
            return Err(StorageError::RecordNotFound(record_id.to_string()));
        }
        Ok(())
    }

    fn records_for_keyword(&self, keyword: &str) -> StorageResult<Vec<Record>> {
        let sql = format!(
            "SELECT {} FROM notes n
             JOIN keyword_notes kn ON kn.note_id = n.note_id
             JOIN keywords k ON k.id = kn.keyword_id
             WHERE k.keyword = ?1
             ORDER BY kn.position",
            NOTE_COLUMNS
                .split(", ")
                .map(|column| format!("n.{}", column.trim()))
                .collect::<Vec<_>>()
                .join(", ")
        );
        self.load_records(&sql, params![keyword])
    }

    fn search_records(&self, text: &str, limit: usize) -> StorageResult<Vec<Record>> {
        let sql = format!(
            "SELECT {} FROM notes
             WHERE instr(title, ?1) > 0 OR instr(description, ?1) > 0
             ORDER BY comment_count DESC, id
             LIMIT ?2",
            NOTE_COLUMNS
        );
        self.load_records(&sql, params![text, limit as i64])
    }

    // ===== Comments =====

    fn get_comment(&self, comment_id: &str) -> StorageResult<Option<Comment>> {
        let comment = self
            .conn
            .query_row(
                "SELECT comment_id, user_name, content, like_count FROM comments
                 WHERE comment_id = ?1 ORDER BY id DESC LIMIT 1",
                params![comment_id],
                comment_from_row,
            )
            .optional()?;
        Ok(comment)
    }

    fn comments_for_record(&self, record_id: &str) -> StorageResult<Vec<Comment>> {
        let mut stmt = self.conn.prepare(
            "SELECT comment_id, user_name, content, like_count FROM comments
             WHERE note_id = ?1 ORDER BY position",
        )?;
        let comments = stmt
            .query_map(params![record_id], comment_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(comments)
    }

    // ===== Statistics =====

    fn statistics(&self) -> StorageResult<SinkStatistics> {
        let count = |table: &str| -> StorageResult<u64> {
            let n: i64 = self
                .conn
                .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))?;
            Ok(n.max(0) as u64)
        };

        let failed: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM keywords WHERE status = ?1",
            params![TaskStatus::Failed.to_db_string()],
            |row| row.get(0),
        )?;

        Ok(SinkStatistics {
            keywords: count("keywords")?,
            failed_keywords: failed.max(0) as u64,
            records: count("notes")?,
            comments: count("comments")?,
        })
    }
}
