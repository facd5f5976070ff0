//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Note-Harvest database.

use rusqlite::Connection;

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Crawl keywords and their latest status
CREATE TABLE IF NOT EXISTS keywords (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    keyword TEXT NOT NULL UNIQUE,
    status TEXT NOT NULL,
    total_notes INTEGER NOT NULL DEFAULT 0,
    last_crawl_time TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- Crawled notes
CREATE TABLE IF NOT EXISTS notes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    note_id TEXT NOT NULL UNIQUE,
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    like_count INTEGER NOT NULL DEFAULT 0,
    collect_count INTEGER NOT NULL DEFAULT 0,
    comment_count INTEGER NOT NULL DEFAULT 0,
    publish_time TEXT,
    image_urls TEXT NOT NULL,
    note_type TEXT NOT NULL,
    crawl_time TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_notes_comment_count ON notes(comment_count);

-- Which notes a keyword returned, in ranked order
CREATE TABLE IF NOT EXISTS keyword_notes (
    keyword_id INTEGER NOT NULL REFERENCES keywords(id),
    note_id TEXT NOT NULL REFERENCES notes(note_id),
    position INTEGER NOT NULL,
    PRIMARY KEY (keyword_id, note_id)
);

-- Top comments per note
CREATE TABLE IF NOT EXISTS comments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    note_id TEXT NOT NULL REFERENCES notes(note_id),
    comment_id TEXT,
    user_name TEXT NOT NULL,
    content TEXT NOT NULL,
    like_count INTEGER NOT NULL DEFAULT 0,
    position INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_comments_note ON comments(note_id);
CREATE INDEX IF NOT EXISTS idx_comments_comment_id ON comments(comment_id);
"#;

/// Creates all tables and indexes that do not exist yet
pub fn initialize_schema(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)
}
