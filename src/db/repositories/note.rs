//! Note repository
//!
//! Notes are addressed by slug, which is unique across all authors.

use crate::db::{backend, Backend, DynDatabasePool};
use crate::models::Note;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Note repository trait
#[async_trait]
pub trait NoteRepository: Send + Sync {
    /// Create a note. The `id` of the argument is ignored.
    async fn create(&self, note: &Note) -> Result<Note>;

    /// Get note by slug
    async fn get_by_slug(&self, slug: &str) -> Result<Option<Note>>;

    /// All notes of one author, in creation order
    async fn list_by_author(&self, author_id: i64) -> Result<Vec<Note>>;

    /// Whether any note uses `slug`
    async fn exists_by_slug(&self, slug: &str) -> Result<bool>;

    /// Whether a note other than `exclude_id` uses `slug`
    async fn exists_by_slug_excluding(&self, slug: &str, exclude_id: i64) -> Result<bool>;

    /// Update title, text and slug of an existing note
    async fn update(&self, note: &Note) -> Result<bool>;

    /// Delete a note
    async fn delete(&self, id: i64) -> Result<bool>;

    /// Count all notes
    async fn count(&self) -> Result<i64>;
}

/// SQLx-based note repository implementation
pub struct SqlxNoteRepository {
    pool: DynDatabasePool,
}

impl SqlxNoteRepository {
    /// Create a new SQLx note repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn NoteRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl NoteRepository for SqlxNoteRepository {
    async fn create(&self, note: &Note) -> Result<Note> {
        match backend(&self.pool)? {
            Backend::Sqlite(p) => create_note_sqlite(p, note).await,
            Backend::Mysql(p) => create_note_mysql(p, note).await,
        }
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Note>> {
        match backend(&self.pool)? {
            Backend::Sqlite(p) => get_note_by_slug_sqlite(p, slug).await,
            Backend::Mysql(p) => get_note_by_slug_mysql(p, slug).await,
        }
    }

    async fn list_by_author(&self, author_id: i64) -> Result<Vec<Note>> {
        match backend(&self.pool)? {
            Backend::Sqlite(p) => list_notes_by_author_sqlite(p, author_id).await,
            Backend::Mysql(p) => list_notes_by_author_mysql(p, author_id).await,
        }
    }

    async fn exists_by_slug(&self, slug: &str) -> Result<bool> {
        // No note has id 0
        self.exists_by_slug_excluding(slug, 0).await
    }

    async fn exists_by_slug_excluding(&self, slug: &str, exclude_id: i64) -> Result<bool> {
        let sql = "SELECT COUNT(*) as count FROM notes WHERE slug = ? AND id <> ?";
        let count = match backend(&self.pool)? {
            Backend::Sqlite(p) => sqlx::query(sql)
                .bind(slug)
                .bind(exclude_id)
                .fetch_one(p)
                .await
                .map(|row| row.get::<i64, _>("count")),
            Backend::Mysql(p) => sqlx::query(sql)
                .bind(slug)
                .bind(exclude_id)
                .fetch_one(p)
                .await
                .map(|row| row.get::<i64, _>("count")),
        };
        Ok(count.context("Failed to check note slug")? > 0)
    }

    async fn update(&self, note: &Note) -> Result<bool> {
        let sql = "UPDATE notes SET title = ?, text = ?, slug = ? WHERE id = ?";
        let affected = match backend(&self.pool)? {
            Backend::Sqlite(p) => sqlx::query(sql)
                .bind(&note.title)
                .bind(&note.text)
                .bind(&note.slug)
                .bind(note.id)
                .execute(p)
                .await
                .map(|r| r.rows_affected()),
            Backend::Mysql(p) => sqlx::query(sql)
                .bind(&note.title)
                .bind(&note.text)
                .bind(&note.slug)
                .bind(note.id)
                .execute(p)
                .await
                .map(|r| r.rows_affected()),
        };
        Ok(affected.context("Failed to update note")? > 0)
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let affected = match backend(&self.pool)? {
            Backend::Sqlite(p) => sqlx::query("DELETE FROM notes WHERE id = ?")
                .bind(id)
                .execute(p)
                .await
                .map(|r| r.rows_affected()),
            Backend::Mysql(p) => sqlx::query("DELETE FROM notes WHERE id = ?")
                .bind(id)
                .execute(p)
                .await
                .map(|r| r.rows_affected()),
        };
        Ok(affected.context("Failed to delete note")? > 0)
    }

    async fn count(&self) -> Result<i64> {
        let count = match backend(&self.pool)? {
            Backend::Sqlite(p) => sqlx::query("SELECT COUNT(*) as count FROM notes")
                .fetch_one(p)
                .await
                .map(|row| row.get::<i64, _>("count")),
            Backend::Mysql(p) => sqlx::query("SELECT COUNT(*) as count FROM notes")
                .fetch_one(p)
                .await
                .map(|row| row.get::<i64, _>("count")),
        };
        count.context("Failed to count notes")
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_note_sqlite(pool: &SqlitePool, note: &Note) -> Result<Note> {
    let result = sqlx::query(
        r#"
        INSERT INTO notes (title, text, slug, author_id)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(&note.title)
    .bind(&note.text)
    .bind(&note.slug)
    .bind(note.author_id)
    .execute(pool)
    .await
    .context("Failed to create note")?;

    Ok(Note {
        id: result.last_insert_rowid(),
        ..note.clone()
    })
}

async fn get_note_by_slug_sqlite(pool: &SqlitePool, slug: &str) -> Result<Option<Note>> {
    let row = sqlx::query("SELECT id, title, text, slug, author_id FROM notes WHERE slug = ?")
        .bind(slug)
        .fetch_optional(pool)
        .await
        .context("Failed to get note by slug")?;

    Ok(row.as_ref().map(row_to_note_sqlite))
}

async fn list_notes_by_author_sqlite(pool: &SqlitePool, author_id: i64) -> Result<Vec<Note>> {
    let rows = sqlx::query(
        "SELECT id, title, text, slug, author_id FROM notes WHERE author_id = ? ORDER BY id",
    )
    .bind(author_id)
    .fetch_all(pool)
    .await
    .context("Failed to list notes")?;

    Ok(rows.iter().map(row_to_note_sqlite).collect())
}

fn row_to_note_sqlite(row: &sqlx::sqlite::SqliteRow) -> Note {
    Note {
        id: row.get("id"),
        title: row.get("title"),
        text: row.get("text"),
        slug: row.get("slug"),
        author_id: row.get("author_id"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_note_mysql(pool: &MySqlPool, note: &Note) -> Result<Note> {
    let result = sqlx::query(
        r#"
        INSERT INTO notes (title, text, slug, author_id)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(&note.title)
    .bind(&note.text)
    .bind(&note.slug)
    .bind(note.author_id)
    .execute(pool)
    .await
    .context("Failed to create note")?;

    Ok(Note {
        id: result.last_insert_id() as i64,
        ..note.clone()
    })
}

async fn get_note_by_slug_mysql(pool: &MySqlPool, slug: &str) -> Result<Option<Note>> {
    let row = sqlx::query("SELECT id, title, text, slug, author_id FROM notes WHERE slug = ?")
        .bind(slug)
        .fetch_optional(pool)
        .await
        .context("Failed to get note by slug")?;

    Ok(row.as_ref().map(row_to_note_mysql))
}

async fn list_notes_by_author_mysql(pool: &MySqlPool, author_id: i64) -> Result<Vec<Note>> {
    let rows = sqlx::query(
        "SELECT id, title, text, slug, author_id FROM notes WHERE author_id = ? ORDER BY id",
    )
    .bind(author_id)
    .fetch_all(pool)
    .await
    .context("Failed to list notes")?;

    Ok(rows.iter().map(row_to_note_mysql).collect())
}

fn row_to_note_mysql(row: &sqlx::mysql::MySqlRow) -> Note {
    Note {
        id: row.get("id"),
        title: row.get("title"),
        text: row.get("text"),
        slug: row.get("slug"),
        author_id: row.get("author_id"),
    }
}
