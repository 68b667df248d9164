//! Comment repository

use crate::db::{backend, Backend, DynDatabasePool};
use crate::models::{Comment, CommentWithAuthor};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Comment repository trait
#[async_trait]
pub trait CommentRepository: Send + Sync {
    /// Create a comment on a news item
    async fn create(&self, news_id: i64, author_id: i64, text: &str) -> Result<Comment>;

    /// Get a comment by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>>;

    /// Comments of a news item, oldest first, with author usernames
    async fn get_by_news(&self, news_id: i64) -> Result<Vec<CommentWithAuthor>>;

    /// Replace the text of a comment
    async fn update_text(&self, id: i64, text: &str) -> Result<bool>;

    /// Delete a comment
    async fn delete(&self, id: i64) -> Result<bool>;

    /// Count all comments
    async fn count(&self) -> Result<i64>;
}

/// SQLx-based comment repository implementation
pub struct SqlxCommentRepository {
    pool: DynDatabasePool,
}

impl SqlxCommentRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CommentRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CommentRepository for SqlxCommentRepository {
    async fn create(&self, news_id: i64, author_id: i64, text: &str) -> Result<Comment> {
        match backend(&self.pool)? {
            Backend::Sqlite(p) => create_sqlite(p, news_id, author_id, text).await,
            Backend::Mysql(p) => create_mysql(p, news_id, author_id, text).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>> {
        match backend(&self.pool)? {
            Backend::Sqlite(p) => get_by_id_sqlite(p, id).await,
            Backend::Mysql(p) => get_by_id_mysql(p, id).await,
        }
    }

    async fn get_by_news(&self, news_id: i64) -> Result<Vec<CommentWithAuthor>> {
        match backend(&self.pool)? {
            Backend::Sqlite(p) => get_by_news_sqlite(p, news_id).await,
            Backend::Mysql(p) => get_by_news_mysql(p, news_id).await,
        }
    }

    async fn update_text(&self, id: i64, text: &str) -> Result<bool> {
        let affected = match backend(&self.pool)? {
            Backend::Sqlite(p) => sqlx::query("UPDATE comments SET text = ? WHERE id = ?")
                .bind(text)
                .bind(id)
                .execute(p)
                .await
                .map(|r| r.rows_affected()),
            Backend::Mysql(p) => sqlx::query("UPDATE comments SET text = ? WHERE id = ?")
                .bind(text)
                .bind(id)
                .execute(p)
                .await
                .map(|r| r.rows_affected()),
        }
        .context("Failed to update comment")?;
        Ok(affected > 0)
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let affected = match backend(&self.pool)? {
            Backend::Sqlite(p) => sqlx::query("DELETE FROM comments WHERE id = ?")
                .bind(id)
                .execute(p)
                .await
                .map(|r| r.rows_affected()),
            Backend::Mysql(p) => sqlx::query("DELETE FROM comments WHERE id = ?")
                .bind(id)
                .execute(p)
                .await
                .map(|r| r.rows_affected()),
        }
        .context("Failed to delete comment")?;
        Ok(affected > 0)
    }

    async fn count(&self) -> Result<i64> {
        let count = match backend(&self.pool)? {
            Backend::Sqlite(p) => sqlx::query("SELECT COUNT(*) as count FROM comments")
                .fetch_one(p)
                .await
                .map(|row| row.get::<i64, _>("count")),
            Backend::Mysql(p) => sqlx::query("SELECT COUNT(*) as count FROM comments")
                .fetch_one(p)
                .await
                .map(|row| row.get::<i64, _>("count")),
        };
        count.context("Failed to count comments")
    }
}

const BY_NEWS_SQL: &str = r#"
    SELECT c.id, c.news_id, c.author_id, c.text, c.created_at, u.username AS author
    FROM comments c
    JOIN users u ON u.id = c.author_id
    WHERE c.news_id = ?
    ORDER BY c.created_at ASC, c.id ASC
"#;

// SQLite implementations
async fn create_sqlite(pool: &SqlitePool, news_id: i64, author_id: i64, text: &str) -> Result<Comment> {
    let now = Utc::now();
    let result = sqlx::query(
        "INSERT INTO comments (news_id, author_id, text, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(news_id)
    .bind(author_id)
    .bind(text)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create comment")?;

    Ok(Comment {
        id: result.last_insert_rowid(),
        news_id,
        author_id,
        text: text.to_string(),
        created_at: now,
    })
}

async fn get_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Comment>> {
    let row = sqlx::query(
        "SELECT id, news_id, author_id, text, created_at FROM comments WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get comment by ID")?;

    Ok(row.as_ref().map(row_to_comment_sqlite))
}

async fn get_by_news_sqlite(pool: &SqlitePool, news_id: i64) -> Result<Vec<CommentWithAuthor>> {
    let rows = sqlx::query(BY_NEWS_SQL)
        .bind(news_id)
        .fetch_all(pool)
        .await
        .context("Failed to list comments")?;

    Ok(rows
        .iter()
        .map(|r| CommentWithAuthor {
            comment: row_to_comment_sqlite(r),
            author: r.get("author"),
        })
        .collect())
}

fn row_to_comment_sqlite(r: &sqlx::sqlite::SqliteRow) -> Comment {
    Comment {
        id: r.get("id"),
        news_id: r.get("news_id"),
        author_id: r.get("author_id"),
        text: r.get("text"),
        created_at: r.get("created_at"),
    }
}

// MySQL implementations
async fn create_mysql(pool: &MySqlPool, news_id: i64, author_id: i64, text: &str) -> Result<Comment> {
    let now = Utc::now();
    let result = sqlx::query(
        "INSERT INTO comments (news_id, author_id, text, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(news_id)
    .bind(author_id)
    .bind(text)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create comment")?;

    Ok(Comment {
        id: result.last_insert_id() as i64,
        news_id,
        author_id,
        text: text.to_string(),
        created_at: now,
    })
}

async fn get_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Comment>> {
    let row = sqlx::query(
        "SELECT id, news_id, author_id, text, created_at FROM comments WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get comment by ID")?;

    Ok(row.as_ref().map(row_to_comment_mysql))
}

async fn get_by_news_mysql(pool: &MySqlPool, news_id: i64) -> Result<Vec<CommentWithAuthor>> {
    let rows = sqlx::query(BY_NEWS_SQL)
        .bind(news_id)
        .fetch_all(pool)
        .await
        .context("Failed to list comments")?;

    Ok(rows
        .iter()
        .map(|r| CommentWithAuthor {
            comment: row_to_comment_mysql(r),
            author: r.get("author"),
        })
        .collect())
}

fn row_to_comment_mysql(r: &sqlx::mysql::MySqlRow) -> Comment {
    Comment {
        id: r.get("id"),
        news_id: r.get("news_id"),
        author_id: r.get("author_id"),
        text: r.get("text"),
        created_at: r.get("created_at"),
    }
}
