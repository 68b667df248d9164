//! News repository
//!
//! News items are written once (seeding or `NewsService::create`) and then
//! only read. The home page listing carries a per-item comment count.

use crate::db::{backend, Backend, DynDatabasePool};
use crate::models::{CreateNewsInput, News, NewsWithCommentCount};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// News repository trait
#[async_trait]
pub trait NewsRepository: Send + Sync {
    /// Create a news item
    async fn create(&self, input: &CreateNewsInput) -> Result<News>;

    /// Get news item by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<News>>;

    /// Newest-first listing, at most `limit` items
    async fn list_latest(&self, limit: i64) -> Result<Vec<NewsWithCommentCount>>;

    /// Count total news items
    async fn count(&self) -> Result<i64>;
}

/// SQLx-based news repository implementation
pub struct SqlxNewsRepository {
    pool: DynDatabasePool,
}

impl SqlxNewsRepository {
    /// Create a new SQLx news repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn NewsRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl NewsRepository for SqlxNewsRepository {
    async fn create(&self, input: &CreateNewsInput) -> Result<News> {
        match backend(&self.pool)? {
            Backend::Sqlite(p) => create_news_sqlite(p, input).await,
            Backend::Mysql(p) => create_news_mysql(p, input).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<News>> {
        match backend(&self.pool)? {
            Backend::Sqlite(p) => get_news_by_id_sqlite(p, id).await,
            Backend::Mysql(p) => get_news_by_id_mysql(p, id).await,
        }
    }

    async fn list_latest(&self, limit: i64) -> Result<Vec<NewsWithCommentCount>> {
        match backend(&self.pool)? {
            Backend::Sqlite(p) => list_latest_sqlite(p, limit).await,
            Backend::Mysql(p) => list_latest_mysql(p, limit).await,
        }
    }

    async fn count(&self) -> Result<i64> {
        let row = match backend(&self.pool)? {
            Backend::Sqlite(p) => sqlx::query("SELECT COUNT(*) as count FROM news")
                .fetch_one(p)
                .await
                .map(|row| row.get::<i64, _>("count")),
            Backend::Mysql(p) => sqlx::query("SELECT COUNT(*) as count FROM news")
                .fetch_one(p)
                .await
                .map(|row| row.get::<i64, _>("count")),
        };
        row.context("Failed to count news")
    }
}

const LIST_LATEST_SQL: &str = r#"
    SELECT n.id, n.title, n.text, n.date, COUNT(c.id) AS comment_count
    FROM news n
    LEFT JOIN comments c ON c.news_id = n.id
    GROUP BY n.id, n.title, n.text, n.date
    ORDER BY n.date DESC, n.id DESC
    LIMIT ?
"#;

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_news_sqlite(pool: &SqlitePool, input: &CreateNewsInput) -> Result<News> {
    let date = input.date_or_today();

    let result = sqlx::query("INSERT INTO news (title, text, date) VALUES (?, ?, ?)")
        .bind(&input.title)
        .bind(&input.text)
        .bind(date)
        .execute(pool)
        .await
        .context("Failed to create news")?;

    Ok(News {
        id: result.last_insert_rowid(),
        title: input.title.clone(),
        text: input.text.clone(),
        date,
    })
}

async fn get_news_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<News>> {
    let row = sqlx::query("SELECT id, title, text, date FROM news WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get news by ID")?;

    Ok(row.as_ref().map(row_to_news_sqlite))
}

async fn list_latest_sqlite(pool: &SqlitePool, limit: i64) -> Result<Vec<NewsWithCommentCount>> {
    let rows = sqlx::query(LIST_LATEST_SQL)
        .bind(limit)
        .fetch_all(pool)
        .await
        .context("Failed to list news")?;

    Ok(rows
        .iter()
        .map(|row| NewsWithCommentCount {
            news: row_to_news_sqlite(row),
            comment_count: row.get("comment_count"),
        })
        .collect())
}

fn row_to_news_sqlite(row: &sqlx::sqlite::SqliteRow) -> News {
    News {
        id: row.get("id"),
        title: row.get("title"),
        text: row.get("text"),
        date: row.get("date"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_news_mysql(pool: &MySqlPool, input: &CreateNewsInput) -> Result<News> {
    let date = input.date_or_today();

    let result = sqlx::query("INSERT INTO news (title, text, date) VALUES (?, ?, ?)")
        .bind(&input.title)
        .bind(&input.text)
        .bind(date)
        .execute(pool)
        .await
        .context("Failed to create news")?;

    Ok(News {
        id: result.last_insert_id() as i64,
        title: input.title.clone(),
        text: input.text.clone(),
        date,
    })
}

async fn get_news_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<News>> {
    let row = sqlx::query("SELECT id, title, text, date FROM news WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get news by ID")?;

    Ok(row.as_ref().map(row_to_news_mysql))
}

async fn list_latest_mysql(pool: &MySqlPool, limit: i64) -> Result<Vec<NewsWithCommentCount>> {
    let rows = sqlx::query(LIST_LATEST_SQL)
        .bind(limit)
        .fetch_all(pool)
        .await
        .context("Failed to list news")?;

    Ok(rows
        .iter()
        .map(|row| NewsWithCommentCount {
            news: row_to_news_mysql(row),
            comment_count: row.get("comment_count"),
        })
        .collect())
}

fn row_to_news_mysql(row: &sqlx::mysql::MySqlRow) -> News {
    News {
        id: row.get("id"),
        title: row.get("title"),
        text: row.get("text"),
        date: row.get("date"),
    }
}
