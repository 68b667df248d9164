//! News service

use crate::db::repositories::NewsRepository;
use crate::models::{CreateNewsInput, News, NewsWithCommentCount};
use anyhow::Context;
use std::sync::Arc;

/// Default number of news items on the home page
pub const DEFAULT_COUNT_ON_HOME_PAGE: i64 = 10;

/// Error types for news service operations
#[derive(Debug, thiserror::Error)]
pub enum NewsServiceError {
    /// News item not found
    #[error("News not found: {0}")]
    NotFound(i64),

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Read side of the news board plus creation for seeding
pub struct NewsService {
    repo: Arc<dyn NewsRepository>,
    count_on_home_page: i64,
}

impl NewsService {
    pub fn new(repo: Arc<dyn NewsRepository>, count_on_home_page: i64) -> Self {
        Self {
            repo,
            count_on_home_page: count_on_home_page.max(1),
        }
    }

    pub fn count_on_home_page(&self) -> i64 {
        self.count_on_home_page
    }

    pub async fn create(&self, input: CreateNewsInput) -> Result<News, NewsServiceError> {
        if input.title.trim().is_empty() {
            return Err(NewsServiceError::ValidationError(
                "News title cannot be empty".to_string(),
            ));
        }

        let news = self.repo.create(&input).await.context("Failed to create news")?;
        tracing::info!(news_id = news.id, "News created");
        Ok(news)
    }

    /// Newest news items for the home page, at most `count_on_home_page`
    pub async fn home(&self) -> Result<Vec<NewsWithCommentCount>, NewsServiceError> {
        let news = self
            .repo
            .list_latest(self.count_on_home_page)
            .await
            .context("Failed to list news")?;
        Ok(news)
    }

    pub async fn get_by_id(&self, id: i64) -> Result<News, NewsServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get news")?
            .ok_or(NewsServiceError::NotFound(id))
    }

    pub async fn count(&self) -> Result<i64, NewsServiceError> {
        Ok(self.repo.count().await.context("Failed to count news")?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::SqlxNewsRepository;
    use crate::db::{create_test_pool, migrations};
    use chrono::{Duration, Utc};

    async fn setup_test_service(count_on_home_page: i64) -> NewsService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        NewsService::new(SqlxNewsRepository::boxed(pool), count_on_home_page)
    }

    #[tokio::test]
    async fn test_home_is_capped_and_newest_first() {
        let service = setup_test_service(DEFAULT_COUNT_ON_HOME_PAGE).await;
        let today = Utc::now().date_naive();

        for index in 0..DEFAULT_COUNT_ON_HOME_PAGE + 1 {
            service
                .create(
                    CreateNewsInput::new(format!("Новость {index}"), "Просто текст.")
                        .with_date(today - Duration::days(index)),
                )
                .await
                .unwrap();
        }

        let home = service.home().await.unwrap();
        assert_eq!(home.len() as i64, DEFAULT_COUNT_ON_HOME_PAGE);
        assert_eq!(home[0].news.date, today);
        assert!(home.windows(2).all(|w| w[0].news.date >= w[1].news.date));
    }

    #[tokio::test]
    async fn test_get_by_id_not_found() {
        let service = setup_test_service(10).await;
        assert!(matches!(
            service.get_by_id(42).await,
            Err(NewsServiceError::NotFound(42))
        ));
    }

    #[tokio::test]
    async fn test_create_requires_title() {
        let service = setup_test_service(10).await;
        let result = service.create(CreateNewsInput::new("  ", "text")).await;

        assert!(matches!(result, Err(NewsServiceError::ValidationError(_))));
        assert_eq!(service.count().await.unwrap(), 0);
    }

    #[test]
    fn test_count_on_home_page_is_at_least_one() {
        assert_eq!(NewsService::new(Arc::new(NoopRepo), 0).count_on_home_page(), 1);
    }

    struct NoopRepo;

    #[async_trait::async_trait]
    impl NewsRepository for NoopRepo {
        async fn create(&self, _: &CreateNewsInput) -> anyhow::Result<News> {
            anyhow::bail!("unused")
        }
        async fn get_by_id(&self, _: i64) -> anyhow::Result<Option<News>> {
            Ok(None)
        }
        async fn list_latest(&self, _: i64) -> anyhow::Result<Vec<NewsWithCommentCount>> {
            Ok(Vec::new())
        }
        async fn count(&self) -> anyhow::Result<i64> {
            Ok(0)
        }
    }
}
