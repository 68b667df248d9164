//! Comment service
//!
//! Comments belong to a news item and an author. Anyone signed in may
//! comment; only the author may edit or delete. Comments owned by someone
//! else are reported as missing.

use crate::db::repositories::{CommentRepository, NewsRepository};
use crate::forms::{CommentForm, FormErrors};
use crate::models::{Comment, CommentWithAuthor, User};
use anyhow::Context;
use std::sync::Arc;

/// Error types for comment service operations
#[derive(Debug, thiserror::Error)]
pub enum CommentServiceError {
    /// Comment missing or owned by someone else
    #[error("Comment not found: {0}")]
    NotFound(i64),

    /// News item the comment is attached to does not exist
    #[error("News not found: {0}")]
    NewsNotFound(i64),

    /// The submitted form is invalid
    #[error("Invalid form")]
    Validation(FormErrors),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Comment service
pub struct CommentService {
    repo: Arc<dyn CommentRepository>,
    news_repo: Arc<dyn NewsRepository>,
    banned_words: Vec<String>,
}

impl CommentService {
    pub fn new(
        repo: Arc<dyn CommentRepository>,
        news_repo: Arc<dyn NewsRepository>,
        banned_words: Vec<String>,
    ) -> Self {
        Self {
            repo,
            news_repo,
            banned_words,
        }
    }

    fn validate(&self, form: &CommentForm) -> Result<(), CommentServiceError> {
        let errors = form.validate(self.banned_words.as_slice());
        if errors.is_empty() {
            Ok(())
        } else {
            Err(CommentServiceError::Validation(errors))
        }
    }

    /// Attach a comment by `author` to a news item
    pub async fn create(
        &self,
        news_id: i64,
        author: &User,
        form: &CommentForm,
    ) -> Result<Comment, CommentServiceError> {
        if self
            .news_repo
            .get_by_id(news_id)
            .await
            .context("Failed to get news")?
            .is_none()
        {
            return Err(CommentServiceError::NewsNotFound(news_id));
        }

        self.validate(form)?;

        let comment = self
            .repo
            .create(news_id, author.id, form.text.trim())
            .await
            .context("Failed to create comment")?;

        tracing::info!(comment_id = comment.id, news_id, author_id = author.id, "Comment created");
        Ok(comment)
    }

    /// Comments of a news item, oldest first
    pub async fn get_by_news(&self, news_id: i64) -> Result<Vec<CommentWithAuthor>, CommentServiceError> {
        let comments = self
            .repo
            .get_by_news(news_id)
            .await
            .context("Failed to list comments")?;
        Ok(comments)
    }

    /// A comment, provided `user` wrote it
    pub async fn get_for_author(&self, id: i64, user: &User) -> Result<Comment, CommentServiceError> {
        let comment = self
            .repo
            .get_by_id(id)
            .await
            .context("Failed to get comment")?
            .ok_or(CommentServiceError::NotFound(id))?;

        if !user.owns(comment.author_id) {
            tracing::debug!(comment_id = id, user_id = user.id, "Comment access denied to non-author");
            return Err(CommentServiceError::NotFound(id));
        }
        Ok(comment)
    }

    /// Replace the text of `user`'s comment
    pub async fn update(
        &self,
        id: i64,
        user: &User,
        form: &CommentForm,
    ) -> Result<Comment, CommentServiceError> {
        let mut comment = self.get_for_author(id, user).await?;
        self.validate(form)?;

        let text = form.text.trim();
        if !self
            .repo
            .update_text(id, text)
            .await
            .context("Failed to update comment")?
        {
            return Err(CommentServiceError::NotFound(id));
        }

        tracing::info!(comment_id = id, "Comment updated");
        comment.text = text.to_string();
        Ok(comment)
    }

    /// Delete `user`'s comment, returning what was removed
    pub async fn delete(&self, id: i64, user: &User) -> Result<Comment, CommentServiceError> {
        let comment = self.get_for_author(id, user).await?;

        if !self.repo.delete(id).await.context("Failed to delete comment")? {
            return Err(CommentServiceError::NotFound(id));
        }

        tracing::info!(comment_id = id, "Comment deleted");
        Ok(comment)
    }

    pub async fn count(&self) -> Result<i64, CommentServiceError> {
        Ok(self.repo.count().await.context("Failed to count comments")?)
    }
}
