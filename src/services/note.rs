//! Note service
//!
//! Notes are private: every lookup goes through the requesting user, and
//! a note owned by someone else is reported as missing. Slugs are unique
//! across all notes and are derived from the title when the form leaves
//! them out.

use crate::db::repositories::NoteRepository;
use crate::forms::{duplicate_slug_message, FormErrors, NoteForm, REQUIRED};
use crate::models::{Note, User, SLUG_MAX_LENGTH};
use crate::slug::slugify_truncated;
use anyhow::Context;
use std::sync::Arc;

/// Error types for note service operations
#[derive(Debug, thiserror::Error)]
pub enum NoteServiceError {
    /// Note missing or owned by someone else
    #[error("Note not found: {0}")]
    NotFound(String),

    /// The submitted form is invalid
    #[error("Invalid form")]
    Validation(FormErrors),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Note service for private per-user notes
pub struct NoteService {
    repo: Arc<dyn NoteRepository>,
}

impl NoteService {
    pub fn new(repo: Arc<dyn NoteRepository>) -> Self {
        Self { repo }
    }

    /// Slug the note will be stored under
    fn resolve_slug(form: &NoteForm) -> String {
        match form.provided_slug() {
            Some(slug) => slug.to_string(),
            None => slugify_truncated(form.title.trim(), SLUG_MAX_LENGTH),
        }
    }

    /// Validate `form` and resolve its slug. `current_id` is the note being
    /// edited, which may keep its own slug.
    async fn clean(&self, form: &NoteForm, current_id: Option<i64>) -> Result<String, NoteServiceError> {
        let mut errors = form.validate();
        let slug = Self::resolve_slug(form);

        if !errors.has_field("slug") {
            if slug.is_empty() {
                // Title had nothing to transliterate
                if !errors.has_field("title") {
                    errors.add("slug", REQUIRED);
                }
            } else {
                let taken = match current_id {
                    Some(id) => self.repo.exists_by_slug_excluding(&slug, id).await,
                    None => self.repo.exists_by_slug(&slug).await,
                }
                .context("Failed to check note slug")?;

                if taken {
                    errors.add("slug", duplicate_slug_message(&slug));
                }
            }
        }

        if errors.is_empty() {
            Ok(slug)
        } else {
            Err(NoteServiceError::Validation(errors))
        }
    }

    /// Create a note owned by `author`
    pub async fn create(&self, author: &User, form: &NoteForm) -> Result<Note, NoteServiceError> {
        let slug = self.clean(form, None).await?;

        let note = Note {
            id: 0,
            title: form.title.trim().to_string(),
            text: form.text.clone(),
            slug,
            author_id: author.id,
        };
        let created = self.repo.create(&note).await.context("Failed to create note")?;

        tracing::info!(note_id = created.id, slug = %created.slug, author_id = author.id, "Note created");
        Ok(created)
    }

    /// Notes written by `user`
    pub async fn list_for_author(&self, user: &User) -> Result<Vec<Note>, NoteServiceError> {
        let notes = self
            .repo
            .list_by_author(user.id)
            .await
            .context("Failed to list notes")?;
        Ok(notes)
    }

    /// A note, provided `user` wrote it
    pub async fn get_for_author(&self, slug: &str, user: &User) -> Result<Note, NoteServiceError> {
        let note = self
            .repo
            .get_by_slug(slug)
            .await
            .context("Failed to get note")?
            .ok_or_else(|| NoteServiceError::NotFound(slug.to_string()))?;

        if !user.owns(note.author_id) {
            tracing::debug!(slug, user_id = user.id, "Note access denied to non-author");
            return Err(NoteServiceError::NotFound(slug.to_string()));
        }
        Ok(note)
    }

    /// Replace title, text and slug of `user`'s note
    pub async fn update(&self, slug: &str, user: &User, form: &NoteForm) -> Result<Note, NoteServiceError> {
        let mut note = self.get_for_author(slug, user).await?;
        let new_slug = self.clean(form, Some(note.id)).await?;

        note.title = form.title.trim().to_string();
        note.text = form.text.clone();
        note.slug = new_slug;

        if !self.repo.update(&note).await.context("Failed to update note")? {
            return Err(NoteServiceError::NotFound(slug.to_string()));
        }

        tracing::info!(note_id = note.id, slug = %note.slug, "Note updated");
        Ok(note)
    }

    /// Delete `user`'s note, returning what was removed
    pub async fn delete(&self, slug: &str, user: &User) -> Result<Note, NoteServiceError> {
        let note = self.get_for_author(slug, user).await?;

        if !self.repo.delete(note.id).await.context("Failed to delete note")? {
            return Err(NoteServiceError::NotFound(slug.to_string()));
        }

        tracing::info!(note_id = note.id, slug = %note.slug, "Note deleted");
        Ok(note)
    }

    pub async fn count(&self) -> Result<i64, NoteServiceError> {
        Ok(self.repo.count().await.context("Failed to count notes")?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxNoteRepository, SqlxUserRepository, UserRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::slug::slugify;

    struct Fixture {
        service: NoteService,
        author: User,
        reader: User,
    }

    async fn setup() -> Fixture {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let users = SqlxUserRepository::new(pool.clone());
        let author = users.create(&User::new("BIBA".into(), "hash".into())).await.unwrap();
        let reader = users.create(&User::new("BOBA".into(), "hash".into())).await.unwrap();

        Fixture {
            service: NoteService::new(SqlxNoteRepository::boxed(pool)),
            author,
            reader,
        }
    }

    fn form_data() -> NoteForm {
        NoteForm::new("New Note", "Some text", Some("new-note"))
    }

    fn expect_validation<T: std::fmt::Debug>(result: Result<T, NoteServiceError>) -> FormErrors {
        match result {
            Err(NoteServiceError::Validation(errors)) => errors,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_create_note() {
        let f = setup().await;

        let note = f.service.create(&f.author, &form_data()).await.expect("Failed to create note");

        assert_eq!(note.title, "New Note");
        assert_eq!(note.text, "Some text");
        assert_eq!(note.slug, "new-note");
        assert_eq!(note.author_id, f.author.id);
        assert_eq!(f.service.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_slug_is_rejected() {
        let f = setup().await;
        f.service.create(&f.author, &form_data()).await.unwrap();

        let errors = expect_validation(f.service.create(&f.reader, &form_data()).await);

        assert_eq!(errors.field("slug"), [duplicate_slug_message("new-note")]);
        assert_eq!(f.service.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_missing_slug_is_derived_from_title() {
        let f = setup().await;

        let form = NoteForm::new("Моя первая заметка", "Some text", None);
        let note = f.service.create(&f.author, &form).await.unwrap();
        assert_eq!(note.slug, slugify("Моя первая заметка"));
        assert_eq!(note.slug, "moya-pervaya-zametka");

        let blank = NoteForm::new("New Note", "Some text", Some(""));
        assert_eq!(f.service.create(&f.author, &blank).await.unwrap().slug, "new-note");
    }

    #[tokio::test]
    async fn test_derived_slug_is_checked_for_uniqueness() {
        let f = setup().await;
        f.service.create(&f.author, &NoteForm::new("Same", "a", None)).await.unwrap();

        let errors = expect_validation(f.service.create(&f.author, &NoteForm::new("Same", "b", None)).await);
        assert!(errors.has("slug", &duplicate_slug_message("same")));
    }

    #[tokio::test]
    async fn test_title_without_letters_needs_explicit_slug() {
        let f = setup().await;

        let errors = expect_validation(f.service.create(&f.author, &NoteForm::new("!!!", "x", None)).await);
        assert!(errors.has("slug", REQUIRED));
    }

    #[tokio::test]
    async fn test_list_for_author_only_returns_own_notes() {
        let f = setup().await;
        f.service.create(&f.author, &form_data()).await.unwrap();
        f.service
            .create(&f.reader, &NoteForm::new("Reader note", "x", Some("reader-note")))
            .await
            .unwrap();

        let author_notes = f.service.list_for_author(&f.author).await.unwrap();
        assert_eq!(author_notes.len(), 1);
        assert_eq!(author_notes[0].slug, "new-note");

        let reader_notes = f.service.list_for_author(&f.reader).await.unwrap();
        assert!(reader_notes.iter().all(|n| n.author_id == f.reader.id));
    }

    #[tokio::test]
    async fn test_author_can_edit_note_and_keep_slug() {
        let f = setup().await;
        f.service.create(&f.author, &form_data()).await.unwrap();

        let edit = NoteForm::new("Edited", "Edited text", Some("new-note"));
        let updated = f.service.update("new-note", &f.author, &edit).await.unwrap();

        assert_eq!(updated.title, "Edited");
        assert_eq!(updated.slug, "new-note");
        let stored = f.service.get_for_author("new-note", &f.author).await.unwrap();
        assert_eq!(stored.text, "Edited text");
    }

    #[tokio::test]
    async fn test_edit_cannot_take_another_notes_slug() {
        let f = setup().await;
        f.service.create(&f.author, &form_data()).await.unwrap();
        f.service
            .create(&f.author, &NoteForm::new("Other", "x", Some("other")))
            .await
            .unwrap();

        let edit = NoteForm::new("Other", "x", Some("new-note"));
        let errors = expect_validation(f.service.update("other", &f.author, &edit).await);
        assert!(errors.has("slug", &duplicate_slug_message("new-note")));
    }

    #[tokio::test]
    async fn test_reader_gets_not_found() {
        let f = setup().await;
        f.service.create(&f.author, &form_data()).await.unwrap();

        assert!(matches!(
            f.service.get_for_author("new-note", &f.reader).await,
            Err(NoteServiceError::NotFound(_))
        ));
        assert!(matches!(
            f.service.update("new-note", &f.reader, &form_data()).await,
            Err(NoteServiceError::NotFound(_))
        ));
        assert!(matches!(
            f.service.delete("new-note", &f.reader).await,
            Err(NoteServiceError::NotFound(_))
        ));

        let note = f.service.get_for_author("new-note", &f.author).await.unwrap();
        assert_eq!(note.title, "New Note");
    }

    #[tokio::test]
    async fn test_author_can_delete_note() {
        let f = setup().await;
        f.service.create(&f.author, &form_data()).await.unwrap();

        f.service.delete("new-note", &f.author).await.unwrap();
        assert_eq!(f.service.count().await.unwrap(), 0);
    }
}
