//! Form payloads and server-side validation
//!
//! Every form deserializes from an `application/x-www-form-urlencoded`
//! body and validates into a [`FormErrors`] value. Validation failures
//! are not errors: the page is re-rendered with the messages attached to
//! their fields.

mod errors;

pub use errors::{BoundForm, FormErrors, NON_FIELD_ERRORS};

use serde::{Deserialize, Serialize};

use crate::models::{SLUG_MAX_LENGTH, TITLE_MAX_LENGTH};
use crate::slug::is_valid_slug;

/// Words a comment may not contain
pub const BAD_WORDS: &[&str] = &["редиска", "негодяй"];

/// Error shown when a comment contains a banned word
pub const WARNING: &str = "Не ругайтесь!";

/// Suffix of the duplicate slug error, prefixed with the slug itself
pub const SLUG_WARNING: &str = " - такой slug уже существует, придумайте уникальное значение!";

pub const REQUIRED: &str = "Обязательное поле.";
pub const INVALID_SLUG: &str =
    "Значение должно состоять только из латинских букв, цифр, знаков подчеркивания или дефиса.";
pub const INVALID_USERNAME: &str =
    "Введите правильное имя пользователя. Оно может содержать только буквы, цифры и знаки @/./+/-/_.";
pub const USERNAME_TAKEN: &str = "Пользователь с таким именем уже существует.";
pub const PASSWORD_MISMATCH: &str = "Введенные пароли не совпадают.";
pub const PASSWORD_TOO_SHORT: &str =
    "Введённый пароль слишком короткий. Он должен содержать как минимум 8 символов.";
pub const INVALID_LOGIN: &str = "Пожалуйста, введите правильные имя пользователя и пароль. \
     Оба поля могут быть чувствительны к регистру.";
pub const TOO_MANY_ATTEMPTS: &str = "Слишком много неудачных попыток входа. Попробуйте позже.";

pub const USERNAME_MAX_LENGTH: usize = 150;
pub const PASSWORD_MIN_LENGTH: usize = 8;

/// Full duplicate slug message for `slug`
pub fn duplicate_slug_message(slug: &str) -> String {
    format!("{slug}{SLUG_WARNING}")
}

fn max_length_message(max: usize, len: usize) -> String {
    format!("Убедитесь, что это значение содержит не более {max} символов (сейчас {len}).")
}

/// Record `REQUIRED` for blank values and a length error for long ones
fn check_text(errors: &mut FormErrors, field: &str, value: &str, max: Option<usize>) {
    if value.trim().is_empty() {
        errors.add(field, REQUIRED);
        return;
    }
    if let Some(max) = max {
        let len = value.chars().count();
        if len > max {
            errors.add(field, max_length_message(max, len));
        }
    }
}

/// Whether `text` contains any of `banned` (case-insensitive substring)
pub fn contains_banned_word<S: AsRef<str>>(text: &str, banned: &[S]) -> bool {
    let text = text.to_lowercase();
    banned
        .iter()
        .map(|w| w.as_ref().trim().to_lowercase())
        .any(|w| !w.is_empty() && text.contains(&w))
}

/// Comment on a news item
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentForm {
    #[serde(default)]
    pub text: String,
}

impl CommentForm {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn validate<S: AsRef<str>>(&self, banned_words: &[S]) -> FormErrors {
        let mut errors = FormErrors::new();
        check_text(&mut errors, "text", &self.text, None);
        if errors.is_empty() && contains_banned_word(&self.text, banned_words) {
            errors.add("text", WARNING);
        }
        errors
    }
}

/// Create or edit a note
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub text: String,
    /// Derived from the title when absent or blank
    #[serde(default)]
    pub slug: Option<String>,
}

impl NoteForm {
    pub fn new(title: impl Into<String>, text: impl Into<String>, slug: Option<&str>) -> Self {
        Self {
            title: title.into(),
            text: text.into(),
            slug: slug.map(str::to_string),
        }
    }

    /// The submitted slug, if one was actually provided
    pub fn provided_slug(&self) -> Option<&str> {
        self.slug.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    /// Field checks. Slug uniqueness needs the database and is checked by
    /// `NoteService`.
    pub fn validate(&self) -> FormErrors {
        let mut errors = FormErrors::new();
        check_text(&mut errors, "title", &self.title, Some(TITLE_MAX_LENGTH));
        check_text(&mut errors, "text", &self.text, None);

        if let Some(slug) = self.provided_slug() {
            let len = slug.chars().count();
            if len > SLUG_MAX_LENGTH {
                errors.add("slug", max_length_message(SLUG_MAX_LENGTH, len));
            } else if !is_valid_slug(slug) {
                errors.add("slug", INVALID_SLUG);
            }
        }
        errors
    }
}

/// Account registration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SignupForm {
    #[serde(default)]
    pub username: String,
    #[serde(default, skip_serializing)]
    pub password1: String,
    #[serde(default, skip_serializing)]
    pub password2: String,
}

impl SignupForm {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        let password = password.into();
        Self {
            username: username.into(),
            password1: password.clone(),
            password2: password,
        }
    }

    pub fn validate(&self) -> FormErrors {
        let mut errors = FormErrors::new();

        check_text(&mut errors, "username", &self.username, Some(USERNAME_MAX_LENGTH));
        if !errors.has_field("username") && !is_valid_username(self.username.trim()) {
            errors.add("username", INVALID_USERNAME);
        }

        if self.password1.is_empty() {
            errors.add("password1", REQUIRED);
        }
        if self.password2.is_empty() {
            errors.add("password2", REQUIRED);
        }
        if !self.password1.is_empty() && !self.password2.is_empty() {
            if self.password1 != self.password2 {
                errors.add("password2", PASSWORD_MISMATCH);
            } else if self.password1.chars().count() < PASSWORD_MIN_LENGTH {
                errors.add("password2", PASSWORD_TOO_SHORT);
            }
        }
        errors
    }
}

/// Letters, digits and `@.+-_`
fn is_valid_username(username: &str) -> bool {
    username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
}

/// Login credentials
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default, skip_serializing)]
    pub password: String,
}

impl LoginForm {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn validate(&self) -> FormErrors {
        let mut errors = FormErrors::new();
        check_text(&mut errors, "username", &self.username, None);
        if self.password.is_empty() {
            errors.add("password", REQUIRED);
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_comment_form_accepts_clean_text() {
        assert!(CommentForm::new("Текст комментария").validate(BAD_WORDS).is_empty());
    }

    #[test]
    fn test_comment_form_rejects_each_bad_word() {
        for word in BAD_WORDS {
            let errors = CommentForm::new(format!("Какой-то текст, {word}, еще текст"))
                .validate(BAD_WORDS);
            assert_eq!(errors.field("text"), [WARNING.to_string()]);
        }
    }

    #[test]
    fn test_comment_form_bad_word_is_case_insensitive() {
        let errors = CommentForm::new("Ты РЕДИСКА").validate(BAD_WORDS);
        assert!(errors.has("text", WARNING));
    }

    #[test]
    fn test_comment_form_requires_text() {
        let errors = CommentForm::new("   ").validate(BAD_WORDS);
        assert!(errors.has("text", REQUIRED));
    }

    #[test]
    fn test_note_form_validation() {
        assert!(NoteForm::new("New Note", "Some text", Some("new-note")).validate().is_empty());
        assert!(NoteForm::new("New Note", "Some text", None).validate().is_empty());

        let errors = NoteForm::new("", "", Some("не slug")).validate();
        assert!(errors.has("title", REQUIRED));
        assert!(errors.has("text", REQUIRED));
        assert!(errors.has("slug", INVALID_SLUG));
    }

    #[test]
    fn test_note_form_title_length() {
        let errors = NoteForm::new("я".repeat(TITLE_MAX_LENGTH + 1), "x", None).validate();
        assert!(errors.has_field("title"));
        assert!(NoteForm::new("я".repeat(TITLE_MAX_LENGTH), "x", None).validate().is_empty());
    }

    #[test]
    fn test_note_form_blank_slug_counts_as_missing() {
        let form = NoteForm::new("Title", "Text", Some("  "));
        assert_eq!(form.provided_slug(), None);
        assert!(form.validate().is_empty());
    }

    #[test]
    fn test_duplicate_slug_message() {
        assert_eq!(
            duplicate_slug_message("slug"),
            "slug - такой slug уже существует, придумайте уникальное значение!"
        );
    }

    #[test]
    fn test_signup_form_validation() {
        assert!(SignupForm::new("new.user", "long-enough-pw").validate().is_empty());

        let mut form = SignupForm::new("bad name!", "short");
        let errors = form.validate();
        assert!(errors.has("username", INVALID_USERNAME));
        assert!(errors.has("password2", PASSWORD_TOO_SHORT));

        form.password2 = "different".to_string();
        assert!(form.validate().has("password2", PASSWORD_MISMATCH));
    }

    #[test]
    fn test_signup_form_does_not_serialize_passwords() {
        let json = serde_json::to_string(&SignupForm::new("user", "secret-password")).unwrap();
        assert!(!json.contains("secret-password"));
    }

    #[test]
    fn test_login_form_requires_fields() {
        let errors = LoginForm::default().validate();
        assert!(errors.has("username", REQUIRED));
        assert!(errors.has("password", REQUIRED));
    }

    proptest! {
        #[test]
        fn prop_text_with_banned_word_is_rejected(
            prefix in "[а-яa-z ]{0,20}",
            suffix in "[а-яa-z ]{0,20}",
            idx in 0usize..BAD_WORDS.len(),
        ) {
            let text = format!("{prefix}{}{suffix}", BAD_WORDS[idx]);
            prop_assert!(CommentForm::new(text).validate(BAD_WORDS).has("text", WARNING));
        }

        #[test]
        fn prop_latin_text_is_never_banned(text in "[a-zA-Z0-9 .,!?]{1,80}") {
            prop_assume!(!text.trim().is_empty());
            prop_assert!(CommentForm::new(text).validate(BAD_WORDS).is_empty());
        }
    }
}
