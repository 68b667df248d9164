//! Data models
//!
//! Entities stored in the database and the input types used to create
//! them. Form payloads live in `crate::forms`.

mod comment;
mod news;
mod note;
mod session;
mod user;

pub use comment::{Comment, CommentWithAuthor};
pub use news::{CreateNewsInput, News, NewsWithCommentCount};
pub use note::{Note, SLUG_MAX_LENGTH, TITLE_MAX_LENGTH};
pub use session::Session;
pub use user::User;
