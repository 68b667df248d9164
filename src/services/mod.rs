//! Services layer - Business logic
//!
//! Services sit between the web handlers and the repositories. They
//! implement validation that needs the database, ownership checks and
//! logging of writes.

pub mod comment;
pub mod news;
pub mod note;
pub mod password;
pub mod rate_limiter;
pub mod user;

pub use comment::{CommentService, CommentServiceError};
pub use news::{NewsService, NewsServiceError};
pub use note::{NoteService, NoteServiceError};
pub use password::{hash_password, verify_password};
pub use rate_limiter::LoginRateLimiter;
pub use user::{UserService, UserServiceError};
