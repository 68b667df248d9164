//! Named routes
//!
//! Every page has a stable `app:view` name. Handlers, templates (through
//! the `url` template function) and tests build links from these names
//! instead of hard-coding paths.

use std::fmt;

/// Error produced when reversing a route name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UrlError {
    #[error("Unknown route: {0}")]
    UnknownRoute(String),

    #[error("Route {0} needs an argument")]
    MissingArgument(&'static str),

    #[error("Route {0} takes no argument")]
    UnexpectedArgument(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    NewsHome,
    NewsDetail,
    NewsEdit,
    NewsDelete,
    NotesHome,
    NotesList,
    NotesAdd,
    NotesDetail,
    NotesEdit,
    NotesDelete,
    NotesSuccess,
    UsersLogin,
    UsersLogout,
    UsersSignup,
}

impl Route {
    pub const ALL: [Route; 14] = [
        Route::NewsHome,
        Route::NewsDetail,
        Route::NewsEdit,
        Route::NewsDelete,
        Route::NotesHome,
        Route::NotesList,
        Route::NotesAdd,
        Route::NotesDetail,
        Route::NotesEdit,
        Route::NotesDelete,
        Route::NotesSuccess,
        Route::UsersLogin,
        Route::UsersLogout,
        Route::UsersSignup,
    ];

    /// `app:view` name
    pub fn name(self) -> &'static str {
        match self {
            Route::NewsHome => "news:home",
            Route::NewsDetail => "news:detail",
            Route::NewsEdit => "news:edit",
            Route::NewsDelete => "news:delete",
            Route::NotesHome => "notes:home",
            Route::NotesList => "notes:list",
            Route::NotesAdd => "notes:add",
            Route::NotesDetail => "notes:detail",
            Route::NotesEdit => "notes:edit",
            Route::NotesDelete => "notes:delete",
            Route::NotesSuccess => "notes:success",
            Route::UsersLogin => "users:login",
            Route::UsersLogout => "users:logout",
            Route::UsersSignup => "users:signup",
        }
    }

    /// Path pattern in router syntax
    pub fn pattern(self) -> &'static str {
        match self {
            Route::NewsHome => "/",
            Route::NewsDetail => "/news/{id}/",
            Route::NewsEdit => "/edit_comment/{id}/",
            Route::NewsDelete => "/delete_comment/{id}/",
            Route::NotesHome => "/notes/",
            Route::NotesList => "/notes/list/",
            Route::NotesAdd => "/notes/add/",
            Route::NotesDetail => "/notes/note/{slug}/",
            Route::NotesEdit => "/notes/edit/{slug}/",
            Route::NotesDelete => "/notes/delete/{slug}/",
            Route::NotesSuccess => "/notes/done/",
            Route::UsersLogin => "/auth/login/",
            Route::UsersLogout => "/auth/logout/",
            Route::UsersSignup => "/auth/signup/",
        }
    }

    pub fn from_name(name: &str) -> Option<Route> {
        Route::ALL.into_iter().find(|r| r.name() == name)
    }

    fn takes_argument(self) -> bool {
        self.pattern().contains('{')
    }

    /// Build the path, filling the single placeholder with `arg`.
    pub fn reverse(self, arg: Option<&str>) -> Result<String, UrlError> {
        let pattern = self.pattern();
        match (self.takes_argument(), arg) {
            (false, None) => Ok(pattern.to_string()),
            (false, Some(_)) => Err(UrlError::UnexpectedArgument(self.name())),
            (true, None) => Err(UrlError::MissingArgument(self.name())),
            (true, Some(arg)) => {
                let (start, rest) = pattern.split_once('{').unwrap_or((pattern, ""));
                let end = rest.split_once('}').map(|(_, end)| end).unwrap_or("");
                Ok(format!("{start}{}{end}", urlencoding::encode(arg)))
            }
        }
    }

    /// Path of a route without placeholder
    pub fn path(self) -> String {
        self.reverse(None).unwrap_or_else(|_| self.pattern().to_string())
    }

    /// Path of a route with placeholder
    pub fn path_with(self, arg: impl fmt::Display) -> String {
        let arg = arg.to_string();
        self.reverse(Some(&arg)).unwrap_or_else(|_| self.pattern().to_string())
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Reverse a route by name
///
/// ```
/// use newsnotes::urls::reverse;
///
/// assert_eq!(reverse("news:detail", Some("1")).unwrap(), "/news/1/");
/// assert_eq!(reverse("notes:add", None).unwrap(), "/notes/add/");
/// ```
pub fn reverse(name: &str, arg: Option<&str>) -> Result<String, UrlError> {
    Route::from_name(name)
        .ok_or_else(|| UrlError::UnknownRoute(name.to_string()))?
        .reverse(arg)
}

/// Login page URL that sends the user back to `next` afterwards.
///
/// Slashes in `next` stay readable: `/auth/login/?next=/notes/add/`.
pub fn login_url_with_next(next: &str) -> String {
    let encoded = urlencoding::encode(next).replace("%2F", "/");
    format!("{}?next={}", Route::UsersLogin.path(), encoded)
}

/// Whether `next` is safe to redirect to after login (a local path)
///
/// Browsers drop tabs and newlines while parsing a `Location`, so
/// `/<TAB>/host` would turn into `//host`. Any control character or
/// whitespace disqualifies the target.
pub fn is_safe_redirect(next: &str) -> bool {
    if next.chars().any(|c| c.is_control() || c.is_whitespace()) {
        return false;
    }
    next.starts_with('/') && !next.starts_with("//") && !next.contains('\\')
}
