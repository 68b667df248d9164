//! Web middleware and shared handler plumbing
//!
//! Contains:
//! - Application state
//! - Session cookie authentication (`optional_auth`)
//! - `CurrentUser` / `MaybeUser` extractors
//! - `HtmlForm` urlencoded body extractor
//! - `WebError` and the HTML error page layer

use axum::{
    extract::{FromRequest, FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, HeaderValue, StatusCode, Uri},
    middleware::Next,
    response::{Html, IntoResponse, Response},
    Form,
};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;

use crate::config::Config;
use crate::db::repositories::{
    SqlxCommentRepository, SqlxNewsRepository, SqlxNoteRepository, SqlxSessionRepository,
    SqlxUserRepository,
};
use crate::db::DynDatabasePool;
use crate::models::User;
use crate::render::{RenderError, StandardVars, TemplateEngine};
use crate::services::{
    CommentService, CommentServiceError, LoginRateLimiter, NewsService, NewsServiceError,
    NoteService, NoteServiceError, UserService, UserServiceError,
};
use crate::urls::login_url_with_next;

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "session";

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub pool: DynDatabasePool,
    pub config: Arc<Config>,
    pub user_service: Arc<UserService>,
    pub news_service: Arc<NewsService>,
    pub comment_service: Arc<CommentService>,
    pub note_service: Arc<NoteService>,
    pub rate_limiter: Arc<LoginRateLimiter>,
    pub templates: Arc<TemplateEngine>,
}

impl AppState {
    /// Wire repositories and services over `pool`
    pub fn new(pool: DynDatabasePool, config: Config, templates: TemplateEngine) -> Self {
        let news_repo = SqlxNewsRepository::boxed(pool.clone());

        let user_service = UserService::with_session_expiration(
            SqlxUserRepository::boxed(pool.clone()),
            SqlxSessionRepository::boxed(pool.clone()),
            config.session.expiration_days,
        );
        let news_service = NewsService::new(news_repo.clone(), config.news.count_on_home_page);
        let comment_service = CommentService::new(
            SqlxCommentRepository::boxed(pool.clone()),
            news_repo,
            config.news.banned_words.clone(),
        );
        let note_service = NoteService::new(SqlxNoteRepository::boxed(pool.clone()));

        Self {
            pool,
            config: Arc::new(config),
            user_service: Arc::new(user_service),
            news_service: Arc::new(news_service),
            comment_service: Arc::new(comment_service),
            note_service: Arc::new(note_service),
            rate_limiter: Arc::new(LoginRateLimiter::new()),
            templates: Arc::new(templates),
        }
    }

    /// Render `template` with the page data and the standard variables
    pub fn render<T: Serialize>(
        &self,
        template: &str,
        page: &T,
        uri: &Uri,
        user: Option<&User>,
    ) -> Result<Html<String>, WebError> {
        let vars = StandardVars::new(uri.path()).with_user(user);
        Ok(Html(self.templates.render_page(template, page, &vars)?))
    }
}

/// User resolved from the session cookie
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

/// Extract the session token from the `Cookie` header
pub fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    let cookie_header = headers.get(header::COOKIE)?.to_str().ok()?;
    cookie_header
        .split(';')
        .filter_map(|cookie| cookie.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

/// Resolve the session cookie, if any, into an `AuthenticatedUser` extension
pub async fn optional_auth(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    if let Some(token) = extract_session_token(request.headers()) {
        match state.user_service.validate_session(&token).await {
            Ok(Some(user)) => {
                request.extensions_mut().insert(AuthenticatedUser(user));
            }
            Ok(None) => tracing::debug!("Request with unknown or expired session"),
            Err(e) => tracing::warn!("Session validation failed: {}", e),
        }
    }
    next.run(request).await
}

/// Signed-in user. Anonymous visitors are redirected to the login page
/// with `next` pointing back at the requested URL.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<AuthenticatedUser>() {
            Some(AuthenticatedUser(user)) => Ok(CurrentUser(user.clone())),
            None => {
                let next = parts
                    .uri
                    .path_and_query()
                    .map(|pq| pq.as_str())
                    .unwrap_or_else(|| parts.uri.path());
                Err(redirect(&login_url_with_next(next)))
            }
        }
    }
}

/// Signed-in user, or `None` for anonymous visitors
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<User>);

impl<S: Send + Sync> FromRequestParts<S> for MaybeUser {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(
            parts
                .extensions
                .get::<AuthenticatedUser>()
                .map(|AuthenticatedUser(user)| user.clone()),
        ))
    }
}

/// Message shown when a form body cannot be read
pub const MALFORMED_FORM: &str = "Не удалось прочитать данные формы.";

/// `Form<T>` whose rejection goes through [`WebError`], so a malformed body
/// gets the HTML error page like any other failure.
#[derive(Debug, Clone)]
pub struct HtmlForm<T>(pub T);

impl<T, S> FromRequest<S> for HtmlForm<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = WebError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Form::<T>::from_request(request, state).await {
            Ok(Form(value)) => Ok(HtmlForm(value)),
            Err(rejection) => {
                tracing::debug!("Rejected form body: {}", rejection.body_text());
                Err(WebError::BadRequest(MALFORMED_FORM.to_string()))
            }
        }
    }
}

/// `302 Found` to `location`
pub fn redirect(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => (StatusCode::FOUND, [(header::LOCATION, value)]).into_response(),
        Err(_) => WebError::Internal(anyhow::anyhow!("Invalid redirect target: {}", location)).into_response(),
    }
}

/// Attach a `Set-Cookie` header to `response`
pub fn with_cookie(mut response: Response, cookie: &str) -> Response {
    match HeaderValue::from_str(cookie) {
        Ok(value) => {
            response.headers_mut().append(header::SET_COOKIE, value);
            response
        }
        Err(_) => WebError::Internal(anyhow::anyhow!("Invalid cookie value")).into_response(),
    }
}

/// `Set-Cookie` value for a fresh session
pub fn session_cookie(token: &str, max_age_seconds: i64) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE, token, max_age_seconds
    )
}

/// `Set-Cookie` value that removes the session cookie
pub fn clear_session_cookie() -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE)
}

/// Errors that end a request with an error page
#[derive(Debug, thiserror::Error)]
pub enum WebError {
    #[error("Not found")]
    NotFound,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Marker left on error responses for `error_pages` to fill in
#[derive(Debug, Clone)]
struct ErrorPageInfo {
    message: String,
}

impl WebError {
    pub fn status(&self) -> StatusCode {
        match self {
            WebError::NotFound => StatusCode::NOT_FOUND,
            WebError::BadRequest(_) => StatusCode::BAD_REQUEST,
            WebError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn public_message(&self) -> String {
        match self {
            WebError::NotFound => "Страница не найдена.".to_string(),
            WebError::BadRequest(message) => message.clone(),
            WebError::Internal(_) => "Внутренняя ошибка сервера.".to_string(),
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        if let WebError::Internal(e) = &self {
            tracing::error!("Request failed: {:#}", e);
        }

        let message = self.public_message();
        let mut response = (self.status(), message.clone()).into_response();
        response.extensions_mut().insert(ErrorPageInfo { message });
        response
    }
}

impl From<RenderError> for WebError {
    fn from(e: RenderError) -> Self {
        WebError::Internal(e.into())
    }
}

impl From<NewsServiceError> for WebError {
    fn from(e: NewsServiceError) -> Self {
        match e {
            NewsServiceError::NotFound(_) => WebError::NotFound,
            NewsServiceError::ValidationError(message) => WebError::BadRequest(message),
            NewsServiceError::InternalError(e) => WebError::Internal(e),
        }
    }
}

impl From<CommentServiceError> for WebError {
    fn from(e: CommentServiceError) -> Self {
        match e {
            CommentServiceError::NotFound(_) | CommentServiceError::NewsNotFound(_) => WebError::NotFound,
            CommentServiceError::Validation(errors) => WebError::BadRequest(format!("{:?}", errors)),
            CommentServiceError::InternalError(e) => WebError::Internal(e),
        }
    }
}

impl From<NoteServiceError> for WebError {
    fn from(e: NoteServiceError) -> Self {
        match e {
            NoteServiceError::NotFound(_) => WebError::NotFound,
            NoteServiceError::Validation(errors) => WebError::BadRequest(format!("{:?}", errors)),
            NoteServiceError::InternalError(e) => WebError::Internal(e),
        }
    }
}

impl From<UserServiceError> for WebError {
    fn from(e: UserServiceError) -> Self {
        match e {
            UserServiceError::Validation(errors) => WebError::BadRequest(format!("{:?}", errors)),
            UserServiceError::InternalError(e) => WebError::Internal(e),
        }
    }
}

/// Parse a numeric path segment; anything else is a missing page
pub fn parse_id(raw: &str) -> Result<i64, WebError> {
    raw.parse::<i64>().map_err(|_| WebError::NotFound)
}

/// Replace the plain body of `WebError` responses with the rendered error page
pub async fn error_pages(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    let user = request
        .extensions()
        .get::<AuthenticatedUser>()
        .map(|AuthenticatedUser(user)| user.clone());

    let response = next.run(request).await;

    let Some(info) = response.extensions().get::<ErrorPageInfo>().cloned() else {
        return response;
    };

    let status = response.status();
    let vars = StandardVars::new(path).with_user(user.as_ref());
    let html = state.templates.render_error(status.as_u16(), &info.message, &vars);
    (status, Html(html)).into_response()
}

/// Router fallback
pub async fn not_found() -> WebError {
    WebError::NotFound
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request};

    fn headers_with_cookie(cookie: &str) -> HeaderMap {
        let request = Request::builder()
            .uri("/test")
            .header(header::COOKIE, cookie)
            .body(Body::empty())
            .unwrap();
        request.headers().clone()
    }

    #[test]
    fn test_extract_session_token_from_cookie() {
        let headers = headers_with_cookie("session=test-token-456");
        assert_eq!(extract_session_token(&headers), Some("test-token-456".to_string()));
    }

    #[test]
    fn test_extract_session_token_among_other_cookies() {
        let headers = headers_with_cookie("theme=dark; session=abc; lang=ru");
        assert_eq!(extract_session_token(&headers), Some("abc".to_string()));
    }

    #[test]
    fn test_extract_session_token_none() {
        assert!(extract_session_token(&HeaderMap::new()).is_none());
        assert!(extract_session_token(&headers_with_cookie("session=")).is_none());
        assert!(extract_session_token(&headers_with_cookie("sessionid=abc")).is_none());
    }

    #[test]
    fn test_session_cookies() {
        assert_eq!(
            session_cookie("abc", 60),
            "session=abc; Path=/; HttpOnly; SameSite=Lax; Max-Age=60"
        );
        assert!(clear_session_cookie().contains("Max-Age=0"));
    }

    #[test]
    fn test_redirect_is_302() {
        let response = redirect("/notes/done/");
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[header::LOCATION], "/notes/done/");
    }

    #[test]
    fn test_web_error_status() {
        assert_eq!(WebError::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            WebError::from(NoteServiceError::NotFound("x".into())).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            WebError::from(CommentServiceError::NewsNotFound(1)).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            WebError::Internal(anyhow::anyhow!("boom")).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_html_form_rejects_body_without_content_type() {
        let request = Request::builder()
            .method("POST")
            .uri("/notes/add/")
            .body(Body::from("title=a&text=b"))
            .unwrap();

        let result = HtmlForm::<crate::forms::NoteForm>::from_request(request, &()).await;

        match result {
            Err(WebError::BadRequest(message)) => assert_eq!(message, MALFORMED_FORM),
            other => panic!("expected a bad request, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_html_form_reads_urlencoded_body() {
        let request = Request::builder()
            .method("POST")
            .uri("/notes/add/")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("title=a&text=b"))
            .unwrap();

        let HtmlForm(form) = HtmlForm::<crate::forms::NoteForm>::from_request(request, &())
            .await
            .unwrap();

        assert_eq!(form.title, "a");
        assert_eq!(form.text, "b");
    }

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id("12").unwrap(), 12);
        assert!(matches!(parse_id("abc"), Err(WebError::NotFound)));
    }
}
