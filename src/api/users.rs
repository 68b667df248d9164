//! Account pages: sign up, log in, log out

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};

use super::middleware::{
    clear_session_cookie, extract_session_token, redirect, session_cookie, with_cookie, AppState,
    HtmlForm, MaybeUser, WebError,
};
use crate::forms::{BoundForm, FormErrors, LoginForm, SignupForm, INVALID_LOGIN, TOO_MANY_ATTEMPTS};
use crate::services::UserServiceError;
use crate::urls::{is_safe_redirect, Route};

pub const LOGIN_TEMPLATE: &str = "users/login.html";
pub const LOGOUT_TEMPLATE: &str = "users/logout.html";
pub const SIGNUP_TEMPLATE: &str = "users/signup.html";

pub fn router() -> Router<AppState> {
    Router::new()
        .route(Route::UsersLogin.pattern(), get(login_form).post(login))
        .route(Route::UsersLogout.pattern(), get(logout).post(logout))
        .route(Route::UsersSignup.pattern(), get(signup_form).post(signup))
}

#[derive(Debug, Serialize)]
pub struct LoginPage {
    pub form: BoundForm<LoginForm>,
    /// Where to go after a successful login
    pub next: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SignupPage {
    pub form: BoundForm<SignupForm>,
}

#[derive(Debug, Serialize)]
pub struct LogoutPage {}

#[derive(Debug, Default, Deserialize)]
pub struct NextQuery {
    #[serde(default)]
    pub next: Option<String>,
}

/// Login form body
#[derive(Debug, Default, Deserialize)]
pub struct LoginSubmission {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub next: Option<String>,
}

fn safe_next(next: Option<String>) -> Option<String> {
    next.filter(|n| is_safe_redirect(n))
}

pub async fn login_form(
    State(state): State<AppState>,
    uri: Uri,
    MaybeUser(user): MaybeUser,
    Query(query): Query<NextQuery>,
) -> Result<Response, WebError> {
    let page = LoginPage {
        form: BoundForm::default(),
        next: safe_next(query.next),
    };
    Ok(state.render(LOGIN_TEMPLATE, &page, &uri, user.as_ref())?.into_response())
}

pub async fn login(
    State(state): State<AppState>,
    uri: Uri,
    HtmlForm(submission): HtmlForm<LoginSubmission>,
) -> Result<Response, WebError> {
    let next = safe_next(submission.next);
    let form = LoginForm::new(submission.username, submission.password);
    let key = form.username.trim().to_string();

    if state.rate_limiter.is_limited(&key).await {
        tracing::warn!(username = %key, "Login rate limited");
        let mut errors = FormErrors::new();
        errors.add_non_field(TOO_MANY_ATTEMPTS);
        let page = LoginPage {
            form: BoundForm::new(form, errors),
            next,
        };
        let html = state.render(LOGIN_TEMPLATE, &page, &uri, None)?;
        return Ok((StatusCode::TOO_MANY_REQUESTS, html).into_response());
    }

    match state.user_service.login(form.clone()).await {
        Ok((user, session)) => {
            state.rate_limiter.clear(&key).await;
            tracing::debug!(user_id = user.id, "Session cookie issued");

            let target = next.unwrap_or_else(|| Route::NewsHome.path());
            let max_age = state.user_service.session_lifetime().num_seconds();
            Ok(with_cookie(redirect(&target), &session_cookie(&session.id, max_age)))
        }
        Err(UserServiceError::Validation(errors)) => {
            if errors.non_field().iter().any(|m| m == INVALID_LOGIN) {
                state.rate_limiter.record_failed_attempt(&key).await;
            }
            let page = LoginPage {
                form: BoundForm::new(form, errors),
                next,
            };
            Ok(state.render(LOGIN_TEMPLATE, &page, &uri, None)?.into_response())
        }
        Err(e) => Err(e.into()),
    }
}

/// Ends the session (if any) and shows a confirmation page
pub async fn logout(State(state): State<AppState>, uri: Uri, headers: HeaderMap) -> Result<Response, WebError> {
    if let Some(token) = extract_session_token(&headers) {
        state.user_service.logout(&token).await?;
        tracing::info!("User logged out");
    }

    let html = state.render(LOGOUT_TEMPLATE, &LogoutPage {}, &uri, None)?;
    Ok(with_cookie(html.into_response(), &clear_session_cookie()))
}

pub async fn signup_form(
    State(state): State<AppState>,
    uri: Uri,
    MaybeUser(user): MaybeUser,
) -> Result<Response, WebError> {
    let page = SignupPage {
        form: BoundForm::default(),
    };
    Ok(state.render(SIGNUP_TEMPLATE, &page, &uri, user.as_ref())?.into_response())
}

pub async fn signup(
    State(state): State<AppState>,
    uri: Uri,
    HtmlForm(form): HtmlForm<SignupForm>,
) -> Result<Response, WebError> {
    match state.user_service.register(form.clone()).await {
        Ok(_) => Ok(redirect(&Route::UsersLogin.path())),
        Err(UserServiceError::Validation(errors)) => {
            let page = SignupPage {
                form: BoundForm::new(form, errors),
            };
            Ok(state.render(SIGNUP_TEMPLATE, &page, &uri, None)?.into_response())
        }
        Err(e) => Err(e.into()),
    }
}
