//! News board pages
//!
//! The home page and news detail are public. Commenting needs a signed-in
//! user; editing and deleting a comment is left to its author, everyone
//! else gets a 404.

use axum::{
    extract::{Path, State},
    http::Uri,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Serialize;

use super::middleware::{
    parse_id, redirect, AppState, CurrentUser, HtmlForm, MaybeUser, WebError,
};
use crate::forms::{BoundForm, CommentForm};
use crate::models::{Comment, CommentWithAuthor, News, NewsWithCommentCount, User};
use crate::services::CommentServiceError;
use crate::urls::Route;

pub const HOME_TEMPLATE: &str = "news/home.html";
pub const DETAIL_TEMPLATE: &str = "news/detail.html";
pub const EDIT_TEMPLATE: &str = "news/comment_edit.html";
pub const DELETE_TEMPLATE: &str = "news/comment_delete.html";

pub fn router() -> Router<AppState> {
    Router::new()
        .route(Route::NewsHome.pattern(), get(home))
        .route(Route::NewsDetail.pattern(), get(detail).post(add_comment))
        .route(Route::NewsEdit.pattern(), get(edit_comment_form).post(edit_comment))
        .route(
            Route::NewsDelete.pattern(),
            get(delete_comment_form).post(delete_comment).delete(delete_comment),
        )
}

#[derive(Debug, Serialize)]
pub struct HomePage {
    pub news_list: Vec<NewsWithCommentCount>,
}

#[derive(Debug, Serialize)]
pub struct DetailPage {
    pub news: News,
    pub comments: Vec<CommentWithAuthor>,
    /// Comment form, only for signed-in users
    pub form: Option<BoundForm<CommentForm>>,
}

#[derive(Debug, Serialize)]
pub struct CommentEditPage {
    pub comment: Comment,
    pub form: BoundForm<CommentForm>,
}

#[derive(Debug, Serialize)]
pub struct CommentDeletePage {
    pub comment: Comment,
}

/// Detail page anchor where comments start
fn comments_url(news_id: i64) -> String {
    format!("{}#comments", Route::NewsDetail.path_with(news_id))
}

pub async fn home_page(state: &AppState) -> Result<HomePage, WebError> {
    Ok(HomePage {
        news_list: state.news_service.home().await?,
    })
}

/// Detail page context. `form` carries a rejected submission; signed-in
/// users without one get an empty form.
pub async fn detail_page(
    state: &AppState,
    news_id: i64,
    user: Option<&User>,
    form: Option<BoundForm<CommentForm>>,
) -> Result<DetailPage, WebError> {
    let news = state.news_service.get_by_id(news_id).await?;
    let comments = state.comment_service.get_by_news(news_id).await?;
    let form = user.map(|_| form.unwrap_or_default());

    Ok(DetailPage { news, comments, form })
}

pub async fn comment_edit_page(
    state: &AppState,
    comment_id: i64,
    user: &User,
) -> Result<CommentEditPage, WebError> {
    let comment = state.comment_service.get_for_author(comment_id, user).await?;
    let form = BoundForm::unbound(CommentForm::new(comment.text.clone()));
    Ok(CommentEditPage { comment, form })
}

pub async fn comment_delete_page(
    state: &AppState,
    comment_id: i64,
    user: &User,
) -> Result<CommentDeletePage, WebError> {
    let comment = state.comment_service.get_for_author(comment_id, user).await?;
    Ok(CommentDeletePage { comment })
}

pub async fn home(State(state): State<AppState>, uri: Uri, MaybeUser(user): MaybeUser) -> Result<Response, WebError> {
    let page = home_page(&state).await?;
    Ok(state.render(HOME_TEMPLATE, &page, &uri, user.as_ref())?.into_response())
}

pub async fn detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
    uri: Uri,
    MaybeUser(user): MaybeUser,
) -> Result<Response, WebError> {
    let page = detail_page(&state, parse_id(&id)?, user.as_ref(), None).await?;
    Ok(state.render(DETAIL_TEMPLATE, &page, &uri, user.as_ref())?.into_response())
}

pub async fn add_comment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    uri: Uri,
    CurrentUser(user): CurrentUser,
    HtmlForm(form): HtmlForm<CommentForm>,
) -> Result<Response, WebError> {
    let news_id = parse_id(&id)?;

    match state.comment_service.create(news_id, &user, &form).await {
        Ok(_) => Ok(redirect(&comments_url(news_id))),
        Err(CommentServiceError::Validation(errors)) => {
            let bound = BoundForm::new(form, errors);
            let page = detail_page(&state, news_id, Some(&user), Some(bound)).await?;
            Ok(state.render(DETAIL_TEMPLATE, &page, &uri, Some(&user))?.into_response())
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn edit_comment_form(
    State(state): State<AppState>,
    Path(id): Path<String>,
    uri: Uri,
    CurrentUser(user): CurrentUser,
) -> Result<Response, WebError> {
    let page = comment_edit_page(&state, parse_id(&id)?, &user).await?;
    Ok(state.render(EDIT_TEMPLATE, &page, &uri, Some(&user))?.into_response())
}

pub async fn edit_comment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    uri: Uri,
    CurrentUser(user): CurrentUser,
    HtmlForm(form): HtmlForm<CommentForm>,
) -> Result<Response, WebError> {
    let comment_id = parse_id(&id)?;

    match state.comment_service.update(comment_id, &user, &form).await {
        Ok(comment) => Ok(redirect(&comments_url(comment.news_id))),
        Err(CommentServiceError::Validation(errors)) => {
            let comment = state.comment_service.get_for_author(comment_id, &user).await?;
            let page = CommentEditPage {
                comment,
                form: BoundForm::new(form, errors),
            };
            Ok(state.render(EDIT_TEMPLATE, &page, &uri, Some(&user))?.into_response())
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn delete_comment_form(
    State(state): State<AppState>,
    Path(id): Path<String>,
    uri: Uri,
    CurrentUser(user): CurrentUser,
) -> Result<Response, WebError> {
    let page = comment_delete_page(&state, parse_id(&id)?, &user).await?;
    Ok(state.render(DELETE_TEMPLATE, &page, &uri, Some(&user))?.into_response())
}

pub async fn delete_comment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    CurrentUser(user): CurrentUser,
) -> Result<Response, WebError> {
    let comment = state.comment_service.delete(parse_id(&id)?, &user).await?;
    Ok(redirect(&comments_url(comment.news_id)))
}
