//! Private notes pages
//!
//! Everything except the landing page needs a signed-in user. A note is
//! only visible to its author; other users get a 404 for it.

use axum::{
    extract::{Path, State},
    http::Uri,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Serialize;

use super::middleware::{redirect, AppState, CurrentUser, HtmlForm, MaybeUser, WebError};
use crate::forms::{BoundForm, NoteForm};
use crate::models::{Note, User};
use crate::services::NoteServiceError;
use crate::urls::Route;

pub const HOME_TEMPLATE: &str = "notes/home.html";
pub const LIST_TEMPLATE: &str = "notes/list.html";
pub const FORM_TEMPLATE: &str = "notes/form.html";
pub const DETAIL_TEMPLATE: &str = "notes/detail.html";
pub const DELETE_TEMPLATE: &str = "notes/delete.html";
pub const SUCCESS_TEMPLATE: &str = "notes/success.html";

pub fn router() -> Router<AppState> {
    Router::new()
        .route(Route::NotesHome.pattern(), get(home))
        .route(Route::NotesList.pattern(), get(list))
        .route(Route::NotesAdd.pattern(), get(add_form).post(add))
        .route(Route::NotesDetail.pattern(), get(detail))
        .route(Route::NotesEdit.pattern(), get(edit_form).post(edit))
        .route(
            Route::NotesDelete.pattern(),
            get(delete_form).post(delete).delete(delete),
        )
        .route(Route::NotesSuccess.pattern(), get(success))
}

#[derive(Debug, Serialize)]
pub struct EmptyPage {}

#[derive(Debug, Serialize)]
pub struct ListPage {
    pub object_list: Vec<Note>,
}

/// Add and edit form. `note` is the note being edited.
#[derive(Debug, Serialize)]
pub struct FormPage {
    pub form: BoundForm<NoteForm>,
    pub note: Option<Note>,
}

/// Detail and delete confirmation
#[derive(Debug, Serialize)]
pub struct NotePage {
    pub note: Note,
}

pub async fn list_page(state: &AppState, user: &User) -> Result<ListPage, WebError> {
    Ok(ListPage {
        object_list: state.note_service.list_for_author(user).await?,
    })
}

pub fn add_page() -> FormPage {
    FormPage {
        form: BoundForm::default(),
        note: None,
    }
}

pub async fn edit_page(state: &AppState, slug: &str, user: &User) -> Result<FormPage, WebError> {
    let note = state.note_service.get_for_author(slug, user).await?;
    let form = BoundForm::unbound(NoteForm::new(
        note.title.clone(),
        note.text.clone(),
        Some(note.slug.as_str()),
    ));
    Ok(FormPage { form, note: Some(note) })
}

pub async fn note_page(state: &AppState, slug: &str, user: &User) -> Result<NotePage, WebError> {
    Ok(NotePage {
        note: state.note_service.get_for_author(slug, user).await?,
    })
}

fn success_redirect() -> Response {
    redirect(&Route::NotesSuccess.path())
}

pub async fn home(State(state): State<AppState>, uri: Uri, MaybeUser(user): MaybeUser) -> Result<Response, WebError> {
    Ok(state.render(HOME_TEMPLATE, &EmptyPage {}, &uri, user.as_ref())?.into_response())
}

pub async fn list(State(state): State<AppState>, uri: Uri, CurrentUser(user): CurrentUser) -> Result<Response, WebError> {
    let page = list_page(&state, &user).await?;
    Ok(state.render(LIST_TEMPLATE, &page, &uri, Some(&user))?.into_response())
}

pub async fn add_form(State(state): State<AppState>, uri: Uri, CurrentUser(user): CurrentUser) -> Result<Response, WebError> {
    Ok(state.render(FORM_TEMPLATE, &add_page(), &uri, Some(&user))?.into_response())
}

pub async fn add(
    State(state): State<AppState>,
    uri: Uri,
    CurrentUser(user): CurrentUser,
    HtmlForm(form): HtmlForm<NoteForm>,
) -> Result<Response, WebError> {
    match state.note_service.create(&user, &form).await {
        Ok(_) => Ok(success_redirect()),
        Err(NoteServiceError::Validation(errors)) => {
            let page = FormPage {
                form: BoundForm::new(form, errors),
                note: None,
            };
            Ok(state.render(FORM_TEMPLATE, &page, &uri, Some(&user))?.into_response())
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn detail(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    uri: Uri,
    CurrentUser(user): CurrentUser,
) -> Result<Response, WebError> {
    let page = note_page(&state, &slug, &user).await?;
    Ok(state.render(DETAIL_TEMPLATE, &page, &uri, Some(&user))?.into_response())
}

pub async fn edit_form(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    uri: Uri,
    CurrentUser(user): CurrentUser,
) -> Result<Response, WebError> {
    let page = edit_page(&state, &slug, &user).await?;
    Ok(state.render(FORM_TEMPLATE, &page, &uri, Some(&user))?.into_response())
}

pub async fn edit(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    uri: Uri,
    CurrentUser(user): CurrentUser,
    HtmlForm(form): HtmlForm<NoteForm>,
) -> Result<Response, WebError> {
    match state.note_service.update(&slug, &user, &form).await {
        Ok(_) => Ok(success_redirect()),
        Err(NoteServiceError::Validation(errors)) => {
            let note = state.note_service.get_for_author(&slug, &user).await?;
            let page = FormPage {
                form: BoundForm::new(form, errors),
                note: Some(note),
            };
            Ok(state.render(FORM_TEMPLATE, &page, &uri, Some(&user))?.into_response())
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn delete_form(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    uri: Uri,
    CurrentUser(user): CurrentUser,
) -> Result<Response, WebError> {
    let page = note_page(&state, &slug, &user).await?;
    Ok(state.render(DELETE_TEMPLATE, &page, &uri, Some(&user))?.into_response())
}

pub async fn delete(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    CurrentUser(user): CurrentUser,
) -> Result<Response, WebError> {
    state.note_service.delete(&slug, &user).await?;
    Ok(success_redirect())
}

pub async fn success(State(state): State<AppState>, uri: Uri, CurrentUser(user): CurrentUser) -> Result<Response, WebError> {
    Ok(state.render(SUCCESS_TEMPLATE, &EmptyPage {}, &uri, Some(&user))?.into_response())
}
