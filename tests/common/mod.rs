//! Shared fixtures for the integration tests
//!
//! Every test gets its own in-memory database, an author and a reader
//! with open sessions, and a `TestServer` over the full router.

#![allow(dead_code)]

use axum::http::{header, HeaderValue, Method, StatusCode};
use axum_test::{TestRequest, TestResponse, TestServer};

use newsnotes::api::{build_router, AppState};
use newsnotes::config::Config;
use newsnotes::db::repositories::{SqlxUserRepository, UserRepository};
use newsnotes::db::{create_test_pool, migrations};
use newsnotes::forms::{CommentForm, NoteForm};
use newsnotes::models::{Comment, CreateNewsInput, News, Note, User};
use newsnotes::render::TemplateEngine;

/// Who sends a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Client {
    Anonymous,
    Author,
    Reader,
}

pub struct TestApp {
    pub server: TestServer,
    pub state: AppState,
    pub author: User,
    pub reader: User,
    author_cookie: String,
    reader_cookie: String,
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with_config(Config::default()).await
}

pub async fn spawn_app_with_config(config: Config) -> TestApp {
    let pool = create_test_pool().await.expect("Failed to create test pool");
    migrations::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");

    let users = SqlxUserRepository::new(pool.clone());
    let author = users
        .create(&User::new("author".to_string(), "unused-hash".to_string()))
        .await
        .expect("Failed to create author");
    let reader = users
        .create(&User::new("reader".to_string(), "unused-hash".to_string()))
        .await
        .expect("Failed to create reader");

    let templates = TemplateEngine::builtin().expect("Failed to load templates");
    let state = AppState::new(pool, config, templates);

    let author_cookie = session_cookie_for(&state, &author).await;
    let reader_cookie = session_cookie_for(&state, &reader).await;

    let server = TestServer::new(build_router(state.clone())).expect("Failed to start test server");

    TestApp {
        server,
        state,
        author,
        reader,
        author_cookie,
        reader_cookie,
    }
}

async fn session_cookie_for(state: &AppState, user: &User) -> String {
    let session = state
        .user_service
        .create_session(user.id)
        .await
        .expect("Failed to create session");
    format!("session={}", session.id)
}

impl TestApp {
    pub fn user(&self, client: Client) -> Option<&User> {
        match client {
            Client::Anonymous => None,
            Client::Author => Some(&self.author),
            Client::Reader => Some(&self.reader),
        }
    }

    pub fn request(&self, method: Method, path: &str, client: Client) -> TestRequest {
        let request = self.server.method(method, path);
        let cookie = match client {
            Client::Anonymous => return request,
            Client::Author => &self.author_cookie,
            Client::Reader => &self.reader_cookie,
        };
        request.add_header(header::COOKIE, HeaderValue::from_str(cookie).unwrap())
    }

    pub async fn get(&self, path: &str, client: Client) -> TestResponse {
        self.request(Method::GET, path, client).await
    }

    pub async fn post_form<T: serde::Serialize>(&self, path: &str, client: Client, form: &T) -> TestResponse {
        self.request(Method::POST, path, client).form(form).await
    }

    pub async fn create_news(&self, input: CreateNewsInput) -> News {
        self.state
            .news_service
            .create(input)
            .await
            .expect("Failed to create news")
    }

    pub async fn news(&self) -> News {
        self.create_news(CreateNewsInput::new("Заголовок", "Текст")).await
    }

    pub async fn comment(&self, news: &News, text: &str) -> Comment {
        self.state
            .comment_service
            .create(news.id, &self.author, &CommentForm::new(text))
            .await
            .expect("Failed to create comment")
    }

    pub async fn note(&self) -> Note {
        self.state
            .note_service
            .create(&self.author, &NoteForm::new("Заголовок", "Текст", Some("note-slug")))
            .await
            .expect("Failed to create note")
    }

    pub async fn comment_count(&self) -> i64 {
        self.state.comment_service.count().await.unwrap()
    }

    pub async fn note_count(&self) -> i64 {
        self.state.note_service.count().await.unwrap()
    }
}

pub fn location(response: &TestResponse) -> String {
    response
        .header(header::LOCATION)
        .to_str()
        .expect("Location is not ASCII")
        .to_string()
}

pub fn assert_redirect(response: &TestResponse, expected: &str) {
    assert_eq!(response.status_code(), StatusCode::FOUND, "{}", response.text());
    assert_eq!(location(response), expected);
}

pub fn assert_login_redirect(response: &TestResponse, next: &str) {
    assert_redirect(response, &newsnotes::urls::login_url_with_next(next));
}
