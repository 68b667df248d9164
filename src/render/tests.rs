//! Tests for the template engine

use super::*;
use crate::forms::{BoundForm, CommentForm, FormErrors, WARNING};
use crate::models::{News, Note};
use std::fs;
use tempfile::TempDir;

const PAGE_TEMPLATES: &[&str] = &[
    "news/home.html",
    "news/detail.html",
    "news/comment_edit.html",
    "news/comment_delete.html",
    "notes/home.html",
    "notes/list.html",
    "notes/form.html",
    "notes/detail.html",
    "notes/delete.html",
    "notes/success.html",
    "users/login.html",
    "users/logout.html",
    "users/signup.html",
];

fn author() -> User {
    let mut user = User::new("BIBA".to_string(), "hash".to_string());
    user.id = 1;
    user
}

fn note() -> Note {
    Note {
        id: 1,
        title: "Заголовок".to_string(),
        text: "Текст заметки".to_string(),
        slug: "note-slug".to_string(),
        author_id: 1,
    }
}

#[test]
fn test_builtin_templates_are_loaded() {
    let engine = TemplateEngine::builtin().unwrap();

    assert!(engine.has_template("base.html"));
    assert!(engine.has_template(ERROR_TEMPLATE));
    for template in PAGE_TEMPLATES {
        assert!(engine.has_template(template), "missing template {}", template);
    }
}

#[test]
fn test_standard_vars_are_rendered() {
    let engine = TemplateEngine::builtin().unwrap();
    let vars = StandardVars::new("/notes/").with_user(Some(&author()));

    let html = engine
        .render_page("notes/home.html", &serde_json::json!({}), &vars)
        .unwrap();

    assert!(html.contains("BIBA"));
    assert!(html.contains(&vars.year.to_string()));
    assert!(html.contains("/notes/add/"));
    assert!(!html.contains("/auth/signup/"));
}

#[test]
fn test_anonymous_navigation() {
    let engine = TemplateEngine::builtin().unwrap();
    let html = engine
        .render_page("notes/home.html", &serde_json::json!({}), &StandardVars::new("/notes/"))
        .unwrap();

    assert!(html.contains("/auth/login/"));
    assert!(html.contains("/auth/signup/"));
}

#[test]
fn test_url_function_in_templates() {
    let engine = TemplateEngine::builtin().unwrap();
    let vars = StandardVars::new("/notes/note/note-slug/").with_user(Some(&author()));

    let html = engine
        .render_page("notes/detail.html", &serde_json::json!({ "note": note() }), &vars)
        .unwrap();

    assert!(html.contains(r#"href="/notes/edit/note-slug/""#));
    assert!(html.contains(r#"href="/notes/delete/note-slug/""#));
}

#[test]
fn test_url_function_rejects_unknown_route() {
    use tera::Function;

    let result = UrlFunction.call(&HashMap::from([(
        "name".to_string(),
        Value::String("news:unknown".to_string()),
    )]));
    assert!(result.is_err());

    let numeric = UrlFunction
        .call(&HashMap::from([
            ("name".to_string(), Value::String("news:detail".to_string())),
            ("arg".to_string(), Value::from(7)),
        ]))
        .unwrap();
    assert_eq!(numeric, Value::String("/news/7/".to_string()));
}

#[test]
fn test_user_content_is_escaped() {
    let engine = TemplateEngine::builtin().unwrap();
    let mut hostile = note();
    hostile.title = "<script>alert(1)</script>".to_string();

    let html = engine
        .render_page(
            "notes/detail.html",
            &serde_json::json!({ "note": hostile }),
            &StandardVars::new("/"),
        )
        .unwrap();

    assert!(!html.contains("<script>"));
    assert!(html.contains("&lt;script&gt;"));
}

#[test]
fn test_form_errors_are_rendered() {
    let engine = TemplateEngine::builtin().unwrap();
    let mut errors = FormErrors::new();
    errors.add("text", WARNING);
    let news = News {
        id: 3,
        title: "Заголовок".to_string(),
        text: "Текст".to_string(),
        date: chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
    };
    let page = serde_json::json!({
        "news": news,
        "comments": [],
        "form": BoundForm::new(CommentForm::new("негодяй"), errors),
    });

    let html = engine
        .render_page("news/detail.html", &page, &StandardVars::new("/news/3/").with_user(Some(&author())))
        .unwrap();

    assert!(html.contains(WARNING));
    assert!(html.contains("comment-form"));
    assert!(html.contains("02.01.2024"));
}

#[test]
fn test_override_dir_replaces_builtin_template() {
    let temp_dir = TempDir::new().unwrap();
    fs::create_dir_all(temp_dir.path().join("notes")).unwrap();
    fs::write(
        temp_dir.path().join("notes/success.html"),
        r#"{% extends "base.html" %}{% block content %}Custom done{% endblock %}"#,
    )
    .unwrap();

    let engine = TemplateEngine::new(Some(temp_dir.path())).unwrap();
    let html = engine
        .render_page("notes/success.html", &serde_json::json!({}), &StandardVars::new("/notes/done/"))
        .unwrap();

    assert!(html.contains("Custom done"));
    assert!(engine.has_template("notes/list.html"));
}

#[test]
fn test_missing_override_dir_falls_back_to_builtin() {
    let temp_dir = TempDir::new().unwrap();
    let engine = TemplateEngine::new(Some(&temp_dir.path().join("missing"))).unwrap();
    assert!(engine.has_template("news/home.html"));
}

#[test]
fn test_broken_override_is_reported() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("base.html"), "{% block content %}").unwrap();

    let result = TemplateEngine::new(Some(temp_dir.path()));
    assert!(matches!(result, Err(RenderError::TemplateError(_))));
}

#[test]
fn test_render_unknown_template_names_it() {
    let engine = TemplateEngine::builtin().unwrap();
    let err = engine.render("nope.html", &TeraContext::new()).unwrap_err();
    assert!(err.to_string().contains("nope.html"));
}

#[test]
fn test_page_must_serialize_to_a_map() {
    let result = page_context(&vec![1, 2, 3], &StandardVars::new("/"));
    assert!(matches!(result, Err(RenderError::InvalidContext(_))));
}

#[test]
fn test_render_error_page() {
    let engine = TemplateEngine::builtin().unwrap();
    let html = engine.render_error(404, "Страница не найдена", &StandardVars::new("/missing/"));

    assert!(html.contains("404"));
    assert!(html.contains("Страница не найдена"));
}

#[test]
fn test_render_error_falls_back_to_simple_page() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("error.html"), "{{ missing_variable }}").unwrap();

    let engine = TemplateEngine::new(Some(temp_dir.path())).unwrap();
    let html = engine.render_error(500, "<boom>", &StandardVars::new("/"));

    assert!(html.contains("<h1>500</h1>"));
    assert!(html.contains("&lt;boom&gt;"));
}
