//! Template engine
//!
//! Pages are rendered with Tera. The built-in templates under `templates/`
//! are embedded into the binary; a configured directory may override any
//! of them by providing a file with the same relative name.
//!
//! Every page gets the standard variables `user`, `request_path` and
//! `year`, and templates can build links with `url(name="news:detail", arg=id)`.

use chrono::Datelike;
use rust_embed::RustEmbed;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::error::Error as StdError;
use std::fs;
use std::path::{Path, PathBuf};
use tera::{Context as TeraContext, Tera, Value};

use crate::models::User;
use crate::urls;

mod error;

pub use error::RenderError;

/// Template rendered for error responses
pub const ERROR_TEMPLATE: &str = "error.html";

#[derive(RustEmbed)]
#[folder = "templates/"]
#[include = "*.html"]
struct BuiltinTemplates;

/// Tera wrapper holding the built-in and overriding templates
pub struct TemplateEngine {
    tera: Tera,
    override_dir: Option<PathBuf>,
}

impl TemplateEngine {
    /// Load the embedded templates, then the ones in `override_dir`
    pub fn new(override_dir: Option<&Path>) -> Result<Self, RenderError> {
        let mut engine = Self {
            tera: Tera::default(),
            override_dir: override_dir.map(Path::to_path_buf),
        };
        engine.reload()?;
        Ok(engine)
    }

    /// Engine with the embedded templates only
    pub fn builtin() -> Result<Self, RenderError> {
        Self::new(None)
    }

    /// Re-read every template from scratch
    pub fn reload(&mut self) -> Result<(), RenderError> {
        let mut templates = Self::builtin_templates()?;

        if let Some(dir) = &self.override_dir {
            if dir.is_dir() {
                collect_templates_from_dir(dir, dir, &mut templates)?;
                tracing::info!(dir = %dir.display(), "Loaded template overrides");
            } else {
                tracing::warn!(dir = %dir.display(), "Template override directory not found");
            }
        }

        let mut tera = Tera::default();
        tera.add_raw_templates(templates)
            .map_err(|e| RenderError::TemplateError(error_chain("Failed to load templates", &e)))?;
        tera.register_function("url", UrlFunction);

        self.tera = tera;
        Ok(())
    }

    fn builtin_templates() -> Result<BTreeMap<String, String>, RenderError> {
        let mut templates = BTreeMap::new();
        for name in BuiltinTemplates::iter() {
            let Some(file) = BuiltinTemplates::get(&name) else {
                continue;
            };
            let content = std::str::from_utf8(&file.data)
                .map_err(|_| RenderError::InvalidEncoding(name.to_string()))?
                .to_string();
            templates.insert(name.replace('\\', "/"), content);
        }
        Ok(templates)
    }

    pub fn has_template(&self, name: &str) -> bool {
        self.tera.get_template_names().any(|t| t == name)
    }

    pub fn template_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tera.get_template_names().map(String::from).collect();
        names.sort();
        names
    }

    /// Render a template with context
    pub fn render(&self, template: &str, context: &TeraContext) -> Result<String, RenderError> {
        self.tera.render(template, context).map_err(|e| {
            RenderError::TemplateError(error_chain(&format!("Failed to render '{}'", template), &e))
        })
    }

    /// Render a page struct together with the standard variables
    pub fn render_page<T: Serialize>(
        &self,
        template: &str,
        page: &T,
        vars: &StandardVars,
    ) -> Result<String, RenderError> {
        let context = page_context(page, vars)?;
        self.render(template, &context)
    }

    /// Render the error page. Never fails: falls back to a plain HTML page
    /// when the error template itself cannot be rendered.
    pub fn render_error(&self, status: u16, message: &str, vars: &StandardVars) -> String {
        let page = ErrorPage {
            status,
            message: message.to_string(),
        };

        match self.render_page(ERROR_TEMPLATE, &page, vars) {
            Ok(html) => html,
            Err(e) => {
                tracing::warn!("Failed to render error template: {}, returning simple HTML error page", e);
                simple_error_page(status, message)
            }
        }
    }
}

/// Context for the error template
#[derive(Debug, Clone, Serialize)]
pub struct ErrorPage {
    pub status: u16,
    pub message: String,
}

/// Variables every page receives
#[derive(Debug, Clone, Serialize)]
pub struct StandardVars {
    /// Signed-in user, `null` for anonymous visitors
    pub user: Option<TemplateUser>,
    pub request_path: String,
    /// Current year (for the footer)
    pub year: i32,
}

/// What templates know about the signed-in user
#[derive(Debug, Clone, Serialize)]
pub struct TemplateUser {
    pub id: i64,
    pub username: String,
}

impl From<&User> for TemplateUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
        }
    }
}

impl StandardVars {
    pub fn new(request_path: impl Into<String>) -> Self {
        Self {
            user: None,
            request_path: request_path.into(),
            year: chrono::Utc::now().year(),
        }
    }

    pub fn with_user(mut self, user: Option<&User>) -> Self {
        self.user = user.map(TemplateUser::from);
        self
    }
}

/// Merge a page struct and the standard variables into one context
pub fn page_context<T: Serialize>(page: &T, vars: &StandardVars) -> Result<TeraContext, RenderError> {
    let mut context = TeraContext::from_serialize(page)
        .map_err(|e| RenderError::InvalidContext(error_chain("Page is not a map", &e)))?;
    context.insert("user", &vars.user);
    context.insert("request_path", &vars.request_path);
    context.insert("year", &vars.year);
    Ok(context)
}

/// `url(name="notes:detail", arg=note.slug)`
///
/// Output is a path built from static segments and one percent-encoded
/// argument, so it is exempt from autoescaping.
struct UrlFunction;

impl tera::Function for UrlFunction {
    fn call(&self, args: &HashMap<String, Value>) -> tera::Result<Value> {
        let name = args
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| tera::Error::msg("url: `name` argument is required"))?;

        let arg = match args.get("arg") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
        };

        urls::reverse(name, arg.as_deref())
            .map(Value::String)
            .map_err(|e| tera::Error::msg(format!("url: {}", e)))
    }

    fn is_safe(&self) -> bool {
        true
    }
}

fn collect_templates_from_dir(
    base_path: &Path,
    current_path: &Path,
    templates: &mut BTreeMap<String, String>,
) -> Result<(), RenderError> {
    for entry in fs::read_dir(current_path)? {
        let path = entry?.path();

        if path.is_dir() {
            collect_templates_from_dir(base_path, &path, templates)?;
        } else if path.extension().is_some_and(|ext| ext == "html") {
            let relative_path = path
                .strip_prefix(base_path)
                .map_err(|_| RenderError::TemplateError(format!("{:?} is outside {:?}", path, base_path)))?;
            let name = relative_path.to_string_lossy().replace('\\', "/");
            let content = fs::read_to_string(&path)?;

            tracing::debug!(template = %name, "Template override");
            templates.insert(name, content);
        }
    }
    Ok(())
}

fn error_chain(prefix: &str, error: &dyn StdError) -> String {
    let mut message = format!("{}: {}", prefix, error);
    let mut source = error.source();
    while let Some(s) = source {
        message.push_str(&format!("\n  Caused by: {}", s));
        source = s.source();
    }
    message
}

/// Last-resort error page
fn simple_error_page(status: u16, message: &str) -> String {
    let message = tera::escape_html(message);
    format!(
        r#"<!DOCTYPE html>
<html lang="ru">
<head>
    <meta charset="UTF-8">
    <title>{status}</title>
</head>
<body>
    <h1>{status}</h1>
    <p>{message}</p>
</body>
</html>"#
    )
}

#[cfg(test)]
mod tests;
