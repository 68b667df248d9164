//! newsnotes - a server-rendered news board and private notes
//!
//! This library provides the core functionality of the newsnotes server:
//! storage, validation, business rules, templates and the web layer.

pub mod api;
pub mod config;
pub mod db;
pub mod forms;
pub mod models;
pub mod render;
pub mod services;
pub mod slug;
pub mod urls;
