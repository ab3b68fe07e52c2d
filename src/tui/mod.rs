//! Full-screen client for CogniDoc
//!
//! Terminal user interface using Ratatui: Home, Auth and Chat views.

mod app;
mod auth_form;
mod backend;
mod compose;
mod debug_log;
mod help;
mod input;
pub mod log_capture;
mod messages;
mod prompt;
mod sidebar;
mod theme;
mod ui;

pub use app::run;
