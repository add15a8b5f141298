use colloquy_types::{Role, Thread};
use serde::Serialize;

use crate::engine::ConversationEngine;
use crate::error::{EngineError, Result};

/// A thread rendered as a Markdown document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThreadExport {
    pub file_name: String,
    pub markdown: String,
}

impl ThreadExport {
    pub fn from_thread(thread: &Thread) -> Self {
        Self {
            file_name: export_file_name(&thread.title),
            markdown: render_markdown(thread),
        }
    }
}

fn role_heading(role: Role) -> &'static str {
    match role {
        Role::User => "User",
        Role::Assistant => "Assistant",
        Role::System => "System",
    }
}

pub fn render_markdown(thread: &Thread) -> String {
    thread
        .messages
        .iter()
        .map(|m| format!("## {}\n\n{}\n\n", role_heading(m.role), m.content))
        .collect::<Vec<_>>()
        .join("---\n\n")
}

/// `Rust: Ownership!` becomes `rust__ownership_.md`
pub fn export_file_name(title: &str) -> String {
    let stem: String = title
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();
    format!("{}.md", stem)
}

impl ConversationEngine {
    pub fn export_thread(&self, thread_id: &str) -> Result<ThreadExport> {
        self.thread(thread_id)
            .map(|t| ThreadExport::from_thread(&t))
            .ok_or_else(|| EngineError::ThreadNotFound(thread_id.to_string()))
    }
}
