use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use tokio::task::JoinHandle;

use crate::error::Result;
use crate::openai::{CompletionBackend, CompletionOptions};
use crate::tooling::git::{self, GitStatusSnapshot};

/// How long the git panel may hold focus before it snaps back to the chat
/// input. Deliberate: the user is never stranded outside the input box.
pub const FOCUS_RETURN_DELAY: Duration = Duration::from_secs(2);

pub const PLACEHOLDER: &str = "Thinking...";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelFocus {
    Chat,
    Git,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    pub timestamp: DateTime<Local>,
}

impl ChatMessage {
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Local::now(),
        }
    }
}

pub struct App {
    pub should_quit: bool,
    pub focus: PanelFocus,

    // Chat state
    pub input: String,
    pub input_cursor: usize, // char index into input
    pub messages: Vec<ChatMessage>,
    pub pending: Option<JoinHandle<Result<String>>>,
    pub chat_scroll: u16,
    pub chat_height: u16, // set during render, used for scroll math
    pub chat_width: u16,
    pub animation_frame: u8,

    // Git panel state
    pub git_status: std::result::Result<GitStatusSnapshot, String>,
    pub git_scroll: u16,
    pub focus_return_at: Option<Instant>,

    // Completion backend; None when the credential is missing.
    pub client: Option<Arc<dyn CompletionBackend>>,
    pub options: CompletionOptions,
}

impl App {
    pub fn new(client: Option<Arc<dyn CompletionBackend>>, options: CompletionOptions) -> Self {
        let mut messages = vec![ChatMessage::new(
            ChatRole::Assistant,
            "Welcome to KoAI Chat!\nType your message and press Enter to send.",
        )];

        if client.is_none() {
            messages.push(ChatMessage::new(
                ChatRole::Assistant,
                "OPENAI_API_KEY is not set and no api_key is configured.\n\
                 Chat is disabled; the git panel still works.",
            ));
        }

        Self {
            should_quit: false,
            focus: PanelFocus::Chat,
            input: String::new(),
            input_cursor: 0,
            messages,
            pending: None,
            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            animation_frame: 0,
            git_status: Ok(GitStatusSnapshot::default()),
            git_scroll: 0,
            focus_return_at: None,
            client,
            options,
        }
    }

    /// Accept the current input as a submission if the session is idle.
    /// Appends the user message and exactly one placeholder entry, clears
    /// the input, and returns the prompt text for the caller to send.
    /// Returns None while a completion is already in flight: the input is
    /// kept, no second call is issued.
    pub fn begin_submit(&mut self) -> Option<String> {
        if self.pending.is_some() || self.input.trim().is_empty() {
            return None;
        }

        let prompt = self.input.trim().to_string();
        self.messages
            .push(ChatMessage::new(ChatRole::User, prompt.clone()));
        self.messages
            .push(ChatMessage::new(ChatRole::Assistant, PLACEHOLDER));
        self.input.clear();
        self.input_cursor = 0;
        self.scroll_chat_to_bottom();
        Some(prompt)
    }

    /// Resolve the in-flight completion if it finished. The placeholder
    /// entry is replaced in place by the response or an error message; the
    /// session returns to idle either way.
    pub async fn poll_pending(&mut self) {
        let finished = self
            .pending
            .as_ref()
            .is_some_and(|task| task.is_finished());
        if !finished {
            return;
        }

        let Some(task) = self.pending.take() else {
            return;
        };
        let content = match task.await {
            Ok(Ok(text)) if !text.trim().is_empty() => text,
            Ok(Ok(_)) => "Sorry, no response was produced.".to_string(),
            Ok(Err(e)) => format!("Error: {e}"),
            Err(e) => format!("Error: completion task failed: {e}"),
        };
        self.resolve_placeholder(content);
        self.scroll_chat_to_bottom();
    }

    fn resolve_placeholder(&mut self, content: String) {
        match self.messages.last_mut() {
            Some(last) if last.role == ChatRole::Assistant && last.content == PLACEHOLDER => {
                last.content = content;
                last.timestamp = Local::now();
            }
            // The placeholder is always the newest entry while a call is in
            // flight; anything else means the transcript was corrupted, so
            // append rather than lose the response.
            _ => self
                .messages
                .push(ChatMessage::new(ChatRole::Assistant, content)),
        }
    }

    pub fn is_sending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn toggle_focus(&mut self) {
        match self.focus {
            PanelFocus::Chat => {
                self.focus = PanelFocus::Git;
                self.focus_return_at = Some(Instant::now() + FOCUS_RETURN_DELAY);
            }
            PanelFocus::Git => {
                self.focus = PanelFocus::Chat;
                self.focus_return_at = None;
            }
        }
    }

    /// Advance the loading animation and apply the focus auto-return.
    /// The return deadline overrides manual navigation by design.
    pub fn tick(&mut self) {
        if self.pending.is_some() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
        if self.focus == PanelFocus::Git {
            if let Some(deadline) = self.focus_return_at {
                if Instant::now() >= deadline {
                    self.focus = PanelFocus::Chat;
                    self.focus_return_at = None;
                }
            }
        }
    }

    /// Replace the snapshot wholesale; the old one is discarded, not merged.
    pub async fn refresh_git(&mut self) {
        self.git_status = git::read_status(None).await;
        self.git_scroll = 0;
    }

    pub fn scroll_chat_to_bottom(&mut self) {
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total_lines: u16 = 0;
        for msg in &self.messages {
            for line in msg.content.lines() {
                let char_count = line.chars().count();
                if char_count == 0 {
                    total_lines += 1;
                } else {
                    total_lines += char_count.div_ceil(wrap_width) as u16;
                }
            }
            total_lines += 1; // blank line after each message
        }

        let visible = if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        };
        self.chat_scroll = total_lines.saturating_sub(visible);
    }

    pub fn git_scroll_down(&mut self) {
        self.git_scroll = self.git_scroll.saturating_add(1);
    }

    pub fn git_scroll_up(&mut self) {
        self.git_scroll = self.git_scroll.saturating_sub(1);
    }
}
