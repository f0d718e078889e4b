use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::{App, ChatMessage, ChatRole, PanelFocus};
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub async fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key).await?,
        // Full redraw every iteration, so resize needs no extra work.
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => app.tick(),
    }
    Ok(())
}

async fn handle_key(app: &mut App, key: KeyEvent) -> Result<()> {
    // Global keys, regardless of panel focus
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        match key.code {
            KeyCode::Char('c') => {
                app.should_quit = true;
                return Ok(());
            }
            KeyCode::Char('r') => {
                app.refresh_git().await;
                return Ok(());
            }
            _ => {}
        }
    }
    match key.code {
        KeyCode::Esc => {
            app.should_quit = true;
            return Ok(());
        }
        KeyCode::Tab => {
            app.toggle_focus();
            return Ok(());
        }
        _ => {}
    }

    match app.focus {
        PanelFocus::Chat => handle_chat_key(app, key),
        PanelFocus::Git => handle_git_key(app, key).await,
    }

    Ok(())
}

fn handle_chat_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Enter => submit(app),
        KeyCode::Backspace => {
            if app.input_cursor > 0 {
                app.input_cursor -= 1;
                let byte_pos = char_to_byte_index(&app.input, app.input_cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            let char_count = app.input.chars().count();
            if app.input_cursor < char_count {
                let byte_pos = char_to_byte_index(&app.input, app.input_cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            app.input_cursor = app.input_cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.input.chars().count();
            app.input_cursor = (app.input_cursor + 1).min(char_count);
        }
        KeyCode::Home => {
            app.input_cursor = 0;
        }
        KeyCode::End => {
            app.input_cursor = app.input.chars().count();
        }
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(&app.input, app.input_cursor);
            app.input.insert(byte_pos, c);
            app.input_cursor += 1;
        }
        _ => {}
    }
}

/// Start the completion call for the current input. While one is already
/// in flight the submission is refused by `begin_submit` and the typed
/// text stays in the input box.
fn submit(app: &mut App) {
    let Some(client) = app.client.clone() else {
        if !app.input.trim().is_empty() {
            app.messages.push(ChatMessage::new(
                ChatRole::Assistant,
                "Error: no completion client is configured. Set OPENAI_API_KEY and restart.",
            ));
            app.input.clear();
            app.input_cursor = 0;
        }
        return;
    };

    if let Some(prompt) = app.begin_submit() {
        let options = app.options.clone();
        app.pending = Some(tokio::spawn(async move {
            client.complete(&prompt, &options).await
        }));
    }
}

async fn handle_git_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Char('r') => app.refresh_git().await,
        KeyCode::Char('j') | KeyCode::Down => app.git_scroll_down(),
        KeyCode::Char('k') | KeyCode::Up => app.git_scroll_up(),
        _ => {}
    }
}
