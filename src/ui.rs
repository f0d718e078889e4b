use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, ChatRole, PanelFocus, PLACEHOLDER};

pub fn render(app: &mut App, frame: &mut Frame) {
    let [chat_area, git_area] =
        Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)])
            .areas(frame.area());

    render_chat_panel(app, frame, chat_area);
    render_git_panel(app, frame, git_area);
}

fn panel_border(active: bool, color: Color) -> Style {
    if active {
        Style::default().fg(color)
    } else {
        Style::default().fg(Color::DarkGray)
    }
}

fn render_chat_panel(app: &mut App, frame: &mut Frame, area: Rect) {
    let chat_focused = app.focus == PanelFocus::Chat;
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" AI Chat ")
        .border_style(panel_border(chat_focused, Color::Cyan));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let [messages_area, input_area] =
        Layout::vertical([Constraint::Min(0), Constraint::Length(3)]).areas(inner);

    // Remember the message area for scroll-to-bottom math.
    app.chat_height = messages_area.height;
    app.chat_width = messages_area.width;

    let mut lines: Vec<Line> = Vec::new();
    for msg in &app.messages {
        let (label, color) = match msg.role {
            ChatRole::User => ("You", Color::Cyan),
            ChatRole::Assistant => ("AI", Color::Green),
        };
        let time = msg.timestamp.format("%H:%M:%S");
        lines.push(Line::from(Span::styled(
            format!("[{time}] {label}:"),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )));

        if msg.content == PLACEHOLDER && app.is_sending() {
            let dots = ".".repeat(app.animation_frame as usize + 1);
            lines.push(Line::from(Span::styled(
                format!("Thinking{dots}"),
                Style::default().fg(Color::DarkGray),
            )));
        } else {
            for content_line in msg.content.lines() {
                lines.push(Line::raw(content_line.to_string()));
            }
        }
        lines.push(Line::default());
    }

    let messages = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .scroll((app.chat_scroll, 0));
    frame.render_widget(messages, messages_area);

    render_input_box(app, frame, input_area, chat_focused);
}

fn render_input_box(app: &App, frame: &mut Frame, area: Rect, focused: bool) {
    let border_color = if focused { Color::Yellow } else { Color::DarkGray };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color));

    let mut spans = vec![Span::styled("> ", Style::default().fg(Color::DarkGray))];
    if focused {
        // Inline block cursor at the character position.
        let byte_pos = app
            .input
            .char_indices()
            .nth(app.input_cursor)
            .map(|(i, _)| i)
            .unwrap_or(app.input.len());
        let (before, rest) = app.input.split_at(byte_pos);
        spans.push(Span::raw(before.to_string()));
        match rest.chars().next() {
            Some(under) => {
                spans.push(Span::styled(
                    under.to_string(),
                    Style::default().add_modifier(Modifier::REVERSED),
                ));
                spans.push(Span::raw(rest[under.len_utf8()..].to_string()));
            }
            None => spans.push(Span::styled("█", Style::default().fg(Color::DarkGray))),
        }
    } else {
        spans.push(Span::raw(app.input.clone()));
    }

    let input = Paragraph::new(Line::from(spans)).block(block);
    frame.render_widget(input, area);
}

fn render_git_panel(app: &App, frame: &mut Frame, area: Rect) {
    let git_focused = app.focus == PanelFocus::Git;
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Git Status ")
        .border_style(panel_border(git_focused, Color::Green));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut lines: Vec<Line> = vec![Line::from(
        Span::styled("Git Status", Style::default().fg(Color::Green)).bold(),
    )];
    lines.push(Line::default());

    match &app.git_status {
        Err(message) => {
            lines.push(Line::from(Span::styled(
                message.clone(),
                Style::default().fg(Color::Red),
            )));
        }
        Ok(snapshot) if snapshot.is_clean() => {
            lines.push(Line::from(Span::styled(
                "✓ Working tree clean",
                Style::default().fg(Color::Green),
            )));
        }
        Ok(snapshot) => {
            if !snapshot.staged.is_empty() {
                lines.push(Line::from(
                    Span::styled("Staged Changes:", Style::default().fg(Color::Green)).bold(),
                ));
                for (icon, path) in &snapshot.staged {
                    lines.push(Line::from(Span::styled(
                        format!("  {icon} {path}"),
                        Style::default().fg(Color::Green),
                    )));
                }
                lines.push(Line::default());
            }
            if !snapshot.modified.is_empty() {
                lines.push(Line::from(
                    Span::styled("Modified:", Style::default().fg(Color::Yellow)).bold(),
                ));
                for (icon, path) in &snapshot.modified {
                    lines.push(Line::from(Span::styled(
                        format!("  {icon} {path}"),
                        Style::default().fg(Color::Yellow),
                    )));
                }
                lines.push(Line::default());
            }
            if !snapshot.untracked.is_empty() {
                lines.push(Line::from(
                    Span::styled("Untracked:", Style::default().fg(Color::Red)).bold(),
                ));
                for path in &snapshot.untracked {
                    lines.push(Line::from(Span::styled(
                        format!("  ? {path}"),
                        Style::default().fg(Color::Red),
                    )));
                }
                lines.push(Line::default());
            }
        }
    }

    lines.push(Line::default());
    lines.push(Line::from(Span::styled(
        "Ctrl-r refresh • Tab switch panels • Esc quit",
        Style::default().fg(Color::Cyan),
    )));

    let panel = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .scroll((app.git_scroll, 0));
    frame.render_widget(panel, inner);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::openai::CompletionOptions;
    use crate::tooling::git::parse_porcelain;
    use ratatui::{backend::TestBackend, Terminal};

    fn test_app() -> App {
        App::new(
            None,
            CompletionOptions {
                model: "gpt-3.5-turbo".into(),
                max_tokens: 100,
                temperature: 0.7,
                system_message: None,
            },
        )
    }

    fn rendered_text(app: &mut App) -> String {
        let backend = TestBackend::new(100, 30);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|frame| render(app, frame)).unwrap();
        let buffer = terminal.backend().buffer().clone();
        let mut text = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                text.push_str(buffer[(x, y)].symbol());
            }
            text.push('\n');
        }
        text
    }

    #[test]
    fn clean_tree_is_rendered_as_such() {
        let mut app = test_app();
        app.git_status = Ok(parse_porcelain(""));
        let text = rendered_text(&mut app);
        assert!(text.contains("Working tree clean"));
        assert!(text.contains("AI Chat"));
    }

    #[test]
    fn snapshot_buckets_show_icons_and_paths() {
        let mut app = test_app();
        app.git_status = Ok(parse_porcelain("M  a.ts\n M b.rs\n?? c.txt\n"));
        let text = rendered_text(&mut app);
        assert!(text.contains("● a.ts"));
        assert!(text.contains("● b.rs"));
        assert!(text.contains("? c.txt"));
        assert!(text.contains("Staged Changes:"));
        assert!(text.contains("Modified:"));
        assert!(text.contains("Untracked:"));
    }

    #[test]
    fn git_error_is_shown_as_panel_text() {
        let mut app = test_app();
        app.git_status = Err("Git error: not a git repository".to_string());
        let text = rendered_text(&mut app);
        assert!(text.contains("not a git repository"));
    }

    #[test]
    fn render_sets_chat_dimensions_for_scroll_math() {
        let mut app = test_app();
        rendered_text(&mut app);
        assert!(app.chat_height > 0);
        assert!(app.chat_width > 0);
    }
}
