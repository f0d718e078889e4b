use std::io::{self, Stderr};
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    cursor,
    event::{Event, EventStream, KeyEvent, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures_util::StreamExt;
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

/// Drives the placeholder animation and the focus auto-return check.
pub const TICK_INTERVAL: Duration = Duration::from_millis(300);

pub type SessionTerminal = Terminal<CrosstermBackend<Stderr>>;

#[derive(Debug)]
pub enum AppEvent {
    Key(KeyEvent),
    Resize(u16, u16),
    Tick,
}

/// Merges terminal input and the tick timer into one ordered stream. The
/// reader task ends when the terminal event source closes or the session
/// drops the receiver.
pub struct EventHandler {
    rx: mpsc::UnboundedReceiver<AppEvent>,
}

impl EventHandler {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            let mut input = EventStream::new();
            let mut ticker = tokio::time::interval(TICK_INTERVAL);
            // A burst of input must not be followed by a burst of ticks.
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                let event = tokio::select! {
                    _ = ticker.tick() => Some(AppEvent::Tick),
                    terminal_event = input.next() => match terminal_event {
                        // Key press only, not release or repeat
                        Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                            Some(AppEvent::Key(key))
                        }
                        Some(Ok(Event::Resize(width, height))) => {
                            Some(AppEvent::Resize(width, height))
                        }
                        Some(Ok(_)) => None,
                        Some(Err(_)) | None => break,
                    },
                };

                if let Some(event) = event {
                    if tx.send(event).is_err() {
                        break;
                    }
                }
            }
        });

        Self { rx }
    }

    pub async fn next(&mut self) -> Option<AppEvent> {
        self.rx.recv().await
    }
}

impl Default for EventHandler {
    fn default() -> Self {
        Self::new()
    }
}

/// Enter the session screen on stderr. The hardware cursor is hidden; the
/// input box renders its own.
pub fn init() -> Result<SessionTerminal> {
    enable_raw_mode()?;
    execute!(io::stderr(), EnterAlternateScreen, cursor::Hide)?;

    let mut terminal = Terminal::new(CrosstermBackend::new(io::stderr()))?;
    terminal.clear()?;
    Ok(terminal)
}

pub fn restore() -> Result<()> {
    execute!(io::stderr(), cursor::Show, LeaveAlternateScreen)?;
    disable_raw_mode()?;
    Ok(())
}

/// Restore the terminal before the default panic output so the message is
/// readable outside the alternate screen.
pub fn install_panic_hook() {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = restore();
        original_hook(panic_info);
    }));
}
