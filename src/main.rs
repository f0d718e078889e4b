use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use koai::app::App;
use koai::config::{Config, Overrides};
use koai::openai::{CompletionBackend, OpenAIClient};
use koai::{commands, error, handler, openai, tui, ui};

#[derive(Parser)]
#[command(name = "koai")]
#[command(about = "Terminal AI assistant with one-shot chat/edit and a chat + git panel TUI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone, Default)]
struct ModelArgs {
    /// Model identifier
    #[arg(long)]
    model: Option<String>,
    /// Maximum tokens in the response
    #[arg(long)]
    max_tokens: Option<u32>,
    /// Sampling temperature in [0, 2]
    #[arg(long)]
    temperature: Option<f32>,
}

impl From<&ModelArgs> for Overrides {
    fn from(args: &ModelArgs) -> Self {
        Overrides {
            model: args.model.clone(),
            max_tokens: args.max_tokens,
            temperature: args.temperature,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// One-shot AI chat
    Ac {
        /// The prompt to send
        prompt: String,
        #[command(flatten)]
        model: ModelArgs,
    },
    /// One-shot AI edit, optionally rewriting a file in place
    Ae {
        /// The edit instruction
        prompt: String,
        /// File to edit in place
        #[arg(short, long)]
        file: Option<PathBuf>,
        #[command(flatten)]
        model: ModelArgs,
    },
    /// Analyze a request against the current project and report findings
    Agent {
        /// The request to analyze
        prompt: String,
        #[command(flatten)]
        model: ModelArgs,
    },
    /// Interactive chat loop on stdin
    Chat {
        #[command(flatten)]
        model: ModelArgs,
    },
    /// Interactive edit loop, optionally bound to a file
    Edit {
        /// File rewritten after each instruction
        file: Option<PathBuf>,
        #[command(flatten)]
        model: ModelArgs,
    },
    /// Chat + git status panel session
    Tui {
        #[command(flatten)]
        model: ModelArgs,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    // The panel session owns stderr; keep logs out of its way.
    init_tracing(matches!(cli.command, Commands::Tui { .. }));

    match cli.command {
        Commands::Ac { prompt, model } => {
            // Handler errors are reported on stderr but the exit code stays
            // 0, so shell pipelines keep flowing.
            match chat_once(&prompt, &model).await {
                Ok(text) => println!("{text}"),
                Err(e) => eprintln!("Error: {e}"),
            }
        }
        Commands::Ae {
            prompt,
            file,
            model,
        } => match edit_once(&prompt, file.as_deref(), &model).await {
            Ok(text) => println!("{text}"),
            Err(e) => eprintln!("Error: {e}"),
        },
        Commands::Agent { prompt, model } => match agent_once(&prompt, &model).await {
            Ok(text) => println!("{text}"),
            Err(e) => eprintln!("Error: {e}"),
        },
        Commands::Chat { model } => {
            match build_backend_and_options(&model, Mode::Chat) {
                Ok((client, options)) => commands::interactive_chat(&client, &options).await?,
                Err(e) => eprintln!("Error: {e}"),
            }
        }
        Commands::Edit { file, model } => {
            match build_backend_and_options(&model, Mode::Edit) {
                Ok((client, options)) => {
                    commands::interactive_edit(&client, file.as_deref(), &options).await?
                }
                Err(e) => eprintln!("Error: {e}"),
            }
        }
        Commands::Tui { model } => run_tui(&model).await?,
    }

    Ok(())
}

enum Mode {
    Chat,
    Edit,
}

fn build_backend_and_options(
    args: &ModelArgs,
    mode: Mode,
) -> error::Result<(OpenAIClient, openai::CompletionOptions)> {
    let config = Config::load()?;
    let overrides = Overrides::from(args);
    let options = match mode {
        Mode::Chat => config.chat_options(&overrides)?,
        Mode::Edit => config.edit_options(&overrides)?,
    };
    // Credential resolution happens before any network call; a missing key
    // is a configuration error, not a request failure.
    let client = OpenAIClient::new(&config.resolve_api_key()?);
    Ok((client, options))
}

async fn chat_once(prompt: &str, args: &ModelArgs) -> error::Result<String> {
    let (client, options) = build_backend_and_options(args, Mode::Chat)?;
    commands::one_shot_chat(&client, prompt, &options).await
}

async fn edit_once(
    prompt: &str,
    file: Option<&std::path::Path>,
    args: &ModelArgs,
) -> error::Result<String> {
    let (client, options) = build_backend_and_options(args, Mode::Edit)?;
    commands::one_shot_edit(&client, prompt, file, &options).await
}

async fn agent_once(prompt: &str, args: &ModelArgs) -> error::Result<String> {
    // The agent's internal calls want the stronger edit-mode model.
    let (client, options) = build_backend_and_options(args, Mode::Edit)?;
    koai::agent::run_agent(&client, prompt, &options).await
}

const TUI_SYSTEM_MESSAGE: &str = "You are a helpful AI assistant integrated into a \
    terminal-based development tool. Be concise and helpful.";

async fn run_tui(args: &ModelArgs) -> Result<()> {
    let config = Config::load().unwrap_or_else(|e| {
        tracing::warn!("falling back to default config: {e}");
        Config::default()
    });

    let mut options = match config.chat_options(&Overrides::from(args)) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("Error: {e}");
            return Ok(());
        }
    };
    if config.chat.system_message.is_none() {
        options.system_message = Some(TUI_SYSTEM_MESSAGE.to_string());
    }

    // A missing credential is reported inside the session; the git panel
    // still works without it.
    let client: Option<Arc<dyn CompletionBackend>> = match config.resolve_api_key() {
        Ok(key) => Some(Arc::new(OpenAIClient::new(&key))),
        Err(e) => {
            tracing::warn!("{e}");
            None
        }
    };

    let mut app = App::new(client, options);
    app.refresh_git().await;

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = tui::EventHandler::new();

    while !app.should_quit {
        app.poll_pending().await;
        terminal.draw(|frame| ui::render(&mut app, frame))?;
        let Some(event) = events.next().await else {
            break;
        };
        handler::handle_event(&mut app, event).await?;
    }

    tui::restore()?;
    Ok(())
}

fn init_tracing(quiet: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("koai=info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);
    if quiet {
        builder.with_writer(std::io::sink).init();
    } else {
        builder.with_writer(std::io::stderr).init();
    }
}
