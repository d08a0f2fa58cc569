mod config;
mod events;
mod history;
mod llm;
mod logging;
mod prompts;
mod segments;
mod session;
mod tui;
mod ui;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::events::TuiEvent;
use crate::llm::{CompletionClient, GeminiClient};
use crate::session::SessionController;
use crate::ui::conversation::{ConversationAction, ConversationManager};

#[derive(Parser)]
#[command(name = "codeassist")]
#[command(version)]
#[command(about = "Ask coding questions to Gemini from your terminal", long_about = None)]
struct Cli {
    /// Path to the configuration file (default: ~/.codeassist/config.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Model to use instead of the configured one
    #[arg(long)]
    model: Option<String>,

    /// Log filter, e.g. "debug" or "codeassist=trace"
    #[arg(long, value_name = "FILTER")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(model) = cli.model {
        config.model = model;
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }

    let _log_guard = logging::init_logging(&config.logging, &config.log_dir())?;
    if !config.has_api_key() {
        warn!(env = %config.api_key_env, "No API key configured; every request will fail");
    }

    let gemini = GeminiClient::new(&config).context("Failed to build HTTP client")?;
    info!(model = %gemini.model(), home = %config.app_home.display(), "Starting codeassist");
    let client: Arc<dyn CompletionClient> = Arc::new(gemini);
    let mut manager = ConversationManager::new(SessionController::new(client));

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let result = run(&mut terminal, &mut manager, &config).await;
    tui::restore().context("Failed to restore terminal")?;

    info!(
        answers = manager.session().history().len(),
        "Exiting codeassist"
    );
    result
}

async fn run(terminal: &mut tui::Tui, manager: &mut ConversationManager, config: &Config) -> Result<()> {
    let mut events = tui::EventHandler::new(Duration::from_millis(config.ui.tick_rate_ms.max(10)));

    loop {
        manager.process_settlements();

        terminal.draw(|frame| {
            let area = frame.size();
            manager.render(area, frame.buffer_mut());
        })?;

        let Some(event) = events.next().await else {
            break;
        };

        let action = match event {
            TuiEvent::Key(key) => manager.handle_key(key),
            TuiEvent::Paste(text) => manager.handle_paste(&text),
            TuiEvent::Tick => {
                manager.on_tick();
                ConversationAction::None
            }
            TuiEvent::Resize(width, height) => {
                debug!(width, height, "Terminal resized");
                ConversationAction::None
            }
        };

        if action == ConversationAction::Exit {
            break;
        }
    }

    Ok(())
}
