use std::{
    io::{self, BufRead},
    path::PathBuf,
    sync::Arc,
    thread,
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    config::parse_server_url,
    load_settings,
    render::ViewNode,
    roster::RosterView,
    ChatPage, ClientSettings, HttpLoginApi, LoginClient, Navigation, PageLoad, PageObserver,
    UiAction, WsConnector,
};
use shared::domain::DisplayName;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use url::Url;

#[derive(Parser, Debug)]
struct Cli {
    /// Settings file; defaults to `client.toml` in the working directory.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Overrides the configured chat server origin.
    #[arg(long)]
    server_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate a display name against the server, then open the chat.
    Login { username: String },
    /// Open the chat screen directly.
    Chat {
        /// Full chat location, e.g. `http://localhost:5000/chat?username=Alice`.
        #[arg(long, conflicts_with = "username")]
        location: Option<String>,
        #[arg(long)]
        username: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();
    let cli = Cli::parse();

    let mut settings = load_settings(cli.config.as_deref())?;
    if let Some(server_url) = cli.server_url {
        settings.server_url = parse_server_url(&server_url)?.to_string();
    }
    let origin = settings.server_url()?;

    let location = match cli.command {
        Command::Login { username } => {
            let api = HttpLoginApi::new(origin.clone(), settings.request_timeout())?;
            let login = LoginClient::new(Arc::new(api));
            for server in login.fetch_servers().await {
                println!("server: {} {}", server.name, server.url);
            }
            let navigation = login.login(&username).await?;
            navigation.resolve(&origin)?
        }
        Command::Chat {
            location: Some(location),
            ..
        } => Url::parse(&location).with_context(|| format!("invalid location '{location}'"))?,
        Command::Chat { username, .. } => {
            let navigation = username.map_or(Navigation::Entry, |name| Navigation::Chat {
                username: DisplayName::new(name),
            });
            navigation.resolve(&origin)?
        }
    };

    run_chat(&location, &settings).await
}

async fn run_chat(location: &Url, settings: &ClientSettings) -> Result<()> {
    let mut page = match ChatPage::load(location, settings, Arc::new(WsConnector)) {
        PageLoad::Ready(page) => *page,
        PageLoad::Redirect(target) => {
            println!("-> {}", target.path());
            return Ok(());
        }
    };
    page.start().context("failed to open chat connection")?;
    info!(%location, "chat page started; /logout, /quit, /emoji <glyph>");

    let (ui_tx, ui_rx) = mpsc::channel(settings.event_channel_capacity.max(1));
    thread::spawn(move || read_terminal(ui_tx));

    let mut observer = TerminalObserver;
    if let Some(target) = page.run(ui_rx, &mut observer).await {
        info!(path = %target.path(), "left chat page");
    }
    Ok(())
}

/// Maps terminal lines to page actions until stdin closes.
fn read_terminal(ui_tx: mpsc::Sender<UiAction>) {
    for line in io::stdin().lock().lines() {
        let Ok(line) = line else { break };
        let command = line.trim().to_owned();
        let actions = match command.as_str() {
            "/logout" => vec![UiAction::Logout],
            "/quit" => vec![UiAction::Unload],
            cmd if cmd.starts_with("/emoji ") => {
                vec![UiAction::Emoji(cmd["/emoji ".len()..].trim().to_string())]
            }
            _ => vec![
                UiAction::Input {
                    value: line,
                    cursor: None,
                },
                UiAction::Click,
            ],
        };
        for action in actions {
            if ui_tx.blocking_send(action).is_err() {
                return;
            }
        }
    }
}

struct TerminalObserver;

impl PageObserver for TerminalObserver {
    fn entry_appended(&mut self, entry: &ViewNode) {
        println!("{}", entry.to_text());
    }

    fn roster_changed(&mut self, roster: &RosterView) {
        println!("online ({}): {}", roster.count_label, roster.names().join(", "));
    }

    fn alert(&mut self, message: &str) {
        eprintln!("! {message}");
    }

    fn navigated(&mut self, target: &Navigation) {
        println!("-> {}", target.path());
    }
}
