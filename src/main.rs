mod account;
mod common;
mod config;
mod error;
mod network;
mod session;
mod storage;
mod ui;

use std::error::Error;
use std::io::{self, BufRead, Write};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use tokio::sync::mpsc;

use account::AuthMode;
use common::{ChatMessage, ConnectionState, SessionEvent, validate_message};
use config::AppConfig;
use network::{ApiClient, WebSocketConnector};
use session::{ChatSession, SessionHandle};
use storage::SessionDatabase;
use ui::ChatApp;

/// UI and session share this queue; the session is its only producer.
const EVENT_QUEUE: usize = 100;

#[derive(Parser)]
#[command(name = "mchat", version, about = "Chat client for the mchat server")]
struct Cli {
    /// Path to JSON config file
    #[arg(long, default_value = config::DEFAULT_CONFIG_PATH, value_name = "FILE")]
    config: String,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Log in and remember the session
    Login {
        username: String,
        /// Read from stdin when omitted
        #[arg(long)]
        password: Option<String>,
    },
    /// Create an account and remember the session
    Signup {
        username: String,
        #[arg(long)]
        password: Option<String>,
    },
    /// Forget the stored session
    Logout,
    /// Show the stored identity
    Whoami,
    /// Connect and print the message list every time it changes
    Watch,
    /// Connect, send one message and disconnect
    Send { text: String },
    /// Write the effective configuration to the config file
    InitConfig,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();
    let app_config = config::load_config(&cli.config);

    if let Some(Command::InitConfig) = cli.command {
        config::save_config(&cli.config, &app_config)?;
        println!("Wrote {}", cli.config);
        return Ok(());
    }

    let store = Arc::new(SessionDatabase::open(&app_config.session_db)?);
    let api = Arc::new(ApiClient::new(
        &app_config.api_url,
        app_config.fetch_timeout(),
        app_config.auth_timeout(),
    )?);

    match cli.command {
        None => run_gui(&app_config, store, api),
        Some(Command::Login { username, password }) => {
            login(&api, &store, AuthMode::Login, &username, password).await
        }
        Some(Command::Signup { username, password }) => {
            login(&api, &store, AuthMode::Signup, &username, password).await
        }
        Some(Command::Logout) => {
            account::sign_out(&store)?;
            println!("Logged out");
            Ok(())
        }
        Some(Command::Whoami) => {
            match store.load_session()? {
                Some(stored) if stored.identity.is_authenticated() => println!(
                    "{} (id {}), logged in since {}",
                    stored.identity.username,
                    stored.identity.id,
                    stored.saved_at.format("%Y-%m-%d %H:%M:%S UTC")
                ),
                _ => println!("Not logged in"),
            }
            Ok(())
        }
        Some(Command::Watch) => {
            let (session, events) = start_session(&app_config, store, api);
            watch(session, events).await
        }
        Some(Command::Send { text }) => {
            let text = validate_message(&text)?.to_string();
            let (session, _events) = start_session(&app_config, store, api);
            send_once(session, text).await
        }
        Some(Command::InitConfig) => Ok(()),
    }
}

fn start_session(
    app_config: &AppConfig,
    store: Arc<SessionDatabase>,
    api: Arc<ApiClient>,
) -> (SessionHandle, mpsc::Receiver<SessionEvent>) {
    let (event_tx, event_rx) = mpsc::channel(EVENT_QUEUE);
    let connector = Arc::new(WebSocketConnector::new(app_config.push_url.clone()));
    let session = ChatSession::new(
        store,
        api,
        connector,
        app_config.session_config(),
        event_tx,
    )
    .spawn();
    (session, event_rx)
}

fn run_gui(
    app_config: &AppConfig,
    store: Arc<SessionDatabase>,
    api: Arc<ApiClient>,
) -> Result<(), Box<dyn Error>> {
    let (session, event_rx) = start_session(app_config, Arc::clone(&store), Arc::clone(&api));
    let runtime = tokio::runtime::Handle::current();
    log::info!(
        "Client started against {} / {}",
        app_config.api_url,
        app_config.push_url
    );

    let options = eframe::NativeOptions::default();
    eframe::run_native(
        "mchat",
        options,
        Box::new(move |cc| {
            Ok(Box::new(ChatApp::new(
                cc, session, event_rx, store, api, runtime,
            )))
        }),
    )?;
    Ok(())
}

async fn login(
    api: &ApiClient,
    store: &SessionDatabase,
    mode: AuthMode,
    username: &str,
    password: Option<String>,
) -> Result<(), Box<dyn Error>> {
    let password = match password {
        Some(password) => password,
        None => prompt_password()?,
    };
    if username.trim().is_empty() || password.is_empty() {
        return Err("username and password must not be empty".into());
    }

    let identity = account::sign_in(api, store, mode, username.trim(), &password).await?;
    println!("Logged in as {} (id {})", identity.username, identity.id);
    Ok(())
}

fn prompt_password() -> io::Result<String> {
    eprint!("Password: ");
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

async fn watch(
    session: SessionHandle,
    mut events: mpsc::Receiver<SessionEvent>,
) -> Result<(), Box<dyn Error>> {
    if session.connect().await != ConnectionState::Connected {
        drain_notifications(&mut events);
        return Err("could not connect to the chat server".into());
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Some(SessionEvent::MessagesUpdated(messages)) => print_snapshot(&messages),
                Some(SessionEvent::ConnectionStateChanged(ConnectionState::Disconnected)) => {
                    eprintln!("Connection closed");
                    break;
                }
                Some(SessionEvent::ConnectionStateChanged(state)) => {
                    log::debug!("Connection state: {state}");
                }
                Some(SessionEvent::Notification(notification)) => {
                    eprintln!("{}: {}", notification.title(), notification.message);
                }
                None => break,
            },
        }
    }

    session.disconnect().await;
    Ok(())
}

async fn send_once(session: SessionHandle, text: String) -> Result<(), Box<dyn Error>> {
    if session.connect().await != ConnectionState::Connected {
        return Err("could not connect to the chat server".into());
    }
    let result = session.send(text).await;
    session.disconnect().await;
    result?;
    println!("Sent");
    Ok(())
}

fn drain_notifications(events: &mut mpsc::Receiver<SessionEvent>) {
    while let Ok(event) = events.try_recv() {
        if let SessionEvent::Notification(notification) = event {
            eprintln!("{}: {}", notification.title(), notification.message);
        }
    }
}

fn print_snapshot(messages: &[ChatMessage]) {
    println!("--- {} messages ---", messages.len());
    for message in messages {
        println!(
            "[{}] {}: {}",
            message.timestamp, message.sender, message.payload
        );
    }
}
