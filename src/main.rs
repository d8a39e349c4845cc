use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use notevault::api::{self, AppState};
use notevault::auth::{AuthGate, AuthOutcome};
use notevault::autosave::Autosave;
use notevault::config::Config;
use notevault::db::{Database, Storage};
use notevault::models::{CreateItemInput, ItemKind};
use notevault::notebook::Notebook;
use notevault::render;

#[derive(Parser)]
#[command(name = "notevault")]
#[command(about = "Password-gated hierarchical notes")]
struct Cli {
    /// Password for the vault. The first password ever given becomes the password.
    #[arg(long, global = true, env = "NOTEVAULT_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API with autosave
    Serve {
        /// Port for HTTP API (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Print the effective configuration
    Config {
        /// Write it to the config file
        #[arg(long)]
        save: bool,
    },
    #[command(flatten)]
    Notes(NoteCommand),
}

/// Commands that open the vault and therefore pass the gate first.
#[derive(Subcommand)]
enum NoteCommand {
    /// Print the whole tree
    Tree,
    /// Print a document
    Show { id: Uuid },
    /// Create a folder
    NewFolder {
        name: String,
        /// Folder to create it in; root if omitted
        #[arg(long)]
        parent: Option<Uuid>,
    },
    /// Create an empty document
    NewDocument {
        name: String,
        /// Folder to create it in; root if omitted
        #[arg(long)]
        parent: Option<Uuid>,
    },
    /// Replace a document's text (read from stdin unless --content is given)
    Edit {
        id: Uuid,
        #[arg(long)]
        content: Option<String>,
    },
    /// Rename an item
    Rename { id: Uuid, name: String },
    /// Delete an item and everything below it
    Delete { id: Uuid },
    /// Move an item under another folder, or to the root if --parent is omitted
    Move {
        id: Uuid,
        #[arg(long)]
        parent: Option<Uuid>,
    },
}

/// Initialize tracing with output to stderr (one-shot commands) or stdout
fn init_tracing(use_stderr: bool) {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| {
            if use_stderr {
                "notevault=warn".into()
            } else {
                "notevault=debug,tower_http=debug".into()
            }
        }),
    );

    if use_stderr {
        // Keep stdout for command output
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

fn open_storage(config: &Config) -> anyhow::Result<Arc<dyn Storage>> {
    let db = Database::open(config.database_path()?)?;
    db.migrate()?;
    Ok(Arc::new(db))
}

/// Pass the gate or fail the command.
async fn unlock(gate: &AuthGate, password: Option<String>) -> anyhow::Result<()> {
    let status = gate.status().await?;
    let password = password.with_context(|| {
        format!(
            "A password is required ({}): pass --password or set NOTEVAULT_PASSWORD",
            status.action_label()
        )
    })?;

    match gate.submit(&password).await? {
        AuthOutcome::Enrolled => {
            eprintln!("Password set.");
            Ok(())
        }
        AuthOutcome::Accepted => Ok(()),
        AuthOutcome::Rejected => anyhow::bail!("Incorrect password"),
    }
}

async fn serve(config: Config, port: u16) -> anyhow::Result<()> {
    let storage = open_storage(&config)?;
    let notebook = Notebook::open(storage.clone()).await?;
    let autosave = Autosave::start(notebook.clone(), config.autosave_period());

    let app = api::create_router(AppState::new(notebook.clone(), AuthGate::new(storage)));

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
    tracing::info!("notevault listening on http://127.0.0.1:{}", port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    autosave.stop().await;
    notebook.save().await?;
    tracing::info!("Server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let command = cli.command.unwrap_or(Commands::Serve { port: None });
    let serving = matches!(command, Commands::Serve { .. });
    init_tracing(!serving);

    let config = Config::load();

    match command {
        Commands::Serve { port } => {
            let port = port.unwrap_or(config.port);
            serve(config, port).await
        }
        Commands::Config { save } => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            if save {
                config.save()?;
            }
            Ok(())
        }
        Commands::Notes(command) => run_note_command(&config, cli.password, command).await,
    }
}

async fn run_note_command(
    config: &Config,
    password: Option<String>,
    command: NoteCommand,
) -> anyhow::Result<()> {
    let storage = open_storage(config)?;
    unlock(&AuthGate::new(storage.clone()), password).await?;
    let notebook = Notebook::open(storage).await?;

    match command {
        NoteCommand::Tree => {
            print!("{}", render::render_tree(&notebook.forest(), None));
        }
        NoteCommand::Show { id } => {
            let item = notebook.get(id).context("Item not found")?;
            print!("{}", render::render_document(&item));
        }
        NoteCommand::NewFolder { name, parent } => {
            let item = notebook
                .create_item(CreateItemInput {
                    name,
                    kind: ItemKind::Folder,
                    parent_id: parent,
                })
                .await?;
            println!("{}", item.id);
        }
        NoteCommand::NewDocument { name, parent } => {
            let item = notebook
                .create_item(CreateItemInput {
                    name,
                    kind: ItemKind::Document,
                    parent_id: parent,
                })
                .await?;
            println!("{}", item.id);
        }
        NoteCommand::Edit { id, content } => {
            let content = match content {
                Some(content) => content,
                None => std::io::read_to_string(std::io::stdin())
                    .context("Failed to read content from stdin")?,
            };
            notebook.edit_content(id, &content)?;
            notebook.save().await?;
        }
        NoteCommand::Rename { id, name } => {
            notebook.rename(id, &name)?;
            notebook.save().await?;
        }
        NoteCommand::Delete { id } => {
            if !notebook.delete(id).await? {
                anyhow::bail!("Item not found: {}", id);
            }
        }
        NoteCommand::Move { id, parent } => {
            notebook.move_item(id, parent).await?;
        }
    }

    Ok(())
}
