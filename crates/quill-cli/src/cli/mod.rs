//! CLI entry and dispatch.

use anyhow::{Context, Result};
use clap::Parser;
use quill_core::{config, logging};

mod commands;

use commands::App;

#[derive(Parser)]
#[command(name = "quill")]
#[command(version)]
#[command(about = "Command-line client for the quill blog")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Show timestamps in UTC instead of local time
    #[arg(long, global = true)]
    utc: bool,
}

/// Username and password shared by login and register.
#[derive(clap::Args, Debug, Clone)]
struct CredentialArgs {
    /// Account username
    #[arg(short, long)]
    username: String,

    /// Account password
    #[arg(short, long, env = "QUILL_PASSWORD", hide_env_values = true)]
    password: String,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Log in and store the session
    Login {
        #[command(flatten)]
        credentials: CredentialArgs,
    },
    /// Create an account
    Register {
        #[command(flatten)]
        credentials: CredentialArgs,
    },
    /// Clear the stored session
    Logout,
    /// Show the current session
    Whoami,
    /// Browse and manage posts
    Posts {
        #[command(subcommand)]
        command: PostCommands,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Subcommand)]
enum PostCommands {
    /// List posts, one page at a time
    List {
        /// Page number (1-based)
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
        page: u32,

        /// Posts per page (default: config page_size)
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        page_size: Option<u32>,
    },
    /// Show a single post
    Show {
        #[arg(value_name = "POST_ID")]
        id: i64,
    },
    /// Create a post
    New {
        #[arg(long)]
        title: String,
        #[arg(long)]
        content: String,
    },
    /// Edit one of your posts; omitted fields keep their current value
    Edit {
        #[arg(value_name = "POST_ID")]
        id: i64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        content: Option<String>,
    },
    /// Delete one of your posts
    Delete {
        #[arg(value_name = "POST_ID")]
        id: i64,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    // logging is best-effort; commands still run without a log file
    let _log_guard = logging::init(&config::paths::logs_dir()).ok();

    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;
    rt.block_on(async move { dispatch(cli).await })
}

async fn dispatch(cli: Cli) -> Result<()> {
    let Cli { command, utc } = cli;

    match command {
        // config commands must work even when the config file is broken
        Commands::Config { command } => run_config(&command),
        command => {
            let config = config::Config::load().context("load config")?;
            let mut app = App::new(&config, utc)?;
            dispatch_session(&mut app, command).await
        }
    }
}

async fn dispatch_session(app: &mut App, command: Commands) -> Result<()> {
    match command {
        Commands::Login { credentials } => {
            commands::auth::login(app, &credentials.username, &credentials.password).await
        }
        Commands::Register { credentials } => {
            commands::auth::register(app, &credentials.username, &credentials.password).await
        }
        Commands::Logout => {
            commands::auth::logout(app);
            Ok(())
        }
        Commands::Whoami => {
            commands::auth::whoami(app);
            Ok(())
        }

        Commands::Posts { command } => match command {
            PostCommands::List { page, page_size } => {
                commands::posts::list(app, page, page_size).await;
                Ok(())
            }
            PostCommands::Show { id } => commands::posts::show(app, id).await,
            PostCommands::New { title, content } => {
                commands::posts::create(app, &title, &content).await
            }
            PostCommands::Edit { id, title, content } => {
                commands::posts::edit(app, id, title.as_deref(), content.as_deref()).await
            }
            PostCommands::Delete { id } => commands::posts::delete(app, id).await,
        },

        Commands::Config { command } => run_config(&command),
    }
}

fn run_config(command: &ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Path => {
            commands::config::path();
            Ok(())
        }
        ConfigCommands::Init => commands::config::init(),
    }
}
