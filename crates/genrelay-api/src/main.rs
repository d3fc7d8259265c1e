//! genrelay entry point.
//!
//! Binary name: `genrelay`
//!
//! Parses CLI arguments, initializes the database and the pipeline, then
//! either runs the stdio transport loop (`serve`) or dispatches a one-shot
//! command (digest, status administration).

mod state;
mod stdio;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use genrelay_types::preferences::UserPreferences;
use genrelay_types::status::{ChatStatus, UserStatus};
use state::AppState;

#[derive(Parser)]
#[command(name = "genrelay", version, about = "Chat relay to a generation backend")]
struct Cli {
    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Export spans via OpenTelemetry (stdout exporter)
    #[arg(long, global = true)]
    otel: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the stdio transport loop until EOF or SIGINT
    Serve,
    /// Produce one digest of a chat's ambient log
    Digest {
        #[arg(long)]
        chat_id: i64,
        /// Message to attach the digest to
        #[arg(long, default_value_t = 0)]
        reply_to: i64,
    },
    /// Set a user's access status
    SetUserStatus {
        #[arg(long)]
        user_id: i64,
        /// One of SUPERADMIN, ADMIN, AUTHORIZED, PENDING, UNAUTHORIZED,
        /// BLOCKED, REVERSE_BLOCKED
        #[arg(long)]
        status: String,
    },
    /// Set a chat's access status
    SetChatStatus {
        #[arg(long)]
        chat_id: i64,
        /// One of AUTHORIZED, PENDING, UNAUTHORIZED, BLOCKED
        #[arg(long)]
        status: String,
    },
    /// Set a user's generation overrides (omitted fields keep their value)
    SetPreferences {
        #[arg(long)]
        user_id: i64,
        /// Sampling temperature for text generation
        #[arg(long)]
        temperature: Option<f64>,
        /// System instruction prepended to every dialog
        #[arg(long)]
        instruction: Option<String>,
        /// Per-request backend timeout in seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
        /// Drop all overrides, returning the user to the defaults
        #[arg(long, conflicts_with_all = ["temperature", "instruction", "timeout_secs"])]
        reset: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up tracing based on verbosity; an explicit RUST_LOG wins.
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn,genrelay=info",
        1 => "info,genrelay=debug",
        _ => "trace",
    };
    if std::env::var_os("RUST_LOG").is_none() {
        // SAFETY: no other threads are running this early in main.
        unsafe { std::env::set_var("RUST_LOG", filter) };
    }
    genrelay_observe::tracing_setup::init_tracing(cli.otel)
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let state = AppState::init().await?;

    match cli.command {
        Commands::Serve => {
            let token = CancellationToken::new();
            let signal_token = token.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    signal_token.cancel();
                }
            });
            stdio::run(state.pipeline.clone(), token).await?;
        }

        Commands::Digest { chat_id, reply_to } => {
            let outcome = state.pipeline.digest(chat_id, reply_to).await;
            tracing::info!(?outcome, chat_id, "digest finished");
        }

        Commands::SetUserStatus { user_id, status } => {
            let status: UserStatus = status.parse().map_err(|e: String| anyhow::anyhow!(e))?;
            use genrelay_core::repository::StatusRepository;
            state.statuses.set_user_status(user_id, status).await?;
            println!("user {user_id} -> {status}");
        }

        Commands::SetChatStatus { chat_id, status } => {
            let status: ChatStatus = status.parse().map_err(|e: String| anyhow::anyhow!(e))?;
            use genrelay_core::repository::StatusRepository;
            state.statuses.set_chat_status(chat_id, status).await?;
            println!("chat {chat_id} -> {status}");
        }

        Commands::SetPreferences {
            user_id,
            temperature,
            instruction,
            timeout_secs,
            reset,
        } => {
            use genrelay_core::repository::PreferencesRepository;
            if reset {
                state.prefs.reset_preferences(user_id).await?;
            } else {
                let update = UserPreferences {
                    temperature,
                    instruction_text: instruction,
                    timeout_secs,
                };
                state.prefs.update_preferences(user_id, &update).await?;
            }
            let prefs = state.prefs.preferences(user_id).await?;
            println!("user {user_id} preferences: {prefs:?}");
        }
    }

    genrelay_observe::tracing_setup::shutdown_tracing();
    Ok(())
}
