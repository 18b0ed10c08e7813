//! Command-line arguments and the server configuration they produce.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use conquest_room::{GameConfig, QuestionBank, QuestionBankError};
use conquest_session::SessionConfig;

/// Command-line arguments for `conquest-server`.
///
/// Anything not given keeps the default from [`GameConfig`] or
/// [`SessionConfig`].
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Listen address, "IP:PORT".
    #[arg(short, long, default_value = "127.0.0.1:8080")]
    pub bind: String,

    /// Side length of the square board.
    #[arg(long)]
    pub grid_size: Option<usize>,

    /// Seconds a question round stays open.
    #[arg(long)]
    pub round_secs: Option<u64>,

    #[arg(long)]
    pub min_players: Option<usize>,

    #[arg(long)]
    pub max_players: Option<usize>,

    /// Resolve rounds automatically when their deadline passes.
    #[arg(long)]
    pub auto_resolve: bool,

    /// JSON file with `[{prompt, options, correct}]` to use instead of the
    /// built-in questions.
    #[arg(short, long)]
    pub questions: Option<PathBuf>,

    /// Seed for question draws, for reproducible games.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Drop connections silent for this many seconds.
    #[arg(long)]
    pub idle_timeout_secs: Option<u64>,

    /// Base log level. `RUST_LOG` takes precedence when set.
    #[arg(short, long, default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON lines.
    #[arg(long)]
    pub json_logs: bool,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
            grid_size: None,
            round_secs: None,
            min_players: None,
            max_players: None,
            auto_resolve: false,
            questions: None,
            seed: None,
            idle_timeout_secs: None,
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

/// Everything the server needs at startup.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: String,
    pub game: GameConfig,
    pub session: SessionConfig,
    /// Question file; `None` uses the built-in bank.
    pub questions: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Args::default().into()
    }
}

impl ServerConfig {
    /// Loads the configured question bank.
    pub fn question_bank(&self) -> Result<QuestionBank, QuestionBankError> {
        match &self.questions {
            Some(path) => QuestionBank::from_json_file(path),
            None => Ok(QuestionBank::builtin()),
        }
    }
}

impl From<Args> for ServerConfig {
    fn from(args: Args) -> Self {
        let defaults = GameConfig::default();
        let game = GameConfig {
            grid_size: args.grid_size.unwrap_or(defaults.grid_size),
            round_duration: args
                .round_secs
                .map_or(defaults.round_duration, Duration::from_secs),
            min_players: args.min_players.unwrap_or(defaults.min_players),
            max_players: args.max_players.unwrap_or(defaults.max_players),
            auto_resolve: args.auto_resolve,
            seed: args.seed,
        };

        let mut session = SessionConfig::default();
        if let Some(secs) = args.idle_timeout_secs {
            session.idle_timeout = Duration::from_secs(secs);
        }

        Self {
            bind: args.bind,
            game,
            session,
            questions: args.questions,
        }
    }
}
