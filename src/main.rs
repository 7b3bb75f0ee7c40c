use clap::{Parser, Subcommand};
use std::io::{Read, Write};
use std::path::PathBuf;
use thiserror::Error;

use pdict::config::{ConfigError, StoreConfig};
use pdict::kv::{Format, KvError, KvStore, MATCH_ALL};
use pdict::subscriber::{self, LoggingError};

/// Stored values are handled as generic JSON-shaped data on the command line.
type Value = serde_json::Value;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON value: {0}")]
    Json(#[from] serde_json::Error),

    #[error("KV store error: {0}")]
    Kv(#[from] KvError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Logging error: {0}")]
    Logging(#[from] LoggingError),
}

#[derive(Parser)]
#[command(name = "pdict")]
#[command(about = "Persistent dictionary backed by a SQLite file, with glob key matching")]
struct Cli {
    /// Store path (overrides the config file)
    #[arg(long, global = true, env = "PDICT_PATH")]
    path: Option<PathBuf>,

    /// TOML configuration file
    #[arg(long, global = true, env = "PDICT_CONFIG")]
    config: Option<PathBuf>,

    /// Value serializer (overrides the config file)
    #[arg(long, global = true, value_enum)]
    format: Option<Format>,

    /// Apply all writes of this command in a single transaction
    #[arg(long, global = true)]
    batch: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the store file if it does not exist
    Init,

    /// Print a fresh unique key
    Uuid {
        /// Namespace to prepend, e.g. "users/"
        #[arg(long, default_value = "")]
        prefix: String,
    },

    /// List keys matching a glob pattern
    Keys {
        /// Glob pattern (`*`, `?`, `[...]`)
        #[arg(default_value = MATCH_ALL)]
        pattern: String,
    },

    /// Count keys matching a glob pattern
    Count {
        /// Glob pattern (`*`, `?`, `[...]`)
        #[arg(default_value = MATCH_ALL)]
        pattern: String,
    },

    /// Print the value stored under an exact key
    Get {
        /// Exact key
        key: String,
    },

    /// Store a JSON value under a key (`null` deletes the key)
    Set {
        /// Exact key
        key: String,

        /// JSON-encoded value
        #[arg(group = "input")]
        value: Option<String>,

        /// Read the JSON value from a file
        #[arg(long, group = "input")]
        file: Option<PathBuf>,
    },

    /// Delete every key matching a glob pattern
    Delete {
        /// Glob pattern (`*`, `?`, `[...]`)
        pattern: String,
    },

    /// Print key/value pairs matching a glob pattern as JSON lines
    Items {
        /// Glob pattern (`*`, `?`, `[...]`)
        #[arg(default_value = MATCH_ALL)]
        pattern: String,
    },

    /// Export every pair matching a glob pattern as one blob
    Dump {
        /// Glob pattern (`*`, `?`, `[...]`)
        #[arg(default_value = MATCH_ALL)]
        pattern: String,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Import a blob produced by `dump`
    Load {
        /// Input file (stdin if not specified)
        input: Option<PathBuf>,
    },
}

fn main() -> Result<(), AppError> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => StoreConfig::from_file(path)?,
        None => StoreConfig::default(),
    };
    if let Some(path) = cli.path {
        config.path = path;
    }
    if let Some(format) = cli.format {
        config.format = format;
    }
    if cli.batch {
        config.autocommit = false;
    }

    subscriber::init(&config.logging)?;
    tracing::debug!(path = %config.path.display(), format = ?config.format, "resolved configuration");

    if let Commands::Uuid { prefix } = &cli.command {
        println!("{}{}", prefix, uuid::Uuid::new_v4());
        return Ok(());
    }

    let existed = config.path.exists();
    let store = config.open()?;
    run(&store, cli.command, existed)?;
    store.commit()?;
    store.close()?;
    Ok(())
}

fn run(store: &KvStore<Format>, command: Commands, existed: bool) -> Result<(), AppError> {
    match command {
        Commands::Init => {
            let path = store.path().map(|p| p.display().to_string()).unwrap_or_default();
            if existed {
                println!("Store already exists at {}", path);
            } else {
                println!("Initialized store at {}", path);
            }
        }
        Commands::Uuid { prefix } => {
            println!("{}{}", prefix, store.generate_key());
        }
        Commands::Keys { pattern } => {
            let keys = store.keys(&pattern)?;
            if keys.is_empty() {
                eprintln!("No keys found");
            }
            for key in keys {
                println!("{}", key);
            }
        }
        Commands::Count { pattern } => {
            println!("{}", store.len(&pattern)?);
        }
        Commands::Get { key } => match store.get::<Value>(&key)? {
            Some(value) => println!("{}", serde_json::to_string_pretty(&value)?),
            None => {
                eprintln!("Key '{}' not found", key);
                std::process::exit(1);
            }
        },
        Commands::Set { key, value, file } => {
            let text = match (value, file) {
                (Some(v), _) => v,
                (None, Some(f)) => std::fs::read_to_string(f)?,
                (None, None) => {
                    eprintln!("Either a value or --file must be specified");
                    std::process::exit(1);
                }
            };
            let value: Value = serde_json::from_str(&text)?;
            store.set(&key, &value)?;
            if value.is_null() {
                println!("Deleted '{}'", key);
            } else {
                println!("Set '{}'", key);
            }
        }
        Commands::Delete { pattern } => {
            let removed = store.delete(&pattern)?;
            println!("Deleted {} key(s) matching '{}'", removed, pattern);
        }
        Commands::Items { pattern } => {
            for (key, value) in store.items::<Value>(&pattern)? {
                println!("{}", serde_json::json!({ "key": key, "value": value }));
            }
        }
        Commands::Dump { pattern, output } => {
            let blob = store.dump::<Value>(&pattern)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, &blob)?;
                    eprintln!("Dumped to {} ({} bytes)", path.display(), blob.len());
                }
                None => std::io::stdout().write_all(&blob)?,
            }
        }
        Commands::Load { input } => {
            let blob = match input {
                Some(path) => std::fs::read(path)?,
                None => {
                    let mut buf = Vec::new();
                    std::io::stdin().read_to_end(&mut buf)?;
                    buf
                }
            };
            let count = store.load::<Value>(&blob)?;
            println!("Loaded {} entries", count);
        }
    }
    Ok(())
}
