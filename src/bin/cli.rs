//! StrataKV CLI
//!
//! Opens a data directory, runs one command against it and closes it.

use std::path::Path;
use std::process;

use clap::{Parser, Subcommand};
use stratakv::storage::StorageManager;
use stratakv::wal::{WalRecovery, WAL_FILE_NAME};
use stratakv::{Config, Engine};
use tracing_subscriber::{fmt, EnvFilter};

/// StrataKV CLI
#[derive(Parser, Debug)]
#[command(name = "stratakv")]
#[command(about = "Embeddable crash-safe key-value store")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./stratakv_data")]
    data_dir: String,

    /// MemTable entries before a flush to a new segment
    #[arg(short = 't', long, default_value = "100")]
    flush_threshold: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(flatten)]
    Engine(EngineCommand),

    /// Verify the WAL and list segments without modifying anything
    Inspect,
}

/// Commands that run against an open engine
#[derive(Subcommand, Debug)]
enum EngineCommand {
    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Set a key-value pair
    Put {
        /// The key to set
        key: String,

        /// The value to set
        value: String,
    },

    /// Delete a key
    Delete {
        /// The key to delete
        key: String,
    },

    /// Flush the memtable to a new segment
    Flush,

    /// Run a short put/get/delete walkthrough
    Demo,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,stratakv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        tracing::error!("{}", e);
        process::exit(1);
    }
}

fn run(args: Args) -> stratakv::Result<()> {
    let command = match args.command {
        // Opening the engine would repair the WAL before it is examined
        Commands::Inspect => return inspect(Path::new(&args.data_dir)),
        Commands::Engine(command) => command,
    };

    let config = Config::builder()
        .data_dir(&args.data_dir)
        .memtable_flush_threshold(args.flush_threshold)
        .build();

    let engine = Engine::open(config)?;
    let result = execute(&engine, command);
    let closed = engine.close();

    result.and(closed)
}

fn execute(engine: &Engine, command: EngineCommand) -> stratakv::Result<()> {
    match command {
        EngineCommand::Get { key } => match engine.get(&key)? {
            Some(value) => println!("{}", String::from_utf8_lossy(&value)),
            None => println!("(not found)"),
        },
        EngineCommand::Put { key, value } => {
            engine.put(&key, &value)?;
            println!("OK");
        }
        EngineCommand::Delete { key } => {
            engine.delete(&key)?;
            println!("OK");
        }
        EngineCommand::Flush => {
            engine.flush()?;
            println!("OK ({} segments)", engine.segment_count());
        }
        EngineCommand::Demo => demo(engine)?,
    }
    Ok(())
}

fn demo(engine: &Engine) -> stratakv::Result<()> {
    engine.put("key1", "value1")?;
    engine.put("key2", "value2")?;

    for key in ["key1", "key2"] {
        print_lookup(engine, key)?;
    }

    engine.delete("key1")?;
    println!("deleted key1");

    for key in ["key1", "key2"] {
        print_lookup(engine, key)?;
    }
    Ok(())
}

fn print_lookup(engine: &Engine, key: &str) -> stratakv::Result<()> {
    match engine.get(key)? {
        Some(value) => println!("{} = {}", key, String::from_utf8_lossy(&value)),
        None => println!("{} not found", key),
    }
    Ok(())
}

fn inspect(data_dir: &Path) -> stratakv::Result<()> {
    let wal = WalRecovery::verify(&data_dir.join(WAL_FILE_NAME))?;
    println!(
        "{}: {} entries, last lsn {}, {} bytes past the valid prefix",
        WAL_FILE_NAME, wal.entries_recovered, wal.last_lsn, wal.bytes_discarded
    );

    for segment in StorageManager::list_segments(data_dir)? {
        println!(
            "{}: seq {}, {} entries",
            segment.path.display(),
            segment.seq,
            segment.entry_count
        );
    }
    Ok(())
}
