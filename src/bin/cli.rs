//! bucketkv CLI
//!
//! Command-line interface operating directly on a storage directory.

use bucketkv::protocol::{Command, CommandKind};
use bucketkv::{Config, Engine, Result};
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

/// bucketkv CLI
#[derive(Parser, Debug)]
#[command(name = "bucketkv-cli")]
#[command(about = "Tool to create storages of key-value pairs")]
#[command(version)]
struct Args {
    /// Name of the storage to use
    storage: String,

    /// Command to execute on the storage
    #[arg(value_enum)]
    command: CommandKind,

    /// Keys or key=value pairs depending on command
    #[arg(required = true)]
    items: Vec<String>,

    /// Print detailed output
    #[arg(short, long)]
    verbose: bool,

    /// Number of buckets
    #[arg(long, default_value = "16")]
    buckets: usize,

    /// Max buckets held in memory
    #[arg(long, default_value = "2")]
    cache: usize,
}

fn main() {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    // Errors are reported as text, not through the exit code
    match run(&args) {
        Ok(lines) => {
            for line in lines {
                println!("{}", line);
            }
        }
        Err(e) => println!("{}", e),
    }
}

fn run(args: &Args) -> Result<Vec<String>> {
    let command = Command::parse(args.command, &args.items)?;

    let config = Config::builder()
        .data_dir(&args.storage)
        .bucket_count(args.buckets)
        .max_cached_buckets(args.cache)
        .build();
    let mut engine = Engine::open(config)?;

    let outcome = engine.execute(command)?;
    engine.flush()?;

    Ok(outcome.render(args.verbose))
}
