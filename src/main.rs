//! persistcache - exercise and manage a persistent memoization cache
//!
//! `persistcache square <N>` squares a number through the cache and reports
//! whether the result was computed or served from the database.
//! `persistcache invalidate <FUNCTION>` clears a function's cached results.

use std::cell::Cell;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use persistcache::cache;
use persistcache::cli::{Cli, Command, SQUARE_FUNCTION};
use persistcache::memoize::{invalidate_cache, memoize1};

/// Sends diagnostics to stderr; `RUST_LOG` wins over `--log-level`
fn setup_logging(cli: &Cli) {
    let filter = EnvFilter::builder()
        .with_default_directive(cli.log_level.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_square(value: i64, ttl: Duration) {
    let computed = Cell::new(false);
    let square = memoize1(SQUARE_FUNCTION, ttl, |x: i64| {
        computed.set(true);
        x.saturating_mul(x)
    });

    let result = square(value);
    let source = if computed.get() { "computed" } else { "cached" };
    println!("{value}^2 = {result} ({source})");
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    setup_logging(&cli);

    // Open the store up front so a bad path is reported instead of panicking later
    cache::init(&cli.cache_config()).map_err(|e| e.to_string())?;

    match &cli.command {
        Command::Square { value, ttl } => run_square(*value, Duration::from_secs(*ttl)),
        Command::Invalidate { function } => {
            invalidate_cache(function.clone());
            println!("Invalidated cached results of {function}");
        }
    }

    Ok(())
}
