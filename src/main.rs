use clap::Parser;
use tracing_subscriber::EnvFilter;

use simple_db::errors::fatal;
use simple_db::table::Table;
use simple_db::repl;

#[derive(Parser)]
#[command(name = "simple_db", version, about = "A tiny paged B+tree key-value store.")]
struct Cli {
    /// Path to the database file. Created if it does not already exist.
    database: String,

    /// Overrides the tracing filter directive (defaults to the `RUST_LOG`
    /// env var, or "info" if unset).
    #[arg(long, env = "DB_LOG")]
    log_level: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    let filter = match &cli.log_level {
        Some(level) => EnvFilter::new(level.clone()),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let table = match Table::open(&cli.database) {
        Ok(table) => table,
        Err(e) => fatal(format!("{}", e)),
    };

    if let Err(e) = repl::run(table) {
        fatal(format!("{}", e));
    }
}
