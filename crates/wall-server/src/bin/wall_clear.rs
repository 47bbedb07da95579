//! Wipes every submission and legacy message. Administrative use only;
//! the HTTP surface has no delete operation.

use std::path::PathBuf;

use clap::Parser;
use tracing::{info, warn};

/// Delete every message on the wall.
#[derive(Parser, Debug)]
#[command(name = "wall-clear")]
struct Cli {
    /// SQLite database to clear.
    #[arg(long, env = "WALL_DB_PATH", default_value = "wall.db")]
    db_path: PathBuf,

    /// Confirm the deletion. Without it nothing is touched.
    #[arg(long)]
    yes: bool,
}

fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wall_clear=info,wall_db=info".into()),
        )
        .init();

    if !cli.yes {
        warn!(
            "This deletes every message in {}. Re-run with --yes to confirm.",
            cli.db_path.display()
        );
        anyhow::bail!("not confirmed");
    }

    let db = wall_db::Database::open(&cli.db_path)?;
    let cleared = db.clear_all()?;

    info!("Deleted {} rows from submissions", cleared.submissions);
    info!("Deleted {} rows from messages", cleared.messages);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_yes_flag() {
        let cli = Cli::try_parse_from(["wall-clear", "--db-path", "x.db"]).unwrap();
        assert!(!cli.yes);
        assert_eq!(cli.db_path, PathBuf::from("x.db"));

        let cli = Cli::try_parse_from(["wall-clear", "--yes", "--db-path", "x.db"]).unwrap();
        assert!(cli.yes);
    }
}
