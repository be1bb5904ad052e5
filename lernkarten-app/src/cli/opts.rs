use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreKind {
    Json,
    Sqlite,
}

#[derive(Debug, Parser, Clone)]
#[command(name = "lernkarten", version, about = "Lernkarten spaced-repetition flashcards (CLI/API)")]
pub struct Cli {
    /// Storage backend
    #[arg(long, value_enum, env = "LERNKARTEN_STORE", default_value_t = StoreKind::Json)]
    pub store: StoreKind,

    /// Directory for the JSON store and the default SQLite file
    #[arg(long, env = "LERNKARTEN_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// SQLite DB path when --store sqlite (defaults to the data dir)
    #[arg(long)]
    pub db_path: Option<PathBuf>,

    /// Learner whose cards are used
    #[arg(long, env = "LERNKARTEN_USER", default_value = "local")]
    pub user: String,

    /// Log filter, e.g. "info" or "lernkarten_core=debug"
    #[arg(long, env = "LERNKARTEN_LOG", default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Card operations
    #[command(subcommand)]
    Card(CardCmd),
    /// Interactive review loop
    Review(ReviewCmd),
    /// Import cards
    #[command(subcommand)]
    Import(ImportCmd),
    /// Export cards
    #[command(subcommand)]
    Export(ExportCmd),
    /// Review statistics and due forecast
    Stats(StatsCmd),
    /// Launch the HTTP API
    Api(ApiCmd),
}

#[derive(Debug, Subcommand, Clone)]
pub enum CardCmd {
    Add(CardAdd),
    List {
        #[arg(long)]
        query: Option<String>,
        /// Only cards due now
        #[arg(long)]
        due: bool,
    },
    Edit(CardEdit),
}

#[derive(Debug, Args, Clone)]
pub struct CardAdd {
    #[arg(long)]
    pub front: String,
    #[arg(long)]
    pub back: String,
}

#[derive(Debug, Args, Clone)]
pub struct CardEdit {
    pub card_id: String,
    #[arg(long)]
    pub front: Option<String>,
    #[arg(long)]
    pub back: Option<String>,
}

#[derive(Debug, Args, Clone)]
pub struct ReviewCmd {
    #[arg(long, default_value_t = 50)]
    pub max: usize,
}

#[derive(Debug, Subcommand, Clone)]
pub enum ImportCmd {
    /// CSV with a `front,back` header
    Csv { path: PathBuf },
    /// Bundle written by `export json`
    Json { path: PathBuf },
}

#[derive(Debug, Subcommand, Clone)]
pub enum ExportCmd {
    Csv { path: PathBuf },
    Json { path: PathBuf },
}

#[derive(Debug, Args, Clone)]
pub struct StatsCmd {
    /// Days of due forecast to print
    #[arg(long, default_value_t = 7, value_parser = clap::value_parser!(u32).range(0..=365))]
    pub days: u32,
}

#[derive(Debug, Args, Clone)]
pub struct ApiCmd {
    /// Bind address (host:port)
    #[arg(long, default_value = "127.0.0.1:8080")]
    pub addr: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_card_add_with_globals() {
        let cli = Cli::try_parse_from([
            "lernkarten", "--user", "ana", "--store", "sqlite", "card", "add", "--front", "hola",
            "--back", "hello",
        ])
        .unwrap();
        assert_eq!(cli.user, "ana");
        assert_eq!(cli.store, StoreKind::Sqlite);
        match cli.cmd {
            Command::Card(CardCmd::Add(a)) => {
                assert_eq!(a.front, "hola");
                assert_eq!(a.back, "hello");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn review_defaults() {
        let cli = Cli::try_parse_from(["lernkarten", "review"]).unwrap();
        match cli.cmd {
            Command::Review(r) => assert_eq!(r.max, 50),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn stats_forecast_is_capped_at_a_year() {
        assert!(Cli::try_parse_from(["lernkarten", "stats", "--days", "365"]).is_ok());
        assert!(Cli::try_parse_from(["lernkarten", "stats", "--days", "366"]).is_err());
    }
}
