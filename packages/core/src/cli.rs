use clap::Parser;

/// VN Weather Dashboard CLI arguments
///
/// Every flag overrides the matching environment variable.
#[derive(Debug, Default, Parser)]
#[command(
    name = "vn-weather-dashboard",
    version,
    about = "Weather observations, LSTM forecasts and forecast accuracy for Vietnamese cities"
)]
pub struct Cli {
    /// Warehouse backend to query (databricks or sqlite)
    #[arg(long)]
    pub backend: Option<String>,

    /// Address the HTTP server binds to
    #[arg(long)]
    pub bind: Option<String>,

    /// SQLite database URL for the local backend
    #[arg(long)]
    pub sqlite_url: Option<String>,

    /// `catalog.schema` prefix of the warehouse tables
    #[arg(long)]
    pub catalog: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_overrides() {
        let cli = Cli::parse_from([
            "vn-weather-dashboard",
            "--backend",
            "sqlite",
            "--bind",
            "127.0.0.1:9000",
            "--sqlite-url",
            "sqlite::memory:",
            "--catalog",
            "dev.gold",
        ]);

        assert_eq!(cli.backend.as_deref(), Some("sqlite"));
        assert_eq!(cli.bind.as_deref(), Some("127.0.0.1:9000"));
        assert_eq!(cli.sqlite_url.as_deref(), Some("sqlite::memory:"));
        assert_eq!(cli.catalog.as_deref(), Some("dev.gold"));
    }

    #[test]
    fn no_flags_means_no_overrides() {
        let cli = Cli::parse_from(["vn-weather-dashboard"]);
        assert!(cli.backend.is_none());
        assert!(cli.bind.is_none());
    }
}
