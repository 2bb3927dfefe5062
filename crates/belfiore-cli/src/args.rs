//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Look up Italian cities and foreign countries by Belfiore code or name.
#[derive(Debug, Parser)]
#[command(name = "belfiore")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// JSON file holding the places dataset (overrides config)
    #[arg(long, global = true, value_name = "PATH")]
    pub file: Option<PathBuf>,

    /// URL serving the places dataset as JSON (overrides config)
    #[arg(long, global = true, conflicts_with = "file")]
    pub url: Option<String>,

    /// Seconds a retrieved dataset stays fresh
    #[arg(long, global = true, value_name = "SECONDS")]
    pub ttl: Option<u64>,

    /// Only places in this province (two uppercase letters)
    #[arg(long, global = true, conflicts_with = "countries")]
    pub province: Option<String>,

    /// Only cities
    #[arg(long, global = true, conflicts_with = "countries")]
    pub cities: bool,

    /// Only countries
    #[arg(long, global = true)]
    pub countries: bool,

    /// Only places active on DATE, given as --active=DATE (today when omitted)
    #[arg(
        long,
        global = true,
        value_name = "DATE",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "today"
    )]
    pub active: Option<String>,

    /// Only places already existing on DATE
    #[arg(long, global = true, value_name = "DATE")]
    pub from: Option<String>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Print every place of the selected view
    List,

    /// Print the province codes of the selected view
    Provinces,

    /// Print places whose name contains TEXT
    Search { text: String },

    /// Print the place named exactly NAME
    FindName { name: String },

    /// Print the place with the given Belfiore code
    FindCode { code: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_find_code() {
        let cli = Cli::parse_from(["belfiore", "--file", "places.json", "find-code", "H501"]);
        assert_eq!(cli.file, Some(PathBuf::from("places.json")));
        match cli.command {
            Commands::FindCode { code } => assert_eq!(code, "H501"),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_active_without_date_means_today() {
        let cli = Cli::parse_from(["belfiore", "list", "--active"]);
        assert_eq!(cli.active.as_deref(), Some("today"));

        let cli = Cli::parse_from(["belfiore", "list", "--active=1950-01-01"]);
        assert_eq!(cli.active.as_deref(), Some("1950-01-01"));
    }

    #[test]
    fn test_active_before_subcommand_keeps_subcommand() {
        let cli = Cli::parse_from(["belfiore", "--active", "list"]);
        assert_eq!(cli.active.as_deref(), Some("today"));
        assert!(matches!(cli.command, Commands::List));

        let cli = Cli::parse_from(["belfiore", "--active=01/02/1950", "provinces"]);
        assert_eq!(cli.active.as_deref(), Some("01/02/1950"));
        assert!(matches!(cli.command, Commands::Provinces));
    }

    #[test]
    fn test_countries_conflicts_with_province() {
        let result = Cli::try_parse_from(["belfiore", "--countries", "--province", "RM", "list"]);
        assert!(result.is_err());

        let result = Cli::try_parse_from(["belfiore", "--countries", "--cities", "list"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_file_conflicts_with_url() {
        let result = Cli::try_parse_from([
            "belfiore",
            "--file",
            "a.json",
            "--url",
            "https://example.org",
            "list",
        ]);
        assert!(result.is_err());
    }
}
