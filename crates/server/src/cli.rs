use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "packharvest",
    version,
    about = "Harvest sticker packs into a WhatsApp-compliant store"
)]
pub struct Cli {
    /// Configuration file. Missing files fall back to defaults.
    #[arg(short, long, env = "PACKHARVEST_CONFIG", default_value = "config.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Walk the recommended feed of every locale once
    Recommended,
    /// Walk every keyword of every locale once
    Keywords,
    /// Recommended feed, then keywords
    Full,
    /// Cursor-driven harvest until interrupted
    Continuous,
    /// Print store totals and the persisted cursor as JSON
    Stats,
}

impl Command {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Recommended => "recommended",
            Self::Keywords => "keywords",
            Self::Full => "full",
            Self::Continuous => "continuous",
            Self::Stats => "stats",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_subcommand() {
        let cli = Cli::try_parse_from(["packharvest", "continuous"]).unwrap();
        assert_eq!(cli.command, Command::Continuous);
    }

    #[test]
    fn test_parse_config_flag() {
        let cli = Cli::try_parse_from(["packharvest", "--config", "/etc/ph.toml", "stats"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("/etc/ph.toml"));
        assert_eq!(cli.command, Command::Stats);
    }

    #[test]
    fn test_subcommand_required() {
        assert!(Cli::try_parse_from(["packharvest"]).is_err());
    }

    #[test]
    fn test_unknown_subcommand_rejected() {
        assert!(Cli::try_parse_from(["packharvest", "sideways"]).is_err());
    }
}
