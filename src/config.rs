use std::path::PathBuf;

use crate::cli::Args;
use crate::error::{Result, WxError};
use crate::weather::Units;

const APP_DIR: &str = "citywx";

/// Runtime settings resolved from the command line and environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: Option<String>,
    pub store_path: PathBuf,
    pub log_path: PathBuf,
    pub base_url: String,
    pub wiki_url: String,
    pub language: String,
    pub ttl_secs: i64,
    pub units: Units,
    pub photos: bool,
    pub debug: bool,
}

impl Config {
    pub fn from_args(args: &Args) -> Self {
        let data_dir = data_dir();
        Self {
            api_key: args.api_key.clone().filter(|k| !k.trim().is_empty()),
            store_path: args
                .store
                .clone()
                .unwrap_or_else(|| data_dir.join("cities.json")),
            log_path: args
                .log_file
                .clone()
                .unwrap_or_else(|| data_dir.join("citywx.log")),
            base_url: args.base_url.clone(),
            wiki_url: args.wiki_url.clone(),
            language: args.language.clone(),
            ttl_secs: args.ttl.max(0),
            units: args.units,
            photos: !args.no_photos,
            debug: args.debug,
        }
    }

    pub fn api_key(&self) -> Result<&str> {
        self.api_key.as_deref().ok_or(WxError::MissingApiKey)
    }
}

fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn parse(argv: &[&str]) -> Config {
        Config::from_args(&Args::try_parse_from(argv).unwrap())
    }

    #[test]
    fn explicit_paths_win() {
        let config = parse(&["citywx", "--store", "/tmp/c.json", "--log-file", "/tmp/c.log"]);
        assert_eq!(config.store_path, PathBuf::from("/tmp/c.json"));
        assert_eq!(config.log_path, PathBuf::from("/tmp/c.log"));
    }

    #[test]
    fn default_store_lives_in_app_dir() {
        let config = Config::from_args(&Args {
            store: None,
            ..Args::try_parse_from(["citywx"]).unwrap()
        });
        assert!(config.store_path.ends_with("citywx/cities.json"));
    }

    #[test]
    fn blank_api_key_is_missing() {
        let config = parse(&["citywx", "--api-key", "  "]);
        assert!(matches!(config.api_key(), Err(WxError::MissingApiKey)));

        let config = parse(&["citywx", "--api-key", "abc"]);
        assert_eq!(config.api_key().unwrap(), "abc");
    }

    #[test]
    fn negative_ttl_is_clamped() {
        let config = parse(&["citywx", "--ttl=-5"]);
        assert_eq!(config.ttl_secs, 0);
    }

    #[test]
    fn no_photos_flag() {
        assert!(parse(&["citywx"]).photos);
        assert!(!parse(&["citywx", "--no-photos"]).photos);
    }
}
