use std::path::PathBuf;

use clap::builder::{styling::AnsiColor, Styles};
use clap::{Parser, Subcommand};

use crate::accuweather::BASE_URL;
use crate::policy::FRESHNESS_TTL_SECS;
use crate::weather::Units;
use crate::wiki::WIKI_URL;

const ABOUT: &str = "City weather dashboard TUI";

const LONG_ABOUT: &str = "
TUI for tracking current and recent weather in a list of cities, sourced from AccuWeather.

Type a city name to get suggestions, press Enter to add it, and open a city to see its last 24
hours as a temperature chart. Tracked cities and their last-known conditions are saved, so
subsequent runs of `citywx` start where you left off. Conditions younger than an hour are reused
instead of fetched again.

An AccuWeather API key is required (--api-key or ACCUWEATHER_API_KEY).
";

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Yellow.on_default())
    .usage(AnsiColor::Green.on_default())
    .literal(AnsiColor::Green.on_default())
    .placeholder(AnsiColor::Green.on_default());

#[derive(Parser, Debug)]
#[command(version, styles=STYLES, about=ABOUT, long_about = LONG_ABOUT)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[arg(long, env = "ACCUWEATHER_API_KEY", hide_env_values = true, global = true)]
    pub api_key: Option<String>,

    #[arg(long, env = "CITYWX_STORE", global = true, help = "Path of the saved city list")]
    pub store: Option<PathBuf>,

    #[arg(long, default_value = "pl-pl", global = true, help = "Language for place names and descriptions")]
    pub language: String,

    #[arg(long, default_value_t = FRESHNESS_TTL_SECS, global = true, help = "Seconds before stored conditions are fetched again")]
    pub ttl: i64,

    #[arg(long, value_enum, default_value_t = Units::Metric, global = true)]
    pub units: Units,

    #[arg(long, default_value = BASE_URL, global = true, hide = true)]
    pub base_url: String,

    #[arg(long, default_value = WIKI_URL, global = true, hide = true)]
    pub wiki_url: String,

    #[arg(long, global = true, help = "Do not look up city photos on Wikipedia")]
    pub no_photos: bool,

    #[arg(long, global = true, help = "Enable debug logging")]
    pub debug: bool,

    #[arg(long, global = true, help = "Log file used while the TUI is running")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Interactive dashboard (default)
    Tui,

    /// Resolve a place name and start tracking it
    Add { name: String },

    /// Show tracked cities with their stored conditions
    List,

    /// Bring conditions up to date
    Refresh {
        #[arg(help = "Only this city (name or location key)")]
        city: Option<String>,

        #[arg(long, short, help = "Fetch even if stored conditions are still fresh")]
        force: bool,
    },

    /// Current conditions and the last 24 hours for one city
    Show { city: String },

    /// Stop tracking a city
    Remove { city: String },

    /// Place name suggestions for a partial name
    Suggest { query: String },
}
