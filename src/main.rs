use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::{fs, io, sync::Mutex};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod accuweather;
mod app;
mod cities;
mod cli;
mod config;
mod debounce;
mod error;
mod history;
mod policy;
mod store;
mod units;
mod weather;
mod wiki;

use crate::accuweather::{AccuWeather, WeatherProvider};
use crate::app::{run_app, App};
use crate::cities::{add_city, find_city, remove_city, AddOutcome};
use crate::cli::{Args, Command};
use crate::config::Config;
use crate::history::{HistoryState, HistoryView, EMPTY_MESSAGE};
use crate::policy::ConditionsPolicy;
use crate::store::{CityStore, JsonFileStore};
use crate::weather::{City, Units};
use crate::wiki::{PhotoLookup, Wikipedia};

const MISSING: &str = "--";

/// Log to stderr for one-shot commands, to a file while the TUI owns the screen.
fn init_tracing(config: &Config, to_file: bool) -> Result<()> {
    let filter = if config.debug {
        EnvFilter::new("citywx=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("citywx=info"))
    };

    if to_file {
        if let Some(parent) = config.log_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.log_path)
            .with_context(|| format!("opening log file {}", config.log_path.display()))?;
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_target(false).with_writer(io::stderr))
            .with(filter)
            .init();
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::from_args(&args);
    let command = args.command.clone().unwrap_or(Command::Tui);
    init_tracing(&config, command == Command::Tui)?;

    let store = JsonFileStore::new(&config.store_path);
    tracing::debug!("citywx starting, cities stored in {}", store.path().display());

    match command {
        Command::List => list(&store, config.units),
        other => run_remote(other, &config, &store),
    }
}

/// Everything past `list` talks to AccuWeather and needs the API key.
fn run_remote(command: Command, config: &Config, store: &JsonFileStore) -> Result<()> {
    let provider = AccuWeather::new(&config.base_url, config.api_key()?, &config.language)?;
    let wikipedia = if config.photos {
        Some(Wikipedia::new(&config.wiki_url)?)
    } else {
        None
    };
    let photos = wikipedia.as_ref().map(|w| w as &dyn PhotoLookup);
    let policy = ConditionsPolicy::new(&provider, store).with_ttl(config.ttl_secs);

    match command {
        Command::Tui => tui(&provider, photos, store, config),
        Command::Add { name } => {
            match add_city(&provider, photos, store, &name) {
                AddOutcome::Added(city) => {
                    println!("Added {} ({})", city.name, city.id());
                    print_city(&city, config.units);
                }
                AddOutcome::AlreadyTracked(name) => println!("{name} is already tracked"),
                AddOutcome::NotFound => println!("No place matches '{name}'"),
                AddOutcome::Failed(err) => println!("Could not add '{name}': {err}"),
            }
            Ok(())
        }
        Command::Refresh { city: Some(id), force } => {
            let stored = store.load()?;
            let mut city = find_city(&stored, &id)
                .with_context(|| format!("'{id}' is not tracked"))?
                .clone();
            if let Some(current) = policy.get_conditions(&city, force) {
                crate::policy::apply(&mut city, &current);
            }
            print_city(&city, config.units);
            Ok(())
        }
        Command::Refresh { city: None, force } => {
            for city in policy.refresh_all(force) {
                print_city(&city, config.units);
            }
            Ok(())
        }
        Command::Show { city } => show(&provider, &policy, store, &city, config.units),
        Command::Remove { city } => {
            if remove_city(store, &city)? {
                println!("Removed {city}");
            } else {
                println!("'{city}' is not tracked");
            }
            Ok(())
        }
        Command::Suggest { query } => {
            for place in provider.autocomplete(&query)? {
                println!("{:10} {}", place.key, place.display_name());
            }
            Ok(())
        }
        Command::List => list(store, config.units),
    }
}

fn tui(
    provider: &dyn WeatherProvider,
    photos: Option<&dyn PhotoLookup>,
    store: &dyn CityStore,
    config: &Config,
) -> Result<()> {
    // setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // create app and run it
    let mut app = App::new(provider, photos, store, config.units, config.ttl_secs);
    let res = run_app(&mut terminal, &mut app);

    // restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        tracing::error!("{}", err);
        println!("{:?}", err)
    }

    Ok(())
}

fn temperature(city: &City, units: Units) -> String {
    match city.conditions.as_ref().and_then(|c| units.temperature(c)) {
        Some(t) => format!("{t:.1}{}", units.symbol()),
        None => MISSING.to_string(),
    }
}

fn print_city(city: &City, units: Units) {
    let text = city
        .conditions
        .as_ref()
        .map(|c| c.weather_text.as_str())
        .unwrap_or(MISSING);
    let updated = city
        .conditions
        .as_ref()
        .and_then(|c| c.observed_at())
        .map(|t| t.format("%d-%m-%Y %H:%M").to_string())
        .unwrap_or_else(|| MISSING.to_string());
    println!(
        "{:24} {:>8}  {:24} {}",
        city.name,
        temperature(city, units),
        text,
        updated
    );
}

fn list(store: &dyn CityStore, units: Units) -> Result<()> {
    let cities = store.load()?;
    if cities.is_empty() {
        println!("No cities tracked yet. Add one with `citywx add <name>`.");
    }
    for city in &cities {
        print_city(city, units);
    }
    Ok(())
}

fn show(
    provider: &dyn WeatherProvider,
    policy: &ConditionsPolicy,
    store: &dyn CityStore,
    id: &str,
    units: Units,
) -> Result<()> {
    let stored = store.load()?;
    let Some(city) = find_city(&stored, id) else {
        println!("No data for city: {id}");
        return Ok(());
    };

    let mut city = city.clone();
    if let Some(current) = policy.get_conditions(&city, false) {
        crate::policy::apply(&mut city, &current);
    }
    print_city(&city, units);
    if let Some(photo) = city.display_photo() {
        println!("  photo: {photo}");
    }

    let Some(ref key) = city.key else {
        return Ok(());
    };
    let mut history = HistoryView::default();
    history.load(provider, key, units);

    println!("\nLast 24 hours:");
    match history.state() {
        HistoryState::Error(err) => println!("  Error while fetching data: {err}"),
        HistoryState::Loaded(readings) if readings.is_empty() => println!("  {EMPTY_MESSAGE}"),
        HistoryState::Loaded(readings) => {
            for reading in readings {
                let when = reading
                    .observed_at()
                    .map(|t| t.format("%d %b %H:%M").to_string())
                    .unwrap_or_else(|| MISSING.to_string());
                let temp = units
                    .temperature(reading)
                    .map(|t| format!("{t:.1}{}", units.symbol()))
                    .unwrap_or_else(|| MISSING.to_string());
                println!("  {when:14} {temp:>8}  {}", reading.weather_text);
            }
        }
        HistoryState::Idle | HistoryState::Loading => {}
    }
    Ok(())
}
