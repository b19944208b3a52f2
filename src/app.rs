use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::io;
use std::time::{Duration, Instant};
use ratatui::{
    backend::Backend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{
        Axis, Block, BorderType, Borders, Cell, Chart, Dataset, GraphType, List, ListItem,
        Paragraph, Row, Table, Wrap,
    },
    Frame, Terminal,
};

use crate::accuweather::WeatherProvider;
use crate::cities::{add_city, find_city, remove_city, AddOutcome};
use crate::debounce::{Debouncer, AUTOCOMPLETE_DELAY};
use crate::history::{HistoryState, HistoryView, EMPTY_MESSAGE};
use crate::policy::{self, ConditionsPolicy};
use crate::store::CityStore;
use crate::weather::{City, Conditions, Location, Units};
use crate::wiki::PhotoLookup;

const MISSING: &str = "--";
const IDLE_TICK: Duration = Duration::from_millis(250);
const ICON_URL: &str = "https://www.accuweather.com/assets/images/weather-icons/v2a";

#[derive(Debug, Clone, PartialEq)]
pub enum Route {
    List,
    Detail(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

pub struct App<'a> {
    provider: &'a dyn WeatherProvider,
    photos: Option<&'a dyn PhotoLookup>,
    store: &'a dyn CityStore,
    units: Units,
    ttl_secs: i64,

    pub route: Route,
    pub cities: Vec<City>,
    pub input: String,
    pub suggestions: Vec<Location>,
    suggestion_cursor: Option<usize>,
    city_cursor: usize,
    debouncer: Debouncer<String>,
    pub history: HistoryView,
    pub status: Option<String>,
}

impl<'a> App<'a> {
    pub fn new(
        provider: &'a dyn WeatherProvider,
        photos: Option<&'a dyn PhotoLookup>,
        store: &'a dyn CityStore,
        units: Units,
        ttl_secs: i64,
    ) -> Self {
        Self {
            provider,
            photos,
            store,
            units,
            ttl_secs,
            route: Route::List,
            cities: Vec::new(),
            input: String::new(),
            suggestions: Vec::new(),
            suggestion_cursor: None,
            city_cursor: 0,
            debouncer: Debouncer::new(AUTOCOMPLETE_DELAY),
            history: HistoryView::default(),
            status: None,
        }
    }

    fn policy(&self) -> ConditionsPolicy<'a> {
        ConditionsPolicy::new(self.provider, self.store).with_ttl(self.ttl_secs)
    }

    /// Load the stored list and bring stale entries up to date.
    pub fn mount(&mut self) {
        self.cities = self.policy().refresh_all(false);
        self.city_cursor = 0;
    }

    fn reload(&mut self) {
        match self.store.load() {
            Ok(cities) => self.cities = cities,
            Err(err) => tracing::warn!("could not read stored cities: {}", err),
        }
        if self.city_cursor >= self.cities.len() {
            self.city_cursor = self.cities.len().saturating_sub(1);
        }
    }

    pub fn selected_city(&self) -> Option<&City> {
        self.cities.get(self.city_cursor)
    }

    pub fn handle_key(&mut self, key: KeyEvent, now: Instant) -> Flow {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return Flow::Exit;
        }
        match self.route {
            Route::List => self.list_key(key, now),
            Route::Detail(_) => self.detail_key(key),
        }
    }

    fn list_key(&mut self, key: KeyEvent, now: Instant) -> Flow {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('r') if ctrl => self.refresh_selected(),
            KeyCode::Char(c) if !ctrl => {
                self.input.push(c);
                self.input_changed(now);
            }
            KeyCode::Backspace => {
                self.input.pop();
                self.input_changed(now);
            }
            KeyCode::Up => self.move_cursor(-1),
            KeyCode::Down => self.move_cursor(1),
            KeyCode::Enter => {
                if let Some(i) = self.suggestion_cursor {
                    self.select_suggestion(i);
                } else if !self.input.trim().is_empty() {
                    self.add_from_input();
                } else if let Some(id) = self.selected_city().map(|c| c.id().to_string()) {
                    self.open(&id);
                }
            }
            KeyCode::Tab => {
                if let Some(id) = self.selected_city().map(|c| c.id().to_string()) {
                    self.open(&id);
                }
            }
            KeyCode::Delete => self.remove_selected(),
            KeyCode::Esc => {
                if self.input.is_empty() && self.suggestions.is_empty() {
                    return Flow::Exit;
                }
                self.clear_search();
            }
            _ => {}
        }
        Flow::Continue
    }

    fn detail_key(&mut self, key: KeyEvent) -> Flow {
        match key.code {
            KeyCode::Esc | KeyCode::Backspace | KeyCode::Char('b') => self.back(),
            KeyCode::Char('q') => return Flow::Exit,
            KeyCode::Char('r') => {
                // ignored while a request is in flight
                self.history.begin();
            }
            KeyCode::Char('f') => self.refresh_open_city(),
            _ => {}
        }
        Flow::Continue
    }

    fn input_changed(&mut self, now: Instant) {
        self.suggestion_cursor = None;
        if self.input.trim().is_empty() {
            self.debouncer.cancel();
            self.suggestions.clear();
        } else {
            self.debouncer.schedule(self.input.clone(), now);
        }
    }

    /// Fire the autocomplete query once typing has settled.
    pub fn tick(&mut self, now: Instant) {
        let Some(query) = self.debouncer.poll(now) else {
            return;
        };
        match self.provider.autocomplete(&query) {
            Ok(found) => self.suggestions = found,
            Err(err) => tracing::warn!("autocomplete for '{}' failed: {}", query, err),
        }
        self.suggestion_cursor = None;
    }

    pub fn time_until_due(&self, now: Instant) -> Option<Duration> {
        self.debouncer.time_until_due(now)
    }

    fn move_cursor(&mut self, delta: isize) {
        if !self.suggestions.is_empty() {
            let last = self.suggestions.len() - 1;
            self.suggestion_cursor = match (self.suggestion_cursor, delta) {
                (None, d) if d > 0 => Some(0),
                (None, _) => None,
                (Some(0), d) if d < 0 => None,
                (Some(i), d) if d < 0 => Some(i - 1),
                (Some(i), _) => Some((i + 1).min(last)),
            };
        } else if !self.cities.is_empty() {
            let last = self.cities.len() - 1;
            self.city_cursor = if delta < 0 {
                self.city_cursor.saturating_sub(1)
            } else {
                (self.city_cursor + 1).min(last)
            };
        }
    }

    pub fn select_suggestion(&mut self, index: usize) {
        if let Some(place) = self.suggestions.get(index) {
            self.input = place.localized_name.clone();
        }
        self.suggestions.clear();
        self.suggestion_cursor = None;
        self.debouncer.cancel();
    }

    fn clear_search(&mut self) {
        self.input.clear();
        self.suggestions.clear();
        self.suggestion_cursor = None;
        self.debouncer.cancel();
    }

    pub fn add_from_input(&mut self) {
        let outcome = add_city(self.provider, self.photos, self.store, &self.input);
        self.status = match outcome {
            AddOutcome::Added(ref city) => {
                self.clear_search();
                Some(format!("Added {}", city.name))
            }
            AddOutcome::AlreadyTracked(ref name) => {
                self.clear_search();
                Some(format!("{name} is already on the list"))
            }
            // input is kept so it can be corrected
            AddOutcome::NotFound | AddOutcome::Failed(_) => None,
        };
        self.reload();
    }

    fn remove_selected(&mut self) {
        let Some(id) = self.selected_city().map(|c| c.id().to_string()) else {
            return;
        };
        match remove_city(self.store, &id) {
            Ok(_) => self.reload(),
            Err(err) => tracing::warn!("could not remove {}: {}", id, err),
        }
    }

    fn refresh_selected(&mut self) {
        let Some(city) = self.selected_city().cloned() else {
            return;
        };
        if let Some(current) = self.policy().get_conditions(&city, true) {
            if let Some(shown) = self.cities.get_mut(self.city_cursor) {
                policy::apply(shown, &current);
            }
        }
    }

    /// Navigate to a city's detail page and start its history fetch.
    pub fn open(&mut self, id: &str) {
        self.route = Route::Detail(id.to_string());
        self.history.reset();

        let Some(pos) = self.cities.iter().position(|c| c.matches(id)) else {
            return;
        };
        // backfill conditions the add flow could not get
        let city = self.cities[pos].clone();
        if let Some(current) = self.policy().get_conditions(&city, false) {
            policy::apply(&mut self.cities[pos], &current);
        }
        if city.key.is_some() {
            self.history.begin();
        }
    }

    fn refresh_open_city(&mut self) {
        let Route::Detail(ref id) = self.route else {
            return;
        };
        let Some(pos) = self.cities.iter().position(|c| c.matches(id)) else {
            return;
        };
        let city = self.cities[pos].clone();
        if let Some(current) = self.policy().get_conditions(&city, true) {
            policy::apply(&mut self.cities[pos], &current);
        }
    }

    fn back(&mut self) {
        self.route = Route::List;
        self.history.reset();
    }

    pub fn open_city(&self) -> Option<&City> {
        match self.route {
            Route::Detail(ref id) => find_city(&self.cities, id),
            Route::List => None,
        }
    }

    /// Run the pending historical fetch, if the detail view asked for one.
    pub fn load_history(&mut self) {
        if !self.history.is_loading() {
            return;
        }
        let key = self.open_city().and_then(|c| c.key.clone());
        match key {
            Some(key) => self.history.finish(self.provider.historical(&key), self.units),
            None => self.history.reset(),
        }
    }
}

pub fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    app.mount();
    loop {
        terminal.draw(|f| ui(f, app))?;

        // the loading frame is on screen; now block on the request
        if app.history.is_loading() {
            app.load_history();
            continue;
        }

        let timeout = app.time_until_due(Instant::now()).unwrap_or(IDLE_TICK);
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press && app.handle_key(key, Instant::now()) == Flow::Exit {
                    return Ok(());
                }
            }
        }
        app.tick(Instant::now());
    }
}

fn titled_block(title: &str) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .title(Span::styled(
            format!(" {title} "),
            Style::default().fg(Color::Yellow),
        ))
        .title_alignment(Alignment::Left)
        .border_style(Style::default().fg(Color::Cyan))
        .border_type(BorderType::Rounded)
}

fn temperature_text(conditions: Option<&Conditions>, units: Units) -> String {
    match conditions.and_then(|c| units.temperature(c)) {
        Some(temp) => format!("{temp:.1}{}", units.symbol()),
        None => MISSING.to_string(),
    }
}

fn observed_text(conditions: &Conditions) -> String {
    match conditions.observed_at() {
        Some(t) => t.format("%d %b %Y %H:%M").to_string(),
        None => MISSING.to_string(),
    }
}

fn display_city(city: &City, units: Units) -> Vec<Line<'_>> {
    let text = city
        .conditions
        .as_ref()
        .map(|c| c.weather_text.as_str())
        .filter(|t| !t.is_empty())
        .unwrap_or(MISSING);
    vec![
        Line::from(vec![
            Span::raw(" "),
            Span::styled(
                city.name.as_str(),
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(vec![
            Span::raw(format!(" {:13}", "Temperature")),
            Span::styled(
                temperature_text(city.conditions.as_ref(), units),
                Style::default().fg(Color::Green),
            ),
        ]),
        Line::from(vec![
            Span::raw(format!(" {:13}", "Weather")),
            Span::styled(text, Style::default().fg(Color::Green)),
        ]),
    ]
}

fn display_search(app: &App) -> Paragraph<'static> {
    let status = app.status.clone().unwrap_or_default();
    Paragraph::new(vec![
        Line::from(vec![
            Span::raw(" City: "),
            Span::styled(app.input.clone(), Style::default().fg(Color::Green)),
            Span::styled("_", Style::default().add_modifier(Modifier::SLOW_BLINK)),
        ]),
        Line::from(Span::styled(
            format!(" {status}"),
            Style::default().fg(Color::Blue),
        )),
    ])
    .block(titled_block("Add a city"))
}

fn list_ui(f: &mut Frame, app: &App) {
    let suggestion_height = if app.suggestions.is_empty() {
        0
    } else {
        app.suggestions.len().min(6) as u16 + 2
    };
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(4),
            Constraint::Length(suggestion_height),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(f.area());

    f.render_widget(display_search(app), layout[0]);

    if !app.suggestions.is_empty() {
        let items: Vec<ListItem> = app
            .suggestions
            .iter()
            .enumerate()
            .map(|(i, place)| {
                let style = if app.suggestion_cursor == Some(i) {
                    Style::default().fg(Color::Black).bg(Color::Cyan)
                } else {
                    Style::default()
                };
                ListItem::new(format!(" {}", place.display_name())).style(style)
            })
            .collect();
        f.render_widget(List::new(items).block(titled_block("Suggestions")), layout[1]);
    }

    let mut items = vec![];
    if app.cities.is_empty() {
        items.push(ListItem::new(format!("\n  {MISSING}")));
    } else {
        for (i, city) in app.cities.iter().enumerate() {
            let mut item = ListItem::new(display_city(city, app.units));
            if i == app.city_cursor && app.suggestion_cursor.is_none() {
                item = item.style(Style::default().add_modifier(Modifier::REVERSED));
            }
            items.push(item);
        }
    }
    f.render_widget(List::new(items).block(titled_block("Cities")), layout[2]);

    f.render_widget(
        Paragraph::new(" Enter add/open · ↑↓ select · Tab open · Del remove · Ctrl-R refresh · Esc quit")
            .style(Style::default().fg(Color::DarkGray)),
        layout[3],
    );
}

fn display_current(city: &City, units: Units) -> Table<'_> {
    let mut rows = vec![Row::new(vec![Cell::from("")])];
    let current = city.conditions.as_ref();

    let text = current
        .map(|c| c.weather_text.clone())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| MISSING.to_string());
    rows.push(Row::new(vec![
        Cell::from(" Weather"),
        Cell::from(text).style(Style::default().fg(Color::Green)),
    ]));
    rows.push(Row::new(vec![
        Cell::from(" Temperature"),
        Cell::from(temperature_text(current, units)).style(Style::default().fg(Color::Green)),
    ]));

    let icon = match current.and_then(|c| c.weather_icon) {
        Some(icon) => format!("{ICON_URL}/{icon}.svg"),
        None => MISSING.to_string(),
    };
    rows.push(Row::new(vec![Cell::from(" Icon"), Cell::from(icon)]));

    let updated = current.map(observed_text).unwrap_or_else(|| MISSING.to_string());
    rows.push(Row::new(vec![Cell::from(" Updated"), Cell::from(updated)]));

    rows.push(Row::new(vec![
        Cell::from(" Photo"),
        Cell::from(city.display_photo().unwrap_or(MISSING).to_string()),
    ]));
    rows.push(Row::new(vec![
        Cell::from(" AccuWeather"),
        Cell::from(
            current
                .and_then(Conditions::provider_link)
                .unwrap_or(MISSING)
                .to_string(),
        ),
    ]));

    Table::new(rows, [Constraint::Length(14), Constraint::Min(10)])
        .block(titled_block("Current Conditions"))
}

fn display_history_list(history: &[Conditions], units: Units) -> List<'static> {
    let items: Vec<ListItem> = history
        .iter()
        .map(|h| {
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!(" {:20}", observed_text(h)),
                    Style::default().add_modifier(Modifier::BOLD),
                ),
                Span::raw(format!("{} - ", h.weather_text)),
                Span::styled(
                    temperature_text(Some(h), units),
                    Style::default().fg(Color::Green),
                ),
            ]))
        })
        .collect();
    List::new(items).block(titled_block("Readings"))
}

fn history_ui(f: &mut Frame, app: &App, area: Rect) {
    let message = |text: String, style: Style| {
        Paragraph::new(text)
            .style(style)
            .wrap(Wrap { trim: true })
            .block(titled_block("Last 24 hours"))
    };

    match app.history.state() {
        HistoryState::Idle => {
            f.render_widget(message(String::new(), Style::default()), area);
        }
        HistoryState::Loading => {
            f.render_widget(message(" Loading...".into(), Style::default().fg(Color::Blue)), area);
        }
        HistoryState::Error(err) => {
            f.render_widget(
                message(
                    format!(" Error while fetching data: {err}"),
                    Style::default().fg(Color::Red),
                ),
                area,
            );
        }
        HistoryState::Loaded(history) => {
            let Some(chart) = app.history.chart() else {
                f.render_widget(message(format!(" {EMPTY_MESSAGE}"), Style::default()), area);
                return;
            };
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
                .split(area);

            let dataset = Dataset::default()
                .name(format!("Temperature ({})", app.units.symbol()))
                .marker(symbols::Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(Color::Cyan))
                .data(&chart.points);
            let widget = Chart::new(vec![dataset])
                .block(titled_block("Last 24 hours"))
                .x_axis(
                    Axis::default()
                        .style(Style::default().fg(Color::Gray))
                        .bounds(chart.x_bounds)
                        .labels(axis_labels(&chart.x_labels)),
                )
                .y_axis(
                    Axis::default()
                        .style(Style::default().fg(Color::Gray))
                        .bounds(chart.y_bounds)
                        .labels(axis_labels(&chart.y_labels)),
                );
            f.render_widget(widget, chunks[0]);
            f.render_widget(display_history_list(history, app.units), chunks[1]);
        }
    }
}

fn axis_labels(labels: &[String]) -> Vec<Span<'static>> {
    labels.iter().cloned().map(Span::from).collect()
}

fn detail_ui(f: &mut Frame, app: &App, id: &str) {
    let Some(city) = app.open_city() else {
        let text = vec![
            Line::from(vec![
                Span::raw(" No data for city: "),
                Span::styled(id.to_string(), Style::default().add_modifier(Modifier::BOLD)),
            ]),
            Line::from(" Esc to go back"),
        ];
        f.render_widget(
            Paragraph::new(text).block(titled_block("Not found")),
            f.area(),
        );
        return;
    };

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(9),
            Constraint::Min(6),
            Constraint::Length(1),
        ])
        .split(f.area());

    let headline = Paragraph::new(Line::from(vec![
        Span::raw(" "),
        Span::styled(city.id().to_string(), Style::default().fg(Color::Blue)),
        Span::raw(" : "),
        Span::styled(city.name.clone(), Style::default().fg(Color::Yellow)),
    ]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .border_type(BorderType::Rounded),
    );
    f.render_widget(headline, layout[0]);
    f.render_widget(display_current(city, app.units), layout[1]);
    history_ui(f, app, layout[2]);

    let reload = if app.history.is_loading() {
        "loading..."
    } else {
        "r reload history"
    };
    f.render_widget(
        Paragraph::new(format!(" Esc back · {reload} · f refresh conditions · q quit"))
            .style(Style::default().fg(Color::DarkGray)),
        layout[3],
    );
}

pub fn ui(f: &mut Frame, app: &App) {
    match app.route {
        Route::List => list_ui(f, app),
        Route::Detail(ref id) => detail_ui(f, app, id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accuweather::fake::{location, FakeProvider};
    use crate::store::MemoryStore;
    use crate::weather::fixtures::{city, conditions};
    use chrono::Utc;
    use ratatui::backend::TestBackend;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(app: &mut App, text: &str, now: Instant) {
        for c in text.chars() {
            app.handle_key(key(KeyCode::Char(c)), now);
        }
    }

    fn render(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 40)).unwrap();
        terminal.draw(|f| ui(f, app)).unwrap();
        terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|c| c.symbol())
            .collect()
    }

    fn fresh(name: &str, key: &str, temp: f64) -> City {
        let mut c = city(name, key);
        c.conditions = Some(conditions(Utc::now().timestamp(), temp, "Sunny"));
        c
    }

    #[test]
    fn autocomplete_is_debounced() {
        let provider = FakeProvider {
            locations: vec![location("274663", "Warszawa")],
            ..Default::default()
        };
        let store = MemoryStore::default();
        let mut app = App::new(&provider, None, &store, Units::Metric, 3600);
        let t0 = Instant::now();

        type_text(&mut app, "War", t0);
        app.tick(t0 + Duration::from_millis(100));
        type_text(&mut app, "s", t0 + Duration::from_millis(200));
        app.tick(t0 + Duration::from_millis(300));
        type_text(&mut app, "z", t0 + Duration::from_millis(400));
        app.tick(t0 + Duration::from_millis(600));
        app.tick(t0 + Duration::from_millis(900));
        app.tick(t0 + Duration::from_millis(1500));

        assert_eq!(*provider.autocomplete_queries.borrow(), vec!["Warsz".to_string()]);
        assert_eq!(app.suggestions.len(), 1);
    }

    #[test]
    fn selecting_a_suggestion_fills_input_only() {
        let provider = FakeProvider {
            locations: vec![location("274663", "Warszawa")],
            ..Default::default()
        };
        let store = MemoryStore::default();
        let mut app = App::new(&provider, None, &store, Units::Metric, 3600);
        let t0 = Instant::now();

        type_text(&mut app, "Wars", t0);
        app.tick(t0 + AUTOCOMPLETE_DELAY);
        app.handle_key(key(KeyCode::Down), t0);
        app.handle_key(key(KeyCode::Enter), t0);

        assert_eq!(app.input, "Warszawa");
        assert!(app.suggestions.is_empty());
        assert!(store.load().unwrap().is_empty());
        assert_eq!(provider.search_calls.get(), 0);
    }

    #[test]
    fn enter_adds_typed_city_and_clears_input() {
        let provider = FakeProvider {
            locations: vec![location("274663", "Warsaw")],
            current: Some(conditions(Utc::now().timestamp(), 7.0, "Fog")),
            ..Default::default()
        };
        let store = MemoryStore::default();
        let mut app = App::new(&provider, None, &store, Units::Metric, 3600);
        let t0 = Instant::now();

        type_text(&mut app, "Warszawa", t0);
        app.handle_key(key(KeyCode::Enter), t0);

        assert_eq!(app.input, "");
        assert_eq!(app.cities.len(), 1);
        assert_eq!(app.cities[0].name, "Warsaw");
        assert!(render(&app).contains("7.0°C"));
    }

    #[test]
    fn failed_add_keeps_input() {
        let provider = FakeProvider::default();
        let store = MemoryStore::default();
        let mut app = App::new(&provider, None, &store, Units::Metric, 3600);

        type_text(&mut app, "Atlantis", Instant::now());
        app.add_from_input();

        assert_eq!(app.input, "Atlantis");
        assert!(app.cities.is_empty());
    }

    #[test]
    fn mount_reuses_fresh_conditions() {
        let provider = FakeProvider::default();
        let store = MemoryStore::with_cities(vec![fresh("Oslo", "254946", -3.0)]);
        let mut app = App::new(&provider, None, &store, Units::Metric, 3600);

        app.mount();

        assert_eq!(provider.current_calls.get(), 0);
        assert!(render(&app).contains("Oslo"));
    }

    #[test]
    fn delete_removes_selected_city() {
        let provider = FakeProvider::default();
        let store = MemoryStore::with_cities(vec![
            fresh("Oslo", "254946", 1.0),
            fresh("Bergen", "254950", 2.0),
        ]);
        let mut app = App::new(&provider, None, &store, Units::Metric, 3600);
        app.mount();

        app.handle_key(key(KeyCode::Down), Instant::now());
        app.handle_key(key(KeyCode::Delete), Instant::now());

        let names: Vec<_> = store.load().unwrap().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["Oslo"]);
        assert_eq!(app.cities.len(), 1);
    }

    #[test]
    fn ctrl_r_forces_refresh() {
        let provider = FakeProvider {
            current: Some(conditions(Utc::now().timestamp(), 30.0, "Hot")),
            ..Default::default()
        };
        let store = MemoryStore::with_cities(vec![fresh("Oslo", "254946", 1.0)]);
        let mut app = App::new(&provider, None, &store, Units::Metric, 3600);
        app.mount();

        app.handle_key(
            KeyEvent::new(KeyCode::Char('r'), KeyModifiers::CONTROL),
            Instant::now(),
        );

        assert_eq!(provider.current_calls.get(), 1);
        assert_eq!(app.cities[0].conditions.as_ref().unwrap().weather_text, "Hot");
        assert_eq!(app.input, "");
    }

    #[test]
    fn detail_view_loads_history_and_draws_chart() {
        let now = Utc::now().timestamp();
        let provider = FakeProvider {
            history: Some(vec![
                conditions(now, 5.0, "Cloudy"),
                conditions(now - 3600, 4.0, "Rain"),
            ]),
            ..Default::default()
        };
        let store = MemoryStore::with_cities(vec![fresh("Oslo", "254946", 5.0)]);
        let mut app = App::new(&provider, None, &store, Units::Metric, 3600);
        app.mount();

        app.open("Oslo");
        assert!(app.history.is_loading());
        assert!(render(&app).contains("Loading..."));

        app.load_history();
        assert_eq!(provider.history_calls.get(), 1);
        assert!(app.history.chart().is_some());
        let screen = render(&app);
        assert!(screen.contains("Last 24 hours"));
        assert!(screen.contains("Rain"));
    }

    #[test]
    fn detail_view_shows_error_when_history_fails() {
        let provider = FakeProvider::default();
        let store = MemoryStore::with_cities(vec![fresh("Oslo", "254946", 5.0)]);
        let mut app = App::new(&provider, None, &store, Units::Metric, 3600);
        app.mount();

        app.open("254946");
        app.load_history();

        assert!(matches!(app.history.state(), HistoryState::Error(_)));
        assert!(render(&app).contains("HTTP 503"));
    }

    #[test]
    fn detail_view_shows_empty_state() {
        let provider = FakeProvider {
            history: Some(vec![]),
            ..Default::default()
        };
        let store = MemoryStore::with_cities(vec![fresh("Oslo", "254946", 5.0)]);
        let mut app = App::new(&provider, None, &store, Units::Metric, 3600);
        app.mount();

        app.open("Oslo");
        app.load_history();

        assert!(render(&app).contains(EMPTY_MESSAGE));
    }

    #[test]
    fn unknown_route_renders_not_found() {
        let provider = FakeProvider::default();
        let store = MemoryStore::default();
        let mut app = App::new(&provider, None, &store, Units::Metric, 3600);

        app.open("Atlantis");

        assert!(!app.history.is_loading());
        assert!(render(&app).contains("No data for city: Atlantis"));
    }

    #[test]
    fn reload_key_is_ignored_while_loading() {
        let provider = FakeProvider {
            history: Some(vec![]),
            ..Default::default()
        };
        let store = MemoryStore::with_cities(vec![fresh("Oslo", "254946", 5.0)]);
        let mut app = App::new(&provider, None, &store, Units::Metric, 3600);
        app.mount();
        app.open("Oslo");

        app.handle_key(key(KeyCode::Char('r')), Instant::now());
        app.load_history();
        app.load_history();

        assert_eq!(provider.history_calls.get(), 1);

        app.handle_key(key(KeyCode::Char('r')), Instant::now());
        app.load_history();
        assert_eq!(provider.history_calls.get(), 2);
    }

    #[test]
    fn esc_returns_to_list_then_exits() {
        let provider = FakeProvider::default();
        let store = MemoryStore::with_cities(vec![fresh("Oslo", "254946", 5.0)]);
        let mut app = App::new(&provider, None, &store, Units::Metric, 3600);
        app.mount();
        app.open("Oslo");

        assert_eq!(app.handle_key(key(KeyCode::Esc), Instant::now()), Flow::Continue);
        assert_eq!(app.route, Route::List);
        assert_eq!(app.handle_key(key(KeyCode::Esc), Instant::now()), Flow::Exit);
    }
}
