use std::time::Duration;

use reqwest::blocking::{Client, Response};
use serde::de::DeserializeOwned;

use crate::error::{Result, WxError};
use crate::weather::{Conditions, Location};

pub const BASE_URL: &str = "https://dataservice.accuweather.com";

const USER_AGENT: &str = concat!("citywx/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// How a request proves it holds the API key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStrategy {
    /// `Authorization: Bearer <key>`
    BearerHeader,
    /// `?apikey=<key>`
    QueryParam,
}

/// Header first, then the query-parameter form, tried in order.
pub const HISTORICAL_AUTH: &[AuthStrategy] = &[AuthStrategy::BearerHeader, AuthStrategy::QueryParam];

const DEFAULT_AUTH: &[AuthStrategy] = &[AuthStrategy::BearerHeader];

pub trait WeatherProvider {
    /// Candidate places for a partially typed name.
    fn autocomplete(&self, query: &str) -> Result<Vec<Location>>;

    /// Places matching a full name, best match first.
    fn search(&self, name: &str) -> Result<Vec<Location>>;

    fn current_conditions(&self, key: &str) -> Result<Conditions>;

    /// Readings for the trailing 24 hours, newest first.
    fn historical(&self, key: &str) -> Result<Vec<Conditions>>;
}

#[derive(Debug, Clone)]
pub struct AccuWeather {
    client: Client,
    base_url: String,
    api_key: String,
    language: String,
}

impl AccuWeather {
    pub fn new(base_url: &str, api_key: &str, language: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            language: language.to_string(),
        })
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        strategies: &[AuthStrategy],
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let mut last_err = None;

        for &strategy in strategies {
            match self.send(&url, query, strategy) {
                Ok(response) => {
                    return response
                        .json()
                        .map_err(|e| WxError::Decode(format!("{url}: {e}")));
                }
                Err(err) => {
                    tracing::warn!("{:?} request to {} failed: {}", strategy, url, err);
                    last_err = Some(err);
                }
            }
        }

        Err(last_err.unwrap_or(WxError::MissingApiKey))
    }

    fn send(&self, url: &str, query: &[(&str, &str)], strategy: AuthStrategy) -> Result<Response> {
        let mut request = self.client.get(url).query(query);
        request = match strategy {
            AuthStrategy::BearerHeader => request.bearer_auth(&self.api_key),
            AuthStrategy::QueryParam => request.query(&[("apikey", self.api_key.as_str())]),
        };

        let response = request.send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(WxError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response)
    }
}

impl WeatherProvider for AccuWeather {
    fn autocomplete(&self, query: &str) -> Result<Vec<Location>> {
        self.get_json(
            "/locations/v1/cities/autocomplete",
            &[("q", query), ("language", &self.language)],
            DEFAULT_AUTH,
        )
    }

    fn search(&self, name: &str) -> Result<Vec<Location>> {
        self.get_json(
            "/locations/v1/cities/search",
            &[("q", name), ("language", &self.language)],
            DEFAULT_AUTH,
        )
    }

    fn current_conditions(&self, key: &str) -> Result<Conditions> {
        let readings: Vec<Conditions> = self.get_json(
            &format!("/currentconditions/v1/{key}"),
            &[
                ("language", &self.language),
                ("details", "true"),
                ("getphotos", "true"),
            ],
            DEFAULT_AUTH,
        )?;
        readings
            .into_iter()
            .next()
            .ok_or_else(|| WxError::NoMatch(key.to_string()))
    }

    fn historical(&self, key: &str) -> Result<Vec<Conditions>> {
        self.get_json(
            &format!("/currentconditions/v1/{key}/historical/24"),
            &[("language", &self.language)],
            HISTORICAL_AUTH,
        )
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use std::cell::{Cell, RefCell};

    use super::*;

    /// Scripted provider that records what was asked of it.
    #[derive(Default)]
    pub struct FakeProvider {
        pub locations: Vec<Location>,
        pub current: Option<Conditions>,
        pub history: Option<Vec<Conditions>>,
        pub autocomplete_queries: RefCell<Vec<String>>,
        pub search_calls: Cell<usize>,
        pub current_calls: Cell<usize>,
        pub history_calls: Cell<usize>,
    }

    fn unavailable() -> WxError {
        WxError::Status {
            status: 503,
            url: "fake".into(),
        }
    }

    impl WeatherProvider for FakeProvider {
        fn autocomplete(&self, query: &str) -> Result<Vec<Location>> {
            self.autocomplete_queries.borrow_mut().push(query.to_string());
            Ok(self.locations.clone())
        }

        fn search(&self, _name: &str) -> Result<Vec<Location>> {
            self.search_calls.set(self.search_calls.get() + 1);
            Ok(self.locations.clone())
        }

        fn current_conditions(&self, _key: &str) -> Result<Conditions> {
            self.current_calls.set(self.current_calls.get() + 1);
            self.current.clone().ok_or_else(unavailable)
        }

        fn historical(&self, _key: &str) -> Result<Vec<Conditions>> {
            self.history_calls.set(self.history_calls.get() + 1);
            self.history.clone().ok_or_else(unavailable)
        }
    }

    pub fn location(key: &str, name: &str) -> Location {
        Location {
            key: key.to_string(),
            localized_name: name.to_string(),
            english_name: Some(name.to_string()),
            country: None,
        }
    }
}
