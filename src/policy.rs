//! Decides per city whether stored conditions are still good enough or a
//! fresh fetch is needed, and folds fresh results back into the store.

use chrono::Utc;

use crate::accuweather::WeatherProvider;
use crate::error::{Result, WxError};
use crate::store::CityStore;
use crate::weather::{City, Conditions};

/// Stored conditions younger than this are reused without a remote call.
pub const FRESHNESS_TTL_SECS: i64 = 3600;

pub struct ConditionsPolicy<'a> {
    provider: &'a dyn WeatherProvider,
    store: &'a dyn CityStore,
    ttl_secs: i64,
}

impl<'a> ConditionsPolicy<'a> {
    pub fn new(provider: &'a dyn WeatherProvider, store: &'a dyn CityStore) -> Self {
        Self {
            provider,
            store,
            ttl_secs: FRESHNESS_TTL_SECS,
        }
    }

    pub fn with_ttl(mut self, ttl_secs: i64) -> Self {
        self.ttl_secs = ttl_secs;
        self
    }

    pub fn get_conditions(&self, city: &City, force: bool) -> Option<Conditions> {
        self.get_conditions_at(city, force, Utc::now().timestamp())
    }

    /// Like [`get_conditions`](Self::get_conditions) with `now` in unix seconds.
    ///
    /// Failures are logged and answered with whatever the city already had.
    pub fn get_conditions_at(&self, city: &City, force: bool, now: i64) -> Option<Conditions> {
        if !force {
            if let Some(ref stored) = city.conditions {
                let age = now - stored.epoch_time;
                if age < self.ttl_secs {
                    tracing::debug!("{}: reusing conditions {}s old", city.name, age);
                    return Some(stored.clone());
                }
            }
        }

        let Some(key) = city.key.as_deref() else {
            tracing::warn!("{}", WxError::MissingKey(city.name.clone()));
            return city.conditions.clone();
        };

        let fresh = match self.provider.current_conditions(key) {
            Ok(fresh) => fresh,
            Err(err) => {
                tracing::warn!("{}: conditions refresh failed: {}", city.name, err);
                return city.conditions.clone();
            }
        };
        tracing::info!("{}: fetched conditions ({})", city.name, fresh.weather_text);

        if let Err(err) = self.merge(key, &fresh) {
            tracing::warn!("{}: could not store fresh conditions: {}", city.name, err);
        }
        Some(fresh)
    }

    /// Read-modify-write of the whole stored list.
    fn merge(&self, key: &str, fresh: &Conditions) -> Result<()> {
        let mut cities = self.store.load()?;
        let Some(target) = cities.iter_mut().find(|c| c.key.as_deref() == Some(key)) else {
            tracing::debug!("{} is no longer tracked, nothing to merge", key);
            return Ok(());
        };

        apply(target, fresh);
        self.store.save(&cities)
    }

    /// Runs the freshness check for every stored city, in display order, and
    /// returns the list as it should now be shown.
    pub fn refresh_all(&self, force: bool) -> Vec<City> {
        self.refresh_all_at(force, Utc::now().timestamp())
    }

    pub fn refresh_all_at(&self, force: bool, now: i64) -> Vec<City> {
        let mut cities = match self.store.load() {
            Ok(cities) => cities,
            Err(err) => {
                tracing::warn!("could not read stored cities: {}", err);
                return Vec::new();
            }
        };

        for city in cities.iter_mut() {
            if let Some(current) = self.get_conditions_at(city, force, now) {
                apply(city, &current);
            }
        }
        cities
    }
}

/// Replace the snapshot wholesale; only adopt the photo if none was set.
pub fn apply(city: &mut City, fresh: &Conditions) {
    if city.photo_url.is_none() {
        city.photo_url = fresh.photo_link().map(str::to_owned);
    }
    city.conditions = Some(fresh.clone());
}
