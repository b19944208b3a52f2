use crate::accuweather::WeatherProvider;
use crate::error::Result;
use crate::store::CityStore;
use crate::weather::City;
use crate::wiki::PhotoLookup;

#[derive(Debug, Clone, PartialEq)]
pub enum AddOutcome {
    Added(City),
    /// A city with the same location key is already in the list.
    AlreadyTracked(String),
    NotFound,
    Failed(String),
}

/// Resolve a typed place name and append it to the stored list.
///
/// Search failures abort. A conditions failure still adds the city, without
/// a snapshot; the refresh policy fills it in later.
pub fn add_city(
    provider: &dyn WeatherProvider,
    photos: Option<&dyn PhotoLookup>,
    store: &dyn CityStore,
    query: &str,
) -> AddOutcome {
    let query = query.trim();
    if query.is_empty() {
        return AddOutcome::NotFound;
    }

    let matches = match provider.search(query) {
        Ok(matches) => matches,
        Err(err) => {
            tracing::warn!("search for '{}' failed: {}", query, err);
            return AddOutcome::Failed(err.to_string());
        }
    };
    let Some(place) = matches.into_iter().next() else {
        tracing::info!("no place matches '{}'", query);
        return AddOutcome::NotFound;
    };

    let mut city = City::new(place.canonical_name(), Some(place.key.clone()));

    match provider.current_conditions(&place.key) {
        Ok(current) => crate::policy::apply(&mut city, &current),
        Err(err) => tracing::warn!("{}: initial conditions fetch failed: {}", city.name, err),
    }

    if city.photo_url.is_none() {
        if let Some(lookup) = photos {
            match lookup.photo_url(&city.name) {
                Ok(url) => city.photo_url = url,
                Err(err) => tracing::warn!("{}: photo lookup failed: {}", city.name, err),
            }
        }
    }

    match append(store, city) {
        Ok(outcome) => outcome,
        Err(err) => {
            tracing::warn!("could not store new city: {}", err);
            AddOutcome::Failed(err.to_string())
        }
    }
}

fn append(store: &dyn CityStore, city: City) -> Result<AddOutcome> {
    let mut cities = store.load()?;
    if let Some(existing) = cities.iter().find(|c| c.key.is_some() && c.key == city.key) {
        tracing::info!("{} is already tracked", existing.name);
        return Ok(AddOutcome::AlreadyTracked(existing.name.clone()));
    }

    tracing::info!("tracking {} ({})", city.name, city.id());
    cities.push(city.clone());
    store.save(&cities)?;
    Ok(AddOutcome::Added(city))
}

/// Remove the city whose key or name is `id`. Returns whether one was removed.
pub fn remove_city(store: &dyn CityStore, id: &str) -> Result<bool> {
    let mut cities = store.load()?;
    let Some(pos) = cities.iter().position(|c| c.matches(id)) else {
        return Ok(false);
    };

    let removed = cities.remove(pos);
    store.save(&cities)?;
    tracing::info!("stopped tracking {}", removed.name);
    Ok(true)
}

/// Resolve a route identifier against stored names and keys.
pub fn find_city<'a>(cities: &'a [City], id: &str) -> Option<&'a City> {
    cities.iter().find(|c| c.matches(id))
}
