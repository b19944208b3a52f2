use chrono::{DateTime, Local, TimeZone};
use serde::{Deserialize, Serialize};

/// A tracked city as persisted in the `cities` record.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct City {
    pub name: String,

    #[serde(default)]
    pub key: Option<String>,

    #[serde(default)]
    pub photo_url: Option<String>,

    #[serde(default)]
    pub conditions: Option<Conditions>,
}

impl City {
    pub fn new(name: impl Into<String>, key: Option<String>) -> Self {
        Self {
            name: name.into(),
            key,
            photo_url: None,
            conditions: None,
        }
    }

    /// Identity used for routes and de-duplication: key when present, else name.
    pub fn id(&self) -> &str {
        self.key.as_deref().unwrap_or(&self.name)
    }

    /// True if `id` names this city by key or by name.
    pub fn matches(&self, id: &str) -> bool {
        self.name == id || self.key.as_deref() == Some(id)
    }

    /// Photo to show: the latest snapshot's photo, else the stored one.
    pub fn display_photo(&self) -> Option<&str> {
        self.conditions
            .as_ref()
            .and_then(Conditions::photo_link)
            .or(self.photo_url.as_deref())
    }
}

/// A single point-in-time reading, kept in the provider's field names.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct Conditions {
    pub epoch_time: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_observation_date_time: Option<String>,

    #[serde(default)]
    pub weather_text: String,

    #[serde(default)]
    pub weather_icon: Option<u32>,

    #[serde(default)]
    pub temperature: Temperature,

    #[serde(default)]
    pub photos: Vec<Photo>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mobile_link: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

impl Conditions {
    pub fn photo_link(&self) -> Option<&str> {
        self.photos.first().and_then(Photo::link)
    }

    pub fn observed_at(&self) -> Option<DateTime<Local>> {
        if let Some(ref raw) = self.local_observation_date_time {
            if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
                return Some(parsed.with_timezone(&Local));
            }
        }
        Local.timestamp_opt(self.epoch_time, 0).single()
    }

    pub fn provider_link(&self) -> Option<&str> {
        self.mobile_link.as_deref().or(self.link.as_deref())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "PascalCase")]
pub struct Temperature {
    #[serde(default)]
    pub metric: Option<Measure>,

    #[serde(default)]
    pub imperial: Option<Measure>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct Measure {
    pub value: Option<f64>,

    #[serde(default)]
    pub unit: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "PascalCase")]
pub struct Photo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub landscape_link: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub portrait_link: Option<String>,
}

impl Photo {
    pub fn link(&self) -> Option<&str> {
        self.landscape_link
            .as_deref()
            .or(self.portrait_link.as_deref())
    }
}

/// A place returned by autocomplete or search.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct Location {
    pub key: String,

    #[serde(default)]
    pub localized_name: String,

    #[serde(default)]
    pub english_name: Option<String>,

    #[serde(default)]
    pub country: Option<Country>,
}

impl Location {
    pub fn display_name(&self) -> String {
        match self.country {
            Some(ref country) => format!("{}, {}", self.localized_name, country.id),
            None => self.localized_name.clone(),
        }
    }

    pub fn canonical_name(&self) -> &str {
        self.english_name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(&self.localized_name)
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Country {
    #[serde(rename = "ID")]
    pub id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Units {
    #[default]
    Metric,
    Imperial,
}

impl Units {
    /// Temperature in these units, converting from the other scale when the
    /// snapshot only carries one of them.
    pub fn temperature(&self, conditions: &Conditions) -> Option<f64> {
        use crate::units::temperature::{c2f, f2c};

        let t = &conditions.temperature;
        let metric = t.metric.as_ref().and_then(|m| m.value);
        let imperial = t.imperial.as_ref().and_then(|m| m.value);
        match self {
            Units::Metric => metric.or(imperial.map(f2c)),
            Units::Imperial => imperial.or(metric.map(c2f)),
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Units::Metric => "°C",
            Units::Imperial => "°F",
        }
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    const CURRENT: &str = r#"[{
        "LocalObservationDateTime": "2024-05-01T12:10:00+02:00",
        "EpochTime": 1714558200,
        "WeatherText": "Mostly sunny",
        "WeatherIcon": 2,
        "Temperature": {
            "Metric": {"Value": 18.3, "Unit": "C", "UnitType": 17},
            "Imperial": {"Value": 65.0, "Unit": "F", "UnitType": 18}
        },
        "Photos": [{"PortraitLink": "https://img/p.jpg"}, {"LandscapeLink": "https://img/l2.jpg"}],
        "MobileLink": "https://m.accuweather.com/x",
        "Link": "https://www.accuweather.com/x"
    }]"#;

    #[test]
    fn parses_provider_conditions() {
        let parsed: Vec<Conditions> = serde_json::from_str(CURRENT).unwrap();
        let c = &parsed[0];
        assert_eq!(c.epoch_time, 1714558200);
        assert_eq!(c.weather_text, "Mostly sunny");
        assert_eq!(c.weather_icon, Some(2));
        assert_eq!(Units::Metric.temperature(c), Some(18.3));
        assert_eq!(Units::Imperial.temperature(c), Some(65.0));
        assert_eq!(c.photo_link(), Some("https://img/p.jpg"));
        assert_eq!(c.provider_link(), Some("https://m.accuweather.com/x"));
    }

    #[test]
    fn city_uses_camel_case_and_survives_reload() {
        let mut city = city("Warszawa", "274663");
        city.photo_url = Some("https://img/w.jpg".into());
        city.conditions = Some(conditions(100, 12.0, "Rain"));

        let json = serde_json::to_value(&city).unwrap();
        assert_eq!(json["photoUrl"], "https://img/w.jpg");
        assert_eq!(json["conditions"]["EpochTime"], 100);

        let back: City = serde_json::from_value(json).unwrap();
        assert_eq!(back, city);
    }

    #[test]
    fn city_identity_prefers_key() {
        let keyed = city("Warszawa", "274663");
        assert_eq!(keyed.id(), "274663");
        assert!(keyed.matches("Warszawa"));
        assert!(keyed.matches("274663"));
        assert!(!keyed.matches("Kraków"));

        let unkeyed = City::new("Gdańsk", None);
        assert_eq!(unkeyed.id(), "Gdańsk");
    }

    #[test]
    fn display_photo_falls_back_to_stored_url() {
        let mut c = city("Oslo", "1");
        c.photo_url = Some("stored".into());
        c.conditions = Some(conditions(1, 1.0, "Snow"));
        assert_eq!(c.display_photo(), Some("stored"));

        c.conditions.as_mut().unwrap().photos = vec![Photo {
            landscape_link: Some("fresh".into()),
            portrait_link: None,
        }];
        assert_eq!(c.display_photo(), Some("fresh"));
    }

    #[test]
    fn converts_missing_scale() {
        let c = conditions(0, 100.0, "Hot");
        assert_eq!(Units::Imperial.temperature(&c), Some(212.0));
    }

    #[test]
    fn location_display_name_includes_country() {
        let raw = r#"{"Key":"274663","LocalizedName":"Warszawa","EnglishName":"Warsaw","Country":{"ID":"PL","LocalizedName":"Polska"}}"#;
        let loc: Location = serde_json::from_str(raw).unwrap();
        assert_eq!(loc.display_name(), "Warszawa, PL");
        assert_eq!(loc.canonical_name(), "Warsaw");

        let bare: Location = serde_json::from_str(r#"{"Key":"1","LocalizedName":"Nowhere"}"#).unwrap();
        assert_eq!(bare.display_name(), "Nowhere");
        assert_eq!(bare.canonical_name(), "Nowhere");
    }
}
