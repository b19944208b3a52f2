//! Representative city photos from the Wikipedia API.
//!
//! Two requests: the page's first image title, then that image's URL.

use std::collections::HashMap;
use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;

use crate::error::{Result, WxError};

pub const WIKI_URL: &str = "https://en.wikipedia.org/w/api.php";

pub trait PhotoLookup {
    fn photo_url(&self, title: &str) -> Result<Option<String>>;
}

#[derive(Deserialize, Debug, Default)]
struct QueryResponse {
    #[serde(default)]
    query: Option<Query>,
}

#[derive(Deserialize, Debug, Default)]
struct Query {
    #[serde(default)]
    pages: HashMap<String, Page>,
}

#[derive(Deserialize, Debug, Default)]
struct Page {
    #[serde(default)]
    images: Vec<ImageRef>,

    #[serde(default)]
    imageinfo: Vec<ImageInfo>,
}

#[derive(Deserialize, Debug)]
struct ImageRef {
    title: String,
}

#[derive(Deserialize, Debug)]
struct ImageInfo {
    url: String,
}

impl QueryResponse {
    fn first_page(self) -> Option<Page> {
        self.query?.pages.into_values().next()
    }
}

#[derive(Debug, Clone)]
pub struct Wikipedia {
    client: Client,
    api_url: String,
}

impl Wikipedia {
    pub fn new(api_url: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("citywx/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            api_url: api_url.to_string(),
        })
    }

    fn query(&self, params: &[(&str, &str)]) -> Result<QueryResponse> {
        let response = self
            .client
            .get(&self.api_url)
            .query(&[("action", "query"), ("format", "json"), ("origin", "*")])
            .query(params)
            .send()?;
        if !response.status().is_success() {
            return Err(WxError::Status {
                status: response.status().as_u16(),
                url: self.api_url.clone(),
            });
        }
        response
            .json()
            .map_err(|e| WxError::Decode(format!("{}: {e}", self.api_url)))
    }
}

impl PhotoLookup for Wikipedia {
    fn photo_url(&self, title: &str) -> Result<Option<String>> {
        let page = self
            .query(&[("titles", title), ("prop", "images"), ("imlimit", "1")])?
            .first_page();
        let Some(image) = page.and_then(|p| p.images.into_iter().next()) else {
            tracing::debug!("no images on wikipedia page '{}'", title);
            return Ok(None);
        };

        let page = self
            .query(&[
                ("titles", image.title.as_str()),
                ("prop", "imageinfo"),
                ("iiprop", "url"),
            ])?
            .first_page();
        Ok(page.and_then(|p| p.imageinfo.into_iter().next()).map(|i| i.url))
    }
}
